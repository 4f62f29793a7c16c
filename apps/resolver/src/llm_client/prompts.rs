// System prompt for the API-backed conversation. The per-round preambles built
// by `prompting` carry the actual instructions; this only pins the output format.

/// System prompt that keeps every reply a bare JSON value.
pub const CONVERSATION_SYSTEM: &str = "You are a precise form-filling assistant. \
    Follow the instructions in each message exactly. \
    When a message asks for JSON, respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Reply the assistant gives to context-only messages.
pub const CONTEXT_ACK: &str = "Understood.";
