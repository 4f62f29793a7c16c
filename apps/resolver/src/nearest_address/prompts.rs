// Prompt templates for the nearest-address lookup.
// Placeholders are substituted with `prompting::builder::fill`.

/// Sent first on every attempt, so the lookup never depends on earlier turns.
/// Replace `{address_lines}`.
pub const ADDRESS_SYSTEM_PROMPT: &str = r#"You are an address matching assistant. Your task is to find the **nearest address** to a given location or list of locations.

The available addresses are:

{address_lines}

Return **only** a JSON object with the following keys exactly:
{
  "addressLine1": <string>,
  "addressLine2": <string>,
  "city": <string>,
  "state": <string>,
  "postalCode": <string>,
  "country": <string>
}

Do not add explanations or extra text. Only output valid JSON."#;

/// Replace `{locations}`.
pub const ADDRESS_QUERY_PROMPT: &str = r#"Find the address closest to the following location(s):

{locations}

If there are multiple locations, select the **single address** from the list above that is closest to all given locations collectively.

Return **exactly one JSON object**, copied from the addresses shared earlier.
Do NOT include disclaimers, prefaces, commentary, or closing remarks.

response_format = {
    "type": "json_schema",
    "schema": {
        "type": "object",
        "properties": {
            "addressLine1": { "type": "string" },
            "addressLine2": { "type": "string" },
            "city": { "type": "string" },
            "state": { "type": "string" },
            "postalCode": { "type": "string" },
            "country": { "type": "string" }
        },
        "required": ["addressLine1", "city", "state", "country"]
    }
}"#;
