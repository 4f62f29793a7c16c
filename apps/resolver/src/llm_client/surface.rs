//! ApiSurface — drives the conversation through the Messages API instead of a
//! browser. The "session" is the message history this process keeps.
//!
//! Context-only steps are appended with a canned acknowledgement and reach the
//! API together with the next answer step.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::prompts::{CONTEXT_ACK, CONVERSATION_SYSTEM};
use super::{ChatMessage, LlmClient, MAX_ATTEMPTS};
use crate::prompting::PromptStep;
use crate::resolution::parse::{normalize_chars, strip_json_fences};
use crate::session::{AutomationSurface, ChainOptions, ChainResult};

pub struct ApiSurface {
    client: LlmClient,
    max_history: usize,
    history: Mutex<Vec<ChatMessage>>,
    open: AtomicBool,
    reset: AtomicBool,
}

impl ApiSurface {
    pub fn new(client: LlmClient, max_history: usize) -> Self {
        Self {
            client,
            max_history,
            history: Mutex::new(Vec::new()),
            open: AtomicBool::new(false),
            reset: AtomicBool::new(false),
        }
    }

    fn close_now(&self, history: &mut Vec<ChatMessage>) {
        history.clear();
        self.open.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl AutomationSurface for ApiSurface {
    async fn acquire_session(&self, service_hint: &str) -> bool {
        if !self.client.has_credentials() {
            warn!("No API credentials, cannot open a conversation for '{service_hint}'");
            return false;
        }
        self.history.lock().await.clear();
        self.reset.store(false, Ordering::SeqCst);
        self.open.store(true, Ordering::SeqCst);
        info!("Conversation opened for '{service_hint}'");
        true
    }

    async fn resync(&self, service_hint: &str) -> bool {
        if !self.open.load(Ordering::SeqCst) {
            return false;
        }
        self.history.lock().await.clear();
        debug!("Conversation restarted for '{service_hint}'");
        true
    }

    async fn run_chain(&self, steps: &[PromptStep], options: ChainOptions) -> ChainResult {
        let mut history = self.history.lock().await;

        if !self.open.load(Ordering::SeqCst) {
            return ChainResult::failure();
        }
        if options.grant_capabilities && !self.client.has_credentials() {
            warn!("API credentials missing");
            return ChainResult::failure();
        }

        // Each step adds a user and an assistant turn.
        let needed = history.len() + steps.len() * 2;
        if needed > self.max_history && !history.is_empty() {
            warn!(
                "Conversation would grow to {needed} messages (cap {}), dropping history",
                self.max_history
            );
            history.clear();
            self.reset.store(true, Ordering::SeqCst);
            return ChainResult::failure();
        }

        let attempts = if options.allow_retry { MAX_ATTEMPTS } else { 1 };
        let mut payload = Vec::new();
        // A failed chain leaves no trace; the caller resends it whole.
        let chain_start = history.len();

        for step in steps {
            history.push(ChatMessage::user(step.text.as_str()));

            if !step.copy_output {
                history.push(ChatMessage::assistant(CONTEXT_ACK));
                continue;
            }

            let call = self.client.call_text(CONVERSATION_SYSTEM, &history, attempts);
            let outcome = tokio::time::timeout(step.timeout, call).await;
            let reply = match outcome {
                Ok(Ok(reply)) => reply,
                Ok(Err(e)) => {
                    warn!("Conversation step failed: {e}");
                    history.truncate(chain_start);
                    return ChainResult::failure();
                }
                Err(_) => {
                    warn!("Conversation step timed out after {}s", step.timeout.as_secs());
                    history.truncate(chain_start);
                    return ChainResult::failure();
                }
            };

            history.push(ChatMessage::assistant(reply.as_str()));

            let text = strip_json_fences(&reply);
            payload.push(if step.strip_punctuation {
                normalize_chars(text)
            } else {
                text.to_string()
            });
        }

        if !options.leave_open {
            self.close_now(&mut history);
        }

        ChainResult::ok(payload)
    }

    async fn close_session(&self) {
        let mut history = self.history.lock().await;
        self.close_now(&mut history);
        info!("Conversation closed");
    }

    fn is_session_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn take_reset(&self) -> bool {
        self.reset.swap(false, Ordering::SeqCst)
    }
}
