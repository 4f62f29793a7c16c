//! Resolution Engine — drives a batch of form questions to answers through the
//! conversation session, retrying only what failed.
//!
//! Flow per round: redact profile → acquire session → loop {
//!   build chain for remaining questions → run chain → verify payload count →
//!   parse each answer → keep the failures for the next attempt }.
//!
//! Transport failures retry the whole remaining set; parse failures retry only
//! the question that failed. Whatever is still unresolved when the attempts run
//! out comes back as `response: null`, never as an error.

pub mod handlers;
pub mod parse;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::profile::{redact, ProfileError, ProfileStore, REDACTED_PATHS};
use crate::prompting::{build_chain, JobDetails, Question};
use crate::resolution::parse::parse_response;
use crate::session::{ChainOptions, ConversationSession};

pub const DEFAULT_SERVICE_NAME: &str = "resolve-questions-with-llm";
pub const DEFAULT_MAX_RETRIES: u32 = 2;
/// Upper bound on retries per round; each attempt can take minutes.
pub const MAX_RETRIES_LIMIT: u32 = 10;
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Final answer slot for one question. `response` stays `None` when unresolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRecord {
    pub question_id: String,
    pub response: Option<Value>,
}

impl ResolutionRecord {
    fn pending(question_id: &str) -> Self {
        Self {
            question_id: question_id.to_string(),
            response: None,
        }
    }
}

pub struct ResolutionEngine {
    session: Arc<ConversationSession>,
    profile_store: Arc<dyn ProfileStore>,
    service_name: String,
    retry_backoff: Duration,
    redacted_paths: Vec<String>,
}

impl ResolutionEngine {
    pub fn new(
        session: Arc<ConversationSession>,
        profile_store: Arc<dyn ProfileStore>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            session,
            profile_store,
            service_name: service_name.into(),
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            redacted_paths: REDACTED_PATHS.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn session(&self) -> &Arc<ConversationSession> {
        &self.session
    }

    /// Public entry point: reads a fresh profile snapshot and resolves the batch.
    ///
    /// Only a profile that cannot be loaded is an error; everything that goes
    /// wrong with the backend degrades to `null` responses.
    pub async fn resolve(
        &self,
        questions: &[Question],
        job: &JobDetails,
        max_retries: u32,
    ) -> Result<Vec<ResolutionRecord>, ProfileError> {
        let profile = self.profile_store.load().await?;
        Ok(self
            .resolve_with_profile(&profile, questions, job, max_retries)
            .await)
    }

    /// Resolves the batch against an already loaded profile.
    ///
    /// The output has one record per question, in input order.
    pub async fn resolve_with_profile(
        &self,
        profile: &Value,
        questions: &[Question],
        job: &JobDetails,
        max_retries: u32,
    ) -> Vec<ResolutionRecord> {
        let _round = self.session.begin_round().await;
        let span = info_span!(
            "resolution_round",
            round_id = %Uuid::new_v4(),
            service = %self.service_name
        );
        self.run_round(profile, questions, job, max_retries)
            .instrument(span)
            .await
    }

    async fn run_round(
        &self,
        profile: &Value,
        questions: &[Question],
        job: &JobDetails,
        max_retries: u32,
    ) -> Vec<ResolutionRecord> {
        info!("Starting resolution of {} question(s)", questions.len());

        let working = redact(profile, &self.redacted_paths);
        let mut records: Vec<ResolutionRecord> = questions
            .iter()
            .map(|q| ResolutionRecord::pending(&q.id))
            .collect();

        let reused = self.session.is_open_for(&self.service_name).await;
        if !self.session.acquire(&self.service_name).await {
            warn!(
                "Could not acquire session; returning 0/{} resolved",
                questions.len()
            );
            return records;
        }

        // Whether the preambles are known to be in the conversation already.
        let mut context_delivered = reused;
        let mut fresh_session = !reused;
        let mut remaining: Vec<usize> = (0..questions.len()).collect();
        let mut dropped = 0usize;

        for attempt in 0..=max_retries {
            if remaining.is_empty() {
                break;
            }
            if attempt > 0 {
                tokio::time::sleep(self.retry_backoff).await;
            }

            info!(
                "Attempt {}/{}: resolving {} question(s)",
                attempt + 1,
                max_retries + 1,
                remaining.len()
            );

            let pending_reset = self.session.pending_reset().await;
            let reset = pending_reset.is_some();
            if reset {
                warn!("Backend reset observed; resending context preambles");
                context_delivered = false;
            }
            let include_preambles = !context_delivered;

            let batch: Vec<Question> = remaining.iter().map(|&i| questions[i].clone()).collect();
            let chain = match build_chain(
                &working,
                job,
                &batch,
                include_preambles,
                include_preambles,
            ) {
                Ok(chain) => chain,
                Err(e) => {
                    error!("Failed to build prompt chain: {e}");
                    break;
                }
            };

            if !chain.skipped.is_empty() {
                let skipped: HashSet<usize> = chain
                    .skipped
                    .iter()
                    .map(|s| {
                        let idx = remaining[s.index];
                        warn!(question_id = %questions[idx].id, "Dropping question: {}", s.error);
                        idx
                    })
                    .collect();
                remaining.retain(|idx| !skipped.contains(idx));
                dropped += skipped.len();
                if remaining.is_empty() {
                    break;
                }
            }

            let options = ChainOptions {
                leave_open: true,
                grant_capabilities: fresh_session || reset,
                allow_retry: false,
            };
            let result = self.session.run_chain(&chain.steps, options).await;

            if !result.success {
                warn!(
                    "Prompt chain failed; retrying {} question(s)",
                    remaining.len()
                );
                continue;
            }

            if result.payload.len() != chain.answer_count() {
                warn!(
                    "Payload length mismatch: expected {}, got {}",
                    chain.answer_count(),
                    result.payload.len()
                );
                continue;
            }

            if include_preambles {
                if let Some(generation) = pending_reset {
                    self.session.clear_reset_through(generation).await;
                }
            }
            context_delivered = true;
            fresh_session = false;

            let mut failed = Vec::new();
            for (&idx, raw) in remaining.iter().zip(&result.payload) {
                let question = &questions[idx];
                let Ok(kind) = question.kind() else {
                    // Unreachable after the skip pass; drop rather than loop on it.
                    dropped += 1;
                    continue;
                };
                match parse_response(raw, question, kind) {
                    Ok(value) => {
                        records[idx].response = (!value.is_null()).then_some(value);
                    }
                    Err(e) => {
                        warn!(question_id = %question.id, "Parsing failed: {e}");
                        debug!("Raw response: {raw}");
                        failed.push(idx);
                    }
                }
            }

            if !failed.is_empty() {
                warn!("{} question(s) failed parsing", failed.len());
            }
            remaining = failed;
        }

        if !remaining.is_empty() {
            warn!("{} question(s) unresolved after retries", remaining.len());
        }
        info!(
            "Returning answers: {}/{} resolved",
            questions.len() - remaining.len() - dropped,
            questions.len()
        );

        records
    }
}
