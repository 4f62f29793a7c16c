//! Nearest address — picks the stored profile address closest to a job's
//! location(s).
//!
//! Runs over the same conversation session as question resolution, under its
//! own service name, so acquiring it relabels (resyncs) the session. The reply
//! is never trusted verbatim: it is fuzzy-matched back to a stored address.

pub mod handlers;
pub mod prompts;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::addressing;
use crate::profile::{ProfileError, ProfileStore};
use crate::prompting::builder::fill;
use crate::prompting::PromptStep;
use crate::resolution::parse::strip_json_fences;
use crate::session::{ChainOptions, ConversationSession};
use prompts::{ADDRESS_QUERY_PROMPT, ADDRESS_SYSTEM_PROMPT};

pub const ADDRESS_SERVICE_NAME: &str = "get-nearest-address";
pub const ADDRESS_STEP_TIMEOUT: Duration = Duration::from_secs(12);
pub const DEFAULT_ADDRESS_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(5);
const ADDRESSES_PATH: &str = "addresses";

#[derive(Debug, Error)]
pub enum AddressLookupError {
    #[error("No location provided")]
    NoLocation,

    #[error("No addresses available in the profile")]
    NoAddresses,

    #[error("Conversation session unavailable")]
    SessionUnavailable,

    #[error("Unable to find a matching address")]
    NoMatch,

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error("Failed to serialize locations: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One stored postal address, as kept under `addresses` in the profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    /// Non-empty fields joined with `", "`.
    pub fn inline(&self) -> String {
        [
            &self.address_line1,
            &self.address_line2,
            &self.city,
            &self.state,
            &self.postal_code,
            &self.country,
        ]
        .iter()
        .map(|field| field.trim())
        .filter(|field| !field.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// A single location, or several that the chosen address should suit together.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LocationQuery {
    One(String),
    Many(Vec<String>),
}

impl LocationQuery {
    /// Text spliced into the query prompt; `None` when nothing usable was given.
    fn prompt_text(&self) -> Result<Option<String>, serde_json::Error> {
        match self {
            LocationQuery::One(location) => {
                let location = location.trim();
                Ok((!location.is_empty()).then(|| location.to_string()))
            }
            LocationQuery::Many(locations) => {
                let locations: Vec<&str> = locations
                    .iter()
                    .map(|l| l.trim())
                    .filter(|l| !l.is_empty())
                    .collect();
                if locations.is_empty() {
                    Ok(None)
                } else {
                    serde_json::to_string_pretty(&locations).map(Some)
                }
            }
        }
    }
}

pub struct NearestAddressFinder {
    session: Arc<ConversationSession>,
    profile_store: Arc<dyn ProfileStore>,
    service_name: String,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl NearestAddressFinder {
    pub fn new(session: Arc<ConversationSession>, profile_store: Arc<dyn ProfileStore>) -> Self {
        Self {
            session,
            profile_store,
            service_name: ADDRESS_SERVICE_NAME.to_string(),
            max_attempts: DEFAULT_ADDRESS_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Returns the stored address nearest to `location`.
    pub async fn find(&self, location: &LocationQuery) -> Result<Address, AddressLookupError> {
        let locations = location
            .prompt_text()?
            .ok_or(AddressLookupError::NoLocation)?;

        let profile = self.profile_store.load().await?;
        let addresses = stored_addresses(&profile);
        if addresses.is_empty() {
            return Err(AddressLookupError::NoAddresses);
        }

        let _round = self.session.begin_round().await;
        let span = info_span!("address_lookup", lookup_id = %Uuid::new_v4());
        self.lookup(&locations, &addresses).instrument(span).await
    }

    async fn lookup(
        &self,
        locations: &str,
        addresses: &[Address],
    ) -> Result<Address, AddressLookupError> {
        info!("Looking up nearest of {} address(es)", addresses.len());

        // Any open session already holds its capability grants, whatever its label.
        let fresh_session = !self.session.snapshot().await.is_open;
        if !self.session.acquire(&self.service_name).await {
            return Err(AddressLookupError::SessionUnavailable);
        }

        let steps = build_address_chain(locations, addresses);

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.retry_backoff).await;
            }

            let reset = self.session.reset_occurred().await;
            let options = ChainOptions {
                leave_open: true,
                grant_capabilities: fresh_session || reset,
                allow_retry: false,
            };
            let result = self.session.run_chain(&steps, options).await;

            if !result.success {
                warn!("Address chain failed (attempt {})", attempt + 1);
                continue;
            }
            let [raw] = result.payload.as_slice() else {
                warn!("Expected one address reply, got {}", result.payload.len());
                continue;
            };

            match match_reply(raw, addresses) {
                Some(address) => {
                    info!("Nearest address: {}", address.city);
                    return Ok(address.clone());
                }
                None => {
                    warn!("Address reply could not be matched");
                    debug!("Raw reply: {raw}");
                }
            }
        }

        Err(AddressLookupError::NoMatch)
    }
}

/// Stored addresses with at least one non-empty field. Malformed entries are skipped.
fn stored_addresses(profile: &Value) -> Vec<Address> {
    let Ok(Some(Value::Array(entries))) = addressing::get(profile, ADDRESSES_PATH) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| serde_json::from_value::<Address>(entry.clone()).ok())
        .filter(|address| !address.inline().is_empty())
        .collect()
}

fn build_address_chain(locations: &str, addresses: &[Address]) -> Vec<PromptStep> {
    let address_lines = addresses
        .iter()
        .map(|a| format!("• {}", a.inline()))
        .collect::<Vec<_>>()
        .join("\n");

    vec![
        PromptStep {
            text: fill(ADDRESS_SYSTEM_PROMPT, &[("address_lines", address_lines.as_str())]),
            copy_output: false,
            timeout: ADDRESS_STEP_TIMEOUT,
            strip_punctuation: false,
        },
        PromptStep {
            text: fill(ADDRESS_QUERY_PROMPT, &[("locations", locations)]),
            copy_output: true,
            timeout: ADDRESS_STEP_TIMEOUT,
            strip_punctuation: false,
        },
    ]
}

/// Maps a reply onto the most similar stored address.
fn match_reply<'a>(raw: &str, addresses: &'a [Address]) -> Option<&'a Address> {
    let reply: Address = serde_json::from_str(strip_json_fences(raw)).ok()?;
    let wanted = reply.inline().to_lowercase();
    if wanted.is_empty() {
        return None;
    }

    addresses
        .iter()
        .map(|address| {
            let score = strsim::normalized_levenshtein(&wanted, &address.inline().to_lowercase());
            (address, score)
        })
        .filter(|(_, score)| *score > 0.0)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(address, _)| address)
}
