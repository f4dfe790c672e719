//! Layer identities
//!
//! A layer is referenced by a [`LayerId`] rather than its position, so
//! reordering layers never breaks a reference. The id is a structured
//! `{name, discriminator}` pair; the opaque string form only exists at the
//! persistence boundary.

use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Error type for identity decoding
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The opaque payload is not base64 or not a `{name, randomNumber}` pair
    #[error("invalid layer identity '{id}': {reason}")]
    InvalidIdentity { id: String, reason: String },
}

/// Stable identity of a layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayerId {
    pub name: String,
    pub discriminator: u32,
}

/// Wire shape of the decoded payload.
#[derive(Serialize, Deserialize)]
struct IdPayload {
    name: String,
    #[serde(rename = "randomNumber")]
    random_number: u32,
}

impl LayerId {
    /// Generate a new identity for a layer called `name`.
    pub fn generate(name: &str) -> Self {
        Self {
            name: name.to_string(),
            discriminator: random_discriminator(),
        }
    }

    /// Opaque string form: base64 of `{"name": ..., "randomNumber": ...}`.
    pub fn encode(&self) -> String {
        let payload = IdPayload {
            name: self.name.clone(),
            random_number: self.discriminator,
        };
        let json = serde_json::to_string(&payload).unwrap_or_default();
        base64::engine::general_purpose::STANDARD.encode(json)
    }

    /// Parse the opaque string form back into a structured id.
    pub fn decode(id: &str) -> Result<Self, IdentityError> {
        let invalid = |reason: String| IdentityError::InvalidIdentity {
            id: id.to_string(),
            reason,
        };

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(id)
            .map_err(|e| invalid(e.to_string()))?;
        let payload: IdPayload =
            serde_json::from_slice(&bytes).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            name: payload.name,
            discriminator: payload.random_number,
        })
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{:08x}", self.name, self.discriminator)
    }
}

impl Serialize for LayerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for LayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        LayerId::decode(&s).map_err(serde::de::Error::custom)
    }
}

static FALLBACK_COUNTER: AtomicU32 = AtomicU32::new(0);

fn random_discriminator() -> u32 {
    match getrandom::u32() {
        Ok(n) => n,
        Err(e) => {
            // No OS entropy: mix the clock with a process-wide counter.
            tracing::debug!(error = %e, "getrandom unavailable, using clock-derived discriminator");
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.subsec_nanos() ^ (d.as_secs() as u32))
                .unwrap_or_default();
            nanos
                .wrapping_mul(0x9E37_79B9)
                .wrapping_add(FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed))
        }
    }
}
