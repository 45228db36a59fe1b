//! Authentication module for API key verification.
//!
//! Identity management lives outside this service; the API only needs to map
//! a presented key to a requester name that gets recorded on the job.

mod extractor;

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use crate::config::ApiKeyEntry;

pub use extractor::{AuthError, Requester, ANONYMOUS_REQUESTER};

/// Configured API keys.
///
/// Uses `SecretString` to prevent accidental logging and zeroize on drop.
#[derive(Clone, Default)]
pub struct ApiKeys(Vec<(String, SecretString)>);

impl ApiKeys {
    pub fn new(entries: Vec<ApiKeyEntry>) -> Self {
        Self(
            entries
                .into_iter()
                .map(|e| (e.name, SecretString::from(e.key)))
                .collect(),
        )
    }

    /// True when no keys are configured and requests are accepted anonymously.
    pub fn is_open(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve the requester name for a presented key.
    ///
    /// Every configured key is compared in constant time, without stopping at
    /// the first match.
    pub fn verify(&self, provided: &str) -> Option<&str> {
        let mut matched = None;
        for (name, secret) in &self.0 {
            let equal: bool = secret
                .expose_secret()
                .as_bytes()
                .ct_eq(provided.as_bytes())
                .into();
            if equal && matched.is_none() {
                matched = Some(name.as_str());
            }
        }
        matched
    }
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|(name, _)| name.as_str()).collect();
        write!(f, "ApiKeys({:?}, [REDACTED])", names)
    }
}
