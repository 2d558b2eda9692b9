//! Checkout configuration loaded from environment variables.

use std::str::FromStr;

use orders::HashToken;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown stacking policy: {0} (expected \"single\" or \"stack\")")]
    UnknownStackingPolicy(String),

    #[error("Order token secret is not a usable HMAC key")]
    InvalidTokenSecret,
}

/// How many eligible offers a checkout applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackingPolicy {
    /// Only the highest-ranked eligible offer.
    #[default]
    SingleBest,

    /// Eligible offers in rank order. An exclusive offer is applied alone when
    /// it is the first to take effect and stops the stack anywhere else.
    StackByPriority,
}

impl StackingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            StackingPolicy::SingleBest => "single",
            StackingPolicy::StackByPriority => "stack",
        }
    }
}

impl FromStr for StackingPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" | "single_best" => Ok(StackingPolicy::SingleBest),
            "stack" | "stack_by_priority" => Ok(StackingPolicy::StackByPriority),
            other => Err(ConfigError::UnknownStackingPolicy(other.to_string())),
        }
    }
}

impl std::fmt::Display for StackingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checkout configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `OFFER_STACKING`: `single` or `stack` (default: `single`)
/// - `ORDER_TOKEN_SECRET`: enables keyed lookup tokens when set
/// - `DATABASE_URL`: connection string for the PostgreSQL adapters
#[derive(Debug, Clone, Default)]
pub struct CheckoutConfig {
    pub stacking: StackingPolicy,
    pub token_secret: Option<String>,
    pub database_url: Option<String>,
}

impl CheckoutConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults.
    ///
    /// An unknown stacking policy is logged and replaced by the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let stacking = match lookup("OFFER_STACKING").map(|value| value.parse()) {
            Some(Ok(policy)) => policy,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "falling back to default stacking policy");
                StackingPolicy::default()
            }
            None => StackingPolicy::default(),
        };

        Self {
            stacking,
            token_secret: lookup("ORDER_TOKEN_SECRET").filter(|s| !s.is_empty()),
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
        }
    }

    /// Builds the lookup token scheme: keyed when a secret is configured.
    pub fn tokens(&self) -> Result<HashToken, ConfigError> {
        match &self.token_secret {
            Some(secret) => HashToken::keyed(secret).map_err(|_| ConfigError::InvalidTokenSecret),
            None => Ok(HashToken::unkeyed()),
        }
    }
}
