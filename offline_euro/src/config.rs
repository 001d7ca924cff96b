//! Protocol configuration, deserialized from TOML. Every field has a default so an empty document
//! yields [`ProtocolConfig::default`].
//!
//! ```toml
//! ttp_name = "TTP"
//!
//! [network]
//! reply_timeout_ms = 10000
//!
//! [fees]
//! base_bp = 100
//! per_day_bp = 50
//! per_transfer_bp = 100
//! cap_bp = 5000
//!
//! [identity]
//! max_polls = 150
//! poll_backoff_ms = 200
//! ```

use crate::error::OfflineEuroError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TTP_NAME: &str = "TTP";
const DEFAULT_REPLY_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_BASE_BP: u64 = 100;
const DEFAULT_PER_DAY_BP: u64 = 50;
const DEFAULT_PER_TRANSFER_BP: u64 = 100;
const DEFAULT_CAP_BP: u64 = 5_000;
const DEFAULT_MAX_POLLS: u32 = 150;
const DEFAULT_POLL_BACKOFF_MS: u64 = 200;

/// One basis point is 1/10000
pub const BASIS_POINTS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default = "default_ttp_name")]
    pub ttp_name: String,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub fees: FeeConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            ttp_name: DEFAULT_TTP_NAME.into(),
            network: NetworkConfig::default(),
            fees: FeeConfig::default(),
            identity: IdentityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            reply_timeout_ms: DEFAULT_REPLY_TIMEOUT_MS,
        }
    }
}

/// Transfer fee in basis points: `base + whole days held * per_day + transfers * per_transfer`,
/// at most `cap`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    #[serde(default = "default_base_bp")]
    pub base_bp: u64,
    #[serde(default = "default_per_day_bp")]
    pub per_day_bp: u64,
    #[serde(default = "default_per_transfer_bp")]
    pub per_transfer_bp: u64,
    #[serde(default = "default_cap_bp")]
    pub cap_bp: u64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            base_bp: DEFAULT_BASE_BP,
            per_day_bp: DEFAULT_PER_DAY_BP,
            per_transfer_bp: DEFAULT_PER_TRANSFER_BP,
            cap_bp: DEFAULT_CAP_BP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
    #[serde(default = "default_poll_backoff_ms")]
    pub poll_backoff_ms: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            max_polls: DEFAULT_MAX_POLLS,
            poll_backoff_ms: DEFAULT_POLL_BACKOFF_MS,
        }
    }
}

fn default_ttp_name() -> String {
    DEFAULT_TTP_NAME.into()
}

fn default_reply_timeout_ms() -> u64 {
    DEFAULT_REPLY_TIMEOUT_MS
}

fn default_base_bp() -> u64 {
    DEFAULT_BASE_BP
}

fn default_per_day_bp() -> u64 {
    DEFAULT_PER_DAY_BP
}

fn default_per_transfer_bp() -> u64 {
    DEFAULT_PER_TRANSFER_BP
}

fn default_cap_bp() -> u64 {
    DEFAULT_CAP_BP
}

fn default_max_polls() -> u32 {
    DEFAULT_MAX_POLLS
}

fn default_poll_backoff_ms() -> u64 {
    DEFAULT_POLL_BACKOFF_MS
}

impl ProtocolConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, OfflineEuroError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings under which the protocol cannot work
    pub fn validate(&self) -> Result<(), OfflineEuroError> {
        if self.ttp_name.is_empty() {
            return Err(OfflineEuroError::Config("ttp_name must not be empty".into()));
        }
        if self.network.reply_timeout_ms == 0 {
            return Err(OfflineEuroError::Config(
                "network.reply_timeout_ms must be positive".into(),
            ));
        }
        if self.fees.cap_bp > BASIS_POINTS {
            return Err(OfflineEuroError::Config(format!(
                "fees.cap_bp must be at most {}",
                BASIS_POINTS
            )));
        }
        if self.identity.max_polls == 0 {
            return Err(OfflineEuroError::Config(
                "identity.max_polls must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.network.reply_timeout_ms)
    }

    pub fn poll_backoff(&self) -> Duration {
        Duration::from_millis(self.identity.poll_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = ProtocolConfig::from_toml_str("").unwrap();
        assert_eq!(config, ProtocolConfig::default());
        assert_eq!(config.ttp_name, "TTP");
        assert_eq!(config.reply_timeout(), Duration::from_secs(10));
        assert_eq!(config.fees.base_bp, 100);
        assert_eq!(config.fees.cap_bp, 5000);
        assert_eq!(config.identity.max_polls, 150);
        assert_eq!(config.poll_backoff(), Duration::from_millis(200));
    }

    #[test]
    fn partial_document() {
        let config = ProtocolConfig::from_toml_str(
            r#"
            ttp_name = "Authority"

            [network]
            reply_timeout_ms = 250

            [fees]
            per_transfer_bp = 200
            "#,
        )
        .unwrap();
        assert_eq!(config.ttp_name, "Authority");
        assert_eq!(config.network.reply_timeout_ms, 250);
        assert_eq!(config.fees.per_transfer_bp, 200);
        assert_eq!(config.fees.base_bp, 100);
        assert_eq!(config.identity, IdentityConfig::default());
    }

    #[test]
    fn invalid_documents() {
        assert!(matches!(
            ProtocolConfig::from_toml_str("ttp_name = 5"),
            Err(OfflineEuroError::Config(_))
        ));
        assert!(matches!(
            ProtocolConfig::from_toml_str("[fees]\ncap_bp = 20000"),
            Err(OfflineEuroError::Config(_))
        ));
        assert!(matches!(
            ProtocolConfig::from_toml_str("[network]\nreply_timeout_ms = 0"),
            Err(OfflineEuroError::Config(_))
        ));
    }
}
