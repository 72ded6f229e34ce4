//! Configuration for the perpetuals trading client
//!
//! Loaded from a TOML file, then overridden from the environment (a `.env`
//! file is honoured). Every field has a default so an empty file is valid.

use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::program::DEFAULT_PROGRAM_ID;
use crate::tx_builder::slippage::{BPS_DENOMINATOR, DEFAULT_SLIPPAGE_BPS};

pub const ENV_RPC_URL: &str = "PERPS_RPC_URL";
pub const ENV_PROGRAM_ID: &str = "PERPS_PROGRAM_ID";
pub const ENV_SLIPPAGE_BPS: &str = "PERPS_SLIPPAGE_BPS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// `processed`, `confirmed` or `finalized`
    #[serde(default = "default_commitment")]
    pub commitment: String,

    /// Perpetuals program id (base58)
    #[serde(default = "default_program_id")]
    pub program_id: String,

    /// One-sided price tolerance for submitted prices
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u16,

    /// Upper bound on finality polling
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Decimals used when rendering balance shortfalls
    #[serde(default = "default_native_decimals")]
    pub native_decimals: u8,
}

// Default value functions
fn default_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}
fn default_commitment() -> String {
    "confirmed".to_string()
}
fn default_program_id() -> String {
    DEFAULT_PROGRAM_ID.to_string()
}
fn default_slippage_bps() -> u16 {
    DEFAULT_SLIPPAGE_BPS
}
fn default_confirm_timeout_secs() -> u64 {
    90
}
fn default_poll_interval_ms() -> u64 {
    500
}
fn default_native_decimals() -> u8 {
    crate::diagnosis::NATIVE_DECIMALS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            commitment: default_commitment(),
            program_id: default_program_id(),
            slippage_bps: default_slippage_bps(),
            confirm_timeout_secs: default_confirm_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            native_decimals: default_native_decimals(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration with environment variable overrides, then validate.
    pub fn from_file_with_env(path: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `PERPS_*` environment variables on top of the loaded values.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup(ENV_RPC_URL) {
            self.rpc_url = url;
        }
        if let Some(program_id) = lookup(ENV_PROGRAM_ID) {
            self.program_id = program_id;
        }
        if let Some(bps) = lookup(ENV_SLIPPAGE_BPS) {
            self.slippage_bps = bps
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid("slippage_bps", format!("{}: {}", bps, e)))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if u64::from(self.slippage_bps) >= BPS_DENOMINATOR {
            return Err(ConfigError::invalid(
                "slippage_bps",
                format!("{} must be below {}", self.slippage_bps, BPS_DENOMINATOR),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::invalid("poll_interval_ms", "must be non-zero"));
        }
        if self.confirm_timeout_secs == 0 {
            return Err(ConfigError::invalid("confirm_timeout_secs", "must be non-zero"));
        }
        self.program_id()?;
        self.commitment()?;
        Ok(())
    }

    pub fn program_id(&self) -> Result<Pubkey, ConfigError> {
        Pubkey::from_str(&self.program_id)
            .map_err(|e| ConfigError::invalid("program_id", format!("{}: {}", self.program_id, e)))
    }

    pub fn commitment(&self) -> Result<CommitmentConfig, ConfigError> {
        match self.commitment.as_str() {
            "processed" => Ok(CommitmentConfig::processed()),
            "confirmed" => Ok(CommitmentConfig::confirmed()),
            "finalized" => Ok(CommitmentConfig::finalized()),
            other => Err(ConfigError::invalid(
                "commitment",
                format!("unknown level {:?}", other),
            )),
        }
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
