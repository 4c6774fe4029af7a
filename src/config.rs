// PROTOCOL CONFIGURATION
// Layered: built-in defaults → optional config file → MANIFOLD__* environment
//
// Example: MANIFOLD__ACTIVATION_DELAY_SECS=600 MANIFOLD__FEE__ENABLED=true

use manifold_crypto::{ContentAddresser, MAX_CODE_SIZE};
use manifold_staging::FeeConfig;
use manifold_types::{Address, ErrorKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const ENV_PREFIX: &str = "MANIFOLD";

/// One day, the usual observation window for a pending root.
pub const DEFAULT_ACTIVATION_DELAY_SECS: u64 = 86_400;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidInput
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSettings {
    pub amount: u128,
    pub enabled: bool,
    pub recipient: Address,
}

impl Default for FeeSettings {
    fn default() -> Self {
        FeeSettings {
            amount: 0,
            enabled: false,
            recipient: Address::zero(),
        }
    }
}

impl From<&FeeSettings> for FeeConfig {
    fn from(settings: &FeeSettings) -> Self {
        FeeConfig {
            amount: settings.amount,
            enabled: settings.enabled,
            recipient: settings.recipient,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub chain_id: u64,

    /// Factory address that performs every staging deployment
    pub deployer: Address,

    /// Label hashed into the salt namespace
    pub namespace: String,

    pub activation_delay_secs: u64,
    pub max_code_size: usize,
    pub fee: FeeSettings,

    /// Storage context facets execute in
    pub dispatcher: Address,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        ProtocolConfig {
            chain_id: 1,
            deployer: Address::zero(),
            namespace: "manifold.chunks.v1".to_string(),
            activation_delay_secs: DEFAULT_ACTIVATION_DELAY_SECS,
            max_code_size: MAX_CODE_SIZE,
            fee: FeeSettings::default(),
            dispatcher: Address::zero(),
        }
    }
}

impl ProtocolConfig {
    /// Load and validate. `path` may be any format the `config` crate
    /// recognises by extension (TOML, JSON, YAML).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let loaded: ProtocolConfig = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_code_size == 0 || self.max_code_size > MAX_CODE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "max_code_size must be within 1..={}, got {}",
                MAX_CODE_SIZE, self.max_code_size
            )));
        }
        if self.namespace.is_empty() {
            return Err(ConfigError::Invalid("namespace label is empty".into()));
        }
        FeeConfig::from(&self.fee)
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    pub fn addresser(&self) -> ContentAddresser {
        ContentAddresser::with_label(self.deployer, &self.namespace)
    }

    pub fn fee_config(&self) -> FeeConfig {
        FeeConfig::from(&self.fee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ProtocolConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.fee.enabled);
        assert_eq!(config.max_code_size, 24_576);
    }

    #[test]
    fn test_code_size_bounds() {
        let mut config = ProtocolConfig::default();
        config.max_code_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.max_code_size = MAX_CODE_SIZE + 1;
        assert!(config.validate().is_err());
        config.max_code_size = 1024;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_enabled_fee_needs_recipient() {
        let mut config = ProtocolConfig::default();
        config.fee.enabled = true;
        config.fee.amount = 10;
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        config.fee.recipient = Address::repeat_byte(0xfe);
        assert!(config.validate().is_ok());
        assert_eq!(config.fee_config().required(), 10);
    }

    #[test]
    fn test_fee_amount_keeps_full_width() {
        let mut config = ProtocolConfig::default();
        config.fee.enabled = true;
        config.fee.recipient = Address::repeat_byte(0xfe);
        config.fee.amount = u128::from(u64::MAX) + 1;

        assert!(config.validate().is_ok());
        assert_eq!(config.fee_config().required(), u128::from(u64::MAX) + 1);
        assert_eq!(config.fee_config(), FeeConfig::from(&config.fee));
    }
}
