//! Reservation engine configuration.
//!
//! Values come from `CARTSTOCK_*` environment variables or any serde source
//! (e.g. a JSON/TOML config section). Unset values fall back to defaults.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cartstock_core::{DomainError, DomainResult};

/// How many units an add-to-cart reserves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddQuantityPolicy {
    /// Reserve exactly what the caller asked for.
    #[default]
    Requested,
    /// Reserve one unit regardless of the requested quantity.
    SingleUnit,
}

impl AddQuantityPolicy {
    pub fn resolve(self, requested: u32) -> u32 {
        match self {
            AddQuantityPolicy::Requested => requested,
            AddQuantityPolicy::SingleUnit => 1,
        }
    }
}

impl FromStr for AddQuantityPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "requested" => Ok(Self::Requested),
            "single_unit" | "single" => Ok(Self::SingleUnit),
            other => Err(ConfigError::invalid(EngineConfig::ENV_ADD_POLICY, other)),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl ConfigError {
    fn invalid(key: &'static str, value: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            value: value.into(),
        }
    }
}

/// Reservation engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub add_quantity_policy: AddQuantityPolicy,
    /// Upper bound on the quantity of a single cart line.
    pub max_line_quantity: Option<u32>,
}

impl EngineConfig {
    pub const ENV_ADD_POLICY: &'static str = "CARTSTOCK_ADD_POLICY";
    pub const ENV_MAX_LINE_QUANTITY: &'static str = "CARTSTOCK_MAX_LINE_QUANTITY";

    /// Load from process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (tests pass a map here).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(Self::ENV_ADD_POLICY) {
            config.add_quantity_policy = raw.parse()?;
        }

        if let Some(raw) = lookup(Self::ENV_MAX_LINE_QUANTITY) {
            let max = raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|m| *m > 0)
                .ok_or_else(|| ConfigError::invalid(Self::ENV_MAX_LINE_QUANTITY, raw.clone()))?;
            config.max_line_quantity = Some(max);
        }

        Ok(config)
    }

    pub fn with_add_quantity_policy(mut self, policy: AddQuantityPolicy) -> Self {
        self.add_quantity_policy = policy;
        self
    }

    pub fn with_max_line_quantity(mut self, max: u32) -> Self {
        self.max_line_quantity = Some(max);
        self
    }

    /// Validate a line quantity against the configured bounds.
    pub fn check_line_quantity(&self, quantity: u32) -> DomainResult<()> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        match self.max_line_quantity {
            Some(max) if quantity > max => Err(DomainError::validation(format!(
                "quantity {quantity} exceeds the per-line maximum of {max}"
            ))),
            _ => Ok(()),
        }
    }
}
