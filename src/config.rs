//! Store configuration
//!
//! Everything the cart needs to know about a shop, loaded from one YAML file.

use std::{fs, path::Path, time::Duration};

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    cart::{
        CartEngine,
        bogo::BogoConfig,
        gifts::{Audience, GiftTiers, GiftTiersConfig},
    },
    checkout::CheckoutSettings,
    discounts::DEFAULT_UPSELL_PERCENT,
    money::{CurrencyContext, CurrencyError},
    quiz::DEFAULT_QUIZ_URL,
};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading the configuration file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid currency settings
    #[error("Invalid currency settings: {0}")]
    Currency(#[from] CurrencyError),

    /// Upsell percent outside 0 to 100
    #[error("Upsell percent must be between 0 and 100, got {0}")]
    InvalidUpsellPercent(Decimal),

    /// A command needs the storefront but none is configured
    #[error("No storefront configured")]
    NoStorefront,
}

/// Base and active currency of the shop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CurrencySettings {
    /// ISO code thresholds are authored in
    pub base: String,

    /// ISO code prices are shown in, defaults to the base currency
    #[serde(default)]
    pub active: Option<String>,

    /// Rate converting base amounts into the active currency
    #[serde(default = "default_rate")]
    pub rate: Decimal,
}

fn default_rate() -> Decimal {
    Decimal::ONE
}

/// Storefront connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorefrontSettings {
    /// Storefront origin, e.g. `https://shop.example.com`
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl StorefrontSettings {
    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// The store configuration file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoreConfig {
    /// Currency settings
    pub currency: CurrencySettings,

    /// BOGO promotion
    #[serde(default)]
    pub bogo: BogoConfig,

    /// Gift tiers
    #[serde(default)]
    pub gift_tiers: GiftTiersConfig,

    /// Percentage taken off upsell package lines
    #[serde(default = "default_upsell_percent")]
    pub upsell_percent: Decimal,

    /// Checkout settings
    #[serde(default)]
    pub checkout: CheckoutSettings,

    /// Storefront to submit to
    #[serde(default)]
    pub storefront: Option<StorefrontSettings>,

    /// Where shoppers take the quiz
    #[serde(default = "default_quiz_url")]
    pub quiz_url: String,
}

fn default_upsell_percent() -> Decimal {
    DEFAULT_UPSELL_PERCENT
}

fn default_quiz_url() -> String {
    DEFAULT_QUIZ_URL.to_string()
}

impl StoreConfig {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;

        Self::from_yaml(&contents)
    }

    /// Parse and validate a configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be parsed or validated.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_norway::from_str(contents)?;

        config.currency_context()?;

        if !(Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(&config.upsell_percent) {
            return Err(ConfigError::InvalidUpsellPercent(config.upsell_percent));
        }

        Ok(config)
    }

    /// Currency context of the shop.
    ///
    /// # Errors
    ///
    /// Returns an error if the base currency is unknown or the rate is not positive.
    pub fn currency_context(&self) -> Result<CurrencyContext, ConfigError> {
        let active = self
            .currency
            .active
            .as_deref()
            .unwrap_or(&self.currency.base);

        Ok(CurrencyContext::new(
            &self.currency.base,
            active,
            self.currency.rate,
        )?)
    }

    /// Storefront settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoStorefront`] when none are configured.
    pub fn storefront(&self) -> Result<&StorefrontSettings, ConfigError> {
        self.storefront.as_ref().ok_or(ConfigError::NoStorefront)
    }

    /// An empty cart configured for this shop and audience.
    ///
    /// # Errors
    ///
    /// Returns an error if the currency settings are invalid.
    pub fn engine(&self, audience: Audience) -> Result<CartEngine, ConfigError> {
        Ok(CartEngine::new(self.currency_context()?)
            .with_bogo(self.bogo.clone())
            .with_gift_tiers(GiftTiers::from_config(&self.gift_tiers, audience))
            .with_upsell_percent(self.upsell_percent))
    }
}
