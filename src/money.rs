//! Money
//!
//! Amounts are carried as minor units (cents) in [`Decimal`] so fractional
//! results of percentage discounts survive until display. Rounding to a whole
//! minor unit only happens here, when an amount is turned into a string.

use rust_decimal::{Decimal, RoundingStrategy};
use rusty_money::{
    Money,
    iso::{self, Currency},
};
use thiserror::Error;
use tracing::warn;

/// Minor-unit exponent assumed for currencies the formatting backend does not know.
const FALLBACK_EXPONENT: u32 = 2;

/// Errors raised while building a currency context.
#[derive(Debug, Error, PartialEq)]
pub enum CurrencyError {
    /// The base currency code is not an ISO currency.
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Exchange rates must be strictly positive.
    #[error("Exchange rate must be positive, got {0}")]
    InvalidRate(Decimal),
}

/// The shop's base currency, the shopper's active currency and the published
/// rate converting base amounts into active amounts.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyContext {
    base: &'static Currency,
    active: String,
    rate: Decimal,
}

impl CurrencyContext {
    /// Create a context for a shopper viewing prices in `active_code`.
    ///
    /// The active currency is allowed to be unknown to the formatting backend;
    /// amounts in it are then rendered as plain `CODE amount` strings.
    ///
    /// # Errors
    ///
    /// Returns a [`CurrencyError`] if the base code is unknown or the rate is not positive.
    pub fn new(
        base_code: &str,
        active_code: &str,
        rate: Decimal,
    ) -> Result<Self, CurrencyError> {
        let base = iso::find(base_code)
            .ok_or_else(|| CurrencyError::UnknownCurrency(base_code.to_string()))?;

        if rate <= Decimal::ZERO {
            return Err(CurrencyError::InvalidRate(rate));
        }

        Ok(Self {
            base,
            active: active_code.to_ascii_uppercase(),
            rate,
        })
    }

    /// A context where the shopper views prices in the base currency.
    pub fn base_only(base: &'static Currency) -> Self {
        Self {
            base,
            active: base.iso_alpha_code.to_string(),
            rate: Decimal::ONE,
        }
    }

    /// The shop's base currency.
    pub fn base(&self) -> &'static Currency {
        self.base
    }

    /// ISO code of the active currency.
    pub fn active_code(&self) -> &str {
        &self.active
    }

    /// Rate converting base amounts into the active currency.
    pub fn rate(&self) -> Decimal {
        self.rate
    }

    /// Whether the shopper is viewing prices in the base currency.
    pub fn is_base(&self) -> bool {
        self.active == self.base.iso_alpha_code
    }

    /// Minor-unit exponent of the active currency.
    pub fn active_exponent(&self) -> u32 {
        iso::find(&self.active).map_or(FALLBACK_EXPONENT, |currency| currency.exponent)
    }

    /// Convert an amount in active-currency minor units into base-currency major units.
    pub fn active_minor_to_base_major(&self, active_minor: Decimal) -> Decimal {
        let major = minor_to_major(active_minor, self.active_exponent());

        if self.is_base() {
            major
        } else {
            major / self.rate
        }
    }

    /// Convert an amount in base-currency major units into active-currency major units.
    pub fn base_major_to_active_major(&self, base_major: Decimal) -> Decimal {
        if self.is_base() {
            base_major
        } else {
            base_major * self.rate
        }
    }
}

/// Renders minor-unit amounts as display strings in the active currency.
#[derive(Debug, Clone)]
pub struct MoneyFormatter {
    context: CurrencyContext,
}

impl MoneyFormatter {
    /// Create a formatter for the given currency context.
    pub fn new(context: CurrencyContext) -> Self {
        Self { context }
    }

    /// The currency context used by this formatter.
    pub fn context(&self) -> &CurrencyContext {
        &self.context
    }

    /// Format an amount given in base-currency minor units, converting it into
    /// the active currency with the published exchange rate.
    pub fn format(&self, base_minor: Decimal) -> String {
        let major = minor_to_major(base_minor, self.context.base.exponent);

        self.format_base_major(major)
    }

    /// Format an amount given in base-currency major units (gift thresholds).
    pub fn format_base_major(&self, base_major: Decimal) -> String {
        format_in(
            self.context.base_major_to_active_major(base_major),
            &self.context.active,
        )
    }

    /// Format an amount already expressed in active-currency minor units, such
    /// as the prices on a storefront product snapshot.
    pub fn format_active(&self, active_minor: Decimal) -> String {
        format_in(
            minor_to_major(active_minor, self.context.active_exponent()),
            &self.context.active,
        )
    }
}

/// Render a major-unit amount in the currency named by `code`.
///
/// Falls back to a plain `CODE 12.34` string when the code is not recognised;
/// formatting never fails.
pub fn format_in(major: Decimal, code: &str) -> String {
    if let Some(currency) = iso::find(code) {
        let rounded =
            major.round_dp_with_strategy(currency.exponent, RoundingStrategy::MidpointAwayFromZero);

        return Money::from_decimal(rounded, currency).to_string();
    }

    warn!(currency = code, "unrecognised currency code, using plain formatting");

    let mut rounded =
        major.round_dp_with_strategy(FALLBACK_EXPONENT, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(FALLBACK_EXPONENT);

    format!("{code} {rounded}")
}

fn minor_to_major(minor: Decimal, exponent: u32) -> Decimal {
    minor / Decimal::from(10_u64.pow(exponent))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rusty_money::iso::{EUR, USD};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn new_rejects_unknown_base_currency() {
        let result = CurrencyContext::new("ZZZ", "USD", Decimal::ONE);

        assert_eq!(
            result,
            Err(CurrencyError::UnknownCurrency("ZZZ".to_string()))
        );
    }

    #[test]
    fn new_rejects_non_positive_rate() {
        let result = CurrencyContext::new("EUR", "USD", Decimal::ZERO);

        assert_eq!(result, Err(CurrencyError::InvalidRate(Decimal::ZERO)));
    }

    #[test]
    fn format_active_renders_minor_units() {
        let formatter = MoneyFormatter::new(CurrencyContext::base_only(USD));

        assert_eq!(formatter.format_active(Decimal::from(1234)), "$12.34");
    }

    #[test]
    fn format_active_rounds_fractional_minor_units_at_display_time() {
        let formatter = MoneyFormatter::new(CurrencyContext::base_only(USD));

        assert_eq!(formatter.format_active(Decimal::new(84915, 2)), "$8.49");
        assert_eq!(formatter.format_active(Decimal::new(12345, 1)), "$12.35");
    }

    #[test]
    fn format_converts_base_amounts_into_active_currency() -> TestResult {
        let context = CurrencyContext::new("EUR", "USD", Decimal::new(11, 1))?;
        let formatter = MoneyFormatter::new(context);

        assert_eq!(formatter.format(Decimal::from(1000)), "$11.00");

        Ok(())
    }

    #[test]
    fn unknown_active_currency_falls_back_to_plain_text() -> TestResult {
        let context = CurrencyContext::new("EUR", "xyz", Decimal::ONE)?;
        let formatter = MoneyFormatter::new(context);

        assert_eq!(formatter.format_active(Decimal::from(1234)), "XYZ 12.34");
        assert_eq!(formatter.format_active(Decimal::from(5)), "XYZ 0.05");

        Ok(())
    }

    #[test]
    fn active_total_converts_back_to_base_major_units() -> TestResult {
        let context = CurrencyContext::new("EUR", "USD", Decimal::new(11, 1))?;

        assert_eq!(
            context.active_minor_to_base_major(Decimal::from(11_000)),
            Decimal::from(100)
        );

        Ok(())
    }

    #[test]
    fn base_context_does_not_convert() {
        let context = CurrencyContext::base_only(EUR);

        assert!(context.is_base());
        assert_eq!(
            context.active_minor_to_base_major(Decimal::from(4550)),
            Decimal::new(4550, 2)
        );
    }
}
