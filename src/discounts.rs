//! Discounts
//!
//! Subscription and upsell price adjustments. Results stay in unrounded minor
//! units unless a caller explicitly asks for a rounded price.

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

use crate::products::{AdjustmentType, SellingPlan};

/// Percentage taken off every line of an upsell package unless configured otherwise.
pub const DEFAULT_UPSELL_PERCENT: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Price after applying a selling plan's adjustment, in unrounded minor units.
///
/// Percentage plans yield `price × (1 − value/100)`, fixed-amount plans yield
/// `price − value` (never below zero). Plans without an adjustment, or with an
/// adjustment type this engine does not apply, leave the price unchanged.
pub fn apply_plan(base_price: Decimal, plan: &SellingPlan) -> Decimal {
    let Some(adjustment) = plan.adjustment() else {
        return base_price;
    };

    match adjustment.value_type {
        AdjustmentType::Percentage => percent_off(base_price, adjustment.value),
        AdjustmentType::FixedAmount => (base_price - adjustment.value).max(Decimal::ZERO),
        AdjustmentType::Unrecognized => base_price,
    }
}

/// [`apply_plan`] rounded to the nearest minor unit.
///
/// A result that cannot be represented leaves the price unchanged.
pub fn apply_plan_rounded(base_price: i64, plan: &SellingPlan) -> i64 {
    round_minor(apply_plan(Decimal::from(base_price), plan)).unwrap_or(base_price)
}

/// The plan's percentage rounded to a whole number, or zero for plans that are
/// not percentage based.
pub fn discount_percent(plan: &SellingPlan) -> u32 {
    plan.adjustment()
        .filter(|adjustment| adjustment.value_type == AdjustmentType::Percentage)
        .and_then(|adjustment| round_minor(adjustment.value))
        .and_then(|percent| u32::try_from(percent).ok())
        .unwrap_or(0)
}

/// Take `percent` percent off `price`, never going below zero.
pub fn percent_off(price: Decimal, percent: Decimal) -> Decimal {
    (price * (Decimal::ONE - percent / Decimal::ONE_HUNDRED)).max(Decimal::ZERO)
}

/// Round an amount half away from zero to a whole number of minor units.
pub fn round_minor(amount: Decimal) -> Option<i64> {
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}
