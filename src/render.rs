//! Render sinks
//!
//! After every command the engine pushes a fresh [`CartView`] to each
//! subscribed sink. Sinks render from that view; they are never asked to
//! patch a previous rendering.

use std::fmt;

use rust_decimal::Decimal;
use tracing::debug;

use crate::cart::{
    gifts::{GiftProgress, GiftTier},
    summary::PriceSummary,
};

/// Everything a renderer needs, derived from the current cart.
#[derive(Debug, Clone, PartialEq)]
pub struct CartView {
    /// Totals and display rows
    pub summary: PriceSummary,

    /// Cart total in base-currency major units, as compared against gift thresholds
    pub cart_total_base: Decimal,

    /// Gift tiers with their current unlock flags
    pub gift_tiers: Vec<GiftTier>,

    /// Progress towards the next gift, when gift tiers are configured
    pub gift_progress: Option<GiftProgress>,
}

impl CartView {
    /// Whether the cart holds no paid item.
    pub fn is_empty(&self) -> bool {
        self.summary.rows().is_empty()
    }

    /// Tiers currently unlocked.
    pub fn unlocked_tiers(&self) -> impl Iterator<Item = &GiftTier> {
        self.gift_tiers.iter().filter(|tier| tier.is_unlocked())
    }
}

/// Receives the cart view after every command.
pub trait RenderSink {
    /// Render the current view.
    fn render(&self, view: &CartView);
}

impl<F> RenderSink for F
where
    F: Fn(&CartView),
{
    fn render(&self, view: &CartView) {
        self(view);
    }
}

/// Logs every view at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl RenderSink for TracingSink {
    fn render(&self, view: &CartView) {
        debug!(
            subtotal = %view.summary.subtotal(),
            discount = %view.summary.total_discount(),
            total = %view.summary.total(),
            items = view.summary.item_count(),
            free_items = view.summary.free_item_count(),
            unlocked_tiers = view.unlocked_tiers().count(),
            "cart rendered"
        );
    }
}

#[derive(Default)]
pub(crate) struct Sinks(pub(crate) Vec<Box<dyn RenderSink + Send + Sync>>);

impl fmt::Debug for Sinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sinks({})", self.0.len())
    }
}

impl Sinks {
    pub(crate) fn notify(&self, view: &CartView) {
        for sink in &self.0 {
            sink.render(view);
        }
    }
}
