//! Cart commands

use std::sync::Arc;

use crate::{
    cart::LineRequest,
    money::CurrencyContext,
    products::{Product, SellingPlanId, VariantId},
};

/// A mutation of the cart, applied by [`CartEngine::dispatch`](crate::cart::CartEngine::dispatch).
#[derive(Debug, Clone)]
pub enum Command {
    /// Create, update or (with quantity 0) remove a line
    SetLine(LineRequest),

    /// Remove a paid line, cascading to its BOGO pair and upsell package
    RemoveLine {
        /// Variant of the line
        variant_id: VariantId,
        /// Selling plan of the line
        selling_plan_id: Option<SellingPlanId>,
    },

    /// Switch a variant's purchase option, replacing every paid line for it
    ReplaceLine(LineRequest),

    /// Add an upsell package as one unit
    AddUpsellPackage(Vec<LineRequest>),

    /// Attach a fetched gift product to a gift tier
    ResolveGift {
        /// Tier ordinal
        tier: u8,
        /// Gift product
        product: Arc<Product>,
    },

    /// Change the shopper's active currency
    SetCurrency(CurrencyContext),

    /// Drop every line and product state
    Reset,
}

impl Command {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetLine(_) => "set_line",
            Self::RemoveLine { .. } => "remove_line",
            Self::ReplaceLine(_) => "replace_line",
            Self::AddUpsellPackage(_) => "add_upsell_package",
            Self::ResolveGift { .. } => "resolve_gift",
            Self::SetCurrency(_) => "set_currency",
            Self::Reset => "reset",
        }
    }
}
