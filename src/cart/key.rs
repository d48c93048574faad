//! Line identity

use serde::Deserialize;

use crate::products::{SellingPlanId, VariantId};

/// Pricing treatment of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineTreatment {
    /// Full price, or subscription price when a selling plan is set
    #[default]
    Normal,

    /// Promotional gift, free
    Gift,

    /// Free half of a buy-one-get-one pair
    BogoFree,

    /// Part of an upsell package sold at a flat percentage off
    UpsellDiscount,
}

impl LineTreatment {
    /// Whether lines with this treatment are paid for and count towards totals.
    pub const fn is_paid(self) -> bool {
        matches!(self, Self::Normal | Self::UpsellDiscount)
    }
}

/// Identity of a line in the cart. The cart holds at most one line per key;
/// upsell lines share the key space of normal paid lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineKey {
    variant_id: VariantId,
    selling_plan_id: Option<SellingPlanId>,
    is_gift: bool,
    is_bogo_free: bool,
}

impl LineKey {
    /// Key of a line with the given treatment.
    pub const fn new(
        variant_id: VariantId,
        selling_plan_id: Option<SellingPlanId>,
        treatment: LineTreatment,
    ) -> Self {
        Self {
            variant_id,
            selling_plan_id,
            is_gift: matches!(treatment, LineTreatment::Gift),
            is_bogo_free: matches!(treatment, LineTreatment::BogoFree),
        }
    }

    /// Key of a paid (normal or upsell) line.
    pub const fn paid(variant_id: VariantId, selling_plan_id: Option<SellingPlanId>) -> Self {
        Self::new(variant_id, selling_plan_id, LineTreatment::Normal)
    }

    /// Key of the free line paired with a one-time purchase of `variant_id`.
    pub const fn bogo_free(variant_id: VariantId) -> Self {
        Self::new(variant_id, None, LineTreatment::BogoFree)
    }

    /// Variant of the line.
    pub const fn variant_id(&self) -> VariantId {
        self.variant_id
    }

    /// Selling plan of the line.
    pub const fn selling_plan_id(&self) -> Option<SellingPlanId> {
        self.selling_plan_id
    }

    /// Gift flag.
    pub const fn is_gift(&self) -> bool {
        self.is_gift
    }

    /// BOGO-free flag.
    pub const fn is_bogo_free(&self) -> bool {
        self.is_bogo_free
    }

    /// Neither a gift nor a BOGO-free line.
    pub const fn is_paid(&self) -> bool {
        !self.is_gift && !self.is_bogo_free
    }
}
