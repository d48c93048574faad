//! Products
//!
//! Product snapshots as served by the storefront's `/products/<handle>.js`
//! endpoint. Raw JSON is validated once, when it is deserialised into a
//! [`Product`]; everything downstream can rely on a product having at least
//! one variant.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! storefront_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

storefront_id! {
    /// Storefront product identifier.
    ProductId
}

storefront_id! {
    /// Identifier of a purchasable SKU.
    VariantId
}

storefront_id! {
    /// Identifier of a subscription cadence.
    SellingPlanId
}

/// Variant title the storefront uses for single-variant products.
pub const DEFAULT_VARIANT_TITLE: &str = "Default Title";

/// Errors raised while validating a product snapshot.
#[derive(Debug, Error, PartialEq)]
pub enum ProductError {
    /// The product has no purchasable variants.
    #[error("product {0} has no variants")]
    NoVariants(String),

    /// A variant id does not belong to the product.
    #[error("product {handle} has no variant {variant}")]
    UnknownVariant {
        /// Product handle
        handle: String,
        /// Requested variant
        variant: VariantId,
    },
}

/// Image reference attached to a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Image URL
    pub src: String,
}

/// A purchasable SKU of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Variant id
    pub id: VariantId,

    /// Variant title
    #[serde(default)]
    pub title: String,

    /// Price in minor units of the active currency
    pub price: i64,

    /// Compare-at price in minor units, used for display only
    #[serde(default)]
    pub compare_at_price: Option<i64>,

    /// Variant image
    #[serde(default)]
    pub featured_image: Option<Image>,

    /// Whether the variant can be bought
    #[serde(default = "available_by_default")]
    pub available: bool,
}

const fn available_by_default() -> bool {
    true
}

impl Variant {
    /// Create an available variant with no compare-at price or image.
    pub fn new(id: VariantId, title: impl Into<String>, price: i64) -> Self {
        Self {
            id,
            title: title.into(),
            price,
            compare_at_price: None,
            featured_image: None,
            available: true,
        }
    }

    /// Set the compare-at price.
    #[must_use]
    pub fn with_compare_at_price(mut self, compare_at_price: i64) -> Self {
        self.compare_at_price = Some(compare_at_price);
        self
    }

    /// Compare-at price, only when it is higher than the selling price.
    pub fn effective_compare_at_price(&self) -> Option<i64> {
        self.compare_at_price.filter(|compare_at| *compare_at > self.price)
    }
}

/// How a selling plan adjusts the base price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    /// Percentage off the base price
    Percentage,

    /// Fixed amount (minor units) off the base price
    FixedAmount,

    /// Any adjustment type this engine does not apply
    #[serde(other)]
    Unrecognized,
}

/// A single price adjustment of a selling plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAdjustment {
    /// Adjustment kind
    pub value_type: AdjustmentType,

    /// Percentage points or minor units, depending on `value_type`
    pub value: Decimal,
}

/// A subscription cadence with its price adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellingPlan {
    /// Plan id
    pub id: SellingPlanId,

    /// Plan display name, e.g. "Delivery every 30 days"
    #[serde(default)]
    pub name: String,

    /// Price adjustments; only the first one is applied
    #[serde(default)]
    pub price_adjustments: Vec<PriceAdjustment>,
}

impl SellingPlan {
    /// The adjustment applied by this plan, if any.
    pub fn adjustment(&self) -> Option<&PriceAdjustment> {
        self.price_adjustments.first()
    }
}

/// A named group of selling plans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellingPlanGroup {
    /// Group name
    #[serde(default)]
    pub name: String,

    /// Plans in the group
    #[serde(default)]
    pub selling_plans: Vec<SellingPlan>,
}

/// Product JSON exactly as the storefront serves it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProduct {
    id: ProductId,
    title: String,
    handle: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    featured_image: Option<String>,
    #[serde(default)]
    variants: Vec<Variant>,
    #[serde(default)]
    selling_plan_groups: Vec<SellingPlanGroup>,
}

/// A validated product snapshot. Always has at least one variant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawProduct")]
pub struct Product {
    id: ProductId,
    title: String,
    handle: String,
    tags: Vec<String>,
    featured_image: Option<String>,
    primary_variant: Variant,
    other_variants: Vec<Variant>,
    selling_plan_groups: Vec<SellingPlanGroup>,
    selected_variant: Option<Variant>,
}

impl TryFrom<RawProduct> for Product {
    type Error = ProductError;

    fn try_from(raw: RawProduct) -> Result<Self, Self::Error> {
        let mut variants = raw.variants.into_iter();

        let primary_variant = variants
            .next()
            .ok_or_else(|| ProductError::NoVariants(raw.handle.clone()))?;

        Ok(Self {
            id: raw.id,
            title: raw.title,
            handle: raw.handle,
            tags: raw.tags,
            featured_image: raw.featured_image,
            primary_variant,
            other_variants: variants.collect(),
            selling_plan_groups: raw.selling_plan_groups,
            selected_variant: None,
        })
    }
}

impl Product {
    /// Create a product from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`ProductError::NoVariants`] when `variants` is empty.
    pub fn new(
        id: ProductId,
        title: impl Into<String>,
        handle: impl Into<String>,
        variants: Vec<Variant>,
    ) -> Result<Self, ProductError> {
        RawProduct {
            id,
            title: title.into(),
            handle: handle.into(),
            tags: Vec::new(),
            featured_image: None,
            variants,
            selling_plan_groups: Vec::new(),
        }
        .try_into()
    }

    /// Attach selling plan groups.
    #[must_use]
    pub fn with_selling_plan_groups(mut self, groups: Vec<SellingPlanGroup>) -> Self {
        self.selling_plan_groups = groups;
        self
    }

    /// Attach tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Attach a featured image URL.
    #[must_use]
    pub fn with_featured_image(mut self, src: impl Into<String>) -> Self {
        self.featured_image = Some(src.into());
        self
    }

    /// Pin the variant the shopper picked; its price overrides any lookup by id.
    ///
    /// # Errors
    ///
    /// Returns [`ProductError::UnknownVariant`] when the product has no such variant.
    pub fn with_selected_variant(mut self, id: VariantId) -> Result<Self, ProductError> {
        let variant = self
            .variant(id)
            .cloned()
            .ok_or_else(|| ProductError::UnknownVariant {
                handle: self.handle.clone(),
                variant: id,
            })?;

        self.selected_variant = Some(variant);

        Ok(self)
    }

    /// Product id
    pub fn id(&self) -> ProductId {
        self.id
    }

    /// Product title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Product handle
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Product tags
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Whether the product carries `tag`, ignoring case.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Featured image URL
    pub fn featured_image(&self) -> Option<&str> {
        self.featured_image.as_deref()
    }

    /// All variants, first variant first.
    pub fn variants(&self) -> impl Iterator<Item = &Variant> {
        std::iter::once(&self.primary_variant).chain(self.other_variants.iter())
    }

    /// Number of variants.
    pub fn variant_count(&self) -> usize {
        self.other_variants.len() + 1
    }

    /// The first variant.
    pub fn first_variant(&self) -> &Variant {
        &self.primary_variant
    }

    /// Look up a variant by id.
    pub fn variant(&self, id: VariantId) -> Option<&Variant> {
        self.variants().find(|variant| variant.id == id)
    }

    /// The shopper's pinned variant, if any.
    pub fn selected_variant(&self) -> Option<&Variant> {
        self.selected_variant.as_ref()
    }

    /// The variant whose price applies to a line for `id`: the pinned variant
    /// first, then the variant with that id, then the first variant.
    pub fn resolve_variant(&self, id: VariantId) -> &Variant {
        self.selected_variant
            .as_ref()
            .or_else(|| self.variant(id))
            .unwrap_or(&self.primary_variant)
    }

    /// Selling plan groups
    pub fn selling_plan_groups(&self) -> &[SellingPlanGroup] {
        &self.selling_plan_groups
    }

    /// Find a selling plan by id across all groups.
    pub fn selling_plan(&self, id: SellingPlanId) -> Option<&SellingPlan> {
        self.selling_plan_groups
            .iter()
            .flat_map(|group| group.selling_plans.iter())
            .find(|plan| plan.id == id)
    }

    /// Display name for a line of `variant`: the title, suffixed with the
    /// variant title for multi-variant products.
    pub fn display_name(&self, variant: &Variant) -> String {
        if self.variant_count() > 1
            && !variant.title.is_empty()
            && variant.title != DEFAULT_VARIANT_TITLE
        {
            format!("{} - {}", self.title, variant.title)
        } else {
            self.title.clone()
        }
    }

    /// Image for a line of `variant`: the variant image, else the product image.
    pub fn image_for<'a>(&'a self, variant: &'a Variant) -> Option<&'a str> {
        variant
            .featured_image
            .as_ref()
            .map(|image| image.src.as_str())
            .or(self.featured_image.as_deref())
    }
}
