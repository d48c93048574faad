//! Gift tiers
//!
//! Promotional thresholds authored in the shop's base currency. Unlock flags
//! are recomputed from the cart on every pass; gifts themselves never become
//! cart lines.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    money::MoneyFormatter,
    products::{Product, VariantId},
};

/// Ordinal of the free-shipping pseudo-gift.
pub const FREE_SHIPPING_TIER: u8 = 0;

/// Highest configurable gift tier.
pub const MAX_TIER: u8 = 3;

const DEFAULT_PROGRESS_TEXT: &str = "Spend [[remaining]] more to unlock your next gift!";
const DEFAULT_COMPLETE_TEXT: &str = "You have unlocked all free gifts!";

/// Which gift variant a shopper is offered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Audience {
    /// Default audience
    #[default]
    Female,

    /// Shoppers who answered `male` to the gender question
    Male,
}

impl Audience {
    /// Audience for the value of the quiz's gender answer.
    pub fn from_gender_answer(value: Option<&str>) -> Self {
        match value {
            Some("male") => Self::Male,
            _ => Self::Female,
        }
    }
}

/// A gift product handle with an optional preferred variant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GiftChoice {
    /// Product handle
    pub handle: String,

    /// Variant to offer; the first variant when absent or not found
    #[serde(default)]
    pub variant_id: Option<VariantId>,
}

/// Configuration of one gift tier.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GiftTierConfig {
    /// Tier ordinal, 1 to 3
    pub tier: u8,

    /// Threshold in base-currency major units
    pub threshold: Decimal,

    /// Gift for the default audience
    #[serde(default)]
    pub female: Option<GiftChoice>,

    /// Gift for male shoppers
    #[serde(default)]
    pub male: Option<GiftChoice>,

    /// Banner text, `Tier N Gift` when absent
    #[serde(default)]
    pub banner: Option<String>,

    /// Description
    #[serde(default)]
    pub description: String,
}

/// Gift tier settings of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GiftTiersConfig {
    /// Whether gift tiers are shown at all
    #[serde(default)]
    pub enabled: bool,

    /// Whether the free-shipping tier 0 is shown
    #[serde(default)]
    pub free_shipping: bool,

    /// Progress label with `[[remaining]]`, `[[current]]` and `[[next_tier]]` placeholders
    #[serde(default)]
    pub progress_text: Option<String>,

    /// Label shown once every tier is unlocked
    #[serde(default)]
    pub complete_text: Option<String>,

    /// Tiers 1 to 3
    #[serde(default)]
    pub tiers: Vec<GiftTierConfig>,
}

/// A gift tier with its resolved product and unlock state.
#[derive(Debug, Clone, PartialEq)]
pub struct GiftTier {
    tier: u8,
    threshold: Decimal,
    choice: Option<GiftChoice>,
    banner: String,
    description: String,
    product: Option<Arc<Product>>,
    variant_id: Option<VariantId>,
    unlocked: bool,
}

impl GiftTier {
    /// A tier offering `choice` once the cart reaches `threshold`.
    pub fn new(tier: u8, threshold: Decimal, choice: Option<GiftChoice>) -> Self {
        Self {
            tier,
            threshold,
            choice,
            banner: format!("Tier {tier} Gift"),
            description: String::new(),
            product: None,
            variant_id: None,
            unlocked: false,
        }
    }

    /// The free-shipping pseudo-gift.
    pub fn free_shipping() -> Self {
        let mut tier = Self::new(FREE_SHIPPING_TIER, Decimal::ZERO, None);
        tier.banner = "Free Shipping".to_string();
        tier
    }

    /// Tier ordinal
    pub fn tier(&self) -> u8 {
        self.tier
    }

    /// Threshold in base-currency major units
    pub fn threshold(&self) -> Decimal {
        self.threshold
    }

    /// Whether this is the free-shipping tier.
    pub fn is_free_shipping(&self) -> bool {
        self.tier == FREE_SHIPPING_TIER
    }

    /// Gift handle to fetch, if any
    pub fn handle(&self) -> Option<&str> {
        self.choice.as_ref().map(|choice| choice.handle.as_str())
    }

    /// Banner text
    pub fn banner(&self) -> &str {
        &self.banner
    }

    /// Description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Resolved gift product
    pub fn product(&self) -> Option<&Arc<Product>> {
        self.product.as_ref()
    }

    /// Resolved gift variant
    pub fn variant_id(&self) -> Option<VariantId> {
        self.variant_id
    }

    /// Whether the tier is unlocked by the current cart
    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Amount still needed to unlock this tier, never negative.
    pub fn amount_needed(&self, cart_total_base: Decimal) -> Decimal {
        (self.threshold - cart_total_base).max(Decimal::ZERO)
    }

    /// Attach the fetched gift product, picking the preferred variant when
    /// the product has it and the first variant otherwise.
    pub fn resolve(&mut self, product: Arc<Product>) {
        let preferred = self
            .choice
            .as_ref()
            .and_then(|choice| choice.variant_id)
            .and_then(|id| product.variant(id));

        let variant_id = preferred.unwrap_or(product.first_variant()).id;

        debug!(
            tier = self.tier,
            product = product.handle(),
            variant = %variant_id,
            "resolved gift product"
        );

        self.variant_id = Some(variant_id);
        self.product = Some(product);
    }
}

/// How far the cart is from the next gift.
#[derive(Debug, Clone, PartialEq)]
pub struct GiftProgress {
    /// Cart total in base-currency major units
    pub cart_total: Decimal,

    /// Highest threshold of all tiers
    pub max_threshold: Decimal,

    /// Progress towards the highest threshold, 0 to 100
    pub percent: Decimal,

    /// First tier that is still locked
    pub next_tier: Option<u8>,

    /// Threshold of the next locked tier
    pub next_threshold: Option<Decimal>,

    /// Amount needed to unlock the next tier
    pub remaining: Decimal,
}

impl GiftProgress {
    /// Whether every tier is unlocked.
    pub fn all_unlocked(&self) -> bool {
        self.next_tier.is_none()
    }
}

/// The store's gift tiers, sorted ascending by threshold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GiftTiers {
    tiers: Vec<GiftTier>,
    progress_text: String,
    complete_text: String,
}

impl GiftTiers {
    /// Gift tiers switched off.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Build tiers from explicit parts; they are sorted by threshold.
    pub fn new(mut tiers: Vec<GiftTier>) -> Self {
        tiers.sort_by(|a, b| a.threshold.cmp(&b.threshold));

        Self {
            tiers,
            progress_text: DEFAULT_PROGRESS_TEXT.to_string(),
            complete_text: DEFAULT_COMPLETE_TEXT.to_string(),
        }
    }

    /// Build tiers from configuration for the given audience.
    ///
    /// Tiers 1 to 3 are kept only with a positive threshold and at least one
    /// gift handle. Male shoppers get the female gift when a tier has no male gift.
    pub fn from_config(config: &GiftTiersConfig, audience: Audience) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let mut tiers = Vec::with_capacity(config.tiers.len() + 1);

        if config.free_shipping {
            tiers.push(GiftTier::free_shipping());
        }

        for tier_config in &config.tiers {
            if !(1..=MAX_TIER).contains(&tier_config.tier) {
                warn!(tier = tier_config.tier, "ignoring gift tier outside 1..=3");
                continue;
            }

            let choice = match audience {
                Audience::Male => tier_config.male.clone().or_else(|| tier_config.female.clone()),
                Audience::Female => tier_config.female.clone(),
            };

            let has_handle = tier_config.female.is_some() || tier_config.male.is_some();

            if tier_config.threshold <= Decimal::ZERO || !has_handle {
                warn!(
                    tier = tier_config.tier,
                    threshold = %tier_config.threshold,
                    "ignoring gift tier without threshold or gift"
                );
                continue;
            }

            let mut tier = GiftTier::new(tier_config.tier, tier_config.threshold, choice);

            if let Some(banner) = &tier_config.banner {
                tier.banner.clone_from(banner);
            }
            tier.description.clone_from(&tier_config.description);

            tiers.push(tier);
        }

        let mut gift_tiers = Self::new(tiers);

        if let Some(text) = &config.progress_text {
            gift_tiers.progress_text.clone_from(text);
        }
        if let Some(text) = &config.complete_text {
            gift_tiers.complete_text.clone_from(text);
        }

        gift_tiers
    }

    /// Whether any tier is configured.
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Tiers in ascending threshold order.
    pub fn tiers(&self) -> &[GiftTier] {
        &self.tiers
    }

    /// Unlock state for a cart whose total is `cart_total_base`, leaving the
    /// stored flags untouched.
    pub fn status(&self, cart_total_base: Decimal, has_paid_items: bool) -> Vec<GiftTier> {
        let mut tiers = self.tiers.clone();

        for tier in &mut tiers {
            tier.unlocked = is_unlocked(tier, cart_total_base, has_paid_items);
        }

        tiers
    }

    /// Recompute every unlock flag from the current cart.
    pub fn refresh(&mut self, cart_total_base: Decimal, has_paid_items: bool) {
        for tier in &mut self.tiers {
            let unlocked = is_unlocked(tier, cart_total_base, has_paid_items);

            if unlocked != tier.unlocked {
                debug!(tier = tier.tier, unlocked, "gift tier changed");
            }

            tier.unlocked = unlocked;
        }
    }

    /// Progress of the current flags towards the highest threshold.
    pub fn progress(&self, cart_total_base: Decimal) -> GiftProgress {
        let max_threshold = self
            .tiers
            .last()
            .map(GiftTier::threshold)
            .filter(|threshold| *threshold > Decimal::ZERO)
            .unwrap_or(Decimal::ONE);

        let percent = (cart_total_base / max_threshold * Decimal::ONE_HUNDRED)
            .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);

        let next = self.tiers.iter().find(|tier| !tier.unlocked);

        GiftProgress {
            cart_total: cart_total_base,
            max_threshold,
            percent,
            next_tier: next.map(GiftTier::tier),
            next_threshold: next.map(GiftTier::threshold),
            remaining: next.map_or(Decimal::ZERO, |tier| tier.amount_needed(cart_total_base)),
        }
    }

    /// Progress label with its placeholders filled in the active currency.
    pub fn progress_message(&self, progress: &GiftProgress, formatter: &MoneyFormatter) -> String {
        let Some(next_threshold) = progress.next_threshold else {
            return self.complete_text.clone();
        };

        self.progress_text
            .replace("[[remaining]]", &formatter.format_base_major(progress.remaining))
            .replace("[[current]]", &formatter.format_base_major(progress.cart_total))
            .replace("[[next_tier]]", &formatter.format_base_major(next_threshold))
    }

    /// Attach a fetched gift product to `tier`. Returns whether such a tier exists.
    pub fn resolve(&mut self, tier: u8, product: Arc<Product>) -> bool {
        let Some(gift_tier) = self.tiers.iter_mut().find(|t| t.tier == tier) else {
            warn!(tier, "no gift tier to resolve");
            return false;
        };

        gift_tier.resolve(product);

        true
    }

    /// Tiers still waiting for their gift product, with the handle to fetch.
    pub fn pending_handles(&self) -> Vec<(u8, String)> {
        self.tiers
            .iter()
            .filter(|tier| tier.product.is_none())
            .filter_map(|tier| tier.handle().map(|handle| (tier.tier, handle.to_string())))
            .collect()
    }
}

fn is_unlocked(tier: &GiftTier, cart_total_base: Decimal, has_paid_items: bool) -> bool {
    if tier.is_free_shipping() {
        has_paid_items
    } else {
        cart_total_base >= tier.threshold
    }
}
