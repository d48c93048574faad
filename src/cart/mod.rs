//! Cart Pricing Engine
//!
//! Owns the prospective line items of a shopper's cart and derives totals,
//! discounts, BOGO pairs and gift tier unlock state from them. Every mutation
//! goes through [`CartEngine::dispatch`], which recomputes the derived state
//! from scratch and pushes it to the subscribed render sinks.

use std::sync::Arc;

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::{
    backend::CommerceBackend,
    discounts::DEFAULT_UPSELL_PERCENT,
    money::CurrencyContext,
    products::{Product, ProductId, SellingPlanId, VariantId},
    render::{CartView, RenderSink, Sinks},
};

pub mod bogo;
pub mod commands;
pub mod gifts;
pub mod key;
pub mod lines;
pub mod summary;

use bogo::BogoConfig;
use commands::Command;
use gifts::{GiftTier, GiftTiers};
use key::{LineKey, LineTreatment};
use lines::{LineItem, LineSet};
use summary::PriceSummary;

/// Arguments of a line mutation.
#[derive(Debug, Clone)]
pub struct LineRequest {
    /// Variant to buy
    pub variant_id: VariantId,

    /// Quantity; zero removes the line
    pub quantity: u32,

    /// Product snapshot the variant belongs to
    pub product: Arc<Product>,

    /// Subscription cadence, `None` for a one-time purchase
    pub selling_plan_id: Option<SellingPlanId>,

    /// Pricing treatment
    pub treatment: LineTreatment,
}

impl LineRequest {
    /// A normal one-time purchase.
    pub fn new(variant_id: VariantId, quantity: u32, product: Arc<Product>) -> Self {
        Self {
            variant_id,
            quantity,
            product,
            selling_plan_id: None,
            treatment: LineTreatment::Normal,
        }
    }

    /// Buy under a selling plan.
    #[must_use]
    pub fn with_selling_plan(mut self, selling_plan_id: Option<SellingPlanId>) -> Self {
        self.selling_plan_id = selling_plan_id;
        self
    }

    /// Use a different pricing treatment.
    #[must_use]
    pub fn with_treatment(mut self, treatment: LineTreatment) -> Self {
        self.treatment = treatment;
        self
    }

    fn key(&self) -> LineKey {
        LineKey::new(self.variant_id, self.selling_plan_id, self.treatment)
    }
}

/// Per-product UI state for the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductState {
    /// The shopper removed the product
    pub removed: bool,

    /// Last quantity the shopper asked for
    pub quantity: u32,
}

/// The cart's working set and everything derived from it.
#[derive(Debug)]
pub struct CartEngine {
    lines: LineSet,
    gift_tiers: GiftTiers,
    bogo: BogoConfig,
    currency: CurrencyContext,
    upsell_percent: Decimal,
    product_states: FxHashMap<ProductId, ProductState>,
    summary: PriceSummary,
    sinks: Sinks,
}

impl CartEngine {
    /// An empty cart with BOGO and gift tiers switched off.
    pub fn new(currency: CurrencyContext) -> Self {
        Self {
            lines: LineSet::new(),
            gift_tiers: GiftTiers::disabled(),
            bogo: BogoConfig::disabled(),
            currency,
            upsell_percent: DEFAULT_UPSELL_PERCENT,
            product_states: FxHashMap::default(),
            summary: PriceSummary::default(),
            sinks: Sinks::default(),
        }
    }

    /// Run the given BOGO promotion.
    #[must_use]
    pub fn with_bogo(mut self, bogo: BogoConfig) -> Self {
        self.bogo = bogo;
        self
    }

    /// Track the given gift tiers.
    #[must_use]
    pub fn with_gift_tiers(mut self, gift_tiers: GiftTiers) -> Self {
        self.gift_tiers = gift_tiers;
        self
    }

    /// Percentage taken off upsell package lines.
    #[must_use]
    pub fn with_upsell_percent(mut self, percent: Decimal) -> Self {
        self.upsell_percent = percent;
        self
    }

    /// Notify `sink` after every command.
    pub fn subscribe(&mut self, sink: impl RenderSink + Send + Sync + 'static) {
        self.sinks.0.push(Box::new(sink));
    }

    /// Apply a command, recompute the derived state and notify every sink.
    pub fn dispatch(&mut self, command: Command) -> CartView {
        debug!(command = command.name(), "applying cart command");

        match command {
            Command::SetLine(request) => self.apply_set_line(request),
            Command::RemoveLine {
                variant_id,
                selling_plan_id,
            } => self.apply_remove_line(variant_id, selling_plan_id),
            Command::ReplaceLine(request) => self.apply_replace_line(request),
            Command::AddUpsellPackage(items) => {
                for item in items {
                    self.apply_set_line(item.with_treatment(LineTreatment::UpsellDiscount));
                }
            }
            Command::ResolveGift { tier, product } => {
                self.gift_tiers.resolve(tier, product);
            }
            Command::SetCurrency(currency) => self.currency = currency,
            Command::Reset => {
                self.lines.clear();
                self.product_states.clear();
            }
        }

        self.refresh()
    }

    /// Set a line's quantity. See [`Command::SetLine`].
    pub fn set_line(&mut self, request: LineRequest) -> CartView {
        self.dispatch(Command::SetLine(request))
    }

    /// Remove a paid line. See [`Command::RemoveLine`].
    pub fn remove_line(
        &mut self,
        variant_id: VariantId,
        selling_plan_id: Option<SellingPlanId>,
    ) -> CartView {
        self.dispatch(Command::RemoveLine {
            variant_id,
            selling_plan_id,
        })
    }

    /// Switch a variant's purchase option. See [`Command::ReplaceLine`].
    pub fn replace_line(&mut self, request: LineRequest) -> CartView {
        self.dispatch(Command::ReplaceLine(request))
    }

    /// Add an upsell package. See [`Command::AddUpsellPackage`].
    pub fn add_upsell_package(&mut self, items: Vec<LineRequest>) -> CartView {
        self.dispatch(Command::AddUpsellPackage(items))
    }

    /// Empty the cart and forget every product state.
    pub fn reset(&mut self) -> CartView {
        self.dispatch(Command::Reset)
    }

    /// Fetch every unresolved gift tier product and attach the ones found.
    ///
    /// Returns the number of tiers resolved.
    pub async fn resolve_gift_products(&mut self, backend: &dyn CommerceBackend) -> usize {
        let mut resolved = 0;

        for (tier, handle) in self.gift_tiers.pending_handles() {
            match backend.fetch_product(&handle).await {
                Some(product) => {
                    self.dispatch(Command::ResolveGift {
                        tier,
                        product: Arc::new(product),
                    });
                    resolved += 1;
                }
                None => warn!(tier, handle, "gift product unavailable"),
            }
        }

        resolved
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &LineSet {
        &self.lines
    }

    /// Current currency context.
    pub fn currency(&self) -> &CurrencyContext {
        &self.currency
    }

    /// BOGO promotion settings.
    pub fn bogo(&self) -> &BogoConfig {
        &self.bogo
    }

    /// Gift tiers with their current unlock flags.
    pub fn gift_tiers(&self) -> &GiftTiers {
        &self.gift_tiers
    }

    /// Percentage taken off upsell package lines.
    pub fn upsell_percent(&self) -> Decimal {
        self.upsell_percent
    }

    /// Session state of a product.
    pub fn product_state(&self, product_id: ProductId) -> Option<ProductState> {
        self.product_states.get(&product_id).copied()
    }

    /// Totals and rows derived from the current lines.
    pub fn price_summary(&self) -> PriceSummary {
        PriceSummary::from_lines(self.lines.iter(), self.upsell_percent)
    }

    /// Whether the cart holds a paid line.
    pub fn has_paid_items(&self) -> bool {
        self.lines
            .iter()
            .any(|line| line.is_paid() && line.quantity() > 0)
    }

    /// The payable total converted into base-currency major units.
    pub fn cart_total_in_base(&self) -> Decimal {
        self.currency
            .active_minor_to_base_major(self.price_summary().total())
    }

    /// Unlock state of every gift tier for a cart total in base-currency major units.
    pub fn gift_tier_status(&self, cart_total_base: Decimal) -> Vec<GiftTier> {
        self.gift_tiers
            .status(cart_total_base, self.has_paid_items())
    }

    /// The derived state as last pushed to the sinks.
    pub fn view(&self) -> CartView {
        let cart_total_base = self.currency.active_minor_to_base_major(self.summary.total());

        CartView {
            summary: self.summary.clone(),
            cart_total_base,
            gift_tiers: self.gift_tiers.tiers().to_vec(),
            gift_progress: (!self.gift_tiers.is_empty())
                .then(|| self.gift_tiers.progress(cart_total_base)),
        }
    }

    fn refresh(&mut self) -> CartView {
        self.summary = self.price_summary();

        let cart_total_base = self.currency.active_minor_to_base_major(self.summary.total());
        let has_paid_items = self.has_paid_items();

        self.gift_tiers.refresh(cart_total_base, has_paid_items);

        let view = self.view();
        self.sinks.notify(&view);

        view
    }

    fn apply_set_line(&mut self, request: LineRequest) {
        let key = request.key();

        if request.product.variant(request.variant_id).is_none() {
            warn!(
                product = request.product.handle(),
                variant = %request.variant_id,
                "variant not found on product, pricing from first variant"
            );
        }

        if request.treatment.is_paid() {
            self.product_states.insert(
                request.product.id(),
                ProductState {
                    removed: request.quantity == 0,
                    quantity: request.quantity,
                },
            );
        }

        if request.treatment.is_paid() && request.selling_plan_id.is_none() {
            self.sync_bogo_pair(&request);
        }

        if request.quantity == 0 {
            if self.lines.remove(&key).is_some() {
                debug!(variant = %request.variant_id, "removed line");
            }
            return;
        }

        self.lines.upsert(LineItem::new(
            request.variant_id,
            request.quantity,
            request.product,
            request.selling_plan_id,
            request.treatment,
        ));
    }

    /// Keep the free BOGO line of a one-time purchase in lockstep with it.
    fn sync_bogo_pair(&mut self, request: &LineRequest) {
        let pair_key = LineKey::bogo_free(request.variant_id);

        let wants_pair = request.treatment == LineTreatment::Normal
            && request.quantity > 0
            && self.bogo.is_eligible(&request.product);

        if wants_pair {
            self.lines.upsert(LineItem::new(
                request.variant_id,
                request.quantity,
                Arc::clone(&request.product),
                None,
                LineTreatment::BogoFree,
            ));
        } else if self.lines.remove(&pair_key).is_some() {
            debug!(variant = %request.variant_id, "removed BOGO pair");
        }
    }

    fn apply_remove_line(&mut self, variant_id: VariantId, selling_plan_id: Option<SellingPlanId>) {
        let key = LineKey::paid(variant_id, selling_plan_id);

        let Some(line) = self.lines.get(&key) else {
            debug!(variant = %variant_id, "no line to remove");
            return;
        };

        let keys = if line.is_upsell_discount() {
            self.lines.keys_where(LineItem::is_upsell_discount)
        } else {
            std::iter::once(key).collect()
        };

        for key in keys {
            self.remove_paid_line(&key);
        }
    }

    fn apply_replace_line(&mut self, request: LineRequest) {
        let variant_id = request.variant_id;
        let keys = self
            .lines
            .keys_where(|line| line.variant_id() == variant_id && line.is_paid());

        for key in keys {
            self.remove_paid_line(&key);
        }

        self.apply_set_line(request);
    }

    fn remove_paid_line(&mut self, key: &LineKey) {
        let Some(line) = self.lines.remove(key) else {
            return;
        };

        debug!(variant = %line.variant_id(), "removed line");

        self.product_states.insert(
            line.product().id(),
            ProductState {
                removed: true,
                quantity: 0,
            },
        );

        if line.selling_plan_id().is_none() {
            self.lines.remove(&LineKey::bogo_free(line.variant_id()));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rusty_money::iso::USD;
    use testresult::TestResult;

    use crate::products::{ProductError, Variant};

    use super::*;

    fn product(id: u64, handle: &str, variant: u64, price: i64) -> Result<Arc<Product>, ProductError> {
        Ok(Arc::new(Product::new(
            ProductId(id),
            handle,
            handle,
            vec![Variant::new(VariantId(variant), "Default Title", price)],
        )?))
    }

    fn engine() -> CartEngine {
        CartEngine::new(CurrencyContext::base_only(USD)).with_bogo(BogoConfig::new(true, ["serum"]))
    }

    #[test]
    fn set_line_twice_keeps_one_line_per_key() -> TestResult {
        let mut cart = engine();
        let shampoo = product(1, "shampoo", 10, 1800)?;

        let first = cart.set_line(LineRequest::new(VariantId(10), 2, Arc::clone(&shampoo)));
        let second = cart.set_line(LineRequest::new(VariantId(10), 2, shampoo));

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(first.summary, second.summary);

        Ok(())
    }

    #[test]
    fn zero_quantity_removes_the_line() -> TestResult {
        let mut cart = engine();
        let shampoo = product(1, "shampoo", 10, 1800)?;

        cart.set_line(LineRequest::new(VariantId(10), 2, Arc::clone(&shampoo)));
        let view = cart.set_line(LineRequest::new(VariantId(10), 0, shampoo));

        assert!(cart.lines().is_empty());
        assert!(view.is_empty());
        assert_eq!(
            cart.product_state(ProductId(1)),
            Some(ProductState {
                removed: true,
                quantity: 0
            })
        );

        Ok(())
    }

    #[test]
    fn bogo_pair_mirrors_paid_quantity() -> TestResult {
        let mut cart = engine();
        let serum = product(2, "serum", 100, 3000)?;

        cart.set_line(LineRequest::new(VariantId(100), 2, Arc::clone(&serum)));
        cart.set_line(LineRequest::new(VariantId(100), 3, Arc::clone(&serum)));

        let free = cart
            .lines()
            .get(&LineKey::bogo_free(VariantId(100)))
            .map(LineItem::quantity);

        assert_eq!(free, Some(3));

        cart.remove_line(VariantId(100), None);

        assert!(cart.lines().is_empty());

        Ok(())
    }

    #[test]
    fn subscriptions_and_upsells_get_no_bogo_pair() -> TestResult {
        let mut cart = engine();
        let serum = product(2, "serum", 100, 3000)?;

        cart.set_line(
            LineRequest::new(VariantId(100), 1, Arc::clone(&serum))
                .with_selling_plan(Some(SellingPlanId(7))),
        );

        assert!(!cart.lines().contains(&LineKey::bogo_free(VariantId(100))));

        cart.set_line(LineRequest::new(VariantId(100), 1, Arc::clone(&serum)));
        cart.add_upsell_package(vec![LineRequest::new(VariantId(100), 1, serum)]);

        assert!(!cart.lines().contains(&LineKey::bogo_free(VariantId(100))));

        Ok(())
    }

    #[test]
    fn removing_one_upsell_line_removes_the_package() -> TestResult {
        let mut cart = engine();
        let mask = product(3, "mask", 30, 2500)?;
        let oil = product(4, "oil", 40, 2000)?;
        let shampoo = product(1, "shampoo", 10, 1800)?;

        cart.set_line(LineRequest::new(VariantId(10), 1, shampoo));
        cart.add_upsell_package(vec![
            LineRequest::new(VariantId(30), 1, mask),
            LineRequest::new(VariantId(40), 1, oil),
        ]);

        assert_eq!(cart.lines().len(), 3);

        cart.remove_line(VariantId(40), None);

        let remaining: Vec<VariantId> = cart.lines().iter().map(LineItem::variant_id).collect();

        assert_eq!(remaining, vec![VariantId(10)]);

        Ok(())
    }

    #[test]
    fn replace_line_switches_purchase_option() -> TestResult {
        let mut cart = engine();
        let serum = product(2, "serum", 100, 3000)?;

        cart.set_line(LineRequest::new(VariantId(100), 1, Arc::clone(&serum)));
        cart.replace_line(
            LineRequest::new(VariantId(100), 1, serum).with_selling_plan(Some(SellingPlanId(7))),
        );

        let keys: Vec<LineKey> = cart.lines().iter().map(LineItem::key).collect();

        assert_eq!(keys, vec![LineKey::paid(VariantId(100), Some(SellingPlanId(7)))]);

        Ok(())
    }

    #[test]
    fn removing_a_line_keeps_other_variants_gifts_and_pairs() -> TestResult {
        let mut cart = engine();
        let serum = product(2, "serum", 100, 3000)?;
        let shampoo = product(1, "shampoo", 10, 1800)?;

        cart.set_line(LineRequest::new(VariantId(100), 1, serum));
        cart.set_line(LineRequest::new(VariantId(10), 1, Arc::clone(&shampoo)));
        cart.set_line(
            LineRequest::new(VariantId(11), 1, shampoo).with_treatment(LineTreatment::Gift),
        );

        cart.remove_line(VariantId(10), None);

        assert!(cart.lines().contains(&LineKey::bogo_free(VariantId(100))));
        assert!(cart
            .lines()
            .contains(&LineKey::new(VariantId(11), None, LineTreatment::Gift)));

        Ok(())
    }

    #[test]
    fn reset_clears_lines_and_states() -> TestResult {
        let mut cart = engine();

        cart.set_line(LineRequest::new(VariantId(10), 1, product(1, "shampoo", 10, 1800)?));
        let view = cart.reset();

        assert!(cart.lines().is_empty());
        assert_eq!(cart.product_state(ProductId(1)), None);
        assert_eq!(view.summary.total(), Decimal::ZERO);

        Ok(())
    }

    #[test]
    fn sinks_are_notified_after_every_command() -> TestResult {
        let mut cart = engine();
        let totals = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&totals);

        cart.subscribe(move |view: &CartView| {
            if let Ok(mut seen) = seen.lock() {
                seen.push(view.summary.total());
            }
        });

        let shampoo = product(1, "shampoo", 10, 1800)?;

        cart.set_line(LineRequest::new(VariantId(10), 2, Arc::clone(&shampoo)));
        cart.remove_line(VariantId(10), None);

        let totals = totals.lock().map_err(|_err| "poisoned")?.clone();

        assert_eq!(totals, vec![Decimal::from(3600), Decimal::ZERO]);

        Ok(())
    }
}
