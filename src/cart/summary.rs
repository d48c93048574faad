//! Price summary
//!
//! Derived from the line set on every mutation and never cached across
//! mutations. All amounts are active-currency minor units.

use rust_decimal::Decimal;
use tracing::warn;

use crate::{
    cart::{
        key::{LineKey, LineTreatment},
        lines::LineItem,
    },
    discounts::{apply_plan, discount_percent, percent_off},
    products::ProductId,
};

/// How a displayed row is being bought.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Purchase {
    /// One-time purchase at the variant price
    OneTime,

    /// Subscription under a selling plan
    Subscription {
        /// Selling plan name
        plan_name: String,
        /// Whole-number discount percentage of the plan
        discount_percent: u32,
    },

    /// Part of an upsell package
    UpsellPackage {
        /// Package discount percentage
        discount_percent: Decimal,
    },
}

/// One displayed cart row. Only paid lines produce rows.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRow {
    /// Identity of the line behind this row
    pub key: LineKey,

    /// Product of the line
    pub product_id: ProductId,

    /// Display name
    pub name: String,

    /// Quantity
    pub quantity: u32,

    /// Reference unit price before any discount
    pub unit_price: Decimal,

    /// Unit price after subscription or upsell discount
    pub applied_unit_price: Decimal,

    /// Applied unit price times quantity
    pub line_total: Decimal,

    /// Reference unit price times quantity
    pub original_total: Decimal,

    /// Compare-at price times quantity, when the compare-at price is higher
    pub compare_at_total: Option<Decimal>,

    /// Purchase option
    pub purchase: Purchase,

    /// Image URL
    pub image: Option<String>,
}

impl LineRow {
    /// Whether the row is discounted below its reference price.
    pub fn is_discounted(&self) -> bool {
        self.line_total < self.original_total
    }
}

/// Totals and rows derived from the current lines.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceSummary {
    subtotal: Decimal,
    total_discount: Decimal,
    item_count: u32,
    free_item_count: u32,
    rows: Vec<LineRow>,
}

impl PriceSummary {
    /// Price every line. Gift and BOGO-free lines contribute nothing to the
    /// totals and are excluded from the item count.
    pub fn from_lines<'a>(
        lines: impl IntoIterator<Item = &'a LineItem>,
        upsell_percent: Decimal,
    ) -> Self {
        let mut summary = Self::default();

        for line in lines {
            if line.quantity() == 0 {
                continue;
            }

            match line.treatment() {
                LineTreatment::Gift => {}
                LineTreatment::BogoFree => {
                    summary.free_item_count =
                        summary.free_item_count.saturating_add(line.quantity());
                }
                LineTreatment::Normal | LineTreatment::UpsellDiscount => {
                    let row = price_row(line, upsell_percent);

                    summary.item_count = summary.item_count.saturating_add(row.quantity);
                    summary.subtotal += row.original_total;
                    summary.total_discount += row.original_total - row.line_total;
                    summary.rows.push(row);
                }
            }
        }

        summary
    }

    /// Sum of reference prices of paid lines.
    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    /// Sum of subscription and upsell discounts.
    pub fn total_discount(&self) -> Decimal {
        self.total_discount
    }

    /// Amount payable: subtotal minus discount.
    pub fn total(&self) -> Decimal {
        self.subtotal - self.total_discount
    }

    /// Whether any discount applies.
    pub fn has_discount(&self) -> bool {
        self.total_discount > Decimal::ZERO
    }

    /// Paid units in the cart.
    pub fn item_count(&self) -> u32 {
        self.item_count
    }

    /// Free BOGO units in the cart, reported apart from the item count.
    pub fn free_item_count(&self) -> u32 {
        self.free_item_count
    }

    /// Displayed rows in cart order.
    pub fn rows(&self) -> &[LineRow] {
        &self.rows
    }
}

fn price_row(line: &LineItem, upsell_percent: Decimal) -> LineRow {
    let product = line.product();
    let variant = line.variant();
    let quantity = Decimal::from(line.quantity());
    let unit_price = Decimal::from(variant.price);

    let (applied_unit_price, purchase) = match line.selling_plan_id() {
        Some(plan_id) => match product.selling_plan(plan_id) {
            Some(plan) => (
                apply_plan(unit_price, plan),
                Purchase::Subscription {
                    plan_name: plan.name.clone(),
                    discount_percent: discount_percent(plan),
                },
            ),
            None => {
                warn!(
                    product = product.handle(),
                    selling_plan = %plan_id,
                    "selling plan not found on product, no discount applied"
                );

                (unit_price, Purchase::OneTime)
            }
        },
        None if line.is_upsell_discount() => (
            percent_off(unit_price, upsell_percent),
            Purchase::UpsellPackage {
                discount_percent: upsell_percent,
            },
        ),
        None => (unit_price, Purchase::OneTime),
    };

    LineRow {
        key: line.key(),
        product_id: product.id(),
        name: product.display_name(variant),
        quantity: line.quantity(),
        unit_price,
        applied_unit_price,
        line_total: applied_unit_price * quantity,
        original_total: unit_price * quantity,
        compare_at_total: variant
            .effective_compare_at_price()
            .map(|compare_at| Decimal::from(compare_at) * quantity),
        purchase,
        image: product.image_for(variant).map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use testresult::TestResult;

    use crate::{
        discounts::DEFAULT_UPSELL_PERCENT,
        products::{
            AdjustmentType, PriceAdjustment, Product, ProductError, SellingPlan, SellingPlanGroup,
            SellingPlanId, Variant, VariantId,
        },
    };

    use super::*;

    fn conditioner() -> Result<Arc<Product>, ProductError> {
        Ok(Arc::new(
            Product::new(
                ProductId(3),
                "Conditioner",
                "conditioner",
                vec![Variant::new(VariantId(300), "Default Title", 10_000).with_compare_at_price(12_000)],
            )?
            .with_selling_plan_groups(vec![SellingPlanGroup {
                name: "Subscribe".to_string(),
                selling_plans: vec![SellingPlan {
                    id: SellingPlanId(1),
                    name: "Every month".to_string(),
                    price_adjustments: vec![PriceAdjustment {
                        value_type: AdjustmentType::Percentage,
                        value: Decimal::from(20),
                    }],
                }],
            }]),
        ))
    }

    fn line(
        product: &Arc<Product>,
        quantity: u32,
        plan: Option<SellingPlanId>,
        treatment: LineTreatment,
    ) -> LineItem {
        LineItem::new(VariantId(300), quantity, Arc::clone(product), plan, treatment)
    }

    #[test]
    fn subscription_line_is_discounted() -> TestResult {
        let product = conditioner()?;
        let lines = [line(&product, 1, Some(SellingPlanId(1)), LineTreatment::Normal)];

        let summary = PriceSummary::from_lines(&lines, DEFAULT_UPSELL_PERCENT);

        assert_eq!(summary.subtotal(), Decimal::from(10_000));
        assert_eq!(summary.total_discount(), Decimal::from(2000));
        assert_eq!(summary.total(), Decimal::from(8000));

        let row = summary.rows().first().ok_or("expected a row")?;

        assert_eq!(row.applied_unit_price, Decimal::from(8000));
        assert_eq!(
            row.purchase,
            Purchase::Subscription {
                plan_name: "Every month".to_string(),
                discount_percent: 20,
            }
        );
        assert!(row.is_discounted());

        Ok(())
    }

    #[test]
    fn unknown_selling_plan_means_no_discount() -> TestResult {
        let product = conditioner()?;
        let lines = [line(&product, 2, Some(SellingPlanId(77)), LineTreatment::Normal)];

        let summary = PriceSummary::from_lines(&lines, DEFAULT_UPSELL_PERCENT);

        assert_eq!(summary.subtotal(), Decimal::from(20_000));
        assert_eq!(summary.total_discount(), Decimal::ZERO);
        assert_eq!(summary.item_count(), 2);

        Ok(())
    }

    #[test]
    fn compare_at_price_is_display_only() -> TestResult {
        let product = conditioner()?;
        let lines = [line(&product, 2, None, LineTreatment::Normal)];

        let summary = PriceSummary::from_lines(&lines, DEFAULT_UPSELL_PERCENT);
        let row = summary.rows().first().ok_or("expected a row")?;

        assert_eq!(summary.subtotal(), Decimal::from(20_000));
        assert!(!summary.has_discount());
        assert_eq!(row.compare_at_total, Some(Decimal::from(24_000)));

        Ok(())
    }

    #[test]
    fn upsell_lines_get_flat_discount() -> TestResult {
        let product = conditioner()?;
        let lines = [line(&product, 1, None, LineTreatment::UpsellDiscount)];

        let summary = PriceSummary::from_lines(&lines, DEFAULT_UPSELL_PERCENT);

        assert_eq!(summary.subtotal(), Decimal::from(10_000));
        assert_eq!(summary.total_discount(), Decimal::from(5000));
        assert_eq!(summary.total(), Decimal::from(5000));

        Ok(())
    }

    #[test]
    fn gift_and_bogo_lines_do_not_count() -> TestResult {
        let product = conditioner()?;
        let lines = [
            line(&product, 2, None, LineTreatment::Normal),
            line(&product, 2, None, LineTreatment::BogoFree),
            line(&product, 1, None, LineTreatment::Gift),
        ];

        let summary = PriceSummary::from_lines(&lines, DEFAULT_UPSELL_PERCENT);

        assert_eq!(summary.subtotal(), Decimal::from(20_000));
        assert_eq!(summary.item_count(), 2);
        assert_eq!(summary.free_item_count(), 2);
        assert_eq!(summary.rows().len(), 1);

        Ok(())
    }

    #[test]
    fn huge_quantities_saturate_item_counts() -> TestResult {
        let product = conditioner()?;
        let other = Arc::new(Product::new(
            ProductId(4),
            "Shampoo",
            "shampoo",
            vec![Variant::new(VariantId(400), "Default Title", 1)],
        )?);
        let lines = [
            line(&product, u32::MAX, None, LineTreatment::Normal),
            LineItem::new(VariantId(400), 1, Arc::clone(&other), None, LineTreatment::Normal),
            line(&product, u32::MAX, None, LineTreatment::BogoFree),
            LineItem::new(VariantId(400), 1, other, None, LineTreatment::BogoFree),
        ];

        let summary = PriceSummary::from_lines(&lines, DEFAULT_UPSELL_PERCENT);

        assert_eq!(summary.item_count(), u32::MAX);
        assert_eq!(summary.free_item_count(), u32::MAX);
        assert_eq!(summary.rows().len(), 2);

        Ok(())
    }

    #[test]
    fn empty_cart_is_all_zero() {
        let summary = PriceSummary::from_lines(&[], DEFAULT_UPSELL_PERCENT);

        assert_eq!(summary.total(), Decimal::ZERO);
        assert_eq!(summary.item_count(), 0);
        assert!(summary.rows().is_empty());
    }
}
