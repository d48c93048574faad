//! Line items and their storage

use std::sync::Arc;

use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::{
    cart::key::{LineKey, LineTreatment},
    products::{Product, SellingPlanId, Variant, VariantId},
};

new_key_type! {
    /// Slot of a line in the line set
    pub struct LineSlot;
}

/// One entry in the cart's working set.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    variant_id: VariantId,
    quantity: u32,
    product: Arc<Product>,
    selling_plan_id: Option<SellingPlanId>,
    treatment: LineTreatment,
}

impl LineItem {
    /// Create a line.
    pub fn new(
        variant_id: VariantId,
        quantity: u32,
        product: Arc<Product>,
        selling_plan_id: Option<SellingPlanId>,
        treatment: LineTreatment,
    ) -> Self {
        Self {
            variant_id,
            quantity,
            product,
            selling_plan_id,
            treatment,
        }
    }

    /// Identity key of the line.
    pub fn key(&self) -> LineKey {
        LineKey::new(self.variant_id, self.selling_plan_id, self.treatment)
    }

    /// Variant id
    pub fn variant_id(&self) -> VariantId {
        self.variant_id
    }

    /// Quantity
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Product snapshot captured when the line was last set
    pub fn product(&self) -> &Arc<Product> {
        &self.product
    }

    /// Selling plan id, `None` for one-time purchases
    pub fn selling_plan_id(&self) -> Option<SellingPlanId> {
        self.selling_plan_id
    }

    /// Pricing treatment
    pub fn treatment(&self) -> LineTreatment {
        self.treatment
    }

    /// Whether the line is a gift.
    pub fn is_gift(&self) -> bool {
        self.treatment == LineTreatment::Gift
    }

    /// Whether the line is the free half of a BOGO pair.
    pub fn is_bogo_free(&self) -> bool {
        self.treatment == LineTreatment::BogoFree
    }

    /// Whether the line belongs to an upsell package.
    pub fn is_upsell_discount(&self) -> bool {
        self.treatment == LineTreatment::UpsellDiscount
    }

    /// Whether the line is paid for.
    pub fn is_paid(&self) -> bool {
        self.treatment.is_paid()
    }

    /// The variant whose price applies to this line.
    pub fn variant(&self) -> &Variant {
        self.product.resolve_variant(self.variant_id)
    }
}

/// Insertion-ordered line storage indexed by [`LineKey`].
#[derive(Debug, Clone, Default)]
pub struct LineSet {
    slots: SlotMap<LineSlot, LineItem>,
    index: FxHashMap<LineKey, LineSlot>,
    order: Vec<LineSlot>,
}

impl LineSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the set holds no lines.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Look up a line by key.
    pub fn get(&self, key: &LineKey) -> Option<&LineItem> {
        self.index.get(key).and_then(|slot| self.slots.get(*slot))
    }

    /// Whether a line with `key` exists.
    pub fn contains(&self, key: &LineKey) -> bool {
        self.index.contains_key(key)
    }

    pub(crate) fn get_mut(&mut self, key: &LineKey) -> Option<&mut LineItem> {
        let slot = *self.index.get(key)?;

        self.slots.get_mut(slot)
    }

    /// Append a line whose key is not yet present, or replace the existing
    /// line for that key in place.
    pub(crate) fn upsert(&mut self, line: LineItem) {
        let key = line.key();

        if let Some(existing) = self.get_mut(&key) {
            *existing = line;
            return;
        }

        let slot = self.slots.insert(line);
        self.index.insert(key, slot);
        self.order.push(slot);
    }

    /// Remove the line for `key`.
    pub(crate) fn remove(&mut self, key: &LineKey) -> Option<LineItem> {
        let slot = self.index.remove(key)?;

        self.order.retain(|s| *s != slot);
        self.slots.remove(slot)
    }

    /// Keys of every line matching `predicate`, in insertion order.
    pub fn keys_where(&self, predicate: impl Fn(&LineItem) -> bool) -> SmallVec<[LineKey; 4]> {
        self.iter()
            .filter(|line| predicate(line))
            .map(LineItem::key)
            .collect()
    }

    /// Lines in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &LineItem> {
        self.order.iter().filter_map(|slot| self.slots.get(*slot))
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
        self.order.clear();
    }
}
