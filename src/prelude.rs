//! Quiz Cart prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    backend::{BackendError, CartSnapshot, CommerceBackend, RemoteLine, StorefrontClient},
    cart::{
        CartEngine, LineRequest, ProductState,
        bogo::BogoConfig,
        commands::Command,
        gifts::{Audience, GiftProgress, GiftTier, GiftTiers},
        key::{LineKey, LineTreatment},
        summary::{LineRow, PriceSummary, Purchase},
    },
    checkout::{CheckoutError, CheckoutPlan, CheckoutState, CheckoutSubmitter, Redirect},
    config::{ConfigError, StoreConfig},
    money::{CurrencyContext, CurrencyError, MoneyFormatter},
    products::{Product, ProductError, ProductId, SellingPlanId, Variant, VariantId},
    quiz::{QuizResults, UpsellAction},
    receipt::{Receipt, ReceiptError},
    render::{CartView, RenderSink, TracingSink},
    scenario::{Scenario, ScenarioError},
};
