//! Checkout Submitter
//!
//! Drains the local working set into the remote cart, one request at a time,
//! then attaches the order note and hands back where to navigate.
//!
//! `Idle → Clearing → Adding(i) → NotingOrder → Redirecting`; any failure
//! returns the submitter to `Idle`. A failed add leaves the remote cart
//! partially filled.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    backend::{BackendError, CommerceBackend, RemoteLine},
    cart::{CartEngine, key::LineKey},
    products::VariantId,
    quiz::QuizResults,
};

pub mod note;

pub use note::{DEFAULT_NOTE_LIMIT, NOTE_TRUNCATION_MARKER, OrderNote};

/// Where the shopper is sent once the remote cart is ready.
pub const DEFAULT_CHECKOUT_PATH: &str = "/checkout";

/// Progress of a checkout submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckoutState {
    /// Nothing in flight
    #[default]
    Idle,

    /// Emptying the remote cart
    Clearing,

    /// Submitting the line at this index of the plan
    Adding(usize),

    /// Attaching the order note
    NotingOrder,

    /// Done; the caller navigates to checkout
    Redirecting,
}

/// Errors surfaced to the shopper during checkout. All are recoverable by
/// submitting again.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// There is nothing to submit.
    #[error("Please select at least one product")]
    EmptyCart,

    /// The remote cart could not be cleared.
    #[error("failed to clear cart: {0}")]
    Clear(#[source] BackendError),

    /// A line was rejected.
    #[error("failed to add item {variant_id}: {source}")]
    Add {
        /// Variant of the rejected line
        variant_id: VariantId,
        /// Backend failure
        #[source]
        source: BackendError,
    },

    /// The order note could not be attached.
    #[error("failed to update cart note: {0}")]
    Note(#[source] BackendError),
}

/// Checkout settings of the store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSettings {
    /// Maximum order note length in characters
    #[serde(default = "default_note_limit")]
    pub note_limit: usize,

    /// Path to navigate to after submission
    #[serde(default = "default_checkout_path")]
    pub checkout_path: String,
}

fn default_note_limit() -> usize {
    DEFAULT_NOTE_LIMIT
}

fn default_checkout_path() -> String {
    DEFAULT_CHECKOUT_PATH.to_string()
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            note_limit: DEFAULT_NOTE_LIMIT,
            checkout_path: default_checkout_path(),
        }
    }
}

/// Remote lines to submit, derived from the cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutPlan {
    lines: Vec<RemoteLine>,
    bogo_titles: Vec<String>,
}

impl CheckoutPlan {
    /// One remote line per local line, in cart order. BOGO-free lines are not
    /// submitted; their paid line goes out with its quantity doubled instead.
    pub fn for_cart(cart: &CartEngine) -> Self {
        let lines = cart.lines();
        let mut plan = Self::default();

        for line in lines.iter() {
            if line.quantity() == 0 || line.is_bogo_free() {
                continue;
            }

            let mut quantity = line.quantity();

            if line.selling_plan_id().is_none()
                && lines.contains(&LineKey::bogo_free(line.variant_id()))
            {
                quantity = quantity.saturating_mul(2);
                plan.bogo_titles.push(line.product().title().to_string());
            }

            plan.lines.push(RemoteLine {
                id: line.variant_id(),
                quantity,
                selling_plan: line.selling_plan_id(),
            });
        }

        plan
    }

    /// Lines in submission order.
    pub fn lines(&self) -> &[RemoteLine] {
        &self.lines
    }

    /// Titles of products whose quantity was doubled.
    pub fn bogo_titles(&self) -> &[String] {
        &self.bogo_titles
    }

    /// Whether there is nothing to submit.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// The outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Path to navigate to
    pub path: String,

    /// Note attached to the remote cart
    pub note: OrderNote,
}

/// Submits a [`CheckoutPlan`] to a [`CommerceBackend`].
pub struct CheckoutSubmitter {
    backend: Arc<dyn CommerceBackend>,
    settings: CheckoutSettings,
    state: CheckoutState,
}

impl std::fmt::Debug for CheckoutSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutSubmitter")
            .field("settings", &self.settings)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl CheckoutSubmitter {
    /// Create an idle submitter.
    pub fn new(backend: Arc<dyn CommerceBackend>, settings: CheckoutSettings) -> Self {
        Self {
            backend,
            settings,
            state: CheckoutState::Idle,
        }
    }

    /// Current state.
    pub fn state(&self) -> CheckoutState {
        self.state
    }

    /// Submit the plan and attach the order note.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptyCart`] without touching the backend when
    /// the plan is empty, otherwise the first backend failure. The submitter
    /// is back in [`CheckoutState::Idle`] after any error.
    pub async fn submit(
        &mut self,
        plan: &CheckoutPlan,
        quiz: Option<&QuizResults>,
    ) -> Result<Redirect, CheckoutError> {
        if plan.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let result = self.run(plan, quiz).await;

        if let Err(err) = &result {
            warn!(error = %err, "checkout failed");
            self.transition(CheckoutState::Idle);
        }

        result
    }

    async fn run(
        &mut self,
        plan: &CheckoutPlan,
        quiz: Option<&QuizResults>,
    ) -> Result<Redirect, CheckoutError> {
        self.transition(CheckoutState::Clearing);

        match self.backend.cart_get_current().await {
            Ok(current) => info!(
                stale_items = current.item_count,
                "discarding remote cart contents"
            ),
            Err(err) => warn!(error = %err, "could not read remote cart"),
        }

        self.backend
            .cart_clear()
            .await
            .map_err(CheckoutError::Clear)?;

        for (index, line) in plan.lines().iter().enumerate() {
            self.transition(CheckoutState::Adding(index));

            self.backend
                .cart_add(std::slice::from_ref(line))
                .await
                .map_err(|source| CheckoutError::Add {
                    variant_id: line.id,
                    source,
                })?;
        }

        self.transition(CheckoutState::NotingOrder);

        let note = OrderNote::build(plan.bogo_titles(), quiz).truncated(self.settings.note_limit);

        self.backend
            .cart_set_note(note.as_str())
            .await
            .map_err(CheckoutError::Note)?;

        self.transition(CheckoutState::Redirecting);

        Ok(Redirect {
            path: self.settings.checkout_path.clone(),
            note,
        })
    }

    fn transition(&mut self, state: CheckoutState) {
        info!(from = ?self.state, to = ?state, "checkout state");

        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use mockall::{Sequence, predicate::eq};
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use crate::{
        backend::{CartSnapshot, MockCommerceBackend},
        cart::{LineRequest, bogo::BogoConfig},
        money::CurrencyContext,
        products::{Product, ProductError, ProductId, SellingPlanId, Variant},
    };

    use super::*;

    fn product(handle: &str, variant: u64) -> Result<Arc<Product>, ProductError> {
        Ok(Arc::new(Product::new(
            ProductId(variant),
            handle,
            handle,
            vec![Variant::new(VariantId(variant), "", 2000)],
        )?))
    }

    fn cart() -> Result<CartEngine, ProductError> {
        let mut cart = CartEngine::new(CurrencyContext::base_only(USD))
            .with_bogo(BogoConfig::new(true, ["serum"]));

        cart.set_line(LineRequest::new(VariantId(1), 1, product("serum", 1)?));
        cart.set_line(
            LineRequest::new(VariantId(2), 2, product("mask", 2)?)
                .with_selling_plan(Some(SellingPlanId(9))),
        );

        Ok(cart)
    }

    #[test]
    fn plan_doubles_bogo_lines_and_skips_free_halves() -> TestResult {
        let plan = CheckoutPlan::for_cart(&cart()?);

        assert_eq!(
            plan.lines(),
            &[
                RemoteLine {
                    id: VariantId(1),
                    quantity: 2,
                    selling_plan: None,
                },
                RemoteLine {
                    id: VariantId(2),
                    quantity: 2,
                    selling_plan: Some(SellingPlanId(9)),
                },
            ]
        );
        assert_eq!(plan.bogo_titles(), &["serum".to_string()]);

        Ok(())
    }

    #[tokio::test]
    async fn empty_plan_is_rejected_without_backend_calls() {
        let mut backend = MockCommerceBackend::new();

        backend.expect_cart_clear().never();
        backend.expect_cart_add().never();

        let mut submitter = CheckoutSubmitter::new(Arc::new(backend), CheckoutSettings::default());
        let result = submitter.submit(&CheckoutPlan::default(), None).await;

        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
        assert_eq!(submitter.state(), CheckoutState::Idle);
    }

    #[tokio::test]
    async fn submits_clear_adds_and_note_in_order() -> TestResult {
        let plan = CheckoutPlan::for_cart(&cart()?);
        let mut seq = Sequence::new();
        let mut backend = MockCommerceBackend::new();

        backend
            .expect_cart_get_current()
            .once()
            .in_sequence(&mut seq)
            .returning(|| Ok(CartSnapshot::default()));
        backend
            .expect_cart_clear()
            .once()
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        backend
            .expect_cart_add()
            .once()
            .in_sequence(&mut seq)
            .withf(|items| items.len() == 1 && items.first().map(|i| i.id) == Some(VariantId(1)))
            .returning(|_| Ok(()));
        backend
            .expect_cart_add()
            .once()
            .in_sequence(&mut seq)
            .withf(|items| items.first().map(|i| i.id) == Some(VariantId(2)))
            .returning(|_| Ok(()));
        backend
            .expect_cart_set_note()
            .once()
            .in_sequence(&mut seq)
            .withf(|note: &str| note.contains("- serum"))
            .returning(|_| Ok(()));

        let mut submitter = CheckoutSubmitter::new(Arc::new(backend), CheckoutSettings::default());
        let redirect = submitter.submit(&plan, None).await?;

        assert_eq!(redirect.path, DEFAULT_CHECKOUT_PATH);
        assert_eq!(submitter.state(), CheckoutState::Redirecting);

        Ok(())
    }

    #[tokio::test]
    async fn failed_add_stops_the_sequence_and_returns_to_idle() -> TestResult {
        let plan = CheckoutPlan::for_cart(&cart()?);
        let mut backend = MockCommerceBackend::new();

        backend
            .expect_cart_get_current()
            .returning(|| Ok(CartSnapshot::default()));
        backend.expect_cart_clear().once().returning(|| Ok(()));
        backend.expect_cart_add().once().returning(|_| {
            Err(BackendError::Rejected {
                status: 422,
                message: "Sold out".to_string(),
            })
        });
        backend.expect_cart_set_note().never();

        let mut submitter = CheckoutSubmitter::new(Arc::new(backend), CheckoutSettings::default());
        let result = submitter.submit(&plan, None).await;

        assert!(matches!(
            result,
            Err(CheckoutError::Add {
                variant_id: VariantId(1),
                ..
            })
        ));
        assert_eq!(submitter.state(), CheckoutState::Idle);

        Ok(())
    }

    #[tokio::test]
    async fn unreadable_remote_cart_does_not_block_checkout() -> TestResult {
        let plan = CheckoutPlan::for_cart(&cart()?);
        let mut backend = MockCommerceBackend::new();

        backend.expect_cart_get_current().returning(|| {
            Err(BackendError::Rejected {
                status: 500,
                message: "down".to_string(),
            })
        });
        backend.expect_cart_clear().returning(|| Ok(()));
        backend.expect_cart_add().times(2).returning(|_| Ok(()));
        backend
            .expect_cart_set_note()
            .with(eq("--- QUIZ RESULTS ---\n\nBOGO PROMOTION:\nThe following products had Buy 1 Get 1 Free applied:\n- serum\n(Quantities have been doubled in the cart)\n\n--- END QUIZ RESULTS ---"))
            .returning(|_| Ok(()));

        let mut submitter = CheckoutSubmitter::new(Arc::new(backend), CheckoutSettings::default());

        submitter.submit(&plan, None).await?;

        Ok(())
    }
}
