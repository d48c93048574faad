//! Commerce backend
//!
//! The remote storefront the cart is eventually submitted to. Product
//! lookups never fail from the caller's point of view; cart mutations
//! surface the storefront's own error message.

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::products::{Product, SellingPlanId, VariantId};

pub mod storefront;

pub use storefront::StorefrontClient;

/// One line of a remote add request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemoteLine {
    /// Variant id
    pub id: VariantId,

    /// Quantity to add
    pub quantity: u32,

    /// Selling plan, omitted for one-time purchases
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selling_plan: Option<SellingPlanId>,
}

/// A line of the remote cart.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteCartItem {
    /// Variant id
    pub variant_id: VariantId,

    /// Quantity
    pub quantity: u32,

    /// Line title
    #[serde(default)]
    pub title: String,
}

/// The remote cart as returned by the storefront.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CartSnapshot {
    /// Cart token
    #[serde(default)]
    pub token: Option<String>,

    /// Order note
    #[serde(default)]
    pub note: Option<String>,

    /// Total units
    #[serde(default)]
    pub item_count: u32,

    /// Lines
    #[serde(default)]
    pub items: Vec<RemoteCartItem>,
}

/// Errors raised by the commerce backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport or body decoding failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The storefront answered with an error.
    #[error("storefront rejected the request ({status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Error description from the response body
        message: String,
    },
}

/// Remote cart and catalogue operations.
#[automock]
#[async_trait]
pub trait CommerceBackend: Send + Sync {
    /// Fetch a product snapshot by handle. Missing or malformed products are `None`.
    async fn fetch_product(&self, handle: &str) -> Option<Product>;

    /// Add lines to the remote cart.
    async fn cart_add(&self, items: &[RemoteLine]) -> Result<(), BackendError>;

    /// Empty the remote cart.
    async fn cart_clear(&self) -> Result<(), BackendError>;

    /// Read the remote cart.
    async fn cart_get_current(&self) -> Result<CartSnapshot, BackendError>;

    /// Attach a free-text note to the remote cart.
    async fn cart_set_note(&self, note: &str) -> Result<(), BackendError>;
}
