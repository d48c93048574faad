//! Storefront AJAX API client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::{
    backend::{BackendError, CartSnapshot, CommerceBackend, RemoteLine},
    products::Product,
};

/// HTTP client for a storefront's `/cart/*.js` and `/products/*.js` endpoints.
///
/// The client keeps cookies so every call after the first operates on the
/// same remote cart.
#[derive(Debug, Clone)]
pub struct StorefrontClient {
    base_url: String,
    http: Client,
}

impl StorefrontClient {
    /// Create a client for the storefront at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .user_agent(concat!("quiz-cart/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Storefront origin requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `/products/{handle}.js` with the handle encoded as one path segment.
    fn product_url(&self, handle: &str) -> Option<Url> {
        let mut url = Url::parse(&self.base_url).ok()?;

        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .push("products")
            .push(&format!("{handle}.js"));

        Some(url)
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<Response, BackendError> {
        let response = self.http.post(self.url(path)).json(&body).send().await?;

        ensure_success(response).await
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    description: Option<String>,
    message: Option<String>,
}

async fn ensure_success(response: Response) -> Result<Response, BackendError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.description.or(body.message))
        .unwrap_or(text);

    Err(BackendError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl CommerceBackend for StorefrontClient {
    async fn fetch_product(&self, handle: &str) -> Option<Product> {
        let Some(url) = self.product_url(handle) else {
            warn!(handle, base_url = %self.base_url, "cannot build product url");
            return None;
        };

        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(handle, error = %err, "product request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(handle, status = response.status().as_u16(), "product not available");
            return None;
        }

        match response.json::<Product>().await {
            Ok(product) => {
                debug!(handle, variants = product.variant_count(), "fetched product");
                Some(product)
            }
            Err(err) => {
                warn!(handle, error = %err, "discarding malformed product");
                None
            }
        }
    }

    async fn cart_add(&self, items: &[RemoteLine]) -> Result<(), BackendError> {
        self.post("/cart/add.js", json!({ "items": items })).await?;

        Ok(())
    }

    async fn cart_clear(&self) -> Result<(), BackendError> {
        self.post("/cart/clear.js", json!({})).await?;

        Ok(())
    }

    async fn cart_get_current(&self) -> Result<CartSnapshot, BackendError> {
        let response = self.http.get(self.url("/cart.js")).send().await?;

        Ok(ensure_success(response).await?.json().await?)
    }

    async fn cart_set_note(&self, note: &str) -> Result<(), BackendError> {
        self.post("/cart/update.js", json!({ "note": note })).await?;

        Ok(())
    }
}
