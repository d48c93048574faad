//! Buy-one-get-one eligibility

use rustc_hash::FxHashSet;
use serde::Deserialize;

use crate::products::Product;

/// Which products get a free paired line when bought as a one-time purchase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BogoConfig {
    #[serde(default)]
    enabled: bool,

    #[serde(default)]
    handles: FxHashSet<String>,
}

impl BogoConfig {
    /// Create a configuration.
    pub fn new<S: Into<String>>(enabled: bool, handles: impl IntoIterator<Item = S>) -> Self {
        Self {
            enabled,
            handles: handles.into_iter().map(Into::into).collect(),
        }
    }

    /// BOGO switched off.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Whether the promotion is running.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether `product` qualifies for a free paired line.
    pub fn is_eligible(&self, product: &Product) -> bool {
        self.enabled && self.handles.contains(product.handle())
    }
}
