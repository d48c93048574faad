//! Scenarios
//!
//! A YAML script of product snapshots and cart commands, replayed through a
//! [`CartEngine`] to price a cart without a storefront.

use std::{collections::BTreeMap, fs, path::Path, sync::Arc};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::{
    cart::{CartEngine, LineRequest, commands::Command, key::LineTreatment},
    products::{Product, SellingPlanId, VariantId},
    render::CartView,
};

/// Scenario errors
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// IO error reading the scenario file
    #[error("Failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// A step refers to a product the scenario does not define
    #[error("Product not found: {0}")]
    ProductNotFound(String),
}

/// A line as written in a scenario step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LineStep {
    /// Key of the product in the scenario's product table
    pub product: String,

    /// Variant to buy
    pub variant: VariantId,

    /// Quantity
    pub quantity: u32,

    /// Selling plan
    #[serde(default)]
    pub selling_plan: Option<SellingPlanId>,

    /// Pricing treatment
    #[serde(default)]
    pub treatment: LineTreatment,
}

/// One scripted cart command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// See [`Command::SetLine`]
    SetLine(LineStep),

    /// See [`Command::RemoveLine`]
    RemoveLine {
        /// Variant of the line
        variant: VariantId,
        /// Selling plan of the line
        #[serde(default)]
        selling_plan: Option<SellingPlanId>,
    },

    /// See [`Command::ReplaceLine`]
    ReplaceLine(LineStep),

    /// See [`Command::AddUpsellPackage`]
    AddUpsellPackage {
        /// Package lines
        items: Vec<LineStep>,
    },

    /// See [`Command::ResolveGift`]
    ResolveGift {
        /// Tier ordinal
        tier: u8,
        /// Key of the gift product
        product: String,
    },

    /// See [`Command::Reset`]
    Reset,
}

#[derive(Debug, Deserialize)]
struct ScenarioFile {
    #[serde(default)]
    products: BTreeMap<String, Product>,

    #[serde(default)]
    steps: Vec<Step>,
}

/// A parsed scenario.
#[derive(Debug, Clone)]
pub struct Scenario {
    products: BTreeMap<String, Arc<Product>>,
    steps: Vec<Step>,
}

impl Scenario {
    /// Load a scenario file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let contents = fs::read_to_string(path)?;

        Self::from_yaml(&contents)
    }

    /// Parse a scenario document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be parsed.
    pub fn from_yaml(contents: &str) -> Result<Self, ScenarioError> {
        let file: ScenarioFile = serde_norway::from_str(contents)?;

        Ok(Self {
            products: file
                .products
                .into_iter()
                .map(|(key, product)| (key, Arc::new(product)))
                .collect(),
            steps: file.steps,
        })
    }

    /// Look up a product by key.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::ProductNotFound`] when the key is not defined.
    pub fn product(&self, key: &str) -> Result<&Arc<Product>, ScenarioError> {
        self.products
            .get(key)
            .ok_or_else(|| ScenarioError::ProductNotFound(key.to_string()))
    }

    /// Scripted steps.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Turn every step into a command, resolving product keys.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::ProductNotFound`] for the first unknown product key.
    pub fn commands(&self) -> Result<Vec<Command>, ScenarioError> {
        self.steps.iter().map(|step| self.command(step)).collect()
    }

    /// Replay every step and return the final view.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::ProductNotFound`] before applying anything if
    /// a step refers to an unknown product.
    pub fn replay(&self, engine: &mut CartEngine) -> Result<CartView, ScenarioError> {
        let commands = self.commands()?;
        let mut view = engine.view();

        for command in commands {
            view = engine.dispatch(command);
        }

        debug!(steps = self.steps.len(), "replayed scenario");

        Ok(view)
    }

    fn command(&self, step: &Step) -> Result<Command, ScenarioError> {
        Ok(match step {
            Step::SetLine(line) => Command::SetLine(self.request(line)?),
            Step::RemoveLine {
                variant,
                selling_plan,
            } => Command::RemoveLine {
                variant_id: *variant,
                selling_plan_id: *selling_plan,
            },
            Step::ReplaceLine(line) => Command::ReplaceLine(self.request(line)?),
            Step::AddUpsellPackage { items } => Command::AddUpsellPackage(
                items
                    .iter()
                    .map(|line| self.request(line))
                    .collect::<Result<_, _>>()?,
            ),
            Step::ResolveGift { tier, product } => Command::ResolveGift {
                tier: *tier,
                product: Arc::clone(self.product(product)?),
            },
            Step::Reset => Command::Reset,
        })
    }

    fn request(&self, line: &LineStep) -> Result<LineRequest, ScenarioError> {
        Ok(
            LineRequest::new(line.variant, line.quantity, Arc::clone(self.product(&line.product)?))
                .with_selling_plan(line.selling_plan)
                .with_treatment(line.treatment),
        )
    }
}
