//! Quiz Cart
//!
//! Quiz Cart is the pricing and incentive engine behind a quiz-driven product
//! recommendation cart: it owns the shopper's prospective line items, derives
//! subtotals and discounts, pairs buy-one-get-one lines, tracks which gift tiers
//! are unlocked, and submits the result to a storefront cart at checkout.

pub mod backend;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod discounts;
pub mod money;
pub mod observability;
pub mod prelude;
pub mod products;
pub mod quiz;
pub mod receipt;
pub mod render;
pub mod scenario;
