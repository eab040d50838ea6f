//! Cart
//!
//! The cart holds products and package deals in two separate collections.
//! Ids are namespaced by collection: a package and a product may share a
//! numeric id without ever being confused.

mod ledger;
mod lines;
mod quantity;

pub use ledger::{CartLedger, CartState};
pub use lines::{CartLine, CartLineItem, CartLinePackage};
pub use quantity::QuantityPolicy;
