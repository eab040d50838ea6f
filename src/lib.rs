//! Gebeya
//!
//! Storefront state for the Seregela Gebeya online grocery: the cart and
//! wishlist ledgers, cart pricing, shipping validation, payment providers and
//! the checkout state machine. Nothing here performs network I/O; state is
//! mirrored to an injected [`storage::Storage`] after every mutation.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod ids;
pub mod money;
pub mod orders;
pub mod payments;
pub mod prelude;
pub mod pricing;
pub mod shipping;
pub mod storage;
pub mod user;
pub mod wishlist;
