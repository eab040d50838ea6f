//! Storefront client: HTTP access to the Gebeya API, catalogue browsing and
//! the checkout service built on the `gebeya` core.

pub mod api;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod context;
pub mod observability;
pub mod retry;
