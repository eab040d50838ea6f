//! Storefront REST API.

use async_trait::async_trait;
use gebeya::{
    catalog::{Category, Package, Page, PriceRange, Product},
    ids::OrderId,
    orders::{NewOrder, OrderReceipt, OrderStatus},
    payments::MakePaymentResponse,
};
use mockall::automock;

mod errors;
mod http;
mod token;

pub use errors::ApiError;
pub use http::{HttpConfig, HttpStorefrontApi};
pub use token::BearerToken;

/// Default number of products per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Filters for `GET /products`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
    /// Page to fetch, starting at 1
    pub page: u32,

    /// Products per page
    pub per_page: u32,

    /// Name search
    pub name: Option<String>,

    /// Price bounds
    pub price: PriceRange,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
            name: None,
            price: PriceRange::default(),
        }
    }
}

impl ProductQuery {
    /// The same filters on another page.
    #[must_use]
    pub fn on_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    /// Query string pairs, in request order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("paginate", self.per_page.to_string()),
        ];

        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            pairs.push(("name", name.to_string()));
        }

        pairs.extend(self.price.query_pairs());

        pairs
    }
}

#[automock]
#[async_trait]
pub trait StorefrontApi: Send + Sync {
    /// `GET /products`
    async fn list_products(&self, query: ProductQuery) -> Result<Page<Product>, ApiError>;

    /// `GET /categories`
    async fn list_categories(&self, page: u32) -> Result<Page<Category>, ApiError>;

    /// `GET /categories/{id}/products`
    async fn category_products(&self, category: u64, page: u32)
    -> Result<Page<Product>, ApiError>;

    /// `GET /subcategories/{id}/products`
    async fn subcategory_products(
        &self,
        subcategory: u64,
        page: u32,
    ) -> Result<Page<Product>, ApiError>;

    /// `GET /packages`
    async fn list_packages(&self, page: u32) -> Result<Page<Package>, ApiError>;

    /// `POST /orders`
    async fn create_order(&self, order: NewOrder) -> Result<OrderReceipt, ApiError>;

    /// `POST /orders/{id}/make-payment`, with the shopper's OTP when the
    /// provider needs one.
    async fn make_payment(
        &self,
        order: OrderId,
        otp: Option<String>,
    ) -> Result<MakePaymentResponse, ApiError>;

    /// `POST /orders/{id}/cancel`
    async fn cancel_order(&self, order: OrderId) -> Result<(), ApiError>;

    /// `POST /orders/{id}/resend-otp`
    async fn resend_otp(&self, order: OrderId) -> Result<(), ApiError>;

    /// `GET /orders/{id}`
    async fn get_order(&self, order: OrderId) -> Result<OrderReceipt, ApiError>;

    /// `GET /orders?status=`
    async fn list_orders(&self, status: Option<OrderStatus>)
    -> Result<Vec<OrderReceipt>, ApiError>;
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn product_query_skips_blank_search_and_open_bounds() -> TestResult {
        let query = ProductQuery {
            page: 3,
            name: Some("  ".to_string()),
            price: PriceRange::new(Some(Decimal::from(100)), None)?,
            ..ProductQuery::default()
        };

        assert_eq!(
            query.query_pairs(),
            [
                ("page", "3".to_string()),
                ("paginate", "20".to_string()),
                ("price[gte]", "100".to_string()),
            ]
        );

        Ok(())
    }

    #[test]
    fn on_page_keeps_filters() {
        let query = ProductQuery {
            name: Some("teff".to_string()),
            ..ProductQuery::default()
        };

        let next = query.on_page(2);

        assert_eq!(next.page, 2);
        assert_eq!(next.name.as_deref(), Some("teff"));
    }
}
