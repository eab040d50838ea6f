//! `reqwest` implementation of [`StorefrontApi`].

use std::time::Duration;

use async_trait::async_trait;
use gebeya::{
    catalog::{Category, Package, Page, Product},
    ids::OrderId,
    orders::{NewOrder, OrderReceipt, OrderStatus},
    payments::MakePaymentResponse,
};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::retry::{self, RetryPolicy};

use super::{ApiError, BearerToken, ProductQuery, StorefrontApi};

/// Connection settings for [`HttpStorefrontApi`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// API base, e.g. `"https://api.seregelagebeya.com/api/v1"`
    pub base_url: String,

    /// Signed-in user's token
    pub token: Option<BearerToken>,

    /// Per-request timeout
    pub timeout: Duration,

    /// Retry policy for `GET` requests
    pub retry: RetryPolicy,
}

/// Storefront API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStorefrontApi {
    base_url: String,
    token: Option<BearerToken>,
    retry: RetryPolicy,
    http: Client,
}

/// Single resources may or may not be wrapped in `{"data": ...}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,

    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct OtpBody<'a> {
    otp: &'a str,
}

impl HttpStorefrontApi {
    /// Create a client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an absolute URL or the HTTP
    /// client cannot be built.
    pub fn new(config: HttpConfig) -> Result<Self, ApiError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();

        Url::parse(&base_url).map_err(|_| ApiError::InvalidUrl(config.base_url.clone()))?;

        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            base_url,
            token: config.token,
            retry: config.retry,
            http,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self
            .http
            .request(method, format!("{}/{path}", self.base_url))
            .header(reqwest::header::ACCEPT, "application/json");

        match &self.token {
            Some(token) => request.bearer_auth(token.expose()),
            None => request,
        }
    }

    async fn execute(request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();

        let message = parsed
            .message
            .or(parsed.error)
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| format!("request failed with status {status}"));

        Err(ApiError::Server { status, message })
    }

    fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
        serde_json::from_str(body).map_err(ApiError::Decode)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        debug!(path, "GET");

        retry::with_backoff(self.retry, move || async move {
            let body = Self::execute(self.request(Method::GET, path).query(query)).await?;

            Self::decode(&body)
        })
        .await
    }

    async fn post<B: Serialize + Sync>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<String, ApiError> {
        debug!(path, "POST");

        let request = self.request(Method::POST, path);

        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };

        Self::execute(request).await
    }
}

#[async_trait]
impl StorefrontApi for HttpStorefrontApi {
    async fn list_products(&self, query: ProductQuery) -> Result<Page<Product>, ApiError> {
        self.get("products", &query.query_pairs()).await
    }

    async fn list_categories(&self, page: u32) -> Result<Page<Category>, ApiError> {
        self.get("categories", &[("page", page.to_string())]).await
    }

    async fn category_products(
        &self,
        category: u64,
        page: u32,
    ) -> Result<Page<Product>, ApiError> {
        self.get(
            &format!("categories/{category}/products"),
            &[("page", page.to_string())],
        )
        .await
    }

    async fn subcategory_products(
        &self,
        subcategory: u64,
        page: u32,
    ) -> Result<Page<Product>, ApiError> {
        self.get(
            &format!("subcategories/{subcategory}/products"),
            &[("page", page.to_string())],
        )
        .await
    }

    async fn list_packages(&self, page: u32) -> Result<Page<Package>, ApiError> {
        self.get("packages", &[("page", page.to_string())]).await
    }

    async fn create_order(&self, order: NewOrder) -> Result<OrderReceipt, ApiError> {
        let body = self.post("orders", Some(&order)).await?;

        Self::decode::<Envelope<OrderReceipt>>(&body).map(Envelope::into_inner)
    }

    async fn make_payment(
        &self,
        order: OrderId,
        otp: Option<String>,
    ) -> Result<MakePaymentResponse, ApiError> {
        let path = format!("orders/{order}/make-payment");
        let otp = otp.as_deref().map(|otp| OtpBody { otp });

        let body = self.post(&path, otp.as_ref()).await?;

        if body.trim().is_empty() {
            return Ok(MakePaymentResponse::default());
        }

        Self::decode::<Envelope<MakePaymentResponse>>(&body).map(Envelope::into_inner)
    }

    async fn cancel_order(&self, order: OrderId) -> Result<(), ApiError> {
        self.post::<()>(&format!("orders/{order}/cancel"), None)
            .await
            .map(drop)
    }

    async fn resend_otp(&self, order: OrderId) -> Result<(), ApiError> {
        self.post::<()>(&format!("orders/{order}/resend-otp"), None)
            .await
            .map(drop)
    }

    async fn get_order(&self, order: OrderId) -> Result<OrderReceipt, ApiError> {
        self.get::<Envelope<OrderReceipt>>(&format!("orders/{order}"), &[])
            .await
            .map(Envelope::into_inner)
    }

    async fn list_orders(
        &self,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderReceipt>, ApiError> {
        let query: Vec<_> = status
            .map(|status| ("status", status.as_str().to_string()))
            .into_iter()
            .collect();

        self.get::<Envelope<Vec<OrderReceipt>>>("orders", &query)
            .await
            .map(Envelope::into_inner)
    }
}
