//! Catalogue browsing.

use std::sync::Arc;

use gebeya::{
    catalog::{Category, Feed, Package, PriceRange, Product},
    ids::{PackageId, ProductId},
};
use tracing::debug;

use crate::api::{ApiError, ProductQuery, StorefrontApi};

/// Which product listing a browser pages through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSource {
    /// `GET /products`, with search and price filters
    #[default]
    All,

    /// `GET /categories/{id}/products`
    Category(u64),

    /// `GET /subcategories/{id}/products`
    Subcategory(u64),
}

/// Infinite-scroll state for the product, category and package grids.
///
/// Changing the search term, price filter or source resets the product feed
/// so the next [`Self::load_more`] starts again from page one.
pub struct CatalogBrowser {
    api: Arc<dyn StorefrontApi>,
    source: ProductSource,
    query: ProductQuery,
    products: Feed<Product>,
    categories: Feed<Category>,
    packages: Feed<Package>,
}

impl CatalogBrowser {
    #[must_use]
    pub fn new(api: Arc<dyn StorefrontApi>) -> Self {
        Self {
            api,
            source: ProductSource::All,
            query: ProductQuery::default(),
            products: Feed::new(),
            categories: Feed::new(),
            packages: Feed::new(),
        }
    }

    pub fn products(&self) -> &Feed<Product> {
        &self.products
    }

    pub fn categories(&self) -> &Feed<Category> {
        &self.categories
    }

    pub fn packages(&self) -> &Feed<Package> {
        &self.packages
    }

    pub fn query(&self) -> &ProductQuery {
        &self.query
    }

    /// Search products by name. An empty term clears the search.
    pub fn search(&mut self, name: impl Into<String>) {
        let name = name.into();

        self.query.name = Some(name).filter(|n| !n.trim().is_empty());
        self.source = ProductSource::All;
        self.products.reset();
    }

    /// Restrict products to `range`.
    pub fn filter_price(&mut self, range: PriceRange) {
        self.query.price = range;
        self.products.reset();
    }

    /// Browse a category or subcategory instead of the full catalogue.
    pub fn browse(&mut self, source: ProductSource) {
        self.source = source;
        self.products.reset();
    }

    /// Use `per_page` products per page from now on.
    pub fn set_page_size(&mut self, per_page: u32) {
        self.query.per_page = per_page.max(1);
        self.products.reset();
    }

    /// Fetch the next page of products. Returns the number of new products,
    /// 0 once the last page is loaded.
    ///
    /// # Errors
    ///
    /// Returns the API error; the feed is left as it was.
    pub async fn load_more(&mut self) -> Result<usize, ApiError> {
        let Some(page) = self.products.next_page() else {
            return Ok(0);
        };

        let fetched = match self.source {
            ProductSource::All => self.api.list_products(self.query.on_page(page)).await?,
            ProductSource::Category(id) => self.api.category_products(id, page).await?,
            ProductSource::Subcategory(id) => self.api.subcategory_products(id, page).await?,
        };

        let added = self.products.absorb(fetched);

        debug!(page, added, source = ?self.source, "loaded products");

        Ok(added)
    }

    /// Fetch the next page of categories.
    ///
    /// # Errors
    ///
    /// Returns the API error; the feed is left as it was.
    pub async fn load_more_categories(&mut self) -> Result<usize, ApiError> {
        let Some(page) = self.categories.next_page() else {
            return Ok(0);
        };

        let fetched = self.api.list_categories(page).await?;

        Ok(self.categories.absorb(fetched))
    }

    /// Fetch the next page of package deals.
    ///
    /// # Errors
    ///
    /// Returns the API error; the feed is left as it was.
    pub async fn load_more_packages(&mut self) -> Result<usize, ApiError> {
        let Some(page) = self.packages.next_page() else {
            return Ok(0);
        };

        let fetched = self.api.list_packages(page).await?;

        Ok(self.packages.absorb(fetched))
    }

    /// Page through the current product listing until `id` turns up.
    ///
    /// # Errors
    ///
    /// Returns the API error of the failing page.
    pub async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>, ApiError> {
        loop {
            if let Some(product) = self.products.entries().iter().find(|p| p.id == id) {
                return Ok(Some(product.clone()));
            }

            if !self.products.has_more() {
                return Ok(None);
            }

            self.load_more().await?;
        }
    }

    /// Page through the package deals until `id` turns up.
    ///
    /// # Errors
    ///
    /// Returns the API error of the failing page.
    pub async fn find_package(&mut self, id: PackageId) -> Result<Option<Package>, ApiError> {
        loop {
            if let Some(package) = self.packages.entries().iter().find(|p| p.id == id) {
                return Ok(Some(package.clone()));
            }

            if !self.packages.has_more() {
                return Ok(None);
            }

            self.load_more_packages().await?;
        }
    }
}
