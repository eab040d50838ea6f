//! Catalogue
//!
//! Snapshots of the listings served by the storefront API, plus [`Feed`], the
//! page accumulator behind the infinite-scroll product, category and package
//! grids.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{PackageId, ProductId};

/// A product listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product id
    pub id: ProductId,

    /// Display name
    pub name: String,

    /// Unit price
    pub price: Decimal,

    /// Image URLs, first one is the cover
    #[serde(default, alias = "image_paths")]
    pub images: Vec<String>,

    /// Units left at the time the listing was fetched
    #[serde(default)]
    pub left_in_stock: u32,

    /// Per-order purchase limit, when the product has one
    #[serde(default)]
    pub max_quantity_per_order: Option<u32>,

    /// Long description
    #[serde(default)]
    pub description: Option<String>,

    /// Owning category
    #[serde(default)]
    pub category_id: Option<u64>,
}

/// A package deal: several products sold together under one price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    /// Package id
    pub id: PackageId,

    /// Display name
    pub name: String,

    /// Package price
    pub price: Decimal,

    /// Cover image
    #[serde(default, alias = "image_path")]
    pub image: Option<String>,

    /// Units left at the time the listing was fetched
    #[serde(default)]
    pub left_in_stock: u32,

    /// Long description
    #[serde(default)]
    pub description: Option<String>,
}

/// A top-level category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category id
    pub id: u64,

    /// Display name
    pub name: String,

    /// Cover image
    #[serde(default, alias = "image_path")]
    pub image: Option<String>,
}

/// A subcategory within a [`Category`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcategory {
    /// Subcategory id
    pub id: u64,

    /// Display name
    pub name: String,

    /// Parent category
    #[serde(default)]
    pub category_id: Option<u64>,
}

/// Pagination metadata returned alongside every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// One-based index of this page
    pub current_page: u32,

    /// Index of the final page
    pub last_page: u32,

    /// Page size
    #[serde(default)]
    pub per_page: u32,

    /// Total number of entries across all pages
    #[serde(default)]
    pub total: u64,
}

/// A page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Entries on this page
    pub data: Vec<T>,

    /// Pagination metadata
    pub meta: PageMeta,
}

/// Anything a [`Feed`] can hold.
pub trait Listing {
    /// Raw id used for de-duplication.
    fn listing_id(&self) -> u64;

    /// Display name used for alphabetical sorting.
    fn listing_name(&self) -> &str;

    /// Price used for price sorting; listings without one sort as free.
    fn listing_price(&self) -> Decimal {
        Decimal::ZERO
    }
}

impl Listing for Product {
    fn listing_id(&self) -> u64 {
        self.id.get()
    }

    fn listing_name(&self) -> &str {
        &self.name
    }

    fn listing_price(&self) -> Decimal {
        self.price
    }
}

impl Listing for Package {
    fn listing_id(&self) -> u64 {
        self.id.get()
    }

    fn listing_name(&self) -> &str {
        &self.name
    }

    fn listing_price(&self) -> Decimal {
        self.price
    }
}

impl Listing for Category {
    fn listing_id(&self) -> u64 {
        self.id
    }

    fn listing_name(&self) -> &str {
        &self.name
    }
}

/// Client-side ordering of a feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Order in which the API returned the entries
    #[default]
    Newest,

    /// Cheapest first
    PriceAscending,

    /// Most expensive first
    PriceDescending,

    /// Alphabetical by name
    NameAscending,
}

/// Errors building a [`PriceRange`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PriceRangeError {
    /// The lower bound exceeds the upper bound.
    #[error("minimum price {min} is greater than maximum price {max}")]
    Inverted {
        /// Requested minimum
        min: Decimal,

        /// Requested maximum
        max: Decimal,
    },

    /// A bound is negative.
    #[error("price bound {0} is negative")]
    Negative(Decimal),
}

/// An inclusive price filter; either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceRange {
    min: Option<Decimal>,
    max: Option<Decimal>,
}

impl PriceRange {
    /// Build a price filter.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceRangeError`] if a bound is negative or `min > max`.
    pub fn new(min: Option<Decimal>, max: Option<Decimal>) -> Result<Self, PriceRangeError> {
        if let Some(bound) = min.into_iter().chain(max).find(Decimal::is_sign_negative) {
            return Err(PriceRangeError::Negative(bound));
        }

        if let (Some(min), Some(max)) = (min, max)
            && min > max
        {
            return Err(PriceRangeError::Inverted { min, max });
        }

        Ok(Self { min, max })
    }

    /// Lower bound
    pub fn min(&self) -> Option<Decimal> {
        self.min
    }

    /// Upper bound
    pub fn max(&self) -> Option<Decimal> {
        self.max
    }

    /// Query parameters understood by the products endpoint.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(2);

        if let Some(min) = self.min {
            pairs.push(("price[gte]", min.to_string()));
        }

        if let Some(max) = self.max {
            pairs.push(("price[lte]", max.to_string()));
        }

        pairs
    }

    /// Whether `price` falls inside the range.
    pub fn contains(&self, price: Decimal) -> bool {
        self.min.is_none_or(|min| price >= min) && self.max.is_none_or(|max| price <= max)
    }
}

/// Accumulates pages of listings for infinite scrolling.
#[derive(Debug, Clone)]
pub struct Feed<T> {
    entries: Vec<T>,
    seen: FxHashSet<u64>,
    current_page: u32,
    last_page: Option<u32>,
}

impl<T> Default for Feed<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            seen: FxHashSet::default(),
            current_page: 0,
            last_page: None,
        }
    }
}

impl<T: Listing + Clone> Feed<T> {
    /// An empty feed that has not loaded anything yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a freshly fetched page.
    ///
    /// Pages at or below the last absorbed page are ignored, which makes
    /// duplicate responses from rapid repeated requests harmless. Returns the
    /// number of new entries.
    pub fn absorb(&mut self, page: Page<T>) -> usize {
        if page.meta.current_page <= self.current_page {
            return 0;
        }

        self.current_page = page.meta.current_page;
        self.last_page = Some(page.meta.last_page);

        let before = self.entries.len();

        for entry in page.data {
            if self.seen.insert(entry.listing_id()) {
                self.entries.push(entry);
            }
        }

        self.entries.len() - before
    }

    /// The page to request next, or `None` once the final page is loaded.
    pub fn next_page(&self) -> Option<u32> {
        match self.last_page {
            None => Some(1),
            Some(last) if self.current_page < last => Some(self.current_page + 1),
            Some(_) => None,
        }
    }

    /// Whether more pages remain.
    pub fn has_more(&self) -> bool {
        self.next_page().is_some()
    }

    /// Drop everything, e.g. after the search term or filter changed.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Entries in API order.
    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    /// Number of entries loaded so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been loaded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in the requested order.
    pub fn sorted(&self, order: SortOrder) -> Vec<T> {
        let mut entries = self.entries.clone();

        entries.sort_by(|a, b| match order {
            SortOrder::Newest => Ordering::Equal,
            SortOrder::PriceAscending => a.listing_price().cmp(&b.listing_price()),
            SortOrder::PriceDescending => b.listing_price().cmp(&a.listing_price()),
            SortOrder::NameAscending => a
                .listing_name()
                .to_lowercase()
                .cmp(&b.listing_name().to_lowercase()),
        });

        entries
    }
}
