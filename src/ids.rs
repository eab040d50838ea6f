//! Typed Ids
//!
//! The storefront API hands out plain integer ids for several unrelated
//! resources. Product and package ids in particular overlap numerically, so
//! each namespace gets its own [`TypedId`] marker and the compiler refuses to
//! compare across them.

use std::{
    cmp::Ordering,
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    hash::{Hash, Hasher},
    marker::PhantomData,
    num::ParseIntError,
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

/// An integer id scoped to the resource `T`.
pub struct TypedId<T>(u64, PhantomData<T>);

/// Marker for catalogue products.
#[derive(Debug)]
pub enum ProductMarker {}

/// Marker for package deals.
#[derive(Debug)]
pub enum PackageMarker {}

/// Marker for orders.
#[derive(Debug)]
pub enum OrderMarker {}

/// Marker for delivery types.
#[derive(Debug)]
pub enum DeliveryTypeMarker {}

/// Marker for discount types.
#[derive(Debug)]
pub enum DiscountTypeMarker {}

/// Product id
pub type ProductId = TypedId<ProductMarker>;

/// Package id
pub type PackageId = TypedId<PackageMarker>;

/// Order id
pub type OrderId = TypedId<OrderMarker>;

/// Delivery type id
pub type DeliveryTypeId = TypedId<DeliveryTypeMarker>;

/// Discount type id
pub type DiscountTypeId = TypedId<DiscountTypeMarker>;

impl<T> TypedId<T> {
    /// Wrap a raw id.
    pub const fn new(id: u64) -> Self {
        Self(id, PhantomData)
    }

    /// The raw integer id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl<T> Clone for TypedId<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TypedId<T> {}

impl<T> Debug for TypedId<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Debug::fmt(&self.0, f)
    }
}

impl<T> Display for TypedId<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.0, f)
    }
}

impl<T> PartialEq for TypedId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for TypedId<T> {}

impl<T> Hash for TypedId<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T> PartialOrd for TypedId<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for TypedId<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T> From<u64> for TypedId<T> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<T> FromStr for TypedId<T> {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self::new)
    }
}

impl<T> Serialize for TypedId<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

/// Ids arrive as numbers from most endpoints and as strings from a few.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

impl<'de, T> Deserialize<'de> for TypedId<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawId::deserialize(deserializer)? {
            RawId::Number(id) => Ok(Self::new(id)),
            RawId::Text(text) => text
                .parse()
                .map_err(|error| D::Error::custom(format!("invalid id {text:?}: {error}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn deserializes_numbers_and_numeric_strings() -> TestResult {
        let from_number: ProductId = serde_json::from_str("42")?;
        let from_text: ProductId = serde_json::from_str("\"42\"")?;

        assert_eq!(from_number, from_text);
        assert_eq!(from_number.get(), 42);

        Ok(())
    }

    #[test]
    fn rejects_non_numeric_strings() {
        let result: Result<ProductId, _> = serde_json::from_str("\"abc\"");

        assert!(result.is_err(), "expected decode error, got {result:?}");
    }

    #[test]
    fn serializes_as_integer() -> TestResult {
        assert_eq!(serde_json::to_string(&PackageId::new(7))?, "7");

        Ok(())
    }
}
