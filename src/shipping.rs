//! Shipping details and their checkout preconditions

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::ids::DeliveryTypeId;

/// Shortest neighborhood description the checkout accepts.
pub const MIN_NEIGHBORHOOD_LEN: usize = 4;

/// Where and to whom an order is delivered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShippingDetails {
    /// Recipient given name
    #[serde(default)]
    pub first_name: String,

    /// Recipient family name
    #[serde(default)]
    pub last_name: String,

    /// Recipient phone number
    #[serde(default)]
    pub phone_number: String,

    /// City
    #[serde(default)]
    pub city: String,

    /// Sub-city
    #[serde(default)]
    pub sub_city: String,

    /// Woreda
    #[serde(default)]
    pub woreda: String,

    /// Neighborhood or landmark
    #[serde(default)]
    pub neighborhood: String,

    /// House number
    #[serde(default)]
    pub house_number: String,

    /// Latitude captured from the device, 0 when not captured
    #[serde(default)]
    pub latitude: f64,

    /// Longitude captured from the device, 0 when not captured
    #[serde(default)]
    pub longitude: f64,
}

impl ShippingDetails {
    /// Whether a device location was captured. A capture always sets the
    /// latitude; the longitude alone says nothing.
    pub fn has_geolocation(&self) -> bool {
        self.latitude.is_finite() && self.latitude != 0.0
    }
}

/// A single unmet shipping precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShippingIssue {
    /// No device location was captured.
    GeolocationMissing,

    /// The neighborhood description is shorter than [`MIN_NEIGHBORHOOD_LEN`].
    NeighborhoodTooShort {
        /// Characters supplied
        actual: usize,
    },

    /// No delivery type was chosen.
    DeliveryTypeMissing,
}

impl Display for ShippingIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::GeolocationMissing => write!(f, "location has not been captured"),
            Self::NeighborhoodTooShort { actual } => write!(
                f,
                "neighborhood must be at least {MIN_NEIGHBORHOOD_LEN} characters (got {actual})"
            ),
            Self::DeliveryTypeMissing => write!(f, "no delivery type selected"),
        }
    }
}

/// Every precondition a shipping submission failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("shipping details rejected: {}", join(.0))]
pub struct ShippingRejected(pub SmallVec<[ShippingIssue; 3]>);

impl ShippingRejected {
    /// The failed preconditions, in check order.
    pub fn issues(&self) -> &[ShippingIssue] {
        &self.0
    }

    /// Whether `issue`'s kind is among the failures.
    pub fn contains(&self, issue: ShippingIssue) -> bool {
        self.0
            .iter()
            .any(|i| std::mem::discriminant(i) == std::mem::discriminant(&issue))
    }
}

fn join(issues: &[ShippingIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check every shipping precondition, reporting all failures at once.
///
/// # Errors
///
/// Returns [`ShippingRejected`] listing each unmet precondition.
pub fn validate(
    details: &ShippingDetails,
    delivery_type: Option<DeliveryTypeId>,
) -> Result<(), ShippingRejected> {
    let mut issues = SmallVec::new();

    if !details.has_geolocation() {
        issues.push(ShippingIssue::GeolocationMissing);
    }

    let neighborhood = details.neighborhood.chars().count();

    if neighborhood < MIN_NEIGHBORHOOD_LEN {
        issues.push(ShippingIssue::NeighborhoodTooShort {
            actual: neighborhood,
        });
    }

    if delivery_type.is_none() {
        issues.push(ShippingIssue::DeliveryTypeMissing);
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ShippingRejected(issues))
    }
}
