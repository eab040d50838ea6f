//! Signed-in user profile
//!
//! The `user` storage entry is written by the sign-in flow; the storefront
//! core only reads it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::storage::{self, Storage, USER_KEY};

/// Profile fields the checkout cares about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Given name
    #[serde(default)]
    pub first_name: String,

    /// Family name
    #[serde(default)]
    pub last_name: String,

    /// Contact phone number
    #[serde(default)]
    pub phone_number: Option<String>,

    /// Credit available for the `loan` payment method
    #[serde(default)]
    pub loan_balance: Decimal,

    /// Saved delivery address
    #[serde(default)]
    pub address: Option<serde_json::Value>,

    /// Lifts per-order purchase limits for this user
    #[serde(default)]
    pub bypass_product_quantity_restriction: bool,
}

impl UserProfile {
    /// Read the persisted profile, if a user is signed in.
    pub fn load(storage: &dyn Storage) -> Option<Self> {
        storage::read_json(storage, USER_KEY)
    }

    /// Full display name
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::storage::MemoryStorage;

    use super::*;

    #[test]
    fn loads_partial_profiles() -> TestResult {
        let storage = MemoryStorage::new();

        storage.set(
            USER_KEY,
            r#"{"first_name":"Abebe","last_name":"Kebede","loan_balance":"2500.00"}"#,
        )?;

        let user = UserProfile::load(&storage).ok_or("profile should load")?;

        assert_eq!(user.full_name(), "Abebe Kebede");
        assert_eq!(user.loan_balance, Decimal::from(2500));
        assert!(!user.bypass_product_quantity_restriction);

        Ok(())
    }

    #[test]
    fn missing_profile_is_none() {
        assert_eq!(UserProfile::load(&MemoryStorage::new()), None);
    }
}
