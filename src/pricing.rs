//! Cart pricing

use rust_decimal::Decimal;

use crate::{
    cart::{CartLine, CartLineItem, CartLinePackage},
    money::{Birr, birr},
};

/// Shipping and discount thresholds.
///
/// Both thresholds are strict: a subtotal exactly at the threshold does not
/// qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingRules {
    /// Subtotals above this ship for free
    pub free_shipping_threshold: Decimal,

    /// Flat shipping fee below the threshold
    pub shipping_fee: Decimal,

    /// Subtotals above this earn [`PricingRules::discount_amount`]
    pub discount_threshold: Decimal,

    /// Flat discount for large orders
    pub discount_amount: Decimal,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Decimal::from(10_000),
            shipping_fee: Decimal::from(100),
            discount_threshold: Decimal::from(100_000),
            discount_amount: Decimal::from(1_000),
        }
    }
}

/// Priced summary of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartTotals {
    /// Sum over product lines
    pub items_subtotal: Birr,

    /// Sum over package lines
    pub packages_subtotal: Birr,

    /// Products plus packages
    pub subtotal: Birr,

    /// Shipping fee, zero when free
    pub shipping: Birr,

    /// Large-order discount
    pub discount: Birr,

    /// `subtotal - discount + shipping`
    pub grand_total: Birr,

    /// Whether shipping is free
    pub free_shipping: bool,
}

impl PricingRules {
    /// Price a snapshot of the cart.
    pub fn totals(&self, items: &[CartLineItem], packages: &[CartLinePackage]) -> CartTotals {
        let items_subtotal = lines_subtotal(items);
        let packages_subtotal = lines_subtotal(packages);
        let subtotal = items_subtotal.saturating_add(packages_subtotal);

        let shipping = if subtotal > self.free_shipping_threshold {
            Decimal::ZERO
        } else {
            self.shipping_fee
        };

        let discount = if subtotal > self.discount_threshold {
            self.discount_amount
        } else {
            Decimal::ZERO
        };

        let grand_total = subtotal.saturating_sub(discount).saturating_add(shipping);

        CartTotals {
            items_subtotal: birr(items_subtotal),
            packages_subtotal: birr(packages_subtotal),
            subtotal: birr(subtotal),
            shipping: birr(shipping),
            discount: birr(discount),
            grand_total: birr(grand_total),
            free_shipping: shipping.is_zero(),
        }
    }
}

/// Price a cart under the default [`PricingRules`].
pub fn calculate_cart_totals(items: &[CartLineItem], packages: &[CartLinePackage]) -> CartTotals {
    PricingRules::default().totals(items, packages)
}

fn lines_subtotal<L: CartLine>(lines: &[L]) -> Decimal {
    lines
        .iter()
        .fold(Decimal::ZERO, |acc, line| acc.saturating_add(line.line_total()))
}
