//! Money

use rust_decimal::{Decimal, RoundingStrategy};
use rusty_money::{
    Money,
    iso::{self, Currency},
};

/// The storefront prices everything in Ethiopian Birr.
pub const CURRENCY: &Currency = iso::ETB;

/// An amount of Birr.
pub type Birr = Money<'static, Currency>;

/// Wrap a decimal amount as Birr.
pub fn birr(amount: Decimal) -> Birr {
    Money::from_decimal(amount, CURRENCY)
}

/// Format an amount for display in the currency's own notation, rounded
/// half away from zero to two places.
pub fn format_price(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    birr(rounded).to_string()
}
