//! Quantity limits

use super::lines::CartLine;

/// How the ledger bounds line quantities.
///
/// Every line holds at least one unit. When the stock snapshot is known
/// (non-zero) the line cannot exceed it, and a listing's per-order limit
/// applies unless the shopper is allowed to bypass it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuantityPolicy {
    /// Ignore per-order purchase limits.
    pub bypass_order_limit: bool,
}

impl QuantityPolicy {
    /// Policy for a shopper that may exceed per-order limits.
    pub const fn bypassing_order_limit() -> Self {
        Self {
            bypass_order_limit: true,
        }
    }

    /// The largest quantity `line` may hold, if bounded.
    pub fn ceiling<L: CartLine>(&self, line: &L) -> Option<u32> {
        let stock = Some(line.left_in_stock()).filter(|&stock| stock > 0);
        let order_limit = line
            .max_per_order()
            .filter(|&limit| limit > 0 && !self.bypass_order_limit);

        match (stock, order_limit) {
            (Some(stock), Some(limit)) => Some(stock.min(limit)),
            (bound, None) | (None, bound) => bound,
        }
    }

    /// Bound `requested` to what `line` may hold.
    pub fn clamp<L: CartLine>(&self, line: &L, requested: u32) -> u32 {
        let upper = self.ceiling(line).unwrap_or(u32::MAX);

        requested.clamp(1, upper.max(1))
    }
}
