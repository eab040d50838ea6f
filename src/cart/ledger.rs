//! Cart ledger

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    catalog::{Package, Product},
    ids::{DeliveryTypeId, PackageId, ProductId},
    orders::OrderLine,
    payments::PaymentMethod,
    pricing::{CartTotals, PricingRules},
    shipping::ShippingDetails,
    storage::{self, CART_KEY, Storage},
};

use super::{
    lines::{CartLine, CartLineItem, CartLinePackage},
    quantity::QuantityPolicy,
};

/// Everything persisted under the `cart` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartState {
    /// Products
    #[serde(default)]
    pub items: Vec<CartLineItem>,

    /// Package deals
    #[serde(default)]
    pub packages: Vec<CartLinePackage>,

    /// Last submitted shipping details
    #[serde(default, rename = "shippingDetails")]
    pub shipping_details: Option<ShippingDetails>,

    /// Last selected payment provider
    #[serde(default, rename = "paymentDetails")]
    pub payment_details: Option<PaymentMethod>,

    /// Last selected delivery type
    #[serde(default)]
    pub delivery_type_id: Option<DeliveryTypeId>,
}

impl CartState {
    /// Whether neither products nor packages are in the cart.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.packages.is_empty()
    }

    /// Total units across both collections.
    pub fn unit_count(&self) -> u64 {
        let items = self.items.iter().map(|i| u64::from(i.quantity));
        let packages = self.packages.iter().map(|p| u64::from(p.quantity));

        items.chain(packages).sum()
    }

    /// Products as id and quantity pairs for an order request.
    pub fn product_lines(&self) -> Vec<OrderLine<ProductId>> {
        order_lines(&self.items)
    }

    /// Packages as id and quantity pairs for an order request.
    pub fn package_lines(&self) -> Vec<OrderLine<PackageId>> {
        order_lines(&self.packages)
    }
}

fn order_lines<L: CartLine>(lines: &[L]) -> Vec<OrderLine<L::Id>> {
    lines
        .iter()
        .map(|line| OrderLine {
            id: line.id(),
            quantity: line.quantity(),
        })
        .collect()
}

/// The shopper's cart.
///
/// Mutations apply in memory first, then the whole [`CartState`] is written to
/// storage. A failed write is logged and does not undo the mutation.
#[derive(Debug, Clone)]
pub struct CartLedger {
    state: CartState,
    policy: QuantityPolicy,
    storage: Arc<dyn Storage>,
}

impl CartLedger {
    /// Load the persisted cart, or start with an empty one.
    pub fn hydrate(storage: Arc<dyn Storage>) -> Self {
        let state = storage::read_json(storage.as_ref(), CART_KEY).unwrap_or_default();

        Self {
            state,
            policy: QuantityPolicy::default(),
            storage,
        }
    }

    /// Use `policy` to bound quantities from now on.
    #[must_use]
    pub fn with_policy(mut self, policy: QuantityPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Current state
    pub fn state(&self) -> &CartState {
        &self.state
    }

    /// Products in the cart
    pub fn items(&self) -> &[CartLineItem] {
        &self.state.items
    }

    /// Packages in the cart
    pub fn packages(&self) -> &[CartLinePackage] {
        &self.state.packages
    }

    /// Whether the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Price the cart under `rules`.
    pub fn totals(&self, rules: &PricingRules) -> CartTotals {
        rules.totals(&self.state.items, &self.state.packages)
    }

    /// Add `quantity` units of `product`. Returns the line's new quantity.
    pub fn add_item(&mut self, product: &Product, quantity: u32) -> u32 {
        let stored = add_line(
            &mut self.state.items,
            CartLineItem::from_product(product, quantity),
            quantity,
            self.policy,
        );

        debug!(product = %product.id, quantity = stored, "added item to cart");

        self.persist();

        stored
    }

    /// Add `quantity` units of `package`. Returns the line's new quantity.
    pub fn add_package(&mut self, package: &Package, quantity: u32) -> u32 {
        let stored = add_line(
            &mut self.state.packages,
            CartLinePackage::from_package(package, quantity),
            quantity,
            self.policy,
        );

        debug!(package = %package.id, quantity = stored, "added package to cart");

        self.persist();

        stored
    }

    /// Remove a product line. Removing an absent id is a no-op.
    pub fn remove_item(&mut self, id: ProductId) {
        self.state.items.retain(|line| line.id != id);

        debug!(product = %id, "removed item from cart");

        self.persist();
    }

    /// Remove a package line. Removing an absent id is a no-op.
    pub fn remove_package(&mut self, id: PackageId) {
        self.state.packages.retain(|line| line.id != id);

        debug!(package = %id, "removed package from cart");

        self.persist();
    }

    /// Overwrite a product line's quantity. Returns the stored quantity, or
    /// `None` if the product is not in the cart.
    pub fn set_item_quantity(&mut self, id: ProductId, quantity: u32) -> Option<u32> {
        let stored = set_line_quantity(&mut self.state.items, id, quantity, self.policy)?;

        self.persist();

        Some(stored)
    }

    /// Overwrite a package line's quantity. Returns the stored quantity, or
    /// `None` if the package is not in the cart.
    pub fn set_package_quantity(&mut self, id: PackageId, quantity: u32) -> Option<u32> {
        let stored = set_line_quantity(&mut self.state.packages, id, quantity, self.policy)?;

        self.persist();

        Some(stored)
    }

    /// Empty both collections. Shipping, payment and delivery selections are
    /// kept.
    pub fn clear(&mut self) {
        self.state.items.clear();
        self.state.packages.clear();

        debug!("cleared cart");

        self.persist();
    }

    /// Remember the shipping details.
    pub fn set_shipping_details(&mut self, details: ShippingDetails) {
        self.state.shipping_details = Some(details);
        self.persist();
    }

    /// Remember the payment provider.
    pub fn set_payment_method(&mut self, method: PaymentMethod) {
        self.state.payment_details = Some(method);
        self.persist();
    }

    /// Remember the delivery type.
    pub fn set_delivery_type(&mut self, delivery_type: DeliveryTypeId) {
        self.state.delivery_type_id = Some(delivery_type);
        self.persist();
    }

    fn persist(&self) {
        storage::write_json(self.storage.as_ref(), CART_KEY, &self.state);
    }
}

fn add_line<L: CartLine>(lines: &mut Vec<L>, fresh: L, quantity: u32, policy: QuantityPolicy) -> u32 {
    if let Some(existing) = lines.iter_mut().find(|line| line.id() == fresh.id()) {
        existing.refresh_limits(&fresh);

        let wanted = existing.quantity().saturating_add(quantity);
        let stored = policy.clamp(&*existing, wanted);

        existing.set_quantity(stored);

        return stored;
    }

    let mut fresh = fresh;
    let stored = policy.clamp(&fresh, quantity);

    fresh.set_quantity(stored);
    lines.push(fresh);

    stored
}

fn set_line_quantity<L: CartLine>(
    lines: &mut [L],
    id: L::Id,
    quantity: u32,
    policy: QuantityPolicy,
) -> Option<u32> {
    let line = lines.iter_mut().find(|line| line.id() == id)?;
    let stored = policy.clamp(&*line, quantity);

    line.set_quantity(stored);

    Some(stored)
}
