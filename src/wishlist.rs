//! Wishlist

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    catalog::Product,
    ids::ProductId,
    storage::{self, Storage, WISHLIST_KEY},
};

/// A saved product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistLineItem {
    /// Product id
    pub id: ProductId,

    /// Display name
    pub name: String,

    /// Price when saved
    pub price: Decimal,

    /// Image URLs
    #[serde(default, alias = "image_paths")]
    pub images: Vec<String>,

    /// Stock snapshot; 0 when unknown
    #[serde(default)]
    pub left_in_stock: u32,
}

impl From<&Product> for WishlistLineItem {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            images: product.images.clone(),
            left_in_stock: product.left_in_stock,
        }
    }
}

/// Everything persisted under the `wishlist` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WishlistState {
    /// Saved products
    #[serde(default)]
    pub items: Vec<WishlistLineItem>,
}

/// Products the shopper has saved for later. Membership is boolean.
#[derive(Debug, Clone)]
pub struct WishlistLedger {
    state: WishlistState,
    storage: Arc<dyn Storage>,
}

impl WishlistLedger {
    /// Load the persisted wishlist, or start with an empty one.
    pub fn hydrate(storage: Arc<dyn Storage>) -> Self {
        let state = storage::read_json(storage.as_ref(), WISHLIST_KEY).unwrap_or_default();

        Self { state, storage }
    }

    /// Saved products
    pub fn items(&self) -> &[WishlistLineItem] {
        &self.state.items
    }

    /// Whether `id` is saved.
    pub fn contains(&self, id: ProductId) -> bool {
        self.state.items.iter().any(|item| item.id == id)
    }

    /// Save `product` if absent, drop it if present. Returns whether it is
    /// saved afterwards.
    pub fn toggle(&mut self, product: &Product) -> bool {
        let saved = if self.contains(product.id) {
            self.state.items.retain(|item| item.id != product.id);
            false
        } else {
            self.state.items.push(WishlistLineItem::from(product));
            true
        };

        debug!(product = %product.id, saved, "toggled wishlist entry");

        self.persist();

        saved
    }

    /// Drop a saved product. Dropping an absent id is a no-op.
    pub fn remove(&mut self, id: ProductId) {
        self.state.items.retain(|item| item.id != id);
        self.persist();
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.state.items.clear();
        self.persist();
    }

    fn persist(&self) {
        storage::write_json(self.storage.as_ref(), WISHLIST_KEY, &self.state);
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::MemoryStorage;

    use super::*;

    fn product(id: u64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Decimal::from(120),
            images: vec![format!("/img/{id}.png")],
            left_in_stock: 3,
            max_quantity_per_order: None,
            description: None,
            category_id: None,
        }
    }

    #[test]
    fn toggle_is_its_own_inverse() {
        let mut wishlist = WishlistLedger::hydrate(Arc::new(MemoryStorage::new()));

        wishlist.toggle(&product(2));
        let before = wishlist.items().to_vec();

        assert!(wishlist.toggle(&product(5)));
        assert!(!wishlist.toggle(&product(5)));
        assert_eq!(wishlist.items(), before.as_slice());

        assert!(!wishlist.toggle(&product(2)));
        assert!(wishlist.toggle(&product(2)));
        assert!(wishlist.contains(ProductId::new(2)));
    }

    #[test]
    fn clear_twice_is_empty_both_times() {
        let mut wishlist = WishlistLedger::hydrate(Arc::new(MemoryStorage::new()));

        wishlist.toggle(&product(1));
        wishlist.clear();
        assert!(wishlist.items().is_empty());

        wishlist.clear();
        assert!(wishlist.items().is_empty());
    }

    #[test]
    fn mutations_survive_reload() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut wishlist = WishlistLedger::hydrate(storage.clone());

        wishlist.toggle(&product(1));
        wishlist.toggle(&product(4));
        wishlist.remove(ProductId::new(1));
        wishlist.remove(ProductId::new(99));

        let reloaded = WishlistLedger::hydrate(storage);

        assert_eq!(reloaded.items().len(), 1);
        assert!(reloaded.contains(ProductId::new(4)));
        assert_eq!(reloaded.items()[0].images, ["/img/4.png"]);
    }
}
