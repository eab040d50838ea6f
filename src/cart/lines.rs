//! Cart lines

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    catalog::{Package, Product},
    ids::{PackageId, ProductId},
};

/// Behaviour shared by product and package lines.
pub trait CartLine {
    /// Id type of the collection this line lives in.
    type Id: Copy + Eq;

    /// Line id
    fn id(&self) -> Self::Id;

    /// Unit price
    fn price(&self) -> Decimal;

    /// Units in the cart
    fn quantity(&self) -> u32;

    /// Overwrite the units in the cart.
    fn set_quantity(&mut self, quantity: u32);

    /// Stock snapshot taken when the line was added; 0 when unknown.
    fn left_in_stock(&self) -> u32;

    /// Per-order purchase limit, if the listing has one.
    fn max_per_order(&self) -> Option<u32> {
        None
    }

    /// Take the stock and order limits of a newer snapshot of the same listing.
    fn refresh_limits(&mut self, fresh: &Self);

    /// `price × quantity`, saturating instead of overflowing.
    fn line_total(&self) -> Decimal {
        self.price().saturating_mul(Decimal::from(self.quantity()))
    }
}

/// A product in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    /// Product id
    pub id: ProductId,

    /// Display name
    pub name: String,

    /// Unit price
    pub price: Decimal,

    /// Image URLs
    #[serde(default, alias = "image_paths")]
    pub images: Vec<String>,

    /// Units in the cart, at least 1
    pub quantity: u32,

    /// Stock snapshot; 0 when unknown
    #[serde(default)]
    pub left_in_stock: u32,

    /// Per-order purchase limit
    #[serde(default)]
    pub max_quantity_per_order: Option<u32>,
}

impl CartLineItem {
    /// Snapshot `product` into a new line.
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            images: product.images.clone(),
            quantity,
            left_in_stock: product.left_in_stock,
            max_quantity_per_order: product.max_quantity_per_order,
        }
    }
}

impl CartLine for CartLineItem {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }

    fn price(&self) -> Decimal {
        self.price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }

    fn left_in_stock(&self) -> u32 {
        self.left_in_stock
    }

    fn max_per_order(&self) -> Option<u32> {
        self.max_quantity_per_order
    }

    fn refresh_limits(&mut self, fresh: &Self) {
        self.left_in_stock = fresh.left_in_stock;
        self.max_quantity_per_order = fresh.max_quantity_per_order;
    }
}

/// A package deal in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLinePackage {
    /// Package id
    pub id: PackageId,

    /// Display name
    pub name: String,

    /// Package price
    pub price: Decimal,

    /// Cover image
    #[serde(default)]
    pub image: Option<String>,

    /// Units in the cart, at least 1
    pub quantity: u32,

    /// Stock snapshot; 0 when unknown
    #[serde(default)]
    pub left_in_stock: u32,
}

impl CartLinePackage {
    /// Snapshot `package` into a new line.
    pub fn from_package(package: &Package, quantity: u32) -> Self {
        Self {
            id: package.id,
            name: package.name.clone(),
            price: package.price,
            image: package.image.clone(),
            quantity,
            left_in_stock: package.left_in_stock,
        }
    }
}

impl CartLine for CartLinePackage {
    type Id = PackageId;

    fn id(&self) -> PackageId {
        self.id
    }

    fn price(&self) -> Decimal {
        self.price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }

    fn left_in_stock(&self) -> u32 {
        self.left_in_stock
    }

    fn refresh_limits(&mut self, fresh: &Self) {
        self.left_in_stock = fresh.left_in_stock;
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn persisted_line_keeps_price_as_string() -> TestResult {
        let line = CartLineItem {
            id: ProductId::new(3),
            name: "Teff".to_string(),
            price: Decimal::new(35_050, 2),
            images: Vec::new(),
            quantity: 2,
            left_in_stock: 0,
            max_quantity_per_order: None,
        };

        let json = serde_json::to_value(&line)?;

        assert_eq!(json["price"], "350.50");
        assert_eq!(json["id"], 3);
        assert_eq!(line.line_total(), Decimal::new(70_100, 2));

        Ok(())
    }

    #[test]
    fn legacy_lines_default_missing_fields() -> TestResult {
        let line: CartLinePackage =
            serde_json::from_str(r#"{"id":"5","name":"Holiday box","price":1200,"quantity":1}"#)?;

        assert_eq!(line.id, PackageId::new(5));
        assert_eq!(line.price, Decimal::from(1200));
        assert_eq!(line.image, None);
        assert_eq!(line.left_in_stock, 0);

        Ok(())
    }
}
