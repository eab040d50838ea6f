//! Orders and receipts

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    ids::{DeliveryTypeId, DiscountTypeId, OrderId, PackageId, ProductId},
    money::{Birr, birr},
    payments::PaymentMethod,
    shipping::ShippingDetails,
    storage::{self, RECEIPT_KEY, Storage},
};

/// Server-side order status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, awaiting payment
    #[default]
    Pending,

    /// Payment received
    Paid,

    /// Being prepared or delivered
    Processing,

    /// Delivered to the customer
    Delivered,

    /// Finished
    Completed,

    /// Cancelled by the customer or the shop
    Cancelled,

    /// Payment failed
    Failed,

    /// A status this client does not know about
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Whether the order has been paid for.
    pub const fn is_paid(self) -> bool {
        matches!(self, Self::Paid | Self::Processing | Self::Delivered | Self::Completed)
    }

    /// Whether the order can no longer change.
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Delivered | Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Query-string form, as used by `GET /orders?status=`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Processing => "processing",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

/// A purchased product or package as echoed back by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptLine {
    /// Product or package id
    pub id: u64,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Units ordered
    #[serde(default = "one")]
    pub quantity: u32,

    /// Unit price at the time of ordering
    #[serde(default)]
    pub price: Option<Decimal>,
}

const fn one() -> u32 {
    1
}

/// The server's record of a created order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    /// Order id
    pub id: OrderId,

    /// Current status
    #[serde(default)]
    pub status: OrderStatus,

    /// Cost of the goods
    #[serde(default)]
    pub order_cost: Decimal,

    /// Discount applied
    #[serde(default)]
    pub discount: Decimal,

    /// Delivery fee
    #[serde(default)]
    pub delivery_cost: Decimal,

    /// Amount due
    #[serde(default)]
    pub total_cost: Decimal,

    /// Provider chosen for this order
    pub payment_method: PaymentMethod,

    /// Ordered products
    #[serde(default)]
    pub products: Vec<ReceiptLine>,

    /// Ordered packages
    #[serde(default)]
    pub packages: Vec<ReceiptLine>,
}

impl OrderReceipt {
    /// Amount due, in Birr.
    pub fn total(&self) -> Birr {
        birr(self.total_cost)
    }
}

/// An id and quantity pair in an order request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine<I> {
    /// Product or package id
    pub id: I,

    /// Units requested
    pub quantity: u32,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewOrder {
    /// Chosen provider
    pub payment_method: PaymentMethod,

    /// Chosen delivery type
    pub delivery_type_id: DeliveryTypeId,

    /// Delivery address and contact
    pub shipping_detail: ShippingDetails,

    /// Discount scheme, if the shopper picked one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_type_id: Option<DiscountTypeId>,

    /// Products and quantities
    pub products: Vec<OrderLine<ProductId>>,

    /// Packages and quantities
    pub packages: Vec<OrderLine<PackageId>>,

    /// Provider PIN collected up front
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin_code: Option<String>,
}

/// The in-flight receipt, mirrored to storage so a reload keeps it.
#[derive(Debug, Clone)]
pub struct ReceiptStore {
    receipt: Option<OrderReceipt>,
    storage: Arc<dyn Storage>,
}

impl ReceiptStore {
    /// Load the persisted receipt, if any.
    pub fn hydrate(storage: Arc<dyn Storage>) -> Self {
        let receipt = storage::read_json(storage.as_ref(), RECEIPT_KEY);

        Self { receipt, storage }
    }

    /// The active receipt
    pub fn current(&self) -> Option<&OrderReceipt> {
        self.receipt.as_ref()
    }

    /// Make `receipt` the active receipt.
    pub fn set(&mut self, receipt: OrderReceipt) {
        debug!(order = %receipt.id, "storing receipt");

        storage::write_json(self.storage.as_ref(), RECEIPT_KEY, &receipt);

        self.receipt = Some(receipt);
    }

    /// Update the status of the active receipt if it matches `order`.
    pub fn update_status(&mut self, order: OrderId, status: OrderStatus) {
        let Some(receipt) = self.receipt.as_mut().filter(|r| r.id == order) else {
            return;
        };

        receipt.status = status;

        storage::write_json(self.storage.as_ref(), RECEIPT_KEY, &*receipt);
    }

    /// Drop the active receipt.
    pub fn clear(&mut self) -> Option<OrderReceipt> {
        storage::forget(self.storage.as_ref(), RECEIPT_KEY);

        self.receipt.take()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use testresult::TestResult;

    use crate::storage::MemoryStorage;

    use super::*;

    pub(crate) fn receipt(id: u64, method: PaymentMethod, total: i64) -> OrderReceipt {
        OrderReceipt {
            id: OrderId::new(id),
            status: OrderStatus::Pending,
            order_cost: Decimal::from(total),
            discount: Decimal::ZERO,
            delivery_cost: Decimal::ZERO,
            total_cost: Decimal::from(total),
            payment_method: method,
            products: Vec::new(),
            packages: Vec::new(),
        }
    }

    #[test]
    fn decodes_server_receipt() -> TestResult {
        let receipt: OrderReceipt = serde_json::from_str(
            r#"{
                "id": 31,
                "status": "pending",
                "order_cost": "5000.00",
                "discount": "0.00",
                "delivery_cost": "100.00",
                "total_cost": "5100.00",
                "payment_method": "telebirr",
                "products": [{"id": 4, "name": "Teff", "quantity": 2, "price": "2500.00"}],
                "packages": []
            }"#,
        )?;

        assert_eq!(receipt.id, OrderId::new(31));
        assert_eq!(*receipt.total().amount(), Decimal::from(5100));
        assert_eq!(receipt.products.len(), 1);

        Ok(())
    }

    #[test]
    fn unknown_status_does_not_fail_decoding() -> TestResult {
        let status: OrderStatus = serde_json::from_str("\"on_hold\"")?;

        assert_eq!(status, OrderStatus::Unknown);

        Ok(())
    }

    #[test]
    fn new_order_omits_absent_optionals() -> TestResult {
        let order = NewOrder {
            payment_method: PaymentMethod::Cbe,
            delivery_type_id: DeliveryTypeId::new(2),
            shipping_detail: ShippingDetails::default(),
            discount_type_id: None,
            products: vec![OrderLine {
                id: ProductId::new(4),
                quantity: 2,
            }],
            packages: Vec::new(),
            pin_code: None,
        };

        let json = serde_json::to_value(&order)?;

        assert_eq!(json["payment_method"], "cbe");
        assert_eq!(json["products"][0]["quantity"], 2);
        assert!(json.get("pin_code").is_none(), "pin_code should be omitted");
        assert!(
            json.get("discount_type_id").is_none(),
            "discount_type_id should be omitted"
        );

        Ok(())
    }

    #[test]
    fn receipt_store_survives_reload_and_clears() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());

        let mut store = ReceiptStore::hydrate(storage.clone());
        store.set(receipt(9, PaymentMethod::Loan, 300));

        let mut reloaded = ReceiptStore::hydrate(storage.clone());
        assert_eq!(reloaded.current().map(|r| r.id), Some(OrderId::new(9)));

        reloaded.update_status(OrderId::new(9), OrderStatus::Paid);
        assert_eq!(
            ReceiptStore::hydrate(storage.clone())
                .current()
                .map(|r| r.status),
            Some(OrderStatus::Paid)
        );

        assert!(reloaded.clear().is_some(), "clear should return the receipt");
        assert!(ReceiptStore::hydrate(storage).current().is_none());
    }
}
