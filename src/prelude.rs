//! Gebeya prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{CartLedger, CartLine, CartLineItem, CartLinePackage, CartState, QuantityPolicy},
    catalog::{Category, Feed, Listing, Package, Page, PageMeta, PriceRange, Product, SortOrder, Subcategory},
    checkout::{CheckoutAction, CheckoutError, CheckoutMachine, CheckoutStage, CheckoutState, ShippingStep},
    ids::{DeliveryTypeId, DiscountTypeId, OrderId, PackageId, ProductId, TypedId},
    money::{Birr, birr, format_price},
    orders::{NewOrder, OrderLine, OrderReceipt, OrderStatus, ReceiptStore},
    payments::{ApprovalFlow, MakePaymentResponse, PaymentInstruction, PaymentMethod},
    pricing::{CartTotals, PricingRules, calculate_cart_totals},
    shipping::{ShippingDetails, ShippingIssue, ShippingRejected},
    storage::{FileStorage, MemoryStorage, Storage, StorageError},
    user::UserProfile,
    wishlist::{WishlistLedger, WishlistLineItem},
};
