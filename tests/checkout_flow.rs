//! Integration test for a full checkout against file-backed storage.
//!
//! Walks a shopper through adding to the cart, pricing it, placing a loan
//! order and reloading mid-approval, checking that the cart, receipt and
//! checkout stage all survive the reload.

use std::sync::Arc;

use rust_decimal::Decimal;
use testresult::TestResult;

use gebeya::prelude::*;

fn teff() -> Product {
    Product {
        id: ProductId::new(4),
        name: "Magna teff, 5kg".to_string(),
        price: Decimal::from(2500),
        images: vec!["/images/teff.png".to_string()],
        left_in_stock: 10,
        max_quantity_per_order: Some(3),
        description: None,
        category_id: None,
    }
}

fn holiday_box() -> Package {
    Package {
        id: PackageId::new(4),
        name: "Holiday box".to_string(),
        price: Decimal::from(1200),
        image: None,
        left_in_stock: 0,
        description: None,
    }
}

fn address() -> ShippingDetails {
    ShippingDetails {
        first_name: "Hana".to_string(),
        last_name: "Tesfaye".to_string(),
        phone_number: "0911223344".to_string(),
        city: "Addis Ababa".to_string(),
        sub_city: "Yeka".to_string(),
        woreda: "07".to_string(),
        neighborhood: "Megenagna".to_string(),
        house_number: "221".to_string(),
        latitude: 9.02,
        longitude: 38.8,
    }
}

fn receipt_for(request: &NewOrder, totals: &CartTotals) -> TestResult<OrderReceipt> {
    Ok(serde_json::from_value(serde_json::json!({
        "id": 77,
        "status": "pending",
        "order_cost": totals.subtotal.amount().to_string(),
        "discount": totals.discount.amount().to_string(),
        "delivery_cost": totals.shipping.amount().to_string(),
        "total_cost": totals.grand_total.amount().to_string(),
        "payment_method": request.payment_method,
        "products": request.products,
        "packages": request.packages,
    }))?)
}

#[test]
fn loan_checkout_survives_a_reload() -> TestResult {
    let dir = tempfile::tempdir()?;
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(dir.path())?);

    storage.set(
        "user",
        r#"{"first_name":"Hana","last_name":"Tesfaye","loan_balance":"20000.00"}"#,
    )?;

    let user = UserProfile::load(storage.as_ref());
    let mut cart = CartLedger::hydrate(storage.clone());

    // Per-order limit of 3 applies to a regular shopper
    assert_eq!(cart.add_item(&teff(), 5), 3);
    assert_eq!(cart.add_package(&holiday_box(), 1), 1);

    let totals = cart.totals(&PricingRules::default());

    assert_eq!(*totals.subtotal.amount(), Decimal::from(8700));
    assert_eq!(*totals.grand_total.amount(), Decimal::from(8800));
    assert!(format_price(*totals.grand_total.amount()).contains("8,800.00"), "grand total");

    let mut checkout = CheckoutMachine::new();

    checkout.capture_shipping(address(), Some(DeliveryTypeId::new(2)))?;
    checkout.select_payment_method(PaymentMethod::Loan)?;

    cart.set_shipping_details(address());
    cart.set_delivery_type(DeliveryTypeId::new(2));
    cart.set_payment_method(PaymentMethod::Loan);

    let request = checkout.order_request(cart.state(), None, None)?;
    let receipt = receipt_for(&request, &totals)?;

    let mut receipts = ReceiptStore::hydrate(storage.clone());
    receipts.set(receipt.clone());
    checkout.order_created(receipt)?;

    // Reload before approval
    let reloaded_cart = CartLedger::hydrate(storage.clone());
    let reloaded_receipt = ReceiptStore::hydrate(storage.clone())
        .current()
        .cloned()
        .ok_or("receipt should survive the reload")?;

    assert_eq!(reloaded_cart.state(), cart.state());

    let mut resumed = CheckoutMachine::resume(reloaded_receipt, reloaded_cart.state());

    assert_eq!(resumed.stage(), CheckoutStage::OrderCreated);
    assert_eq!(
        resumed.begin_approval(user.as_ref())?,
        ApprovalFlow::Otp {
            balance_check: true
        }
    );
    assert_eq!(resumed.otp_order(CheckoutAction::SubmitOtp)?, OrderId::new(77));

    resumed.apply_payment(PaymentInstruction::Settled)?;
    assert_eq!(resumed.stage(), CheckoutStage::Completed);

    cart.clear();
    receipts.clear();

    assert!(CartLedger::hydrate(storage.clone()).is_empty());
    assert!(ReceiptStore::hydrate(storage).current().is_none());

    Ok(())
}

#[test]
fn short_loan_balance_returns_to_method_selection() -> TestResult {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());

    storage.set("user", r#"{"loan_balance": 100}"#)?;

    let user = UserProfile::load(storage.as_ref());
    let mut cart = CartLedger::hydrate(storage.clone());

    cart.add_package(&holiday_box(), 1);

    let mut checkout = CheckoutMachine::new();

    checkout.capture_shipping(address(), Some(DeliveryTypeId::new(1)))?;
    checkout.select_payment_method(PaymentMethod::Loan)?;

    let request = checkout.order_request(cart.state(), None, None)?;
    checkout.order_created(receipt_for(&request, &cart.totals(&PricingRules::default()))?)?;

    let result = checkout.begin_approval(user.as_ref());

    assert!(
        matches!(result, Err(CheckoutError::InsufficientLoanBalance { .. })),
        "unexpected result {result:?}"
    );
    assert_eq!(checkout.stage(), CheckoutStage::PaymentMethodSelected);

    // The shopper can pick another provider and carry on
    checkout.select_payment_method(PaymentMethod::Telebirr)?;
    assert_eq!(checkout.order_request(cart.state(), None, None)?.payment_method, PaymentMethod::Telebirr);

    Ok(())
}
