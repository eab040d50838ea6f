use std::ops::Range;

use gebeya::{
    cart::CartLedger,
    catalog::{Package, Product},
    money::format_price,
    orders::OrderReceipt,
    pricing::PricingRules,
    wishlist::WishlistLineItem,
};
use rust_decimal::Decimal;
use tabled::{
    builder::Builder,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};

/// Style a built table: rounded borders, bold header, `right` columns
/// right-aligned.
fn render(builder: Builder, right: Range<usize>, header: bool) -> String {
    let mut table = builder.build();

    table.with(Theme::from(Style::modern_rounded()));

    if header {
        table.modify(Rows::first(), Color::BOLD);
    }

    table.modify(Columns::new(right), Alignment::right());

    table.to_string()
}

fn stock_label(left_in_stock: u32) -> String {
    if left_in_stock == 0 {
        String::new()
    } else {
        format!("{left_in_stock} left")
    }
}

pub(crate) fn product_table(products: &[Product]) -> String {
    let mut builder = Builder::default();

    builder.push_record(["Id", "Product", "Price", "Stock"]);

    for product in products {
        builder.push_record([
            product.id.to_string(),
            product.name.clone(),
            format_price(product.price),
            stock_label(product.left_in_stock),
        ]);
    }

    render(builder, 2..4, true)
}

pub(crate) fn package_table(packages: &[Package]) -> String {
    let mut builder = Builder::default();

    builder.push_record(["Id", "Package", "Price"]);

    for package in packages {
        builder.push_record([
            package.id.to_string(),
            package.name.clone(),
            format_price(package.price),
        ]);
    }

    render(builder, 2..3, true)
}

pub(crate) fn wishlist_table(items: &[WishlistLineItem]) -> String {
    let mut builder = Builder::default();

    builder.push_record(["Id", "Product", "Price", "Stock"]);

    for item in items {
        builder.push_record([
            item.id.to_string(),
            item.name.clone(),
            format_price(item.price),
            stock_label(item.left_in_stock),
        ]);
    }

    render(builder, 2..4, true)
}

pub(crate) fn cart_table(cart: &CartLedger) -> String {
    let mut lines = Builder::default();

    lines.push_record(["Id", "Item", "Qty", "Price", "Line Total"]);

    for item in cart.items() {
        lines.push_record([
            item.id.to_string(),
            item.name.clone(),
            item.quantity.to_string(),
            format_price(item.price),
            format_price(item.price * Decimal::from(item.quantity)),
        ]);
    }

    for package in cart.packages() {
        lines.push_record([
            package.id.to_string(),
            format!("{} (package)", package.name),
            package.quantity.to_string(),
            format_price(package.price),
            format_price(package.price * Decimal::from(package.quantity)),
        ]);
    }

    let totals = cart.totals(&PricingRules::default());
    let mut summary = Builder::default();

    summary.push_record(["Subtotal".to_string(), format_price(*totals.subtotal.amount())]);

    if totals.free_shipping {
        summary.push_record(["Shipping".to_string(), "free".to_string()]);
    } else {
        summary.push_record(["Shipping".to_string(), format_price(*totals.shipping.amount())]);
    }

    if !totals.discount.is_zero() {
        summary.push_record([
            "Discount".to_string(),
            format!("-{}", format_price(*totals.discount.amount())),
        ]);
    }

    summary.push_record(["Total".to_string(), format_price(*totals.grand_total.amount())]);

    format!("{}\n{}", render(lines, 2..5, true), render(summary, 1..2, false))
}

pub(crate) fn receipt_table(receipt: &OrderReceipt) -> String {
    let mut details = Builder::default();

    details.push_record(["Order".to_string(), receipt.id.to_string()]);
    details.push_record(["Status".to_string(), receipt.status.as_str().to_string()]);
    details.push_record([
        "Payment method".to_string(),
        receipt.payment_method.label().to_string(),
    ]);
    details.push_record(["Order cost".to_string(), format_price(receipt.order_cost)]);
    details.push_record(["Delivery".to_string(), format_price(receipt.delivery_cost)]);
    details.push_record(["Discount".to_string(), format_price(receipt.discount)]);
    details.push_record(["Total".to_string(), format_price(receipt.total_cost)]);

    let details = render(details, 1..2, false);

    if receipt.products.is_empty() && receipt.packages.is_empty() {
        return details;
    }

    let mut lines = Builder::default();

    lines.push_record(["Qty", "Item", "Price"]);

    for line in receipt.products.iter().chain(&receipt.packages) {
        lines.push_record([
            line.quantity.to_string(),
            line.name.clone(),
            line.price.map(format_price).unwrap_or_default(),
        ]);
    }

    format!("{details}\n{}", render(lines, 2..3, true))
}

pub(crate) fn orders_table(orders: &[OrderReceipt]) -> String {
    let mut builder = Builder::default();

    builder.push_record(["Order", "Status", "Payment", "Total"]);

    for order in orders {
        builder.push_record([
            order.id.to_string(),
            order.status.as_str().to_string(),
            order.payment_method.as_str().to_string(),
            format_price(order.total_cost),
        ]);
    }

    render(builder, 3..4, true)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gebeya::{
        ids::{OrderId, ProductId},
        orders::{OrderStatus, ReceiptLine},
        payments::PaymentMethod,
        storage::MemoryStorage,
    };

    use super::*;

    fn teff(price: i64) -> Product {
        Product {
            id: ProductId::new(4),
            name: "Teff".to_string(),
            price: Decimal::from(price),
            images: Vec::new(),
            left_in_stock: 3,
            max_quantity_per_order: None,
            description: None,
            category_id: None,
        }
    }

    fn order(id: u64, total: i64) -> OrderReceipt {
        OrderReceipt {
            id: OrderId::new(id),
            status: OrderStatus::Pending,
            order_cost: Decimal::from(total),
            discount: Decimal::ZERO,
            delivery_cost: Decimal::ZERO,
            total_cost: Decimal::from(total),
            payment_method: PaymentMethod::CbeBirr,
            products: vec![ReceiptLine {
                id: 4,
                name: "Teff".to_string(),
                quantity: 2,
                price: Some(Decimal::from(2500)),
            }],
            packages: Vec::new(),
        }
    }

    fn row_with<'a>(table: &'a str, needle: &str) -> &'a str {
        table
            .lines()
            .find(|line| line.contains(needle))
            .unwrap_or_default()
    }

    #[test]
    fn product_prices_use_currency_formatting() {
        let table = product_table(&[teff(2500)]);
        let row = row_with(&table, "Teff");

        assert!(row.contains(&format_price(Decimal::from(2500))), "row: {row}");
        assert!(row.contains("3 left"), "row: {row}");
        assert!(!table.contains(" ETB"), "table: {table}");
    }

    #[test]
    fn cart_lists_line_totals_and_grand_total() {
        let mut cart = CartLedger::hydrate(Arc::new(MemoryStorage::new()));

        cart.add_item(&teff(2500), 2);

        let table = cart_table(&cart);

        assert!(row_with(&table, "Teff").contains("5,000.00"), "table: {table}");
        assert!(row_with(&table, "│ Total").contains(&format_price(
            *cart.totals(&PricingRules::default()).grand_total.amount()
        )));
    }

    #[test]
    fn order_totals_are_right_aligned_in_one_column() {
        let table = orders_table(&[order(7, 100), order(31, 109_001)]);

        let short = row_with(&table, "100.00");
        let long = row_with(&table, "109,001.00");

        assert!(short.contains("cbe-birr"), "row: {short}");
        assert_eq!(
            short.find("100.00").map(|at| at + "100.00".len()),
            long.find("109,001.00").map(|at| at + "109,001.00".len()),
            "amounts should end in the same column:\n{table}"
        );
    }

    #[test]
    fn receipt_lists_its_lines() {
        let table = receipt_table(&order(31, 5000));

        assert!(row_with(&table, "│ Total").contains("5,000.00"), "table: {table}");
        assert!(row_with(&table, "Teff").contains("2,500.00"), "table: {table}");
    }
}
