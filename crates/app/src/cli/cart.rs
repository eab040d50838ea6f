use clap::{Args, Subcommand};
use gebeya::ids::{PackageId, ProductId};
use gebeya_app::context::AppContext;

use super::format::cart_table;

#[derive(Debug, Args)]
pub(crate) struct CartCommand {
    #[command(subcommand)]
    command: CartSubcommand,
}

#[derive(Debug, Subcommand)]
enum CartSubcommand {
    /// Show the cart and its totals
    Show,

    /// Add a product
    Add(AddArgs),

    /// Add a package deal
    AddPackage(AddArgs),

    /// Remove a product
    Remove(IdArgs),

    /// Remove a package deal
    RemovePackage(IdArgs),

    /// Set the quantity of a product already in the cart
    Set(SetArgs),

    /// Empty the cart
    Clear,
}

#[derive(Debug, Args)]
struct AddArgs {
    /// Product or package id
    id: u64,

    /// Units to add
    #[arg(short, long, default_value_t = 1)]
    quantity: u32,

    /// Search term narrowing the product lookup
    #[arg(long)]
    search: Option<String>,
}

#[derive(Debug, Args)]
struct IdArgs {
    /// Product or package id
    id: u64,
}

#[derive(Debug, Args)]
struct SetArgs {
    /// Product id
    id: u64,

    /// New quantity
    quantity: u32,
}

pub(crate) async fn run(command: CartCommand, context: &AppContext) -> Result<(), String> {
    let mut checkout = context.checkout();
    let cart = checkout.cart_mut();

    match command.command {
        CartSubcommand::Show => {}
        CartSubcommand::Add(args) => {
            let mut catalog = context.catalog();

            if let Some(search) = args.search {
                catalog.search(search);
            }

            let product = catalog
                .find_product(ProductId::new(args.id))
                .await
                .map_err(|error| format!("failed to look up product: {error}"))?
                .ok_or_else(|| format!("product {} not found", args.id))?;

            let quantity = cart.add_item(&product, args.quantity);

            println!("{} x {} in cart", quantity, product.name);
        }
        CartSubcommand::AddPackage(args) => {
            let package = context
                .catalog()
                .find_package(PackageId::new(args.id))
                .await
                .map_err(|error| format!("failed to look up package: {error}"))?
                .ok_or_else(|| format!("package {} not found", args.id))?;

            let quantity = cart.add_package(&package, args.quantity);

            println!("{} x {} in cart", quantity, package.name);
        }
        CartSubcommand::Remove(args) => cart.remove_item(ProductId::new(args.id)),
        CartSubcommand::RemovePackage(args) => cart.remove_package(PackageId::new(args.id)),
        CartSubcommand::Set(args) => {
            let quantity = cart
                .set_item_quantity(ProductId::new(args.id), args.quantity)
                .ok_or_else(|| format!("product {} is not in the cart", args.id))?;

            if quantity != args.quantity {
                println!("quantity limited to {quantity}");
            }
        }
        CartSubcommand::Clear => cart.clear(),
    }

    if checkout.cart().is_empty() {
        println!("cart is empty");
    } else {
        println!("{}", cart_table(checkout.cart()));
    }

    Ok(())
}
