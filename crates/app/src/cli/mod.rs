use clap::{Parser, Subcommand};
use gebeya_app::{config::AppConfig, context::AppContext};

mod cart;
mod catalog;
mod checkout;
mod format;
mod orders;
mod wishlist;

#[derive(Debug, Parser)]
#[command(name = "gebeya", about = "Seregela Gebeya storefront", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) config: AppConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Browse products
    Products(catalog::ProductsArgs),

    /// List product categories
    Categories(catalog::PagesArgs),

    /// List package deals
    Packages(catalog::PagesArgs),

    Cart(cart::CartCommand),
    Wishlist(wishlist::WishlistCommand),

    /// Place an order for the cart and start paying for it
    Checkout(checkout::CheckoutArgs),

    Otp(checkout::OtpCommand),
    Order(orders::OrderCommand),

    /// List past orders
    Orders(orders::OrdersArgs),
}

impl Cli {
    /// Parse arguments, reading a `.env` file first when present.
    pub(crate) fn load() -> Result<Self, clap::Error> {
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    pub(crate) async fn run(self, context: &AppContext) -> Result<(), String> {
        match self.command {
            Commands::Products(args) => catalog::products(args, context).await,
            Commands::Categories(args) => catalog::categories(args, context).await,
            Commands::Packages(args) => catalog::packages(args, context).await,
            Commands::Cart(command) => cart::run(command, context).await,
            Commands::Wishlist(command) => wishlist::run(command, context).await,
            Commands::Checkout(args) => checkout::run(args, context).await,
            Commands::Otp(command) => checkout::otp(command, context).await,
            Commands::Order(command) => orders::run(command, context).await,
            Commands::Orders(args) => orders::list(args, context).await,
        }
    }
}
