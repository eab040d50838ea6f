use clap::{Args, Subcommand};
use gebeya::{ids::ProductId, wishlist::WishlistLedger};
use gebeya_app::context::AppContext;

use super::format::wishlist_table;

#[derive(Debug, Args)]
pub(crate) struct WishlistCommand {
    #[command(subcommand)]
    command: WishlistSubcommand,
}

#[derive(Debug, Subcommand)]
enum WishlistSubcommand {
    /// List saved products
    Show,

    /// Save a product, or drop it if already saved
    Toggle(ToggleArgs),

    /// Drop a saved product
    Remove(RemoveArgs),

    /// Drop every saved product
    Clear,
}

#[derive(Debug, Args)]
struct ToggleArgs {
    /// Product id
    id: u64,

    /// Search term narrowing the product lookup
    #[arg(long)]
    search: Option<String>,
}

#[derive(Debug, Args)]
struct RemoveArgs {
    /// Product id
    id: u64,
}

pub(crate) async fn run(command: WishlistCommand, context: &AppContext) -> Result<(), String> {
    let mut wishlist = WishlistLedger::hydrate(context.storage.clone());

    match command.command {
        WishlistSubcommand::Show => {}
        WishlistSubcommand::Toggle(args) => {
            let id = ProductId::new(args.id);

            if wishlist.contains(id) {
                wishlist.remove(id);
                println!("removed product {id} from the wishlist");
            } else {
                let mut catalog = context.catalog();

                if let Some(search) = args.search {
                    catalog.search(search);
                }

                let product = catalog
                    .find_product(id)
                    .await
                    .map_err(|error| format!("failed to look up product: {error}"))?
                    .ok_or_else(|| format!("product {id} not found"))?;

                wishlist.toggle(&product);
                println!("saved {}", product.name);
            }
        }
        WishlistSubcommand::Remove(args) => wishlist.remove(ProductId::new(args.id)),
        WishlistSubcommand::Clear => wishlist.clear(),
    }

    if wishlist.items().is_empty() {
        println!("wishlist is empty");
    } else {
        println!("{}", wishlist_table(wishlist.items()));
    }

    Ok(())
}
