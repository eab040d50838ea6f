use clap::{Args, ValueEnum};
use gebeya::catalog::{PriceRange, SortOrder};
use gebeya_app::{catalog::ProductSource, context::AppContext};
use rust_decimal::Decimal;

use super::format::{package_table, product_table};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum SortArg {
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl From<SortArg> for SortOrder {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Newest => Self::Newest,
            SortArg::PriceAsc => Self::PriceAscending,
            SortArg::PriceDesc => Self::PriceDescending,
            SortArg::Name => Self::NameAscending,
        }
    }
}

#[derive(Debug, Args)]
pub(crate) struct ProductsArgs {
    /// Search products by name
    #[arg(long)]
    search: Option<String>,

    /// Lowest price, in birr
    #[arg(long)]
    min_price: Option<Decimal>,

    /// Highest price, in birr
    #[arg(long)]
    max_price: Option<Decimal>,

    /// Only products in this category
    #[arg(long, conflicts_with_all = ["subcategory", "search"])]
    category: Option<u64>,

    /// Only products in this subcategory
    #[arg(long, conflicts_with = "search")]
    subcategory: Option<u64>,

    /// Products per page
    #[arg(long)]
    per_page: Option<u32>,

    /// Number of pages to load
    #[arg(long, default_value_t = 1)]
    pages: u32,

    /// Sort the loaded products
    #[arg(long, value_enum, default_value_t = SortArg::Newest)]
    sort: SortArg,
}

#[derive(Debug, Args)]
pub(crate) struct PagesArgs {
    /// Number of pages to load
    #[arg(long, default_value_t = 1)]
    pages: u32,
}

pub(crate) async fn products(args: ProductsArgs, context: &AppContext) -> Result<(), String> {
    let range = PriceRange::new(args.min_price, args.max_price)
        .map_err(|error| format!("invalid price filter: {error}"))?;

    let mut browser = context.catalog();

    if let Some(per_page) = args.per_page {
        browser.set_page_size(per_page);
    }

    if let Some(search) = args.search {
        browser.search(search);
    }

    browser.filter_price(range);

    if let Some(category) = args.category {
        browser.browse(ProductSource::Category(category));
    } else if let Some(subcategory) = args.subcategory {
        browser.browse(ProductSource::Subcategory(subcategory));
    }

    for _ in 0..args.pages.max(1) {
        browser
            .load_more()
            .await
            .map_err(|error| format!("failed to load products: {error}"))?;

        if !browser.products().has_more() {
            break;
        }
    }

    let products = browser.products();

    if products.is_empty() {
        println!("no products found");
        return Ok(());
    }

    println!("{}", product_table(&products.sorted(args.sort.into())));

    if products.has_more() {
        println!("more products available; pass --pages to load them");
    }

    Ok(())
}

pub(crate) async fn categories(args: PagesArgs, context: &AppContext) -> Result<(), String> {
    let mut browser = context.catalog();

    for _ in 0..args.pages.max(1) {
        browser
            .load_more_categories()
            .await
            .map_err(|error| format!("failed to load categories: {error}"))?;

        if !browser.categories().has_more() {
            break;
        }
    }

    for category in browser.categories().entries() {
        println!("{:>6}  {}", category.id, category.name);
    }

    Ok(())
}

pub(crate) async fn packages(args: PagesArgs, context: &AppContext) -> Result<(), String> {
    let mut browser = context.catalog();

    for _ in 0..args.pages.max(1) {
        browser
            .load_more_packages()
            .await
            .map_err(|error| format!("failed to load packages: {error}"))?;

        if !browser.packages().has_more() {
            break;
        }
    }

    println!("{}", package_table(browser.packages().entries()));

    Ok(())
}
