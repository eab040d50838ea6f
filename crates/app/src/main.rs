//! Gebeya storefront CLI

use std::process;

use gebeya_app::{context::AppContext, observability};

mod cli;

#[tokio::main]
pub async fn main() {
    let cli = match cli::Cli::load() {
        Ok(cli) => cli,
        Err(error) => error.exit(),
    };

    if let Err(error) = observability::init_subscriber(&cli.config.logging) {
        eprintln!("{error}");
    }

    let context = match AppContext::from_config(&cli.config) {
        Ok(context) => context,
        Err(error) => {
            eprintln!("{error}");
            process::exit(1);
        }
    };

    if let Err(error) = cli.run(&context).await {
        eprintln!("{error}");
        process::exit(1);
    }
}
