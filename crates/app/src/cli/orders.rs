use clap::{Args, Subcommand, ValueEnum};
use gebeya::orders::OrderStatus;
use gebeya_app::{checkout::CheckoutServiceError, context::AppContext};

use super::format::{orders_table, receipt_table};

#[derive(Debug, Args)]
pub(crate) struct OrderCommand {
    #[command(subcommand)]
    command: OrderSubcommand,
}

#[derive(Debug, Subcommand)]
enum OrderSubcommand {
    /// Show the order being paid for
    Show,

    /// Cancel the order being paid for
    Cancel,

    /// Check with the server whether the order has been paid
    Refresh,

    /// Start the checkout over before an order exists
    Abandon,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum StatusArg {
    Pending,
    Paid,
    Processing,
    Delivered,
    Completed,
    Cancelled,
    Failed,
}

impl From<StatusArg> for OrderStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Pending => Self::Pending,
            StatusArg::Paid => Self::Paid,
            StatusArg::Processing => Self::Processing,
            StatusArg::Delivered => Self::Delivered,
            StatusArg::Completed => Self::Completed,
            StatusArg::Cancelled => Self::Cancelled,
            StatusArg::Failed => Self::Failed,
        }
    }
}

#[derive(Debug, Args)]
pub(crate) struct OrdersArgs {
    /// Only orders with this status
    #[arg(long, value_enum)]
    status: Option<StatusArg>,
}

pub(crate) async fn run(command: OrderCommand, context: &AppContext) -> Result<(), String> {
    let mut checkout = context.checkout();

    match command.command {
        OrderSubcommand::Show => match checkout.receipt() {
            Some(receipt) => {
                println!("{}", receipt_table(receipt));
                println!("checkout: {}", checkout.stage());
            }
            None => println!("no order awaits payment"),
        },
        OrderSubcommand::Cancel => match checkout.cancel().await {
            Ok(order) => println!("order {order} cancelled"),
            Err(CheckoutServiceError::CancelFailed { order, source }) => {
                return Err(format!(
                    "order {order} could not be cancelled on the server ({source}); the cart \
                     has been cleared"
                ));
            }
            Err(error) => return Err(format!("failed to cancel order: {error}")),
        },
        OrderSubcommand::Refresh => {
            let before = checkout.stage();

            let refreshed = if before.is_with_provider() {
                checkout.confirm_provider_return().await
            } else {
                checkout.refresh_status().await
            };

            let status = refreshed.map_err(|error| format!("failed to refresh order: {error}"))?;

            println!("status: {} ({before} -> {})", status.as_str(), checkout.stage());
        }
        OrderSubcommand::Abandon => {
            checkout
                .abandon()
                .map_err(|error| format!("failed to abandon checkout: {error}"))?;

            println!("checkout restarted");
        }
    }

    Ok(())
}

pub(crate) async fn list(args: OrdersArgs, context: &AppContext) -> Result<(), String> {
    let orders = context
        .api
        .list_orders(args.status.map(OrderStatus::from))
        .await
        .map_err(|error| format!("failed to list orders: {error}"))?;

    if orders.is_empty() {
        println!("no orders found");
        return Ok(());
    }

    println!("{}", orders_table(&orders));

    Ok(())
}
