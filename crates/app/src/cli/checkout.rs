use clap::{Args, Subcommand};
use gebeya::{
    ids::{DeliveryTypeId, DiscountTypeId},
    money::format_price,
    payments::PaymentMethod,
    shipping::ShippingDetails,
};
use gebeya_app::{
    checkout::{CheckoutService, NextStep},
    context::AppContext,
};

use super::format::receipt_table;

/// Shipping fields override the address saved with the cart.
#[derive(Debug, Args)]
pub(crate) struct CheckoutArgs {
    /// Payment provider, e.g. telebirr, cbe-birr, loan
    #[arg(long)]
    payment_method: PaymentMethod,

    /// Delivery type id
    #[arg(long)]
    delivery_type: Option<u64>,

    /// Discount type id
    #[arg(long)]
    discount_type: Option<u64>,

    /// PIN code required by some providers
    #[arg(long, env = "GEBEYA_PAYMENT_PIN", hide_env_values = true)]
    pin: Option<String>,

    #[arg(long)]
    first_name: Option<String>,

    #[arg(long)]
    last_name: Option<String>,

    #[arg(long)]
    phone_number: Option<String>,

    #[arg(long)]
    city: Option<String>,

    #[arg(long)]
    sub_city: Option<String>,

    #[arg(long)]
    woreda: Option<String>,

    #[arg(long)]
    neighborhood: Option<String>,

    #[arg(long)]
    house_number: Option<String>,

    #[arg(long, allow_negative_numbers = true)]
    latitude: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    longitude: Option<f64>,
}

impl CheckoutArgs {
    fn shipping(&self, saved: Option<&ShippingDetails>) -> ShippingDetails {
        let mut details = saved.cloned().unwrap_or_default();

        let text_fields = [
            (&self.first_name, &mut details.first_name),
            (&self.last_name, &mut details.last_name),
            (&self.phone_number, &mut details.phone_number),
            (&self.city, &mut details.city),
            (&self.sub_city, &mut details.sub_city),
            (&self.woreda, &mut details.woreda),
            (&self.neighborhood, &mut details.neighborhood),
            (&self.house_number, &mut details.house_number),
        ];

        for (value, field) in text_fields {
            if let Some(value) = value {
                field.clone_from(value);
            }
        }

        if let Some(latitude) = self.latitude {
            details.latitude = latitude;
        }

        if let Some(longitude) = self.longitude {
            details.longitude = longitude;
        }

        details
    }
}

#[derive(Debug, Args)]
pub(crate) struct OtpCommand {
    #[command(subcommand)]
    command: OtpSubcommand,
}

#[derive(Debug, Subcommand)]
enum OtpSubcommand {
    /// Submit the OTP sent by the provider
    Submit(SubmitOtpArgs),

    /// Ask the provider for a new OTP
    Resend,
}

#[derive(Debug, Args)]
struct SubmitOtpArgs {
    otp: String,
}

pub(crate) async fn run(args: CheckoutArgs, context: &AppContext) -> Result<(), String> {
    let mut checkout = context.checkout();

    if checkout.stage().is_terminal() {
        checkout
            .abandon()
            .map_err(|error| format!("failed to restart checkout: {error}"))?;
    }

    if !checkout.stage().is_pre_order() {
        return Err(format!(
            "checkout is {}; use `gebeya order cancel` or `gebeya order refresh`",
            checkout.stage()
        ));
    }

    if checkout.cart().is_empty() {
        return Err("cart is empty".to_string());
    }

    let delivery_type = args
        .delivery_type
        .map(DeliveryTypeId::new)
        .or(checkout.cart().state().delivery_type_id);

    let shipping = args.shipping(checkout.cart().state().shipping_details.as_ref());

    checkout
        .submit_shipping(shipping, delivery_type)
        .map_err(|error| format!("shipping rejected: {error}"))?;

    checkout
        .select_payment_method(args.payment_method)
        .map_err(|error| format!("failed to select payment method: {error}"))?;

    let receipt = checkout
        .place_order(args.discount_type.map(DiscountTypeId::new), args.pin)
        .await
        .map_err(|error| format!("failed to create order: {error}"))?;

    println!("{}", receipt_table(&receipt));
    println!();

    let next = checkout
        .approve()
        .await
        .map_err(|error| format!("failed to start payment: {error}"))?;

    print_next_step(&checkout, &next);

    Ok(())
}

pub(crate) async fn otp(command: OtpCommand, context: &AppContext) -> Result<(), String> {
    let mut checkout = context.checkout();

    match command.command {
        OtpSubcommand::Submit(args) => {
            let next = checkout
                .submit_otp(&args.otp)
                .await
                .map_err(|error| format!("failed to submit OTP: {error}"))?;

            print_next_step(&checkout, &next);
        }
        OtpSubcommand::Resend => {
            checkout
                .resend_otp()
                .await
                .map_err(|error| format!("failed to resend OTP: {error}"))?;

            println!("a new OTP is on its way");
        }
    }

    Ok(())
}

fn print_next_step(checkout: &CheckoutService, next: &NextStep) {
    match next {
        NextStep::EnterOtp { order } => {
            let total = checkout
                .receipt()
                .map(|receipt| format_price(receipt.total_cost))
                .unwrap_or_default();

            println!("order {order} ({total}) awaits approval");
            println!("run `gebeya otp submit <code>` with the code you received");
        }
        NextStep::Redirect { url } => {
            println!("complete the payment at:");
            println!("{url}");
            println!("then run `gebeya order refresh`");
        }
        NextStep::Widget { checkout_id } => {
            println!("complete the payment in the provider widget (checkout {checkout_id})");
            println!("then run `gebeya order refresh`");
        }
        NextStep::CbeBirrFollowUp => {
            println!("confirm the payment in CBE Birr, then run `gebeya order refresh`");
        }
        NextStep::Completed { order } => {
            println!("order {order} is paid; thank you!");
        }
    }
}
