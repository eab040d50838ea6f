//! Checkout service.
//!
//! Drives a [`CheckoutMachine`] through the network steps of a checkout and
//! keeps the cart and receipt in storage in step with it.

use std::{
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};

use gebeya::{
    cart::{CartLedger, QuantityPolicy},
    checkout::{CheckoutAction, CheckoutError, CheckoutMachine, CheckoutStage},
    ids::{DeliveryTypeId, DiscountTypeId, OrderId},
    orders::{OrderReceipt, OrderStatus, ReceiptStore},
    payments::{ApprovalFlow, PaymentInstruction, PaymentMethod},
    shipping::ShippingDetails,
    storage::Storage,
    user::UserProfile,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ApiError, StorefrontApi};

#[derive(Debug, Error)]
pub enum CheckoutServiceError {
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// The checkout was abandoned while the request was in flight; its
    /// response was discarded.
    #[error("checkout was abandoned")]
    Abandoned,

    #[error("the OTP is empty")]
    EmptyOtp,

    /// The provider replied without payment instructions and the server does
    /// not report the order as paid. The order is still awaiting payment.
    #[error("payment for order {order} was not confirmed: {message}")]
    PaymentNotConfirmed {
        order: OrderId,
        status: OrderStatus,
        message: String,
    },

    /// The server did not confirm the cancellation. The cart and receipt
    /// have been cleared regardless.
    #[error("order {order} could not be cancelled: {source}")]
    CancelFailed {
        order: OrderId,
        #[source]
        source: Box<CheckoutServiceError>,
    },
}

/// What the shopper has to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    /// Enter the OTP or PIN sent by the provider.
    EnterOtp { order: OrderId },

    /// Open the provider's payment page.
    Redirect { url: String },

    /// Complete the embedded payment widget.
    Widget { checkout_id: String },

    /// Confirm the payment on the CBE Birr page.
    CbeBirrFollowUp,

    /// Nothing; the order is paid.
    Completed { order: OrderId },
}

impl NextStep {
    fn from_instruction(order: OrderId, instruction: PaymentInstruction) -> Self {
        match instruction {
            PaymentInstruction::Redirect { url } => Self::Redirect { url },
            PaymentInstruction::Widget { checkout_id } => Self::Widget { checkout_id },
            PaymentInstruction::CbeBirrFollowUp => Self::CbeBirrFollowUp,
            PaymentInstruction::Settled => Self::Completed { order },
        }
    }
}

/// Abandons a checkout from outside the task driving it.
///
/// Requests in flight when [`FlowHandle::abandon`] is called resolve to
/// [`CheckoutServiceError::Abandoned`] and leave the checkout untouched.
/// Requests started afterwards are unaffected.
#[derive(Debug, Clone, Default)]
pub struct FlowHandle {
    token: Arc<Mutex<CancellationToken>>,
}

impl FlowHandle {
    pub fn abandon(&self) {
        let mut token = self.token.lock().unwrap_or_else(PoisonError::into_inner);

        token.cancel();
        *token = CancellationToken::new();

        debug!("abandoned in-flight checkout requests");
    }

    fn step_token(&self) -> CancellationToken {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .child_token()
    }
}

pub struct CheckoutService {
    api: Arc<dyn StorefrontApi>,
    machine: CheckoutMachine,
    cart: CartLedger,
    receipts: ReceiptStore,
    user: Option<UserProfile>,
    flow: FlowHandle,
}

impl CheckoutService {
    /// Load the cart, receipt and user from `storage`. A persisted receipt
    /// resumes its checkout where it left off.
    pub fn new(api: Arc<dyn StorefrontApi>, storage: Arc<dyn Storage>) -> Self {
        let user = UserProfile::load(storage.as_ref());

        let policy = QuantityPolicy {
            bypass_order_limit: user
                .as_ref()
                .is_some_and(|user| user.bypass_product_quantity_restriction),
        };

        let cart = CartLedger::hydrate(storage.clone()).with_policy(policy);
        let receipts = ReceiptStore::hydrate(storage);

        let machine = match receipts.current() {
            Some(receipt) => CheckoutMachine::resume(receipt.clone(), cart.state()),
            None => CheckoutMachine::new(),
        };

        Self {
            api,
            machine,
            cart,
            receipts,
            user,
            flow: FlowHandle::default(),
        }
    }

    pub fn machine(&self) -> &CheckoutMachine {
        &self.machine
    }

    pub fn stage(&self) -> CheckoutStage {
        self.machine.stage()
    }

    pub fn cart(&self) -> &CartLedger {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut CartLedger {
        &mut self.cart
    }

    pub fn receipt(&self) -> Option<&OrderReceipt> {
        self.receipts.current()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    /// A handle that can abandon this checkout from another task.
    pub fn handle(&self) -> FlowHandle {
        self.flow.clone()
    }

    /// Validate and remember shipping details and the delivery type.
    ///
    /// # Errors
    ///
    /// Returns every failed shipping precondition at once.
    pub fn submit_shipping(
        &mut self,
        details: ShippingDetails,
        delivery_type: Option<DeliveryTypeId>,
    ) -> Result<(), CheckoutServiceError> {
        self.machine.capture_shipping(details.clone(), delivery_type)?;

        self.cart.set_shipping_details(details);

        if let Some(delivery_type) = delivery_type {
            self.cart.set_delivery_type(delivery_type);
        }

        Ok(())
    }

    /// Choose the payment provider.
    ///
    /// # Errors
    ///
    /// Returns an error unless shipping has been accepted.
    pub fn select_payment_method(
        &mut self,
        method: PaymentMethod,
    ) -> Result<(), CheckoutServiceError> {
        self.machine.select_payment_method(method)?;
        self.cart.set_payment_method(method);

        Ok(())
    }

    /// Create the order on the server and make its receipt the active one.
    ///
    /// # Errors
    ///
    /// Returns the server's error unchanged; the checkout stays ready to
    /// retry.
    pub async fn place_order(
        &mut self,
        discount_type: Option<DiscountTypeId>,
        pin_code: Option<String>,
    ) -> Result<OrderReceipt, CheckoutServiceError> {
        let request = self
            .machine
            .order_request(self.cart.state(), discount_type, pin_code)?;

        let receipt = self.guarded(self.api.create_order(request)).await?;

        self.machine.order_created(receipt.clone())?;
        self.receipts.set(receipt.clone());

        Ok(receipt)
    }

    /// Start approving the order.
    ///
    /// OTP providers stop at [`NextStep::EnterOtp`]; others are asked to
    /// start the payment straight away.
    ///
    /// # Errors
    ///
    /// An insufficient loan balance drops the local receipt and returns the
    /// checkout to payment method selection.
    pub async fn approve(&mut self) -> Result<NextStep, CheckoutServiceError> {
        let order = self.machine.pending_order(CheckoutAction::BeginApproval)?;

        self.begin_approval()?;

        if self.machine.stage() == CheckoutStage::OtpExchange {
            return Ok(NextStep::EnterOtp { order });
        }

        self.make_payment(order, None).await
    }

    /// Submit the shopper's OTP with the payment.
    ///
    /// # Errors
    ///
    /// Returns the server's error; the shopper may try again.
    pub async fn submit_otp(&mut self, otp: &str) -> Result<NextStep, CheckoutServiceError> {
        let order = self.otp_order(CheckoutAction::SubmitOtp)?;

        let otp = otp.trim();

        if otp.is_empty() {
            return Err(CheckoutServiceError::EmptyOtp);
        }

        self.make_payment(order, Some(otp.to_string())).await
    }

    /// Ask the provider to send a new OTP.
    ///
    /// # Errors
    ///
    /// Returns an error outside the OTP step or when the request fails.
    pub async fn resend_otp(&mut self) -> Result<(), CheckoutServiceError> {
        let order = self.otp_order(CheckoutAction::ResendOtp)?;

        self.guarded(self.api.resend_otp(order)).await?;

        info!(order = %order, "requested a new OTP");

        Ok(())
    }

    /// The shopper came back from the provider; check whether the payment
    /// went through.
    ///
    /// # Errors
    ///
    /// Returns an error unless the shopper was with the provider.
    pub async fn confirm_provider_return(&mut self) -> Result<OrderStatus, CheckoutServiceError> {
        if !self.machine.stage().is_with_provider() {
            return Err(CheckoutError::InvalidTransition {
                stage: self.machine.stage(),
                action: CheckoutAction::Complete,
            }
            .into());
        }

        self.refresh_status().await
    }

    /// Fetch the order's status and follow it: a paid order completes the
    /// checkout, a cancelled or failed one ends it and drops the receipt.
    ///
    /// # Errors
    ///
    /// Returns an error when no order awaits payment or the request fails.
    pub async fn refresh_status(&mut self) -> Result<OrderStatus, CheckoutServiceError> {
        let order = self.machine.pending_order(CheckoutAction::RefreshStatus)?;

        let latest = self.guarded(self.api.get_order(order)).await?;
        let status = latest.status;

        self.receipts.update_status(order, status);

        if status.is_paid() {
            match self.machine.stage() {
                CheckoutStage::OrderCreated | CheckoutStage::OtpExchange => {
                    self.machine.apply_payment(PaymentInstruction::Settled)?;
                }
                _ => {
                    self.machine.complete()?;
                }
            }

            self.finish(order);
        } else if matches!(status, OrderStatus::Cancelled | OrderStatus::Failed) {
            self.machine.cancel()?;
            self.receipts.clear();

            info!(order = %order, status = status.as_str(), "order ended on the server");
        }

        Ok(status)
    }

    /// Cancel the order awaiting payment.
    ///
    /// The cart and receipt are cleared whether or not the server confirms the
    /// cancellation.
    ///
    /// # Errors
    ///
    /// [`CheckoutServiceError::CancelFailed`] when the server call failed,
    /// reported after clearing.
    pub async fn cancel(&mut self) -> Result<OrderId, CheckoutServiceError> {
        let order = self.machine.cancel()?;

        let outcome = self.guarded(self.api.cancel_order(order)).await;

        self.cart.clear();
        self.receipts.clear();

        match outcome {
            Ok(()) => Ok(order),
            Err(error) => {
                warn!(order = %order, "order cancellation failed, cart cleared anyway: {error}");

                Err(CheckoutServiceError::CancelFailed {
                    order,
                    source: Box::new(error),
                })
            }
        }
    }

    /// Discard in-flight requests and start the checkout over.
    ///
    /// # Errors
    ///
    /// Returns an error once an order exists; use [`Self::cancel`] then.
    pub fn abandon(&mut self) -> Result<(), CheckoutServiceError> {
        self.machine.abandon()?;
        self.flow.abandon();

        Ok(())
    }

    async fn make_payment(
        &mut self,
        order: OrderId,
        otp: Option<String>,
    ) -> Result<NextStep, CheckoutServiceError> {
        let response = self.guarded(self.api.make_payment(order, otp)).await?;

        if let Some(message) = response.message.as_deref() {
            debug!(order = %order, "payment response: {message}");
        }

        let message = response.message.clone();
        let instruction = PaymentInstruction::from(response);

        // Only an OTP exchange settles on the reply alone.
        if instruction == PaymentInstruction::Settled
            && self.machine.stage() == CheckoutStage::OrderCreated
        {
            return self.confirm_settlement(order, message).await;
        }

        self.machine.apply_payment(instruction.clone())?;

        if self.machine.stage() == CheckoutStage::Completed {
            self.finish(order);
        }

        Ok(NextStep::from_instruction(order, instruction))
    }

    async fn confirm_settlement(
        &mut self,
        order: OrderId,
        message: Option<String>,
    ) -> Result<NextStep, CheckoutServiceError> {
        let status = self.refresh_status().await?;

        if status.is_paid() {
            return Ok(NextStep::Completed { order });
        }

        let message = message
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| "the provider returned no payment instructions".to_string());

        warn!(order = %order, status = status.as_str(), "payment not confirmed: {message}");

        Err(CheckoutServiceError::PaymentNotConfirmed {
            order,
            status,
            message,
        })
    }

    /// Loan balance check and OTP entry. A shortfall drops the local receipt.
    fn begin_approval(&mut self) -> Result<(), CheckoutServiceError> {
        match self.machine.begin_approval(self.user.as_ref()) {
            Ok(_) => Ok(()),
            Err(error @ CheckoutError::InsufficientLoanBalance { .. }) => {
                self.receipts.clear();

                Err(error.into())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// The order awaiting an OTP. A checkout resumed from storage restarts at
    /// `OrderCreated`, so OTP providers re-enter the exchange here.
    fn otp_order(&mut self, action: CheckoutAction) -> Result<OrderId, CheckoutServiceError> {
        let awaits_otp = self.machine.stage() == CheckoutStage::OrderCreated
            && self
                .machine
                .payment_method()
                .is_some_and(|method| matches!(method.approval_flow(), ApprovalFlow::Otp { .. }));

        if awaits_otp {
            self.begin_approval()?;

            debug!("re-entered OTP exchange for a resumed order");
        }

        Ok(self.machine.otp_order(action)?)
    }

    fn finish(&mut self, order: OrderId) {
        self.cart.clear();
        self.receipts.clear();

        info!(order = %order, "checkout completed");
    }

    async fn guarded<T, F>(&self, request: F) -> Result<T, CheckoutServiceError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let token = self.flow.step_token();

        tokio::select! {
            biased;

            () = token.cancelled() => {
                debug!("discarding response of an abandoned checkout step");

                Err(CheckoutServiceError::Abandoned)
            }
            result = request => result.map_err(CheckoutServiceError::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use gebeya::{
        catalog::Product,
        ids::ProductId,
        payments::MakePaymentResponse,
        storage::{MemoryStorage, USER_KEY},
    };
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use crate::api::MockStorefrontApi;

    use super::*;

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

    fn teff() -> Product {
        Product {
            id: ProductId::new(4),
            name: "Teff".to_string(),
            price: Decimal::from(2500),
            images: Vec::new(),
            left_in_stock: 0,
            max_quantity_per_order: None,
            description: None,
            category_id: None,
        }
    }

    fn receipt(method: PaymentMethod, total: i64) -> OrderReceipt {
        OrderReceipt {
            id: OrderId::new(31),
            status: OrderStatus::Pending,
            order_cost: Decimal::from(total),
            discount: Decimal::ZERO,
            delivery_cost: Decimal::ZERO,
            total_cost: Decimal::from(total),
            payment_method: method,
            products: Vec::new(),
            packages: Vec::new(),
        }
    }

    fn storage_with_balance(loan_balance: i64) -> TestResult<Arc<dyn Storage>> {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());

        storage.set(
            USER_KEY,
            &serde_json::json!({ "first_name": "Hana", "loan_balance": loan_balance }).to_string(),
        )?;

        Ok(storage)
    }

    fn ready(
        api: MockStorefrontApi,
        storage: Arc<dyn Storage>,
        method: PaymentMethod,
    ) -> TestResult<CheckoutService> {
        let mut service = CheckoutService::new(Arc::new(api), storage);

        service.cart_mut().add_item(&teff(), 2);
        service.submit_shipping(address(), Some(DeliveryTypeId::new(1)))?;
        service.select_payment_method(method)?;

        Ok(service)
    }

    #[tokio::test]
    async fn failed_order_creation_keeps_the_selection() -> TestResult {
        let mut api = MockStorefrontApi::new();

        api.expect_create_order()
            .once()
            .return_once(|_| Err(ApiError::server(422, "Product 4 is out of stock.")));

        let mut service = ready(api, storage_with_balance(0)?, PaymentMethod::Telebirr)?;

        let error = service
            .place_order(None, None)
            .await
            .err()
            .ok_or("order creation should fail")?;

        assert_eq!(error.to_string(), "Product 4 is out of stock.");
        assert_eq!(service.stage(), CheckoutStage::PaymentMethodSelected);
        assert!(service.receipt().is_none());
        assert!(!service.cart().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn redirect_payment_completes_after_provider_return() -> TestResult {
        let storage = storage_with_balance(0)?;
        let mut api = MockStorefrontApi::new();

        api.expect_create_order()
            .withf(|order| {
                order.products.len() == 1 && order.payment_method == PaymentMethod::Telebirr
            })
            .once()
            .return_once(|_| Ok(receipt(PaymentMethod::Telebirr, 5100)));

        api.expect_make_payment()
            .withf(|order, otp| *order == OrderId::new(31) && otp.is_none())
            .once()
            .return_once(|_, _| {
                Ok(MakePaymentResponse {
                    redirect_url: Some("https://pay.example/31".to_string()),
                    ..MakePaymentResponse::default()
                })
            });

        api.expect_get_order().once().return_once(|_| {
            Ok(OrderReceipt {
                status: OrderStatus::Paid,
                ..receipt(PaymentMethod::Telebirr, 5100)
            })
        });

        let mut service = ready(api, storage.clone(), PaymentMethod::Telebirr)?;

        service.place_order(None, None).await?;

        assert_eq!(
            service.approve().await?,
            NextStep::Redirect {
                url: "https://pay.example/31".to_string()
            }
        );
        assert_eq!(service.stage(), CheckoutStage::ProviderRedirect);

        assert_eq!(service.confirm_provider_return().await?, OrderStatus::Paid);
        assert_eq!(service.stage(), CheckoutStage::Completed);
        assert!(service.cart().is_empty());
        assert!(ReceiptStore::hydrate(storage).current().is_none());

        Ok(())
    }

    #[tokio::test]
    async fn short_loan_balance_never_asks_for_otp() -> TestResult {
        let mut api = MockStorefrontApi::new();

        api.expect_create_order()
            .once()
            .return_once(|_| Ok(receipt(PaymentMethod::Loan, 5100)));

        api.expect_make_payment().never();
        api.expect_resend_otp().never();

        let mut service = ready(api, storage_with_balance(5000)?, PaymentMethod::Loan)?;

        service.place_order(None, None).await?;

        let result = service.approve().await;

        assert!(
            matches!(
                result,
                Err(CheckoutServiceError::Checkout(
                    CheckoutError::InsufficientLoanBalance { .. }
                ))
            ),
            "unexpected result {result:?}"
        );
        assert_eq!(service.stage(), CheckoutStage::PaymentMethodSelected);
        assert!(service.receipt().is_none());

        Ok(())
    }

    #[tokio::test]
    async fn loan_otp_settles_the_order() -> TestResult {
        let mut api = MockStorefrontApi::new();

        api.expect_create_order()
            .once()
            .return_once(|_| Ok(receipt(PaymentMethod::Loan, 5100)));

        api.expect_resend_otp()
            .withf(|order| *order == OrderId::new(31))
            .once()
            .return_once(|_| Ok(()));

        api.expect_make_payment()
            .withf(|_, otp| otp.as_deref() == Some("4321"))
            .once()
            .return_once(|_, _| Ok(MakePaymentResponse::default()));

        let mut service = ready(api, storage_with_balance(6000)?, PaymentMethod::Loan)?;

        service.place_order(None, None).await?;

        assert_eq!(
            service.approve().await?,
            NextStep::EnterOtp {
                order: OrderId::new(31)
            }
        );

        assert!(
            matches!(service.submit_otp("   ").await, Err(CheckoutServiceError::EmptyOtp)),
            "blank OTP should be rejected"
        );

        service.resend_otp().await?;

        assert_eq!(
            service.submit_otp(" 4321 ").await?,
            NextStep::Completed {
                order: OrderId::new(31)
            }
        );
        assert!(service.cart().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn failed_cancellation_still_clears_cart_and_receipt() -> TestResult {
        let storage = storage_with_balance(0)?;
        let mut api = MockStorefrontApi::new();

        api.expect_create_order()
            .once()
            .return_once(|_| Ok(receipt(PaymentMethod::Telebirr, 5100)));

        api.expect_cancel_order()
            .withf(|order| *order == OrderId::new(31))
            .once()
            .return_once(|_| Err(ApiError::server(500, "cancellation failed")));

        let mut service = ready(api, storage.clone(), PaymentMethod::Telebirr)?;

        service.place_order(None, None).await?;

        let result = service.cancel().await;

        assert!(
            matches!(result, Err(CheckoutServiceError::CancelFailed { .. })),
            "unexpected result {result:?}"
        );
        assert_eq!(service.stage(), CheckoutStage::Cancelled);
        assert!(service.cart().is_empty());
        assert!(CartLedger::hydrate(storage.clone()).is_empty());
        assert!(ReceiptStore::hydrate(storage).current().is_none());

        Ok(())
    }

    #[tokio::test]
    async fn pending_receipt_resumes_after_reload() -> TestResult {
        let storage = storage_with_balance(0)?;
        let mut api = MockStorefrontApi::new();

        api.expect_create_order()
            .once()
            .return_once(|_| Ok(receipt(PaymentMethod::Cbe, 5100)));

        let mut service = ready(api, storage.clone(), PaymentMethod::Cbe)?;

        service.place_order(None, None).await?;

        let reloaded = CheckoutService::new(Arc::new(MockStorefrontApi::new()), storage);

        assert_eq!(reloaded.stage(), CheckoutStage::OrderCreated);
        assert_eq!(reloaded.receipt().map(|r| r.id), Some(OrderId::new(31)));
        assert!(!reloaded.cart().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn loan_otp_continues_after_reload() -> TestResult {
        let storage = storage_with_balance(6000)?;
        let mut api = MockStorefrontApi::new();

        api.expect_create_order()
            .once()
            .return_once(|_| Ok(receipt(PaymentMethod::Loan, 5100)));

        let mut service = ready(api, storage.clone(), PaymentMethod::Loan)?;

        service.place_order(None, None).await?;
        service.approve().await?;

        let mut api = MockStorefrontApi::new();

        api.expect_resend_otp()
            .withf(|order| *order == OrderId::new(31))
            .once()
            .return_once(|_| Ok(()));

        api.expect_make_payment()
            .withf(|order, otp| *order == OrderId::new(31) && otp.as_deref() == Some("4321"))
            .once()
            .return_once(|_, _| Ok(MakePaymentResponse::default()));

        let mut reloaded = CheckoutService::new(Arc::new(api), storage.clone());

        assert_eq!(reloaded.stage(), CheckoutStage::OrderCreated);

        reloaded.resend_otp().await?;

        assert_eq!(reloaded.stage(), CheckoutStage::OtpExchange);
        assert_eq!(
            reloaded.submit_otp("4321").await?,
            NextStep::Completed {
                order: OrderId::new(31)
            }
        );
        assert!(CartLedger::hydrate(storage.clone()).is_empty());
        assert!(ReceiptStore::hydrate(storage).current().is_none());

        Ok(())
    }

    #[tokio::test]
    async fn reloaded_loan_otp_rechecks_the_balance() -> TestResult {
        let storage = storage_with_balance(6000)?;
        let mut api = MockStorefrontApi::new();

        api.expect_create_order()
            .once()
            .return_once(|_| Ok(receipt(PaymentMethod::Loan, 5100)));

        let mut service = ready(api, storage.clone(), PaymentMethod::Loan)?;

        service.place_order(None, None).await?;

        storage.set(
            USER_KEY,
            &serde_json::json!({ "first_name": "Hana", "loan_balance": 100 }).to_string(),
        )?;

        let mut api = MockStorefrontApi::new();

        api.expect_make_payment().never();

        let mut reloaded = CheckoutService::new(Arc::new(api), storage.clone());

        let result = reloaded.submit_otp("4321").await;

        assert!(
            matches!(
                result,
                Err(CheckoutServiceError::Checkout(
                    CheckoutError::InsufficientLoanBalance { .. }
                ))
            ),
            "unexpected result {result:?}"
        );
        assert!(ReceiptStore::hydrate(storage).current().is_none());

        Ok(())
    }

    #[tokio::test]
    async fn instructionless_reply_is_confirmed_with_the_server() -> TestResult {
        let storage = storage_with_balance(0)?;
        let mut api = MockStorefrontApi::new();

        api.expect_create_order()
            .once()
            .return_once(|_| Ok(receipt(PaymentMethod::Telebirr, 5100)));

        api.expect_make_payment().once().return_once(|_, _| {
            Ok(MakePaymentResponse {
                message: Some("Payment request could not be initiated".to_string()),
                ..MakePaymentResponse::default()
            })
        });

        api.expect_get_order()
            .withf(|order| *order == OrderId::new(31))
            .once()
            .return_once(|_| Ok(receipt(PaymentMethod::Telebirr, 5100)));

        let mut service = ready(api, storage.clone(), PaymentMethod::Telebirr)?;

        service.place_order(None, None).await?;

        let result = service.approve().await;

        let Err(CheckoutServiceError::PaymentNotConfirmed {
            order,
            status,
            message,
        }) = result
        else {
            panic!("expected an unconfirmed payment, got {result:?}");
        };

        assert_eq!(order, OrderId::new(31));
        assert_eq!(status, OrderStatus::Pending);
        assert_eq!(message, "Payment request could not be initiated");
        assert_eq!(service.stage(), CheckoutStage::OrderCreated);
        assert!(!service.cart().is_empty());
        assert_eq!(
            ReceiptStore::hydrate(storage).current().map(|r| r.id),
            Some(OrderId::new(31))
        );

        Ok(())
    }

    #[tokio::test]
    async fn instructionless_reply_completes_a_paid_order() -> TestResult {
        let storage = storage_with_balance(0)?;
        let mut api = MockStorefrontApi::new();

        api.expect_create_order()
            .once()
            .return_once(|_| Ok(receipt(PaymentMethod::Telebirr, 5100)));

        api.expect_make_payment()
            .once()
            .return_once(|_, _| Ok(MakePaymentResponse::default()));

        api.expect_get_order().once().return_once(|_| {
            Ok(OrderReceipt {
                status: OrderStatus::Paid,
                ..receipt(PaymentMethod::Telebirr, 5100)
            })
        });

        let mut service = ready(api, storage.clone(), PaymentMethod::Telebirr)?;

        service.place_order(None, None).await?;

        assert_eq!(
            service.approve().await?,
            NextStep::Completed {
                order: OrderId::new(31)
            }
        );
        assert_eq!(service.stage(), CheckoutStage::Completed);
        assert!(service.cart().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn abandoned_step_discards_its_response() -> TestResult {
        let service = CheckoutService::new(
            Arc::new(MockStorefrontApi::new()),
            Arc::new(MemoryStorage::new()),
        );

        let handle = service.handle();

        let abandon = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.abandon();
        });

        let result = service
            .guarded(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, ApiError>(receipt(PaymentMethod::Telebirr, 1))
            })
            .await;

        abandon.await?;

        assert!(
            matches!(result, Err(CheckoutServiceError::Abandoned)),
            "stale response should be discarded"
        );

        let fresh = service.guarded(async { Ok::<_, ApiError>(7) }).await?;

        assert_eq!(fresh, 7);

        Ok(())
    }

    #[tokio::test]
    async fn abandon_is_refused_once_the_order_exists() -> TestResult {
        let mut api = MockStorefrontApi::new();

        api.expect_create_order()
            .once()
            .return_once(|_| Ok(receipt(PaymentMethod::Telebirr, 5100)));

        let mut service = ready(api, storage_with_balance(0)?, PaymentMethod::Telebirr)?;

        service.abandon()?;
        assert_eq!(service.stage(), CheckoutStage::ShippingCapture);

        service.submit_shipping(address(), Some(DeliveryTypeId::new(1)))?;
        service.select_payment_method(PaymentMethod::Telebirr)?;
        service.place_order(None, None).await?;

        assert!(service.abandon().is_err(), "abandon needs cancel after order creation");

        Ok(())
    }
}
