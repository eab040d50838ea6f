//! Checkout state machine
//!
//! [`CheckoutMachine`] tracks a single checkout from shipping capture to a
//! terminal state. It performs no I/O: callers run the network steps and feed
//! the results back in. Every illegal transition is rejected with
//! [`CheckoutError::InvalidTransition`] and leaves the state untouched.

use std::fmt::{Display, Formatter, Result as FmtResult};

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    cart::CartState,
    ids::{DeliveryTypeId, DiscountTypeId, OrderId},
    orders::{NewOrder, OrderReceipt, OrderStatus},
    payments::{ApprovalFlow, PaymentInstruction, PaymentMethod},
    shipping::{self, ShippingDetails, ShippingRejected},
    user::UserProfile,
};

/// Shipping details that passed validation, with the chosen delivery type.
#[derive(Debug, Clone, PartialEq)]
pub struct ShippingStep {
    /// Delivery address and contact
    pub details: ShippingDetails,

    /// Chosen delivery type
    pub delivery_type: DeliveryTypeId,
}

/// Where a checkout currently is, with the data gathered so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CheckoutState {
    /// Waiting for shipping details.
    #[default]
    ShippingCapture,

    /// Shipping accepted, waiting for a payment method.
    DeliverySelected {
        /// Accepted shipping
        shipping: ShippingStep,
    },

    /// Ready to create the order.
    PaymentMethodSelected {
        /// Accepted shipping
        shipping: ShippingStep,

        /// Chosen provider
        method: PaymentMethod,
    },

    /// The server created the order; approval has not started.
    OrderCreated {
        /// Shipping the order was placed with, if still known
        shipping: Option<ShippingStep>,

        /// Server receipt
        receipt: OrderReceipt,
    },

    /// Waiting for the shopper's one-time password or PIN.
    OtpExchange {
        /// Server receipt
        receipt: OrderReceipt,
    },

    /// The shopper was sent to the provider's page.
    ProviderRedirect {
        /// Server receipt
        receipt: OrderReceipt,

        /// Provider URL
        url: String,
    },

    /// The provider's widget is embedded and awaiting its callback.
    WidgetEmbed {
        /// Server receipt
        receipt: OrderReceipt,

        /// Widget checkout session id
        checkout_id: String,
    },

    /// Waiting on the CBE Birr confirmation page.
    CbeBirrFollowUp {
        /// Server receipt
        receipt: OrderReceipt,
    },

    /// The order was cancelled.
    Cancelled {
        /// Cancelled order
        order: OrderId,
    },

    /// Payment went through.
    Completed {
        /// Paid order
        order: OrderId,
    },
}

/// Data-free name of a [`CheckoutState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckoutStage {
    /// See [`CheckoutState::ShippingCapture`]
    ShippingCapture,
    /// See [`CheckoutState::DeliverySelected`]
    DeliverySelected,
    /// See [`CheckoutState::PaymentMethodSelected`]
    PaymentMethodSelected,
    /// See [`CheckoutState::OrderCreated`]
    OrderCreated,
    /// See [`CheckoutState::OtpExchange`]
    OtpExchange,
    /// See [`CheckoutState::ProviderRedirect`]
    ProviderRedirect,
    /// See [`CheckoutState::WidgetEmbed`]
    WidgetEmbed,
    /// See [`CheckoutState::CbeBirrFollowUp`]
    CbeBirrFollowUp,
    /// See [`CheckoutState::Cancelled`]
    Cancelled,
    /// See [`CheckoutState::Completed`]
    Completed,
}

impl CheckoutStage {
    /// Stages before an order exists; these can be abandoned freely.
    pub const fn is_pre_order(self) -> bool {
        matches!(
            self,
            Self::ShippingCapture | Self::DeliverySelected | Self::PaymentMethodSelected
        )
    }

    /// Whether the shopper is completing the payment with the provider.
    pub const fn is_with_provider(self) -> bool {
        matches!(
            self,
            Self::ProviderRedirect | Self::WidgetEmbed | Self::CbeBirrFollowUp
        )
    }

    /// Whether the checkout has ended.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }
}

impl Display for CheckoutStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::ShippingCapture => "capturing shipping",
            Self::DeliverySelected => "delivery selected",
            Self::PaymentMethodSelected => "payment method selected",
            Self::OrderCreated => "order created",
            Self::OtpExchange => "awaiting OTP",
            Self::ProviderRedirect => "redirected to provider",
            Self::WidgetEmbed => "awaiting payment widget",
            Self::CbeBirrFollowUp => "awaiting CBE Birr confirmation",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        })
    }
}

/// Something a caller asked the machine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutAction {
    /// [`CheckoutMachine::capture_shipping`]
    CaptureShipping,
    /// [`CheckoutMachine::select_payment_method`]
    SelectPaymentMethod,
    /// [`CheckoutMachine::order_request`] and [`CheckoutMachine::order_created`]
    CreateOrder,
    /// [`CheckoutMachine::begin_approval`]
    BeginApproval,
    /// [`CheckoutMachine::otp_order`]
    SubmitOtp,
    /// Ask for a new OTP
    ResendOtp,
    /// [`CheckoutMachine::apply_payment`]
    ApplyPayment,
    /// [`CheckoutMachine::complete`]
    Complete,
    /// Check the order's status with the server
    RefreshStatus,
    /// [`CheckoutMachine::abandon`]
    Abandon,
    /// [`CheckoutMachine::cancel`]
    Cancel,
}

impl Display for CheckoutAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::CaptureShipping => "capture shipping",
            Self::SelectPaymentMethod => "select a payment method",
            Self::CreateOrder => "create the order",
            Self::BeginApproval => "begin payment approval",
            Self::SubmitOtp => "submit an OTP",
            Self::ResendOtp => "resend the OTP",
            Self::ApplyPayment => "apply a payment response",
            Self::Complete => "complete the payment",
            Self::RefreshStatus => "refresh the order status",
            Self::Abandon => "abandon checkout",
            Self::Cancel => "cancel the order",
        })
    }
}

/// Errors from [`CheckoutMachine`] transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// Shipping details failed validation.
    #[error(transparent)]
    Shipping(#[from] ShippingRejected),

    /// The action is not available in the current stage.
    #[error("cannot {action} while {stage}")]
    InvalidTransition {
        /// Stage the machine was in
        stage: CheckoutStage,

        /// Rejected action
        action: CheckoutAction,
    },

    /// An order needs at least one product or package.
    #[error("the cart is empty")]
    EmptyCart,

    /// The loan balance does not cover the order.
    #[error("loan balance {available} does not cover the order total {required}")]
    InsufficientLoanBalance {
        /// Order total
        required: Decimal,

        /// User's loan balance
        available: Decimal,
    },
}

/// A single checkout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckoutMachine {
    state: CheckoutState,
}

impl CheckoutMachine {
    /// Start a checkout at shipping capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a checkout from a receipt that survived a reload.
    ///
    /// Pending orders resume at [`CheckoutState::OrderCreated`], with the
    /// shipping selection recovered from `cart` when it is complete. Receipts
    /// that are already paid or cancelled resume in the matching terminal
    /// state.
    pub fn resume(receipt: OrderReceipt, cart: &CartState) -> Self {
        let order = receipt.id;

        let state = if receipt.status.is_paid() {
            CheckoutState::Completed { order }
        } else if matches!(receipt.status, OrderStatus::Cancelled | OrderStatus::Failed) {
            CheckoutState::Cancelled { order }
        } else {
            let shipping = cart
                .shipping_details
                .clone()
                .zip(cart.delivery_type_id)
                .map(|(details, delivery_type)| ShippingStep {
                    details,
                    delivery_type,
                });

            CheckoutState::OrderCreated { shipping, receipt }
        };

        debug!(order = %order, "resumed checkout");

        Self { state }
    }

    /// Current state
    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// Current stage
    pub fn stage(&self) -> CheckoutStage {
        match &self.state {
            CheckoutState::ShippingCapture => CheckoutStage::ShippingCapture,
            CheckoutState::DeliverySelected { .. } => CheckoutStage::DeliverySelected,
            CheckoutState::PaymentMethodSelected { .. } => CheckoutStage::PaymentMethodSelected,
            CheckoutState::OrderCreated { .. } => CheckoutStage::OrderCreated,
            CheckoutState::OtpExchange { .. } => CheckoutStage::OtpExchange,
            CheckoutState::ProviderRedirect { .. } => CheckoutStage::ProviderRedirect,
            CheckoutState::WidgetEmbed { .. } => CheckoutStage::WidgetEmbed,
            CheckoutState::CbeBirrFollowUp { .. } => CheckoutStage::CbeBirrFollowUp,
            CheckoutState::Cancelled { .. } => CheckoutStage::Cancelled,
            CheckoutState::Completed { .. } => CheckoutStage::Completed,
        }
    }

    /// The receipt of the order being paid for, once one exists.
    pub fn receipt(&self) -> Option<&OrderReceipt> {
        match &self.state {
            CheckoutState::OrderCreated { receipt, .. }
            | CheckoutState::OtpExchange { receipt }
            | CheckoutState::ProviderRedirect { receipt, .. }
            | CheckoutState::WidgetEmbed { receipt, .. }
            | CheckoutState::CbeBirrFollowUp { receipt } => Some(receipt),
            _ => None,
        }
    }

    /// The chosen payment method, before or after the order is created.
    pub fn payment_method(&self) -> Option<PaymentMethod> {
        match &self.state {
            CheckoutState::PaymentMethodSelected { method, .. } => Some(*method),
            _ => self.receipt().map(|receipt| receipt.payment_method),
        }
    }

    /// Accept shipping details and a delivery type.
    ///
    /// Available in any stage before the order exists; a later stage is reset
    /// to [`CheckoutState::DeliverySelected`].
    ///
    /// # Errors
    ///
    /// [`CheckoutError::Shipping`] listing every failed precondition, or
    /// [`CheckoutError::InvalidTransition`] once an order exists.
    pub fn capture_shipping(
        &mut self,
        details: ShippingDetails,
        delivery_type: Option<DeliveryTypeId>,
    ) -> Result<(), CheckoutError> {
        self.require(CheckoutAction::CaptureShipping, CheckoutStage::is_pre_order)?;

        shipping::validate(&details, delivery_type)?;

        let Some(delivery_type) = delivery_type else {
            return Err(self.invalid(CheckoutAction::CaptureShipping));
        };

        self.state = CheckoutState::DeliverySelected {
            shipping: ShippingStep {
                details,
                delivery_type,
            },
        };

        Ok(())
    }

    /// Choose the payment provider, replacing any earlier choice.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::InvalidTransition`] unless shipping has been accepted
    /// and no order exists yet.
    pub fn select_payment_method(&mut self, method: PaymentMethod) -> Result<(), CheckoutError> {
        let shipping = match &self.state {
            CheckoutState::DeliverySelected { shipping }
            | CheckoutState::PaymentMethodSelected { shipping, .. } => shipping.clone(),
            _ => return Err(self.invalid(CheckoutAction::SelectPaymentMethod)),
        };

        self.state = CheckoutState::PaymentMethodSelected { shipping, method };

        Ok(())
    }

    /// Build the order creation request for `cart`.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::InvalidTransition`] unless a payment method is
    /// selected, or [`CheckoutError::EmptyCart`].
    pub fn order_request(
        &self,
        cart: &CartState,
        discount_type: Option<DiscountTypeId>,
        pin_code: Option<String>,
    ) -> Result<NewOrder, CheckoutError> {
        let CheckoutState::PaymentMethodSelected { shipping, method } = &self.state else {
            return Err(self.invalid(CheckoutAction::CreateOrder));
        };

        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        Ok(NewOrder {
            payment_method: *method,
            delivery_type_id: shipping.delivery_type,
            shipping_detail: shipping.details.clone(),
            discount_type_id: discount_type,
            products: cart.product_lines(),
            packages: cart.package_lines(),
            pin_code: pin_code.filter(|pin| !pin.is_empty()),
        })
    }

    /// Record the receipt of a successfully created order.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::InvalidTransition`] unless a payment method is
    /// selected.
    pub fn order_created(&mut self, receipt: OrderReceipt) -> Result<(), CheckoutError> {
        let CheckoutState::PaymentMethodSelected { shipping, .. } = &self.state else {
            return Err(self.invalid(CheckoutAction::CreateOrder));
        };

        info!(order = %receipt.id, method = %receipt.payment_method, "order created");

        self.state = CheckoutState::OrderCreated {
            shipping: Some(shipping.clone()),
            receipt,
        };

        Ok(())
    }

    /// Start approving the created order and report which flow applies.
    ///
    /// OTP providers move to [`CheckoutState::OtpExchange`]. Loan payments
    /// first check the order total against `user`'s loan balance; a shortfall
    /// drops the order and returns to
    /// [`CheckoutState::PaymentMethodSelected`]. Other providers stay in
    /// [`CheckoutState::OrderCreated`] until [`Self::apply_payment`].
    ///
    /// # Errors
    ///
    /// [`CheckoutError::InsufficientLoanBalance`], or
    /// [`CheckoutError::InvalidTransition`] unless an order was just created.
    pub fn begin_approval(
        &mut self,
        user: Option<&UserProfile>,
    ) -> Result<ApprovalFlow, CheckoutError> {
        let CheckoutState::OrderCreated { shipping, receipt } = &self.state else {
            return Err(self.invalid(CheckoutAction::BeginApproval));
        };

        let flow = receipt.payment_method.approval_flow();

        match flow {
            ApprovalFlow::Otp { balance_check } => {
                let available = user.map_or(Decimal::ZERO, |user| user.loan_balance);
                let required = receipt.total_cost;

                if balance_check && required > available {
                    debug!(order = %receipt.id, %required, %available, "loan balance too low");

                    self.state = match shipping.clone() {
                        Some(shipping) => CheckoutState::PaymentMethodSelected {
                            shipping,
                            method: receipt.payment_method,
                        },
                        None => CheckoutState::ShippingCapture,
                    };

                    return Err(CheckoutError::InsufficientLoanBalance {
                        required,
                        available,
                    });
                }

                self.state = CheckoutState::OtpExchange {
                    receipt: receipt.clone(),
                };
            }
            ApprovalFlow::MakePayment => {}
        }

        Ok(flow)
    }

    /// The order awaiting payment.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::InvalidTransition`] when no order awaits payment,
    /// reported against `action`.
    pub fn pending_order(&self, action: CheckoutAction) -> Result<OrderId, CheckoutError> {
        self.receipt()
            .map(|receipt| receipt.id)
            .ok_or_else(|| self.invalid(action))
    }

    /// The order awaiting an OTP.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::InvalidTransition`] outside
    /// [`CheckoutState::OtpExchange`], reported against `action`.
    pub fn otp_order(&self, action: CheckoutAction) -> Result<OrderId, CheckoutError> {
        match &self.state {
            CheckoutState::OtpExchange { receipt } => Ok(receipt.id),
            _ => Err(self.invalid(action)),
        }
    }

    /// Follow the server's answer to a make-payment request.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::InvalidTransition`] outside
    /// [`CheckoutState::OrderCreated`] and [`CheckoutState::OtpExchange`].
    pub fn apply_payment(&mut self, instruction: PaymentInstruction) -> Result<(), CheckoutError> {
        let receipt = match &self.state {
            CheckoutState::OrderCreated { receipt, .. } | CheckoutState::OtpExchange { receipt } => {
                receipt.clone()
            }
            _ => return Err(self.invalid(CheckoutAction::ApplyPayment)),
        };

        self.state = match instruction {
            PaymentInstruction::Redirect { url } => CheckoutState::ProviderRedirect { receipt, url },
            PaymentInstruction::Widget { checkout_id } => {
                CheckoutState::WidgetEmbed {
                    receipt,
                    checkout_id,
                }
            }
            PaymentInstruction::CbeBirrFollowUp => CheckoutState::CbeBirrFollowUp { receipt },
            PaymentInstruction::Settled => {
                info!(order = %receipt.id, "payment settled");

                CheckoutState::Completed { order: receipt.id }
            }
        };

        Ok(())
    }

    /// Finish a payment the provider has confirmed.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::InvalidTransition`] unless the shopper is with the
    /// provider (redirect, widget or CBE Birr follow-up).
    pub fn complete(&mut self) -> Result<OrderId, CheckoutError> {
        let order = match &self.state {
            CheckoutState::ProviderRedirect { receipt, .. }
            | CheckoutState::WidgetEmbed { receipt, .. }
            | CheckoutState::CbeBirrFollowUp { receipt } => receipt.id,
            _ => return Err(self.invalid(CheckoutAction::Complete)),
        };

        info!(order = %order, "payment completed");

        self.state = CheckoutState::Completed { order };

        Ok(order)
    }

    /// Drop an unfinished checkout and start over.
    ///
    /// Allowed before an order exists, and after the checkout has ended.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::InvalidTransition`] while an order awaits payment;
    /// use [`Self::cancel`] instead.
    pub fn abandon(&mut self) -> Result<(), CheckoutError> {
        self.require(CheckoutAction::Abandon, |stage| {
            stage.is_pre_order() || stage.is_terminal()
        })?;

        self.state = CheckoutState::ShippingCapture;

        Ok(())
    }

    /// Cancel the order awaiting payment. Returns the order to cancel on the
    /// server.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::InvalidTransition`] before the order exists or after
    /// the checkout has ended.
    pub fn cancel(&mut self) -> Result<OrderId, CheckoutError> {
        let order = self.pending_order(CheckoutAction::Cancel)?;

        info!(order = %order, "order cancelled");

        self.state = CheckoutState::Cancelled { order };

        Ok(order)
    }

    fn require(
        &self,
        action: CheckoutAction,
        allowed: impl FnOnce(CheckoutStage) -> bool,
    ) -> Result<(), CheckoutError> {
        if allowed(self.stage()) {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: CheckoutAction) -> CheckoutError {
        CheckoutError::InvalidTransition {
            stage: self.stage(),
            action,
        }
    }
}
