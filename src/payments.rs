//! Payment providers
//!
//! The storefront supports a fixed set of providers. What happens after an
//! order is created depends only on the provider, so the mapping lives in one
//! place: [`PaymentMethod::approval_flow`].

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    /// telebirr mobile money
    Telebirr,

    /// CBE Pay
    CbePay,

    /// HelloCash
    HelloCash,

    /// CBE Birr mobile money
    CbeBirr,

    /// Commercial Bank of Ethiopia account
    Cbe,

    /// Awash Birr
    AwashBirr,

    /// Bank of Abyssinia card payments via Cybersource
    BoaCybersource,

    /// Apollo (Bank of Abyssinia digital banking)
    Apollo,

    /// Enat Bank
    EnatBank,

    /// EthSwitch
    EthSwitch,

    /// Store credit
    Loan,
}

/// What the checkout must do once an order exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalFlow {
    /// Collect a one-time password or PIN and submit it with the payment.
    Otp {
        /// Whether the order total must be covered by the user's loan balance.
        balance_check: bool,
    },

    /// Ask the server to start the payment and follow its instruction.
    MakePayment,
}

impl PaymentMethod {
    /// Every supported provider, in display order.
    pub const ALL: [Self; 11] = [
        Self::Telebirr,
        Self::CbePay,
        Self::HelloCash,
        Self::CbeBirr,
        Self::Cbe,
        Self::AwashBirr,
        Self::BoaCybersource,
        Self::Apollo,
        Self::EnatBank,
        Self::EthSwitch,
        Self::Loan,
    ];

    /// Wire identifier
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Telebirr => "telebirr",
            Self::CbePay => "cbe-pay",
            Self::HelloCash => "hello-cash",
            Self::CbeBirr => "cbe-birr",
            Self::Cbe => "cbe",
            Self::AwashBirr => "awash-birr",
            Self::BoaCybersource => "boa-cybersource",
            Self::Apollo => "apollo",
            Self::EnatBank => "enat-bank",
            Self::EthSwitch => "eth-switch",
            Self::Loan => "loan",
        }
    }

    /// Human readable provider name
    pub const fn label(self) -> &'static str {
        match self {
            Self::Telebirr => "telebirr",
            Self::CbePay => "CBE Pay",
            Self::HelloCash => "HelloCash",
            Self::CbeBirr => "CBE Birr",
            Self::Cbe => "Commercial Bank of Ethiopia",
            Self::AwashBirr => "Awash Birr",
            Self::BoaCybersource => "Bank of Abyssinia (card)",
            Self::Apollo => "Apollo",
            Self::EnatBank => "Enat Bank",
            Self::EthSwitch => "EthSwitch",
            Self::Loan => "Loan",
        }
    }

    /// The post-creation flow for this provider.
    pub const fn approval_flow(self) -> ApprovalFlow {
        match self {
            Self::Loan => ApprovalFlow::Otp {
                balance_check: true,
            },
            Self::AwashBirr | Self::Cbe | Self::Apollo => ApprovalFlow::Otp {
                balance_check: false,
            },
            Self::Telebirr
            | Self::CbePay
            | Self::HelloCash
            | Self::CbeBirr
            | Self::BoaCybersource
            | Self::EnatBank
            | Self::EthSwitch => ApprovalFlow::MakePayment,
        }
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// An unrecognised provider identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown payment method {0:?}")]
pub struct UnknownPaymentMethod(pub String);

impl FromStr for PaymentMethod {
    type Err = UnknownPaymentMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // `cbe_birr` and `cbe-birr` name the same provider.
        let wanted = s.trim().replace('_', "-");

        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| UnknownPaymentMethod(s.to_string()))
    }
}

/// Server reply to `POST /orders/{id}/make-payment`.
///
/// Providers answer in different shapes; at most one of the fields below is
/// expected to be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakePaymentResponse {
    /// Provider page to send the shopper to
    #[serde(default, alias = "toPayUrl", alias = "payment_url", alias = "url")]
    pub redirect_url: Option<String>,

    /// Checkout session for the embedded payment widget
    #[serde(default, alias = "checkoutId")]
    pub checkout_id: Option<String>,

    /// CBE Birr needs its own confirmation page
    #[serde(default, alias = "cbeBirr")]
    pub cbe_birr: bool,

    /// Server message, shown to the shopper
    #[serde(default)]
    pub message: Option<String>,
}

/// The next step dictated by a make-payment reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentInstruction {
    /// Navigate away to the provider.
    Redirect {
        /// Provider URL
        url: String,
    },

    /// Embed the provider's checkout widget and wait for its callback.
    Widget {
        /// Widget checkout session id
        checkout_id: String,
    },

    /// Show the CBE Birr confirmation page.
    CbeBirrFollowUp,

    /// Payment went through immediately.
    Settled,
}

impl From<MakePaymentResponse> for PaymentInstruction {
    fn from(response: MakePaymentResponse) -> Self {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(response.redirect_url) {
            Self::Redirect { url }
        } else if let Some(checkout_id) = non_empty(response.checkout_id) {
            Self::Widget { checkout_id }
        } else if response.cbe_birr {
            Self::CbeBirrFollowUp
        } else {
            Self::Settled
        }
    }
}
