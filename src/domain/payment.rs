use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier returned by a settled payment, prefixed per provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn generate(prefix: &str) -> Self {
        let suffix = Uuid::new_v4().simple().to_string().to_uppercase();
        Self(format!("{prefix}{}", &suffix[..12]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the payer has to supply before a payment can be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// Four-digit UPI PIN.
    Pin,
    Card,
    None,
}

/// Describes one payment option: how it is labelled, how its transaction ids
/// look, what credential it asks for and how long settlement takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentProvider {
    pub label: &'static str,
    pub transaction_prefix: &'static str,
    pub credential: CredentialKind,
    /// Money moves before delivery, so a cancellation is refunded to source.
    pub prepaid: bool,
    pub processing_delay: Duration,
}

impl PaymentProvider {
    pub const GPAY: Self = Self {
        label: "Google Pay",
        transaction_prefix: "GPAY",
        credential: CredentialKind::Pin,
        prepaid: true,
        processing_delay: Duration::from_millis(2000),
    };

    pub const PHONEPE: Self = Self {
        label: "PhonePe",
        transaction_prefix: "PHPE",
        credential: CredentialKind::Pin,
        prepaid: true,
        processing_delay: Duration::from_millis(2000),
    };

    pub const PAYTM: Self = Self {
        label: "Paytm",
        transaction_prefix: "PYTM",
        credential: CredentialKind::Pin,
        prepaid: true,
        processing_delay: Duration::from_millis(2000),
    };

    pub const CARD: Self = Self {
        label: "Credit/Debit Card",
        transaction_prefix: "CARD",
        credential: CredentialKind::Card,
        prepaid: true,
        processing_delay: Duration::from_millis(3000),
    };

    pub const CASH_ON_DELIVERY: Self = Self {
        label: "Cash on Delivery",
        transaction_prefix: "COD",
        credential: CredentialKind::None,
        prepaid: false,
        processing_delay: Duration::ZERO,
    };

    pub const ALL: [Self; 5] = [
        Self::GPAY,
        Self::PHONEPE,
        Self::PAYTM,
        Self::CARD,
        Self::CASH_ON_DELIVERY,
    ];

    pub fn by_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|provider| provider.label.eq_ignore_ascii_case(label))
    }

    pub fn requires_credential(&self) -> bool {
        self.credential != CredentialKind::None
    }

    pub fn is_prepaid(&self) -> bool {
        self.prepaid
    }

    pub fn with_processing_delay(mut self, delay: Duration) -> Self {
        self.processing_delay = delay;
        self
    }
}

/// Card details as typed into the payment form.
#[derive(Clone, PartialEq, Eq)]
pub struct CardDetails {
    pub number: String,
    pub holder: String,
    pub expiry: String,
    pub cvv: String,
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("holder", &self.holder)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Pin(String),
    Card(CardDetails),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pin(_) => f.write_str("Pin(****)"),
            Self::Card(card) => f.debug_tuple("Card").field(card).finish(),
        }
    }
}
