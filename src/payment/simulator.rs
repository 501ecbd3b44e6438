use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::domain::{
    CardDetails, CheckoutId, Credential, CredentialKind, OrderId, PaymentProvider, TransactionId,
};
use crate::error::PaymentError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentState {
    Idle,
    AwaitingCredential,
    Processing,
    /// Settlement was taken and handed to order placement.
    Settling,
    Succeeded {
        transaction_id: TransactionId,
        order_id: OrderId,
    },
    Cancelled,
    Failed {
        reason: String,
    },
}

impl PaymentState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingCredential => "awaiting credential",
            Self::Processing => "processing",
            Self::Settling => "settling",
            Self::Succeeded { .. } => "succeeded",
            Self::Cancelled => "cancelled",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded { .. } | Self::Cancelled | Self::Failed { .. }
        )
    }
}

/// What a successful settlement hands to order placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub checkout_id: CheckoutId,
    pub transaction_id: TransactionId,
    pub amount: Decimal,
}

/// State machine for one payment attempt against one provider.
///
/// `Idle → AwaitingCredential → Processing → Settling → Succeeded | Failed`,
/// with `Cancelled` reachable from any state before `Settling`. Settlement can
/// be taken at most once.
#[derive(Debug, Clone)]
pub struct PaymentSimulator {
    provider: PaymentProvider,
    amount: Decimal,
    checkout_id: CheckoutId,
    state: PaymentState,
    settlement: Option<Settlement>,
}

impl PaymentSimulator {
    pub fn new(provider: PaymentProvider, amount: Decimal) -> Self {
        Self {
            provider,
            amount,
            checkout_id: CheckoutId::generate(),
            state: PaymentState::Idle,
            settlement: None,
        }
    }

    pub fn provider(&self) -> &PaymentProvider {
        &self.provider
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn checkout_id(&self) -> CheckoutId {
        self.checkout_id
    }

    pub fn state(&self) -> &PaymentState {
        &self.state
    }

    pub fn processing_delay(&self) -> Duration {
        self.provider.processing_delay
    }

    /// Starts the attempt. Credential-based providers wait for a PIN or card;
    /// the rest go straight to processing.
    #[instrument(fields(provider = self.provider.label, amount = %self.amount), skip(self))]
    pub fn begin(&mut self) -> Result<&PaymentState, PaymentError> {
        self.expect_state(&PaymentState::Idle, "begin")?;

        self.state = if self.provider.requires_credential() {
            PaymentState::AwaitingCredential
        } else {
            PaymentState::Processing
        };
        info!(state = self.state.name(), "Payment started");
        Ok(&self.state)
    }

    /// Validates the credential and moves to processing. A rejected credential
    /// leaves the attempt waiting for another try.
    #[instrument(fields(provider = self.provider.label), skip(self, credential))]
    pub fn submit_credential(&mut self, credential: &Credential) -> Result<(), PaymentError> {
        self.expect_state(&PaymentState::AwaitingCredential, "accept a credential")?;

        if let Err(e) = validate_credential(self.provider.credential, credential) {
            warn!(error = %e, "Credential rejected");
            return Err(e);
        }

        self.state = PaymentState::Processing;
        info!("Credential accepted, processing payment");
        Ok(())
    }

    /// Takes the settlement for this attempt and generates its transaction id.
    ///
    /// # Errors
    /// [`PaymentError::AlreadySettled`] once settlement was taken, so a
    /// repeated settle callback cannot place a second order.
    #[instrument(fields(checkout_id = %self.checkout_id), skip(self))]
    pub fn begin_settlement(&mut self) -> Result<Settlement, PaymentError> {
        match self.state {
            PaymentState::Processing => {}
            PaymentState::Settling | PaymentState::Succeeded { .. } => {
                warn!("Duplicate settlement ignored");
                return Err(PaymentError::AlreadySettled);
            }
            _ => return Err(self.invalid("settle")),
        }

        let settlement = Settlement {
            checkout_id: self.checkout_id,
            transaction_id: TransactionId::generate(self.provider.transaction_prefix),
            amount: self.amount,
        };
        info!(transaction_id = %settlement.transaction_id, "Payment settled");

        self.state = PaymentState::Settling;
        self.settlement = Some(settlement.clone());
        Ok(settlement)
    }

    /// The settlement taken by [`Self::begin_settlement`] that has not been
    /// resolved yet.
    pub fn pending_settlement(&self) -> Option<&Settlement> {
        match self.state {
            PaymentState::Settling => self.settlement.as_ref(),
            _ => None,
        }
    }

    pub fn complete(&mut self, order_id: OrderId) -> Result<(), PaymentError> {
        let transaction_id = match (&self.state, &self.settlement) {
            (PaymentState::Settling, Some(settlement)) => settlement.transaction_id.clone(),
            _ => return Err(self.invalid("complete")),
        };

        self.state = PaymentState::Succeeded {
            transaction_id,
            order_id,
        };
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), PaymentError> {
        self.expect_state(&PaymentState::Settling, "fail")?;
        self.state = PaymentState::Failed {
            reason: reason.into(),
        };
        Ok(())
    }

    /// Abandons the attempt. No order is created and no stock is touched.
    #[instrument(fields(checkout_id = %self.checkout_id), skip(self))]
    pub fn cancel(&mut self) -> Result<(), PaymentError> {
        match self.state {
            PaymentState::Idle | PaymentState::AwaitingCredential | PaymentState::Processing => {
                self.state = PaymentState::Cancelled;
                info!("Payment cancelled");
                Ok(())
            }
            _ => Err(self.invalid("cancel")),
        }
    }

    fn expect_state(&self, expected: &PaymentState, operation: &'static str) -> Result<(), PaymentError> {
        if &self.state == expected {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn invalid(&self, operation: &'static str) -> PaymentError {
        PaymentError::InvalidState {
            state: self.state.name(),
            operation,
        }
    }
}

fn validate_credential(kind: CredentialKind, credential: &Credential) -> Result<(), PaymentError> {
    match (kind, credential) {
        (CredentialKind::Pin, Credential::Pin(pin)) => {
            if pin.len() == 4 && pin.chars().all(|c| c.is_ascii_digit()) {
                Ok(())
            } else {
                Err(PaymentError::InvalidCredential(
                    "PIN must be exactly 4 digits".to_string(),
                ))
            }
        }
        (CredentialKind::Card, Credential::Card(card)) => validate_card(card),
        (CredentialKind::Pin, _) => Err(PaymentError::InvalidCredential(
            "expected a PIN".to_string(),
        )),
        (CredentialKind::Card, _) => Err(PaymentError::InvalidCredential(
            "expected card details".to_string(),
        )),
        (CredentialKind::None, _) => Err(PaymentError::InvalidCredential(
            "no credential required".to_string(),
        )),
    }
}

fn validate_card(card: &CardDetails) -> Result<(), PaymentError> {
    let fields = [
        ("card number", &card.number),
        ("card holder", &card.holder),
        ("expiry", &card.expiry),
        ("CVV", &card.cvv),
    ];

    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((name, _)) => Err(PaymentError::InvalidCredential(format!("{name} is required"))),
        None => Ok(()),
    }
}
