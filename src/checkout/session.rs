use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use crate::cart::{CartLines, CartStore};
use crate::clients::{OrderClient, StockClient};
use crate::config::EngineConfig;
use crate::domain::{Bill, CartLine, Credential, Order, OrderCreate, OrderId, PaymentProvider, SkuId};
use crate::error::{CheckoutError, ErrorKind, PaymentError};
use crate::payment::{PaymentSimulator, PaymentState, Settlement};
use crate::persistence::{Snapshot, SnapshotStore};
use crate::pricing::PricingPolicy;

/// Lines, bill and address frozen when checkout begins.
#[derive(Debug, Clone)]
struct CheckoutDraft {
    lines: Vec<CartLine>,
    bill: Bill,
    delivery_address: String,
}

/// One shopper's view of the shop.
///
/// Owns the cart (active and pending), the authentication flag and the
/// current payment attempt. Stock and orders are shared and reached through
/// the actor clients.
#[derive(Debug)]
pub struct ShopperSession {
    cart: CartStore,
    authenticated: bool,
    payment: Option<PaymentSimulator>,
    draft: Option<CheckoutDraft>,
    stock_client: StockClient,
    order_client: OrderClient,
    pricing: PricingPolicy,
    settlement_delay: Option<Duration>,
    store: Option<Arc<dyn SnapshotStore>>,
    dirty: bool,
}

impl ShopperSession {
    pub fn new(stock_client: StockClient, order_client: OrderClient, config: &EngineConfig) -> Self {
        Self {
            cart: CartStore::new(),
            authenticated: false,
            payment: None,
            draft: None,
            stock_client,
            order_client,
            pricing: config.pricing.clone(),
            settlement_delay: config.settlement_delay(),
            store: None,
            dirty: false,
        }
    }

    /// Saves a snapshot to `store` after every mutating operation.
    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replaces both carts with previously saved lines.
    pub fn restore_cart(&mut self, cart: Vec<CartLine>, pending: Vec<CartLine>) {
        self.cart = CartStore::from_parts(CartLines::from(cart), CartLines::from(pending));
        debug!(
            lines = self.cart.items().len(),
            pending = self.cart.pending_items().len(),
            "Cart restored"
        );
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Whether a save failed and has not been carried by a later one yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn order_client(&self) -> &OrderClient {
        &self.order_client
    }

    // =========================================================================
    // CART
    // =========================================================================

    /// Adds to the active cart, or to the pending cart before sign-in.
    #[instrument(fields(sku = %line.sku, quantity = line.quantity), skip(self, line))]
    pub async fn add_item(&mut self, line: CartLine) -> Result<(), CheckoutError> {
        self.ensure_cart_unlocked()?;
        if self.authenticated {
            self.cart.add_item(line)?;
        } else {
            self.cart.add_to_pending(line)?;
        }
        self.persist().await;
        Ok(())
    }

    // Edits below target the same cart `add_item` would.

    pub async fn update_quantity(&mut self, sku: &SkuId, delta: i64) -> Result<(), CheckoutError> {
        self.ensure_cart_unlocked()?;
        if self.authenticated {
            self.cart.update_quantity(sku, delta);
        } else {
            self.cart.update_pending_quantity(sku, delta);
        }
        self.persist().await;
        Ok(())
    }

    pub async fn set_quantity(&mut self, sku: &SkuId, quantity: u32) -> Result<(), CheckoutError> {
        self.ensure_cart_unlocked()?;
        if self.authenticated {
            self.cart.set_quantity(sku, quantity)?;
        } else {
            self.cart.set_pending_quantity(sku, quantity)?;
        }
        self.persist().await;
        Ok(())
    }

    pub async fn remove_item(&mut self, sku: &SkuId) -> Result<(), CheckoutError> {
        self.ensure_cart_unlocked()?;
        if self.authenticated {
            self.cart.remove_item(sku);
        } else {
            self.cart.remove_from_pending(sku);
        }
        self.persist().await;
        Ok(())
    }

    pub async fn clear_cart(&mut self) -> Result<(), CheckoutError> {
        self.ensure_cart_unlocked()?;
        if self.authenticated {
            self.cart.clear();
        } else {
            self.cart.clear_pending();
        }
        self.persist().await;
        Ok(())
    }

    /// Hook for the sign-in flow. Merges the pending cart on the transition
    /// to authenticated and returns how many lines were merged.
    #[instrument(skip(self))]
    pub async fn on_authenticated(&mut self) -> usize {
        if self.authenticated {
            debug!("Already authenticated, nothing to merge");
            return 0;
        }

        self.authenticated = true;
        let merged = self.cart.merge_pending_into_cart();
        if merged > 0 {
            self.persist().await;
        }
        merged
    }

    pub fn on_signed_out(&mut self) {
        self.authenticated = false;
        info!("Shopper signed out, cart kept");
    }

    /// The bill for the cart as it is now.
    pub fn bill(&self) -> Bill {
        self.pricing.compute_bill(self.cart.items())
    }

    /// How many more units of `sku` can go in the cart.
    pub async fn available_for_purchase(&self, sku: &SkuId) -> Result<u32, CheckoutError> {
        let in_cart = if self.authenticated {
            self.cart.quantity_of(sku)
        } else {
            self.cart.pending_quantity_of(sku)
        };
        Ok(self
            .stock_client
            .available_for_purchase(sku.clone(), in_cart)
            .await?)
    }

    // =========================================================================
    // CHECKOUT AND PAYMENT
    // =========================================================================

    /// Freezes the cart into a bill and starts a payment attempt with `provider`.
    #[instrument(fields(provider = provider.label), skip(self, provider, delivery_address))]
    pub async fn begin_checkout(
        &mut self,
        provider: PaymentProvider,
        delivery_address: &str,
    ) -> Result<PaymentState, CheckoutError> {
        self.ensure_cart_unlocked()?;
        if self.cart.is_empty() {
            return Err(CheckoutError::ValidationError("Cart is empty".to_string()));
        }
        if delivery_address.trim().is_empty() {
            return Err(CheckoutError::ValidationError(
                "Delivery address is required".to_string(),
            ));
        }

        let provider = match self.settlement_delay {
            Some(delay) => provider.with_processing_delay(delay),
            None => provider,
        };
        let draft = CheckoutDraft {
            lines: self.cart.items().to_vec(),
            bill: self.bill(),
            delivery_address: delivery_address.trim().to_string(),
        };

        let mut payment = PaymentSimulator::new(provider, draft.bill.grand_total);
        let state = payment.begin()?.clone();
        info!(
            checkout_id = %payment.checkout_id(),
            total = %draft.bill.grand_total,
            "Checkout started"
        );

        self.payment = Some(payment);
        self.draft = Some(draft);
        Ok(state)
    }

    pub async fn submit_credential(&mut self, credential: &Credential) -> Result<(), CheckoutError> {
        let payment = self.payment.as_mut().ok_or(CheckoutError::NoActiveCheckout)?;
        payment.submit_credential(credential)?;
        Ok(())
    }

    /// Waits out the provider's processing delay, then settles and places the
    /// order. The cart is cleared only once the order exists.
    ///
    /// A second call after settlement was taken is rejected with
    /// [`PaymentError::AlreadySettled`]; use [`Self::retry_settlement`] after a
    /// transient failure.
    #[instrument(skip(self))]
    pub async fn settle(&mut self) -> Result<Order, CheckoutError> {
        let payment = self.payment.as_mut().ok_or(CheckoutError::NoActiveCheckout)?;
        if matches!(payment.state(), PaymentState::Processing) {
            tokio::time::sleep(payment.processing_delay()).await;
        }

        let settlement = payment.begin_settlement()?;
        self.place(settlement).await
    }

    /// Re-sends a settlement whose placement failed transiently. Placement is
    /// idempotent per checkout, so this never creates a second order.
    #[instrument(skip(self))]
    pub async fn retry_settlement(&mut self) -> Result<Order, CheckoutError> {
        let payment = self.payment.as_ref().ok_or(CheckoutError::NoActiveCheckout)?;
        let settlement = payment
            .pending_settlement()
            .cloned()
            .ok_or(PaymentError::InvalidState {
                state: payment.state().name(),
                operation: "retry settlement",
            })?;
        self.place(settlement).await
    }

    async fn place(&mut self, settlement: Settlement) -> Result<Order, CheckoutError> {
        let draft = self.draft.clone().ok_or(CheckoutError::NoActiveCheckout)?;
        let payment = self.payment.as_mut().ok_or(CheckoutError::NoActiveCheckout)?;

        let create = OrderCreate {
            checkout_id: settlement.checkout_id,
            lines: draft.lines,
            bill: draft.bill,
            payment_method: payment.provider().label.to_string(),
            prepaid: payment.provider().is_prepaid(),
            transaction_id: Some(settlement.transaction_id),
            delivery_address: draft.delivery_address,
        };

        match self.order_client.place_order(create).await {
            Ok(order) => {
                payment.complete(order.id())?;
                self.draft = None;
                self.cart.clear();
                info!(order_id = %order.id(), "Checkout complete, cart cleared");
                self.persist().await;
                Ok(order)
            }
            Err(e) if e.kind() == ErrorKind::Transient => {
                warn!(error = %e, "Order placement unreachable, settlement kept for retry");
                Err(e.into())
            }
            Err(e) => {
                warn!(error = %e, "Order placement rejected, payment failed");
                payment.fail(e.to_string())?;
                self.draft = None;
                Err(e.into())
            }
        }
    }

    /// Abandons the current payment attempt before settlement.
    pub fn cancel_payment(&mut self) -> Result<(), CheckoutError> {
        let payment = self.payment.as_mut().ok_or(CheckoutError::NoActiveCheckout)?;
        payment.cancel()?;
        self.draft = None;
        Ok(())
    }

    pub fn payment_state(&self) -> Option<&PaymentState> {
        self.payment.as_ref().map(PaymentSimulator::state)
    }

    // =========================================================================
    // ORDERS
    // =========================================================================

    pub async fn cancel_order(&mut self, id: OrderId, reason: &str) -> Result<Order, CheckoutError> {
        let order = self.order_client.cancel(id, reason.to_string()).await?;
        self.persist().await;
        Ok(order)
    }

    /// Order history, most recent first.
    pub async fn orders(&self) -> Result<Vec<Order>, CheckoutError> {
        Ok(self.order_client.list_orders().await?)
    }

    pub async fn order(&self, id: OrderId) -> Result<Option<Order>, CheckoutError> {
        Ok(self.order_client.get_order(id).await?)
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    /// Everything a store needs to rebuild this shop.
    pub async fn snapshot(&self) -> Result<Snapshot, CheckoutError> {
        let stock = self.stock_client.snapshot().await?;
        let orders = self.order_client.list_orders().await?;
        Ok(Snapshot {
            cart: self.cart.items().to_vec(),
            pending_cart: self.cart.pending_items().to_vec(),
            stock,
            orders,
        })
    }

    /// Saves now and reports failure, unlike the save after each mutation.
    pub async fn flush(&mut self) -> Result<(), CheckoutError> {
        let Some(store) = self.store.clone() else {
            return Ok(());
        };
        let snapshot = self.snapshot().await?;
        store.save(&snapshot).await?;
        self.dirty = false;
        Ok(())
    }

    async fn persist(&mut self) {
        if self.store.is_none() {
            return;
        }
        if let Err(e) = self.flush().await {
            error!(error = %e, "Snapshot save failed, will retry on next change");
            self.dirty = true;
        }
    }

    fn ensure_cart_unlocked(&self) -> Result<(), CheckoutError> {
        match &self.payment {
            Some(payment) if !payment.state().is_terminal() => Err(CheckoutError::CheckoutInProgress),
            _ => Ok(()),
        }
    }
}
