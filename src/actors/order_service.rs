use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, instrument, warn};

use crate::clients::{OrderClient, StockClient};
use crate::domain::{stock_lines, Order, OrderCreate, OrderId, StatusChange, StockLine};
use crate::error::OrderError;
use crate::messages::{OrderRequest, ServiceResponse};
use crate::orders::{validate_new_order, OrderBook};

/// Capacity of the status-change broadcast. Slow subscribers see `Lagged`.
pub const STATUS_EVENT_CAPACITY: usize = 64;

pub type OrderIdGenerator = Box<dyn Fn() -> OrderId + Send + Sync>;

/// Owns the order book and orchestrates placement and cancellation against
/// the stock actor.
pub struct OrderService {
    receiver: mpsc::Receiver<OrderRequest>,
    stock_client: StockClient,
    book: OrderBook,
    next_id: OrderIdGenerator,
    events: broadcast::Sender<StatusChange>,
}

impl OrderService {
    pub fn new(
        buffer_size: usize,
        book: OrderBook,
        stock_client: StockClient,
        next_id: impl Fn() -> OrderId + Send + Sync + 'static,
    ) -> (Self, OrderClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let (events, _) = broadcast::channel(STATUS_EVENT_CAPACITY);
        let service = Self {
            receiver,
            stock_client,
            book,
            next_id: Box::new(next_id),
            events,
        };
        let client = OrderClient::new(sender);
        (service, client)
    }

    #[instrument(name = "order_service", skip(self))]
    pub async fn run(mut self) {
        info!(orders = self.book.len(), "OrderService starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                OrderRequest::PlaceOrder { order, respond_to } => {
                    self.handle_place_order(order, respond_to).await;
                }
                OrderRequest::Advance { id, respond_to } => {
                    self.handle_advance(id, respond_to);
                }
                OrderRequest::Cancel {
                    id,
                    reason,
                    respond_to,
                } => {
                    self.handle_cancel(id, reason, respond_to).await;
                }
                OrderRequest::GetOrder { id, respond_to } => {
                    self.handle_get_order(id, respond_to);
                }
                OrderRequest::ListOrders { respond_to } => {
                    let _ = respond_to.send(Ok(self.book.list_by_recency()));
                }
                OrderRequest::Subscribe { respond_to } => {
                    debug!("New status subscriber");
                    let _ = respond_to.send(Ok(self.events.subscribe()));
                }
                OrderRequest::Shutdown => {
                    info!("OrderService shutting down");
                    break;
                }
            }
        }

        info!("OrderService stopped");
    }

    #[instrument(fields(checkout_id = %order.checkout_id), skip(self, order, respond_to))]
    async fn handle_place_order(&mut self, order: OrderCreate, respond_to: ServiceResponse<Order, OrderError>) {
        info!("Processing place_order request");
        let _ = respond_to.send(self.place_order(order).await);
    }

    async fn place_order(&mut self, order: OrderCreate) -> Result<Order, OrderError> {
        // Step 1: Validate
        if let Err(e) = validate_new_order(&order) {
            warn!(error = %e, "Order rejected");
            return Err(e);
        }

        // Step 2: A settled checkout is only ever placed once
        if let Some(existing) = self.book.find_by_checkout(&order.checkout_id) {
            info!(order_id = %existing.id(), "Checkout already placed, returning existing order");
            return Ok(existing.clone());
        }

        // Step 3: Re-check and deduct stock in one step
        let lines = stock_lines(&order.lines);
        if let Err(e) = self.stock_client.try_deduct(lines.clone()).await {
            error!(error = %e, "Stock re-check failed");
            return Err(OrderError::Stock(e));
        }
        info!("Stock deducted");

        // Step 4: Create order
        let id = (self.next_id)();
        match self.book.create(id, order) {
            Ok(order) => {
                info!(order_id = %order.id(), "Order created successfully");
                Ok(order)
            }
            Err(e) => {
                // Step 5: No order, so give the stock back
                error!(error = %e, "Order insert failed, restoring stock");
                self.compensate(lines).await;
                Err(e)
            }
        }
    }

    async fn compensate(&self, lines: Vec<StockLine>) {
        if let Err(e) = self.stock_client.restore(lines).await {
            error!(error = %e, "Stock compensation failed");
        }
    }

    #[instrument(fields(order_id = %id), skip(self, respond_to))]
    fn handle_advance(&mut self, id: OrderId, respond_to: ServiceResponse<Order, OrderError>) {
        let result = self.book.advance(&id).and_then(|change| {
            info!(from = %change.from, to = %change.to, "Order advanced");
            self.publish(change);
            self.book.get(&id).cloned().ok_or(OrderError::NotFound(id))
        });
        if let Err(e) = &result {
            debug!(error = %e, "Advance rejected");
        }
        let _ = respond_to.send(result);
    }

    #[instrument(fields(order_id = %id), skip(self, reason, respond_to))]
    async fn handle_cancel(&mut self, id: OrderId, reason: String, respond_to: ServiceResponse<Order, OrderError>) {
        info!("Processing cancel request");
        let _ = respond_to.send(self.cancel(id, reason).await);
    }

    async fn cancel(&mut self, id: OrderId, reason: String) -> Result<Order, OrderError> {
        let items = match self.book.ensure_cancellable(&id) {
            Ok(order) => stock_lines(order.items()),
            Err(e) => {
                warn!(error = %e, "Cancellation rejected");
                return Err(e);
            }
        };

        // Restore first: if the stock actor is gone the order stays placed.
        if let Err(e) = self.stock_client.restore(items).await {
            error!(error = %e, "Stock restore failed, order left unchanged");
            return Err(OrderError::Stock(e));
        }

        let change = self.book.cancel(&id, reason)?;
        info!("Order cancelled, stock restored");
        self.publish(change);
        self.book.get(&id).cloned().ok_or(OrderError::NotFound(id))
    }

    #[instrument(fields(order_id = %id), skip(self, respond_to))]
    fn handle_get_order(&self, id: OrderId, respond_to: ServiceResponse<Option<Order>, OrderError>) {
        debug!("Processing get_order request");
        let order = self.book.get(&id).cloned();
        match &order {
            Some(order) => debug!(status = %order.status(), "Order found"),
            None => debug!("Order not found"),
        }
        let _ = respond_to.send(Ok(order));
    }

    fn publish(&self, change: StatusChange) {
        // No subscribers is fine.
        let _ = self.events.send(change);
    }
}

/// Starts an order actor and returns its client with the task handle.
pub fn spawn_order_service(
    buffer_size: usize,
    book: OrderBook,
    stock_client: StockClient,
) -> (OrderClient, tokio::task::JoinHandle<()>) {
    let (service, client) = OrderService::new(buffer_size, book, stock_client, OrderId::generate);
    (client, tokio::spawn(service.run()))
}
