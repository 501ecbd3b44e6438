use tokio::sync::{broadcast, mpsc};

use crate::domain::{Order, OrderCreate, OrderId, StatusChange};
use crate::error::OrderError;
use crate::messages::OrderRequest;

/// Client for the order actor.
///
/// Placement and cancellation are orchestrated on the actor side, so a single
/// call either applies its stock effect and order change together or neither.
#[derive(Debug, Clone)]
pub struct OrderClient {
    sender: mpsc::Sender<OrderRequest>,
}

impl OrderClient {
    pub fn new(sender: mpsc::Sender<OrderRequest>) -> Self {
        Self { sender }
    }
}

client_shutdown!(OrderClient => OrderRequest);

client_method!(OrderClient => fn place_order(order: OrderCreate) -> Order as OrderRequest::PlaceOrder, Error = OrderError);
client_method!(OrderClient => fn advance(id: OrderId) -> Order as OrderRequest::Advance, Error = OrderError);
client_method!(OrderClient => fn cancel(id: OrderId, reason: String) -> Order as OrderRequest::Cancel, Error = OrderError);
client_method!(OrderClient => fn get_order(id: OrderId) -> Option<Order> as OrderRequest::GetOrder, Error = OrderError);
client_method!(OrderClient => fn list_orders() -> Vec<Order> as OrderRequest::ListOrders, Error = OrderError);
client_method!(OrderClient => fn subscribe() -> broadcast::Receiver<StatusChange> as OrderRequest::Subscribe, Error = OrderError);
