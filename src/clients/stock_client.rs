use std::collections::BTreeMap;

use tokio::sync::mpsc;

use crate::domain::{SkuId, StockLine};
use crate::error::StockError;
use crate::messages::StockRequest;

/// Client for the stock actor.
#[derive(Debug, Clone)]
pub struct StockClient {
    sender: mpsc::Sender<StockRequest>,
}

impl StockClient {
    pub fn new(sender: mpsc::Sender<StockRequest>) -> Self {
        Self { sender }
    }
}

client_shutdown!(StockClient => StockRequest);

client_method!(StockClient => fn on_hand(sku: SkuId) -> u32 as StockRequest::OnHand, Error = StockError);
client_method!(StockClient => fn available_for_purchase(sku: SkuId, quantity_in_cart: u32) -> u32 as StockRequest::AvailableForPurchase, Error = StockError);
client_method!(StockClient => fn deduct(lines: Vec<StockLine>) -> () as StockRequest::Deduct, Error = StockError);
client_method!(StockClient => fn try_deduct(lines: Vec<StockLine>) -> () as StockRequest::TryDeduct, Error = StockError);
client_method!(StockClient => fn restore(lines: Vec<StockLine>) -> () as StockRequest::Restore, Error = StockError);
client_method!(StockClient => fn set_on_hand(sku: SkuId, quantity: u32) -> () as StockRequest::SetOnHand, Error = StockError);
client_method!(StockClient => fn snapshot() -> BTreeMap<SkuId, u32> as StockRequest::Snapshot, Error = StockError);
