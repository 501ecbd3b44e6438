use std::collections::BTreeMap;

use tokio::sync::{broadcast, oneshot};

use crate::domain::{Order, OrderCreate, OrderId, SkuId, StatusChange, StockLine};
use crate::error::{OrderError, StockError};

/// Generic type aliases for service communication
pub type ServiceResult<T, E> = std::result::Result<T, E>;
pub type ServiceResponse<T, E> = oneshot::Sender<ServiceResult<T, E>>;

/// Typed message enums for actor communication. Each variant includes parameters
/// and a oneshot channel for responses.

#[derive(Debug)]
pub enum StockRequest {
    OnHand {
        sku: SkuId,
        respond_to: ServiceResponse<u32, StockError>,
    },
    AvailableForPurchase {
        sku: SkuId,
        quantity_in_cart: u32,
        respond_to: ServiceResponse<u32, StockError>,
    },
    Deduct {
        lines: Vec<StockLine>,
        respond_to: ServiceResponse<(), StockError>,
    },
    TryDeduct {
        lines: Vec<StockLine>,
        respond_to: ServiceResponse<(), StockError>,
    },
    Restore {
        lines: Vec<StockLine>,
        respond_to: ServiceResponse<(), StockError>,
    },
    SetOnHand {
        sku: SkuId,
        quantity: u32,
        respond_to: ServiceResponse<(), StockError>,
    },
    Snapshot {
        respond_to: ServiceResponse<BTreeMap<SkuId, u32>, StockError>,
    },
    Shutdown,
}

#[derive(Debug)]
pub enum OrderRequest {
    PlaceOrder {
        order: OrderCreate,
        respond_to: ServiceResponse<Order, OrderError>,
    },
    Advance {
        id: OrderId,
        respond_to: ServiceResponse<Order, OrderError>,
    },
    Cancel {
        id: OrderId,
        reason: String,
        respond_to: ServiceResponse<Order, OrderError>,
    },
    GetOrder {
        id: OrderId,
        respond_to: ServiceResponse<Option<Order>, OrderError>,
    },
    ListOrders {
        respond_to: ServiceResponse<Vec<Order>, OrderError>,
    },
    Subscribe {
        respond_to: ServiceResponse<broadcast::Receiver<StatusChange>, OrderError>,
    },
    Shutdown,
}
