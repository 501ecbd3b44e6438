use std::sync::Arc;

use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error, info, instrument, warn};

use crate::clients::{OrderClient, StockClient};
use crate::domain::StatusChange;
use crate::error::CheckoutError;
use crate::persistence::{Snapshot, SnapshotStore};

/// Saves stock counters and orders whenever an order changes status.
///
/// Cart fields already in the store are carried over untouched; they belong
/// to the shopper session and are saved by it.
#[instrument(name = "status_saver", skip_all)]
pub async fn save_on_status_change(
    mut events: broadcast::Receiver<StatusChange>,
    stock_client: StockClient,
    order_client: OrderClient,
    store: Arc<dyn SnapshotStore>,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        let change = tokio::select! {
            _ = &mut stop => break,
            change = events.recv() => change,
        };

        match change {
            Ok(change) => {
                debug!(order_id = %change.order_id, to = %change.to, "Saving after status change");
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "Status saver lagged, saving current state");
            }
            Err(broadcast::error::RecvError::Closed) => {
                info!("Order actor gone, stopping status saver");
                break;
            }
        }

        if let Err(e) = save_shop_state(&stock_client, &order_client, store.as_ref()).await {
            error!(error = %e, "Snapshot save after status change failed");
        }
    }
}

/// Replaces stock and orders in the stored snapshot with the actors' current state.
pub async fn save_shop_state(
    stock_client: &StockClient,
    order_client: &OrderClient,
    store: &dyn SnapshotStore,
) -> Result<(), CheckoutError> {
    let stock = stock_client.snapshot().await?;
    let orders = order_client.list_orders().await?;

    let snapshot = Snapshot {
        stock,
        orders,
        ..store.load().await?.unwrap_or_default()
    };
    store.save(&snapshot).await?;
    Ok(())
}
