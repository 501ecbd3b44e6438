use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::clients::OrderClient;
use crate::error::{ErrorKind, OrderError};

/// Advances every open order one stage per tick until the order actor goes away.
///
/// Orders only move forward; terminal orders are skipped.
#[instrument(name = "advance_loop", skip(order_client))]
pub async fn advance_loop(order_client: OrderClient, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match advance_open_orders(&order_client).await {
            Ok(advanced) if advanced > 0 => debug!(advanced, "Orders advanced"),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::Transient => {
                info!(error = %e, "Order actor gone, stopping advance loop");
                break;
            }
            Err(e) => warn!(error = %e, "Advance tick failed"),
        }
    }
}

/// One tick of [`advance_loop`]. Returns how many orders moved.
pub async fn advance_open_orders(order_client: &OrderClient) -> Result<usize, OrderError> {
    let open: Vec<_> = order_client
        .list_orders()
        .await?
        .into_iter()
        .filter(|order| !order.status().is_terminal())
        .map(|order| order.id())
        .collect();

    let mut advanced = 0;
    for id in open {
        match order_client.advance(id).await {
            Ok(_) => advanced += 1,
            // Cancelled between the listing and the advance.
            Err(OrderError::AlreadyFinal { .. }) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(advanced)
}
