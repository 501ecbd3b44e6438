use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info, Instrument};

use checkout_engine::app_system::setup_tracing;
use checkout_engine::config::CliConfig;
use checkout_engine::domain::{CartLine, LineMetadata, PaymentProvider, SkuId};
use checkout_engine::persistence::{JsonFileSnapshotStore, SnapshotStore};
use checkout_engine::ShopSystem;

#[tokio::main]
async fn main() -> Result<(), String> {
    let cli = CliConfig::load().map_err(|e| e.to_string())?;

    // Setup tracing once for the entire application
    setup_tracing(&cli.log_level);

    let config = cli.engine_config();
    let store = cli
        .snapshot_path
        .as_ref()
        .map(|path| Arc::new(JsonFileSnapshotStore::new(path.clone())) as Arc<dyn SnapshotStore>);

    let snapshot = match &store {
        Some(store) => store.load().await.map_err(|e| e.to_string())?,
        None => None,
    };

    info!(restored = snapshot.is_some(), "Starting checkout engine demo");
    let mut system = ShopSystem::start_from(config, snapshot.as_ref());
    if let Some(store) = &store {
        system
            .persist_status_changes(store.clone())
            .await
            .map_err(|e| e.to_string())?;
    }

    let mut session = system.session();
    if let Some(snapshot) = &snapshot {
        session.restore_cart(snapshot.cart.clone(), snapshot.pending_cart.clone());
    }
    if let Some(store) = store {
        session = session.with_store(store);
    }

    // Browse before signing in, then sign in
    let biryani = CartLine::new(
        SkuId::from_catalog(Some("dish-101"), "Veg Biryani"),
        Decimal::from(180),
        2,
    )
    .with_metadata(
        LineMetadata::new()
            .with(LineMetadata::NAME, "Veg Biryani")
            .with(LineMetadata::DIETARY, "veg"),
    );
    let lassi = CartLine::new(SkuId::from_catalog(None, "Mango Lassi"), Decimal::from(60), 1)
        .with_metadata(LineMetadata::new().with(LineMetadata::NAME, "Mango Lassi"));

    session.add_item(biryani).await.map_err(|e| e.to_string())?;
    session.add_item(lassi).await.map_err(|e| e.to_string())?;
    let merged = session.on_authenticated().await;
    info!(merged, "Shopper signed in");

    let bill = session.bill();
    info!(
        subtotal = %bill.subtotal,
        tax = %bill.tax,
        delivery_fee = %bill.delivery_fee,
        grand_total = %bill.grand_total,
        "Bill computed"
    );

    let span = tracing::info_span!("checkout");
    let checkout = async {
        session
            .begin_checkout(PaymentProvider::CASH_ON_DELIVERY, "221B Baker Street")
            .await?;
        session.settle().await
    }
    .instrument(span)
    .await;

    match checkout {
        Ok(order) => {
            info!(order_id = %order.id(), status = %order.status(), "Order placed");
            match session.cancel_order(order.id(), "Ordered by mistake").await {
                Ok(cancelled) => info!(status = %cancelled.status(), "Order cancelled"),
                Err(e) => error!(error = %e, "Cancellation failed"),
            }
        }
        Err(e) => error!(error = %e, kind = ?e.kind(), "Checkout failed"),
    }

    if let Err(e) = session.flush().await {
        error!(error = %e, "Final save failed");
    }

    // Shutdown system gracefully
    system.shutdown().await?;

    info!("Demo completed successfully");
    Ok(())
}
