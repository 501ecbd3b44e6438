use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::status_saver::{save_on_status_change, save_shop_state};
use crate::actors::{OrderService, StockService};
use crate::checkout::ShopperSession;
use crate::clients::{OrderClient, StockClient};
use crate::config::EngineConfig;
use crate::domain::OrderId;
use crate::error::CheckoutError;
use crate::orders::OrderBook;
use crate::persistence::{Snapshot, SnapshotStore};
use crate::stock::StockLedger;

struct StatusSaver {
    store: Arc<dyn SnapshotStore>,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// The main application system that orchestrates all actors.
///
/// Responsible for starting up actors, wiring them together, and handling shutdown.
pub struct ShopSystem {
    pub stock_client: StockClient,
    pub order_client: OrderClient,
    config: EngineConfig,
    stock_handle: JoinHandle<()>,
    order_handle: JoinHandle<()>,
    saver: Option<StatusSaver>,
}

impl ShopSystem {
    /// Starts an empty shop.
    pub fn new(config: EngineConfig) -> Self {
        Self::start_from(config, None)
    }

    /// Starts a shop from a previously saved snapshot. Carts are per shopper
    /// and restored with [`ShopperSession::restore_cart`].
    pub fn start_from(config: EngineConfig, snapshot: Option<&Snapshot>) -> Self {
        // 1. Stock: recorded counters, configured seed for anything unseen
        let ledger = match snapshot {
            Some(snapshot) => {
                StockLedger::from_records(config.default_stock_seed, snapshot.stock.clone())
            }
            None => StockLedger::new(config.default_stock_seed),
        };
        let (stock_service, stock_client) = StockService::new(config.channel_buffer, ledger);
        let stock_handle = tokio::spawn(stock_service.run());

        // 2. Orders, wired to the stock actor
        let book = snapshot
            .map(|snapshot| OrderBook::from_orders(snapshot.orders.clone()))
            .unwrap_or_default();
        let (order_service, order_client) = OrderService::new(
            config.channel_buffer,
            book,
            stock_client.clone(),
            OrderId::generate,
        );
        let order_handle = tokio::spawn(order_service.run());

        info!(
            restored = snapshot.is_some(),
            stock_seed = config.default_stock_seed,
            "Shop system started"
        );

        Self {
            stock_client,
            order_client,
            config,
            stock_handle,
            order_handle,
            saver: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A fresh shopper session bound to this shop's actors.
    pub fn session(&self) -> ShopperSession {
        ShopperSession::new(self.stock_client.clone(), self.order_client.clone(), &self.config)
    }

    /// Saves stock and orders to `store` after every order status change,
    /// and once more on shutdown. Replaces any earlier store.
    pub async fn persist_status_changes(
        &mut self,
        store: Arc<dyn SnapshotStore>,
    ) -> Result<(), CheckoutError> {
        let events = self.order_client.subscribe().await?;
        let (stop, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(save_on_status_change(
            events,
            self.stock_client.clone(),
            self.order_client.clone(),
            store.clone(),
            stop_rx,
        ));

        if let Some(previous) = self.saver.replace(StatusSaver { store, stop, handle }) {
            let _ = previous.stop.send(());
            let _ = previous.handle.await;
        }
        Ok(())
    }

    /// Stops the status saver with a final save, then the order actor, since
    /// it calls into the stock actor, then the stock actor. A failed step is
    /// logged and the remaining steps still run.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");
        let mut failures = Vec::new();

        if let Some(saver) = self.saver {
            let _ = saver.stop.send(());
            if let Err(e) = saver.handle.await {
                error!("Status saver task failed: {:?}", e);
                failures.push(format!("Status saver task failed: {:?}", e));
            }
            if let Err(e) =
                save_shop_state(&self.stock_client, &self.order_client, saver.store.as_ref()).await
            {
                error!(error = %e, "Final snapshot save failed");
                failures.push(format!("Final snapshot save failed: {e}"));
            }
        }

        // The order actor must be gone before stock stops answering it.
        let order_sent = self.order_client.shutdown().await;
        stop_actor("order", order_sent, self.order_handle, &mut failures).await;

        let stock_sent = self.stock_client.shutdown().await;
        stop_actor("stock", stock_sent, self.stock_handle, &mut failures).await;

        if failures.is_empty() {
            info!("System shutdown complete.");
            Ok(())
        } else {
            Err(failures.join("; "))
        }
    }
}

async fn stop_actor(
    name: &str,
    sent: Result<(), String>,
    handle: JoinHandle<()>,
    failures: &mut Vec<String>,
) {
    if let Err(e) = sent {
        error!(actor = name, error = %e, "Shutdown request failed");
        failures.push(format!("{name} shutdown request failed: {e}"));
    }
    if let Err(e) = handle.await {
        error!(actor = name, "Actor task failed: {:?}", e);
        failures.push(format!("{name} actor task failed: {:?}", e));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rust_decimal::Decimal;
    use testresult::TestResult;

    use super::*;
    use crate::domain::{CartLine, OrderStatus, PaymentProvider, SkuId};
    use crate::persistence::MemorySnapshotStore;

    fn config() -> EngineConfig {
        EngineConfig {
            settlement_delay_ms: Some(0),
            ..EngineConfig::default()
        }
    }

    async fn saved_status(store: &MemorySnapshotStore) -> Option<OrderStatus> {
        let snapshot = store.load().await.ok().flatten()?;
        snapshot.orders.first().map(|order| order.status())
    }

    #[tokio::test]
    async fn snapshot_counters_are_restored_and_seed_covers_the_rest() -> TestResult {
        let snapshot = Snapshot {
            stock: [(SkuId::new("sku-1"), 2)].into(),
            ..Snapshot::default()
        };
        let config = EngineConfig {
            default_stock_seed: 6,
            ..EngineConfig::default()
        };

        let system = ShopSystem::start_from(config, Some(&snapshot));

        assert_eq!(system.stock_client.on_hand(SkuId::new("sku-1")).await?, 2);
        assert_eq!(system.stock_client.on_hand(SkuId::new("sku-9")).await?, 6);
        system.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    async fn restored_orders_are_listed() -> TestResult {
        let config = EngineConfig {
            settlement_delay_ms: Some(0),
            ..EngineConfig::default()
        };
        let first = ShopSystem::new(config.clone());
        let mut session = first.session();
        session.on_authenticated().await;
        session
            .add_item(CartLine::new("sku-1", Decimal::from(120), 2))
            .await?;
        session
            .begin_checkout(PaymentProvider::CASH_ON_DELIVERY, "9 Hill Road")
            .await?;
        let order = session.settle().await?;
        let snapshot = session.snapshot().await?;
        first.shutdown().await?;

        let second = ShopSystem::start_from(config, Some(&snapshot));

        let orders = second.order_client.list_orders().await?;
        assert_eq!(orders, vec![order]);
        assert_eq!(second.stock_client.on_hand(SkuId::new("sku-1")).await?, 8);
        second.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    async fn status_advances_are_saved_alongside_the_cart() -> TestResult {
        let store = Arc::new(MemorySnapshotStore::new());
        let mut system = ShopSystem::new(config());
        system.persist_status_changes(store.clone()).await?;
        let mut session = system.session().with_store(store.clone());
        session.on_authenticated().await;
        session
            .add_item(CartLine::new("sku-1", Decimal::from(120), 2))
            .await?;
        session
            .begin_checkout(PaymentProvider::CASH_ON_DELIVERY, "9 Hill Road")
            .await?;
        let order = session.settle().await?;
        session
            .add_item(CartLine::new("sku-2", Decimal::from(40), 1))
            .await?;

        system.order_client.advance(order.id()).await?;

        let saved = tokio::time::timeout(Duration::from_secs(1), async {
            while saved_status(&store).await != Some(OrderStatus::Confirmed) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(saved.is_ok());

        let snapshot = store.load().await?.unwrap_or_default();
        assert_eq!(snapshot.cart.len(), 1);
        assert_eq!(snapshot.cart[0].sku, SkuId::new("sku-2"));
        assert_eq!(snapshot.stock.get(&SkuId::new("sku-1")), Some(&8));
        system.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_saves_the_latest_status() -> TestResult {
        let store = Arc::new(MemorySnapshotStore::new());
        let mut system = ShopSystem::new(config());
        system.persist_status_changes(store.clone()).await?;
        let mut session = system.session();
        session.on_authenticated().await;
        session
            .add_item(CartLine::new("sku-1", Decimal::from(120), 1))
            .await?;
        session
            .begin_checkout(PaymentProvider::CASH_ON_DELIVERY, "9 Hill Road")
            .await?;
        let order = session.settle().await?;

        system.order_client.advance(order.id()).await?;
        system.order_client.advance(order.id()).await?;
        system.shutdown().await?;

        assert_eq!(saved_status(&store).await, Some(OrderStatus::Preparing));
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_still_stops_stock_when_the_order_actor_is_gone() -> TestResult {
        let system = ShopSystem::new(config());
        let stock_client = system.stock_client.clone();
        system.order_client.shutdown().await?;
        while system.order_client.list_orders().await.is_ok() {
            tokio::task::yield_now().await;
        }

        let result = system.shutdown().await;

        assert!(result.is_err());
        assert!(stock_client.on_hand(SkuId::new("sku-1")).await.is_err());
        Ok(())
    }
}
