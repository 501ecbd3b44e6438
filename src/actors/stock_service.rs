use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::clients::StockClient;
use crate::domain::{SkuId, StockLine};
use crate::error::StockError;
use crate::messages::{ServiceResponse, StockRequest};
use crate::stock::StockLedger;

/// Owns the stock ledger. Every checkout across every shopper competes for the
/// same counters, so all mutations go through this one message loop.
pub struct StockService {
    receiver: mpsc::Receiver<StockRequest>,
    ledger: StockLedger,
}

impl StockService {
    pub fn new(buffer_size: usize, ledger: StockLedger) -> (Self, StockClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let service = Self { receiver, ledger };
        let client = StockClient::new(sender);
        (service, client)
    }

    #[instrument(name = "stock_service", skip(self))]
    pub async fn run(mut self) {
        info!(seed = self.ledger.seed(), "StockService starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StockRequest::OnHand { sku, respond_to } => {
                    self.handle_on_hand(sku, respond_to);
                }
                StockRequest::AvailableForPurchase {
                    sku,
                    quantity_in_cart,
                    respond_to,
                } => {
                    self.handle_available(sku, quantity_in_cart, respond_to);
                }
                StockRequest::Deduct { lines, respond_to } => {
                    self.handle_deduct(lines, respond_to);
                }
                StockRequest::TryDeduct { lines, respond_to } => {
                    self.handle_try_deduct(lines, respond_to);
                }
                StockRequest::Restore { lines, respond_to } => {
                    self.handle_restore(lines, respond_to);
                }
                StockRequest::SetOnHand {
                    sku,
                    quantity,
                    respond_to,
                } => {
                    self.ledger.set_on_hand(sku, quantity);
                    let _ = respond_to.send(Ok(()));
                }
                StockRequest::Snapshot { respond_to } => {
                    let _ = respond_to.send(Ok(self.ledger.records()));
                }
                StockRequest::Shutdown => {
                    info!("StockService shutting down");
                    break;
                }
            }
        }

        info!("StockService stopped");
    }

    #[instrument(fields(sku = %sku), skip(self, respond_to))]
    fn handle_on_hand(&self, sku: SkuId, respond_to: ServiceResponse<u32, StockError>) {
        let on_hand = self.ledger.on_hand(&sku);
        debug!(on_hand, "Stock checked");
        let _ = respond_to.send(Ok(on_hand));
    }

    #[instrument(fields(sku = %sku, quantity_in_cart), skip(self, respond_to))]
    fn handle_available(
        &self,
        sku: SkuId,
        quantity_in_cart: u32,
        respond_to: ServiceResponse<u32, StockError>,
    ) {
        let available = self.ledger.available_for_purchase(&sku, quantity_in_cart);
        debug!(available, "Availability checked");
        let _ = respond_to.send(Ok(available));
    }

    #[instrument(fields(line_count = lines.len()), skip(self, lines, respond_to))]
    fn handle_deduct(&mut self, lines: Vec<StockLine>, respond_to: ServiceResponse<(), StockError>) {
        self.ledger.deduct(&lines);
        info!("Stock deducted");
        let _ = respond_to.send(Ok(()));
    }

    /// Settlement-time re-check: either every line is covered and deducted,
    /// or nothing changes.
    #[instrument(fields(line_count = lines.len()), skip(self, lines, respond_to))]
    fn handle_try_deduct(
        &mut self,
        lines: Vec<StockLine>,
        respond_to: ServiceResponse<(), StockError>,
    ) {
        let result = self.ledger.try_deduct(&lines);
        match &result {
            Ok(()) => info!("Stock re-checked and deducted"),
            Err(e) => warn!(error = %e, "Stock re-check failed"),
        }
        let _ = respond_to.send(result);
    }

    #[instrument(fields(line_count = lines.len()), skip(self, lines, respond_to))]
    fn handle_restore(&mut self, lines: Vec<StockLine>, respond_to: ServiceResponse<(), StockError>) {
        self.ledger.restore(&lines);
        info!("Stock restored");
        let _ = respond_to.send(Ok(()));
    }
}

/// Starts a stock actor over `ledger` and returns its client with the task handle.
pub fn spawn_stock_service(
    buffer_size: usize,
    ledger: StockLedger,
) -> (StockClient, tokio::task::JoinHandle<()>) {
    let (service, client) = StockService::new(buffer_size, ledger);
    (client, tokio::spawn(service.run()))
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[tokio::test]
    async fn concurrent_checkouts_cannot_both_take_the_last_units() -> TestResult {
        let mut ledger = StockLedger::new(10);
        ledger.set_on_hand(SkuId::new("sku-1"), 3);
        let (client, handle) = spawn_stock_service(16, ledger);

        let first = client.clone();
        let second = client.clone();
        let (a, b) = tokio::join!(
            first.try_deduct(vec![StockLine::new("sku-1", 3)]),
            second.try_deduct(vec![StockLine::new("sku-1", 3)]),
        );

        assert!(a.is_ok() != b.is_ok(), "exactly one checkout should win");
        assert_eq!(client.on_hand(SkuId::new("sku-1")).await?, 0);

        client.shutdown().await?;
        handle.await?;
        Ok(())
    }

    #[tokio::test]
    async fn availability_and_snapshot_reflect_movements() -> TestResult {
        let (client, handle) = spawn_stock_service(16, StockLedger::new(10));

        client.deduct(vec![StockLine::new("sku-1", 4)]).await?;
        assert_eq!(client.available_for_purchase(SkuId::new("sku-1"), 2).await?, 4);

        client.restore(vec![StockLine::new("sku-1", 1)]).await?;
        client.set_on_hand(SkuId::new("sku-2"), 0).await?;

        let snapshot = client.snapshot().await?;
        assert_eq!(snapshot.get(&SkuId::new("sku-1")), Some(&7));
        assert_eq!(snapshot.get(&SkuId::new("sku-2")), Some(&0));

        client.shutdown().await?;
        handle.await?;
        Ok(())
    }

    #[tokio::test]
    async fn closed_actor_reports_communication_error() -> TestResult {
        let (client, handle) = spawn_stock_service(4, StockLedger::default());
        client.shutdown().await?;
        handle.await?;

        let result = client.on_hand(SkuId::new("sku-1")).await;

        assert!(matches!(result, Err(StockError::ActorCommunicationError(_))));
        Ok(())
    }
}
