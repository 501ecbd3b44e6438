//! # Mock Framework
//!
//! Utilities for testing the order actor against a scripted stock actor.
//!
//! Use [`create_mock_stock_client`] to get a client and a receiver, then
//! helpers like [`expect_try_deduct`] or [`expect_restore`] to assert what the
//! order actor asked for and decide what it gets back.

use tokio::sync::mpsc;

use crate::clients::StockClient;
use crate::domain::StockLine;
use crate::error::StockError;
use crate::messages::{ServiceResponse, StockRequest};

/// Creates a mock stock client and the receiver its requests arrive on.
pub fn create_mock_stock_client(buffer_size: usize) -> (StockClient, mpsc::Receiver<StockRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (StockClient::new(sender), receiver)
}

/// Helper to verify that the next message is a TryDeduct request
pub async fn expect_try_deduct(
    receiver: &mut mpsc::Receiver<StockRequest>,
) -> Option<(Vec<StockLine>, ServiceResponse<(), StockError>)> {
    match receiver.recv().await {
        Some(StockRequest::TryDeduct { lines, respond_to }) => Some((lines, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Restore request
pub async fn expect_restore(
    receiver: &mut mpsc::Receiver<StockRequest>,
) -> Option<(Vec<StockLine>, ServiceResponse<(), StockError>)> {
    match receiver.recv().await {
        Some(StockRequest::Restore { lines, respond_to }) => Some((lines, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SkuId;

    #[tokio::test]
    async fn test_mock_stock_client() {
        let (client, mut receiver) = create_mock_stock_client(10);

        let deduct_task = tokio::spawn(async move {
            client.try_deduct(vec![StockLine::new("sku-1", 2)]).await
        });

        let (lines, responder) = expect_try_deduct(&mut receiver).await.expect("Expected TryDeduct request");
        assert_eq!(lines, vec![StockLine::new("sku-1", 2)]);
        responder
            .send(Err(StockError::Unavailable {
                sku: SkuId::new("sku-1"),
                requested: 2,
                available: 0,
            }))
            .unwrap();

        let result = deduct_task.await.unwrap();
        assert!(matches!(result, Err(StockError::Unavailable { available: 0, .. })));
    }
}
