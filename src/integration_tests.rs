#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use testresult::TestResult;

    use crate::actors::OrderService;
    use crate::app_system::ShopSystem;
    use crate::checkout::ShopperSession;
    use crate::config::EngineConfig;
    use crate::domain::{
        CartLine, CheckoutId, Credential, OrderCreate, OrderId, OrderStatus, PaymentProvider,
        Refund, SkuId, StockLine,
    };
    use crate::error::{CheckoutError, ErrorKind, OrderError, PaymentError, StockError};
    use crate::mock_framework::{create_mock_stock_client, expect_restore, expect_try_deduct};
    use crate::orders::OrderBook;
    use crate::payment::PaymentState;
    use crate::persistence::{MemorySnapshotStore, SnapshotStore};
    use crate::pricing::compute_bill;

    fn config() -> EngineConfig {
        EngineConfig {
            settlement_delay_ms: Some(0),
            ..EngineConfig::default()
        }
    }

    async fn signed_in(system: &ShopSystem) -> ShopperSession {
        let mut session = system.session();
        session.on_authenticated().await;
        session
    }

    async fn pay_with_pin(session: &mut ShopperSession) -> Result<crate::domain::Order, CheckoutError> {
        session
            .begin_checkout(PaymentProvider::GPAY, "12 Park Street")
            .await?;
        session
            .submit_credential(&Credential::Pin("1234".into()))
            .await?;
        session.settle().await
    }

    #[tokio::test]
    async fn settlement_places_order_deducts_stock_and_clears_cart() -> TestResult {
        // 1. Setup: three units on hand
        let system = ShopSystem::new(config());
        let sku = SkuId::new("sku-1");
        system.stock_client.set_on_hand(sku.clone(), 3).await?;
        let mut session = signed_in(&system).await;

        // 2. Fill the cart up to what is available
        session
            .add_item(CartLine::new(sku.clone(), Decimal::from(100), 3))
            .await?;
        assert_eq!(session.available_for_purchase(&sku).await?, 0);

        // 3. Pay
        let order = pay_with_pin(&mut session).await?;

        // 4. Verify
        assert_eq!(order.status(), OrderStatus::OrderPlaced);
        assert_eq!(order.bill().subtotal, Decimal::from(300));
        assert_eq!(order.bill().grand_total, Decimal::from(340));
        assert!(order
            .transaction_id()
            .is_some_and(|id| id.as_str().starts_with("GPAY")));
        assert_eq!(system.stock_client.on_hand(sku.clone()).await?, 0);
        assert!(session.cart().is_empty());
        assert!(matches!(
            session.payment_state(),
            Some(PaymentState::Succeeded { order_id, .. }) if *order_id == order.id()
        ));

        system.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    async fn cancelling_placed_order_restores_stock() -> TestResult {
        let system = ShopSystem::new(config());
        let sku = SkuId::new("sku-1");
        system.stock_client.set_on_hand(sku.clone(), 3).await?;
        let mut session = signed_in(&system).await;
        session
            .add_item(CartLine::new(sku.clone(), Decimal::from(100), 3))
            .await?;
        let order = pay_with_pin(&mut session).await?;

        let cancelled = session.cancel_order(order.id(), "Changed my mind").await?;

        assert_eq!(cancelled.status(), OrderStatus::Cancelled);
        assert_eq!(system.stock_client.on_hand(sku.clone()).await?, 3);
        let cancellation = cancelled.cancellation().expect("cancellation recorded");
        assert_eq!(cancellation.reason, "Changed my mind");
        assert!(matches!(
            &cancellation.refund,
            Refund::ToSource { amount, .. } if *amount == Decimal::from(340)
        ));
        assert_eq!(cancelled.items(), order.items());
        assert_eq!(cancelled.bill(), order.bill());

        system.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    async fn cancellation_outside_window_changes_nothing() -> TestResult {
        let system = ShopSystem::new(config());
        let sku = SkuId::new("sku-1");
        let mut session = signed_in(&system).await;
        session
            .add_item(CartLine::new(sku.clone(), Decimal::from(100), 2))
            .await?;
        let order = pay_with_pin(&mut session).await?;

        // Confirmed orders can no longer be cancelled
        system.order_client.advance(order.id()).await?;
        let late = session.cancel_order(order.id(), "too late").await;
        assert!(matches!(&late, Err(e) if e.kind() == ErrorKind::NotAllowed));
        assert_eq!(system.stock_client.on_hand(sku.clone()).await?, 8);

        // A second cancel of an already cancelled order is rejected too
        session
            .add_item(CartLine::new(sku.clone(), Decimal::from(100), 1))
            .await?;
        let other = pay_with_pin(&mut session).await?;
        session.cancel_order(other.id(), "first").await?;
        let again = session.cancel_order(other.id(), "second").await;
        assert!(matches!(
            again,
            Err(CheckoutError::Order(OrderError::CancellationNotAllowed {
                status: OrderStatus::Cancelled,
                ..
            }))
        ));
        assert_eq!(system.stock_client.on_hand(sku.clone()).await?, 8);

        system.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    async fn stock_taken_by_another_shopper_fails_settlement() -> TestResult {
        let system = ShopSystem::new(config());
        let sku = SkuId::new("sku-1");
        system.stock_client.set_on_hand(sku.clone(), 3).await?;

        let mut first = signed_in(&system).await;
        let mut second = signed_in(&system).await;
        first
            .add_item(CartLine::new(sku.clone(), Decimal::from(100), 3))
            .await?;
        second
            .add_item(CartLine::new(sku.clone(), Decimal::from(100), 2))
            .await?;

        // Both saw the stock while browsing; only the first settles
        pay_with_pin(&mut first).await?;
        let result = pay_with_pin(&mut second).await;

        let err = result.expect_err("second checkout must fail");
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert!(err.to_string().contains("no longer available"));
        assert!(matches!(second.payment_state(), Some(PaymentState::Failed { .. })));
        assert_eq!(second.cart().quantity_of(&sku), 2);
        assert_eq!(system.stock_client.on_hand(sku.clone()).await?, 0);
        assert_eq!(system.order_client.list_orders().await?.len(), 1);

        system.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    async fn repeated_settle_creates_one_order() -> TestResult {
        let system = ShopSystem::new(config());
        let mut session = signed_in(&system).await;
        session
            .add_item(CartLine::new("sku-1", Decimal::from(250), 1))
            .await?;
        pay_with_pin(&mut session).await?;

        let again = session.settle().await;

        assert!(matches!(
            again,
            Err(CheckoutError::Payment(PaymentError::AlreadySettled))
        ));
        assert_eq!(system.order_client.list_orders().await?.len(), 1);
        assert_eq!(system.stock_client.on_hand(SkuId::new("sku-1")).await?, 9);

        system.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_order_actor_keeps_settlement_for_retry() -> TestResult {
        let system = ShopSystem::new(config());
        let mut session = signed_in(&system).await;
        session
            .add_item(CartLine::new("sku-1", Decimal::from(250), 1))
            .await?;

        // The order actor goes away between payment and placement
        system.order_client.shutdown().await?;
        let result = pay_with_pin(&mut session).await;

        let err = result.expect_err("placement must fail");
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(session.payment_state(), Some(&PaymentState::Settling));
        assert_eq!(session.cart().items().len(), 1);
        assert_eq!(system.stock_client.on_hand(SkuId::new("sku-1")).await?, 10);

        let retry = session.retry_settlement().await;
        assert!(matches!(&retry, Err(e) if e.kind() == ErrorKind::Transient));
        assert_eq!(session.cart().items().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn retried_settlement_reuses_the_checkout() -> TestResult {
        // Placement succeeds on the actor side; the retry must not place twice.
        let system = ShopSystem::new(config());
        let lines = vec![CartLine::new("sku-1", Decimal::from(100), 2)];
        let create = OrderCreate {
            checkout_id: CheckoutId::generate(),
            bill: compute_bill(&lines),
            lines,
            payment_method: PaymentProvider::CARD.label.to_string(),
            prepaid: true,
            transaction_id: None,
            delivery_address: "12 Park Street".to_string(),
        };

        let first = system.order_client.place_order(create.clone()).await?;
        let retried = system.order_client.place_order(create).await?;

        assert_eq!(first, retried);
        assert_eq!(system.stock_client.on_hand(SkuId::new("sku-1")).await?, 8);
        system.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    async fn subscribers_see_every_status_change_in_order() -> TestResult {
        let system = ShopSystem::new(config());
        let mut events = system.order_client.subscribe().await?;
        let mut session = signed_in(&system).await;
        session
            .add_item(CartLine::new("sku-1", Decimal::from(90), 1))
            .await?;
        let order = pay_with_pin(&mut session).await?;

        for _ in 0..4 {
            system.order_client.advance(order.id()).await?;
        }

        let mut seen = Vec::new();
        for _ in 0..4 {
            let change = events.recv().await?;
            assert_eq!(change.order_id, order.id());
            assert_eq!(change.from.next(), Some(change.to));
            seen.push(change.to);
        }
        assert_eq!(
            seen,
            vec![
                OrderStatus::Confirmed,
                OrderStatus::Preparing,
                OrderStatus::OutForDelivery,
                OrderStatus::Delivered,
            ]
        );

        system.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    async fn orders_are_listed_most_recent_first() -> TestResult {
        let system = ShopSystem::new(config());
        let mut session = signed_in(&system).await;

        let mut placed = Vec::new();
        for price in [50, 60, 70] {
            session
                .add_item(CartLine::new("sku-1", Decimal::from(price), 1))
                .await?;
            placed.push(pay_with_pin(&mut session).await?.id());
        }

        let listed: Vec<OrderId> = session.orders().await?.iter().map(|o| o.id()).collect();
        placed.reverse();
        assert_eq!(listed, placed);

        system.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    async fn session_state_survives_a_restart() -> TestResult {
        let store = Arc::new(MemorySnapshotStore::new());
        let system = ShopSystem::new(config());
        let mut session = system.session().with_store(store.clone());
        session
            .add_item(CartLine::new("sku-2", Decimal::from(30), 2))
            .await?;
        session.on_authenticated().await;
        session
            .add_item(CartLine::new("sku-1", Decimal::from(100), 1))
            .await?;
        let order = pay_with_pin(&mut session).await?;
        session
            .add_item(CartLine::new("sku-3", Decimal::from(15), 4))
            .await?;
        system.shutdown().await?;

        let snapshot = store.load().await?.expect("snapshot saved");
        let restarted = ShopSystem::start_from(config(), Some(&snapshot));
        let mut restored = restarted.session();
        restored.restore_cart(snapshot.cart.clone(), snapshot.pending_cart.clone());

        assert_eq!(restored.cart().quantity_of(&SkuId::new("sku-3")), 4);
        assert_eq!(restored.order(order.id()).await?, Some(order));
        assert_eq!(
            restarted.stock_client.on_hand(SkuId::new("sku-1")).await?,
            9
        );
        restarted.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    async fn failed_insert_gives_stock_back() -> TestResult {
        // 1. Setup: order actor over a scripted stock actor, with an id that
        //    is already taken
        let (stock_client, mut stock_rx) = create_mock_stock_client(10);
        let taken = OrderId::generate();
        let lines = vec![CartLine::new("sku-1", Decimal::from(100), 2)];
        let existing = OrderCreate {
            checkout_id: CheckoutId::generate(),
            bill: compute_bill(&lines),
            lines: lines.clone(),
            payment_method: PaymentProvider::GPAY.label.to_string(),
            prepaid: true,
            transaction_id: None,
            delivery_address: "12 Park Street".to_string(),
        };
        let mut book = OrderBook::new();
        book.create(taken, existing.clone())?;
        let (service, order_client) = OrderService::new(10, book, stock_client, move || taken);
        tokio::spawn(service.run());

        // 2. Place a new checkout in the background
        let fresh = OrderCreate {
            checkout_id: CheckoutId::generate(),
            ..existing
        };
        let place_task = tokio::spawn(async move { order_client.place_order(fresh).await });

        // 3. Stock re-check succeeds
        let (deducted, responder) = expect_try_deduct(&mut stock_rx)
            .await
            .expect("Expected TryDeduct");
        assert_eq!(deducted, vec![StockLine::new("sku-1", 2)]);
        responder.send(Ok(())).expect("order actor waiting");

        // 4. Insert fails, so the same lines are restored
        let (restored, responder) = expect_restore(&mut stock_rx)
            .await
            .expect("Expected Restore");
        assert_eq!(restored, deducted);
        responder.send(Ok(())).expect("order actor waiting");

        // 5. Verify result
        let result = place_task.await?;
        assert_eq!(result, Err(OrderError::DuplicateOrder(taken)));
        Ok(())
    }

    #[tokio::test]
    async fn rejected_recheck_never_restores() -> TestResult {
        let (stock_client, mut stock_rx) = create_mock_stock_client(10);
        let (service, order_client) =
            OrderService::new(10, OrderBook::new(), stock_client, OrderId::generate);
        tokio::spawn(service.run());

        let lines = vec![CartLine::new("sku-1", Decimal::from(100), 2)];
        let create = OrderCreate {
            checkout_id: CheckoutId::generate(),
            bill: compute_bill(&lines),
            lines,
            payment_method: PaymentProvider::CASH_ON_DELIVERY.label.to_string(),
            prepaid: false,
            transaction_id: None,
            delivery_address: "12 Park Street".to_string(),
        };
        let client = order_client.clone();
        let place_task = tokio::spawn(async move { client.place_order(create).await });

        let (_, responder) = expect_try_deduct(&mut stock_rx)
            .await
            .expect("Expected TryDeduct");
        responder
            .send(Err(StockError::Unavailable {
                sku: SkuId::new("sku-1"),
                requested: 2,
                available: 1,
            }))
            .expect("order actor waiting");

        let result = place_task.await?;
        assert!(matches!(&result, Err(e) if e.kind() == ErrorKind::Unavailable));
        assert!(order_client.list_orders().await?.is_empty());
        assert!(stock_rx.try_recv().is_err());
        Ok(())
    }
}
