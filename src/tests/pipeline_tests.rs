//! Fetch, extract and project against an in-memory ledger and database.

#[cfg(test)]
mod tests {
    use crate::blockchain::processor::ProcessOutcome;
    use crate::db::{error_log, kline, mint, trade};
    use crate::decoder::TradeDirection;
    use crate::models::KlineInterval;
    use crate::projector::TradeSource;
    use crate::tests::fixtures::{self, FakeRpc, BASE_MINT, CREATOR, POOL_STATE, USER};
    use std::sync::Arc;

    async fn trade_count(pool: &sqlx::SqlitePool) -> i64 {
        trade::count_trades(pool, BASE_MINT).await.expect("count trades")
    }

    #[tokio::test]
    async fn test_fixture_transaction_projects_mint_trade_and_klines() {
        let pool = fixtures::db().await;
        let rpc = Arc::new(FakeRpc::default());
        rpc.push(fixtures::create_and_buy_transaction("create-sig", 300));
        let processor = fixtures::processor(rpc, &pool);

        let outcome = processor
            .process("create-sig", TradeSource::Backfill)
            .await
            .expect("process");
        assert_eq!(outcome, ProcessOutcome::Projected { events: 2 });

        let projection = mint::get_mint(&pool, BASE_MINT)
            .await
            .expect("query")
            .expect("mint row");
        assert_eq!(projection.pool_state, POOL_STATE);
        assert_eq!(projection.creator.as_deref(), Some(CREATOR));
        assert_eq!(projection.name.as_deref(), Some("Cat wif Boba"));
        assert_eq!(projection.symbol.as_deref(), Some("CatBoba"));
        assert_eq!(projection.decimals, Some(6));
        assert_eq!(projection.supply.as_deref(), Some("1000000000000000"));
        assert_eq!(projection.created_signature.as_deref(), Some("create-sig"));
        assert_eq!(projection.real_base, "35000000000");
        assert_eq!(projection.real_quote, "1000000000");
        assert_eq!(projection.pool_status, "Fund");
        assert_eq!(projection.last_trade_slot, Some(300));
        assert!(!projection.is_placeholder());

        let stored = trade::get_trade(&pool, "create-sig")
            .await
            .expect("query")
            .expect("trade row");
        assert_eq!(stored.user, CREATOR);
        assert_eq!(stored.trade_direction, "buy");
        assert_eq!(projection.last_trade_id, Some(stored.id));

        let block_time = fixtures::GENESIS_TIME + 300;
        for interval in KlineInterval::ALL {
            let start = interval.bucket_start(block_time);
            let candles = kline::get_klines(&pool, BASE_MINT, interval, start, start + 1)
                .await
                .expect("klines");
            assert_eq!(candles.len(), 1, "one {} candle", interval.as_str());
            assert_eq!(candles[0].trade_count, 1);
            assert_eq!(candles[0].base_volume, "35000000000");
        }
    }

    #[tokio::test]
    async fn test_replayed_signature_is_idempotent() {
        let pool = fixtures::db().await;
        let rpc = Arc::new(FakeRpc::default());
        rpc.push(fixtures::create_and_buy_transaction("create-sig", 300));
        let processor = fixtures::processor(rpc, &pool);

        processor.process("create-sig", TradeSource::Realtime).await.expect("first");
        processor.process("create-sig", TradeSource::Backfill).await.expect("replay");

        assert_eq!(mint::count_mints(&pool).await.expect("count"), 1);
        assert_eq!(trade_count(&pool).await, 1);

        let start = KlineInterval::OneMinute.bucket_start(fixtures::GENESIS_TIME + 300);
        let candles = kline::get_klines(&pool, BASE_MINT, KlineInterval::OneMinute, start, start + 60)
            .await
            .expect("klines");
        assert_eq!(candles[0].trade_count, 1);
    }

    #[tokio::test]
    async fn test_failed_transaction_leaves_tables_unchanged() {
        let pool = fixtures::db().await;
        let rpc = Arc::new(FakeRpc::default());
        let mut tx = fixtures::create_and_buy_transaction("failed-sig", 12);
        tx.success = false;
        rpc.push(tx);
        let processor = fixtures::processor(rpc, &pool);

        let outcome = processor
            .process("failed-sig", TradeSource::Backfill)
            .await
            .expect("process");

        assert_eq!(outcome, ProcessOutcome::Projected { events: 0 });
        assert_eq!(mint::count_mints(&pool).await.expect("count"), 0);
        assert_eq!(trade_count(&pool).await, 0);
        assert!(error_log::recent_errors(&pool, 10).await.expect("errors").is_empty());
    }

    #[tokio::test]
    async fn test_trade_before_creation_leaves_placeholder_that_creation_completes() {
        let pool = fixtures::db().await;
        let rpc = Arc::new(FakeRpc::default());
        rpc.push(fixtures::create_and_buy_transaction("create-sig", 10));
        rpc.push(fixtures::trade_transaction("sell-sig", 20, TradeDirection::Sell));
        let processor = fixtures::processor(rpc, &pool);

        // The live feed sees the later sell first.
        processor.process("sell-sig", TradeSource::Realtime).await.expect("sell");
        let placeholder = mint::get_mint(&pool, BASE_MINT)
            .await
            .expect("query")
            .expect("placeholder");
        assert!(placeholder.is_placeholder());
        assert!(placeholder.name.is_none());
        assert_eq!(placeholder.real_base, "25000000000");
        assert_eq!(placeholder.last_trade_slot, Some(20));

        processor.process("create-sig", TradeSource::Backfill).await.expect("create");
        let completed = mint::get_mint(&pool, BASE_MINT)
            .await
            .expect("query")
            .expect("mint");
        assert!(!completed.is_placeholder());
        assert_eq!(completed.name.as_deref(), Some("Cat wif Boba"));
        assert_eq!(completed.created_slot, Some(10));
        // The older buy does not move the pointer off the sell.
        assert_eq!(completed.last_trade_slot, Some(20));
        assert_eq!(mint::count_mints(&pool).await.expect("count"), 1);
        assert_eq!(trade_count(&pool).await, 2);
    }

    #[tokio::test]
    async fn test_same_slot_trade_moves_pointer_only_for_realtime() {
        let pool = fixtures::db().await;
        let rpc = Arc::new(FakeRpc::default());
        rpc.push(fixtures::create_and_buy_transaction("create-sig", 50));
        rpc.push(fixtures::trade_transaction("live-1", 100, TradeDirection::Buy));
        rpc.push(fixtures::trade_transaction("replayed", 100, TradeDirection::Sell));
        rpc.push(fixtures::trade_transaction("live-2", 100, TradeDirection::Sell));
        let processor = fixtures::processor(rpc, &pool);

        processor.process("create-sig", TradeSource::Backfill).await.expect("create");
        processor.process("live-1", TradeSource::Realtime).await.expect("live-1");
        let first = trade::get_trade(&pool, "live-1").await.expect("query").expect("row");

        processor.process("replayed", TradeSource::Backfill).await.expect("replayed");
        let after_backfill = mint::get_mint(&pool, BASE_MINT).await.expect("query").expect("mint");
        assert_eq!(after_backfill.last_trade_id, Some(first.id));

        processor.process("live-2", TradeSource::Realtime).await.expect("live-2");
        let second = trade::get_trade(&pool, "live-2").await.expect("query").expect("row");
        let after_realtime = mint::get_mint(&pool, BASE_MINT).await.expect("query").expect("mint");
        assert_eq!(after_realtime.last_trade_id, Some(second.id));
        assert_eq!(second.user, USER);
    }

    #[tokio::test]
    async fn test_missing_transaction_is_recorded_after_retries() {
        let pool = fixtures::db().await;
        let rpc = Arc::new(FakeRpc::default());
        rpc.push_signature("ghost");
        let processor = fixtures::processor(rpc.clone(), &pool);

        let outcome = processor
            .process("ghost", TradeSource::Realtime)
            .await
            .expect("process");

        assert!(matches!(outcome, ProcessOutcome::Recorded { .. }));
        assert_eq!(rpc.fetch_calls("ghost"), 3);

        let errors = error_log::errors_for_signature(&pool, "ghost").await.expect("errors");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].error.contains("ghost"));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let pool = fixtures::db().await;
        let rpc = Arc::new(FakeRpc::default());
        rpc.push(fixtures::trade_transaction("flaky", 7, TradeDirection::Buy));
        rpc.fail_times("flaky", 2);
        let processor = fixtures::processor(rpc.clone(), &pool);

        let outcome = processor
            .process("flaky", TradeSource::Backfill)
            .await
            .expect("process");

        assert_eq!(outcome, ProcessOutcome::Projected { events: 1 });
        assert_eq!(rpc.fetch_calls("flaky"), 3);
        assert!(error_log::errors_for_signature(&pool, "flaky").await.expect("errors").is_empty());
    }
}
