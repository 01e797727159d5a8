//! The query API served on a local port and exercised over HTTP.

#[cfg(test)]
mod tests {
    use crate::{
        api,
        cache,
        config::Config,
        db::sync_range,
        decoder::TradeDirection,
        projector::TradeSource,
        state::AppState,
        tests::fixtures::{self, FakeRpc, BASE_MINT},
    };
    use reqwest::StatusCode;
    use serde_json::Value;
    use sqlx::SqlitePool;
    use std::sync::Arc;

    const UNKNOWN_MINT: &str = "424CJUQd2RQWNgygWbNpRmQStZ77Mea2f29CATe8M2hS";

    /// Index a pool creation plus one sell, then serve the API on an
    /// ephemeral port. Returns the base URL.
    async fn setup() -> (String, SqlitePool) {
        let db_pool = fixtures::db().await;
        let rpc = Arc::new(FakeRpc::default());
        rpc.push(fixtures::create_and_buy_transaction("create-sig", 100));
        rpc.push(fixtures::trade_transaction("sell-sig", 160, TradeDirection::Sell));
        let processor = fixtures::processor(rpc, &db_pool);
        for signature in ["create-sig", "sell-sig"] {
            processor
                .process(signature, TradeSource::Backfill)
                .await
                .expect("process");
        }

        let config = Config::from_lookup(|_| None).expect("default config");
        let app_state = Arc::new(AppState {
            cache: cache::init_cache(&config),
            config,
            db_pool: db_pool.clone(),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, api::create_router(app_state))
                .await
                .expect("serve");
        });

        (format!("http://{}", addr), db_pool)
    }

    #[tokio::test]
    async fn test_get_mint() {
        let (base_url, _db) = setup().await;
        let client = reqwest::Client::new();

        let resp = client
            .get(format!("{}/mints/{}", base_url, BASE_MINT))
            .send()
            .await
            .expect("request");
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.expect("json");
        assert_eq!(body["data"]["name"], "Cat wif Boba");
        assert_eq!(body["data"]["decimals"], 6);
        assert_eq!(body["data"]["last_trade_slot"], 160);

        let resp = client
            .get(format!("{}/mints/{}", base_url, UNKNOWN_MINT))
            .send()
            .await
            .expect("request");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = client
            .get(format!("{}/mints/not-a-mint", base_url))
            .send()
            .await
            .expect("request");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_trades_is_paged_with_total_count() {
        let (base_url, _db) = setup().await;
        let client = reqwest::Client::new();

        let resp = client
            .get(format!("{}/mints/{}/trades?offset=1&limit=1", base_url, BASE_MINT))
            .send()
            .await
            .expect("request");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get("x-total-count")
                .and_then(|v| v.to_str().ok()),
            Some("2")
        );
        let body: Value = resp.json().await.expect("json");
        let trades = body["data"].as_array().expect("array");
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0]["signature"], "sell-sig");

        let resp = client
            .get(format!("{}/mints/{}/trades?limit=0", base_url, BASE_MINT))
            .send()
            .await
            .expect("request");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_klines() {
        let (base_url, _db) = setup().await;
        let client = reqwest::Client::new();
        let start = fixtures::GENESIS_TIME - 86_400;
        let end = fixtures::GENESIS_TIME + 3_600;

        let resp = client
            .get(format!(
                "{}/mints/{}/klines?interval=12h&start_time={}&end_time={}",
                base_url, BASE_MINT, start, end
            ))
            .send()
            .await
            .expect("request");
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.expect("json");
        let candles = body["data"].as_array().expect("array");
        let trades: i64 = candles
            .iter()
            .map(|c| c["trade_count"].as_i64().expect("count"))
            .sum();
        assert_eq!(trades, 2);

        let resp = client
            .get(format!(
                "{}/mints/{}/klines?interval=3m&start_time={}&end_time={}",
                base_url, BASE_MINT, start, end
            ))
            .send()
            .await
            .expect("request");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = client
            .get(format!(
                "{}/mints/{}/klines?interval=1m&start_time={}&end_time={}",
                base_url, BASE_MINT, end, start
            ))
            .send()
            .await
            .expect("request");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_sync_ranges() {
        let (base_url, db) = setup().await;
        let client = reqwest::Client::new();
        sync_range::create_range(&db, "anchor", "tip", None)
            .await
            .expect("create");
        sync_range::create_live_range(&db, "tip").await.expect("live");

        let resp = client
            .get(format!("{}/sync/ranges?status=pending", base_url))
            .send()
            .await
            .expect("request");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get("x-total-count")
                .and_then(|v| v.to_str().ok()),
            Some("1")
        );
        let body: Value = resp.json().await.expect("json");
        assert_eq!(body["data"][0]["start_tx"], "anchor");
        assert_eq!(body["data"][0]["status"], "pending");

        let resp = client
            .get(format!("{}/sync/ranges?status=stalled", base_url))
            .send()
            .await
            .expect("request");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
