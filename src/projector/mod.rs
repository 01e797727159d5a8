//! Applies extracted events to the mint, trade and kline tables.
//!
//! All events of one transaction are written in a single database
//! transaction, so a signature is either fully projected or not at all.
//! Replaying a signature is harmless: trades are keyed by signature and pool
//! creations never overwrite a completed mint.

pub mod kline;

use crate::blockchain::extractor::ExtractedEvent;
use crate::db::kline as kline_store;
use crate::db::mint::{self, MintWrite, NewMint, PoolState};
use crate::db::trade::{self, NewTrade};
use crate::decoder::accounts;
use crate::decoder::{PoolCreateEvent, ProgramEvent, TradeEvent};
use crate::error::{IndexerError, IndexerResult};
use crate::models::KlineInterval;
use kline::TradeTick;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

/// Who is applying the events. Only affects the last-trade pointer guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSource {
    Backfill,
    Realtime,
}

#[derive(Clone)]
pub struct Projector {
    db_pool: SqlitePool,
}

impl Projector {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    pub async fn apply(&self, events: &[ExtractedEvent], source: TradeSource) -> IndexerResult<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut tx = self.db_pool.begin().await?;
        for event in events {
            match &event.event {
                ProgramEvent::PoolCreate(created) => {
                    import_pool_created(&mut *tx, event, created).await?
                }
                ProgramEvent::Trade(traded) => {
                    import_trade(&mut *tx, event, traded, source).await?
                }
            }
        }
        tx.commit().await?;

        Ok(())
    }
}

fn required_account<'a>(event: &'a ExtractedEvent, index: usize, name: &str) -> IndexerResult<&'a str> {
    event.account(index).ok_or_else(|| {
        IndexerError::Projection(format!(
            "{} in {}: missing {} account at index {}",
            event.event_type(),
            event.signature,
            name,
            index
        ))
    })
}

async fn import_pool_created(
    conn: &mut SqliteConnection,
    event: &ExtractedEvent,
    created: &PoolCreateEvent,
) -> IndexerResult<()> {
    let mint_address = required_account(event, accounts::initialize::BASE_MINT, "base mint")?;

    let new_mint = NewMint {
        mint: mint_address.to_string(),
        pool_state: created.pool_state.to_string(),
        platform_config: event
            .account(accounts::initialize::PLATFORM_CONFIG)
            .map(str::to_string),
        creator: created.creator.to_string(),
        global_config: created.config.to_string(),
        name: created.base_mint_param.name.clone(),
        symbol: created.base_mint_param.symbol.clone(),
        uri: created.base_mint_param.uri.clone(),
        decimals: created.base_mint_param.decimals,
        supply: created.curve_param.supply(),
        total_base_sell: created.curve_param.total_base_sell(),
        total_quote_fund_raising: created.curve_param.total_quote_fund_raising(),
        migrate_type: created.curve_param.migrate_type(),
        total_locked_amount: created.vesting_param.total_locked_amount,
        cliff_period: created.vesting_param.cliff_period,
        unlock_period: created.vesting_param.unlock_period,
        signature: event.signature.clone(),
        block_time: event.block_time,
        slot: event.slot,
    };

    match mint::insert_created(conn, &new_mint).await? {
        MintWrite::Inserted => info!("New mint {} ({})", new_mint.mint, new_mint.symbol),
        MintWrite::CompletedPlaceholder => {
            info!("Completed placeholder mint {} from {}", new_mint.mint, event.signature)
        }
        MintWrite::AlreadyExists => debug!("Mint {} already indexed", new_mint.mint),
    }

    Ok(())
}

async fn import_trade(
    conn: &mut SqliteConnection,
    event: &ExtractedEvent,
    traded: &TradeEvent,
    source: TradeSource,
) -> IndexerResult<()> {
    let mint_address = required_account(event, accounts::trade::BASE_TOKEN_MINT, "base token mint")?;
    let platform_config = required_account(event, accounts::trade::PLATFORM_CONFIG, "platform config")?;
    let user = required_account(event, accounts::trade::PAYER, "payer")?;
    let pool_state = traded.pool_state.to_string();

    let new_trade = NewTrade {
        signature: event.signature.clone(),
        mint: mint_address.to_string(),
        pool_state: pool_state.clone(),
        platform_config: platform_config.to_string(),
        user: user.to_string(),
        total_base_sell: traded.total_base_sell,
        virtual_base: traded.virtual_base,
        virtual_quote: traded.virtual_quote,
        real_base_before: traded.real_base_before,
        real_quote_before: traded.real_quote_before,
        real_base_after: traded.real_base_after,
        real_quote_after: traded.real_quote_after,
        amount_in: traded.amount_in,
        amount_out: traded.amount_out,
        protocol_fee: traded.protocol_fee,
        platform_fee: traded.platform_fee,
        share_fee: traded.share_fee,
        trade_direction: traded.trade_direction.as_str().to_string(),
        pool_status: traded.pool_status.as_str().to_string(),
        slot: event.slot,
        block_time: event.block_time,
    };
    let (trade_id, inserted) = trade::insert_trade(conn, &new_trade).await?;
    if !inserted {
        debug!("Trade {} already stored as #{}", event.signature, trade_id);
    }

    let state = PoolState {
        virtual_base: traded.virtual_base,
        virtual_quote: traded.virtual_quote,
        real_base: traded.real_base_after,
        real_quote: traded.real_quote_after,
        pool_status: traded.pool_status.as_str().to_string(),
        signature: event.signature.clone(),
        block_time: event.block_time,
    };

    match mint::find_by_pool_state(conn, &pool_state).await? {
        Some(existing) => {
            mint::apply_pool_state(conn, &existing.mint, &state).await?;
            let advanced =
                mint::advance_last_trade(conn, &existing.mint, event.slot, trade_id, source).await?;
            if !advanced {
                debug!(
                    "Last trade of {} is newer than slot {}, pointer kept",
                    existing.mint, event.slot
                );
            }
        }
        None => {
            mint::insert_placeholder(
                conn,
                mint_address,
                &pool_state,
                platform_config,
                &state,
                event.slot,
                trade_id,
            )
            .await?;
            info!("Placeholder mint {} for pool {}", mint_address, pool_state);
        }
    }

    // Only fold a trade into klines the first time it is stored.
    if inserted {
        if let Some(tick) = TradeTick::from_trade(traded, event.block_time) {
            for interval in KlineInterval::ALL {
                let start = interval.bucket_start(tick.block_time);
                let existing = kline_store::get_kline(conn, mint_address, interval, start).await?;
                let updated = kline::fold(existing, mint_address, interval, &tick)?;
                kline_store::upsert_kline(conn, &updated).await?;
            }
        }
    }

    Ok(())
}
