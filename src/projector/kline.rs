// Folding trades into OHLC buckets. Trades may arrive in any order (backfill
// walks history backwards) so open and close follow block time, not arrival.

use crate::decoder::TradeEvent;
use crate::error::{IndexerError, IndexerResult};
use crate::models::{Kline, KlineInterval};

/// Price and volume of one trade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeTick {
    pub block_time: i64,
    pub price: f64,
    pub base_amount: u64,
    pub quote_amount: u64,
}

impl TradeTick {
    /// `None` for trades that moved no base tokens, which have no price.
    pub fn from_trade(event: &TradeEvent, block_time: i64) -> Option<Self> {
        let (base_amount, quote_amount) = event.base_and_quote_amounts();
        if base_amount == 0 {
            return None;
        }

        Some(Self {
            block_time,
            price: quote_amount as f64 / base_amount as f64,
            base_amount,
            quote_amount,
        })
    }
}

/// Fails when the stored volumes are not decimal integers, rather than
/// restarting them from zero.
pub fn fold(
    existing: Option<Kline>,
    mint: &str,
    interval: KlineInterval,
    tick: &TradeTick,
) -> IndexerResult<Kline> {
    let Some(mut kline) = existing else {
        return Ok(Kline {
            mint: mint.to_string(),
            interval: interval.as_str().to_string(),
            interval_start: interval.bucket_start(tick.block_time),
            open: tick.price,
            high: tick.price,
            low: tick.price,
            close: tick.price,
            open_time: tick.block_time,
            close_time: tick.block_time,
            base_volume: tick.base_amount.to_string(),
            quote_volume: tick.quote_amount.to_string(),
            trade_count: 1,
        });
    };

    kline.high = kline.high.max(tick.price);
    kline.low = kline.low.min(tick.price);
    if tick.block_time < kline.open_time {
        kline.open = tick.price;
        kline.open_time = tick.block_time;
    }
    if tick.block_time >= kline.close_time {
        kline.close = tick.price;
        kline.close_time = tick.block_time;
    }
    kline.base_volume = add_volume(&kline, &kline.base_volume, tick.base_amount)?;
    kline.quote_volume = add_volume(&kline, &kline.quote_volume, tick.quote_amount)?;
    kline.trade_count += 1;
    Ok(kline)
}

fn add_volume(kline: &Kline, current: &str, amount: u64) -> IndexerResult<String> {
    let current: u128 = current.parse().map_err(|_| {
        IndexerError::Projection(format!(
            "{} kline of {} at {}: unreadable volume {:?}",
            kline.interval, kline.mint, kline.interval_start, current
        ))
    })?;
    Ok(current.saturating_add(amount as u128).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(block_time: i64, price: f64) -> TradeTick {
        TradeTick {
            block_time,
            price,
            base_amount: 100,
            quote_amount: 50,
        }
    }

    #[test]
    fn first_trade_opens_the_bucket() {
        let kline = fold(None, "mint", KlineInterval::OneMinute, &tick(125, 0.5)).expect("fold");
        assert_eq!(kline.interval_start, 120);
        assert_eq!(kline.interval, "1m");
        assert_eq!((kline.open, kline.high, kline.low, kline.close), (0.5, 0.5, 0.5, 0.5));
        assert_eq!(kline.trade_count, 1);
        assert_eq!(kline.base_volume, "100");
    }

    #[test]
    fn out_of_order_trades_keep_open_and_close_by_time() {
        let interval = KlineInterval::OneMinute;
        let mut kline = None;
        for (time, price) in [(150, 2.0), (130, 1.0), (170, 3.0), (140, 0.5)] {
            kline = Some(fold(kline, "mint", interval, &tick(time, price)).expect("fold"));
        }
        let kline = kline.expect("kline");

        assert_eq!(kline.open, 1.0);
        assert_eq!(kline.open_time, 130);
        assert_eq!(kline.close, 3.0);
        assert_eq!(kline.close_time, 170);
        assert_eq!(kline.high, 3.0);
        assert_eq!(kline.low, 0.5);
        assert_eq!(kline.trade_count, 4);
        assert_eq!(kline.base_volume, "400");
        assert_eq!(kline.quote_volume, "200");
    }

    #[test]
    fn volume_sums_past_u64() {
        let mut kline = fold(None, "mint", KlineInterval::OneMinute, &tick(125, 0.5)).expect("fold");
        kline.base_volume = u64::MAX.to_string();
        let kline = fold(Some(kline), "mint", KlineInterval::OneMinute, &tick(126, 0.5)).expect("fold");
        assert_eq!(kline.base_volume, "18446744073709551715");
    }

    #[test]
    fn unreadable_stored_volume_is_an_error() {
        let mut kline = fold(None, "mint", KlineInterval::OneMinute, &tick(125, 0.5)).expect("fold");
        kline.quote_volume = "12.5".to_string();

        let err = fold(Some(kline), "mint", KlineInterval::OneMinute, &tick(126, 0.5)).unwrap_err();
        assert!(matches!(err, IndexerError::Projection(_)));
    }
}
