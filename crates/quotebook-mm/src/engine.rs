//! Single-threaded market maker.
//!
//! Owns one of each component and drives them in a fixed order:
//!
//! - `quote`: validate → observe price → estimate volatility → price
//! - `execute`: validate → apply to ledger → update fill streak → record

use std::collections::HashMap;

use quotebook_core::{InstrumentKey, InstrumentStats, PositionSnapshot, Quote, Side, TradeRecord};
use tracing::debug;

use crate::book::{price_request, trade_record, validate_fill, FillStreak, QuoteRequest};
use crate::config::MakerConfig;
use crate::error::MakerResult;
use crate::inventory::PositionLedger;
use crate::recorder::TradeRecorder;
use crate::volatility::VolatilityEstimator;

/// Quoting and position-tracking engine for a single caller.
///
/// Instruments are created on first use and never removed.
#[derive(Debug)]
pub struct MarketMaker {
    config: MakerConfig,
    volatility: VolatilityEstimator,
    ledger: PositionLedger,
    recorder: TradeRecorder,
    streaks: HashMap<InstrumentKey, FillStreak>,
    next_quote_id: u64,
}

impl MarketMaker {
    /// Create an engine after validating `config`.
    pub fn new(config: MakerConfig) -> MakerResult<Self> {
        config.validate()?;
        Ok(Self {
            volatility: VolatilityEstimator::from_config(&config),
            ledger: PositionLedger::new(),
            recorder: TradeRecorder::new(),
            streaks: HashMap::new(),
            next_quote_id: 0,
            config,
        })
    }

    pub fn config(&self) -> &MakerConfig {
        &self.config
    }

    /// Quote `size` around `reference_price`.
    ///
    /// Fails on an empty instrument, a non-finite or non-positive price, or a
    /// non-positive size; nothing is mutated in that case.
    pub fn quote(&mut self, instrument: &str, reference_price: f64, size: f64) -> MakerResult<Quote> {
        let request = QuoteRequest::new(instrument, reference_price, size)?;

        self.volatility
            .observe(&request.instrument, request.reference_price)?;
        let volatility = self.volatility.estimate(instrument);
        let net_quantity = self.ledger.net_quantity(instrument);

        let quote_id = self.next_quote_id;
        self.next_quote_id += 1;

        Ok(price_request(
            quote_id,
            request,
            net_quantity,
            volatility,
            self.streaks.get(instrument),
            &self.config,
        ))
    }

    /// Execute the full quoted size: buys at the bid, sells at the offer.
    pub fn execute(&mut self, quote: &Quote, is_buy: bool) -> MakerResult<TradeRecord> {
        self.execute_partial(quote, Side::from_is_buy(is_buy), quote.size())
    }

    /// Execute `size` (at most the quoted size) on `side` of `quote`.
    pub fn execute_partial(
        &mut self,
        quote: &Quote,
        side: Side,
        size: f64,
    ) -> MakerResult<TradeRecord> {
        let fill = validate_fill(quote, side, size)?;
        let instrument = quote.instrument();

        let realized_before = self.ledger.snapshot(instrument.as_str()).realized_pnl;
        let after = self
            .ledger
            .apply_trade(instrument, fill.price, fill.size, fill.side)?;

        self.streaks
            .entry(instrument.clone())
            .or_default()
            .record_fill(fill.side);

        let record = self.recorder.record(trade_record(
            quote,
            fill,
            after,
            after.realized_pnl - realized_before,
        ));

        debug!(
            instrument = %record.instrument,
            sequence = record.sequence,
            side = %record.side,
            price = record.price,
            size = record.size,
            position = record.resulting_position,
            "Trade executed"
        );
        Ok(record.clone())
    }

    /// Net position; 0 for unseen instruments.
    pub fn position(&self, instrument: &str) -> f64 {
        self.ledger.net_quantity(instrument)
    }

    /// Average entry price; `None` when flat or unseen.
    pub fn average_price(&self, instrument: &str) -> Option<f64> {
        self.ledger.average_price(instrument)
    }

    pub fn position_snapshot(&self, instrument: &str) -> PositionSnapshot {
        self.ledger.snapshot(instrument)
    }

    /// Current volatility estimate (the prior for unseen instruments).
    pub fn volatility(&self, instrument: &str) -> f64 {
        self.volatility.estimate(instrument)
    }

    pub fn stats(&self, instrument: &str) -> InstrumentStats {
        self.recorder
            .stats(instrument, self.ledger.snapshot(instrument))
    }

    /// Full trade ledger in execution order.
    pub fn trade_history(&self) -> &[TradeRecord] {
        self.recorder.history()
    }

    /// Instruments that have been quoted or traded.
    pub fn instruments(&self) -> Vec<&InstrumentKey> {
        // A fill against a caller-built quote reaches the ledger without a price observation
        let mut keys: Vec<&InstrumentKey> = self
            .volatility
            .instruments()
            .chain(self.ledger.iter().map(|(key, _)| key))
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn total_realized_pnl(&self) -> f64 {
        self.ledger.total_realized_pnl()
    }

    pub fn unrealized_pnl(&self, instrument: &str, mark_price: f64) -> f64 {
        self.ledger.unrealized_pnl(instrument, mark_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MakerError;

    fn engine() -> MarketMaker {
        MarketMaker::new(MakerConfig::default()).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = MakerConfig {
            volatility_window: 0,
            ..Default::default()
        };
        assert!(matches!(
            MarketMaker::new(config),
            Err(MakerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_quote_ids_increase() {
        let mut mm = engine();
        let a = mm.quote("AAPL", 150.0, 1.0).unwrap();
        let b = mm.quote("MSFT", 300.0, 1.0).unwrap();
        assert!(b.quote_id() > a.quote_id());
    }

    #[test]
    fn test_invalid_quote_mutates_nothing() {
        let mut mm = engine();
        assert!(mm.quote("AAPL", f64::NAN, 1.0).is_err());
        assert!(mm.quote("AAPL", 150.0, 0.0).is_err());
        assert!(mm.quote("AAPL", f64::INFINITY, 1.0).is_err());
        assert!(mm.instruments().is_empty());
        assert_eq!(mm.volatility("AAPL"), 1.0);
    }

    #[test]
    fn test_execute_buy_at_bid_sell_at_offer() {
        let mut mm = engine();
        let q = mm.quote("AAPL", 100.0, 2.0).unwrap();

        let buy = mm.execute(&q, true).unwrap();
        assert_eq!(buy.price, q.bid());
        assert_eq!(buy.side, Side::Buy);

        let sell = mm.execute(&q, false).unwrap();
        assert_eq!(sell.price, q.offer());
        assert_eq!(sell.resulting_position, 0.0);
        assert_eq!(sell.resulting_average_price, None);
        assert!(sell.realized_pnl > 0.0);
        assert_eq!(mm.trade_history().len(), 2);
    }

    #[test]
    fn test_execute_partial_respects_quoted_size() {
        let mut mm = engine();
        let q = mm.quote("AAPL", 100.0, 5.0).unwrap();
        assert!(matches!(
            mm.execute_partial(&q, Side::Buy, 6.0),
            Err(MakerError::SizeExceedsQuote { .. })
        ));
        assert!(mm.trade_history().is_empty());

        let rec = mm.execute_partial(&q, Side::Buy, 2.0).unwrap();
        assert_eq!(rec.size, 2.0);
        assert_eq!(mm.position("AAPL"), 2.0);
    }

    #[test]
    fn test_long_inventory_skews_next_quote_down() {
        let config = MakerConfig {
            max_position_notional: 1_000.0,
            adverse_consecutive_fills: 0,
            ..Default::default()
        };
        let mut mm = MarketMaker::new(config).unwrap();
        let flat = mm.quote("AAPL", 100.0, 5.0).unwrap();
        mm.execute(&flat, true).unwrap();

        let long = mm.quote("AAPL", 100.0, 5.0).unwrap();
        assert!(long.skew() > 0.0);
        assert!(long.mid() < 100.0);
        assert!(long.bid() <= 100.0 && 100.0 <= long.offer());
    }

    #[test]
    fn test_adverse_fills_widen_spread() {
        let config = MakerConfig {
            adverse_consecutive_fills: 2,
            adverse_spread_multiplier: 2.0,
            inventory_skew_factor: 0.0,
            ..Default::default()
        };
        let mut mm = MarketMaker::new(config).unwrap();
        for _ in 0..2 {
            let q = mm.quote("AAPL", 100.0, 1.0).unwrap();
            assert_eq!(q.spread_multiplier(), 1.0);
            mm.execute(&q, false).unwrap();
        }
        let widened = mm.quote("AAPL", 100.0, 1.0).unwrap();
        assert_eq!(widened.spread_multiplier(), 2.0);
    }

    #[test]
    fn test_instruments_lists_quoted_keys() {
        let mut mm = engine();
        mm.quote("MSFT", 300.0, 1.0).unwrap();
        let q = mm.quote("AAPL", 150.0, 1.0).unwrap();
        mm.execute(&q, true).unwrap();

        let names: Vec<&str> = mm.instruments().iter().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_instruments_include_fills_on_unquoted_keys() {
        let mut mm = engine();
        mm.quote("MSFT", 300.0, 1.0).unwrap();
        let external = Quote::new(
            99,
            InstrumentKey::new("TSLA").unwrap(),
            200.0,
            2.0,
            quotebook_core::QuotePricing {
                bid: 199.0,
                offer: 201.0,
                half_spread: 1.0,
                skew: 0.0,
                volatility: 1.0,
                spread_multiplier: 1.0,
            },
        );
        mm.execute(&external, true).unwrap();

        let names: Vec<&str> = mm.instruments().iter().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["MSFT", "TSLA"]);
        assert_eq!(mm.position("TSLA"), 2.0);
    }

    #[test]
    fn test_saturated_long_quote_is_still_fillable() {
        let config = MakerConfig {
            inventory_skew_factor: 1.0,
            max_position_notional: 100.0,
            adverse_consecutive_fills: 0,
            ..Default::default()
        };
        let mut mm = MarketMaker::new(config).unwrap();
        let q = mm.quote("X", 100.0, 10.0).unwrap();
        mm.execute(&q, true).unwrap();

        // A 100x jump drives the estimate far past the half-spread cap
        let extreme = mm.quote("X", 10_000.0, 1.0).unwrap();
        assert!((extreme.bid() - 2_000.0).abs() < 1e-6);
        let rec = mm.execute(&extreme, true).unwrap();
        assert_eq!(rec.price, extreme.bid());
    }

    #[test]
    fn test_pnl_accessors() {
        let mut mm = engine();
        let q = mm.quote("AAPL", 100.0, 1.0).unwrap();
        mm.execute(&q, true).unwrap();
        let expected = 110.0 - q.bid();
        assert!((mm.unrealized_pnl("AAPL", 110.0) - expected).abs() < 1e-9);
        assert_eq!(mm.total_realized_pnl(), 0.0);
    }
}
