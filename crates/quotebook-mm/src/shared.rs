//! Thread-safe market maker.
//!
//! Each instrument's state lives in its own [`InstrumentBook`] behind a
//! mutex, so callers working on different instruments never contend. The
//! trade ledger is a single mutex-guarded [`TradeRecorder`].
//!
//! Lock order is always instrument book first, then ledger. A fill holds its
//! book lock while appending to the ledger, which keeps the ledger order of
//! each instrument's trades identical to the order they hit its position.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use quotebook_core::{InstrumentKey, InstrumentStats, PositionSnapshot, Quote, Side, TradeRecord};
use tracing::debug;

use crate::book::{validate_fill, InstrumentBook, QuoteRequest};
use crate::config::MakerConfig;
use crate::error::MakerResult;
use crate::recorder::TradeRecorder;
use crate::volatility::VolatilityParams;

type BookHandle = Arc<Mutex<InstrumentBook>>;

/// Market maker usable from many threads through `&self`.
#[derive(Debug)]
pub struct SharedMarketMaker {
    config: MakerConfig,
    params: VolatilityParams,
    books: DashMap<InstrumentKey, BookHandle>,
    recorder: Mutex<TradeRecorder>,
    next_quote_id: AtomicU64,
}

impl SharedMarketMaker {
    pub fn new(config: MakerConfig) -> MakerResult<Self> {
        config.validate()?;
        Ok(Self {
            params: VolatilityParams::from(&config),
            books: DashMap::new(),
            recorder: Mutex::new(TradeRecorder::new()),
            next_quote_id: AtomicU64::new(0),
            config,
        })
    }

    pub fn config(&self) -> &MakerConfig {
        &self.config
    }

    /// Book for `key`, created on first use.
    ///
    /// The handle is cloned out so no map shard guard is held while the book
    /// itself is locked.
    fn book(&self, key: &InstrumentKey) -> BookHandle {
        if let Some(entry) = self.books.get(key.as_str()) {
            return Arc::clone(entry.value());
        }
        Arc::clone(self.books.entry(key.clone()).or_default().value())
    }

    fn existing_book(&self, instrument: &str) -> Option<BookHandle> {
        self.books
            .get(instrument)
            .map(|entry| Arc::clone(entry.value()))
    }

    fn all_books(&self) -> Vec<BookHandle> {
        self.books
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn quote(&self, instrument: &str, reference_price: f64, size: f64) -> MakerResult<Quote> {
        let request = QuoteRequest::new(instrument, reference_price, size)?;
        let book = self.book(&request.instrument);
        let mut book = book.lock();
        let quote_id = self.next_quote_id.fetch_add(1, Ordering::Relaxed);
        Ok(book.quote(quote_id, request, &self.params, &self.config))
    }

    pub fn execute(&self, quote: &Quote, is_buy: bool) -> MakerResult<TradeRecord> {
        self.execute_partial(quote, Side::from_is_buy(is_buy), quote.size())
    }

    pub fn execute_partial(&self, quote: &Quote, side: Side, size: f64) -> MakerResult<TradeRecord> {
        let fill = validate_fill(quote, side, size)?;
        let book = self.book(quote.instrument());
        let mut book = book.lock();
        let unsequenced = book.fill(quote, fill);

        let mut recorder = self.recorder.lock();
        let record = recorder.record(unsequenced).clone();
        drop(recorder);
        drop(book);

        debug!(
            instrument = %record.instrument,
            sequence = record.sequence,
            side = %record.side,
            price = record.price,
            size = record.size,
            position = record.resulting_position,
            "Trade executed"
        );
        Ok(record)
    }

    pub fn position(&self, instrument: &str) -> f64 {
        self.position_snapshot(instrument).net_quantity
    }

    pub fn average_price(&self, instrument: &str) -> Option<f64> {
        self.position_snapshot(instrument).average_price
    }

    pub fn position_snapshot(&self, instrument: &str) -> PositionSnapshot {
        self.existing_book(instrument)
            .map(|book| book.lock().position().snapshot())
            .unwrap_or_default()
    }

    pub fn volatility(&self, instrument: &str) -> f64 {
        self.existing_book(instrument)
            .map(|book| book.lock().volatility(&self.params))
            .unwrap_or(self.params.prior)
    }

    /// Statistics taken under the instrument's lock, so the position and
    /// the trade aggregates describe the same moment.
    pub fn stats(&self, instrument: &str) -> InstrumentStats {
        match self.existing_book(instrument) {
            Some(book) => {
                let book = book.lock();
                let position = book.position().snapshot();
                self.recorder.lock().stats(instrument, position)
            }
            None => self
                .recorder
                .lock()
                .stats(instrument, PositionSnapshot::default()),
        }
    }

    /// Copy of the trade ledger in execution order.
    pub fn trade_history(&self) -> Vec<TradeRecord> {
        self.recorder.lock().history().to_vec()
    }

    pub fn trade_count(&self) -> usize {
        self.recorder.lock().len()
    }

    pub fn instruments(&self) -> Vec<InstrumentKey> {
        let mut keys: Vec<InstrumentKey> = self.books.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn total_realized_pnl(&self) -> f64 {
        self.all_books()
            .iter()
            .map(|book| book.lock().position().realized_pnl())
            .sum()
    }

    pub fn unrealized_pnl(&self, instrument: &str, mark_price: f64) -> f64 {
        self.existing_book(instrument)
            .map(|book| book.lock().position().unrealized_pnl(mark_price))
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MarketMaker;

    fn shared() -> SharedMarketMaker {
        SharedMarketMaker::new(MakerConfig::default()).unwrap()
    }

    #[test]
    fn test_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedMarketMaker>();
    }

    #[test]
    fn test_matches_single_threaded_engine() {
        let shared = shared();
        let mut single = MarketMaker::new(MakerConfig::default()).unwrap();

        let steps = [
            ("AAPL", 150.0, 100.0, true),
            ("AAPL", 151.2, 100.0, false),
            ("MSFT", 300.0, 10.0, false),
            ("AAPL", 149.5, 50.0, false),
            ("MSFT", 298.0, 10.0, true),
        ];
        for (symbol, price, size, is_buy) in steps {
            let a = shared.quote(symbol, price, size).unwrap();
            let b = single.quote(symbol, price, size).unwrap();
            assert_eq!(a.bid(), b.bid());
            assert_eq!(a.offer(), b.offer());

            let ra = shared.execute(&a, is_buy).unwrap();
            let rb = single.execute(&b, is_buy).unwrap();
            assert_eq!(ra.sequence, rb.sequence);
            assert_eq!(ra.resulting_position, rb.resulting_position);
            assert_eq!(ra.resulting_average_price, rb.resulting_average_price);
        }

        for symbol in ["AAPL", "MSFT"] {
            assert_eq!(shared.position(symbol), single.position(symbol));
            assert_eq!(shared.volatility(symbol), single.volatility(symbol));
            assert_eq!(shared.stats(symbol), single.stats(symbol));
        }
        assert_eq!(shared.total_realized_pnl(), single.total_realized_pnl());
    }

    #[test]
    fn test_unseen_instrument_defaults() {
        let mm = shared();
        assert_eq!(mm.position("NOPE"), 0.0);
        assert_eq!(mm.average_price("NOPE"), None);
        assert_eq!(mm.volatility("NOPE"), 1.0);
        assert_eq!(mm.stats("NOPE").trade_count, 0);
        assert!(mm.instruments().is_empty());
    }

    #[test]
    fn test_rejected_execution_leaves_no_trace() {
        let mm = shared();
        let q = mm.quote("AAPL", 100.0, 1.0).unwrap();
        assert!(mm.execute_partial(&q, Side::Sell, 2.0).is_err());
        assert_eq!(mm.trade_count(), 0);
        assert_eq!(mm.position("AAPL"), 0.0);
    }

    #[test]
    fn test_parallel_instruments() {
        let mm = shared();
        let symbols = ["A", "B", "C", "D"];

        std::thread::scope(|s| {
            for symbol in symbols {
                let mm = &mm;
                s.spawn(move || {
                    for i in 0..50 {
                        let q = mm.quote(symbol, 100.0 + i as f64 * 0.1, 1.0).unwrap();
                        mm.execute(&q, i % 2 == 0).unwrap();
                    }
                });
            }
        });

        assert_eq!(mm.trade_count(), 200);
        for symbol in symbols {
            // 25 buys and 25 sells of size 1
            assert_eq!(mm.position(symbol), 0.0);
            assert_eq!(mm.stats(symbol).trade_count, 50);
        }

        let sequences: Vec<u64> = mm.trade_history().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, (0..200).collect::<Vec<u64>>());
    }

    #[test]
    fn test_parallel_fills_on_one_instrument() {
        const THREADS: usize = 8;
        const ROUNDS: usize = 200;
        let mm = shared();

        std::thread::scope(|s| {
            for t in 0..THREADS {
                let mm = &mm;
                s.spawn(move || {
                    for i in 0..ROUNDS {
                        let size = (1 + (t + i) % 3) as f64;
                        let q = mm.quote("AAPL", 100.0 + (i % 7) as f64, size).unwrap();
                        mm.execute(&q, (t + i) % 3 != 0).unwrap();
                    }
                });
            }
        });

        let total = (THREADS * ROUNDS) as u64;
        let history = mm.trade_history();
        assert_eq!(mm.trade_count() as u64, total);
        assert_eq!(mm.stats("AAPL").trade_count, total);

        let sequences: Vec<u64> = history.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, (0..total).collect::<Vec<u64>>());

        // Ledger order replays the position exactly; sizes are small integers
        let mut running = 0.0;
        for record in &history {
            running += record.side.sign() * record.size;
            assert_eq!(record.resulting_position, running);
        }
        assert_eq!(mm.position("AAPL"), running);
        assert_eq!(mm.stats("AAPL").position, running);
    }
}
