//! Append-only trade ledger and per-instrument statistics.

use quotebook_core::{InstrumentStats, PositionSnapshot, Side, TradeRecord};

/// Ordered record of every executed trade.
#[derive(Debug, Default)]
pub struct TradeRecorder {
    records: Vec<TradeRecord>,
}

impl TradeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a trade. Its `sequence` is set to its index in the ledger.
    pub fn record(&mut self, mut record: TradeRecord) -> &TradeRecord {
        record.sequence = self.records.len() as u64;
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    /// Full ledger in execution order.
    pub fn history(&self) -> &[TradeRecord] {
        &self.records
    }

    /// Trades for one instrument, in execution order.
    pub fn for_instrument<'a>(
        &'a self,
        instrument: &'a str,
    ) -> impl Iterator<Item = &'a TradeRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.instrument.as_str() == instrument)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Aggregate the trades of one instrument.
    ///
    /// Position and average price come from `position` (the ledger's view),
    /// not from the last trade, so they are reported even with zero trades.
    pub fn stats(&self, instrument: &str, position: PositionSnapshot) -> InstrumentStats {
        let mut stats = InstrumentStats::empty(position);
        let mut spread_sum = 0.0;
        let mut volatility_sum = 0.0;

        for record in self.for_instrument(instrument) {
            stats.trade_count += 1;
            spread_sum += record.spread_pct_at_trade;
            volatility_sum += record.volatility_at_trade;
            match record.side {
                Side::Buy => stats.buy_volume += record.size,
                Side::Sell => stats.sell_volume += record.size,
            }
        }

        if stats.trade_count > 0 {
            let n = stats.trade_count as f64;
            stats.avg_spread_pct = Some(spread_sum / n);
            stats.avg_volatility = Some(volatility_sum / n);
        }
        stats
    }
}
