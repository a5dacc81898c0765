//! End-of-session summary of per-instrument statistics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use quotebook_core::{InstrumentKey, InstrumentStats};
use serde::Serialize;
use tracing::info;

use crate::error::TelemetryResult;

/// Statistics of one instrument, labelled for serialization.
#[derive(Debug, Clone, Serialize)]
pub struct InstrumentSummary {
    pub instrument: InstrumentKey,
    #[serde(flatten)]
    pub stats: InstrumentStats,
}

/// Collects per-instrument statistics and writes them to the log.
#[derive(Debug)]
pub struct SessionReporter {
    start_time: DateTime<Utc>,
    entries: BTreeMap<InstrumentKey, InstrumentStats>,
}

impl Default for SessionReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionReporter {
    pub fn new() -> Self {
        Self {
            start_time: Utc::now(),
            entries: BTreeMap::new(),
        }
    }

    /// Add or replace the statistics of an instrument.
    pub fn record(&mut self, instrument: InstrumentKey, stats: InstrumentStats) {
        self.entries.insert(instrument, stats);
    }

    /// Summaries ordered by instrument.
    pub fn summaries(&self) -> Vec<InstrumentSummary> {
        self.entries
            .iter()
            .map(|(instrument, stats)| InstrumentSummary {
                instrument: instrument.clone(),
                stats: *stats,
            })
            .collect()
    }

    pub fn total_trades(&self) -> u64 {
        self.entries.values().map(|s| s.trade_count).sum()
    }

    pub fn total_realized_pnl(&self) -> f64 {
        self.entries.values().map(|s| s.realized_pnl).sum()
    }

    /// Output the session summary to logs.
    pub fn output_summary(&self) {
        let duration = Utc::now() - self.start_time;

        info!("========== Session Summary ==========");
        info!(
            "Started: {} ({} ms)",
            self.start_time.format("%Y-%m-%d %H:%M:%S UTC"),
            duration.num_milliseconds()
        );

        for (instrument, s) in &self.entries {
            info!("--- {} ---", instrument);
            info!(
                "  Trades: {} (buy volume: {}, sell volume: {})",
                s.trade_count, s.buy_volume, s.sell_volume
            );
            info!(
                "  Position: {} @ {}",
                s.position,
                format_optional(s.average_price, 4)
            );
            info!(
                "  Avg spread: {}%, avg volatility: {}",
                format_optional(s.avg_spread_pct.map(|p| p * 100.0), 4),
                format_optional(s.avg_volatility, 4)
            );
            info!("  Realized PnL: {:.4}", s.realized_pnl);
        }

        info!(
            total_trades = self.total_trades(),
            total_realized_pnl = self.total_realized_pnl(),
            "====================================="
        );
    }

    /// Summaries as a JSON array.
    pub fn to_json(&self) -> TelemetryResult<String> {
        Ok(serde_json::to_string(&self.summaries())?)
    }
}

fn format_optional(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "n/a".to_string(),
    }
}
