//! Prometheus metrics for the quotebook engine.
//!
//! Recorded by the caller around engine operations; the engine itself
//! never touches these collectors.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration
//! failure means duplicate metric names, a fatal configuration error that
//! should crash on first use. Panics can only occur during static
//! initialization.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, register_int_counter_vec,
    CounterVec, Encoder, GaugeVec, HistogramVec, IntCounterVec, TextEncoder,
};
use quotebook_core::{Quote, Side, TradeRecord};

use crate::error::{TelemetryError, TelemetryResult};

/// Quotes issued.
pub static QUOTES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "quotebook_quotes_total",
        "Total quotes issued",
        &["instrument"]
    )
    .unwrap()
});

/// Trades executed.
pub static TRADES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "quotebook_trades_total",
        "Total trades executed",
        &["instrument", "side"]
    )
    .unwrap()
});

/// Executed volume in instrument units.
pub static TRADED_VOLUME: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quotebook_traded_volume",
        "Executed volume in instrument units",
        &["instrument", "side"]
    )
    .unwrap()
});

/// Net position after the latest trade.
pub static POSITION: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "quotebook_position",
        "Net position (positive = long)",
        &["instrument"]
    )
    .unwrap()
});

/// Volatility estimate at the latest quote.
pub static VOLATILITY: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "quotebook_volatility",
        "Annualized volatility estimate at the latest quote",
        &["instrument"]
    )
    .unwrap()
});

/// Quoted full spread in basis points of the reference price.
pub static SPREAD_BPS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "quotebook_spread_bps",
        "Quoted spread in basis points",
        &["instrument"],
        vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 200.0, 400.0, 800.0, 1600.0, 5000.0]
    )
    .unwrap()
});

/// Realized PnL per instrument.
pub static REALIZED_PNL: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "quotebook_realized_pnl",
        "Cumulative realized PnL",
        &["instrument"]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record an issued quote.
    pub fn quote_issued(quote: &Quote) {
        let instrument = quote.instrument().as_str();
        QUOTES_TOTAL.with_label_values(&[instrument]).inc();
        VOLATILITY
            .with_label_values(&[instrument])
            .set(quote.volatility());
        SPREAD_BPS
            .with_label_values(&[instrument])
            .observe(quote.spread_pct() * 10_000.0);
    }

    /// Record an executed trade and the position it left behind.
    pub fn trade_executed(record: &TradeRecord) {
        let instrument = record.instrument.as_str();
        let side = side_label(record.side);
        TRADES_TOTAL.with_label_values(&[instrument, side]).inc();
        TRADED_VOLUME
            .with_label_values(&[instrument, side])
            .inc_by(record.size);
        Self::position_set(instrument, record.resulting_position);
    }

    /// Set the position gauge.
    pub fn position_set(instrument: &str, net_quantity: f64) {
        POSITION.with_label_values(&[instrument]).set(net_quantity);
    }

    /// Set the realized PnL gauge.
    pub fn realized_pnl_set(instrument: &str, pnl: f64) {
        REALIZED_PNL.with_label_values(&[instrument]).set(pnl);
    }

    /// Encode every registered metric in the Prometheus text format.
    pub fn encode_text() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

fn side_label(side: Side) -> &'static str {
    match side {
        Side::Buy => "buy",
        Side::Sell => "sell",
    }
}
