//! Quote, position and trade-ledger types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::instrument::InstrumentKey;
use crate::order::Side;

/// Prices computed by the pricer for one quote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuotePricing {
    /// Price at which we buy.
    pub bid: f64,
    /// Price at which we sell.
    pub offer: f64,
    /// Symmetric component of the quote width (price units).
    pub half_spread: f64,
    /// Inventory skew subtracted from both sides (price units).
    /// Positive when long: both prices shift down.
    pub skew: f64,
    /// Volatility estimate used to widen the spread.
    pub volatility: f64,
    /// Spread multiplier in effect (1.0 normally, higher after adverse fills).
    pub spread_multiplier: f64,
}

/// A two-sided quote. Immutable once returned by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    quote_id: u64,
    instrument: InstrumentKey,
    reference_price: f64,
    size: f64,
    bid: f64,
    offer: f64,
    volatility: f64,
    half_spread: f64,
    skew: f64,
    spread_multiplier: f64,
}

impl Quote {
    pub fn new(
        quote_id: u64,
        instrument: InstrumentKey,
        reference_price: f64,
        size: f64,
        pricing: QuotePricing,
    ) -> Self {
        Self {
            quote_id,
            instrument,
            reference_price,
            size,
            bid: pricing.bid,
            offer: pricing.offer,
            volatility: pricing.volatility,
            half_spread: pricing.half_spread,
            skew: pricing.skew,
            spread_multiplier: pricing.spread_multiplier,
        }
    }

    pub fn quote_id(&self) -> u64 {
        self.quote_id
    }

    pub fn instrument(&self) -> &InstrumentKey {
        &self.instrument
    }

    pub fn reference_price(&self) -> f64 {
        self.reference_price
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn bid(&self) -> f64 {
        self.bid
    }

    pub fn offer(&self) -> f64 {
        self.offer
    }

    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    pub fn half_spread(&self) -> f64 {
        self.half_spread
    }

    pub fn skew(&self) -> f64 {
        self.skew
    }

    pub fn spread_multiplier(&self) -> f64 {
        self.spread_multiplier
    }

    /// Quote width in price units.
    pub fn spread(&self) -> f64 {
        self.offer - self.bid
    }

    /// Quote width as a fraction of the reference price.
    pub fn spread_pct(&self) -> f64 {
        self.spread() / self.reference_price
    }

    pub fn mid(&self) -> f64 {
        (self.bid + self.offer) / 2.0
    }

    /// Price we trade at when executing `side` against this quote:
    /// buys fill at our bid, sells at our offer.
    pub fn price_for(&self, side: Side) -> f64 {
        match side {
            Side::Buy => self.bid,
            Side::Sell => self.offer,
        }
    }
}

/// Point-in-time copy of an instrument's position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionSnapshot {
    /// Signed inventory (positive = long, negative = short). Exactly 0.0 when flat.
    pub net_quantity: f64,
    /// Volume-weighted entry price. `None` while flat.
    pub average_price: Option<f64>,
    /// Realized PnL from reducing trades.
    pub realized_pnl: f64,
    /// Number of trades applied.
    pub fill_count: u64,
}

/// One executed trade in the append-only ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Index in the engine-wide ledger (execution order).
    pub sequence: u64,
    /// Quote this trade executed against.
    pub quote_id: u64,
    pub instrument: InstrumentKey,
    pub side: Side,
    pub price: f64,
    pub size: f64,
    /// Reference price at quote time.
    pub reference_price: f64,
    pub resulting_position: f64,
    pub resulting_average_price: Option<f64>,
    pub volatility_at_trade: f64,
    /// `(offer - bid) / reference_price` of the quote traded against.
    pub spread_pct_at_trade: f64,
    /// PnL realized by this trade alone.
    pub realized_pnl: f64,
    pub executed_at: DateTime<Utc>,
}

/// Aggregated statistics for one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstrumentStats {
    /// Mean quoted spread (fraction of reference price). `None` with no trades.
    pub avg_spread_pct: Option<f64>,
    /// Mean volatility estimate at trade time. `None` with no trades.
    pub avg_volatility: Option<f64>,
    pub position: f64,
    pub average_price: Option<f64>,
    pub trade_count: u64,
    pub buy_volume: f64,
    pub sell_volume: f64,
    pub realized_pnl: f64,
}

impl InstrumentStats {
    /// Stats for an instrument with no recorded trades.
    pub fn empty(position: PositionSnapshot) -> Self {
        Self {
            avg_spread_pct: None,
            avg_volatility: None,
            position: position.net_quantity,
            average_price: position.average_price,
            trade_count: 0,
            buy_volume: 0.0,
            sell_volume: 0.0,
            realized_pnl: position.realized_pnl,
        }
    }
}
