//! Inventory tracking for market making.
//!
//! Tracks net position per instrument with volume-weighted average entry
//! price and realized PnL, and computes the inventory ratio used for skew.

use std::collections::HashMap;

use quotebook_core::{
    ensure_price, ensure_size, is_cancellation_noise, InstrumentKey, PositionSnapshot, Side,
};
use tracing::trace;

use crate::error::MakerResult;
use crate::quote_engine::inventory_ratio;

/// Inventory state for a single instrument.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Position {
    /// Net position size (positive = long, negative = short).
    net_quantity: f64,
    /// Average entry price; `None` exactly when `net_quantity == 0.0`.
    average_price: Option<f64>,
    /// Total number of trades applied.
    fill_count: u64,
    /// Realized PnL.
    realized_pnl: f64,
}

impl Position {
    pub fn net_quantity(&self) -> f64 {
        self.net_quantity
    }

    pub fn average_price(&self) -> Option<f64> {
        self.average_price
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn snapshot(&self) -> PositionSnapshot {
        PositionSnapshot {
            net_quantity: self.net_quantity,
            average_price: self.average_price,
            realized_pnl: self.realized_pnl,
            fill_count: self.fill_count,
        }
    }

    /// Apply a validated trade and return the PnL it realized.
    ///
    /// Average price rules:
    /// - opening from flat or adding in the same direction: volume-weighted blend
    /// - reducing without crossing zero: unchanged
    /// - reducing to exactly flat: undefined
    /// - crossing through zero: reset to the trade price
    pub fn apply(&mut self, side: Side, price: f64, size: f64) -> f64 {
        let signed_size = side.sign() * size;
        let old_size = self.net_quantity;
        let new_size = old_size + signed_size;

        // Realize PnL on the reducing portion
        let mut realized = 0.0;
        if let Some(avg) = self.average_price {
            if old_size != 0.0 && old_size.signum() != signed_size.signum() {
                let reduce_amount = size.min(old_size.abs());
                realized = if old_size > 0.0 {
                    // Was long, selling
                    (price - avg) * reduce_amount
                } else {
                    // Was short, buying
                    (avg - price) * reduce_amount
                };
            }
        }

        // Snap rounding residue of an exact close, never a real position
        if is_cancellation_noise(new_size, old_size.abs().max(size)) {
            self.net_quantity = 0.0;
            self.average_price = None;
        } else {
            self.average_price = match self.average_price {
                // Opening from flat
                None => Some(price),
                // Adding to position
                Some(avg) if old_size.signum() == signed_size.signum() => {
                    Some((old_size.abs() * avg + size * price) / new_size.abs())
                }
                // Position flipped
                Some(_) if new_size.signum() != old_size.signum() => Some(price),
                // Reducing: unchanged
                Some(avg) => Some(avg),
            };
            self.net_quantity = new_size;
        }

        self.realized_pnl += realized;
        self.fill_count += 1;
        realized
    }

    /// Mark-to-market PnL of the open quantity.
    pub fn unrealized_pnl(&self, mark_price: f64) -> f64 {
        match self.average_price {
            Some(avg) => (mark_price - avg) * self.net_quantity,
            None => 0.0,
        }
    }
}

/// Manages positions across all instruments.
#[derive(Debug, Default)]
pub struct PositionLedger {
    positions: HashMap<InstrumentKey, Position>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a trade and return the post-trade snapshot.
    ///
    /// Rejects non-positive or non-finite size and price without touching state.
    pub fn apply_trade(
        &mut self,
        instrument: &InstrumentKey,
        price: f64,
        size: f64,
        side: Side,
    ) -> MakerResult<PositionSnapshot> {
        let price = ensure_price(price)?;
        let size = ensure_size(size)?;

        let position = self.positions.entry(instrument.clone()).or_default();
        position.apply(side, price, size);

        trace!(
            instrument = %instrument,
            %side,
            price,
            size,
            net_quantity = position.net_quantity,
            "Position updated"
        );
        Ok(position.snapshot())
    }

    /// Net quantity; 0 for unseen instruments.
    pub fn net_quantity(&self, instrument: &str) -> f64 {
        self.positions
            .get(instrument)
            .map(|p| p.net_quantity)
            .unwrap_or(0.0)
    }

    /// Average entry price; `None` when flat or unseen.
    pub fn average_price(&self, instrument: &str) -> Option<f64> {
        self.positions.get(instrument).and_then(|p| p.average_price)
    }

    pub fn snapshot(&self, instrument: &str) -> PositionSnapshot {
        self.positions
            .get(instrument)
            .map(Position::snapshot)
            .unwrap_or_default()
    }

    /// Inventory ratio in [-1, 1] at the given mark.
    pub fn inventory_ratio(&self, instrument: &str, mark_price: f64, max_notional: f64) -> f64 {
        inventory_ratio(self.net_quantity(instrument), mark_price, max_notional)
    }

    pub fn unrealized_pnl(&self, instrument: &str, mark_price: f64) -> f64 {
        self.positions
            .get(instrument)
            .map(|p| p.unrealized_pnl(mark_price))
            .unwrap_or(0.0)
    }

    /// Total realized PnL across all instruments.
    pub fn total_realized_pnl(&self) -> f64 {
        self.positions.values().map(|p| p.realized_pnl).sum()
    }

    /// Iterate over all instrument positions.
    pub fn iter(&self) -> impl Iterator<Item = (&InstrumentKey, &Position)> {
        self.positions.iter()
    }
}
