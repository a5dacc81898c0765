//! Per-instrument quoting state and the quote/fill steps shared by both engines.
//!
//! [`MarketMaker`](crate::MarketMaker) keeps the pieces of an instrument in
//! separate component maps; [`SharedMarketMaker`](crate::SharedMarketMaker)
//! bundles them into one [`InstrumentBook`] behind a lock. Both go through
//! the functions here so the pricing and validation rules are identical.

use chrono::Utc;
use quotebook_core::{
    ensure_price, ensure_size, InstrumentKey, PositionSnapshot, Quote, Side, TradeRecord,
};
use tracing::debug;

use crate::config::MakerConfig;
use crate::error::{MakerError, MakerResult};
use crate::inventory::Position;
use crate::quote_engine::{compute_quote, PricingInputs};
use crate::volatility::{PriceWindow, VolatilityParams};

/// Tracks consecutive same-side fills for adverse selection detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillStreak {
    /// Last fill side.
    last_side: Option<Side>,
    /// Count of consecutive same-side fills.
    consecutive_count: u32,
}

impl FillStreak {
    pub fn record_fill(&mut self, side: Side) {
        if self.last_side == Some(side) {
            self.consecutive_count += 1;
        } else {
            self.last_side = Some(side);
            self.consecutive_count = 1;
        }
    }

    /// Spread multiplier: widened once the streak reaches the configured length.
    pub fn spread_multiplier(&self, config: &MakerConfig) -> f64 {
        if config.adverse_consecutive_fills == 0 {
            return 1.0;
        }
        if self.consecutive_count >= config.adverse_consecutive_fills {
            config.adverse_spread_multiplier
        } else {
            1.0
        }
    }
}

/// Validated arguments of a quote request.
#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub instrument: InstrumentKey,
    pub reference_price: f64,
    pub size: f64,
}

impl QuoteRequest {
    /// Validate everything up front so a rejected request mutates nothing.
    pub fn new(instrument: &str, reference_price: f64, size: f64) -> MakerResult<Self> {
        Ok(Self {
            instrument: InstrumentKey::new(instrument)?,
            reference_price: ensure_price(reference_price)?,
            size: ensure_size(size)?,
        })
    }
}

/// Price a validated request against the instrument's current state.
pub fn price_request(
    quote_id: u64,
    request: QuoteRequest,
    net_quantity: f64,
    volatility: f64,
    streak: Option<&FillStreak>,
    config: &MakerConfig,
) -> Quote {
    let spread_multiplier = streak.map(|s| s.spread_multiplier(config)).unwrap_or(1.0);
    let pricing = compute_quote(
        &PricingInputs {
            reference_price: request.reference_price,
            net_quantity,
            volatility,
            spread_multiplier,
        },
        config,
    );

    debug!(
        instrument = %request.instrument,
        quote_id,
        reference_price = request.reference_price,
        bid = pricing.bid,
        offer = pricing.offer,
        volatility,
        net_quantity,
        spread_multiplier,
        "Quote computed"
    );

    Quote::new(
        quote_id,
        request.instrument,
        request.reference_price,
        request.size,
        pricing,
    )
}

/// A fill that passed validation: the price and size to apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedFill {
    pub side: Side,
    pub price: f64,
    pub size: f64,
}

/// Check a fill of `size` on `side` against `quote`.
pub fn validate_fill(quote: &Quote, side: Side, size: f64) -> MakerResult<ValidatedFill> {
    let quoted = ensure_size(quote.size())?;
    let size = ensure_size(size)?;
    if size > quoted {
        return Err(MakerError::SizeExceedsQuote {
            requested: size,
            quoted,
        });
    }
    ensure_price(quote.reference_price())?;
    let price = ensure_price(quote.price_for(side))?;
    Ok(ValidatedFill { side, price, size })
}

/// Build the ledger entry for an applied fill. `sequence` is assigned by the recorder.
pub fn trade_record(
    quote: &Quote,
    fill: ValidatedFill,
    after: PositionSnapshot,
    realized_pnl: f64,
) -> TradeRecord {
    TradeRecord {
        sequence: 0,
        quote_id: quote.quote_id(),
        instrument: quote.instrument().clone(),
        side: fill.side,
        price: fill.price,
        size: fill.size,
        reference_price: quote.reference_price(),
        resulting_position: after.net_quantity,
        resulting_average_price: after.average_price,
        volatility_at_trade: quote.volatility(),
        spread_pct_at_trade: quote.spread_pct(),
        realized_pnl,
        executed_at: Utc::now(),
    }
}

/// All mutable state of one instrument, for engines that lock per instrument.
#[derive(Debug, Default)]
pub struct InstrumentBook {
    window: PriceWindow,
    position: Position,
    streak: FillStreak,
}

impl InstrumentBook {
    /// Observe the reference price and price the request.
    pub fn quote(
        &mut self,
        quote_id: u64,
        request: QuoteRequest,
        params: &VolatilityParams,
        config: &MakerConfig,
    ) -> Quote {
        self.window.push(request.reference_price, params.window);
        let volatility = self.window.estimate(params);
        price_request(
            quote_id,
            request,
            self.position.net_quantity(),
            volatility,
            Some(&self.streak),
            config,
        )
    }

    /// Apply a validated fill and return the unsequenced trade record.
    pub fn fill(&mut self, quote: &Quote, fill: ValidatedFill) -> TradeRecord {
        let realized = self.position.apply(fill.side, fill.price, fill.size);
        self.streak.record_fill(fill.side);
        trade_record(quote, fill, self.position.snapshot(), realized)
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn volatility(&self, params: &VolatilityParams) -> f64 {
        self.window.estimate(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotebook_core::QuotePricing;

    fn quote(size: f64) -> Quote {
        Quote::new(
            1,
            InstrumentKey::new("AAPL").unwrap(),
            100.0,
            size,
            QuotePricing {
                bid: 98.0,
                offer: 102.0,
                half_spread: 2.0,
                skew: 0.0,
                volatility: 1.0,
                spread_multiplier: 1.0,
            },
        )
    }

    #[test]
    fn test_fill_streak_widens_after_threshold() {
        let config = MakerConfig {
            adverse_consecutive_fills: 3,
            adverse_spread_multiplier: 2.0,
            ..Default::default()
        };
        let mut streak = FillStreak::default();
        streak.record_fill(Side::Buy);
        streak.record_fill(Side::Buy);
        assert_eq!(streak.spread_multiplier(&config), 1.0);
        streak.record_fill(Side::Buy);
        assert_eq!(streak.consecutive_count, 3);
        assert_eq!(streak.spread_multiplier(&config), 2.0);

        // Opposite side resets
        streak.record_fill(Side::Sell);
        assert_eq!(streak.consecutive_count, 1);
        assert_eq!(streak.spread_multiplier(&config), 1.0);
    }

    #[test]
    fn test_fill_streak_disabled() {
        let config = MakerConfig {
            adverse_consecutive_fills: 0,
            ..Default::default()
        };
        let mut streak = FillStreak::default();
        for _ in 0..10 {
            streak.record_fill(Side::Sell);
        }
        assert_eq!(streak.spread_multiplier(&config), 1.0);
    }

    #[test]
    fn test_quote_request_validation() {
        assert!(QuoteRequest::new("AAPL", 150.0, 100.0).is_ok());
        assert!(matches!(
            QuoteRequest::new("AAPL", f64::NAN, 100.0),
            Err(MakerError::InvalidInput(_))
        ));
        assert!(QuoteRequest::new("AAPL", 150.0, 0.0).is_err());
        assert!(QuoteRequest::new("AAPL", 150.0, -1.0).is_err());
        assert!(QuoteRequest::new("", 150.0, 1.0).is_err());
    }

    #[test]
    fn test_validate_fill_prices_by_side() {
        let q = quote(10.0);
        assert_eq!(validate_fill(&q, Side::Buy, 10.0).unwrap().price, 98.0);
        assert_eq!(validate_fill(&q, Side::Sell, 4.0).unwrap().price, 102.0);
    }

    #[test]
    fn test_validate_fill_rejects_oversize() {
        let q = quote(10.0);
        assert_eq!(
            validate_fill(&q, Side::Buy, 11.0),
            Err(MakerError::SizeExceedsQuote {
                requested: 11.0,
                quoted: 10.0
            })
        );
    }

    #[test]
    fn test_validate_fill_rejects_zero_size_quote() {
        let q = quote(0.0);
        assert!(matches!(
            validate_fill(&q, Side::Buy, 0.0),
            Err(MakerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_book_quote_then_fill() {
        let config = MakerConfig::default();
        let params = VolatilityParams::from(&config);
        let mut book = InstrumentBook::default();

        let request = QuoteRequest::new("AAPL", 150.0, 100.0).unwrap();
        let q = book.quote(0, request, &params, &config);
        assert_eq!(book.window.len(), 1);
        assert!(q.bid() <= 150.0 && 150.0 <= q.offer());

        let fill = validate_fill(&q, Side::Buy, q.size()).unwrap();
        let record = book.fill(&q, fill);
        assert_eq!(record.resulting_position, 100.0);
        assert_eq!(record.resulting_average_price, Some(q.bid()));
        assert_eq!(book.position().net_quantity(), 100.0);
        assert_eq!(book.streak.consecutive_count, 1);
    }
}
