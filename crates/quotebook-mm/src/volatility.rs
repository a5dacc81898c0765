//! Rolling volatility estimation from observed reference prices.
//!
//! Each instrument keeps a trailing window of reference prices. The
//! estimate is the dispersion of log returns over that window, annualized
//! by `sqrt(periods_per_year)` and floored at `volatility_floor`.
//!
//! **Dispersion**: with one return, `|r|`; with two or more, the sample
//! standard deviation (`n - 1` denominator). Before two prices exist there
//! is no return at all and the configured prior is reported instead.

use std::collections::{HashMap, VecDeque};

use quotebook_core::{ensure_price, InstrumentKey};

use crate::config::MakerConfig;
use crate::error::MakerResult;

/// Parameters shared by every window, derived once from [`MakerConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityParams {
    /// Maximum prices retained per instrument.
    pub window: usize,
    /// Estimate before two prices are available.
    pub prior: f64,
    /// Minimum estimate.
    pub floor: f64,
    /// `sqrt(periods_per_year)`.
    pub annualization: f64,
}

impl From<&MakerConfig> for VolatilityParams {
    fn from(config: &MakerConfig) -> Self {
        Self {
            window: config.volatility_window,
            prior: config.volatility_prior,
            floor: config.volatility_floor,
            annualization: config.periods_per_year.sqrt(),
        }
    }
}

/// Trailing window of reference prices for one instrument.
#[derive(Debug, Clone, Default)]
pub struct PriceWindow {
    prices: VecDeque<f64>,
}

impl PriceWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a price, evicting the oldest beyond `max_len`.
    ///
    /// The caller is responsible for passing a finite, positive price.
    pub fn push(&mut self, price: f64, max_len: usize) {
        self.prices.push_back(price);
        while self.prices.len() > max_len {
            self.prices.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Dispersion of log returns over the window, `None` with fewer than two prices.
    fn dispersion(&self) -> Option<f64> {
        let returns: Vec<f64> = self
            .prices
            .iter()
            .zip(self.prices.iter().skip(1))
            .map(|(prev, next)| (next / prev).ln())
            .collect();

        match returns.len() {
            0 => None,
            1 => Some(returns[0].abs()),
            n => {
                let mean = returns.iter().sum::<f64>() / n as f64;
                let variance = returns
                    .iter()
                    .map(|r| (r - mean) * (r - mean))
                    .sum::<f64>()
                    / (n - 1) as f64;
                Some(variance.sqrt())
            }
        }
    }

    /// Annualized, floored volatility estimate. Pure: never mutates the window.
    pub fn estimate(&self, params: &VolatilityParams) -> f64 {
        match self.dispersion() {
            Some(dispersion) => (dispersion * params.annualization).max(params.floor),
            None => params.prior,
        }
    }
}

/// Per-instrument volatility estimator.
#[derive(Debug)]
pub struct VolatilityEstimator {
    windows: HashMap<InstrumentKey, PriceWindow>,
    params: VolatilityParams,
}

impl VolatilityEstimator {
    pub fn new(params: VolatilityParams) -> Self {
        Self {
            windows: HashMap::new(),
            params,
        }
    }

    pub fn from_config(config: &MakerConfig) -> Self {
        Self::new(VolatilityParams::from(config))
    }

    /// Record a reference price. Unknown instruments are created on first use.
    pub fn observe(&mut self, instrument: &InstrumentKey, price: f64) -> MakerResult<()> {
        let price = ensure_price(price)?;
        let window_len = self.params.window;
        // Avoid cloning the key on the hot path once the instrument exists.
        match self.windows.get_mut(instrument.as_str()) {
            Some(window) => window.push(price, window_len),
            None => {
                let mut window = PriceWindow::new();
                window.push(price, window_len);
                self.windows.insert(instrument.clone(), window);
            }
        }
        Ok(())
    }

    /// Current estimate; the prior for instruments never observed.
    pub fn estimate(&self, instrument: &str) -> f64 {
        self.windows
            .get(instrument)
            .map(|w| w.estimate(&self.params))
            .unwrap_or(self.params.prior)
    }

    /// Number of prices currently retained for an instrument.
    pub fn sample_count(&self, instrument: &str) -> usize {
        self.windows.get(instrument).map(|w| w.len()).unwrap_or(0)
    }

    /// Whether the window for an instrument is full.
    pub fn is_warm(&self, instrument: &str) -> bool {
        self.sample_count(instrument) >= self.params.window
    }

    /// Instruments with at least one observed price.
    pub fn instruments(&self) -> impl Iterator<Item = &InstrumentKey> {
        self.windows.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> InstrumentKey {
        InstrumentKey::new(s).unwrap()
    }

    fn default_estimator() -> VolatilityEstimator {
        VolatilityEstimator::from_config(&MakerConfig::default())
    }

    #[test]
    fn test_unknown_instrument_reports_prior() {
        let est = default_estimator();
        assert_eq!(est.estimate("AAPL"), 1.0);
        assert_eq!(est.sample_count("AAPL"), 0);
    }

    #[test]
    fn test_single_observation_reports_prior() {
        let mut est = default_estimator();
        est.observe(&key("AAPL"), 150.0).unwrap();
        let vol = est.estimate("AAPL");
        assert!(vol.is_finite());
        assert_eq!(vol, 1.0);
        assert_eq!(est.sample_count("AAPL"), 1);
    }

    #[test]
    fn test_two_observations_use_abs_return() {
        let mut est = default_estimator();
        est.observe(&key("AAPL"), 150.0).unwrap();
        est.observe(&key("AAPL"), 151.2).unwrap();

        // |ln(151.2 / 150)| * sqrt(252)
        let expected = (151.2_f64 / 150.0).ln().abs() * 252.0_f64.sqrt();
        assert!((est.estimate("AAPL") - expected).abs() < 1e-12);
        assert_ne!(est.estimate("AAPL"), 1.0);
    }

    #[test]
    fn test_sample_stdev_of_log_returns() {
        let config = MakerConfig {
            periods_per_year: 1.0,
            volatility_floor: 0.0,
            ..Default::default()
        };
        let mut est = VolatilityEstimator::from_config(&config);
        let prices = [100.0, 101.0, 99.0, 102.0];
        for p in prices {
            est.observe(&key("X"), p).unwrap();
        }

        let returns: Vec<f64> = prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
        let mean = returns.iter().sum::<f64>() / 3.0;
        let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / 2.0;
        assert!((est.estimate("X") - var.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_floor_applied_to_flat_prices() {
        let mut est = default_estimator();
        for _ in 0..5 {
            est.observe(&key("FLAT"), 100.0).unwrap();
        }
        assert_eq!(est.estimate("FLAT"), 0.01);
    }

    #[test]
    fn test_rolling_window_eviction() {
        let config = MakerConfig {
            volatility_window: 3,
            ..Default::default()
        };
        let mut est = VolatilityEstimator::from_config(&config);
        // A large jump early on falls out of the window.
        for p in [100.0, 200.0, 100.0, 100.0, 100.0] {
            est.observe(&key("X"), p).unwrap();
        }
        assert_eq!(est.sample_count("X"), 3);
        assert!(est.is_warm("X"));
        assert_eq!(est.estimate("X"), 0.01);
    }

    #[test]
    fn test_deterministic_for_identical_sequences() {
        let prices = [10.0, 10.5, 10.2, 10.9, 10.4, 11.0];
        let mut a = default_estimator();
        let mut b = default_estimator();
        for p in prices {
            a.observe(&key("X"), p).unwrap();
            b.observe(&key("X"), p).unwrap();
        }
        assert_eq!(a.estimate("X").to_bits(), b.estimate("X").to_bits());
    }

    #[test]
    fn test_estimate_does_not_mutate() {
        let mut est = default_estimator();
        est.observe(&key("X"), 10.0).unwrap();
        est.observe(&key("X"), 11.0).unwrap();
        let first = est.estimate("X");
        let second = est.estimate("X");
        assert_eq!(first, second);
        assert_eq!(est.sample_count("X"), 2);
    }

    #[test]
    fn test_invalid_price_rejected_without_state() {
        let mut est = default_estimator();
        assert!(est.observe(&key("X"), f64::NAN).is_err());
        assert!(est.observe(&key("X"), 0.0).is_err());
        assert_eq!(est.sample_count("X"), 0);
    }

    #[test]
    fn test_multi_instrument_independence() {
        let mut est = default_estimator();
        est.observe(&key("CALM"), 100.0).unwrap();
        est.observe(&key("CALM"), 100.1).unwrap();
        est.observe(&key("WILD"), 100.0).unwrap();
        est.observe(&key("WILD"), 110.0).unwrap();

        assert!(est.estimate("WILD") > est.estimate("CALM") * 10.0);
    }
}
