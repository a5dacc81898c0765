//! Simulation loop.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use quotebook_core::{InstrumentKey, TradeRecord};
use quotebook_mm::MarketMaker;
use quotebook_telemetry::{Metrics, SessionReporter};

use crate::config::AppConfig;
use crate::error::AppResult;

/// Counters for one completed run.
#[derive(Debug)]
pub struct SessionOutcome {
    pub steps: usize,
    pub quotes: u64,
    pub trades: u64,
    pub reporter: SessionReporter,
}

/// Main application.
pub struct Application {
    config: AppConfig,
    engine: MarketMaker,
    /// Current reference price per configured instrument, in config order.
    prices: Vec<f64>,
    rng: StdRng,
}

impl Application {
    /// Create a new application with validated configuration.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        let engine = MarketMaker::new(config.maker.clone())?;
        let prices = config
            .simulation
            .instruments
            .iter()
            .map(|i| i.start_price)
            .collect();
        let rng = StdRng::seed_from_u64(config.simulation.seed);

        Ok(Self {
            config,
            engine,
            prices,
            rng,
        })
    }

    pub fn engine(&self) -> &MarketMaker {
        &self.engine
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn trade_history(&self) -> &[TradeRecord] {
        self.engine.trade_history()
    }

    /// Run every configured step and summarize the session.
    pub fn run(&mut self) -> AppResult<SessionOutcome> {
        let steps = self.config.simulation.steps;
        info!(
            steps,
            instruments = self.config.simulation.instruments.len(),
            seed = self.config.simulation.seed,
            "Starting simulation"
        );

        let mut quotes = 0u64;
        let mut trades = 0u64;
        for step in 0..steps {
            let (q, t) = self.step(step)?;
            quotes += q;
            trades += t;
        }

        let mut reporter = SessionReporter::new();
        for instrument in &self.config.simulation.instruments {
            let key = InstrumentKey::new(instrument.symbol.as_str())?;
            let stats = self.engine.stats(key.as_str());
            Metrics::realized_pnl_set(key.as_str(), stats.realized_pnl);
            reporter.record(key, stats);
        }

        info!(quotes, trades, "Simulation finished");
        Ok(SessionOutcome {
            steps,
            quotes,
            trades,
            reporter,
        })
    }

    /// Move every price, quote it, and maybe fill. Returns (quotes, trades).
    fn step(&mut self, step: usize) -> AppResult<(u64, u64)> {
        let sim = &self.config.simulation;
        let mut trades = 0;

        for (instrument, price) in sim.instruments.iter().zip(self.prices.iter_mut()) {
            let ret = self
                .rng
                .gen_range(-sim.step_volatility..=sim.step_volatility);
            *price *= 1.0 + ret;

            let quote = self
                .engine
                .quote(&instrument.symbol, *price, sim.order_size)?;
            Metrics::quote_issued(&quote);

            if !self.rng.gen_bool(sim.fill_probability) {
                continue;
            }
            let is_buy = self.rng.gen_bool(0.5);
            let record = self.engine.execute(&quote, is_buy)?;
            Metrics::trade_executed(&record);
            trades += 1;

            info!(
                step,
                instrument = %record.instrument,
                side = %record.side,
                price = record.price,
                size = record.size,
                position = record.resulting_position,
                realized_pnl = record.realized_pnl,
                "Trade"
            );
        }

        debug!(step, trades, "Step complete");
        Ok((sim.instruments.len() as u64, trades))
    }
}
