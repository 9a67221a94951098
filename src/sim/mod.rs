//! Paper trade simulation
//!
//! Signals never touch an exchange; a simulator invents the fill and the
//! exit so strategy performance can be tracked end to end. The default
//! simulator draws a small Gaussian price move with a drift in the signalled
//! direction.

use crate::strategy::{Direction, Signal, TradeResult};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Produces a simulated outcome for a signal
pub trait TradeSimulator: Send {
    fn simulate(&mut self, signal: &Signal, entry_price: Decimal) -> TradeResult;
}

/// Gaussian price-move simulator
///
/// The simulated move is `drift + noise` where drift points in the signalled
/// direction and noise is `Normal(0, noise_std)`. A correct direction call on
/// the drift alone yields a positive PnL; noise makes individual trades lose.
pub struct GaussianSimulator {
    drift: f64,
    noise: Normal<f64>,
    rng: StdRng,
}

impl GaussianSimulator {
    pub const DEFAULT_DRIFT: f64 = 0.005;
    pub const DEFAULT_NOISE_STD: f64 = 0.01;

    pub fn new(drift: f64, noise_std: f64) -> Self {
        Self::with_rng(drift, noise_std, StdRng::from_entropy())
    }

    /// Deterministic simulator for tests
    pub fn seeded(drift: f64, noise_std: f64, seed: u64) -> Self {
        Self::with_rng(drift, noise_std, StdRng::seed_from_u64(seed))
    }

    fn with_rng(drift: f64, noise_std: f64, rng: StdRng) -> Self {
        Self {
            drift,
            noise: Normal::new(0.0, noise_std).expect("noise std must be finite and non-negative"),
            rng,
        }
    }
}

impl Default for GaussianSimulator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DRIFT, Self::DEFAULT_NOISE_STD)
    }
}

impl TradeSimulator for GaussianSimulator {
    fn simulate(&mut self, signal: &Signal, entry_price: Decimal) -> TradeResult {
        let drift = match signal.direction {
            Direction::Up => self.drift,
            Direction::Down => -self.drift,
        };
        let move_pct = drift + self.noise.sample(&mut self.rng);

        let entry = entry_price.to_f64().unwrap_or(0.0);
        let exit = entry * (1.0 + move_pct);
        let exit_price = Decimal::from_f64(exit).unwrap_or(entry_price);

        // PnL is signed by the predicted direction
        let signed_move = match signal.direction {
            Direction::Up => move_pct,
            Direction::Down => -move_pct,
        };
        let pnl_pct = Decimal::from_f64(signed_move * 100.0)
            .unwrap_or(Decimal::ZERO)
            .round_dp(4);

        TradeResult {
            id: Uuid::new_v4(),
            strategy: signal.strategy.clone(),
            direction: signal.direction,
            entry_price,
            exit_price,
            pnl_pct,
            closed_at: Utc::now(),
        }
    }
}
