//! Queue selection strategies.
//!
//! A queue selector answers "which level do we serve next?" once per
//! dispatch attempt. It must return some level even when everything is
//! empty; the caller observes the empty queue and aborts the attempt.

use crate::staging::StagingQueue;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strata_config::AppConfig;
use strata_core::{StrataError, StrataResult};

/// Picks the staging level to serve next.
pub trait QueueSelector: Send {
    /// Returns the level index to serve. Never fails; an empty result queue
    /// is detected by the caller.
    fn select_queue(&mut self, stage_lists: &[Box<dyn StagingQueue>]) -> usize;
}

/// Builds the configured queue selector.
pub fn queue_selector_for(config: &AppConfig) -> StrataResult<Box<dyn QueueSelector>> {
    match config.selection.queue_select_method.as_str() {
        "top_level_select" => Ok(Box::new(TopLevelSelector)),
        "env_weight_random_select" => Ok(Box::new(WeightRandomSelector::new(
            config.select_weights()?,
        ))),
        "env_zip_select" => Ok(Box::new(ZipSelector::new(config.select_orders()?))),
        other => Err(StrataError::configuration(format!(
            "unknown QUEUE_SELECT_METHOD: {other}"
        ))),
    }
}

/// Always serves the most urgent non-empty level.
pub struct TopLevelSelector;

impl QueueSelector for TopLevelSelector {
    fn select_queue(&mut self, stage_lists: &[Box<dyn StagingQueue>]) -> usize {
        stage_lists
            .iter()
            .position(|queue| !queue.is_empty())
            .unwrap_or(0)
    }
}

/// Draws a level with probability proportional to the configured weights.
///
/// An empty draw is retried once with the weights of empty levels masked
/// out; when every masked weight is zero the selector falls back to level 0
/// and lets the caller observe the empty queue.
pub struct WeightRandomSelector {
    weights: Vec<f64>,
    rng: StdRng,
}

impl WeightRandomSelector {
    /// Creates a selector with its own entropy-seeded RNG.
    #[must_use]
    pub fn new(weights: Vec<f64>) -> Self {
        Self {
            weights,
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a selector with a fixed seed.
    #[must_use]
    pub fn with_seed(weights: Vec<f64>, seed: u64) -> Self {
        Self {
            weights,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

fn draw(rng: &mut StdRng, weights: &[f64]) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return None;
    }

    let mut point = rng.gen::<f64>() * total;
    for (level, weight) in weights.iter().enumerate() {
        point -= weight;
        if point < 0.0 {
            return Some(level);
        }
    }

    // Floating-point tail: the last positively weighted level.
    weights.iter().rposition(|weight| *weight > 0.0)
}

impl QueueSelector for WeightRandomSelector {
    fn select_queue(&mut self, stage_lists: &[Box<dyn StagingQueue>]) -> usize {
        if let Some(level) = draw(&mut self.rng, &self.weights) {
            if !stage_lists[level].is_empty() {
                return level;
            }
        }

        let masked: Vec<f64> = self
            .weights
            .iter()
            .zip(stage_lists.iter())
            .map(|(weight, queue)| if queue.is_empty() { 0.0 } else { *weight })
            .collect();

        draw(&mut self.rng, &masked).unwrap_or(0)
    }
}

/// Round-robin with per-level quotas.
///
/// The order vector encodes "serve level 0 `orders[0]` times, level 1
/// `orders[1]` times, ..., repeat". `cross` is the current level, `curr` the
/// 1-based count served at it. Both cursors are owned by the selector
/// instance.
pub struct ZipSelector {
    orders: Vec<u32>,
    cross: usize,
    curr: u32,
}

impl ZipSelector {
    /// Creates a selector positioned at level 0.
    #[must_use]
    pub fn new(orders: Vec<u32>) -> Self {
        Self {
            orders,
            cross: 0,
            curr: 1,
        }
    }
}

impl QueueSelector for ZipSelector {
    fn select_queue(&mut self, stage_lists: &[Box<dyn StagingQueue>]) -> usize {
        let total = self.orders.len();

        if stage_lists[self.cross].is_empty() {
            // Pre-advance to the next non-empty level, wrapping at most once.
            let start = self.cross;
            loop {
                self.cross = (self.cross + 1) % total;
                if self.cross == start {
                    // Everything is empty; the caller detects it.
                    self.curr = 1;
                    return start;
                }
                if !stage_lists[self.cross].is_empty() {
                    break;
                }
            }

            self.curr = if self.orders[self.cross] > 1 { 2 } else { 1 };
            return self.cross;
        }

        let level = self.cross;
        self.curr += 1;
        if self.curr > self.orders[level] {
            self.cross = (self.cross + 1) % total;
            self.curr = 1;
        }

        level
    }
}
