//! Uniform random sampling via a fixed-size reservoir (Algorithm R).

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

use crate::config::SamplerConfig;
use crate::error::Result;
use crate::sampler::{rng_for_seed, Sampler};
use crate::value::Row;

/// Fixed-capacity reservoir over a stream of unknown length.
///
/// After the reservoir fills, the i-th incoming item replaces a random
/// slot with probability capacity/i, so every item seen has equal
/// probability of surviving.
#[derive(Debug)]
pub struct Reservoir<T> {
    capacity: usize,
    seen: usize,
    items: Vec<T>,
    rng: StdRng,
}

impl<T> Reservoir<T> {
    pub fn new(capacity: usize, rng: StdRng) -> Self {
        Self {
            capacity,
            seen: 0,
            items: Vec::with_capacity(capacity),
            rng,
        }
    }

    /// Offer one item to the reservoir.
    pub fn consider(&mut self, item: T) {
        if self.items.len() < self.capacity {
            self.items.push(item);
        } else {
            let slot = self.rng.random_range(0..=self.seen);
            if slot < self.capacity {
                self.items[slot] = item;
            }
        }
        self.seen += 1;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consume the reservoir, returning the sampled items in slot order.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Streaming single-pass random sampler.
///
/// Memory use is bounded by the target row count regardless of input
/// size. Fewer input rows than the target means all rows are emitted
/// in arrival order.
pub struct RandomSampler {
    target: usize,
    rng: StdRng,
}

impl RandomSampler {
    pub fn new(config: &SamplerConfig) -> Self {
        Self {
            target: config.target_rows,
            rng: rng_for_seed(config.seed),
        }
    }
}

impl Sampler for RandomSampler {
    fn sample(
        &mut self,
        rows: &mut dyn Iterator<Item = Result<Row>>,
        _columns: &[String],
    ) -> Result<Vec<Row>> {
        let mut reservoir = Reservoir::new(self.target, StdRng::from_rng(&mut self.rng));
        for row in rows {
            reservoir.consider(row?);
        }
        Ok(reservoir.into_items())
    }
}
