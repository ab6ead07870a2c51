//! Sampling strategies.
//!
//! Every sampler consumes a row stream of unknown cardinality and
//! yields at most `target_rows` rows. The per-run RNG is the sole
//! source of nondeterminism: with a seed configured, the emitted
//! sequence is a deterministic function of input and configuration.

mod composite;
mod outlier;
mod reservoir;
mod stratified;
mod time_aware;

pub use composite::CompositeSampler;
pub use outlier::OutlierSampler;
pub use reservoir::{RandomSampler, Reservoir};
pub use stratified::StratifiedSampler;
pub use time_aware::TimeSampler;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{SamplerConfig, SamplingMode};
use crate::error::Result;
use crate::value::Row;

/// Strategy contract: consume the upstream rows, return a bounded
/// sample. Only `random` is streaming; the others buffer the input.
pub trait Sampler {
    fn sample(
        &mut self,
        rows: &mut dyn Iterator<Item = Result<Row>>,
        columns: &[String],
    ) -> Result<Vec<Row>>;
}

/// Construct the sampler for a configuration.
///
/// The composite strategy chains outlier -> time -> random, each
/// constructed with the same target so later stages thin the stream
/// further.
pub fn build(config: &SamplerConfig) -> Result<Box<dyn Sampler>> {
    match config.mode {
        SamplingMode::Random => Ok(Box::new(RandomSampler::new(config))),
        SamplingMode::Stratified => Ok(Box::new(StratifiedSampler::new(config)?)),
        SamplingMode::TimeAware => Ok(Box::new(TimeSampler::new(config))),
        SamplingMode::OutlierAware => Ok(Box::new(OutlierSampler::new(config))),
        SamplingMode::Composite => {
            let stages: Vec<Box<dyn Sampler>> = vec![
                Box::new(OutlierSampler::new(config)),
                Box::new(TimeSampler::new(config)),
                Box::new(RandomSampler::new(config)),
            ];
            Ok(Box::new(CompositeSampler::new(stages)))
        }
    }
}

pub(crate) fn rng_for_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => rand::make_rng::<StdRng>(),
    }
}

/// Drain the upstream into a buffer, surfacing the first read error.
pub(crate) fn collect_rows(rows: &mut dyn Iterator<Item = Result<Row>>) -> Result<Vec<Row>> {
    let mut buffered = Vec::new();
    for row in rows {
        buffered.push(row?);
    }
    Ok(buffered)
}

/// Adapt an owned buffer back into the sampler input shape.
pub(crate) fn buffered_rows(rows: Vec<Row>) -> impl Iterator<Item = Result<Row>> {
    rows.into_iter().map(Ok)
}
