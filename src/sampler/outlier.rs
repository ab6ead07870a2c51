//! Outlier-preserving sampling: rows carrying the minimum or maximum of
//! each tracked numeric column always survive.

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use ahash::AHashSet;

use crate::config::SamplerConfig;
use crate::error::Result;
use crate::sampler::{collect_rows, rng_for_seed, Sampler};
use crate::value::Row;

#[derive(Debug, Clone, Copy)]
struct Extremes {
    min: f64,
    min_index: usize,
    max: f64,
    max_index: usize,
}

pub struct OutlierSampler {
    target: usize,
    /// Columns to track; empty means every column.
    outlier_columns: Vec<String>,
    rng: StdRng,
}

impl OutlierSampler {
    pub fn new(config: &SamplerConfig) -> Self {
        Self {
            target: config.target_rows,
            outlier_columns: config.key_columns.clone(),
            rng: rng_for_seed(config.seed),
        }
    }
}

impl Sampler for OutlierSampler {
    fn sample(
        &mut self,
        rows: &mut dyn Iterator<Item = Result<Row>>,
        columns: &[String],
    ) -> Result<Vec<Row>> {
        let rows = collect_rows(rows)?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let tracked: Vec<String> = if self.outlier_columns.is_empty() {
            columns.to_vec()
        } else {
            self.outlier_columns.clone()
        };

        let mut extremes: IndexMap<String, Extremes> = IndexMap::new();
        for (index, row) in rows.iter().enumerate() {
            for column in &tracked {
                let numeric = match row.get(column).and_then(|v| v.as_f64()) {
                    Some(n) => n,
                    None => continue,
                };
                match extremes.get_mut(column) {
                    None => {
                        extremes.insert(
                            column.clone(),
                            Extremes {
                                min: numeric,
                                min_index: index,
                                max: numeric,
                                max_index: index,
                            },
                        );
                    }
                    Some(e) => {
                        if numeric < e.min {
                            e.min = numeric;
                            e.min_index = index;
                        }
                        if numeric > e.max {
                            e.max = numeric;
                            e.max_index = index;
                        }
                    }
                }
            }
        }

        if rows.len() <= self.target {
            return Ok(rows);
        }

        // Union of extreme-carrying rows, deduplicated by arrival index.
        let mut outlier_set: AHashSet<usize> = AHashSet::new();
        let mut selected: Vec<usize> = Vec::new();
        for e in extremes.values() {
            for index in [e.min_index, e.max_index] {
                if outlier_set.insert(index) {
                    selected.push(index);
                }
            }
        }

        // Fill the rest of the budget uniformly from the non-outliers.
        let remainder = self.target.saturating_sub(selected.len());
        if remainder > 0 {
            let pool: Vec<usize> = (0..rows.len())
                .filter(|i| !outlier_set.contains(i))
                .collect();
            let count = remainder.min(pool.len());
            if count > 0 {
                for pick in rand::seq::index::sample(&mut self.rng, pool.len(), count).into_vec() {
                    selected.push(pool[pick]);
                }
            }
        }

        let mut sampled: Vec<Row> = selected.into_iter().map(|i| rows[i].clone()).collect();
        sampled.shuffle(&mut self.rng);
        sampled.truncate(self.target);
        Ok(sampled)
    }
}
