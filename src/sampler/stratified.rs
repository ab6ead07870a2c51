//! Stratified sampling over a composite key.
//!
//! Guarantees a minimum presence for every stratum, then distributes
//! the remaining budget proportionally to leftover stratum capacity.

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::RngExt;

use crate::config::SamplerConfig;
use crate::error::{Error, Result};
use crate::sampler::{collect_rows, rng_for_seed, Sampler};
use crate::value::{Row, Value};

pub struct StratifiedSampler {
    target: usize,
    key_columns: Vec<String>,
    rng: StdRng,
}

impl StratifiedSampler {
    pub fn new(config: &SamplerConfig) -> Result<Self> {
        if config.key_columns.is_empty() {
            return Err(Error::invalid_config(
                "Stratified sampling requires at least one key column",
            ));
        }
        Ok(Self {
            target: config.target_rows,
            key_columns: config.key_columns.clone(),
            rng: rng_for_seed(config.seed),
        })
    }

    /// A row's stratum key: its key-column values rendered and joined
    /// with pipes. Null and missing values read as the literal `None`.
    fn stratum_key(&self, row: &Row) -> String {
        let parts: Vec<String> = self
            .key_columns
            .iter()
            .map(|col| match row.get(col) {
                None | Some(Value::Null) => "None".to_string(),
                Some(value) => value.render(),
            })
            .collect();
        parts.join("|")
    }
}

impl Sampler for StratifiedSampler {
    fn sample(
        &mut self,
        rows: &mut dyn Iterator<Item = Result<Row>>,
        _columns: &[String],
    ) -> Result<Vec<Row>> {
        let rows = collect_rows(rows)?;

        // Group arrival indices by stratum, preserving first-seen order
        // so seeded runs are reproducible.
        let mut strata: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (index, row) in rows.iter().enumerate() {
            strata.entry(self.stratum_key(row)).or_default().push(index);
        }

        let stratum_count = strata.len();
        if stratum_count == 0 {
            return Ok(Vec::new());
        }

        let target = self.target;
        let min_per_category = std::cmp::max(1, target / (stratum_count * 2));
        let max_per_category = std::cmp::max(
            min_per_category,
            target / std::cmp::max(1, stratum_count / 2),
        );

        let mut taken = vec![false; rows.len()];
        let mut taken_per_stratum = vec![0usize; stratum_count];
        let mut selected: Vec<usize> = Vec::with_capacity(target);
        let mut remaining = target;

        // First pass: minimum representation for every stratum.
        for (stratum_index, members) in strata.values().enumerate() {
            let count = min_per_category.min(members.len()).min(remaining);
            if count == 0 {
                continue;
            }
            for pick in rand::seq::index::sample(&mut self.rng, members.len(), count).into_vec() {
                let row_index = members[pick];
                taken[row_index] = true;
                selected.push(row_index);
            }
            taken_per_stratum[stratum_index] += count;
            remaining -= count;
        }

        // Second pass: fill remaining slots, weighting strata by what
        // they can still contribute. Strictly without replacement.
        while remaining > 0 {
            let capacities: Vec<usize> = strata
                .values()
                .enumerate()
                .map(|(i, members)| {
                    let available = members.len() - taken_per_stratum[i];
                    let headroom = max_per_category.saturating_sub(taken_per_stratum[i]);
                    available.min(headroom)
                })
                .collect();

            let total_capacity: usize = capacities.iter().sum();
            if total_capacity == 0 {
                break;
            }

            let mut draw = self.rng.random_range(0..total_capacity);
            let mut chosen = 0;
            for (i, &capacity) in capacities.iter().enumerate() {
                if draw < capacity {
                    chosen = i;
                    break;
                }
                draw -= capacity;
            }

            let members = &strata[chosen];
            let open: Vec<usize> = members
                .iter()
                .copied()
                .filter(|&index| !taken[index])
                .collect();
            let row_index = open[self.rng.random_range(0..open.len())];
            taken[row_index] = true;
            taken_per_stratum[chosen] += 1;
            selected.push(row_index);
            remaining -= 1;
        }

        let mut sampled: Vec<Row> = selected.into_iter().map(|i| rows[i].clone()).collect();
        sampled.shuffle(&mut self.rng);
        sampled.truncate(target);
        Ok(sampled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SamplerConfig, SamplingMode};
    use crate::sampler::buffered_rows;

    fn status_rows(ok: usize, err: usize) -> Vec<Row> {
        let mut rows = Vec::new();
        for i in 0..ok + err {
            let mut row = Row::new();
            row.insert("id".to_string(), Value::Int(i as i64));
            row.insert(
                "status".to_string(),
                Value::Text(if i < ok { "ok" } else { "err" }.to_string()),
            );
            rows.push(row);
        }
        rows
    }

    fn config(target: usize, seed: u64) -> SamplerConfig {
        SamplerConfig {
            mode: SamplingMode::Stratified,
            target_rows: target,
            key_columns: vec!["status".to_string()],
            seed: Some(seed),
            ..SamplerConfig::default()
        }
    }

    #[test]
    fn test_requires_key_columns() {
        let config = SamplerConfig {
            mode: SamplingMode::Stratified,
            ..SamplerConfig::default()
        };
        assert!(StratifiedSampler::new(&config).is_err());
    }

    #[test]
    fn test_each_stratum_represented() {
        let mut sampler = StratifiedSampler::new(&config(6, 1)).unwrap();
        let out = sampler
            .sample(&mut buffered_rows(status_rows(20, 10)), &[])
            .unwrap();

        assert_eq!(out.len(), 6);
        let ok = out
            .iter()
            .filter(|r| r["status"] == Value::Text("ok".into()))
            .count();
        let err = out.len() - ok;
        assert!(ok >= 1, "ok stratum missing");
        assert!(err >= 1, "err stratum missing");
    }

    #[test]
    fn test_no_duplicate_rows() {
        for seed in 0..20 {
            let mut sampler = StratifiedSampler::new(&config(25, seed)).unwrap();
            let out = sampler
                .sample(&mut buffered_rows(status_rows(20, 10)), &[])
                .unwrap();
            let mut ids: Vec<i64> = out
                .iter()
                .map(|r| match &r["id"] {
                    Value::Int(i) => *i,
                    _ => panic!("expected int id"),
                })
                .collect();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), out.len(), "seed {seed} produced duplicates");
        }
    }

    #[test]
    fn test_bounded_by_target() {
        let mut sampler = StratifiedSampler::new(&config(6, 3)).unwrap();
        let out = sampler
            .sample(&mut buffered_rows(status_rows(3, 1)), &[])
            .unwrap();
        assert!(out.len() <= 6);
        assert_eq!(out.len(), 4); // all rows fit under the target
    }

    #[test]
    fn test_null_key_forms_its_own_stratum() {
        let mut rows = status_rows(4, 0);
        let mut null_row = Row::new();
        null_row.insert("id".to_string(), Value::Int(99));
        null_row.insert("status".to_string(), Value::Null);
        rows.push(null_row);

        let mut sampler = StratifiedSampler::new(&config(4, 5)).unwrap();
        let out = sampler.sample(&mut buffered_rows(rows), &[]).unwrap();
        assert!(out.iter().any(|r| r["status"] == Value::Null));
    }

    #[test]
    fn test_deterministic_for_seed() {
        let run = |seed| {
            let mut sampler = StratifiedSampler::new(&config(6, seed)).unwrap();
            sampler
                .sample(&mut buffered_rows(status_rows(20, 10)), &[])
                .unwrap()
        };
        assert_eq!(run(9), run(9));
    }
}
