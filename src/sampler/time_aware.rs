//! Time-segmented sampling: coverage from the early, middle, and late
//! thirds of the (time-ordered) input.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use sha2::{Digest, Sha256};

use crate::config::SamplerConfig;
use crate::error::Result;
use crate::sampler::{collect_rows, rng_for_seed, Sampler};
use crate::value::Row;

pub struct TimeSampler {
    target: usize,
    time_column: Option<String>,
    rng: StdRng,
}

impl TimeSampler {
    pub fn new(config: &SamplerConfig) -> Self {
        Self {
            target: config.target_rows,
            time_column: config.key_columns.first().cloned(),
            rng: rng_for_seed(config.seed),
        }
    }

    /// The row's position on the time axis: the time column's numeric
    /// value when it parses, a stable hash of its text rendering when
    /// it does not, and the arrival index when the column is absent.
    fn timestamp(&self, row: &Row, arrival_index: usize) -> f64 {
        if let Some(column) = &self.time_column {
            if let Some(value) = row.get(column) {
                if !value.is_null() {
                    if let Some(numeric) = value.as_f64() {
                        return numeric;
                    }
                    return stable_text_hash(&value.render()) as f64;
                }
            }
        }
        arrival_index as f64
    }
}

/// First eight bytes of the SHA-256 digest, so ordering by hashed text
/// is identical across runs and platforms.
fn stable_text_hash(text: &str) -> u64 {
    let digest = Sha256::digest(text.as_bytes());
    u64::from_be_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ])
}

impl Sampler for TimeSampler {
    fn sample(
        &mut self,
        rows: &mut dyn Iterator<Item = Result<Row>>,
        _columns: &[String],
    ) -> Result<Vec<Row>> {
        let rows = collect_rows(rows)?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut ordered: Vec<(f64, usize)> = rows
            .iter()
            .enumerate()
            .map(|(index, row)| (self.timestamp(row, index), index))
            .collect();
        ordered.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let total = ordered.len();
        if total <= self.target {
            return Ok(ordered.into_iter().map(|(_, i)| rows[i].clone()).collect());
        }

        // Contiguous thirds; remainder rows land in the late segment.
        let third = total / 3;
        let segments = [
            &ordered[..third],
            &ordered[third..2 * third],
            &ordered[2 * third..],
        ];

        // Base quota per segment, leftover granted one per segment in
        // early -> middle -> late order.
        let base = self.target / 3;
        let leftover = self.target % 3;
        let quotas = [
            base + usize::from(leftover >= 1),
            base + usize::from(leftover >= 2),
            base,
        ];

        let mut sampled: Vec<Row> = Vec::with_capacity(self.target);
        for (segment, &quota) in segments.iter().zip(quotas.iter()) {
            let count = quota.min(segment.len());
            if count == 0 {
                continue;
            }
            for pick in rand::seq::index::sample(&mut self.rng, segment.len(), count).into_vec() {
                let (_, row_index) = segment[pick];
                sampled.push(rows[row_index].clone());
            }
        }

        sampled.shuffle(&mut self.rng);
        sampled.truncate(self.target);
        Ok(sampled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SamplerConfig, SamplingMode};
    use crate::sampler::buffered_rows;
    use crate::value::Value;

    fn indexed_rows(n: usize) -> Vec<Row> {
        (0..n)
            .map(|i| {
                let mut row = Row::new();
                row.insert("id".to_string(), Value::Int(i as i64));
                row
            })
            .collect()
    }

    fn config(target: usize, seed: u64, key: Option<&str>) -> SamplerConfig {
        SamplerConfig {
            mode: SamplingMode::TimeAware,
            target_rows: target,
            key_columns: key.map(|k| vec![k.to_string()]).unwrap_or_default(),
            seed: Some(seed),
            ..SamplerConfig::default()
        }
    }

    fn id_of(row: &Row) -> i64 {
        match &row["id"] {
            Value::Int(i) => *i,
            _ => panic!("expected int id"),
        }
    }

    #[test]
    fn test_one_row_per_third() {
        let mut sampler = TimeSampler::new(&config(3, 7, None));
        let out = sampler
            .sample(&mut buffered_rows(indexed_rows(9)), &[])
            .unwrap();

        assert_eq!(out.len(), 3);
        let ids: Vec<i64> = out.iter().map(id_of).collect();
        assert!(ids.iter().any(|&i| i < 3), "early third missing: {ids:?}");
        assert!(
            ids.iter().any(|&i| (3..6).contains(&i)),
            "middle third missing: {ids:?}"
        );
        assert!(ids.iter().any(|&i| i >= 6), "late third missing: {ids:?}");
    }

    #[test]
    fn test_leftover_goes_early_then_middle() {
        // target 5 over 30 rows: quotas 2, 2, 1.
        let mut sampler = TimeSampler::new(&config(5, 11, None));
        let out = sampler
            .sample(&mut buffered_rows(indexed_rows(30)), &[])
            .unwrap();

        assert_eq!(out.len(), 5);
        let early = out.iter().filter(|r| id_of(r) < 10).count();
        let middle = out.iter().filter(|r| (10..20).contains(&id_of(r))).count();
        let late = out.iter().filter(|r| id_of(r) >= 20).count();
        assert_eq!((early, middle, late), (2, 2, 1));
    }

    #[test]
    fn test_sorts_by_numeric_key_column() {
        // Timestamps in reverse arrival order.
        let mut rows = Vec::new();
        for i in 0..9 {
            let mut row = Row::new();
            row.insert("id".to_string(), Value::Int(i));
            row.insert("ts".to_string(), Value::Int(100 - i));
            rows.push(row);
        }

        let mut sampler = TimeSampler::new(&config(3, 3, Some("ts")));
        let out = sampler.sample(&mut buffered_rows(rows), &[]).unwrap();

        // Ids 6..9 carry the smallest timestamps, so the early third is
        // ids 6, 7, 8.
        assert!(out.iter().any(|r| id_of(r) >= 6));
    }

    #[test]
    fn test_small_input_returned_in_time_order() {
        let mut rows = Vec::new();
        for &ts in &[30, 10, 20] {
            let mut row = Row::new();
            row.insert("ts".to_string(), Value::Int(ts));
            rows.push(row);
        }

        let mut sampler = TimeSampler::new(&config(10, 1, Some("ts")));
        let out = sampler.sample(&mut buffered_rows(rows), &[]).unwrap();

        let ts: Vec<_> = out.iter().map(|r| r["ts"].clone()).collect();
        assert_eq!(ts, vec![Value::Int(10), Value::Int(20), Value::Int(30)]);
    }

    #[test]
    fn test_text_timestamps_are_stable() {
        assert_eq!(stable_text_hash("abc"), stable_text_hash("abc"));
        assert_ne!(stable_text_hash("abc"), stable_text_hash("abd"));
    }

    #[test]
    fn test_deterministic_for_seed() {
        let run = || {
            let mut sampler = TimeSampler::new(&config(4, 21, None));
            sampler
                .sample(&mut buffered_rows(indexed_rows(40)), &[])
                .unwrap()
        };
        assert_eq!(run(), run());
    }
}
