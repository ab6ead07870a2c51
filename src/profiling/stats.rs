//! Per-column statistics over the emitted sample.

use indexmap::IndexMap;

use crate::profiling::infer::{infer_column_type, TypeGuess};
use crate::value::{Row, Value};

/// Ceiling on top values retained per column; trim requests above this
/// are clamped.
pub const COLLECT_TOP_VALUES: usize = 50;
/// Maximum top values emitted into the manifest.
pub const MANIFEST_TOP_VALUES: usize = 10;

/// Values examined per column when inferring its type.
const TYPE_SAMPLE_SIZE: usize = 100;

/// Accumulated statistics for a single column.
#[derive(Debug, Clone)]
pub struct ColumnStats {
    pub name: String,
    pub type_guess: TypeGuess,
    pub total_count: u64,
    pub null_count: u64,
    pub unique_count: u64,
    /// Minimum over native numeric values, if any were seen.
    pub min_value: Option<f64>,
    /// Maximum over native numeric values, if any were seen.
    pub max_value: Option<f64>,
    /// Rendered value -> occurrence count, insertion-ordered.
    pub top_values: IndexMap<String, u64>,
}

impl ColumnStats {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_guess: TypeGuess::Unknown,
            total_count: 0,
            null_count: 0,
            unique_count: 0,
            min_value: None,
            max_value: None,
            top_values: IndexMap::new(),
        }
    }

    /// Fold one value into the running counts.
    pub fn update(&mut self, value: &Value) {
        self.total_count += 1;

        if value.is_null() {
            self.null_count += 1;
            return;
        }

        // Min/max track native numerics only; numeric-looking text is
        // left to type inference.
        let numeric = match value {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        };
        if let Some(n) = numeric {
            if self.min_value.map_or(true, |m| n < m) {
                self.min_value = Some(n);
            }
            if self.max_value.map_or(true, |m| n > m) {
                self.max_value = Some(n);
            }
        }

        *self.top_values.entry(value.render()).or_insert(0) += 1;
    }

    /// Reduce the frequency map to its `max_top` most frequent entries.
    /// Ties keep the earlier-inserted value.
    fn trim_top_values(&mut self, max_top: usize) {
        if self.top_values.len() <= max_top {
            return;
        }
        let mut entries: Vec<(String, u64)> = self.top_values.drain(..).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.truncate(max_top);
        self.top_values = entries.into_iter().collect();
    }
}

/// Collect statistics for the given columns over a stream of rows.
///
/// Type inference runs last, over the first values captured per column,
/// so the guess reflects the sample rather than a single row. At most
/// `COLLECT_TOP_VALUES` top values are retained per column, whatever
/// `max_top_values` asks for.
pub fn collect_stats<'a>(
    rows: impl IntoIterator<Item = &'a Row>,
    columns: &[String],
    max_top_values: usize,
) -> IndexMap<String, ColumnStats> {
    let max_top_values = max_top_values.min(COLLECT_TOP_VALUES);
    let mut stats: IndexMap<String, ColumnStats> = columns
        .iter()
        .map(|c| (c.clone(), ColumnStats::new(c.clone())))
        .collect();

    let mut type_samples: IndexMap<String, Vec<Value>> =
        columns.iter().map(|c| (c.clone(), Vec::new())).collect();

    for row in rows {
        for col in columns {
            let value = row.get(col).cloned().unwrap_or(Value::Null);
            if let Some(col_stats) = stats.get_mut(col) {
                col_stats.update(&value);
            }
            if let Some(samples) = type_samples.get_mut(col) {
                if !value.is_null() && samples.len() < TYPE_SAMPLE_SIZE {
                    samples.push(value);
                }
            }
        }
    }

    for (col, col_stats) in stats.iter_mut() {
        col_stats.unique_count = col_stats.top_values.len() as u64;
        if let Some(samples) = type_samples.get(col) {
            col_stats.type_guess = infer_column_type(samples.iter(), TYPE_SAMPLE_SIZE);
        }
        col_stats.trim_top_values(max_top_values);
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    fn row(pairs: Vec<(&str, Value)>) -> Row {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_counts_and_min_max() {
        let rows = vec![
            row(vec![("n", Value::Int(5))]),
            row(vec![("n", Value::Int(-2))]),
            row(vec![("n", Value::Null)]),
            row(vec![("n", Value::Int(5))]),
        ];
        let stats = collect_stats(rows.iter(), &["n".to_string()], 10);
        let n = &stats["n"];

        assert_eq!(n.total_count, 4);
        assert_eq!(n.null_count, 1);
        assert_eq!(n.unique_count, 2);
        assert_eq!(n.min_value, Some(-2.0));
        assert_eq!(n.max_value, Some(5.0));
        assert_eq!(n.type_guess, TypeGuess::Integer);
        assert_eq!(n.top_values, indexmap! {"5".to_string() => 2, "-2".to_string() => 1});
    }

    #[test]
    fn test_missing_column_counts_as_null() {
        let rows = vec![row(vec![("a", Value::Text("x".into()))])];
        let stats = collect_stats(rows.iter(), &["a".to_string(), "b".to_string()], 10);
        assert_eq!(stats["b"].null_count, 1);
        assert_eq!(stats["b"].type_guess, TypeGuess::Unknown);
    }

    #[test]
    fn test_top_values_trim_keeps_most_frequent() {
        let mut rows = Vec::new();
        for i in 0..6 {
            for _ in 0..=i {
                rows.push(row(vec![("v", Value::Int(i))]));
            }
        }
        let stats = collect_stats(rows.iter(), &["v".to_string()], 3);
        let v = &stats["v"];
        assert_eq!(v.unique_count, 6);
        assert_eq!(v.top_values.len(), 3);
        assert_eq!(v.top_values.get("5"), Some(&6));
        assert_eq!(v.top_values.get("0"), None);
    }

    #[test]
    fn test_collection_ceiling_clamps_requests() {
        let rows: Vec<Row> = (0..80)
            .map(|i| row(vec![("v", Value::Int(i))]))
            .collect();
        let stats = collect_stats(rows.iter(), &["v".to_string()], 1000);
        let v = &stats["v"];
        assert_eq!(v.unique_count, 80);
        assert_eq!(v.top_values.len(), COLLECT_TOP_VALUES);
    }

    #[test]
    fn test_text_numbers_do_not_set_min_max() {
        let rows = vec![row(vec![("v", Value::Text("10".into()))])];
        let stats = collect_stats(rows.iter(), &["v".to_string()], 10);
        assert_eq!(stats["v"].min_value, None);
    }
}
