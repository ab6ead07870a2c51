//! Single-pass column profiling: type inference and value statistics.

mod infer;
mod stats;

pub use infer::{infer_column_type, infer_type, TypeGuess};
pub use stats::{collect_stats, ColumnStats, COLLECT_TOP_VALUES, MANIFEST_TOP_VALUES};
