//! Type inference for cell values.
//!
//! Native tags are classified directly; text values are trimmed and
//! tested against a fixed ladder of parses (boolean, integer, float,
//! datetime patterns) before defaulting to string.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Datetime shapes recognized in text values, tested in order.
static DATETIME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}").unwrap(),
        Regex::new(r"^\d{4}-\d{2}-\d{2}").unwrap(),
        Regex::new(r"^\d{2}/\d{2}/\d{4}").unwrap(),
        Regex::new(r"^\d{2}-\d{2}-\d{4}").unwrap(),
    ]
});

/// The inferred type of a value or column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeGuess {
    String,
    Integer,
    Float,
    Boolean,
    Datetime,
    Unknown,
}

impl TypeGuess {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeGuess::String => "string",
            TypeGuess::Integer => "integer",
            TypeGuess::Float => "float",
            TypeGuess::Boolean => "boolean",
            TypeGuess::Datetime => "datetime",
            TypeGuess::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for TypeGuess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infer the type of a single value.
pub fn infer_type(value: &Value) -> TypeGuess {
    match value {
        Value::Null => TypeGuess::Unknown,
        Value::Bool(_) => TypeGuess::Boolean,
        Value::Int(_) => TypeGuess::Integer,
        Value::Float(_) => TypeGuess::Float,
        Value::Raw(_) => TypeGuess::String,
        Value::Text(s) => infer_text_type(s),
    }
}

fn infer_text_type(text: &str) -> TypeGuess {
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return TypeGuess::String;
    }

    // Boolean tokens win over the integer parse, so "1"/"0" count as booleans.
    if matches!(
        trimmed.to_lowercase().as_str(),
        "true" | "false" | "yes" | "no" | "1" | "0"
    ) {
        return TypeGuess::Boolean;
    }

    if trimmed.parse::<i64>().is_ok() {
        return TypeGuess::Integer;
    }

    if trimmed.parse::<f64>().is_ok() {
        return TypeGuess::Float;
    }

    if DATETIME_PATTERNS.iter().any(|p| p.is_match(trimmed)) {
        return TypeGuess::Datetime;
    }

    TypeGuess::String
}

/// Infer a column's type from a sample of its values.
///
/// Counts the per-value guesses over up to `sample_size` non-null
/// values and returns the modal tag; ties resolve to the tag seen
/// first. An empty (or all-null) sample is `Unknown`.
pub fn infer_column_type<'a>(
    values: impl IntoIterator<Item = &'a Value>,
    sample_size: usize,
) -> TypeGuess {
    let mut counts: Vec<(TypeGuess, usize)> = Vec::new();
    let mut seen = 0usize;

    for value in values {
        if value.is_null() {
            continue;
        }
        if seen >= sample_size {
            break;
        }
        seen += 1;

        let guess = infer_type(value);
        match counts.iter_mut().find(|(g, _)| *g == guess) {
            Some((_, n)) => *n += 1,
            None => counts.push((guess, 1)),
        }
    }

    counts
        .into_iter()
        .max_by_key(|&(_, n)| n)
        .map(|(g, _)| g)
        .unwrap_or(TypeGuess::Unknown)
}
