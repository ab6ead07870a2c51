//! Row and value representations shared by readers, samplers, and writers.

use indexmap::IndexMap;

/// An ordered mapping from column name to value.
///
/// Column order is established by the reader and preserved through to
/// writers that honor ordering (CSV, SQL).
pub type Row = IndexMap<String, Value>;

/// A single cell value.
///
/// `Raw` holds an opaque serialized form, used by nested-object
/// flattening to carry arrays through the pipeline as text.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Raw(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render the value as text. Null renders as the empty string.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Text(s) => s.clone(),
            Value::Raw(s) => s.clone(),
        }
    }

    /// Coerce to a float where possible: native numerics directly,
    /// text via parsing. Everything else is not numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Convert a JSON scalar into a value. Arrays and objects are the
    /// caller's concern (the JSONL reader flattens objects and
    /// serializes arrays into `Raw` before reaching here).
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => Value::Raw(other.to_string()),
        }
    }

    /// Convert into a JSON value for the JSONL writer. `Raw` stays a
    /// string so round-trips match what the flattener produced.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Bool(b) => serde_json::Value::from(*b),
            Value::Text(s) => serde_json::Value::from(s.clone()),
            Value::Raw(s) => serde_json::Value::from(s.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        assert_eq!(Value::Null.render(), "");
        assert_eq!(Value::Int(-3).render(), "-3");
        assert_eq!(Value::Bool(true).render(), "true");
        assert_eq!(Value::Text("hi".into()).render(), "hi");
    }

    #[test]
    fn test_as_f64_parses_text() {
        assert_eq!(Value::Text(" 2.5 ".into()).as_f64(), Some(2.5));
        assert_eq!(Value::Text("abc".into()).as_f64(), None);
        assert_eq!(Value::Int(7).as_f64(), Some(7.0));
        assert_eq!(Value::Bool(true).as_f64(), None);
    }

    #[test]
    fn test_json_round_trip() {
        let json: serde_json::Value = serde_json::from_str(r#"{"a": 1, "b": "x"}"#).unwrap();
        assert_eq!(Value::from_json(&json["a"]), Value::Int(1));
        assert_eq!(Value::from_json(&json["b"]), Value::Text("x".into()));
        assert_eq!(Value::Int(1).to_json(), json["a"]);
    }
}
