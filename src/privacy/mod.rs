//! Privacy masking for sampled rows.
//!
//! Each mask kind is a total function from one value to a replacement
//! value. Parameters are validated when rules are constructed, so mask
//! application itself cannot fail at row time.

use indexmap::IndexMap;
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::value::{Row, Value};

/// Hash algorithms supported by the `hash` mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha1,
    Md5,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Md5 => "md5",
        }
    }

    fn digest_hex(&self, text: &str) -> String {
        match self {
            HashAlgorithm::Sha256 => hex::encode(Sha256::digest(text.as_bytes())),
            HashAlgorithm::Sha1 => hex::encode(Sha1::digest(text.as_bytes())),
            HashAlgorithm::Md5 => hex::encode(Md5::digest(text.as_bytes())),
        }
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha1" => Ok(HashAlgorithm::Sha1),
            "md5" => Ok(HashAlgorithm::Md5),
            other => Err(Error::invalid_config(format!(
                "Unsupported hash algorithm: {other}. Use: sha256, sha1, md5"
            ))),
        }
    }
}

/// A validated mask with its resolved parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Mask {
    /// Lowercase hex digest of the rendered value; null becomes empty text.
    Hash { algorithm: HashAlgorithm },
    /// Always the token, null or not.
    Redact { token: String },
    /// Keep up to `max_length` characters, appending `...` when cut.
    Truncate { max_length: usize },
    /// Closed-open integer bucket label `start-end` for numeric values.
    Bucket { bucket_size: i64 },
}

/// Generic parameter mapping as it appears in configuration documents.
pub type MaskParams = IndexMap<String, serde_json::Value>;

impl Mask {
    /// Build a mask from its external form, validating kind and parameters.
    pub fn from_config(kind: &str, params: &MaskParams) -> Result<Mask> {
        match kind {
            "hash" => {
                let algorithm = match params.get("algorithm") {
                    Some(v) => param_str(v, "algorithm")?.parse()?,
                    None => HashAlgorithm::Sha256,
                };
                Ok(Mask::Hash { algorithm })
            }
            "redact" => {
                let token = match params.get("token") {
                    Some(v) => param_str(v, "token")?.to_string(),
                    None => "[REDACTED]".to_string(),
                };
                Ok(Mask::Redact { token })
            }
            "truncate" => {
                let max_length = match params.get("max_length") {
                    Some(v) => param_u64(v, "max_length")? as usize,
                    None => 4,
                };
                Ok(Mask::Truncate { max_length })
            }
            "bucket" => {
                let bucket_size = match params.get("bucket_size") {
                    Some(v) => param_u64(v, "bucket_size")? as i64,
                    None => 10,
                };
                if bucket_size < 1 {
                    return Err(Error::invalid_config("bucket_size must be at least 1"));
                }
                Ok(Mask::Bucket { bucket_size })
            }
            other => Err(Error::invalid_config(format!(
                "Unknown mask type: {other}. Use: hash, redact, truncate, bucket"
            ))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Mask::Hash { .. } => "hash",
            Mask::Redact { .. } => "redact",
            Mask::Truncate { .. } => "truncate",
            Mask::Bucket { .. } => "bucket",
        }
    }

    /// Resolved parameters, echoed into the manifest.
    pub fn params_json(&self) -> serde_json::Value {
        match self {
            Mask::Hash { algorithm } => serde_json::json!({"algorithm": algorithm.as_str()}),
            Mask::Redact { token } => serde_json::json!({"token": token}),
            Mask::Truncate { max_length } => serde_json::json!({"max_length": max_length}),
            Mask::Bucket { bucket_size } => serde_json::json!({"bucket_size": bucket_size}),
        }
    }

    /// Apply the mask to one value. Total: never fails.
    pub fn apply(&self, value: &Value) -> Value {
        match self {
            Mask::Hash { algorithm } => {
                if value.is_null() {
                    Value::Text(String::new())
                } else {
                    Value::Text(algorithm.digest_hex(&value.render()))
                }
            }
            Mask::Redact { token } => Value::Text(token.clone()),
            Mask::Truncate { max_length } => {
                if value.is_null() {
                    return Value::Text(String::new());
                }
                let text = value.render();
                if text.chars().count() <= *max_length {
                    Value::Text(text)
                } else {
                    let kept: String = text.chars().take(*max_length).collect();
                    Value::Text(format!("{kept}..."))
                }
            }
            Mask::Bucket { bucket_size } => match value.as_f64() {
                Some(n) => {
                    let start = (n / *bucket_size as f64).floor() as i64 * bucket_size;
                    let end = start + bucket_size - 1;
                    Value::Text(format!("{start}-{end}"))
                }
                None => Value::Text(String::new()),
            },
        }
    }
}

fn param_str<'a>(value: &'a serde_json::Value, name: &str) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| Error::invalid_config(format!("Mask parameter '{name}' must be a string")))
}

fn param_u64(value: &serde_json::Value, name: &str) -> Result<u64> {
    value
        .as_u64()
        .ok_or_else(|| Error::invalid_config(format!("Mask parameter '{name}' must be a non-negative integer")))
}

/// One column -> mask binding.
#[derive(Debug, Clone, PartialEq)]
pub struct PrivacyRule {
    pub column: String,
    pub mask: Mask,
}

impl PrivacyRule {
    pub fn new(column: impl Into<String>, mask: Mask) -> Self {
        Self {
            column: column.into(),
            mask,
        }
    }
}

/// Apply rules in order, replacing only named columns that are present.
/// Returns a new row; the source row is untouched.
pub fn apply_rules(row: &Row, rules: &[PrivacyRule]) -> Row {
    let mut masked = row.clone();
    for rule in rules {
        if let Some(value) = masked.get(&rule.column) {
            let replacement = rule.mask.apply(value);
            masked.insert(rule.column.clone(), replacement);
        }
    }
    masked
}
