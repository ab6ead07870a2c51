//! Manifest sidecar: a JSON document describing one sampling run,
//! written next to the output as `<stem>.dnuds.json`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::SamplerConfig;
use crate::error::Result;
use crate::profiling::{ColumnStats, MANIFEST_TOP_VALUES};

/// Engine version recorded in every manifest.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The manifest document. Field order matches the emitted JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub dnuds_version: String,
    /// UTC ISO-8601 with a trailing `Z`.
    pub timestamp: String,
    pub input_path: String,
    pub output_path: String,
    pub input_format: String,
    pub output_format: String,
    pub sampling_mode: String,
    pub target_rows: usize,
    pub actual_rows: usize,
    pub key_columns: Vec<String>,
    pub seed: Option<u64>,
    pub columns: Vec<String>,
    pub column_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_stats: Option<IndexMap<String, ColumnStatsEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy_rules: Option<Vec<PrivacyRuleEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnStatsEntry {
    pub type_guess: String,
    pub null_count: u64,
    pub total_count: u64,
    pub unique_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    /// Top values as `[value, count]` pairs, most frequent first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_values: Option<Vec<(String, u64)>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyRuleEntry {
    pub column: String,
    pub mask_type: String,
    pub mask_params: serde_json::Value,
}

/// Sidecar path for an output file: `<stem>.dnuds.json` in the same
/// directory.
pub fn manifest_path(output_path: &Path) -> PathBuf {
    let stem = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sample".to_string());
    match output_path.parent() {
        Some(parent) => parent.join(format!("{stem}.dnuds.json")),
        None => PathBuf::from(format!("{stem}.dnuds.json")),
    }
}

/// Assemble and write the manifest. Returns the sidecar path.
#[allow(clippy::too_many_arguments)]
pub fn write_manifest(
    input_path: &Path,
    output_path: &Path,
    config: &SamplerConfig,
    input_format: &str,
    output_format: &str,
    columns: &[String],
    actual_rows: usize,
    stats: Option<&IndexMap<String, ColumnStats>>,
) -> Result<PathBuf> {
    let path = manifest_path(output_path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let column_stats = stats.map(|stats| {
        stats
            .iter()
            .map(|(name, s)| (name.clone(), stats_entry(s)))
            .collect()
    });

    let privacy_rules = if config.privacy_rules.is_empty() {
        None
    } else {
        Some(
            config
                .privacy_rules
                .iter()
                .map(|rule| PrivacyRuleEntry {
                    column: rule.column.clone(),
                    mask_type: rule.mask.kind().to_string(),
                    mask_params: rule.mask.params_json(),
                })
                .collect(),
        )
    };

    let manifest = Manifest {
        dnuds_version: ENGINE_VERSION.to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        input_path: absolute_display(input_path),
        output_path: absolute_display(output_path),
        input_format: input_format.to_string(),
        output_format: output_format.to_string(),
        sampling_mode: config.mode.to_string(),
        target_rows: config.target_rows,
        actual_rows,
        key_columns: config.key_columns.clone(),
        seed: config.seed,
        columns: columns.to_vec(),
        column_count: columns.len(),
        column_stats,
        privacy_rules,
    };

    fs::write(&path, serde_json::to_string_pretty(&manifest)?)?;
    Ok(path)
}

/// Parse a previously written sidecar.
pub fn read_manifest(path: &Path) -> Result<Manifest> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn stats_entry(stats: &ColumnStats) -> ColumnStatsEntry {
    let top_values = if stats.top_values.is_empty() {
        None
    } else {
        Some(
            stats
                .top_values
                .iter()
                .take(MANIFEST_TOP_VALUES)
                .map(|(value, count)| (value.clone(), *count))
                .collect(),
        )
    };

    ColumnStatsEntry {
        type_guess: stats.type_guess.to_string(),
        null_count: stats.null_count,
        total_count: stats.total_count,
        unique_count: stats.unique_count,
        min_value: stats.min_value,
        max_value: stats.max_value,
        top_values,
    }
}

fn absolute_display(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SamplingMode;
    use crate::profiling::collect_stats;
    use crate::value::{Row, Value};

    #[test]
    fn test_manifest_path_shape() {
        assert_eq!(
            manifest_path(Path::new("/tmp/out.csv")),
            PathBuf::from("/tmp/out.dnuds.json")
        );
        assert_eq!(
            manifest_path(Path::new("sample.jsonl")),
            PathBuf::from("sample.dnuds.json")
        );
    }

    #[test]
    fn test_write_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");
        std::fs::write(&output, "id\n1\n").unwrap();

        let config = SamplerConfig {
            mode: SamplingMode::Random,
            target_rows: 5,
            seed: Some(42),
            ..SamplerConfig::default()
        };

        let mut row = Row::new();
        row.insert("id".to_string(), Value::Int(1));
        let columns = vec!["id".to_string()];
        let stats = collect_stats([&row], &columns, 10);

        let path = write_manifest(
            Path::new("in.csv"),
            &output,
            &config,
            "csv",
            "csv",
            &columns,
            1,
            Some(&stats),
        )
        .unwrap();

        assert_eq!(path, dir.path().join("out.dnuds.json"));
        let manifest = read_manifest(&path).unwrap();

        assert_eq!(manifest.dnuds_version, ENGINE_VERSION);
        assert!(manifest.timestamp.ends_with('Z'));
        assert_eq!(manifest.sampling_mode, "random");
        assert_eq!(manifest.target_rows, 5);
        assert_eq!(manifest.actual_rows, 1);
        assert_eq!(manifest.seed, Some(42));
        assert_eq!(manifest.column_count, 1);

        let stats = manifest.column_stats.unwrap();
        let id = &stats["id"];
        assert_eq!(id.type_guess, "integer");
        assert_eq!(id.total_count, 1);
        assert_eq!(id.top_values.as_ref().unwrap()[0], ("1".to_string(), 1));
    }

    #[test]
    fn test_privacy_rules_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.jsonl");

        let config = SamplerConfig {
            privacy_rules: vec![crate::privacy::PrivacyRule::new(
                "email",
                crate::privacy::Mask::Hash {
                    algorithm: crate::privacy::HashAlgorithm::Sha256,
                },
            )],
            ..SamplerConfig::default()
        };

        let path = write_manifest(
            Path::new("in.jsonl"),
            &output,
            &config,
            "jsonl",
            "jsonl",
            &[],
            0,
            None,
        )
        .unwrap();

        let manifest = read_manifest(&path).unwrap();
        let rules = manifest.privacy_rules.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].column, "email");
        assert_eq!(rules[0].mask_type, "hash");
        assert_eq!(rules[0].mask_params["algorithm"], "sha256");
        assert!(manifest.column_stats.is_none());
    }
}
