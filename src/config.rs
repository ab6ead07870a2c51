//! Sampler configuration: strategy selection, profiles, and the
//! overlay of on-disk configuration documents.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::privacy::{Mask, MaskParams, PrivacyRule};

/// Sampling strategy tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    Random,
    Stratified,
    TimeAware,
    OutlierAware,
    Composite,
}

impl SamplingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SamplingMode::Random => "random",
            SamplingMode::Stratified => "stratified",
            SamplingMode::TimeAware => "time_aware",
            SamplingMode::OutlierAware => "outlier_aware",
            SamplingMode::Composite => "composite",
        }
    }
}

impl std::str::FromStr for SamplingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "random" => Ok(SamplingMode::Random),
            "stratified" => Ok(SamplingMode::Stratified),
            "time_aware" => Ok(SamplingMode::TimeAware),
            "outlier_aware" => Ok(SamplingMode::OutlierAware),
            "composite" => Ok(SamplingMode::Composite),
            other => Err(Error::invalid_config(format!(
                "Unknown sampling mode: {other}. \
                 Use: random, stratified, time_aware, outlier_aware, composite"
            ))),
        }
    }
}

impl std::fmt::Display for SamplingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration driving one sampling run.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub mode: SamplingMode,
    /// Target number of rows in the emitted sample. Must be at least 1.
    pub target_rows: usize,
    /// Key columns: strata for stratified, the time column (first entry)
    /// for time_aware, the tracked numeric columns for outlier_aware.
    pub key_columns: Vec<String>,
    pub privacy_rules: Vec<PrivacyRule>,
    /// Seed for the run's RNG; absent means system randomness.
    pub seed: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            mode: SamplingMode::Random,
            target_rows: 1000,
            key_columns: Vec::new(),
            privacy_rules: Vec::new(),
            seed: None,
        }
    }
}

impl SamplerConfig {
    /// Validate invariants that must hold before any output is produced.
    pub fn validate(&self) -> Result<()> {
        if self.target_rows < 1 {
            return Err(Error::invalid_config("target_rows must be at least 1"));
        }
        if self.mode == SamplingMode::Stratified && self.key_columns.is_empty() {
            return Err(Error::invalid_config(
                "Stratified sampling requires at least one key column",
            ));
        }
        Ok(())
    }
}

/// Named configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    DebugSample,
    SchemaSample,
    SmokeTestSample,
    PrivacySample,
}

impl Profile {
    /// All presets, in the order they are documented.
    pub const ALL: [Profile; 4] = [
        Profile::DebugSample,
        Profile::SchemaSample,
        Profile::SmokeTestSample,
        Profile::PrivacySample,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::DebugSample => "debug_sample",
            Profile::SchemaSample => "schema_sample",
            Profile::SmokeTestSample => "smoke_test_sample",
            Profile::PrivacySample => "privacy_sample",
        }
    }

    /// One-line summary, rendered into the CLI's Profiles help section.
    pub fn description(&self) -> &'static str {
        match self {
            Profile::DebugSample => "Small random samples for debugging and manual inspection",
            Profile::SchemaSample => "Stratified coverage of distinct shapes and categories",
            Profile::SmokeTestSample => "Deterministic seeded samples for automated testing",
            Profile::PrivacySample => "Random samples with privacy masking supplied via --config",
        }
    }

    /// The preset's base configuration, before document and flag overlays.
    pub fn config(&self) -> SamplerConfig {
        match self {
            Profile::DebugSample => SamplerConfig::default(),
            Profile::SchemaSample => SamplerConfig {
                mode: SamplingMode::Stratified,
                target_rows: 100,
                ..SamplerConfig::default()
            },
            Profile::SmokeTestSample => SamplerConfig {
                target_rows: 100,
                seed: Some(42),
                ..SamplerConfig::default()
            },
            Profile::PrivacySample => SamplerConfig::default(),
        }
    }
}

impl std::str::FromStr for Profile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "debug_sample" => Ok(Profile::DebugSample),
            "schema_sample" => Ok(Profile::SchemaSample),
            "smoke_test_sample" => Ok(Profile::SmokeTestSample),
            "privacy_sample" => Ok(Profile::PrivacySample),
            other => Err(Error::invalid_config(format!(
                "Unknown profile: {other}. \
                 Use: debug_sample, schema_sample, smoke_test_sample, privacy_sample"
            ))),
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk configuration document (JSON or YAML). Fields overlay the
/// selected profile and are themselves overlaid by CLI flags.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigDocument {
    pub sampling_mode: Option<SamplingMode>,
    pub target_rows: Option<usize>,
    pub key_columns: Option<Vec<String>>,
    pub seed: Option<u64>,
    pub privacy_rules: Option<PrivacyRulesForm>,
}

impl ConfigDocument {
    /// Overlay this document onto a base configuration.
    pub fn apply(&self, config: &mut SamplerConfig) -> Result<()> {
        if let Some(mode) = self.sampling_mode {
            config.mode = mode;
        }
        if let Some(rows) = self.target_rows {
            config.target_rows = rows;
        }
        if let Some(ref cols) = self.key_columns {
            config.key_columns = cols.clone();
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(ref rules) = self.privacy_rules {
            config.privacy_rules = rules.build()?;
        }
        Ok(())
    }
}

/// Privacy rules as they may appear in a configuration document:
/// either a list of records, or a mapping from column name to a mask
/// kind string or a `{type, params}` object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PrivacyRulesForm {
    List(Vec<PrivacyRuleRecord>),
    Map(IndexMap<String, MaskForm>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrivacyRuleRecord {
    pub column: String,
    #[serde(default = "default_mask_type")]
    pub mask_type: String,
    #[serde(default)]
    pub mask_params: MaskParams,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MaskForm {
    Kind(String),
    Full {
        #[serde(rename = "type", default = "default_mask_type")]
        kind: String,
        #[serde(default)]
        params: MaskParams,
    },
}

fn default_mask_type() -> String {
    "redact".to_string()
}

impl PrivacyRulesForm {
    /// Validate and build the rule list. Unknown mask kinds or
    /// parameters fail here, before any output is produced.
    pub fn build(&self) -> Result<Vec<PrivacyRule>> {
        let mut rules = Vec::new();
        match self {
            PrivacyRulesForm::List(records) => {
                for record in records {
                    let mask = Mask::from_config(&record.mask_type, &record.mask_params)?;
                    rules.push(PrivacyRule::new(record.column.clone(), mask));
                }
            }
            PrivacyRulesForm::Map(map) => {
                for (column, spec) in map {
                    let mask = match spec {
                        MaskForm::Kind(kind) => Mask::from_config(kind, &MaskParams::new())?,
                        MaskForm::Full { kind, params } => Mask::from_config(kind, params)?,
                    };
                    rules.push(PrivacyRule::new(column.clone(), mask));
                }
            }
        }
        Ok(rules)
    }
}

/// Load a configuration document, dispatching on the file extension.
pub fn load_config_document(path: &Path) -> Result<ConfigDocument> {
    if !path.exists() {
        return Err(Error::InputMissing {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "json" => Ok(serde_json::from_str(&content)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(&content)?),
        other => Err(Error::invalid_config(format!(
            "Unknown configuration file extension: '{other}'. Use .json, .yaml, or .yml"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_profile_presets() {
        let debug = Profile::DebugSample.config();
        assert_eq!(debug.mode, SamplingMode::Random);
        assert_eq!(debug.target_rows, 1000);
        assert_eq!(debug.seed, None);

        let smoke = Profile::SmokeTestSample.config();
        assert_eq!(smoke.target_rows, 100);
        assert_eq!(smoke.seed, Some(42));

        let schema = Profile::SchemaSample.config();
        assert_eq!(schema.mode, SamplingMode::Stratified);
        assert_eq!(schema.target_rows, 100);
    }

    #[test]
    fn test_validate_rejects_zero_target() {
        let config = SamplerConfig {
            target_rows: 0,
            ..SamplerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_stratified_without_keys() {
        let config = SamplerConfig {
            mode: SamplingMode::Stratified,
            ..SamplerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_json_document() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"sampling_mode": "stratified", "target_rows": 50, "key_columns": ["status"], "seed": 7}}"#
        )
        .unwrap();
        file.flush().unwrap();

        let doc = load_config_document(file.path()).unwrap();
        let mut config = SamplerConfig::default();
        doc.apply(&mut config).unwrap();

        assert_eq!(config.mode, SamplingMode::Stratified);
        assert_eq!(config.target_rows, 50);
        assert_eq!(config.key_columns, vec!["status".to_string()]);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_load_yaml_document_with_rule_list() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            "target_rows: 25\nprivacy_rules:\n  - column: email\n    mask_type: hash\n  - column: name\n    mask_type: truncate\n    mask_params:\n      max_length: 2\n"
        )
        .unwrap();
        file.flush().unwrap();

        let doc = load_config_document(file.path()).unwrap();
        let mut config = SamplerConfig::default();
        doc.apply(&mut config).unwrap();

        assert_eq!(config.target_rows, 25);
        assert_eq!(config.privacy_rules.len(), 2);
        assert_eq!(config.privacy_rules[0].column, "email");
        assert_eq!(config.privacy_rules[0].mask.kind(), "hash");
        assert_eq!(
            config.privacy_rules[1].mask,
            crate::privacy::Mask::Truncate { max_length: 2 }
        );
    }

    #[test]
    fn test_privacy_rules_mapping_form() {
        let json = r#"{
            "privacy_rules": {
                "email": "hash",
                "age": {"type": "bucket", "params": {"bucket_size": 5}}
            }
        }"#;
        let doc: ConfigDocument = serde_json::from_str(json).unwrap();
        let rules = doc.privacy_rules.unwrap().build().unwrap();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].column, "email");
        assert_eq!(rules[0].mask.kind(), "hash");
        assert_eq!(rules[1].mask, crate::privacy::Mask::Bucket { bucket_size: 5 });
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "target_rows = 5").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            load_config_document(file.path()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unknown_mask_kind_fails_at_build() {
        let json = r#"{"privacy_rules": [{"column": "a", "mask_type": "rot13"}]}"#;
        let doc: ConfigDocument = serde_json::from_str(json).unwrap();
        assert!(doc.privacy_rules.unwrap().build().is_err());
    }

    #[test]
    fn test_sampling_mode_round_trip() {
        for s in ["random", "stratified", "time_aware", "outlier_aware", "composite"] {
            let mode: SamplingMode = s.parse().unwrap();
            assert_eq!(mode.to_string(), s);
        }
        assert!("jittered".parse::<SamplingMode>().is_err());
    }
}
