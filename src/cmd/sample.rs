//! Sample command handler: overlays profile, config document, and
//! flags, then hands off to the engine.

use std::path::PathBuf;

use crate::config::{self, Profile};
use crate::engine::{self, EngineConfig};
use crate::formats::{Format, TabularOptions};

/// Parsed flag values for the sample subcommand.
pub struct SampleArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: Option<String>,
    pub delimiter: Option<String>,
    pub quote: Option<String>,
    pub header: bool,
    pub no_header: bool,
    pub log_pattern: Option<String>,
    pub log_columns: Vec<String>,
    pub profile: String,
    pub rows: Option<usize>,
    pub key_columns: Vec<String>,
    pub sampling_mode: Option<String>,
    pub seed: Option<u64>,
    pub config_file: Option<PathBuf>,
    pub table: Option<String>,
    pub log_template: Option<String>,
    pub progress: bool,
}

pub fn run(args: SampleArgs) -> anyhow::Result<()> {
    let profile: Profile = args.profile.parse()?;
    let mut sampler_config = profile.config();

    // Overlay order: profile < config document < CLI flags.
    if let Some(path) = &args.config_file {
        let document = config::load_config_document(path)?;
        document.apply(&mut sampler_config)?;
    }

    if let Some(rows) = args.rows {
        sampler_config.target_rows = rows;
    }
    if !args.key_columns.is_empty() {
        sampler_config.key_columns = args.key_columns;
    }
    if let Some(seed) = args.seed {
        sampler_config.seed = Some(seed);
    }
    if let Some(mode) = args.sampling_mode {
        sampler_config.mode = mode.parse()?;
    }

    let format: Option<Format> = match args.format {
        Some(f) => Some(f.parse()?),
        None => None,
    };

    let csv = TabularOptions {
        delimiter: args
            .delimiter
            .as_deref()
            .map(|v| parse_char_flag(v, "delimiter"))
            .transpose()?,
        quote: args
            .quote
            .as_deref()
            .map(|v| parse_char_flag(v, "quote"))
            .transpose()?,
        has_header: match (args.header, args.no_header) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        },
    };

    let engine_config = EngineConfig {
        input: args.input.clone(),
        output: args.output,
        format,
        sampler: sampler_config,
        table: args.table,
        csv,
        log_pattern: args.log_pattern,
        log_columns: if args.log_columns.is_empty() {
            None
        } else {
            Some(args.log_columns)
        },
        log_template: args.log_template,
        progress: args.progress,
    };

    eprintln!(
        "Sampling {} -> {}...",
        args.input.display(),
        engine_config.output.display()
    );

    let result = engine::run(&engine_config)?;

    eprintln!(
        "Successfully sampled {} rows to {}",
        result.row_count,
        result.output_path.display()
    );
    eprintln!("Manifest: {}", result.manifest_path.display());

    Ok(())
}

/// A delimiter/quote flag value: one ASCII character, or "tab".
fn parse_char_flag(value: &str, flag: &str) -> anyhow::Result<u8> {
    if value.eq_ignore_ascii_case("tab") {
        return Ok(b'\t');
    }
    match value.as_bytes() {
        [byte] => Ok(*byte),
        _ => anyhow::bail!("--{flag} must be a single ASCII character or \"tab\""),
    }
}
