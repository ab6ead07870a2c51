//! Engine orchestrator: wires reader -> sampler -> privacy -> writer,
//! drives statistics over the emitted sample, and records the run in a
//! manifest sidecar.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use crate::config::SamplerConfig;
use crate::error::{Error, Result};
use crate::formats::{
    self, Format, FormatReader, FormatWriter, ReaderOptions, Rows, TabularOptions, WriterOptions,
};
use crate::manifest;
use crate::privacy;
use crate::profiling::{collect_stats, MANIFEST_TOP_VALUES};
use crate::sampler::{self, Sampler};
use crate::value::Row;

/// Bytes read from the input head for content-based format detection.
const DETECT_HINT_BYTES: usize = 4096;

/// One sampling run, start to finish.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Explicit format, applied to both input and output. When absent,
    /// each side is detected independently.
    pub format: Option<Format>,
    pub sampler: SamplerConfig,
    /// SQL table: filters INSERTs on the input side, names the emitted
    /// table on the output side.
    pub table: Option<String>,
    /// CSV dialect overrides; unset fields are sniffed.
    pub csv: TabularOptions,
    /// Log input: regex with capture groups for structured lines.
    pub log_pattern: Option<String>,
    /// Log input: column names for the pattern's capture groups.
    pub log_columns: Option<Vec<String>>,
    /// Log output: per-row format template.
    pub log_template: Option<String>,
    /// Print milestones and a row spinner to stderr.
    pub progress: bool,
}

impl EngineConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            format: None,
            sampler: SamplerConfig::default(),
            table: None,
            csv: TabularOptions::default(),
            log_pattern: None,
            log_columns: None,
            log_template: None,
            progress: false,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct SampleResult {
    pub output_path: PathBuf,
    pub row_count: usize,
    pub manifest_path: PathBuf,
}

/// Run the sampling pipeline.
///
/// Configuration errors surface before any output is produced. Reader
/// and writer are released on every exit path; a failure mid-stream
/// leaves no manifest behind, though a partial output file may exist.
pub fn run(config: &EngineConfig) -> Result<SampleResult> {
    if !config.input.exists() {
        return Err(Error::InputMissing {
            path: config.input.clone(),
        });
    }

    config.sampler.validate()?;

    let input_format = resolve_input_format(config)?;
    let output_format = match config.format {
        Some(format) => format,
        None => {
            formats::detect_format(&config.output, None).ok_or_else(|| Error::UnknownFormat {
                path: config.output.clone(),
            })?
        }
    };

    let mut sampler = sampler::build(&config.sampler)?;

    let reader_options = ReaderOptions {
        table: config.table.clone(),
        log_pattern: config.log_pattern.clone(),
        log_columns: config.log_columns.clone(),
        csv: config.csv,
    };
    let mut reader = formats::open_reader(&config.input, input_format, &reader_options)?;
    let columns = reader.columns()?;

    let writer_options = WriterOptions {
        table: config.table.clone(),
        log_template: config.log_template.clone(),
    };
    let mut writer = formats::create_writer(&config.output, output_format, &writer_options)?;

    let progress_bar = if config.progress {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} {human_pos} rows read {msg}").unwrap(),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        Some(bar)
    } else {
        None
    };

    let outcome = pump(
        reader.as_mut(),
        writer.as_mut(),
        sampler.as_mut(),
        &config.sampler,
        &columns,
        progress_bar.as_ref(),
    );

    // Release handles along both exit paths before touching the result.
    let flush_result = writer.finish();
    drop(writer);
    drop(reader);

    if let Some(bar) = &progress_bar {
        bar.finish_and_clear();
    }

    let sampled = outcome?;
    flush_result?;

    if config.progress {
        eprintln!("Sampled {} rows, computing statistics...", sampled.len());
    }

    let stats = collect_stats(sampled.iter(), &columns, MANIFEST_TOP_VALUES);

    let manifest_path = manifest::write_manifest(
        &config.input,
        &config.output,
        &config.sampler,
        input_format.as_str(),
        output_format.as_str(),
        &columns,
        sampled.len(),
        Some(&stats),
    )?;

    Ok(SampleResult {
        output_path: config.output.clone(),
        row_count: sampled.len(),
        manifest_path,
    })
}

/// Drive the sampled stream into the writer, buffering emitted rows for
/// post-hoc statistics. Privacy rules were validated at configuration
/// time, so masking cannot fail here.
fn pump(
    reader: &mut dyn FormatReader,
    writer: &mut dyn FormatWriter,
    sampler: &mut dyn Sampler,
    config: &SamplerConfig,
    columns: &[String],
    progress_bar: Option<&ProgressBar>,
) -> Result<Vec<Row>> {
    writer.write_header(columns)?;

    let sampled = {
        let mut upstream: Box<dyn Iterator<Item = Result<Row>> + '_> = Box::new(Rows::new(reader));
        if let Some(bar) = progress_bar {
            let bar = bar.clone();
            upstream = Box::new(upstream.inspect(move |_| bar.inc(1)));
        }
        sampler.sample(upstream.as_mut(), columns)?
    };

    let mut emitted = Vec::with_capacity(sampled.len());
    for row in sampled {
        let row = if config.privacy_rules.is_empty() {
            row
        } else {
            privacy::apply_rules(&row, &config.privacy_rules)
        };
        writer.write_row(&row)?;
        emitted.push(row);
    }

    Ok(emitted)
}

fn resolve_input_format(config: &EngineConfig) -> Result<Format> {
    if let Some(format) = config.format {
        return Ok(format);
    }
    if let Some(format) = formats::detect_format(&config.input, None) {
        return Ok(format);
    }

    // Unrecognized extension: fall back to a look at the leading bytes.
    let hint = read_head(&config.input).unwrap_or_default();
    formats::detect_format(&config.input, Some(&hint)).ok_or_else(|| Error::UnknownFormat {
        path: config.input.clone(),
    })
}

fn read_head(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; DETECT_HINT_BYTES];
    let n = file.read(&mut buf)?;
    buf.truncate(n);
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
