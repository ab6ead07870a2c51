//! Command-line surface.

mod sample;

use clap::{Parser, Subcommand, ValueHint};
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::config::Profile;

const WORKFLOWS_HELP: &str = "\x1b[1mCommon workflows:\x1b[0m
  Sample 1000 rows from a CSV for debugging:
    dnuds sample data.csv sample.csv

  Deterministic sample for a regression suite:
    dnuds sample events.jsonl fixture.jsonl --profile smoke_test_sample --seed 42

  Stratified coverage across a status column:
    dnuds sample access.log sample.log --sampling-mode stratified --key-col status

  Sample one table out of a SQL dump into CSV:
    dnuds sample dump.sql users.csv --format sql --table users --rows 500";

fn after_help_text() -> String {
    let mut text = String::from(WORKFLOWS_HELP);
    text.push_str("\n\n\x1b[1mProfiles:\x1b[0m\n");
    for profile in Profile::ALL {
        let _ = writeln!(text, "  {:<18} {}", profile.as_str(), profile.description());
    }
    text
}

// Help heading constants for consistency
const INPUT_OUTPUT: &str = "Input/Output";
const MODE: &str = "Mode";
const BEHAVIOR: &str = "Behavior";
const OUTPUT: &str = "Output";

#[derive(Parser)]
#[command(name = "dnuds")]
#[command(version)]
#[command(about = "Universal data sampler: representative samples from CSV, JSONL, log, and SQL dump files")]
#[command(after_help = after_help_text())]
#[command(max_term_width = 100)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sample rows from an input file into an output file
    #[command(after_help = "\x1b[1mExamples:\x1b[0m
  dnuds sample input.csv output.csv --rows 2000
  dnuds sample dump.sql sample.csv --format sql --table users --seed 42
  dnuds sample data.txt out.txt --format csv --delimiter tab --no-header
  dnuds sample app.log errors.log --log-pattern '\\[(\\w+)\\]\\s+(.*)' --log-template '[{level}] {message}'
  dnuds sample events.jsonl masked.jsonl --profile privacy_sample --config privacy.yaml")]
    Sample {
        /// Path to the input file
        #[arg(value_hint = ValueHint::FilePath, help_heading = INPUT_OUTPUT)]
        input: PathBuf,

        /// Path to the output file (parent directories created on demand)
        #[arg(value_hint = ValueHint::FilePath, help_heading = INPUT_OUTPUT)]
        output: PathBuf,

        /// Format for both sides: csv, jsonl, log, sql (auto-detected if omitted)
        #[arg(short, long, help_heading = INPUT_OUTPUT)]
        format: Option<String>,

        /// CSV field delimiter: a single character or "tab" (sniffed if omitted)
        #[arg(long, value_name = "CHAR", help_heading = INPUT_OUTPUT)]
        delimiter: Option<String>,

        /// CSV quote character (sniffed if omitted)
        #[arg(long, value_name = "CHAR", help_heading = INPUT_OUTPUT)]
        quote: Option<String>,

        /// Treat the first CSV record as a header row
        #[arg(long, conflicts_with = "no_header", help_heading = INPUT_OUTPUT)]
        header: bool,

        /// Treat every CSV record as data (column names are synthesized)
        #[arg(long, help_heading = INPUT_OUTPUT)]
        no_header: bool,

        /// Regex with capture groups for structured log lines
        #[arg(long, value_name = "REGEX", help_heading = INPUT_OUTPUT)]
        log_pattern: Option<String>,

        /// Column name for a log pattern capture group (repeatable)
        #[arg(long = "log-col", value_name = "COL", help_heading = INPUT_OUTPUT)]
        log_columns: Vec<String>,

        /// Sampling profile: debug_sample, schema_sample, smoke_test_sample, privacy_sample
        #[arg(short, long, default_value = "debug_sample", help_heading = MODE)]
        profile: String,

        /// Target number of rows in the sample (overrides the profile default)
        #[arg(short, long, help_heading = MODE)]
        rows: Option<usize>,

        /// Key column for stratified/time/outlier sampling (repeatable)
        #[arg(long = "key-col", help_heading = MODE)]
        key_columns: Vec<String>,

        /// Sampling mode: random, stratified, time_aware, outlier_aware, composite
        #[arg(long, help_heading = MODE)]
        sampling_mode: Option<String>,

        /// Random seed for reproducible output
        #[arg(short, long, help_heading = MODE)]
        seed: Option<u64>,

        /// Configuration file (JSON or YAML) overlaying the profile
        #[arg(short, long, value_hint = ValueHint::FilePath, help_heading = BEHAVIOR)]
        config: Option<PathBuf>,

        /// SQL table: filters INSERTs on input, names the table on output
        #[arg(short, long, help_heading = BEHAVIOR)]
        table: Option<String>,

        /// Template for log output lines, e.g. "[{level}] {message}"
        #[arg(long, value_name = "TEMPLATE", help_heading = OUTPUT)]
        log_template: Option<String>,

        /// Show progress while sampling
        #[arg(long, help_heading = OUTPUT)]
        progress: bool,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Sample {
            input,
            output,
            format,
            delimiter,
            quote,
            header,
            no_header,
            log_pattern,
            log_columns,
            profile,
            rows,
            key_columns,
            sampling_mode,
            seed,
            config,
            table,
            log_template,
            progress,
        } => sample::run(sample::SampleArgs {
            input,
            output,
            format,
            delimiter,
            quote,
            header,
            no_header,
            log_pattern,
            log_columns,
            profile,
            rows,
            key_columns,
            sampling_mode,
            seed,
            config_file: config,
            table,
            log_template,
            progress,
        }),
    }
}
