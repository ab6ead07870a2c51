//! Format detection and the reader/writer abstraction.
//!
//! Heterogeneous inputs (delimited text, JSON-lines records, plain log
//! lines, SQL dump INSERTs) are funneled into one row shape so the
//! sampling pipeline never cares where rows came from.

mod jsonl;
mod logline;
mod sqldump;
mod tabular;

pub use jsonl::{JsonlReader, JsonlWriter};
pub use logline::{LogReader, LogWriter};
pub use sqldump::{SqlReader, SqlWriter};
pub use tabular::{TabularOptions, TabularReader, TabularWriter};

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::value::Row;

static INSERT_PROBE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)INSERT\s+INTO").unwrap());

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Jsonl,
    Log,
    Sql,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Jsonl => "jsonl",
            Format::Log => "log",
            Format::Sql => "sql",
        }
    }
}

impl std::str::FromStr for Format {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Format::Csv),
            "jsonl" => Ok(Format::Jsonl),
            "log" => Ok(Format::Log),
            "sql" => Ok(Format::Sql),
            other => Err(crate::error::Error::invalid_config(format!(
                "Unknown format: {other}. Use: csv, jsonl, log, sql"
            ))),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect a file's format from its extension, falling back to content
/// heuristics when a leading fragment is available.
pub fn detect_format(path: &Path, content_hint: Option<&str>) -> Option<Format> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => return Some(Format::Csv),
        "jsonl" | "ndjson" => return Some(Format::Jsonl),
        "log" => return Some(Format::Log),
        "sql" => return Some(Format::Sql),
        _ => {}
    }

    let hint = content_hint?;
    let trimmed = hint.trim();

    if trimmed.starts_with('{')
        && trimmed.ends_with('}')
        && serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(trimmed).is_ok()
    {
        return Some(Format::Jsonl);
    }
    if INSERT_PROBE.is_match(hint) {
        return Some(Format::Sql);
    }
    if hint.contains(',') && hint.contains('\n') {
        return Some(Format::Csv);
    }

    None
}

/// A streaming, single-pass source of rows.
///
/// `columns` may force reading ahead to the first record; the record is
/// buffered internally and still delivered by `next_row`. Handles are
/// released on drop.
pub trait FormatReader {
    fn columns(&mut self) -> Result<Vec<String>>;
    fn next_row(&mut self) -> Option<Result<Row>>;
}

/// A row sink. `write_header` is a no-op for header-less formats but
/// always records the column list; `finish` flushes buffered output.
pub trait FormatWriter {
    fn write_header(&mut self, columns: &[String]) -> Result<()>;
    fn write_row(&mut self, row: &Row) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

/// Reader construction options that only some formats consume.
#[derive(Debug, Clone, Default)]
pub struct ReaderOptions {
    /// SQL dump: only INSERTs into this table contribute rows.
    pub table: Option<String>,
    /// Log: regex with capture groups for structured lines.
    pub log_pattern: Option<String>,
    /// Log: column names matching the pattern's capture groups.
    pub log_columns: Option<Vec<String>>,
    /// CSV: explicit dialect overrides; unset fields are sniffed.
    pub csv: TabularOptions,
}

/// Writer construction options that only some formats consume.
#[derive(Debug, Clone, Default)]
pub struct WriterOptions {
    /// SQL output: table named in the emitted INSERT statements.
    pub table: Option<String>,
    /// Log output: per-row format template, e.g. `[{level}] {message}`.
    pub log_template: Option<String>,
}

/// Open a reader for the given path and format.
pub fn open_reader(
    path: &Path,
    format: Format,
    options: &ReaderOptions,
) -> Result<Box<dyn FormatReader>> {
    match format {
        Format::Csv => Ok(Box::new(TabularReader::with_options(path, options.csv)?)),
        Format::Jsonl => Ok(Box::new(JsonlReader::open(path)?)),
        Format::Log => Ok(Box::new(LogReader::open(
            path,
            options.log_pattern.as_deref(),
            options.log_columns.clone(),
        )?)),
        Format::Sql => Ok(Box::new(SqlReader::open(path, options.table.clone())?)),
    }
}

/// Create a writer for the given path and format, creating parent
/// directories on demand.
pub fn create_writer(
    path: &Path,
    format: Format,
    options: &WriterOptions,
) -> Result<Box<dyn FormatWriter>> {
    match format {
        Format::Csv => Ok(Box::new(TabularWriter::create(path)?)),
        Format::Jsonl => Ok(Box::new(JsonlWriter::create(path)?)),
        Format::Log => Ok(Box::new(LogWriter::with_template(
            path,
            options.log_template.clone(),
            logline::MESSAGE_COLUMN,
        )?)),
        Format::Sql => Ok(Box::new(SqlWriter::with_table(
            path,
            options.table.as_deref().unwrap_or("data"),
        )?)),
    }
}

/// Iterator adapter over a reader's remaining rows.
pub struct Rows<'a> {
    reader: &'a mut dyn FormatReader,
}

impl<'a> Rows<'a> {
    pub fn new(reader: &'a mut dyn FormatReader) -> Self {
        Self { reader }
    }
}

impl Iterator for Rows<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_row()
    }
}

pub(crate) fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(detect_format(&PathBuf::from("a.csv"), None), Some(Format::Csv));
        assert_eq!(detect_format(&PathBuf::from("a.CSV"), None), Some(Format::Csv));
        assert_eq!(detect_format(&PathBuf::from("a.jsonl"), None), Some(Format::Jsonl));
        assert_eq!(detect_format(&PathBuf::from("a.ndjson"), None), Some(Format::Jsonl));
        assert_eq!(detect_format(&PathBuf::from("a.log"), None), Some(Format::Log));
        assert_eq!(detect_format(&PathBuf::from("dump.sql"), None), Some(Format::Sql));
        assert_eq!(detect_format(&PathBuf::from("a.txt"), None), None);
        assert_eq!(detect_format(&PathBuf::from("noext"), None), None);
    }

    #[test]
    fn test_detect_by_content() {
        let path = PathBuf::from("data.txt");
        assert_eq!(
            detect_format(&path, Some(r#"{"a": 1}"#)),
            Some(Format::Jsonl)
        );
        assert_eq!(
            detect_format(&path, Some("insert into t (a) VALUES (1);")),
            Some(Format::Sql)
        );
        assert_eq!(detect_format(&path, Some("a,b\n1,2\n")), Some(Format::Csv));
        assert_eq!(detect_format(&path, Some("just a line")), None);
    }

    #[test]
    fn test_content_rules_order_sql_before_csv() {
        // An INSERT line contains commas and a newline; SQL must win.
        let hint = "INSERT INTO t (a,b) VALUES (1,2);\n";
        assert_eq!(detect_format(&PathBuf::from("x"), Some(hint)), Some(Format::Sql));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("CSV".parse::<Format>().unwrap(), Format::Csv);
        assert!("parquet".parse::<Format>().is_err());
    }
}
