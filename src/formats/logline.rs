//! Line-oriented log reader and writer.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;

use regex::Regex;

use crate::error::{Error, Result};
use crate::formats::{ensure_parent_dir, FormatReader, FormatWriter};
use crate::value::{Row, Value};

/// Column that carries the line text when no pattern applies.
pub const MESSAGE_COLUMN: &str = "message";

/// Each non-empty line becomes a row. With a parse pattern configured,
/// capture groups populate the configured columns positionally; lines
/// that do not match fall back to the single message column.
pub struct LogReader {
    lines: Lines<BufReader<File>>,
    pattern: Option<Regex>,
    columns: Vec<String>,
}

impl LogReader {
    pub fn open(path: &Path, pattern: Option<&str>, columns: Option<Vec<String>>) -> Result<Self> {
        let compiled = match pattern {
            Some(p) => Some(
                Regex::new(p)
                    .map_err(|e| Error::invalid_config(format!("Invalid log pattern: {e}")))?,
            ),
            None => None,
        };

        let columns = if compiled.is_some() {
            columns.unwrap_or_else(|| vec!["level".to_string(), MESSAGE_COLUMN.to_string()])
        } else {
            vec![MESSAGE_COLUMN.to_string()]
        };

        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            pattern: compiled,
            columns,
        })
    }

    fn parse_line(&self, line: &str) -> Row {
        let line = line.trim_end_matches(['\n', '\r']);

        if let Some(pattern) = &self.pattern {
            if let Some(captures) = pattern.captures(line) {
                let mut row = Row::new();
                for (i, col) in self.columns.iter().enumerate() {
                    let value = captures
                        .get(i + 1)
                        .map(|m| Value::Text(m.as_str().to_string()))
                        .unwrap_or_else(|| Value::Text(String::new()));
                    row.insert(col.clone(), value);
                }
                return row;
            }
        }

        let mut row = Row::new();
        row.insert(MESSAGE_COLUMN.to_string(), Value::Text(line.to_string()));
        row
    }
}

impl FormatReader for LogReader {
    fn columns(&mut self) -> Result<Vec<String>> {
        Ok(self.columns.clone())
    }

    fn next_row(&mut self) -> Option<Result<Row>> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(Ok(self.parse_line(&line)));
        }
    }
}

/// One line per row. A format template like `[{level}] {message}` is
/// interpolated when configured; on any missing key the writer falls
/// back to the message column.
pub struct LogWriter {
    writer: BufWriter<File>,
    message_column: String,
    template: Option<String>,
}

impl LogWriter {
    pub fn with_template(
        path: &Path,
        template: Option<String>,
        message_column: &str,
    ) -> Result<Self> {
        ensure_parent_dir(path)?;
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            message_column: message_column.to_string(),
            template,
        })
    }

    fn render_line(&self, row: &Row) -> String {
        if let Some(template) = &self.template {
            if let Some(line) = interpolate(template, row) {
                return line;
            }
        }
        row.get(&self.message_column)
            .map(Value::render)
            .unwrap_or_default()
    }
}

impl FormatWriter for LogWriter {
    fn write_header(&mut self, _columns: &[String]) -> Result<()> {
        Ok(())
    }

    fn write_row(&mut self, row: &Row) -> Result<()> {
        let line = self.render_line(row);
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Substitute `{name}` placeholders from the row. Returns None when any
/// placeholder has no corresponding row key.
fn interpolate(template: &str, row: &Row) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}')?;
        let name = &after[..end];
        out.push_str(&row.get(name)?.render());
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Some(out)
}
