//! SQL dump reader and writer.
//!
//! The reader scans for single-line `INSERT INTO <table> (cols) VALUES
//! (vals);` statements; multiline INSERTs are not supported. The writer
//! emits one INSERT per row.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::formats::{ensure_parent_dir, FormatReader, FormatWriter};
use crate::value::{Row, Value};

static INSERT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)INSERT\s+INTO\s+[`"]?(\w+)[`"]?\s*\(([^)]+)\)\s*VALUES\s*\((.*)\)"#).unwrap()
});

pub struct SqlReader {
    lines: Lines<BufReader<File>>,
    table_filter: Option<String>,
    columns: Vec<String>,
    columns_ready: bool,
    pending: VecDeque<Row>,
}

impl SqlReader {
    pub fn open(path: &Path, table_filter: Option<String>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            table_filter,
            columns: Vec::new(),
            columns_ready: false,
            pending: VecDeque::new(),
        })
    }

    fn parse_insert_line(&self, line: &str) -> Option<Row> {
        let captures = INSERT_RE.captures(line)?;

        let table = captures.get(1)?.as_str();
        if let Some(filter) = &self.table_filter {
            if !table.eq_ignore_ascii_case(filter) {
                return None;
            }
        }

        let column_names: Vec<String> = captures
            .get(2)?
            .as_str()
            .split(',')
            .map(|c| c.trim().trim_matches(['`', '"']).to_string())
            .collect();

        let tokens = split_value_list(captures.get(3)?.as_str());

        let mut row = Row::new();
        for (i, col) in column_names.iter().enumerate() {
            let value = match tokens.get(i) {
                Some(token) => decode_value(token),
                None => Value::Null,
            };
            row.insert(col.clone(), value);
        }
        Some(row)
    }

    fn read_matching_row(&mut self) -> Option<Result<Row>> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            if let Some(row) = self.parse_insert_line(&line) {
                if !self.columns_ready {
                    self.columns = row.keys().cloned().collect();
                    self.columns_ready = true;
                }
                return Some(Ok(row));
            }
        }
    }
}

impl FormatReader for SqlReader {
    fn columns(&mut self) -> Result<Vec<String>> {
        if !self.columns_ready {
            match self.read_matching_row() {
                Some(Ok(row)) => self.pending.push_back(row),
                Some(Err(e)) => return Err(e),
                None => self.columns_ready = true,
            }
        }
        Ok(self.columns.clone())
    }

    fn next_row(&mut self) -> Option<Result<Row>> {
        if let Some(row) = self.pending.pop_front() {
            return Some(Ok(row));
        }
        self.read_matching_row()
    }
}

/// Split a VALUES interior on commas, honoring quoted strings and
/// backslash escapes within them.
fn split_value_list(values: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = values.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    current.push(c);
                }
                ',' => {
                    tokens.push(current.trim().to_string());
                    current.clear();
                }
                _ => current.push(c),
            },
        }
    }
    if !current.trim().is_empty() {
        tokens.push(current.trim().to_string());
    }
    tokens
}

/// Decode a single SQL token: NULL, quoted string, integer, float,
/// boolean, or the raw token as text.
fn decode_value(token: &str) -> Value {
    if token.eq_ignore_ascii_case("NULL") {
        return Value::Null;
    }

    let quoted = (token.starts_with('\'') && token.ends_with('\'') && token.len() >= 2)
        || (token.starts_with('"') && token.ends_with('"') && token.len() >= 2);
    if quoted {
        let inner = &token[1..token.len() - 1];
        return Value::Text(inner.replace("\\'", "'").replace("\\\"", "\""));
    }

    if let Ok(i) = token.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = token.parse::<f64>() {
        return Value::Float(f);
    }
    if token.eq_ignore_ascii_case("TRUE") {
        return Value::Bool(true);
    }
    if token.eq_ignore_ascii_case("FALSE") {
        return Value::Bool(false);
    }

    Value::Text(token.to_string())
}

/// Writes `INSERT INTO <table> (cols) VALUES (vals);` statements. The
/// column list is recorded by `write_header`; no bytes are emitted
/// until the first row.
pub struct SqlWriter {
    writer: BufWriter<File>,
    table: String,
    columns: Option<Vec<String>>,
}

impl SqlWriter {
    pub fn with_table(path: &Path, table: &str) -> Result<Self> {
        ensure_parent_dir(path)?;
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            table: table.to_string(),
            columns: None,
        })
    }
}

impl FormatWriter for SqlWriter {
    fn write_header(&mut self, columns: &[String]) -> Result<()> {
        self.columns = Some(columns.to_vec());
        Ok(())
    }

    fn write_row(&mut self, row: &Row) -> Result<()> {
        if self.columns.is_none() {
            self.columns = Some(row.keys().cloned().collect());
        }
        let columns = self.columns.as_ref().map(|c| c.as_slice()).unwrap_or(&[]);

        let values: Vec<String> = columns
            .iter()
            .map(|col| escape_value(row.get(col).unwrap_or(&Value::Null)))
            .collect();

        writeln!(
            self.writer,
            "INSERT INTO {} ({}) VALUES ({});",
            self.table,
            columns.join(", "),
            values.join(", ")
        )?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// SQL-escape one value: null as NULL, booleans as TRUE/FALSE, numerics
/// bare, text single-quoted with internal quotes doubled.
fn escape_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Text(s) | Value::Raw(s) => format!("'{}'", s.replace('\'', "''")),
    }
}
