//! JSON-lines reader and writer.
//!
//! Nested objects are flattened depth-first into dotted paths; arrays
//! travel as their serialized text. The column list is fixed by the
//! first valid record.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;

use crate::error::Result;
use crate::formats::{ensure_parent_dir, FormatReader, FormatWriter};
use crate::value::{Row, Value};

pub struct JsonlReader {
    lines: Lines<BufReader<File>>,
    columns: Vec<String>,
    columns_ready: bool,
    pending: VecDeque<Row>,
}

impl JsonlReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            columns: Vec::new(),
            columns_ready: false,
            pending: VecDeque::new(),
        })
    }

    /// Advance to the next parseable record. Blank and invalid lines
    /// are skipped silently; only I/O faults surface.
    fn read_valid_row(&mut self) -> Option<Result<Row>> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            if line.trim().is_empty() {
                continue;
            }

            let json: serde_json::Value = match serde_json::from_str(line.trim()) {
                Ok(v) => v,
                Err(_) => continue,
            };

            let record = match json {
                serde_json::Value::Object(map) => serde_json::Value::Object(map),
                other => {
                    let mut map = serde_json::Map::new();
                    map.insert("value".to_string(), other);
                    serde_json::Value::Object(map)
                }
            };

            let mut row = Row::new();
            flatten_into("", &record, &mut row);

            if !self.columns_ready {
                self.columns = row.keys().cloned().collect();
                self.columns_ready = true;
            }

            return Some(Ok(row));
        }
    }
}

impl FormatReader for JsonlReader {
    fn columns(&mut self) -> Result<Vec<String>> {
        if !self.columns_ready {
            match self.read_valid_row() {
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
        self.read_valid_row()
    }
}

/// Depth-first flattening with `.`-joined paths. Arrays become their
/// serialized form under the current path.
fn flatten_into(prefix: &str, json: &serde_json::Value, row: &mut Row) {
    match json {
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(&path, value, row);
            }
        }
        serde_json::Value::Array(_) => {
            row.insert(prefix.to_string(), Value::Raw(json.to_string()));
        }
        other => {
            row.insert(prefix.to_string(), Value::from_json(other));
        }
    }
}

/// One JSON object per line. The column list is advisory: all keys
/// present in the row are preserved verbatim.
pub struct JsonlWriter {
    writer: BufWriter<File>,
}

impl JsonlWriter {
    pub fn create(path: &Path) -> Result<Self> {
        ensure_parent_dir(path)?;
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl FormatWriter for JsonlWriter {
    fn write_header(&mut self, _columns: &[String]) -> Result<()> {
        Ok(())
    }

    fn write_row(&mut self, row: &Row) -> Result<()> {
        let mut object = serde_json::Map::with_capacity(row.len());
        for (key, value) in row {
            object.insert(key.clone(), value.to_json());
        }
        serde_json::to_writer(&mut self.writer, &serde_json::Value::Object(object))?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
