//! Delimited-text reader and writer with dialect auto-detection.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::Result;
use crate::formats::{ensure_parent_dir, FormatReader, FormatWriter};
use crate::value::{Row, Value};

/// Bytes inspected when sniffing delimiter, quote, and header presence.
const SNIFF_BYTES: usize = 8 * 1024;

/// Delimiters tried during detection, in preference order.
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Explicit dialect overrides; unset fields are auto-detected.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabularOptions {
    pub delimiter: Option<u8>,
    pub quote: Option<u8>,
    pub has_header: Option<bool>,
}

/// Streaming CSV reader.
///
/// When the file has no header, column names are synthesized as
/// `column_0`, `column_1`, ... from the first record's field count.
/// Records with a deviating field count are mapped positionally, with
/// missing fields null.
pub struct TabularReader {
    records: csv::StringRecordsIntoIter<File>,
    columns: Vec<String>,
    pending: Option<csv::StringRecord>,
}

impl TabularReader {
    pub fn open(path: &Path) -> Result<Self> {
        Self::with_options(path, TabularOptions::default())
    }

    pub fn with_options(path: &Path, options: TabularOptions) -> Result<Self> {
        let sample = read_sample(path)?;

        let (sniffed_delimiter, sniffed_quote) = sniff_dialect(&sample);
        let delimiter = options.delimiter.unwrap_or(sniffed_delimiter);
        let quote = options.quote.unwrap_or(sniffed_quote);
        let has_header = options
            .has_header
            .unwrap_or_else(|| sniff_header(&sample, delimiter, quote));

        let reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .quote(quote)
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;
        let mut records = reader.into_records();

        let (columns, pending) = match records.next() {
            None => (Vec::new(), None),
            Some(first) => {
                let first = first?;
                if has_header {
                    (first.iter().map(|f| f.to_string()).collect(), None)
                } else {
                    let names = (0..first.len()).map(|i| format!("column_{i}")).collect();
                    (names, Some(first))
                }
            }
        };

        Ok(Self {
            records,
            columns,
            pending,
        })
    }

    fn record_to_row(&self, record: &csv::StringRecord) -> Row {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let value = match record.get(i) {
                    Some(field) => Value::Text(field.to_string()),
                    None => Value::Null,
                };
                (col.clone(), value)
            })
            .collect()
    }
}

impl FormatReader for TabularReader {
    fn columns(&mut self) -> Result<Vec<String>> {
        Ok(self.columns.clone())
    }

    fn next_row(&mut self) -> Option<Result<Row>> {
        if let Some(record) = self.pending.take() {
            return Some(Ok(self.record_to_row(&record)));
        }
        match self.records.next()? {
            Ok(record) => Some(Ok(self.record_to_row(&record))),
            Err(e) => Some(Err(e.into())),
        }
    }
}

fn read_sample(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; SNIFF_BYTES];
    let mut filled = 0;
    loop {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
        if filled == buf.len() {
            break;
        }
    }
    buf.truncate(filled);
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Pick the delimiter whose field counts are consistent across sample
/// lines, and the quote character that pairs with it. Falls back to
/// comma and double quote.
fn sniff_dialect(sample: &str) -> (u8, u8) {
    let quote = sniff_quote(sample);

    let mut best: Option<(u8, usize)> = None;
    for &candidate in &DELIMITER_CANDIDATES {
        let mut counts = Vec::new();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(candidate)
            .quote(quote)
            .has_headers(false)
            .flexible(true)
            .from_reader(sample.as_bytes());
        for record in reader.records().take(20).flatten() {
            counts.push(record.len());
        }

        // A real delimiter splits every line into the same >1 fields.
        let consistent = counts.len() > 1
            && counts[0] > 1
            && counts[..counts.len() - 1].iter().all(|&c| c == counts[0]);
        if consistent && best.map_or(true, |(_, n)| counts[0] > n) {
            best = Some((candidate, counts[0]));
        }
    }

    match best {
        Some((delimiter, _)) => (delimiter, quote),
        None => (b',', b'"'),
    }
}

fn sniff_quote(sample: &str) -> u8 {
    let double = sample.matches('"').count();
    let single = sample.matches('\'').count();
    if single > double && single >= 2 {
        b'\''
    } else {
        b'"'
    }
}

/// Heuristic header check: a first record with no numeric-looking field
/// followed by a record that has one is a header. Detection failure
/// defaults to header-present.
fn sniff_header(sample: &str, delimiter: u8, quote: u8) -> bool {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .quote(quote)
        .has_headers(false)
        .flexible(true)
        .from_reader(sample.as_bytes());

    let mut records = reader.records();
    let first = match records.next() {
        Some(Ok(record)) => record,
        _ => return true,
    };

    let is_numeric = |field: &str| field.trim().parse::<f64>().is_ok();

    if first.iter().any(is_numeric) {
        return false;
    }
    true
}

/// Streaming CSV writer. The header row is written once, before any
/// data; values are rendered positionally under the column list, with
/// extra row keys dropped and missing keys empty.
pub struct TabularWriter {
    writer: csv::Writer<File>,
    columns: Vec<String>,
    header_written: bool,
}

impl TabularWriter {
    pub fn create(path: &Path) -> Result<Self> {
        ensure_parent_dir(path)?;
        let writer = csv::WriterBuilder::new().from_path(path)?;
        Ok(Self {
            writer,
            columns: Vec::new(),
            header_written: false,
        })
    }
}

impl FormatWriter for TabularWriter {
    fn write_header(&mut self, columns: &[String]) -> Result<()> {
        self.columns = columns.to_vec();
        if !self.header_written && !columns.is_empty() {
            self.writer.write_record(columns)?;
            self.header_written = true;
        }
        Ok(())
    }

    fn write_row(&mut self, row: &Row) -> Result<()> {
        let fields: Vec<String> = self
            .columns
            .iter()
            .map(|col| row.get(col).map(Value::render).unwrap_or_default())
            .collect();
        self.writer.write_record(&fields)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_with_header() {
        let file = write_file("id,name\n1,alice\n2,bob\n");
        let mut reader = TabularReader::open(file.path()).unwrap();

        assert_eq!(reader.columns().unwrap(), vec!["id", "name"]);
        let first = reader.next_row().unwrap().unwrap();
        assert_eq!(first["id"], Value::Text("1".into()));
        assert_eq!(first["name"], Value::Text("alice".into()));
        let second = reader.next_row().unwrap().unwrap();
        assert_eq!(second["name"], Value::Text("bob".into()));
        assert!(reader.next_row().is_none());
    }

    #[test]
    fn test_read_without_header_synthesizes_columns() {
        let file = write_file("1,alice\n2,bob\n");
        let mut reader = TabularReader::open(file.path()).unwrap();

        assert_eq!(reader.columns().unwrap(), vec!["column_0", "column_1"]);
        let first = reader.next_row().unwrap().unwrap();
        assert_eq!(first["column_0"], Value::Text("1".into()));
        // The first record is data, not a header.
        let mut count = 1;
        while reader.next_row().is_some() {
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn test_semicolon_delimiter_detected() {
        let file = write_file("id;name\n1;alice\n2;bob\n");
        let mut reader = TabularReader::open(file.path()).unwrap();
        assert_eq!(reader.columns().unwrap(), vec!["id", "name"]);
    }

    #[test]
    fn test_tab_delimiter_detected() {
        let file = write_file("id\tname\n1\talice\n");
        let mut reader = TabularReader::open(file.path()).unwrap();
        assert_eq!(reader.columns().unwrap(), vec!["id", "name"]);
    }

    #[test]
    fn test_short_row_fills_null() {
        let file = write_file("a,b,c\n1,2\n");
        let mut reader = TabularReader::open(file.path()).unwrap();
        let row = reader.next_row().unwrap().unwrap();
        assert_eq!(row["a"], Value::Text("1".into()));
        assert_eq!(row["c"], Value::Null);
    }

    #[test]
    fn test_explicit_dialect_overrides() {
        let file = write_file("id|name\n1|alice\n");
        let options = TabularOptions {
            delimiter: Some(b'|'),
            quote: Some(b'\''),
            has_header: Some(true),
        };
        let mut reader = TabularReader::with_options(file.path(), options).unwrap();
        assert_eq!(reader.columns().unwrap(), vec!["id", "name"]);
        let row = reader.next_row().unwrap().unwrap();
        assert_eq!(row["name"], Value::Text("alice".into()));
    }

    #[test]
    fn test_writer_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let columns = vec!["id".to_string(), "name".to_string()];

        let mut writer = TabularWriter::create(&path).unwrap();
        writer.write_header(&columns).unwrap();
        let mut row = Row::new();
        row.insert("id".into(), Value::Int(1));
        row.insert("name".into(), Value::Text("alice".into()));
        row.insert("extra".into(), Value::Text("dropped".into()));
        writer.write_row(&row).unwrap();
        writer.finish().unwrap();

        let mut reader = TabularReader::open(&path).unwrap();
        assert_eq!(reader.columns().unwrap(), columns);
        let read = reader.next_row().unwrap().unwrap();
        assert_eq!(read["id"], Value::Text("1".into()));
        assert_eq!(read["name"], Value::Text("alice".into()));
        assert!(!read.contains_key("extra"));
    }

    #[test]
    fn test_writer_missing_key_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.csv");

        let mut writer = TabularWriter::create(&path).unwrap();
        writer
            .write_header(&["a".to_string(), "b".to_string()])
            .unwrap();
        let mut row = Row::new();
        row.insert("a".into(), Value::Text("x".into()));
        writer.write_row(&row).unwrap();
        writer.finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "a,b\nx,\n");
    }
}
