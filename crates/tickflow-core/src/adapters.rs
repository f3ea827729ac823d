//! I/O adapters
//!
//! Adapters connect a graph to the outside world: delimited files as
//! sources and sinks, the console as a sink, and files or standard output as
//! per-connector transfer logs.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::connector::TransferLog;
use crate::error::{Error, Result};
use crate::node::{Consumer, Producer};
use crate::Value;

// ============================================================================
// CSV Source
// ============================================================================

/// Produces one field of each record of a delimited text stream.
///
/// The source keeps one record of lookahead so exhaustion is known before
/// `get` is called. Blank lines are skipped. A record that fails to read is
/// held in the lookahead and reported by the `get` that would have returned it.
pub struct CsvSource<R: Read> {
    label: String,
    column: usize,
    reader: csv::Reader<R>,
    pending: Lookahead,
}

/// The next record, read ahead of `get`
enum Lookahead {
    Record(csv::StringRecord),
    Failed(Error),
    End,
}

impl CsvSource<File> {
    /// Open a comma-delimited file reading the zero-based `column`
    pub fn open(path: impl AsRef<Path>, column: usize) -> Result<Self> {
        Self::open_with_delimiter(path, column, b',')
    }

    /// Open a file delimited by `delimiter`
    pub fn open_with_delimiter(
        path: impl AsRef<Path>,
        column: usize,
        delimiter: u8,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self::with_delimiter(
            path.display().to_string(),
            file,
            column,
            delimiter,
        ))
    }
}

impl<R: Read> CsvSource<R> {
    /// Read comma-delimited records from `reader`; `label` names the stream
    /// in error messages
    pub fn from_reader(label: impl Into<String>, reader: R, column: usize) -> Self {
        Self::with_delimiter(label, reader, column, b',')
    }

    fn with_delimiter(label: impl Into<String>, reader: R, column: usize, delimiter: u8) -> Self {
        // Fields are split on the delimiter only; quotes are plain text.
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .delimiter(delimiter)
            .from_reader(reader);
        let mut source = Self {
            label: label.into(),
            column,
            reader,
            pending: Lookahead::End,
        };
        source.advance();
        source
    }

    /// Load the next non-blank record, or the read failure, into the
    /// lookahead slot
    fn advance(&mut self) {
        let mut record = csv::StringRecord::new();
        self.pending = loop {
            match self.reader.read_record(&mut record) {
                Ok(false) => break Lookahead::End,
                Ok(true) if is_blank(&record) => continue,
                Ok(true) => break Lookahead::Record(record),
                Err(e) => break Lookahead::Failed(self.read_error(e)),
            }
        };
    }

    fn read_error(&self, err: csv::Error) -> Error {
        if err.is_io_error() {
            return Error::Csv(err);
        }
        let line = err
            .position()
            .map(|p| p.line())
            .unwrap_or_else(|| self.reader.position().line());
        Error::MalformedRecord {
            source_name: self.label.clone(),
            line,
            message: err.to_string(),
        }
    }

    fn decode(&self, record: &csv::StringRecord) -> Result<Value> {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let field = record.get(self.column).ok_or_else(|| Error::MalformedRecord {
            source_name: self.label.clone(),
            line,
            message: format!(
                "field {} missing, record has {} field(s)",
                self.column,
                record.len()
            ),
        })?;
        field
            .trim()
            .parse::<Value>()
            .map_err(|e| Error::MalformedRecord {
                source_name: self.label.clone(),
                line,
                message: format!("field {} is not a number ({:?}): {}", self.column, field, e),
            })
    }
}

/// A line holding nothing but whitespace. Records with a delimiter are never
/// blank, even when every field is empty.
fn is_blank(record: &csv::StringRecord) -> bool {
    match record.len() {
        0 => true,
        1 => record[0].trim().is_empty(),
        _ => false,
    }
}

impl<R: Read> Producer for CsvSource<R> {
    fn get(&mut self) -> Result<Value> {
        match std::mem::replace(&mut self.pending, Lookahead::End) {
            Lookahead::Record(record) => {
                let value = self.decode(&record);
                self.advance();
                value
            }
            Lookahead::Failed(err) => Err(err),
            Lookahead::End => Err(Error::SourceExhausted {
                source_name: self.label.clone(),
            }),
        }
    }

    fn is_eof(&self) -> bool {
        matches!(self.pending, Lookahead::End)
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Writes `index, value` lines, numbering received values from 0
pub struct CsvSink<W: Write> {
    writer: W,
    count: u64,
}

impl CsvSink<BufWriter<File>> {
    /// Create (or truncate) the file at `path`
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(BufWriter::new(create_file(path.as_ref())?)))
    }
}

impl<W: Write> CsvSink<W> {
    /// Write to any writer
    pub fn new(writer: W) -> Self {
        Self { writer, count: 0 }
    }

    /// Consume the sink, returning the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Consumer for CsvSink<W> {
    fn put(&mut self, value: Value) -> Result<()> {
        writeln!(self.writer, "{}, {}", self.count, value)?;
        self.count += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Prints `<name> received <value>` to standard output
#[derive(Debug, Clone)]
pub struct ConsoleSink {
    name: String,
}

impl ConsoleSink {
    /// Create a console sink labelled `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Consumer for ConsoleSink {
    fn put(&mut self, value: Value) -> Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{} received {}", self.name, value)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        std::io::stdout().flush()?;
        Ok(())
    }
}

// ============================================================================
// Transfer logs
// ============================================================================

/// Writes `cycle,value` lines for every transfer
pub struct WriterLog<W: Write> {
    writer: W,
}

impl WriterLog<BufWriter<File>> {
    /// Log to the file at `path`, created or truncated
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(BufWriter::new(create_file(path.as_ref())?)))
    }
}

impl WriterLog<std::io::Stdout> {
    /// Log to standard output, which several connectors may share
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> WriterLog<W> {
    /// Log to any writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Consume the log, returning the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TransferLog for WriterLog<W> {
    fn record(&mut self, cycle: u64, value: Value) -> Result<()> {
        writeln!(self.writer, "{},{}", cycle, value)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn create_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    fn drain<R: Read>(source: &mut CsvSource<R>) -> Vec<Value> {
        let mut values = Vec::new();
        while !source.is_eof() {
            values.push(source.get().unwrap());
        }
        values
    }

    fn source(text: &str, column: usize) -> CsvSource<Cursor<Vec<u8>>> {
        CsvSource::from_reader("test", Cursor::new(text.as_bytes().to_vec()), column)
    }

    #[test]
    fn test_reads_configured_column() {
        let mut src = source("0,1.5\n1,2.5\n2,-3\n", 1);
        assert_eq!(drain(&mut src), vec![1.5, 2.5, -3.0]);
    }

    #[test]
    fn test_blank_lines_do_not_shift_values() {
        let with_blank = drain(&mut source("0,1.0\n\n1,2.0\n\n\n2,3.0\n", 1));
        let without = drain(&mut source("0,1.0\n1,2.0\n2,3.0\n", 1));
        assert_eq!(with_blank, without);
        assert_eq!(with_blank.len(), 3);
    }

    #[test]
    fn test_whitespace_only_lines_are_blank() {
        let mut src = source("1\n   \n2\n", 0);
        assert_eq!(drain(&mut src), vec![1.0, 2.0]);
    }

    #[test]
    fn test_last_line_without_newline() {
        let mut src = source("0,4\n1,5", 1);
        assert_eq!(drain(&mut src), vec![4.0, 5.0]);
    }

    #[test]
    fn test_empty_stream_is_eof_immediately() {
        let src = source("", 0);
        assert!(src.is_eof());
        let src = source("\n\n", 0);
        assert!(src.is_eof());
    }

    #[test]
    fn test_trailing_delimiter_yields_empty_field() {
        // The extra empty field exists, so column 1 still parses and column 2
        // is present but empty.
        let mut src = source("7,8,\n", 1);
        assert_eq!(src.get().unwrap(), 8.0);

        let mut src = source("7,8,\n", 2);
        match src.get() {
            Err(Error::MalformedRecord { message, .. }) => {
                assert!(message.contains("not a number"), "{message}");
            }
            other => panic!("Expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let mut src = source("1,2\n3\n", 1);
        assert_eq!(src.get().unwrap(), 2.0);
        match src.get() {
            Err(Error::MalformedRecord { line, message, .. }) => {
                assert_eq!(line, 2);
                assert!(message.contains("missing"), "{message}");
            }
            other => panic!("Expected MalformedRecord, got {other:?}"),
        }
    }

    #[rstest]
    #[case::empty_fields("0,1\n,\n2,3\n")]
    #[case::padded_empty_fields("0,1\n , \n2,3\n")]
    #[case::quoted_empty_field("0,1\n\"\"\n2,3\n")]
    fn test_record_with_empty_fields_is_not_blank(#[case] text: &str) {
        let mut src = source(text, 1);
        assert_eq!(src.get().unwrap(), 1.0);
        match src.get() {
            Err(Error::MalformedRecord { line, .. }) => assert_eq!(line, 2),
            other => panic!("Expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_read_fault_is_reported_on_its_own_record() {
        let bytes = b"0,1\n1,\xff\n".to_vec();
        let mut src = CsvSource::from_reader("bad-utf8", Cursor::new(bytes), 1);

        assert!(!src.is_eof());
        assert_eq!(src.get().unwrap(), 1.0);
        assert!(!src.is_eof());
        match src.get() {
            Err(Error::MalformedRecord {
                source_name, line, ..
            }) => {
                assert_eq!(source_name, "bad-utf8");
                assert_eq!(line, 2);
            }
            other => panic!("Expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_field_is_malformed() {
        let mut src = source("0,abc\n", 1);
        assert!(matches!(src.get(), Err(Error::MalformedRecord { .. })));
    }

    #[test]
    fn test_get_after_eof_errors() {
        let mut src = source("1\n", 0);
        src.get().unwrap();
        assert!(matches!(src.get(), Err(Error::SourceExhausted { .. })));
    }

    #[test]
    fn test_open_file_with_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("semi.csv");
        std::fs::write(&path, "a;1.25\nb;2.5\n").unwrap();

        let mut src = CsvSource::open_with_delimiter(&path, 1, b';').unwrap();
        assert_eq!(drain(&mut src), vec![1.25, 2.5]);
    }

    #[test]
    fn test_open_missing_file() {
        assert!(matches!(
            CsvSource::open("/nonexistent/tickflow/input.csv", 0),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_csv_sink_numbers_values() {
        let mut sink = CsvSink::new(Vec::new());
        sink.put(0.5).unwrap();
        sink.put(-1.0).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "0, 0.5\n1, -1\n");
    }

    #[test]
    fn test_csv_sink_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/motor.csv");
        let mut sink = CsvSink::create(&path).unwrap();
        sink.put(1.0).unwrap();
        sink.flush().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0, 1\n");
    }

    #[test]
    fn test_writer_log_format() {
        let mut log = WriterLog::new(Vec::new());
        log.record(0, 2.5).unwrap();
        log.record(1, 0.0).unwrap();
        let text = String::from_utf8(log.into_inner()).unwrap();
        assert_eq!(text, "0,2.5\n1,0\n");
    }
}
