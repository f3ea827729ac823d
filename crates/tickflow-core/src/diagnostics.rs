//! Timestamped diagnostic log
//!
//! Run markers always go through `tracing`; a pipeline may also ask for
//! them to be appended to a plain file as `HH:MM:SS.mmm: <text>` lines.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Local, TimeZone};

use crate::error::Result;

/// Format a wall-clock time as `HH:MM:SS.mmm`
pub fn format_timestamp<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format("%H:%M:%S%.3f").to_string()
}

/// The current local time as `HH:MM:SS.mmm`
pub fn now() -> String {
    format_timestamp(&Local::now())
}

/// Appends timestamped lines to a file
pub struct DiagnosticLog {
    writer: BufWriter<File>,
}

impl DiagnosticLog {
    /// Open `path` for appending, creating it if needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Write one line stamped with the current time
    pub fn log(&mut self, text: &str) -> Result<()> {
        writeln!(self.writer, "{}: {}", now(), text)?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_format_timestamp() {
        let time = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_milli_opt(7, 5, 3, 42)
            .unwrap()
            .and_utc();
        assert_eq!(format_timestamp(&time), "07:05:03.042");
        assert_eq!(format_timestamp(&time.with_timezone(&Utc)), "07:05:03.042");
    }

    #[test]
    fn test_log_appends_stamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diag/run.log");

        let mut log = DiagnosticLog::open(&path).unwrap();
        log.log("Program Started").unwrap();
        drop(log);
        let mut log = DiagnosticLog::open(&path).unwrap();
        log.log("Program Ended").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(": Program Started"));
        assert!(lines[1].ends_with(": Program Ended"));
        // HH:MM:SS.mmm
        assert_eq!(lines[0].find(": ").unwrap(), 12);
    }
}
