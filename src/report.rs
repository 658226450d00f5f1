//! Reading target lists and writing results

use crate::probe::ScanResult;
use std::io::{self, BufRead, Write};

/// Column names, in output order
pub const CSV_HEADER: &str =
    "Timestamp,Source Internal IP,Source External IP,URL,Vulnerability Status,Error/Downgrade Version";

/// Timestamp column format
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Report errors
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for report operations
pub type Result<T> = std::result::Result<T, ReportError>;

/// One URL per line; blank lines are skipped and whitespace trimmed
pub fn read_targets<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut targets = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let url = line.trim();
        if !url.is_empty() {
            targets.push(url.to_string());
        }
    }
    Ok(targets)
}

/// CSV output, header first
pub struct CsvWriter<W: Write> {
    out: W,
    header_written: bool,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(out: W) -> Self {
        CsvWriter {
            out,
            header_written: false,
        }
    }

    /// Append one row, writing the header before the first one
    ///
    /// The row is flushed straight away, so an interrupted run keeps every
    /// row written so far.
    pub fn write_result(&mut self, result: &ScanResult) -> Result<()> {
        self.write_header()?;

        let timestamp = result.timestamp.format(TIMESTAMP_FORMAT).to_string();
        let internal = result.source_internal_ip.map(|ip| ip.to_string()).unwrap_or_default();
        let external = result.source_external_ip.map(|ip| ip.to_string()).unwrap_or_default();

        writeln!(
            self.out,
            "{},{},{},{},{},{}",
            timestamp,
            csv_escape(&internal),
            csv_escape(&external),
            csv_escape(&result.url),
            result.status,
            csv_escape(&result.detail),
        )?;
        self.out.flush()?;
        Ok(())
    }

    /// Write the header row unless it is already out
    pub fn write_header(&mut self) -> Result<()> {
        if !self.header_written {
            writeln!(self.out, "{}", CSV_HEADER)?;
            self.out.flush()?;
            self.header_written = true;
        }
        Ok(())
    }
}

/// All results as one pretty-printed JSON array
pub fn write_json<W: Write>(mut out: W, results: &[ScanResult]) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, results)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn csv_escape(s: &str) -> String {
    let needs_quoting = s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r');
    let has_formula_prefix = matches!(s.as_bytes().first(), Some(b'=' | b'+' | b'-' | b'@' | b'\t' | b'\r'));

    if has_formula_prefix {
        // a leading quote keeps spreadsheets from evaluating the cell
        format!("\"'{}\"", s.replace('"', "\"\""))
    } else if needs_quoting {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
