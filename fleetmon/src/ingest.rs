//! Log-directory ingestion.
//!
//! Fleet collectors drop one `<epoch>.log` file per minute: a header line,
//! then one whitespace-separated `timestamp ip cpu usage` row per
//! (server, CPU). This module reads such a directory into a
//! [`SeriesStore`].
//!
//! A malformed row is reported and skipped so a single bad row never aborts
//! a batch; I/O failures are real errors. Loading does not finalize the
//! store — the caller finalizes once after all batches, which is also the
//! merge point when several shards are loaded in sequence.

use std::fs;
use std::path::Path;

use crate::error::{FleetmonError, IngestError, ParseError, Result};
use crate::sample::{MAX_USAGE, RawRecord};
use crate::store::SeriesStore;

/// Leading field of the header line written by the log generator.
const HEADER_PREFIX: &str = "timestamp";

/// Counters describing one [`load_dir`] pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    /// Log files read.
    pub files: usize,
    /// Rows ingested into the store.
    pub rows: u64,
    /// Malformed rows reported and skipped.
    pub skipped: u64,
}

/// Parses one log row: whitespace-separated `timestamp ip cpu usage`.
///
/// The address field is kept textual; the store parses it at ingest time.
///
/// # Errors
///
/// Returns [`ParseError`] naming the first offending field, or
/// [`ParseError::FieldCount`] if the row does not have four fields.
pub fn parse_line(line: &str) -> Result<RawRecord, ParseError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 4 {
        return Err(ParseError::FieldCount {
            expected: 4,
            found: fields.len(),
        });
    }

    let timestamp = fields[0]
        .parse()
        .map_err(|_| ParseError::InvalidTimestamp {
            input: fields[0].to_string(),
        })?;
    let cpu = fields[2]
        .parse()
        .map_err(|_| ParseError::InvalidCpuIndex {
            input: fields[2].to_string(),
        })?;
    let usage: u8 = fields[3].parse().map_err(|_| ParseError::InvalidUsage {
        input: fields[3].to_string(),
    })?;
    if usage > MAX_USAGE {
        return Err(ParseError::UsageOutOfRange { value: usage });
    }

    Ok(RawRecord {
        timestamp,
        server_ip: fields[1].to_string(),
        cpu,
        usage,
    })
}

/// Loads every `*.log` file in `dir` into `store`.
///
/// Files are visited in directory order; ordering does not matter because
/// the store sorts at finalize. The first line of each file is skipped when
/// it is a header. Rows that fail to parse or validate are logged at `warn`
/// with their file and line number, counted in
/// [`IngestStats::skipped`], and the pass continues.
///
/// # Errors
///
/// Returns [`IngestError::Io`] if the directory or a log file cannot be
/// read, and [`IngestError::AlreadyFinalized`] if the store no longer
/// accepts samples.
pub fn load_dir(dir: impl AsRef<Path>, store: &mut SeriesStore) -> Result<IngestStats> {
    let dir = dir.as_ref();
    let mut stats = IngestStats::default();

    let entries = fs::read_dir(dir).map_err(|e| IngestError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| IngestError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "log") {
            continue;
        }

        let contents = fs::read_to_string(&path).map_err(|e| IngestError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        stats.files += 1;

        for (lineno, line) in contents.lines().enumerate() {
            if line.is_empty() || (lineno == 0 && line.starts_with(HEADER_PREFIX)) {
                continue;
            }

            let record = match parse_line(line) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(
                        file = %path.display(),
                        line = lineno + 1,
                        error = %e,
                        "skipping malformed row"
                    );
                    stats.skipped += 1;
                    continue;
                }
            };

            match store.ingest(&record) {
                Ok(()) => stats.rows += 1,
                Err(e @ FleetmonError::Ingest(IngestError::AlreadyFinalized)) => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        file = %path.display(),
                        line = lineno + 1,
                        error = %e,
                        "skipping unacceptable row"
                    );
                    stats.skipped += 1;
                }
            }
        }
    }

    tracing::debug!(
        files = stats.files,
        rows = stats.rows,
        skipped = stats.skipped,
        "log directory loaded"
    );
    Ok(stats)
}
