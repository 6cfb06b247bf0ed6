//! Error types for the fleetmon time-series store.

use thiserror::Error;

use crate::sample::ServerKey;

/// The main error type for all fleetmon operations.
///
/// This enum covers all error conditions that can occur from store
/// construction through ingestion and queries. Every condition is local and
/// recoverable: a failed ingest row or a failed query leaves the store
/// untouched and usable.
#[derive(Error, Debug)]
pub enum FleetmonError {
    /// Error validating store configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Error during ingestion (write path).
    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// Error during a range query (read path).
    #[error("query error: {0}")]
    Query(#[from] QueryError),

    /// Malformed textual input outside the ingest/query paths.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Errors that can occur when validating store configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The configured per-server CPU count cannot index any series.
    #[error("cpus_per_server must be at least 1 (got {count})")]
    InvalidCpuCount {
        /// The rejected CPU count.
        count: usize,
    },
}

/// Errors for unparseable textual input: addresses, numeric fields, and
/// calendar timestamps.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The server address is not a valid dotted-quad IPv4 address.
    #[error("invalid IPv4 address '{input}'")]
    InvalidIp {
        /// The rejected input.
        input: String,
    },

    /// The timestamp field is not a valid integer.
    #[error("invalid timestamp field '{input}'")]
    InvalidTimestamp {
        /// The rejected input.
        input: String,
    },

    /// The CPU index field is not a valid integer.
    #[error("invalid cpu index field '{input}'")]
    InvalidCpuIndex {
        /// The rejected input.
        input: String,
    },

    /// The usage field is not a valid integer.
    #[error("invalid usage field '{input}'")]
    InvalidUsage {
        /// The rejected input.
        input: String,
    },

    /// The usage field parsed but is not a percentage.
    #[error("usage {value} is outside 0..=100")]
    UsageOutOfRange {
        /// The rejected value.
        value: u8,
    },

    /// The calendar timestamp does not match `"YYYY-MM-DD HH:MM"`.
    #[error("invalid date-time '{input}': expected \"YYYY-MM-DD HH:MM\"")]
    InvalidDateTime {
        /// The rejected input.
        input: String,
    },

    /// A log row has the wrong number of fields.
    #[error("expected {expected} fields, found {found}")]
    FieldCount {
        /// How many fields a well-formed row has.
        expected: usize,
        /// How many fields were present.
        found: usize,
    },
}

/// Errors that can occur while ingesting samples into the store.
#[derive(Error, Debug)]
pub enum IngestError {
    /// A row carried a field that could not be parsed or validated.
    #[error("malformed input: {0}")]
    Malformed(#[from] ParseError),

    /// A row targeted a CPU index the store is not configured for.
    #[error("cpu index {cpu} is out of range (store is configured for {cpus} CPUs)")]
    CpuIndexOutOfRange {
        /// The requested CPU index.
        cpu: usize,
        /// The configured number of CPUs per server.
        cpus: usize,
    },

    /// Mutation was attempted after the store was finalized.
    #[error("store is finalized and no longer accepts samples")]
    AlreadyFinalized,

    /// A log file or directory could not be read.
    #[error("failed to read log data from '{path}': {source}")]
    Io {
        /// The path that could not be read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while answering a range query.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The interval start is after its end. Never silently swapped.
    #[error("invalid time range: start {start} is after end {end}")]
    InvalidRange {
        /// The requested interval start.
        start: i64,
        /// The requested interval end.
        end: i64,
    },

    /// The store has not been finalized yet.
    #[error("store must be finalized before it can be queried")]
    NotFinalized,

    /// The requested CPU index is out of range for the store configuration.
    #[error("cpu index {cpu} is out of range (store is configured for {cpus} CPUs)")]
    CpuIndexOutOfRange {
        /// The requested CPU index.
        cpu: usize,
        /// The configured number of CPUs per server.
        cpus: usize,
    },

    /// No server with the requested key was ever ingested.
    #[error("no server with address {key}")]
    ServerNotFound {
        /// The unknown server key.
        key: ServerKey,
    },

    /// The interval start falls outside the span covered by the series.
    ///
    /// An empty series is reported as the same kind with `span: None`, so
    /// callers can tell the two apart without a second error variant.
    #[error("range [{start}, {end}) is outside the series bounds ({})", match span {
        Some((lo, hi)) => format!("samples span {lo}..={hi}"),
        None => "series is empty".to_owned(),
    })]
    RangeOutOfBounds {
        /// The requested interval start.
        start: i64,
        /// The requested interval end.
        end: i64,
        /// First and last sample timestamps, or `None` for an empty series.
        span: Option<(i64, i64)>,
    },
}

/// Type alias for `Result<T, FleetmonError>`.
///
/// The error type defaults to [`FleetmonError`] but can be overridden for
/// functions that fail with one specific kind, e.g.
/// `Result<RawRecord, ParseError>`.
pub type Result<T, E = FleetmonError> = std::result::Result<T, E>;
