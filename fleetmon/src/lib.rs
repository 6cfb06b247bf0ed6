//! # fleetmon
//!
//! In-memory time-series store and range-query engine for per-minute fleet
//! CPU utilization logs.
//!
//! fleetmon ingests `(timestamp, server, cpu, usage)` rows for a large
//! fleet of servers and answers bounded time-range queries for one
//! (server, CPU) pair. The store is batch-built: ingestion appends rows in
//! O(1) amortized time, a single finalize pass sorts every series, and the
//! resulting store is immutable and lock-free to query from any number of
//! threads.
//!
//! ## Key Properties
//!
//! - Servers keyed by the 32-bit big-endian encoding of their IPv4 address;
//!   no string hashing on the query path
//! - O(1) start-index location on gap-free minute-spaced series, with a
//!   binary-search fallback that stays correct on gapped or irregular data
//! - Strict two-phase lifecycle: mutation after finalize and queries before
//!   it are errors, never silent misbehavior
//! - Malformed log rows are reported and skipped; one bad row cannot poison
//!   a batch
//!
//! ## Quick Start
//!
//! ```rust
//! use fleetmon::{RangeRequest, RawRecord, SeriesStore, StoreConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = SeriesStore::new(StoreConfig::default())?;
//!
//! // Ingest rows in any order, then finalize once.
//! for minute in 0..3 {
//!     store.ingest(&RawRecord {
//!         timestamp: 1_414_713_600 + minute * 60,
//!         server_ip: "192.168.1.10".to_string(),
//!         cpu: 0,
//!         usage: 40,
//!     })?;
//! }
//! store.finalize()?;
//!
//! // Query a half-open range: [00:00, 00:02) matches the first two rows.
//! let request = RangeRequest::new(
//!     "192.168.1.10".parse()?,
//!     0,
//!     1_414_713_600,
//!     1_414_713_600 + 120,
//! );
//! let samples = store.query(&request)?.collect_all();
//! assert_eq!(samples.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`SeriesStore`] — owns all series; ingest/finalize/query lifecycle
//! - [`RangeRequest`] / [`QueryResult`] — bounded queries and their lazily
//!   walked results
//! - [`ingest::load_dir`] — reads a directory of per-minute log files
//! - [`timefmt`] — `"YYYY-MM-DD HH:MM"` ↔ epoch-seconds conversion
//!
//! ## Modules
//!
//! For lower-level access, the individual modules are also public:
//!
//! - [`store`] — store lifecycle, configuration, series lookup
//! - [`query`] — request/result types and start-index location
//! - [`sample`] — sample, server-key, and raw-row types
//! - [`ingest`] — log-directory loading
//! - [`timefmt`] — calendar time conversion
//! - [`error`] — error types

pub mod error;
pub mod ingest;
pub mod query;
pub mod sample;
pub mod store;
pub mod timefmt;

// Re-export primary API types at crate root for convenience.
pub use error::{FleetmonError, Result};
pub use ingest::{IngestStats, load_dir};
pub use query::{QueryResult, RangeRequest};
pub use sample::{RawRecord, Sample, ServerKey};
pub use store::{SAMPLE_INTERVAL_SECS, SeriesStore, StoreConfig};
