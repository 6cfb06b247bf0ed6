//! Series store for fleet CPU utilization samples.
//!
//! The store maps a [`ServerKey`] to a fixed number of per-CPU sample
//! series and is built in two phases:
//!
//! 1. **Ingestion** — raw rows are appended per (server, CPU) series in
//!    O(1) amortized time, in whatever order the log shards deliver them.
//!    No sorting happens here, so any number of sources can stream rows in.
//! 2. **Finalized** — [`SeriesStore::finalize`] stable-sorts every series
//!    ascending by timestamp and flips the store immutable. From then on
//!    every operation takes `&self`, so a finalized store can be shared
//!    across any number of query threads without locking.
//!
//! Duplicate timestamps survive the sort in their ingestion order; the
//! store never collapses or fabricates samples.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, IngestError, ParseError, QueryError, Result};
use crate::query::{self, QueryResult, RangeRequest};
use crate::sample::{MAX_USAGE, RawRecord, Sample, ServerKey};

/// Expected spacing between consecutive samples of a well-formed series,
/// in seconds. Fleet collectors report once per minute.
pub const SAMPLE_INTERVAL_SECS: i64 = 60;

/// Configuration for a [`SeriesStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Number of per-CPU series allocated for every server.
    ///
    /// CPU indices in ingested rows and queries must be in
    /// `0..cpus_per_server`.
    pub cpus_per_server: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { cpus_per_server: 2 }
    }
}

impl StoreConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCpuCount`] if `cpus_per_server` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.cpus_per_server == 0 {
            return Err(ConfigError::InvalidCpuCount { count: 0 }.into());
        }
        Ok(())
    }
}

/// Per-server storage: one sample series per CPU index.
///
/// Allocated with the configured CPU count on first sight of a server key;
/// indexed only after the CPU index has been validated against the config.
#[derive(Debug)]
struct ServerRecord {
    series: Box<[Vec<Sample>]>,
}

impl ServerRecord {
    fn new(cpus: usize) -> Self {
        Self {
            series: vec![Vec::new(); cpus].into_boxed_slice(),
        }
    }
}

/// In-memory store of per-(server, CPU) utilization series.
///
/// # Thread Safety
///
/// Ingestion is single-writer (`&mut self`). Once finalized the store is
/// read-only and safe for unlimited concurrent readers. Shards that ingest
/// in parallel must each accumulate into a private store or merge under
/// exclusive access before the single finalize call.
#[derive(Debug)]
pub struct SeriesStore {
    /// Store configuration.
    config: StoreConfig,
    /// Map from server key to its per-CPU series.
    servers: HashMap<ServerKey, ServerRecord>,
    /// Whether `finalize` has run. Queries require it; ingestion forbids it.
    finalized: bool,
}

impl SeriesStore {
    /// Creates an empty store in the ingesting state.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCpuCount`] if the configuration is
    /// invalid.
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            servers: HashMap::new(),
            finalized: false,
        })
    }

    /// Appends one raw row to its (server, CPU) series.
    ///
    /// O(1) amortized; rows may arrive in any timestamp order. The first
    /// row for a new server allocates its record with one empty series per
    /// configured CPU.
    ///
    /// # Errors
    ///
    /// - [`IngestError::AlreadyFinalized`] once [`finalize`](Self::finalize)
    ///   has run.
    /// - [`IngestError::Malformed`] if the address does not parse or the
    ///   usage is not a percentage.
    /// - [`IngestError::CpuIndexOutOfRange`] if `record.cpu` is outside
    ///   the configured range.
    pub fn ingest(&mut self, record: &RawRecord) -> Result<()> {
        if self.finalized {
            return Err(IngestError::AlreadyFinalized.into());
        }

        let key: ServerKey = record
            .server_ip
            .parse()
            .map_err(IngestError::Malformed)?;

        let cpus = self.config.cpus_per_server;
        if record.cpu >= cpus {
            return Err(IngestError::CpuIndexOutOfRange {
                cpu: record.cpu,
                cpus,
            }
            .into());
        }

        if record.usage > MAX_USAGE {
            return Err(IngestError::Malformed(ParseError::UsageOutOfRange {
                value: record.usage,
            })
            .into());
        }

        let server = self
            .servers
            .entry(key)
            .or_insert_with(|| ServerRecord::new(cpus));
        server.series[record.cpu].push(Sample::new(record.timestamp, record.usage));

        Ok(())
    }

    /// Appends every row of one ingestion batch.
    ///
    /// Stops at the first erroneous row and returns its error; rows already
    /// appended stay in the store. Callers that prefer skip-and-continue
    /// semantics ingest rows individually, as the log-directory loader
    /// does. Returns the number of rows appended.
    ///
    /// # Errors
    ///
    /// Same conditions as [`ingest`](Self::ingest).
    pub fn ingest_batch<I>(&mut self, rows: I) -> Result<u64>
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let mut appended = 0;
        for row in rows {
            self.ingest(&row)?;
            appended += 1;
        }
        Ok(appended)
    }

    /// Sorts every series and flips the store immutable.
    ///
    /// The sort is stable and keyed by timestamp only, so rows with equal
    /// timestamps keep their ingestion order and duplicates are preserved
    /// as separate entries. Must be called exactly once, after all
    /// ingestion batches and before any query.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::AlreadyFinalized`] on a second call.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Err(IngestError::AlreadyFinalized.into());
        }

        for server in self.servers.values_mut() {
            for series in &mut server.series {
                series.sort_by_key(|sample| sample.timestamp);
            }
        }
        self.finalized = true;

        tracing::debug!(
            servers = self.servers.len(),
            samples = self.sample_count(),
            "store finalized"
        );
        Ok(())
    }

    /// Returns whether [`finalize`](Self::finalize) has run.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the number of distinct servers seen during ingestion.
    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Returns the total number of samples across all series.
    pub fn sample_count(&self) -> u64 {
        self.servers
            .values()
            .flat_map(|server| server.series.iter())
            .map(|series| series.len() as u64)
            .sum()
    }

    /// Returns the read-only series for `key`/`cpu`.
    ///
    /// An empty series (server seen, but no samples for this CPU) is a
    /// legal result, not an error.
    ///
    /// # Errors
    ///
    /// - [`QueryError::NotFinalized`] before [`finalize`](Self::finalize).
    /// - [`QueryError::CpuIndexOutOfRange`] if `cpu` is outside the
    ///   configured range.
    /// - [`QueryError::ServerNotFound`] if the key was never ingested.
    pub fn series(&self, key: ServerKey, cpu: usize) -> Result<&[Sample]> {
        if !self.finalized {
            return Err(QueryError::NotFinalized.into());
        }

        let cpus = self.config.cpus_per_server;
        if cpu >= cpus {
            return Err(QueryError::CpuIndexOutOfRange { cpu, cpus }.into());
        }

        let server = self
            .servers
            .get(&key)
            .ok_or(QueryError::ServerNotFound { key })?;
        Ok(&server.series[cpu])
    }

    /// Answers a bounded range query: every sample of the requested series
    /// with `start <= timestamp < end`, ascending.
    ///
    /// The start index is located by direct interval arithmetic when the
    /// series is gap-free through `start`, and by binary search otherwise;
    /// see [`crate::query`] for the two-path design. The store is only
    /// read; a failed query leaves it fully usable.
    ///
    /// # Errors
    ///
    /// - [`QueryError::InvalidRange`] if `start > end`, checked before
    ///   anything else (`start == end` is a valid empty interval).
    /// - [`QueryError::NotFinalized`], [`QueryError::CpuIndexOutOfRange`],
    ///   [`QueryError::ServerNotFound`] as for [`series`](Self::series).
    /// - [`QueryError::RangeOutOfBounds`] if the series is empty or
    ///   `start` falls outside the series' sample span.
    pub fn query(&self, req: &RangeRequest) -> Result<QueryResult<'_>> {
        if req.start > req.end {
            return Err(QueryError::InvalidRange {
                start: req.start,
                end: req.end,
            }
            .into());
        }

        let series = self.series(req.key, req.cpu)?;

        let (first, last) = match (series.first(), series.last()) {
            (Some(first), Some(last)) => (first.timestamp, last.timestamp),
            _ => {
                return Err(QueryError::RangeOutOfBounds {
                    start: req.start,
                    end: req.end,
                    span: None,
                }
                .into());
            }
        };
        if req.start < first || req.start > last {
            return Err(QueryError::RangeOutOfBounds {
                start: req.start,
                end: req.end,
                span: Some((first, last)),
            }
            .into());
        }

        let (index, direct) = query::locate_start(series, req.start);
        Ok(QueryResult::new(
            &series[index..],
            (req.start, req.end),
            direct,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ts: i64, ip: &str, cpu: usize, usage: u8) -> RawRecord {
        RawRecord {
            timestamp: ts,
            server_ip: ip.to_string(),
            cpu,
            usage,
        }
    }

    #[test]
    fn default_config_has_two_cpus() {
        assert_eq!(StoreConfig::default().cpus_per_server, 2);
    }

    #[test]
    fn zero_cpu_config_is_rejected() {
        let result = SeriesStore::new(StoreConfig { cpus_per_server: 0 });
        assert!(matches!(
            result.unwrap_err(),
            crate::error::FleetmonError::Config(ConfigError::InvalidCpuCount { count: 0 })
        ));
    }

    #[test]
    fn first_row_allocates_all_cpu_series() {
        let mut store = SeriesStore::new(StoreConfig { cpus_per_server: 4 }).unwrap();
        store.ingest(&record(0, "10.0.0.1", 3, 12)).unwrap();
        store.finalize().unwrap();

        assert_eq!(store.server_count(), 1);
        let key = "10.0.0.1".parse().unwrap();
        // All four series exist; three are empty but queryable.
        for cpu in 0..4 {
            let series = store.series(key, cpu).unwrap();
            assert_eq!(series.len(), usize::from(cpu == 3));
        }
    }

    #[test]
    fn finalize_sorts_each_series_independently() {
        let mut store = SeriesStore::new(StoreConfig::default()).unwrap();
        for ts in [300, 60, 240, 0, 120] {
            store.ingest(&record(ts, "10.0.0.1", 0, 10)).unwrap();
        }
        for ts in [120, 0] {
            store.ingest(&record(ts, "10.0.0.1", 1, 20)).unwrap();
        }
        store.finalize().unwrap();

        let key = "10.0.0.1".parse().unwrap();
        let timestamps: Vec<i64> = store
            .series(key, 0)
            .unwrap()
            .iter()
            .map(|s| s.timestamp)
            .collect();
        assert_eq!(timestamps, vec![0, 60, 120, 240, 300]);

        let timestamps: Vec<i64> = store
            .series(key, 1)
            .unwrap()
            .iter()
            .map(|s| s.timestamp)
            .collect();
        assert_eq!(timestamps, vec![0, 120]);
    }

    #[test]
    fn usage_above_percentage_range_is_malformed() {
        let mut store = SeriesStore::new(StoreConfig::default()).unwrap();
        let result = store.ingest(&record(0, "10.0.0.1", 0, 101));
        assert!(matches!(
            result.unwrap_err(),
            crate::error::FleetmonError::Ingest(IngestError::Malformed(
                ParseError::UsageOutOfRange { value: 101 }
            ))
        ));
        // The failed row left no trace.
        assert_eq!(store.server_count(), 0);
    }

    #[test]
    fn sample_count_spans_servers_and_cpus() {
        let mut store = SeriesStore::new(StoreConfig::default()).unwrap();
        store.ingest(&record(0, "10.0.0.1", 0, 1)).unwrap();
        store.ingest(&record(0, "10.0.0.1", 1, 2)).unwrap();
        store.ingest(&record(0, "10.0.0.2", 0, 3)).unwrap();
        assert_eq!(store.sample_count(), 3);
        assert_eq!(store.server_count(), 2);
    }
}
