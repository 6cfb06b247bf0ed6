//! Range-query types and start-index location over sorted sample series.
//!
//! A query asks for every sample of one (server, CPU) series whose
//! timestamp falls in the half-open interval `[start, end)`. Locating the
//! first matching index uses a two-path design:
//!
//! - **Direct path** — fleet collectors emit one sample per minute, so on a
//!   gap-free series the start index is plain arithmetic:
//!   `(start - first) / interval`. The computed candidate is accepted only
//!   after an O(1) boundary check that proves it is the first index at or
//!   past `start`, so irregular data can never produce a wrong answer, only
//!   a fallback.
//! - **Fallback path** — binary search over the sorted series (O(log n)),
//!   correct for any spacing, gaps, or duplicate timestamps.
//!
//! From the located index the result walks forward, yielding samples until
//! one reaches `end`. Output is ascending by timestamp regardless of which
//! path located the start; both paths must agree on every series.

use crate::error::ParseError;
use crate::sample::{Sample, ServerKey};
use crate::store::SAMPLE_INTERVAL_SECS;
use crate::timefmt;

/// A bounded range query for one (server, CPU) series.
///
/// The interval is half-open: samples with `start <= timestamp < end`
/// match. Requests are plain values; all query state lives here rather than
/// in any process-wide parser or session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRequest {
    /// Server identity.
    pub key: ServerKey,
    /// CPU index on the server.
    pub cpu: usize,
    /// Inclusive interval start, seconds since the Unix epoch.
    pub start: i64,
    /// Exclusive interval end, seconds since the Unix epoch.
    pub end: i64,
}

impl RangeRequest {
    /// Creates a new request. Validation happens at query time.
    pub const fn new(key: ServerKey, cpu: usize, start: i64, end: i64) -> Self {
        Self {
            key,
            cpu,
            start,
            end,
        }
    }

    /// Builds a request from the textual fields carried by the query
    /// protocol: a dotted-quad address and two `"YYYY-MM-DD HH:MM"` UTC
    /// timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the address or either timestamp is
    /// malformed.
    pub fn from_text(ip: &str, cpu: usize, start: &str, end: &str) -> Result<Self, ParseError> {
        Ok(Self {
            key: ip.parse()?,
            cpu,
            start: timefmt::parse_datetime(start)?,
            end: timefmt::parse_datetime(end)?,
        })
    }
}

/// Ordered samples matched by a range query.
///
/// Wraps the series tail beginning at the located start index and yields
/// samples lazily while they fall inside the requested interval, together
/// with metadata about how the start was located. The store is only read;
/// iterating never allocates.
#[derive(Debug, Clone)]
pub struct QueryResult<'a> {
    rest: &'a [Sample],
    requested: (i64, i64),
    used_direct_index: bool,
}

impl<'a> QueryResult<'a> {
    /// Wraps the series tail starting at the located index.
    pub(crate) fn new(rest: &'a [Sample], requested: (i64, i64), used_direct_index: bool) -> Self {
        Self {
            rest,
            requested,
            used_direct_index,
        }
    }

    /// Returns the `(start, end)` interval that was requested.
    pub fn requested_range(&self) -> (i64, i64) {
        self.requested
    }

    /// Returns whether the start index was located by direct interval
    /// arithmetic rather than binary search.
    ///
    /// Both paths return identical samples; this is diagnostic metadata.
    pub fn used_direct_index(&self) -> bool {
        self.used_direct_index
    }

    /// Collects all matching samples into a vector.
    ///
    /// Convenience for callers that need the whole result in memory; for
    /// large results prefer iterating directly.
    pub fn collect_all(self) -> Vec<Sample> {
        self.collect()
    }
}

impl Iterator for QueryResult<'_> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        let (&sample, rest) = self.rest.split_first()?;
        if sample.timestamp < self.requested.1 {
            self.rest = rest;
            Some(sample)
        } else {
            // Series is sorted, so the first sample at or past `end` ends
            // the walk for good.
            self.rest = &[];
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.rest.len()))
    }
}

/// Locates the first index whose timestamp is `>= start`.
///
/// Tries direct fixed-interval arithmetic first and falls back to binary
/// search when the boundary check rejects the computed candidate. Returns
/// the index and whether the direct path was taken.
///
/// The caller has already established `first <= start <= last`, so the
/// returned index is always in range.
pub(crate) fn locate_start(series: &[Sample], start: i64) -> (usize, bool) {
    if let Some(index) = direct_start_index(series, start) {
        (index, true)
    } else {
        (series.partition_point(|s| s.timestamp < start), false)
    }
}

/// Direct index arithmetic under the one-sample-per-minute assumption.
///
/// The candidate index is only returned once the boundary check proves it
/// is the first index with `timestamp >= start`: the candidate itself sits
/// at or past `start` and its predecessor (if any) strictly before. The
/// check only reads two samples, so a series with gaps ahead of `start`
/// costs one failed probe before the binary-search fallback.
fn direct_start_index(series: &[Sample], start: i64) -> Option<usize> {
    let first = series.first()?.timestamp;
    let offset = start.checked_sub(first).filter(|o| *o >= 0)?;
    let index =
        usize::try_from((offset as u64).div_ceil(SAMPLE_INTERVAL_SECS as u64)).ok()?;
    let candidate = series.get(index)?;
    (candidate.timestamp >= start && (index == 0 || series[index - 1].timestamp < start))
        .then_some(index)
}
