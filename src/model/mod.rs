//! Aggregation model: fold decoded log records into per-endpoint aggregates.
//!
//! Lifecycle:
//! - `track` for every record (any time, marks the store dirty)
//! - `calculate` once input is exhausted (fills analysis + top worker)
//! - `report` for the presentation layer (fails before the first calculate)
//!
//! Endpoints and workers keep first-seen order: reports list endpoints in the
//! order they first appeared, and top-worker ties go to the earliest worker.

mod error;
mod first_seen;

pub use error::StatsError;

use crate::analyze::{self, ResponseAnalysis, WorkerHits};
use crate::log::LogRecord;
use crate::track::{TrackedSignature, Tracking};
use first_seen::FirstSeenMap;
use serde::Serialize;

/// Length of the unit suffix on duration fields ("12ms").
const DURATION_SUFFIX_LEN: usize = 2;

/// Running totals for one tracked signature.
///
/// Invariant: hits == response_times.len() == sum(worker_counts).
#[derive(Debug, Clone, Default)]
pub struct EndpointAggregate {
    hits: u64,
    /// Arrival order; the analyzer sorts its own copy.
    response_times: Vec<u64>,
    worker_counts: FirstSeenMap<String, u64>,
    analysis: Option<ResponseAnalysis>,
    top_worker: Option<WorkerHits>,
}

impl EndpointAggregate {
    fn record(&mut self, sample: u64, worker_id: &str) {
        self.hits += 1;
        self.response_times.push(sample);
        *self.worker_counts.get_or_insert_with(worker_id, || 0) += 1;
    }

    fn calculate(&mut self) {
        self.analysis = Some(analyze::response_time_stats(
            &self.response_times,
            self.hits,
        ));
        self.top_worker = analyze::argmax_count(
            self.worker_counts
                .iter()
                .map(|(id, &count)| (id.as_str(), count)),
        );
    }
}

/// What `track` did with a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    Tracked(TrackedSignature),
    /// The path does not match the endpoint pattern.
    Unmatched,
    /// The path matched but the signature is not in the allow-list.
    Untracked(TrackedSignature),
    /// A duration field did not parse; the record was dropped.
    Rejected {
        field: &'static str,
        value: String,
    },
}

/// Ingestion counters, by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestCounters {
    pub seen: u64,
    pub tracked: u64,
    pub unmatched: u64,
    pub untracked: u64,
    pub rejected: u64,
}

#[derive(Debug, Clone)]
pub struct AggregationStore {
    tracking: Tracking,
    endpoints: FirstSeenMap<TrackedSignature, EndpointAggregate>,
    counters: IngestCounters,
    dirty: bool,
    calculated: bool,
}

impl AggregationStore {
    pub fn new(tracking: Tracking) -> Self {
        Self {
            tracking,
            endpoints: FirstSeenMap::default(),
            counters: IngestCounters::default(),
            dirty: false,
            calculated: false,
        }
    }

    /// Fold one record into the store.
    ///
    /// Only `TrackOutcome::Tracked` changes aggregates or the dirty flag.
    pub fn track(&mut self, record: &LogRecord) -> TrackOutcome {
        self.counters.seen += 1;

        let outcome = self.ingest(record);
        match &outcome {
            TrackOutcome::Tracked(_) => self.counters.tracked += 1,
            TrackOutcome::Unmatched => {
                self.counters.unmatched += 1;
                tracing::trace!(path = %record.path, "path does not match endpoint pattern");
            }
            TrackOutcome::Untracked(sig) => {
                self.counters.untracked += 1;
                tracing::trace!(signature = %sig, "signature not tracked");
            }
            TrackOutcome::Rejected { field, value } => {
                self.counters.rejected += 1;
                tracing::warn!(
                    path = %record.path,
                    field = *field,
                    value = %value,
                    "dropping record with malformed duration"
                );
            }
        }
        outcome
    }

    fn ingest(&mut self, record: &LogRecord) -> TrackOutcome {
        let Some(sig) = self.tracking.signature(&record.method, &record.path) else {
            return TrackOutcome::Unmatched;
        };

        if !self.tracking.is_tracked(&sig) {
            return TrackOutcome::Untracked(sig);
        }

        let Some(connect) = parse_duration(&record.connect) else {
            return TrackOutcome::Rejected {
                field: "connect",
                value: record.connect.clone(),
            };
        };
        let Some(service) = parse_duration(&record.service) else {
            return TrackOutcome::Rejected {
                field: "service",
                value: record.service.clone(),
            };
        };

        let aggregate = self.endpoints.get_or_insert_with(&sig, || {
            tracing::debug!(signature = %sig, "first hit for endpoint");
            EndpointAggregate::default()
        });
        aggregate.record(connect.saturating_add(service), &record.worker_id);

        self.dirty = true;
        TrackOutcome::Tracked(sig)
    }

    /// Run the analyzer over every endpoint, replacing earlier results.
    pub fn calculate(&mut self) {
        for (sig, aggregate) in self.endpoints.iter_mut() {
            aggregate.calculate();
            tracing::debug!(signature = %sig, hits = aggregate.hits, "calculated endpoint");
        }

        self.dirty = false;
        self.calculated = true;
    }

    /// Read-only view for presentation. Calculation is never triggered here.
    pub fn report(&self) -> Result<Report<'_>, StatsError> {
        if !self.calculated {
            return Err(StatsError::NotCalculated);
        }

        let endpoints = self
            .endpoints
            .iter()
            .map(|(sig, aggregate)| EndpointReport {
                signature: sig,
                hits: aggregate.hits,
                analysis: aggregate.analysis.as_ref(),
                top_worker: aggregate.top_worker.as_ref(),
            })
            .collect();

        Ok(Report {
            stale: self.dirty,
            endpoints,
        })
    }

    pub fn counters(&self) -> IngestCounters {
        self.counters
    }
}

/// Strip the unit suffix and parse the leading integer.
fn parse_duration(raw: &str) -> Option<u64> {
    let end = raw.len().checked_sub(DURATION_SUFFIX_LEN)?;
    raw.get(..end)?.trim().parse().ok()
}

#[derive(Debug, Clone, Serialize)]
pub struct Report<'a> {
    /// Records were tracked after the last calculate.
    pub stale: bool,
    pub endpoints: Vec<EndpointReport<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointReport<'a> {
    pub signature: &'a TrackedSignature,
    pub hits: u64,
    pub analysis: Option<&'a ResponseAnalysis>,
    pub top_worker: Option<&'a WorkerHits>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::TrackingSpec;
    use pretty_assertions::assert_eq;

    fn store() -> AggregationStore {
        AggregationStore::new(TrackingSpec::default().validate_and_build().unwrap())
    }

    fn record(method: &str, path: &str, worker: &str, connect: &str, service: &str) -> LogRecord {
        LogRecord {
            method: method.into(),
            path: path.into(),
            worker_id: worker.into(),
            connect: connect.into(),
            service: service.into(),
        }
    }

    fn endpoint<'a>(store: &'a AggregationStore, method: &str, template: &str) -> &'a EndpointAggregate {
        let sig = TrackedSignature::new(method, template);
        store
            .endpoints
            .iter()
            .find(|(s, _)| **s == sig)
            .map(|(_, agg)| agg)
            .unwrap()
    }

    fn workers(agg: &EndpointAggregate) -> Vec<(&str, u64)> {
        agg.worker_counts
            .iter()
            .map(|(id, &n)| (id.as_str(), n))
            .collect()
    }

    fn assert_invariant(store: &AggregationStore) {
        for (_, agg) in store.endpoints.iter() {
            let worker_total: u64 = agg.worker_counts.iter().map(|(_, n)| *n).sum();
            assert_eq!(agg.hits, agg.response_times.len() as u64);
            assert_eq!(agg.hits, worker_total);
        }
    }

    #[test]
    fn end_to_end_two_signatures() {
        let mut store = store();
        store.track(&record("GET", "/api/users/42/get_messages", "web.1", "5ms", "10ms"));
        store.track(&record("GET", "/api/users/42/get_messages", "web.2", "5ms", "20ms"));
        store.track(&record("GET", "/api/users/7", "web.1", "1ms", "1ms"));
        store.calculate();

        let messages = endpoint(&store, "GET", "/api/users/{user_id}/get_messages");
        assert_eq!(messages.hits, 2);
        let analysis = messages.analysis.as_ref().unwrap();
        assert_eq!(analysis.mean, Some(20.0));
        assert_eq!(analysis.median, Some(20.0));
        assert_eq!(analysis.mode, Some(vec![15, 25]));

        let user = endpoint(&store, "GET", "/api/users/{user_id}");
        assert_eq!(user.hits, 1);
        assert_eq!(
            user.top_worker,
            Some(WorkerHits {
                id: "web.1".into(),
                count: 1,
            })
        );

        assert_invariant(&store);
    }

    #[test]
    fn unmatched_path_leaves_store_untouched() {
        let mut store = store();
        let outcome = store.track(&record("GET", "/api/status", "web.1", "1ms", "1ms"));

        assert_eq!(outcome, TrackOutcome::Unmatched);
        assert!(store.endpoints.iter().next().is_none());
        assert!(!store.dirty);
        assert_eq!(store.counters().unmatched, 1);
    }

    #[test]
    fn untracked_signature_is_ignored() {
        let mut store = store();
        let outcome = store.track(&record(
            "DELETE",
            "/api/users/9/get_messages",
            "web.1",
            "1ms",
            "1ms",
        ));

        assert_eq!(
            outcome,
            TrackOutcome::Untracked(TrackedSignature::new(
                "DELETE",
                "/api/users/{user_id}/get_messages"
            ))
        );
        assert!(store.endpoints.iter().next().is_none());
        assert!(!store.dirty);
    }

    #[test]
    fn record_method_case_is_normalized() {
        let mut store = store();
        let outcome = store.track(&record("get", "/api/users/9", "web.1", "1ms", "1ms"));

        assert_eq!(
            outcome,
            TrackOutcome::Tracked(TrackedSignature::new("GET", "/api/users/{user_id}"))
        );
        assert_eq!(endpoint(&store, "GET", "/api/users/{user_id}").hits, 1);
    }

    #[test]
    fn malformed_duration_is_rejected() {
        let mut store = store();
        let outcome = store.track(&record("GET", "/api/users/9", "web.1", "fast", "3ms"));

        assert_eq!(
            outcome,
            TrackOutcome::Rejected {
                field: "connect",
                value: "fast".into(),
            }
        );
        let outcome = store.track(&record("GET", "/api/users/9", "web.1", "3ms", "s"));
        assert_eq!(
            outcome,
            TrackOutcome::Rejected {
                field: "service",
                value: "s".into(),
            }
        );

        assert!(store.endpoints.iter().next().is_none());
        assert!(!store.dirty);
        assert_eq!(store.counters().rejected, 2);
    }

    #[test]
    fn parse_duration_strips_fixed_suffix() {
        assert_eq!(parse_duration("12ms"), Some(12));
        assert_eq!(parse_duration("0ms"), Some(0));
        assert_eq!(parse_duration("ms"), None);
        assert_eq!(parse_duration("m"), None);
        assert_eq!(parse_duration("-3ms"), None);
    }

    #[test]
    fn worker_counts_accumulate_in_first_seen_order() {
        let mut store = store();
        for worker in ["web.3", "web.1", "web.3", "web.2", "web.3"] {
            store.track(&record("POST", "/api/users/1", worker, "1ms", "2ms"));
        }
        store.calculate();

        let agg = endpoint(&store, "POST", "/api/users/{user_id}");
        assert_eq!(workers(agg), vec![("web.3", 3), ("web.1", 1), ("web.2", 1)]);
        assert_eq!(agg.top_worker.as_ref().map(|w| w.count), Some(3));
        assert_invariant(&store);
    }

    #[test]
    fn top_worker_tie_goes_to_first_seen_worker() {
        // "web.10" sorts before "web.2" but arrives later.
        let mut store = store();
        for worker in ["web.2", "web.2", "web.10", "web.10"] {
            store.track(&record("GET", "/api/users/1", worker, "1ms", "2ms"));
        }
        store.calculate();

        let agg = endpoint(&store, "GET", "/api/users/{user_id}");
        assert_eq!(
            agg.top_worker,
            Some(WorkerHits {
                id: "web.2".into(),
                count: 2,
            })
        );
    }

    #[test]
    fn report_lists_endpoints_in_first_seen_order() {
        let mut store = store();
        store.track(&record("POST", "/api/users/1", "web.1", "1ms", "2ms"));
        store.track(&record("GET", "/api/users/1/get_messages", "web.1", "1ms", "2ms"));
        store.track(&record("GET", "/api/users/1", "web.1", "1ms", "2ms"));
        store.track(&record("POST", "/api/users/2", "web.1", "1ms", "2ms"));
        store.calculate();

        let report = store.report().unwrap();
        let keys: Vec<String> = report
            .endpoints
            .iter()
            .map(|e| e.signature.to_string())
            .collect();
        assert_eq!(
            keys,
            vec![
                "POST::/api/users/{user_id}",
                "GET::/api/users/{user_id}/get_messages",
                "GET::/api/users/{user_id}",
            ]
        );
    }

    #[test]
    fn report_before_calculate_fails() {
        let mut store = store();
        store.track(&record("GET", "/api/users/1", "web.1", "1ms", "2ms"));
        assert_eq!(store.report().unwrap_err(), StatsError::NotCalculated);

        // Also on an empty store.
        assert_eq!(self::store().report().unwrap_err(), StatsError::NotCalculated);
    }

    #[test]
    fn calculate_is_idempotent() {
        let mut store = store();
        store.track(&record("GET", "/api/users/1", "web.1", "1ms", "2ms"));
        store.track(&record("GET", "/api/users/1", "web.2", "4ms", "2ms"));

        store.calculate();
        let first = endpoint(&store, "GET", "/api/users/{user_id}").clone();
        store.calculate();
        let second = endpoint(&store, "GET", "/api/users/{user_id}");

        assert_eq!(first.analysis, second.analysis);
        assert_eq!(first.top_worker, second.top_worker);
        assert!(!store.dirty);
        assert!(store.calculated);
    }

    #[test]
    fn tracking_after_calculate_marks_report_stale() {
        let mut store = store();
        store.track(&record("GET", "/api/users/1", "web.1", "1ms", "2ms"));
        store.calculate();
        assert!(!store.report().unwrap().stale);

        store.track(&record("GET", "/api/users/2/get_friends_score", "web.1", "1ms", "2ms"));
        let report = store.report().unwrap();
        assert!(report.stale);
        assert!(store.calculated);

        // The endpoint first seen after calculate has no analysis yet.
        let late = report
            .endpoints
            .iter()
            .find(|e| e.signature.template.ends_with("get_friends_score"))
            .unwrap();
        assert_eq!(late.analysis, None);
        assert_eq!(late.hits, 1);
    }

    #[test]
    fn response_times_keep_arrival_order_after_calculate() {
        let mut store = store();
        for (c, s) in [("9ms", "1ms"), ("1ms", "1ms"), ("4ms", "1ms")] {
            store.track(&record("GET", "/api/users/1", "web.1", c, s));
        }
        store.calculate();

        let agg = endpoint(&store, "GET", "/api/users/{user_id}");
        assert_eq!(agg.response_times, vec![10, 2, 5]);
        assert_eq!(agg.analysis.as_ref().unwrap().median, Some(5.0));
    }
}
