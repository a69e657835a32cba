//! Shared progress-event log.
//!
//! Every pipeline stage appends typed events here; an external status poller
//! reads them. The log is an injected, cloneable sink — never a process
//! global — and appending never fails from the producer's point of view:
//! a poisoned lock is logged and swallowed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::types::{Category, JobId};

// ---------------------------------------------------------------------------
// ProgressEvent
// ---------------------------------------------------------------------------

/// A typed record of pipeline activity, ordered by append position.
///
/// Ordering is per-category monotonic; interleaving across concurrently
/// running categories reflects task completion order and is not
/// deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A query is still streaming in; carries the growing partial text.
    QueryGenerating {
        query: String,
        query_number: usize,
        category: Category,
    },
    /// A query was finalized at a newline boundary.
    QueryGenerated {
        query: String,
        query_number: usize,
        category: Category,
    },
    /// Query generation finished for one category.
    QueriesComplete {
        queries: Vec<String>,
        count: usize,
        category: Category,
    },
    /// Search fan-out started.
    SearchStarted {
        total_queries: usize,
        category: Category,
    },
    /// One query's search failed; the run continues with the others.
    QueryError {
        query: String,
        error: String,
        category: Category,
    },
    /// Search fan-out finished; results merged by URL.
    SearchComplete {
        total_documents: usize,
        queries_processed: usize,
        category: Category,
    },
    /// One researcher finished and stored its documents.
    AnalysisComplete { category: Category, count: usize },
    /// The curator processed one category; `total` is the pre-cap evaluated
    /// count.
    Curation {
        category: Category,
        total: usize,
        message: String,
    },
    /// Briefing synthesis started for one category.
    BriefingStart {
        category: Category,
        total_docs: usize,
    },
    /// Briefing synthesis finished for one category.
    BriefingComplete {
        category: Category,
        content_length: usize,
    },
    /// Final report compilation started.
    ReportCompilation { message: String },
    /// An incremental chunk of the cleaned report, cut at a sentence
    /// boundary.
    ReportChunk { chunk: String },
    /// A stage-level error. The run may continue (search path, editor sweep)
    /// or abort (briefing path) depending on where it occurred.
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<Category>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Live status record for one research job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobStatus {
    pub company: String,
    pub status: String,
    pub events: Vec<ProgressEvent>,
}

// ---------------------------------------------------------------------------
// ProgressLog
// ---------------------------------------------------------------------------

/// Append-only progress sink keyed by job identifier.
///
/// Records are created lazily on first touch and live for the process
/// lifetime (no eviction). Clones share the same underlying log.
#[derive(Debug, Clone, Default)]
pub struct ProgressLog {
    inner: Arc<Mutex<HashMap<JobId, JobStatus>>>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job with its company name and mark it running.
    pub fn register(&self, job_id: &JobId, company: &str) {
        let Ok(mut map) = self.inner.lock() else {
            tracing::error!(%job_id, "progress log lock poisoned during register");
            return;
        };
        let record = map.entry(job_id.clone()).or_default();
        record.company = company.to_string();
        record.status = "running".into();
    }

    /// Update the job status string.
    pub fn set_status(&self, job_id: &JobId, status: &str) {
        let Ok(mut map) = self.inner.lock() else {
            tracing::error!(%job_id, "progress log lock poisoned during set_status");
            return;
        };
        map.entry(job_id.clone()).or_default().status = status.to_string();
    }

    /// Append an event for a job. Creates the record lazily; never blocks
    /// producers and never propagates a failure.
    pub fn append(&self, job_id: &JobId, event: ProgressEvent) {
        let Ok(mut map) = self.inner.lock() else {
            tracing::error!(%job_id, "progress log lock poisoned during append, event dropped");
            return;
        };
        map.entry(job_id.clone()).or_default().events.push(event);
    }

    /// Snapshot one job's record for external status polling.
    pub fn snapshot(&self, job_id: &JobId) -> Option<JobStatus> {
        let Ok(map) = self.inner.lock() else {
            tracing::error!(%job_id, "progress log lock poisoned during snapshot");
            return None;
        };
        map.get(job_id).cloned()
    }

    /// Number of events appended for a job so far.
    pub fn event_count(&self, job_id: &JobId) -> usize {
        self.snapshot(job_id).map(|s| s.events.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_creates_record_lazily() {
        let log = ProgressLog::new();
        let job = JobId::new();

        log.append(
            &job,
            ProgressEvent::Curation {
                category: Category::News,
                total: 3,
                message: "Curating news documents".into(),
            },
        );

        let status = log.snapshot(&job).expect("record created on first touch");
        assert_eq!(status.events.len(), 1);
        assert!(status.company.is_empty());
    }

    #[test]
    fn register_then_append_preserves_order() {
        let log = ProgressLog::new();
        let job = JobId::new();
        log.register(&job, "Tesla");

        for n in 1..=3 {
            log.append(
                &job,
                ProgressEvent::QueryGenerated {
                    query: format!("query {n}"),
                    query_number: n,
                    category: Category::Financial,
                },
            );
        }

        let status = log.snapshot(&job).unwrap();
        assert_eq!(status.company, "Tesla");
        assert_eq!(status.status, "running");
        let numbers: Vec<usize> = status
            .events
            .iter()
            .map(|e| match e {
                ProgressEvent::QueryGenerated { query_number, .. } => *query_number,
                _ => panic!("unexpected event"),
            })
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn clones_share_the_log() {
        let log = ProgressLog::new();
        let handle = log.clone();
        let job = JobId::new();

        handle.append(
            &job,
            ProgressEvent::ReportChunk {
                chunk: "Hello.".into(),
            },
        );
        assert_eq!(log.event_count(&job), 1);
    }

    #[test]
    fn event_wire_format_is_tagged() {
        let event = ProgressEvent::BriefingStart {
            category: Category::Company,
            total_docs: 12,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"briefing_start"#));
        assert!(json.contains(r#""category":"company"#));
        assert!(json.contains(r#""total_docs":12"#));
    }

    #[test]
    fn snapshot_of_unknown_job_is_none() {
        let log = ProgressLog::new();
        assert!(log.snapshot(&JobId::new()).is_none());
    }
}
