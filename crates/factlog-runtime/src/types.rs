//! Runtime types: the current job and per-document outcomes.

use serde::Serialize;

use std::collections::HashSet;

use factlog_core::{DateKey, FactEntry, FactsByDay};

/// Lifecycle of the current job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Idle,
    Processing,
    Done,
}

/// Lifecycle of one document within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentState {
    Pending,
    Processing,
    Done,
    Failed,
    /// Not attempted because a newer batch replaced this one.
    Skipped,
}

/// What happened to one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentOutcome {
    pub url: String,
    pub state: DocumentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateKey>,
    #[serde(rename = "factsExtracted")]
    pub facts_extracted: usize,
    #[serde(rename = "factsAdded")]
    pub facts_added: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentOutcome {
    pub fn pending(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: DocumentState::Pending,
            date: None,
            facts_extracted: 0,
            facts_added: 0,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            DocumentState::Done | DocumentState::Failed | DocumentState::Skipped
        )
    }
}

/// The single current job. Replaced wholesale on every submission.
#[derive(Debug, Clone)]
pub struct Job {
    pub batch_id: Option<String>,
    pub question: Option<String>,
    pub status: JobStatus,
    pub documents: Vec<DocumentOutcome>,
    /// Facts this batch extracted, whether or not the store already had them.
    pub facts: FactsByDay,
    pub submitted_at: Option<i64>,
    pub completed_at: Option<i64>,
}

impl Job {
    pub fn idle() -> Self {
        Self {
            batch_id: None,
            question: None,
            status: JobStatus::Idle,
            documents: Vec::new(),
            facts: FactsByDay::new(),
            submitted_at: None,
            completed_at: None,
        }
    }

    pub fn start(batch_id: String, question: String, urls: &[String]) -> Self {
        Self {
            batch_id: Some(batch_id),
            question: Some(question),
            status: JobStatus::Processing,
            documents: urls.iter().map(DocumentOutcome::pending).collect(),
            facts: FactsByDay::new(),
            submitted_at: Some(now_millis()),
            completed_at: None,
        }
    }

    pub fn is_batch(&self, batch_id: &str) -> bool {
        self.batch_id.as_deref() == Some(batch_id)
    }

    /// Merge one document's facts into this job's buckets, keeping the first
    /// occurrence of each `(question, fact)` pair. No bucket is created for
    /// an empty `entries`.
    pub fn record_facts(&mut self, date: &DateKey, entries: &[FactEntry]) {
        if entries.is_empty() {
            return;
        }
        let bucket = self.facts.entry(date.clone()).or_default();
        let mut seen: HashSet<(String, String)> = bucket
            .iter()
            .map(|e| (e.question.clone(), e.fact.clone()))
            .collect();
        for entry in entries {
            if seen.insert((entry.question.clone(), entry.fact.clone())) {
                bucket.push(entry.clone());
            }
        }
    }
}

/// Read-only view of the current job for pollers.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    #[serde(rename = "batchId")]
    pub batch_id: Option<String>,
    pub question: Option<String>,
    pub status: JobStatus,
    pub documents: Vec<DocumentOutcome>,
    /// Present once the job is done: the facts this batch extracted, by date.
    #[serde(rename = "factsByDay", skip_serializing_if = "Option::is_none")]
    pub facts_by_day: Option<FactsByDay>,
    #[serde(rename = "submittedAt", skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<i64>,
    #[serde(rename = "completedAt", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

/// Final result of one batch worker.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    #[serde(rename = "batchId")]
    pub batch_id: String,
    pub documents: Vec<DocumentOutcome>,
    #[serde(rename = "factsAdded")]
    pub facts_added: usize,
    /// A newer submission replaced this batch before it finished.
    pub superseded: bool,
}

impl BatchReport {
    pub fn failed_count(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| d.state == DocumentState::Failed)
            .count()
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_job() {
        let job = Job::idle();
        assert_eq!(job.status, JobStatus::Idle);
        assert!(!job.is_batch("anything"));
        assert!(job.facts.is_empty());
    }

    #[test]
    fn test_start_job() {
        let urls = vec!["a_b_20240115.vtt".to_string(), "a_b_20240116.vtt".to_string()];
        let job = Job::start("batch-1".into(), "Q".into(), &urls);
        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.is_batch("batch-1"));
        assert_eq!(job.documents.len(), 2);
        assert!(job.documents.iter().all(|d| d.state == DocumentState::Pending));
        assert!(job.submitted_at.is_some());
    }

    #[test]
    fn test_record_facts_merges_documents() {
        let urls = vec!["x".to_string(), "y".to_string()];
        let mut job = Job::start("b".into(), "Q".into(), &urls);
        let day = DateKey::parse("2024-01-15").unwrap();
        let blue = FactEntry::new("Q", "Use blue.").unwrap();
        let ship = FactEntry::new("Q", "Ship Friday.").unwrap();

        job.record_facts(&day, &[blue.clone(), blue.clone()]);
        job.record_facts(&day, &[ship.clone(), blue.clone()]);
        job.record_facts(&DateKey::parse("2024-01-16").unwrap(), &[]);

        assert_eq!(job.facts.len(), 1);
        assert_eq!(job.facts[&day], vec![blue, ship]);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_value(JobStatus::Processing).unwrap(), "processing");
        assert_eq!(serde_json::to_value(DocumentState::Skipped).unwrap(), "skipped");

        let outcome = DocumentOutcome::pending("u");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["state"], "pending");
        assert_eq!(json["factsAdded"], 0);
        assert!(json.get("error").is_none());
        assert!(!outcome.is_terminal());
    }
}
