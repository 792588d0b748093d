//! Processing coordinator: runs one batch of call logs through
//! resolve → fetch → parse → extract → append, and tracks the single
//! current job for pollers.
//!
//! A submission replaces the current job. Batches run one at a time; a
//! worker whose batch has been replaced finishes the document it is on and
//! then stops, so it never writes status into the newer job.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::types::*;
use factlog_core::{DateKey, Error, FactEntry, FactLogConfig, Result};
use factlog_ingest::{date_key, DocumentFetcher, Transcript};
use factlog_llm::{FactExtractor, LanguageModel};
use factlog_store::FactStore;

/// Per-call time limits for the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub fetch_timeout: Duration,
    pub generate_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(factlog_core::config::DEFAULT_FETCH_TIMEOUT_SECS),
            generate_timeout: Duration::from_secs(factlog_core::config::DEFAULT_LLM_TIMEOUT_SECS),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &FactLogConfig) -> Self {
        Self {
            fetch_timeout: config.fetch_timeout(),
            generate_timeout: config.llm_timeout(),
        }
    }
}

/// A submitted batch running in the background.
pub struct BatchHandle {
    batch_id: String,
    join: JoinHandle<BatchReport>,
}

impl BatchHandle {
    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// Wait for the worker to finish.
    pub async fn wait(self) -> Result<BatchReport> {
        self.join
            .await
            .map_err(|e| Error::Internal(format!("Batch worker failed: {}", e)))
    }
}

/// Facts produced by one successfully processed document.
struct DocumentSummary {
    date: DateKey,
    entries: Vec<FactEntry>,
    extracted: usize,
    added: usize,
}

pub struct Coordinator {
    store: Arc<FactStore>,
    fetcher: Arc<dyn DocumentFetcher>,
    extractor: FactExtractor,
    settings: PipelineSettings,
    job: RwLock<Job>,
    run_lock: tokio::sync::Mutex<()>,
}

impl Coordinator {
    pub fn new(
        store: Arc<FactStore>,
        fetcher: Arc<dyn DocumentFetcher>,
        model: Arc<dyn LanguageModel>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            fetcher,
            extractor: FactExtractor::new(model),
            settings,
            job: RwLock::new(Job::idle()),
            run_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<FactStore> {
        &self.store
    }

    /// Replace the current job and process the batch in a background task.
    ///
    /// Returns as soon as the job reads `processing`.
    pub fn submit(self: &Arc<Self>, question: String, urls: Vec<String>) -> BatchHandle {
        let batch_id = self.begin(&question, &urls);
        let this = Arc::clone(self);
        let id = batch_id.clone();
        let join = tokio::spawn(async move { this.run_batch(&id, &question, &urls).await });
        BatchHandle { batch_id, join }
    }

    /// Replace the current job and process the batch on the caller's task.
    pub async fn process(&self, question: String, urls: Vec<String>) -> BatchReport {
        let batch_id = self.begin(&question, &urls);
        self.run_batch(&batch_id, &question, &urls).await
    }

    /// Snapshot of the current job. Once done it carries the facts this
    /// batch extracted, including ones the store already held. Facts other
    /// questions stored under the same dates are not included.
    pub fn status(&self) -> JobView {
        let job = self.job.read().clone();
        let facts_by_day = match job.status {
            JobStatus::Done => Some(job.facts),
            _ => None,
        };
        JobView {
            batch_id: job.batch_id,
            question: job.question,
            status: job.status,
            documents: job.documents,
            facts_by_day,
            submitted_at: job.submitted_at,
            completed_at: job.completed_at,
        }
    }

    pub fn current_question(&self) -> Option<String> {
        self.job.read().question.clone()
    }

    fn begin(&self, question: &str, urls: &[String]) -> String {
        let batch_id = Uuid::new_v4().to_string();
        let mut job = self.job.write();
        if job.status == JobStatus::Processing {
            if let Some(previous) = &job.batch_id {
                info!("Batch {} superseded by {}", previous, batch_id);
            }
        }
        *job = Job::start(batch_id.clone(), question.to_string(), urls);
        info!(
            "Batch {} submitted: {} document(s) for \"{}\"",
            batch_id,
            urls.len(),
            question
        );
        batch_id
    }

    fn is_current(&self, batch_id: &str) -> bool {
        self.job.read().is_batch(batch_id)
    }

    /// Apply `f` to the current job, if it is still ours.
    fn update_job(&self, batch_id: &str, f: impl FnOnce(&mut Job)) {
        let mut job = self.job.write();
        if job.is_batch(batch_id) {
            f(&mut job);
        }
    }

    fn update_document(&self, batch_id: &str, index: usize, f: impl FnOnce(&mut DocumentOutcome)) {
        self.update_job(batch_id, |job| {
            if let Some(doc) = job.documents.get_mut(index) {
                f(doc);
            }
        });
    }

    fn finish(&self, batch_id: &str) {
        let mut job = self.job.write();
        if job.is_batch(batch_id) {
            job.status = JobStatus::Done;
            job.completed_at = Some(now_millis());
        }
    }

    async fn run_batch(&self, batch_id: &str, question: &str, urls: &[String]) -> BatchReport {
        let _running = self.run_lock.lock().await;

        let mut report = BatchReport {
            batch_id: batch_id.to_string(),
            documents: Vec::with_capacity(urls.len()),
            facts_added: 0,
            superseded: false,
        };

        for (index, url) in urls.iter().enumerate() {
            if !self.is_current(batch_id) {
                report.superseded = true;
                break;
            }

            self.update_document(batch_id, index, |doc| doc.state = DocumentState::Processing);

            let mut outcome = DocumentOutcome::pending(url.as_str());
            match self.process_document(question, url).await {
                Ok(summary) => {
                    self.update_job(batch_id, |job| job.record_facts(&summary.date, &summary.entries));
                    outcome.state = DocumentState::Done;
                    outcome.date = Some(summary.date);
                    outcome.facts_extracted = summary.extracted;
                    outcome.facts_added = summary.added;
                    report.facts_added += summary.added;
                }
                Err(e) => {
                    if e.is_document_local() {
                        warn!("Skipping {}: {}", url, e);
                    } else {
                        error!("Failed to process {}: {}", url, e);
                    }
                    outcome.state = DocumentState::Failed;
                    outcome.error = Some(e.to_string());
                }
            }

            let recorded = outcome.clone();
            self.update_document(batch_id, index, move |doc| *doc = recorded);
            report.documents.push(outcome);
        }

        if !report.superseded && !self.is_current(batch_id) {
            report.superseded = true;
        }

        if report.superseded {
            let done = report.documents.len();
            report.documents.extend(urls[done..].iter().map(|url| DocumentOutcome {
                state: DocumentState::Skipped,
                ..DocumentOutcome::pending(url.as_str())
            }));
            warn!(
                "Batch {} stopped after {} of {} document(s)",
                batch_id,
                done,
                urls.len()
            );
        } else {
            self.finish(batch_id);
            info!(
                "Batch {} done: {} fact(s) added, {} document(s) failed",
                batch_id,
                report.facts_added,
                report.failed_count()
            );
        }

        report
    }

    async fn process_document(&self, question: &str, url: &str) -> Result<DocumentSummary> {
        let date = date_key::resolve(url)?;

        let text = timeout(self.settings.fetch_timeout, self.fetcher.fetch(url))
            .await
            .map_err(|_| {
                Error::Fetch(format!(
                    "{}: timed out after {}s",
                    url,
                    self.settings.fetch_timeout.as_secs_f64()
                ))
            })??;

        let transcript = Transcript::parse(text);
        if transcript.is_empty() {
            debug!("No transcript lines in {}", url);
            return Ok(DocumentSummary {
                date,
                entries: Vec::new(),
                extracted: 0,
                added: 0,
            });
        }

        let candidates = timeout(
            self.settings.generate_timeout,
            self.extractor.extract(question, &transcript),
        )
        .await
        .map_err(|_| {
            Error::Generation(format!(
                "timed out after {}s",
                self.settings.generate_timeout.as_secs_f64()
            ))
        })??;

        let extracted = candidates.len();
        let entries: Vec<FactEntry> = candidates
            .into_iter()
            .filter_map(|fact| FactEntry::new(question, fact).ok())
            .collect();
        let added = self.store.append(&date, entries.iter().cloned())?;

        debug!(
            "{} → {}: {} extracted, {} new",
            url, date, extracted, added
        );
        Ok(DocumentSummary {
            date,
            entries,
            extracted,
            added,
        })
    }
}
