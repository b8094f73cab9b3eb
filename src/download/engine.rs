//! Batch runner for fetching several files concurrently.
//!
//! [`BatchFetcher`] fans a list of URLs out over Tokio tasks, bounded by a
//! semaphore. Each file succeeds or fails on its own: a failure is recorded
//! in the [`BatchReport`] and the remaining files keep going.
//!
//! # Example
//!
//! ```no_run
//! use sharefetch_core::download::{BatchFetcher, CacheDir, FetchOptions, Fetcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Fetcher::new(CacheDir::default(), FetchOptions::default())?;
//! let batch = BatchFetcher::new(4)?;
//! let urls = vec!["https://example.com/a.zip".to_string()];
//! let report = batch.fetch_all(&fetcher, &urls).await?;
//! println!("Completed: {}, Failed: {}", report.completed(), report.failed());
//! # Ok(())
//! # }
//! ```

use std::fmt::Write as _;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use super::client::{Fetcher, RetrievalResult};
use super::error::FetchError;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Default concurrency if not specified.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Error type for batch runner operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// Outcome of one URL in a batch.
#[derive(Debug)]
pub struct FileOutcome {
    /// The URL as given to the batch.
    pub url: String,
    /// The fetch result for that URL.
    pub result: Result<RetrievalResult, FetchError>,
}

/// Per-URL outcomes of a batch run, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    /// All outcomes, in the order the URLs were given.
    #[must_use]
    pub fn outcomes(&self) -> &[FileOutcome] {
        &self.outcomes
    }

    /// Consumes the report, returning the outcomes.
    #[must_use]
    pub fn into_outcomes(self) -> Vec<FileOutcome> {
        self.outcomes
    }

    /// Number of files that landed in the cache directory.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Number of files that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.completed()
    }

    /// Total number of files processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Successful retrievals.
    pub fn successes(&self) -> impl Iterator<Item = (&str, &RetrievalResult)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|r| (o.url.as_str(), r)))
    }

    /// Failed retrievals.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &FetchError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.url.as_str(), e)))
    }

    /// One line per failure, `[kind] url: error`, or `None` when all succeeded.
    #[must_use]
    pub fn failure_summary(&self) -> Option<String> {
        let failed = self.failed();
        if failed == 0 {
            return None;
        }
        let mut summary = format!("{failed} of {} downloads failed:", self.total());
        for (url, error) in self.failures() {
            let _ = write!(summary, "\n  [{}] {url}: {error}", error.kind().as_str());
        }
        Some(summary)
    }
}

/// Runs many fetches with a concurrency cap.
///
/// # Concurrency Model
///
/// - Each fetch runs in its own Tokio task
/// - A semaphore permit is acquired before spawning each task
/// - Permits are released automatically when fetches complete (RAII)
/// - A panicked task becomes a failed outcome for its URL; siblings continue
#[derive(Debug)]
pub struct BatchFetcher {
    semaphore: Arc<Semaphore>,
    concurrency: usize,
}

impl BatchFetcher {
    /// Creates a batch runner that keeps at most `concurrency` fetches in flight.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-100).
    ///
    /// # Example
    ///
    /// ```
    /// use sharefetch_core::download::BatchFetcher;
    ///
    /// let batch = BatchFetcher::new(4).unwrap();
    /// assert_eq!(batch.concurrency(), 4);
    /// ```
    #[instrument(level = "debug")]
    pub fn new(concurrency: usize) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fetches every URL, returning one outcome per URL in input order.
    ///
    /// Individual failures do NOT make this method error; they are recorded
    /// in the report. A task that panics is reported as
    /// [`FetchError::TaskFailed`] for its URL.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SemaphoreClosed`] if the semaphore is closed.
    #[instrument(skip(self, fetcher, urls), fields(files = urls.len()))]
    pub async fn fetch_all(
        &self,
        fetcher: &Fetcher,
        urls: &[String],
    ) -> Result<BatchReport, EngineError> {
        let fetcher = fetcher.clone();
        self.run_all(urls, move |url| {
            let fetcher = fetcher.clone();
            async move { fetcher.fetch(&url).await }
        })
        .await
    }

    async fn run_all<F, Fut>(&self, urls: &[String], fetch: F) -> Result<BatchReport, EngineError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<RetrievalResult, FetchError>> + Send + 'static,
    {
        let mut handles = Vec::with_capacity(urls.len());

        info!(concurrency = self.concurrency, "starting batch");

        for url in urls {
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| EngineError::SemaphoreClosed)?;

            let task = fetch(url.clone());
            handles.push((
                url.clone(),
                tokio::spawn(async move {
                    let _permit = permit;
                    task.await
                }),
            ));
        }

        debug!(task_count = handles.len(), "waiting for fetches to complete");

        let mut outcomes = Vec::with_capacity(handles.len());
        for (url, handle) in handles {
            let result = handle.await.unwrap_or_else(|e| {
                warn!(url = %url, error = %e, "fetch task panicked");
                Err(FetchError::task_failed(&url, e.to_string()))
            });
            if let Err(e) = &result {
                warn!(url = %url, kind = e.kind().as_str(), error = %e, "fetch failed");
            }
            outcomes.push(FileOutcome { url, result });
        }

        let report = BatchReport { outcomes };
        info!(
            completed = report.completed(),
            failed = report.failed(),
            total = report.total(),
            "batch complete"
        );
        Ok(report)
    }
}
