//! Upload orchestration: tokenizer readiness, tank types, file upload and
//! batch submission, with toasts for every user-visible outcome.
//!
//! The coordinator owns all mutable upload state (selected tank type, last
//! preview, readiness) and exposes it through read-only projections.
//!
//! Submissions are not serialized: a second upload started while one is in
//! flight produces a second, independent remote write. `in_flight_submissions`
//! makes that observable.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::ingest::{assemble, CsvTokenizer, SubmissionBatch, Tokenizer, ValidatedRow};
use crate::notify::{Notifier, Toast};
use crate::salesforce::{ApexUploadClient, BatchReceipt, Category};

// ─────────────────────────────────────────────────────────────────────────────
// Remote Service Seam
// ─────────────────────────────────────────────────────────────────────────────

/// The two remote calls the upload flow depends on.
pub trait TankRecordService: Send + Sync {
    /// Lists the selectable tank types. Idempotent.
    fn list_categories(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Category>, AppError>> + Send + '_>>;

    /// Creates all tanks of the batch in one all-or-nothing write.
    fn create_records_batch<'a>(
        &'a self,
        batch: &'a SubmissionBatch,
    ) -> Pin<Box<dyn Future<Output = Result<BatchReceipt, AppError>> + Send + 'a>>;
}

impl TankRecordService for ApexUploadClient {
    fn list_categories(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Category>, AppError>> + Send + '_>> {
        Box::pin(ApexUploadClient::list_categories(self))
    }

    fn create_records_batch<'a>(
        &'a self,
        batch: &'a SubmissionBatch,
    ) -> Pin<Box<dyn Future<Output = Result<BatchReceipt, AppError>> + Send + 'a>> {
        Box::pin(ApexUploadClient::create_records_batch(self, batch))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// Where the coordinator is in the upload flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the tokenizer, or for the next file after an attempt.
    Idle,
    ParserReady,
    CategoriesLoaded,
    FileSelected,
    Submitting,
    Succeeded { accepted_count: usize },
    /// Terminal only when the tokenizer failed to load.
    Failed { message: String },
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    /// Rows sent, which is what the success message reports.
    pub accepted_count: usize,
    /// Rows the org reports as created, when it says.
    pub confirmed_count: Option<u64>,
}

/// Tank type as a select option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryOption {
    pub label: String,
    pub value: String,
}

/// One line of the upload preview list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewLine {
    pub key: String,
    pub text: String,
}

impl From<&ValidatedRow> for PreviewLine {
    fn from(row: &ValidatedRow) -> Self {
        let text = match &row.serial_number {
            Some(serial) => format!("Capacity: {} (serial {})", row.capacity, serial),
            None => format!("Capacity: {}", row.capacity),
        };
        Self {
            key: row.row_key.clone(),
            text,
        }
    }
}

/// A file chosen for upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a whole file from disk.
    pub async fn read(path: &Path) -> Result<Self, AppError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::FileUnreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { name, bytes })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Coordinator
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct UploadState {
    phase: Option<Phase>,
    tokenizer: Option<Arc<dyn Tokenizer>>,
    categories: Vec<Category>,
    selected_category: Option<String>,
    preview: Vec<ValidatedRow>,
    last_outcome: Option<Result<SubmissionOutcome, String>>,
}

/// Drives one upload session.
pub struct SubmissionCoordinator<S: TankRecordService> {
    service: S,
    notifier: Arc<dyn Notifier>,
    state: RwLock<UploadState>,
    in_flight: AtomicUsize,
}

impl<S: TankRecordService> SubmissionCoordinator<S> {
    pub fn new(service: S, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            service,
            notifier,
            state: RwLock::new(UploadState::default()),
            in_flight: AtomicUsize::new(0),
        }
    }

    // ── Projections ──────────────────────────────────────────────────────────

    pub async fn phase(&self) -> Phase {
        match self.state.read().await.phase.clone() {
            // Left behind by an attempt that was dropped mid-submission.
            Some(Phase::Submitting) if self.in_flight_submissions() == 0 => Phase::Idle,
            phase => phase.unwrap_or(Phase::Idle),
        }
    }

    pub async fn is_ready(&self) -> bool {
        self.state.read().await.tokenizer.is_some()
    }

    pub async fn categories(&self) -> Vec<Category> {
        self.state.read().await.categories.clone()
    }

    pub async fn category_options(&self) -> Vec<CategoryOption> {
        self.state
            .read()
            .await
            .categories
            .iter()
            .map(|c| CategoryOption {
                label: c.name.clone(),
                value: c.id.clone(),
            })
            .collect()
    }

    pub async fn selected_category(&self) -> Option<String> {
        self.state.read().await.selected_category.clone()
    }

    pub async fn preview(&self) -> Vec<PreviewLine> {
        self.state
            .read()
            .await
            .preview
            .iter()
            .map(PreviewLine::from)
            .collect()
    }

    /// Outcome of the most recent upload attempt; errors as their toast text.
    pub async fn last_outcome(&self) -> Option<Result<SubmissionOutcome, String>> {
        self.state.read().await.last_outcome.clone()
    }

    pub fn in_flight_submissions(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    // ── Actions ──────────────────────────────────────────────────────────────

    /// Loads the bundled CSV tokenizer, then the tank types.
    pub async fn initialize(&self) -> Result<(), AppError> {
        self.initialize_with(async {
            Ok::<_, AppError>(Arc::new(CsvTokenizer::default()) as Arc<dyn Tokenizer>)
        })
        .await
    }

    /// Waits for `loader` to provide the tokenizer, then loads the tank types.
    ///
    /// A loader failure is fatal for the session: the coordinator stays in
    /// `Failed` and later calls are not retried.
    pub async fn initialize_with<F>(&self, loader: F) -> Result<(), AppError>
    where
        F: Future<Output = Result<Arc<dyn Tokenizer>, AppError>>,
    {
        {
            let state = self.state.read().await;
            if matches!(state.phase, Some(Phase::Failed { .. })) && state.tokenizer.is_none() {
                return Err(AppError::TokenizerUnavailable);
            }
            if state.tokenizer.is_some() {
                debug!("[UPLOAD] Tokenizer already loaded");
                return Ok(());
            }
        }

        match loader.await {
            Ok(tokenizer) => {
                self.state.write().await.tokenizer = Some(tokenizer);
                self.transition(Phase::ParserReady).await;
                info!("[UPLOAD] Tokenizer ready");
            }
            Err(e) => {
                error!("[UPLOAD] Tokenizer failed to load: {}", e);
                let err = AppError::TokenizerUnavailable;
                self.transition(Phase::Failed {
                    message: err.to_string(),
                })
                .await;
                self.notifier.notify(Toast::from_error(&err));
                return Err(err);
            }
        }

        self.load_categories().await
    }

    /// Fetches the tank types. Safe to call again after a failure.
    pub async fn load_categories(&self) -> Result<(), AppError> {
        match self.service.list_categories().await {
            Ok(categories) => {
                info!("[UPLOAD] {} tank types available", categories.len());
                let advance = {
                    let mut state = self.state.write().await;
                    state.categories = categories;
                    state.phase == Some(Phase::ParserReady)
                };
                if advance {
                    self.transition(Phase::CategoriesLoaded).await;
                }
                Ok(())
            }
            Err(e) => {
                warn!("[UPLOAD] Tank type lookup failed: {}", e);
                let err = match e {
                    AppError::CategoryLookupFailed(_) => e,
                    other => AppError::CategoryLookupFailed(other.to_string()),
                };
                self.notifier.notify(Toast::from_error(&err));
                Err(err)
            }
        }
    }

    /// Records the tank type for the next upload. Blank ids clear it.
    pub async fn select_category(&self, id: &str) {
        let id = id.trim();
        let mut state = self.state.write().await;

        if !id.is_empty() && !state.categories.iter().any(|c| c.id == id) {
            debug!("[UPLOAD] Selected tank type {} is not in the loaded list", id);
        }
        state.selected_category = (!id.is_empty()).then(|| id.to_string());
    }

    /// Tokenizes `file`, assembles the batch and submits it.
    ///
    /// Every outcome is also reported through the notifier. The batch is
    /// submitted even when it is empty or no tank type is selected.
    pub async fn upload_file(
        &self,
        file: Option<UploadedFile>,
    ) -> Result<SubmissionOutcome, AppError> {
        let tokenizer = self.state.read().await.tokenizer.clone();
        let (tokenizer, file) = match (tokenizer, file) {
            (Some(tokenizer), Some(file)) => (tokenizer, file),
            _ => {
                let err = AppError::NotReady;
                warn!("[UPLOAD] Upload rejected: tokenizer not ready or no file");
                self.notifier.notify(Toast::from_error(&err));
                return Err(err);
            }
        };

        let attempt = AttemptGuard::new(&self.state);
        let result = self.run_attempt(tokenizer, file).await;
        attempt.settle();
        result
    }

    // ── Internals ────────────────────────────────────────────────────────────

    async fn run_attempt(
        &self,
        tokenizer: Arc<dyn Tokenizer>,
        file: UploadedFile,
    ) -> Result<SubmissionOutcome, AppError> {
        self.transition(Phase::FileSelected).await;
        info!("[UPLOAD] Processing {} ({} bytes)", file.name, file.bytes.len());

        let raw_rows = match tokenizer.tokenize(&file.bytes) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("[UPLOAD] Could not tokenize {}: {}", file.name, e);
                return self.finish(Err(e)).await;
            }
        };

        let batch = {
            let mut state = self.state.write().await;
            let batch = assemble(&raw_rows, state.selected_category.as_deref());
            state.preview = batch.rows.clone();
            batch
        };

        info!(
            "[UPLOAD] {} of {} rows passed validation",
            batch.len(),
            raw_rows.len()
        );
        if batch.category_id.is_none() {
            warn!("[UPLOAD] No tank type selected; submitting without one");
        }

        let in_flight = InFlight::enter(&self.in_flight);
        self.transition(Phase::Submitting).await;
        let result = self.service.create_records_batch(&batch).await;

        let result = match result {
            Ok(receipt) => {
                if let Some(created) = receipt.created {
                    if created != batch.len() as u64 {
                        warn!(
                            "[UPLOAD] Org reports {} tanks created, {} were sent",
                            created,
                            batch.len()
                        );
                    }
                }
                Ok(SubmissionOutcome {
                    accepted_count: batch.len(),
                    confirmed_count: receipt.created,
                })
            }
            Err(e @ AppError::SubmissionFailed(_)) => Err(e),
            Err(other) => {
                warn!("[UPLOAD] Submission failed: {}", other);
                Err(AppError::SubmissionFailed(None))
            }
        };

        let result = self.finish(result).await;
        drop(in_flight);
        result
    }

    async fn transition(&self, next: Phase) {
        let mut state = self.state.write().await;
        let previous = state.phase.replace(next.clone()).unwrap_or(Phase::Idle);
        debug!("[UPLOAD] {:?} -> {:?}", previous, next);
    }

    /// Reports an attempt's outcome and returns to `Idle`.
    async fn finish(
        &self,
        result: Result<SubmissionOutcome, AppError>,
    ) -> Result<SubmissionOutcome, AppError> {
        match &result {
            Ok(outcome) => {
                self.transition(Phase::Succeeded {
                    accepted_count: outcome.accepted_count,
                })
                .await;
                self.notifier.notify(Toast::success(format!(
                    "Upload attempt of {} tanks completed successfully.",
                    outcome.accepted_count
                )));
                self.state.write().await.last_outcome = Some(Ok(outcome.clone()));
            }
            Err(e) => {
                let toast = Toast::from_error(e);
                self.transition(Phase::Failed {
                    message: toast.message.clone(),
                })
                .await;
                self.state.write().await.last_outcome = Some(Err(toast.message.clone()));
                self.notifier.notify(toast);
            }
        }

        self.transition(Phase::Idle).await;
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Attempt Guards
// ─────────────────────────────────────────────────────────────────────────────

/// Counts one submission as in flight until dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Puts the phase back to `Idle` when an upload attempt is dropped before
/// it reports its outcome.
struct AttemptGuard<'a> {
    state: &'a RwLock<UploadState>,
    settled: bool,
}

impl<'a> AttemptGuard<'a> {
    fn new(state: &'a RwLock<UploadState>) -> Self {
        Self {
            state,
            settled: false,
        }
    }

    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        warn!("[UPLOAD] Upload attempt abandoned before completion");

        match self.state.try_write() {
            Ok(mut state) => {
                let per_attempt = matches!(
                    state.phase,
                    Some(
                        Phase::FileSelected
                            | Phase::Submitting
                            | Phase::Succeeded { .. }
                            | Phase::Failed { .. }
                    )
                );
                // A failed phase without a tokenizer is the sticky init failure.
                if per_attempt && state.tokenizer.is_some() {
                    state.phase = Some(Phase::Idle);
                }
            }
            Err(_) => debug!("[UPLOAD] State busy; phase left for the next attempt"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
