//! Progress-callback trait for extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::SheetConfigBuilder::progress_callback`] to receive events
//! as the run moves through its requests. In batch mode there is exactly one
//! request, labelled with every selected number joined by `,`; in
//! per-question mode there is one request per question.
//!
//! # Example
//!
//! ```rust
//! use edgequake_exam2sheet::{ExtractionProgressCallback, SheetConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     retries: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_retry(&self, label: &str, attempt: u32, backoff_ms: u64, error: &str) {
//!         self.retries.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{label}: attempt {attempt} in {backoff_ms}ms ({error})");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { retries: AtomicUsize::new(0) });
//! let config = SheetConfig::builder()
//!     .progress_callback(cb as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the extraction pipeline as it works through its requests.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before the first request.
    fn on_run_start(&self, total_requests: usize) {
        let _ = total_requests;
    }

    /// Called just before a request's first attempt.
    fn on_request_start(&self, label: &str, index: usize, total: usize) {
        let _ = (label, index, total);
    }

    /// Called before a retry, after the previous attempt failed.
    fn on_retry(&self, label: &str, attempt: u32, backoff_ms: u64, error: &str) {
        let _ = (label, attempt, backoff_ms, error);
    }

    /// Called when a request produced usable questions.
    fn on_request_complete(&self, label: &str, index: usize, total: usize, questions: usize) {
        let _ = (label, index, total, questions);
    }

    /// Called when a request failed after all attempts.
    fn on_request_error(&self, label: &str, index: usize, total: usize, error: &str) {
        let _ = (label, index, total, error);
    }

    /// Called once when the run ends, however it ends.
    fn on_run_complete(&self, extracted: usize, failed: usize, cancelled: bool) {
        let _ = (extracted, failed, cancelled);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SheetConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
