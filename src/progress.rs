//! Progress-callback trait for per-document extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the batch walks the input directory. The CLI forwards them to an
//! `indicatif` progress bar; library users can forward them anywhere.
//!
//! # Example
//!
//! ```rust
//! use pdf_folio_extract::{ExtractedRecord, ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, index: usize, total: usize, record: &ExtractedRecord) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {} → folio {}", index, total, record.source_filename, record.folio);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::ExtractedRecord;
use std::sync::Arc;

/// Called by the batch driver as it processes each document.
///
/// Documents are processed one at a time, so calls never overlap, but the
/// trait is `Send + Sync` because the batch runs on a tokio runtime. All
/// methods have no-op defaults.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once after the directory has been scanned.
    ///
    /// # Arguments
    /// * `total`: number of PDF files that will be processed
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before a document is rendered.
    ///
    /// # Arguments
    /// * `index`: 1-indexed position in the batch
    /// * `total`: number of documents in the batch
    /// * `name`:  file name of the PDF
    fn on_document_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when a document produced a record (possibly with empty fields).
    fn on_document_complete(&self, index: usize, total: usize, record: &ExtractedRecord) {
        let _ = (index, total, record);
    }

    /// Called when a document failed and was skipped.
    fn on_document_error(&self, index: usize, total: usize, name: &str, error: &str) {
        let _ = (index, total, name, error);
    }

    /// Called once after every document has been attempted.
    ///
    /// # Arguments
    /// * `total`:         documents attempted
    /// * `success_count`: documents that produced a record
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        folios: Mutex<Vec<String>>,
        batch_total: AtomicUsize,
        batch_success: AtomicUsize,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total: usize) {
            self.batch_total.store(total, Ordering::SeqCst);
        }

        fn on_document_start(&self, _index: usize, _total: usize, _name: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _index: usize, _total: usize, record: &ExtractedRecord) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            self.folios.lock().unwrap().push(record.folio.clone());
        }

        fn on_document_error(&self, _index: usize, _total: usize, _name: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total: usize, success_count: usize) {
            self.batch_success.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        let record = ExtractedRecord::empty("a.pdf", "in/a.pdf");
        cb.on_batch_start(2);
        cb.on_document_start(1, 2, "a.pdf");
        cb.on_document_complete(1, 2, &record);
        cb.on_document_error(2, 2, "b.pdf", "not a pdf");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_batch_start(2);

        let mut record = ExtractedRecord::empty("a.pdf", "in/a.pdf");
        record.folio = "123456".into();
        tracker.on_document_start(1, 2, "a.pdf");
        tracker.on_document_complete(1, 2, &record);
        tracker.on_document_start(2, 2, "b.pdf");
        tracker.on_document_error(2, 2, "b.pdf", "corrupt");
        tracker.on_batch_complete(2, 1);

        assert_eq!(tracker.batch_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.batch_success.load(Ordering::SeqCst), 1);
        assert_eq!(*tracker.folios.lock().unwrap(), vec!["123456".to_string()]);
    }
}
