//! Progress-callback trait for per-book batch events.
//!
//! Pass an [`Arc<dyn BatchProgressCallback>`] through
//! [`crate::stream::BatchOptions::with_progress`] to be told as each book of
//! a batch starts, finishes or fails. The CLI uses this to drive its progress
//! bar; a server could forward the events to a channel instead.
//!
//! # Example
//!
//! ```rust
//! use edgequake_bookmeta::{BatchOptions, BatchProgressCallback};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl BatchProgressCallback for Printer {
//!     fn on_book_complete(&self, book: &str, index: usize, total: usize, rows: usize) {
//!         eprintln!("{book} ({index}/{total}): {rows} rows");
//!     }
//! }
//!
//! let options = BatchOptions::new("anthropic", "CSV").with_progress(Arc::new(Printer));
//! ```

use std::sync::Arc;

/// Called by the batch pipeline as it processes each book.
///
/// Books are processed one after another, so calls never overlap for a single
/// batch. All methods default to no-ops.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first book.
    fn on_batch_start(&self, total_books: usize) {
        let _ = total_books;
    }

    /// Called before a book's images are loaded.
    ///
    /// `index` is 1-based.
    fn on_book_start(&self, book: &str, index: usize, total: usize) {
        let _ = (book, index, total);
    }

    /// Called when a book produced output. `rows` is the number of row
    /// records the model returned.
    fn on_book_complete(&self, book: &str, index: usize, total: usize, rows: usize) {
        let _ = (book, index, total, rows);
    }

    /// Called when a book failed. The batch continues with the next book.
    fn on_book_error(&self, book: &str, index: usize, total: usize, error: &str) {
        let _ = (book, index, total, error);
    }

    /// Called once after every book has been attempted.
    fn on_batch_complete(&self, total_books: usize, success_count: usize) {
        let _ = (total_books, success_count);
    }
}

/// No-op implementation, used when no callback is configured.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Shared handle stored in [`crate::stream::BatchOptions`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        starts: AtomicUsize,
        rows: AtomicUsize,
        failed: Mutex<Vec<String>>,
        success_total: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total_books: usize) {
            self.started_total.store(total_books, Ordering::SeqCst);
        }

        fn on_book_start(&self, _book: &str, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_book_complete(&self, _book: &str, _index: usize, _total: usize, rows: usize) {
            self.rows.fetch_add(rows, Ordering::SeqCst);
        }

        fn on_book_error(&self, book: &str, _index: usize, _total: usize, _error: &str) {
            self.failed.lock().unwrap().push(book.to_string());
        }

        fn on_batch_complete(&self, _total_books: usize, success_count: usize) {
            self.success_total.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_book_start("book1", 1, 2);
        cb.on_book_complete("book1", 1, 2, 1);
        cb.on_book_error("book2", 2, 2, "timeout");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_batch_start(3);
        tracker.on_book_start("a", 1, 3);
        tracker.on_book_complete("a", 1, 3, 1);
        tracker.on_book_start("b", 2, 3);
        tracker.on_book_complete("b", 2, 3, 2);
        tracker.on_book_start("c", 3, 3);
        tracker.on_book_error("c", 3, 3, "HTTP 500");
        tracker.on_batch_complete(3, 2);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.rows.load(Ordering::SeqCst), 3);
        assert_eq!(*tracker.failed.lock().unwrap(), vec!["c".to_string()]);
        assert_eq!(tracker.success_total.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(1);
        cb.on_book_start("x", 1, 1);
        cb.on_batch_complete(1, 1);
    }
}
