//! Feedback sink that counts cues

use std::sync::atomic::{AtomicUsize, Ordering};
use whs_scan::feedback::Feedback;

#[derive(Debug, Default)]
pub struct RecordingFeedback {
    successes: AtomicUsize,
    errors: AtomicUsize,
}

impl RecordingFeedback {
    pub fn successes(&self) -> usize {
        self.successes.load(Ordering::SeqCst)
    }

    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::SeqCst)
    }
}

impl Feedback for RecordingFeedback {
    fn success(&self) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn error(&self) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
}
