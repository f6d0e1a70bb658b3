//! Progress reporting for long-running operations.
//!
//! The geocoding pass reports through [`ProgressCallback`] instead of
//! printing, so the pipeline has no dependency on a terminal. The CLI plugs
//! in an `indicatif` bar, tests plug in [`RecordingProgress`], and
//! everything else can use [`NullProgress`].

use std::sync::{Arc, Mutex};

/// Trait for reporting progress from long-running operations.
///
/// Implementations must be `Send + Sync` so they can be shared behind an
/// [`Arc`].
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work (enables percentage/ETA).
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);

    /// Mark progress as complete and remove the progress indicator.
    fn finish_and_clear(&self);
}

/// A no-op implementation of [`ProgressCallback`].
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Returns a shared [`NullProgress`] instance for convenient use.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

/// One call made against a [`RecordingProgress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// [`ProgressCallback::set_total`]
    Total(u64),
    /// [`ProgressCallback::inc`]
    Inc(u64),
    /// [`ProgressCallback::set_message`]
    Message(String),
    /// [`ProgressCallback::finish`]
    Finish(String),
    /// [`ProgressCallback::finish_and_clear`]
    Cleared,
}

/// A [`ProgressCallback`] that stores every event it receives.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all events received so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Sum of all `inc` deltas received so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.events()
            .iter()
            .map(|event| match event {
                ProgressEvent::Inc(delta) => *delta,
                _ => 0,
            })
            .sum()
    }

    fn push(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl ProgressCallback for RecordingProgress {
    fn set_total(&self, total: u64) {
        self.push(ProgressEvent::Total(total));
    }

    fn inc(&self, delta: u64) {
        self.push(ProgressEvent::Inc(delta));
    }

    fn set_message(&self, msg: String) {
        self.push(ProgressEvent::Message(msg));
    }

    fn finish(&self, msg: String) {
        self.push(ProgressEvent::Finish(msg));
    }

    fn finish_and_clear(&self) {
        self.push(ProgressEvent::Cleared);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_progress_keeps_order() {
        let progress = RecordingProgress::new();
        progress.set_total(3);
        progress.inc(1);
        progress.inc(2);
        progress.finish("done".to_string());

        assert_eq!(
            progress.events(),
            vec![
                ProgressEvent::Total(3),
                ProgressEvent::Inc(1),
                ProgressEvent::Inc(2),
                ProgressEvent::Finish("done".to_string()),
            ]
        );
        assert_eq!(progress.position(), 3);
    }
}
