//! Progress reporting for long-running operations
//!
//! Every operation reports a fraction in [0.0, 1.0] through a
//! [`ProgressReporter`]. Fixed checkpoints:
//! - [`CHECKPOINT_STARTED`] as soon as request construction begins
//! - [`CHECKPOINT_COMPLETE`] once the terminal network response is fully received
//!
//! The reporter enforces the contract on behalf of callers: values are
//! clamped, regressions are dropped, and `1.0` is delivered at most once.
//! A failed operation may stop short of `1.0`.

use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Reported immediately when request construction begins
pub const CHECKPOINT_STARTED: f32 = 0.1;

/// Reported once the request is built and handed to the backend
pub const CHECKPOINT_DISPATCHED: f32 = 0.3;

/// Reported once the terminal response has been received
pub const CHECKPOINT_COMPLETE: f32 = 1.0;

type Sink = Arc<dyn Fn(f32) + Send + Sync>;

struct Inner {
    sink: Option<Sink>,
    last: Mutex<Option<f32>>,
}

/// Monotonic progress stream for a single operation
///
/// Cloning shares the stream; use [`ProgressReporter::scaled`] to hand a
/// sub-operation its own window of the parent stream.
#[derive(Clone)]
pub struct ProgressReporter {
    inner: Arc<Inner>,
}

impl ProgressReporter {
    /// Reporter forwarding every accepted value to `callback`
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(f32) + Send + Sync + 'static,
    {
        Self::from_sink(Some(Arc::new(callback)))
    }

    /// Reporter that only tracks the last value
    pub fn silent() -> Self {
        Self::from_sink(None)
    }

    /// Reporter paired with a polling handle
    ///
    /// The receiver always holds the latest accepted value (initially 0.0).
    pub fn watch() -> (Self, watch::Receiver<f32>) {
        let (tx, rx) = watch::channel(0.0f32);
        let reporter = Self::new(move |value| {
            tx.send_replace(value);
        });
        (reporter, rx)
    }

    fn from_sink(sink: Option<Sink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink,
                last: Mutex::new(None),
            }),
        }
    }

    /// Report a fraction
    ///
    /// Returns `true` if the value was accepted and forwarded.
    pub fn report(&self, fraction: f32) -> bool {
        if fraction.is_nan() {
            return false;
        }
        let fraction = fraction.clamp(0.0, 1.0);

        {
            let mut last = self
                .inner
                .last
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(previous) = *last {
                if fraction <= previous {
                    return false;
                }
            }
            *last = Some(fraction);
        }

        tracing::trace!(fraction, "progress");
        if let Some(sink) = &self.inner.sink {
            sink(fraction);
        }
        true
    }

    /// Report the terminal `1.0` checkpoint
    pub fn complete(&self) -> bool {
        self.report(CHECKPOINT_COMPLETE)
    }

    /// Last accepted value, if any
    pub fn last(&self) -> Option<f32> {
        *self
            .inner
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_complete(&self) -> bool {
        self.last() == Some(CHECKPOINT_COMPLETE)
    }

    /// Child reporter mapping its own [0, 1] range onto `[start, end]` of this one
    ///
    /// The child keeps its own monotonic state; the parent still rejects
    /// anything that would move it backwards.
    pub fn scaled(&self, start: f32, end: f32) -> Self {
        let start = start.clamp(0.0, 1.0);
        let end = end.clamp(start, 1.0);
        let parent = self.clone();
        Self::new(move |value| {
            parent.report(start + value * (end - start));
        })
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("last", &self.last())
            .field("has_sink", &self.inner.sink.is_some())
            .finish()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::silent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording() -> (ProgressReporter, Arc<Mutex<Vec<f32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter = ProgressReporter::new(move |v| sink.lock().unwrap().push(v));
        (reporter, seen)
    }

    #[test]
    fn test_regressions_are_dropped() {
        let (reporter, seen) = recording();
        assert!(reporter.report(0.1));
        assert!(reporter.report(0.5));
        assert!(!reporter.report(0.3));
        assert!(!reporter.report(0.5));
        assert!(reporter.complete());
        assert_eq!(*seen.lock().unwrap(), vec![0.1, 0.5, 1.0]);
    }

    #[test]
    fn test_complete_is_delivered_once() {
        let (reporter, seen) = recording();
        reporter.report(CHECKPOINT_STARTED);
        assert!(reporter.complete());
        assert!(!reporter.complete());
        assert!(!reporter.report(2.0));
        let values = seen.lock().unwrap();
        assert_eq!(values.iter().filter(|v| **v == 1.0).count(), 1);
        assert!(reporter.is_complete());
    }

    #[test]
    fn test_values_are_clamped_and_nan_ignored() {
        let (reporter, seen) = recording();
        assert!(!reporter.report(f32::NAN));
        assert!(reporter.report(-3.0));
        assert_eq!(*seen.lock().unwrap(), vec![0.0]);
        assert_eq!(reporter.last(), Some(0.0));
    }

    #[test]
    fn test_scaled_maps_into_window() {
        let (parent, seen) = recording();
        let first = parent.scaled(0.0, 0.5);
        first.report(0.1);
        first.complete();
        let second = parent.scaled(0.5, 1.0);
        second.report(0.1);
        second.complete();

        let values = seen.lock().unwrap().clone();
        assert_eq!(values.len(), 4);
        assert!((values[0] - 0.05).abs() < 1e-6);
        assert!((values[1] - 0.5).abs() < 1e-6);
        assert!((values[2] - 0.55).abs() < 1e-6);
        assert_eq!(values[3], 1.0);
        assert!(parent.is_complete());
    }

    #[tokio::test]
    async fn test_watch_handle_sees_latest_value() {
        let (reporter, rx) = ProgressReporter::watch();
        assert_eq!(*rx.borrow(), 0.0);
        reporter.report(CHECKPOINT_STARTED);
        reporter.report(CHECKPOINT_DISPATCHED);
        assert_eq!(*rx.borrow(), CHECKPOINT_DISPATCHED);
        reporter.complete();
        assert_eq!(*rx.borrow(), 1.0);
    }

    #[test]
    fn test_silent_tracks_last() {
        let reporter = ProgressReporter::silent();
        assert_eq!(reporter.last(), None);
        reporter.report(0.4);
        assert_eq!(reporter.last(), Some(0.4));
    }
}
