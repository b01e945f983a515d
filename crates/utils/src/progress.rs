//! Progress reporting utilities

use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

/// A single status update
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressUpdate {
    /// Name of the running stage
    pub stage: String,

    /// Items processed so far
    pub current: usize,

    /// Total number of items
    pub total: usize,

    /// Completion percentage (0-100)
    pub percent: u32,

    /// Estimated time remaining
    pub eta: Duration,
}

/// Receiver of progress updates.
///
/// Implementations must not block; updates are fire-and-forget.
pub trait ProgressSink: Send + Sync {
    /// Deliver an update
    fn update(&self, update: ProgressUpdate);
}

/// Sink that emits updates as `tracing` events
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn update(&self, update: ProgressUpdate) {
        tracing::info!(
            stage = %update.stage,
            current = update.current,
            total = update.total,
            eta_secs = update.eta.as_secs_f64(),
            "{}: {}% done",
            update.stage,
            update.percent
        );
    }
}

/// Sink that forwards updates over an unbounded channel
#[derive(Clone, Debug)]
pub struct ChannelSink {
    sender: Sender<ProgressUpdate>,
}

impl ChannelSink {
    /// Create a sink around a channel sender
    pub fn new(sender: Sender<ProgressUpdate>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelSink {
    fn update(&self, update: ProgressUpdate) {
        // A dropped receiver only means nobody is listening anymore.
        let _ = self.sender.send(update);
    }
}

/// Progress reporter that emits an update every `interval` items
pub struct ProgressReporter<'a> {
    total: usize,
    current: usize,
    interval: usize,
    name: String,
    start_time: Instant,
    sink: Option<&'a dyn ProgressSink>,
}

impl<'a> ProgressReporter<'a> {
    /// Create a new progress reporter
    pub fn new(name: impl Into<String>, total: usize, sink: &'a dyn ProgressSink) -> Self {
        Self {
            total,
            current: 0,
            interval: 100,
            name: name.into(),
            start_time: Instant::now(),
            sink: Some(sink),
        }
    }

    /// Create a silent reporter
    pub fn silent(name: impl Into<String>, total: usize) -> Self {
        Self {
            total,
            current: 0,
            interval: 100,
            name: name.into(),
            start_time: Instant::now(),
            sink: None,
        }
    }

    /// Set how many items pass between two updates
    pub fn with_interval(mut self, interval: usize) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Set current progress, emitting an update on interval boundaries
    pub fn set(&mut self, current: usize) {
        self.current = current;
        if current % self.interval == 0 {
            self.emit();
        }
    }

    /// Increment progress
    pub fn inc(&mut self, delta: usize) {
        self.set(self.current + delta);
    }

    /// Current position
    pub fn current(&self) -> usize {
        self.current
    }

    /// Completion percentage
    pub fn percent(&self) -> u32 {
        if self.total > 0 {
            (self.current.min(self.total) as f64 / self.total as f64 * 100.0) as u32
        } else {
            0
        }
    }

    fn emit(&self) {
        let Some(sink) = self.sink else {
            return;
        };

        let elapsed = self.start_time.elapsed();
        let eta = if self.current > 0 {
            let per_item = elapsed.as_secs_f64() / self.current as f64;
            let remaining = self.total.saturating_sub(self.current);
            Duration::from_secs_f64(per_item * remaining as f64)
        } else {
            Duration::ZERO
        };

        sink.update(ProgressUpdate {
            stage: self.name.clone(),
            current: self.current,
            total: self.total,
            percent: self.percent(),
            eta,
        });
    }

    /// Mark the stage as complete and emit a final update
    pub fn finish(&mut self) {
        self.current = self.total;
        self.emit();
    }
}
