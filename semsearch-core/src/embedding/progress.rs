//! Load progress hooks
//!
//! Observers are optional and purely informational; a load behaves the same
//! whether or not anyone is listening.

use super::registry::AvailableModel;

/// Receives model load events
pub trait LoadObserver {
    /// Called once, when the load begins
    fn on_start(&mut self, _model: AvailableModel) {}

    /// Completion fraction in [0, 1], never decreasing
    fn on_progress(&mut self, _fraction: f32) {}
}

/// Silent observer
impl LoadObserver for () {}

/// Observer built from a pair of closures
pub struct LoadCallbacks<S, P> {
    on_start: Option<S>,
    on_progress: P,
}

impl<S, P> LoadCallbacks<S, P>
where
    S: FnOnce(),
    P: FnMut(f32),
{
    pub fn new(on_start: S, on_progress: P) -> Self {
        Self {
            on_start: Some(on_start),
            on_progress,
        }
    }
}

impl<S, P> LoadObserver for LoadCallbacks<S, P>
where
    S: FnOnce(),
    P: FnMut(f32),
{
    fn on_start(&mut self, _model: AvailableModel) {
        if let Some(start) = self.on_start.take() {
            start();
        }
    }

    fn on_progress(&mut self, fraction: f32) {
        (self.on_progress)(fraction)
    }
}

/// Logs load events through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl LoadObserver for LogObserver {
    fn on_start(&mut self, model: AvailableModel) {
        log::info!("Loading model {}", model);
    }

    fn on_progress(&mut self, fraction: f32) {
        log::info!("Model load progress: {:.0}%", fraction * 100.0);
    }
}

/// Enforces the observer contract on top of any caller-supplied observer:
/// `on_start` at most once, progress clamped to [0, 1] and non-decreasing.
pub(crate) struct ProgressReporter<'a, O: LoadObserver + ?Sized> {
    observer: &'a mut O,
    started: bool,
    last: Option<f32>,
}

impl<'a, O: LoadObserver + ?Sized> ProgressReporter<'a, O> {
    pub(crate) fn new(observer: &'a mut O) -> Self {
        Self {
            observer,
            started: false,
            last: None,
        }
    }

    pub(crate) fn start(&mut self, model: AvailableModel) {
        if !self.started {
            self.started = true;
            self.observer.on_start(model);
        }
    }

    /// Report a fraction; regressions and repeats are dropped
    pub(crate) fn advance(&mut self, fraction: f32) {
        if fraction.is_nan() {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        if self.last.is_some_and(|last| fraction <= last) {
            return;
        }
        self.last = Some(fraction);
        self.observer.on_progress(fraction);
    }

    pub(crate) fn finish(&mut self) {
        self.advance(1.0);
    }
}
