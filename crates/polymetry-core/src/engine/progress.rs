/// Coarse progress events emitted while an analysis runs.
///
/// A phase is one named stage of a run, such as a distance-map sweep or the
/// scaling fit; a task is the step-counted loop inside the current phase.
/// Consumers driving a progress bar size it from `TaskStart::total_steps`.
#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Hands [`Progress`] events to an optional callback.
///
/// Without a callback, reporting is a no-op, so analyses thread a single
/// `&ProgressReporter` through unconditionally instead of branching on
/// whether anyone is listening.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    /// Reporter that discards every event.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
