use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::cancel::CancelToken;
use crate::error::{ComicError, Result};

/// Something the user sees while a task runs, e.g. a spinner or dialog.
pub trait ProgressIndicator: Send + Sync {
    fn show(&self, message: &str);
    fn dismiss(&self);
}

/// Indicator that shows nothing.
pub struct NoProgress;

impl ProgressIndicator for NoProgress {
    fn show(&self, _message: &str) {}
    fn dismiss(&self) {}
}

/// Dismisses its indicator exactly once, however the task ends.
struct ProgressGuard {
    indicator: Arc<dyn ProgressIndicator>,
    dismissed: AtomicBool,
}

impl ProgressGuard {
    fn new(indicator: Arc<dyn ProgressIndicator>, message: &str) -> Self {
        indicator.show(message);
        Self {
            indicator,
            dismissed: AtomicBool::new(false),
        }
    }

    fn dismiss(&self) {
        if !self.dismissed.swap(true, Ordering::SeqCst) {
            self.indicator.dismiss();
        }
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.dismiss();
    }
}

/// How a task ended. Exactly one of these is delivered per task.
#[derive(Debug, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Failure(ComicError),
    Cancelled,
}

impl<T> Outcome<T> {
    fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(ComicError::Cancelled) => Outcome::Cancelled,
            Err(e) => Outcome::Failure(e),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Failure(e) => Outcome::Failure(e),
            Outcome::Cancelled => Outcome::Cancelled,
        }
    }
}

/// A blocking fetch running on its own worker thread.
///
/// The interactive thread polls with [`Task::try_outcome`] or blocks with
/// [`Task::wait`]. Once [`Task::cancel`] is called any late result from the
/// worker is discarded and the outcome is [`Outcome::Cancelled`].
pub struct Task<T> {
    label: String,
    cancel: CancelToken,
    receiver: Receiver<Result<T>>,
    progress: ProgressGuard,
    handle: Option<JoinHandle<()>>,
    finished: bool,
}

impl<T: Send + 'static> Task<T> {
    pub fn spawn<F>(label: &str, progress: Arc<dyn ProgressIndicator>, work: F) -> Self
    where
        F: FnOnce(&CancelToken) -> Result<T> + Send + 'static,
    {
        let cancel = CancelToken::new();
        let (tx, rx) = mpsc::channel();
        let progress = ProgressGuard::new(progress, label);

        let worker_cancel = cancel.clone();
        let worker_label = label.to_string();
        let handle = thread::spawn(move || {
            let result = work(&worker_cancel);
            if worker_cancel.is_cancelled() {
                debug!("Discarding result of cancelled task '{}'", worker_label);
                return;
            }
            let _ = tx.send(result);
        });

        Self {
            label: label.to_string(),
            cancel,
            receiver: rx,
            progress,
            handle: Some(handle),
            finished: false,
        }
    }
}

impl<T> Task<T> {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Token shared with the worker; cancelling it is the same as [`Task::cancel`].
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Ask the worker to stop and dismiss the progress indicator.
    pub fn cancel(&self) {
        debug!("Cancelling task '{}'", self.label);
        self.cancel.cancel();
        self.progress.dismiss();
    }

    /// Non-blocking check. `None` while the worker is still busy, and after
    /// the outcome has already been handed out.
    pub fn try_outcome(&mut self) -> Option<Outcome<T>> {
        if self.finished {
            return None;
        }
        if self.cancel.is_cancelled() {
            return Some(self.finish(Outcome::Cancelled));
        }
        match self.receiver.try_recv() {
            Ok(result) => Some(self.finish(Outcome::from_result(result))),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                // the worker died without sending, i.e. it panicked or saw a cancel
                let outcome = if self.cancel.is_cancelled() {
                    Outcome::Cancelled
                } else {
                    Outcome::Failure(ComicError::Network(format!(
                        "task '{}' stopped unexpectedly",
                        self.label
                    )))
                };
                Some(self.finish(outcome))
            }
        }
    }

    /// Block until the worker finishes, or return straight away if cancelled.
    pub fn wait(mut self) -> Outcome<T> {
        if self.cancel.is_cancelled() {
            return self.finish(Outcome::Cancelled);
        }
        let outcome = match self.receiver.recv() {
            Ok(_) if self.cancel.is_cancelled() => Outcome::Cancelled,
            Ok(result) => Outcome::from_result(result),
            Err(_) if self.cancel.is_cancelled() => Outcome::Cancelled,
            Err(_) => Outcome::Failure(ComicError::Network(format!(
                "task '{}' stopped unexpectedly",
                self.label
            ))),
        };
        self.finish(outcome)
    }

    fn finish(&mut self, outcome: Outcome<T>) -> Outcome<T> {
        self.finished = true;
        self.progress.dismiss();
        if !outcome.is_cancelled() {
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
        }
        outcome
    }
}
