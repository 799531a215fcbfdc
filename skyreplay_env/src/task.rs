//! Handle to a task started through [`ReplayContext::spawn`](crate::ReplayContext::spawn).

use tokio::task::{AbortHandle, JoinHandle};

/// Lets the owner abort a spawned task. Dropping the handle detaches the task.
#[derive(Debug)]
pub struct TaskHandle {
    abort: AbortHandle,
}

impl TaskHandle {
    /// Stops the task at its next await point, dropping its future.
    pub fn abort(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

impl<T> From<JoinHandle<T>> for TaskHandle {
    fn from(handle: JoinHandle<T>) -> Self {
        Self {
            abort: handle.abort_handle(),
        }
    }
}
