/// Failure outcome of a task submitted to a [`Lane`](crate::Lane).
///
/// A task's own error is carried untouched in [`TaskError::Failed`] so the
/// submitter can re-raise it exactly as the task produced it.
#[derive(Debug, thiserror::Error)]
pub enum TaskError<E> {
    /// The task completed with an error.
    #[error("Lane task failed: {0}")]
    Failed(E),

    /// The task panicked; the payload message is captured when it is a
    /// string.
    #[error("Lane task panicked: {0}")]
    Panicked(String),

    /// The lane dropped the task without resolving it (runtime shutdown).
    #[error("Lane task was dropped before completing")]
    Abandoned,
}

impl<E> TaskError<E> {
    /// Return the task's own error, if that is what this outcome holds.
    pub fn into_failure(self) -> Option<E> {
        match self {
            TaskError::Failed(e) => Some(e),
            _ => None,
        }
    }
}
