//! Test support utilities shared across unit and integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::backend::{InstanceSource, RawInstance, SourceFuture};

/// Error returned by [`ScriptedSource`] when a failure was queued or the
/// script ran out of responses.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("scripted source failure: {message}")]
pub struct ScriptedSourceError {
    /// Message describing the scripted failure.
    pub message: String,
}

type ScriptedResponse = Result<Vec<RawInstance>, ScriptedSourceError>;

/// Instance source that returns pre-seeded listings in FIFO order.
///
/// Used to drive deterministic sync outcomes without network access.
#[derive(Clone, Debug, Default)]
pub struct ScriptedSource {
    responses: Arc<Mutex<VecDeque<ScriptedResponse>>>,
}

impl ScriptedSource {
    /// Creates a new source with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful listing.
    pub fn push_instances(&self, instances: Vec<RawInstance>) {
        self.with_queue(|queue| queue.push_back(Ok(instances)));
    }

    /// Queues a failure.
    pub fn push_error(&self, message: impl Into<String>) {
        let err = ScriptedSourceError {
            message: message.into(),
        };
        self.with_queue(|queue| queue.push_back(Err(err)));
    }

    fn with_queue<T>(&self, apply: impl FnOnce(&mut VecDeque<ScriptedResponse>) -> T) -> T {
        let mut guard = self
            .responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        apply(&mut guard)
    }
}

impl InstanceSource for ScriptedSource {
    type Error = ScriptedSourceError;

    fn list_all(&self) -> SourceFuture<'_, Vec<RawInstance>, Self::Error> {
        let next = self.with_queue(VecDeque::pop_front);
        Box::pin(async move {
            next.unwrap_or_else(|| {
                Err(ScriptedSourceError {
                    message: String::from("no scripted response queued"),
                })
            })
        })
    }
}
