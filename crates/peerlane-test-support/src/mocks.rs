//! Recording doubles for the transfer manager, conflict handler and listeners.

use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use peerlane_transfer_core::{
    ConflictCode, ConflictHandler, DownloadEngine, ListenerHandle, NativeDownloadStatus,
    PropertyChangeEvent, PropertyChangeListener, RetryAction, TransferError, TransferManager,
    TransferRequest, TransferResult,
};
use tracing::debug;

use crate::engines::ScriptedDownloadEngine;

/// Scripted answer to one `request_transfer` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerResponse {
    /// Start a new queued engine.
    Accept,
    /// Reject with a destination conflict.
    Conflict(ConflictCode),
    /// Reject with an unrecoverable failure.
    Fail(&'static str),
}

/// Transfer manager that records every request and replays scripted answers.
///
/// Once the script is exhausted every request is accepted.
#[derive(Debug, Default)]
pub struct RecordingTransferManager {
    responses: Mutex<VecDeque<ManagerResponse>>,
    requests: Mutex<Vec<TransferRequest>>,
    started: Mutex<Vec<Arc<ScriptedDownloadEngine>>>,
}

impl RecordingTransferManager {
    /// Manager that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a conflict answer.
    #[must_use]
    pub fn conflict_once(self, code: ConflictCode) -> Self {
        self.push(ManagerResponse::Conflict(code));
        self
    }

    /// Queue a failure answer.
    #[must_use]
    pub fn fail_once(self, message: &'static str) -> Self {
        self.push(ManagerResponse::Fail(message));
        self
    }

    /// Queue an explicit accept.
    #[must_use]
    pub fn accept_once(self) -> Self {
        self.push(ManagerResponse::Accept);
        self
    }

    /// Requests received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<TransferRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests received.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Engines started by accepted requests.
    #[must_use]
    pub fn started(&self) -> Vec<Arc<ScriptedDownloadEngine>> {
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, response: ManagerResponse) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }
}

impl TransferManager for RecordingTransferManager {
    fn request_transfer(
        &self,
        request: &TransferRequest,
    ) -> TransferResult<Arc<dyn DownloadEngine>> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        let response = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(ManagerResponse::Accept);
        debug!(?response, overwrite = request.overwrite, "scripted transfer request");

        match response {
            ManagerResponse::Accept => {
                let engine = Arc::new(
                    ScriptedDownloadEngine::new(NativeDownloadStatus::Queued)
                        .with_title("derived swarm transfer"),
                );
                self.started
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(Arc::clone(&engine));
                Ok(engine as Arc<dyn DownloadEngine>)
            }
            ManagerResponse::Conflict(code) => Err(TransferError::Conflict {
                code,
                path: request.save_path.clone(),
            }),
            ManagerResponse::Fail(message) => Err(TransferError::request_failed(
                "request_transfer",
                io::Error::other(message),
            )),
        }
    }
}

/// How [`RecordingConflictHandler`] reacts to a conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictResponse {
    /// Retry immediately with the given knobs.
    Retry {
        /// Overwrite flag for the retry.
        overwrite: bool,
        /// Destination override for the retry.
        save_path: Option<PathBuf>,
    },
    /// Retry immediately using the suggested overwrite default.
    AcceptDefault,
    /// Do nothing.
    Decline,
    /// Keep the retry action for the test to invoke later.
    Defer,
}

/// One `handle_conflict` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictCall {
    /// Conflict classification of the error passed in.
    pub code: Option<ConflictCode>,
    /// Overwrite default suggested by the controller.
    pub default_overwrite: bool,
    /// Whether an immediate retry succeeded; `None` when none was made.
    pub retried: Option<bool>,
}

/// Conflict handler that records calls and applies a fixed response.
#[derive(Debug)]
pub struct RecordingConflictHandler {
    response: ConflictResponse,
    calls: Mutex<Vec<ConflictCall>>,
    deferred: Mutex<Vec<RetryAction>>,
    failures: Mutex<Vec<String>>,
}

impl RecordingConflictHandler {
    /// Handler applying `response` to every conflict.
    #[must_use]
    pub const fn new(response: ConflictResponse) -> Self {
        Self {
            response,
            calls: Mutex::new(Vec::new()),
            deferred: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Handler that ignores conflicts.
    #[must_use]
    pub const fn declining() -> Self {
        Self::new(ConflictResponse::Decline)
    }

    /// Handler that retries with overwrite allowed.
    #[must_use]
    pub const fn overwriting() -> Self {
        Self::new(ConflictResponse::Retry {
            overwrite: true,
            save_path: None,
        })
    }

    /// Recorded conflict calls.
    #[must_use]
    pub fn calls(&self) -> Vec<ConflictCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Retry actions kept under [`ConflictResponse::Defer`].
    #[must_use]
    pub fn take_deferred(&self) -> Vec<RetryAction> {
        std::mem::take(&mut *self.deferred.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Messages of reported failures.
    #[must_use]
    pub fn failures(&self) -> Vec<String> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ConflictHandler for RecordingConflictHandler {
    fn handle_conflict(&self, retry: RetryAction, details: &TransferError, default_overwrite: bool) {
        let retried = match &self.response {
            ConflictResponse::Retry {
                overwrite,
                save_path,
            } => Some(retry.retry(save_path.clone(), *overwrite).is_ok()),
            ConflictResponse::AcceptDefault => Some(
                retry
                    .retry(retry.request().save_path.clone(), default_overwrite)
                    .is_ok(),
            ),
            ConflictResponse::Decline => None,
            ConflictResponse::Defer => {
                self.deferred
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(retry);
                None
            }
        };
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ConflictCall {
                code: details.conflict_code(),
                default_overwrite,
                retried,
            });
    }

    fn report_failure(&self, error: &TransferError) {
        let message = match error {
            TransferError::RequestFailed { source, .. } => source.to_string(),
            other => other.to_string(),
        };
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }
}

/// Listener that records every event it receives.
#[derive(Debug)]
pub struct RecordingListener<S> {
    events: Mutex<Vec<PropertyChangeEvent<S>>>,
}

impl<S> Default for RecordingListener<S> {
    fn default() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }
}

impl<S: Clone + Send + Sync + 'static> RecordingListener<S> {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Handle suitable for `add_listener`; always the same allocation.
    #[must_use]
    pub fn handle(self: &Arc<Self>) -> ListenerHandle<S> {
        Arc::clone(self) as ListenerHandle<S>
    }

    /// Number of events received.
    #[must_use]
    pub fn count(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Events received, in order.
    #[must_use]
    pub fn events(&self) -> Vec<PropertyChangeEvent<S>> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<S: Clone + Send + Sync> PropertyChangeListener<S> for RecordingListener<S> {
    fn property_changed(&self, event: &PropertyChangeEvent<S>) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
