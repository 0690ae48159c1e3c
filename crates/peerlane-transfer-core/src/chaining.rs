//! Promotion of completed descriptor downloads into derived swarm transfers.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::TransferResult;
use crate::identity::TransferIdentity;
use crate::items::ActiveItemList;
use crate::model::{NativeDownloadStatus, SwarmSource, TransferRequest};
use crate::service::{ConflictHandler, DownloadEngine, ItemAssociation, TransferManager};

/// File-name suffix marking a saved swarm descriptor.
pub const DEFAULT_DESCRIPTOR_SUFFIX: &str = ".torrent";

/// Tunables for the chaining controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainingOptions {
    /// Case-sensitive suffix identifying descriptor files.
    pub descriptor_suffix: String,
    /// Overwrite choice suggested to the conflict handler.
    pub default_overwrite: bool,
}

impl Default for ChainingOptions {
    fn default() -> Self {
        Self {
            descriptor_suffix: DEFAULT_DESCRIPTOR_SUFFIX.to_string(),
            default_overwrite: false,
        }
    }
}

/// Collaborators used by a controller run.
#[derive(Clone)]
pub struct ChainingDeps {
    /// Request API for derived transfers.
    pub manager: Arc<dyn TransferManager>,
    /// Resolves destination conflicts.
    pub handler: Arc<dyn ConflictHandler>,
    /// Lookup from engine to its placeholder adapter.
    pub association: Arc<dyn ItemAssociation>,
    /// List the placeholder is removed from.
    pub items: ActiveItemList,
    /// Tunables.
    pub options: ChainingOptions,
}

/// Branch taken by a controller run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainOutcome {
    /// The engine had not completed; nothing happened.
    NotComplete,
    /// The completed transfer was not a descriptor; nothing happened.
    NotDescriptor,
    /// The derived transfer was requested successfully.
    Promoted,
    /// The request conflicted and the handler was consulted.
    ConflictDelegated,
    /// The request failed and the failure was reported.
    Failed,
}

impl ChainOutcome {
    /// Whether a derived transfer request was attempted.
    #[must_use]
    pub const fn attempted(self) -> bool {
        matches!(self, Self::Promoted | Self::ConflictDelegated | Self::Failed)
    }
}

struct Placeholder {
    identity: TransferIdentity,
    association: Arc<dyn ItemAssociation>,
    items: ActiveItemList,
    retired: AtomicBool,
    removed: AtomicBool,
    derived: Mutex<Option<Arc<dyn DownloadEngine>>>,
}

impl Placeholder {
    /// Keeps the first derived engine started for this placeholder.
    fn record_derived(&self, engine: &Arc<dyn DownloadEngine>) {
        self.derived
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert_with(|| Arc::clone(engine));
    }

    fn derived(&self) -> Option<Arc<dyn DownloadEngine>> {
        self.derived
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes the placeholder on the first call only.
    fn retire(&self) {
        if self.retired.swap(true, Ordering::AcqRel) {
            return;
        }
        match self.association.item_for(&self.identity) {
            Some(item) if self.items.remove(&item) => {
                self.removed.store(true, Ordering::Release);
                debug!(transfer = %self.identity, "placeholder removed from active items");
            }
            Some(_) => debug!(transfer = %self.identity, "placeholder already absent"),
            None => debug!(transfer = %self.identity, "no placeholder associated with engine"),
        }
    }
}

/// Continuation handed to the conflict handler.
///
/// It can be stored and invoked later from any thread. A successful retry
/// retires the placeholder if that has not happened yet. The caller owns the
/// returned engine; [`TorrentChainController::derived_engine`] also reports the
/// first engine a retry started.
#[derive(Clone)]
pub struct RetryAction {
    request: TransferRequest,
    manager: Arc<dyn TransferManager>,
    placeholder: Arc<Placeholder>,
}

impl RetryAction {
    /// Request that conflicted.
    #[must_use]
    pub const fn request(&self) -> &TransferRequest {
        &self.request
    }

    /// Reissue the request with new conflict-resolution knobs.
    ///
    /// # Errors
    ///
    /// Propagates the transfer manager's response to the retried request.
    pub fn retry(
        &self,
        save_path: Option<PathBuf>,
        overwrite: bool,
    ) -> TransferResult<Arc<dyn DownloadEngine>> {
        let request = self.request.retried(save_path, overwrite);
        let engine = self.manager.request_transfer(&request)?;
        info!(
            transfer = %self.placeholder.identity,
            overwrite,
            "derived swarm transfer requested after conflict"
        );
        self.placeholder.record_derived(&engine);
        self.placeholder.retire();
        Ok(engine)
    }

    /// Reissue the identical request allowing overwrite.
    ///
    /// # Errors
    ///
    /// Propagates the transfer manager's response to the retried request.
    pub fn retry_with_overwrite(&self) -> TransferResult<Arc<dyn DownloadEngine>> {
        self.retry(self.request.save_path.clone(), true)
    }
}

impl fmt::Debug for RetryAction {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RetryAction")
            .field("request", &self.request)
            .field("transfer", &self.placeholder.identity)
            .finish_non_exhaustive()
    }
}

/// One-shot controller run on the thread that observed a completion.
pub struct TorrentChainController {
    outcome: ChainOutcome,
    placeholder: Arc<Placeholder>,
}

impl TorrentChainController {
    /// Inspect `engine` and, if it completed a descriptor download, request
    /// the derived transfer and retire its placeholder.
    #[must_use]
    pub fn new(deps: &ChainingDeps, engine: &Arc<dyn DownloadEngine>) -> Self {
        let placeholder = Arc::new(Placeholder {
            identity: TransferIdentity::of(engine),
            association: Arc::clone(&deps.association),
            items: deps.items.clone(),
            retired: AtomicBool::new(false),
            removed: AtomicBool::new(false),
            derived: Mutex::new(None),
        });
        let outcome = run(deps, engine.as_ref(), &placeholder);
        Self {
            outcome,
            placeholder,
        }
    }

    /// Branch taken.
    #[must_use]
    pub const fn outcome(&self) -> ChainOutcome {
        self.outcome
    }

    /// Whether this run (or its retry) removed the placeholder.
    #[must_use]
    pub fn placeholder_removed(&self) -> bool {
        self.placeholder.removed.load(Ordering::Acquire)
    }

    /// Engine of the derived transfer started by this run or by a retry of
    /// its conflict.
    #[must_use]
    pub fn derived_engine(&self) -> Option<Arc<dyn DownloadEngine>> {
        self.placeholder.derived()
    }
}

impl fmt::Debug for TorrentChainController {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TorrentChainController")
            .field("transfer", &self.placeholder.identity)
            .field("outcome", &self.outcome)
            .field("placeholder_removed", &self.placeholder_removed())
            .field(
                "derived",
                &self.derived_engine().map(|engine| TransferIdentity::of(&engine)),
            )
            .finish()
    }
}

fn run(deps: &ChainingDeps, engine: &dyn DownloadEngine, placeholder: &Arc<Placeholder>) -> ChainOutcome {
    let identity = placeholder.identity;
    let status = engine.state();
    if status != NativeDownloadStatus::Complete {
        debug!(transfer = %identity, ?status, "download not complete; chaining skipped");
        return ChainOutcome::NotComplete;
    }

    let Some(source) = descriptor_source(engine, &deps.options.descriptor_suffix) else {
        debug!(transfer = %identity, "completed download is not a swarm descriptor");
        return ChainOutcome::NotDescriptor;
    };

    let request = TransferRequest::initial(source);
    let outcome = match deps.manager.request_transfer(&request) {
        Ok(derived) => {
            info!(
                transfer = %identity,
                derived = %TransferIdentity::of(&derived),
                "derived swarm transfer requested"
            );
            placeholder.record_derived(&derived);
            ChainOutcome::Promoted
        }
        Err(err) if err.is_conflict() => {
            warn!(
                transfer = %identity,
                error = %err,
                code = ?err.conflict_code(),
                "derived swarm transfer conflicts with an existing destination"
            );
            let retry = RetryAction {
                request,
                manager: Arc::clone(&deps.manager),
                placeholder: Arc::clone(placeholder),
            };
            deps.handler
                .handle_conflict(retry, &err, deps.options.default_overwrite);
            ChainOutcome::ConflictDelegated
        }
        Err(err) => {
            warn!(transfer = %identity, error = %err, "derived swarm transfer request failed");
            deps.handler.report_failure(&err);
            ChainOutcome::Failed
        }
    };
    placeholder.retire();
    outcome
}

fn descriptor_source(engine: &dyn DownloadEngine, suffix: &str) -> Option<SwarmSource> {
    if let Some(info) = engine.swarm_meta_info() {
        return Some(SwarmSource::meta_info(info));
    }
    let path = engine.save_file()?;
    let is_descriptor = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(suffix));
    is_descriptor.then(|| SwarmSource::descriptor_file(path))
}
