//! In-process association between engines, adapters, and lifecycle events.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use peerlane_events::{Event, EventBus, RemovalReason};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::adapter::DownloadItem;
use crate::chaining::{ChainOutcome, ChainingDeps, ChainingOptions, TorrentChainController};
use crate::error::TransferResult;
use crate::identity::TransferIdentity;
use crate::items::ActiveItemList;
use crate::listeners::{ListenerHandle, PropertyChangeEvent};
use crate::model::{DownloadState, NativeDownloadStatus};
use crate::service::{ConflictHandler, DownloadEngine, ItemAssociation, TransferManager};

struct Entry {
    transfer_id: Uuid,
    item: Arc<DownloadItem>,
    listener: ListenerHandle<DownloadState>,
    chained: bool,
}

#[derive(Clone, Default)]
struct AssociationTable {
    entries: Arc<RwLock<HashMap<TransferIdentity, Entry>>>,
}

impl AssociationTable {
    fn read<T>(&self, f: impl FnOnce(&HashMap<TransferIdentity, Entry>) -> T) -> T {
        f(&self.entries.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write<T>(&self, f: impl FnOnce(&mut HashMap<TransferIdentity, Entry>) -> T) -> T {
        f(&mut self.entries.write().unwrap_or_else(PoisonError::into_inner))
    }
}

impl ItemAssociation for AssociationTable {
    fn item_for(&self, identity: &TransferIdentity) -> Option<Arc<DownloadItem>> {
        self.read(|entries| entries.get(identity).map(|entry| Arc::clone(&entry.item)))
    }
}

/// Registry that owns one adapter per engine and publishes lifecycle events.
#[derive(Clone)]
pub struct DownloadRegistry {
    table: AssociationTable,
    items: ActiveItemList,
    events: EventBus,
    manager: Arc<dyn TransferManager>,
    handler: Arc<dyn ConflictHandler>,
    options: ChainingOptions,
}

impl DownloadRegistry {
    /// Registry publishing to `events` and requesting derived transfers from `manager`.
    #[must_use]
    pub fn new(
        events: EventBus,
        manager: Arc<dyn TransferManager>,
        handler: Arc<dyn ConflictHandler>,
        options: ChainingOptions,
    ) -> Self {
        Self {
            table: AssociationTable::default(),
            items: ActiveItemList::new(),
            events,
            manager,
            handler,
            options,
        }
    }

    /// Shared handle to the active item list.
    #[must_use]
    pub fn items(&self) -> ActiveItemList {
        self.items.clone()
    }

    /// Event bus the registry publishes to.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Identifier assigned to the engine at registration.
    #[must_use]
    pub fn transfer_id(&self, engine: &Arc<dyn DownloadEngine>) -> Option<Uuid> {
        let identity = TransferIdentity::of(engine);
        self.table
            .read(|entries| entries.get(&identity).map(|entry| entry.transfer_id))
    }

    /// Adapter registered for the engine.
    #[must_use]
    pub fn item(&self, engine: &Arc<dyn DownloadEngine>) -> Option<Arc<DownloadItem>> {
        self.table.item_for(&TransferIdentity::of(engine))
    }

    /// Create the adapter for `engine` and add it to the active list.
    ///
    /// Registering an engine twice returns the existing adapter.
    pub fn register(&self, engine: Arc<dyn DownloadEngine>) -> Arc<DownloadItem> {
        let identity = TransferIdentity::of(&engine);
        let transfer_id = Uuid::new_v4();
        let item = Arc::new(DownloadItem::new(engine));
        let listener = self.state_publisher(transfer_id);

        let existing = self.table.write(|entries| {
            if let Some(entry) = entries.get(&identity) {
                return Some(Arc::clone(&entry.item));
            }
            entries.insert(
                identity,
                Entry {
                    transfer_id,
                    item: Arc::clone(&item),
                    listener: Arc::clone(&listener),
                    chained: false,
                },
            );
            None
        });
        if let Some(existing) = existing {
            debug!(transfer = %identity, "engine already registered");
            return existing;
        }

        self.items.add(Arc::clone(&item));
        emit(
            &self.events,
            Event::TransferAdded {
                transfer_id,
                title: item.title(),
            },
        );
        emit(
            &self.events,
            Event::StateChanged {
                transfer_id,
                state: item.state(),
            },
        );
        item.add_listener(listener);
        info!(transfer = %identity, %transfer_id, "transfer registered");
        item.refresh();
        item
    }

    /// Apply an engine status report.
    ///
    /// The adapter is refreshed and, the first time the engine reports
    /// completion, the chaining controller runs. A derived transfer started
    /// during that run is registered in turn. Returns the controller outcome
    /// when it ran.
    pub fn on_status_report(&self, engine: &Arc<dyn DownloadEngine>) -> Option<ChainOutcome> {
        let identity = TransferIdentity::of(engine);
        let Some((transfer_id, item)) = self.table.read(|entries| {
            entries
                .get(&identity)
                .map(|entry| (entry.transfer_id, Arc::clone(&entry.item)))
        }) else {
            warn!(transfer = %identity, "status report for unregistered engine");
            return None;
        };

        item.refresh();
        if engine.state() != NativeDownloadStatus::Complete {
            return None;
        }

        let first = self.table.write(|entries| {
            entries
                .get_mut(&identity)
                .is_some_and(|entry| !std::mem::replace(&mut entry.chained, true))
        });
        if !first {
            return None;
        }

        let deps = ChainingDeps {
            manager: Arc::clone(&self.manager),
            handler: Arc::clone(&self.handler),
            association: Arc::new(self.table.clone()),
            items: self.items.clone(),
            options: self.options.clone(),
        };
        let controller = TorrentChainController::new(&deps, engine);
        let outcome = controller.outcome();
        let derived = controller.derived_engine();
        match outcome {
            ChainOutcome::Promoted => {
                emit(&self.events, Event::TransferPromoted { transfer_id });
            }
            ChainOutcome::ConflictDelegated => {
                emit(&self.events, Event::ConflictDetected { transfer_id });
            }
            ChainOutcome::NotComplete | ChainOutcome::NotDescriptor | ChainOutcome::Failed => {}
        }
        if controller.placeholder_removed() {
            self.forget(identity, removal_reason(outcome, derived.is_some()));
        }
        if let Some(derived) = derived {
            self.register(derived);
        }
        Some(outcome)
    }

    /// Cancel the transfer and drop its adapter.
    ///
    /// # Errors
    ///
    /// Propagates the adapter's cancellation failure; the adapter stays
    /// registered in that case.
    pub fn cancel(&self, engine: &Arc<dyn DownloadEngine>) -> TransferResult<bool> {
        let identity = TransferIdentity::of(engine);
        let Some(item) = self.table.item_for(&identity) else {
            return Ok(false);
        };
        item.cancel()?;
        self.items.remove(&item);
        Ok(self.forget(identity, RemovalReason::Cancelled))
    }

    /// Permanently drop the adapter for `engine`.
    pub fn retire(&self, engine: &Arc<dyn DownloadEngine>) -> bool {
        let identity = TransferIdentity::of(engine);
        self.items.remove_identity(identity);
        self.forget(identity, RemovalReason::Retired)
    }

    /// Number of registered engines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.read(HashMap::len)
    }

    /// Whether no engine is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn forget(&self, identity: TransferIdentity, reason: RemovalReason) -> bool {
        let Some(entry) = self.table.write(|entries| entries.remove(&identity)) else {
            return false;
        };
        entry.item.remove_listener(&entry.listener);
        emit(
            &self.events,
            Event::TransferRemoved {
                transfer_id: entry.transfer_id,
                reason,
            },
        );
        info!(transfer = %identity, transfer_id = %entry.transfer_id, ?reason, "transfer removed");
        true
    }

    fn state_publisher(&self, transfer_id: Uuid) -> ListenerHandle<DownloadState> {
        let events = self.events.clone();
        Arc::new(move |change: &PropertyChangeEvent<DownloadState>| {
            emit(
                &events,
                Event::StateChanged {
                    transfer_id,
                    state: change.new,
                },
            );
        })
    }
}

const fn removal_reason(outcome: ChainOutcome, derived_started: bool) -> RemovalReason {
    match outcome {
        _ if derived_started => RemovalReason::Promoted,
        ChainOutcome::ConflictDelegated => RemovalReason::ConflictUnresolved,
        _ => RemovalReason::PromotionFailed,
    }
}

fn emit(events: &EventBus, event: Event) {
    if let Err(err) = events.publish_checked(event) {
        debug!(
            event_id = err.event_id(),
            kind = err.kind(),
            "lifecycle event kept for replay only"
        );
    }
}
