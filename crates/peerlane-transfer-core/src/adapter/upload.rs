use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::convert::{map_upload_error, map_upload_state};
use crate::error::{TransferError, TransferResult};
use crate::identity::TransferIdentity;
use crate::listeners::{ListenerHandle, ListenerRegistry, PropertyChangeEvent};
use crate::metrics::{self, MetricsSnapshot};
use crate::model::{
    BrowseType, NativeUploadStatus, Progress, UploadErrorState, UploadItemType, UploadState,
    UploadType, Urn,
};
use crate::service::UploadEngine;

/// Observable canonical view over one native upload engine.
pub struct UploadItem {
    engine: Option<Arc<dyn UploadEngine>>,
    identity: TransferIdentity,
    item_type: UploadItemType,
    listeners: ListenerRegistry<UploadState>,
    published: Mutex<UploadState>,
}

impl UploadItem {
    /// Adapter bound to `engine` for its whole lifetime.
    #[must_use]
    pub fn new(engine: Arc<dyn UploadEngine>) -> Self {
        Self::from_engine(Some(engine))
    }

    /// Sentinel adapter wrapping no engine.
    #[must_use]
    pub fn absent() -> Self {
        Self::from_engine(None)
    }

    /// Adapter for a possibly-absent engine. The item type is fixed here.
    #[must_use]
    pub fn from_engine(engine: Option<Arc<dyn UploadEngine>>) -> Self {
        let identity = TransferIdentity::of_optional(engine.as_ref());
        let item_type = match &engine {
            Some(engine) if engine.is_swarm_backed() => UploadItemType::Bittorrent,
            _ => UploadItemType::Gnutella,
        };
        let initial = engine.as_ref().map_or(UploadState::Uploading, |engine| {
            map_upload_state(engine.state(), is_browse(engine.as_ref()))
        });
        Self {
            engine,
            identity,
            item_type,
            listeners: ListenerRegistry::new(),
            published: Mutex::new(initial),
        }
    }

    /// Identity key of the wrapped engine.
    #[must_use]
    pub const fn identity(&self) -> TransferIdentity {
        self.identity
    }

    /// Engine family chosen at construction.
    #[must_use]
    pub const fn upload_item_type(&self) -> UploadItemType {
        self.item_type
    }

    /// Native status code, when an engine is present.
    #[must_use]
    pub fn native_state(&self) -> Option<NativeUploadStatus> {
        self.engine.as_ref().map(|engine| engine.state())
    }

    /// Canonical state.
    #[must_use]
    pub fn state(&self) -> UploadState {
        self.engine
            .as_ref()
            .map_or(UploadState::Uploading, |engine| {
                map_upload_state(engine.state(), is_browse(engine.as_ref()))
            })
    }

    /// Classified error for the current state.
    #[must_use]
    pub fn upload_error_state(&self) -> UploadErrorState {
        self.native_state()
            .map_or(UploadErrorState::NoError, map_upload_error)
    }

    /// Browse classification derived from the canonical state and file name.
    #[must_use]
    pub fn browse_type(&self) -> BrowseType {
        match self.state() {
            UploadState::BrowseHost | UploadState::BrowseHostDone => {
                if self.file_name().is_empty() {
                    BrowseType::P2p
                } else {
                    BrowseType::Friend
                }
            }
            _ => BrowseType::None,
        }
    }

    /// Name of the associated file, empty when none.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.engine
            .as_ref()
            .and_then(|engine| engine.file_name())
            .unwrap_or_default()
    }

    /// Remote host.
    ///
    /// Anonymous browse uploads prefer the engine's resolved host string and
    /// fall back to the raw address bytes; every other upload reports the
    /// engine's plain host.
    #[must_use]
    pub fn host(&self) -> String {
        let Some(engine) = &self.engine else {
            return String::new();
        };
        if self.browse_type() == BrowseType::P2p {
            if let Some(host) = engine.string_host().filter(|host| !host.is_empty()) {
                return host;
            }
            if let Some(bytes) = engine.address_bytes().filter(|bytes| !bytes.is_empty()) {
                return format_address(&bytes);
            }
        }
        engine.host()
    }

    /// Position in the upload queue.
    #[must_use]
    pub fn queue_position(&self) -> i32 {
        self.engine.as_ref().map_or(-1, |engine| engine.queue_position())
    }

    /// Connections open to the same host.
    #[must_use]
    pub fn num_upload_connections(&self) -> i32 {
        self.engine
            .as_ref()
            .map_or(0, |engine| engine.num_upload_connections())
    }

    /// Backing file.
    #[must_use]
    pub fn file(&self) -> Option<PathBuf> {
        self.engine.as_ref().and_then(|engine| engine.file())
    }

    /// Content identifier.
    #[must_use]
    pub fn urn(&self) -> Option<Urn> {
        self.engine.as_ref().and_then(|engine| engine.urn())
    }

    /// Size of the served content.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.engine.as_ref().map_or(0, |engine| engine.file_size())
    }

    /// Bytes sent so far.
    #[must_use]
    pub fn total_amount_uploaded(&self) -> u64 {
        self.engine
            .as_ref()
            .map_or(0, |engine| engine.total_amount_uploaded())
    }

    /// Completion percentage in `0..=100`.
    #[must_use]
    pub fn percent_complete(&self) -> u8 {
        metrics::percent_complete(self.total_amount_uploaded(), Some(self.file_size()))
    }

    /// Speed in KiB/s; 0 until the engine has enough samples.
    #[must_use]
    pub fn upload_speed(&self) -> f32 {
        self.engine.as_ref().map_or(0.0, |engine| {
            engine.measure_bandwidth();
            metrics::speed(engine.measured_bandwidth())
        })
    }

    /// Seconds until completion, or [`metrics::UNKNOWN_TIME`].
    #[must_use]
    pub fn remaining_upload_time(&self) -> u64 {
        metrics::remaining_time(
            Some(self.file_size()),
            self.total_amount_uploaded(),
            self.upload_speed(),
        )
    }

    /// All derived metrics from one sample.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.engine.as_ref().map_or(MetricsSnapshot::ZERO, |engine| {
            engine.measure_bandwidth();
            let progress = Progress {
                current: engine.total_amount_uploaded(),
                total: Some(engine.file_size()),
            };
            MetricsSnapshot::compute(progress, engine.measured_bandwidth())
        })
    }

    /// Stop the upload and notify listeners if the state changed.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::EngineUnavailable`] for the sentinel adapter.
    pub fn cancel(&self) -> TransferResult<()> {
        self.require_engine("cancel")?.stop();
        self.publish_if_changed();
        Ok(())
    }

    /// Pause the upload and notify listeners if the state changed.
    ///
    /// # Errors
    ///
    /// Propagates engine failures, including lack of pause support.
    pub fn pause(&self) -> TransferResult<()> {
        self.require_engine("pause")?.pause()?;
        self.publish_if_changed();
        Ok(())
    }

    /// Resume the upload and notify listeners if the state changed.
    ///
    /// # Errors
    ///
    /// Propagates engine failures, including lack of resume support.
    pub fn resume(&self) -> TransferResult<()> {
        self.require_engine("resume")?.resume()?;
        self.publish_if_changed();
        Ok(())
    }

    /// Re-read the engine after a status report.
    pub fn refresh(&self) -> Option<UploadState> {
        self.publish_if_changed()
    }

    /// Register a state listener.
    pub fn add_listener(&self, listener: ListenerHandle<UploadState>) {
        self.listeners.add(listener);
    }

    /// Deregister a state listener.
    pub fn remove_listener(&self, listener: &ListenerHandle<UploadState>) -> bool {
        self.listeners.remove(listener)
    }

    fn require_engine(&self, operation: &'static str) -> TransferResult<&Arc<dyn UploadEngine>> {
        self.engine
            .as_ref()
            .ok_or(TransferError::EngineUnavailable { operation })
    }

    fn publish_if_changed(&self) -> Option<UploadState> {
        let (previous, current) = {
            let mut published = self
                .published
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let current = self.state();
            if *published == current {
                return None;
            }
            (std::mem::replace(&mut *published, current), current)
        };
        debug!(
            transfer = %self.identity,
            old = ?previous,
            new = ?current,
            "upload state changed"
        );
        self.listeners
            .broadcast(&PropertyChangeEvent::state(Some(previous), current));
        Some(current)
    }
}

fn is_browse(engine: &dyn UploadEngine) -> bool {
    engine.upload_type() == UploadType::BrowseHost
        || engine.last_transfer_state() == NativeUploadStatus::BrowseHost
}

fn format_address(bytes: &[u8]) -> String {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        return Ipv4Addr::from(octets).to_string();
    }
    if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
        return Ipv6Addr::from(octets).to_string();
    }
    bytes
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

impl PartialEq for UploadItem {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for UploadItem {}

impl Hash for UploadItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl fmt::Debug for UploadItem {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("UploadItem")
            .field("identity", &self.identity)
            .field("item_type", &self.item_type)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_format_by_width() {
        assert_eq!(format_address(&[1, 2, 3, 4]), "1.2.3.4");
        let mut v6 = [0_u8; 16];
        v6[15] = 1;
        assert_eq!(format_address(&v6), "::1");
        assert_eq!(format_address(&[10, 0, 7]), "10.0.7");
    }

    #[test]
    fn sentinel_upload_is_gnutella_with_no_error() {
        let item = UploadItem::absent();
        assert_eq!(item.upload_item_type(), UploadItemType::Gnutella);
        assert_eq!(item.upload_error_state(), UploadErrorState::NoError);
        assert_eq!(item.browse_type(), BrowseType::None);
        assert_eq!(item.metrics(), MetricsSnapshot::ZERO);
        assert_eq!(item.queue_position(), -1);
        assert!(item.host().is_empty());
        assert_eq!(item, UploadItem::absent());
    }
}
