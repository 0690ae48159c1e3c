use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::convert::{map_download_error, map_download_state};
use crate::error::{TransferError, TransferResult};
use crate::identity::TransferIdentity;
use crate::listeners::{ListenerHandle, ListenerRegistry, PropertyChangeEvent};
use crate::metrics::{self, MetricsSnapshot, UNKNOWN_TIME};
use crate::model::{DownloadState, ErrorState, NativeDownloadStatus, Progress, Urn};
use crate::service::DownloadEngine;

/// Observable canonical view over one native download engine.
pub struct DownloadItem {
    engine: Option<Arc<dyn DownloadEngine>>,
    identity: TransferIdentity,
    listeners: ListenerRegistry<DownloadState>,
    published: Mutex<DownloadState>,
}

impl DownloadItem {
    /// Adapter bound to `engine` for its whole lifetime.
    #[must_use]
    pub fn new(engine: Arc<dyn DownloadEngine>) -> Self {
        Self::from_engine(Some(engine))
    }

    /// Sentinel adapter wrapping no engine.
    #[must_use]
    pub fn absent() -> Self {
        Self::from_engine(None)
    }

    /// Adapter for a possibly-absent engine.
    #[must_use]
    pub fn from_engine(engine: Option<Arc<dyn DownloadEngine>>) -> Self {
        let identity = TransferIdentity::of_optional(engine.as_ref());
        let initial = engine
            .as_ref()
            .map_or(DownloadState::Downloading, |engine| {
                map_download_state(engine.state())
            });
        Self {
            engine,
            identity,
            listeners: ListenerRegistry::new(),
            published: Mutex::new(initial),
        }
    }

    /// Identity key of the wrapped engine.
    #[must_use]
    pub const fn identity(&self) -> TransferIdentity {
        self.identity
    }

    /// Wrapped engine handle.
    #[must_use]
    pub const fn engine(&self) -> Option<&Arc<dyn DownloadEngine>> {
        self.engine.as_ref()
    }

    /// Native status code, when an engine is present.
    #[must_use]
    pub fn native_state(&self) -> Option<NativeDownloadStatus> {
        self.engine.as_ref().map(|engine| engine.state())
    }

    /// Canonical state.
    #[must_use]
    pub fn state(&self) -> DownloadState {
        self.native_state()
            .map_or(DownloadState::Downloading, map_download_state)
    }

    /// Classified error for the current state.
    #[must_use]
    pub fn error_state(&self) -> ErrorState {
        self.native_state().map_or(ErrorState::None, map_download_error)
    }

    /// Display title.
    #[must_use]
    pub fn title(&self) -> String {
        self.engine
            .as_ref()
            .map(|engine| engine.title())
            .unwrap_or_default()
    }

    /// Bytes received so far.
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.engine.as_ref().map_or(0, |engine| engine.amount_read())
    }

    /// Expected size in bytes, when known.
    #[must_use]
    pub fn total_size(&self) -> Option<u64> {
        self.engine.as_ref().and_then(|engine| engine.content_length())
    }

    /// Current progress counters.
    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress {
            current: self.current_size(),
            total: self.total_size(),
        }
    }

    /// Completion percentage in `0..=100`.
    #[must_use]
    pub fn percent_complete(&self) -> u8 {
        metrics::percent_complete(self.current_size(), self.total_size())
    }

    /// Speed in KiB/s; 0 until the engine has enough samples.
    #[must_use]
    pub fn download_speed(&self) -> f32 {
        self.engine.as_ref().map_or(0.0, |engine| {
            engine.measure_bandwidth();
            metrics::speed(engine.measured_bandwidth())
        })
    }

    /// Seconds until completion, or [`UNKNOWN_TIME`].
    #[must_use]
    pub fn remaining_download_time(&self) -> u64 {
        metrics::remaining_time(self.total_size(), self.current_size(), self.download_speed())
    }

    /// All derived metrics from one sample.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.engine.as_ref().map_or(MetricsSnapshot::ZERO, |engine| {
            engine.measure_bandwidth();
            MetricsSnapshot::compute(self.progress(), engine.measured_bandwidth())
        })
    }

    /// Seconds left in the current transient state, or [`UNKNOWN_TIME`].
    #[must_use]
    pub fn remaining_time_in_state(&self) -> u64 {
        self.engine
            .as_ref()
            .and_then(|engine| engine.remaining_state_time())
            .unwrap_or(UNKNOWN_TIME)
    }

    /// Number of usable sources.
    #[must_use]
    pub fn download_source_count(&self) -> u32 {
        self.engine.as_ref().map_or(0, |engine| engine.source_count())
    }

    /// Position in a remote uploader's queue.
    #[must_use]
    pub fn remote_queue_position(&self) -> i32 {
        self.engine
            .as_ref()
            .map_or(-1, |engine| engine.remote_queue_position())
    }

    /// Priority in the local queue.
    #[must_use]
    pub fn local_queue_priority(&self) -> i32 {
        self.engine.as_ref().map_or(0, |engine| engine.queue_priority())
    }

    /// Whether the partial file can be opened.
    #[must_use]
    pub fn is_launchable(&self) -> bool {
        self.engine
            .as_ref()
            .is_some_and(|engine| engine.is_launchable())
    }

    /// Whether more sources can be searched for.
    #[must_use]
    pub fn is_search_again_enabled(&self) -> bool {
        self.engine
            .as_ref()
            .is_some_and(|engine| engine.is_search_again_enabled())
    }

    /// Incomplete file being written.
    #[must_use]
    pub fn downloading_file(&self) -> Option<PathBuf> {
        self.engine.as_ref().and_then(|engine| engine.downloading_file())
    }

    /// Destination file once known.
    #[must_use]
    pub fn save_file(&self) -> Option<PathBuf> {
        self.engine.as_ref().and_then(|engine| engine.save_file())
    }

    /// Content identifier.
    #[must_use]
    pub fn urn(&self) -> Option<Urn> {
        self.engine.as_ref().and_then(|engine| engine.urn())
    }

    /// Change the destination file.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::InvalidSaveLocation`] when `path` names no file,
    /// [`TransferError::EngineUnavailable`] for the sentinel adapter, and
    /// whatever the engine reports otherwise.
    pub fn set_save_file(&self, path: &Path, overwrite: bool) -> TransferResult<()> {
        if path.file_name().is_none() {
            return Err(TransferError::InvalidSaveLocation {
                path: path.to_path_buf(),
                reason: "path does not name a file",
            });
        }
        self.require_engine("set_save_file")?
            .set_save_file(path, overwrite)
    }

    /// Stop the transfer and notify listeners if the state changed.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::EngineUnavailable`] for the sentinel adapter.
    pub fn cancel(&self) -> TransferResult<()> {
        self.require_engine("cancel")?.stop();
        self.publish_if_changed();
        Ok(())
    }

    /// Pause the transfer and notify listeners if the state changed.
    ///
    /// # Errors
    ///
    /// Propagates engine failures, including lack of pause support.
    pub fn pause(&self) -> TransferResult<()> {
        self.require_engine("pause")?.pause()?;
        self.publish_if_changed();
        Ok(())
    }

    /// Resume the transfer and notify listeners if the state changed.
    ///
    /// # Errors
    ///
    /// Propagates engine failures, including lack of resume support.
    pub fn resume(&self) -> TransferResult<()> {
        self.require_engine("resume")?.resume()?;
        self.publish_if_changed();
        Ok(())
    }

    /// Re-read the engine after a status report. Returns the new state when
    /// it differs from the last published one.
    pub fn refresh(&self) -> Option<DownloadState> {
        self.publish_if_changed()
    }

    /// Register a state listener.
    pub fn add_listener(&self, listener: ListenerHandle<DownloadState>) {
        self.listeners.add(listener);
    }

    /// Deregister a state listener.
    pub fn remove_listener(&self, listener: &ListenerHandle<DownloadState>) -> bool {
        self.listeners.remove(listener)
    }

    fn require_engine(&self, operation: &'static str) -> TransferResult<&Arc<dyn DownloadEngine>> {
        self.engine
            .as_ref()
            .ok_or(TransferError::EngineUnavailable { operation })
    }

    fn publish_if_changed(&self) -> Option<DownloadState> {
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
            old = %previous,
            new = %current,
            "download state changed"
        );
        self.listeners
            .broadcast(&PropertyChangeEvent::state(Some(previous), current));
        Some(current)
    }
}

impl PartialEq for DownloadItem {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for DownloadItem {}

impl Hash for DownloadItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl fmt::Debug for DownloadItem {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DownloadItem")
            .field("identity", &self.identity)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{Bandwidth, InsufficientData};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedEngine {
        status: NativeDownloadStatus,
        read: u64,
        length: Option<u64>,
        bandwidth: Bandwidth,
        stops: AtomicUsize,
    }

    impl FixedEngine {
        fn new(status: NativeDownloadStatus) -> Self {
            Self {
                status,
                read: 0,
                length: None,
                bandwidth: Err(InsufficientData),
                stops: AtomicUsize::new(0),
            }
        }
    }

    impl DownloadEngine for FixedEngine {
        fn state(&self) -> NativeDownloadStatus {
            self.status
        }
        fn amount_read(&self) -> u64 {
            self.read
        }
        fn content_length(&self) -> Option<u64> {
            self.length
        }
        fn measured_bandwidth(&self) -> Bandwidth {
            self.bandwidth
        }
        fn save_file(&self) -> Option<PathBuf> {
            None
        }
        fn title(&self) -> String {
            "fixed".to_string()
        }
        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn sentinel_adapter_reports_safe_defaults() {
        let item = DownloadItem::absent();
        assert_eq!(item.identity(), TransferIdentity::Absent);
        assert_eq!(item.state(), DownloadState::Downloading);
        assert_eq!(item.error_state(), ErrorState::None);
        assert_eq!(item.metrics(), MetricsSnapshot::ZERO);
        assert_eq!(item.remaining_time_in_state(), UNKNOWN_TIME);
        assert!(item.title().is_empty());
        assert!(matches!(
            item.cancel(),
            Err(TransferError::EngineUnavailable { operation: "cancel" })
        ));
        assert_eq!(item, DownloadItem::absent());
    }

    #[test]
    fn metrics_follow_engine_counters() {
        let engine = FixedEngine {
            read: 2_048,
            length: Some(8_192),
            bandwidth: Ok(2.0),
            ..FixedEngine::new(NativeDownloadStatus::Downloading)
        };
        let item = DownloadItem::new(Arc::new(engine));
        assert_eq!(item.percent_complete(), 25);
        assert_eq!(item.remaining_download_time(), 3);
        assert!((item.download_speed() - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn set_save_file_rejects_paths_without_names() {
        let item = DownloadItem::new(Arc::new(FixedEngine::new(NativeDownloadStatus::Paused)));
        assert!(matches!(
            item.set_save_file(Path::new("/"), false),
            Err(TransferError::InvalidSaveLocation { .. })
        ));
        assert!(matches!(
            item.set_save_file(Path::new("movie.avi"), false),
            Err(TransferError::Unsupported { .. })
        ));
    }

    #[test]
    fn cancel_stops_once_and_refresh_is_quiet_afterwards() {
        let engine = Arc::new(FixedEngine::new(NativeDownloadStatus::Aborted));
        let item = DownloadItem::new(Arc::clone(&engine) as Arc<dyn DownloadEngine>);

        item.cancel().expect("cancel succeeds");
        assert_eq!(engine.stops.load(Ordering::SeqCst), 1);
        assert_eq!(item.refresh(), None);
    }
}
