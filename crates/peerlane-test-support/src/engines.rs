//! Scriptable native engine doubles.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use peerlane_transfer_core::{
    Bandwidth, DownloadEngine, InsufficientData, NativeDownloadStatus, NativeUploadStatus,
    SwarmMetaInfo, TransferError, TransferResult, UploadEngine, UploadType, Urn,
};

#[derive(Debug, Clone)]
struct DownloadScript {
    status: NativeDownloadStatus,
    amount_read: u64,
    content_length: Option<u64>,
    bandwidth: Bandwidth,
    save_file: Option<PathBuf>,
    title: String,
    meta_info: Option<SwarmMetaInfo>,
    urn: Option<Urn>,
    sources: u32,
    pausable: bool,
    after_stop: Option<NativeDownloadStatus>,
}

/// Download engine whose observable fields are set by the test.
#[derive(Debug)]
pub struct ScriptedDownloadEngine {
    script: Mutex<DownloadScript>,
    stops: AtomicUsize,
    pauses: AtomicUsize,
    resumes: AtomicUsize,
    save_file_reads: AtomicUsize,
    saved_to: Mutex<Vec<(PathBuf, bool)>>,
}

impl ScriptedDownloadEngine {
    /// Engine reporting `status` with no progress or bandwidth samples.
    #[must_use]
    pub fn new(status: NativeDownloadStatus) -> Self {
        Self {
            script: Mutex::new(DownloadScript {
                status,
                amount_read: 0,
                content_length: None,
                bandwidth: Err(InsufficientData),
                save_file: None,
                title: "scripted download".to_string(),
                meta_info: None,
                urn: None,
                sources: 0,
                pausable: false,
                after_stop: None,
            }),
            stops: AtomicUsize::new(0),
            pauses: AtomicUsize::new(0),
            resumes: AtomicUsize::new(0),
            save_file_reads: AtomicUsize::new(0),
            saved_to: Mutex::new(Vec::new()),
        }
    }

    /// Completed engine that saved to `path`.
    #[must_use]
    pub fn completed_at(path: impl Into<PathBuf>) -> Self {
        Self::new(NativeDownloadStatus::Complete).with_save_file(path)
    }

    /// Set the destination file.
    #[must_use]
    pub fn with_save_file(self, path: impl Into<PathBuf>) -> Self {
        self.script().save_file = Some(path.into());
        self
    }

    /// Expose an in-memory swarm descriptor.
    #[must_use]
    pub fn with_meta_info(self, info: SwarmMetaInfo) -> Self {
        self.script().meta_info = Some(info);
        self
    }

    /// Set byte counters.
    #[must_use]
    pub fn with_progress(self, amount_read: u64, content_length: Option<u64>) -> Self {
        self.set_progress(amount_read, content_length);
        self
    }

    /// Set the bandwidth reading.
    #[must_use]
    pub fn with_bandwidth(self, bandwidth: Bandwidth) -> Self {
        self.script().bandwidth = bandwidth;
        self
    }

    /// Set the title.
    #[must_use]
    pub fn with_title(self, title: impl Into<String>) -> Self {
        self.script().title = title.into();
        self
    }

    /// Set the content identifier.
    #[must_use]
    pub fn with_urn(self, urn: Urn) -> Self {
        self.script().urn = Some(urn);
        self
    }

    /// Set the usable source count.
    #[must_use]
    pub fn with_sources(self, sources: u32) -> Self {
        self.script().sources = sources;
        self
    }

    /// Accept pause and resume, moving to the matching native status.
    #[must_use]
    pub fn pausable(self) -> Self {
        self.script().pausable = true;
        self
    }

    /// Status reported once `stop` has been called.
    #[must_use]
    pub fn stops_as(self, status: NativeDownloadStatus) -> Self {
        self.script().after_stop = Some(status);
        self
    }

    /// Change the reported status.
    pub fn set_status(&self, status: NativeDownloadStatus) {
        self.script().status = status;
    }

    /// Change the byte counters.
    pub fn set_progress(&self, amount_read: u64, content_length: Option<u64>) {
        let mut script = self.script();
        script.amount_read = amount_read;
        script.content_length = content_length;
    }

    /// Shared trait-object handle.
    #[must_use]
    pub fn handle(self: &Arc<Self>) -> Arc<dyn DownloadEngine> {
        Arc::clone(self) as Arc<dyn DownloadEngine>
    }

    /// Number of `stop` calls.
    #[must_use]
    pub fn stop_calls(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Number of `pause` calls.
    #[must_use]
    pub fn pause_calls(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    /// Number of `resume` calls.
    #[must_use]
    pub fn resume_calls(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    /// Number of `save_file` reads.
    #[must_use]
    pub fn save_file_reads(&self) -> usize {
        self.save_file_reads.load(Ordering::SeqCst)
    }

    /// Destinations passed to `set_save_file`.
    #[must_use]
    pub fn saved_to(&self) -> Vec<(PathBuf, bool)> {
        self.saved_to
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn script(&self) -> MutexGuard<'_, DownloadScript> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DownloadEngine for ScriptedDownloadEngine {
    fn state(&self) -> NativeDownloadStatus {
        self.script().status
    }

    fn amount_read(&self) -> u64 {
        self.script().amount_read
    }

    fn content_length(&self) -> Option<u64> {
        self.script().content_length
    }

    fn measured_bandwidth(&self) -> Bandwidth {
        self.script().bandwidth
    }

    fn save_file(&self) -> Option<PathBuf> {
        self.save_file_reads.fetch_add(1, Ordering::SeqCst);
        self.script().save_file.clone()
    }

    fn title(&self) -> String {
        self.script().title.clone()
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script();
        if let Some(status) = script.after_stop {
            script.status = status;
        }
    }

    fn pause(&self) -> TransferResult<()> {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script();
        if !script.pausable {
            return Err(TransferError::Unsupported { operation: "pause" });
        }
        script.status = NativeDownloadStatus::Paused;
        Ok(())
    }

    fn resume(&self) -> TransferResult<()> {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script();
        if !script.pausable {
            return Err(TransferError::Unsupported { operation: "resume" });
        }
        script.status = NativeDownloadStatus::Resuming;
        Ok(())
    }

    fn set_save_file(&self, path: &Path, overwrite: bool) -> TransferResult<()> {
        self.saved_to
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((path.to_path_buf(), overwrite));
        self.script().save_file = Some(path.to_path_buf());
        Ok(())
    }

    fn source_count(&self) -> u32 {
        self.script().sources
    }

    fn urn(&self) -> Option<Urn> {
        self.script().urn.clone()
    }

    fn swarm_meta_info(&self) -> Option<SwarmMetaInfo> {
        self.script().meta_info.clone()
    }
}

#[derive(Debug, Clone)]
struct UploadScript {
    status: NativeUploadStatus,
    last_transfer: Option<NativeUploadStatus>,
    upload_type: UploadType,
    file_name: Option<String>,
    host: String,
    string_host: Option<String>,
    address: Option<Vec<u8>>,
    queue_position: i32,
    connections: i32,
    file: Option<PathBuf>,
    file_size: u64,
    uploaded: u64,
    bandwidth: Bandwidth,
    swarm: bool,
    after_stop: Option<NativeUploadStatus>,
}

/// Upload engine whose observable fields are set by the test.
#[derive(Debug)]
pub struct ScriptedUploadEngine {
    script: Mutex<UploadScript>,
    stops: AtomicUsize,
    host_reads: AtomicUsize,
}

impl ScriptedUploadEngine {
    /// Engine reporting `status` for a shared file.
    #[must_use]
    pub fn new(status: NativeUploadStatus) -> Self {
        Self {
            script: Mutex::new(UploadScript {
                status,
                last_transfer: None,
                upload_type: UploadType::Shared,
                file_name: None,
                host: "peer.example".to_string(),
                string_host: None,
                address: None,
                queue_position: -1,
                connections: 0,
                file: None,
                file_size: 0,
                uploaded: 0,
                bandwidth: Err(InsufficientData),
                swarm: false,
                after_stop: None,
            }),
            stops: AtomicUsize::new(0),
            host_reads: AtomicUsize::new(0),
        }
    }

    /// Browse-host upload in `status` with an optional friend file name.
    #[must_use]
    pub fn browse(status: NativeUploadStatus, file_name: &str) -> Self {
        Self::new(status)
            .with_upload_type(UploadType::BrowseHost)
            .with_last_transfer(NativeUploadStatus::BrowseHost)
            .with_file_name(file_name)
    }

    /// Set the upload type.
    #[must_use]
    pub fn with_upload_type(self, upload_type: UploadType) -> Self {
        self.script().upload_type = upload_type;
        self
    }

    /// Set the previous transfer status.
    #[must_use]
    pub fn with_last_transfer(self, status: NativeUploadStatus) -> Self {
        self.script().last_transfer = Some(status);
        self
    }

    /// Set the file name.
    #[must_use]
    pub fn with_file_name(self, name: &str) -> Self {
        self.script().file_name = Some(name.to_string());
        self
    }

    /// Set the plain host.
    #[must_use]
    pub fn with_host(self, host: &str) -> Self {
        self.script().host = host.to_string();
        self
    }

    /// Expose a resolved host string.
    #[must_use]
    pub fn with_string_host(self, host: &str) -> Self {
        self.script().string_host = Some(host.to_string());
        self
    }

    /// Expose raw address bytes.
    #[must_use]
    pub fn with_address(self, bytes: &[u8]) -> Self {
        self.script().address = Some(bytes.to_vec());
        self
    }

    /// Set queue position and connection count.
    #[must_use]
    pub fn with_queue(self, position: i32, connections: i32) -> Self {
        let mut script = self.script();
        script.queue_position = position;
        script.connections = connections;
        drop(script);
        self
    }

    /// Set the backing file.
    #[must_use]
    pub fn with_file(self, path: impl Into<PathBuf>) -> Self {
        self.script().file = Some(path.into());
        self
    }

    /// Set byte counters and bandwidth.
    #[must_use]
    pub fn with_transfer(self, file_size: u64, uploaded: u64, bandwidth: Bandwidth) -> Self {
        let mut script = self.script();
        script.file_size = file_size;
        script.uploaded = uploaded;
        script.bandwidth = bandwidth;
        drop(script);
        self
    }

    /// Mark the engine as swarm-backed.
    #[must_use]
    pub fn swarm_backed(self) -> Self {
        self.script().swarm = true;
        self
    }

    /// Status reported once `stop` has been called.
    #[must_use]
    pub fn stops_as(self, status: NativeUploadStatus) -> Self {
        self.script().after_stop = Some(status);
        self
    }

    /// Change the reported status.
    pub fn set_status(&self, status: NativeUploadStatus) {
        self.script().status = status;
    }

    /// Shared trait-object handle.
    #[must_use]
    pub fn handle(self: &Arc<Self>) -> Arc<dyn UploadEngine> {
        Arc::clone(self) as Arc<dyn UploadEngine>
    }

    /// Number of `stop` calls.
    #[must_use]
    pub fn stop_calls(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Number of plain `host` reads.
    #[must_use]
    pub fn host_reads(&self) -> usize {
        self.host_reads.load(Ordering::SeqCst)
    }

    fn script(&self) -> MutexGuard<'_, UploadScript> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UploadEngine for ScriptedUploadEngine {
    fn state(&self) -> NativeUploadStatus {
        self.script().status
    }

    fn last_transfer_state(&self) -> NativeUploadStatus {
        let script = self.script();
        script.last_transfer.unwrap_or(script.status)
    }

    fn upload_type(&self) -> UploadType {
        self.script().upload_type
    }

    fn file_name(&self) -> Option<String> {
        self.script().file_name.clone()
    }

    fn host(&self) -> String {
        self.host_reads.fetch_add(1, Ordering::SeqCst);
        self.script().host.clone()
    }

    fn string_host(&self) -> Option<String> {
        self.script().string_host.clone()
    }

    fn address_bytes(&self) -> Option<Vec<u8>> {
        self.script().address.clone()
    }

    fn queue_position(&self) -> i32 {
        self.script().queue_position
    }

    fn num_upload_connections(&self) -> i32 {
        self.script().connections
    }

    fn file(&self) -> Option<PathBuf> {
        self.script().file.clone()
    }

    fn file_size(&self) -> u64 {
        self.script().file_size
    }

    fn total_amount_uploaded(&self) -> u64 {
        self.script().uploaded
    }

    fn measured_bandwidth(&self) -> Bandwidth {
        self.script().bandwidth
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script();
        if let Some(status) = script.after_stop {
            script.status = status;
        }
    }

    fn is_swarm_backed(&self) -> bool {
        self.script().swarm
    }
}
