//! Capability traits implemented by native engines and transfer managers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use crate::adapter::DownloadItem;
use crate::chaining::RetryAction;
use crate::error::{TransferError, TransferResult};
use crate::identity::TransferIdentity;
use crate::metrics::Bandwidth;
use crate::model::{
    NativeDownloadStatus, NativeUploadStatus, SwarmMetaInfo, TransferRequest, UploadType, Urn,
};

/// Backend object for one download, owned by a transport layer.
///
/// Optional capabilities default to "absent" or "unsupported" so single-source
/// engines only implement the accessors they have.
pub trait DownloadEngine: Send + Sync {
    /// Native status code.
    fn state(&self) -> NativeDownloadStatus;

    /// Bytes received so far.
    fn amount_read(&self) -> u64;

    /// Expected size in bytes, when known.
    fn content_length(&self) -> Option<u64>;

    /// Bandwidth in KiB/s since the last measurement.
    fn measured_bandwidth(&self) -> Bandwidth;

    /// Ask the engine to sample bandwidth; default is a no-op.
    fn measure_bandwidth(&self) {}

    /// Destination file once known.
    fn save_file(&self) -> Option<PathBuf>;

    /// Display title.
    fn title(&self) -> String;

    /// Stop the transfer.
    fn stop(&self);

    /// Pause the transfer; default implementation reports lack of support.
    fn pause(&self) -> TransferResult<()> {
        Err(TransferError::Unsupported { operation: "pause" })
    }

    /// Resume the transfer; default implementation reports lack of support.
    fn resume(&self) -> TransferResult<()> {
        Err(TransferError::Unsupported { operation: "resume" })
    }

    /// Change the destination; default implementation reports lack of support.
    fn set_save_file(&self, path: &Path, overwrite: bool) -> TransferResult<()> {
        let _ = (path, overwrite);
        Err(TransferError::Unsupported {
            operation: "set_save_file",
        })
    }

    /// Incomplete file being written, when distinct from the destination.
    fn downloading_file(&self) -> Option<PathBuf> {
        None
    }

    /// Number of sources currently usable.
    fn source_count(&self) -> u32 {
        0
    }

    /// Position in a remote uploader's queue.
    fn remote_queue_position(&self) -> i32 {
        -1
    }

    /// Priority in the local queue.
    fn queue_priority(&self) -> i32 {
        0
    }

    /// Seconds left in the current transient state, when bounded.
    fn remaining_state_time(&self) -> Option<u64> {
        None
    }

    /// Whether the partial file can be opened.
    fn is_launchable(&self) -> bool {
        false
    }

    /// Whether the engine can search for more sources.
    fn is_search_again_enabled(&self) -> bool {
        false
    }

    /// Content identifier.
    fn urn(&self) -> Option<Urn> {
        None
    }

    /// Parsed swarm descriptor, for swarm-capable engines.
    fn swarm_meta_info(&self) -> Option<SwarmMetaInfo> {
        None
    }
}

/// Backend object for one upload.
pub trait UploadEngine: Send + Sync {
    /// Native status code.
    fn state(&self) -> NativeUploadStatus;

    /// Status of the previous transfer on this connection.
    fn last_transfer_state(&self) -> NativeUploadStatus {
        self.state()
    }

    /// Kind of content being served.
    fn upload_type(&self) -> UploadType;

    /// Name of the associated file, if any.
    fn file_name(&self) -> Option<String>;

    /// Plain host reported by the engine.
    fn host(&self) -> String;

    /// Host string resolved by the engine, for engines that track one.
    fn string_host(&self) -> Option<String> {
        None
    }

    /// Raw remote address bytes, for engines that expose them.
    fn address_bytes(&self) -> Option<Vec<u8>> {
        None
    }

    /// Remote port, for engines that expose one.
    fn port(&self) -> Option<u16> {
        None
    }

    /// Position in the upload queue.
    fn queue_position(&self) -> i32 {
        -1
    }

    /// Connections open to the same host.
    fn num_upload_connections(&self) -> i32 {
        0
    }

    /// Backing file.
    fn file(&self) -> Option<PathBuf> {
        None
    }

    /// Content identifier.
    fn urn(&self) -> Option<Urn> {
        None
    }

    /// Size of the served content in bytes.
    fn file_size(&self) -> u64;

    /// Bytes sent so far.
    fn total_amount_uploaded(&self) -> u64;

    /// Ask the engine to sample bandwidth; default is a no-op.
    fn measure_bandwidth(&self) {}

    /// Bandwidth in KiB/s since the last measurement.
    fn measured_bandwidth(&self) -> Bandwidth;

    /// Stop the upload.
    fn stop(&self);

    /// Pause the upload; default implementation reports lack of support.
    fn pause(&self) -> TransferResult<()> {
        Err(TransferError::Unsupported { operation: "pause" })
    }

    /// Resume the upload; default implementation reports lack of support.
    fn resume(&self) -> TransferResult<()> {
        Err(TransferError::Unsupported { operation: "resume" })
    }

    /// Whether the engine belongs to the swarm transfer family.
    fn is_swarm_backed(&self) -> bool {
        false
    }
}

/// Authoritative request API for transfers.
pub trait TransferManager: Send + Sync {
    /// Request a derived swarm transfer.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Conflict`] when the destination is in use and
    /// any other variant for unrecoverable failures.
    fn request_transfer(&self, request: &TransferRequest)
    -> TransferResult<Arc<dyn DownloadEngine>>;
}

/// Engine-keyed association from a native engine to its status adapter.
pub trait ItemAssociation: Send + Sync {
    /// Adapter registered for the engine, if any.
    fn item_for(&self, identity: &TransferIdentity) -> Option<Arc<DownloadItem>>;
}

/// Decides how destination conflicts are resolved.
pub trait ConflictHandler: Send + Sync {
    /// Invoked once per detected conflict. `retry` may be called later from
    /// any thread to reissue the request.
    fn handle_conflict(&self, retry: RetryAction, details: &TransferError, default_overwrite: bool);

    /// Surface an unrecoverable request failure; default logs it.
    fn report_failure(&self, error: &TransferError) {
        warn!(error = %error, "transfer request failed");
    }
}
