//! Total mappings from native engine status codes to the canonical vocabulary.

use tracing::debug;

use crate::model::{
    DownloadState, ErrorState, NativeDownloadStatus, NativeUploadStatus, UploadErrorState,
    UploadState,
};

/// Canonical state for a native download status. Unknown codes read as downloading.
#[must_use]
pub fn map_download_state(status: NativeDownloadStatus) -> DownloadState {
    match status {
        NativeDownloadStatus::Saving
        | NativeDownloadStatus::Hashing
        | NativeDownloadStatus::Scanning => DownloadState::Finishing,
        NativeDownloadStatus::Downloading | NativeDownloadStatus::Fetching => {
            DownloadState::Downloading
        }
        NativeDownloadStatus::Connecting
        | NativeDownloadStatus::WaitingForConnections
        | NativeDownloadStatus::IterativeGuessing
        | NativeDownloadStatus::QueryingDht => DownloadState::Connecting,
        NativeDownloadStatus::Busy | NativeDownloadStatus::WaitingForGnetResults => {
            DownloadState::TryingAgain
        }
        NativeDownloadStatus::Resuming => DownloadState::Resuming,
        NativeDownloadStatus::Complete => DownloadState::Done,
        NativeDownloadStatus::RemoteQueued => DownloadState::RemoteQueued,
        NativeDownloadStatus::Queued => DownloadState::LocalQueued,
        NativeDownloadStatus::Paused => DownloadState::Paused,
        NativeDownloadStatus::WaitingForUser => DownloadState::Stalled,
        NativeDownloadStatus::Aborted => DownloadState::Cancelled,
        NativeDownloadStatus::DiskProblem
        | NativeDownloadStatus::CorruptFile
        | NativeDownloadStatus::IdentifyCorruption
        | NativeDownloadStatus::RecoveryFailed
        | NativeDownloadStatus::Invalid
        | NativeDownloadStatus::GaveUp
        | NativeDownloadStatus::Dangerous
        | NativeDownloadStatus::ThreatFound => DownloadState::Error,
        NativeDownloadStatus::Unknown(code) => {
            debug!(code, "unknown native download status");
            DownloadState::Downloading
        }
    }
}

/// Error classification for a native download status.
#[must_use]
pub fn map_download_error(status: NativeDownloadStatus) -> ErrorState {
    match status {
        NativeDownloadStatus::GaveUp => ErrorState::UnableToConnect,
        NativeDownloadStatus::Invalid
        | NativeDownloadStatus::Dangerous
        | NativeDownloadStatus::ThreatFound => ErrorState::FileNotSharable,
        NativeDownloadStatus::CorruptFile
        | NativeDownloadStatus::IdentifyCorruption
        | NativeDownloadStatus::RecoveryFailed => ErrorState::CorruptFile,
        NativeDownloadStatus::DiskProblem => ErrorState::DiskProblem,
        _ => ErrorState::None,
    }
}

/// Canonical state for a native upload status.
///
/// `browse` is true when the current or last transfer served a browse-host
/// listing; a completed browse reads as [`UploadState::BrowseHostDone`].
#[must_use]
pub fn map_upload_state(status: NativeUploadStatus, browse: bool) -> UploadState {
    match status {
        NativeUploadStatus::Cancelled => UploadState::Cancelled,
        NativeUploadStatus::Complete if browse => UploadState::BrowseHostDone,
        NativeUploadStatus::Complete => UploadState::Done,
        NativeUploadStatus::Connecting
        | NativeUploadStatus::Uploading
        | NativeUploadStatus::ThexRequest
        | NativeUploadStatus::PushProxy
        | NativeUploadStatus::UpdateFile
        | NativeUploadStatus::BrowserController => UploadState::Uploading,
        NativeUploadStatus::Queued => UploadState::Queued,
        NativeUploadStatus::WaitingRequests => UploadState::Waiting,
        NativeUploadStatus::Suspended => UploadState::Paused,
        NativeUploadStatus::BrowseHost => UploadState::BrowseHost,
        NativeUploadStatus::BannedGreedy
        | NativeUploadStatus::Freeloader
        | NativeUploadStatus::LimitReached => UploadState::LimitReached,
        NativeUploadStatus::FileNotFound
        | NativeUploadStatus::Interrupted
        | NativeUploadStatus::MalformedRequest
        | NativeUploadStatus::UnavailableRange => UploadState::UnableToUpload,
        NativeUploadStatus::Unknown(code) => {
            debug!(code, "unknown native upload status");
            UploadState::Uploading
        }
    }
}

/// Error classification for a native upload status.
#[must_use]
pub const fn map_upload_error(status: NativeUploadStatus) -> UploadErrorState {
    match status {
        NativeUploadStatus::LimitReached
        | NativeUploadStatus::BannedGreedy
        | NativeUploadStatus::Freeloader => UploadErrorState::LimitReached,
        NativeUploadStatus::Interrupted => UploadErrorState::Interrupted,
        NativeUploadStatus::FileNotFound
        | NativeUploadStatus::MalformedRequest
        | NativeUploadStatus::UnavailableRange => UploadErrorState::FileError,
        _ => UploadErrorState::NoError,
    }
}
