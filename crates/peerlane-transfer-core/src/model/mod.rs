//! Core transfer domain types shared by engines, adapters, and the chaining controller.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use peerlane_events::{DownloadState, UploadState};

/// Status codes reported by native download engines.
///
/// Engine families that report a code this vocabulary does not know pass it
/// through as [`NativeDownloadStatus::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeDownloadStatus {
    /// Waiting in the local queue.
    Queued,
    /// Connecting to sources.
    Connecting,
    /// Receiving payload data.
    Downloading,
    /// All sources busy.
    Busy,
    /// Finished and saved.
    Complete,
    /// Stopped by the user.
    Aborted,
    /// No sources could be reached.
    GaveUp,
    /// Local IO failure.
    DiskProblem,
    /// Waiting on network search results.
    WaitingForGnetResults,
    /// Content hash mismatch.
    CorruptFile,
    /// Queued by the remote uploader.
    RemoteQueued,
    /// Hashing the completed file.
    Hashing,
    /// Moving the completed file into place.
    Saving,
    /// Needs user intervention to continue.
    WaitingForUser,
    /// Waiting for an outbound connection slot.
    WaitingForConnections,
    /// Probing candidate sources one by one.
    IterativeGuessing,
    /// Looking up sources in the distributed hash table.
    QueryingDht,
    /// Locating the corrupted range.
    IdentifyCorruption,
    /// Corruption recovery failed.
    RecoveryFailed,
    /// Paused by the user.
    Paused,
    /// The content may not be redistributed.
    Invalid,
    /// Restarting after a pause.
    Resuming,
    /// Fetching the payload through a helper protocol.
    Fetching,
    /// Flagged as dangerous content.
    Dangerous,
    /// A scanner reported a threat.
    ThreatFound,
    /// Being scanned before completion.
    Scanning,
    /// Code not covered by this vocabulary.
    Unknown(u32),
}

/// Status codes reported by native upload engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeUploadStatus {
    /// Establishing the connection.
    Connecting,
    /// Peer refused as a freeloader.
    Freeloader,
    /// Upload slot limit reached.
    LimitReached,
    /// Sending payload data.
    Uploading,
    /// Finished sending.
    Complete,
    /// Aborted mid-stream.
    Interrupted,
    /// Requested file is not shared.
    FileNotFound,
    /// Serving a browse-host listing.
    BrowseHost,
    /// Waiting in the upload queue.
    Queued,
    /// Serving an update file.
    UpdateFile,
    /// Request could not be parsed.
    MalformedRequest,
    /// Acting as a push proxy.
    PushProxy,
    /// Requested range is not available.
    UnavailableRange,
    /// Peer banned for requesting too aggressively.
    BannedGreedy,
    /// Serving a hash tree request.
    ThexRequest,
    /// Serving a browser-controller request.
    BrowserController,
    /// Cancelled locally.
    Cancelled,
    /// Suspended by the engine.
    Suspended,
    /// Idle connection waiting for the next request.
    WaitingRequests,
    /// Code not covered by this vocabulary.
    Unknown(u32),
}

/// Kind of content an upload serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadType {
    /// A shared library file.
    Shared,
    /// A browse-host listing of the library.
    BrowseHost,
    /// Anything else (update files, tree hashes, proxies).
    Other,
}

/// General download error applicable to any engine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorState {
    /// The download is not in an error state.
    #[default]
    None,
    /// Reading or writing local storage failed.
    DiskProblem,
    /// Received content did not match its checksum.
    CorruptFile,
    /// The content may not be shared.
    FileNotSharable,
    /// No source could be reached.
    UnableToConnect,
}

impl ErrorState {
    /// User-facing description of the error.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::None => "No problems.",
            Self::DiskProblem => "There is a disk problem",
            Self::CorruptFile => "The file is corrupted",
            Self::FileNotSharable => "This file is not shareable",
            Self::UnableToConnect => "Trouble connecting to people",
        }
    }
}

/// General upload error applicable to any engine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UploadErrorState {
    /// The upload is not in an error state.
    #[default]
    NoError,
    /// Refused because of a rate or slot limit.
    LimitReached,
    /// Aborted mid-stream.
    Interrupted,
    /// Backing file missing or request malformed.
    FileError,
}

/// Classification of browse-host uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowseType {
    /// Not a browse-host upload.
    None,
    /// Browse requested by a friend (a file name identifies them).
    Friend,
    /// Anonymous peer-to-peer browse.
    P2p,
}

/// Engine family backing an upload, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UploadItemType {
    /// Single/multi-source file transfer engine.
    #[default]
    Gnutella,
    /// Swarm-backed engine.
    Bittorrent,
}

/// Byte counts for a transfer. `total` is `None` while the size is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Progress {
    /// Bytes transferred so far.
    pub current: u64,
    /// Expected size in bytes, when known.
    pub total: Option<u64>,
}

/// Content identifier such as `urn:sha1:...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Urn(String);

/// Error returned when parsing a malformed URN.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid urn")]
pub struct InvalidUrn {
    /// Rejected input.
    pub value: String,
}

impl Urn {
    /// Namespace-specific portion, e.g. `sha1`.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.0.split(':').nth(1).unwrap_or_default()
    }

    /// Full textual form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Urn {
    type Err = InvalidUrn;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.splitn(3, ':');
        let scheme = parts.next().unwrap_or_default();
        let namespace = parts.next().unwrap_or_default();
        let specific = parts.next().unwrap_or_default();
        if scheme.eq_ignore_ascii_case("urn") && !namespace.is_empty() && !specific.is_empty() {
            Ok(Self(value.to_string()))
        } else {
            Err(InvalidUrn {
                value: value.to_string(),
            })
        }
    }
}

impl TryFrom<String> for Urn {
    type Error = InvalidUrn;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Urn> for String {
    fn from(urn: Urn) -> Self {
        urn.0
    }
}

impl Display for Urn {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// In-memory swarm descriptor exposed by swarm-capable engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwarmMetaInfo {
    /// Hex-encoded info hash.
    pub info_hash: String,
    /// Display name announced by the descriptor.
    pub name: String,
    /// Raw bencoded descriptor bytes.
    #[serde(default)]
    pub bytes: Vec<u8>,
}

/// Where the derived swarm transfer should be read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SwarmSource {
    /// Descriptor already parsed by the engine.
    MetaInfo {
        /// Parsed descriptor.
        info: SwarmMetaInfo,
    },
    /// Descriptor saved to disk by a completed download.
    DescriptorFile {
        /// Path to the descriptor file.
        path: PathBuf,
    },
}

impl SwarmSource {
    /// Convenience constructor for in-memory descriptors.
    #[must_use]
    pub const fn meta_info(info: SwarmMetaInfo) -> Self {
        Self::MetaInfo { info }
    }

    /// Convenience constructor for descriptor files.
    #[must_use]
    pub fn descriptor_file(path: impl Into<PathBuf>) -> Self {
        Self::DescriptorFile { path: path.into() }
    }
}

/// Request payload handed to the transfer manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Descriptor for the derived transfer.
    pub source: SwarmSource,
    /// Whether an existing destination may be overwritten.
    pub overwrite: bool,
    /// Destination override chosen while resolving a conflict.
    #[serde(default)]
    pub save_path: Option<PathBuf>,
}

impl TransferRequest {
    /// First attempt for a source: no overwrite, default destination.
    #[must_use]
    pub const fn initial(source: SwarmSource) -> Self {
        Self {
            source,
            overwrite: false,
            save_path: None,
        }
    }

    /// Same request with new conflict-resolution knobs.
    #[must_use]
    pub fn retried(&self, save_path: Option<PathBuf>, overwrite: bool) -> Self {
        Self {
            source: self.source.clone(),
            overwrite,
            save_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urn_parsing_requires_scheme_and_namespace() {
        let urn: Urn = "urn:sha1:NETZHKEJKTCM74ZQQALJWSLWQHQJ7N6Q"
            .parse()
            .expect("valid urn");
        assert_eq!(urn.namespace(), "sha1");
        assert_eq!(urn.to_string(), "urn:sha1:NETZHKEJKTCM74ZQQALJWSLWQHQJ7N6Q");

        assert!("sha1:abc".parse::<Urn>().is_err());
        assert!("urn::abc".parse::<Urn>().is_err());
        assert!("urn:sha1:".parse::<Urn>().is_err());
    }

    #[test]
    fn retried_request_keeps_source() {
        let request = TransferRequest::initial(SwarmSource::descriptor_file("a.torrent"));
        assert!(!request.overwrite);

        let retry = request.retried(None, true);
        assert_eq!(retry.source, request.source);
        assert!(retry.overwrite);
        assert!(retry.save_path.is_none());
    }

    #[test]
    fn error_messages_are_user_facing() {
        assert_eq!(ErrorState::default(), ErrorState::None);
        assert_eq!(ErrorState::CorruptFile.message(), "The file is corrupted");
        assert_eq!(UploadErrorState::default(), UploadErrorState::NoError);
    }

    #[test]
    fn swarm_source_serializes_with_tag() {
        let source = SwarmSource::descriptor_file("movie.torrent");
        let encoded = serde_json::to_value(&source).expect("serialize");
        assert_eq!(encoded["type"], "descriptor_file");
        assert_eq!(encoded["path"], "movie.torrent");
    }
}
