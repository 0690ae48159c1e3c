//! Canonical transfer vocabularies and the lifecycle events carried on the bus.

use chrono::{DateTime, Utc};
use std::fmt::{self, Display, Formatter};
use uuid::Uuid;

/// Identifier assigned to each event emitted by the platform.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Canonical download states shared by every engine family.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    /// Looking for or negotiating with sources.
    Connecting,
    /// Payload data is flowing.
    Downloading,
    /// Restarting after a pause.
    Resuming,
    /// Paused by the user.
    Paused,
    /// Waiting on user input or out of sources.
    Stalled,
    /// Sources were busy; the engine will try again.
    TryingAgain,
    /// Waiting in the local download queue.
    LocalQueued,
    /// Waiting in a remote uploader's queue.
    RemoteQueued,
    /// Verifying or moving the completed file.
    Finishing,
    /// Completed successfully.
    Done,
    /// Cancelled by the user.
    Cancelled,
    /// Stopped on an error; see the classified error state.
    Error,
}

impl DownloadState {
    /// Whether the state can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }

    /// Whether the state should be displayed as finished, including errors.
    #[must_use]
    pub const fn is_finished_for_display(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Error)
    }
}

impl Display for DownloadState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Connecting => "connecting",
            Self::Downloading => "downloading",
            Self::Resuming => "resuming",
            Self::Paused => "paused",
            Self::Stalled => "stalled",
            Self::TryingAgain => "trying_again",
            Self::LocalQueued => "local_queued",
            Self::RemoteQueued => "remote_queued",
            Self::Finishing => "finishing",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        };
        formatter.write_str(label)
    }
}

/// Canonical upload states shared by every engine family.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    /// Waiting for an upload slot.
    Queued,
    /// Serving data to the remote peer.
    Uploading,
    /// Upload finished.
    Done,
    /// Serving a browse-host listing.
    BrowseHost,
    /// Browse-host listing finished.
    BrowseHostDone,
    /// Cancelled locally.
    Cancelled,
    /// Refused because a rate or slot limit was reached.
    LimitReached,
    /// The upload could not be served.
    UnableToUpload,
    /// Suspended by the engine.
    Paused,
    /// Connection idle, waiting for further requests.
    Waiting,
}

impl UploadState {
    /// Whether the state represents a failed upload.
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::LimitReached | Self::UnableToUpload)
    }

    /// Whether the upload will not progress further.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(
            self,
            Self::Done | Self::BrowseHostDone | Self::Cancelled | Self::LimitReached | Self::UnableToUpload
        )
    }
}

/// Why a status adapter left the active item list.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// The user cancelled the transfer.
    Cancelled,
    /// A descriptor download was promoted to a derived swarm transfer.
    Promoted,
    /// The derived transfer conflicted and no retry has succeeded yet.
    ConflictUnresolved,
    /// The derived transfer request failed.
    PromotionFailed,
    /// The transfer manager retired the transfer permanently.
    Retired,
}

/// Typed lifecycle events surfaced by the transfer registry.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A transfer was registered and its adapter joined the active list.
    TransferAdded {
        /// Identifier assigned at registration.
        transfer_id: Uuid,
        /// Display title reported by the engine.
        title: String,
    },
    /// The canonical state of a registered download changed.
    StateChanged {
        /// Identifier assigned at registration.
        transfer_id: Uuid,
        /// Newly observed canonical state.
        state: DownloadState,
    },
    /// A completed descriptor download was handed to the transfer manager.
    TransferPromoted {
        /// Identifier of the placeholder transfer.
        transfer_id: Uuid,
    },
    /// Requesting the derived transfer hit a destination conflict.
    ConflictDetected {
        /// Identifier of the placeholder transfer.
        transfer_id: Uuid,
    },
    /// An adapter left the active item list.
    TransferRemoved {
        /// Identifier assigned at registration.
        transfer_id: Uuid,
        /// Reason for the removal.
        reason: RemovalReason,
    },
}

impl Event {
    /// Machine-friendly discriminator for log filtering.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TransferAdded { .. } => "transfer_added",
            Self::StateChanged { .. } => "state_changed",
            Self::TransferPromoted { .. } => "transfer_promoted",
            Self::ConflictDetected { .. } => "conflict_detected",
            Self::TransferRemoved { .. } => "transfer_removed",
        }
    }

    /// Transfer the event refers to.
    #[must_use]
    pub const fn transfer_id(&self) -> Uuid {
        match self {
            Self::TransferAdded { transfer_id, .. }
            | Self::StateChanged { transfer_id, .. }
            | Self::TransferPromoted { transfer_id }
            | Self::ConflictDetected { transfer_id }
            | Self::TransferRemoved { transfer_id, .. } => *transfer_id,
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Monotonic identifier assigned to the wrapped event.
    pub id: EventId,
    /// Timestamp recording when the envelope was produced.
    pub timestamp: DateTime<Utc>,
    /// Wrapped event payload.
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_maps_every_variant() {
        let id = Uuid::nil();
        let cases = [
            (
                Event::TransferAdded {
                    transfer_id: id,
                    title: "demo".into(),
                },
                "transfer_added",
            ),
            (
                Event::StateChanged {
                    transfer_id: id,
                    state: DownloadState::Downloading,
                },
                "state_changed",
            ),
            (Event::TransferPromoted { transfer_id: id }, "transfer_promoted"),
            (Event::ConflictDetected { transfer_id: id }, "conflict_detected"),
            (
                Event::TransferRemoved {
                    transfer_id: id,
                    reason: RemovalReason::Promoted,
                },
                "transfer_removed",
            ),
        ];

        for (event, kind) in cases {
            assert_eq!(event.kind(), kind);
            assert_eq!(event.transfer_id(), id);
        }
    }

    #[test]
    fn removal_reasons_use_snake_case_tags() {
        let tags: Vec<String> = [
            RemovalReason::Promoted,
            RemovalReason::ConflictUnresolved,
            RemovalReason::PromotionFailed,
        ]
        .iter()
        .map(|reason| serde_json::to_string(reason).expect("serialise reason"))
        .collect();
        assert_eq!(
            tags,
            ["\"promoted\"", "\"conflict_unresolved\"", "\"promotion_failed\""]
        );
    }

    #[test]
    fn terminal_states_are_done_and_cancelled_only() {
        assert!(DownloadState::Done.is_terminal());
        assert!(DownloadState::Cancelled.is_terminal());
        assert!(!DownloadState::Error.is_terminal());
        assert!(DownloadState::Error.is_finished_for_display());
        assert!(!DownloadState::Stalled.is_finished_for_display());
    }

    #[test]
    fn upload_error_states_are_classified() {
        assert!(UploadState::LimitReached.is_error());
        assert!(UploadState::UnableToUpload.is_error());
        assert!(!UploadState::BrowseHostDone.is_error());
        assert!(UploadState::BrowseHostDone.is_finished());
        assert!(!UploadState::Waiting.is_finished());
    }

    #[test]
    fn states_serialize_as_snake_case() {
        let encoded = serde_json::to_string(&DownloadState::TryingAgain).expect("serialize");
        assert_eq!(encoded, "\"trying_again\"");
        assert_eq!(DownloadState::RemoteQueued.to_string(), "remote_queued");
    }
}
