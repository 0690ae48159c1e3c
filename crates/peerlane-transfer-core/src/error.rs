//! Error types for transfer adapter and chaining operations.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reason a requested destination collides with existing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictCode {
    /// Another transfer is already downloading to the destination.
    FileAlreadyDownloading,
    /// A file already exists at the destination.
    FileAlreadyExists,
    /// The same content is already being downloaded to another path.
    FileIsAlreadyDownloadedTo,
    /// The content was already saved locally.
    FileAlreadySaved,
}

impl Display for ConflictCode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::FileAlreadyDownloading => "file_already_downloading",
            Self::FileAlreadyExists => "file_already_exists",
            Self::FileIsAlreadyDownloadedTo => "file_is_already_downloaded_to",
            Self::FileAlreadySaved => "file_already_saved",
        };
        formatter.write_str(label)
    }
}

/// Primary error type for transfer operations.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The destination of a request is already in use.
    #[error("transfer destination conflict")]
    Conflict {
        /// Conflict classification.
        code: ConflictCode,
        /// Destination involved, when known.
        path: Option<PathBuf>,
    },
    /// The transfer manager or engine rejected the request.
    #[error("transfer request failed")]
    RequestFailed {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Operation is not supported by the underlying engine.
    #[error("transfer operation not supported")]
    Unsupported {
        /// Operation identifier.
        operation: &'static str,
    },
    /// The adapter wraps no engine.
    #[error("transfer engine unavailable")]
    EngineUnavailable {
        /// Operation identifier.
        operation: &'static str,
    },
    /// The requested save location cannot be used.
    #[error("invalid save location")]
    InvalidSaveLocation {
        /// Offending path.
        path: PathBuf,
        /// Static reason for the rejection.
        reason: &'static str,
    },
}

impl TransferError {
    /// Whether the error is a recoverable destination conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Conflict classification, if this is a conflict.
    #[must_use]
    pub const fn conflict_code(&self) -> Option<ConflictCode> {
        match self {
            Self::Conflict { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Build a request failure with structured operation context.
    pub fn request_failed(
        operation: &'static str,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self::RequestFailed {
            operation,
            source: Box::new(source),
        }
    }
}

/// Convenience alias for transfer operation results.
pub type TransferResult<T> = Result<T, TransferError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn conflicts_are_classified() {
        let conflict = TransferError::Conflict {
            code: ConflictCode::FileAlreadyDownloading,
            path: Some(PathBuf::from("x.torrent")),
        };
        assert!(conflict.is_conflict());
        assert_eq!(
            conflict.conflict_code(),
            Some(ConflictCode::FileAlreadyDownloading)
        );
        assert_eq!(conflict.to_string(), "transfer destination conflict");

        let failed = TransferError::request_failed("request_transfer", io::Error::other("disk"));
        assert!(!failed.is_conflict());
        assert!(failed.conflict_code().is_none());
        assert_eq!(failed.source().map(ToString::to_string).as_deref(), Some("disk"));
    }

    #[test]
    fn messages_stay_constant() {
        let cases = [
            (
                TransferError::Unsupported { operation: "pause" },
                "transfer operation not supported",
            ),
            (
                TransferError::EngineUnavailable { operation: "cancel" },
                "transfer engine unavailable",
            ),
            (
                TransferError::InvalidSaveLocation {
                    path: PathBuf::from("/dev/null"),
                    reason: "not a regular file",
                },
                "invalid save location",
            ),
        ];
        for (err, message) in cases {
            assert_eq!(err.to_string(), message);
        }
        assert_eq!(ConflictCode::FileAlreadySaved.to_string(), "file_already_saved");
    }
}
