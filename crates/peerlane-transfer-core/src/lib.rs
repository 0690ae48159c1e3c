#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Engine-agnostic transfer status adapters and torrent chaining.
//!
//! Native engines are consumed through the capability traits in [`service`].
//! [`DownloadItem`] and [`UploadItem`] translate their raw status into the
//! canonical vocabulary, derive metrics, and notify listeners. The
//! [`TorrentChainController`] promotes completed descriptor downloads into
//! derived swarm transfers.

pub mod adapter;
pub mod chaining;
pub mod convert;
pub mod error;
pub mod identity;
pub mod items;
pub mod listeners;
pub mod metrics;
pub mod model;
pub mod registry;
pub mod service;

pub use adapter::{DownloadItem, UploadItem};
pub use chaining::{
    ChainOutcome, ChainingDeps, ChainingOptions, DEFAULT_DESCRIPTOR_SUFFIX, RetryAction,
    TorrentChainController,
};
pub use error::{ConflictCode, TransferError, TransferResult};
pub use identity::TransferIdentity;
pub use items::{ActiveItemList, ItemSnapshot};
pub use listeners::{
    ListenerHandle, ListenerRegistry, PropertyChangeEvent, PropertyChangeListener, STATE_PROPERTY,
};
pub use metrics::{Bandwidth, InsufficientData, MetricsSnapshot, UNKNOWN_TIME};
pub use model::{
    BrowseType, DownloadState, ErrorState, NativeDownloadStatus, NativeUploadStatus, Progress,
    SwarmMetaInfo, SwarmSource, TransferRequest, UploadErrorState, UploadItemType, UploadState,
    UploadType, Urn,
};
pub use registry::DownloadRegistry;
pub use service::{ConflictHandler, DownloadEngine, ItemAssociation, TransferManager, UploadEngine};
