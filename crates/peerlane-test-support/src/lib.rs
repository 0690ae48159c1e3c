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

//! Shared test helpers used across integration suites.
//! Layout: engines.rs (scriptable engine doubles), mocks.rs (recording
//! collaborators), fixtures.rs (sample payloads).

pub mod engines;
pub mod fixtures;
pub mod mocks;

pub use engines::{ScriptedDownloadEngine, ScriptedUploadEngine};
pub use mocks::{ConflictResponse, RecordingConflictHandler, RecordingListener, RecordingTransferManager};
