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

//! Typed configuration for the Peerlane transfer core.
//!
//! Layout: `model.rs` (sections and conversions), `validate.rs` (field rules),
//! `loader.rs` (JSON string, value, and file entry points).

pub mod error;
mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{ChainingPolicy, EventSettings, PeerlaneConfig, TelemetrySettings};
pub use validate::MAX_REPLAY_CAPACITY;
