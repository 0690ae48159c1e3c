//! Sample payloads and collaborator wiring.

use std::sync::Arc;

use peerlane_transfer_core::model::InvalidUrn;
use peerlane_transfer_core::{
    ActiveItemList, ChainingDeps, ChainingOptions, ConflictHandler, ItemAssociation,
    SwarmMetaInfo, TransferManager, Urn,
};

use crate::mocks::{RecordingConflictHandler, RecordingTransferManager};

/// Descriptor path that matches the default suffix.
pub const DESCRIPTOR_PATH: &str = "/downloads/ubuntu-24.04.torrent";

/// Completed download that is not a descriptor.
pub const PLAIN_PATH: &str = "/downloads/readme.txt";

/// Parsed descriptor for a small single-file swarm.
#[must_use]
pub fn sample_meta_info() -> SwarmMetaInfo {
    SwarmMetaInfo {
        info_hash: "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".to_string(),
        name: "ubuntu-24.04-desktop-amd64.iso".to_string(),
        bytes: b"d4:infod4:name30:ubuntu-24.04-desktop-amd64.isoee".to_vec(),
    }
}

/// Content identifier with a `sha1` namespace.
///
/// # Errors
///
/// Propagates the URN parse result.
pub fn sample_urn() -> Result<Urn, InvalidUrn> {
    "urn:sha1:NETZHKEJKTCM74ZQQALJWSLWQHQJ7N6Q".parse()
}

/// Controller collaborators backed by the recording doubles.
#[must_use]
pub fn chaining_deps(
    manager: &Arc<RecordingTransferManager>,
    handler: &Arc<RecordingConflictHandler>,
    items: &ActiveItemList,
) -> ChainingDeps {
    ChainingDeps {
        manager: Arc::clone(manager) as Arc<dyn TransferManager>,
        handler: Arc::clone(handler) as Arc<dyn ConflictHandler>,
        association: Arc::new(items.clone()) as Arc<dyn ItemAssociation>,
        items: items.clone(),
        options: ChainingOptions::default(),
    }
}
