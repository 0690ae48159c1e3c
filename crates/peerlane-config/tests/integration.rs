use std::io::Write;
use std::sync::Arc;

use peerlane_config::{ConfigError, PeerlaneConfig};
use peerlane_test_support::{
    RecordingConflictHandler, RecordingTransferManager, ScriptedDownloadEngine,
};
use peerlane_transfer_core::{
    ChainOutcome, ConflictHandler, DownloadEngine, DownloadRegistry, TransferManager,
};

#[test]
fn loaded_policy_drives_descriptor_matching() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(
        file,
        r#"{{
            "chaining": {{"descriptor_suffix": ".swarm", "default_overwrite": true}},
            "events": {{"replay_capacity": 16}}
        }}"#
    )?;
    let config = PeerlaneConfig::load(file.path())?;

    let manager = Arc::new(RecordingTransferManager::new());
    let handler = Arc::new(RecordingConflictHandler::declining());
    let registry = DownloadRegistry::new(
        config.events.event_bus(),
        Arc::clone(&manager) as Arc<dyn TransferManager>,
        Arc::clone(&handler) as Arc<dyn ConflictHandler>,
        config.chaining_options(),
    );

    let legacy: Arc<dyn DownloadEngine> =
        Arc::new(ScriptedDownloadEngine::completed_at("/downloads/a.torrent"));
    let custom: Arc<dyn DownloadEngine> =
        Arc::new(ScriptedDownloadEngine::completed_at("/downloads/a.swarm"));
    registry.register(Arc::clone(&legacy));
    registry.register(Arc::clone(&custom));

    assert_eq!(
        registry.on_status_report(&legacy),
        Some(ChainOutcome::NotDescriptor)
    );
    assert_eq!(
        registry.on_status_report(&custom),
        Some(ChainOutcome::Promoted)
    );
    assert_eq!(manager.request_count(), 1);
    assert!(registry.item(&custom).is_none());
    assert!(registry.item(&legacy).is_some());
    let derived = manager.started()[0].handle();
    assert!(registry.item(&derived).is_some());
    assert_eq!(registry.len(), 2);
    Ok(())
}

#[test]
fn rejected_documents_name_the_field() {
    let err = PeerlaneConfig::from_json_str(r#"{"telemetry": {"level": ""}}"#)
        .expect_err("empty level");
    assert!(matches!(
        err,
        ConfigError::InvalidField {
            section: "telemetry",
            field: "level",
            ..
        }
    ));

    let err = PeerlaneConfig::from_json_str(r#"{"events": {"replay_capacity": 8, "ttl": 3}}"#)
        .expect_err("unknown field");
    assert!(matches!(
        err,
        ConfigError::UnknownField { ref section, ref field } if section == "events" && field == "ttl"
    ));
}
