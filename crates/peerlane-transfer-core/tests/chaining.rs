use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use peerlane_test_support::fixtures::{
    DESCRIPTOR_PATH, PLAIN_PATH, chaining_deps, sample_meta_info,
};
use peerlane_test_support::{
    ConflictResponse, RecordingConflictHandler, RecordingTransferManager, ScriptedDownloadEngine,
};
use peerlane_transfer_core::{
    ActiveItemList, ChainOutcome, ConflictCode, DownloadEngine, DownloadItem,
    NativeDownloadStatus, SwarmSource, TorrentChainController, TransferIdentity,
};

struct Harness {
    manager: Arc<RecordingTransferManager>,
    handler: Arc<RecordingConflictHandler>,
    items: ActiveItemList,
    engine: Arc<ScriptedDownloadEngine>,
}

impl Harness {
    fn new(
        manager: RecordingTransferManager,
        handler: RecordingConflictHandler,
        engine: ScriptedDownloadEngine,
    ) -> Self {
        let harness = Self {
            manager: Arc::new(manager),
            handler: Arc::new(handler),
            items: ActiveItemList::new(),
            engine: Arc::new(engine),
        };
        harness
            .items
            .add(Arc::new(DownloadItem::new(harness.engine.handle())));
        harness
    }

    fn run(&self) -> TorrentChainController {
        let deps = chaining_deps(&self.manager, &self.handler, &self.items);
        TorrentChainController::new(&deps, &self.engine.handle())
    }

    fn placeholder_listed(&self) -> bool {
        self.items
            .contains(TransferIdentity::of(&self.engine.handle()))
    }
}

#[test]
fn completed_descriptor_is_promoted_and_placeholder_removed() {
    let harness = Harness::new(
        RecordingTransferManager::new(),
        RecordingConflictHandler::declining(),
        ScriptedDownloadEngine::completed_at(DESCRIPTOR_PATH),
    );
    assert!(harness.placeholder_listed());

    let controller = harness.run();

    assert_eq!(controller.outcome(), ChainOutcome::Promoted);
    assert!(controller.placeholder_removed());
    assert_eq!(harness.manager.request_count(), 1);
    let request = &harness.manager.requests()[0];
    assert_eq!(
        request.source,
        SwarmSource::descriptor_file(DESCRIPTOR_PATH)
    );
    assert!(!request.overwrite);
    assert!(!harness.placeholder_listed());
    assert!(harness.items.is_empty());

    let derived = controller.derived_engine().expect("derived engine carried out");
    let started = harness.manager.started();
    assert_eq!(started.len(), 1);
    assert_eq!(
        TransferIdentity::of(&derived),
        TransferIdentity::of(&started[0])
    );
}

#[test]
fn non_descriptor_completion_is_left_alone() {
    let harness = Harness::new(
        RecordingTransferManager::new(),
        RecordingConflictHandler::declining(),
        ScriptedDownloadEngine::completed_at(PLAIN_PATH),
    );

    let controller = harness.run();

    assert_eq!(controller.outcome(), ChainOutcome::NotDescriptor);
    assert!(!controller.placeholder_removed());
    assert!(controller.derived_engine().is_none());
    assert_eq!(harness.manager.request_count(), 0);
    assert!(harness.placeholder_listed());
    assert_eq!(harness.items.len(), 1);
}

#[test]
fn uppercase_suffix_is_not_a_descriptor() {
    let harness = Harness::new(
        RecordingTransferManager::new(),
        RecordingConflictHandler::declining(),
        ScriptedDownloadEngine::completed_at("/downloads/X.TORRENT"),
    );
    assert_eq!(harness.run().outcome(), ChainOutcome::NotDescriptor);
    assert_eq!(harness.manager.request_count(), 0);
}

#[test]
fn unfinished_download_is_ignored() {
    for status in [NativeDownloadStatus::Aborted, NativeDownloadStatus::Saving] {
        let harness = Harness::new(
            RecordingTransferManager::new(),
            RecordingConflictHandler::declining(),
            ScriptedDownloadEngine::new(status).with_save_file(DESCRIPTOR_PATH),
        );
        let controller = harness.run();
        assert_eq!(controller.outcome(), ChainOutcome::NotComplete);
        assert_eq!(harness.manager.request_count(), 0);
        assert_eq!(harness.engine.save_file_reads(), 0);
        assert!(harness.placeholder_listed());
    }
}

#[test]
fn meta_info_is_used_without_reading_save_file() {
    let harness = Harness::new(
        RecordingTransferManager::new(),
        RecordingConflictHandler::declining(),
        ScriptedDownloadEngine::completed_at(PLAIN_PATH).with_meta_info(sample_meta_info()),
    );

    let controller = harness.run();

    assert_eq!(controller.outcome(), ChainOutcome::Promoted);
    assert_eq!(harness.engine.save_file_reads(), 0);
    assert_eq!(
        harness.manager.requests()[0].source,
        SwarmSource::meta_info(sample_meta_info())
    );
    assert!(!harness.placeholder_listed());
}

#[test]
fn conflict_retry_with_overwrite_reissues_once() {
    let harness = Harness::new(
        RecordingTransferManager::new().conflict_once(ConflictCode::FileAlreadyExists),
        RecordingConflictHandler::overwriting(),
        ScriptedDownloadEngine::completed_at(DESCRIPTOR_PATH),
    );

    let controller = harness.run();

    assert_eq!(controller.outcome(), ChainOutcome::ConflictDelegated);
    let requests = harness.manager.requests();
    assert_eq!(requests.len(), 2);
    assert!(!requests[0].overwrite);
    assert!(requests[1].overwrite);
    assert_eq!(requests[0].source, requests[1].source);

    let calls = harness.handler.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].code, Some(ConflictCode::FileAlreadyExists));
    assert!(!calls[0].default_overwrite);
    assert_eq!(calls[0].retried, Some(true));

    assert!(controller.placeholder_removed());
    assert!(harness.items.is_empty());
    let started = harness.manager.started();
    assert_eq!(started.len(), 1);
    let derived = controller.derived_engine().expect("retry started a transfer");
    assert_eq!(
        TransferIdentity::of(&derived),
        TransferIdentity::of(&started[0])
    );
}

#[test]
fn retry_can_choose_a_new_destination() {
    let target = PathBuf::from("/downloads/renamed.iso");
    let harness = Harness::new(
        RecordingTransferManager::new().conflict_once(ConflictCode::FileAlreadyDownloading),
        RecordingConflictHandler::new(ConflictResponse::Retry {
            overwrite: false,
            save_path: Some(target.clone()),
        }),
        ScriptedDownloadEngine::completed_at(DESCRIPTOR_PATH),
    );

    harness.run();

    let requests = harness.manager.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].save_path, None);
    assert_eq!(requests[1].save_path, Some(target));
    assert!(!requests[1].overwrite);
}

#[test]
fn declined_conflict_still_retires_placeholder() {
    let harness = Harness::new(
        RecordingTransferManager::new().conflict_once(ConflictCode::FileAlreadySaved),
        RecordingConflictHandler::declining(),
        ScriptedDownloadEngine::completed_at(DESCRIPTOR_PATH),
    );

    let controller = harness.run();

    assert_eq!(controller.outcome(), ChainOutcome::ConflictDelegated);
    assert_eq!(harness.manager.request_count(), 1);
    assert_eq!(harness.handler.calls()[0].retried, None);
    assert!(controller.derived_engine().is_none());
    assert!(controller.placeholder_removed());
    assert!(!harness.placeholder_listed());
}

#[test]
fn failed_request_reports_and_retires_placeholder() {
    let harness = Harness::new(
        RecordingTransferManager::new().fail_once("tracker unreachable"),
        RecordingConflictHandler::declining(),
        ScriptedDownloadEngine::completed_at(DESCRIPTOR_PATH),
    );

    let controller = harness.run();

    assert_eq!(controller.outcome(), ChainOutcome::Failed);
    assert!(controller.derived_engine().is_none());
    assert!(harness.handler.calls().is_empty());
    assert_eq!(harness.handler.failures(), vec!["tracker unreachable".to_string()]);
    assert!(controller.placeholder_removed());
    assert!(harness.items.is_empty());
}

#[test]
fn deferred_retry_runs_later_on_another_thread() {
    let harness = Harness::new(
        RecordingTransferManager::new().conflict_once(ConflictCode::FileAlreadyExists),
        RecordingConflictHandler::new(ConflictResponse::Defer),
        ScriptedDownloadEngine::completed_at(DESCRIPTOR_PATH),
    );

    let controller = harness.run();
    assert_eq!(controller.outcome(), ChainOutcome::ConflictDelegated);
    assert!(controller.placeholder_removed());
    assert!(controller.derived_engine().is_none());

    let mut deferred = harness.handler.take_deferred();
    assert_eq!(deferred.len(), 1);
    let retry = deferred.remove(0);
    assert!(!retry.request().overwrite);

    let engine = thread::spawn(move || retry.retry_with_overwrite())
        .join()
        .expect("retry thread")
        .expect("retry accepted");
    assert_eq!(engine.state(), NativeDownloadStatus::Queued);
    let recorded = controller.derived_engine().expect("late retry recorded");
    assert_eq!(TransferIdentity::of(&recorded), TransferIdentity::of(&engine));

    let requests = harness.manager.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].overwrite);
    assert!(harness.items.is_empty());
}

#[test]
fn failed_retry_surfaces_the_error() {
    let harness = Harness::new(
        RecordingTransferManager::new()
            .conflict_once(ConflictCode::FileAlreadyExists)
            .conflict_once(ConflictCode::FileAlreadyExists),
        RecordingConflictHandler::new(ConflictResponse::Defer),
        ScriptedDownloadEngine::completed_at(DESCRIPTOR_PATH),
    );
    harness.run();

    let retry = harness.handler.take_deferred().remove(0);
    let Err(err) = retry.retry_with_overwrite() else {
        panic!("second conflict expected");
    };
    assert_eq!(err.conflict_code(), Some(ConflictCode::FileAlreadyExists));
    assert_eq!(harness.manager.request_count(), 2);
}

#[test]
fn placeholder_missing_from_list_is_tolerated() {
    let harness = Harness::new(
        RecordingTransferManager::new(),
        RecordingConflictHandler::declining(),
        ScriptedDownloadEngine::completed_at(DESCRIPTOR_PATH),
    );
    let stray: Arc<dyn DownloadEngine> = Arc::new(ScriptedDownloadEngine::completed_at(DESCRIPTOR_PATH));
    let deps = chaining_deps(&harness.manager, &harness.handler, &harness.items);

    let controller = TorrentChainController::new(&deps, &stray);

    assert_eq!(controller.outcome(), ChainOutcome::Promoted);
    assert!(!controller.placeholder_removed());
    assert_eq!(harness.items.len(), 1);
}
