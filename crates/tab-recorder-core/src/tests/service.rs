use crate::{
    CaptureToken, CaptureWorkerController, Command, CoordinatorHandle, CoordinatorService,
    DiscardFallback, ManualClock, MemoryStore, SessionSettings, SessionState, WorkerId,
    WorkerSettings,
    tests::support::{FakePipeline, RecordingDownloader, START_MS, timeline, wait_until},
};

use std::{sync::Arc, time::Duration};

use tokio::sync::watch;

struct Running {
    handle: CoordinatorHandle,
    clock: ManualClock,
    store: MemoryStore,
    // Dropping the sender would stop the service.
    shutdown_tx: watch::Sender<bool>,
}

fn spawn_service(store: MemoryStore) -> Running {
    let clock = ManualClock::new(START_MS);
    let (service, handle) = CoordinatorService::new(
        Arc::new(store.clone()),
        Arc::new(clock.clone()),
        Arc::new(DiscardFallback),
        SessionSettings::default(),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(service.run(shutdown_rx));
    Running {
        handle,
        clock,
        store,
        shutdown_tx,
    }
}

/// WHAT: A full session runs from token handoff to Stopped through the service
/// WHY: Coordinator and worker must agree on the whole protocol
#[tokio::test]
async fn given_running_service_when_worker_records_then_session_completes() {
    // Given: A running coordinator and a worker that connects after the token
    let running = spawn_service(MemoryStore::new());
    let handle = running.handle.clone();
    let timeline = timeline();
    let downloader = Arc::new(RecordingDownloader::new(timeline.clone()));

    handle
        .execute(Command::StartWithToken {
            token: CaptureToken::from("tab-5"),
            worker_id: WorkerId(5),
        })
        .await
        .unwrap();
    handle
        .execute(Command::Start {
            worker_id: WorkerId(5),
            folder: Some("Clips".to_string()),
            filename: Some("demo".to_string()),
        })
        .await
        .unwrap();

    let pipeline = FakePipeline::new(b"media");
    let log = pipeline.log.clone();
    let worker = CaptureWorkerController::new(
        WorkerId(5),
        Box::new(pipeline),
        downloader.clone(),
        Arc::new(handle.clone()),
        WorkerSettings::default(),
    );
    let worker_task = tokio::spawn(worker.run());

    // When: The pending token reaches the worker and time passes
    assert!(wait_until(|| !log.lock().unwrap().tokens.is_empty()).await);
    running.clock.advance(Duration::from_secs(75));
    assert_eq!(handle.status().await.unwrap().timer, "01:15");

    handle
        .execute(Command::Stop {
            folder: None,
            filename: None,
        })
        .await
        .unwrap();

    // Then: The worker saves, reports Stopped, and exits
    worker_task.await.unwrap().unwrap();
    assert_eq!(downloader.paths(), vec!["Clips/demo.webm"]);
    assert_eq!(log.lock().unwrap().tokens, vec!["tab-5"]);

    let status = handle.status().await.unwrap();
    assert_eq!(status.state, SessionState::Idle);
    assert_eq!(status.elapsed_seconds, 0);
    assert!(running.store.snapshot().await.is_empty());
}

/// WHAT: A refused capture surfaces as lastError through the service
/// WHY: The control surface only learns of it by polling
#[tokio::test]
async fn given_refusing_pipeline_when_token_delivered_then_status_reports_error() {
    let running = spawn_service(MemoryStore::new());
    let handle = running.handle.clone();

    let worker = CaptureWorkerController::new(
        WorkerId(8),
        Box::new(FakePipeline::refusing()),
        Arc::new(RecordingDownloader::new(timeline())),
        Arc::new(handle.clone()),
        WorkerSettings::default(),
    );
    tokio::spawn(worker.run());

    handle
        .execute(Command::Start {
            worker_id: WorkerId(8),
            folder: None,
            filename: None,
        })
        .await
        .unwrap();
    handle
        .execute(Command::StartWithToken {
            token: CaptureToken::from("tab-8"),
            worker_id: WorkerId(8),
        })
        .await
        .unwrap();

    let mut last_error = None;
    for _ in 0..400 {
        let status = handle.status().await.unwrap();
        if status.last_error.is_some() {
            assert_eq!(status.state, SessionState::Idle);
            last_error = status.last_error;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(last_error.as_deref(), Some("capture not authorized"));
}

/// WHAT: The service restores a session left in the store
/// WHY: Restart recovery runs before the first command
#[tokio::test]
async fn given_persisted_session_when_service_starts_then_status_is_recording() {
    // Given: A store written by a previous service
    let store = MemoryStore::new();
    {
        let first = spawn_service(store.clone());
        first
            .handle
            .execute(Command::Start {
                worker_id: WorkerId(3),
                folder: None,
                filename: None,
            })
            .await
            .unwrap();
    }

    // When
    let second = spawn_service(store);

    // Then
    let status = second.handle.status().await.unwrap();
    assert_eq!(status.state, SessionState::Recording);
    assert_eq!(status.elapsed_seconds, 0);
}

/// WHAT: Handles fail cleanly once the service stops
/// WHY: Callers get an error rather than hanging
#[tokio::test]
async fn given_shutdown_when_executing_then_service_unavailable() {
    let running = spawn_service(MemoryStore::new());
    let handle = running.handle.clone();
    running.shutdown_tx.send(true).unwrap();

    assert!(handle.execute(Command::GetStatus).await.is_err());
    assert!(handle.connect_worker(WorkerId(1)).await.is_err());
}
