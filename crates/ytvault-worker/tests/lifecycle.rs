mod common;

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use common::{drain_names, finished, progress, Harness, ScriptedEngine, StallingEngine};
use ytvault_models::{Job, JobId, JobPatch, JobStatus, ServerEvent, Severity};
use ytvault_worker::{WorkerError, WorkerState};

#[tokio::test]
async fn test_download_runs_to_completion_and_registers_artifacts() {
    let dir = TempDir::new().unwrap();
    let video = dir.path().join("720p_Youtube___Test_Clip___abc123.mp4");
    let thumb = dir.path().join("720p_Youtube___Test_Clip___abc123.webp");
    std::fs::write(&video, b"video").unwrap();
    std::fs::write(&thumb, b"thumb").unwrap();

    let engine = Arc::new(ScriptedEngine {
        script: vec![
            progress("10.0%", &video),
            progress("60.0%", &video),
            finished(&video, Some(&thumb)),
        ],
        ..Default::default()
    });
    let h = Harness::new(engine, dir).await;
    let (_sub, mut rx) = h.transport.subscribe();

    let job = Job::new("https://example.com/watch?v=abc123");
    h.manager.db().insert_job(&job).await.unwrap();
    let state = h.manager.spawn(job.clone()).unwrap().await.unwrap();
    assert_eq!(state, WorkerState::Completed);
    assert!(h.manager.registry().is_empty());

    let stored = h.manager.get_job(&job.id).await.unwrap();
    assert_eq!(stored.download_status, JobStatus::Completed);
    assert_eq!(stored.video_id, "abc123");
    assert_eq!(stored.full_title, "Test Clip");
    assert_eq!(stored.size, "2.00MiB");

    let files = h.manager.files();
    let video_path = files.resolve(stored.video_path_id.as_ref().unwrap()).await.unwrap();
    assert_eq!(video_path.as_deref(), Some(video.as_path()));

    let thumb_path = files
        .resolve(stored.thumbnail_path_id.as_ref().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(thumb_path, h.path("thumbnails/720p_Youtube___Test_Clip___abc123.webp"));
    assert!(thumb_path.exists());
    assert!(!thumb.exists(), "thumbnail was moved, not copied");

    let sprite = files
        .resolve(stored.vtt_sprite_path_id.as_ref().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(sprite.ends_with("sprite/720p_Youtube___Test_Clip___abc123_sprite.jpg"));
    let vtt = files
        .resolve(stored.vtt_path_id.as_ref().unwrap())
        .await
        .unwrap()
        .unwrap();
    let cues = std::fs::read_to_string(vtt).unwrap();
    assert_eq!(cues.matches(" --> ").count(), 3);
    assert!(cues.contains(stored.vtt_sprite_path_id.as_ref().unwrap().as_str()));

    assert_eq!(
        drain_names(&mut rx),
        vec!["message", "status_update", "status_update", "status_update", "message"]
    );
}

#[tokio::test]
async fn test_progress_snapshots_are_sanitized() {
    let dir = TempDir::new().unwrap();
    let video = dir.path().join("clip.mp4");
    std::fs::write(&video, b"video").unwrap();
    let engine = Arc::new(ScriptedEngine {
        script: vec![progress("42.0%", &video), finished(&video, None)],
        ..Default::default()
    });
    let h = Harness::new(engine, dir).await;
    let (_sub, mut rx) = h.transport.subscribe();

    let job = Job::new("https://example.com/v");
    h.manager.db().insert_job(&job).await.unwrap();
    h.manager.spawn(job.clone()).unwrap().await.unwrap();

    let snapshots: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|event| match event {
            ServerEvent::StatusUpdate(snapshot) => Some(snapshot),
            _ => None,
        })
        .collect();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0].percent, "42.0%");
    assert_eq!(snapshots[0].video_id, "abc123");
    assert_eq!(snapshots[0].id, job.id);
    assert_eq!(snapshots[1].percent, "100%");
    assert_eq!(snapshots[1].eta, "0");
}

#[tokio::test]
async fn test_engine_failure_keeps_persisted_status_and_notifies() {
    let dir = TempDir::new().unwrap();
    let engine = Arc::new(ScriptedEngine {
        failure: Some("HTTP Error 403: Forbidden".to_string()),
        ..Default::default()
    });
    let h = Harness::new(engine, dir).await;
    let (_sub, mut rx) = h.transport.subscribe();

    let job = Job::new("https://example.com/private");
    h.manager.db().insert_job(&job).await.unwrap();
    let state = h.manager.spawn(job.clone()).unwrap().await.unwrap();

    assert_eq!(state, WorkerState::Failed);
    let stored = h.manager.get_job(&job.id).await.unwrap();
    assert_eq!(stored.download_status, JobStatus::Queued);

    match rx.try_recv().unwrap() {
        ServerEvent::Notify(note) => {
            assert_eq!(note.severity, Severity::Error);
            assert!(note.detail.contains("403"));
            assert_eq!(note.extra_data["jobId"], job.id.as_str());
        }
        other => panic!("expected notify, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancel_aborts_and_removes_partial_file() {
    let dir = TempDir::new().unwrap();
    let video = dir.path().join("stall.mp4");
    let part = dir.path().join("stall.mp4.part");
    std::fs::write(&part, b"partial").unwrap();

    let engine = Arc::new(StallingEngine {
        filename: video.clone(),
    });
    let h = Harness::new(engine, dir).await;
    let (_sub, mut rx) = h.transport.subscribe();

    let job = Job::new("https://example.com/long");
    h.manager.db().insert_job(&job).await.unwrap();
    let handle = h.manager.spawn(job.clone()).unwrap();

    // First event latches Downloading and publishes the record.
    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.name(), "message");
    assert!(h.manager.cancel(&job.id));

    let state = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state, WorkerState::Canceled);
    assert!(!part.exists());
    assert!(h.manager.registry().lookup(&job.id).is_none());

    let stored = h.manager.get_job(&job.id).await.unwrap();
    assert_eq!(stored.download_status, JobStatus::Downloading);
}

#[tokio::test]
async fn test_create_job_rejects_duplicates_and_second_worker() {
    let dir = TempDir::new().unwrap();
    let engine = Arc::new(StallingEngine {
        filename: dir.path().join("x.mp4"),
    });
    let h = Harness::new(engine, dir).await;

    let job = Job::new("https://example.com/v").with_id(JobId::from("abc"));
    h.manager.create_job(job.clone()).await.unwrap();

    let err = h.manager.create_job(job.clone()).await.unwrap_err();
    assert!(matches!(err, WorkerError::JobExists(_)));

    let err = h.manager.spawn(job.clone()).unwrap_err();
    assert!(matches!(err, WorkerError::AlreadyRunning(_)));

    let err = h.manager.create_job(Job::new("  ")).await.unwrap_err();
    assert!(matches!(err, WorkerError::Validation(_)));

    h.manager.cancel(&job.id);
    common::wait_until_idle(h.manager.registry()).await;
}

#[tokio::test]
async fn test_recreate_while_old_worker_winds_down_leaves_no_record() {
    let dir = TempDir::new().unwrap();
    let video = dir.path().join("slow.mp4");
    let engine = Arc::new(ScriptedEngine {
        script: vec![progress("5.0%", &video)],
        pause: Duration::from_millis(400),
        ..Default::default()
    });
    let h = Harness::new(engine, dir).await;

    let job = Job::new("https://example.com/v").with_id(JobId::from("abc"));
    h.manager.create_job(job.clone()).await.unwrap();
    h.manager.delete_job(&job.id).await.unwrap();

    // The deleted job's worker only notices the cancel on its first callback.
    let err = h.manager.create_job(job.clone()).await.unwrap_err();
    assert!(matches!(err, WorkerError::AlreadyRunning(_)));
    assert!(matches!(
        h.manager.get_job(&job.id).await.unwrap_err(),
        WorkerError::JobNotFound(_)
    ));

    common::wait_until_idle(h.manager.registry()).await;
    let recreated = h.manager.create_job(job.clone()).await.unwrap();
    assert_eq!(recreated.download_status, JobStatus::Queued);
    assert!(h.manager.registry().lookup(&job.id).is_some());

    common::wait_until_idle(h.manager.registry()).await;
    assert!(h.manager.get_job(&job.id).await.is_ok());
}

#[tokio::test]
async fn test_user_changes_during_download_survive_completion() {
    let dir = TempDir::new().unwrap();
    let video = dir.path().join("clip.mp4");
    std::fs::write(&video, b"video").unwrap();
    let engine = Arc::new(ScriptedEngine {
        script: vec![progress("10.0%", &video), finished(&video, None)],
        pause: Duration::from_millis(300),
        ..Default::default()
    });
    let h = Harness::new(engine, dir).await;
    let (_sub, mut rx) = h.transport.subscribe();

    let job = Job::new("https://example.com/v");
    h.manager.db().insert_job(&job).await.unwrap();
    let handle = h.manager.spawn(job.clone()).unwrap();

    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.name(), "message");

    let patch = JobPatch {
        watched: Some(true),
        prev_watch_time: Some(99),
        ..Default::default()
    };
    h.manager.update_job(&job.id, patch).await.unwrap();

    assert_eq!(handle.await.unwrap(), WorkerState::Completed);
    let stored = h.manager.get_job(&job.id).await.unwrap();
    assert_eq!(stored.download_status, JobStatus::Completed);
    assert!(stored.video_path_id.is_some());
    assert!(stored.watched);
    assert_eq!(stored.prev_watch_time, 99);

    let last = std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|event| match event {
            ServerEvent::Message(job) => Some(job),
            _ => None,
        })
        .last()
        .unwrap();
    assert!(last.watched);
    assert_eq!(last.download_status, JobStatus::Completed);
}
