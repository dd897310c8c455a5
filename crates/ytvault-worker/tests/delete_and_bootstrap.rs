mod common;

use std::sync::Arc;
use tempfile::TempDir;

use common::{wait_until_idle, Harness, ScriptedEngine, StallingEngine};
use ytvault_models::{FileId, Job, JobId, JobPatch, JobStatus};
use ytvault_worker::{Bootstrapper, WorkerError};

fn failing_engine() -> Arc<ScriptedEngine> {
    Arc::new(ScriptedEngine {
        failure: Some("offline".to_string()),
        ..Default::default()
    })
}

#[tokio::test]
async fn test_delete_removes_files_from_disk_and_registry() {
    let dir = TempDir::new().unwrap();
    let h = Harness::new(failing_engine(), dir).await;
    let files = h.manager.files();

    let video = h.path("clip.mp4");
    let thumb = h.path("thumbnails/clip.webp");
    let vtt = h.path("vtt/clip_thumbs.vtt");
    for p in [&video, &thumb, &vtt] {
        std::fs::write(p, b"x").unwrap();
    }

    let mut job = Job::new("https://example.com/v").with_status(JobStatus::Completed);
    job.video_path_id = Some(files.get_or_create(&video).await.unwrap());
    job.thumbnail_path_id = Some(files.get_or_create(&thumb).await.unwrap());
    job.vtt_path_id = Some(files.get_or_create(&vtt).await.unwrap());
    // Registered id whose file was already removed by hand.
    job.vtt_sprite_path_id = Some(files.get_or_create(h.path("sprite/gone.jpg")).await.unwrap());
    h.manager.db().insert_job(&job).await.unwrap();

    h.manager.delete_job(&job.id).await.unwrap();

    for p in [&video, &thumb, &vtt] {
        assert!(!p.exists(), "{} should be deleted", p.display());
    }
    for id in job.file_ids() {
        assert!(files.get(id).await.unwrap().is_none());
    }
    assert!(matches!(
        h.manager.get_job(&job.id).await,
        Err(WorkerError::JobNotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_job_without_files_and_unknown_job() {
    let dir = TempDir::new().unwrap();
    let h = Harness::new(failing_engine(), dir).await;

    let job = Job::new("https://example.com/bare").with_status(JobStatus::Paused);
    h.manager.db().insert_job(&job).await.unwrap();
    h.manager.delete_job(&job.id).await.unwrap();
    assert!(h.manager.list_jobs().await.unwrap().is_empty());

    let err = h.manager.delete_job(&JobId::from("missing")).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_cancels_live_worker() {
    let dir = TempDir::new().unwrap();
    let engine = Arc::new(StallingEngine {
        filename: dir.path().join("live.mp4"),
    });
    let h = Harness::new(engine, dir).await;

    let job = Job::new("https://example.com/live");
    h.manager.db().insert_job(&job).await.unwrap();
    let handle = h.manager.spawn(job.clone()).unwrap();
    assert!(h.manager.registry().lookup(&job.id).is_some());

    h.manager.delete_job(&job.id).await.unwrap();
    handle.await.unwrap();
    assert!(h.manager.registry().is_empty());
    assert!(h.manager.db().get_job(&job.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_bootstrap_resumes_only_queued_and_downloading() {
    let dir = TempDir::new().unwrap();
    let engine = failing_engine();
    let h = Harness::new(engine.clone(), dir).await;

    for status in JobStatus::ALL {
        let job = Job::new(format!("https://example.com/{}", status))
            .with_id(JobId::from(status.as_str()))
            .with_status(status);
        h.manager.db().insert_job(&job).await.unwrap();
    }

    let resumed = Bootstrapper::new(h.manager.clone())
        .resume_interrupted_jobs()
        .await
        .unwrap();
    assert_eq!(resumed, 2);

    wait_until_idle(h.manager.registry()).await;
    assert_eq!(
        engine.urls(),
        vec![
            "https://example.com/downloading".to_string(),
            "https://example.com/queued".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_bootstrap_with_nothing_to_resume() {
    let dir = TempDir::new().unwrap();
    let engine = failing_engine();
    let h = Harness::new(engine.clone(), dir).await;

    let done = Job::new("https://example.com/done").with_status(JobStatus::Completed);
    h.manager.db().insert_job(&done).await.unwrap();

    let resumed = Bootstrapper::new(h.manager.clone())
        .resume_interrupted_jobs()
        .await
        .unwrap();
    assert_eq!(resumed, 0);
    assert!(engine.urls().is_empty());
}

#[tokio::test]
async fn test_update_and_serve_file() {
    let dir = TempDir::new().unwrap();
    let h = Harness::new(failing_engine(), dir).await;
    let (_sub, mut rx) = h.transport.subscribe();

    let video = h.path("served.mp4");
    std::fs::write(&video, b"video").unwrap();
    let mut job = Job::new("https://example.com/s").with_status(JobStatus::Completed);
    let video_id = h.manager.files().get_or_create(&video).await.unwrap();
    job.video_path_id = Some(video_id.clone());
    h.manager.db().insert_job(&job).await.unwrap();

    let patch = JobPatch {
        watched: Some(true),
        prev_watch_time: Some(42),
        ..Default::default()
    };
    let updated = h.manager.update_job(&job.id, patch).await.unwrap();
    assert!(updated.watched);
    assert_eq!(updated.prev_watch_time, 42);
    assert_eq!(rx.try_recv().unwrap().name(), "message");

    let served = h.manager.serve_file(&video_id).await.unwrap();
    assert_eq!(served, video);
    assert!(h.manager.get_job(&job.id).await.unwrap().downloaded);
    assert_eq!(rx.try_recv().unwrap().name(), "message");

    // Second delivery does not republish.
    h.manager.serve_file(&video_id).await.unwrap();
    assert!(rx.try_recv().is_err());

    let err = h.manager.serve_file(&FileId::from("nope")).await.unwrap_err();
    assert!(matches!(err, WorkerError::FileNotFound(_)));

    std::fs::remove_file(&video).unwrap();
    let err = h.manager.serve_file(&video_id).await.unwrap_err();
    assert!(matches!(err, WorkerError::FileNotFound(_)));
}
