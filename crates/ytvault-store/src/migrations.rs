/// Inline SQL migrations, applied in order and tracked in `_migrations`.
pub const MIGRATIONS: &[&str] = &[
    // Migration 1: file registry
    r#"
CREATE TABLE IF NOT EXISTS files (
    id TEXT PRIMARY KEY,
    file_path TEXT NOT NULL UNIQUE
)
"#,
    // Migration 2: jobs
    r#"
CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    url TEXT NOT NULL DEFAULT '',
    video_id TEXT NOT NULL DEFAULT '',
    full_title TEXT NOT NULL DEFAULT '',
    duration_string TEXT NOT NULL DEFAULT '',
    resolution TEXT NOT NULL DEFAULT '',
    size TEXT NOT NULL DEFAULT '',
    download_status TEXT NOT NULL DEFAULT 'queued'
        CHECK (download_status IN ('queued', 'downloading', 'paused', 'completed', 'failed')),
    format TEXT NOT NULL DEFAULT 'best',
    audio_only INTEGER NOT NULL DEFAULT 0,
    kind TEXT NOT NULL DEFAULT 'download',
    watched INTEGER NOT NULL DEFAULT 0,
    downloaded INTEGER NOT NULL DEFAULT 0,
    prev_watch_time INTEGER NOT NULL DEFAULT 0,
    video_path_id TEXT,
    thumbnail_path_id TEXT,
    vtt_path_id TEXT,
    vtt_sprite_path_id TEXT,
    created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
)
"#,
    // Migration 3: resume scan
    r#"CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(download_status)"#,
    // Migration 4: served-file lookup
    r#"CREATE INDEX IF NOT EXISTS idx_jobs_video_path_id ON jobs(video_path_id)"#,
];
