//! Job CRUD queries.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use ytvault_models::{FileId, Job, JobId, JobStatus};

use crate::{Database, StoreError, StoreResult};

const JOB_COLUMNS: &str = "id, url, video_id, full_title, duration_string, resolution, size, \
     download_status, format, audio_only, kind, watched, downloaded, prev_watch_time, \
     video_path_id, thumbnail_path_id, vtt_path_id, vtt_sprite_path_id";

fn job_from_row(row: &SqliteRow) -> StoreResult<Job> {
    let file_ref = |col: &str| -> StoreResult<Option<FileId>> {
        let raw: Option<String> = row.try_get(col)?;
        Ok(raw.filter(|s| !s.is_empty()).map(FileId))
    };

    Ok(Job {
        id: JobId(row.try_get("id")?),
        url: row.try_get("url")?,
        video_id: row.try_get("video_id")?,
        full_title: row.try_get("full_title")?,
        duration_string: row.try_get("duration_string")?,
        resolution: row.try_get("resolution")?,
        size: row.try_get("size")?,
        download_status: row.try_get::<String, _>("download_status")?.parse()?,
        format: row.try_get::<String, _>("format")?.parse()?,
        audio_only: row.try_get("audio_only")?,
        kind: row.try_get::<String, _>("kind")?.parse()?,
        watched: row.try_get("watched")?,
        downloaded: row.try_get("downloaded")?,
        prev_watch_time: row.try_get("prev_watch_time")?,
        video_path_id: file_ref("video_path_id")?,
        thumbnail_path_id: file_ref("thumbnail_path_id")?,
        vtt_path_id: file_ref("vtt_path_id")?,
        vtt_sprite_path_id: file_ref("vtt_sprite_path_id")?,
    })
}

fn file_ref_str(id: &Option<FileId>) -> Option<&str> {
    id.as_ref().map(|f| f.as_str())
}

impl Database {
    /// Insert a new job. Fails with [`StoreError::DuplicateJob`] if the id is taken.
    pub async fn insert_job(&self, job: &Job) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO jobs ({JOB_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        let result = sqlx::query(&sql)
            .bind(job.id.as_str())
            .bind(&job.url)
            .bind(&job.video_id)
            .bind(&job.full_title)
            .bind(&job.duration_string)
            .bind(&job.resolution)
            .bind(&job.size)
            .bind(job.download_status.as_str())
            .bind(job.format.as_str())
            .bind(job.audio_only)
            .bind(job.kind.as_str())
            .bind(job.watched)
            .bind(job.downloaded)
            .bind(job.prev_watch_time)
            .bind(file_ref_str(&job.video_path_id))
            .bind(file_ref_str(&job.thumbnail_path_id))
            .bind(file_ref_str(&job.vtt_path_id))
            .bind(file_ref_str(&job.vtt_sprite_path_id))
            .execute(self.pool())
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::DuplicateJob(job.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_job(&self, id: &JobId) -> StoreResult<Option<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    pub async fn job_exists(&self, id: &JobId) -> StoreResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM jobs WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await?;
        Ok(row.is_some())
    }

    /// All jobs, oldest first.
    pub async fn list_jobs(&self) -> StoreResult<Vec<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs ORDER BY created_at, rowid");
        let rows = sqlx::query(&sql).fetch_all(self.pool()).await?;
        rows.iter().map(job_from_row).collect()
    }

    /// Jobs whose status is one of `statuses`, oldest first.
    pub async fn list_jobs_by_status(&self, statuses: &[JobStatus]) -> StoreResult<Vec<Job>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE download_status IN ({placeholders}) \
             ORDER BY created_at, rowid"
        );
        let mut query = sqlx::query(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }
        let rows = query.fetch_all(self.pool()).await?;
        rows.iter().map(job_from_row).collect()
    }

    /// Jobs interrupted by a shutdown: queued or mid-download.
    pub async fn list_resumable_jobs(&self) -> StoreResult<Vec<Job>> {
        let resumable: Vec<JobStatus> = JobStatus::ALL
            .into_iter()
            .filter(JobStatus::is_resumable)
            .collect();
        self.list_jobs_by_status(&resumable).await
    }

    /// The job whose video file is `file_id`, if any.
    pub async fn find_job_by_video_file(&self, file_id: &FileId) -> StoreResult<Option<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE video_path_id = ? LIMIT 1");
        let row = sqlx::query(&sql)
            .bind(file_id.as_str())
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    /// Overwrite every mutable column of an existing job.
    ///
    /// Returns `false` if no row has this id.
    pub async fn update_job(&self, job: &Job) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"UPDATE jobs SET
                url = ?, video_id = ?, full_title = ?, duration_string = ?,
                resolution = ?, size = ?, download_status = ?, format = ?,
                audio_only = ?, kind = ?, watched = ?, downloaded = ?,
                prev_watch_time = ?, video_path_id = ?, thumbnail_path_id = ?,
                vtt_path_id = ?, vtt_sprite_path_id = ?
            WHERE id = ?"#,
        )
        .bind(&job.url)
        .bind(&job.video_id)
        .bind(&job.full_title)
        .bind(&job.duration_string)
        .bind(&job.resolution)
        .bind(&job.size)
        .bind(job.download_status.as_str())
        .bind(job.format.as_str())
        .bind(job.audio_only)
        .bind(job.kind.as_str())
        .bind(job.watched)
        .bind(job.downloaded)
        .bind(job.prev_watch_time)
        .bind(file_ref_str(&job.video_path_id))
        .bind(file_ref_str(&job.thumbnail_path_id))
        .bind(file_ref_str(&job.vtt_path_id))
        .bind(file_ref_str(&job.vtt_sprite_path_id))
        .bind(job.id.as_str())
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Write the columns a download produces: status, resolved metadata and
    /// file references. User-owned fields (`watched`, `downloaded`,
    /// `prev_watch_time` and the request options) are left as stored.
    ///
    /// Returns `false` if no row has this id.
    pub async fn update_job_download(&self, job: &Job) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"UPDATE jobs SET
                download_status = ?, video_id = ?, full_title = ?,
                duration_string = ?, resolution = ?, size = ?,
                video_path_id = ?, thumbnail_path_id = ?,
                vtt_path_id = ?, vtt_sprite_path_id = ?
            WHERE id = ?"#,
        )
        .bind(job.download_status.as_str())
        .bind(&job.video_id)
        .bind(&job.full_title)
        .bind(&job.duration_string)
        .bind(&job.resolution)
        .bind(&job.size)
        .bind(file_ref_str(&job.video_path_id))
        .bind(file_ref_str(&job.thumbnail_path_id))
        .bind(file_ref_str(&job.vtt_path_id))
        .bind(file_ref_str(&job.vtt_sprite_path_id))
        .bind(job.id.as_str())
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns `false` if no row had this id.
    pub async fn delete_job(&self, id: &JobId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(id.as_str())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
