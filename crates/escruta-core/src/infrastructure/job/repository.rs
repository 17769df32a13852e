//! Generation job repository

use chrono::Utc;
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::domain::{GenerationJob, JobStatus, JobType};
use crate::infrastructure::decode_enum;
use crate::storage::Database;
use crate::{Error, Result};

const JOB_COLUMNS: &str = "id, notebook_id, user_id, type, status, result, error_message, \
                           created_at, updated_at, completed_at";

/// Message given to a running generation job that is found on a new server
pub const INTERRUPTED_MESSAGE: &str = "Interrupted by server restart";

/// Generation job repository for database operations
pub struct JobRepository<'a> {
    db: &'a Database,
}

impl<'a> JobRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a job; a concurrent active job of the same type becomes a conflict
    pub async fn create(&self, job: &GenerationJob) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO generation_jobs (id, notebook_id, user_id, type, status, result,
                                         error_message, created_at, updated_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(job.id)
        .bind(job.notebook_id)
        .bind(job.user_id)
        .bind(job.job_type.as_str())
        .bind(job.status.as_str())
        .bind(&job.result)
        .bind(&job.error_message)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.completed_at)
        .execute(self.db.pool())
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let err = Error::from(e);
                if err.is_unique_violation() {
                    Err(Error::Conflict(
                        "A job of this type is already in progress".to_string(),
                    ))
                } else {
                    Err(err)
                }
            }
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<GenerationJob>> {
        let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM generation_jobs WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        row.map(|r| self.row_to_job(r)).transpose()
    }

    /// Get a job only if it belongs to the user and notebook
    pub async fn get_for_user(
        &self,
        id: Uuid,
        notebook_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<GenerationJob>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM generation_jobs \
             WHERE id = $1 AND notebook_id = $2 AND user_id = $3"
        ))
        .bind(id)
        .bind(notebook_id)
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|r| self.row_to_job(r)).transpose()
    }

    /// Jobs of a user in a notebook, newest first
    pub async fn list(&self, notebook_id: Uuid, user_id: Uuid) -> Result<Vec<GenerationJob>> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM generation_jobs \
             WHERE notebook_id = $1 AND user_id = $2 ORDER BY created_at DESC"
        ))
        .bind(notebook_id)
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(|r| self.row_to_job(r)).collect()
    }

    /// Newest job of the type in one of the given states
    pub async fn latest_with_status(
        &self,
        notebook_id: Uuid,
        user_id: Uuid,
        job_type: JobType,
        statuses: &[JobStatus],
    ) -> Result<Option<GenerationJob>> {
        let statuses: Vec<&str> = statuses.iter().map(JobStatus::as_str).collect();
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM generation_jobs \
             WHERE notebook_id = $1 AND user_id = $2 AND type = $3 AND status = ANY($4) \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(notebook_id)
        .bind(user_id)
        .bind(job_type.as_str())
        .bind(&statuses)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|r| self.row_to_job(r)).transpose()
    }

    /// Persist status, result and timestamps of a job
    pub async fn update(&self, job: &GenerationJob) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE generation_jobs
            SET status = $1, result = $2, error_message = $3, updated_at = $4, completed_at = $5
            WHERE id = $6
            "#,
        )
        .bind(job.status.as_str())
        .bind(&job.result)
        .bind(&job.error_message)
        .bind(job.updated_at)
        .bind(job.completed_at)
        .bind(job.id)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    /// Fail every job still marked active, returning how many were touched
    pub async fn fail_interrupted(&self) -> Result<u64> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE generation_jobs
            SET status = 'FAILED', error_message = $1, updated_at = $2, completed_at = $2
            WHERE status IN ('PENDING', 'PROCESSING')
            "#,
        )
        .bind(INTERRUPTED_MESSAGE)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected())
    }

    fn row_to_job(&self, row: PgRow) -> Result<GenerationJob> {
        Ok(GenerationJob {
            id: row.get("id"),
            notebook_id: row.get("notebook_id"),
            user_id: row.get("user_id"),
            job_type: decode_enum("type", row.get("type"), JobType::parse)?,
            status: decode_enum("status", row.get("status"), JobStatus::parse)?,
            result: row.get("result"),
            error_message: row.get("error_message"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            completed_at: row.get("completed_at"),
        })
    }
}
