//! Asynchronous generation jobs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Kind of study material a job produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    MindMap,
    StudyGuide,
    Flashcards,
    Questionnaire,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::MindMap => "MIND_MAP",
            JobType::StudyGuide => "STUDY_GUIDE",
            JobType::Flashcards => "FLASHCARDS",
            JobType::Questionnaire => "QUESTIONNAIRE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MIND_MAP" => Some(JobType::MindMap),
            "STUDY_GUIDE" => Some(JobType::StudyGuide),
            "FLASHCARDS" => Some(JobType::Flashcards),
            "QUESTIONNAIRE" => Some(JobType::Questionnaire),
            _ => None,
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(JobStatus::Pending),
            "PROCESSING" => Some(JobStatus::Processing),
            "COMPLETED" => Some(JobStatus::Completed),
            "FAILED" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Statuses that block a new job of the same type
    pub const ACTIVE: [JobStatus; 2] = [JobStatus::Pending, JobStatus::Processing];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub id: Uuid,
    pub notebook_id: Uuid,
    pub user_id: Uuid,
    pub job_type: JobType,
    pub status: JobStatus,
    /// Serialized JSON payload once completed
    pub result: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    pub fn new(notebook_id: Uuid, user_id: Uuid, job_type: JobType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            notebook_id,
            user_id,
            job_type,
            status: JobStatus::Pending,
            result: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn mark_processing(&mut self) {
        self.status = JobStatus::Processing;
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(&mut self, result: String) {
        let now = Utc::now();
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.updated_at = now;
        self.completed_at = Some(now);
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        let now = Utc::now();
        self.status = JobStatus::Failed;
        self.error_message = Some(message.into());
        self.updated_at = now;
        self.completed_at = Some(now);
    }
}

/// Body of `POST /notebooks/{id}/tools/generate`
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationRequest {
    #[serde(rename = "type")]
    pub job_type: Option<JobType>,
}

impl GenerationRequest {
    pub fn validate(&self) -> Result<JobType> {
        self.job_type
            .ok_or_else(|| Error::invalid_field("type", "must not be null"))
    }
}

/// Reply to a generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationAccepted {
    pub job_id: Uuid,
    pub message: String,
}

impl GenerationAccepted {
    pub fn new(job_id: Uuid) -> Self {
        Self {
            job_id,
            message: format!("Generation started. Poll /jobs/{} for status.", job_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationJobResponse {
    pub id: Uuid,
    pub notebook_id: Uuid,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub status: JobStatus,
    pub result: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&GenerationJob> for GenerationJobResponse {
    fn from(job: &GenerationJob) -> Self {
        Self {
            id: job.id,
            notebook_id: job.notebook_id,
            job_type: job.job_type,
            status: job.status,
            result: job.result.clone(),
            error_message: job.error_message.clone(),
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_sets_completed_at_on_terminal_states() {
        let mut job = GenerationJob::new(Uuid::new_v4(), Uuid::new_v4(), JobType::Flashcards);
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.status.is_active());

        job.mark_processing();
        assert!(job.status.is_active());
        assert!(job.completed_at.is_none());

        job.mark_completed("{}".into());
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.completed_at.is_some());
        assert!(!job.status.is_active());

        let mut failed = GenerationJob::new(Uuid::new_v4(), Uuid::new_v4(), JobType::MindMap);
        failed.mark_failed("Content not yet indexed");
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("Content not yet indexed"));
        assert!(failed.completed_at.is_some());
    }

    #[test]
    fn test_type_round_trips_through_db_strings() {
        for job_type in [
            JobType::MindMap,
            JobType::StudyGuide,
            JobType::Flashcards,
            JobType::Questionnaire,
        ] {
            assert_eq!(JobType::parse(job_type.as_str()), Some(job_type));
        }
        assert_eq!(JobType::parse("study_guide"), Some(JobType::StudyGuide));
        assert_eq!(JobType::parse("AUDIO_SUMMARY"), None);
        assert_eq!(JobStatus::parse("RUNNING"), None);
    }

    #[test]
    fn test_generation_request_wire_format() {
        let request: GenerationRequest = serde_json::from_str(r#"{"type":"STUDY_GUIDE"}"#).unwrap();
        assert_eq!(request.validate().unwrap(), JobType::StudyGuide);

        let missing: GenerationRequest = serde_json::from_str("{}").unwrap();
        assert!(missing.validate().is_err());

        assert!(serde_json::from_str::<GenerationRequest>(r#"{"type":"PODCAST"}"#).is_err());
    }

    #[test]
    fn test_accepted_message() {
        let id = Uuid::new_v4();
        let accepted = GenerationAccepted::new(id);
        assert_eq!(
            accepted.message,
            format!("Generation started. Poll /jobs/{} for status.", id)
        );
    }
}
