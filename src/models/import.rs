use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_ACCEPTED: &str = "accepted";
pub const STATUS_DISMISSED: &str = "dismissed";

/// An assignment suggested by the mail import pipeline, waiting for review.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ImportCandidate {
    pub id: String,
    pub source_message_id: String,
    pub source_subject: String,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub course_name: Option<String>,
    pub matched_course_id: Option<String>,
    pub assignment_type: Option<String>,
    pub points: Option<f64>,
    pub confidence: f64,
    pub suggested: bool,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcceptImportRequest {
    pub course_id: Option<String>,
    pub group_id: Option<String>,
}
