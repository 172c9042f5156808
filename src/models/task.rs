use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: String,
    pub course_id: String,
    pub group_id: Option<String>,
    pub text: String,
    pub description: Option<String>,
    pub due_date: String,
    pub completed: bool,
    pub total_score: Option<f64>,
    pub earned_score: Option<f64>,
    pub opt_out: bool,
    pub deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTaskRequest {
    pub text: String,
    pub due_date: String,
    pub group_id: Option<String>,
    pub description: Option<String>,
    pub total_score: Option<f64>,
    pub earned_score: Option<f64>,
}

/// Partial update. An empty `group_id` moves the task out of its group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    pub text: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub group_id: Option<String>,
    pub completed: Option<bool>,
    pub total_score: Option<f64>,
    pub earned_score: Option<f64>,
    pub opt_out: Option<bool>,
    #[serde(default)]
    pub clear_scores: bool,
}
