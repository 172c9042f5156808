use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssignmentGroup {
    pub id: String,
    pub course_id: String,
    pub name: String,
    pub weight: f64,
    pub is_extra_credit: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGroupRequest {
    pub name: String,
    pub weight: f64,
    #[serde(default)]
    pub is_extra_credit: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub weight: Option<f64>,
    pub is_extra_credit: Option<bool>,
}
