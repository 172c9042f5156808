use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::GradeScale;

pub const DEFAULT_CREDITS: f64 = 4.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub color: String,
    pub professor_name: Option<String>,
    pub professor_email: Option<String>,
    pub ta_name: Option<String>,
    pub ta_email: Option<String>,
    pub grade_scale: Option<GradeScale>,
    pub credits: Option<f64>,
    pub semester_id: Option<String>,
    pub deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Course {
    pub fn effective_credits(&self) -> f64 {
        self.credits.unwrap_or(DEFAULT_CREDITS)
    }
}

/// Row shape of `courses`; the grade scale is stored as JSON text.
#[derive(Debug, FromRow)]
pub(crate) struct CourseRow {
    pub id: String,
    pub name: String,
    pub color: String,
    pub professor_name: Option<String>,
    pub professor_email: Option<String>,
    pub ta_name: Option<String>,
    pub ta_email: Option<String>,
    pub grade_scale: Option<String>,
    pub credits: Option<f64>,
    pub semester_id: Option<String>,
    pub deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<CourseRow> for Course {
    type Error = sqlx::Error;

    fn try_from(row: CourseRow) -> Result<Self, Self::Error> {
        let grade_scale = row
            .grade_scale
            .as_deref()
            .map(serde_json::from_str::<GradeScale>)
            .transpose()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Course {
            id: row.id,
            name: row.name,
            color: row.color,
            professor_name: row.professor_name,
            professor_email: row.professor_email,
            ta_name: row.ta_name,
            ta_email: row.ta_email,
            grade_scale,
            credits: row.credits,
            semester_id: row.semester_id,
            deleted: row.deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourseRequest {
    pub name: String,
    pub color: String,
    pub semester_id: Option<String>,
    pub credits: Option<f64>,
    pub grade_scale: Option<GradeScale>,
}

/// Partial update. Empty strings clear the optional text fields and an empty
/// `semester_id` unassigns the course; an empty grade scale removes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCourseRequest {
    pub name: Option<String>,
    pub color: Option<String>,
    pub professor_name: Option<String>,
    pub professor_email: Option<String>,
    pub ta_name: Option<String>,
    pub ta_email: Option<String>,
    pub grade_scale: Option<GradeScale>,
    pub credits: Option<f64>,
    pub semester_id: Option<String>,
}
