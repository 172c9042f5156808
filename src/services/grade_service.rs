use sqlx::SqlitePool;

use crate::db::repository;
use crate::error::AppError;
use crate::grading::{self, CourseGrade, Transcript};

pub struct GradeService {
    db: SqlitePool,
}

impl GradeService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn course_grade(&self, course_id: &str) -> Result<CourseGrade, AppError> {
        let course = repository::find_course_by_id(&self.db, course_id)
            .await?
            .filter(|c| !c.deleted)
            .ok_or(AppError::NotFound)?;
        let groups = repository::fetch_groups_for_course(&self.db, course_id).await?;
        let tasks = repository::fetch_tasks_for_course(&self.db, course_id).await?;

        Ok(grading::course_grade(&course, &tasks, &groups))
    }

    pub async fn transcript(&self) -> Result<Transcript, AppError> {
        let semesters = repository::fetch_semesters(&self.db).await?;
        let courses = repository::fetch_courses(&self.db).await?;
        let groups = repository::fetch_active_groups(&self.db).await?;
        let tasks = repository::fetch_active_tasks(&self.db).await?;

        Ok(grading::build_transcript(&semesters, &courses, &tasks, &groups))
    }
}
