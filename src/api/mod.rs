use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::{delete, patch, post};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::repository;
use crate::error::AppError;
use crate::grading::{CourseGrade, Transcript};
use crate::models::*;
use crate::services::{GradeService, ImportService, ImportStats};
use crate::state::AppState;
use crate::validate;

#[derive(Deserialize)]
struct ListQueryParams {
    #[serde(default)]
    include_deleted: bool,
}

#[derive(Deserialize)]
struct ScanQueryParams {
    after: Option<String>,
    q: Option<String>,
}

#[derive(Serialize)]
pub struct TrashResponse {
    pub courses: Vec<Course>,
    pub tasks: Vec<Task>,
    pub notes: Vec<Note>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/semesters", get(list_semesters).post(create_semester))
        .route("/semesters/{id}", patch(rename_semester).delete(delete_semester))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/{id}", get(get_course).patch(update_course).delete(delete_course))
        .route("/courses/{id}/restore", post(restore_course))
        .route("/courses/{id}/purge", delete(purge_course))
        .route("/courses/{id}/grade", get(course_grade))
        .route("/courses/{id}/groups", get(list_groups).post(create_group))
        .route("/courses/{id}/tasks", get(list_course_tasks).post(create_task))
        .route("/courses/{id}/notes", get(list_notes).post(create_note))
        .route("/transcript", get(transcript))
        .route("/grade-scales/standard", get(standard_grade_scale))
        .route("/groups/{id}", patch(update_group).delete(delete_group))
        .route("/tasks", get(list_tasks))
        .route("/tasks/{id}", patch(update_task).delete(delete_task))
        .route("/tasks/{id}/toggle", post(toggle_task))
        .route("/tasks/{id}/restore", post(restore_task))
        .route("/tasks/{id}/purge", delete(purge_task))
        .route("/notes/{id}", patch(update_note).delete(delete_note))
        .route("/notes/{id}/restore", post(restore_note))
        .route("/notes/{id}/purge", delete(purge_note))
        .route("/trash", get(trash))
        .route("/imports", get(list_imports))
        .route("/imports/scan", post(scan_imports))
        .route("/imports/{id}/accept", post(accept_import))
        .route("/imports/{id}/dismiss", post(dismiss_import))
        .with_state(state)
}

fn deleted_or_not_found(found: bool) -> Result<StatusCode, AppError> {
    if found { Ok(StatusCode::NO_CONTENT) } else { Err(AppError::NotFound) }
}

async fn active_course(state: &AppState, id: &str) -> Result<Course, AppError> {
    repository::find_course_by_id(&state.db, id)
        .await?
        .filter(|c| !c.deleted)
        .ok_or(AppError::NotFound)
}

async fn ensure_semester(state: &AppState, semester_id: Option<&str>) -> Result<(), AppError> {
    match semester_id.filter(|id| !id.trim().is_empty()) {
        Some(id) => {
            repository::find_semester_by_id(&state.db, id)
                .await?
                .ok_or_else(|| AppError::BadRequest(format!("Unknown semester: {}", id)))?;
            Ok(())
        }
        None => Ok(()),
    }
}

async fn ensure_group_in_course(state: &AppState, group_id: Option<&str>, course_id: &str) -> Result<(), AppError> {
    match group_id.filter(|id| !id.trim().is_empty()) {
        Some(id) => {
            let group = repository::find_group_by_id(&state.db, id)
                .await?
                .ok_or_else(|| AppError::BadRequest(format!("Unknown group: {}", id)))?;
            if group.course_id != course_id {
                return Err(AppError::BadRequest("Group belongs to another course".to_string()));
            }
            Ok(())
        }
        None => Ok(()),
    }
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

// semesters

async fn list_semesters(State(state): State<AppState>) -> Result<Json<Vec<Semester>>, AppError> {
    let semesters = repository::fetch_semesters(&state.db).await?;
    Ok(Json(semesters))
}

async fn create_semester(
    State(state): State<AppState>,
    Json(req): Json<NewSemesterRequest>
) -> Result<Json<Semester>, AppError> {
    validate::require_text("name", &req.name)?;
    let semester = repository::insert_semester(&state.db, req).await?;
    Ok(Json(semester))
}

async fn rename_semester(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateSemesterRequest>
) -> Result<Json<Semester>, AppError> {
    validate::require_text("name", &req.name)?;
    let semester = repository::rename_semester(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(semester))
}

async fn delete_semester(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<StatusCode, AppError> {
    deleted_or_not_found(repository::delete_semester(&state.db, &id).await?)
}

// courses

async fn list_courses(
    State(state): State<AppState>,
    Query(params): Query<ListQueryParams>
) -> Result<Json<Vec<Course>>, AppError> {
    let courses = if params.include_deleted {
        repository::fetch_all_courses(&state.db).await?
    } else {
        repository::fetch_courses(&state.db).await?
    };
    Ok(Json(courses))
}

async fn create_course(
    State(state): State<AppState>,
    Json(req): Json<NewCourseRequest>
) -> Result<Json<Course>, AppError> {
    validate::new_course(&req)?;
    ensure_semester(&state, req.semester_id.as_deref()).await?;
    let course = repository::insert_course(&state.db, req).await?;
    Ok(Json(course))
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<Json<Course>, AppError> {
    let course = repository::find_course_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(course))
}

async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCourseRequest>
) -> Result<Json<Course>, AppError> {
    validate::update_course(&req)?;
    ensure_semester(&state, req.semester_id.as_deref()).await?;
    let course = repository::update_course(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(course))
}

async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<StatusCode, AppError> {
    deleted_or_not_found(repository::soft_delete_course(&state.db, &id).await?)
}

async fn restore_course(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<Json<Course>, AppError> {
    if !repository::restore_course(&state.db, &id).await? {
        return Err(AppError::NotFound);
    }
    get_course(State(state), Path(id)).await
}

async fn purge_course(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<StatusCode, AppError> {
    deleted_or_not_found(repository::purge_course(&state.db, &id).await?)
}

// grades

async fn course_grade(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<Json<CourseGrade>, AppError> {
    let grade = GradeService::new(state.db.clone()).course_grade(&id).await?;
    Ok(Json(grade))
}

async fn transcript(State(state): State<AppState>) -> Result<Json<Transcript>, AppError> {
    let transcript = GradeService::new(state.db.clone()).transcript().await?;
    Ok(Json(transcript))
}

async fn standard_grade_scale() -> Json<GradeScale> {
    Json(GradeScale::standard())
}

// groups

async fn list_groups(
    State(state): State<AppState>,
    Path(course_id): Path<String>
) -> Result<Json<Vec<AssignmentGroup>>, AppError> {
    active_course(&state, &course_id).await?;
    let groups = repository::fetch_groups_for_course(&state.db, &course_id).await?;
    Ok(Json(groups))
}

async fn create_group(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Json(req): Json<NewGroupRequest>
) -> Result<Json<AssignmentGroup>, AppError> {
    validate::new_group(&req)?;
    active_course(&state, &course_id).await?;
    let group = repository::insert_group(&state.db, &course_id, req).await?;
    Ok(Json(group))
}

async fn update_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateGroupRequest>
) -> Result<Json<AssignmentGroup>, AppError> {
    validate::update_group(&req)?;
    let group = repository::update_group(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(group))
}

async fn delete_group(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<StatusCode, AppError> {
    deleted_or_not_found(repository::delete_group(&state.db, &id).await?)
}

// tasks

async fn list_course_tasks(
    State(state): State<AppState>,
    Path(course_id): Path<String>
) -> Result<Json<Vec<Task>>, AppError> {
    active_course(&state, &course_id).await?;
    let tasks = repository::fetch_tasks_for_course(&state.db, &course_id).await?;
    Ok(Json(tasks))
}

async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = repository::fetch_active_tasks(&state.db).await?;
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Json(req): Json<NewTaskRequest>
) -> Result<Json<Task>, AppError> {
    validate::new_task(&req)?;
    active_course(&state, &course_id).await?;
    ensure_group_in_course(&state, req.group_id.as_deref(), &course_id).await?;
    let task = repository::insert_task(&state.db, &course_id, req).await?;
    Ok(Json(task))
}

async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>
) -> Result<Json<Task>, AppError> {
    validate::update_task(&req)?;
    let current = repository::find_task_by_id(&state.db, &id)
        .await?
        .filter(|t| !t.deleted)
        .ok_or(AppError::NotFound)?;
    active_course(&state, &current.course_id).await?;
    ensure_group_in_course(&state, req.group_id.as_deref(), &current.course_id).await?;
    let task = repository::update_task(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(task))
}

async fn toggle_task(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<Json<Task>, AppError> {
    let task = repository::toggle_task(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<StatusCode, AppError> {
    deleted_or_not_found(repository::soft_delete_task(&state.db, &id).await?)
}

async fn restore_task(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<StatusCode, AppError> {
    deleted_or_not_found(repository::restore_task(&state.db, &id).await?)
}

async fn purge_task(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<StatusCode, AppError> {
    deleted_or_not_found(repository::purge_task(&state.db, &id).await?)
}

// notes

async fn list_notes(
    State(state): State<AppState>,
    Path(course_id): Path<String>
) -> Result<Json<Vec<Note>>, AppError> {
    active_course(&state, &course_id).await?;
    let notes = repository::fetch_notes_for_course(&state.db, &course_id).await?;
    Ok(Json(notes))
}

async fn create_note(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Json(req): Json<NewNoteRequest>
) -> Result<Json<Note>, AppError> {
    active_course(&state, &course_id).await?;
    let note = repository::insert_note(&state.db, &course_id, req).await?;
    Ok(Json(note))
}

async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateNoteRequest>
) -> Result<Json<Note>, AppError> {
    let note = repository::update_note(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(note))
}

async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<StatusCode, AppError> {
    deleted_or_not_found(repository::soft_delete_note(&state.db, &id).await?)
}

async fn restore_note(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<StatusCode, AppError> {
    deleted_or_not_found(repository::restore_note(&state.db, &id).await?)
}

async fn purge_note(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<StatusCode, AppError> {
    deleted_or_not_found(repository::purge_note(&state.db, &id).await?)
}

async fn trash(State(state): State<AppState>) -> Result<Json<TrashResponse>, AppError> {
    Ok(Json(TrashResponse {
        courses: repository::fetch_deleted_courses(&state.db).await?,
        tasks: repository::fetch_deleted_tasks(&state.db).await?,
        notes: repository::fetch_deleted_notes(&state.db).await?,
    }))
}

// imports

fn import_service(state: &AppState) -> ImportService {
    ImportService::new(
        state.db.clone(),
        state.mail.clone(),
        state.extractor.clone(),
        state.import.clone(),
    )
}

async fn scan_imports(
    State(state): State<AppState>,
    Query(params): Query<ScanQueryParams>
) -> Result<Json<ImportStats>, AppError> {
    let mut query = state.import.query();
    if let Some(after) = params.after.filter(|a| !a.trim().is_empty()) {
        query.after = NaiveDate::parse_from_str(after.trim(), "%Y-%m-%d")
            .map_err(|_| AppError::BadRequest(format!("after must be YYYY-MM-DD, got {}", after)))?;
    }
    query.raw = params.q.filter(|q| !q.trim().is_empty());

    let stats = import_service(&state).scan(&query).await?;
    Ok(Json(stats))
}

async fn list_imports(State(state): State<AppState>) -> Result<Json<Vec<ImportCandidate>>, AppError> {
    let candidates = import_service(&state).pending().await?;
    Ok(Json(candidates))
}

async fn accept_import(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AcceptImportRequest>
) -> Result<Json<Task>, AppError> {
    let task = import_service(&state).accept(&id, req).await?;
    Ok(Json(task))
}

async fn dismiss_import(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<Json<ImportCandidate>, AppError> {
    let candidate = import_service(&state).dismiss(&id).await?;
    Ok(Json(candidate))
}
