use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::import::{STATUS_ACCEPTED, STATUS_DISMISSED, STATUS_PENDING};
use crate::models::{
    AssignmentGroup, Course, CourseRow, GradeScale, ImportCandidate, NewCourseRequest,
    NewGroupRequest, NewNoteRequest, NewSemesterRequest, NewTaskRequest, Note, Semester, Task,
    UpdateCourseRequest, UpdateGroupRequest, UpdateNoteRequest, UpdateSemesterRequest,
    UpdateTaskRequest,
};

const COURSE_COLUMNS: &str = "id, name, color, professor_name, professor_email, ta_name, ta_email, grade_scale, credits, semester_id, deleted, created_at, updated_at";
const GROUP_COLUMNS: &str = "id, course_id, name, weight, is_extra_credit, created_at";
const TASK_COLUMNS: &str = "id, course_id, group_id, text, description, due_date, completed, total_score, earned_score, opt_out, deleted, created_at, updated_at";
const NOTE_COLUMNS: &str = "id, course_id, title, content, deleted, created_at, updated_at";
const CANDIDATE_COLUMNS: &str = "id, source_message_id, source_subject, title, description, due_date, course_name, matched_course_id, assignment_type, points, confidence, suggested, status, created_at";

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Blank strings clear an optional text column.
fn blank_to_none(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}

fn encode_scale(scale: Option<&GradeScale>) -> Result<Option<String>, sqlx::Error> {
    scale
        .filter(|s| !s.is_empty())
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

// ---------------------------------------------------------------- semesters

pub async fn fetch_semesters(db: &SqlitePool) -> Result<Vec<Semester>, sqlx::Error> {
    sqlx::query_as::<_, Semester>(
        "SELECT id, name, created_at FROM semesters ORDER BY created_at ASC, id ASC"
    )
    .fetch_all(db)
    .await
}

pub async fn find_semester_by_id(db: &SqlitePool, id: &str) -> Result<Option<Semester>, sqlx::Error> {
    sqlx::query_as::<_, Semester>("SELECT id, name, created_at FROM semesters WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn insert_semester(db: &SqlitePool, req: NewSemesterRequest) -> Result<Semester, sqlx::Error> {
    let semester = Semester {
        id: new_id(),
        name: req.name,
        created_at: now(),
    };

    sqlx::query("INSERT INTO semesters (id, name, created_at) VALUES (?, ?, ?)")
        .bind(&semester.id)
        .bind(&semester.name)
        .bind(&semester.created_at)
        .execute(db)
        .await?;

    Ok(semester)
}

pub async fn rename_semester(
    db: &SqlitePool,
    id: &str,
    req: UpdateSemesterRequest,
) -> Result<Option<Semester>, sqlx::Error> {
    let affected = sqlx::query("UPDATE semesters SET name = ? WHERE id = ?")
        .bind(&req.name)
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    if affected == 0 {
        return Ok(None);
    }
    find_semester_by_id(db, id).await
}

/// Removes a semester; its courses become unassigned.
pub async fn delete_semester(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let mut tx = db.begin().await?;

    sqlx::query("UPDATE courses SET semester_id = NULL, updated_at = ? WHERE semester_id = ?")
        .bind(now())
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let affected = sqlx::query("DELETE FROM semesters WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    Ok(affected > 0)
}

// ---------------------------------------------------------------- courses

async fn fetch_courses_where(db: &SqlitePool, filter: &str) -> Result<Vec<Course>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM courses {} ORDER BY created_at ASC, id ASC",
        COURSE_COLUMNS, filter
    );
    sqlx::query_as::<_, CourseRow>(&sql)
        .fetch_all(db)
        .await?
        .into_iter()
        .map(Course::try_from)
        .collect()
}

pub async fn fetch_courses(db: &SqlitePool) -> Result<Vec<Course>, sqlx::Error> {
    fetch_courses_where(db, "WHERE deleted = 0").await
}

pub async fn fetch_all_courses(db: &SqlitePool) -> Result<Vec<Course>, sqlx::Error> {
    fetch_courses_where(db, "").await
}

pub async fn fetch_deleted_courses(db: &SqlitePool) -> Result<Vec<Course>, sqlx::Error> {
    fetch_courses_where(db, "WHERE deleted = 1").await
}

pub async fn find_course_by_id(db: &SqlitePool, id: &str) -> Result<Option<Course>, sqlx::Error> {
    let sql = format!("SELECT {} FROM courses WHERE id = ?", COURSE_COLUMNS);
    sqlx::query_as::<_, CourseRow>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?
        .map(Course::try_from)
        .transpose()
}

pub async fn insert_course(db: &SqlitePool, req: NewCourseRequest) -> Result<Course, sqlx::Error> {
    let now = now();
    let course = Course {
        id: new_id(),
        name: req.name,
        color: req.color,
        professor_name: None,
        professor_email: None,
        ta_name: None,
        ta_email: None,
        grade_scale: req.grade_scale.filter(|s| !s.is_empty()),
        credits: req.credits,
        semester_id: req.semester_id.and_then(blank_to_none),
        deleted: false,
        created_at: now.clone(),
        updated_at: now,
    };
    insert_course_row(db, &course).await?;
    Ok(course)
}

async fn insert_course_row(db: &SqlitePool, course: &Course) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO courses (id, name, color, professor_name, professor_email, ta_name, ta_email, grade_scale, credits, semester_id, deleted, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(&course.id)
    .bind(&course.name)
    .bind(&course.color)
    .bind(&course.professor_name)
    .bind(&course.professor_email)
    .bind(&course.ta_name)
    .bind(&course.ta_email)
    .bind(encode_scale(course.grade_scale.as_ref())?)
    .bind(course.credits)
    .bind(&course.semester_id)
    .bind(course.deleted)
    .bind(&course.created_at)
    .bind(&course.updated_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn update_course(
    db: &SqlitePool,
    id: &str,
    req: UpdateCourseRequest,
) -> Result<Option<Course>, sqlx::Error> {
    let mut current = match find_course_by_id(db, id).await? {
        Some(c) if !c.deleted => c,
        _ => return Ok(None),
    };

    if let Some(name) = req.name {
        current.name = name;
    }
    if let Some(color) = req.color {
        current.color = color;
    }
    if let Some(v) = req.professor_name {
        current.professor_name = blank_to_none(v);
    }
    if let Some(v) = req.professor_email {
        current.professor_email = blank_to_none(v);
    }
    if let Some(v) = req.ta_name {
        current.ta_name = blank_to_none(v);
    }
    if let Some(v) = req.ta_email {
        current.ta_email = blank_to_none(v);
    }
    if let Some(scale) = req.grade_scale {
        current.grade_scale = if scale.is_empty() { None } else { Some(scale) };
    }
    if let Some(credits) = req.credits {
        current.credits = Some(credits);
    }
    if let Some(semester_id) = req.semester_id {
        current.semester_id = blank_to_none(semester_id);
    }
    current.updated_at = now();

    // Only the editable columns are written, and never over a trashed row.
    let affected = sqlx::query(
        "UPDATE courses SET name = ?, color = ?, professor_name = ?, professor_email = ?, ta_name = ?, ta_email = ?, grade_scale = ?, credits = ?, semester_id = ?, updated_at = ? WHERE id = ? AND deleted = 0"
    )
    .bind(&current.name)
    .bind(&current.color)
    .bind(&current.professor_name)
    .bind(&current.professor_email)
    .bind(&current.ta_name)
    .bind(&current.ta_email)
    .bind(encode_scale(current.grade_scale.as_ref())?)
    .bind(current.credits)
    .bind(&current.semester_id)
    .bind(&current.updated_at)
    .bind(&current.id)
    .execute(db)
    .await?
    .rows_affected();

    Ok((affected > 0).then_some(current))
}

async fn set_course_deleted(db: &SqlitePool, id: &str, deleted: bool) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE courses SET deleted = ?, updated_at = ? WHERE id = ?")
        .bind(deleted)
        .bind(now())
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(result > 0)
}

pub async fn soft_delete_course(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    set_course_deleted(db, id, true).await
}

pub async fn restore_course(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    set_course_deleted(db, id, false).await
}

/// Permanently removes a course together with its groups, tasks and notes.
pub async fn purge_course(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let mut tx = db.begin().await?;

    for table in ["tasks", "notes", "assignment_groups"] {
        sqlx::query(&format!("DELETE FROM {} WHERE course_id = ?", table))
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    let affected = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    Ok(affected > 0)
}

// ---------------------------------------------------------------- groups

pub async fn fetch_groups_for_course(db: &SqlitePool, course_id: &str) -> Result<Vec<AssignmentGroup>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM assignment_groups WHERE course_id = ? ORDER BY created_at ASC, id ASC",
        GROUP_COLUMNS
    );
    sqlx::query_as::<_, AssignmentGroup>(&sql)
        .bind(course_id)
        .fetch_all(db)
        .await
}

/// Groups of every course that is not in the trash.
pub async fn fetch_active_groups(db: &SqlitePool) -> Result<Vec<AssignmentGroup>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM assignment_groups WHERE course_id IN (SELECT id FROM courses WHERE deleted = 0) ORDER BY created_at ASC, id ASC",
        GROUP_COLUMNS
    );
    sqlx::query_as::<_, AssignmentGroup>(&sql).fetch_all(db).await
}

pub async fn find_group_by_id(db: &SqlitePool, id: &str) -> Result<Option<AssignmentGroup>, sqlx::Error> {
    let sql = format!("SELECT {} FROM assignment_groups WHERE id = ?", GROUP_COLUMNS);
    sqlx::query_as::<_, AssignmentGroup>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn insert_group(
    db: &SqlitePool,
    course_id: &str,
    req: NewGroupRequest,
) -> Result<AssignmentGroup, sqlx::Error> {
    let group = AssignmentGroup {
        id: new_id(),
        course_id: course_id.to_string(),
        name: req.name,
        weight: req.weight,
        is_extra_credit: req.is_extra_credit,
        created_at: now(),
    };

    sqlx::query(
        "INSERT INTO assignment_groups (id, course_id, name, weight, is_extra_credit, created_at) VALUES (?, ?, ?, ?, ?, ?)"
    )
    .bind(&group.id)
    .bind(&group.course_id)
    .bind(&group.name)
    .bind(group.weight)
    .bind(group.is_extra_credit)
    .bind(&group.created_at)
    .execute(db)
    .await?;

    Ok(group)
}

pub async fn update_group(
    db: &SqlitePool,
    id: &str,
    req: UpdateGroupRequest,
) -> Result<Option<AssignmentGroup>, sqlx::Error> {
    let mut current = match find_group_by_id(db, id).await? {
        Some(g) => g,
        None => return Ok(None),
    };

    if let Some(name) = req.name {
        current.name = name;
    }
    if let Some(weight) = req.weight {
        current.weight = weight;
    }
    if let Some(is_extra_credit) = req.is_extra_credit {
        current.is_extra_credit = is_extra_credit;
    }

    sqlx::query("UPDATE assignment_groups SET name = ?, weight = ?, is_extra_credit = ? WHERE id = ?")
        .bind(&current.name)
        .bind(current.weight)
        .bind(current.is_extra_credit)
        .bind(id)
        .execute(db)
        .await?;

    Ok(Some(current))
}

/// Deletes a group and every task filed under it.
pub async fn delete_group(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let mut tx = db.begin().await?;

    sqlx::query("DELETE FROM tasks WHERE group_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let affected = sqlx::query("DELETE FROM assignment_groups WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    Ok(affected > 0)
}

// ---------------------------------------------------------------- tasks

pub async fn fetch_tasks_for_course(db: &SqlitePool, course_id: &str) -> Result<Vec<Task>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM tasks WHERE course_id = ? AND deleted = 0 ORDER BY due_date ASC, created_at ASC",
        TASK_COLUMNS
    );
    sqlx::query_as::<_, Task>(&sql)
        .bind(course_id)
        .fetch_all(db)
        .await
}

/// Non-deleted tasks of every course that is not in the trash.
pub async fn fetch_active_tasks(db: &SqlitePool) -> Result<Vec<Task>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM tasks WHERE deleted = 0 AND course_id IN (SELECT id FROM courses WHERE deleted = 0) ORDER BY due_date ASC, created_at ASC",
        TASK_COLUMNS
    );
    sqlx::query_as::<_, Task>(&sql).fetch_all(db).await
}

pub async fn fetch_deleted_tasks(db: &SqlitePool) -> Result<Vec<Task>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM tasks WHERE deleted = 1 ORDER BY updated_at DESC",
        TASK_COLUMNS
    );
    sqlx::query_as::<_, Task>(&sql).fetch_all(db).await
}

pub async fn find_task_by_id(db: &SqlitePool, id: &str) -> Result<Option<Task>, sqlx::Error> {
    let sql = format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS);
    sqlx::query_as::<_, Task>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
}

fn new_task(course_id: &str, req: NewTaskRequest) -> Task {
    let now = now();
    Task {
        id: new_id(),
        course_id: course_id.to_string(),
        group_id: req.group_id.and_then(blank_to_none),
        text: req.text,
        description: req.description.and_then(blank_to_none),
        due_date: req.due_date,
        completed: false,
        total_score: req.total_score,
        earned_score: req.earned_score,
        opt_out: false,
        deleted: false,
        created_at: now.clone(),
        updated_at: now,
    }
}

pub async fn insert_task(db: &SqlitePool, course_id: &str, req: NewTaskRequest) -> Result<Task, sqlx::Error> {
    let task = new_task(course_id, req);
    insert_task_row(db, &task).await?;
    Ok(task)
}

async fn insert_task_row<'e, E>(executor: E, task: &Task) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO tasks (id, course_id, group_id, text, description, due_date, completed, total_score, earned_score, opt_out, deleted, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(&task.id)
    .bind(&task.course_id)
    .bind(&task.group_id)
    .bind(&task.text)
    .bind(&task.description)
    .bind(&task.due_date)
    .bind(task.completed)
    .bind(task.total_score)
    .bind(task.earned_score)
    .bind(task.opt_out)
    .bind(task.deleted)
    .bind(&task.created_at)
    .bind(&task.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn update_task(
    db: &SqlitePool,
    id: &str,
    req: UpdateTaskRequest,
) -> Result<Option<Task>, sqlx::Error> {
    let mut current = match find_task_by_id(db, id).await? {
        Some(t) if !t.deleted => t,
        _ => return Ok(None),
    };

    if let Some(text) = req.text {
        current.text = text;
    }
    if let Some(description) = req.description {
        current.description = blank_to_none(description);
    }
    if let Some(due_date) = req.due_date {
        current.due_date = due_date;
    }
    if let Some(group_id) = req.group_id {
        current.group_id = blank_to_none(group_id);
    }
    if let Some(completed) = req.completed {
        current.completed = completed;
    }
    if req.clear_scores {
        current.total_score = None;
        current.earned_score = None;
    }
    if let Some(total) = req.total_score {
        current.total_score = Some(total);
    }
    if let Some(earned) = req.earned_score {
        current.earned_score = Some(earned);
    }
    if let Some(opt_out) = req.opt_out {
        current.opt_out = opt_out;
    }
    current.updated_at = now();

    // A task that was trashed, or whose course was, in the meantime stays untouched.
    let affected = sqlx::query(
        "UPDATE tasks SET group_id = ?, text = ?, description = ?, due_date = ?, completed = ?, total_score = ?, earned_score = ?, opt_out = ?, updated_at = ? WHERE id = ? AND deleted = 0 AND course_id IN (SELECT id FROM courses WHERE deleted = 0)"
    )
    .bind(&current.group_id)
    .bind(&current.text)
    .bind(&current.description)
    .bind(&current.due_date)
    .bind(current.completed)
    .bind(current.total_score)
    .bind(current.earned_score)
    .bind(current.opt_out)
    .bind(&current.updated_at)
    .bind(&current.id)
    .execute(db)
    .await?
    .rows_affected();

    Ok((affected > 0).then_some(current))
}

pub async fn toggle_task(db: &SqlitePool, id: &str) -> Result<Option<Task>, sqlx::Error> {
    let affected = sqlx::query("UPDATE tasks SET completed = NOT completed, updated_at = ? WHERE id = ?")
        .bind(now())
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    if affected == 0 {
        return Ok(None);
    }
    find_task_by_id(db, id).await
}

async fn set_task_deleted(db: &SqlitePool, id: &str, deleted: bool) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE tasks SET deleted = ?, updated_at = ? WHERE id = ?")
        .bind(deleted)
        .bind(now())
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(result > 0)
}

pub async fn soft_delete_task(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    set_task_deleted(db, id, true).await
}

pub async fn restore_task(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    set_task_deleted(db, id, false).await
}

pub async fn purge_task(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(result > 0)
}

// ---------------------------------------------------------------- notes

pub async fn fetch_notes_for_course(db: &SqlitePool, course_id: &str) -> Result<Vec<Note>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM notes WHERE course_id = ? AND deleted = 0 ORDER BY created_at DESC",
        NOTE_COLUMNS
    );
    sqlx::query_as::<_, Note>(&sql)
        .bind(course_id)
        .fetch_all(db)
        .await
}

pub async fn fetch_deleted_notes(db: &SqlitePool) -> Result<Vec<Note>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM notes WHERE deleted = 1 ORDER BY updated_at DESC",
        NOTE_COLUMNS
    );
    sqlx::query_as::<_, Note>(&sql).fetch_all(db).await
}

pub async fn find_note_by_id(db: &SqlitePool, id: &str) -> Result<Option<Note>, sqlx::Error> {
    let sql = format!("SELECT {} FROM notes WHERE id = ?", NOTE_COLUMNS);
    sqlx::query_as::<_, Note>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn insert_note(db: &SqlitePool, course_id: &str, req: NewNoteRequest) -> Result<Note, sqlx::Error> {
    let now = now();
    let note = Note {
        id: new_id(),
        course_id: course_id.to_string(),
        title: req.title,
        content: req.content,
        deleted: false,
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO notes (id, course_id, title, content, deleted, created_at, updated_at) VALUES (?, ?, ?, ?, 0, ?, ?)"
    )
    .bind(&note.id)
    .bind(&note.course_id)
    .bind(&note.title)
    .bind(&note.content)
    .bind(&note.created_at)
    .bind(&note.updated_at)
    .execute(db)
    .await?;

    Ok(note)
}

pub async fn update_note(
    db: &SqlitePool,
    id: &str,
    req: UpdateNoteRequest,
) -> Result<Option<Note>, sqlx::Error> {
    let mut current = match find_note_by_id(db, id).await? {
        Some(n) => n,
        None => return Ok(None),
    };

    if let Some(title) = req.title {
        current.title = title;
    }
    if let Some(content) = req.content {
        current.content = content;
    }
    current.updated_at = now();

    sqlx::query("UPDATE notes SET title = ?, content = ?, updated_at = ? WHERE id = ?")
        .bind(&current.title)
        .bind(&current.content)
        .bind(&current.updated_at)
        .bind(id)
        .execute(db)
        .await?;

    Ok(Some(current))
}

async fn set_note_deleted(db: &SqlitePool, id: &str, deleted: bool) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE notes SET deleted = ?, updated_at = ? WHERE id = ?")
        .bind(deleted)
        .bind(now())
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(result > 0)
}

pub async fn soft_delete_note(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    set_note_deleted(db, id, true).await
}

pub async fn restore_note(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    set_note_deleted(db, id, false).await
}

pub async fn purge_note(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM notes WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(result > 0)
}

// ---------------------------------------------------------------- import candidates

/// Stores a candidate unless the same (message, title) pair was suggested before.
pub async fn insert_candidate(db: &SqlitePool, candidate: &ImportCandidate) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO import_candidates (id, source_message_id, source_subject, title, description, due_date, course_name, matched_course_id, assignment_type, points, confidence, suggested, status, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(&candidate.id)
    .bind(&candidate.source_message_id)
    .bind(&candidate.source_subject)
    .bind(&candidate.title)
    .bind(&candidate.description)
    .bind(&candidate.due_date)
    .bind(&candidate.course_name)
    .bind(&candidate.matched_course_id)
    .bind(&candidate.assignment_type)
    .bind(candidate.points)
    .bind(candidate.confidence)
    .bind(candidate.suggested)
    .bind(&candidate.status)
    .bind(&candidate.created_at)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn fetch_pending_candidates(db: &SqlitePool) -> Result<Vec<ImportCandidate>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM import_candidates WHERE status = ? ORDER BY confidence DESC, created_at ASC",
        CANDIDATE_COLUMNS
    );
    sqlx::query_as::<_, ImportCandidate>(&sql)
        .bind(STATUS_PENDING)
        .fetch_all(db)
        .await
}

pub async fn find_candidate_by_id(db: &SqlitePool, id: &str) -> Result<Option<ImportCandidate>, sqlx::Error> {
    let sql = format!("SELECT {} FROM import_candidates WHERE id = ?", CANDIDATE_COLUMNS);
    sqlx::query_as::<_, ImportCandidate>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Moves a pending candidate to `status`. False when it is missing or already decided.
async fn claim_candidate<'e, E>(executor: E, id: &str, status: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE import_candidates SET status = ? WHERE id = ? AND status = ?")
        .bind(status)
        .bind(id)
        .bind(STATUS_PENDING)
        .execute(executor)
        .await?
        .rows_affected();
    Ok(result > 0)
}

pub async fn dismiss_candidate(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    claim_candidate(db, id, STATUS_DISMISSED).await
}

/// Marks a pending candidate accepted and creates its task in one transaction.
/// `None` when the candidate was no longer pending; nothing is written then.
pub async fn accept_candidate(
    db: &SqlitePool,
    id: &str,
    course_id: &str,
    req: NewTaskRequest,
) -> Result<Option<Task>, sqlx::Error> {
    let mut tx = db.begin().await?;

    if !claim_candidate(&mut *tx, id, STATUS_ACCEPTED).await? {
        tx.rollback().await?;
        return Ok(None);
    }
    let task = new_task(course_id, req);
    insert_task_row(&mut *tx, &task).await?;

    tx.commit().await?;
    Ok(Some(task))
}

pub async fn candidate_exists(db: &SqlitePool, message_id: &str, title: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM import_candidates WHERE source_message_id = ? AND title = ?"
    )
    .bind(message_id)
    .bind(title)
    .fetch_optional(db)
    .await?;
    Ok(row.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn course_req(name: &str) -> NewCourseRequest {
        NewCourseRequest {
            name: name.to_string(),
            color: "#aa0000".to_string(),
            semester_id: None,
            credits: None,
            grade_scale: None,
        }
    }

    fn task_req(text: &str, group_id: Option<&str>) -> NewTaskRequest {
        NewTaskRequest {
            text: text.to_string(),
            due_date: "2026-01-10".to_string(),
            group_id: group_id.map(str::to_string),
            description: None,
            total_score: Some(10.0),
            earned_score: Some(8.0),
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_course() {
        let pool = test_pool().await;

        let mut req = course_req("Linear Algebra");
        req.grade_scale = Some(GradeScale::standard());
        req.credits = Some(3.0);
        let course = insert_course(&pool, req).await.expect("Failed to insert course");
        assert_eq!(course.name, "Linear Algebra");
        assert!(!course.deleted);

        let courses = fetch_courses(&pool).await.expect("Failed to fetch courses");
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].id, course.id);
        assert_eq!(courses[0].grade_scale, Some(GradeScale::standard()));
        assert_eq!(courses[0].credits, Some(3.0));
    }

    #[tokio::test]
    async fn test_update_course_clears_fields() {
        let pool = test_pool().await;
        let mut req = course_req("Physics");
        req.grade_scale = Some(GradeScale::standard());
        let course = insert_course(&pool, req).await.expect("Failed to insert course");

        let updated = update_course(&pool, &course.id, UpdateCourseRequest {
            professor_name: Some("Dr. Noether".to_string()),
            grade_scale: Some(GradeScale::default()),
            ..Default::default()
        })
        .await
        .expect("Failed to update course")
        .expect("Course not found");
        assert_eq!(updated.professor_name.as_deref(), Some("Dr. Noether"));
        assert_eq!(updated.grade_scale, None);

        let cleared = update_course(&pool, &course.id, UpdateCourseRequest {
            professor_name: Some(String::new()),
            ..Default::default()
        })
        .await
        .expect("Failed to update course")
        .expect("Course not found");
        assert_eq!(cleared.professor_name, None);
    }

    #[tokio::test]
    async fn test_soft_delete_and_restore_course() {
        let pool = test_pool().await;
        let course = insert_course(&pool, course_req("History")).await.unwrap();

        assert!(soft_delete_course(&pool, &course.id).await.unwrap());
        assert!(fetch_courses(&pool).await.unwrap().is_empty());
        assert_eq!(fetch_deleted_courses(&pool).await.unwrap().len(), 1);

        assert!(restore_course(&pool, &course.id).await.unwrap());
        assert_eq!(fetch_courses(&pool).await.unwrap().len(), 1);
        assert!(!soft_delete_course(&pool, "missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_course_cascades() {
        let pool = test_pool().await;
        let course = insert_course(&pool, course_req("Chemistry")).await.unwrap();
        let group = insert_group(&pool, &course.id, NewGroupRequest {
            name: "Labs".to_string(),
            weight: 100.0,
            is_extra_credit: false,
        })
        .await
        .unwrap();
        let task = insert_task(&pool, &course.id, task_req("Lab 1", Some(&group.id))).await.unwrap();
        let note = insert_note(&pool, &course.id, NewNoteRequest::default()).await.unwrap();

        assert!(purge_course(&pool, &course.id).await.unwrap());
        assert!(find_course_by_id(&pool, &course.id).await.unwrap().is_none());
        assert!(find_group_by_id(&pool, &group.id).await.unwrap().is_none());
        assert!(find_task_by_id(&pool, &task.id).await.unwrap().is_none());
        assert!(find_note_by_id(&pool, &note.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_group_cascades_tasks_only_in_group() {
        let pool = test_pool().await;
        let course = insert_course(&pool, course_req("Biology")).await.unwrap();
        let group = insert_group(&pool, &course.id, NewGroupRequest {
            name: "Quizzes".to_string(),
            weight: 20.0,
            is_extra_credit: false,
        })
        .await
        .unwrap();
        let in_group = insert_task(&pool, &course.id, task_req("Quiz 1", Some(&group.id))).await.unwrap();
        let loose = insert_task(&pool, &course.id, task_req("Reading", None)).await.unwrap();

        assert!(delete_group(&pool, &group.id).await.unwrap());
        assert!(find_task_by_id(&pool, &in_group.id).await.unwrap().is_none());
        assert!(find_task_by_id(&pool, &loose.id).await.unwrap().is_some());
        assert!(!delete_group(&pool, &group.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_and_toggle_task() {
        let pool = test_pool().await;
        let course = insert_course(&pool, course_req("Economics")).await.unwrap();
        let task = insert_task(&pool, &course.id, task_req("Essay", None)).await.unwrap();
        assert!(!task.completed);

        let toggled = toggle_task(&pool, &task.id).await.unwrap().expect("Task not found");
        assert!(toggled.completed);

        let updated = update_task(&pool, &task.id, UpdateTaskRequest {
            clear_scores: true,
            opt_out: Some(true),
            ..Default::default()
        })
        .await
        .unwrap()
        .expect("Task not found");
        assert_eq!(updated.total_score, None);
        assert_eq!(updated.earned_score, None);
        assert!(updated.opt_out);
        assert!(updated.completed);

        assert!(toggle_task(&pool, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_patch_never_revives_a_trashed_task() {
        let pool = test_pool().await;
        let course = insert_course(&pool, course_req("Geology")).await.unwrap();
        let task = insert_task(&pool, &course.id, task_req("Field trip", None)).await.unwrap();

        let (patched, deleted) = tokio::join!(
            update_task(&pool, &task.id, UpdateTaskRequest {
                earned_score: Some(9.0),
                ..Default::default()
            }),
            soft_delete_task(&pool, &task.id),
        );
        patched.unwrap();
        assert!(deleted.unwrap());

        let stored = find_task_by_id(&pool, &task.id).await.unwrap().unwrap();
        assert!(stored.deleted);
        assert!(fetch_active_tasks(&pool).await.unwrap().is_empty());

        let again = update_task(&pool, &task.id, UpdateTaskRequest {
            earned_score: Some(10.0),
            ..Default::default()
        })
        .await
        .unwrap();
        assert!(again.is_none());
        let stored = find_task_by_id(&pool, &task.id).await.unwrap().unwrap();
        assert_ne!(stored.earned_score, Some(10.0));
    }

    #[tokio::test]
    async fn test_tasks_of_a_trashed_course_cannot_be_patched() {
        let pool = test_pool().await;
        let course = insert_course(&pool, course_req("Astronomy")).await.unwrap();
        let task = insert_task(&pool, &course.id, task_req("Star chart", None)).await.unwrap();
        soft_delete_course(&pool, &course.id).await.unwrap();

        let patched = update_task(&pool, &task.id, UpdateTaskRequest {
            completed: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
        assert!(patched.is_none());
        assert!(!find_task_by_id(&pool, &task.id).await.unwrap().unwrap().completed);
    }

    #[tokio::test]
    async fn test_patch_never_revives_a_trashed_course() {
        let pool = test_pool().await;
        let course = insert_course(&pool, course_req("Latin")).await.unwrap();

        let (patched, deleted) = tokio::join!(
            update_course(&pool, &course.id, UpdateCourseRequest {
                credits: Some(3.0),
                ..Default::default()
            }),
            soft_delete_course(&pool, &course.id),
        );
        patched.unwrap();
        assert!(deleted.unwrap());

        assert!(find_course_by_id(&pool, &course.id).await.unwrap().unwrap().deleted);
        assert!(fetch_courses(&pool).await.unwrap().is_empty());
        let again = update_course(&pool, &course.id, UpdateCourseRequest {
            name: Some("Classics".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_task_trash_lifecycle() {
        let pool = test_pool().await;
        let course = insert_course(&pool, course_req("Art")).await.unwrap();
        let task = insert_task(&pool, &course.id, task_req("Sketch", None)).await.unwrap();

        assert!(soft_delete_task(&pool, &task.id).await.unwrap());
        assert!(fetch_tasks_for_course(&pool, &course.id).await.unwrap().is_empty());
        assert!(fetch_active_tasks(&pool).await.unwrap().is_empty());
        assert_eq!(fetch_deleted_tasks(&pool).await.unwrap().len(), 1);

        assert!(restore_task(&pool, &task.id).await.unwrap());
        assert_eq!(fetch_active_tasks(&pool).await.unwrap().len(), 1);

        assert!(purge_task(&pool, &task.id).await.unwrap());
        assert!(find_task_by_id(&pool, &task.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tasks_of_trashed_course_are_not_active() {
        let pool = test_pool().await;
        let course = insert_course(&pool, course_req("Music")).await.unwrap();
        insert_task(&pool, &course.id, task_req("Scales", None)).await.unwrap();
        insert_group(&pool, &course.id, NewGroupRequest {
            name: "All".to_string(),
            weight: 100.0,
            is_extra_credit: false,
        })
        .await
        .unwrap();

        soft_delete_course(&pool, &course.id).await.unwrap();
        assert!(fetch_active_tasks(&pool).await.unwrap().is_empty());
        assert!(fetch_active_groups(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_note_trash_lifecycle() {
        let pool = test_pool().await;
        let course = insert_course(&pool, course_req("Philosophy")).await.unwrap();
        let note = insert_note(&pool, &course.id, NewNoteRequest {
            title: "Kant".to_string(),
            content: "categorical imperative".to_string(),
        })
        .await
        .unwrap();

        let updated = update_note(&pool, &note.id, UpdateNoteRequest {
            title: None,
            content: Some("synthetic a priori".to_string()),
        })
        .await
        .unwrap()
        .expect("Note not found");
        assert_eq!(updated.title, "Kant");
        assert_eq!(updated.content, "synthetic a priori");

        assert!(soft_delete_note(&pool, &note.id).await.unwrap());
        assert!(fetch_notes_for_course(&pool, &course.id).await.unwrap().is_empty());
        assert_eq!(fetch_deleted_notes(&pool).await.unwrap().len(), 1);
        assert!(restore_note(&pool, &note.id).await.unwrap());
        assert_eq!(fetch_notes_for_course(&pool, &course.id).await.unwrap().len(), 1);
        assert!(purge_note(&pool, &note.id).await.unwrap());
        assert!(fetch_deleted_notes(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_semester_unassigns_courses() {
        let pool = test_pool().await;
        let semester = insert_semester(&pool, NewSemesterRequest { name: "Fall 2026".to_string() })
            .await
            .unwrap();
        let mut req = course_req("Statistics");
        req.semester_id = Some(semester.id.clone());
        let course = insert_course(&pool, req).await.unwrap();

        let renamed = rename_semester(&pool, &semester.id, UpdateSemesterRequest { name: "Autumn 2026".to_string() })
            .await
            .unwrap()
            .expect("Semester not found");
        assert_eq!(renamed.name, "Autumn 2026");

        assert!(delete_semester(&pool, &semester.id).await.unwrap());
        let course = find_course_by_id(&pool, &course.id).await.unwrap().unwrap();
        assert_eq!(course.semester_id, None);
        assert!(fetch_semesters(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_candidates_are_deduplicated() {
        let pool = test_pool().await;
        let candidate = ImportCandidate {
            id: new_id(),
            source_message_id: "msg-1".to_string(),
            source_subject: "Homework 3".to_string(),
            title: "Homework 3".to_string(),
            description: None,
            due_date: Some("2026-02-01".to_string()),
            course_name: Some("CS 101".to_string()),
            matched_course_id: None,
            assignment_type: Some("homework".to_string()),
            points: Some(20.0),
            confidence: 0.9,
            suggested: true,
            status: STATUS_PENDING.to_string(),
            created_at: now(),
        };

        assert!(insert_candidate(&pool, &candidate).await.unwrap());
        let mut again = candidate.clone();
        again.id = new_id();
        assert!(!insert_candidate(&pool, &again).await.unwrap());
        assert!(candidate_exists(&pool, "msg-1", "Homework 3").await.unwrap());
        assert!(!candidate_exists(&pool, "msg-2", "Homework 3").await.unwrap());

        assert_eq!(fetch_pending_candidates(&pool).await.unwrap().len(), 1);
        assert!(dismiss_candidate(&pool, &candidate.id).await.unwrap());
        assert!(!dismiss_candidate(&pool, &candidate.id).await.unwrap());
        assert!(fetch_pending_candidates(&pool).await.unwrap().is_empty());
        let stored = find_candidate_by_id(&pool, &candidate.id).await.unwrap().unwrap();
        assert_eq!(stored.status, STATUS_DISMISSED);
    }
}
