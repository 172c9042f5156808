use chrono::NaiveDate;

use crate::error::AppError;
use crate::models::{
    GradeScale, NewCourseRequest, NewGroupRequest, NewTaskRequest, UpdateCourseRequest,
    UpdateGroupRequest, UpdateTaskRequest,
};

fn bad_request(message: String) -> AppError {
    AppError::BadRequest(message)
}

pub fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(bad_request(format!("{} must not be blank", field)));
    }
    Ok(())
}

pub fn finite(field: &str, value: Option<f64>) -> Result<(), AppError> {
    match value {
        Some(v) if !v.is_finite() => Err(bad_request(format!("{} must be a finite number", field))),
        _ => Ok(()),
    }
}

pub fn credits(value: Option<f64>) -> Result<(), AppError> {
    match value {
        Some(v) if !v.is_finite() || v <= 0.0 => {
            Err(bad_request("credits must be a positive number".to_string()))
        }
        _ => Ok(()),
    }
}

/// Due dates are calendar days written `YYYY-MM-DD`.
pub fn due_date(value: &str) -> Result<(), AppError> {
    let valid = value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok();
    if !valid {
        return Err(bad_request(format!("due_date must be YYYY-MM-DD, got {}", value)));
    }
    Ok(())
}

pub fn grade_scale(scale: Option<&GradeScale>) -> Result<(), AppError> {
    match scale {
        Some(scale) => scale.validate().map_err(bad_request),
        None => Ok(()),
    }
}

pub fn new_course(req: &NewCourseRequest) -> Result<(), AppError> {
    require_text("name", &req.name)?;
    credits(req.credits)?;
    grade_scale(req.grade_scale.as_ref())
}

pub fn update_course(req: &UpdateCourseRequest) -> Result<(), AppError> {
    if let Some(name) = &req.name {
        require_text("name", name)?;
    }
    credits(req.credits)?;
    grade_scale(req.grade_scale.as_ref())
}

pub fn new_group(req: &NewGroupRequest) -> Result<(), AppError> {
    require_text("name", &req.name)?;
    finite("weight", Some(req.weight))
}

pub fn update_group(req: &UpdateGroupRequest) -> Result<(), AppError> {
    if let Some(name) = &req.name {
        require_text("name", name)?;
    }
    finite("weight", req.weight)
}

pub fn new_task(req: &NewTaskRequest) -> Result<(), AppError> {
    require_text("text", &req.text)?;
    due_date(&req.due_date)?;
    finite("total_score", req.total_score)?;
    finite("earned_score", req.earned_score)
}

pub fn update_task(req: &UpdateTaskRequest) -> Result<(), AppError> {
    if let Some(text) = &req.text {
        require_text("text", text)?;
    }
    if let Some(date) = &req.due_date {
        due_date(date)?;
    }
    finite("total_score", req.total_score)?;
    finite("earned_score", req.earned_score)
}
