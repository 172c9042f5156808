pub mod dto;
pub mod openai;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::mail::MailMessage;
use crate::models::Course;

pub use openai::{OpenAiConfig, OpenAiExtractor};

pub const UNTITLED_ASSIGNMENT: &str = "Untitled Assignment";
pub const DEFAULT_CONFIDENCE: f64 = 0.5;
/// Candidates at or above this confidence are pre-selected for import.
pub const SUGGEST_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedAssignment {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub course_name: Option<String>,
    pub assignment_type: Option<String>,
    pub points: Option<f64>,
    pub confidence: f64,
}

impl ExtractedAssignment {
    pub fn is_suggested(&self) -> bool {
        self.confidence >= SUGGEST_THRESHOLD
    }
}

#[async_trait]
pub trait AssignmentExtractor: Send + Sync {
    async fn extract(
        &self,
        message: &MailMessage,
        courses: &[Course],
    ) -> Result<Vec<ExtractedAssignment>, AppError>;
}

pub struct NoopExtractor;

#[async_trait]
impl AssignmentExtractor for NoopExtractor {
    async fn extract(
        &self,
        _message: &MailMessage,
        _courses: &[Course],
    ) -> Result<Vec<ExtractedAssignment>, AppError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct RawExtraction {
    #[serde(default)]
    assignments: Vec<RawAssignment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAssignment {
    title: Option<String>,
    description: Option<String>,
    #[serde(default)]
    due_date: Value,
    course_name: Option<String>,
    assignment_type: Option<String>,
    #[serde(default)]
    points: Value,
    #[serde(default)]
    confidence: Value,
}

/// Parses the model's JSON answer into normalised assignments.
pub fn parse_extraction(content: &str) -> Result<Vec<ExtractedAssignment>, AppError> {
    let raw: RawExtraction = serde_json::from_str(content)
        .map_err(|e| AppError::Upstream(format!("Unreadable extraction result: {}", e)))?;

    Ok(raw.assignments.into_iter().map(normalize).collect())
}

fn normalize(raw: RawAssignment) -> ExtractedAssignment {
    ExtractedAssignment {
        title: non_blank(raw.title).unwrap_or_else(|| UNTITLED_ASSIGNMENT.to_string()),
        description: non_blank(raw.description),
        due_date: raw.due_date.as_str().and_then(normalize_due_date),
        course_name: non_blank(raw.course_name),
        assignment_type: non_blank(raw.assignment_type),
        points: number(&raw.points),
        confidence: number(&raw.confidence)
            .unwrap_or(DEFAULT_CONFIDENCE)
            .clamp(0.0, 1.0),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

/// Accepts `YYYY-MM-DD`, RFC 3339 or a bare ISO date-time and returns `YYYY-MM-DD`.
pub fn normalize_due_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|d| d.date())
        })?;
    Some(date.format("%Y-%m-%d").to_string())
}

/// Finds the course an extracted course name refers to.
///
/// Exact (case-insensitive) name match wins, then containment in either direction.
/// The first match in `courses` order is returned.
pub fn identify_course<'a>(course_name: Option<&str>, courses: &'a [Course]) -> Option<&'a Course> {
    let wanted = course_name?.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }

    let names: Vec<(String, &Course)> = courses
        .iter()
        .map(|c| (c.name.trim().to_lowercase(), c))
        .filter(|(name, _)| !name.is_empty())
        .collect();

    names
        .iter()
        .find(|(name, _)| *name == wanted)
        .or_else(|| {
            names
                .iter()
                .find(|(name, _)| wanted.contains(name.as_str()) || name.contains(wanted.as_str()))
        })
        .map(|(_, c)| *c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(id: &str, name: &str) -> Course {
        Course {
            id: id.to_string(),
            name: name.to_string(),
            color: "#000000".to_string(),
            professor_name: None,
            professor_email: None,
            ta_name: None,
            ta_email: None,
            grade_scale: None,
            credits: None,
            semester_id: None,
            deleted: false,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn parses_and_normalizes_model_output() {
        let content = r#"{
            "assignments": [
                {
                    "title": "Problem Set 3",
                    "description": "  Chapters 4-5 ",
                    "dueDate": "2026-10-20T23:59:00-04:00",
                    "courseName": "MATH 221",
                    "assignmentType": "problem_set",
                    "points": "25",
                    "confidence": 1.7
                },
                {
                    "title": "",
                    "dueDate": "next friday",
                    "points": "lots"
                }
            ]
        }"#;

        let found = parse_extraction(content).unwrap();
        assert_eq!(found.len(), 2);

        let first = &found[0];
        assert_eq!(first.title, "Problem Set 3");
        assert_eq!(first.description.as_deref(), Some("Chapters 4-5"));
        assert_eq!(first.due_date.as_deref(), Some("2026-10-20"));
        assert_eq!(first.points, Some(25.0));
        assert_eq!(first.confidence, 1.0);
        assert!(first.is_suggested());

        let second = &found[1];
        assert_eq!(second.title, UNTITLED_ASSIGNMENT);
        assert_eq!(second.due_date, None);
        assert_eq!(second.points, None);
        assert_eq!(second.confidence, DEFAULT_CONFIDENCE);
        assert!(second.is_suggested());
    }

    #[test]
    fn low_confidence_is_not_suggested() {
        let found = parse_extraction(r#"{"assignments":[{"title":"Reading","confidence":0.2}]}"#).unwrap();
        assert!(!found[0].is_suggested());
    }

    #[test]
    fn missing_assignments_key_means_nothing_found() {
        assert!(parse_extraction("{}").unwrap().is_empty());
        assert!(parse_extraction("not json").is_err());
    }

    #[test]
    fn due_date_formats() {
        assert_eq!(normalize_due_date("2026-03-14").as_deref(), Some("2026-03-14"));
        assert_eq!(normalize_due_date("2026-03-14T10:00:00Z").as_deref(), Some("2026-03-14"));
        assert_eq!(normalize_due_date("2026-03-14T10:00:00").as_deref(), Some("2026-03-14"));
        assert_eq!(normalize_due_date("03/14/2026"), None);
    }

    #[test]
    fn identify_course_prefers_exact_match() {
        let courses = vec![course("a", "CS 101 Lab"), course("b", "cs 101")];
        let found = identify_course(Some("  CS 101 "), &courses).unwrap();
        assert_eq!(found.id, "b");
    }

    #[test]
    fn identify_course_falls_back_to_containment() {
        let courses = vec![course("a", "Biology"), course("b", "CHEM 210")];
        assert_eq!(identify_course(Some("chem 210 - organic"), &courses).unwrap().id, "b");
        assert_eq!(identify_course(Some("bio"), &courses).unwrap().id, "a");
        assert!(identify_course(Some("History"), &courses).is_none());
        assert!(identify_course(Some("   "), &courses).is_none());
        assert!(identify_course(None, &courses).is_none());
    }
}
