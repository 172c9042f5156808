use std::sync::Arc;

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppError;
use crate::extract::{identify_course, AssignmentExtractor, ExtractedAssignment};
use crate::mail::{MailClient, MailMessage, MailQuery};
use crate::models::import::{STATUS_DISMISSED, STATUS_PENDING};
use crate::models::{AcceptImportRequest, Course, ImportCandidate, NewTaskRequest, Task};

pub const DEFAULT_IMPORT_CONCURRENCY: usize = 4;
pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;
pub const DEFAULT_MAX_RESULTS: u32 = 50;

#[derive(Clone, Debug)]
pub struct ImportSettings {
    pub concurrency: usize,
    pub lookback_days: i64,
    pub max_results: u32,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_IMPORT_CONCURRENCY,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl ImportSettings {
    pub fn query(&self) -> MailQuery {
        MailQuery::recent(self.lookback_days, self.max_results)
    }
}

#[derive(Debug, Default, Serialize)]
pub struct ImportStats {
    pub messages_fetched: usize,
    pub messages_failed: usize,
    pub candidates_found: usize,
    pub candidates_stored: usize,
    pub duplicates_skipped: usize,
}

pub struct ImportService {
    db: SqlitePool,
    mail: Arc<dyn MailClient>,
    extractor: Arc<dyn AssignmentExtractor>,
    settings: ImportSettings,
}

impl ImportService {
    pub fn new(
        db: SqlitePool,
        mail: Arc<dyn MailClient>,
        extractor: Arc<dyn AssignmentExtractor>,
        settings: ImportSettings,
    ) -> Self {
        Self {
            db,
            mail,
            extractor,
            settings,
        }
    }

    /// Fetches recent mail, extracts assignments and stores the new ones as pending.
    pub async fn scan(&self, query: &MailQuery) -> Result<ImportStats, AppError> {
        info!("Starting import scan...");
        let fetched = self.mail.fetch_messages(query).await?;
        let messages = fetched.messages;
        let courses: Arc<[Course]> = repository::fetch_courses(&self.db).await?.into();

        // Failures count both messages the mail client skipped and failed extractions.
        let mut stats = ImportStats {
            messages_fetched: messages.len(),
            messages_failed: fetched.skipped,
            ..ImportStats::default()
        };

        let results: Vec<(MailMessage, Result<Vec<ExtractedAssignment>, AppError>)> =
            stream::iter(messages)
                .map(|message| {
                    let extractor = self.extractor.clone();
                    let courses = courses.clone();
                    async move {
                        let found = extractor.extract(&message, &courses).await;
                        (message, found)
                    }
                })
                .buffer_unordered(self.settings.concurrency.max(1))
                .collect()
                .await;

        for (message, result) in results {
            let found = match result {
                Ok(found) => found,
                Err(e) => {
                    warn!("Extraction failed for message {}: {}", message.id, e);
                    stats.messages_failed += 1;
                    continue;
                }
            };

            for assignment in found {
                stats.candidates_found += 1;
                if repository::candidate_exists(&self.db, &message.id, &assignment.title).await? {
                    stats.duplicates_skipped += 1;
                    continue;
                }

                let candidate = new_candidate(&message, assignment, &courses);
                if repository::insert_candidate(&self.db, &candidate).await? {
                    stats.candidates_stored += 1;
                } else {
                    stats.duplicates_skipped += 1;
                }
            }
        }

        info!("Import scan completed: {:?}", stats);
        Ok(stats)
    }

    pub async fn pending(&self) -> Result<Vec<ImportCandidate>, AppError> {
        Ok(repository::fetch_pending_candidates(&self.db).await?)
    }

    /// Turns a pending candidate into a task of the chosen (or matched) course.
    pub async fn accept(&self, candidate_id: &str, req: AcceptImportRequest) -> Result<Task, AppError> {
        let candidate = self.find_pending(candidate_id).await?;

        let course_id = req
            .course_id
            .filter(|id| !id.trim().is_empty())
            .or_else(|| candidate.matched_course_id.clone())
            .ok_or_else(|| AppError::BadRequest("No course selected for this assignment".to_string()))?;

        let course = repository::find_course_by_id(&self.db, &course_id)
            .await?
            .filter(|c| !c.deleted)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown course: {}", course_id)))?;

        let group_id = match req.group_id.filter(|id| !id.trim().is_empty()) {
            Some(group_id) => {
                let group = repository::find_group_by_id(&self.db, &group_id)
                    .await?
                    .ok_or_else(|| AppError::BadRequest(format!("Unknown group: {}", group_id)))?;
                if group.course_id != course.id {
                    return Err(AppError::BadRequest("Group belongs to another course".to_string()));
                }
                Some(group.id)
            }
            None => None,
        };

        let due_date = candidate
            .due_date
            .clone()
            .unwrap_or_else(|| Utc::now().date_naive().format("%Y-%m-%d").to_string());

        let task = repository::accept_candidate(&self.db, &candidate.id, &course.id, NewTaskRequest {
            text: candidate.title.clone(),
            due_date,
            group_id,
            description: candidate.description.clone(),
            total_score: candidate.points,
            earned_score: None,
        })
        .await?
        .ok_or_else(already_decided)?;

        info!("Imported '{}' into course {}", task.text, course.name);
        Ok(task)
    }

    pub async fn dismiss(&self, candidate_id: &str) -> Result<ImportCandidate, AppError> {
        let mut candidate = self.find_pending(candidate_id).await?;
        if !repository::dismiss_candidate(&self.db, &candidate.id).await? {
            return Err(already_decided());
        }
        candidate.status = STATUS_DISMISSED.to_string();
        Ok(candidate)
    }

    async fn find_pending(&self, candidate_id: &str) -> Result<ImportCandidate, AppError> {
        let candidate = repository::find_candidate_by_id(&self.db, candidate_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if candidate.status != STATUS_PENDING {
            return Err(AppError::Conflict(format!("Candidate is already {}", candidate.status)));
        }
        Ok(candidate)
    }
}

/// Another request accepted or dismissed the candidate after it was read.
fn already_decided() -> AppError {
    AppError::Conflict("Candidate was already decided".to_string())
}

fn new_candidate(message: &MailMessage, assignment: ExtractedAssignment, courses: &[Course]) -> ImportCandidate {
    let matched_course_id = identify_course(assignment.course_name.as_deref(), courses).map(|c| c.id.clone());
    let suggested = assignment.is_suggested();

    ImportCandidate {
        id: Uuid::new_v4().to_string(),
        source_message_id: message.id.clone(),
        source_subject: message.subject.clone(),
        title: assignment.title,
        description: assignment.description,
        due_date: assignment.due_date,
        course_name: assignment.course_name,
        matched_course_id,
        assignment_type: assignment.assignment_type,
        points: assignment.points,
        confidence: assignment.confidence,
        suggested,
        status: STATUS_PENDING.to_string(),
        created_at: Utc::now().to_rfc3339(),
    }
}
