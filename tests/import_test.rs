use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::SqlitePool;

use gradebook::db::{self, repository};
use gradebook::error::AppError;
use gradebook::extract::{AssignmentExtractor, ExtractedAssignment};
use gradebook::mail::{FetchedMail, GmailConfig, GmailHttpClient, MailClient, MailMessage, MailQuery};
use gradebook::models::{AcceptImportRequest, Course, NewCourseRequest, NewGroupRequest};
use gradebook::services::{ImportScheduler, ImportService, ImportSettings};

struct FakeMail {
    messages: Vec<MailMessage>,
    skipped: usize,
}

#[async_trait]
impl MailClient for FakeMail {
    async fn fetch_messages(&self, _query: &MailQuery) -> Result<FetchedMail, AppError> {
        Ok(FetchedMail {
            messages: self.messages.clone(),
            skipped: self.skipped,
        })
    }
}

/// Turns each subject line into one assignment; a message with id "broken" fails.
struct FakeExtractor;

#[async_trait]
impl AssignmentExtractor for FakeExtractor {
    async fn extract(
        &self,
        message: &MailMessage,
        _courses: &[Course],
    ) -> Result<Vec<ExtractedAssignment>, AppError> {
        if message.id == "broken" {
            return Err(AppError::Upstream("model unavailable".to_string()));
        }
        Ok(vec![ExtractedAssignment {
            title: message.subject.clone(),
            description: Some(message.body.clone()),
            due_date: if message.id == "m2" { None } else { Some("2026-10-30".to_string()) },
            course_name: Some(message.from.clone()),
            assignment_type: Some("homework".to_string()),
            points: Some(20.0),
            confidence: if message.id == "m2" { 0.3 } else { 0.9 },
        }])
    }
}

fn message(id: &str, subject: &str, course: &str) -> MailMessage {
    MailMessage {
        id: id.to_string(),
        subject: subject.to_string(),
        from: course.to_string(),
        date: "Mon, 12 Oct 2026 09:00:00 -0400".to_string(),
        body: format!("{} is posted", subject),
        snippet: String::new(),
    }
}

async fn setup() -> (SqlitePool, ImportService) {
    let db = db::connect_in_memory()
        .await
        .expect("Failed to create database");

    let mail = Arc::new(FakeMail {
        messages: vec![
            message("m1", "Problem Set 5", "linear algebra"),
            message("m2", "Reading response", "Unknown Course"),
            message("broken", "Quiz 3", "linear algebra"),
        ],
        skipped: 0,
    });
    let service = ImportService::new(db.clone(), mail, Arc::new(FakeExtractor), ImportSettings::default());
    (db, service)
}

async fn create_course(db: &SqlitePool, name: &str) -> Course {
    repository::insert_course(db, NewCourseRequest {
        name: name.to_string(),
        color: "#3366ff".to_string(),
        semester_id: None,
        credits: None,
        grade_scale: None,
    })
    .await
    .expect("Failed to insert course")
}

#[tokio::test]
async fn test_scan_isolates_failures_and_deduplicates() {
    let (db, service) = setup().await;
    let course = create_course(&db, "Linear Algebra").await;
    let query = ImportSettings::default().query();

    let stats = service.scan(&query).await.unwrap();
    assert_eq!(stats.messages_fetched, 3);
    assert_eq!(stats.messages_failed, 1);
    assert_eq!(stats.candidates_found, 2);
    assert_eq!(stats.candidates_stored, 2);

    let pending = service.pending().await.unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].title, "Problem Set 5");
    assert_eq!(pending[0].matched_course_id.as_deref(), Some(course.id.as_str()));
    assert!(pending[0].suggested);
    assert_eq!(pending[1].matched_course_id, None);
    assert!(!pending[1].suggested);

    let again = service.scan(&query).await.unwrap();
    assert_eq!(again.candidates_stored, 0);
    assert_eq!(again.duplicates_skipped, 2);
    assert_eq!(service.pending().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_accept_creates_task_in_matched_course() {
    let (db, service) = setup().await;
    let course = create_course(&db, "Linear Algebra").await;
    let group = repository::insert_group(&db, &course.id, NewGroupRequest {
        name: "Homework".to_string(),
        weight: 40.0,
        is_extra_credit: false,
    })
    .await
    .unwrap();
    service.scan(&ImportSettings::default().query()).await.unwrap();

    let candidate = service.pending().await.unwrap().remove(0);
    let task = service
        .accept(&candidate.id, AcceptImportRequest {
            course_id: None,
            group_id: Some(group.id.clone()),
        })
        .await
        .unwrap();

    assert_eq!(task.course_id, course.id);
    assert_eq!(task.group_id.as_deref(), Some(group.id.as_str()));
    assert_eq!(task.text, "Problem Set 5");
    assert_eq!(task.due_date, "2026-10-30");
    assert_eq!(task.total_score, Some(20.0));
    assert_eq!(task.earned_score, None);

    assert_eq!(service.pending().await.unwrap().len(), 1);
    let again = service.accept(&candidate.id, AcceptImportRequest::default()).await;
    assert!(matches!(again, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_concurrent_accepts_create_one_task() {
    let (db, service) = setup().await;
    let course = create_course(&db, "Linear Algebra").await;
    service.scan(&ImportSettings::default().query()).await.unwrap();
    let candidate = service.pending().await.unwrap().remove(0);

    let (first, second) = tokio::join!(
        service.accept(&candidate.id, AcceptImportRequest::default()),
        service.accept(&candidate.id, AcceptImportRequest::default()),
    );

    assert_eq!([&first, &second].iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        matches!(first, Err(AppError::Conflict(_))) || matches!(second, Err(AppError::Conflict(_)))
    );
    let tasks = repository::fetch_tasks_for_course(&db, &course.id).await.unwrap();
    assert_eq!(tasks.len(), 1);
}

#[tokio::test]
async fn test_accept_and_dismiss_race_has_one_winner() {
    let (db, service) = setup().await;
    let course = create_course(&db, "Linear Algebra").await;
    service.scan(&ImportSettings::default().query()).await.unwrap();
    let candidate = service.pending().await.unwrap().remove(0);

    let (accepted, dismissed) = tokio::join!(
        service.accept(&candidate.id, AcceptImportRequest::default()),
        service.dismiss(&candidate.id),
    );
    assert!(accepted.is_ok() != dismissed.is_ok());

    let tasks = repository::fetch_tasks_for_course(&db, &course.id).await.unwrap();
    let stored = repository::find_candidate_by_id(&db, &candidate.id).await.unwrap().unwrap();
    if accepted.is_ok() {
        assert_eq!(tasks.len(), 1);
        assert_eq!(stored.status, "accepted");
    } else {
        assert!(tasks.is_empty());
        assert_eq!(stored.status, "dismissed");
    }
}

#[tokio::test]
async fn test_scan_counts_messages_the_mail_client_skipped() {
    let db = db::connect_in_memory()
        .await
        .expect("Failed to create database");
    let mail = Arc::new(FakeMail {
        messages: vec![
            message("m1", "Problem Set 5", "linear algebra"),
            message("broken", "Quiz 3", "linear algebra"),
        ],
        skipped: 2,
    });
    let service = ImportService::new(db, mail, Arc::new(FakeExtractor), ImportSettings::default());

    let stats = service.scan(&ImportSettings::default().query()).await.unwrap();
    assert_eq!(stats.messages_fetched, 2);
    assert_eq!(stats.messages_failed, 3);
    assert_eq!(stats.candidates_stored, 1);
}

#[tokio::test]
async fn test_accept_requires_a_course_and_matching_group() {
    let (db, service) = setup().await;
    let algebra = create_course(&db, "Linear Algebra").await;
    let art = create_course(&db, "Art").await;
    let art_group = repository::insert_group(&db, &art.id, NewGroupRequest {
        name: "Portfolio".to_string(),
        weight: 100.0,
        is_extra_credit: false,
    })
    .await
    .unwrap();
    service.scan(&ImportSettings::default().query()).await.unwrap();

    let pending = service.pending().await.unwrap();
    let matched = &pending[0];
    let unmatched = &pending[1];

    let no_course = service.accept(&unmatched.id, AcceptImportRequest::default()).await;
    assert!(matches!(no_course, Err(AppError::BadRequest(_))));

    let wrong_group = service
        .accept(&matched.id, AcceptImportRequest {
            course_id: Some(algebra.id.clone()),
            group_id: Some(art_group.id.clone()),
        })
        .await;
    assert!(matches!(wrong_group, Err(AppError::BadRequest(_))));

    let task = service
        .accept(&unmatched.id, AcceptImportRequest {
            course_id: Some(art.id.clone()),
            group_id: None,
        })
        .await
        .unwrap();
    assert_eq!(task.course_id, art.id);
    assert_eq!(task.due_date.len(), 10);
}

#[tokio::test]
async fn test_dismiss_removes_candidate_from_pending() {
    let (_db, service) = setup().await;
    service.scan(&ImportSettings::default().query()).await.unwrap();
    let candidate = service.pending().await.unwrap().remove(0);

    let dismissed = service.dismiss(&candidate.id).await.unwrap();
    assert_eq!(dismissed.status, "dismissed");
    assert_eq!(service.pending().await.unwrap().len(), 1);

    assert!(matches!(service.dismiss("missing").await, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_scheduler_runs_scans_on_interval() {
    let db = db::connect_in_memory()
        .await
        .expect("Failed to create database");
    let mail = Arc::new(FakeMail {
        messages: vec![message("m1", "Problem Set 5", "linear algebra")],
        skipped: 0,
    });

    let scheduler = ImportScheduler::new(db.clone(), mail, Arc::new(FakeExtractor), ImportSettings::default(), 1);
    assert_eq!(scheduler.interval(), Duration::from_secs(1));

    let scheduler_task = tokio::spawn(scheduler.start());
    tokio::time::sleep(Duration::from_millis(1500)).await;
    scheduler_task.abort();
    let _ = scheduler_task.await;

    let pending = repository::fetch_pending_candidates(&db).await.unwrap();
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored (needs GMAIL_ACCESS_TOKEN)
async fn test_live_gmail_fetch() {
    dotenvy::dotenv().ok();

    let config = GmailConfig::new_from_env().expect("Failed to load Gmail config");
    let client = GmailHttpClient::new(config).expect("Failed to create Gmail client");

    let fetched = client
        .fetch_messages(&MailQuery::recent(7, 5))
        .await
        .expect("Failed to fetch messages");

    println!("skipped {} messages", fetched.skipped);
    for message in &fetched.messages {
        println!("{} | {} | {}", message.date, message.from, message.subject);
    }
}
