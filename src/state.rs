use std::sync::Arc;

use sqlx::SqlitePool;

use crate::extract::AssignmentExtractor;
use crate::mail::MailClient;
use crate::services::ImportSettings;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub mail: Arc<dyn MailClient>,
    pub extractor: Arc<dyn AssignmentExtractor>,
    pub import: ImportSettings,
}
