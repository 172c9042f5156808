use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::AppError;
use crate::extract::AssignmentExtractor;
use crate::mail::MailClient;
use crate::services::import_service::{ImportService, ImportSettings, ImportStats};

/// Periodically scans the mailbox for new assignments.
pub struct ImportScheduler {
    db: SqlitePool,
    mail: Arc<dyn MailClient>,
    extractor: Arc<dyn AssignmentExtractor>,
    settings: ImportSettings,
    interval: Duration,
}

impl ImportScheduler {
    pub fn new(
        db: SqlitePool,
        mail: Arc<dyn MailClient>,
        extractor: Arc<dyn AssignmentExtractor>,
        settings: ImportSettings,
        interval_secs: u64,
    ) -> Self {
        Self {
            db,
            mail,
            extractor,
            settings,
            interval: Duration::from_secs(interval_secs),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs forever; a failed scan is logged and the next one still happens.
    pub async fn start(self) {
        info!("Starting import scheduler (interval: {:?})", self.interval);

        loop {
            tokio::time::sleep(self.interval).await;

            match self.run_scan().await {
                Ok(stats) => {
                    info!(
                        "Scheduled import finished - messages: {} (failed {}) | candidates: {} new, {} duplicate",
                        stats.messages_fetched,
                        stats.messages_failed,
                        stats.candidates_stored,
                        stats.duplicates_skipped
                    );
                }
                Err(e) => {
                    warn!("Scheduled import failed: {:?}", e);
                }
            }
        }
    }

    pub async fn run_scan(&self) -> Result<ImportStats, AppError> {
        let service = ImportService::new(
            self.db.clone(),
            self.mail.clone(),
            self.extractor.clone(),
            self.settings.clone(),
        );
        service.scan(&self.settings.query()).await
    }
}
