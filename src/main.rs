use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gradebook::api::router;
use gradebook::config::AppConfig;
use gradebook::db;
use gradebook::extract::{AssignmentExtractor, NoopExtractor, OpenAiConfig, OpenAiExtractor};
use gradebook::mail::{GmailConfig, GmailHttpClient, MailClient, NoopMailClient};
use gradebook::services::ImportScheduler;
use gradebook::state::AppState;

fn mail_client() -> Arc<dyn MailClient> {
    match GmailConfig::new_from_env().and_then(GmailHttpClient::new) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!("Mail import disabled: {}", e);
            Arc::new(NoopMailClient)
        }
    }
}

fn extractor() -> Arc<dyn AssignmentExtractor> {
    match OpenAiConfig::new_from_env().and_then(OpenAiExtractor::new) {
        Ok(extractor) => Arc::new(extractor),
        Err(e) => {
            warn!("Assignment extraction disabled: {}", e);
            Arc::new(NoopExtractor)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "gradebook=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::new_from_env()?;
    let pool = db::connect(&config.database_url).await?;

    let state = AppState {
        db: pool.clone(),
        mail: mail_client(),
        extractor: extractor(),
        import: config.import.clone(),
    };

    if let Some(interval_secs) = config.import_interval_secs {
        let scheduler = ImportScheduler::new(
            pool.clone(),
            state.mail.clone(),
            state.extractor.clone(),
            config.import.clone(),
            interval_secs,
        );
        tokio::spawn(scheduler.start());
    }

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
