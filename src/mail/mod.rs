pub mod body;
pub mod dto;

use std::env;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use futures_util::stream::{self, StreamExt};
use reqwest::{Client, Url};
use serde::Serialize;

use crate::config::{non_empty_var, parse_var};
use crate::error::AppError;

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Phrases that make a message worth showing to the extractor.
pub const DEFAULT_KEYWORDS: [&str; 10] = [
    "assignment",
    "homework",
    "due date",
    "project",
    "exam",
    "quiz",
    "midterm",
    "final",
    "problem set",
    "syllabus",
];

#[derive(Debug, Clone, Serialize)]
pub struct MailMessage {
    pub id: String,
    pub subject: String,
    pub from: String,
    pub date: String,
    pub body: String,
    pub snippet: String,
}

#[derive(Debug, Clone)]
pub struct MailQuery {
    pub keywords: Vec<String>,
    pub after: NaiveDate,
    pub max_results: u32,
    /// Replaces the keyword search entirely when set.
    pub raw: Option<String>,
}

impl MailQuery {
    pub fn recent(lookback_days: i64, max_results: u32) -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            after: (Utc::now() - Duration::days(lookback_days)).date_naive(),
            max_results,
            raw: None,
        }
    }

    pub fn to_search_string(&self) -> String {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }
        let keywords = self
            .keywords
            .iter()
            .map(|k| format!("\"{}\"", k))
            .collect::<Vec<_>>()
            .join(" OR ");
        format!("({}) after:{}", keywords, self.after.format("%Y/%m/%d"))
    }
}

#[derive(Debug, Default)]
pub struct FetchedMail {
    pub messages: Vec<MailMessage>,
    /// Listed messages that could not be fetched or parsed.
    pub skipped: usize,
}

impl Extend<Result<MailMessage, AppError>> for FetchedMail {
    fn extend<I: IntoIterator<Item = Result<MailMessage, AppError>>>(&mut self, iter: I) {
        for result in iter {
            match result {
                Ok(message) => self.messages.push(message),
                Err(e) => {
                    tracing::warn!("Skipping message: {}", e);
                    self.skipped += 1;
                }
            }
        }
    }
}

#[async_trait]
pub trait MailClient: Send + Sync {
    async fn fetch_messages(&self, query: &MailQuery) -> Result<FetchedMail, AppError>;
}

#[derive(Clone, Debug)]
pub struct GmailConfig {
    pub access_token: String,
    pub api_base: String,
    pub fetch_concurrency: usize,
}

impl GmailConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let access_token = env::var("GMAIL_ACCESS_TOKEN")
            .map_err(|_| AppError::Config("GMAIL_ACCESS_TOKEN is not set".to_string()))?;
        let api_base = non_empty_var("GMAIL_API_BASE").unwrap_or_else(|| GMAIL_API_BASE.to_string());
        let fetch_concurrency = parse_var::<usize>("MAIL_FETCH_CONCURRENCY")?.unwrap_or(8).max(1);

        Ok(Self {
            access_token,
            api_base,
            fetch_concurrency,
        })
    }
}

pub struct GmailHttpClient {
    client: Client,
    config: GmailConfig,
}

impl GmailHttpClient {
    pub fn new(config: GmailConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    async fn list_message_ids(&self, query: &MailQuery) -> Result<Vec<String>, AppError> {
        let url = Url::parse_with_params(
            &format!("{}/messages", self.config.api_base),
            &[
                ("q", query.to_search_string()),
                ("maxResults", query.max_results.to_string()),
            ],
        )
        .map_err(|e| AppError::Config(format!("Invalid Gmail url: {}", e)))?;

        let response = self.client
            .get(url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Gmail request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("Gmail API error {}: {}", status, body)));
        }

        let parsed: dto::ListMessagesResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse Gmail response: {}", e)))?;

        Ok(parsed.messages.into_iter().map(|m| m.id).collect())
    }

    async fn fetch_message(&self, id: &str) -> Result<MailMessage, AppError> {
        let url = format!("{}/messages/{}?format=full", self.config.api_base, id);

        let response = self.client
            .get(&url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Gmail request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Failed to fetch message {}: {}",
                id,
                response.status()
            )));
        }

        let message: dto::Message = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse message {}: {}", id, e)))?;

        Ok(into_mail_message(message))
    }
}

pub(crate) fn into_mail_message(message: dto::Message) -> MailMessage {
    let payload = message.payload.unwrap_or_default();
    let header = |name: &str| payload.header(name).unwrap_or_default().to_string();

    MailMessage {
        subject: header("Subject"),
        from: header("From"),
        date: header("Date"),
        body: body::extract_body(&payload),
        snippet: message.snippet,
        id: message.id,
    }
}

#[async_trait]
impl MailClient for GmailHttpClient {
    async fn fetch_messages(&self, query: &MailQuery) -> Result<FetchedMail, AppError> {
        let ids = self.list_message_ids(query).await?;
        tracing::debug!("Found {} candidate messages", ids.len());

        let fetched: FetchedMail = stream::iter(ids)
            .map(|id| async move { self.fetch_message(&id).await })
            .buffered(self.config.fetch_concurrency)
            .collect()
            .await;
        Ok(fetched)
    }
}

pub struct NoopMailClient;

#[async_trait]
impl MailClient for NoopMailClient {
    async fn fetch_messages(&self, _query: &MailQuery) -> Result<FetchedMail, AppError> {
        Ok(FetchedMail::default())
    }
}
