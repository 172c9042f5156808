use std::env;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::non_empty_var;
use crate::error::AppError;
use crate::mail::MailMessage;
use crate::models::Course;

use super::dto::{ChatMessage, ChatRequest, ChatResponse, ResponseFormat};
use super::{parse_extraction, AssignmentExtractor, ExtractedAssignment};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 1000;
const BODY_LIMIT: usize = 3000;

const SYSTEM_PROMPT: &str = r#"You read emails sent to a university student and pull out graded coursework: homework, exams, quizzes, projects, problem sets and similar.

Answer with a JSON object of exactly this shape:
{
  "assignments": [
    {
      "title": "Assignment title",
      "description": "Short description or instructions",
      "dueDate": "YYYY-MM-DD or null",
      "courseName": "Course name or code",
      "assignmentType": "homework|exam|quiz|project|problem_set|other",
      "points": number or null,
      "confidence": 0.0 to 1.0
    }
  ]
}

Rules:
- General announcements are not assignments.
- When unsure whether something is an assignment, give it a confidence below 0.5.
- Prefer the course names from the provided list.
- Look for phrases such as "due on", "deadline" or "submit by" when reading dates.
- List every assignment the email mentions.
- With nothing to report, answer {"assignments": []}."#;

#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl OpenAiConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| AppError::Config("OPENAI_API_KEY is not set".to_string()))?;
        let model = non_empty_var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = non_empty_var("OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            api_key,
            model,
            base_url,
        })
    }
}

pub struct OpenAiExtractor {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiExtractor {
    pub fn new(config: OpenAiConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }
}

pub(crate) fn build_user_prompt(message: &MailMessage, courses: &[Course]) -> String {
    let mut body: String = message.body.chars().take(BODY_LIMIT).collect();
    if message.body.chars().count() > BODY_LIMIT {
        body.push_str(" ...");
    }

    let course_list = if courses.is_empty() {
        "None".to_string()
    } else {
        courses
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "Find the course assignments in this email.\n\n\
         From: {}\nSubject: {}\nDate: {}\n\n\
         Body:\n{}\n\n\
         Existing courses:\n{}\n\n\
         For each assignment give its title, description, due date (YYYY-MM-DD), course name, \
         assignment type, points and your confidence that it really is an assignment.",
        message.from, message.subject, message.date, body, course_list
    )
}

#[async_trait]
impl AssignmentExtractor for OpenAiExtractor {
    async fn extract(
        &self,
        message: &MailMessage,
        courses: &[Course],
    ) -> Result<Vec<ExtractedAssignment>, AppError> {
        debug!("Extracting assignments from message {}", message.id);

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_user_prompt(message, courses),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            response_format: ResponseFormat::json_object(),
        };

        let response = self.client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("OpenAI request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("OpenAI API error {}: {}", status, body)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse OpenAI response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::Upstream("No response from language model".to_string()))?;

        parse_extraction(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body: String) -> MailMessage {
        MailMessage {
            id: "m1".to_string(),
            subject: "Homework 4".to_string(),
            from: "prof@example.edu".to_string(),
            date: "Mon, 12 Oct 2026 09:00:00 -0400".to_string(),
            body,
            snippet: String::new(),
        }
    }

    #[test]
    fn long_bodies_are_truncated() {
        let prompt = build_user_prompt(&message("x".repeat(BODY_LIMIT + 10)), &[]);
        assert!(prompt.contains(&format!("{} ...", "x".repeat(BODY_LIMIT))));
        assert!(!prompt.contains(&"x".repeat(BODY_LIMIT + 1)));
        assert!(prompt.contains("Existing courses:\nNone"));
    }

    #[test]
    fn short_bodies_are_kept_whole() {
        let prompt = build_user_prompt(&message("Due Friday".to_string()), &[]);
        assert!(prompt.contains("Body:\nDue Friday\n"));
        assert!(prompt.contains("Subject: Homework 4"));
    }

    #[test]
    fn request_uses_json_mode() {
        let request = ChatRequest {
            model: DEFAULT_MODEL,
            messages: Vec::new(),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            response_format: ResponseFormat::json_object(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 1000);
    }
}
