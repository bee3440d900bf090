//! Client for the hosted REST backend (PostgREST-style table endpoints).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};

use crate::models::{AttemptResult, Quiz};

use super::{decode_quiz_rows, AttemptRow, BackendError, QuizProvider, ResultSink};

const QUIZ_SELECT: &str = "id,title,questions(id,prompt,position,options(id,text,is_correct))";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct RestConfig {
    pub base_url: String,
    pub api_key: String,
    pub quizzes_table: String,
    pub attempts_table: String,
}

impl RestConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            quizzes_table: "quizzes".to_string(),
            attempts_table: "quiz_attempts".to_string(),
        }
    }
}

pub struct RestBackend {
    config: RestConfig,
    http_client: Client,
}

impl RestBackend {
    pub fn new(config: RestConfig) -> Result<Self, BackendError> {
        let http_client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            table
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }
}

async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl QuizProvider for RestBackend {
    async fn get_quiz_by_id(&self, id: &str) -> Result<Option<Quiz>, BackendError> {
        let url = self.table_url(&self.config.quizzes_table);
        tracing::debug!(%url, quiz_id = id, "fetching quiz");

        let request = self
            .http_client
            .get(&url)
            .query(&[("id", format!("eq.{}", id)), ("select", QUIZ_SELECT.to_string())]);
        let response = check_status(self.authorized(request).send().await?).await?;
        let body = response.text().await?;

        let mut quizzes = decode_quiz_rows(&body)?;
        if quizzes.len() > 1 {
            return Err(BackendError::malformed(format!(
                "expected at most one quiz with id {}, got {}",
                id,
                quizzes.len()
            )));
        }
        Ok(quizzes.pop())
    }
}

#[async_trait]
impl ResultSink for RestBackend {
    async fn submit_attempt_result(&self, result: &AttemptResult) -> Result<(), BackendError> {
        let url = self.table_url(&self.config.attempts_table);
        let request = self
            .http_client
            .post(&url)
            .header("Prefer", "return=minimal")
            .json(&AttemptRow::from(result));

        check_status(self.authorized(request).send().await?).await?;
        tracing::debug!(quiz_id = %result.quiz_id, "attempt result stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url_trims_trailing_slash() {
        let backend = RestBackend::new(RestConfig::new("https://db.example.com/", "key")).unwrap();
        assert_eq!(
            backend.table_url("quizzes"),
            "https://db.example.com/rest/v1/quizzes"
        );
    }

    #[test]
    fn test_default_tables() {
        let config = RestConfig::new("https://db.example.com", "key");
        assert_eq!(config.quizzes_table, "quizzes");
        assert_eq!(config.attempts_table, "quiz_attempts");
    }
}
