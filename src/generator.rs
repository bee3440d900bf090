//! AI-assisted question generation.
//!
//! The client is built once from configuration into a [`GeneratorService`],
//! which is either ready or records why it is unavailable. Callers get it by
//! reference; nothing here is global.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AnswerOption, Question};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const MAX_QUESTIONS: usize = 20;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("question generator unavailable: {0}")]
    Unavailable(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generator answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

pub enum GeneratorService {
    Ready(GeneratorClient),
    Unavailable(String),
}

impl GeneratorService {
    pub fn from_config(config: GeneratorConfig) -> Self {
        let Some(api_key) = config.api_key.filter(|k| !k.trim().is_empty()) else {
            tracing::info!("no generator API key configured; question generation disabled");
            return Self::Unavailable("no API key configured".to_string());
        };

        match Client::builder().timeout(REQUEST_TIMEOUT).build() {
            Ok(http_client) => Self::Ready(GeneratorClient {
                http_client,
                api_key,
                endpoint: config.endpoint,
                model: config.model,
            }),
            Err(e) => {
                tracing::warn!("failed to build generator HTTP client: {}", e);
                Self::Unavailable(e.to_string())
            }
        }
    }

    pub fn client(&self) -> Result<&GeneratorClient, GenerateError> {
        match self {
            Self::Ready(client) => Ok(client),
            Self::Unavailable(reason) => Err(GenerateError::Unavailable(reason.clone())),
        }
    }
}

pub struct GeneratorClient {
    http_client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// One question as the model writes it.
#[derive(Debug, Deserialize)]
pub struct GeneratedQuestion {
    pub question: Option<String>,
    pub options: Option<Vec<String>>,
    #[serde(alias = "correctIndex", alias = "correct_answer")]
    pub correct_index: Option<usize>,
}

impl GeneratorClient {
    /// Ask the model for `count` multiple-choice questions about `topic`.
    pub async fn generate(&self, topic: &str, count: usize) -> Result<Vec<Question>, GenerateError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(GenerateError::InvalidRequest("topic must not be empty".to_string()));
        }
        if count == 0 || count > MAX_QUESTIONS {
            return Err(GenerateError::InvalidRequest(format!(
                "count must be between 1 and {}",
                MAX_QUESTIONS
            )));
        }

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        );
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(build_prompt(topic, count)),
                }],
            }],
        };

        tracing::info!(topic, count, model = %self.model, "generating questions");
        let response = self
            .http_client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GenerateError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = extract_text(&body)?;
        let questions = parse_questions(&text)?;
        if questions.len() != count {
            tracing::warn!(requested = count, received = questions.len(), "generator returned a different number of questions");
        }
        Ok(questions)
    }
}

pub fn build_prompt(topic: &str, count: usize) -> String {
    format!(
        "Write {count} multiple-choice quiz questions about \"{topic}\". \
         Answer with only a JSON array, no commentary. Each element must be an object \
         with fields \"question\" (string), \"options\" (array of 4 strings) and \
         \"correctIndex\" (0-based index of the single correct option)."
    )
}

fn extract_text(body: &str) -> Result<String, GenerateError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| GenerateError::MalformedResponse(format!("invalid response body: {}", e)))?;

    response
        .candidates
        .unwrap_or_default()
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .find_map(|p| p.text)
        .ok_or_else(|| GenerateError::MalformedResponse("response has no text candidate".to_string()))
}

/// Pull the JSON array out of the model's text (it likes code fences) and
/// validate every question in it.
pub fn parse_questions(text: &str) -> Result<Vec<Question>, GenerateError> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return Err(GenerateError::MalformedResponse("no JSON array in generated text".to_string()));
    };
    if end < start {
        return Err(GenerateError::MalformedResponse("no JSON array in generated text".to_string()));
    }

    let generated: Vec<GeneratedQuestion> = serde_json::from_str(&text[start..=end])
        .map_err(|e| GenerateError::MalformedResponse(format!("invalid question array: {}", e)))?;

    generated
        .into_iter()
        .enumerate()
        .map(|(i, g)| into_question(i, g))
        .collect()
}

fn into_question(position: usize, generated: GeneratedQuestion) -> Result<Question, GenerateError> {
    let malformed = |what: &str| GenerateError::MalformedResponse(format!("question {}: {}", position + 1, what));

    let prompt = generated
        .question
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| malformed("missing question text"))?;
    let options = generated.options.ok_or_else(|| malformed("missing options"))?;
    if options.len() < 2 {
        return Err(malformed("needs at least two options"));
    }
    let correct = generated
        .correct_index
        .filter(|i| *i < options.len())
        .ok_or_else(|| malformed("correct index missing or out of range"))?;

    let options = options
        .into_iter()
        .enumerate()
        .map(|(i, text)| AnswerOption::new(Uuid::new_v4().to_string(), text, i == correct))
        .collect();
    Ok(Question::new(Uuid::new_v4().to_string(), prompt, options))
}
