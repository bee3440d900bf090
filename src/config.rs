//! Command-line configuration. Every backend and generator setting can also
//! come from the environment.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::data::{JsonFileProvider, JsonLinesSink, MemoryBackend, QuizProvider, RestBackend, RestConfig, ResultSink};
use crate::engine::{SessionSettings, DEFAULT_QUESTION_SECS};
use crate::generator::{GeneratorConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::models::Participant;
use crate::protocol::DEFAULT_PORT;
use crate::QuizError;

/// Upper bound for `--question-seconds`.
pub const MAX_QUESTION_SECS: i64 = 3600;

#[derive(Parser, Debug)]
#[command(name = "quizline", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub backend: BackendArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Take a quiz in the terminal
    Play(PlayArgs),
    /// Run the live-session host/join endpoint
    Serve(ServeArgs),
    /// Generate quiz questions on a topic
    Generate(GenerateArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct BackendArgs {
    /// Base URL of the hosted backend
    #[arg(long, env = "QUIZLINE_BACKEND_URL", global = true)]
    pub backend_url: Option<String>,

    /// API key for the hosted backend
    #[arg(long, env = "QUIZLINE_BACKEND_KEY", hide_env_values = true, global = true)]
    pub backend_key: Option<String>,
}

impl BackendArgs {
    pub fn rest_config(&self) -> Option<RestConfig> {
        let url = self.backend_url.as_deref().filter(|u| !u.trim().is_empty())?;
        Some(RestConfig::new(url, self.backend_key.clone().unwrap_or_default()))
    }
}

#[derive(Args, Debug, Clone)]
pub struct PlayArgs {
    /// Id of the quiz to take
    #[arg(short, long)]
    pub quiz: String,

    /// JSON file to load quizzes from instead of the backend
    #[arg(long)]
    pub questions: Option<PathBuf>,

    /// Nickname shown on results
    #[arg(short, long)]
    pub nickname: Option<String>,

    /// Authenticated user id to attach to results
    #[arg(long, requires = "nickname")]
    pub user_id: Option<String>,

    /// Append results to this JSON lines file instead of the backend
    #[arg(long)]
    pub results: Option<PathBuf>,

    /// Seconds allowed per question
    #[arg(
        long,
        default_value_t = DEFAULT_QUESTION_SECS,
        value_parser = clap::value_parser!(u32).range(1..=MAX_QUESTION_SECS)
    )]
    pub question_seconds: u32,

    /// Pause after each answer, in milliseconds
    #[arg(long, default_value_t = 2500)]
    pub lock_delay_ms: u64,

    /// Where to write logs while the terminal is in use
    #[arg(long, default_value = "quizline.log")]
    pub log_file: PathBuf,
}

impl PlayArgs {
    pub fn settings(&self) -> SessionSettings {
        SessionSettings {
            question_secs: self.question_seconds,
            lock_delay: Duration::from_millis(self.lock_delay_ms),
        }
    }

    pub fn participant(&self) -> Participant {
        let nickname = self
            .nickname
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("guest");

        match &self.user_id {
            Some(id) => Participant::user(id.clone(), nickname),
            None => Participant::guest(nickname),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// JSON file to load quizzes from instead of the backend
    #[arg(long)]
    pub questions: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Topic the questions should cover
    #[arg(short, long)]
    pub topic: String,

    /// Number of questions
    #[arg(short, long, default_value_t = 5)]
    pub count: usize,

    /// API key for the generative model
    #[arg(long, env = "QUIZLINE_AI_KEY", hide_env_values = true)]
    pub ai_key: Option<String>,

    #[arg(long, env = "QUIZLINE_AI_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub ai_endpoint: String,

    #[arg(long, env = "QUIZLINE_AI_MODEL", default_value = DEFAULT_MODEL)]
    pub ai_model: String,
}

impl GenerateArgs {
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            api_key: self.ai_key.clone(),
            endpoint: self.ai_endpoint.clone(),
            model: self.ai_model.clone(),
        }
    }
}

/// Quiz source: the JSON file when given, else the hosted backend.
pub fn quiz_provider(
    questions: Option<&PathBuf>,
    backend: &BackendArgs,
) -> Result<Arc<dyn QuizProvider>, QuizError> {
    if let Some(path) = questions {
        return Ok(Arc::new(JsonFileProvider::new(path)));
    }

    match backend.rest_config() {
        Some(config) => Ok(Arc::new(RestBackend::new(config)?)),
        None => Err(QuizError::Config(
            "no quiz source: pass --questions or set QUIZLINE_BACKEND_URL".to_string(),
        )),
    }
}

/// Result destination: the JSON lines file when given, else the hosted
/// backend, else results are only kept in memory.
pub fn result_sink(results: Option<&PathBuf>, backend: &BackendArgs) -> Result<Arc<dyn ResultSink>, QuizError> {
    if let Some(path) = results {
        return Ok(Arc::new(JsonLinesSink::new(path)));
    }

    match backend.rest_config() {
        Some(config) => Ok(Arc::new(RestBackend::new(config)?)),
        None => {
            tracing::info!("no result destination configured; results will not be persisted");
            Ok(Arc::new(MemoryBackend::new()))
        }
    }
}
