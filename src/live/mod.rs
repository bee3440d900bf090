//! Live ("QuizWith") sessions: host a quiz under a PIN, let guests join by
//! nickname, look sessions up by PIN.

mod registry;
mod server;

use thiserror::Error;

use crate::data::BackendError;

pub use registry::{LiveRegistry, LiveSession, Player};
pub use server::{handle_client_message, run, Connection};

#[derive(Debug, Error)]
pub enum LiveError {
    #[error("no session with PIN {0}")]
    SessionNotFound(String),

    #[error("session {0} is closed")]
    SessionClosed(String),

    #[error("{0}")]
    InvalidNickname(&'static str),

    #[error("nickname {0} is already taken")]
    NicknameTaken(String),

    #[error("quiz not found: {0}")]
    QuizNotFound(String),

    #[error("session {0} was not hosted by this connection")]
    NotHost(String),

    #[error("could not allocate a free PIN")]
    PinSpaceExhausted,

    #[error(transparent)]
    Backend(#[from] BackendError),
}
