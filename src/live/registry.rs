//! Live session bookkeeping.
//!
//! Sessions are keyed by a six-digit PIN. This is plain host/join/lookup
//! bookkeeping; nothing is pushed to players when the session changes.
//! Closed sessions stay visible to lookups for [`CLOSED_RETENTION`] and are
//! then evicted, freeing their PIN.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::protocol::{validate_nickname, LiveStatus, SessionSummary};

use super::LiveError;

const PIN_SPACE: u32 = 1_000_000;
const MAX_PIN_ATTEMPTS: usize = 32;

/// How long a closed session can still be looked up.
pub const CLOSED_RETENTION: TimeDelta = TimeDelta::minutes(5);

/// A guest in a live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: Uuid,
    pub nickname: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LiveSession {
    pub id: Uuid,
    pub pin: String,
    pub quiz_id: String,
    pub host: String,
    pub players: Vec<Player>,
    pub status: LiveStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl LiveSession {
    pub fn is_open(&self) -> bool {
        self.status == LiveStatus::Open
    }

    /// Nicknames compare case-insensitively.
    pub fn is_nickname_taken(&self, nickname: &str) -> bool {
        let wanted = nickname.to_lowercase();
        self.players
            .iter()
            .any(|p| p.nickname.to_lowercase() == wanted)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            pin: self.pin.clone(),
            quiz_id: self.quiz_id.clone(),
            host: self.host.clone(),
            players: self.players.iter().map(|p| p.nickname.clone()).collect(),
            status: self.status,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Default)]
pub struct LiveRegistry {
    sessions: HashMap<String, LiveSession>,
}

impl LiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Open a session for `quiz_id` under a fresh PIN.
    pub fn host_session(&mut self, quiz_id: &str, host: &str) -> Result<&LiveSession, LiveError> {
        self.host_session_with(&mut rand::rng(), quiz_id, host)
    }

    pub fn host_session_with<G: Rng>(
        &mut self,
        rng: &mut G,
        quiz_id: &str,
        host: &str,
    ) -> Result<&LiveSession, LiveError> {
        self.prune_closed(Utc::now());

        let pin = (0..MAX_PIN_ATTEMPTS)
            .map(|_| format!("{:06}", rng.random_range(0..PIN_SPACE)))
            .find(|pin| !self.sessions.contains_key(pin))
            .ok_or(LiveError::PinSpaceExhausted)?;

        let session = LiveSession {
            id: Uuid::new_v4(),
            pin: pin.clone(),
            quiz_id: quiz_id.to_string(),
            host: host.trim().to_string(),
            players: Vec::new(),
            status: LiveStatus::Open,
            created_at: Utc::now(),
            closed_at: None,
        };
        tracing::info!(%pin, quiz_id, host = %session.host, "live session hosted");

        Ok(self.sessions.entry(pin).or_insert(session))
    }

    /// Add a guest to an open session.
    pub fn join_session(&mut self, pin: &str, nickname: &str) -> Result<(Player, &LiveSession), LiveError> {
        let session = self
            .sessions
            .get_mut(pin)
            .ok_or_else(|| LiveError::SessionNotFound(pin.to_string()))?;

        if !session.is_open() {
            return Err(LiveError::SessionClosed(pin.to_string()));
        }

        let nickname = nickname.trim();
        validate_nickname(nickname).map_err(LiveError::InvalidNickname)?;

        if session.is_nickname_taken(nickname) {
            return Err(LiveError::NicknameTaken(nickname.to_string()));
        }

        let player = Player {
            id: Uuid::new_v4(),
            nickname: nickname.to_string(),
            joined_at: Utc::now(),
        };
        session.players.push(player.clone());
        tracing::info!(pin, nickname, players = session.players.len(), "player joined");

        Ok((player, &*session))
    }

    pub fn get_session_by_pin(&self, pin: &str) -> Option<&LiveSession> {
        self.sessions.get(pin)
    }

    /// Stop accepting joins. The session stays visible to lookups until
    /// it is pruned. Closing twice is a no-op.
    pub fn close_session(&mut self, pin: &str) -> Result<(), LiveError> {
        self.close_session_at(pin, Utc::now())
    }

    pub fn close_session_at(&mut self, pin: &str, now: DateTime<Utc>) -> Result<(), LiveError> {
        let session = self
            .sessions
            .get_mut(pin)
            .ok_or_else(|| LiveError::SessionNotFound(pin.to_string()))?;

        if session.is_open() {
            session.status = LiveStatus::Closed;
            session.closed_at = Some(now);
            tracing::info!(pin, players = session.players.len(), "live session closed");
        }
        Ok(())
    }

    /// Evict sessions closed for longer than [`CLOSED_RETENTION`].
    /// Returns how many were removed.
    pub fn prune_closed(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, s| s.closed_at.is_none_or(|closed| now - closed < CLOSED_RETENTION));

        let pruned = before - self.sessions.len();
        if pruned > 0 {
            tracing::debug!(pruned, remaining = self.sessions.len(), "evicted closed live sessions");
        }
        pruned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_host_assigns_six_digit_pin() {
        let mut registry = LiveRegistry::new();
        let session = registry.host_session("quiz-1", " Ms. Frizzle ").unwrap();
        assert_eq!(session.pin.len(), 6);
        assert!(session.pin.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(session.host, "Ms. Frizzle");
        assert!(session.is_open());
    }

    #[test]
    fn test_pins_are_unique() {
        let mut registry = LiveRegistry::new();
        let mut rng = StdRng::seed_from_u64(7);
        let mut pins = std::collections::HashSet::new();
        for _ in 0..200 {
            let pin = registry.host_session_with(&mut rng, "quiz", "host").unwrap().pin.clone();
            assert!(pins.insert(pin));
        }
        assert_eq!(registry.len(), 200);
    }

    #[test]
    fn test_join_and_lookup() {
        let mut registry = LiveRegistry::new();
        let pin = registry.host_session("quiz-1", "host").unwrap().pin.clone();

        let (player, session) = registry.join_session(&pin, "  Arnold ").unwrap();
        assert_eq!(player.nickname, "Arnold");
        assert_eq!(session.players.len(), 1);

        let found = registry.get_session_by_pin(&pin).unwrap();
        assert_eq!(found.summary().players, vec!["Arnold".to_string()]);
        assert!(registry.get_session_by_pin("000000x").is_none());
    }

    #[test]
    fn test_join_rejections() {
        let mut registry = LiveRegistry::new();
        let pin = registry.host_session("quiz-1", "host").unwrap().pin.clone();
        registry.join_session(&pin, "Arnold").unwrap();

        assert!(matches!(
            registry.join_session(&pin, "arnold"),
            Err(LiveError::NicknameTaken(_))
        ));
        assert!(matches!(
            registry.join_session(&pin, "ab"),
            Err(LiveError::InvalidNickname(_))
        ));
        assert!(matches!(
            registry.join_session("nope", "Wanda"),
            Err(LiveError::SessionNotFound(_))
        ));

        registry.close_session(&pin).unwrap();
        assert!(matches!(
            registry.join_session(&pin, "Wanda"),
            Err(LiveError::SessionClosed(_))
        ));
        assert_eq!(
            registry.get_session_by_pin(&pin).map(|s| s.status),
            Some(LiveStatus::Closed)
        );
    }

    #[test]
    fn test_closed_sessions_are_evicted_after_retention() {
        let mut registry = LiveRegistry::new();
        let closed_at = Utc::now();
        for _ in 0..1000 {
            let pin = registry.host_session("quiz", "host").unwrap().pin.clone();
            registry.close_session_at(&pin, closed_at).unwrap();
        }
        let open = registry.host_session("quiz", "host").unwrap().pin.clone();

        assert_eq!(registry.prune_closed(closed_at + CLOSED_RETENTION / 2), 0);
        assert_eq!(registry.len(), 1001);

        assert_eq!(registry.prune_closed(closed_at + CLOSED_RETENTION), 1000);
        assert_eq!(registry.len(), 1);
        assert!(registry.get_session_by_pin(&open).is_some_and(LiveSession::is_open));
    }

    #[test]
    fn test_hosting_prunes_expired_sessions() {
        let mut registry = LiveRegistry::new();
        let stale = registry.host_session("quiz", "host").unwrap().pin.clone();
        registry
            .close_session_at(&stale, Utc::now() - CLOSED_RETENTION - TimeDelta::seconds(1))
            .unwrap();

        registry.host_session("quiz", "host").unwrap();
        assert!(registry.get_session_by_pin(&stale).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_closing_twice_keeps_first_close_time() {
        let mut registry = LiveRegistry::new();
        let pin = registry.host_session("quiz", "host").unwrap().pin.clone();
        let first = Utc::now() - TimeDelta::minutes(1);
        registry.close_session_at(&pin, first).unwrap();
        registry.close_session(&pin).unwrap();

        assert_eq!(registry.get_session_by_pin(&pin).and_then(|s| s.closed_at), Some(first));
    }
}
