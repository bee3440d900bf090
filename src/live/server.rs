//! WebSocket endpoint for live sessions.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;

use crate::data::QuizProvider;
use crate::protocol::{ClientMessage, ServerMessage};

use super::{LiveError, LiveRegistry};

/// Shared registry wrapped in Arc<Mutex> for async access.
type SharedRegistry = Arc<Mutex<LiveRegistry>>;

/// Per-connection state: the PINs this connection is allowed to close.
#[derive(Debug, Default)]
pub struct Connection {
    hosted: HashSet<String>,
}

impl Connection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hosts(&self, pin: &str) -> bool {
        self.hosted.contains(pin)
    }

    /// Close every session this connection hosted. Called when the host
    /// goes away so its sessions can be evicted.
    pub fn release(&mut self, registry: &mut LiveRegistry) -> usize {
        let mut closed = 0;
        for pin in self.hosted.drain() {
            if registry.close_session(&pin).is_ok() {
                closed += 1;
            }
        }
        closed
    }
}

/// Run the live-session server until Ctrl-C.
pub async fn run(port: u16, provider: Arc<dyn QuizProvider>) -> std::io::Result<()> {
    let registry: SharedRegistry = Arc::new(Mutex::new(LiveRegistry::new()));

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("live session server listening on {}", addr);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let registry = Arc::clone(&registry);
                    let provider = Arc::clone(&provider);
                    tokio::spawn(handle_connection(stream, peer, registry, provider));
                }
                Err(e) => {
                    tracing::warn!("failed to accept connection: {}", e);
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down live session server");
                break;
            }
        }
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    registry: SharedRegistry,
    provider: Arc<dyn QuizProvider>,
) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::debug!(%peer, "WebSocket handshake failed: {}", e);
            return;
        }
    };
    tracing::debug!(%peer, "connection opened");

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let mut connection = Connection::new();

    if send(&mut ws_sender, &ServerMessage::ConnectionAck).await.is_err() {
        return;
    }

    while let Some(msg) = ws_receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text.to_string(),
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::debug!(%peer, "connection error: {}", e);
                break;
            }
            _ => continue,
        };

        let reply = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(client_msg) => {
                handle_client_message(client_msg, &registry, provider.as_ref(), &mut connection).await
            }
            Err(e) => ServerMessage::Error {
                reason: format!("invalid message: {}", e),
            },
        };

        if send(&mut ws_sender, &reply).await.is_err() {
            break;
        }
    }

    let released = connection.release(&mut *registry.lock().await);
    tracing::debug!(%peer, released, "connection closed");
}

async fn send<S>(sink: &mut S, msg: &ServerMessage) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!("failed to encode server message: {}", e);
            return Err(());
        }
    };
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}

/// Apply one client request to the registry and build the reply.
pub async fn handle_client_message(
    msg: ClientMessage,
    registry: &Mutex<LiveRegistry>,
    provider: &dyn QuizProvider,
    connection: &mut Connection,
) -> ServerMessage {
    match process(msg, registry, provider, connection).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::debug!("request rejected: {}", e);
            ServerMessage::Error {
                reason: e.to_string(),
            }
        }
    }
}

async fn process(
    msg: ClientMessage,
    registry: &Mutex<LiveRegistry>,
    provider: &dyn QuizProvider,
    connection: &mut Connection,
) -> Result<ServerMessage, LiveError> {
    match msg {
        ClientMessage::Host { quiz_id, host_name } => {
            if host_name.trim().is_empty() {
                return Err(LiveError::InvalidNickname("Host name must not be empty"));
            }

            let quiz = provider
                .get_quiz_by_id(&quiz_id)
                .await?
                .ok_or_else(|| LiveError::QuizNotFound(quiz_id.clone()))?;

            let mut registry = registry.lock().await;
            let session = registry.host_session(&quiz.id, &host_name)?;
            connection.hosted.insert(session.pin.clone());
            Ok(ServerMessage::Hosted {
                session: session.summary(),
            })
        }
        ClientMessage::Join { pin, nickname } => {
            let mut registry = registry.lock().await;
            let (player, session) = registry.join_session(&pin, &nickname)?;
            Ok(ServerMessage::Joined {
                pin: session.pin.clone(),
                quiz_id: session.quiz_id.clone(),
                player_id: player.id,
                nickname: player.nickname,
            })
        }
        ClientMessage::Lookup { pin } => {
            let registry = registry.lock().await;
            let session = registry
                .get_session_by_pin(&pin)
                .ok_or_else(|| LiveError::SessionNotFound(pin.clone()))?;
            Ok(ServerMessage::Session {
                session: session.summary(),
            })
        }
        ClientMessage::Close { pin } => {
            if !connection.hosts(&pin) {
                return Err(LiveError::NotHost(pin));
            }
            registry.lock().await.close_session(&pin)?;
            Ok(ServerMessage::Closed { pin })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryBackend;
    use crate::models::Quiz;
    use crate::protocol::LiveStatus;

    fn backend() -> MemoryBackend {
        MemoryBackend::with_quizzes([Quiz::new("quiz-1", "Traits", Vec::new())])
    }

    async fn host(registry: &Mutex<LiveRegistry>, provider: &MemoryBackend, conn: &mut Connection) -> String {
        let reply = handle_client_message(
            ClientMessage::Host {
                quiz_id: "quiz-1".to_string(),
                host_name: "Ms. Frizzle".to_string(),
            },
            registry,
            provider,
            conn,
        )
        .await;
        match reply {
            ServerMessage::Hosted { session } => session.pin,
            other => panic!("expected Hosted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_host_join_lookup() {
        let registry = Mutex::new(LiveRegistry::new());
        let provider = backend();
        let mut host_conn = Connection::new();
        let pin = host(&registry, &provider, &mut host_conn).await;

        let mut guest = Connection::new();
        let joined = handle_client_message(
            ClientMessage::Join {
                pin: pin.clone(),
                nickname: "Arnold".to_string(),
            },
            &registry,
            &provider,
            &mut guest,
        )
        .await;
        assert!(matches!(joined, ServerMessage::Joined { ref quiz_id, .. } if quiz_id == "quiz-1"));

        let lookup = handle_client_message(
            ClientMessage::Lookup { pin: pin.clone() },
            &registry,
            &provider,
            &mut guest,
        )
        .await;
        match lookup {
            ServerMessage::Session { session } => {
                assert_eq!(session.players, vec!["Arnold".to_string()]);
                assert_eq!(session.status, LiveStatus::Open);
            }
            other => panic!("expected Session, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_host_unknown_quiz() {
        let registry = Mutex::new(LiveRegistry::new());
        let reply = handle_client_message(
            ClientMessage::Host {
                quiz_id: "missing".to_string(),
                host_name: "host".to_string(),
            },
            &registry,
            &backend(),
            &mut Connection::new(),
        )
        .await;
        assert!(matches!(reply, ServerMessage::Error { .. }));
        assert!(registry.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_only_host_can_close() {
        let registry = Mutex::new(LiveRegistry::new());
        let provider = backend();
        let mut host_conn = Connection::new();
        let pin = host(&registry, &provider, &mut host_conn).await;

        let denied = handle_client_message(
            ClientMessage::Close { pin: pin.clone() },
            &registry,
            &provider,
            &mut Connection::new(),
        )
        .await;
        assert!(matches!(denied, ServerMessage::Error { .. }));

        let closed = handle_client_message(
            ClientMessage::Close { pin: pin.clone() },
            &registry,
            &provider,
            &mut host_conn,
        )
        .await;
        assert!(matches!(closed, ServerMessage::Closed { .. }));

        let late = handle_client_message(
            ClientMessage::Join {
                pin,
                nickname: "Wanda".to_string(),
            },
            &registry,
            &provider,
            &mut Connection::new(),
        )
        .await;
        match late {
            ServerMessage::Error { reason } => assert!(reason.contains("closed")),
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_release_closes_hosted_sessions() {
        let registry = Mutex::new(LiveRegistry::new());
        let provider = backend();
        let mut host_conn = Connection::new();
        let first = host(&registry, &provider, &mut host_conn).await;
        let second = host(&registry, &provider, &mut host_conn).await;
        let other = host(&registry, &provider, &mut Connection::new()).await;

        assert_eq!(host_conn.release(&mut *registry.lock().await), 2);
        assert!(!host_conn.hosts(&first));

        let registry = registry.lock().await;
        for pin in [&first, &second] {
            assert_eq!(
                registry.get_session_by_pin(pin).map(|s| s.status),
                Some(LiveStatus::Closed)
            );
        }
        assert!(registry.get_session_by_pin(&other).is_some_and(|s| s.is_open()));
    }
}
