//! Per-browser-session state
//!
//! Every session owns its own transcript. A session's transcript lock is
//! held for the whole turn, so at most one completion request is in flight
//! per session and readers never observe a half-finished turn. Sessions do
//! not share any mutable state with each other.
//!
//! A session ends when the page deletes it or, for tabs that vanish without
//! saying goodbye, when it has been idle with no stream subscriber for
//! longer than the configured idle limit.

use crate::orchestrator::TurnOrchestrator;
use crate::transcript::{Transcript, Turn};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;

/// Shortest pause between idle sweeps
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Events pushed to stream subscribers of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Full transcript, sent once when a subscriber connects
    Init { turns: Vec<Turn>, agent_working: bool },
    /// A turn appended to the transcript
    Turn { turn: Turn },
    /// Whether a completion request is in flight
    StateChange { agent_working: bool },
    /// Operator-facing failure detail, never part of the transcript
    Error { message: String },
    /// The current turn finished
    AgentDone,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Message text must not be empty")]
    EmptyMessage,
    #[error("Turn task failed: {0}")]
    Internal(String),
}

/// One browser session
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    transcript: Mutex<Transcript>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    /// Set only by the turn task while a completion request runs
    in_flight: AtomicBool,
    started: Instant,
    /// Milliseconds after `started` of the last request touching the session
    last_active_ms: AtomicU64,
}

impl Session {
    fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(128);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            transcript: Mutex::new(Transcript::seeded()),
            broadcast_tx,
            in_flight: AtomicBool::new(false),
            started: Instant::now(),
            last_active_ms: AtomicU64::new(0),
        }
    }

    /// Snapshot of the full transcript; waits for an in-flight turn to finish
    pub async fn turns(&self) -> Vec<Turn> {
        self.touch();
        self.transcript.lock().await.all().to_vec()
    }

    /// Snapshot the transcript and subscribe to later events atomically.
    ///
    /// Both happen under the transcript lock, so every event the receiver
    /// yields describes a change made after the snapshot.
    pub async fn snapshot_and_subscribe(
        &self,
    ) -> (Vec<Turn>, broadcast::Receiver<SessionEvent>) {
        self.touch();
        let transcript = self.transcript.lock().await;
        let rx = self.broadcast_tx.subscribe();
        (transcript.all().to_vec(), rx)
    }

    /// True while a completion request is running for this session
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Time since the session was last used
    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_active_ms.load(Ordering::Relaxed));
        self.started.elapsed().saturating_sub(last)
    }

    fn touch(&self) {
        let now = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_active_ms.fetch_max(now, Ordering::Relaxed);
    }

    /// Idle past the limit with no open stream and no turn running
    fn is_abandoned(&self, max_idle: Duration) -> bool {
        !self.is_busy()
            && self.broadcast_tx.receiver_count() == 0
            && self.idle_for() >= max_idle
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.broadcast_tx.send(event);
    }
}

/// What one processed message produced
#[derive(Debug, Clone)]
pub struct TurnReport {
    /// Turns appended by this message (user turn, then assistant turn)
    pub appended: Vec<Turn>,
    /// Full transcript after the turn
    pub turns: Vec<Turn>,
    pub operator_error: Option<String>,
}

/// Owns all live sessions
pub struct SessionManager {
    orchestrator: Arc<TurnOrchestrator>,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionManager {
    pub fn new(orchestrator: Arc<TurnOrchestrator>) -> Self {
        Self {
            orchestrator,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn model_id(&self) -> &str {
        self.orchestrator.model_id()
    }

    /// Start a new session with a seeded transcript
    pub async fn create(&self) -> Arc<Session> {
        let session = Arc::new(Session::new());
        let active = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(session.id.clone(), session.clone());
            sessions.len()
        };
        tracing::info!(
            session_id = %session.id,
            created_at = %session.created_at.to_rfc3339(),
            active,
            "Session started"
        );
        session
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// End a session, dropping its transcript. Returns false if unknown.
    pub async fn remove(&self, id: &str) -> bool {
        let (removed, active) = {
            let mut sessions = self.sessions.write().await;
            (sessions.remove(id).is_some(), sessions.len())
        };
        if removed {
            tracing::info!(session_id = %id, active, "Session ended");
        }
        removed
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// End every abandoned session. Returns how many were removed.
    pub async fn expire_idle(&self, max_idle: Duration) -> usize {
        let expired: Vec<String> = {
            let mut sessions = self.sessions.write().await;
            let expired: Vec<String> = sessions
                .values()
                .filter(|s| s.is_abandoned(max_idle))
                .map(|s| s.id.clone())
                .collect();
            for id in &expired {
                sessions.remove(id);
            }
            expired
        };

        if !expired.is_empty() {
            let active = self.count().await;
            tracing::info!(
                expired = expired.len(),
                active,
                "Expired idle sessions"
            );
        }
        expired.len()
    }

    /// Periodically expire abandoned sessions until the manager is dropped
    pub fn spawn_idle_sweeper(self: &Arc<Self>, max_idle: Duration) -> JoinHandle<()> {
        let manager: Weak<Self> = Arc::downgrade(self);
        let period = (max_idle / 4).max(MIN_SWEEP_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                manager.expire_idle(max_idle).await;
            }
            tracing::debug!("Idle session sweeper stopped");
        })
    }

    /// Full transcript of a session
    pub async fn transcript(&self, id: &str) -> Result<Vec<Turn>, SessionError> {
        let session = self.require(id).await?;
        Ok(session.turns().await)
    }

    /// Run one user message through the orchestrator.
    ///
    /// The turn runs on its own task so that a dropped HTTP request cannot
    /// leave a user turn without its assistant turn.
    pub async fn send_message(&self, id: &str, text: &str) -> Result<TurnReport, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let session = self.require(id).await?;
        session.touch();
        let orchestrator = self.orchestrator.clone();
        let text = text.to_string();

        tokio::spawn(async move {
            let mut transcript = session.transcript.lock().await;
            let before = transcript.len();

            tracing::debug!(session_id = %session.id, chars = text.len(), "Handling user message");
            session.in_flight.store(true, Ordering::Release);
            session.publish(SessionEvent::StateChange {
                agent_working: true,
            });

            let outcome = orchestrator
                .handle_user_message(&mut transcript, &text)
                .await;

            let appended = transcript.since(before).to_vec();
            for turn in &appended {
                session.publish(SessionEvent::Turn { turn: turn.clone() });
            }
            let operator_error = outcome.operator_error().map(str::to_string);
            if let Some(message) = &operator_error {
                session.publish(SessionEvent::Error {
                    message: message.clone(),
                });
            }
            session.in_flight.store(false, Ordering::Release);
            session.touch();
            session.publish(SessionEvent::StateChange {
                agent_working: false,
            });
            session.publish(SessionEvent::AgentDone);

            TurnReport {
                appended,
                turns: transcript.all().to_vec(),
                operator_error,
            }
        })
        .await
        .map_err(|e| SessionError::Internal(e.to_string()))
    }

    async fn require(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        self.get(id)
            .await
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }
}
