//! Short-lived server-side record of one generation cycle, so pages hand each
//! other a session id instead of the full payload.

use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::scenario::{self, FormInput, Scenario};
use crate::video::VideoResult;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: Uuid,
    pub form: FormInput,
    pub scenarios: Vec<Scenario>,
    pub videos: Option<Vec<VideoResult>>,
    #[serde(skip)]
    expires_at: Instant,
}

impl Session {
    pub fn selected(&self) -> Vec<Scenario> {
        self.scenarios.iter().filter(|s| s.selected).cloned().collect()
    }
}

pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn create(&self, form: FormInput, scenarios: Vec<Scenario>) -> Session {
        let session = Session {
            session_id: Uuid::new_v4(),
            form,
            scenarios,
            videos: None,
            expires_at: Instant::now() + self.ttl,
        };
        self.sessions
            .write()
            .await
            .insert(session.session_id, session.clone());
        session
    }

    /// Live session by id; expired entries read as missing.
    pub async fn get(&self, id: Uuid) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&id)
            .filter(|s| s.expires_at > Instant::now())
            .cloned()
    }

    /// Runs `f` on a live session, refreshing its expiry.
    async fn update<T>(&self, id: Uuid, f: impl FnOnce(&mut Session) -> T) -> Option<T> {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        let session = sessions.get_mut(&id).filter(|s| s.expires_at > now)?;
        session.expires_at = now + self.ttl;
        Some(f(session))
    }

    /// Replaces the selection and returns the updated session.
    pub async fn set_selection(&self, id: Uuid, ids: &[i64]) -> Option<Session> {
        self.update(id, |session| {
            scenario::apply_selection(&mut session.scenarios, ids);
            session.clone()
        })
        .await
    }

    pub async fn record_videos(&self, id: Uuid, videos: Vec<VideoResult>) -> Option<()> {
        self.update(id, |session| session.videos = Some(videos)).await
    }

    /// Drops expired sessions; returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        let removed = before - sessions.len();
        if removed > 0 {
            debug!("Purged {} expired sessions", removed);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
