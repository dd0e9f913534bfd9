use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use super::{Session, SessionError, SessionStore, SessionUpdate};

struct Entry {
    session: Session,
    expires_at: Instant,
}

/// Process-local store. Expired entries are dropped on access and by the sweeper.
pub struct InMemorySessionStore {
    ttl: Duration,
    entries: RwLock<HashMap<Uuid, Entry>>,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, resume_text: String) -> Result<Session, SessionError> {
        let session = Session::new(resume_text);
        let entry = Entry {
            session: session.clone(),
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().await.insert(session.id, entry);
        Ok(session)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Session>, SessionError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        match entries.get_mut(&id) {
            Some(entry) if entry.expires_at > now => {
                entry.expires_at = now + self.ttl;
                Ok(Some(entry.session.clone()))
            }
            Some(_) => {
                entries.remove(&id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn update(&self, id: Uuid, update: SessionUpdate) -> Result<Session, SessionError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        match entries.get_mut(&id) {
            Some(entry) if entry.expires_at > now => {
                entry.session.apply(update);
                entry.expires_at = now + self.ttl;
                Ok(entry.session.clone())
            }
            Some(_) => {
                entries.remove(&id);
                Err(SessionError::NotFound(id))
            }
            None => Err(SessionError::NotFound(id)),
        }
    }

    async fn purge_expired(&self) -> Result<usize, SessionError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(before - entries.len())
    }
}
