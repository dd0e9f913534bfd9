use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::info;
use uuid::Uuid;

use super::{Session, SessionError, SessionStore, SessionUpdate};

const KEY_PREFIX: &str = "mockmate:session:";

/// Redis-backed store. Every write sets `EX`, so expiry is left to the server.
///
/// `update` is a plain read-modify-write: concurrent updates to one session race and the
/// last write wins.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: MultiplexedConnection,
    ttl_secs: u64,
}

impl RedisSessionStore {
    pub async fn connect(url: &str, ttl: Duration) -> Result<Self, SessionError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        info!("Redis session store connected");
        Ok(Self {
            conn,
            ttl_secs: ttl.as_secs().max(1),
        })
    }

    async fn write(&self, session: &Session) -> Result<(), SessionError> {
        let payload = serde_json::to_string(session)?;
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(session_key(session.id), payload, self.ttl_secs)
            .await?;
        Ok(())
    }

    async fn read(&self, id: Uuid) -> Result<Option<Session>, SessionError> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(session_key(id)).await?;
        payload
            .map(|raw| serde_json::from_str::<Session>(&raw))
            .transpose()
            .map_err(SessionError::from)
    }
}

fn session_key(id: Uuid) -> String {
    format!("{KEY_PREFIX}{id}")
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, resume_text: String) -> Result<Session, SessionError> {
        let session = Session::new(resume_text);
        self.write(&session).await?;
        Ok(session)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Session>, SessionError> {
        let session = self.read(id).await?;
        if session.is_some() {
            let mut conn = self.conn.clone();
            conn.expire::<_, ()>(session_key(id), self.ttl_secs as i64)
                .await?;
        }
        Ok(session)
    }

    async fn update(&self, id: Uuid, update: SessionUpdate) -> Result<Session, SessionError> {
        let mut session = self.read(id).await?.ok_or(SessionError::NotFound(id))?;
        session.apply(update);
        self.write(&session).await?;
        Ok(session)
    }

    async fn purge_expired(&self) -> Result<usize, SessionError> {
        Ok(0)
    }
}
