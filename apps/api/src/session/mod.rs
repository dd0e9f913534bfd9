//! Interview sessions: résumé text plus the company/role/questions chosen along the way.
//!
//! Sessions are ephemeral. Both backends expire them after a TTL that slides on access.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

pub mod memory;
pub mod redis_store;

pub use memory::InMemorySessionStore;
pub use redis_store::RedisSessionStore;

/// Only the most recent reviews are kept.
pub const MAX_REVIEWS: usize = 20;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session {0} not found")]
    NotFound(Uuid),

    #[error("Session backend error: {0}")]
    Backend(String),

    #[error("Session encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl From<redis::RedisError> for SessionError {
    fn from(e: redis::RedisError) -> Self {
        SessionError::Backend(e.to_string())
    }
}

/// A scored answer kept alongside the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub question: String,
    pub score: u8,
    pub feedback: Vec<String>,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub resume_text: String,
    pub company: Option<String>,
    pub role: Option<String>,
    pub questions: Vec<String>,
    #[serde(default)]
    pub reviews: Vec<ReviewRecord>,
    pub created_at: DateTime<Utc>,
}

/// Where a session is in the upload → job → practice flow. Derived, never enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    Created,
    JobSelected,
    QuestionGenerated,
    AnswerReviewed,
}

impl Session {
    pub fn new(resume_text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            resume_text,
            company: None,
            role: None,
            questions: Vec::new(),
            reviews: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn stage(&self) -> SessionStage {
        if !self.reviews.is_empty() {
            SessionStage::AnswerReviewed
        } else if !self.questions.is_empty() {
            SessionStage::QuestionGenerated
        } else if self.company.is_some() && self.role.is_some() {
            SessionStage::JobSelected
        } else {
            SessionStage::Created
        }
    }

    /// Applies a partial update. Each provided field overwrites the stored one.
    pub fn apply(&mut self, update: SessionUpdate) {
        if let Some(company) = update.company {
            self.company = Some(company);
        }
        if let Some(role) = update.role {
            self.role = Some(role);
        }
        if let Some(questions) = update.questions {
            self.questions = questions;
        }
        if let Some(review) = update.review {
            self.reviews.push(review);
            if self.reviews.len() > MAX_REVIEWS {
                let excess = self.reviews.len() - MAX_REVIEWS;
                self.reviews.drain(..excess);
            }
        }
    }
}

/// Partial session update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub company: Option<String>,
    pub role: Option<String>,
    pub questions: Option<Vec<String>>,
    pub review: Option<ReviewRecord>,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, resume_text: String) -> Result<Session, SessionError>;

    /// Unknown and expired ids both return `Ok(None)`.
    async fn get(&self, id: Uuid) -> Result<Option<Session>, SessionError>;

    /// Last write wins; fails with `NotFound` for unknown or expired ids.
    async fn update(&self, id: Uuid, update: SessionUpdate) -> Result<Session, SessionError>;

    /// Drops expired sessions, returning how many were removed.
    async fn purge_expired(&self) -> Result<usize, SessionError>;
}

/// Periodically purges expired sessions until `shutdown` fires.
pub fn spawn_sweeper(
    store: Arc<dyn SessionStore>,
    every: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(n) => debug!("Swept {n} expired sessions"),
                Err(e) => warn!("Session sweep failed: {e}"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(score: u8) -> ReviewRecord {
        ReviewRecord {
            question: "Tell me about a conflict.".to_string(),
            score,
            feedback: vec![],
            reviewed_at: Utc::now(),
        }
    }

    #[test]
    fn test_stage_follows_fields() {
        let mut session = Session::new("resume".to_string());
        assert_eq!(session.stage(), SessionStage::Created);

        session.apply(SessionUpdate {
            company: Some("Acme".to_string()),
            ..Default::default()
        });
        assert_eq!(session.stage(), SessionStage::Created);

        session.apply(SessionUpdate {
            role: Some("SRE".to_string()),
            ..Default::default()
        });
        assert_eq!(session.stage(), SessionStage::JobSelected);

        session.apply(SessionUpdate {
            questions: Some(vec!["Tell me about a conflict.".to_string()]),
            ..Default::default()
        });
        assert_eq!(session.stage(), SessionStage::QuestionGenerated);

        session.apply(SessionUpdate {
            review: Some(review(70)),
            ..Default::default()
        });
        assert_eq!(session.stage(), SessionStage::AnswerReviewed);
    }

    #[test]
    fn test_review_without_question_still_counts_as_reviewed() {
        let mut session = Session::new("resume".to_string());
        session.apply(SessionUpdate {
            review: Some(review(10)),
            ..Default::default()
        });
        assert_eq!(session.stage(), SessionStage::AnswerReviewed);
    }

    #[test]
    fn test_reviews_keep_only_the_most_recent() {
        let mut session = Session::new("resume".to_string());
        for score in 0..(MAX_REVIEWS as u8 + 5) {
            session.apply(SessionUpdate {
                review: Some(review(score)),
                ..Default::default()
            });
        }
        assert_eq!(session.reviews.len(), MAX_REVIEWS);
        assert_eq!(session.reviews[0].score, 5);
        assert_eq!(session.reviews[MAX_REVIEWS - 1].score, MAX_REVIEWS as u8 + 4);
    }

    #[test]
    fn test_apply_overwrites_questions() {
        let mut session = Session::new("resume".to_string());
        session.apply(SessionUpdate {
            questions: Some(vec!["first question here".to_string()]),
            ..Default::default()
        });
        session.apply(SessionUpdate {
            questions: Some(vec!["second question here".to_string()]),
            ..Default::default()
        });
        assert_eq!(session.questions, vec!["second question here".to_string()]);
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = Session::new(String::new());
        let b = Session::new(String::new());
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.to_string().len(), 36);
    }
}
