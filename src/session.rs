use std::sync::Arc;

use axum::extract::Query;
use axum::{Extension, Json};
use chrono::{DateTime, Duration, Utc};
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::models::ClassSession;
use crate::state::AppState;
use crate::{body_or_default, proceeds, Error, Payload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// No session was ever started, or the token belongs to a superseded one.
    NotFound,
    Expired,
}

/// Holds the one classroom session that can be live at a time. Starting a new
/// session replaces the previous one; expiry is checked lazily on each lookup.
#[derive(Debug)]
pub struct SessionManager {
    validity: Duration,
    active: RwLock<Option<ClassSession>>,
}

impl SessionManager {
    pub fn new(validity: Duration) -> Self {
        Self {
            validity,
            active: RwLock::new(None),
        }
    }

    pub async fn start_session(&self, subject: &str) -> Result<String, Error> {
        self.start_session_at(subject, Utc::now()).await
    }

    pub async fn start_session_at(&self, subject: &str, now: DateTime<Utc>) -> Result<String, Error> {
        if subject.is_empty() {
            return Err(Error::bad_request("Subject is required."));
        }

        let token = generate_token();
        let session = ClassSession {
            token: token.clone(),
            subject: subject.to_string(),
            expires_at: now + self.validity,
        };
        log::info!(
            "Started session for `{}`, expires at {}",
            session.subject,
            session.expires_at
        );
        *self.active.write().await = Some(session);
        Ok(token)
    }

    /// Returns the subject of the live session owning `token`.
    pub async fn verify(&self, token: &str) -> Result<String, SessionError> {
        self.verify_at(token, Utc::now()).await
    }

    pub async fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, SessionError> {
        let guard = self.active.read().await;
        let session = match guard.as_ref() {
            Some(session) if session.token == token => session,
            _ => return Err(SessionError::NotFound),
        };
        if now > session.expires_at {
            return Err(SessionError::Expired);
        }
        Ok(session.subject.clone())
    }
}

// 128 bits, hex-encoded
fn generate_token() -> String {
    let bytes: [u8; 16] = thread_rng().gen();
    hex::encode(bytes)
}

pub async fn start_session(
    Extension(state): Extension<Arc<AppState>>,
    body: Option<Json<StartSession>>,
) -> Payload<SessionStarted> {
    let subject = body_or_default(body).subject.unwrap_or_default();
    let token = state.sessions.start_session(&subject).await?;
    proceeds(SessionStarted { token })
}

pub async fn verify_token(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Payload<VerifiedSession> {
    let token = query.token.unwrap_or_default();
    match state.sessions.verify(&token).await {
        Ok(subject) => proceeds(VerifiedSession { subject }),
        Err(SessionError::NotFound) => Err(Error::not_found("Invalid session token.")),
        Err(SessionError::Expired) => Err(Error::gone("Session has expired.")),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartSession {
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStarted {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedSession {
    pub subject: String,
}
