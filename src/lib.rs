pub mod attendance;
pub mod auth;
pub mod config;
pub mod err;
pub mod geo;
pub mod io;
pub mod models;
pub mod session;
pub mod state;
pub mod storage;

use std::sync::Arc;

use axum::handler::Handler;
use axum::{routing::get, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};

pub use crate::err::Error;
use crate::state::AppState;

pub type Payload<T> = Result<Json<T>, Error>;

pub fn proceeds<V>(value: V) -> Payload<V>
where
    V: Serialize,
{
    Ok(Json(value))
}

/// Unwraps an optional JSON body. A missing body, a missing
/// `Content-Type` or an undecodable payload all read as `T::default()`, so
/// the handler's own field checks answer with a 400.
pub fn body_or_default<T: Default>(body: Option<Json<T>>) -> T {
    body.map(|Json(value)| value).unwrap_or_default()
}

/// `{"message": ...}` reply body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub base_url: String,
}

async fn client_config(Extension(state): Extension<Arc<AppState>>) -> Payload<ClientConfig> {
    proceeds(ClientConfig {
        base_url: state.config.base_url.clone(),
    })
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/config", get(client_config))
        .route("/teacher/start-session", post(session::start_session))
        .route("/student/verify-token", get(session::verify_token))
        .route("/auth/register", post(auth::register_student))
        .route("/auth/login", post(auth::login_student))
        .route("/get-attendance", get(attendance::get_attendance))
        .route(
            "/get-student-attendance",
            get(attendance::get_student_attendance),
        )
        .route("/mark-attendance", post(attendance::mark_attendance))
        .fallback(err::handler404.into_service())
        .layer(Extension(state))
}
