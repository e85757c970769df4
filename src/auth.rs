use std::sync::Arc;

use axum::http::StatusCode;
use axum::{Extension, Json};
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::Pbkdf2;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::models::StudentData;
use crate::state::AppState;
use crate::storage::Storage;
use crate::{body_or_default, proceeds, Error, Message, Payload};

#[derive(Debug, Clone, Copy, Eq, Ord, PartialOrd, PartialEq)]
pub enum AuthResult {
    Success,
    /// Matched a plaintext entry, which has now been replaced by a hash.
    Upgraded,
}

pub struct CredentialStore {
    storage: Arc<dyn Storage>,
    users: Mutex<Vec<StudentData>>,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn Storage>, users: Vec<StudentData>) -> Self {
        Self {
            storage,
            users: Mutex::new(users),
        }
    }

    pub async fn register(&self, student_id: &str, password: &str) -> Result<(), Error> {
        if student_id.is_empty() || password.is_empty() {
            return Err(missing_credentials());
        }

        let mut users = self.users.lock().await;
        if users.iter().any(|u| u.student_id == student_id) {
            return Err(Error::conflict("This Student ID is already registered."));
        }

        let user = StudentData {
            student_id: student_id.to_string(),
            password: hash_password(password)?,
        };
        self.storage.upsert_user(&user).await?;
        users.push(user);
        log::info!("Registered student `{}`", student_id);
        Ok(())
    }

    pub async fn login(&self, student_id: &str, password: &str) -> Result<AuthResult, Error> {
        if student_id.is_empty() || password.is_empty() {
            return Err(missing_credentials());
        }

        let mut users = self.users.lock().await;
        let user = match users.iter_mut().find(|u| u.student_id == student_id) {
            Some(user) => user,
            None => return Err(invalid_credentials()),
        };

        let hashed_match = PasswordHash::new(&user.password)
            .ok()
            .map(|hash| Pbkdf2.verify_password(password.as_bytes(), &hash).is_ok());

        match hashed_match {
            Some(true) => Ok(AuthResult::Success),
            Some(false) => Err(invalid_credentials()),
            None => {
                if user.password != password {
                    return Err(invalid_credentials());
                }
                let upgraded = StudentData {
                    student_id: user.student_id.clone(),
                    password: hash_password(password)?,
                };
                self.storage.upsert_user(&upgraded).await?;
                *user = upgraded;
                log::info!("Upgraded plaintext password for `{}`", student_id);
                Ok(AuthResult::Upgraded)
            }
        }
    }
}

fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Pbkdf2.hash_password(password.as_bytes(), &salt)?.to_string())
}

fn missing_credentials() -> Error {
    Error::bad_request("Student ID and password are required.")
}

fn invalid_credentials() -> Error {
    Error::unauthorized("Invalid Student ID or password.")
}

pub async fn register_student(
    Extension(state): Extension<Arc<AppState>>,
    body: Option<Json<Credentials>>,
) -> Result<(StatusCode, Json<Message>), Error> {
    let body = body_or_default(body);
    state
        .credentials
        .register(
            body.student_id.as_deref().unwrap_or_default(),
            body.password.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(Message::new("Registration successful! You can now log in.")),
    ))
}

pub async fn login_student(
    Extension(state): Extension<Arc<AppState>>,
    body: Option<Json<Credentials>>,
) -> Payload<LoggedInStudent> {
    let body = body_or_default(body);
    let student_id = body.student_id.unwrap_or_default();
    state
        .credentials
        .login(&student_id, body.password.as_deref().unwrap_or_default())
        .await?;
    proceeds(LoggedInStudent {
        message: "Login successful!".to_string(),
        student_id,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub student_id: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedInStudent {
    pub message: String,
    pub student_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Database;
    use crate::storage::MemoryStore;

    async fn store_with(users: Vec<StudentData>) -> (Arc<MemoryStore>, CredentialStore) {
        let storage = Arc::new(MemoryStore::with_data(Database {
            attendance: Vec::new(),
            users: users.clone(),
        }));
        let credentials = CredentialStore::new(storage.clone(), users);
        (storage, credentials)
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let (_, credentials) = store_with(Vec::new()).await;
        credentials.register("S1", "pw").await.unwrap();
        let err = credentials.register("S1", "pw2").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn login_checks_password() {
        let (storage, credentials) = store_with(Vec::new()).await;
        credentials.register("S1", "pw").await.unwrap();

        assert_eq!(credentials.login("S1", "pw").await, Ok(AuthResult::Success));
        assert_eq!(
            credentials.login("S1", "wrong").await.unwrap_err().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            credentials.login("S2", "pw").await.unwrap_err().status(),
            StatusCode::UNAUTHORIZED
        );

        let stored = &storage.load_all().await.unwrap().users[0];
        assert_eq!(stored.student_id, "S1");
        assert_ne!(stored.password, "pw");
        assert!(stored.password.starts_with("$pbkdf2"));
    }

    #[tokio::test]
    async fn missing_fields_are_bad_requests() {
        let (_, credentials) = store_with(Vec::new()).await;
        assert_eq!(
            credentials.register("", "pw").await.unwrap_err().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            credentials.register("S1", "").await.unwrap_err().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            credentials.login("S1", "").await.unwrap_err().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn plaintext_entries_are_upgraded_on_login() {
        let legacy = StudentData {
            student_id: "S1".to_string(),
            password: "pw".to_string(),
        };
        let (storage, credentials) = store_with(vec![legacy]).await;

        assert_eq!(
            credentials.login("S1", "wrong").await.unwrap_err().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(credentials.login("S1", "pw").await, Ok(AuthResult::Upgraded));

        let stored = storage.load_all().await.unwrap().users;
        assert_eq!(stored.len(), 1);
        assert!(PasswordHash::new(&stored[0].password).is_ok());

        assert_eq!(credentials.login("S1", "pw").await, Ok(AuthResult::Success));
    }
}
