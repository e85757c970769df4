//! Persistence seam for the ledger and the credential store.
//!
//! [`JsonFileStore`] keeps the whole document in one JSON file and rewrites it
//! on every mutation. [`MemoryStore`] keeps nothing on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::io::{read_io_file, write_io_file};
use crate::models::{AttendanceRecord, Database, StudentData};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O failure: {0}")]
    Io(#[from] anyhow::Error),

    #[error("Malformed document: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn load_all(&self) -> Result<Database, StoreError>;

    async fn append_record(&self, record: &AttendanceRecord) -> Result<(), StoreError>;

    /// Inserts the user, or replaces the entry with the same `student_id`.
    async fn upsert_user(&self, user: &StudentData) -> Result<(), StoreError>;
}

fn upsert(users: &mut Vec<StudentData>, user: &StudentData) {
    match users.iter_mut().find(|u| u.student_id == user.student_id) {
        Some(existing) => *existing = user.clone(),
        None => users.push(user.clone()),
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<Database>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: Database) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn load_all(&self) -> Result<Database, StoreError> {
        Ok(self.data.lock().await.clone())
    }

    async fn append_record(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        self.data.lock().await.attendance.push(record.clone());
        Ok(())
    }

    async fn upsert_user(&self, user: &StudentData) -> Result<(), StoreError> {
        upsert(&mut self.data.lock().await.users, user);
        Ok(())
    }
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: Mutex<Database>,
}

impl JsonFileStore {
    /// Loads the document at `path`. A missing file is an empty document and
    /// is only created on the first write.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let data = match read_io_file(&path).await? {
            Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => {
                serde_json::from_slice(&bytes)?
            }
            _ => {
                log::info!("No data at {}, starting empty", path.display());
                Database::default()
            }
        };
        log::debug!(
            "Loaded {} attendance records and {} users from {}",
            data.attendance.len(),
            data.users.len(),
            path.display()
        );
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `change` to a copy of the document, writes it, and keeps the
    /// copy only once the write succeeded.
    async fn commit<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Database) + Send,
    {
        let mut guard = self.data.lock().await;
        let mut next = guard.clone();
        change(&mut next);
        let bytes = serde_json::to_vec_pretty(&next)?;
        write_io_file(&self.path, &bytes).await?;
        *guard = next;
        Ok(())
    }
}

#[async_trait]
impl Storage for JsonFileStore {
    async fn load_all(&self) -> Result<Database, StoreError> {
        Ok(self.data.lock().await.clone())
    }

    async fn append_record(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        self.commit(|db| db.attendance.push(record.clone())).await
    }

    async fn upsert_user(&self, user: &StudentData) -> Result<(), StoreError> {
        self.commit(|db| upsert(&mut db.users, user)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Location;
    use chrono::{TimeZone, Utc};

    fn record(student: &str, subject: &str) -> AttendanceRecord {
        AttendanceRecord {
            student_id: student.to_string(),
            subject: subject.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            location: Location::new(18.4725, 74.0015),
        }
    }

    fn user(id: &str, password: &str) -> StudentData {
        StudentData {
            student_id: id.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store.append_record(&record("S1", "Math")).await.unwrap();
        store.upsert_user(&user("S1", "pw")).await.unwrap();
        store.upsert_user(&user("S1", "pw2")).await.unwrap();

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let data = reopened.load_all().await.unwrap();
        assert_eq!(data.attendance, vec![record("S1", "Math")]);
        assert_eq!(data.users, vec![user("S1", "pw2")]);
    }

    #[tokio::test]
    async fn file_layout_uses_camel_case_collections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store.append_record(&record("S9", "CS")).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let entry = &raw["attendance"][0];
        assert_eq!(entry["studentId"], "S9");
        assert_eq!(entry["location"]["lat"], 18.4725);
        assert!(raw["users"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reads_documents_written_by_older_servers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(
            &path,
            r#"{"attendance":[{"studentId":"S1","subject":"CS","timestamp":"2024-03-01T09:30:00.000Z","location":{"lat":18.4725,"lon":74.0015}}],"users":[{"studentId":"S1","password":"pw"}]}"#,
        )
        .unwrap();

        let data = JsonFileStore::open(&path).await.unwrap().load_all().await.unwrap();
        assert_eq!(data.attendance[0].timestamp, Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
        assert_eq!(data.users, vec![user("S1", "pw")]);
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path).await,
            Err(StoreError::Json(_))
        ));
    }
}
