use std::sync::Arc;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, SubsecRound, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::geo::Geofence;
use crate::models::{AttendanceRecord, Location};
use crate::session::SessionManager;
use crate::state::AppState;
use crate::storage::Storage;
use crate::{body_or_default, proceeds, Error, Message, Payload};

/// Append-only record of who attended what, at most once per student,
/// subject and UTC day.
pub struct AttendanceLedger {
    storage: Arc<dyn Storage>,
    geofence: Geofence,
    // Held across check, persist and append so duplicates cannot interleave.
    records: Mutex<Vec<AttendanceRecord>>,
}

impl AttendanceLedger {
    pub fn new(storage: Arc<dyn Storage>, geofence: Geofence, records: Vec<AttendanceRecord>) -> Self {
        Self {
            storage,
            geofence,
            records: Mutex::new(records),
        }
    }

    /// Records attendance for the subject of the live session and returns
    /// that subject.
    pub async fn mark_attendance(
        &self,
        sessions: &SessionManager,
        student_id: &str,
        location: Location,
        token: &str,
    ) -> Result<String, Error> {
        self.mark_attendance_at(sessions, student_id, location, token, Utc::now())
            .await
    }

    pub async fn mark_attendance_at(
        &self,
        sessions: &SessionManager,
        student_id: &str,
        location: Location,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<String, Error> {
        let subject = sessions
            .verify_at(token, now)
            .await
            .map_err(|_| Error::forbidden("Invalid or expired session."))?;

        if let Err(distance) = self.geofence.check(location) {
            log::info!(
                "Rejected `{}` for {}: {:.1}m from classroom",
                student_id,
                subject,
                distance
            );
            return Err(Error::forbidden(format!(
                "You are too far away. Distance: {}m",
                distance.round()
            )));
        }

        let mut records = self.records.lock().await;
        let today = now.date_naive();
        let already_marked = records.iter().any(|r| {
            r.student_id == student_id && r.subject == subject && r.timestamp.date_naive() == today
        });
        if already_marked {
            return Err(Error::conflict(format!(
                "Attendance already marked for {} today.",
                subject
            )));
        }

        let record = AttendanceRecord {
            student_id: student_id.to_string(),
            subject: subject.clone(),
            timestamp: now.trunc_subsecs(3),
            location,
        };
        self.storage.append_record(&record).await?;
        records.push(record);
        log::info!("Marked `{}` present for {}", student_id, subject);
        Ok(subject)
    }

    /// Every record, most recently added first.
    pub async fn list_all(&self) -> Vec<AttendanceRecord> {
        self.records.lock().await.iter().rev().cloned().collect()
    }

    pub async fn list_for_student(&self, student_id: &str) -> Result<Vec<AttendanceRecord>, Error> {
        if student_id.is_empty() {
            return Err(Error::bad_request("Student ID is required."));
        }
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .rev()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect())
    }
}

pub async fn get_attendance(
    Extension(state): Extension<Arc<AppState>>,
) -> Payload<Vec<AttendanceRecord>> {
    proceeds(state.ledger.list_all().await)
}

/// A missing `studentId` answers 400 with an empty array rather than an
/// error body.
pub async fn get_student_attendance(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<StudentQuery>,
) -> (StatusCode, Json<Vec<AttendanceRecord>>) {
    let student_id = query.student_id.unwrap_or_default();
    match state.ledger.list_for_student(&student_id).await {
        Ok(records) => (StatusCode::OK, Json(records)),
        Err(err) => (err.status(), Json(Vec::new())),
    }
}

pub async fn mark_attendance(
    Extension(state): Extension<Arc<AppState>>,
    body: Option<Json<MarkAttendance>>,
) -> Payload<Message> {
    let body = body_or_default(body);
    let (student_id, latitude, longitude) = match (body.student_id, body.latitude, body.longitude) {
        (Some(id), Some(lat), Some(lon)) if !id.is_empty() => (id, lat, lon),
        _ => {
            return Err(Error::bad_request(
                "Student ID, latitude and longitude are required.",
            ))
        }
    };
    let token = body.token.unwrap_or_default();

    let subject = state
        .ledger
        .mark_attendance(
            &state.sessions,
            &student_id,
            Location::new(latitude, longitude),
            &token,
        )
        .await?;
    proceeds(Message::new(format!(
        "Attendance for {} marked successfully!",
        subject
    )))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentQuery {
    pub student_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendance {
    pub student_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub token: Option<String>,
}
