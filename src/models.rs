use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Geographic coordinate in degrees, stored as `{lat, lon}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub student_id: String,
    pub subject: String,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    pub location: Location,
}

/// `YYYY-MM-DDTHH:MM:SS.sssZ`, the same shape `Date.toISOString()` writes.
mod iso_millis {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        DateTime::<Utc>::deserialize(deserializer)
    }
}

/// Registered student. `password` holds a PHC hash string, or the raw
/// password for entries written before hashing was introduced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentData {
    pub student_id: String,
    pub password: String,
}

/// The whole persisted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub attendance: Vec<AttendanceRecord>,
    #[serde(default)]
    pub users: Vec<StudentData>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassSession {
    pub token: String,
    pub subject: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn timestamps_serialise_as_iso_millis() {
        let record = AttendanceRecord {
            student_id: "S1".to_string(),
            subject: "CS".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
                + Duration::nanoseconds(123_456_789),
            location: Location::new(18.4725, 74.0015),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["timestamp"], "2024-03-01T09:30:00.123Z");

        let whole = AttendanceRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            ..record
        };
        let json = serde_json::to_value(&whole).unwrap();
        assert_eq!(json["timestamp"], "2024-03-01T09:30:00.000Z");
        let back: AttendanceRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, whole);
    }
}
