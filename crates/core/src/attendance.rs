//! # Attendance Module
//!
//! QR check-in/out records. Scans for the same student and event alternate
//! between `In` and `Out`, starting with `In`.

use crate::error::{CoreError, CoreResult};
use crate::person::Student;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceKind {
    In,
    Out,
}

impl AttendanceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceKind::In => "in",
            AttendanceKind::Out => "out",
        }
    }

    /// Kind of the next scan given the student's latest record for the event
    pub fn next_after(last: Option<AttendanceKind>) -> Self {
        match last {
            Some(AttendanceKind::In) => AttendanceKind::Out,
            Some(AttendanceKind::Out) | None => AttendanceKind::In,
        }
    }
}

impl FromStr for AttendanceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.to_lowercase().as_str() {
            "in" => Ok(AttendanceKind::In),
            "out" => Ok(AttendanceKind::Out),
            _ => Err(CoreError::invalid_enum("attendance type", s)),
        }
    }
}

impl fmt::Display for AttendanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub student_id: String,
    pub event_id: String,
    #[serde(rename = "type")]
    pub kind: AttendanceKind,
    pub recorded_by: String,
    #[serde(default)]
    pub location: Option<String>,
    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student: Option<Student>,
}

impl AttendanceRecord {
    pub fn new(student_id: &str, event_id: &str, kind: AttendanceKind, recorded_by: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            event_id: event_id.to_string(),
            kind,
            recorded_by: recorded_by.to_string(),
            location: None,
            timestamp: Utc::now(),
            student: None,
        }
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_after_alternates() {
        assert_eq!(AttendanceKind::next_after(None), AttendanceKind::In);
        assert_eq!(AttendanceKind::next_after(Some(AttendanceKind::In)), AttendanceKind::Out);
        assert_eq!(AttendanceKind::next_after(Some(AttendanceKind::Out)), AttendanceKind::In);
    }

    #[test]
    fn test_record_serializes_kind_as_type() {
        let record = AttendanceRecord::new("stu-1", "evt-1", AttendanceKind::Out, "oic-1")
            .with_location("Gym");
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["type"], "out");
        assert_eq!(value["location"], "Gym");
        assert_eq!("IN".parse::<AttendanceKind>(), Ok(AttendanceKind::In));
    }
}
