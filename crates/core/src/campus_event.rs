//! Campus events (assemblies, club activities) that attendance is taken for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampusEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    /// users.id of the admin who created it
    pub created_by: String,
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub club_id: Option<String>,
    #[serde(default)]
    pub is_mandatory: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CampusEvent {
    pub fn new(title: &str, event_date: DateTime<Utc>, created_by: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: None,
            event_date,
            location: None,
            created_by: created_by.to_string(),
            department_id: None,
            club_id: None,
            is_mandatory: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.event_date >= now
    }
}

impl fmt::Display for CampusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}){}",
            self.title,
            self.event_date.format("%Y-%m-%d %H:%M"),
            if self.is_mandatory { " [mandatory]" } else { "" }
        )
    }
}
