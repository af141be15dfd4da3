//! # Person Module
//!
//! Directory entities: users, student profiles, departments and clubs.

use crate::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account profile of anyone who can sign in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: &str, email: &str, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            email: email.to_string(),
            role,
            first_name: None,
            last_name: None,
            phone: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_name(mut self, first_name: &str, last_name: &str) -> Self {
        self.first_name = Some(first_name.to_string());
        self.last_name = Some(last_name.to_string());
        self
    }

    /// "First Last", falling back to the email
    pub fn full_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            self.email.clone()
        } else {
            parts.join(" ")
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> ({})", self.full_name(), self.email, self.role)
    }
}

/// Student profile attached to a `student` user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub user_id: String,
    /// School-issued number (STU-...)
    #[serde(rename = "student_id")]
    pub student_number: String,
    pub department_id: String,
    pub year_level: u8,
    #[serde(default)]
    pub section: Option<String>,
    /// Payload encoded in the student's attendance QR code
    pub qr_code: String,
    #[serde(default)]
    pub points: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // === Expanded relations ===
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<Department>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl Student {
    /// New profile for `user_id`; number and QR code derive from `issued_at`.
    pub fn new(user_id: &str, department_id: &str, year_level: u8, issued_at: DateTime<Utc>) -> Self {
        let millis = issued_at.timestamp_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            student_number: format!("STU-{}", millis),
            department_id: department_id.to_string(),
            year_level: year_level.max(1),
            section: None,
            qr_code: Self::qr_code_for(user_id, issued_at),
            points: 0,
            created_at: issued_at,
            updated_at: issued_at,
            department: None,
            user: None,
        }
    }

    pub fn with_section(mut self, section: &str) -> Self {
        self.section = Some(section.to_string());
        self
    }

    /// `SSG-<millis>-<first 8 chars of user id>`
    pub fn qr_code_for(user_id: &str, issued_at: DateTime<Utc>) -> String {
        let prefix: String = user_id.chars().take(8).collect();
        format!("SSG-{}-{}", issued_at.timestamp_millis(), prefix)
    }

    pub fn display_name(&self) -> String {
        self.user
            .as_ref()
            .map(User::full_name)
            .unwrap_or_else(|| self.student_number.clone())
    }

    pub fn department_name(&self) -> Option<&str> {
        self.department.as_ref().map(|d| d.name.as_str())
    }
}

/// Academic department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub name: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Department {
    pub fn new(name: &str, code: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            code: code.to_uppercase(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Student club.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Club {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Club {
    pub fn new(name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }
}
