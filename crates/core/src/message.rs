//! Internal messages between users.

use crate::person::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub subject: String,
    pub content: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_user: Option<User>,
}

impl Message {
    pub fn new(from_user_id: &str, to_user_id: &str, subject: &str, content: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from_user_id: from_user_id.to_string(),
            to_user_id: to_user_id.to_string(),
            subject: subject.trim().to_string(),
            content: content.trim().to_string(),
            is_read: false,
            created_at: Utc::now(),
            from_user: None,
        }
    }

    pub fn sender_name(&self) -> String {
        self.from_user
            .as_ref()
            .map(User::full_name)
            .unwrap_or_else(|| self.from_user_id.clone())
    }
}
