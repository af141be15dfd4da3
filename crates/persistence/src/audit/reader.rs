//! Read the audit trail back from JSONL files.

use crate::error::{PersistenceError, PersistenceResult};
use chrono::NaiveDate;
use ssg_core::{AuditEvent, AuditEventType};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

pub struct AuditReader {
    base_path: PathBuf,
}

impl AuditReader {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn read_file(&self, file_path: &Path) -> PersistenceResult<Vec<AuditEvent>> {
        let reader = BufReader::new(File::open(file_path)?);
        let mut events = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }

        Ok(events)
    }

    /// Events of one day (`YYYY-MM-DD`); empty when no file exists
    pub fn read_date(&self, date: &str) -> PersistenceResult<Vec<AuditEvent>> {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| PersistenceError::Other(format!("Invalid date {}: {}", date, e)))?;

        let path = self.base_path.join(format!("{}.jsonl", date));
        if path.exists() {
            self.read_file(&path)
        } else {
            Ok(Vec::new())
        }
    }

    /// Every event, oldest file first
    pub fn read_all(&self) -> PersistenceResult<Vec<AuditEvent>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.base_path)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "jsonl"))
            .collect();
        files.sort();

        let mut all = Vec::new();
        for path in files {
            all.extend(self.read_file(&path)?);
        }
        Ok(all)
    }
}

/// Select audit events by actor, target or kind
#[derive(Debug, Default)]
pub struct AuditFilter {
    pub actor_id: Option<String>,
    pub target_id: Option<String>,
    pub event_types: Option<Vec<AuditEventType>>,
}

impl AuditFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actor(mut self, actor_id: &str) -> Self {
        self.actor_id = Some(actor_id.to_string());
        self
    }

    pub fn target(mut self, target_id: &str) -> Self {
        self.target_id = Some(target_id.to_string());
        self
    }

    pub fn event_types(mut self, types: Vec<AuditEventType>) -> Self {
        self.event_types = Some(types);
        self
    }

    pub fn matches(&self, event: &AuditEvent) -> bool {
        if self.actor_id.as_ref().is_some_and(|a| *a != event.actor_id) {
            return false;
        }
        if self.target_id.as_ref().is_some_and(|t| *t != event.target_id) {
            return false;
        }
        if let Some(types) = &self.event_types {
            if !types.contains(&event.event_type) {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, events: Vec<AuditEvent>) -> Vec<AuditEvent> {
        events.into_iter().filter(|e| self.matches(e)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLog;
    use ssg_core::Role;
    use tempfile::tempdir;

    #[test]
    fn test_read_back_and_filter() {
        let dir = tempdir().unwrap();
        let log = AuditLog::new(dir.path()).unwrap();

        let submitted = AuditEvent::new(
            log.next_event_id(),
            AuditEventType::ClearanceSubmitted,
            "stu-user",
            Role::Student,
            "req-1",
        );
        let decided = AuditEvent::new(
            log.next_event_id(),
            AuditEventType::ClearanceDecided,
            "club-admin",
            Role::ClubAdmin,
            "req-1",
        )
        .with_description("club approved");
        let sent = AuditEvent::new(
            log.next_event_id(),
            AuditEventType::MessageSent,
            "club-admin",
            Role::ClubAdmin,
            "msg-1",
        );
        for event in [&submitted, &decided, &sent] {
            log.append(event).unwrap();
        }

        let events = AuditReader::new(dir.path()).read_all().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1].description.as_deref(), Some("club approved"));

        assert_eq!(AuditFilter::new().target("req-1").apply(events.clone()).len(), 2);
        assert_eq!(AuditFilter::new().actor("club-admin").apply(events.clone()).len(), 2);
        let decisions = AuditFilter::new()
            .event_types(vec![AuditEventType::ClearanceDecided])
            .apply(events);
        assert_eq!(decisions.len(), 1);
    }

    #[test]
    fn test_read_date_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let reader = AuditReader::new(dir.path());
        assert!(reader.read_date("2020-01-01").unwrap().is_empty());
        assert!(reader.read_date("not-a-date").is_err());
    }
}
