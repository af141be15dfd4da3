//! Append-only JSONL audit log
//!
//! One file per day: `data/audit/2026-01-25.jsonl`.

use crate::error::{PersistenceError, PersistenceResult};
use chrono::Utc;
use ssg_core::AuditEvent;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

const ID_PREFIX: &str = "AUD_";

pub struct AuditLog {
    base_path: PathBuf,
    /// Next `AUD_` number
    counter: AtomicU64,
    current_writer: Mutex<Option<DailyWriter>>,
}

struct DailyWriter {
    date: String,
    writer: BufWriter<File>,
}

impl AuditLog {
    /// Open the log in `base_path`, creating the directory if needed.
    ///
    /// Numbering continues after the highest id already on disk.
    pub fn new<P: AsRef<Path>>(base_path: P) -> PersistenceResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        let counter = Self::load_counter(&base_path)?;

        Ok(Self {
            base_path,
            counter: AtomicU64::new(counter),
            current_writer: Mutex::new(None),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn load_counter(base_path: &Path) -> PersistenceResult<u64> {
        let mut max_id: u64 = 0;

        for path in Self::jsonl_files(base_path)? {
            let content = fs::read_to_string(&path)?;
            for line in content.lines() {
                let Ok(event) = serde_json::from_str::<AuditEvent>(line) else {
                    continue;
                };
                if let Some(num) = event
                    .event_id
                    .strip_prefix(ID_PREFIX)
                    .and_then(|n| n.parse::<u64>().ok())
                {
                    max_id = max_id.max(num);
                }
            }
        }

        Ok(max_id + 1)
    }

    fn jsonl_files(base_path: &Path) -> PersistenceResult<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = fs::read_dir(base_path)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "jsonl"))
            .collect();
        files.sort();
        Ok(files)
    }

    fn current_date() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    fn lock(&self) -> PersistenceResult<MutexGuard<'_, Option<DailyWriter>>> {
        self.current_writer
            .lock()
            .map_err(|_| PersistenceError::Other("audit log lock poisoned".to_string()))
    }

    pub fn next_event_id(&self) -> String {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        AuditEvent::generate_id(id)
    }

    pub fn append(&self, event: &AuditEvent) -> PersistenceResult<()> {
        let date = Self::current_date();
        let json = event.to_json()?;

        let mut guard = self.lock()?;
        if guard.as_ref().map_or(true, |w| w.date != date) {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.base_path.join(format!("{}.jsonl", date)))?;
            *guard = Some(DailyWriter {
                date,
                writer: BufWriter::new(file),
            });
        }

        if let Some(w) = guard.as_mut() {
            writeln!(w.writer, "{}", json)?;
            w.writer.flush()?;
        }
        Ok(())
    }

    /// All day files, oldest first
    pub fn list_files(&self) -> PersistenceResult<Vec<PathBuf>> {
        Self::jsonl_files(&self.base_path)
    }

    pub fn flush(&self) -> PersistenceResult<()> {
        if let Some(w) = self.lock()?.as_mut() {
            w.writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for AuditLog {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssg_core::{AuditEventType, Role};
    use tempfile::tempdir;

    fn event(log: &AuditLog, kind: AuditEventType) -> AuditEvent {
        AuditEvent::new(log.next_event_id(), kind, "u-1", Role::Student, "req-1")
    }

    #[test]
    fn test_append_writes_daily_file() {
        let dir = tempdir().unwrap();
        let log = AuditLog::new(dir.path()).unwrap();

        log.append(&event(&log, AuditEventType::ClearanceSubmitted)).unwrap();

        let files = log.list_files().unwrap();
        assert_eq!(files.len(), 1);
        let content = fs::read_to_string(&files[0]).unwrap();
        assert!(content.contains("AUD_000001"));
        assert!(content.contains("clearance_submitted"));
    }

    #[test]
    fn test_counter_continues_after_reopen() {
        let dir = tempdir().unwrap();
        {
            let log = AuditLog::new(dir.path()).unwrap();
            log.append(&event(&log, AuditEventType::SignedIn)).unwrap();
            log.append(&event(&log, AuditEventType::SignedIn)).unwrap();
        }

        let log = AuditLog::new(dir.path()).unwrap();
        assert_eq!(log.next_event_id(), "AUD_000003");
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("data").join("audit");
        let log = AuditLog::new(&nested).unwrap();

        assert!(nested.is_dir());
        assert_eq!(log.next_event_id(), "AUD_000001");
    }
}
