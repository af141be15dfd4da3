//! Shared collaborators for business services.

use ssg_core::{AuditEvent, AuditEventType, Principal};
use ssg_persistence::{AuditLog, DataStore};
use std::sync::Arc;
use tracing::{info, warn};

/// Store plus optional audit log, cheap to clone.
#[derive(Clone)]
pub struct ServiceContext {
    store: Arc<dyn DataStore>,
    audit: Option<Arc<AuditLog>>,
    attendance_location: String,
}

impl ServiceContext {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            store,
            audit: None,
            attendance_location: "Event Venue".to_string(),
        }
    }

    pub fn with_audit(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn with_attendance_location(mut self, location: &str) -> Self {
        self.attendance_location = location.to_string();
        self
    }

    pub fn store(&self) -> &dyn DataStore {
        self.store.as_ref()
    }

    pub fn audit(&self) -> Option<&AuditLog> {
        self.audit.as_deref()
    }

    pub fn attendance_location(&self) -> &str {
        &self.attendance_location
    }

    /// Log a completed mutation and append it to the audit log, if any.
    ///
    /// The mutation has already committed, so an append failure is logged
    /// and never turned into an error for the caller.
    pub fn record(
        &self,
        event_type: AuditEventType,
        actor: &Principal,
        target_id: &str,
        description: &str,
    ) {
        info!(
            event = %event_type,
            actor = %actor.user_id,
            role = %actor.role,
            target = target_id,
            "{}",
            description
        );

        if let Some(audit) = &self.audit {
            let event = AuditEvent::new(
                audit.next_event_id(),
                event_type.clone(),
                &actor.user_id,
                actor.role,
                target_id,
            )
            .with_description(description);
            if let Err(e) = audit.append(&event) {
                warn!(
                    event = %event_type,
                    target = target_id,
                    error = %e,
                    "audit append failed"
                );
            }
        }
    }
}
