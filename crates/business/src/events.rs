//! Campus event management.

use crate::context::ServiceContext;
use crate::error::{BusinessError, BusinessResult};
use chrono::{DateTime, Utc};
use ssg_core::{AuditEventType, CampusEvent, Principal, Role};
use ssg_persistence::EventRepo;

/// Fields of a new event
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub location: Option<String>,
    pub department_id: Option<String>,
    pub club_id: Option<String>,
    pub is_mandatory: bool,
}

impl NewEvent {
    pub fn new(title: &str, event_date: DateTime<Utc>) -> Self {
        Self {
            title: title.to_string(),
            description: None,
            event_date,
            location: None,
            department_id: None,
            club_id: None,
            is_mandatory: false,
        }
    }
}

pub struct EventService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> EventService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, principal: &Principal, new: NewEvent) -> BusinessResult<CampusEvent> {
        if !principal.role.can_manage_events() {
            return Err(BusinessError::unauthorized(principal.role, "create event"));
        }
        let title = new.title.trim();
        if title.is_empty() {
            return Err(BusinessError::validation("event title is required"));
        }

        let mut event = CampusEvent::new(title, new.event_date, &principal.user_id);
        event.description = new.description.filter(|d| !d.trim().is_empty());
        event.location = new.location.filter(|l| !l.trim().is_empty());
        event.department_id = new.department_id;
        event.club_id = new.club_id;
        event.is_mandatory = new.is_mandatory;

        EventRepo::insert(self.ctx.store(), &event).await?;
        self.ctx.record(
            AuditEventType::EventCreated,
            principal,
            &event.id,
            &format!("created event '{}'", event.title),
        );
        Ok(event)
    }

    pub async fn get(&self, event_id: &str) -> BusinessResult<CampusEvent> {
        EventRepo::get(self.ctx.store(), event_id)
            .await
            .map_err(BusinessError::from_lookup)
    }

    /// Events at or after `now`, soonest first
    pub async fn upcoming(&self, now: DateTime<Utc>) -> BusinessResult<Vec<CampusEvent>> {
        Ok(EventRepo::upcoming(self.ctx.store(), now).await?)
    }

    /// The SSG super admin sees every event; other admins see their own.
    pub async fn list_for(&self, principal: &Principal) -> BusinessResult<Vec<CampusEvent>> {
        let creator = match principal.role {
            Role::SsgSuperAdmin => None,
            role if role.can_manage_events() => Some(principal.user_id.as_str()),
            role => return Err(BusinessError::unauthorized(role, "list managed events")),
        };
        Ok(EventRepo::list(self.ctx.store(), creator).await?)
    }

    /// Only the creator or the SSG super admin may delete.
    pub async fn delete(&self, principal: &Principal, event_id: &str) -> BusinessResult<()> {
        let event = self.get(event_id).await?;
        if !(principal.is(&event.created_by) || principal.role == Role::SsgSuperAdmin) {
            return Err(BusinessError::unauthorized(principal.role, "delete another admin's event"));
        }

        EventRepo::delete(self.ctx.store(), event_id).await?;
        self.ctx.record(
            AuditEventType::EventDeleted,
            principal,
            event_id,
            &format!("deleted event '{}'", event.title),
        );
        Ok(())
    }
}
