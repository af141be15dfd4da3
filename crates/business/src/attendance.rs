//! QR check-in/out at campus events.

use crate::context::ServiceContext;
use crate::error::{BusinessError, BusinessResult};
use chrono::Duration;
use ssg_core::{AttendanceKind, AttendanceRecord, AuditEventType, Principal, Student};
use ssg_persistence::{AttendanceRepo, EventRepo, StudentRepo};

/// A recorded scan and the student it resolved to
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub record: AttendanceRecord,
    pub student: Student,
}

pub struct AttendanceService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AttendanceService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Record a scan of `qr_code` at `event_id`.
    ///
    /// The first scan is a check-in; after that scans alternate out/in.
    pub async fn record_scan(
        &self,
        principal: &Principal,
        event_id: &str,
        qr_code: &str,
    ) -> BusinessResult<ScanOutcome> {
        if !principal.role.can_record_attendance() {
            return Err(BusinessError::unauthorized(principal.role, "record attendance"));
        }
        let qr_code = qr_code.trim();
        if qr_code.is_empty() {
            return Err(BusinessError::validation("QR code is empty"));
        }

        let store = self.ctx.store();
        let event = EventRepo::get(store, event_id)
            .await
            .map_err(BusinessError::from_lookup)?;
        let student = StudentRepo::find_by_qr_code(store, qr_code)
            .await?
            .ok_or_else(|| BusinessError::not_found("Student", qr_code))?;

        let last = AttendanceRepo::latest_for(store, &student.id, &event.id).await?;
        let kind = AttendanceKind::next_after(last.as_ref().map(|r| r.kind));

        let mut record = AttendanceRecord::new(&student.id, &event.id, kind, &principal.user_id)
            .with_location(self.ctx.attendance_location());
        // Keep scans strictly ordered at millisecond resolution.
        if let Some(last) = &last {
            record.timestamp = record
                .timestamp
                .max(last.timestamp + Duration::milliseconds(1));
        }

        AttendanceRepo::insert(store, &record).await?;
        self.ctx.record(
            AuditEventType::AttendanceRecorded,
            principal,
            &record.id,
            &format!("{} check-{} at '{}'", student.student_number, kind, event.title),
        );
        Ok(ScanOutcome { record, student })
    }

    /// Scans of an event, newest first
    pub async fn list_for_event(&self, event_id: &str) -> BusinessResult<Vec<AttendanceRecord>> {
        Ok(AttendanceRepo::list_for_event(self.ctx.store(), event_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ssg_core::{CampusEvent, Role, User};
    use ssg_persistence::{MemoryStore, UserRepo};
    use std::sync::Arc;

    async fn setup() -> (ServiceContext, CampusEvent, Student) {
        let ctx = ServiceContext::new(Arc::new(MemoryStore::new())).with_attendance_location("Gym");
        let event = CampusEvent::new("Assembly", Utc::now(), "ssg-1");
        EventRepo::insert(ctx.store(), &event).await.unwrap();
        let user = User::new("u-1", "ana@school.edu", Role::Student).with_name("Ana", "Reyes");
        UserRepo::insert(ctx.store(), &user).await.unwrap();
        let student = Student::new(&user.id, "dept-1", 1, Utc::now());
        StudentRepo::insert(ctx.store(), &student).await.unwrap();
        (ctx, event, student)
    }

    #[tokio::test]
    async fn test_scans_alternate() {
        let (ctx, event, student) = setup().await;
        let service = AttendanceService::new(&ctx);
        let oic = Principal::new("oic-1", Role::OfficerInCharge);

        let mut kinds = Vec::new();
        for _ in 0..3 {
            let outcome = service.record_scan(&oic, &event.id, &student.qr_code).await.unwrap();
            assert_eq!(outcome.student.id, student.id);
            assert_eq!(outcome.record.location.as_deref(), Some("Gym"));
            kinds.push(outcome.record.kind);
        }
        assert_eq!(
            kinds,
            vec![AttendanceKind::In, AttendanceKind::Out, AttendanceKind::In]
        );

        let listed = service.list_for_event(&event.id).await.unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].kind, AttendanceKind::In);
        assert_eq!(
            listed[0].student.as_ref().unwrap().display_name(),
            "Ana Reyes"
        );
    }

    #[tokio::test]
    async fn test_scan_errors() {
        let (ctx, event, student) = setup().await;
        let service = AttendanceService::new(&ctx);

        let club = Principal::new("club-1", Role::ClubAdmin);
        assert!(service
            .record_scan(&club, &event.id, &student.qr_code)
            .await
            .unwrap_err()
            .is_unauthorized());

        let ssg = Principal::new("ssg-1", Role::SsgSuperAdmin);
        assert!(matches!(
            service.record_scan(&ssg, &event.id, "SSG-0-unknown").await,
            Err(BusinessError::NotFound { .. })
        ));
        assert!(matches!(
            service.record_scan(&ssg, "no-event", &student.qr_code).await,
            Err(BusinessError::NotFound { .. })
        ));
    }
}
