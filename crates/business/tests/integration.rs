//! Clearance, identity, attendance and messaging behaviour against both store
//! adapters.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use ssg_business::{
    AttendanceService, BusinessError, BusinessResult, CertificateData, CertificateHandle,
    CertificateRenderer, ClearanceWorkflow, DirectoryService, IdentityProvider,
    LocalIdentityProvider, MessageService, NewEvent, EventService, PasswordHasher, ServiceContext,
    SignUp,
};
use ssg_core::{
    ApprovalState, AttendanceKind, AuditEventType, ClearanceStatus, Decision, Party, Principal,
    Role,
};
use ssg_persistence::{
    AuditFilter, AuditLog, AuditReader, ClearanceRepo, DataStore, Filter, MemoryStore,
    PersistenceResult, Query, Row, SqliteStore,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Fixtures
// ============================================================================

async fn stores() -> Vec<Arc<dyn DataStore>> {
    vec![
        Arc::new(MemoryStore::new()),
        Arc::new(SqliteStore::in_memory().await.unwrap()),
    ]
}

#[derive(Default)]
struct CountingRenderer {
    calls: AtomicUsize,
}

#[async_trait]
impl CertificateRenderer for CountingRenderer {
    async fn render(&self, data: &CertificateData) -> BusinessResult<CertificateHandle> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CertificateHandle::new(format!(
            "file:///tmp/clearance-{}.html",
            data.verification_code
        )))
    }
}

struct Campus {
    ctx: ServiceContext,
    student: Principal,
    student_id: String,
    qr_code: String,
}

fn identity(ctx: &ServiceContext) -> LocalIdentityProvider {
    LocalIdentityProvider::new(ctx.clone(), Duration::minutes(60))
        .with_hasher(PasswordHasher::with_params(1024, 1).unwrap())
}

fn admin(role: Role) -> Principal {
    Principal::new(format!("{}-1", role), role)
}

async fn campus(store: Arc<dyn DataStore>) -> Campus {
    let ctx = ServiceContext::new(store);
    let dept = DirectoryService::new(&ctx)
        .ensure_department("Computer Studies", "CCS")
        .await
        .unwrap();

    let idp = identity(&ctx);
    let session = idp
        .sign_up(
            SignUp::new("ana@school.edu", "secret1", Role::Student)
                .with_name("Ana", "Reyes")
                .with_department(&dept.id, 3),
        )
        .await
        .unwrap();

    let student = ClearanceWorkflow::new(&ctx)
        .student_of(&session.principal())
        .await
        .unwrap();

    Campus {
        student: session.principal(),
        student_id: student.id,
        qr_code: student.qr_code,
        ctx,
    }
}

// ============================================================================
// Clearance workflow
// ============================================================================

#[tokio::test]
async fn test_new_request_is_all_pending() {
    for store in stores().await {
        let c = campus(store).await;
        let workflow = ClearanceWorkflow::new(&c.ctx);

        let request = workflow.submit(Some(&c.student), &c.student_id).await.unwrap();
        let stored = workflow.get(&request.id).await.unwrap();

        for party in Party::ALL {
            assert_eq!(stored.state(party), ApprovalState::Pending);
        }
        assert_eq!(ClearanceWorkflow::derive_status(&stored), ClearanceStatus::Pending);
    }
}

#[tokio::test]
async fn test_rejection_wins_and_full_approval() {
    for store in stores().await {
        let c = campus(store).await;
        let workflow = ClearanceWorkflow::new(&c.ctx);

        let rejected = workflow.submit(Some(&c.student), &c.student_id).await.unwrap();
        workflow
            .decide(&admin(Role::DepartmentAdmin), &rejected.id, Decision::Approved)
            .await
            .unwrap();
        let after = workflow
            .decide(&admin(Role::ClubAdmin), &rejected.id, Decision::Rejected)
            .await
            .unwrap();
        assert_eq!(after.status(), ClearanceStatus::Rejected);

        let approved = workflow.submit(Some(&c.student), &c.student_id).await.unwrap();
        workflow
            .decide(&admin(Role::DepartmentAdmin), &approved.id, Decision::Approved)
            .await
            .unwrap();
        let two_of_three = workflow
            .decide(&admin(Role::ClubAdmin), &approved.id, Decision::Approved)
            .await
            .unwrap();
        assert_eq!(two_of_three.status(), ClearanceStatus::Pending);

        workflow
            .decide(&admin(Role::SsgSuperAdmin), &approved.id, Decision::Approved)
            .await
            .unwrap();
        let stored = workflow.get(&approved.id).await.unwrap();
        assert_eq!(stored.status(), ClearanceStatus::FullyApproved);
        assert_eq!(stored.ssg.decided_by.as_deref(), Some("ssg_super_admin-1"));
    }
}

#[tokio::test]
async fn test_second_decision_keeps_first() {
    for store in stores().await {
        let c = campus(store).await;
        let workflow = ClearanceWorkflow::new(&c.ctx);
        let request = workflow.submit(Some(&c.student), &c.student_id).await.unwrap();
        let ssg = admin(Role::SsgSuperAdmin);

        workflow.decide(&ssg, &request.id, Decision::Approved).await.unwrap();
        let err = workflow
            .decide(&ssg, &request.id, Decision::Rejected)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BusinessError::AlreadyDecided {
                party: Party::Ssg,
                state: ApprovalState::Approved
            }
        ));
        let stored = workflow.get(&request.id).await.unwrap();
        assert_eq!(stored.ssg.state, ApprovalState::Approved);
    }
}

#[tokio::test]
async fn test_club_admin_cannot_decide_department_stage() {
    for store in stores().await {
        let c = campus(store).await;
        let workflow = ClearanceWorkflow::new(&c.ctx);
        let request = workflow.submit(Some(&c.student), &c.student_id).await.unwrap();

        let err = workflow
            .decide_stage(
                &admin(Role::ClubAdmin),
                &request.id,
                Party::Department,
                Decision::Approved,
            )
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());

        let stored = workflow.get(&request.id).await.unwrap();
        assert_eq!(stored, request);
    }
}

#[tokio::test]
async fn test_certificate_requires_full_approval() {
    for store in stores().await {
        let c = campus(store).await;
        let workflow = ClearanceWorkflow::new(&c.ctx);
        let renderer = CountingRenderer::default();

        let pending = workflow.submit(Some(&c.student), &c.student_id).await.unwrap();
        let rejected = workflow.submit(Some(&c.student), &c.student_id).await.unwrap();
        workflow
            .decide(&admin(Role::ClubAdmin), &rejected.id, Decision::Rejected)
            .await
            .unwrap();

        for id in [&pending.id, &rejected.id] {
            let err = workflow
                .issue_certificate(&c.student, id, &renderer)
                .await
                .unwrap_err();
            assert!(matches!(err, BusinessError::NotFullyApproved { .. }));
            assert!(workflow.get(id).await.unwrap().pdf_url.is_none());
        }
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);

        for role in [Role::DepartmentAdmin, Role::ClubAdmin, Role::SsgSuperAdmin] {
            workflow
                .decide(&admin(role), &pending.id, Decision::Approved)
                .await
                .unwrap();
        }
        let issued = workflow
            .issue_certificate(&c.student, &pending.id, &renderer)
            .await
            .unwrap();
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            workflow.get(&pending.id).await.unwrap().pdf_url,
            Some(issued.handle.url)
        );
    }
}

#[tokio::test]
async fn test_list_for_student_newest_first() {
    for store in stores().await {
        let c = campus(store).await;
        let workflow = ClearanceWorkflow::new(&c.ctx);

        let first = workflow.submit(Some(&c.student), &c.student_id).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = workflow.submit(Some(&c.student), &c.student_id).await.unwrap();

        let listed = workflow
            .list_for_student(&c.student, &c.student_id)
            .await
            .unwrap();
        let ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
    }
}

/// Lets a competing approver win the stage between the workflow's read and
/// its conditional write.
struct RacingStore {
    inner: Arc<dyn DataStore>,
    raced: AtomicBool,
}

#[async_trait]
impl DataStore for RacingStore {
    fn name(&self) -> &str {
        "racing"
    }

    async fn fetch(&self, query: &Query) -> PersistenceResult<Vec<Row>> {
        self.inner.fetch(query).await
    }

    async fn insert(&self, collection: &str, row: Row) -> PersistenceResult<Row> {
        self.inner.insert(collection, row).await
    }

    async fn update_where(
        &self,
        collection: &str,
        id: &str,
        patch: Row,
        guard: &[Filter],
    ) -> PersistenceResult<bool> {
        if !guard.is_empty() && !self.raced.swap(true, Ordering::SeqCst) {
            ClearanceRepo::decide_if_pending(
                self.inner.as_ref(),
                id,
                Party::Department,
                Decision::Rejected,
                "rival-admin",
                Utc::now(),
            )
            .await?;
        }
        self.inner.update_where(collection, id, patch, guard).await
    }

    async fn delete(&self, collection: &str, id: &str) -> PersistenceResult<()> {
        self.inner.delete(collection, id).await
    }
}

#[tokio::test]
async fn test_stale_conditional_update_is_already_decided() {
    for inner in stores().await {
        let c = campus(inner.clone()).await;
        let request = ClearanceWorkflow::new(&c.ctx)
            .submit(Some(&c.student), &c.student_id)
            .await
            .unwrap();

        let racing = ServiceContext::new(Arc::new(RacingStore {
            inner,
            raced: AtomicBool::new(false),
        }));
        let err = ClearanceWorkflow::new(&racing)
            .decide(&admin(Role::DepartmentAdmin), &request.id, Decision::Approved)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BusinessError::AlreadyDecided {
                party: Party::Department,
                state: ApprovalState::Rejected
            }
        ));
        let stored = ClearanceWorkflow::new(&c.ctx).get(&request.id).await.unwrap();
        assert_eq!(stored.department.decided_by.as_deref(), Some("rival-admin"));
    }
}

// ============================================================================
// Attendance, identity, messaging
// ============================================================================

#[tokio::test]
async fn test_attendance_alternates_per_student_and_event() {
    for store in stores().await {
        let c = campus(store).await;
        let ssg = admin(Role::SsgSuperAdmin);
        let event = EventService::new(&c.ctx)
            .create(&ssg, NewEvent::new("Assembly", Utc::now() + Duration::hours(1)))
            .await
            .unwrap();
        let other = EventService::new(&c.ctx)
            .create(&ssg, NewEvent::new("Fair", Utc::now() + Duration::hours(2)))
            .await
            .unwrap();

        let attendance = AttendanceService::new(&c.ctx);
        let oic = admin(Role::OfficerInCharge);
        let mut kinds = Vec::new();
        for _ in 0..3 {
            let outcome = attendance.record_scan(&oic, &event.id, &c.qr_code).await.unwrap();
            kinds.push(outcome.record.kind);
        }
        assert_eq!(
            kinds,
            vec![AttendanceKind::In, AttendanceKind::Out, AttendanceKind::In]
        );

        let elsewhere = attendance.record_scan(&oic, &other.id, &c.qr_code).await.unwrap();
        assert_eq!(elsewhere.record.kind, AttendanceKind::In);
        assert_eq!(elsewhere.record.location.as_deref(), Some("Event Venue"));
    }
}

#[tokio::test]
async fn test_identity_sign_in_and_refresh() {
    for store in stores().await {
        let c = campus(store).await;
        let idp = identity(&c.ctx);

        assert!(c.qr_code.starts_with("SSG-"));
        assert!(matches!(
            idp.sign_in("ana@school.edu", "not-it").await,
            Err(BusinessError::Unauthenticated)
        ));

        let session = idp.sign_in("ana@school.edu", "secret1").await.unwrap();
        let rotated = idp.refresh(&session.refresh_token).await.unwrap();
        assert_ne!(session.access_token, rotated.access_token);
        assert_ne!(session.refresh_token, rotated.refresh_token);
        assert_eq!(idp.principal(&rotated.access_token).await.unwrap(), c.student);
    }
}

#[tokio::test]
async fn test_mark_read_by_non_recipient() {
    for store in stores().await {
        let c = campus(store).await;
        let messages = MessageService::new(&c.ctx);
        let idp = identity(&c.ctx);
        let ssg = idp
            .sign_up(SignUp::new("ssg@school.edu", "secret1", Role::SsgSuperAdmin))
            .await
            .unwrap()
            .principal();

        let message = messages
            .send(&c.student, &ssg.user_id, "Clearance", "Please review")
            .await
            .unwrap();

        assert!(!messages.mark_read(&c.student, &message.id).await.unwrap());
        let inbox = messages.inbox(&ssg).await.unwrap();
        assert!(!inbox[0].is_read);
        assert_eq!(inbox[0].sender_name(), "Ana Reyes");

        assert!(messages.mark_read(&ssg, &message.id).await.unwrap());
        assert!(messages.inbox(&ssg).await.unwrap()[0].is_read);
    }
}

#[tokio::test]
async fn test_mutations_are_audited() {
    let dir = tempfile::tempdir().unwrap();
    let audit = Arc::new(AuditLog::new(dir.path()).unwrap());
    let store: Arc<dyn DataStore> = Arc::new(SqliteStore::in_memory().await.unwrap());

    let c = campus(store.clone()).await;
    let ctx = c.ctx.clone().with_audit(audit.clone());
    let workflow = ClearanceWorkflow::new(&ctx);
    let request = workflow.submit(Some(&c.student), &c.student_id).await.unwrap();
    workflow
        .decide(&admin(Role::ClubAdmin), &request.id, Decision::Approved)
        .await
        .unwrap();
    audit.flush().unwrap();

    let events = AuditFilter::new()
        .target(&request.id)
        .apply(AuditReader::new(dir.path()).read_all().unwrap());
    let kinds: Vec<AuditEventType> = events.into_iter().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![
            AuditEventType::ClearanceSubmitted,
            AuditEventType::ClearanceDecided
        ]
    );
}

#[tokio::test]
async fn test_decision_survives_audit_failure() {
    let dir = tempfile::tempdir().unwrap();
    let audit_dir = dir.path().join("audit");
    let audit = Arc::new(AuditLog::new(&audit_dir).unwrap());
    std::fs::remove_dir_all(&audit_dir).unwrap();

    for store in stores().await {
        let c = campus(store).await;
        let ctx = c.ctx.clone().with_audit(audit.clone());
        let workflow = ClearanceWorkflow::new(&ctx);
        let request = workflow.submit(Some(&c.student), &c.student_id).await.unwrap();
        assert!(request.department.state.is_pending());

        let department = admin(Role::DepartmentAdmin);
        let decided = workflow
            .decide(&department, &request.id, Decision::Approved)
            .await
            .unwrap();
        assert_eq!(decided.department.state, ApprovalState::Approved);

        let stored = workflow.get(&request.id).await.unwrap();
        assert_eq!(stored.department.state, ApprovalState::Approved);

        // the second decision on the stage is refused by the stage itself
        assert!(matches!(
            workflow.decide(&department, &request.id, Decision::Rejected).await,
            Err(BusinessError::AlreadyDecided {
                party: Party::Department,
                state: ApprovalState::Approved
            })
        ));
    }
}
