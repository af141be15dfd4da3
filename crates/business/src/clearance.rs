//! Clearance workflow - submit, decide, issue certificate
//!
//! A student submits a request; the department, club and SSG admins each
//! decide their own stage once; a fully approved request can be turned into
//! a certificate.

use crate::certificate::{CertificateData, CertificateHandle, CertificateRenderer};
use crate::context::ServiceContext;
use crate::error::{BusinessError, BusinessResult};
use chrono::Utc;
use ssg_core::{
    AuditEventType, ClearanceRequest, ClearanceStatus, Decision, Party, Principal, Role, Student,
};
use ssg_persistence::{ClearanceRepo, ClearanceView, StudentRepo};
use tracing::{info, warn};

/// Result of a successful certificate issue
#[derive(Debug, Clone)]
pub struct IssuedCertificate {
    pub request: ClearanceRequest,
    pub handle: CertificateHandle,
}

pub struct ClearanceWorkflow<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ClearanceWorkflow<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Overall status; rejection is checked before approval.
    pub fn derive_status(request: &ClearanceRequest) -> ClearanceStatus {
        request.status()
    }

    /// Open a new request for `student_id`, all stages pending.
    ///
    /// Repeat submissions are allowed and each creates a new request.
    pub async fn submit(
        &self,
        principal: Option<&Principal>,
        student_id: &str,
    ) -> BusinessResult<ClearanceRequest> {
        let principal = principal.ok_or(BusinessError::Unauthenticated)?;
        if student_id.trim().is_empty() {
            return Err(BusinessError::Unauthenticated);
        }

        let student = StudentRepo::get(self.ctx.store(), student_id)
            .await
            .map_err(BusinessError::from_lookup)?;
        if !principal.is(&student.user_id) {
            warn!(actor = %principal, student = student_id, "clearance submit refused");
            return Err(BusinessError::unauthorized(
                principal.role,
                "submit clearance for another student",
            ));
        }

        let request = ClearanceRequest::new(student_id);
        ClearanceRepo::insert(self.ctx.store(), &request).await?;

        self.ctx.record(
            AuditEventType::ClearanceSubmitted,
            principal,
            &request.id,
            &format!("clearance submitted for {}", student.student_number),
        );
        Ok(request)
    }

    /// Decide the stage owned by the principal's role.
    pub async fn decide(
        &self,
        principal: &Principal,
        request_id: &str,
        decision: Decision,
    ) -> BusinessResult<ClearanceRequest> {
        let party = principal
            .role
            .approving_party()
            .ok_or_else(|| BusinessError::unauthorized(principal.role, "decide clearance"))?;
        self.apply(principal, request_id, party, decision).await
    }

    /// Decide an explicitly named stage; it must be the principal's own.
    pub async fn decide_stage(
        &self,
        principal: &Principal,
        request_id: &str,
        party: Party,
        decision: Decision,
    ) -> BusinessResult<ClearanceRequest> {
        if principal.role.approving_party() != Some(party) {
            warn!(actor = %principal, %party, request = request_id, "stage decision refused");
            return Err(BusinessError::unauthorized(
                principal.role,
                &format!("decide {} stage", party),
            ));
        }
        self.apply(principal, request_id, party, decision).await
    }

    async fn apply(
        &self,
        principal: &Principal,
        request_id: &str,
        party: Party,
        decision: Decision,
    ) -> BusinessResult<ClearanceRequest> {
        let store = self.ctx.store();
        let mut request = ClearanceRepo::get(store, request_id)
            .await
            .map_err(BusinessError::from_lookup)?;

        let at = Utc::now();
        request.apply_decision(party, decision, &principal.user_id, at)?;

        // The store re-checks the stage so two approvers racing on it cannot
        // both win.
        let applied = ClearanceRepo::decide_if_pending(
            store,
            request_id,
            party,
            decision,
            &principal.user_id,
            at,
        )
        .await?;
        if !applied {
            let current = ClearanceRepo::get(store, request_id)
                .await
                .map_err(BusinessError::from_lookup)?;
            warn!(request = request_id, %party, state = %current.state(party), "stage decided concurrently");
            return Err(BusinessError::AlreadyDecided {
                party,
                state: current.state(party),
            });
        }

        self.ctx.record(
            AuditEventType::ClearanceDecided,
            principal,
            request_id,
            &format!("{} {} (status {})", party, decision, request.status()),
        );
        Ok(request)
    }

    /// Render the certificate of a fully approved request and store its location.
    ///
    /// Allowed for the owning student and the SSG super admin. The renderer
    /// is not called unless the request is fully approved.
    pub async fn issue_certificate(
        &self,
        principal: &Principal,
        request_id: &str,
        renderer: &dyn CertificateRenderer,
    ) -> BusinessResult<IssuedCertificate> {
        let ClearanceView { mut request, student } =
            ClearanceRepo::get_view(self.ctx.store(), request_id)
                .await
                .map_err(BusinessError::from_lookup)?;
        let student =
            student.ok_or_else(|| BusinessError::not_found("Student", &request.student_id))?;

        if !(principal.is(&student.user_id) || principal.role == Role::SsgSuperAdmin) {
            return Err(BusinessError::unauthorized(
                principal.role,
                "issue certificate for another student",
            ));
        }

        request.ensure_fully_approved()?;

        let now = Utc::now();
        let data = Self::certificate_data(&request, &student, now);
        let handle = renderer.render(&data).await?;

        request.attach_certificate(&handle.url, now)?;
        ClearanceRepo::set_pdf_url(self.ctx.store(), &request.id, &handle.url, now).await?;

        info!(request = request_id, url = %handle.url, "certificate issued");
        self.ctx.record(
            AuditEventType::CertificateIssued,
            principal,
            request_id,
            &data.verification_code,
        );
        Ok(IssuedCertificate { request, handle })
    }

    fn certificate_data(
        request: &ClearanceRequest,
        student: &Student,
        issued_at: chrono::DateTime<Utc>,
    ) -> CertificateData {
        CertificateData {
            request_id: request.id.clone(),
            student_name: student.display_name(),
            student_number: student.student_number.clone(),
            department: student.department_name().unwrap_or("N/A").to_string(),
            year_level: student.year_level,
            issued_at,
            verification_code: request.verification_code(),
            approvals: Party::ALL
                .into_iter()
                .map(|party| (party, request.state(party)))
                .collect(),
        }
    }

    pub async fn get(&self, request_id: &str) -> BusinessResult<ClearanceRequest> {
        ClearanceRepo::get(self.ctx.store(), request_id)
            .await
            .map_err(BusinessError::from_lookup)
    }

    /// A student's requests, newest first. Admins may list anyone's.
    pub async fn list_for_student(
        &self,
        principal: &Principal,
        student_id: &str,
    ) -> BusinessResult<Vec<ClearanceRequest>> {
        if !principal.role.is_admin() {
            let student = StudentRepo::get(self.ctx.store(), student_id)
                .await
                .map_err(BusinessError::from_lookup)?;
            if !principal.is(&student.user_id) {
                return Err(BusinessError::unauthorized(
                    principal.role,
                    "list another student's clearances",
                ));
            }
        }
        Ok(ClearanceRepo::list_for_student(self.ctx.store(), student_id).await?)
    }

    /// Student profile of the signed-in student
    pub async fn student_of(&self, principal: &Principal) -> BusinessResult<Student> {
        StudentRepo::find_by_user(self.ctx.store(), &principal.user_id)
            .await?
            .ok_or_else(|| BusinessError::not_found("Student profile", &principal.user_id))
    }

    /// Recent requests still waiting on the principal's stage
    pub async fn pending_for(
        &self,
        principal: &Principal,
        limit: usize,
    ) -> BusinessResult<Vec<ClearanceView>> {
        let party = principal
            .role
            .approving_party()
            .ok_or_else(|| BusinessError::unauthorized(principal.role, "view pending clearances"))?;
        Ok(ClearanceRepo::pending_on(self.ctx.store(), party, limit).await?)
    }

    /// Every request with its student, for reporting. Admins only.
    pub async fn list_all(&self, principal: &Principal) -> BusinessResult<Vec<ClearanceView>> {
        if !principal.role.is_admin() {
            return Err(BusinessError::unauthorized(principal.role, "list all clearances"));
        }
        Ok(ClearanceRepo::list_all(self.ctx.store()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::CertificateHandle;
    use async_trait::async_trait;
    use ssg_core::{ApprovalState, Department, User};
    use ssg_persistence::{DepartmentRepo, MemoryStore, UserRepo};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingRenderer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CertificateRenderer for CountingRenderer {
        async fn render(&self, data: &CertificateData) -> BusinessResult<CertificateHandle> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CertificateHandle::new(format!("memory://{}", data.verification_code)))
        }
    }

    async fn setup() -> (ServiceContext, Student) {
        let ctx = ServiceContext::new(Arc::new(MemoryStore::new()));
        let dept = Department::new("Computer Studies", "CCS");
        DepartmentRepo::insert(ctx.store(), &dept).await.unwrap();
        let user = User::new("stu-user", "ana@school.edu", Role::Student).with_name("Ana", "Reyes");
        UserRepo::insert(ctx.store(), &user).await.unwrap();
        let student = Student::new(&user.id, &dept.id, 2, Utc::now());
        StudentRepo::insert(ctx.store(), &student).await.unwrap();
        (ctx, student)
    }

    fn owner() -> Principal {
        Principal::new("stu-user", Role::Student)
    }

    #[tokio::test]
    async fn test_submit_requires_principal() {
        let (ctx, student) = setup().await;
        let workflow = ClearanceWorkflow::new(&ctx);

        assert!(matches!(
            workflow.submit(None, &student.id).await,
            Err(BusinessError::Unauthenticated)
        ));
        assert!(matches!(
            workflow.submit(Some(&owner()), "  ").await,
            Err(BusinessError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_submit_for_other_student_refused() {
        let (ctx, student) = setup().await;
        let other = Principal::new("someone-else", Role::Student);

        let err = ClearanceWorkflow::new(&ctx)
            .submit(Some(&other), &student.id)
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_decide_uses_role_stage() {
        let (ctx, student) = setup().await;
        let workflow = ClearanceWorkflow::new(&ctx);
        let request = workflow.submit(Some(&owner()), &student.id).await.unwrap();

        let club = Principal::new("club-1", Role::ClubAdmin);
        let updated = workflow.decide(&club, &request.id, Decision::Approved).await.unwrap();

        assert_eq!(updated.club.state, ApprovalState::Approved);
        assert_eq!(updated.department.state, ApprovalState::Pending);
        assert_eq!(ClearanceWorkflow::derive_status(&updated), ClearanceStatus::Pending);
    }

    #[tokio::test]
    async fn test_oic_cannot_decide() {
        let (ctx, student) = setup().await;
        let workflow = ClearanceWorkflow::new(&ctx);
        let request = workflow.submit(Some(&owner()), &student.id).await.unwrap();

        let oic = Principal::new("oic-1", Role::OfficerInCharge);
        let err = workflow.decide(&oic, &request.id, Decision::Approved).await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_certificate_flow() {
        let (ctx, student) = setup().await;
        let workflow = ClearanceWorkflow::new(&ctx);
        let renderer = CountingRenderer { calls: AtomicUsize::new(0) };
        let request = workflow.submit(Some(&owner()), &student.id).await.unwrap();

        let err = workflow
            .issue_certificate(&owner(), &request.id, &renderer)
            .await
            .unwrap_err();
        assert!(matches!(err, BusinessError::NotFullyApproved { .. }));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);

        for role in [Role::DepartmentAdmin, Role::ClubAdmin, Role::SsgSuperAdmin] {
            let admin = Principal::new(format!("{}-1", role), role);
            workflow.decide(&admin, &request.id, Decision::Approved).await.unwrap();
        }

        let issued = workflow
            .issue_certificate(&owner(), &request.id, &renderer)
            .await
            .unwrap();
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
        assert!(issued.handle.url.contains(&request.verification_code()));

        let stored = workflow.get(&request.id).await.unwrap();
        assert_eq!(stored.pdf_url, Some(issued.handle.url));
    }

    #[tokio::test]
    async fn test_pending_for_filters_by_stage() {
        let (ctx, student) = setup().await;
        let workflow = ClearanceWorkflow::new(&ctx);
        let first = workflow.submit(Some(&owner()), &student.id).await.unwrap();
        let second = workflow.submit(Some(&owner()), &student.id).await.unwrap();

        let dept = Principal::new("dept-1", Role::DepartmentAdmin);
        workflow.decide(&dept, &first.id, Decision::Rejected).await.unwrap();

        let pending = workflow.pending_for(&dept, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].request.id, second.id);
        assert_eq!(pending[0].student.as_ref().unwrap().display_name(), "Ana Reyes");

        let club = Principal::new("club-1", Role::ClubAdmin);
        assert_eq!(workflow.pending_for(&club, 10).await.unwrap().len(), 2);
        assert!(workflow.pending_for(&owner(), 10).await.is_err());
    }
}
