//! Typed repositories over a `DataStore`
//!
//! Each repository maps one collection to its domain type.

use crate::collections::{
    ATTENDANCE, CLEARANCE_REQUESTS, CLUBS, CREDENTIALS, DEPARTMENTS, EVENTS, MESSAGES, SESSIONS,
    STUDENTS, USERS,
};
use crate::error::{PersistenceError, PersistenceResult};
use crate::schema::{from_row, to_row, ClearanceRow, ClearanceView, CredentialRow, SessionRow};
use crate::store::{DataStore, Expand, Filter, Query, Row};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use ssg_core::{
    AttendanceRecord, CampusEvent, ClearanceRequest, Club, Decision, Department, Message, Party,
    Student, User,
};
use tracing::debug;

fn timestamp(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

async fn fetch_all<T: DeserializeOwned>(
    store: &dyn DataStore,
    query: &Query,
) -> PersistenceResult<Vec<T>> {
    debug!(store = store.name(), collection = %query.collection, filters = query.filters.len(), "query");
    store
        .query(query)
        .await?
        .into_iter()
        .map(|row| from_row(&query.collection, row))
        .collect()
}

async fn fetch_one<T: DeserializeOwned>(
    store: &dyn DataStore,
    query: Query,
) -> PersistenceResult<Option<T>> {
    let mut rows = fetch_all(store, &query.limit(1)).await?;
    Ok(rows.pop())
}

async fn get_by_id<T: DeserializeOwned>(
    store: &dyn DataStore,
    collection: &str,
    entity: &str,
    id: &str,
) -> PersistenceResult<T> {
    let row = store
        .get(collection, id)
        .await?
        .ok_or_else(|| PersistenceError::not_found(entity, id))?;
    from_row(collection, row)
}

/// `student → user, department`
fn student_expansion(alias: &str) -> Expand {
    Expand::new(alias, STUDENTS, "student_id")
        .with(Expand::new("user", USERS, "user_id"))
        .with(Expand::new("department", DEPARTMENTS, "department_id"))
}

// ============================================================================
// Clearance Repository
// ============================================================================

/// Repository for `clearance_requests`
pub struct ClearanceRepo;

impl ClearanceRepo {
    pub async fn insert(store: &dyn DataStore, request: &ClearanceRequest) -> PersistenceResult<()> {
        let row = to_row(CLEARANCE_REQUESTS, &ClearanceRow::from(request))?;
        store.insert(CLEARANCE_REQUESTS, row).await?;
        Ok(())
    }

    pub async fn get(store: &dyn DataStore, id: &str) -> PersistenceResult<ClearanceRequest> {
        let row: ClearanceRow = get_by_id(store, CLEARANCE_REQUESTS, "ClearanceRequest", id).await?;
        Ok(row.into())
    }

    /// Request with its owning student, user and department expanded
    pub async fn get_view(store: &dyn DataStore, id: &str) -> PersistenceResult<ClearanceView> {
        let query = Query::new(CLEARANCE_REQUESTS)
            .eq("id", id)
            .expand(student_expansion("student"));
        fetch_one::<ClearanceRow>(store, query)
            .await?
            .map(ClearanceView::from)
            .ok_or_else(|| PersistenceError::not_found("ClearanceRequest", id))
    }

    /// All requests of a student, newest first
    pub async fn list_for_student(
        store: &dyn DataStore,
        student_id: &str,
    ) -> PersistenceResult<Vec<ClearanceRequest>> {
        let query = Query::new(CLEARANCE_REQUESTS)
            .eq("student_id", student_id)
            .order_desc("created_at");
        let rows: Vec<ClearanceRow> = fetch_all(store, &query).await?;
        Ok(rows.into_iter().map(ClearanceRequest::from).collect())
    }

    /// Most recent requests still pending on `party`'s stage
    pub async fn pending_on(
        store: &dyn DataStore,
        party: Party,
        limit: usize,
    ) -> PersistenceResult<Vec<ClearanceView>> {
        let query = Query::new(CLEARANCE_REQUESTS)
            .filter(ClearanceRow::pending_guard(party))
            .order_desc("created_at")
            .expand(student_expansion("student"))
            .limit(limit);
        let rows: Vec<ClearanceRow> = fetch_all(store, &query).await?;
        Ok(rows.into_iter().map(ClearanceView::from).collect())
    }

    /// Every request, newest first, with students expanded
    pub async fn list_all(store: &dyn DataStore) -> PersistenceResult<Vec<ClearanceView>> {
        let query = Query::new(CLEARANCE_REQUESTS)
            .order_desc("created_at")
            .expand(student_expansion("student"));
        let rows: Vec<ClearanceRow> = fetch_all(store, &query).await?;
        Ok(rows.into_iter().map(ClearanceView::from).collect())
    }

    /// Record a decision only if `party`'s stage is still pending.
    ///
    /// Returns `false` when the stage was decided in the meantime.
    pub async fn decide_if_pending(
        store: &dyn DataStore,
        id: &str,
        party: Party,
        decision: Decision,
        approver_id: &str,
        at: DateTime<Utc>,
    ) -> PersistenceResult<bool> {
        let patch = ClearanceRow::decision_patch(party, decision, approver_id, at);
        store
            .update_where(
                CLEARANCE_REQUESTS,
                id,
                patch,
                &[ClearanceRow::pending_guard(party)],
            )
            .await
    }

    pub async fn set_pdf_url(
        store: &dyn DataStore,
        id: &str,
        url: &str,
        at: DateTime<Utc>,
    ) -> PersistenceResult<()> {
        let mut patch = Row::new();
        patch.insert("pdf_url".to_string(), Value::String(url.to_string()));
        patch.insert("updated_at".to_string(), timestamp(at));
        store.update(CLEARANCE_REQUESTS, id, patch).await
    }
}

// ============================================================================
// User Repository
// ============================================================================

/// Repository for `users`
pub struct UserRepo;

impl UserRepo {
    pub async fn insert(store: &dyn DataStore, user: &User) -> PersistenceResult<()> {
        store.insert(USERS, to_row(USERS, user)?).await?;
        Ok(())
    }

    pub async fn get(store: &dyn DataStore, id: &str) -> PersistenceResult<User> {
        get_by_id(store, USERS, "User", id).await
    }

    pub async fn exists(store: &dyn DataStore, id: &str) -> PersistenceResult<bool> {
        Ok(store.get(USERS, id).await?.is_some())
    }

    /// Everyone except `user_id`, by email
    pub async fn list_except(store: &dyn DataStore, user_id: &str) -> PersistenceResult<Vec<User>> {
        fetch_all(
            store,
            &Query::new(USERS).neq("id", user_id).order_asc("email"),
        )
        .await
    }

    /// Merge profile fields and bump `updated_at`
    pub async fn update_profile(
        store: &dyn DataStore,
        id: &str,
        mut patch: Row,
        at: DateTime<Utc>,
    ) -> PersistenceResult<User> {
        patch.insert("updated_at".to_string(), timestamp(at));
        store.update(USERS, id, patch).await?;
        Self::get(store, id).await
    }
}

// ============================================================================
// Student Repository
// ============================================================================

/// Repository for `students`
pub struct StudentRepo;

impl StudentRepo {
    pub async fn insert(store: &dyn DataStore, student: &Student) -> PersistenceResult<()> {
        store.insert(STUDENTS, to_row(STUDENTS, student)?).await?;
        Ok(())
    }

    pub async fn get(store: &dyn DataStore, id: &str) -> PersistenceResult<Student> {
        get_by_id(store, STUDENTS, "Student", id).await
    }

    pub async fn find_by_user(
        store: &dyn DataStore,
        user_id: &str,
    ) -> PersistenceResult<Option<Student>> {
        fetch_one(store, Query::new(STUDENTS).eq("user_id", user_id)).await
    }

    pub async fn find_by_qr_code(
        store: &dyn DataStore,
        qr_code: &str,
    ) -> PersistenceResult<Option<Student>> {
        fetch_one(store, Query::new(STUDENTS).eq("qr_code", qr_code)).await
    }
}

// ============================================================================
// Department / Club Repositories
// ============================================================================

/// Repository for `departments`
pub struct DepartmentRepo;

impl DepartmentRepo {
    pub async fn insert(store: &dyn DataStore, department: &Department) -> PersistenceResult<()> {
        store.insert(DEPARTMENTS, to_row(DEPARTMENTS, department)?).await?;
        Ok(())
    }

    pub async fn list(store: &dyn DataStore) -> PersistenceResult<Vec<Department>> {
        fetch_all(store, &Query::new(DEPARTMENTS).order_asc("name")).await
    }

    pub async fn find_by_code(
        store: &dyn DataStore,
        code: &str,
    ) -> PersistenceResult<Option<Department>> {
        fetch_one(store, Query::new(DEPARTMENTS).eq("code", code.to_uppercase())).await
    }
}

/// Repository for `clubs`
pub struct ClubRepo;

impl ClubRepo {
    pub async fn insert(store: &dyn DataStore, club: &Club) -> PersistenceResult<()> {
        store.insert(CLUBS, to_row(CLUBS, club)?).await?;
        Ok(())
    }

    pub async fn list(store: &dyn DataStore) -> PersistenceResult<Vec<Club>> {
        fetch_all(store, &Query::new(CLUBS).order_asc("name")).await
    }
}

// ============================================================================
// Event Repository
// ============================================================================

/// Repository for `events`
pub struct EventRepo;

impl EventRepo {
    pub async fn insert(store: &dyn DataStore, event: &CampusEvent) -> PersistenceResult<()> {
        store.insert(EVENTS, to_row(EVENTS, event)?).await?;
        Ok(())
    }

    pub async fn get(store: &dyn DataStore, id: &str) -> PersistenceResult<CampusEvent> {
        get_by_id(store, EVENTS, "Event", id).await
    }

    /// Events dated at or after `now`, soonest first
    pub async fn upcoming(
        store: &dyn DataStore,
        now: DateTime<Utc>,
    ) -> PersistenceResult<Vec<CampusEvent>> {
        let query = Query::new(EVENTS)
            .gte("event_date", timestamp(now))
            .order_asc("event_date");
        fetch_all(store, &query).await
    }

    /// Newest first; `created_by` restricts to one creator
    pub async fn list(
        store: &dyn DataStore,
        created_by: Option<&str>,
    ) -> PersistenceResult<Vec<CampusEvent>> {
        let mut query = Query::new(EVENTS);
        if let Some(creator) = created_by {
            query = query.eq("created_by", creator);
        }
        fetch_all(store, &query.order_desc("created_at")).await
    }

    pub async fn delete(store: &dyn DataStore, id: &str) -> PersistenceResult<()> {
        store.delete(EVENTS, id).await
    }
}

// ============================================================================
// Attendance Repository
// ============================================================================

/// Repository for `attendance`
pub struct AttendanceRepo;

impl AttendanceRepo {
    pub async fn insert(store: &dyn DataStore, record: &AttendanceRecord) -> PersistenceResult<()> {
        store.insert(ATTENDANCE, to_row(ATTENDANCE, record)?).await?;
        Ok(())
    }

    /// Latest scan of `student_id` at `event_id`
    pub async fn latest_for(
        store: &dyn DataStore,
        student_id: &str,
        event_id: &str,
    ) -> PersistenceResult<Option<AttendanceRecord>> {
        let query = Query::new(ATTENDANCE)
            .eq("student_id", student_id)
            .eq("event_id", event_id)
            .order_desc("timestamp");
        fetch_one(store, query).await
    }

    /// Scans of an event, newest first, with student → user expanded
    pub async fn list_for_event(
        store: &dyn DataStore,
        event_id: &str,
    ) -> PersistenceResult<Vec<AttendanceRecord>> {
        let query = Query::new(ATTENDANCE)
            .eq("event_id", event_id)
            .order_desc("timestamp")
            .expand(
                Expand::new("student", STUDENTS, "student_id")
                    .with(Expand::new("user", USERS, "user_id")),
            );
        fetch_all(store, &query).await
    }
}

// ============================================================================
// Message Repository
// ============================================================================

/// Repository for `messages`
pub struct MessageRepo;

impl MessageRepo {
    pub async fn insert(store: &dyn DataStore, message: &Message) -> PersistenceResult<()> {
        store.insert(MESSAGES, to_row(MESSAGES, message)?).await?;
        Ok(())
    }

    pub async fn get(store: &dyn DataStore, id: &str) -> PersistenceResult<Message> {
        get_by_id(store, MESSAGES, "Message", id).await
    }

    /// Messages to `user_id`, newest first, with the sender expanded
    pub async fn inbox(store: &dyn DataStore, user_id: &str) -> PersistenceResult<Vec<Message>> {
        let query = Query::new(MESSAGES)
            .eq("to_user_id", user_id)
            .order_desc("created_at")
            .expand(Expand::new("from_user", USERS, "from_user_id"));
        fetch_all(store, &query).await
    }

    /// Mark read only if `user_id` is the recipient
    pub async fn mark_read(
        store: &dyn DataStore,
        id: &str,
        user_id: &str,
    ) -> PersistenceResult<bool> {
        let mut patch = Row::new();
        patch.insert("is_read".to_string(), Value::Bool(true));
        store
            .update_where(MESSAGES, id, patch, &[Filter::eq("to_user_id", user_id)])
            .await
    }
}

// ============================================================================
// Credential / Session Repositories
// ============================================================================

/// Repository for `credentials`
pub struct CredentialRepo;

impl CredentialRepo {
    pub async fn insert(store: &dyn DataStore, credential: &CredentialRow) -> PersistenceResult<()> {
        store
            .insert(CREDENTIALS, to_row(CREDENTIALS, credential)?)
            .await?;
        Ok(())
    }

    pub async fn find_by_email(
        store: &dyn DataStore,
        email: &str,
    ) -> PersistenceResult<Option<CredentialRow>> {
        fetch_one(
            store,
            Query::new(CREDENTIALS).eq("email", email.trim().to_lowercase()),
        )
        .await
    }
}

/// Repository for `sessions`
pub struct SessionRepo;

impl SessionRepo {
    pub async fn insert(store: &dyn DataStore, session: &SessionRow) -> PersistenceResult<()> {
        store.insert(SESSIONS, to_row(SESSIONS, session)?).await?;
        Ok(())
    }

    pub async fn find_by_access_token(
        store: &dyn DataStore,
        token: &str,
    ) -> PersistenceResult<Option<SessionRow>> {
        fetch_one(store, Query::new(SESSIONS).eq("access_token", token)).await
    }

    pub async fn find_by_refresh_token(
        store: &dyn DataStore,
        token: &str,
    ) -> PersistenceResult<Option<SessionRow>> {
        fetch_one(store, Query::new(SESSIONS).eq("refresh_token", token)).await
    }

    pub async fn delete(store: &dyn DataStore, id: &str) -> PersistenceResult<()> {
        store.delete(SESSIONS, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use ssg_core::{ApprovalState, AttendanceKind, Role};

    async fn seed_student(store: &dyn DataStore) -> Student {
        let dept = Department::new("Computer Studies", "CCS");
        DepartmentRepo::insert(store, &dept).await.unwrap();
        let user = User::new("u-1", "ana@school.edu", Role::Student).with_name("Ana", "Reyes");
        UserRepo::insert(store, &user).await.unwrap();
        let student = Student::new(&user.id, &dept.id, 3, Utc::now());
        StudentRepo::insert(store, &student).await.unwrap();
        student
    }

    #[tokio::test]
    async fn test_clearance_decide_if_pending() {
        let store = MemoryStore::new();
        let req = ClearanceRequest::new("stu-1");
        ClearanceRepo::insert(&store, &req).await.unwrap();

        let at = Utc::now();
        assert!(ClearanceRepo::decide_if_pending(&store, &req.id, Party::Club, Decision::Approved, "club-1", at)
            .await
            .unwrap());
        assert!(!ClearanceRepo::decide_if_pending(&store, &req.id, Party::Club, Decision::Rejected, "club-2", at)
            .await
            .unwrap());

        let stored = ClearanceRepo::get(&store, &req.id).await.unwrap();
        assert_eq!(stored.club.state, ApprovalState::Approved);
        assert_eq!(stored.club.decided_by.as_deref(), Some("club-1"));
        assert_eq!(stored.updated_at, at);
    }

    #[tokio::test]
    async fn test_pending_on_expands_student() {
        let store = MemoryStore::new();
        let student = seed_student(&store).await;

        let decided = ClearanceRequest::new(&student.id);
        ClearanceRepo::insert(&store, &decided).await.unwrap();
        ClearanceRepo::decide_if_pending(&store, &decided.id, Party::Department, Decision::Approved, "d-1", Utc::now())
            .await
            .unwrap();
        let open = ClearanceRequest::new(&student.id);
        ClearanceRepo::insert(&store, &open).await.unwrap();

        let views = ClearanceRepo::pending_on(&store, Party::Department, 10).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].request.id, open.id);

        let expanded = views[0].student.as_ref().unwrap();
        assert_eq!(expanded.display_name(), "Ana Reyes");
        assert_eq!(expanded.department_name(), Some("Computer Studies"));
    }

    #[tokio::test]
    async fn test_student_lookups() {
        let store = MemoryStore::new();
        let student = seed_student(&store).await;

        let by_qr = StudentRepo::find_by_qr_code(&store, &student.qr_code).await.unwrap();
        assert_eq!(by_qr.map(|s| s.id), Some(student.id.clone()));
        assert!(StudentRepo::find_by_qr_code(&store, "SSG-0-nobody").await.unwrap().is_none());

        let by_user = StudentRepo::find_by_user(&store, "u-1").await.unwrap().unwrap();
        assert_eq!(by_user.student_number, student.student_number);

        assert!(DepartmentRepo::find_by_code(&store, "ccs").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_attendance_latest_for() {
        let store = MemoryStore::new();
        let mut first = AttendanceRecord::new("s-1", "e-1", AttendanceKind::In, "oic-1");
        first.timestamp = Utc::now() - chrono::Duration::minutes(5);
        let second = AttendanceRecord::new("s-1", "e-1", AttendanceKind::Out, "oic-1");
        AttendanceRepo::insert(&store, &first).await.unwrap();
        AttendanceRepo::insert(&store, &second).await.unwrap();

        let latest = AttendanceRepo::latest_for(&store, "s-1", "e-1").await.unwrap().unwrap();
        assert_eq!(latest.kind, AttendanceKind::Out);
        assert!(AttendanceRepo::latest_for(&store, "s-1", "e-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_message_mark_read_only_by_recipient() {
        let store = MemoryStore::new();
        let message = Message::new("u-1", "u-2", "Hello", "Meeting at 3");
        MessageRepo::insert(&store, &message).await.unwrap();

        assert!(!MessageRepo::mark_read(&store, &message.id, "u-3").await.unwrap());
        assert!(!MessageRepo::get(&store, &message.id).await.unwrap().is_read);

        assert!(MessageRepo::mark_read(&store, &message.id, "u-2").await.unwrap());
        assert!(MessageRepo::get(&store, &message.id).await.unwrap().is_read);
    }

    #[tokio::test]
    async fn test_upcoming_events() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let past = CampusEvent::new("Orientation", now - chrono::Duration::days(1), "admin-1");
        let soon = CampusEvent::new("Assembly", now + chrono::Duration::days(1), "admin-1");
        let later = CampusEvent::new("Fair", now + chrono::Duration::days(7), "admin-2");
        for event in [&past, &later, &soon] {
            EventRepo::insert(&store, event).await.unwrap();
        }

        let titles: Vec<String> = EventRepo::upcoming(&store, now)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["Assembly", "Fair"]);
        assert_eq!(EventRepo::list(&store, Some("admin-2")).await.unwrap().len(), 1);
    }
}
