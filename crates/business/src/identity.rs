//! Identity provider - accounts, sessions, profiles
//!
//! `LocalIdentityProvider` keeps credentials and sessions in the same
//! `DataStore` as everything else.

use crate::context::ServiceContext;
use crate::error::{BusinessError, BusinessResult};
use crate::password::PasswordHasher;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ssg_core::{AuditEventType, Principal, Role, Student, User};
use ssg_persistence::collections::DEPARTMENTS;
use ssg_persistence::{
    CredentialRepo, CredentialRow, Row, SessionRepo, SessionRow, StudentRepo, UserRepo,
};
use tracing::{debug, warn};

const MIN_PASSWORD_LEN: usize = 6;

/// Sign-up form
#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    /// Required for students
    pub department_id: Option<String>,
    pub year_level: Option<u8>,
    pub section: Option<String>,
}

impl SignUp {
    pub fn new(email: &str, password: &str, role: Role) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
            role,
            first_name: String::new(),
            last_name: String::new(),
            phone: None,
            department_id: None,
            year_level: None,
            section: None,
        }
    }

    pub fn with_name(mut self, first_name: &str, last_name: &str) -> Self {
        self.first_name = first_name.to_string();
        self.last_name = last_name.to_string();
        self
    }

    pub fn with_department(mut self, department_id: &str, year_level: u8) -> Self {
        self.department_id = Some(department_id.to_string());
        self.year_level = Some(year_level);
        self
    }
}

/// Profile fields a user may change; `None` leaves the field alone.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

impl ProfileUpdate {
    fn into_patch(self) -> Row {
        let mut patch = Row::new();
        for (key, value) in [
            ("first_name", self.first_name),
            ("last_name", self.last_name),
            ("phone", self.phone),
        ] {
            if let Some(value) = value {
                patch.insert(key.to_string(), Value::String(value.trim().to_string()));
            }
        }
        patch
    }
}

/// Signed-in session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

impl Session {
    pub fn principal(&self) -> Principal {
        Principal::new(self.user.id.clone(), self.user.role)
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, request: SignUp) -> BusinessResult<Session>;

    async fn sign_in(&self, email: &str, password: &str) -> BusinessResult<Session>;

    /// Exchange a refresh token for a new session; both tokens rotate.
    async fn refresh(&self, refresh_token: &str) -> BusinessResult<Session>;

    /// Resolve an access token; unknown or expired → `Unauthenticated`.
    async fn principal(&self, access_token: &str) -> BusinessResult<Principal>;

    async fn sign_out(&self, access_token: &str) -> BusinessResult<()>;

    async fn update_profile(
        &self,
        principal: &Principal,
        update: ProfileUpdate,
    ) -> BusinessResult<User>;
}

pub struct LocalIdentityProvider {
    ctx: ServiceContext,
    session_ttl: Duration,
    hasher: PasswordHasher,
}

impl LocalIdentityProvider {
    pub fn new(ctx: ServiceContext, session_ttl: Duration) -> Self {
        Self {
            ctx,
            session_ttl,
            hasher: PasswordHasher::default(),
        }
    }

    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    fn new_token() -> String {
        format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        )
    }

    async fn open_session(&self, user: User) -> BusinessResult<Session> {
        let now = Utc::now();
        let row = SessionRow {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            access_token: Self::new_token(),
            refresh_token: Self::new_token(),
            expires_at: now + self.session_ttl,
            created_at: now,
        };
        SessionRepo::insert(self.ctx.store(), &row).await?;

        Ok(Session {
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            expires_at: row.expires_at,
            user,
        })
    }

    fn validate(request: &SignUp) -> BusinessResult<()> {
        let email = request.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(BusinessError::validation(format!("invalid email: '{}'", email)));
        }
        if request.password.len() < MIN_PASSWORD_LEN {
            return Err(BusinessError::validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if request.role == Role::Student && request.department_id.is_none() {
            return Err(BusinessError::validation("students must select a department"));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_up(&self, request: SignUp) -> BusinessResult<Session> {
        Self::validate(&request)?;
        let store = self.ctx.store();
        let email = request.email.trim().to_lowercase();

        if CredentialRepo::find_by_email(store, &email).await?.is_some() {
            return Err(BusinessError::validation(format!(
                "email already registered: {}",
                email
            )));
        }

        let now = Utc::now();
        let mut user = User::new(&uuid::Uuid::new_v4().to_string(), &email, request.role)
            .with_name(request.first_name.trim(), request.last_name.trim());
        user.phone = request.phone.clone();

        // The student profile is validated before anything is written.
        let student = match (&request.role, &request.department_id) {
            (Role::Student, Some(department_id)) => {
                if store.get(DEPARTMENTS, department_id).await?.is_none() {
                    return Err(BusinessError::not_found("Department", department_id));
                }
                let mut student =
                    Student::new(&user.id, department_id, request.year_level.unwrap_or(1), now);
                student.section = request.section.clone();
                Some(student)
            }
            _ => None,
        };

        let password_hash = self.hasher.hash(&request.password)?;
        UserRepo::insert(store, &user).await?;
        CredentialRepo::insert(
            store,
            &CredentialRow {
                id: user.id.clone(),
                email: email.clone(),
                password_hash,
                created_at: now,
            },
        )
        .await?;
        if let Some(student) = &student {
            StudentRepo::insert(store, student).await?;
        }

        let principal = Principal::new(user.id.clone(), user.role);
        self.ctx.record(
            AuditEventType::UserRegistered,
            &principal,
            &user.id,
            &format!("registered {} as {}", email, user.role),
        );
        self.open_session(user).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> BusinessResult<Session> {
        let store = self.ctx.store();
        let Some(credential) = CredentialRepo::find_by_email(store, email).await? else {
            warn!(email, "sign-in for unknown email");
            return Err(BusinessError::Unauthenticated);
        };
        if !self.hasher.verify(password, &credential.password_hash)? {
            warn!(email, "sign-in with wrong password");
            return Err(BusinessError::Unauthenticated);
        }

        let user = UserRepo::get(store, &credential.id)
            .await
            .map_err(BusinessError::from_lookup)?;
        self.ctx.record(
            AuditEventType::SignedIn,
            &Principal::new(user.id.clone(), user.role),
            &user.id,
            "signed in",
        );
        self.open_session(user).await
    }

    async fn refresh(&self, refresh_token: &str) -> BusinessResult<Session> {
        let store = self.ctx.store();
        let old = SessionRepo::find_by_refresh_token(store, refresh_token)
            .await?
            .ok_or(BusinessError::Unauthenticated)?;
        SessionRepo::delete(store, &old.id).await?;

        let user = UserRepo::get(store, &old.user_id)
            .await
            .map_err(BusinessError::from_lookup)?;
        debug!(user = %user.id, "session refreshed");
        self.open_session(user).await
    }

    async fn principal(&self, access_token: &str) -> BusinessResult<Principal> {
        let store = self.ctx.store();
        let session = SessionRepo::find_by_access_token(store, access_token)
            .await?
            .ok_or(BusinessError::Unauthenticated)?;
        if session.is_expired(Utc::now()) {
            return Err(BusinessError::Unauthenticated);
        }

        let user = UserRepo::get(store, &session.user_id)
            .await
            .map_err(|_| BusinessError::Unauthenticated)?;
        Ok(Principal::new(user.id, user.role))
    }

    async fn sign_out(&self, access_token: &str) -> BusinessResult<()> {
        let store = self.ctx.store();
        if let Some(session) = SessionRepo::find_by_access_token(store, access_token).await? {
            SessionRepo::delete(store, &session.id).await?;
        }
        Ok(())
    }

    async fn update_profile(
        &self,
        principal: &Principal,
        update: ProfileUpdate,
    ) -> BusinessResult<User> {
        let patch = update.into_patch();
        if patch.is_empty() {
            return UserRepo::get(self.ctx.store(), &principal.user_id)
                .await
                .map_err(BusinessError::from_lookup);
        }

        let fields: Vec<String> = patch.keys().cloned().collect();
        let user = UserRepo::update_profile(self.ctx.store(), &principal.user_id, patch, Utc::now())
            .await
            .map_err(BusinessError::from_lookup)?;
        self.ctx.record(
            AuditEventType::ProfileUpdated,
            principal,
            &user.id,
            &format!("updated {}", fields.join(", ")),
        );
        Ok(user)
    }
}
