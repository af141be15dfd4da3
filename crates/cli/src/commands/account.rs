//! Sign-up, login and profile commands

use anyhow::{Context, Result};
use ssg_business::{ClearanceWorkflow, DirectoryService, IdentityProvider, ProfileUpdate, SignUp};
use ssg_core::{Role, User};
use ssg_persistence::UserRepo;

use crate::commands::principal;
use crate::db::App;
use crate::session::SessionFile;

/// Sign-up arguments as given on the command line
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub department_code: Option<String>,
    pub year_level: u8,
    pub section: Option<String>,
}

pub async fn signup(app: &App, form: SignUpForm) -> Result<()> {
    let mut request = SignUp::new(&form.email, &form.password, form.role)
        .with_name(&form.first_name, &form.last_name);
    request.phone = form.phone;
    request.section = form.section;

    if let Some(code) = &form.department_code {
        let department = DirectoryService::new(&app.ctx)
            .department_by_code(code)
            .await
            .with_context(|| format!("Unknown department code {}. Run 'ssg status' to list them.", code))?;
        request = request.with_department(&department.id, form.year_level);
    }

    let session = app.identity().sign_up(request).await.context("Sign-up failed")?;
    SessionFile::from(&session).save(&app.session_path)?;

    println!("✅ Registered {} as {}", session.user.email, session.user.role);
    if session.user.role == Role::Student {
        let student = ClearanceWorkflow::new(&app.ctx)
            .student_of(&session.principal())
            .await?;
        println!("   Student ID: {}", student.student_number);
        println!("   QR code:    {}", student.qr_code);
    }
    Ok(())
}

pub async fn login(app: &App, email: &str, password: &str) -> Result<()> {
    let session = app
        .identity()
        .sign_in(email, password)
        .await
        .context("Login failed")?;
    SessionFile::from(&session).save(&app.session_path)?;

    println!("✅ Logged in as {} ({})", session.user.full_name(), session.user.role);
    println!("   Session expires: {}", session.expires_at.format("%Y-%m-%d %H:%M UTC"));
    Ok(())
}

pub async fn logout(app: &App) -> Result<()> {
    if let Some(saved) = SessionFile::load(&app.session_path)? {
        app.identity().sign_out(&saved.access_token).await?;
    }
    SessionFile::remove(&app.session_path)?;
    println!("👋 Logged out");
    Ok(())
}

fn print_user(user: &User) {
    println!("👤 {}", user.full_name());
    println!("   User ID: {}", user.id);
    println!("   Email:   {}", user.email);
    println!("   Role:    {}", user.role);
    if let Some(phone) = &user.phone {
        println!("   Phone:   {}", phone);
    }
}

pub async fn whoami(app: &App) -> Result<()> {
    let principal = principal(app).await?;
    let user = UserRepo::get(app.ctx.store(), &principal.user_id).await?;
    print_user(&user);

    if principal.role == Role::Student {
        let student = ClearanceWorkflow::new(&app.ctx).student_of(&principal).await?;
        println!("   Student: {} (year {})", student.student_number, student.year_level);
        println!("   QR code: {}", student.qr_code);
    }
    Ok(())
}

pub async fn update_profile(
    app: &App,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
) -> Result<()> {
    let principal = principal(app).await?;
    let update = ProfileUpdate {
        first_name,
        last_name,
        phone,
    };
    let user = app.identity().update_profile(&principal, update).await?;
    println!("✅ Profile updated");
    print_user(&user);
    Ok(())
}
