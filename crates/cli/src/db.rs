//! Store setup, initialization and status

use anyhow::{bail, Context, Result};
use ssg_business::{AppConfig, DirectoryService, LocalIdentityProvider, ServiceContext};
use ssg_persistence::{collections, AuditLog, DataStore, SqliteStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a command needs for one invocation
pub struct App {
    pub config: AppConfig,
    pub store: Arc<SqliteStore>,
    pub audit: Arc<AuditLog>,
    pub ctx: ServiceContext,
    pub session_path: PathBuf,
}

impl App {
    pub async fn open(config: AppConfig, session_path: PathBuf) -> Result<Self> {
        if let Some(parent) = database_file(&config.database_url).and_then(|p| p.parent()) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {:?}", parent))?;
            }
        }

        let store = Arc::new(
            SqliteStore::connect(&config.database_url)
                .await
                .with_context(|| format!("Failed to open database {}", config.database_url))?,
        );
        let audit = Arc::new(
            AuditLog::new(&config.audit_dir)
                .with_context(|| format!("Failed to open audit log {:?}", config.audit_dir))?,
        );

        let shared: Arc<dyn DataStore> = store.clone();
        let ctx = ServiceContext::new(shared)
            .with_audit(audit.clone())
            .with_attendance_location(&config.attendance_location);

        Ok(Self {
            config,
            store,
            audit,
            ctx,
            session_path,
        })
    }

    pub fn identity(&self) -> LocalIdentityProvider {
        LocalIdentityProvider::new(self.ctx.clone(), self.config.session_ttl())
    }

    pub async fn close(self) -> Result<()> {
        self.audit.flush()?;
        self.store.pool().close().await;
        Ok(())
    }
}

/// File path inside a `sqlite:` URL, `None` for in-memory databases
fn database_file(url: &str) -> Option<&Path> {
    let rest = url.strip_prefix("sqlite:")?;
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(Path::new(path))
    }
}

/// Split `NAME=CODE`
pub fn parse_department(spec: &str) -> Result<(String, String)> {
    match spec.split_once('=') {
        Some((name, code)) if !name.trim().is_empty() && !code.trim().is_empty() => {
            Ok((name.trim().to_string(), code.trim().to_string()))
        }
        _ => bail!("Invalid department '{}', expected NAME=CODE", spec),
    }
}

/// Create the schema and seed departments and clubs
pub async fn init(app: &App, departments: &[String], clubs: &[String]) -> Result<()> {
    let directory = DirectoryService::new(&app.ctx);

    for spec in departments {
        let (name, code) = parse_department(spec)?;
        let department = directory
            .ensure_department(&name, &code)
            .await
            .with_context(|| format!("Failed to create department {}", code))?;
        println!("   Department: {} ({})", department.name, department.code);
    }

    let existing: Vec<String> = directory.clubs().await?.into_iter().map(|c| c.name).collect();
    for name in clubs {
        if existing.iter().any(|c| c.eq_ignore_ascii_case(name.trim())) {
            continue;
        }
        let club = directory.add_club(name, None).await?;
        println!("   Club:       {}", club.name);
    }

    println!("✅ Database initialized at {}", app.config.database_url);
    Ok(())
}

/// Print configuration and row counts
pub async fn show_status(app: &App) -> Result<()> {
    println!("📊 SSG Status");
    println!("   Database:     {}", app.config.database_url);
    println!("   Audit log:    {:?}", app.config.audit_dir);
    println!("   Certificates: {:?}", app.config.certificate_dir);
    println!();

    let counts = app.store.collection_counts().await?;
    if counts.is_empty() {
        println!("   (no records yet - run 'ssg init')");
    }
    for collection in collections::ALL {
        let count = counts
            .iter()
            .find(|(name, _)| name == collection)
            .map_or(0, |(_, count)| *count);
        println!("   {:<20} {}", collection, count);
    }

    let audit_files = app.audit.list_files()?;
    println!();
    println!("   Audit files:  {}", audit_files.len());

    let directory = DirectoryService::new(&app.ctx);
    let departments = directory.departments().await?;
    if !departments.is_empty() {
        println!();
        println!("   Departments:");
        for department in departments {
            println!("     {} - {}", department.code, department.name);
        }
    }
    Ok(())
}
