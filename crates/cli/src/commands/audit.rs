//! Audit trail command

use anyhow::{Context, Result};
use ssg_business::BusinessError;
use ssg_core::{AuditEventType, Role};
use ssg_persistence::{AuditFilter, AuditReader};

use crate::commands::principal;
use crate::db::App;

/// Query options for `ssg audit`
pub struct AuditQuery {
    pub date: Option<String>,
    pub actor: Option<String>,
    pub target: Option<String>,
    pub types: Vec<String>,
    pub limit: usize,
}

pub async fn run_audit(app: &App, query: AuditQuery) -> Result<()> {
    let principal = principal(app).await?;
    if principal.role != Role::SsgSuperAdmin {
        return Err(BusinessError::unauthorized(principal.role, "read the audit trail").into());
    }

    let mut filter = AuditFilter::new();
    if let Some(actor) = &query.actor {
        filter = filter.actor(actor);
    }
    if let Some(target) = &query.target {
        filter = filter.target(target);
    }
    if !query.types.is_empty() {
        let types = query
            .types
            .iter()
            .map(|t| t.parse::<AuditEventType>())
            .collect::<Result<Vec<_>, _>>()
            .context("Invalid --type")?;
        filter = filter.event_types(types);
    }

    app.audit.flush()?;
    let reader = AuditReader::new(&app.config.audit_dir);
    let events = match &query.date {
        Some(date) => reader.read_date(date)?,
        None => reader.read_all()?,
    };
    let events = filter.apply(events);

    println!("🔍 Audit trail ({:?})", app.config.audit_dir);
    if let Some(date) = &query.date {
        println!("   Date: {}", date);
    }
    println!("   Matching events: {}", events.len());
    println!();

    let skip = events.len().saturating_sub(query.limit);
    for event in events.iter().skip(skip) {
        println!("{}  {}", event.event_id, event);
        if let Some(description) = &event.description {
            println!("             {}", description);
        }
    }
    Ok(())
}
