//! Report export commands

use anyhow::{Context, Result};
use ssg_business::{AttendanceService, BusinessError, ClearanceWorkflow, EventService};
use ssg_reports::{AttendanceReport, ClearanceReport, ReportData};
use std::path::Path;

use crate::commands::principal;
use crate::db::App;
use crate::{ReportFormat, ReportKind};

pub async fn handle(app: &App, kind: ReportKind) -> Result<()> {
    let principal = principal(app).await?;

    match kind {
        ReportKind::Clearance { format, output } => {
            let views = ClearanceWorkflow::new(&app.ctx).list_all(&principal).await?;
            let report = ClearanceReport::new("Clearance Requests", views);
            write_report(&report, format, output.as_deref())?;
        }

        ReportKind::Attendance {
            event_id,
            format,
            output,
        } => {
            if !principal.role.can_record_attendance() && !principal.role.is_admin() {
                return Err(BusinessError::unauthorized(principal.role, "export attendance").into());
            }
            let event = EventService::new(&app.ctx).get(&event_id).await?;
            let records = AttendanceService::new(&app.ctx)
                .list_for_event(&event_id)
                .await?;
            let report = AttendanceReport::new(event, records);
            write_report(&report, format, output.as_deref())?;
        }
    }

    Ok(())
}

fn write_report(report: &dyn ReportData, format: ReportFormat, output: Option<&Path>) -> Result<()> {
    let exporter = format.to_export_format().exporter();
    let content = exporter.export(report);

    match output {
        Some(path) => {
            std::fs::write(path, &content)
                .with_context(|| format!("Failed to write report to {:?}", path))?;
            println!(
                "✅ {} report written to {:?} ({})",
                exporter.extension(),
                path,
                exporter.mime_type()
            );
        }
        None => print!("{}", content),
    }
    Ok(())
}
