//! Attendance commands

use anyhow::{Context, Result};
use ssg_business::{AttendanceService, EventService};

use crate::commands::principal;
use crate::db::App;
use crate::AttendAction;

pub async fn handle(app: &App, action: AttendAction) -> Result<()> {
    let principal = principal(app).await?;
    let attendance = AttendanceService::new(&app.ctx);

    match action {
        AttendAction::Scan { event_id, qr_code } => {
            let outcome = attendance
                .record_scan(&principal, &event_id, &qr_code)
                .await
                .context("Scan not recorded")?;
            println!(
                "✅ {} checked {} at {}",
                outcome.student.student_number,
                outcome.record.kind,
                outcome.record.timestamp.format("%H:%M:%S")
            );
        }

        AttendAction::List { event_id } => {
            let event = EventService::new(&app.ctx).get(&event_id).await?;
            let records = attendance.list_for_event(&event_id).await?;
            println!("📋 {} - {} scan(s)", event.title, records.len());
            for record in records {
                let who = record
                    .student
                    .as_ref()
                    .map(|s| format!("{} ({})", s.display_name(), s.student_number))
                    .unwrap_or_else(|| record.student_id.clone());
                println!(
                    "   {}  {:<3}  {}",
                    record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    record.kind,
                    who
                );
            }
        }
    }

    Ok(())
}
