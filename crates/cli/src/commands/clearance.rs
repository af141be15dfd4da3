//! Clearance commands

use anyhow::{Context, Result};
use ssg_business::ClearanceWorkflow;
use ssg_core::{ClearanceRequest, Decision, Party, Principal};
use ssg_persistence::ClearanceView;
use ssg_reports::FileCertificateRenderer;

use crate::commands::principal;
use crate::db::App;
use crate::{CertificateFormat, ClearanceAction};

pub async fn handle(app: &App, action: ClearanceAction) -> Result<()> {
    let principal = principal(app).await?;
    let workflow = ClearanceWorkflow::new(&app.ctx);

    match action {
        ClearanceAction::Request => {
            let student = workflow.student_of(&principal).await?;
            let request = workflow
                .submit(Some(&principal), &student.id)
                .await
                .context("Failed to submit clearance request")?;
            println!("✅ Clearance requested");
            print_request(&request);
        }

        ClearanceAction::List { student } => {
            let requests = match student {
                Some(student_id) => workflow.list_for_student(&principal, &student_id).await?,
                None if principal.role.is_admin() => workflow
                    .list_all(&principal)
                    .await?
                    .into_iter()
                    .map(|view| view.request)
                    .collect(),
                None => {
                    let own = workflow.student_of(&principal).await?;
                    workflow.list_for_student(&principal, &own.id).await?
                }
            };
            if requests.is_empty() {
                println!("No clearance requests yet");
            }
            for request in &requests {
                print_request(request);
            }
        }

        ClearanceAction::Pending { limit } => {
            let limit = limit.unwrap_or(app.config.dashboard_limit);
            let pending = workflow.pending_for(&principal, limit).await?;
            println!("⏳ {} request(s) waiting on you", pending.len());
            for view in &pending {
                print_view(view);
            }
        }

        ClearanceAction::Approve { request_id } => {
            decide(&workflow, &principal, &request_id, Decision::Approved).await?;
        }

        ClearanceAction::Reject { request_id } => {
            decide(&workflow, &principal, &request_id, Decision::Rejected).await?;
        }

        ClearanceAction::Certificate { request_id, format } => {
            let renderer = match format {
                CertificateFormat::Html => FileCertificateRenderer::html(&app.config.certificate_dir),
                CertificateFormat::Markdown => {
                    FileCertificateRenderer::markdown(&app.config.certificate_dir)
                }
            };
            let issued = workflow
                .issue_certificate(&principal, &request_id, &renderer)
                .await
                .context("Failed to issue certificate")?;
            println!("📄 Certificate written to {}", issued.handle.url);
            println!("   Verification code: {}", issued.request.verification_code());
        }
    }

    Ok(())
}

async fn decide(
    workflow: &ClearanceWorkflow<'_>,
    principal: &Principal,
    request_id: &str,
    decision: Decision,
) -> Result<()> {
    let request = workflow
        .decide(principal, request_id, decision)
        .await
        .with_context(|| format!("Failed to record {} on request {}", decision, request_id))?;
    println!("✅ Recorded: {}", decision);
    print_request(&request);
    Ok(())
}

fn print_request(request: &ClearanceRequest) {
    println!("📋 {} [{}]", request.id, request.status().label());
    println!("   Requested: {}", request.created_at.format("%Y-%m-%d %H:%M"));
    for party in Party::ALL {
        let stage = request.stage(party);
        match (&stage.decided_by, stage.decided_at) {
            (Some(by), Some(at)) => println!(
                "   {:<11} {} by {} at {}",
                format!("{}:", party.label()),
                stage.state,
                by,
                at.format("%Y-%m-%d %H:%M")
            ),
            _ => println!("   {:<11} {}", format!("{}:", party.label()), stage.state),
        }
    }
    if let Some(url) = &request.pdf_url {
        println!("   Certificate: {}", url);
    }
}

fn print_view(view: &ClearanceView) {
    match &view.student {
        Some(student) => println!(
            "👤 {} ({}) - {}",
            student.display_name(),
            student.student_number,
            student.department_name().unwrap_or("N/A")
        ),
        None => println!("👤 student {}", view.request.student_id),
    }
    print_request(&view.request);
}
