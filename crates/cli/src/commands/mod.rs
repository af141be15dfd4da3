//! Command handlers

pub mod account;
pub mod attendance;
pub mod audit;
pub mod clearance;
pub mod event;
pub mod message;
pub mod report;

use crate::db::App;
use crate::session;
use anyhow::Result;
use ssg_core::Principal;

/// Resolve the logged-in principal from the session file
pub async fn principal(app: &App) -> Result<Principal> {
    let identity = app.identity();
    session::require_principal(&identity, &app.session_path).await
}
