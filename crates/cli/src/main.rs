//! SSG CLI - student clearance from the command line
//!
//! Usage:
//! ```bash
//! ssg init --department "Computer Studies=CCS" --club Robotics
//! ssg signup ana@school.edu secret1 --role student --department CCS --year 3
//! ssg login ana@school.edu secret1
//! ssg clearance request
//! ssg clearance approve <REQUEST_ID>
//! ssg clearance certificate <REQUEST_ID> --format html
//! ssg attend scan <EVENT_ID> SSG-1700000000000-abcd1234
//! ssg report clearance --format csv --output clearances.csv
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ssg_business::AppConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod db;
mod session;

use commands::{account, attendance, audit, clearance, event, message, report};

/// SSG - digital clearance, events and attendance for student government
#[derive(Parser)]
#[command(name = "ssg")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Where login tokens are kept
    #[arg(long, default_value = "data/session.json", global = true)]
    pub session: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and seed departments and clubs
    Init {
        /// Department as NAME=CODE (repeatable)
        #[arg(long = "department")]
        departments: Vec<String>,
        /// Club name (repeatable)
        #[arg(long = "club")]
        clubs: Vec<String>,
    },

    /// Show database status
    Status,

    /// Create an account and log in
    Signup {
        email: String,
        password: String,
        #[arg(long, default_value = "student")]
        role: RoleArg,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        #[arg(long)]
        phone: Option<String>,
        /// Department code, required for students
        #[arg(long)]
        department: Option<String>,
        #[arg(long, default_value_t = 1)]
        year: u8,
        #[arg(long)]
        section: Option<String>,
    },

    /// Log in and save the session
    Login { email: String, password: String },

    /// End the saved session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Update name or phone of the logged-in user
    Profile {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },

    /// Clearance requests
    Clearance {
        #[command(subcommand)]
        action: ClearanceAction,
    },

    /// Campus events
    Event {
        #[command(subcommand)]
        action: EventAction,
    },

    /// QR attendance
    Attend {
        #[command(subcommand)]
        action: AttendAction,
    },

    /// Internal messages
    Message {
        #[command(subcommand)]
        action: MessageAction,
    },

    /// Export reports
    Report {
        #[command(subcommand)]
        kind: ReportKind,
    },

    /// Read the audit trail (SSG super admin)
    Audit {
        /// Day to read (YYYY-MM-DD); all days when omitted
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        actor: Option<String>,
        #[arg(long)]
        target: Option<String>,
        /// Event types (comma-separated, e.g. clearance_decided)
        #[arg(long = "type", value_delimiter = ',')]
        types: Vec<String>,
        /// Show at most this many of the latest events
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

#[derive(Subcommand)]
pub enum ClearanceAction {
    /// Submit a new clearance request (students)
    Request,
    /// List clearance requests
    List {
        /// Student ID (admins); students always see their own
        #[arg(long)]
        student: Option<String>,
    },
    /// Requests waiting on your stage (admins)
    Pending {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Approve your stage of a request
    Approve { request_id: String },
    /// Reject your stage of a request
    Reject { request_id: String },
    /// Render the certificate of a fully approved request
    Certificate {
        request_id: String,
        #[arg(long, default_value = "html")]
        format: CertificateFormat,
    },
}

#[derive(Subcommand)]
pub enum EventAction {
    /// Create an event (admins)
    Create {
        title: String,
        /// RFC 3339 or "YYYY-MM-DD HH:MM" (UTC)
        date: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        mandatory: bool,
    },
    /// Events you manage
    List,
    /// Events from now on
    Upcoming,
    /// Delete an event you created
    Delete { event_id: String },
}

#[derive(Subcommand)]
pub enum AttendAction {
    /// Record a QR scan
    Scan { event_id: String, qr_code: String },
    /// Scans of an event
    List { event_id: String },
}

#[derive(Subcommand)]
pub enum MessageAction {
    /// Send a message to another user
    Send {
        /// Recipient email
        to: String,
        subject: String,
        content: String,
    },
    /// Messages sent to you
    Inbox,
    /// Mark a message as read
    Read { message_id: String },
    /// Users you can write to
    Recipients,
}

#[derive(Subcommand)]
pub enum ReportKind {
    /// All clearance requests (admins)
    Clearance {
        #[arg(long, default_value = "markdown")]
        format: ReportFormat,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Scans recorded at one event
    Attendance {
        event_id: String,
        #[arg(long, default_value = "markdown")]
        format: ReportFormat,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum RoleArg {
    SsgSuperAdmin,
    ClubAdmin,
    DepartmentAdmin,
    OfficerInCharge,
    Student,
}

impl RoleArg {
    pub fn to_core_role(&self) -> ssg_core::Role {
        match self {
            RoleArg::SsgSuperAdmin => ssg_core::Role::SsgSuperAdmin,
            RoleArg::ClubAdmin => ssg_core::Role::ClubAdmin,
            RoleArg::DepartmentAdmin => ssg_core::Role::DepartmentAdmin,
            RoleArg::OfficerInCharge => ssg_core::Role::OfficerInCharge,
            RoleArg::Student => ssg_core::Role::Student,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CertificateFormat {
    Html,
    Markdown,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ReportFormat {
    Csv,
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn to_export_format(&self) -> ssg_reports::ExportFormat {
        match self {
            ReportFormat::Csv => ssg_reports::ExportFormat::Csv,
            ReportFormat::Json => ssg_reports::ExportFormat::Json,
            ReportFormat::Markdown => ssg_reports::ExportFormat::Markdown,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let app = db::App::open(config, cli.session).await?;

    match cli.command {
        Commands::Init { departments, clubs } => {
            db::init(&app, &departments, &clubs).await?;
        }

        Commands::Status => {
            db::show_status(&app).await?;
        }

        Commands::Signup {
            email,
            password,
            role,
            first_name,
            last_name,
            phone,
            department,
            year,
            section,
        } => {
            let form = account::SignUpForm {
                email,
                password,
                role: role.to_core_role(),
                first_name,
                last_name,
                phone,
                department_code: department,
                year_level: year,
                section,
            };
            account::signup(&app, form).await?;
        }

        Commands::Login { email, password } => {
            account::login(&app, &email, &password).await?;
        }

        Commands::Logout => {
            account::logout(&app).await?;
        }

        Commands::Whoami => {
            account::whoami(&app).await?;
        }

        Commands::Profile {
            first_name,
            last_name,
            phone,
        } => {
            account::update_profile(&app, first_name, last_name, phone).await?;
        }

        Commands::Clearance { action } => {
            clearance::handle(&app, action).await?;
        }

        Commands::Event { action } => {
            event::handle(&app, action).await?;
        }

        Commands::Attend { action } => {
            attendance::handle(&app, action).await?;
        }

        Commands::Message { action } => {
            message::handle(&app, action).await?;
        }

        Commands::Report { kind } => {
            report::handle(&app, kind).await?;
        }

        Commands::Audit {
            date,
            actor,
            target,
            types,
            limit,
        } => {
            let query = audit::AuditQuery {
                date,
                actor,
                target,
                types,
                limit,
            };
            audit::run_audit(&app, query).await?;
        }
    }

    app.close().await
}
