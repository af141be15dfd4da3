//! # SSG Business
//!
//! Business logic layer - clearance workflow, identity, events, attendance
//! and messaging. Every operation takes an explicit `Principal`.

pub mod attendance;
pub mod certificate;
pub mod clearance;
pub mod config;
pub mod context;
pub mod directory;
pub mod error;
pub mod events;
pub mod identity;
pub mod messaging;
pub mod password;

pub use attendance::{AttendanceService, ScanOutcome};
pub use certificate::{CertificateData, CertificateHandle, CertificateRenderer};
pub use clearance::{ClearanceWorkflow, IssuedCertificate};
pub use config::{AppConfig, ConfigError};
pub use context::ServiceContext;
pub use directory::DirectoryService;
pub use error::{BusinessError, BusinessResult};
pub use events::{EventService, NewEvent};
pub use identity::{IdentityProvider, LocalIdentityProvider, ProfileUpdate, Session, SignUp};
pub use messaging::MessageService;
pub use password::PasswordHasher;
