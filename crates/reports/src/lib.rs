//! # SSG Reports
//!
//! Clearance certificates and tabular exports.
//!
//! ## Certificates
//!
//! - [`HtmlCertificate`] - printable fixed-layout certificate
//! - [`MarkdownCertificate`] - text variant
//! - [`FileCertificateRenderer`] - writes either into a directory
//!
//! ## Exporters
//!
//! - [`CsvExporter`], [`JsonExporter`], [`MarkdownExporter`] over any [`ReportData`]
//! - [`ClearanceReport`] and [`AttendanceReport`] row sources
//!
//! ## Example
//!
//! ```rust,ignore
//! use ssg_reports::{ClearanceReport, CsvExporter, ReportExporter};
//!
//! let report = ClearanceReport::new("All Clearances", views);
//! let csv = CsvExporter::new().export(&report);
//! ```

pub mod certificate;
pub mod exporters;

pub use certificate::{
    CertificateTemplate, FileCertificateRenderer, HtmlCertificate, MarkdownCertificate,
};
pub use exporters::{
    AttendanceReport, ClearanceReport, CsvExporter, ExportFormat, JsonExporter, MarkdownExporter,
    ReportData, ReportExporter,
};
