//! Report exporters - CSV, JSON, Markdown
//!
//! Exporters work over any [`ReportData`]; the clearance and attendance
//! listings are the two row sources.

use chrono::{DateTime, Utc};
use ssg_core::{AttendanceKind, AttendanceRecord, CampusEvent, ClearanceStatus, Party};
use ssg_persistence::ClearanceView;
use std::collections::HashSet;
use std::str::FromStr;

/// Trait for exporting reports to different formats
pub trait ReportExporter {
    fn export(&self, report: &dyn ReportData) -> String;

    /// File extension for this format
    fn extension(&self) -> &'static str;

    fn mime_type(&self) -> &'static str;
}

/// Tabular data that can be exported
pub trait ReportData {
    fn title(&self) -> &str;

    fn headers(&self) -> Vec<String>;

    fn rows(&self) -> Vec<Vec<String>>;

    /// Summary statistics as key-value pairs
    fn summary(&self) -> Vec<(String, String)>;
}

/// Output format selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Markdown,
}

impl ExportFormat {
    pub fn exporter(&self) -> Box<dyn ReportExporter> {
        match self {
            ExportFormat::Csv => Box::new(CsvExporter::new()),
            ExportFormat::Json => Box::new(JsonExporter::new()),
            ExportFormat::Markdown => Box::new(MarkdownExporter::new()),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            other => Err(format!("unknown report format: {}", other)),
        }
    }
}

// ============================================================================
// CSV Exporter
// ============================================================================

pub struct CsvExporter {
    delimiter: char,
    include_header: bool,
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self {
            delimiter: ',',
            include_header: true,
        }
    }
}

impl CsvExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn without_header(mut self) -> Self {
        self.include_header = false;
        self
    }

    fn escape(&self, field: &str) -> String {
        if field.contains(self.delimiter) || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn line(&self, fields: &[String]) -> String {
        let escaped: Vec<String> = fields.iter().map(|f| self.escape(f)).collect();
        let mut line = escaped.join(&self.delimiter.to_string());
        line.push('\n');
        line
    }
}

impl ReportExporter for CsvExporter {
    fn export(&self, report: &dyn ReportData) -> String {
        let mut output = String::new();
        if self.include_header {
            output.push_str(&self.line(&report.headers()));
        }
        for row in report.rows() {
            output.push_str(&self.line(&row));
        }
        output
    }

    fn extension(&self) -> &'static str {
        "csv"
    }

    fn mime_type(&self) -> &'static str {
        "text/csv"
    }
}

// ============================================================================
// JSON Exporter
// ============================================================================

pub struct JsonExporter {
    pretty: bool,
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }
}

impl ReportExporter for JsonExporter {
    fn export(&self, report: &dyn ReportData) -> String {
        let headers = report.headers();
        let data: Vec<serde_json::Value> = report
            .rows()
            .into_iter()
            .map(|row| {
                let obj: serde_json::Map<String, serde_json::Value> = headers
                    .iter()
                    .cloned()
                    .zip(row.into_iter().map(serde_json::Value::String))
                    .collect();
                serde_json::Value::Object(obj)
            })
            .collect();

        let summary: serde_json::Map<String, serde_json::Value> = report
            .summary()
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();

        let output = serde_json::json!({
            "title": report.title(),
            "summary": summary,
            "data": data,
        });

        if self.pretty {
            serde_json::to_string_pretty(&output).unwrap_or_default()
        } else {
            serde_json::to_string(&output).unwrap_or_default()
        }
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn mime_type(&self) -> &'static str {
        "application/json"
    }
}

// ============================================================================
// Markdown Exporter
// ============================================================================

pub struct MarkdownExporter {
    include_summary: bool,
}

impl Default for MarkdownExporter {
    fn default() -> Self {
        Self {
            include_summary: true,
        }
    }
}

impl MarkdownExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_summary(mut self) -> Self {
        self.include_summary = false;
        self
    }

    fn cell(field: &str) -> String {
        field.replace('|', "\\|").replace('\n', " ")
    }
}

impl ReportExporter for MarkdownExporter {
    fn export(&self, report: &dyn ReportData) -> String {
        let mut output = format!("# {}\n\n", report.title());

        if self.include_summary {
            output.push_str("## Summary\n\n");
            for (key, value) in report.summary() {
                output.push_str(&format!("- **{}**: {}\n", key, value));
            }
            output.push('\n');
        }

        output.push_str("## Data\n\n");
        let headers = report.headers();
        if headers.is_empty() {
            return output;
        }

        output.push_str(&format!("| {} |\n", headers.join(" | ")));
        output.push_str(&format!(
            "| {} |\n",
            headers.iter().map(|_| "---").collect::<Vec<_>>().join(" | ")
        ));
        for row in report.rows() {
            let cells: Vec<String> = row.iter().map(|f| Self::cell(f)).collect();
            output.push_str(&format!("| {} |\n", cells.join(" | ")));
        }
        output
    }

    fn extension(&self) -> &'static str {
        "md"
    }

    fn mime_type(&self) -> &'static str {
        "text/markdown"
    }
}

// ============================================================================
// Clearance Report
// ============================================================================

#[derive(Debug, Clone)]
pub struct ClearanceReport {
    pub title: String,
    pub requests: Vec<ClearanceView>,
    pub generated_at: DateTime<Utc>,
}

impl ClearanceReport {
    pub fn new(title: &str, requests: Vec<ClearanceView>) -> Self {
        Self {
            title: title.to_string(),
            requests,
            generated_at: Utc::now(),
        }
    }

    fn count(&self, status: ClearanceStatus) -> usize {
        self.requests
            .iter()
            .filter(|v| v.request.status() == status)
            .count()
    }
}

impl ReportData for ClearanceReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        let mut headers = vec![
            "Request ID".to_string(),
            "Student".to_string(),
            "Student ID".to_string(),
            "Department".to_string(),
        ];
        headers.extend(Party::ALL.iter().map(|p| format!("{} Status", p.label())));
        headers.push("Status".to_string());
        headers.push("Requested".to_string());
        headers
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.requests
            .iter()
            .map(|view| {
                let student = view.student.as_ref();
                let mut row = vec![
                    view.request.id.clone(),
                    student.map(|s| s.display_name()).unwrap_or_default(),
                    student.map(|s| s.student_number.clone()).unwrap_or_default(),
                    student
                        .and_then(|s| s.department_name())
                        .unwrap_or("N/A")
                        .to_string(),
                ];
                row.extend(
                    Party::ALL
                        .iter()
                        .map(|p| view.request.state(*p).to_string()),
                );
                row.push(view.request.status().label().to_string());
                row.push(view.request.created_at.format("%Y-%m-%d %H:%M").to_string());
                row
            })
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        vec![
            ("Total Requests".to_string(), self.requests.len().to_string()),
            (
                "Fully Approved".to_string(),
                self.count(ClearanceStatus::FullyApproved).to_string(),
            ),
            (
                "Pending".to_string(),
                self.count(ClearanceStatus::Pending).to_string(),
            ),
            (
                "Rejected".to_string(),
                self.count(ClearanceStatus::Rejected).to_string(),
            ),
            ("Generated At".to_string(), self.generated_at.to_rfc3339()),
        ]
    }
}

// ============================================================================
// Attendance Report
// ============================================================================

/// Scans recorded at one event
#[derive(Debug, Clone)]
pub struct AttendanceReport {
    pub title: String,
    pub event: CampusEvent,
    pub records: Vec<AttendanceRecord>,
    pub generated_at: DateTime<Utc>,
}

impl AttendanceReport {
    pub fn new(event: CampusEvent, records: Vec<AttendanceRecord>) -> Self {
        Self {
            title: format!("Attendance - {}", event.title),
            event,
            records,
            generated_at: Utc::now(),
        }
    }
}

impl ReportData for AttendanceReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        ["Timestamp", "Student", "Student ID", "Type", "Location", "Recorded By"]
            .iter()
            .map(|h| h.to_string())
            .collect()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.records
            .iter()
            .map(|r| {
                let student = r.student.as_ref();
                vec![
                    r.timestamp.to_rfc3339(),
                    student.map(|s| s.display_name()).unwrap_or_default(),
                    student
                        .map(|s| s.student_number.clone())
                        .unwrap_or_else(|| r.student_id.clone()),
                    format!("check-{}", r.kind),
                    r.location.clone().unwrap_or_default(),
                    r.recorded_by.clone(),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        let check_ins = self
            .records
            .iter()
            .filter(|r| r.kind == AttendanceKind::In)
            .count();
        let students: HashSet<&str> = self.records.iter().map(|r| r.student_id.as_str()).collect();
        vec![
            ("Event".to_string(), self.event.title.clone()),
            ("Event Date".to_string(), self.event.event_date.to_rfc3339()),
            ("Total Scans".to_string(), self.records.len().to_string()),
            ("Check-ins".to_string(), check_ins.to_string()),
            (
                "Check-outs".to_string(),
                (self.records.len() - check_ins).to_string(),
            ),
            ("Unique Students".to_string(), students.len().to_string()),
            ("Generated At".to_string(), self.generated_at.to_rfc3339()),
        ]
    }
}
