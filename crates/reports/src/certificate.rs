//! Clearance certificate documents and a file-backed renderer.

use async_trait::async_trait;
use ssg_business::{BusinessError, BusinessResult, CertificateData, CertificateHandle, CertificateRenderer};
use std::path::{Path, PathBuf};
use tracing::info;

/// Turns certificate data into a complete document
pub trait CertificateTemplate: Send + Sync {
    fn render(&self, data: &CertificateData) -> String;

    /// File extension for this format
    fn extension(&self) -> &'static str;
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn issued_date(data: &CertificateData) -> String {
    data.issued_at.format("%Y-%m-%d").to_string()
}

// ============================================================================
// HTML
// ============================================================================

/// Printable HTML certificate
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlCertificate;

const HTML_STYLE: &str = "\
      body { font-family: Arial, sans-serif; padding: 20px; }
      .header { text-align: center; margin-bottom: 30px; }
      .title { font-size: 24px; font-weight: bold; margin-bottom: 10px; }
      .student-info { margin: 20px 0; }
      .approval-section { margin: 15px 0; }
      .signature-section { margin-top: 40px; display: flex; justify-content: space-between; }
      .verification { text-align: center; margin: 20px 0; }
";

impl CertificateTemplate for HtmlCertificate {
    fn render(&self, data: &CertificateData) -> String {
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n<html>\n  <head>\n    <meta charset=\"utf-8\">\n");
        out.push_str("    <title>SSG Digital Clearance</title>\n    <style>\n");
        out.push_str(HTML_STYLE);
        out.push_str("    </style>\n  </head>\n  <body>\n");

        out.push_str("    <div class=\"header\">\n");
        out.push_str("      <div class=\"title\">SSG DIGITAL CLEARANCE</div>\n");
        out.push_str("      <p>Student Governance Clearance Certificate</p>\n");
        out.push_str("    </div>\n");

        out.push_str("    <div class=\"student-info\">\n");
        for (label, value) in [
            ("Student Name", escape_html(&data.student_name)),
            ("Student ID", escape_html(&data.student_number)),
            ("Department", escape_html(&data.department)),
            ("Year Level", data.year_level.to_string()),
            ("Date Issued", issued_date(data)),
        ] {
            out.push_str(&format!("      <p><strong>{}:</strong> {}</p>\n", label, value));
        }
        out.push_str("    </div>\n");

        out.push_str("    <div class=\"approval-section\">\n      <h3>Clearance Status:</h3>\n");
        for line in data.approval_lines() {
            out.push_str(&format!("      <p>{}</p>\n", line));
        }
        out.push_str("    </div>\n");

        out.push_str("    <div class=\"verification\">\n");
        out.push_str(&format!(
            "      <p><strong>Verification Code:</strong> {}</p>\n",
            escape_html(&data.verification_code)
        ));
        out.push_str("      <p>This clearance is digitally verified and valid.</p>\n");
        out.push_str("    </div>\n");

        out.push_str("    <div class=\"signature-section\">\n");
        for signer in ["Department Representative", "SSG Representative"] {
            out.push_str(&format!(
                "      <div>\n        <p>_____________________</p>\n        <p>{}</p>\n      </div>\n",
                signer
            ));
        }
        out.push_str("    </div>\n  </body>\n</html>\n");
        out
    }

    fn extension(&self) -> &'static str {
        "html"
    }
}

// ============================================================================
// Markdown
// ============================================================================

/// Plain-text variant of the certificate
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownCertificate;

impl CertificateTemplate for MarkdownCertificate {
    fn render(&self, data: &CertificateData) -> String {
        let mut out = String::new();
        out.push_str("# SSG DIGITAL CLEARANCE\n\n");
        out.push_str("_Student Governance Clearance Certificate_\n\n");

        out.push_str(&format!("- **Student Name**: {}\n", data.student_name));
        out.push_str(&format!("- **Student ID**: {}\n", data.student_number));
        out.push_str(&format!("- **Department**: {}\n", data.department));
        out.push_str(&format!("- **Year Level**: {}\n", data.year_level));
        out.push_str(&format!("- **Date Issued**: {}\n\n", issued_date(data)));

        out.push_str("## Clearance Status\n\n");
        for line in data.approval_lines() {
            out.push_str(&format!("{}\n", line));
        }

        out.push_str(&format!(
            "\n**Verification Code**: `{}`\n\n",
            data.verification_code
        ));
        out.push_str("This clearance is digitally verified and valid.\n\n");
        out.push_str("_____________________ Department Representative\n\n");
        out.push_str("_____________________ SSG Representative\n");
        out
    }

    fn extension(&self) -> &'static str {
        "md"
    }
}

// ============================================================================
// File renderer
// ============================================================================

/// Writes `clearance-<verification code>.<ext>` into a directory and hands
/// back the file path.
pub struct FileCertificateRenderer {
    dir: PathBuf,
    template: Box<dyn CertificateTemplate>,
}

impl FileCertificateRenderer {
    pub fn new<P: AsRef<Path>>(dir: P, template: Box<dyn CertificateTemplate>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            template,
        }
    }

    pub fn html<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(dir, Box::new(HtmlCertificate))
    }

    pub fn markdown<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(dir, Box::new(MarkdownCertificate))
    }

    pub fn path_for(&self, data: &CertificateData) -> PathBuf {
        self.dir.join(format!(
            "clearance-{}.{}",
            data.verification_code,
            self.template.extension()
        ))
    }
}

#[async_trait]
impl CertificateRenderer for FileCertificateRenderer {
    async fn render(&self, data: &CertificateData) -> BusinessResult<CertificateHandle> {
        let document = self.template.render(data);
        let path = self.path_for(data);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| BusinessError::Render(format!("{}: {}", self.dir.display(), e)))?;
        tokio::fs::write(&path, document)
            .await
            .map_err(|e| BusinessError::Render(format!("{}: {}", path.display(), e)))?;

        info!(path = %path.display(), request = %data.request_id, "certificate written");
        Ok(CertificateHandle::new(path.display().to_string()))
    }
}
