//! RFC 822 message parsing with `mail-parser`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use mail_parser::{MessageParser, MimeHeaders};
use tracing::debug;
use uuid::Uuid;

use super::{strip_html, strip_quoted_text};
use crate::error::IntakeError;
use crate::pipeline::types::EmailInput;

/// One parsed message, attachments still in memory.
#[derive(Debug, Clone, Default)]
pub struct RawEmail {
    pub subject: Option<String>,
    pub sender: Option<String>,
    /// RFC 3339.
    pub date: Option<String>,
    pub message_id: Option<String>,
    /// Plain text with quoted replies removed.
    pub body: String,
    /// `(file name, contents)` in message order.
    pub attachments: Vec<(String, Vec<u8>)>,
}

/// Parse a raw message.
pub fn parse_message(raw: &[u8]) -> Result<RawEmail, IntakeError> {
    let parsed = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| IntakeError::Unparseable("not an RFC 822 message".to_string()))?;

    let sender = parsed
        .from()
        .and_then(|addr| addr.first())
        .and_then(|a| a.address())
        .map(|s| s.to_string());

    let body = if let Some(text) = parsed.body_text(0) {
        text.to_string()
    } else if let Some(html) = parsed.body_html(0) {
        strip_html(html.as_ref())
    } else {
        String::new()
    };

    let attachments = parsed
        .attachments()
        .enumerate()
        .map(|(i, part)| {
            let name = MimeHeaders::attachment_name(part)
                .map(sanitize_file_name)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("attachment_{}", i + 1));
            (name, part.contents().to_vec())
        })
        .collect();

    Ok(RawEmail {
        subject: parsed.subject().map(|s| s.trim().to_string()),
        sender,
        date: parsed.date().map(|d| d.to_rfc3339()),
        message_id: parsed.message_id().map(|s| s.to_string()),
        body: strip_quoted_text(&body),
        attachments,
    })
}

/// Keep only the final path component and drop characters that are
/// unsafe in file names.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    base.chars()
        .filter(|c| !c.is_control() && !matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect::<String>()
        .trim()
        .trim_start_matches('.')
        .to_string()
}

impl RawEmail {
    /// Subject and body as one text, subject first.
    pub fn full_text(&self) -> String {
        match self.subject.as_deref().filter(|s| !s.is_empty()) {
            Some(subject) if self.body.trim().is_empty() => subject.to_string(),
            Some(subject) => format!("{subject}\n\n{}", self.body),
            None => self.body.clone(),
        }
    }

    /// Write attachments under `dir/<uuid>/` and build the pipeline input.
    ///
    /// Basenames are kept as-is; a repeated name goes into a `dup-N`
    /// subdirectory so both files survive.
    pub async fn materialize(&self, dir: &Path) -> Result<EmailInput, IntakeError> {
        let mut paths = Vec::with_capacity(self.attachments.len());

        if !self.attachments.is_empty() {
            let message_dir = dir.join(Uuid::new_v4().to_string());
            tokio::fs::create_dir_all(&message_dir).await?;

            // Top-level entries, files and `dup-N` folders alike.
            let mut used: HashSet<String> = HashSet::new();
            for (i, (name, contents)) in self.attachments.iter().enumerate() {
                let target: PathBuf = if used.insert(name.clone()) {
                    message_dir.join(name)
                } else {
                    let mut n = i + 1;
                    let mut folder = format!("dup-{n}");
                    while used.contains(&folder) {
                        n += 1;
                        folder = format!("dup-{n}");
                    }
                    let nested = message_dir.join(&folder);
                    used.insert(folder);
                    tokio::fs::create_dir_all(&nested).await?;
                    nested.join(name)
                };
                tokio::fs::write(&target, contents).await?;
                debug!(path = %target.display(), size = contents.len(), "Wrote attachment");
                paths.push(target.to_string_lossy().into_owned());
            }
        }

        let mut input = EmailInput::with_attachments(self.full_text(), paths);
        input.message_id = self.message_id.clone();
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVOICE_EML: &str = "From: Billing <billing@carrier.com>\r\n\
To: ops@shipper.com\r\n\
Subject: Invoice for order 7890\r\n\
Message-ID: <abc123@carrier.com>\r\n\
Date: Mon, 9 Jun 2025 10:00:00 +0000\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"XYZ\"\r\n\
\r\n\
--XYZ\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Please process the attached invoice; extract amount and due date.\r\n\
\r\n\
> older thread text\r\n\
--XYZ\r\n\
Content-Type: application/pdf\r\n\
Content-Disposition: attachment; filename=\"invoice_001.pdf\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
JVBERi0xLjQK\r\n\
--XYZ\r\n\
Content-Type: application/pdf\r\n\
Content-Disposition: attachment; filename=\"invoice_001.pdf\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
JVBERi0xLjUK\r\n\
--XYZ--\r\n";

    const HTML_EML: &str = "From: dispatch@carrier.com\r\n\
Subject: Delay\r\n\
MIME-Version: 1.0\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<p>Shipment ABC123 delayed.</p><p>New ETA needed.</p>\r\n";

    #[test]
    fn parses_headers_body_and_attachments() {
        let email = parse_message(INVOICE_EML.as_bytes()).unwrap();
        assert_eq!(email.subject.as_deref(), Some("Invoice for order 7890"));
        assert_eq!(email.sender.as_deref(), Some("billing@carrier.com"));
        assert_eq!(email.message_id.as_deref(), Some("abc123@carrier.com"));
        assert!(email.date.is_some());
        assert!(email.body.starts_with("Please process the attached invoice"));
        assert!(!email.body.contains("older thread"));
        assert_eq!(email.attachments.len(), 2);
        assert_eq!(email.attachments[0].0, "invoice_001.pdf");
        assert_eq!(email.attachments[0].1, b"%PDF-1.4\n");
    }

    #[test]
    fn html_only_message_is_stripped() {
        let email = parse_message(HTML_EML.as_bytes()).unwrap();
        assert!(email.body.contains("Shipment ABC123 delayed."));
        assert!(!email.body.contains("<p>"));
        assert!(email.attachments.is_empty());
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\bol?.png"), "bol.png");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
    }

    #[test]
    fn full_text_puts_subject_first() {
        let email = RawEmail {
            subject: Some("ASN".into()),
            body: "2 pallets".into(),
            ..Default::default()
        };
        assert_eq!(email.full_text(), "ASN\n\n2 pallets");
        let subject_only = RawEmail {
            subject: Some("ASN".into()),
            ..Default::default()
        };
        assert_eq!(subject_only.full_text(), "ASN");
    }

    #[tokio::test]
    async fn materialize_writes_attachments_with_basenames() {
        let dir = tempfile::tempdir().unwrap();
        let email = parse_message(INVOICE_EML.as_bytes()).unwrap();
        let input = email.materialize(dir.path()).await.unwrap();

        assert!(input.has_attachments);
        assert_eq!(input.attachment_paths.len(), 2);
        assert_eq!(input.message_id.as_deref(), Some("abc123@carrier.com"));
        for path in &input.attachment_paths {
            assert!(path.ends_with("invoice_001.pdf"));
            assert!(Path::new(path).exists());
        }
        assert_ne!(input.attachment_paths[0], input.attachment_paths[1]);
        assert_eq!(
            std::fs::read(&input.attachment_paths[1]).unwrap(),
            b"%PDF-1.5\n"
        );
    }

    fn with_attachments(names: &[&str]) -> RawEmail {
        RawEmail {
            attachments: names
                .iter()
                .map(|n| (n.to_string(), n.as_bytes().to_vec()))
                .collect(),
            ..Default::default()
        }
    }

    fn assert_all_written(input: &EmailInput, names: &[&str]) {
        assert_eq!(input.attachment_paths.len(), names.len());
        let unique: HashSet<&String> = input.attachment_paths.iter().collect();
        assert_eq!(unique.len(), names.len());
        for (path, name) in input.attachment_paths.iter().zip(names) {
            assert!(Path::new(path).is_file(), "{path} not written");
            assert_eq!(std::fs::read(path).unwrap(), name.as_bytes());
        }
    }

    #[tokio::test]
    async fn duplicate_folder_does_not_clash_with_numeric_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let names = ["invoice.pdf", "invoice.pdf", "2"];
        let input = with_attachments(&names).materialize(dir.path()).await.unwrap();

        assert_all_written(&input, &names);
        assert!(input.attachment_paths[1].ends_with("dup-2/invoice.pdf"));
    }

    #[tokio::test]
    async fn file_named_like_duplicate_folder_is_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        let names = ["invoice.pdf", "invoice.pdf", "dup-2"];
        let input = with_attachments(&names).materialize(dir.path()).await.unwrap();

        assert_all_written(&input, &names);
        assert!(input.attachment_paths[2].ends_with("dup-3/dup-2"));
    }

    #[tokio::test]
    async fn materialize_without_attachments_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let email = parse_message(HTML_EML.as_bytes()).unwrap();
        let input = email.materialize(dir.path()).await.unwrap();

        assert!(!input.has_attachments);
        assert!(input.attachment_paths.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn garbage_is_unparseable_or_empty() {
        match parse_message(b"") {
            Err(IntakeError::Unparseable(_)) => {}
            Ok(email) => assert!(email.attachments.is_empty()),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}
