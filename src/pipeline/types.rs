//! Shared types for the intake pipeline.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ClassificationError;

// ── Email input ─────────────────────────────────────────────────────

/// One email as handed over by the mail-retrieval side.
///
/// The caller is responsible for keeping `has_attachments` consistent with
/// `attachment_paths`. The pipeline only trusts the flag when paths exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailInput {
    /// Optional identifier used for log correlation only.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "messageId")]
    pub message_id: Option<String>,
    /// Plain text body. May be empty.
    #[serde(default)]
    pub body: String,
    #[serde(default, alias = "hasAttachments")]
    pub has_attachments: bool,
    /// Ordered attachment file references.
    #[serde(default, alias = "attachmentPaths")]
    pub attachment_paths: Vec<String>,
}

impl EmailInput {
    /// Build an input without attachments.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }

    /// Build an input carrying the given attachments.
    pub fn with_attachments<I, S>(body: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let attachment_paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        Self {
            message_id: None,
            body: body.into(),
            has_attachments: !attachment_paths.is_empty(),
            attachment_paths,
        }
    }

    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Attachments the pipeline may act on: the flag combined with path count.
    pub fn usable_attachments(&self) -> &[String] {
        if self.has_attachments {
            &self.attachment_paths
        } else {
            &[]
        }
    }

    pub fn has_usable_attachments(&self) -> bool {
        !self.usable_attachments().is_empty()
    }

    /// Identifier for logging (`-` when absent).
    pub fn log_id(&self) -> &str {
        self.message_id.as_deref().unwrap_or("-")
    }
}

// ── Intent ──────────────────────────────────────────────────────────

/// Classified purpose of an email. Exactly one per email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    DataExtractionRequested,
    TextDataExtraction,
    InformationalAcknowledgment,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataExtractionRequested => "data_extraction_requested",
            Self::TextDataExtraction => "text_data_extraction",
            Self::InformationalAcknowledgment => "informational_acknowledgment",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = ClassificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "data_extraction_requested" | "data_extraction" => Ok(Self::DataExtractionRequested),
            "text_data_extraction" | "text_extraction" => Ok(Self::TextDataExtraction),
            "informational_acknowledgment" | "acknowledgment" | "acknowledgement" => {
                Ok(Self::InformationalAcknowledgment)
            }
            _ => Err(ClassificationError::UnknownIntent {
                label: s.to_string(),
            }),
        }
    }
}

// ── Document type ───────────────────────────────────────────────────

/// Logistics document kinds the dispatch table knows how to extract.
///
/// The discriminants index the dispatch table; keep them dense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Bol = 0,
    ShippingLabel = 1,
    ItemLabel = 2,
    Invoice = 3,
    Receipt = 4,
}

impl DocumentType {
    pub const COUNT: usize = 5;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Bol,
        Self::ShippingLabel,
        Self::ItemLabel,
        Self::Invoice,
        Self::Receipt,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bol => "bol",
            Self::ShippingLabel => "shipping_label",
            Self::ItemLabel => "item_label",
            Self::Invoice => "invoice",
            Self::Receipt => "receipt",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = ClassificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "bol" | "bill_of_lading" => Ok(Self::Bol),
            "shipping_label" => Ok(Self::ShippingLabel),
            "item_label" => Ok(Self::ItemLabel),
            "invoice" => Ok(Self::Invoice),
            "receipt" => Ok(Self::Receipt),
            _ => Err(ClassificationError::InvalidDocumentType {
                label: s.to_string(),
            }),
        }
    }
}

fn normalize_label(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

// ── Classification ──────────────────────────────────────────────────

/// Per-attachment outcome of document type inference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentAssignment {
    Typed { document_type: DocumentType },
    /// No cue pointed at a document type.
    Unresolved { reason: String },
    /// A label outside the five known types. Reported, never defaulted.
    Invalid { label: String },
}

impl DocumentAssignment {
    pub fn typed(document_type: DocumentType) -> Self {
        Self::Typed { document_type }
    }

    pub fn document_type(&self) -> Option<DocumentType> {
        match self {
            Self::Typed { document_type } => Some(*document_type),
            _ => None,
        }
    }

    /// Parse a label produced by an external classifier.
    pub fn from_label(label: &str) -> Self {
        match label.parse::<DocumentType>() {
            Ok(document_type) => Self::Typed { document_type },
            Err(_) => Self::Invalid {
                label: label.to_string(),
            },
        }
    }
}

/// One attachment scheduled for document extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentPlan {
    /// Key in `tool_outputs`: basename, or `attachment_{n}` when unavailable.
    pub key: String,
    pub path: String,
    pub document: DocumentAssignment,
}

/// Build plans for a list of attachment paths, keyed uniquely within the email.
pub fn plan_attachments<F>(paths: &[String], mut assign: F) -> Vec<AttachmentPlan>
where
    F: FnMut(&str, &str) -> DocumentAssignment,
{
    let mut issued: HashSet<String> = HashSet::new();
    paths
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let base = attachment_key(path, i);
            let mut key = base.clone();
            let mut n = 1;
            while issued.contains(&key) {
                n += 1;
                key = format!("{base}#{n}");
            }
            issued.insert(key.clone());
            let document = assign(&key, path);
            AttachmentPlan {
                key,
                path: path.clone(),
                document,
            }
        })
        .collect()
}

/// Result key for the attachment at `index` (0-based).
pub fn attachment_key(path: &str, index: usize) -> String {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from)
        .unwrap_or_else(|| format!("attachment_{}", index + 1))
}

/// The classifier's decision for one email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: Intent,
    /// Populated only for `DataExtractionRequested`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentPlan>,
}

impl Classification {
    pub fn acknowledgment() -> Self {
        Self {
            intent: Intent::InformationalAcknowledgment,
            attachments: Vec::new(),
        }
    }

    pub fn text_extraction() -> Self {
        Self {
            intent: Intent::TextDataExtraction,
            attachments: Vec::new(),
        }
    }

    pub fn data_extraction(attachments: Vec<AttachmentPlan>) -> Self {
        Self {
            intent: Intent::DataExtractionRequested,
            attachments,
        }
    }

    /// Document types per attachment, in attachment order.
    pub fn document_types(&self) -> Vec<Option<DocumentType>> {
        self.attachments
            .iter()
            .map(|a| a.document.document_type())
            .collect()
    }
}

// ── Normalized response ─────────────────────────────────────────────

/// Extraction results keyed by attachment.
pub type ToolOutputs = BTreeMap<String, serde_json::Value>;

/// Per-item error marker: `{"error": "..."}`.
pub fn error_entry(message: impl Into<String>) -> serde_json::Value {
    serde_json::json!({ "error": message.into() })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relevance {
    LogisticsRelated,
    NonLogistics,
    Irrelevant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationType {
    BusinessConfirmation,
    DocumentDelivery,
    TrainingData,
    ReferenceSharing,
    CourtesyInfo,
    NonLogisticsBusiness,
    Personal,
    SpamIrrelevant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTaken {
    ReceivedAndFiled,
    NotedForRecords,
    ForwardedToRelevantTeam,
    StoredForTraining,
    MarkedAsIrrelevant,
    NoActionRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    Acknowledged,
}

/// The nested `response` object of an acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcknowledgmentResponse {
    pub status: AckStatus,
    pub communication_type: CommunicationType,
    pub message: String,
    pub action_taken: ActionTaken,
}

/// The single response shape returned for every email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "processing_intent", rename_all = "snake_case")]
pub enum NormalizedResponse {
    DataExtractionRequested {
        email_summary: String,
        tool_outputs: ToolOutputs,
    },
    TextDataExtraction {
        email_summary: String,
        extracted_data: serde_json::Value,
    },
    InformationalAcknowledgment {
        email_summary: String,
        relevance: Relevance,
        response: AcknowledgmentResponse,
    },
}

impl NormalizedResponse {
    pub fn intent(&self) -> Intent {
        match self {
            Self::DataExtractionRequested { .. } => Intent::DataExtractionRequested,
            Self::TextDataExtraction { .. } => Intent::TextDataExtraction,
            Self::InformationalAcknowledgment { .. } => Intent::InformationalAcknowledgment,
        }
    }

    pub fn email_summary(&self) -> &str {
        match self {
            Self::DataExtractionRequested { email_summary, .. }
            | Self::TextDataExtraction { email_summary, .. }
            | Self::InformationalAcknowledgment { email_summary, .. } => email_summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_input_accepts_both_key_styles() {
        let snake: EmailInput = serde_json::from_str(
            r#"{"body": "hi", "has_attachments": true, "attachment_paths": ["a.pdf"]}"#,
        )
        .unwrap();
        let camel: EmailInput = serde_json::from_str(
            r#"{"body": "hi", "hasAttachments": true, "attachmentPaths": ["a.pdf"]}"#,
        )
        .unwrap();
        assert_eq!(snake, camel);
        assert_eq!(snake.usable_attachments(), ["a.pdf".to_string()]);
    }

    #[test]
    fn flag_without_paths_is_not_usable() {
        let input = EmailInput {
            has_attachments: true,
            ..EmailInput::text("see attached")
        };
        assert!(!input.has_usable_attachments());
    }

    #[test]
    fn paths_without_flag_are_not_usable() {
        let input = EmailInput {
            attachment_paths: vec!["x.png".into()],
            ..EmailInput::text("process this")
        };
        assert!(input.usable_attachments().is_empty());
    }

    #[test]
    fn document_type_labels_parse() {
        assert_eq!("bol".parse::<DocumentType>().unwrap(), DocumentType::Bol);
        assert_eq!(
            "Shipping Label".parse::<DocumentType>().unwrap(),
            DocumentType::ShippingLabel
        );
        assert_eq!(
            "item-label".parse::<DocumentType>().unwrap(),
            DocumentType::ItemLabel
        );
        assert!(matches!(
            "packing_slip".parse::<DocumentType>(),
            Err(ClassificationError::InvalidDocumentType { .. })
        ));
    }

    #[test]
    fn document_type_indices_are_dense() {
        for (i, doc) in DocumentType::ALL.iter().enumerate() {
            assert_eq!(doc.index(), i);
        }
    }

    #[test]
    fn attachment_keys_use_basename_or_index() {
        assert_eq!(attachment_key("/tmp/x/invoice_001.pdf", 0), "invoice_001.pdf");
        assert_eq!(attachment_key("", 2), "attachment_3");
        assert_eq!(attachment_key("/", 0), "attachment_1");
    }

    #[test]
    fn duplicate_basenames_get_suffixes() {
        let paths = vec![
            "a/scan.png".to_string(),
            "b/scan.png".to_string(),
            "c/other.png".to_string(),
        ];
        let plans = plan_attachments(&paths, |_, _| DocumentAssignment::typed(DocumentType::Bol));
        let keys: Vec<&str> = plans.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, ["scan.png", "scan.png#2", "other.png"]);
    }

    #[test]
    fn suffixed_key_never_collides_with_real_file_name() {
        let paths = vec![
            "a/scan.png".to_string(),
            "b/scan.png".to_string(),
            "c/scan.png#2".to_string(),
        ];
        let plans = plan_attachments(&paths, |_, _| DocumentAssignment::typed(DocumentType::Bol));
        let keys: Vec<&str> = plans.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, ["scan.png", "scan.png#2", "scan.png#2#2"]);

        let unique: HashSet<&str> = keys.iter().copied().collect();
        assert_eq!(unique.len(), paths.len());
    }

    #[test]
    fn real_file_name_seen_first_pushes_suffix_further() {
        let paths = vec![
            "c/scan.png#2".to_string(),
            "a/scan.png".to_string(),
            "b/scan.png".to_string(),
        ];
        let plans = plan_attachments(&paths, |_, _| DocumentAssignment::typed(DocumentType::Bol));
        let keys: Vec<&str> = plans.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, ["scan.png#2", "scan.png", "scan.png#3"]);
    }

    #[test]
    fn unknown_label_becomes_invalid_assignment() {
        assert_eq!(
            DocumentAssignment::from_label("waybill"),
            DocumentAssignment::Invalid {
                label: "waybill".into()
            }
        );
    }

    #[test]
    fn acknowledgment_serializes_with_tag() {
        let response = NormalizedResponse::InformationalAcknowledgment {
            email_summary: "Sample BOL for training".into(),
            relevance: Relevance::LogisticsRelated,
            response: AcknowledgmentResponse {
                status: AckStatus::Acknowledged,
                communication_type: CommunicationType::TrainingData,
                message: "Thanks".into(),
                action_taken: ActionTaken::StoredForTraining,
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["processing_intent"], "informational_acknowledgment");
        assert_eq!(json["relevance"], "logistics_related");
        assert_eq!(json["response"]["status"], "acknowledged");
        assert_eq!(json["response"]["communication_type"], "training_data");
        assert_eq!(json["response"]["action_taken"], "stored_for_training");
    }

    #[test]
    fn extraction_response_serializes_tool_outputs() {
        let mut outputs = ToolOutputs::new();
        outputs.insert("a.png".into(), serde_json::json!({"inv_no": "1"}));
        outputs.insert("b.png".into(), error_entry("timeout"));
        let response = NormalizedResponse::DataExtractionRequested {
            email_summary: "Process invoices".into(),
            tool_outputs: outputs,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["processing_intent"], "data_extraction_requested");
        assert_eq!(json["tool_outputs"]["b.png"]["error"], "timeout");
        assert_eq!(response.intent(), Intent::DataExtractionRequested);
    }
}
