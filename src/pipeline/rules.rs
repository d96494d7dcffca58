//! Rule-based intent classification.
//!
//! Deterministic pattern matching over the email body, applied in a fixed
//! order (first match wins):
//! 1. Attachments + an explicit action aimed at the document's contents →
//!    `DataExtractionRequested` (per-attachment document typing)
//! 2. Operational logistics data that needs follow-up → `TextDataExtraction`
//! 3. Everything else → `InformationalAcknowledgment`
//!
//! Ambiguous input always lands on the conservative rule 3.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::pipeline::types::{
    AttachmentPlan, Classification, DocumentAssignment, DocumentType, EmailInput,
    plan_attachments,
};

/// Distinct structured facts that make a message data-rich enough to extract.
const DATA_RICH_THRESHOLD: usize = 4;

/// Training or sample-submission language.
pub const TRAINING_PATTERN: &str = r"\b(for|to) (the )?train(ing)?\b|\btrain(ing)? (the |our |your )?(model|ai|system|classifier)\b|\bsample (documents?|docs?|bols?|invoices?|receipts?|labels?|files?)\b|\btraining (data|purposes|set|samples?)\b|\b(improve|tune|fine[- ]tune) (the |our )?model\b|\bfor the model\b";

/// Logistics vocabulary.
pub const LOGISTICS_PATTERN: &str = r"\b(shipments?|shipping|shipped|freight|loads?|pallets?|skids?|carriers?|truck|trailer|deliver(y|ies|ed)?|pick ?up|eta|etd|bols?|bill of lading|tracking|po|purchase order|warehouse|dock|appointment|containers?|consignee|shipper|rate|quote|lane|lbs|kg|dispatch|driver|orders?|invoices?|receipts?|customs|ltl|ftl|manifest|cargo|parcel|package|fedex|ups|usps|dhl|labels?)\b";

/// What a signal rule detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Imperative or question aimed at a document's contents. Sentence-scoped.
    ActionRequest,
    /// Vetoes action requests in the same sentence.
    Negation,
    /// Training/sample submissions.
    Training,
    /// Passive notification or reference sharing.
    Passive,
    /// Sender asks for a confirmation, schedule, or decision.
    ConfirmationRequest,
    /// Something went wrong with a shipment.
    Anomaly,
    /// A status, time, or appointment was changed.
    Change,
    Urgency,
    /// Logistics vocabulary.
    LogisticsContext,
    /// One structured fact (tracking number, weight, ...). Counted by name.
    DataPoint,
}

/// A single signal rule with a compiled regex.
///
/// Patterns run against the normalized (lowercased) body.
#[derive(Debug, Clone)]
pub struct SignalRule {
    /// Rule name, used in logs and as the data point identity.
    pub name: String,
    pub regex: Regex,
    pub kind: SignalKind,
}

/// Signals detected in one email body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signals {
    /// Name of the first action rule that fired in a non-negated sentence.
    pub action_request: Option<String>,
    pub training: bool,
    pub passive: bool,
    pub confirmation_request: bool,
    pub anomaly: bool,
    pub change: bool,
    pub urgent: bool,
    pub logistics_context: bool,
    /// Distinct data point rules that matched.
    pub data_points: usize,
}

impl Signals {
    /// Anomalies and changes count as operational unless the sender marked the
    /// message as informational without any urgency.
    fn operational_event(&self) -> bool {
        (self.anomaly || self.change) && (!self.passive || self.urgent)
    }

    fn data_rich(&self) -> bool {
        self.data_points >= DATA_RICH_THRESHOLD && !self.passive
    }
}

/// Outcome of rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleVerdict {
    pub classification: Classification,
    /// False when the rules fell back to a guess an ML classifier could improve.
    pub decisive: bool,
    /// Short description of the deciding rule.
    pub reason: &'static str,
}

/// Cue that ties text to a document type.
#[derive(Debug, Clone)]
struct DocumentCue {
    document_type: DocumentType,
    filename: Regex,
    body: Regex,
}

/// Rule-based intent classifier.
#[derive(Debug, Clone)]
pub struct RulesEngine {
    rules: Vec<SignalRule>,
    cues: Vec<DocumentCue>,
    bare_label: Regex,
}

fn rule(name: &str, pattern: &str, kind: SignalKind) -> SignalRule {
    SignalRule {
        name: name.into(),
        regex: Regex::new(pattern).expect("built-in rule pattern"),
        kind,
    }
}

fn cue(document_type: DocumentType, filename: &str, body: &str) -> DocumentCue {
    DocumentCue {
        document_type,
        filename: Regex::new(filename).expect("built-in filename cue"),
        body: Regex::new(body).expect("built-in body cue"),
    }
}

static DEFAULT_RULES: LazyLock<Vec<SignalRule>> = LazyLock::new(|| {
    use SignalKind::*;

    vec![
        // ── Action requests (rule 1) ──
        rule(
            "polite imperative",
            r"\b(please|pls|kindly|can you|could you|would you|need you to|want you to)\b.{0,50}?\b(extract|process|parse|pull|analy[sz]e|enter|record|capture|key in|fill|input|retrieve|transcribe|digiti[sz]e)\b",
            ActionRequest,
        ),
        rule(
            "bare imperative",
            r"^\W*(extract|process|parse|pull|analy[sz]e|enter|record|capture|key in|fill in|input|transcribe)\b",
            ActionRequest,
        ),
        rule(
            "get data from",
            r"\b(extract|pull|get|retrieve|grab|read)\b.{0,40}?\b(data|details|info|information|fields|values|amounts?|totals?|numbers?)\b.{0,30}?\bfrom\b",
            ActionRequest,
        ),
        rule(
            "need details from attachment",
            r"\b(i|we) (need|want|would like|require)\b.{0,40}?\b(data|details|info|information|fields|values|amounts?|totals?|numbers?)\b.{0,30}?\b(from|on|in)\b.{0,20}?\b(attached|attachment|attachments|this|these|the document|the file)\b",
            ActionRequest,
        ),
        rule(
            "need fields extracted",
            r"\b(need|want|require|like)\b.{0,60}?\b(extracted|processed|parsed|pulled|entered|recorded|captured|keyed in)\b",
            ActionRequest,
        ),
        rule(
            "system entry",
            r"\b(add|enter|input|key|upload|post|put|fill|log|record|update)\b.{0,40}?\b(into|to|in|on)\s+((our|the)\s+)?(system|database|db|records|accounting|erp|tms|wms|books|ledger|spreadsheet)\b",
            ActionRequest,
        ),
        rule(
            "update our system",
            r"\bupdate (our|the) (system|records|database|db|erp|tms|wms|books)\b",
            ActionRequest,
        ),
        rule(
            "question about document content",
            r"\b(what|who|when|how much|how many|which)\b.{0,60}?\b(total|amount|vendor|supplier|due date|balance|weight|tracking|consignee|shipper|sku|quantity|invoice number|po number|bol number|price|cost|tax)\b.{0,60}?\b(on|in|from|of) (this|the|that|these|attached)\b",
            ActionRequest,
        ),
        rule(
            "direct question about document field",
            r"^\W*(what|who|when|how much|how many|which)\b.{0,80}?\b(total|amount|vendor|supplier|due date|balance|invoice number|po number|bol number|consignee|shipper)\b[^?]*\?\s*$",
            ActionRequest,
        ),
        // ── Vetoes ──
        rule(
            "negated action",
            r"\b(don't|do not|dont|no need to|not necessary to|shouldn't|should not)\s+(\w+\s+){0,2}(extract|process|parse|pull|enter|record)\b",
            Negation,
        ),
        rule(
            "no action required",
            r"\bno action (is )?(required|needed)\b",
            Negation,
        ),
        rule(
            "payment processing",
            r"\bprocess(ed|ing)?\s+(your |the |my |our )?(payment|refund|return|order|request|application)\b",
            Negation,
        ),
        // ── Training ──
        rule(
            "training submission",
            TRAINING_PATTERN,
            Training,
        ),
        // ── Passive notifications ──
        rule(
            "advance shipping notice",
            r"\badvance ship(ping|ment) notice\b|\basn\b",
            Passive,
        ),
        rule(
            "fyi",
            r"\bfyi\b|\bfor your (information|reference|records|files)\b|\bfor reference\b|\bjust so you know\b|\bheads up\b|\bcourtesy (copy|notice|notification)\b",
            Passive,
        ),
        rule(
            "document delivery",
            r"\b(attached is|attached are|please find attached|find attached|attached please find|here's|here is|here are) (your|the|a|an|our)\b|\b(is|are) attached\b",
            Passive,
        ),
        rule(
            "confirmation notice",
            r"\b(order|payment|shipment|booking) (has been |was )?(received|processed|confirmed)\b|\b(order|booking|shipment|delivery) confirmation\b",
            Passive,
        ),
        rule(
            "delivered notice",
            r"\b(has been|was|were) delivered\b|\bpackage delivered\b|\bdelivered (at|on)\b",
            Passive,
        ),
        rule(
            "scheduled notice",
            r"\b(your|the) (delivery|shipment|order|package) is scheduled\b|\b(arrives|arriving|will arrive) (tomorrow|today|on)\b",
            Passive,
        ),
        rule(
            "no action required notice",
            r"\bno action (is )?(required|needed)\b",
            Passive,
        ),
        // ── Operational follow-up (rule 2) ──
        rule(
            "polite request for decision",
            r"\b(please|pls|kindly|can you|could you)\b.{0,30}?\b(confirm|advise|approve|accept|schedule|reschedule|book|arrange|provide|send (us |me )?(a |an |the )?(new |updated )?(eta|pod|quote|rate))\b",
            ConfirmationRequest,
        ),
        rule(
            "do you accept",
            r"\b(do|will|would|can) you (accept|approve|agree|confirm)\b",
            ConfirmationRequest,
        ),
        rule(
            "awaiting confirmation",
            r"\b(awaiting|await|need|require|pending) (your )?(confirmation|approval|response|reply|acceptance)\b",
            ConfirmationRequest,
        ),
        rule(
            "confirm item",
            r"\bconfirm (the |this |receipt|pickup|delivery|rate|quote|appointment|booking|availability|eta)",
            ConfirmationRequest,
        ),
        rule(
            "information needed",
            r"\b(new |updated |revised )?(eta|etd|pickup time|delivery time|appointment|pod|proof of delivery)\b.{0,20}?\b(needed|required|requested|asap)\b|\b(need|needed|require|request|requesting)\b.{0,20}?\b(new |updated |revised )?(eta|etd|pickup time|delivery time|appointment|pod)\b",
            ConfirmationRequest,
        ),
        rule(
            "appointment request",
            r"\bappointment request\b|\brequest(ing)? (an? )?(appointment|pickup|delivery slot)\b",
            ConfirmationRequest,
        ),
        rule(
            "shipment anomaly",
            r"\b(delay(ed|s)?|running late|late (pickup|delivery|arrival)|missed (pickup|delivery|appointment)|damaged?|shortage|short[- ]shipped|overage|exception|on hold|held (at|in|by)|customs hold|refused|rejected|detention|demurrage|lost|stuck|breakdown|broke down|cancell?ed)\b",
            Anomaly,
        ),
        rule(
            "schedule change",
            r"\b(changed|rescheduled|moved|pushed|postponed|revised|updated) (to|until|for)\b|\bstatus (changed|updated?) to\b|\bnew (eta|pickup|delivery|appointment)\b",
            Change,
        ),
        rule(
            "urgency",
            r"\b(urgent|asap|immediately|action required|time[- ]sensitive|critical)\b",
            Urgency,
        ),
        // ── Context ──
        rule(
            "logistics vocabulary",
            LOGISTICS_PATTERN,
            LogisticsContext,
        ),
        // ── Data points ──
        rule("tracking number", r"\btracking (number|no\.?|#)", DataPoint),
        rule(
            "order number",
            r"\b(order|po|p\.o\.|purchase order)\s*(number|no\.?)?\s*#?\s*[a-z]*[-]?\d",
            DataPoint,
        ),
        rule(
            "weight",
            r"\b\d+(\.\d+)?\s?(lbs?|pounds|kgs?|kilograms)\b",
            DataPoint,
        ),
        rule("dimensions", r"\b\d+(\.\d+)?\s?x\s?\d+(\.\d+)?(\s?x\s?\d+(\.\d+)?)?\b", DataPoint),
        rule(
            "carrier",
            r"\bcarrier\s*:|\b(ups|fedex|usps|dhl|xpo|estes|old dominion|saia|yrc|r\+l)\b",
            DataPoint,
        ),
        rule(
            "date",
            r"\b(jan(uary)?|feb(ruary)?|mar(ch)?|apr(il)?|may|june?|july?|aug(ust)?|sep(t|tember)?|oct(ober)?|nov(ember)?|dec(ember)?)\.? \d{1,2}(st|nd|rd|th)?\b|\b\d{1,2}/\d{1,2}(/\d{2,4})?\b|\b\d{4}-\d{2}-\d{2}\b",
            DataPoint,
        ),
        rule(
            "time window",
            r"\b\d{1,2}(:\d{2})?\s?(-\s?\d{1,2}(:\d{2})?\s?)?(am|pm)\b",
            DataPoint,
        ),
        rule("money", r"\$\s?\d|\busd\s?\d", DataPoint),
        rule(
            "handling units",
            r"\b\d+\s?(pallets?|skids?|cartons?|pieces|pcs|boxes|cases)\b",
            DataPoint,
        ),
        rule(
            "bol or pro number",
            r"\b(bol|pro|load)\s*(number|no\.?|#)\s*:?\s*[a-z0-9-]*\d",
            DataPoint,
        ),
    ]
});

static DEFAULT_CUES: LazyLock<Vec<DocumentCue>> = LazyLock::new(|| {
    vec![
        cue(
            DocumentType::Bol,
            r"(^|[^a-z])(bols?|bill[ _-]?of[ _-]?lading)([^a-z]|$)",
            r"\b(bols?|b/l|bills? of lading)\b",
        ),
        cue(
            DocumentType::ShippingLabel,
            r"(ship(ping|ment)?|mailing|parcel|carton)[ _-]?labels?",
            r"\b(ship(ping|ment)?|mailing|parcel|carton) labels?\b",
        ),
        cue(
            DocumentType::ItemLabel,
            r"(item|product|sku|upc|barcode)[ _-]?labels?",
            r"\b(item|product|sku|upc|barcode) labels?\b",
        ),
        cue(
            DocumentType::Invoice,
            r"invoice|(^|[^a-z])inv([^a-z]|$)",
            r"\binvoices?\b",
        ),
        cue(
            DocumentType::Receipt,
            r"receipt|(^|[^a-z])rcpt([^a-z]|$)",
            r"\breceipts?\b",
        ),
    ]
});

static BARE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\blabels?\b").expect("built-in label cue"));

/// Lowercase and fold typographic punctuation so patterns stay ASCII.
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '`' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            '\u{00A0}' => ' ',
            c => c,
        })
        .collect::<String>()
        .to_lowercase()
}

/// Split text into sentences, keeping terminal punctuation.
///
/// Breaks on newlines and on `.`, `!`, `?`, `;` followed by whitespace.
pub fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut prev_terminal = false;

    for (i, c) in text.char_indices() {
        if c == '\n' || (c.is_whitespace() && prev_terminal) {
            let s = text[start..i].trim();
            if !s.is_empty() {
                out.push(s);
            }
            start = i + c.len_utf8();
        }
        prev_terminal = matches!(c, '.' | '!' | '?' | ';');
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

impl RulesEngine {
    /// Create a rules engine with the default logistics rule set.
    pub fn default_rules() -> Self {
        Self {
            rules: DEFAULT_RULES.clone(),
            cues: DEFAULT_CUES.clone(),
            bare_label: BARE_LABEL.clone(),
        }
    }

    /// Create an engine with document cues but no signal rules (for testing).
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            cues: DEFAULT_CUES.clone(),
            bare_label: BARE_LABEL.clone(),
        }
    }

    /// Add a custom signal rule. The pattern sees lowercased text.
    pub fn add_rule(
        &mut self,
        pattern: &str,
        kind: SignalKind,
        name: &str,
    ) -> Result<(), regex::Error> {
        self.rules.push(SignalRule {
            name: name.into(),
            regex: Regex::new(pattern)?,
            kind,
        });
        Ok(())
    }

    /// Detect every signal in a body.
    pub fn signals(&self, body: &str) -> Signals {
        let text = normalize(body);
        let mut signals = Signals::default();
        let mut data_points: BTreeSet<&str> = BTreeSet::new();

        for rule in &self.rules {
            match rule.kind {
                SignalKind::ActionRequest | SignalKind::Negation => {}
                SignalKind::Training => signals.training |= rule.regex.is_match(&text),
                SignalKind::Passive => signals.passive |= rule.regex.is_match(&text),
                SignalKind::ConfirmationRequest => {
                    signals.confirmation_request |= rule.regex.is_match(&text)
                }
                SignalKind::Anomaly => signals.anomaly |= rule.regex.is_match(&text),
                SignalKind::Change => signals.change |= rule.regex.is_match(&text),
                SignalKind::Urgency => signals.urgent |= rule.regex.is_match(&text),
                SignalKind::LogisticsContext => {
                    signals.logistics_context |= rule.regex.is_match(&text)
                }
                SignalKind::DataPoint => {
                    if rule.regex.is_match(&text) {
                        data_points.insert(rule.name.as_str());
                    }
                }
            }
        }
        signals.data_points = data_points.len();
        signals.action_request = self.find_action(&text);
        signals
    }

    /// First action rule that fires in a sentence without a veto.
    fn find_action(&self, text: &str) -> Option<String> {
        for sentence in sentences(text) {
            let vetoed = self
                .rules
                .iter()
                .filter(|r| r.kind == SignalKind::Negation)
                .any(|r| r.regex.is_match(sentence));
            if vetoed {
                continue;
            }
            if let Some(rule) = self
                .rules
                .iter()
                .filter(|r| r.kind == SignalKind::ActionRequest)
                .find(|r| r.regex.is_match(sentence))
            {
                return Some(rule.name.clone());
            }
        }
        None
    }

    /// Evaluate an email against all rules. Always yields exactly one intent.
    pub fn evaluate(&self, input: &EmailInput) -> RuleVerdict {
        let signals = self.signals(&input.body);

        // Rule 1: attachments + explicit action, unless it is a training submission.
        if input.has_usable_attachments()
            && !signals.training
            && let Some(ref action) = signals.action_request
        {
            debug!(
                email_id = %input.log_id(),
                rule = %action,
                "Explicit action on attachments"
            );
            let plans = self.plan(input);
            return RuleVerdict {
                classification: Classification::data_extraction(plans),
                decisive: true,
                reason: "explicit action on attached documents",
            };
        }

        // Rule 2: operational data that needs follow-up.
        if !signals.training && signals.logistics_context {
            if signals.confirmation_request || signals.operational_event() {
                return RuleVerdict {
                    classification: Classification::text_extraction(),
                    decisive: true,
                    reason: "operational request or anomaly",
                };
            }
            if signals.data_rich() {
                return RuleVerdict {
                    classification: Classification::text_extraction(),
                    decisive: false,
                    reason: "data-rich operational update",
                };
            }
        }

        // Rule 3: conservative default.
        let marked = signals.training || signals.passive;
        RuleVerdict {
            classification: Classification::acknowledgment(),
            decisive: marked || !signals.logistics_context,
            reason: if signals.training {
                "training submission"
            } else if signals.passive {
                "passive notification"
            } else {
                "no actionable request"
            },
        }
    }

    /// Plan every usable attachment with its own inferred document type.
    pub fn plan(&self, input: &EmailInput) -> Vec<AttachmentPlan> {
        let body_types = self.body_document_types(&input.body);
        let mentions_label = self.bare_label.is_match(&normalize(&input.body));
        plan_attachments(input.usable_attachments(), |key, path| {
            self.infer_document_type(key, path, &body_types, mentions_label)
        })
    }

    /// Document types named in the body.
    pub fn body_document_types(&self, body: &str) -> BTreeSet<DocumentType> {
        let text = normalize(body);
        self.cues
            .iter()
            .filter(|c| c.body.is_match(&text))
            .map(|c| c.document_type)
            .collect()
    }

    /// Document types hinted at by a file name.
    pub fn filename_document_types(&self, path: &str) -> BTreeSet<DocumentType> {
        let name = std::path::Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(path)
            .to_lowercase();
        self.cues
            .iter()
            .filter(|c| c.filename.is_match(&name))
            .map(|c| c.document_type)
            .collect()
    }

    /// Filename cue, then a single type named in the body, then a bare
    /// "label" meaning a shipping label. Anything else stays unresolved.
    fn infer_document_type(
        &self,
        key: &str,
        path: &str,
        body_types: &BTreeSet<DocumentType>,
        mentions_label: bool,
    ) -> DocumentAssignment {
        let from_name = self.filename_document_types(path);
        match from_name.len() {
            1 => {
                if let Some(doc) = from_name.first() {
                    return DocumentAssignment::typed(*doc);
                }
            }
            0 => {}
            _ => {
                let shared: Vec<_> = from_name.intersection(body_types).copied().collect();
                if let [doc] = shared.as_slice() {
                    return DocumentAssignment::typed(*doc);
                }
                return DocumentAssignment::Unresolved {
                    reason: format!("file name of {key} matches several document types"),
                };
            }
        }

        match body_types.len() {
            1 => body_types
                .first()
                .map(|doc| DocumentAssignment::typed(*doc))
                .unwrap_or_else(|| unresolved(key)),
            0 if mentions_label => DocumentAssignment::typed(DocumentType::ShippingLabel),
            0 => unresolved(key),
            _ => DocumentAssignment::Unresolved {
                reason: format!(
                    "email references several document types; cannot tell which applies to {key}"
                ),
            },
        }
    }
}

fn unresolved(key: &str) -> DocumentAssignment {
    DocumentAssignment::Unresolved {
        reason: format!("no document type cue for {key}"),
    }
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::default_rules()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::Intent;

    fn intent_of(input: &EmailInput) -> Intent {
        RulesEngine::default_rules()
            .evaluate(input)
            .classification
            .intent
    }

    fn with_attachment(body: &str, path: &str) -> EmailInput {
        EmailInput::with_attachments(body, [path])
    }

    // ── Text helpers ────────────────────────────────────────────────

    #[test]
    fn normalize_folds_typography() {
        assert_eq!(normalize("What\u{2019}s \u{2013} OK"), "what's - ok");
    }

    #[test]
    fn sentences_split_on_terminators_and_newlines() {
        let parts = sentences("Hi there. Please extract totals; thanks!\nNext line");
        assert_eq!(parts, ["Hi there.", "Please extract totals;", "thanks!", "Next line"]);
    }

    #[test]
    fn sentences_keep_decimals_together() {
        assert_eq!(sentences("Rate is $1,500.00 today."), ["Rate is $1,500.00 today."]);
    }

    // ── Rule 1 ──────────────────────────────────────────────────────

    #[test]
    fn polite_request_with_attachment_is_extraction() {
        let input = with_attachment(
            "Please process the attached invoice for our accounting system; extract amount, due date, vendor.",
            "invoice_001.pdf",
        );
        let verdict = RulesEngine::default_rules().evaluate(&input);
        assert_eq!(verdict.classification.intent, Intent::DataExtractionRequested);
        assert!(verdict.decisive);
        assert_eq!(
            verdict.classification.document_types(),
            [Some(DocumentType::Invoice)]
        );
        assert_eq!(verdict.classification.attachments[0].key, "invoice_001.pdf");
    }

    #[test]
    fn extraction_examples() {
        let cases = [
            "Can you extract the vendor details from this invoice?",
            "Please process the attached BOL for our database",
            "I need the shipment details from the attached documents",
            "What's the total amount on this invoice?",
            "please fill this file in our records.",
            "Parse this document and send me the fields.",
            "When is the due date on the attached invoice?",
            "Kindly enter these receipts into our accounting system.",
        ];
        for body in cases {
            assert_eq!(
                intent_of(&with_attachment(body, "scan.png")),
                Intent::DataExtractionRequested,
                "{body}"
            );
        }
    }

    #[test]
    fn action_language_without_attachments_never_extracts_documents() {
        let input = EmailInput::text("Please process the attached invoice and extract the total.");
        assert_ne!(intent_of(&input), Intent::DataExtractionRequested);
    }

    #[test]
    fn attachment_flag_without_paths_never_extracts_documents() {
        let input = EmailInput {
            has_attachments: true,
            ..EmailInput::text("Please extract the data from the attached BOL.")
        };
        assert_ne!(intent_of(&input), Intent::DataExtractionRequested);
    }

    #[test]
    fn notification_with_attachment_is_acknowledged() {
        let cases = [
            "Your invoice for Order #XYZ-7890 is attached",
            "Attached is your receipt. Thank you for your business!",
            "FYI - shipment status update attached",
            "Here's the invoice for your records.",
        ];
        for body in cases {
            assert_eq!(
                intent_of(&with_attachment(body, "doc.pdf")),
                Intent::InformationalAcknowledgment,
                "{body}"
            );
        }
    }

    #[test]
    fn training_submission_suppresses_extraction() {
        let input = with_attachment("Here's the BOL for training the model", "bol.png");
        let verdict = RulesEngine::default_rules().evaluate(&input);
        assert_eq!(
            verdict.classification.intent,
            Intent::InformationalAcknowledgment
        );
        assert_eq!(verdict.reason, "training submission");

        let input = with_attachment(
            "Hi team, attached is a sample BOL document for training purposes. Please use this to improve the model accuracy. Let me know if you need more samples.",
            "sample_bol.pdf",
        );
        assert_eq!(intent_of(&input), Intent::InformationalAcknowledgment);
    }

    #[test]
    fn negated_action_does_not_fire() {
        let input = with_attachment(
            "Invoice attached. No need to process it, it is already paid.",
            "invoice.pdf",
        );
        assert_eq!(intent_of(&input), Intent::InformationalAcknowledgment);
    }

    #[test]
    fn payment_processing_is_not_document_action() {
        let input = with_attachment(
            "Your receipt is attached. Please process your payment by Friday.",
            "receipt.pdf",
        );
        assert_eq!(intent_of(&input), Intent::InformationalAcknowledgment);
    }

    #[test]
    fn explicit_action_beats_passive_language() {
        let input = with_attachment(
            "Your invoice is attached. Please extract the totals into our ERP.",
            "invoice.pdf",
        );
        assert_eq!(intent_of(&input), Intent::DataExtractionRequested);
    }

    // ── Rule 2 ──────────────────────────────────────────────────────

    #[test]
    fn operational_examples_are_text_extraction() {
        let cases = [
            "Shipment ABC123 delayed \u{2014} new ETA needed for planning",
            "Rate quote: $1,500 for Chicago to LA - please confirm",
            "Urgent: Delivery appointment changed to 3 PM today",
            "Can you confirm pickup time for load 4471 tomorrow?",
            "Do you accept this quote for the Dallas lane?",
        ];
        for body in cases {
            assert_eq!(
                intent_of(&EmailInput::text(body)),
                Intent::TextDataExtraction,
                "{body}"
            );
        }
    }

    #[test]
    fn data_rich_update_is_text_extraction_but_not_decisive() {
        let input = EmailInput::text(
            "Shipment update: Your order #12345 with tracking number 1Z999AA123456789 is scheduled for delivery on March 15th between 2-4 PM. Total weight: 45 lbs, Dimensions: 12x8x6 inches. Carrier: UPS",
        );
        let verdict = RulesEngine::default_rules().evaluate(&input);
        assert_eq!(verdict.classification.intent, Intent::TextDataExtraction);
        assert!(!verdict.decisive);
    }

    #[test]
    fn advance_shipping_notice_is_acknowledged() {
        let input = EmailInput::text(
            "Advance Shipping Notice \u{2013} PO# 123456 / 2 Pallets (ETA June 10, 2025)",
        );
        let verdict = RulesEngine::default_rules().evaluate(&input);
        assert_eq!(
            verdict.classification.intent,
            Intent::InformationalAcknowledgment
        );
        assert_eq!(verdict.reason, "passive notification");
    }

    #[test]
    fn passive_notices_are_acknowledged() {
        let cases = [
            "Delivery confirmation: Package delivered at 2:15 PM",
            "FYI your package arrives tomorrow",
            "Order received, thank you.",
            "Your delivery is scheduled for Monday.",
        ];
        for body in cases {
            assert_eq!(
                intent_of(&EmailInput::text(body)),
                Intent::InformationalAcknowledgment,
                "{body}"
            );
        }
    }

    #[test]
    fn fyi_delay_without_urgency_is_acknowledged() {
        let input = EmailInput::text("FYI - shipment delayed by one day, no action needed.");
        assert_eq!(intent_of(&input), Intent::InformationalAcknowledgment);
    }

    #[test]
    fn urgent_anomaly_overrides_fyi() {
        let input = EmailInput::text("FYI: urgent - trailer 88 held at customs, shipment stuck.");
        assert_eq!(intent_of(&input), Intent::TextDataExtraction);
    }

    #[test]
    fn non_logistics_request_is_acknowledged() {
        let input = EmailInput::text("Can you confirm you'll join the team lunch on Friday?");
        let verdict = RulesEngine::default_rules().evaluate(&input);
        assert_eq!(
            verdict.classification.intent,
            Intent::InformationalAcknowledgment
        );
        assert!(verdict.decisive);
    }

    #[test]
    fn empty_body_is_acknowledged() {
        assert_eq!(
            intent_of(&EmailInput::text("")),
            Intent::InformationalAcknowledgment
        );
        assert_eq!(
            intent_of(&with_attachment("", "x.pdf")),
            Intent::InformationalAcknowledgment
        );
    }

    // ── Document typing ─────────────────────────────────────────────

    #[test]
    fn each_attachment_gets_its_own_type() {
        let input = EmailInput::with_attachments(
            "Please extract the data from the attached documents.",
            ["docs/invoice_7.png", "docs/BOL-123.png", "docs/receipt.jpg"],
        );
        let verdict = RulesEngine::default_rules().evaluate(&input);
        assert_eq!(
            verdict.classification.document_types(),
            [
                Some(DocumentType::Invoice),
                Some(DocumentType::Bol),
                Some(DocumentType::Receipt)
            ]
        );
    }

    #[test]
    fn body_cue_types_unnamed_attachment() {
        let input = with_attachment("Please process the attached bill of lading.", "scan_0001.png");
        let verdict = RulesEngine::default_rules().evaluate(&input);
        assert_eq!(
            verdict.classification.document_types(),
            [Some(DocumentType::Bol)]
        );
    }

    #[test]
    fn label_cues() {
        let engine = RulesEngine::default_rules();
        let plans = engine.plan(&with_attachment("Please extract the item label fields.", "img.png"));
        assert_eq!(
            plans[0].document,
            DocumentAssignment::typed(DocumentType::ItemLabel)
        );
        let plans = engine.plan(&with_attachment("Please read the label and extract it.", "img.png"));
        assert_eq!(
            plans[0].document,
            DocumentAssignment::typed(DocumentType::ShippingLabel)
        );
        let plans = engine.plan(&with_attachment("Extract this.", "shipping_label_01.png"));
        assert_eq!(
            plans[0].document,
            DocumentAssignment::typed(DocumentType::ShippingLabel)
        );
    }

    #[test]
    fn ambiguous_attachment_is_unresolved_without_failing_others() {
        let input = EmailInput::with_attachments(
            "Please extract the invoice and receipt details from these.",
            ["invoice_1.png", "scan.png"],
        );
        let verdict = RulesEngine::default_rules().evaluate(&input);
        assert_eq!(verdict.classification.intent, Intent::DataExtractionRequested);
        let docs = &verdict.classification.attachments;
        assert_eq!(docs[0].document, DocumentAssignment::typed(DocumentType::Invoice));
        assert!(matches!(
            docs[1].document,
            DocumentAssignment::Unresolved { .. }
        ));
    }

    #[test]
    fn filename_cue_word_boundaries() {
        let engine = RulesEngine::default_rules();
        assert!(engine.filename_document_types("symbols.png").is_empty());
        assert!(engine.filename_document_types("inventory.png").is_empty());
        assert_eq!(
            engine.filename_document_types("inv_2024_01.pdf"),
            BTreeSet::from([DocumentType::Invoice])
        );
    }

    // ── Properties ──────────────────────────────────────────────────

    #[test]
    fn classification_is_idempotent() {
        let engine = RulesEngine::default_rules();
        let input = EmailInput::with_attachments(
            "Please extract data from these",
            ["a_invoice.png", "b.png"],
        );
        assert_eq!(engine.evaluate(&input), engine.evaluate(&input));
    }

    #[test]
    fn custom_rule_extends_engine() {
        let mut engine = RulesEngine::empty();
        engine
            .add_rule(r"\bdigitize\b", SignalKind::ActionRequest, "digitize")
            .unwrap();
        let verdict = engine.evaluate(&with_attachment("Digitize this receipt", "r.png"));
        assert_eq!(verdict.classification.intent, Intent::DataExtractionRequested);
    }

    #[test]
    fn empty_engine_acknowledges_everything() {
        let engine = RulesEngine::empty();
        let verdict = engine.evaluate(&with_attachment("Please extract the totals", "invoice.png"));
        assert_eq!(
            verdict.classification.intent,
            Intent::InformationalAcknowledgment
        );
    }
}
