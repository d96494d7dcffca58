//! Acknowledgment handler.
//!
//! Assesses relevance and communication type for emails that need no
//! extraction, and produces a professional acknowledgment. Never calls an
//! extraction capability.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::pipeline::rules::{LOGISTICS_PATTERN, TRAINING_PATTERN, normalize};
use crate::pipeline::summary::summarize;
use crate::pipeline::types::{
    AckStatus, AcknowledgmentResponse, ActionTaken, CommunicationType, EmailInput,
    NormalizedResponse, Relevance,
};

/// One communication-type rule. First match wins.
struct CommunicationRule {
    communication_type: CommunicationType,
    regex: Regex,
    /// Only applies when the email uses logistics vocabulary.
    logistics_only: bool,
}

fn comm(communication_type: CommunicationType, pattern: &str, logistics_only: bool) -> CommunicationRule {
    CommunicationRule {
        communication_type,
        regex: Regex::new(pattern).expect("built-in communication pattern"),
        logistics_only,
    }
}

static LOGISTICS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(LOGISTICS_PATTERN).expect("built-in logistics pattern"));

static COMMUNICATION_RULES: LazyLock<Vec<CommunicationRule>> = LazyLock::new(|| {
    use CommunicationType::*;

    vec![
        comm(TrainingData, TRAINING_PATTERN, false),
        comm(
            SpamIrrelevant,
            r"\b(unsubscribe|limited time|act now|winner|you('ve| have) won|click here|free gift|lottery|crypto|special offer|promo code|deal of the day|\d+% off)",
            false,
        ),
        comm(
            ReferenceSharing,
            r"\bfyi\b|\bfor your (information|reference|records|files)\b|\bfor reference\b|\bfor (our|the) records\b|\bjust so you know\b|\bheads up\b",
            true,
        ),
        comm(
            BusinessConfirmation,
            r"\b(order|payment|booking|shipment) (has been |was )?(received|processed|confirmed)\b|\b(order|booking|shipment|delivery) confirmation\b|\b(has been|was|were) delivered\b|\bdelivered (at|on)\b|\bpackage delivered\b|\bthank you for your (order|business|payment)\b",
            true,
        ),
        comm(
            DocumentDelivery,
            r"\b(attached is|attached are|please find attached|find attached|attached please find|here's|here is|here are) (your|the|a|an|our)\b|\b(is|are) attached\b|\battached\b",
            true,
        ),
        comm(
            CourtesyInfo,
            r"\badvance ship(ping|ment) notice\b|\basn\b|\bstatus update\b|\bscheduled\b|\bin transit\b|\bout for delivery\b|\bpicked up\b|\bshipped\b|\beta\b|\bcourtesy\b",
            true,
        ),
        comm(
            NonLogisticsBusiness,
            r"\b(meeting|agenda|policy|policies|hr|human resources|benefits|payroll|all[- ]hands|webinar|newsletter|announcement|training session|town hall|quarterly|budget|expense report|it support|password)\b",
            false,
        ),
        comm(
            Personal,
            r"\b(birthday|happy hour|family|vacation|weekend|dinner|congrats|congratulations|wedding|baby|lunch|coffee|party|holiday)\b",
            false,
        ),
    ]
});

/// Relevance, communication type, and action for one body.
pub fn assess(body: &str) -> (Relevance, CommunicationType, ActionTaken) {
    let text = normalize(body);
    let logistics = LOGISTICS.is_match(&text);

    let communication_type = COMMUNICATION_RULES
        .iter()
        .filter(|r| logistics || !r.logistics_only)
        .find(|r| r.regex.is_match(&text))
        .map(|r| r.communication_type)
        .unwrap_or(if logistics {
            CommunicationType::CourtesyInfo
        } else {
            CommunicationType::NonLogisticsBusiness
        });

    let relevance = match communication_type {
        CommunicationType::SpamIrrelevant => Relevance::Irrelevant,
        CommunicationType::NonLogisticsBusiness | CommunicationType::Personal => {
            Relevance::NonLogistics
        }
        CommunicationType::TrainingData => Relevance::LogisticsRelated,
        _ if logistics => Relevance::LogisticsRelated,
        _ => Relevance::NonLogistics,
    };

    (relevance, communication_type, action_for(communication_type))
}

fn action_for(communication_type: CommunicationType) -> ActionTaken {
    match communication_type {
        CommunicationType::TrainingData => ActionTaken::StoredForTraining,
        CommunicationType::SpamIrrelevant => ActionTaken::MarkedAsIrrelevant,
        CommunicationType::ReferenceSharing | CommunicationType::CourtesyInfo => {
            ActionTaken::NotedForRecords
        }
        CommunicationType::BusinessConfirmation | CommunicationType::DocumentDelivery => {
            ActionTaken::ReceivedAndFiled
        }
        CommunicationType::NonLogisticsBusiness => ActionTaken::ForwardedToRelevantTeam,
        CommunicationType::Personal => ActionTaken::NoActionRequired,
    }
}

fn message_for(communication_type: CommunicationType, has_attachments: bool) -> String {
    let text = match communication_type {
        CommunicationType::TrainingData if has_attachments => {
            "Thank you for the sample documents. They have been stored for model training."
        }
        CommunicationType::TrainingData => {
            "Thank you for the training material. It has been stored for model training."
        }
        CommunicationType::DocumentDelivery => {
            "Thank you, the documents have been received and filed."
        }
        CommunicationType::BusinessConfirmation => {
            "Thank you for the confirmation. It has been received and filed."
        }
        CommunicationType::ReferenceSharing => {
            "Thanks for sharing. The information has been noted for our records."
        }
        CommunicationType::CourtesyInfo => {
            "Thanks for the update. It has been noted for our records."
        }
        CommunicationType::NonLogisticsBusiness => {
            "Thank you for your message. It has been forwarded to the relevant team."
        }
        CommunicationType::Personal => "Thanks for the note. No action is required on our side.",
        CommunicationType::SpamIrrelevant => {
            "This message does not appear to be relevant to our logistics operations and has been marked as irrelevant."
        }
    };
    text.to_string()
}

/// Produces `INFORMATIONAL_ACKNOWLEDGMENT` responses.
#[derive(Debug, Clone, Default)]
pub struct AcknowledgmentHandler;

impl AcknowledgmentHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, input: &EmailInput) -> NormalizedResponse {
        let (relevance, communication_type, action_taken) = assess(&input.body);
        debug!(
            email_id = %input.log_id(),
            ?relevance,
            ?communication_type,
            "Acknowledging email"
        );

        NormalizedResponse::InformationalAcknowledgment {
            email_summary: summarize(&input.body),
            relevance,
            response: AcknowledgmentResponse {
                status: AckStatus::Acknowledged,
                communication_type,
                message: message_for(communication_type, input.has_usable_attachments()),
                action_taken,
            },
        }
    }
}
