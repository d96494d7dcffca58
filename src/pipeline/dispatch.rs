//! Document dispatch table.
//!
//! One route per `DocumentType`, stored in a fixed array indexed by the
//! enum discriminant. Adding a document type without a route fails to
//! compile (array length is `DocumentType::COUNT`).

use crate::pipeline::types::DocumentType;

/// How one document type reaches its extraction capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentRoute {
    pub document_type: DocumentType,
    /// Capability name used in logs.
    pub tool: &'static str,
    /// Path segment of the remote extraction endpoint.
    pub endpoint: &'static str,
}

/// The dispatch table.
pub const ROUTES: [DocumentRoute; DocumentType::COUNT] = [
    DocumentRoute {
        document_type: DocumentType::Bol,
        tool: "bol_api_tool",
        endpoint: "bol",
    },
    DocumentRoute {
        document_type: DocumentType::ShippingLabel,
        tool: "shipping_label_api_tool",
        endpoint: "shipping-label",
    },
    DocumentRoute {
        document_type: DocumentType::ItemLabel,
        tool: "item_label_api_tool",
        endpoint: "item-label",
    },
    DocumentRoute {
        document_type: DocumentType::Invoice,
        tool: "invoice_api_tool",
        endpoint: "invoice",
    },
    DocumentRoute {
        document_type: DocumentType::Receipt,
        tool: "receipt_api_tool",
        endpoint: "receipt",
    },
];

/// Look up the route for a document type.
pub fn route(document_type: DocumentType) -> &'static DocumentRoute {
    &ROUTES[document_type.index()]
}
