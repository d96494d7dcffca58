//! Deterministic stand-in for the document extraction service.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use super::{DocumentExtractor, remove_none_values};
use crate::error::ExtractionError;
use crate::pipeline::dispatch::DocumentRoute;
use crate::pipeline::types::DocumentType;

/// Returns stub fields per document type.
///
/// The sequence number is derived from the path, so the same file always
/// yields the same payload.
#[derive(Debug, Clone, Default)]
pub struct MockDocumentExtractor;

impl MockDocumentExtractor {
    pub fn new() -> Self {
        Self
    }
}

fn sequence(path: &str) -> u32 {
    let id = Uuid::new_v5(&Uuid::NAMESPACE_URL, path.as_bytes());
    (id.as_u128() % 999) as u32 + 1
}

fn stub_fields(document_type: DocumentType, seq: u32) -> Value {
    let amount = 1000.0 + f64::from((seq - 1) % 10) * 100.0;
    match document_type {
        DocumentType::Bol => json!({
            "bol_no": format!("BOL-MOCK-{seq:03}"),
            "shipper": "ACME Manufacturing",
            "consignee": "Northwind Distribution",
            "carrier": "MOCK FREIGHT",
            "pieces": 2 + seq % 10,
            "weight_lbs": 500 + seq * 10,
            "associated_shipment_id": "ABC-123",
            "seal_no": null,
        }),
        DocumentType::ShippingLabel => json!({
            "tracking_number": format!("1ZMOCK{seq:010}"),
            "carrier": "UPS",
            "service": "Ground",
            "ship_to": "Northwind Distribution, 100 Main St, Dallas, TX 75201",
            "weight_lbs": 10 + seq % 40,
        }),
        DocumentType::ItemLabel => json!({
            "sku": format!("SKU-MOCK-{seq:03}"),
            "description": "Mock item",
            "quantity": 1 + seq % 24,
            "lot_no": format!("LOT-{seq:04}"),
            "upc": null,
        }),
        DocumentType::Invoice => json!({
            "inv_no": format!("INV-MOCK-{seq:03}"),
            "amount_due": amount,
            "currency": "USD",
            "due_date": "2024-07-01",
            "associated_shipment_id": "ABC-123",
        }),
        DocumentType::Receipt => json!({
            "receipt_no": format!("RCPT-MOCK-{seq:03}"),
            "amount_paid": amount,
            "currency": "USD",
            "paid_on": "2024-06-15",
            "associated_shipment_id": "ABC-123",
        }),
    }
}

#[async_trait]
impl DocumentExtractor for MockDocumentExtractor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn extract_document(
        &self,
        path: &str,
        route: &DocumentRoute,
    ) -> Result<Value, ExtractionError> {
        let seq = sequence(path);
        debug!(tool = route.tool, path = %path, seq, "Mock extraction");
        Ok(remove_none_values(stub_fields(route.document_type, seq)))
    }
}
