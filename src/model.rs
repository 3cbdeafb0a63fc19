// ============================================================================
// Document Model
// ============================================================================

use crate::lenient;
use chrono::NaiveDateTime;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use uuid::Uuid;

/// The two document variants. The kind decides the storage slot, the output
/// filename, the printed title and the table columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Quote,
    Invoice,
}

impl DocumentKind {
    pub fn storage_key(self) -> &'static str {
        match self {
            DocumentKind::Quote => "quoteForm",
            DocumentKind::Invoice => "invoiceForm",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            DocumentKind::Quote => "devis.pdf",
            DocumentKind::Invoice => "facture.pdf",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            DocumentKind::Quote => "DEVIS",
            DocumentKind::Invoice => "FACTURE",
        }
    }

    /// Quotes print both the unit price and the row total; invoices only the
    /// row total.
    pub fn shows_unit_price(self) -> bool {
        matches!(self, DocumentKind::Quote)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Quote => write!(f, "quote"),
            DocumentKind::Invoice => write!(f, "invoice"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Client {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub address: String,
    #[serde(deserialize_with = "lenient::string")]
    pub city: String,
    #[serde(deserialize_with = "lenient::string")]
    pub phone: String,
    #[serde(deserialize_with = "lenient::string")]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LineItem {
    #[serde(deserialize_with = "lenient::string")]
    pub designation: String,
    /// Free text, may contain line breaks.
    #[serde(deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(deserialize_with = "lenient::quantity")]
    pub quantity: u32,
    #[serde(deserialize_with = "lenient::non_negative_decimal")]
    pub unit_price: Decimal,
}

impl LineItem {
    pub fn blank() -> Self {
        LineItem {
            designation: String::new(),
            description: String::new(),
            quantity: 1,
            unit_price: Decimal::ZERO,
        }
    }
}

impl Default for LineItem {
    fn default() -> Self {
        LineItem::blank()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentFlags {
    #[serde(deserialize_with = "lenient::boolean")]
    pub manual_total_override: bool,
    #[serde(deserialize_with = "lenient::decimal")]
    pub manual_total_value: Decimal,
    #[serde(deserialize_with = "lenient::boolean")]
    pub vat_exempt: bool,
    #[serde(deserialize_with = "lenient::non_negative_decimal")]
    pub deposit_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub kind: DocumentKind,
    pub id: Uuid,
    pub created_at: NaiveDateTime,
    /// Printed as "Objet" in the header.
    pub subject: String,
    pub client: Client,
    pub items: Vec<LineItem>,
    pub flags: DocumentFlags,
}

impl Document {
    /// A fresh document: default client, no flags and one blank line item.
    pub fn new(kind: DocumentKind, created_at: NaiveDateTime) -> Self {
        Document {
            kind,
            id: Uuid::new_v4(),
            created_at,
            subject: String::new(),
            client: Client::default(),
            items: vec![LineItem::blank()],
            flags: DocumentFlags::default(),
        }
    }

    /// Guarantees at least one row before rendering. Returns true when a
    /// placeholder had to be inserted.
    pub fn ensure_renderable(&mut self) -> bool {
        if self.items.is_empty() {
            self.items.push(LineItem::blank());
            true
        } else {
            false
        }
    }

    /// Reports the constraints an entry form would enforce. Generation does
    /// not depend on these; callers decide whether to warn or refuse.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.client.name.trim().is_empty() {
            issues.push(ValidationIssue::MissingClientName);
        }
        let email = self.client.email.trim();
        if !email.is_empty() && email_pattern().is_some_and(|re| !re.is_match(email)) {
            issues.push(ValidationIssue::InvalidEmail(email.to_string()));
        }
        for (index, item) in self.items.iter().enumerate() {
            if item.designation.trim().is_empty() {
                issues.push(ValidationIssue::MissingDesignation { index });
            }
            if item.quantity < 1 {
                issues.push(ValidationIssue::QuantityTooSmall { index });
            }
        }
        issues
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationIssue {
    #[error("client name is required")]
    MissingClientName,
    #[error("client email is not a valid address: {0}")]
    InvalidEmail(String),
    #[error("item {index}: designation is required")]
    MissingDesignation { index: usize },
    #[error("item {index}: quantity must be at least 1")]
    QuantityTooSmall { index: usize },
}

fn email_pattern() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*$").ok())
        .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn created() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap()
    }

    #[test]
    fn test_new_document_has_one_blank_item() {
        let doc = Document::new(DocumentKind::Quote, created());
        assert_eq!(doc.items, vec![LineItem::blank()]);
        assert_eq!(doc.items[0].quantity, 1);
        assert_eq!(doc.items[0].unit_price, Decimal::ZERO);
    }

    #[test]
    fn test_ensure_renderable_inserts_placeholder() {
        let mut doc = Document::new(DocumentKind::Invoice, created());
        doc.items.clear();
        assert!(doc.ensure_renderable());
        assert_eq!(doc.items.len(), 1);
        assert!(!doc.ensure_renderable());
    }

    #[test]
    fn test_kind_slots_and_files() {
        assert_eq!(DocumentKind::Quote.storage_key(), "quoteForm");
        assert_eq!(DocumentKind::Invoice.storage_key(), "invoiceForm");
        assert_eq!(DocumentKind::Quote.file_name(), "devis.pdf");
        assert_eq!(DocumentKind::Invoice.file_name(), "facture.pdf");
    }

    #[test]
    fn test_validate_reports_form_constraints() {
        let mut doc = Document::new(DocumentKind::Quote, created());
        doc.client.email = "not-an-email".into();
        doc.items[0].quantity = 0;
        let issues = doc.validate();
        assert!(issues.contains(&ValidationIssue::MissingClientName));
        assert!(issues.contains(&ValidationIssue::InvalidEmail("not-an-email".into())));
        assert!(issues.contains(&ValidationIssue::MissingDesignation { index: 0 }));
        assert!(issues.contains(&ValidationIssue::QuantityTooSmall { index: 0 }));

        doc.client.name = "Mme Durand".into();
        doc.client.email = "durand@example.fr".into();
        doc.items[0].designation = "Pose carrelage".into();
        doc.items[0].quantity = 2;
        assert!(doc.validate().is_empty());
    }
}
