// ============================================================================
// Table Rows
// ============================================================================
//
// Shapes line items into printable strings. No layout happens here.

use crate::model::{DocumentKind, LineItem};
use crate::money::format_currency;
use crate::totals::row_total;

/// First-column content: printed as a bold title line followed by the
/// (possibly multi-line) description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Designation {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRow {
    pub designation: Designation,
    /// Quantity with its unit marker, e.g. `2 u`.
    pub quantity: String,
    /// Present only for kinds that print the unit price.
    pub unit_price: Option<String>,
    pub total: String,
}

/// Column headers for a document kind, in print order.
pub fn column_headers(kind: DocumentKind) -> Vec<&'static str> {
    if kind.shows_unit_price() {
        vec![
            "Désignation",
            "Quantité",
            "Prix unitaire HT (€)",
            "Montant HT (€)",
        ]
    } else {
        vec!["Désignation", "Quantité", "Montant HT (€)"]
    }
}

pub fn build_rows(kind: DocumentKind, items: &[LineItem], unit_label: &str) -> Vec<RenderRow> {
    items
        .iter()
        .map(|item| RenderRow {
            designation: Designation {
                title: item.designation.clone(),
                description: item.description.clone(),
            },
            quantity: format_quantity(item.quantity, unit_label),
            unit_price: kind
                .shows_unit_price()
                .then(|| format_currency(item.unit_price)),
            total: format_currency(row_total(item)),
        })
        .collect()
}

fn format_quantity(quantity: u32, unit_label: &str) -> String {
    if unit_label.is_empty() {
        quantity.to_string()
    } else {
        format!("{} {}", quantity, unit_label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn items() -> Vec<LineItem> {
        vec![
            LineItem {
                designation: "Pose carrelage".into(),
                description: "Salle de bains\nFaïence murale".into(),
                quantity: 3,
                unit_price: "33.335".parse::<Decimal>().unwrap(),
            },
            LineItem::blank(),
        ]
    }

    #[test]
    fn test_quote_rows_carry_unit_price_and_total() {
        let rows = build_rows(DocumentKind::Quote, &items(), "u");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].designation.title, "Pose carrelage");
        assert_eq!(rows[0].designation.description, "Salle de bains\nFaïence murale");
        assert_eq!(rows[0].quantity, "3 u");
        assert_eq!(rows[0].unit_price.as_deref(), Some("33.34 €"));
        assert_eq!(rows[0].total, "100.01 €");
        assert_eq!(rows[1].quantity, "1 u");
        assert_eq!(rows[1].total, "0.00 €");
    }

    #[test]
    fn test_invoice_rows_have_single_amount() {
        let rows = build_rows(DocumentKind::Invoice, &items(), "u");
        assert!(rows.iter().all(|r| r.unit_price.is_none()));
        assert_eq!(column_headers(DocumentKind::Invoice).len(), 3);
        assert_eq!(column_headers(DocumentKind::Quote).len(), 4);
    }

    #[test]
    fn test_empty_unit_label() {
        let rows = build_rows(DocumentKind::Quote, &items(), "");
        assert_eq!(rows[0].quantity, "3");
    }
}
