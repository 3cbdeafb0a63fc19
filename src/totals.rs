// ============================================================================
// Totals
// ============================================================================
//
// Pure functions over a document. Intermediate sums are never rounded;
// rounding to cents happens when amounts are formatted for printing.
// Amounts too large for a Decimal count as zero, like any other unusable
// number, so these functions never fail.

use crate::model::{Document, LineItem};
use rust_decimal::Decimal;

/// Fixed VAT policy rate (10%).
pub const VAT_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

fn or_zero(value: Option<Decimal>, what: &str) -> Decimal {
    value.unwrap_or_else(|| {
        log::warn!("{} overflows the supported range; using 0", what);
        Decimal::ZERO
    })
}

pub fn row_total(item: &LineItem) -> Decimal {
    or_zero(
        Decimal::from(item.quantity).checked_mul(item.unit_price),
        "line total",
    )
}

pub fn total_ht(document: &Document) -> Decimal {
    if document.flags.manual_total_override {
        return document.flags.manual_total_value;
    }
    let sum = document
        .items
        .iter()
        .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(row_total(item)));
    or_zero(sum, "total HT")
}

fn vat_on(total_ht: Decimal, exempt: bool) -> Decimal {
    if exempt {
        Decimal::ZERO
    } else {
        or_zero(total_ht.checked_mul(VAT_RATE), "VAT")
    }
}

fn ttc_of(total_ht: Decimal, vat: Decimal) -> Decimal {
    or_zero(total_ht.checked_add(vat), "total TTC")
}

pub fn vat(document: &Document) -> Decimal {
    vat_on(total_ht(document), document.flags.vat_exempt)
}

pub fn total_ttc(document: &Document) -> Decimal {
    let total_ht = total_ht(document);
    ttc_of(total_ht, vat_on(total_ht, document.flags.vat_exempt))
}

/// The deposit as entered. Not subtracted from the TTC total.
pub fn deposit_due(document: &Document) -> Decimal {
    document.flags.deposit_amount
}

/// Snapshot of every derived amount, computed in one go right before
/// rendering. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub total_ht: Decimal,
    pub vat: Decimal,
    pub total_ttc: Decimal,
    pub deposit_due: Decimal,
}

impl Totals {
    pub fn compute(document: &Document) -> Self {
        let total_ht = total_ht(document);
        let vat = vat_on(total_ht, document.flags.vat_exempt);
        Totals {
            total_ht,
            vat,
            total_ttc: ttc_of(total_ht, vat),
            deposit_due: deposit_due(document),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DocumentKind;
    use chrono::NaiveDateTime;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(quantity: u32, price: &str) -> LineItem {
        LineItem {
            designation: "Prestation".into(),
            description: String::new(),
            quantity,
            unit_price: dec(price),
        }
    }

    fn document(items: Vec<LineItem>) -> Document {
        let mut doc = Document::new(DocumentKind::Quote, NaiveDateTime::default());
        doc.items = items;
        doc
    }

    #[test]
    fn test_vat_rate_is_ten_percent() {
        assert_eq!(VAT_RATE, dec("0.10"));
    }

    #[test]
    fn test_row_total_zero_quantity() {
        assert_eq!(row_total(&item(0, "99.99")), Decimal::ZERO);
        assert_eq!(row_total(&item(3, "19.99")), dec("59.97"));
    }

    #[test]
    fn test_total_ht_keeps_unrounded_intermediates() {
        let doc = document(vec![item(1, "0.005"), item(1, "0.005")]);
        assert_eq!(total_ht(&doc), dec("0.01"));
        assert_eq!(vat(&doc), dec("0.001"));
    }

    #[test]
    fn test_override_ignores_items() {
        let mut doc = document(vec![item(4, "1000")]);
        doc.flags.manual_total_override = true;
        doc.flags.manual_total_value = dec("800");
        assert_eq!(total_ht(&doc), dec("800"));
    }

    #[test]
    fn test_snapshot_matches_individual_functions() {
        let mut doc = document(vec![item(2, "125.50"), item(1, "49")]);
        doc.flags.deposit_amount = dec("100");
        let totals = Totals::compute(&doc);
        assert_eq!(totals.total_ht, total_ht(&doc));
        assert_eq!(totals.vat, vat(&doc));
        assert_eq!(totals.total_ttc, total_ttc(&doc));
        assert_eq!(totals.deposit_due, deposit_due(&doc));

        doc.flags.vat_exempt = true;
        let totals = Totals::compute(&doc);
        assert_eq!(totals.vat, Decimal::ZERO);
        assert_eq!(totals.total_ttc, totals.total_ht);
    }

    #[test]
    fn test_overflowing_amounts_count_as_zero() {
        let doc = document(vec![item(2, "79228162514264337593543950335")]);
        assert_eq!(row_total(&doc.items[0]), Decimal::ZERO);
        let totals = Totals::compute(&doc);
        assert_eq!(totals.total_ht, Decimal::ZERO);
        assert_eq!(totals.total_ttc, Decimal::ZERO);

        // Each row fits on its own but the sum does not.
        let doc = document(vec![
            item(1, "79228162514264337593543950335"),
            item(1, "79228162514264337593543950335"),
        ]);
        assert_eq!(total_ht(&doc), Decimal::ZERO);

        // HT fits but HT + VAT does not.
        let mut doc = document(Vec::new());
        doc.flags.manual_total_override = true;
        doc.flags.manual_total_value = Decimal::MAX;
        let totals = Totals::compute(&doc);
        assert_eq!(totals.total_ht, Decimal::MAX);
        assert_eq!(totals.total_ttc, Decimal::ZERO);
        assert_eq!(total_ttc(&doc), Decimal::ZERO);
    }
}
