// ============================================================================
// Clock
// ============================================================================

use chrono::{Local, NaiveDateTime};

/// Source of "now". Generation never reads the system time directly so that
/// document numbers and dates are reproducible under a fixed clock.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Document number: digits only, `DDMMYYYY` followed by `HHMM`.
pub fn document_number(at: NaiveDateTime) -> String {
    at.format("%d%m%Y%H%M").to_string()
}

/// Date as printed in the header block.
pub fn format_date_display(at: NaiveDateTime) -> String {
    at.format("%d/%m/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_document_number_is_day_month_year_hour_minute() {
        let at = NaiveDate::from_ymd_opt(2025, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 42)
            .unwrap();
        assert_eq!(document_number(at), "070320250905");
        assert!(document_number(at).chars().all(|c| c.is_ascii_digit()));
        assert_eq!(format_date_display(at), "07/03/2025");
    }

    #[test]
    fn test_fixed_clock_is_stable() {
        let at = NaiveDate::from_ymd_opt(2024, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 0)
            .unwrap();
        let clock = FixedClock(at);
        assert_eq!(clock.now(), clock.now());
        assert_eq!(document_number(clock.now()), "311220242359");
    }
}
