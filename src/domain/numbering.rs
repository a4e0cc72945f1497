use chrono::NaiveDate;

// ============================================================================
// Document Numbering - B2B-YYYYMMDD-NNNN / SHP-YYYYMMDD-NNNN
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Order,
    Shipment,
}

impl DocumentKind {
    pub fn code(&self) -> &'static str {
        match self {
            DocumentKind::Order => "B2B",
            DocumentKind::Shipment => "SHP",
        }
    }
}

/// Prefix shared by every document of `kind` issued on `date`
pub fn day_prefix(kind: DocumentKind, date: NaiveDate) -> String {
    format!("{}-{}-", kind.code(), date.format("%Y%m%d"))
}

/// Next number given how many documents already carry today's prefix
pub fn document_number(kind: DocumentKind, date: NaiveDate, existing_today: i64) -> String {
    format!("{}{:04}", day_prefix(kind, date), existing_today.max(0) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()
    }

    #[test]
    fn test_first_order_of_the_day() {
        assert_eq!(
            document_number(DocumentKind::Order, date(), 0),
            "B2B-20260307-0001"
        );
    }

    #[test]
    fn test_shipment_numbers_continue_the_day_count() {
        assert_eq!(
            document_number(DocumentKind::Shipment, date(), 41),
            "SHP-20260307-0042"
        );
        assert_eq!(day_prefix(DocumentKind::Shipment, date()), "SHP-20260307-");
    }

    #[test]
    fn test_counter_wider_than_four_digits_is_not_truncated() {
        assert_eq!(
            document_number(DocumentKind::Order, date(), 12345),
            "B2B-20260307-12346"
        );
    }
}
