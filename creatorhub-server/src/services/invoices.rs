//! Invoice totals, numbering and status rules

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;

use creatorhub_common::domain::InvoiceStatus;
use creatorhub_common::{Error, Result};

use crate::db::invoices::{Invoice, InvoiceItem};

/// Computed invoice amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub subtotal_cents: i64,
    /// Agency share of the subtotal
    pub agency_fee_cents: i64,
    /// Amount owed to the creator (`subtotal - agency_fee`)
    pub total_cents: i64,
}

/// Validate the line items and compute the totals
///
/// The fee is `subtotal * agency_share_percent / 100`, rounded half up.
pub fn compute_totals(items: &[InvoiceItem], agency_share_percent: i64) -> Result<Totals> {
    if items.is_empty() {
        return Err(Error::InvalidInput("An invoice needs at least one item".to_string()));
    }
    if !(0..=100).contains(&agency_share_percent) {
        return Err(Error::InvalidInput(format!(
            "Revenue share {} is outside 0..=100",
            agency_share_percent
        )));
    }

    let overflow = || Error::InvalidInput("Invoice amount is too large".to_string());
    let mut subtotal: i64 = 0;
    for item in items {
        if item.description.trim().is_empty() {
            return Err(Error::InvalidInput("Item description is required".to_string()));
        }
        if item.quantity <= 0 {
            return Err(Error::InvalidInput(format!(
                "Quantity for '{}' must be positive",
                item.description
            )));
        }
        if item.unit_amount_cents < 0 {
            return Err(Error::InvalidInput(format!(
                "Unit amount for '{}' cannot be negative",
                item.description
            )));
        }
        let line = item
            .quantity
            .checked_mul(item.unit_amount_cents)
            .ok_or_else(overflow)?;
        subtotal = subtotal.checked_add(line).ok_or_else(overflow)?;
    }

    let fee = subtotal
        .checked_mul(agency_share_percent)
        .and_then(|v| v.checked_add(50))
        .map(|v| v / 100)
        .ok_or_else(overflow)?;

    Ok(Totals {
        subtotal_cents: subtotal,
        agency_fee_cents: fee,
        total_cents: subtotal - fee,
    })
}

/// `INV-YYYYMM-` prefix for invoices created at `at`
pub fn number_prefix(at: DateTime<Utc>) -> String {
    format!("INV-{:04}{:02}-", at.year(), at.month())
}

/// Invoice number for a prefix and sequence (`INV-YYYYMM-NNNN`)
pub fn format_number(prefix: &str, sequence: u32) -> String {
    format!("{}{:04}", prefix, sequence)
}

/// Status shown to clients: `sent` invoices past their due date are overdue
pub fn effective_status(invoice: &Invoice, today: NaiveDate) -> InvoiceStatus {
    if invoice.status == InvoiceStatus::Sent && invoice.due_date < today {
        InvoiceStatus::Overdue
    } else {
        invoice.status
    }
}

/// Whether an invoice may move from `from` to `to`
pub fn can_set_status(from: InvoiceStatus, to: InvoiceStatus) -> bool {
    !from.is_final() && from != to && to != InvoiceStatus::Draft
}

pub fn ensure_status_change(from: InvoiceStatus, to: InvoiceStatus) -> Result<()> {
    if can_set_status(from, to) {
        Ok(())
    } else {
        Err(Error::illegal_transition("Invoice", from, to))
    }
}

/// Due date `terms_days` after the period end
pub fn default_due_date(period_end: NaiveDate, terms_days: i64) -> Result<NaiveDate> {
    if terms_days < 0 {
        return Err(Error::InvalidInput(format!(
            "Payment terms must not be negative, got {} days",
            terms_days
        )));
    }
    Duration::try_days(terms_days)
        .and_then(|terms| period_end.checked_add_signed(terms))
        .ok_or_else(|| {
            Error::InvalidInput(format!(
                "Due date {} days after {} is out of range",
                terms_days, period_end
            ))
        })
}

/// Validate period and due dates
pub fn validate_dates(
    period_start: NaiveDate,
    period_end: NaiveDate,
    due_date: NaiveDate,
) -> Result<()> {
    if period_end < period_start {
        return Err(Error::InvalidInput(
            "period_end must not be before period_start".to_string(),
        ));
    }
    if due_date < period_start {
        return Err(Error::InvalidInput(
            "due_date must not be before period_start".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(description: &str, quantity: i64, unit: i64) -> InvoiceItem {
        InvoiceItem {
            description: description.to_string(),
            quantity,
            unit_amount_cents: unit,
        }
    }

    #[test]
    fn test_totals_with_share() {
        let items = vec![item("Subscriptions", 1, 100_000), item("Tips", 3, 2_500)];
        let totals = compute_totals(&items, 30).unwrap();
        assert_eq!(totals.subtotal_cents, 107_500);
        assert_eq!(totals.agency_fee_cents, 32_250);
        assert_eq!(totals.total_cents, 75_250);
    }

    #[test]
    fn test_fee_rounds_half_up() {
        let totals = compute_totals(&[item("x", 1, 5)], 10).unwrap();
        // 0.5 cents rounds up
        assert_eq!(totals.agency_fee_cents, 1);
        assert_eq!(totals.total_cents, 4);
    }

    #[test]
    fn test_invalid_items() {
        assert!(compute_totals(&[], 20).is_err());
        assert!(compute_totals(&[item("", 1, 1)], 20).is_err());
        assert!(compute_totals(&[item("x", 0, 1)], 20).is_err());
        assert!(compute_totals(&[item("x", 1, -1)], 20).is_err());
        assert!(compute_totals(&[item("x", i64::MAX, 2)], 20).is_err());
        assert!(compute_totals(&[item("x", 1, 1)], 101).is_err());
    }

    #[test]
    fn test_invoice_number_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let prefix = number_prefix(at);
        assert_eq!(prefix, "INV-202403-");
        assert_eq!(format_number(&prefix, 7), "INV-202403-0007");
    }

    #[test]
    fn test_status_rules() {
        use InvoiceStatus::*;
        assert!(can_set_status(Draft, Sent));
        assert!(can_set_status(Sent, Paid));
        assert!(can_set_status(Overdue, Paid));
        assert!(!can_set_status(Paid, Sent));
        assert!(!can_set_status(Cancelled, Paid));
        assert!(!can_set_status(Sent, Sent));
        assert!(!can_set_status(Sent, Draft));
        assert!(ensure_status_change(Sent, Paid).is_ok());
        assert!(matches!(
            ensure_status_change(Paid, Sent),
            Err(Error::IllegalTransition { entity: "Invoice", .. })
        ));
    }

    #[test]
    fn test_dates() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        assert!(validate_dates(d(1), d(31), d(31)).is_ok());
        assert!(validate_dates(d(10), d(1), d(31)).is_err());
        assert!(validate_dates(d(10), d(20), d(5)).is_err());
    }

    #[test]
    fn test_default_due_date() {
        let end = NaiveDate::from_ymd_opt(2026, 9, 30).unwrap();
        assert_eq!(
            default_due_date(end, 14).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()
        );
        assert!(matches!(default_due_date(NaiveDate::MAX, 14), Err(Error::InvalidInput(_))));
        assert!(matches!(default_due_date(end, i64::MAX), Err(Error::InvalidInput(_))));
        assert!(default_due_date(end, -1).is_err());
    }
}
