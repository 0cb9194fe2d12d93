//! Billing period calculator.
//!
//! Pure read-compute: given a month and a client's service assignments,
//! produce one prorated line item per assignment active in that month.
//! Amounts are rounded half-up to 2 decimal places
//! (`RoundingStrategy::MidpointAwayFromZero`); the rounding mode is part of
//! the billing contract because it is observable to clients.

use crate::models::{BillingMonth, MonthPreview, ServiceAssignment, ServiceLineItem};
use rust_decimal::{Decimal, RoundingStrategy};

/// Whether `assignment` has at least one billable day in `month`.
///
/// An assignment overlaps a month when billing started on or before the
/// month's last day and has not stopped before the month's first day.
pub fn overlaps(assignment: &ServiceAssignment, month: BillingMonth) -> bool {
    if assignment.billing_start_date > month.last_day() {
        return false;
    }
    match assignment.service_stop_date {
        Some(stop) => stop >= month.first_day(),
        None => true,
    }
}

/// Prorate one assignment over one month. `None` when the assignment has no
/// billable days in the month; a stopped assignment must be excluded, not
/// emitted as a zero-amount item.
pub fn prorate(assignment: &ServiceAssignment, month: BillingMonth) -> Option<ServiceLineItem> {
    if !overlaps(assignment, month) {
        return None;
    }

    let first = month.first_day();
    let last = month.last_day();
    let effective_start = assignment.billing_start_date.max(first);
    let effective_end = assignment.service_stop_date.unwrap_or(last).min(last);

    let prorated_days = ((effective_end - effective_start).num_days() + 1).max(0);
    if prorated_days == 0 {
        return None;
    }

    let prorated_amount = match assignment.rate {
        Some(rate) => {
            let days_in_month = Decimal::from(month.days_in_month());
            (rate * Decimal::from(prorated_days) / days_in_month)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        }
        // Informational line: carried on the preview with no charge.
        None => Decimal::ZERO,
    };

    Some(ServiceLineItem {
        assignment_id: assignment.assignment_id,
        service_id: assignment.service_id,
        service_name: assignment.service_name.clone(),
        description: assignment.description.clone(),
        link_capacity: assignment.link_capacity.clone(),
        rate: assignment.rate,
        billing_start_date: assignment.billing_start_date,
        service_stop_date: assignment.service_stop_date,
        status: assignment.status.clone(),
        prorated_days,
        prorated_amount,
    })
}

/// Compute the full preview for one month across a set of assignments.
pub fn month_preview(assignments: &[ServiceAssignment], month: BillingMonth) -> MonthPreview {
    let line_items: Vec<ServiceLineItem> = assignments
        .iter()
        .filter_map(|a| prorate(a, month))
        .collect();
    let month_total = line_items.iter().map(|li| li.prorated_amount).sum();

    MonthPreview {
        month,
        label: month.label(),
        line_items,
        month_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Datelike, NaiveDate, Utc};
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn month(s: &str) -> BillingMonth {
        s.parse().unwrap()
    }

    fn assignment(
        rate: Option<&str>,
        start: NaiveDate,
        stop: Option<NaiveDate>,
    ) -> ServiceAssignment {
        ServiceAssignment {
            assignment_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            service_name: "Dedicated Internet".into(),
            description: Some("Fiber uplink".into()),
            link_capacity: Some("100 Mbps".into()),
            rate: rate.map(|r| r.parse().unwrap()),
            service_start_month: start.with_day(1).unwrap(),
            billing_start_date: start,
            service_stop_date: stop,
            status: if stop.is_some() { "inactive" } else { "active" }.into(),
            created_utc: DateTime::<Utc>::MIN_UTC,
            updated_utc: DateTime::<Utc>::MIN_UTC,
        }
    }

    #[test]
    fn full_month_yields_exactly_the_rate() {
        // 30-day month, active the whole month: no rounding drift.
        let a = assignment(Some("3000.00"), date(2024, 12, 1), None);
        let li = prorate(&a, month("2025-04")).unwrap();
        assert_eq!(li.prorated_days, 30);
        assert_eq!(li.prorated_amount, "3000.00".parse().unwrap());
    }

    #[test]
    fn mid_month_start_is_prorated_by_day_count() {
        // Start on day 16 of a 30-day month: 15 billable days.
        let a = assignment(Some("3000.00"), date(2025, 4, 16), None);
        let li = prorate(&a, month("2025-04")).unwrap();
        assert_eq!(li.prorated_days, 15);
        assert_eq!(li.prorated_amount, "1500.00".parse().unwrap());
    }

    #[test]
    fn mid_month_stop_is_prorated_by_day_count() {
        // Stop on day 10 of a 31-day month: 10 billable days.
        let a = assignment(
            Some("3100.00"),
            date(2024, 11, 1),
            Some(date(2025, 1, 10)),
        );
        let li = prorate(&a, month("2025-01")).unwrap();
        assert_eq!(li.prorated_days, 10);
        assert_eq!(li.prorated_amount, "1000.00".parse().unwrap());
    }

    #[test]
    fn stopped_before_month_is_excluded_entirely() {
        let a = assignment(
            Some("3000.00"),
            date(2024, 11, 1),
            Some(date(2024, 12, 20)),
        );
        assert!(!overlaps(&a, month("2025-01")));
        assert!(prorate(&a, month("2025-01")).is_none());
    }

    #[test]
    fn starting_after_month_is_excluded_entirely() {
        let a = assignment(Some("3000.00"), date(2025, 2, 1), None);
        assert!(prorate(&a, month("2025-01")).is_none());
    }

    #[test]
    fn start_and_stop_within_the_same_month() {
        let a = assignment(
            Some("3100.00"),
            date(2025, 1, 10),
            Some(date(2025, 1, 19)),
        );
        let li = prorate(&a, month("2025-01")).unwrap();
        assert_eq!(li.prorated_days, 10);
        assert_eq!(li.prorated_amount, "1000.00".parse().unwrap());
    }

    #[test]
    fn leap_february_uses_29_days() {
        let a = assignment(Some("2900.00"), date(2024, 2, 16), None);
        let li = prorate(&a, month("2024-02")).unwrap();
        assert_eq!(li.prorated_days, 14);
        // 2900 * 14 / 29 = 1400.00
        assert_eq!(li.prorated_amount, "1400.00".parse().unwrap());
    }

    #[test]
    fn missing_rate_is_an_informational_zero_line() {
        let a = assignment(None, date(2024, 6, 1), None);
        let li = prorate(&a, month("2025-01")).unwrap();
        assert_eq!(li.prorated_amount, Decimal::ZERO);
        assert_eq!(li.prorated_days, 31);
    }

    #[test]
    fn rounding_is_half_up() {
        // 100.00 * 1 / 31 = 3.2258... -> 3.23
        let a = assignment(Some("100.00"), date(2025, 1, 31), None);
        let li = prorate(&a, month("2025-01")).unwrap();
        assert_eq!(li.prorated_days, 1);
        assert_eq!(li.prorated_amount, "3.23".parse().unwrap());

        // 100.05 * 15 / 30 = 50.025, an exact midpoint: half-up gives 50.03
        // where banker's rounding would give 50.02.
        let b = assignment(Some("100.05"), date(2025, 4, 16), None);
        let li = prorate(&b, month("2025-04")).unwrap();
        assert_eq!(li.prorated_amount, "50.03".parse().unwrap());
    }

    #[test]
    fn month_preview_totals_line_items() {
        let assignments = vec![
            assignment(Some("3000.00"), date(2024, 12, 1), None),
            assignment(Some("3000.00"), date(2025, 4, 16), None),
            assignment(Some("9999.00"), date(2025, 6, 1), None), // not yet started
        ];
        let preview = month_preview(&assignments, month("2025-04"));
        assert_eq!(preview.line_items.len(), 2);
        assert_eq!(preview.month_total, "4500.00".parse().unwrap());
        assert_eq!(preview.label, "April 2025");
    }
}
