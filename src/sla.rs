//! SLA deadline evaluation.
//!
//! Pure and idempotent: classification is a function of the deadline, the
//! breach flag, and the caller's `now`. It is recomputed on every read and
//! never cached, so the urgency a screen shows is always current.

use chrono::{DateTime, Duration, Utc};

use crate::model::{SlaStatus, Ticket, UrgencyTier};
use crate::{SLA_CRITICAL_WINDOW_HOURS, SLA_WARNING_WINDOW_HOURS};

/// Classifies a deadline against `now`. Returns `None` when there is no
/// deadline: urgency is only meaningful once an SLA exists.
#[must_use]
pub fn evaluate(
    due_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    breached: Option<bool>,
) -> Option<SlaStatus> {
    let due_at = due_at?;
    let remaining = due_at - now;

    if remaining < Duration::zero() {
        let overdue = -remaining;
        return Some(SlaStatus {
            remaining_ms: remaining.num_milliseconds(),
            tier: UrgencyTier::Critical,
            display_text: format!("Terlambat {}", format_hours_minutes(overdue)),
        });
    }

    // The warning band lies inside the critical window, so the critical gate
    // wins whenever both match; it only fires if that gate is ever widened.
    let tier = if breached == Some(true) || remaining <= Duration::hours(SLA_CRITICAL_WINDOW_HOURS)
    {
        UrgencyTier::Critical
    } else if remaining < Duration::hours(SLA_WARNING_WINDOW_HOURS) {
        UrgencyTier::Warning
    } else {
        UrgencyTier::Safe
    };

    Some(SlaStatus {
        remaining_ms: remaining.num_milliseconds(),
        tier,
        display_text: format!("{} lagi", format_hours_minutes(remaining)),
    })
}

/// Ticket-level evaluation. Resolved and closed tickets are out of SLA
/// consideration entirely, before the deadline is even looked at.
#[must_use]
pub fn evaluate_ticket(ticket: &Ticket, now: DateTime<Utc>) -> Option<SlaStatus> {
    if ticket.status.is_terminal() {
        return None;
    }
    evaluate(ticket.sla_due_at, now, Some(ticket.sla_breached))
}

/// Gate used by every "urgent tickets" aggregation.
#[must_use]
pub fn is_urgent(ticket: &Ticket, now: DateTime<Utc>) -> bool {
    evaluate_ticket(ticket, now)
        .is_some_and(|sla| sla.tier == UrgencyTier::Critical)
}

fn format_hours_minutes(duration: Duration) -> String {
    let hours = duration.num_hours();
    let minutes = duration.num_minutes() % 60;
    format!("{hours}j {minutes}m")
}
