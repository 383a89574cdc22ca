//! Normalizes the backend's inconsistently-shaped ticket payloads into
//! [`Ticket`].
//!
//! Every endpoint wraps the ticket differently and names the same fields
//! differently, so all shape-guessing lives here: consumers only ever see
//! the unified model. Probing is an ordered key-priority walk, not scattered
//! conditionals.

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::event::TicketId;
use crate::model::{
    ActivityLogEntry, Priority, TechnicianView, Ticket, TicketKind, TicketStatus, Viewer,
};
use crate::raw;
use crate::worklog;
use crate::{FIELD_PLACEHOLDER, REPORTER_SELF};

/// Wrap keys probed in priority order before falling back to the payload
/// root.
const WRAP_KEYS: &[&str] = &["ticket", "request", "data"];

const TICKET_NUMBER_KEYS: &[&str] = &["ticket_number", "ticketNumber", "number", "no_tiket"];
const TITLE_KEYS: &[&str] = &["title", "subject", "judul"];
const DESCRIPTION_KEYS: &[&str] = &["description", "detail", "deskripsi"];
const STATUS_KEYS: &[&str] = &["status", "current_status"];
const STAGE_KEYS: &[&str] = &["stage", "current_stage", "tahap"];
const PRIORITY_KEYS: &[&str] = &["priority", "prioritas"];
const SLA_DUE_KEYS: &[&str] = &["sla_due", "sla_due_at", "due_date", "deadline"];
const SLA_BREACHED_KEYS: &[&str] = &["sla_breached", "is_breached", "breached"];
const REPORTER_KEYS: &[&str] = &["reporter_name", "requester_name", "pelapor"];
const LOCATION_KEYS: &[&str] = &["location", "location_name", "lokasi"];
const CREATED_AT_KEYS: &[&str] = &["created_at", "submitted_at", "reported_at"];
const PROGRESS_LOG_KEYS: &[&str] = &["progress_updates", "progress"];
const SYSTEM_LOG_KEYS: &[&str] = &["logs", "history", "timeline"];

/// Fields that make an unwrapped object plausibly a ticket.
const MARKER_KEYS: &[&str] = &["ticket_number", "ticketNumber", "title", "status"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("no ticket object found in payload")]
    TicketNotFound,
    #[error("ticket is missing required field `{field}`")]
    MissingField { field: &'static str },
    #[error("unrecognized ticket status `{status}`")]
    UnknownStatus { status: String },
}

/// Maps one raw detail payload to a [`Ticket`].
///
/// `now` anchors the tolerant timestamp fallbacks so the function stays
/// pure; callers pass the same clock value they render with.
pub fn normalize(
    raw_payload: &Value,
    kind: TicketKind,
    viewer: Viewer,
    now: DateTime<Utc>,
) -> Result<Ticket, NormalizeError> {
    let obj = locate_ticket_object(raw_payload)?;

    let ticket_number = raw::first_nonempty_string(obj, TICKET_NUMBER_KEYS)
        .ok_or(NormalizeError::MissingField { field: "ticket_number" })?;

    let title = raw::first_nonempty_string(obj, TITLE_KEYS)
        .ok_or(NormalizeError::MissingField { field: "title" })?;

    // Guests only ever hold the ticket number, so it doubles as the id.
    let id = match viewer {
        Viewer::Guest => TicketId::new(ticket_number.clone()),
        Viewer::Staff => raw::first_string(obj, &["id"])
            .map(TicketId::new)
            .unwrap_or_else(|| TicketId::new(ticket_number.clone())),
    };

    let status_raw = raw::first_nonempty_string(obj, STATUS_KEYS)
        .ok_or(NormalizeError::MissingField { field: "status" })?;
    let status = TicketStatus::from_raw(&status_raw)
        .ok_or(NormalizeError::UnknownStatus { status: status_raw })?;

    let stage = raw::first_nonempty_string(obj, STAGE_KEYS);

    let priority = match raw::first_nonempty_string(obj, PRIORITY_KEYS) {
        Some(p) => Priority::from_raw(&p).unwrap_or_else(|| {
            tracing::warn!(priority = %p, "unknown priority, defaulting to medium");
            Priority::Medium
        }),
        None => Priority::Medium,
    };

    let sla_due_at = raw::first_timestamp(obj, SLA_DUE_KEYS);
    let sla_breached = raw::first_bool(obj, SLA_BREACHED_KEYS)
        .unwrap_or_else(|| sla_due_at.is_some_and(|due| due < now));

    let reporter_name = match viewer {
        Viewer::Guest => raw::first_nonempty_string(obj, REPORTER_KEYS)
            .unwrap_or_else(|| REPORTER_SELF.to_string()),
        Viewer::Staff => raw::first_nonempty_string(obj, REPORTER_KEYS)
            .or_else(|| raw::nested_string(obj, &["reporter", "full_name"]))
            .or_else(|| raw::nested_string(obj, &["user", "full_name"]))
            .unwrap_or_else(|| FIELD_PLACEHOLDER.to_string()),
    };

    let location = raw::first_nonempty_string(obj, LOCATION_KEYS)
        .unwrap_or_else(|| FIELD_PLACEHOLDER.to_string());

    let created_at = raw::first_timestamp(obj, CREATED_AT_KEYS).unwrap_or_else(|| {
        tracing::warn!(%ticket_number, "ticket without parseable created_at");
        now
    });

    let activity = extract_activity(obj, viewer, now);

    Ok(Ticket {
        id,
        ticket_number,
        kind,
        title,
        description: raw::first_string(obj, DESCRIPTION_KEYS).unwrap_or_default(),
        status,
        stage: stage.clone(),
        priority,
        sla_due_at,
        sla_breached,
        reporter_name,
        location,
        created_at,
        technician_view: TechnicianView::derive(status, stage.as_deref()),
        activity,
    })
}

/// Normalizes a list payload leniently: the entry array is probed under the
/// usual wrap keys, and entries that fail to normalize are skipped with a
/// warning instead of failing the whole list.
pub fn normalize_list(
    raw_payload: &Value,
    kind: TicketKind,
    viewer: Viewer,
    now: DateTime<Utc>,
) -> Result<Vec<Ticket>, NormalizeError> {
    let entries = locate_list_array(raw_payload).ok_or(NormalizeError::TicketNotFound)?;

    Ok(entries
        .iter()
        .filter_map(|entry| match normalize(entry, kind, viewer, now) {
            Ok(ticket) => Some(ticket),
            Err(error) => {
                tracing::warn!(%error, "skipping unnormalizable list entry");
                None
            }
        })
        .collect())
}

fn locate_ticket_object(payload: &Value) -> Result<&Value, NormalizeError> {
    for key in WRAP_KEYS {
        if let Some(inner) = payload.get(key).filter(|v| v.is_object()) {
            return Ok(inner);
        }
    }

    if payload.is_object() && raw::first_value(payload, MARKER_KEYS).is_some() {
        return Ok(payload);
    }

    Err(NormalizeError::TicketNotFound)
}

fn locate_list_array(payload: &Value) -> Option<&[Value]> {
    if let Some(entries) = payload.as_array() {
        return Some(entries);
    }
    raw::first_array(payload, &["tickets", "incidents", "requests", "data"])
}

fn extract_activity(obj: &Value, viewer: Viewer, now: DateTime<Utc>) -> Vec<ActivityLogEntry> {
    if viewer == Viewer::Guest {
        // Public tracking exposes a single pre-mixed timeline.
        let timeline = raw::first_array(obj, &["timeline"]).unwrap_or(&[]);
        return worklog::map_guest_timeline(timeline, now);
    }

    let progress = raw::first_array(obj, PROGRESS_LOG_KEYS).unwrap_or(&[]);
    let system = raw::first_array(obj, SYSTEM_LOG_KEYS).unwrap_or(&[]);
    worklog::merge(progress, system, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        "2025-06-01T10:00:00Z".parse().unwrap()
    }

    fn staff(payload: &Value) -> Result<Ticket, NormalizeError> {
        normalize(payload, TicketKind::Incident, Viewer::Staff, now())
    }

    fn base_ticket() -> Value {
        json!({
            "id": 7,
            "ticket_number": "INC-2025-0105",
            "title": "AC rusak",
            "status": "in_progress",
            "stage": "execution",
            "priority": "High",
            "created_at": "2025-05-30 09:00:00"
        })
    }

    mod wrap_key_probing {
        use super::*;

        #[test]
        fn same_ticket_under_every_wrap_shape() {
            let inner = base_ticket();
            let shapes = [
                json!({ "ticket": inner }),
                json!({ "request": inner }),
                json!({ "data": inner }),
                inner.clone(),
            ];

            for shape in &shapes {
                let ticket = staff(shape).unwrap();
                assert_eq!(ticket.ticket_number, "INC-2025-0105");
                assert_eq!(ticket.status, TicketStatus::InProgress);
            }
        }

        #[test]
        fn wrap_keys_win_over_root_markers() {
            // `ticket` is probed before the root even when the root also
            // looks plausible.
            let payload = json!({
                "title": "bukan tiket",
                "ticket": base_ticket()
            });
            assert_eq!(staff(&payload).unwrap().title, "AC rusak");
        }

        #[test]
        fn unlocatable_payload_is_ticket_not_found() {
            assert_eq!(staff(&json!({ "message": "ok" })), Err(NormalizeError::TicketNotFound));
            assert_eq!(staff(&json!(null)), Err(NormalizeError::TicketNotFound));
            assert_eq!(staff(&json!("string")), Err(NormalizeError::TicketNotFound));
        }
    }

    mod required_fields {
        use super::*;

        #[test]
        fn missing_title_is_an_error() {
            let mut inner = base_ticket();
            inner.as_object_mut().unwrap().remove("title");
            assert_eq!(
                staff(&json!({ "ticket": inner })),
                Err(NormalizeError::MissingField { field: "title" })
            );
        }

        #[test]
        fn missing_ticket_number_is_an_error() {
            let mut inner = base_ticket();
            inner.as_object_mut().unwrap().remove("ticket_number");
            assert_eq!(
                staff(&json!({ "ticket": inner })),
                Err(NormalizeError::MissingField { field: "ticket_number" })
            );
        }

        #[test]
        fn unknown_status_is_rejected_not_passed_through() {
            let mut inner = base_ticket();
            inner["status"] = json!("limbo");
            assert_eq!(
                staff(&json!({ "ticket": inner })),
                Err(NormalizeError::UnknownStatus { status: "limbo".into() })
            );
        }

        #[test]
        fn id_falls_back_to_ticket_number_for_staff() {
            let mut inner = base_ticket();
            inner.as_object_mut().unwrap().remove("id");
            let ticket = staff(&json!({ "ticket": inner })).unwrap();
            assert_eq!(ticket.id.as_str(), "INC-2025-0105");
        }
    }

    mod priority_normalization {
        use super::*;

        #[test]
        fn case_folded_and_major_maps_high() {
            let mut inner = base_ticket();
            inner["priority"] = json!("MAJOR");
            assert_eq!(staff(&json!({ "ticket": inner })).unwrap().priority, Priority::High);
        }

        #[test]
        fn absent_priority_defaults_to_medium_for_incidents() {
            // Inferred default: incidents without a priority field render as
            // "Sedang" in the original client.
            let mut inner = base_ticket();
            inner.as_object_mut().unwrap().remove("priority");
            assert_eq!(staff(&json!({ "ticket": inner })).unwrap().priority, Priority::Medium);
        }

        #[test]
        fn unknown_priority_string_also_defaults_to_medium() {
            let mut inner = base_ticket();
            inner["priority"] = json!("kinda-bad");
            assert_eq!(staff(&json!({ "ticket": inner })).unwrap().priority, Priority::Medium);
        }
    }

    mod display_fallbacks {
        use super::*;

        #[test]
        fn reporter_and_location_placeholder_when_absent() {
            let ticket = staff(&json!({ "ticket": base_ticket() })).unwrap();
            assert_eq!(ticket.reporter_name, "-");
            assert_eq!(ticket.location, "-");
        }

        #[test]
        fn reporter_from_nested_user_object() {
            let mut inner = base_ticket();
            inner["user"] = json!({ "full_name": "Sri Wahyuni" });
            let ticket = staff(&json!({ "ticket": inner })).unwrap();
            assert_eq!(ticket.reporter_name, "Sri Wahyuni");
        }
    }

    mod sla_fields {
        use super::*;

        #[test]
        fn breached_flag_is_taken_from_backend_when_present() {
            let mut inner = base_ticket();
            inner["sla_due"] = json!("2025-06-03 10:00:00");
            inner["sla_breached"] = json!(true);
            let ticket = staff(&json!({ "ticket": inner })).unwrap();
            assert!(ticket.sla_breached);
        }

        #[test]
        fn breached_flag_is_derived_from_past_deadline_when_absent() {
            let mut inner = base_ticket();
            inner["sla_due"] = json!("2025-05-31 10:00:00");
            let ticket = staff(&json!({ "ticket": inner })).unwrap();
            assert!(ticket.sla_breached);

            inner["sla_due"] = json!("2025-06-03 10:00:00");
            let ticket = staff(&json!({ "ticket": inner })).unwrap();
            assert!(!ticket.sla_breached);
        }
    }

    mod worklog_extraction {
        use super::*;
        use crate::model::LogSource;

        #[test]
        fn staff_payload_merges_progress_and_system_arrays() {
            let mut inner = base_ticket();
            inner["progress_updates"] = json!([{
                "handling_description": "Mulai",
                "updated_by_user": { "full_name": "Agus" },
                "created_at": "2025-05-30 10:00:00"
            }]);
            inner["logs"] = json!([{
                "description": "Tiket dibuat",
                "created_at": "2025-05-30 09:00:00"
            }]);

            let ticket = staff(&json!({ "ticket": inner })).unwrap();
            assert_eq!(ticket.activity.len(), 2);
            assert_eq!(ticket.activity[0].actor_name, "Agus");
            assert_eq!(ticket.activity[1].source, LogSource::System);
        }

        #[test]
        fn guest_payload_uses_single_timeline() {
            let payload = json!({
                "data": {
                    "ticket_number": "INC-2025-0200",
                    "title": "Printer macet",
                    "status": "open",
                    "timeline": [
                        { "description": "Tiket diterima", "created_at": "2025-05-30 09:00:00" }
                    ]
                }
            });

            let ticket =
                normalize(&payload, TicketKind::Incident, Viewer::Guest, now()).unwrap();
            assert_eq!(ticket.activity.len(), 1);
            assert_eq!(ticket.activity[0].actor_name, "Sistem");
            assert_eq!(ticket.activity[0].source, LogSource::System);
        }
    }

    mod guest_specifics {
        use super::*;

        #[test]
        fn guest_id_is_the_ticket_number() {
            let payload = json!({
                "data": {
                    "id": 99,
                    "ticket_number": "INC-2025-0200",
                    "title": "Printer macet",
                    "status": "open"
                }
            });

            let ticket =
                normalize(&payload, TicketKind::Incident, Viewer::Guest, now()).unwrap();
            assert_eq!(ticket.id.as_str(), "INC-2025-0200");
        }

        #[test]
        fn guest_reporter_falls_back_to_anda() {
            let payload = json!({
                "data": {
                    "ticket_number": "INC-2025-0200",
                    "title": "Printer macet",
                    "status": "open"
                }
            });

            let ticket =
                normalize(&payload, TicketKind::Incident, Viewer::Guest, now()).unwrap();
            assert_eq!(ticket.reporter_name, "Anda");
        }

        #[test]
        fn guest_reporter_name_still_wins_when_present() {
            let payload = json!({
                "data": {
                    "ticket_number": "INC-2025-0200",
                    "title": "Printer macet",
                    "status": "open",
                    "reporter_name": "Budi"
                }
            });

            let ticket =
                normalize(&payload, TicketKind::Incident, Viewer::Guest, now()).unwrap();
            assert_eq!(ticket.reporter_name, "Budi");
        }
    }

    mod list_normalization {
        use super::*;

        #[test]
        fn list_under_wrap_key_and_bad_entries_skipped() {
            let payload = json!({
                "data": [
                    base_ticket(),
                    { "garbage": true },
                ]
            });

            let tickets =
                normalize_list(&payload, TicketKind::Incident, Viewer::Staff, now()).unwrap();
            assert_eq!(tickets.len(), 1);
        }

        #[test]
        fn bare_array_payload_is_accepted() {
            let payload = json!([base_ticket()]);
            let tickets =
                normalize_list(&payload, TicketKind::Incident, Viewer::Staff, now()).unwrap();
            assert_eq!(tickets.len(), 1);
        }

        #[test]
        fn payload_without_array_is_not_found() {
            let payload = json!({ "message": "ok" });
            assert_eq!(
                normalize_list(&payload, TicketKind::Incident, Viewer::Staff, now()),
                Err(NormalizeError::TicketNotFound)
            );
        }
    }

    #[test]
    fn end_to_end_example_payload() {
        let payload = json!({
            "ticket": {
                "id": 1,
                "ticket_number": "INC-1",
                "title": "AC rusak",
                "status": "in_progress",
                "stage": "execution",
                "priority": "High",
                "sla_due": "2025-06-01 12:00:00",
                "progress_updates": [{
                    "handling_description": "Mulai",
                    "updated_by_user": { "full_name": "Agus" },
                    "created_at": "2025-05-31 09:00:00"
                }],
                "logs": []
            }
        });

        let ticket = staff(&payload).unwrap();
        assert_eq!(ticket.priority, Priority::High);
        assert_eq!(ticket.activity.len(), 1);
        assert_eq!(ticket.activity[0].actor_name, "Agus");
        assert_eq!(ticket.technician_view, TechnicianView::Working);

        // Two hours remain: inside the 24h window, so critical.
        let sla = crate::sla::evaluate_ticket(&ticket, now()).unwrap();
        assert_eq!(sla.tier, crate::model::UrgencyTier::Critical);
    }
}
