//! Merges the two activity-log shapes the backend attaches to a ticket into
//! one timeline.
//!
//! "Progress" entries are written by technicians through the progress-update
//! endpoint; "system" entries are emitted by the backend itself. The two use
//! different field names for the same concepts, so each side gets its own
//! mapping before the combined sort.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::model::{ActivityLogEntry, LogSource};
use crate::raw;
use crate::{ACTOR_SYSTEM, ACTOR_TECHNICIAN_FALLBACK};

const TIMESTAMP_KEYS: &[&str] = &["created_at", "timestamp", "occurred_at", "date"];
const ID_KEYS: &[&str] = &["id", "log_id"];

/// Merges both raw log arrays into one list, newest first.
///
/// Entries with identical timestamps keep their relative order, progress
/// before system, because the concatenation happens in that order and the
/// sort is stable. Entries without a parseable timestamp are treated as
/// having just happened (`now`) and logged, never rejected.
#[must_use]
pub fn merge(progress: &[Value], system: &[Value], now: DateTime<Utc>) -> Vec<ActivityLogEntry> {
    let mut entries: Vec<ActivityLogEntry> = Vec::with_capacity(progress.len() + system.len());
    entries.extend(progress.iter().map(|entry| map_progress(entry, now)));
    entries.extend(system.iter().map(|entry| map_system(entry, now)));

    entries.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
    entries
}

/// Maps a guest public-tracking `timeline` array. Guests never see actor
/// identities, so the actor is forced to the system name regardless of what
/// the payload carries.
#[must_use]
pub fn map_guest_timeline(timeline: &[Value], now: DateTime<Utc>) -> Vec<ActivityLogEntry> {
    let mut entries: Vec<ActivityLogEntry> = timeline
        .iter()
        .map(|entry| {
            let mut mapped = map_system(entry, now);
            mapped.actor_name = ACTOR_SYSTEM.to_string();
            mapped
        })
        .collect();

    entries.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
    entries
}

fn map_progress(entry: &Value, now: DateTime<Utc>) -> ActivityLogEntry {
    let text = raw::first_nonempty_string(entry, &["handling_description", "notes"])
        .unwrap_or_else(|| {
            let status = raw::first_string(entry, &["status_change"]).unwrap_or_default();
            format!("Status berubah ke {status}")
        });

    let actor_name = raw::nested_string(entry, &["updated_by_user", "full_name"])
        .unwrap_or_else(|| ACTOR_TECHNICIAN_FALLBACK.to_string());

    ActivityLogEntry {
        id: entry_id(entry),
        occurred_at: entry_timestamp(entry, now),
        actor_name,
        text,
        source: LogSource::Progress,
    }
}

fn map_system(entry: &Value, now: DateTime<Utc>) -> ActivityLogEntry {
    let text = raw::first_nonempty_string(entry, &["description", "action"])
        .unwrap_or_else(String::new);

    let actor_name = raw::nested_string(entry, &["user", "full_name"])
        .unwrap_or_else(|| ACTOR_SYSTEM.to_string());

    ActivityLogEntry {
        id: entry_id(entry),
        occurred_at: entry_timestamp(entry, now),
        actor_name,
        text,
        source: LogSource::System,
    }
}

fn entry_id(entry: &Value) -> String {
    raw::first_string(entry, ID_KEYS).unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn entry_timestamp(entry: &Value, now: DateTime<Utc>) -> DateTime<Utc> {
    match raw::first_timestamp(entry, TIMESTAMP_KEYS) {
        Some(ts) => ts,
        None => {
            tracing::warn!("log entry without parseable timestamp, sorting as current time");
            now
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        "2025-06-01T10:00:00Z".parse().unwrap()
    }

    #[test]
    fn progress_description_fallback_chain() {
        let with_handling = json!({ "handling_description": "Ganti kabel", "notes": "x" });
        let with_notes = json!({ "notes": "Cek ulang" });
        let bare = json!({ "status_change": "in_progress" });

        let merged = merge(&[with_handling, with_notes, bare], &[], now());
        let texts: Vec<&str> = merged.iter().map(|e| e.text.as_str()).collect();

        assert!(texts.contains(&"Ganti kabel"));
        assert!(texts.contains(&"Cek ulang"));
        assert!(texts.contains(&"Status berubah ke in_progress"));
    }

    #[test]
    fn progress_actor_defaults_to_teknisi() {
        let entry = json!({ "notes": "Mulai", "created_at": "2025-06-01 09:00:00" });
        let merged = merge(&[entry], &[], now());
        assert_eq!(merged[0].actor_name, "Teknisi");
    }

    #[test]
    fn system_description_falls_back_to_action() {
        let entry = json!({ "action": "ticket_created", "user": { "full_name": "Dina" } });
        let merged = merge(&[], &[entry], now());
        assert_eq!(merged[0].text, "ticket_created");
        assert_eq!(merged[0].actor_name, "Dina");
    }

    #[test]
    fn system_actor_defaults_to_sistem() {
        let entry = json!({ "description": "Eskalasi otomatis" });
        let merged = merge(&[], &[entry], now());
        assert_eq!(merged[0].actor_name, "Sistem");
    }

    #[test]
    fn sorted_newest_first_across_sources() {
        let progress = vec![json!({ "notes": "older", "created_at": "2025-06-01 08:00:00" })];
        let system = vec![json!({ "description": "newer", "created_at": "2025-06-01 09:30:00" })];

        let merged = merge(&progress, &system, now());
        assert_eq!(merged[0].text, "newer");
        assert_eq!(merged[1].text, "older");
    }

    #[test]
    fn equal_timestamps_keep_progress_before_system() {
        let ts = "2025-06-01 09:00:00";
        let progress = vec![json!({ "notes": "dari teknisi", "created_at": ts })];
        let system = vec![json!({ "description": "dari sistem", "created_at": ts })];

        let merged = merge(&progress, &system, now());
        assert_eq!(merged[0].source, LogSource::Progress);
        assert_eq!(merged[1].source, LogSource::System);
    }

    #[test]
    fn unparseable_timestamp_sorts_as_now_not_error() {
        let progress = vec![json!({ "notes": "tanpa waktu", "created_at": "???" })];
        let system = vec![json!({ "description": "lama", "created_at": "2020-01-01 00:00:00" })];

        let merged = merge(&progress, &system, now());
        // The timestampless entry counts as "just happened", so it leads.
        assert_eq!(merged[0].text, "tanpa waktu");
        assert_eq!(merged[0].occurred_at, now());
    }

    #[test]
    fn synthetic_ids_are_generated_and_unique() {
        let entries = vec![json!({ "notes": "a" }), json!({ "notes": "b" })];
        let merged = merge(&entries, &[], now());
        assert!(!merged[0].id.is_empty());
        assert_ne!(merged[0].id, merged[1].id);
    }

    #[test]
    fn guest_timeline_forces_system_actor() {
        let timeline = vec![json!({
            "description": "Tiket diterima",
            "user": { "full_name": "Petugas Rahasia" },
            "created_at": "2025-06-01 07:00:00"
        })];

        let mapped = map_guest_timeline(&timeline, now());
        assert_eq!(mapped[0].actor_name, "Sistem");
        assert_eq!(mapped[0].source, LogSource::System);
    }

    mod merge_laws {
        use super::*;
        use proptest::prelude::*;

        prop_compose! {
            fn arb_entry()(ts in 0i64..2_000_000_000, text in "[a-z]{0,12}") -> Value {
                json!({ "notes": text, "created_at": ts })
            }
        }

        proptest! {
            #[test]
            fn length_is_sum_of_inputs(
                progress in proptest::collection::vec(arb_entry(), 0..20),
                system in proptest::collection::vec(arb_entry(), 0..20),
            ) {
                let merged = merge(&progress, &system, now());
                prop_assert_eq!(merged.len(), progress.len() + system.len());
            }

            #[test]
            fn order_is_non_increasing(
                progress in proptest::collection::vec(arb_entry(), 0..20),
                system in proptest::collection::vec(arb_entry(), 0..20),
            ) {
                let merged = merge(&progress, &system, now());
                for pair in merged.windows(2) {
                    prop_assert!(pair[0].occurred_at >= pair[1].occurred_at);
                }
            }
        }
    }
}
