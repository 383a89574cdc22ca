//! Backend endpoint families and outgoing wire payloads.
//!
//! The incident and request families expose the same operations under
//! different path roots; every path is derived from the ticket's kind so a
//! follow-up write can never hit the wrong family. The core only describes
//! requests; the shell owns the socket.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{AssetId, ServiceItemId, UnitId};
use crate::model::TicketKind;

/// A response body paired with its status code, after transport decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// The backend's human message, when it sent one.
    #[must_use]
    pub fn server_message(&self) -> Option<String> {
        crate::raw::first_nonempty_string(&self.body, &["message", "error"])
    }
}

pub type ApiResult = Result<ApiResponse, crux_http::Error>;

/// Collapses a crux_http response into [`ApiResult`] inside a `send`
/// callback.
#[must_use]
pub fn into_result(result: crux_http::Result<crux_http::Response<Value>>) -> ApiResult {
    result.map(|mut response| ApiResponse {
        status: response.status().into(),
        body: response.take_body().unwrap_or(Value::Null),
    })
}

const fn family_root(kind: TicketKind) -> &'static str {
    match kind {
        TicketKind::Incident => "/api/v1/incidents",
        TicketKind::Request => "/api/v1/requests",
    }
}

#[must_use]
pub fn list_url(base: &str, kind: TicketKind) -> String {
    format!("{base}{}", family_root(kind))
}

#[must_use]
pub fn detail_url(base: &str, kind: TicketKind, id: &str) -> String {
    format!("{base}{}/{id}", family_root(kind))
}

/// Progress updates post to the detail resource's `progress` collection.
#[must_use]
pub fn progress_url(base: &str, kind: TicketKind, id: &str) -> String {
    format!("{base}{}/{id}/progress", family_root(kind))
}

/// Public tracking is number-addressed and unauthenticated.
#[must_use]
pub fn guest_track_url(base: &str, ticket_number: &str) -> String {
    format!("{base}/api/v1/public/tickets/{ticket_number}")
}

/// The catalog tree is scoped to the requester's organizational unit.
#[must_use]
pub fn catalog_url(base: &str, unit: &UnitId) -> String {
    format!("{base}/api/v1/catalogs?unit_id={unit}")
}

#[must_use]
pub fn create_url(base: &str, kind: TicketKind) -> String {
    list_url(base, kind)
}

/// Outgoing progress-update body. `handling_description` and `notes` carry
/// the same text on purpose: the incident backend reads the former, the
/// request backend the latter. `stage_change` serializes as an explicit
/// `null`, while `final_solution` is omitted when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdatePayload {
    pub update_number: u32,
    pub status_change: String,
    pub stage_change: Option<String>,
    pub handling_description: String,
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_solution: Option<String>,
}

/// Outgoing service-request creation body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequestPayload {
    pub title: String,
    pub description: String,
    pub service_item_id: ServiceItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<AssetId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_family_follows_kind() {
        assert_eq!(
            detail_url("https://x", TicketKind::Incident, "7"),
            "https://x/api/v1/incidents/7"
        );
        assert_eq!(
            progress_url("https://x", TicketKind::Request, "7"),
            "https://x/api/v1/requests/7/progress"
        );
    }

    #[test]
    fn guest_tracking_is_number_addressed() {
        assert_eq!(
            guest_track_url("https://x", "INC-2025-0105"),
            "https://x/api/v1/public/tickets/INC-2025-0105"
        );
    }

    #[test]
    fn progress_payload_wire_shape() {
        let payload = ProgressUpdatePayload {
            update_number: 3,
            status_change: "in_progress".into(),
            stage_change: None,
            handling_description: "Cek unit".into(),
            notes: "Cek unit".into(),
            final_solution: None,
        };

        let wire = serde_json::to_value(&payload).unwrap();
        // stage_change must be an explicit null; final_solution must be
        // absent entirely.
        assert_eq!(
            wire,
            json!({
                "update_number": 3,
                "status_change": "in_progress",
                "stage_change": null,
                "handling_description": "Cek unit",
                "notes": "Cek unit"
            })
        );
    }

    #[test]
    fn resolve_payload_includes_final_solution() {
        let payload = ProgressUpdatePayload {
            update_number: 4,
            status_change: "resolved".into(),
            stage_change: None,
            handling_description: "Selesai".into(),
            notes: "Selesai".into(),
            final_solution: Some("Selesai".into()),
        };

        let wire = serde_json::to_value(&payload).unwrap();
        assert_eq!(wire["final_solution"], json!("Selesai"));
    }

    #[test]
    fn create_payload_omits_absent_asset() {
        let payload = CreateRequestPayload {
            title: "Butuh laptop".into(),
            description: "Untuk pegawai baru".into(),
            service_item_id: ServiceItemId::new("111"),
            asset_id: None,
        };

        let wire = serde_json::to_value(&payload).unwrap();
        assert!(wire.get("asset_id").is_none());
        assert_eq!(wire["service_item_id"], json!("111"));
    }

    #[test]
    fn server_message_probes_message_then_error() {
        let with_message = ApiResponse { status: 422, body: json!({ "message": "Nomor urut bentrok" }) };
        assert_eq!(with_message.server_message().as_deref(), Some("Nomor urut bentrok"));

        let with_error = ApiResponse { status: 500, body: json!({ "error": "boom" }) };
        assert_eq!(with_error.server_message().as_deref(), Some("boom"));

        let bare = ApiResponse { status: 204, body: Value::Null };
        assert_eq!(bare.server_message(), None);
    }
}
