#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod api;
pub mod capabilities;
pub mod catalog;
pub mod event;
pub mod model;
pub mod normalize;
pub mod raw;
pub mod sla;
pub mod workflow;
pub mod worklog;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use event::Event;
pub use model::Model;

pub const DEFAULT_API_BASE: &str = "https://layanan-tik.go.id";

/// Inside this window an unresolved ticket is critical.
pub const SLA_CRITICAL_WINDOW_HOURS: i64 = 24;
/// Tighter color band inside the critical window.
pub const SLA_WARNING_WINDOW_HOURS: i64 = 12;

/// Stage value that makes an open ticket behave as assigned.
pub const STAGE_TRIAGE: &str = "triase";
/// Stage every started ticket moves into.
pub const STAGE_EXECUTION: &str = "execution";

pub const ACTOR_SYSTEM: &str = "Sistem";
pub const ACTOR_TECHNICIAN_FALLBACK: &str = "Teknisi";
/// Guest reporter fallback: guests are always looking at their own ticket.
pub const REPORTER_SELF: &str = "Anda";
pub const FIELD_PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    Authentication,
    Authorization,
    Validation,
    NotFound,
    Conflict,
    RateLimited,
    Serialization,
    Deserialization,
    FeatureUnavailable,
    InvalidState,
    Internal,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Authentication => "AUTH_ERROR",
            Self::Authorization => "FORBIDDEN",
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::RateLimited => "RATE_LIMITED",
            Self::Serialization => "SERIALIZATION_ERROR",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::FeatureUnavailable => "FEATURE_UNAVAILABLE",
            Self::InvalidState => "INVALID_STATE",
            Self::Internal => "INTERNAL_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network | Self::Timeout | Self::Conflict | Self::RateLimited => {
                ErrorSeverity::Transient
            }
            Self::Serialization | Self::Deserialization | Self::InvalidState | Self::Internal => {
                ErrorSeverity::Fatal
            }
            Self::Authentication
            | Self::Authorization
            | Self::Validation
            | Self::NotFound
            | Self::FeatureUnavailable
            | Self::Unknown => ErrorSeverity::Permanent,
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::Conflict | Self::RateLimited
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable() && !matches!(self.severity, ErrorSeverity::Fatal)
    }

    /// Single non-technical message shown to the user. Raw server text is
    /// never required here; when the backend sent a human message it is
    /// already in `self.message` for the kinds that surface it.
    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Network => {
                "Tidak dapat terhubung. Periksa koneksi internet Anda lalu coba lagi.".into()
            }
            ErrorKind::Timeout => "Permintaan melebihi batas waktu. Silakan coba lagi.".into(),
            ErrorKind::Authentication => "Sesi Anda telah berakhir. Silakan masuk kembali.".into(),
            ErrorKind::Authorization => "Anda tidak memiliki akses untuk tindakan ini.".into(),
            ErrorKind::Validation | ErrorKind::FeatureUnavailable => self.message.clone(),
            ErrorKind::NotFound => "Tiket tidak ditemukan.".into(),
            ErrorKind::Conflict => "Data berubah di server. Muat ulang lalu coba lagi.".into(),
            ErrorKind::RateLimited => {
                "Terlalu banyak permintaan. Tunggu sebentar lalu coba lagi.".into()
            }
            ErrorKind::Serialization | ErrorKind::Deserialization => {
                "Terjadi kesalahan data. Hubungi admin bila berlanjut.".into()
            }
            ErrorKind::InvalidState => {
                "Aplikasi dalam keadaan tidak valid. Silakan muat ulang.".into()
            }
            ErrorKind::Internal | ErrorKind::Unknown => {
                "Terjadi kesalahan tak terduga. Silakan coba lagi.".into()
            }
        }
    }

    /// Maps a non-success backend response. The server's message string is
    /// used when present, but callers still render `user_facing_message`.
    #[must_use]
    pub fn from_status(status: u16, server_message: Option<String>) -> Self {
        let kind = match status {
            400 | 422 => ErrorKind::Validation,
            401 => ErrorKind::Authentication,
            403 => ErrorKind::Authorization,
            404 => ErrorKind::NotFound,
            408 => ErrorKind::Timeout,
            409 => ErrorKind::Conflict,
            429 => ErrorKind::RateLimited,
            500..=599 => ErrorKind::Internal,
            _ => ErrorKind::Unknown,
        };

        let message = server_message.unwrap_or_else(|| format!("HTTP {status}"));
        Self::new(kind, message).with_context("http_status", status.to_string())
    }

    /// Transport failures (DNS, socket, TLS, timeout) before any status code
    /// exists. Never retried here; the shell owns retry policy.
    #[must_use]
    pub fn from_transport(error: &crux_http::Error) -> Self {
        Self::new(ErrorKind::Network, "Gangguan jaringan").with_internal(error.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<normalize::NormalizeError> for AppError {
    fn from(e: normalize::NormalizeError) -> Self {
        // Whatever went missing, the screen-level outcome is the same:
        // the ticket cannot be shown.
        Self::new(ErrorKind::NotFound, "Tiket tidak ditemukan").with_internal(e.to_string())
    }
}

impl From<workflow::WorkflowError> for AppError {
    fn from(e: workflow::WorkflowError) -> Self {
        let kind = match e {
            workflow::WorkflowError::NotImplemented { .. } => ErrorKind::FeatureUnavailable,
            workflow::WorkflowError::TransitionNotAllowed { .. }
            | workflow::WorkflowError::DescriptionRequired { .. } => ErrorKind::Validation,
        };
        let message = match &e {
            workflow::WorkflowError::NotImplemented { .. } => "Fitur ini belum tersedia",
            workflow::WorkflowError::TransitionNotAllowed { .. } => {
                "Tindakan ini tidak tersedia untuk status tiket saat ini"
            }
            workflow::WorkflowError::DescriptionRequired { .. } => "Deskripsi wajib diisi",
        };
        Self::new(kind, message).with_internal(e.to_string())
    }
}

impl From<catalog::CatalogError> for AppError {
    fn from(e: catalog::CatalogError) -> Self {
        match &e {
            catalog::CatalogError::AssetRequired => {
                Self::new(ErrorKind::Validation, "Pilih aset terlebih dahulu")
            }
            catalog::CatalogError::IncompleteSelection => {
                Self::new(ErrorKind::Validation, "Lengkapi pilihan layanan terlebih dahulu")
            }
            catalog::CatalogError::EmptyTree => {
                Self::new(ErrorKind::Deserialization, "Katalog layanan tidak tersedia")
            }
            catalog::CatalogError::UnknownNode { .. } | catalog::CatalogError::InvalidDepth(_) => {
                Self::new(ErrorKind::InvalidState, "Pilihan katalog tidak valid")
            }
        }
        .with_internal(e.to_string())
    }
}

impl From<event::ValidationError> for AppError {
    fn from(e: event::ValidationError) -> Self {
        let message = match e {
            event::ValidationError::Empty => "Isian tidak boleh kosong".to_string(),
            event::ValidationError::TooLong { max, .. } => {
                format!("Isian terlalu panjang (maksimal {max} karakter)")
            }
        };
        Self::new(ErrorKind::Validation, message)
    }
}

/// Relative time for list rows and activity entries.
#[must_use]
pub fn format_relative_time(from: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now - from;
    let seconds = delta.num_seconds();

    if seconds < 0 {
        // Clock skew between device and server; don't show negative ages.
        return "Baru saja".into();
    }
    if seconds < 60 {
        return "Baru saja".into();
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes}m lalu");
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}j lalu");
    }

    let days = hours / 24;
    if days < 7 {
        return format!("{days}h lalu");
    }
    if days < 30 {
        return format!("{}mgg lalu", days / 7);
    }
    if days < 365 {
        return format!("{}bln lalu", days / 30);
    }

    format!("{}thn lalu", days / 365)
}

// --- View types ---

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserFacingError {
    pub message: String,
    pub error_code: String,
    pub is_retryable: bool,
}

impl From<&AppError> for UserFacingError {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            error_code: e.code().to_string(),
            is_retryable: e.is_retryable(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TicketListItem {
    pub id: String,
    pub ticket_number: String,
    pub kind: model::TicketKind,
    pub title: String,
    pub status: model::TicketStatus,
    pub status_label: String,
    pub priority: model::Priority,
    pub priority_label: String,
    pub urgency: Option<model::UrgencyTier>,
    pub sla_text: Option<String>,
    pub created_ago: String,
    pub is_urgent: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActivityEntryView {
    pub id: String,
    pub actor_name: String,
    pub text: String,
    pub occurred_ago: String,
    pub source: model::LogSource,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActionView {
    pub action: workflow::TechnicianAction,
    pub label: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TicketDetailView {
    pub id: String,
    pub ticket_number: String,
    pub kind: model::TicketKind,
    pub kind_label: String,
    pub title: String,
    pub description: String,
    pub status: model::TicketStatus,
    pub status_label: String,
    pub stage: Option<String>,
    pub priority_label: String,
    pub reporter_name: String,
    pub location: String,
    pub created_ago: String,
    pub sla: Option<model::SlaStatus>,
    pub activity: Vec<ActivityEntryView>,
    pub actions: Vec<ActionView>,
    pub is_read_only: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CatalogOptionView {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ComposeView {
    pub level1_options: Vec<CatalogOptionView>,
    pub level2_options: Vec<CatalogOptionView>,
    pub level3_options: Vec<CatalogOptionView>,
    pub selected_service_name: Option<String>,
    pub needs_asset: bool,
    pub selected_asset: Option<String>,
    pub title: String,
    pub description: String,
    pub is_loading_catalog: bool,
    pub can_submit: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub viewer: model::Viewer,
    pub is_loading: bool,
    pub is_submitting: bool,
    pub tickets: Vec<TicketListItem>,
    pub urgent_count: usize,
    pub detail: Option<TicketDetailView>,
    pub compose: Option<ComposeView>,
    pub error: Option<UserFacingError>,
    pub toast: Option<String>,
}

pub mod app {
    use super::*;
    use crate::api::{self, ApiResult, CreateRequestPayload, ProgressUpdatePayload};
    use crate::catalog::CatalogTree;
    use crate::event::{Description, NoteText, TicketId, TitleText, UnitId};
    use crate::model::{ComposeState, Ticket, TicketKind, Viewer};
    use serde_json::Value;

    #[derive(Default)]
    pub struct App;

    impl App {
        fn parse_response(result: ApiResult) -> Result<Value, AppError> {
            match result {
                Ok(response) if response.is_success() => Ok(response.body),
                Ok(response) => {
                    Err(AppError::from_status(response.status, response.server_message()))
                }
                Err(error) => Err(AppError::from_transport(&error)),
            }
        }

        fn send_list_request(model: &Model, caps: &Capabilities, kind: TicketKind) {
            let url = api::list_url(&model.api_base, kind);
            tracing::debug!(%url, "fetching ticket list");

            let mut builder = caps.http.get(url);
            if let Some(token) = &model.auth_token {
                builder = builder.header("Authorization", format!("Bearer {}", token.expose()).as_str());
            }
            builder
                .expect_json::<Value>()
                .send(move |result| Event::TicketListFetched {
                    kind,
                    result: api::into_result(result),
                });
        }

        fn send_detail_request(
            model: &Model,
            caps: &Capabilities,
            kind: TicketKind,
            id: &TicketId,
        ) {
            let url = api::detail_url(&model.api_base, kind, id.as_str());
            tracing::debug!(%url, "fetching ticket detail");

            let mut builder = caps.http.get(url);
            if let Some(token) = &model.auth_token {
                builder = builder.header("Authorization", format!("Bearer {}", token.expose()).as_str());
            }
            builder
                .expect_json::<Value>()
                .send(move |result| Event::TicketDetailFetched {
                    kind,
                    result: api::into_result(result),
                });
        }

        fn send_guest_track_request(model: &Model, caps: &Capabilities, ticket_number: String) {
            let url = api::guest_track_url(&model.api_base, &ticket_number);
            tracing::debug!(%url, "fetching public tracking");

            caps.http
                .get(url)
                .expect_json::<Value>()
                .send(move |result| Event::GuestTrackFetched {
                    ticket_number,
                    result: api::into_result(result),
                });
        }

        fn send_progress_update(
            model: &Model,
            caps: &Capabilities,
            ticket: &Ticket,
            payload: &ProgressUpdatePayload,
        ) -> Result<(), AppError> {
            let kind = ticket.kind;
            let id = ticket.id.clone();
            let url = api::progress_url(&model.api_base, kind, id.as_str());
            tracing::debug!(%url, update_number = payload.update_number, "submitting progress update");

            let mut builder = caps.http.post(url);
            if let Some(token) = &model.auth_token {
                builder = builder.header("Authorization", format!("Bearer {}", token.expose()).as_str());
            }
            builder
                .body_json(payload)
                .map_err(|e| {
                    AppError::new(ErrorKind::Serialization, "Gagal menyiapkan permintaan")
                        .with_internal(e.to_string())
                })?
                .expect_json::<Value>()
                .send(move |result| Event::ActionSubmitted {
                    kind,
                    id,
                    result: api::into_result(result),
                });
            Ok(())
        }

        fn send_catalog_request(model: &Model, caps: &Capabilities, unit: &UnitId) {
            let url = api::catalog_url(&model.api_base, unit);
            tracing::debug!(%url, "fetching service catalog");

            let mut builder = caps.http.get(url);
            if let Some(token) = &model.auth_token {
                builder = builder.header("Authorization", format!("Bearer {}", token.expose()).as_str());
            }
            builder
                .expect_json::<Value>()
                .send(|result| Event::CatalogFetched { result: api::into_result(result) });
        }

        fn send_create_request(
            model: &Model,
            caps: &Capabilities,
            payload: &CreateRequestPayload,
        ) -> Result<(), AppError> {
            let url = api::create_url(&model.api_base, TicketKind::Request);
            tracing::debug!(%url, "submitting new service request");

            let mut builder = caps.http.post(url);
            if let Some(token) = &model.auth_token {
                builder = builder.header("Authorization", format!("Bearer {}", token.expose()).as_str());
            }
            builder
                .body_json(payload)
                .map_err(|e| {
                    AppError::new(ErrorKind::Serialization, "Gagal menyiapkan permintaan")
                        .with_internal(e.to_string())
                })?
                .expect_json::<Value>()
                .send(|result| Event::ComposeSubmitted { result: api::into_result(result) });
            Ok(())
        }

        fn build_create_payload(compose: &ComposeState) -> Result<CreateRequestPayload, AppError> {
            let title = TitleText::new(compose.title.clone())?;
            let description = Description::new(compose.description.clone())?;

            compose
                .selection
                .validate_submission(&compose.tree, compose.asset.as_ref())?;

            let service_item_id = compose
                .selection
                .service_item_id()
                .map(crate::event::ServiceItemId::new)
                .ok_or_else(|| {
                    AppError::new(ErrorKind::InvalidState, "Pilihan layanan belum lengkap")
                })?;

            Ok(CreateRequestPayload {
                title: title.into_inner(),
                description: description.into_inner(),
                service_item_id,
                asset_id: compose.asset.clone(),
            })
        }

        fn build_list_item(ticket: &Ticket, now: DateTime<Utc>) -> TicketListItem {
            let sla = sla::evaluate_ticket(ticket, now);
            TicketListItem {
                id: ticket.id.as_str().to_string(),
                ticket_number: ticket.ticket_number.clone(),
                kind: ticket.kind,
                title: ticket.title.clone(),
                status: ticket.status,
                status_label: ticket.status.display_name().to_string(),
                priority: ticket.priority,
                priority_label: ticket.priority.display_name().to_string(),
                urgency: sla.as_ref().map(|s| s.tier),
                sla_text: sla.map(|s| s.display_text),
                created_ago: format_relative_time(ticket.created_at, now),
                is_urgent: sla::is_urgent(ticket, now),
            }
        }

        fn build_detail(ticket: &Ticket, now: DateTime<Utc>) -> TicketDetailView {
            let activity = ticket
                .activity
                .iter()
                .map(|entry| ActivityEntryView {
                    id: entry.id.clone(),
                    actor_name: entry.actor_name.clone(),
                    text: entry.text.clone(),
                    occurred_ago: format_relative_time(entry.occurred_at, now),
                    source: entry.source,
                })
                .collect();

            let actions = workflow::available_actions(ticket)
                .into_iter()
                .map(|action| ActionView {
                    action,
                    label: action.display_name().to_string(),
                })
                .collect();

            TicketDetailView {
                id: ticket.id.as_str().to_string(),
                ticket_number: ticket.ticket_number.clone(),
                kind: ticket.kind,
                kind_label: ticket.kind.display_name().to_string(),
                title: ticket.title.clone(),
                description: ticket.description.clone(),
                status: ticket.status,
                status_label: ticket.status.display_name().to_string(),
                stage: ticket.stage.clone(),
                priority_label: ticket.priority.display_name().to_string(),
                reporter_name: ticket.reporter_name.clone(),
                location: ticket.location.clone(),
                created_ago: format_relative_time(ticket.created_at, now),
                sla: sla::evaluate_ticket(ticket, now),
                activity,
                actions,
                is_read_only: ticket.is_read_only(),
            }
        }

        fn build_compose_view(compose: &ComposeState) -> ComposeView {
            let as_options = |nodes: &[model::CatalogNode]| {
                nodes
                    .iter()
                    .map(|n| CatalogOptionView { id: n.id.clone(), name: n.name.clone() })
                    .collect::<Vec<_>>()
            };

            let can_submit = !compose.title.trim().is_empty()
                && !compose.description.trim().is_empty()
                && compose
                    .selection
                    .validate_submission(&compose.tree, compose.asset.as_ref())
                    .is_ok();

            ComposeView {
                level1_options: as_options(compose.tree.roots()),
                level2_options: as_options(compose.selection.level2_options(&compose.tree)),
                level3_options: as_options(compose.selection.level3_options(&compose.tree)),
                selected_service_name: compose
                    .selection
                    .resolved_detail(&compose.tree)
                    .map(|n| n.name.clone()),
                needs_asset: compose.selection.needs_asset(&compose.tree),
                selected_asset: compose.asset.as_ref().map(|a| a.as_str().to_string()),
                title: compose.title.clone(),
                description: compose.description.clone(),
                is_loading_catalog: compose.is_loading_catalog,
                can_submit,
            }
        }
    }

    impl crux_core::App for App {
        type Event = Event;
        type Model = Model;
        type ViewModel = ViewModel;
        type Capabilities = Capabilities;

        fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
            model.touch_now();
            tracing::debug!(event = event.name(), "update");

            match event {
                Event::SessionEstablished { viewer, token, api_base } => {
                    model.viewer = viewer;
                    model.auth_token = token;
                    if let Some(base) = api_base {
                        model.api_base = base.trim_end_matches('/').to_string();
                    }
                    model.tickets.clear();
                    model.selected = None;
                    model.compose = None;
                    model.active_error = None;
                    caps.render.render();
                }

                Event::SessionCleared => {
                    let api_base = model.api_base.clone();
                    *model = Model { api_base, ..Model::default() };
                    caps.render.render();
                }

                Event::TicketListRequested => {
                    if !model.viewer.is_staff() {
                        model.set_error(AppError::new(
                            ErrorKind::Authorization,
                            "Masuk terlebih dahulu untuk melihat daftar tiket",
                        ));
                        caps.render.render();
                        return;
                    }

                    model.is_loading = true;
                    Self::send_list_request(model, caps, TicketKind::Incident);
                    Self::send_list_request(model, caps, TicketKind::Request);
                    caps.render.render();
                }

                Event::TicketListFetched { kind, result } => {
                    model.is_loading = false;
                    let normalized = Self::parse_response(result).and_then(|body| {
                        normalize::normalize_list(&body, kind, model.viewer, model.now)
                            .map_err(AppError::from)
                    });

                    match normalized {
                        Ok(tickets) => model.replace_tickets_of_kind(kind, tickets),
                        Err(error) => model.set_error(error),
                    }
                    caps.render.render();
                }

                Event::TicketDetailRequested { kind, id } => {
                    model.is_loading = true;
                    Self::send_detail_request(model, caps, kind, &id);
                    caps.render.render();
                }

                Event::TicketDetailFetched { kind, result } => {
                    model.is_loading = false;
                    let normalized = Self::parse_response(result).and_then(|body| {
                        normalize::normalize(&body, kind, model.viewer, model.now)
                            .map_err(AppError::from)
                    });

                    match normalized {
                        Ok(ticket) => model.selected = Some(ticket),
                        Err(error) => {
                            model.selected = None;
                            model.set_error(error);
                        }
                    }
                    caps.render.render();
                }

                Event::TicketDismissed => {
                    model.selected = None;
                    caps.render.render();
                }

                Event::GuestTrackRequested { ticket_number } => {
                    model.is_loading = true;
                    Self::send_guest_track_request(model, caps, ticket_number);
                    caps.render.render();
                }

                Event::GuestTrackFetched { ticket_number, result } => {
                    model.is_loading = false;
                    let kind = TicketKind::infer_from_number(&ticket_number);
                    let normalized = Self::parse_response(result).and_then(|body| {
                        normalize::normalize(&body, kind, Viewer::Guest, model.now)
                            .map_err(AppError::from)
                    });

                    match normalized {
                        Ok(ticket) => model.selected = Some(ticket),
                        Err(error) => {
                            model.selected = None;
                            model.set_error(error);
                        }
                    }
                    caps.render.render();
                }

                Event::ActionRequested { action, note } => {
                    let Some(ticket) = model.selected.clone() else {
                        model.set_error(AppError::new(
                            ErrorKind::InvalidState,
                            "Tidak ada tiket yang sedang dibuka",
                        ));
                        caps.render.render();
                        return;
                    };

                    let submitted = NoteText::new(note)
                        .map_err(AppError::from)
                        .and_then(|note| {
                            workflow::build_payload(&ticket, action, note.as_str())
                                .map_err(AppError::from)
                        })
                        .and_then(|payload| {
                            Self::send_progress_update(model, caps, &ticket, &payload)
                        });

                    match submitted {
                        Ok(()) => model.is_submitting = true,
                        Err(error) => model.set_error(error),
                    }
                    caps.render.render();
                }

                Event::ActionSubmitted { kind, id, result } => {
                    model.is_submitting = false;
                    match Self::parse_response(result) {
                        Ok(_) => {
                            model.show_toast("Perubahan tersimpan");
                            // The server owns status, stage, and log order:
                            // re-fetch instead of mutating locally.
                            self.update(
                                Event::TicketDetailRequested { kind, id },
                                model,
                                caps,
                            );
                        }
                        Err(error) => {
                            model.set_error(error);
                            caps.render.render();
                        }
                    }
                }

                Event::ComposeStarted { unit } => {
                    if !model.viewer.is_staff() {
                        model.set_error(AppError::new(
                            ErrorKind::Authorization,
                            "Masuk terlebih dahulu untuk membuat tiket",
                        ));
                        caps.render.render();
                        return;
                    }

                    model.compose = Some(ComposeState {
                        unit: unit.clone(),
                        is_loading_catalog: true,
                        ..ComposeState::default()
                    });
                    Self::send_catalog_request(model, caps, &unit);
                    caps.render.render();
                }

                Event::CatalogFetched { result } => {
                    if model.compose.is_none() {
                        // The composition flow was abandoned while the fetch
                        // was in flight; drop the late result.
                        return;
                    }

                    let parsed = Self::parse_response(result)
                        .and_then(|body| CatalogTree::parse(&body).map_err(AppError::from));

                    match parsed {
                        Ok(tree) => {
                            if let Some(compose) = model.compose.as_mut() {
                                compose.tree = tree;
                                compose.is_loading_catalog = false;
                            }
                        }
                        Err(error) => {
                            if let Some(compose) = model.compose.as_mut() {
                                compose.is_loading_catalog = false;
                            }
                            model.set_error(error);
                        }
                    }
                    caps.render.render();
                }

                Event::CatalogLevelSelected { depth, id } => {
                    let outcome = match model.compose.as_mut() {
                        Some(compose) => {
                            let selected =
                                compose.selection.select_index(&compose.tree, depth, &id);
                            if selected.is_ok() {
                                // Any re-selection invalidates the asset
                                // choice along with the deeper levels.
                                compose.asset = None;
                            }
                            selected
                        }
                        None => Ok(()),
                    };

                    if let Err(error) = outcome {
                        model.set_error(error.into());
                    }
                    caps.render.render();
                }

                Event::AssetSelected { id } => {
                    if let Some(compose) = model.compose.as_mut() {
                        compose.asset = Some(id);
                    }
                    caps.render.render();
                }

                Event::AssetCleared => {
                    if let Some(compose) = model.compose.as_mut() {
                        compose.asset = None;
                    }
                    caps.render.render();
                }

                Event::ComposeDraftChanged { title, description } => {
                    if let Some(compose) = model.compose.as_mut() {
                        compose.title = title;
                        compose.description = description;
                    }
                    caps.render.render();
                }

                Event::ComposeSubmitRequested => {
                    let built = match model.compose.as_ref() {
                        Some(compose) => Self::build_create_payload(compose),
                        None => Err(AppError::new(
                            ErrorKind::InvalidState,
                            "Tidak ada formulir yang sedang diisi",
                        )),
                    };

                    match built.and_then(|payload| {
                        Self::send_create_request(model, caps, &payload)
                    }) {
                        Ok(()) => model.is_submitting = true,
                        Err(error) => model.set_error(error),
                    }
                    caps.render.render();
                }

                Event::ComposeSubmitted { result } => {
                    model.is_submitting = false;
                    match Self::parse_response(result) {
                        Ok(_) => {
                            // Flow complete: the catalog tree and selection
                            // are session-scoped and die with it.
                            model.compose = None;
                            model.show_toast("Tiket berhasil dibuat");
                            caps.render.render();
                            if model.viewer.is_staff() {
                                self.update(Event::TicketListRequested, model, caps);
                            }
                        }
                        Err(error) => {
                            model.set_error(error);
                            caps.render.render();
                        }
                    }
                }

                Event::ComposeAbandoned => {
                    model.compose = None;
                    caps.render.render();
                }

                Event::ErrorDismissed => {
                    model.active_error = None;
                    caps.render.render();
                }

                Event::ToastDismissed => {
                    model.active_toast = None;
                    caps.render.render();
                }
            }
        }

        fn view(&self, model: &Model) -> ViewModel {
            let now = model.now;

            let tickets = model
                .tickets
                .iter()
                .map(|ticket| Self::build_list_item(ticket, now))
                .collect::<Vec<_>>();

            let urgent_count = model
                .tickets
                .iter()
                .filter(|ticket| sla::is_urgent(ticket, now))
                .count();

            ViewModel {
                viewer: model.viewer,
                is_loading: model.is_loading,
                is_submitting: model.is_submitting,
                tickets,
                urgent_count,
                detail: model.selected.as_ref().map(|t| Self::build_detail(t, now)),
                compose: model.compose.as_ref().map(Self::build_compose_view),
                error: model.active_error.as_ref().map(UserFacingError::from),
                toast: model.active_toast.clone(),
            }
        }
    }
}
