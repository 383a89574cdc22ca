use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::{CatalogSelection, CatalogTree};
use crate::event::{AssetId, AuthToken, TicketId, UnitId};
use crate::{AppError, DEFAULT_API_BASE, STAGE_TRIAGE};

/// Who is looking at the app. Guests only ever hold a ticket number and the
/// public tracking endpoint; staff hold a session token and the full API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Viewer {
    #[default]
    Guest,
    Staff,
}

impl Viewer {
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Staff)
    }
}

/// The two backend ticket families. The kind decides which endpoint family
/// every follow-up read or write uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketKind {
    Incident,
    Request,
}

impl TicketKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Incident => "incident",
            Self::Request => "request",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Incident => "Insiden",
            Self::Request => "Permintaan Layanan",
        }
    }

    /// Best-effort kind from a ticket number prefix, for the public tracking
    /// flow where the payload carries no family marker. Guests cannot act on
    /// tickets, so this only affects display.
    #[must_use]
    pub fn infer_from_number(ticket_number: &str) -> Self {
        if ticket_number.to_uppercase().starts_with("REQ") {
            Self::Request
        } else {
            Self::Incident
        }
    }
}

impl fmt::Display for TicketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical ticket status. Backend strings are folded into these five at
/// normalization time; nothing downstream ever sees a raw status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    Assigned,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    /// Maps a backend status string to its canonical bucket.
    ///
    /// Pending/approval variants count as `Open`; anything that matches no
    /// bucket is `None` and the normalizer rejects the payload.
    #[must_use]
    pub fn from_raw(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "open" | "new" | "pending" | "pending_approval" | "menunggu" => Some(Self::Open),
            "assigned" | "dispatched" | "ditugaskan" => Some(Self::Assigned),
            "in_progress" | "inprogress" | "progress" | "on_progress" | "processing"
            | "dikerjakan" => Some(Self::InProgress),
            "resolved" | "completed" | "done" | "selesai" => Some(Self::Resolved),
            "closed" | "ditutup" => Some(Self::Closed),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Open => "Terbuka",
            Self::Assigned => "Ditugaskan",
            Self::InProgress => "Sedang Dikerjakan",
            Self::Resolved => "Selesai",
            Self::Closed => "Ditutup",
        }
    }

    /// Terminal for the technician workflow and excluded from urgency.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Case-insensitive mapping; `major` is the backend's word for high.
    /// Unknown and absent values are defaulted by the normalizer, not here.
    #[must_use]
    pub fn from_raw(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" | "rendah" | "minor" => Some(Self::Low),
            "medium" | "sedang" | "normal" => Some(Self::Medium),
            "high" | "major" | "tinggi" => Some(Self::High),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Low => "Rendah",
            Self::Medium => "Sedang",
            Self::High => "Tinggi",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// What the ticket means to a technician, derived once at normalization so
/// the workflow table never re-checks the open+triase combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechnicianView {
    /// Open and not yet routed to a technician. No action available.
    Waiting,
    /// Ready to start work: `assigned`, or `open` still in the triage stage.
    Ready,
    /// Work in progress: notes and resolution available.
    Working,
    /// Resolved or closed. Read-only.
    Done,
}

impl TechnicianView {
    #[must_use]
    pub fn derive(status: TicketStatus, stage: Option<&str>) -> Self {
        match status {
            TicketStatus::Assigned => Self::Ready,
            // Open tickets sitting in triage behave like assigned ones; this
            // is the one place the stage influences the workflow.
            TicketStatus::Open if stage.is_some_and(|s| s.eq_ignore_ascii_case(STAGE_TRIAGE)) => {
                Self::Ready
            }
            TicketStatus::Open => Self::Waiting,
            TicketStatus::InProgress => Self::Working,
            TicketStatus::Resolved | TicketStatus::Closed => Self::Done,
        }
    }
}

/// Where an activity entry came from. Kept for the UI badge only; ordering
/// never consults it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSource {
    Progress,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: String,
    pub occurred_at: DateTime<Utc>,
    pub actor_name: String,
    pub text: String,
    pub source: LogSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyTier {
    Safe,
    Warning,
    Critical,
}

/// Point-in-time SLA classification. Never stored; recomputed on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaStatus {
    /// Milliseconds until the deadline; negative once overdue.
    pub remaining_ms: i64,
    pub tier: UrgencyTier,
    pub display_text: String,
}

impl SlaStatus {
    #[must_use]
    pub const fn is_overdue(&self) -> bool {
        self.remaining_ms < 0
    }
}

/// One node of the three-level service catalog. Depth 0 is a catalog,
/// depth 1 a sub-service, depth 2 a detail-service leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogNode {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default, alias = "sub_services", alias = "detail_services")]
    pub children: Vec<CatalogNode>,
    /// Only meaningful on depth-2 leaves.
    #[serde(default, alias = "needAsset", alias = "requires_asset")]
    pub need_asset: bool,
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    // Catalog ids arrive as numbers on some deployments and strings on
    // others.
    let value = serde_json::Value::deserialize(deserializer)?;
    crate::raw::as_display_string(&value)
        .ok_or_else(|| serde::de::Error::custom("catalog node id must be a string or number"))
}

/// The unified ticket, whatever shape the backend sent it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub ticket_number: String,
    pub kind: TicketKind,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    /// Advisory free-text sub-state. Only the open+triase combination has
    /// workflow meaning, and that is folded into `technician_view`.
    pub stage: Option<String>,
    pub priority: Priority,
    pub sla_due_at: Option<DateTime<Utc>>,
    pub sla_breached: bool,
    pub reporter_name: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub technician_view: TechnicianView,
    /// Merged activity timeline, newest first.
    pub activity: Vec<ActivityLogEntry>,
}

impl Ticket {
    /// Sequence number the next outgoing progress update must carry: one
    /// greater than the activity entries fetched so far. Client-computed;
    /// concurrent editors can collide (accepted limitation).
    #[must_use]
    pub fn next_update_number(&self) -> u32 {
        u32::try_from(self.activity.len()).unwrap_or(u32::MAX).saturating_add(1)
    }

    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.status.is_terminal()
    }
}

/// State of the service-request composition flow. Created when the flow
/// starts, discarded wholesale when it completes or is abandoned.
#[derive(Debug, Clone, Default)]
pub struct ComposeState {
    pub unit: UnitId,
    pub tree: CatalogTree,
    pub selection: CatalogSelection,
    pub asset: Option<AssetId>,
    pub title: String,
    pub description: String,
    pub is_loading_catalog: bool,
}

#[derive(Debug)]
pub struct Model {
    pub api_base: String,
    pub viewer: Viewer,
    pub auth_token: Option<AuthToken>,
    pub tickets: Vec<Ticket>,
    pub selected: Option<Ticket>,
    pub compose: Option<ComposeState>,
    pub is_loading: bool,
    pub is_submitting: bool,
    /// Refreshed at the top of every `update`; SLA display is computed
    /// against this, never cached.
    pub now: DateTime<Utc>,
    pub active_error: Option<AppError>,
    pub active_toast: Option<String>,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            viewer: Viewer::default(),
            auth_token: None,
            tickets: Vec::new(),
            selected: None,
            compose: None,
            is_loading: false,
            is_submitting: false,
            now: Utc::now(),
            active_error: None,
            active_toast: None,
        }
    }
}

impl Model {
    pub fn touch_now(&mut self) {
        self.now = Utc::now();
    }

    pub fn set_error(&mut self, error: AppError) {
        tracing::warn!(code = error.code(), "surfacing error to user");
        self.active_error = Some(error);
    }

    pub fn show_toast(&mut self, message: impl Into<String>) {
        self.active_toast = Some(message.into());
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }

    /// Replaces the cached list entries of one kind, keeping the other
    /// family untouched; both families are fetched independently.
    pub fn replace_tickets_of_kind(&mut self, kind: TicketKind, mut fresh: Vec<Ticket>) {
        self.tickets.retain(|t| t.kind != kind);
        self.tickets.append(&mut fresh);
        self.tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
}
