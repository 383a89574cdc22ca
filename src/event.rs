use serde::{Deserialize, Serialize};
use std::fmt;

use crate::api::ApiResult;
use crate::model::{TicketKind, Viewer};
use crate::workflow::TechnicianAction;

// --- Secret wrapper: redacts Debug, best-effort wipe on Drop ---

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for AuthToken {
    fn drop(&mut self) {
        // Best-effort wipe; the shell's keystore owns the durable copy.
        let len = self.0.len();
        self.0.clear();
        self.0.push_str(&"\0".repeat(len));
    }
}

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, Default)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(TicketId);
typed_id!(AssetId);
typed_id!(ServiceItemId);
typed_id!(UnitId);

// --- Bounded input text ---

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("value too long ({len} > {max})")]
    TooLong { len: usize, max: usize },
    #[error("value must not be empty")]
    Empty,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BoundedText<const MAX: usize>(String);

impl<const MAX: usize> BoundedText<MAX> {
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        if s.trim().is_empty() {
            return Err(ValidationError::Empty);
        }
        if s.len() > MAX {
            return Err(ValidationError::TooLong { len: s.len(), max: MAX });
        }
        Ok(Self(s))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Free-text progress note or resolution description.
pub type NoteText = BoundedText<2000>;
/// Ticket title when composing a new request.
pub type TitleText = BoundedText<200>;
/// Ticket description when composing a new request.
pub type Description = BoundedText<4096>;

// --- Event enum ---

#[derive(Debug, Serialize, Deserialize)]
pub enum Event {
    // Session boundary (auth itself lives in the shell)
    SessionEstablished {
        viewer: Viewer,
        token: Option<AuthToken>,
        api_base: Option<String>,
    },
    SessionCleared,

    // Ticket list
    TicketListRequested,
    #[serde(skip)]
    TicketListFetched {
        kind: TicketKind,
        result: ApiResult,
    },

    // Ticket detail
    TicketDetailRequested {
        kind: TicketKind,
        id: TicketId,
    },
    #[serde(skip)]
    TicketDetailFetched {
        kind: TicketKind,
        result: ApiResult,
    },
    TicketDismissed,

    // Guest public tracking
    GuestTrackRequested {
        ticket_number: String,
    },
    #[serde(skip)]
    GuestTrackFetched {
        ticket_number: String,
        result: ApiResult,
    },

    // Technician workflow
    ActionRequested {
        action: TechnicianAction,
        note: String,
    },
    #[serde(skip)]
    ActionSubmitted {
        kind: TicketKind,
        id: TicketId,
        result: ApiResult,
    },

    // Service-request composition
    ComposeStarted {
        unit: UnitId,
    },
    #[serde(skip)]
    CatalogFetched {
        result: ApiResult,
    },
    CatalogLevelSelected {
        depth: u8,
        id: String,
    },
    AssetSelected {
        id: AssetId,
    },
    AssetCleared,
    ComposeDraftChanged {
        title: String,
        description: String,
    },
    ComposeSubmitRequested,
    #[serde(skip)]
    ComposeSubmitted {
        result: ApiResult,
    },
    ComposeAbandoned,

    // Surface management
    ErrorDismissed,
    ToastDismissed,
}

impl Event {
    /// Stable name for tracing.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SessionEstablished { .. } => "session_established",
            Self::SessionCleared => "session_cleared",
            Self::TicketListRequested => "ticket_list_requested",
            Self::TicketListFetched { .. } => "ticket_list_fetched",
            Self::TicketDetailRequested { .. } => "ticket_detail_requested",
            Self::TicketDetailFetched { .. } => "ticket_detail_fetched",
            Self::TicketDismissed => "ticket_dismissed",
            Self::GuestTrackRequested { .. } => "guest_track_requested",
            Self::GuestTrackFetched { .. } => "guest_track_fetched",
            Self::ActionRequested { .. } => "action_requested",
            Self::ActionSubmitted { .. } => "action_submitted",
            Self::ComposeStarted { .. } => "compose_started",
            Self::CatalogFetched { .. } => "catalog_fetched",
            Self::CatalogLevelSelected { .. } => "catalog_level_selected",
            Self::AssetSelected { .. } => "asset_selected",
            Self::AssetCleared => "asset_cleared",
            Self::ComposeDraftChanged { .. } => "compose_draft_changed",
            Self::ComposeSubmitRequested => "compose_submit_requested",
            Self::ComposeSubmitted { .. } => "compose_submitted",
            Self::ComposeAbandoned => "compose_abandoned",
            Self::ErrorDismissed => "error_dismissed",
            Self::ToastDismissed => "toast_dismissed",
        }
    }
}
