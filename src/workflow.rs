//! Technician workflow: which action a ticket currently offers and the
//! payload each action must carry.
//!
//! The table reads only the pre-derived [`TechnicianView`] tag, so the
//! open+triase special case never leaks in here. Transitions are one-way;
//! the server is the source of truth and every successful submission is
//! followed by a re-fetch, never a local mutation.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::api::ProgressUpdatePayload;
use crate::model::{TechnicianView, Ticket, TicketStatus};
use crate::STAGE_EXECUTION;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechnicianAction {
    /// `assigned` (or open+triase) → `in_progress`. Irreversible.
    StartWork,
    /// `in_progress` → `in_progress`: free-text note, repeatable.
    LogProgress,
    /// `in_progress` → `resolved`. Terminal for the technician.
    Resolve,
}

impl TechnicianAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StartWork => "start_work",
            Self::LogProgress => "log_progress",
            Self::Resolve => "resolve",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::StartWork => "Mulai Pengerjaan",
            Self::LogProgress => "Catat Progres",
            Self::Resolve => "Tandai Selesai",
        }
    }
}

impl fmt::Display for TechnicianAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("action {action:?} is not allowed while the ticket is {status:?}")]
    TransitionNotAllowed {
        action: TechnicianAction,
        status: TicketStatus,
    },
    #[error("a description is required for {action:?}")]
    DescriptionRequired { action: TechnicianAction },
    #[error("{feature} is not implemented")]
    NotImplemented { feature: &'static str },
}

/// The actions the detail screen may offer for this ticket, in display
/// order. Empty for tickets a technician cannot act on.
#[must_use]
pub fn available_actions(ticket: &Ticket) -> Vec<TechnicianAction> {
    match ticket.technician_view {
        TechnicianView::Ready => vec![TechnicianAction::StartWork],
        TechnicianView::Working => {
            vec![TechnicianAction::LogProgress, TechnicianAction::Resolve]
        }
        TechnicianView::Waiting | TechnicianView::Done => Vec::new(),
    }
}

/// Builds the outgoing progress-update payload for `action`.
///
/// The sequence number is derived from the activity list as last fetched;
/// two actors working the same ticket can race to the same number, which the
/// backend contract currently leaves unresolved.
pub fn build_payload(
    ticket: &Ticket,
    action: TechnicianAction,
    description: &str,
) -> Result<ProgressUpdatePayload, WorkflowError> {
    if !available_actions(ticket).contains(&action) {
        return Err(WorkflowError::TransitionNotAllowed {
            action,
            status: ticket.status,
        });
    }

    let description = description.trim();
    if description.is_empty() {
        return Err(WorkflowError::DescriptionRequired { action });
    }

    let update_number = ticket.next_update_number();
    let text = description.to_string();

    let payload = match action {
        TechnicianAction::StartWork => ProgressUpdatePayload {
            update_number,
            status_change: TicketStatus::InProgress.as_str().to_string(),
            stage_change: Some(STAGE_EXECUTION.to_string()),
            handling_description: text.clone(),
            notes: text,
            final_solution: None,
        },
        // Echo the current status and stage unchanged: a note never moves
        // the ticket.
        TechnicianAction::LogProgress => ProgressUpdatePayload {
            update_number,
            status_change: ticket.status.as_str().to_string(),
            stage_change: ticket.stage.clone(),
            handling_description: text.clone(),
            notes: text,
            final_solution: None,
        },
        TechnicianAction::Resolve => ProgressUpdatePayload {
            update_number,
            status_change: TicketStatus::Resolved.as_str().to_string(),
            stage_change: None,
            handling_description: text.clone(),
            notes: text.clone(),
            final_solution: Some(text),
        },
    };

    Ok(payload)
}

/// Re-opening is referenced by the UI as a future feature. It must fail
/// loudly rather than pretend to succeed.
pub fn reopen(_ticket: &Ticket) -> Result<(), WorkflowError> {
    Err(WorkflowError::NotImplemented { feature: "reopen" })
}
