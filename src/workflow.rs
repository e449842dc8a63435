//! Order lifecycle state machine.
//!
//! Status transitions, revision eligibility, and editor resolution used to
//! be re-derived at every call site; this module is the single source of
//! truth. Services apply an [`OrderEvent`] to the current [`OrderStatus`]
//! and persist whatever `next_status` returns; invalid pairs are rejected
//! instead of silently overwriting the row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
    Revision,
}

impl OrderStatus {
    pub fn parse(value: &str) -> Option<OrderStatus> {
        match value {
            "pending" => Some(OrderStatus::Pending),
            "processing" => Some(OrderStatus::Processing),
            "assigned" => Some(OrderStatus::Assigned),
            "in_progress" => Some(OrderStatus::InProgress),
            "completed" => Some(OrderStatus::Completed),
            "cancelled" => Some(OrderStatus::Cancelled),
            "revision" => Some(OrderStatus::Revision),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Assigned => "assigned",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Revision => "revision",
        }
    }

    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Assigned,
        OrderStatus::InProgress,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
        OrderStatus::Revision,
    ];
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that happened to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEvent {
    /// Order-level editor assignment changed. `assigned` is false when the
    /// editor was removed.
    EditorAssigned { assigned: bool },
    /// An editor delivered an image for one of the order's items.
    /// `fulfills_revision` is true when a pending revision was resolved by
    /// the delivery.
    EditedImageUploaded { fulfills_revision: bool },
    /// The customer asked for a redo on a delivered item.
    RevisionRequested,
    /// Staff cancelled the order.
    OrderCancelled,
}

impl OrderEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OrderEvent::EditorAssigned { .. } => "editor_assigned",
            OrderEvent::EditedImageUploaded { .. } => "edited_image_uploaded",
            OrderEvent::RevisionRequested => "revision_requested",
            OrderEvent::OrderCancelled => "order_cancelled",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("event {event} is not valid while the order is {status}")]
    Invalid {
        status: OrderStatus,
        event: &'static str,
    },
}

/// The transition table. Returns the status to persist, or an error when the
/// event makes no sense in the current state.
pub fn next_status(
    current: OrderStatus,
    event: OrderEvent,
) -> Result<OrderStatus, TransitionError> {
    use OrderStatus::*;

    let invalid = || TransitionError::Invalid {
        status: current,
        event: event.name(),
    };

    match event {
        OrderEvent::EditorAssigned { assigned } => match current {
            Pending | Processing | Assigned | InProgress => {
                Ok(if assigned { InProgress } else { Pending })
            }
            Completed | Cancelled | Revision => Err(invalid()),
        },
        OrderEvent::EditedImageUploaded { fulfills_revision } => {
            if fulfills_revision {
                match current {
                    Revision | Completed => Ok(Completed),
                    _ => Err(invalid()),
                }
            } else {
                match current {
                    Processing | Assigned | InProgress => Ok(Completed),
                    _ => Err(invalid()),
                }
            }
        }
        OrderEvent::RevisionRequested => match current {
            Completed => Ok(Revision),
            _ => Err(invalid()),
        },
        OrderEvent::OrderCancelled => match current {
            Cancelled => Err(invalid()),
            _ => Ok(Cancelled),
        },
    }
}

/// Editor actually responsible for an item: item-level assignment wins,
/// order-level assignment is the fallback.
pub fn effective_editor(
    item_assigned: Option<Uuid>,
    order_assigned: Option<Uuid>,
) -> Option<Uuid> {
    item_assigned.or(order_assigned)
}

/// A customer may request a revision on an item only after delivery, and
/// only while no other revision on that item is still open.
pub fn revision_eligible(
    order_status: OrderStatus,
    edited_image_count: usize,
    has_pending_revision: bool,
) -> bool {
    order_status == OrderStatus::Completed && edited_image_count > 0 && !has_pending_revision
}

pub const REVISION_PENDING: &str = "pending";
pub const REVISION_COMPLETED: &str = "completed";

/// A revision as far as the tie-break rule cares: identity, open/closed,
/// and when it was requested.
pub trait PendingCandidate {
    fn is_pending(&self) -> bool;
    fn requested_at(&self) -> DateTime<Utc>;
}

impl PendingCandidate for crate::models::Revision {
    fn is_pending(&self) -> bool {
        self.status == REVISION_PENDING
    }
    fn requested_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Tie-break rule for an editor delivering while revisions are open: the
/// most recently requested pending revision is the one being fulfilled.
/// Older pending revisions are left untouched.
pub fn latest_pending<R: PendingCandidate>(revisions: &[R]) -> Option<&R> {
    revisions
        .iter()
        .filter(|r| r.is_pending())
        .max_by_key(|r| r.requested_at())
}
