// storefront/src/fulfillment/delivery_state.rs

//! The delivery state machine.
//!
//! Every legal move is a [`Transition`]; [`Transition::permits`] is the one
//! table deciding which moves an order's current state allows. [`apply`]
//! either mutates the order and appends exactly one audit entry, or returns
//! an error and leaves the order untouched.
//!
//! ```text
//! PAID -> REVIEWING -> MAKING -> READY_FOR_DELIVERY -> CONFIRMED -> DELIVERED
//! schedule:  PAID | REVIEWING | MAKING -> READY_FOR_DELIVERY
//! deliver:   READY_FOR_DELIVERY | CONFIRMED -> DELIVERED
//! cancel:    any non-terminal -> CANCELLED
//! ```

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::errors::AppError;
use crate::models::{ActorRole, DeliveryStatus, NotificationKind, Order, ReschedulingStatus, StatusEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
  /// Admin picks up a paid order.
  BeginReview,
  /// Admin starts production of a reviewed order.
  StartProduction,
  ScheduleDelivery { date: Option<DateTime<Utc>> },
  /// Customer confirms the scheduled date.
  ConfirmDelivery,
  /// Customer accepts the delivery without confirming first.
  AcceptDelivery,
  MarkDelivered,
  /// Allowed from READY_FOR_DELIVERY or CONFIRMED whenever no request is
  /// pending, so a customer may ask again after an approval or rejection.
  RequestReschedule { reason: String },
  ApproveReschedule { new_date: Option<DateTime<Utc>> },
  RejectReschedule,
  Cancel { reason: Option<String> },
}

/// What a transition moves: the delivery status or the rescheduling sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionTarget {
  Delivery(DeliveryStatus),
  Rescheduling(ReschedulingStatus),
}

impl fmt::Display for TransitionTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TransitionTarget::Delivery(status) => write!(f, "{}", status),
      TransitionTarget::Rescheduling(status) => write!(f, "RESCHEDULE_{}", status),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
  #[error("cannot move order from {from} to {to}")]
  Invalid {
    from: DeliveryStatus,
    to: TransitionTarget,
  },

  #[error("'{field}' is required for this transition")]
  Validation { field: &'static str },
}

impl From<TransitionError> for AppError {
  fn from(err: TransitionError) -> Self {
    match err {
      TransitionError::Invalid { from, to } => AppError::InvalidTransition {
        from: from.to_string(),
        to: to.to_string(),
      },
      TransitionError::Validation { field } => AppError::validation(field, err.to_string()),
    }
  }
}

impl Transition {
  /// Maps the admin "advance" intent onto the transition reaching `to_status`.
  pub fn advance_to(to_status: DeliveryStatus) -> Result<Self, TransitionError> {
    match to_status {
      DeliveryStatus::Reviewing => Ok(Transition::BeginReview),
      DeliveryStatus::Making => Ok(Transition::StartProduction),
      DeliveryStatus::Delivered => Ok(Transition::MarkDelivered),
      DeliveryStatus::Cancelled => Ok(Transition::Cancel { reason: None }),
      _ => Err(TransitionError::Validation { field: "toStatus" }),
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      Transition::BeginReview => "begin_review",
      Transition::StartProduction => "start_production",
      Transition::ScheduleDelivery { .. } => "schedule_delivery",
      Transition::ConfirmDelivery => "confirm_delivery",
      Transition::AcceptDelivery => "accept_delivery",
      Transition::MarkDelivered => "mark_delivered",
      Transition::RequestReschedule { .. } => "request_reschedule",
      Transition::ApproveReschedule { .. } => "approve_reschedule",
      Transition::RejectReschedule => "reject_reschedule",
      Transition::Cancel { .. } => "cancel",
    }
  }

  /// The role allowed to trigger this transition.
  pub fn actor(&self) -> ActorRole {
    match self {
      Transition::ConfirmDelivery | Transition::AcceptDelivery | Transition::RequestReschedule { .. } => {
        ActorRole::Customer
      }
      _ => ActorRole::Admin,
    }
  }

  pub fn target(&self) -> TransitionTarget {
    use TransitionTarget::{Delivery, Rescheduling};
    match self {
      Transition::BeginReview => Delivery(DeliveryStatus::Reviewing),
      Transition::StartProduction => Delivery(DeliveryStatus::Making),
      Transition::ScheduleDelivery { .. } => Delivery(DeliveryStatus::ReadyForDelivery),
      Transition::ConfirmDelivery => Delivery(DeliveryStatus::Confirmed),
      Transition::AcceptDelivery | Transition::MarkDelivered => Delivery(DeliveryStatus::Delivered),
      Transition::RequestReschedule { .. } => Rescheduling(ReschedulingStatus::Requested),
      Transition::ApproveReschedule { .. } => Rescheduling(ReschedulingStatus::Approved),
      Transition::RejectReschedule => Rescheduling(ReschedulingStatus::Rejected),
      Transition::Cancel { .. } => Delivery(DeliveryStatus::Cancelled),
    }
  }

  pub fn notification_kind(&self) -> NotificationKind {
    match self {
      Transition::ScheduleDelivery { .. } => NotificationKind::DeliveryScheduled,
      Transition::ConfirmDelivery => NotificationKind::DeliveryConfirmed,
      Transition::RequestReschedule { .. } => NotificationKind::RescheduleRequested,
      Transition::ApproveReschedule { .. } => NotificationKind::RescheduleApproved,
      Transition::RejectReschedule => NotificationKind::RescheduleRejected,
      _ => NotificationKind::StatusChanged,
    }
  }

  /// The transition table.
  pub fn permits(&self, order: &Order) -> bool {
    use DeliveryStatus::*;
    let status = order.delivery_status;
    match self {
      Transition::BeginReview => status == Paid,
      Transition::StartProduction => status == Reviewing,
      Transition::ScheduleDelivery { .. } => matches!(status, Paid | Reviewing | Making),
      Transition::ConfirmDelivery => status == ReadyForDelivery && order.delivery_date.is_some(),
      Transition::AcceptDelivery => status == ReadyForDelivery,
      Transition::MarkDelivered => matches!(status, ReadyForDelivery | Confirmed),
      Transition::RequestReschedule { .. } => {
        matches!(status, ReadyForDelivery | Confirmed) && order.rescheduling_status != ReschedulingStatus::Requested
      }
      Transition::ApproveReschedule { .. } => {
        order.rescheduling_status == ReschedulingStatus::Requested && !status.is_terminal()
      }
      Transition::RejectReschedule => order.rescheduling_status == ReschedulingStatus::Requested,
      Transition::Cancel { .. } => !status.is_terminal(),
    }
  }

  fn check_inputs(&self) -> Result<(), TransitionError> {
    match self {
      Transition::ScheduleDelivery { date: None } => Err(TransitionError::Validation { field: "deliveryDate" }),
      Transition::ApproveReschedule { new_date: None } => Err(TransitionError::Validation { field: "newDate" }),
      Transition::RequestReschedule { reason } if reason.trim().is_empty() => {
        Err(TransitionError::Validation { field: "reason" })
      }
      _ => Ok(()),
    }
  }
}

fn format_date(date: DateTime<Utc>) -> String {
  date.format("%Y-%m-%d").to_string()
}

/// Validates `transition` against `order` and applies it.
///
/// On success the order's state fields change and one [`StatusEntry`] is
/// appended, stamped with `now` and the transition's actor. On failure the
/// order is not modified.
pub fn apply(order: &mut Order, transition: &Transition, now: DateTime<Utc>) -> Result<(), TransitionError> {
  if !transition.permits(order) {
    return Err(TransitionError::Invalid {
      from: order.delivery_status,
      to: transition.target(),
    });
  }
  transition.check_inputs()?;

  let notes = match transition {
    Transition::BeginReview => {
      order.delivery_status = DeliveryStatus::Reviewing;
      "Order is being reviewed".to_string()
    }
    Transition::StartProduction => {
      order.delivery_status = DeliveryStatus::Making;
      "Production started".to_string()
    }
    Transition::ScheduleDelivery { date } => {
      order.delivery_status = DeliveryStatus::ReadyForDelivery;
      order.delivery_date = *date;
      order.delivery_confirmed = false;
      order.rescheduling_status = ReschedulingStatus::None;
      order.rescheduling_reason = None;
      match date {
        Some(d) => format!("Delivery scheduled for {}", format_date(*d)),
        None => "Delivery scheduled".to_string(),
      }
    }
    Transition::ConfirmDelivery => {
      order.delivery_status = DeliveryStatus::Confirmed;
      order.delivery_confirmed = true;
      "Customer confirmed the delivery date".to_string()
    }
    Transition::AcceptDelivery => {
      order.delivery_status = DeliveryStatus::Delivered;
      order.delivery_confirmed = true;
      "Customer accepted the delivery".to_string()
    }
    Transition::MarkDelivered => {
      order.delivery_status = DeliveryStatus::Delivered;
      order.delivery_confirmed = true;
      "Order marked as delivered".to_string()
    }
    Transition::RequestReschedule { reason } => {
      let reason = reason.trim().to_string();
      order.rescheduling_status = ReschedulingStatus::Requested;
      let notes = format!("Reschedule requested: {}", reason);
      order.rescheduling_reason = Some(reason);
      notes
    }
    Transition::ApproveReschedule { new_date } => {
      order.delivery_status = DeliveryStatus::ReadyForDelivery;
      order.delivery_date = *new_date;
      order.delivery_confirmed = false;
      order.rescheduling_status = ReschedulingStatus::Approved;
      match new_date {
        Some(d) => format!("Reschedule approved, new delivery date {}", format_date(*d)),
        None => "Reschedule approved".to_string(),
      }
    }
    Transition::RejectReschedule => {
      order.rescheduling_status = ReschedulingStatus::Rejected;
      "Reschedule request rejected".to_string()
    }
    Transition::Cancel { reason } => {
      order.delivery_status = DeliveryStatus::Cancelled;
      order.delivery_confirmed = false;
      match reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) => format!("Order cancelled: {}", r),
        None => "Order cancelled".to_string(),
      }
    }
  };

  order.status_history.push(StatusEntry {
    status: order.delivery_status,
    changed_by: transition.actor(),
    changed_at: now,
    notes,
  });
  order.updated_at = now;
  Ok(())
}
