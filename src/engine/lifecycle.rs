//! Booking lifecycle rules: the status transition table and party
//! authorization. Every mutation — including raw status updates — goes
//! through `validate_transition`; there is no direct status set anywhere.

use crate::model::{Actor, Booking, BookingStatus};

use super::EngineError;

impl BookingStatus {
    /// Statuses this one may move to. `Rescheduled` behaves like
    /// `Pending`: it must be re-confirmed (or cancelled, or moved again)
    /// before completion.
    pub fn allowed_transitions(&self) -> &'static [BookingStatus] {
        use BookingStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled, Rescheduled],
            Confirmed => &[Completed, Cancelled, Rescheduled],
            Rescheduled => &[Confirmed, Cancelled, Rescheduled],
            // Terminal — nothing leaves these.
            Completed => &[],
            Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Whether a booking in this status occupies its slot for conflict
    /// detection. Only cancellation frees the slot.
    pub fn blocks_slot(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }

    pub fn can_be_cancelled(&self) -> bool {
        self.can_transition_to(BookingStatus::Cancelled)
    }
}

pub(super) fn validate_transition(
    from: BookingStatus,
    to: BookingStatus,
) -> Result<(), EngineError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(EngineError::InvalidTransition { from, to })
    }
}

/// Requester must be one of the booking's two parties. `System` always
/// passes — it is the sentinel for engine-initiated actions.
pub(super) fn authorize_party(booking: &Booking, actor: &Actor) -> Result<(), EngineError> {
    match actor {
        Actor::System => Ok(()),
        Actor::Client(id) if *id == booking.client_id => Ok(()),
        Actor::Professional(id) if *id == booking.professional_id => Ok(()),
        _ => Err(EngineError::NotBookingParty),
    }
}

/// Confirmation is reserved for the assigned professional.
pub(super) fn authorize_professional(
    booking: &Booking,
    professional_id: ulid::Ulid,
) -> Result<(), EngineError> {
    if booking.professional_id == professional_id {
        Ok(())
    } else {
        Err(EngineError::ProfessionalOnly)
    }
}
