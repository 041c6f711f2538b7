use ulid::Ulid;

use crate::model::BookingStatus;

/// Domain errors raised by booking operations. Callers map `kind()` onto
/// transport-level responses.
#[derive(Debug)]
pub enum EngineError {
    BookingNotFound(Ulid),
    ProfessionalNotFound(Ulid),
    /// Professional exists but the profile is not accepting bookings.
    ProfessionalInactive(Ulid),
    /// Requested appointment time is not strictly in the future.
    PastAppointment,
    /// Duration outside the configured bounds.
    InvalidDuration(u32),
    UnknownConsultationType(String),
    UnknownStatus(String),
    /// The requested slot overlaps the given existing booking.
    SlotConflict(Ulid),
    /// The status change is not allowed by the transition table.
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    /// Booking is in a terminal status and can no longer be modified.
    TerminalStatus(BookingStatus),
    /// Cancellation requested inside the cutoff window.
    CancellationCutoff,
    /// A status change was combined with field changes in one update.
    MixedStatusUpdate,
    /// Requester is not a party to the booking.
    NotBookingParty,
    /// Operation reserved for the booking's professional.
    ProfessionalOnly,
    LimitExceeded(&'static str),
    /// Directory (party store) unavailable.
    Directory(String),
    /// Journal write failed.
    JournalError(String),
}

/// The four user-visible failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidOperation,
    Unauthorized,
    Infrastructure,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::BookingNotFound(_) | EngineError::ProfessionalNotFound(_) => {
                ErrorKind::NotFound
            }
            EngineError::ProfessionalInactive(_)
            | EngineError::PastAppointment
            | EngineError::InvalidDuration(_)
            | EngineError::UnknownConsultationType(_)
            | EngineError::UnknownStatus(_)
            | EngineError::SlotConflict(_)
            | EngineError::InvalidTransition { .. }
            | EngineError::TerminalStatus(_)
            | EngineError::CancellationCutoff
            | EngineError::MixedStatusUpdate
            | EngineError::LimitExceeded(_) => ErrorKind::InvalidOperation,
            EngineError::NotBookingParty | EngineError::ProfessionalOnly => ErrorKind::Unauthorized,
            EngineError::Directory(_) | EngineError::JournalError(_) => ErrorKind::Infrastructure,
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::BookingNotFound(id) => write!(f, "booking not found: {id}"),
            EngineError::ProfessionalNotFound(id) => write!(f, "professional not found: {id}"),
            EngineError::ProfessionalInactive(id) => {
                write!(f, "professional {id} is not accepting bookings")
            }
            EngineError::PastAppointment => {
                write!(f, "appointment time must be in the future")
            }
            EngineError::InvalidDuration(minutes) => {
                write!(f, "invalid duration: {minutes} minutes")
            }
            EngineError::UnknownConsultationType(s) => {
                write!(f, "unknown consultation type: {s:?}")
            }
            EngineError::UnknownStatus(s) => write!(f, "unknown status: {s:?}"),
            EngineError::SlotConflict(id) => {
                write!(f, "slot conflicts with existing booking: {id}")
            }
            EngineError::InvalidTransition { from, to } => {
                write!(f, "cannot move a {from} booking to {to}")
            }
            EngineError::TerminalStatus(status) => {
                write!(f, "booking is {status} and can no longer be modified")
            }
            EngineError::CancellationCutoff => {
                write!(f, "too close to the appointment to cancel")
            }
            EngineError::MixedStatusUpdate => {
                write!(f, "a status change cannot be combined with other changes")
            }
            EngineError::NotBookingParty => {
                write!(f, "requester is not a party to this booking")
            }
            EngineError::ProfessionalOnly => {
                write!(f, "only the booking's professional may do this")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Directory(e) => write!(f, "directory error: {e}"),
            EngineError::JournalError(e) => write!(f, "journal error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
