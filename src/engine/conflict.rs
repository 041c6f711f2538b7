use crate::config::SchedulerConfig;
use crate::model::*;

use super::EngineError;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

pub(crate) fn validate_duration(cfg: &SchedulerConfig, minutes: u32) -> Result<(), EngineError> {
    if minutes < cfg.min_duration_minutes || minutes > cfg.max_duration_minutes {
        return Err(EngineError::InvalidDuration(minutes));
    }
    Ok(())
}

pub(crate) fn validate_notes(cfg: &SchedulerConfig, notes: &Option<String>) -> Result<(), EngineError> {
    if let Some(n) = notes
        && n.chars().count() > cfg.max_notes_len {
            return Err(EngineError::LimitExceeded("notes too long"));
        }
    Ok(())
}

pub(crate) fn validate_reason(cfg: &SchedulerConfig, reason: &Option<String>) -> Result<(), EngineError> {
    if let Some(r) = reason
        && r.chars().count() > cfg.max_reason_len {
            return Err(EngineError::LimitExceeded("cancellation reason too long"));
        }
    Ok(())
}

/// Cancellation must happen strictly more than `cutoff` before the start.
pub(crate) fn inside_cancellation_cutoff(start: Ms, now: Ms, cutoff: Ms) -> bool {
    now >= start - cutoff
}

/// First slot-blocking booking whose half-open interval overlaps `span`.
/// `exclude` removes one booking from consideration, used when re-checking
/// an update against the schedule it is already part of. Any status other
/// than `Cancelled` blocks the slot.
pub(crate) fn find_conflict(
    rs: &ScheduleState,
    span: &Span,
    exclude: Option<ulid::Ulid>,
) -> Option<ulid::Ulid> {
    for booking in rs.overlapping(span) {
        if exclude.is_some_and(|id| id == booking.id) {
            continue;
        }
        if !booking.status.blocks_slot() {
            continue;
        }
        if booking.span().overlaps(span) {
            return Some(booking.id);
        }
    }
    None
}

/// Caller holds the schedule's write lock: the check and the subsequent
/// journal write are one critical section, so two overlapping requests
/// cannot both pass.
pub(crate) fn check_no_conflict(
    rs: &ScheduleState,
    span: &Span,
    exclude: Option<ulid::Ulid>,
) -> Result<(), EngineError> {
    match find_conflict(rs, span, exclude) {
        Some(id) => Err(EngineError::SlotConflict(id)),
        None => Ok(()),
    }
}
