use std::time::Instant;

use tracing::{info, warn};
use ulid::Ulid;

use crate::directory::ProfessionalStatus;
use crate::model::*;
use crate::observability;
use crate::pricing;
use crate::timezone;

use super::conflict::{
    check_no_conflict, inside_cancellation_cutoff, now_ms, validate_duration, validate_notes,
    validate_reason,
};
use super::lifecycle::{authorize_party, authorize_professional, validate_transition};
use super::{Engine, EngineError, JournalCommand, SharedScheduleState};

impl Engine {
    /// Create a booking in `Pending` status. Validation order: professional
    /// exists and is active, raw wall-clock time is in the future, duration
    /// and notes are within bounds, consultation type parses. The conflict
    /// check runs last, under the schedule's write lock, against the
    /// timezone-normalized interval — so a concurrent overlapping request
    /// cannot slip between check and write.
    pub async fn create_booking(&self, req: CreateBookingRequest) -> Result<Booking, EngineError> {
        let started = Instant::now();
        let result = self.create_booking_inner(req).await;
        observability::observe_op("create_booking", started, result.is_ok());
        result
    }

    async fn create_booking_inner(&self, req: CreateBookingRequest) -> Result<Booking, EngineError> {
        let profile = self
            .directory
            .professional(req.professional_id)
            .await
            .map_err(|e| EngineError::Directory(e.to_string()))?
            .ok_or(EngineError::ProfessionalNotFound(req.professional_id))?;
        if profile.status != ProfessionalStatus::Active {
            return Err(EngineError::ProfessionalInactive(req.professional_id));
        }

        let now = now_ms();
        // The future check runs on the raw submitted wall-clock, before any
        // timezone resolution.
        if req.local_start.and_utc().timestamp_millis() <= now {
            return Err(EngineError::PastAppointment);
        }

        let duration_minutes = req
            .duration_minutes
            .unwrap_or(self.config.default_duration_minutes);
        validate_duration(&self.config, duration_minutes)?;
        validate_notes(&self.config, &req.notes)?;

        let consultation_type = ConsultationType::parse(&req.consultation_type)
            .ok_or_else(|| EngineError::UnknownConsultationType(req.consultation_type.clone()))?;

        let total_amount = pricing::total_amount(profile.hourly_rate, duration_minutes);

        let start = self.normalize_start(req.local_start, &profile.timezone, req.professional_id);
        let span = Span::new(start, start + duration_minutes as Ms * MINUTE_MS);

        let rs = self.schedule_entry(req.professional_id);
        let mut guard = rs.write_owned().await;
        if guard.bookings.len() >= self.config.max_bookings_per_professional {
            return Err(EngineError::LimitExceeded("too many bookings for professional"));
        }
        check_no_conflict(&guard, &span, None)?;

        let booking = Booking {
            id: Ulid::new(),
            client_id: req.client_id,
            professional_id: req.professional_id,
            start,
            duration_minutes,
            consultation_type,
            status: BookingStatus::Pending,
            total_amount,
            notes: req.notes,
            meeting: req.meeting,
            cancellation: None,
            created_at: now,
            updated_at: now,
        };
        let event = Event::BookingCreated { booking: booking.clone() };
        self.persist_and_apply(req.professional_id, &mut guard, &event)
            .await?;
        info!(booking = %booking.id, professional = %booking.professional_id, "booking created");
        Ok(booking)
    }

    /// Partial update by one of the booking's parties. A supplied `status`
    /// is routed through the transition table via the dedicated operations
    /// and cannot be combined with field changes. Date and/or duration
    /// changes re-run conflict detection excluding this booking, with the
    /// effective duration; a date change moves the booking to
    /// `Rescheduled`.
    pub async fn update_booking(
        &self,
        id: Ulid,
        req: UpdateBookingRequest,
        actor: &Actor,
    ) -> Result<Booking, EngineError> {
        let started = Instant::now();
        let result = self.update_booking_inner(id, req, actor).await;
        observability::observe_op("update_booking", started, result.is_ok());
        result
    }

    async fn update_booking_inner(
        &self,
        id: Ulid,
        req: UpdateBookingRequest,
        actor: &Actor,
    ) -> Result<Booking, EngineError> {
        if let Some(ref status_str) = req.status {
            if req.has_field_changes() {
                return Err(EngineError::MixedStatusUpdate);
            }
            let target = BookingStatus::parse(status_str)
                .ok_or_else(|| EngineError::UnknownStatus(status_str.clone()))?;
            return self.route_status_change(id, target, actor).await;
        }

        let (professional_id, mut guard) = self.resolve_booking_write(&id).await?;
        let current = guard
            .booking(&id)
            .cloned()
            .ok_or(EngineError::BookingNotFound(id))?;
        authorize_party(&current, actor)?;
        if current.status.is_terminal() {
            return Err(EngineError::TerminalStatus(current.status));
        }

        if let Some(minutes) = req.duration_minutes {
            validate_duration(&self.config, minutes)?;
        }
        validate_notes(&self.config, &req.notes)?;
        let consultation_type = match req.consultation_type {
            Some(ref s) => ConsultationType::parse(s)
                .ok_or_else(|| EngineError::UnknownConsultationType(s.clone()))?,
            None => current.consultation_type,
        };

        let now = now_ms();
        let effective_duration = req.duration_minutes.unwrap_or(current.duration_minutes);

        let (start, status) = match req.local_start {
            Some(local_start) => {
                if local_start.and_utc().timestamp_millis() <= now {
                    return Err(EngineError::PastAppointment);
                }
                let profile = self
                    .directory
                    .professional(professional_id)
                    .await
                    .map_err(|e| EngineError::Directory(e.to_string()))?
                    .ok_or(EngineError::ProfessionalNotFound(professional_id))?;
                let start = self.normalize_start(local_start, &profile.timezone, professional_id);
                if start == current.start {
                    // Resubmitting the same date is not a reschedule.
                    (start, current.status)
                } else {
                    validate_transition(current.status, BookingStatus::Rescheduled)?;
                    (start, BookingStatus::Rescheduled)
                }
            }
            None => (current.start, current.status),
        };

        // Re-check the slot whenever the occupied window moves or grows,
        // with this booking excluded from its own schedule.
        if start != current.start || effective_duration != current.duration_minutes {
            let span = Span::new(start, start + effective_duration as Ms * MINUTE_MS);
            check_no_conflict(&guard, &span, Some(id))?;
        }

        let event = Event::BookingUpdated {
            id,
            professional_id,
            start,
            duration_minutes: effective_duration,
            status,
            consultation_type,
            notes: match req.notes {
                Some(n) => Some(n),
                None => current.notes.clone(),
            },
            meeting: req.meeting.unwrap_or_else(|| current.meeting.clone()),
            updated_at: now,
        };
        self.persist_and_apply(professional_id, &mut guard, &event)
            .await?;
        info!(booking = %id, professional = %professional_id, "booking updated");
        guard
            .booking(&id)
            .cloned()
            .ok_or(EngineError::BookingNotFound(id))
    }

    /// The raw-status update path, folded onto the dedicated transitions so
    /// their preconditions (roles, cutoff, table) always apply.
    async fn route_status_change(
        &self,
        id: Ulid,
        target: BookingStatus,
        actor: &Actor,
    ) -> Result<Booking, EngineError> {
        match target {
            BookingStatus::Confirmed => {
                // The sentinel actor covers system cancellations only;
                // confirmation stays professional-only.
                let Actor::Professional(professional_id) = actor else {
                    return Err(EngineError::ProfessionalOnly);
                };
                self.confirm_booking(id, *professional_id).await?;
            }
            BookingStatus::Completed => self.complete_booking(id, actor).await?,
            BookingStatus::Cancelled => self.cancel_booking(id, actor, None).await?,
            BookingStatus::Pending | BookingStatus::Rescheduled => {
                // No operation re-enters Pending; rescheduling happens by
                // submitting a new date, not a bare status.
                let current = self.booking_snapshot(&id).await?;
                return Err(EngineError::InvalidTransition {
                    from: current.status,
                    to: target,
                });
            }
        }
        self.booking_snapshot(&id).await
    }

    /// Cancel with the cutoff rule: strictly more than the configured lead
    /// time must remain before the appointment, on top of the transition
    /// check. `Actor::System` bypasses the party check only.
    pub async fn cancel_booking(
        &self,
        id: Ulid,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<(), EngineError> {
        let started = Instant::now();
        let result = self.cancel_booking_inner(id, actor, reason).await;
        observability::observe_op("cancel_booking", started, result.is_ok());
        result
    }

    async fn cancel_booking_inner(
        &self,
        id: Ulid,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<(), EngineError> {
        validate_reason(&self.config, &reason)?;
        let (professional_id, mut guard) = self.resolve_booking_write(&id).await?;
        let current = guard
            .booking(&id)
            .cloned()
            .ok_or(EngineError::BookingNotFound(id))?;
        authorize_party(&current, actor)?;
        validate_transition(current.status, BookingStatus::Cancelled)?;

        let now = now_ms();
        if inside_cancellation_cutoff(current.start, now, self.config.cancellation_cutoff_ms) {
            return Err(EngineError::CancellationCutoff);
        }

        let event = Event::BookingCancelled {
            id,
            professional_id,
            cancelled_at: now,
            cancelled_by: *actor,
            reason,
        };
        self.persist_and_apply(professional_id, &mut guard, &event)
            .await?;
        info!(booking = %id, by = %actor, "booking cancelled");
        Ok(())
    }

    /// Confirm a pending (or rescheduled) booking. Professional only.
    pub async fn confirm_booking(
        &self,
        id: Ulid,
        professional_id: Ulid,
    ) -> Result<(), EngineError> {
        let started = Instant::now();
        let result = self.confirm_booking_inner(id, professional_id).await;
        observability::observe_op("confirm_booking", started, result.is_ok());
        result
    }

    async fn confirm_booking_inner(
        &self,
        id: Ulid,
        professional_id: Ulid,
    ) -> Result<(), EngineError> {
        let (owner, mut guard) = self.resolve_booking_write(&id).await?;
        let current = guard
            .booking(&id)
            .cloned()
            .ok_or(EngineError::BookingNotFound(id))?;
        authorize_professional(&current, professional_id)?;
        validate_transition(current.status, BookingStatus::Confirmed)?;

        let event = Event::BookingConfirmed {
            id,
            professional_id: owner,
            updated_at: now_ms(),
        };
        self.persist_and_apply(owner, &mut guard, &event).await?;
        info!(booking = %id, "booking confirmed");
        Ok(())
    }

    /// Mark a confirmed booking completed. Either party may do it.
    pub async fn complete_booking(&self, id: Ulid, actor: &Actor) -> Result<(), EngineError> {
        let started = Instant::now();
        let result = self.complete_booking_inner(id, actor).await;
        observability::observe_op("complete_booking", started, result.is_ok());
        result
    }

    async fn complete_booking_inner(&self, id: Ulid, actor: &Actor) -> Result<(), EngineError> {
        let (professional_id, mut guard) = self.resolve_booking_write(&id).await?;
        let current = guard
            .booking(&id)
            .cloned()
            .ok_or(EngineError::BookingNotFound(id))?;
        authorize_party(&current, actor)?;
        validate_transition(current.status, BookingStatus::Completed)?;

        let event = Event::BookingCompleted {
            id,
            professional_id,
            updated_at: now_ms(),
        };
        self.persist_and_apply(professional_id, &mut guard, &event)
            .await?;
        info!(booking = %id, "booking completed");
        Ok(())
    }

    fn normalize_start(
        &self,
        local_start: chrono::NaiveDateTime,
        tz_id: &str,
        professional_id: Ulid,
    ) -> Ms {
        let normalized = timezone::normalize(local_start, tz_id);
        if normalized.utc_fallback {
            warn!(professional = %professional_id, timezone = %tz_id,
                "timezone lookup failed, treating appointment time as UTC");
            metrics::counter!(observability::TIMEZONE_FALLBACKS_TOTAL).increment(1);
        }
        normalized.instant
    }

    /// Rewrite the journal as one snapshot entry per booking. Driven by the
    /// background compactor; also callable by embedding code.
    pub async fn compact_journal(&self) -> Result<(), EngineError> {
        let mut events = Vec::new();
        let schedules: Vec<SharedScheduleState> =
            self.state.iter().map(|e| e.value().clone()).collect();
        for rs in schedules {
            let guard = rs.read().await;
            for booking in &guard.bookings {
                events.push(Event::BookingCreated {
                    booking: booking.clone(),
                });
            }
        }

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.journal_tx
            .send(JournalCommand::Compact {
                events,
                response: tx,
            })
            .await
            .map_err(|_| EngineError::JournalError("journal writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::JournalError("journal writer dropped response".into()))?
            .map_err(|e| EngineError::JournalError(e.to_string()))
    }

    pub async fn journal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = tokio::sync::oneshot::channel();
        if self
            .journal_tx
            .send(JournalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
