mod conflict;
mod error;
mod lifecycle;
mod mutations;
mod queries;
mod windows;

pub use error::{EngineError, ErrorKind};
pub use windows::{free_windows, merge_overlapping, subtract_intervals};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc, oneshot};
use ulid::Ulid;

use crate::config::SchedulerConfig;
use crate::directory::Directory;
use crate::journal::Journal;
use crate::model::*;
use crate::notify::NotifyHub;

pub type SharedScheduleState = Arc<RwLock<ScheduleState>>;

// ── Group-commit journal channel ─────────────────────────

pub(super) enum JournalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the journal and batches appends for group
/// commit: block for the first append, drain whatever else is immediately
/// queued, write the batch with a single fsync, then answer every sender.
async fn journal_writer_loop(mut journal: Journal, mut rx: mpsc::Receiver<JournalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            JournalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                loop {
                    match rx.try_recv() {
                        Ok(JournalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush the batch first, then the non-append command.
                            flush_and_respond(&mut journal, &mut batch);
                            handle_non_append(&mut journal, other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush batch
                    }
                }

                if !batch.is_empty() {
                    flush_and_respond(&mut journal, &mut batch);
                }
            }
            other => handle_non_append(&mut journal, other),
        }
    }
}

fn flush_and_respond(
    journal: &mut Journal,
    batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>,
) {
    metrics::histogram!(crate::observability::JOURNAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(journal, batch);
    metrics::histogram!(crate::observability::JOURNAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(
    journal: &mut Journal,
    batch: &[(Event, oneshot::Sender<io::Result<()>>)],
) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch {
        if let Err(e) = journal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush — even after an append error — so partially buffered
    // bytes don't leak into the next batch (these callers were told this
    // batch failed).
    let flush_err = journal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn handle_non_append(journal: &mut Journal, cmd: JournalCommand) {
    match cmd {
        JournalCommand::Compact { events, response } => {
            let result = Journal::write_compact_file(journal.path(), &events)
                .and_then(|()| journal.swap_compact_file());
            let _ = response.send(result);
        }
        JournalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(journal.appends_since_compact());
        }
        JournalCommand::Append { .. } => unreachable!(),
    }
}

/// The booking orchestrator. One instance owns every professional's
/// schedule; per-schedule `RwLock`s are the serialization point that makes
/// conflict-check-then-write atomic.
pub struct Engine {
    pub(super) state: DashMap<Ulid, SharedScheduleState>,
    pub(super) journal_tx: mpsc::Sender<JournalCommand>,
    pub(super) directory: Arc<dyn Directory>,
    pub(super) config: SchedulerConfig,
    pub notify: Arc<NotifyHub>,
    /// Reverse lookup: booking id → professional id.
    pub(super) booking_to_professional: DashMap<Ulid, Ulid>,
    /// Client → booking ids, for client-side listings.
    pub(super) client_bookings: DashMap<Ulid, Vec<Ulid>>,
}

impl Engine {
    pub fn new(
        journal_path: PathBuf,
        directory: Arc<dyn Directory>,
        config: SchedulerConfig,
        notify: Arc<NotifyHub>,
    ) -> io::Result<Self> {
        let events = Journal::replay(&journal_path)?;
        let journal = Journal::open(&journal_path)?;
        let (journal_tx, journal_rx) = mpsc::channel(4096);
        tokio::spawn(journal_writer_loop(journal, journal_rx));

        let engine = Self {
            state: DashMap::new(),
            journal_tx,
            directory,
            config,
            notify,
            booking_to_professional: DashMap::new(),
            client_bookings: DashMap::new(),
        };

        // Replay — we are the sole owner of these Arcs, so try_write always
        // succeeds instantly. blocking_write is off-limits here because new()
        // may run inside an async context.
        for event in &events {
            let rs = engine.schedule_entry(event.professional_id());
            let mut guard = rs.try_write().expect("replay: uncontended write");
            engine.apply_to_schedule(&mut guard, event);
        }

        Ok(engine)
    }

    /// Get or lazily create a professional's schedule.
    pub(super) fn schedule_entry(&self, professional_id: Ulid) -> SharedScheduleState {
        self.state
            .entry(professional_id)
            .or_insert_with(|| Arc::new(RwLock::new(ScheduleState::new(professional_id))))
            .value()
            .clone()
    }

    pub fn get_schedule(&self, professional_id: &Ulid) -> Option<SharedScheduleState> {
        self.state.get(professional_id).map(|e| e.value().clone())
    }

    pub fn professional_for_booking(&self, booking_id: &Ulid) -> Option<Ulid> {
        self.booking_to_professional
            .get(booking_id)
            .map(|e| *e.value())
    }

    /// Write an event via the background group-commit writer.
    async fn journal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.journal_tx
            .send(JournalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::JournalError("journal writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::JournalError("journal writer dropped response".into()))?
            .map_err(|e| EngineError::JournalError(e.to_string()))
    }

    /// Journal-append + apply + notify in one call. The caller holds the
    /// schedule's write lock; nothing is applied if the append fails.
    pub(super) async fn persist_and_apply(
        &self,
        professional_id: Ulid,
        rs: &mut ScheduleState,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.journal_append(event).await?;
        self.apply_to_schedule(rs, event);
        self.notify.send(professional_id, event);
        Ok(())
    }

    /// Booking id → owning schedule, write-locked.
    pub(super) async fn resolve_booking_write(
        &self,
        booking_id: &Ulid,
    ) -> Result<(Ulid, tokio::sync::OwnedRwLockWriteGuard<ScheduleState>), EngineError> {
        let professional_id = self
            .professional_for_booking(booking_id)
            .ok_or(EngineError::BookingNotFound(*booking_id))?;
        let rs = self
            .get_schedule(&professional_id)
            .ok_or(EngineError::BookingNotFound(*booking_id))?;
        let guard = rs.write_owned().await;
        Ok((professional_id, guard))
    }

    /// Apply one event to a schedule and keep the secondary indexes in
    /// step. No locking — the caller holds the lock.
    pub(super) fn apply_to_schedule(&self, rs: &mut ScheduleState, event: &Event) {
        match event {
            Event::BookingCreated { booking } => {
                self.booking_to_professional
                    .insert(booking.id, booking.professional_id);
                self.client_bookings
                    .entry(booking.client_id)
                    .or_default()
                    .push(booking.id);
                rs.insert_booking(booking.clone());
            }
            Event::BookingUpdated {
                id,
                start,
                duration_minutes,
                status,
                consultation_type,
                notes,
                meeting,
                updated_at,
                ..
            } => {
                // Remove + re-insert: the start may have moved.
                if let Some(mut booking) = rs.remove_booking(id) {
                    booking.start = *start;
                    booking.duration_minutes = *duration_minutes;
                    booking.status = *status;
                    booking.consultation_type = *consultation_type;
                    booking.notes = notes.clone();
                    booking.meeting = meeting.clone();
                    booking.updated_at = *updated_at;
                    rs.insert_booking(booking);
                }
            }
            Event::BookingConfirmed { id, updated_at, .. } => {
                if let Some(booking) = rs.booking_mut(id) {
                    booking.status = BookingStatus::Confirmed;
                    booking.updated_at = *updated_at;
                }
            }
            Event::BookingCompleted { id, updated_at, .. } => {
                if let Some(booking) = rs.booking_mut(id) {
                    booking.status = BookingStatus::Completed;
                    booking.updated_at = *updated_at;
                }
            }
            Event::BookingCancelled {
                id,
                cancelled_at,
                cancelled_by,
                reason,
                ..
            } => {
                if let Some(booking) = rs.booking_mut(id) {
                    booking.status = BookingStatus::Cancelled;
                    booking.cancellation = Some(Cancellation {
                        cancelled_at: *cancelled_at,
                        cancelled_by: *cancelled_by,
                        reason: reason.clone(),
                    });
                    booking.updated_at = *cancelled_at;
                }
            }
        }
    }
}
