use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only canonical time type. Always UTC.
pub type Ms = i64;

/// One minute in `Ms`.
pub const MINUTE_MS: Ms = 60_000;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }
}

/// Appointment lifecycle status. Transitions are governed by the table in
/// `engine::lifecycle`; nothing leaves `Completed` or `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    Rescheduled,
}

impl BookingStatus {
    /// Parse the textual form accepted on the raw update path.
    pub fn parse(s: &str) -> Option<Self> {
        match normalize_token(s).as_str() {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "completed" => Some(Self::Completed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            "rescheduled" => Some(Self::Rescheduled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Rescheduled => "rescheduled",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the appointment takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsultationType {
    InPerson,
    Virtual,
    Phone,
}

impl ConsultationType {
    /// Parse the textual form submitted by callers. Accepts snake_case,
    /// kebab-case and PascalCase spellings.
    pub fn parse(s: &str) -> Option<Self> {
        match normalize_token(s).as_str() {
            "inperson" => Some(Self::InPerson),
            "virtual" => Some(Self::Virtual),
            "phone" => Some(Self::Phone),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InPerson => "in_person",
            Self::Virtual => "virtual",
            Self::Phone => "phone",
        }
    }
}

impl std::fmt::Display for ConsultationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize_token(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// The party performing an operation. `System` is the sentinel for
/// engine-initiated actions (e.g. administrative cancellation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    Client(Ulid),
    Professional(Ulid),
    System,
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Client(id) => write!(f, "client:{id}"),
            Actor::Professional(id) => write!(f, "professional:{id}"),
            Actor::System => write!(f, "system"),
        }
    }
}

/// Where/how to reach the appointment. Fields are informative only and not
/// cross-validated against the consultation type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingDetails {
    pub video_url: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

/// Set once, on cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub cancelled_at: Ms,
    pub cancelled_by: Actor,
    pub reason: Option<String>,
}

/// The central entity: one appointment between a client and a professional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub client_id: Ulid,
    pub professional_id: Ulid,
    /// Canonical appointment start, UTC.
    pub start: Ms,
    pub duration_minutes: u32,
    pub consultation_type: ConsultationType,
    pub status: BookingStatus,
    /// `hourly_rate * duration / 60`, rounded once at creation.
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub meeting: MeetingDetails,
    pub cancellation: Option<Cancellation>,
    pub created_at: Ms,
    pub updated_at: Ms,
}

impl Booking {
    /// The half-open slot this booking occupies.
    pub fn span(&self) -> Span {
        Span::new(self.start, self.start + self.duration_minutes as Ms * MINUTE_MS)
    }
}

/// One professional's bookings, sorted by appointment start.
#[derive(Debug, Clone)]
pub struct ScheduleState {
    pub professional_id: Ulid,
    /// All bookings ever made with this professional (cancelled ones
    /// included — they stop blocking slots but are never removed).
    pub bookings: Vec<Booking>,
}

impl ScheduleState {
    pub fn new(professional_id: Ulid) -> Self {
        Self {
            professional_id,
            bookings: Vec::new(),
        }
    }

    /// Insert maintaining sort order by start.
    pub fn insert_booking(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .binary_search_by_key(&booking.start, |b| b.start)
            .unwrap_or_else(|e| e);
        self.bookings.insert(pos, booking);
    }

    pub fn remove_booking(&mut self, id: &Ulid) -> Option<Booking> {
        self.bookings
            .iter()
            .position(|b| b.id == *id)
            .map(|pos| self.bookings.remove(pos))
    }

    pub fn booking(&self, id: &Ulid) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == *id)
    }

    /// Mutable access for in-place edits that do not move the start.
    /// Callers changing `start` must remove + re-insert instead.
    pub fn booking_mut(&mut self, id: &Ulid) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == *id)
    }

    /// Only bookings whose slot overlaps the query window. Binary search
    /// skips everything starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Booking> {
        let right_bound = self.bookings.partition_point(|b| b.start < query.end);
        self.bookings[..right_bound]
            .iter()
            .filter(move |b| b.span().end > query.start)
    }
}

/// The journal record format — flat, one entry per applied mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Full snapshot. Written at creation and by compaction (with the
    /// booking's then-current state).
    BookingCreated { booking: Booking },
    /// Snapshot of every caller-mutable field after an update/reschedule.
    BookingUpdated {
        id: Ulid,
        professional_id: Ulid,
        start: Ms,
        duration_minutes: u32,
        status: BookingStatus,
        consultation_type: ConsultationType,
        notes: Option<String>,
        meeting: MeetingDetails,
        updated_at: Ms,
    },
    BookingConfirmed {
        id: Ulid,
        professional_id: Ulid,
        updated_at: Ms,
    },
    BookingCompleted {
        id: Ulid,
        professional_id: Ulid,
        updated_at: Ms,
    },
    BookingCancelled {
        id: Ulid,
        professional_id: Ulid,
        cancelled_at: Ms,
        cancelled_by: Actor,
        reason: Option<String>,
    },
}

impl Event {
    /// The professional whose schedule this event belongs to.
    pub fn professional_id(&self) -> Ulid {
        match self {
            Event::BookingCreated { booking } => booking.professional_id,
            Event::BookingUpdated { professional_id, .. }
            | Event::BookingConfirmed { professional_id, .. }
            | Event::BookingCompleted { professional_id, .. }
            | Event::BookingCancelled { professional_id, .. } => *professional_id,
        }
    }
}

// ── Orchestrator request/result types ────────────────────────────

/// Input to `Engine::create_booking`.
#[derive(Debug, Clone)]
pub struct CreateBookingRequest {
    pub professional_id: Ulid,
    pub client_id: Ulid,
    /// Wall-clock appointment time as submitted, no zone attached. It is
    /// interpreted in the professional's declared timezone.
    pub local_start: NaiveDateTime,
    /// Defaults to the configured default when absent.
    pub duration_minutes: Option<u32>,
    /// Textual consultation type; parsed, unrecognized values are rejected.
    pub consultation_type: String,
    pub notes: Option<String>,
    pub meeting: MeetingDetails,
}

/// Partial update for `Engine::update_booking`. `None` fields are left
/// untouched. A `status` change cannot be combined with other changes.
#[derive(Debug, Clone, Default)]
pub struct UpdateBookingRequest {
    pub local_start: Option<NaiveDateTime>,
    pub duration_minutes: Option<u32>,
    pub consultation_type: Option<String>,
    pub notes: Option<String>,
    pub meeting: Option<MeetingDetails>,
    pub status: Option<String>,
}

impl UpdateBookingRequest {
    pub fn has_field_changes(&self) -> bool {
        self.local_start.is_some()
            || self.duration_minutes.is_some()
            || self.consultation_type.is_some()
            || self.notes.is_some()
            || self.meeting.is_some()
    }
}

/// Listing filter; all criteria are optional and AND-combined.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub professional_id: Option<Ulid>,
    pub client_id: Option<Ulid>,
    pub status: Option<BookingStatus>,
    /// Inclusive lower bound on appointment start.
    pub from: Option<Ms>,
    /// Exclusive upper bound on appointment start.
    pub to: Option<Ms>,
}

impl BookingFilter {
    pub fn matches(&self, b: &Booking) -> bool {
        self.professional_id.is_none_or(|id| b.professional_id == id)
            && self.client_id.is_none_or(|id| b.client_id == id)
            && self.status.is_none_or(|s| b.status == s)
            && self.from.is_none_or(|t| b.start >= t)
            && self.to.is_none_or(|t| b.start < t)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self { offset: 0, limit: 50 }
    }
}

#[derive(Debug, Clone)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// Matching rows before pagination.
    pub total: usize,
}

/// Booking counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub rescheduled: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: BookingStatus) {
        match status {
            BookingStatus::Pending => self.pending += 1,
            BookingStatus::Confirmed => self.confirmed += 1,
            BookingStatus::Completed => self.completed += 1,
            BookingStatus::Cancelled => self.cancelled += 1,
            BookingStatus::Rescheduled => self.rescheduled += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.confirmed + self.completed + self.cancelled + self.rescheduled
    }
}

/// A booking plus best-effort display names for its parties. Name lookups
/// are enrichment only — when they fail the booking is still returned.
#[derive(Debug, Clone)]
pub struct BookingView {
    pub booking: Booking,
    pub client_name: Option<String>,
    pub professional_name: Option<String>,
}
