use tracing::warn;
use ulid::Ulid;

use crate::model::*;
use crate::observability;

use super::conflict::find_conflict;
use super::lifecycle::authorize_party;
use super::windows;
use super::{Engine, EngineError, SharedScheduleState};

impl Engine {
    /// Current state of one booking, no authorization. Internal — the
    /// public read path is `get_booking`.
    pub(super) async fn booking_snapshot(&self, id: &Ulid) -> Result<Booking, EngineError> {
        let professional_id = self
            .professional_for_booking(id)
            .ok_or(EngineError::BookingNotFound(*id))?;
        let rs = self
            .get_schedule(&professional_id)
            .ok_or(EngineError::BookingNotFound(*id))?;
        let guard = rs.read().await;
        guard
            .booking(id)
            .cloned()
            .ok_or(EngineError::BookingNotFound(*id))
    }

    /// Fetch one booking. The requester must be a party to it. Display
    /// names are enrichment: a failing directory degrades them to `None`
    /// and the booking is still returned.
    pub async fn get_booking(
        &self,
        id: Ulid,
        requester: &Actor,
    ) -> Result<BookingView, EngineError> {
        let booking = self.booking_snapshot(&id).await?;
        authorize_party(&booking, requester)?;
        let client_name = self.lookup_name(booking.client_id).await;
        let professional_name = self.lookup_name(booking.professional_id).await;
        Ok(BookingView {
            booking,
            client_name,
            professional_name,
        })
    }

    async fn lookup_name(&self, party_id: Ulid) -> Option<String> {
        match self.directory.display_name(party_id).await {
            Ok(name) => name,
            Err(e) => {
                warn!(party = %party_id, "display name lookup failed: {e}");
                metrics::counter!(observability::ENRICHMENT_FAILURES_TOTAL).increment(1);
                None
            }
        }
    }

    /// Filtered listing ordered by appointment start, with offset/limit
    /// pagination and a pre-pagination total. The limit is clamped to the
    /// configured maximum.
    pub async fn list_bookings(
        &self,
        filter: &BookingFilter,
        page: Page,
    ) -> Result<PagedResult<Booking>, EngineError> {
        let mut matched = if let Some(professional_id) = filter.professional_id {
            match self.get_schedule(&professional_id) {
                Some(rs) => {
                    let guard = rs.read().await;
                    guard
                        .bookings
                        .iter()
                        .filter(|b| filter.matches(b))
                        .cloned()
                        .collect()
                }
                None => Vec::new(),
            }
        } else if let Some(client_id) = filter.client_id {
            let ids: Vec<Ulid> = self
                .client_bookings
                .get(&client_id)
                .map(|e| e.value().clone())
                .unwrap_or_default();
            let mut out = Vec::with_capacity(ids.len());
            for id in ids {
                if let Ok(b) = self.booking_snapshot(&id).await
                    && filter.matches(&b) {
                        out.push(b);
                    }
            }
            out
        } else {
            let schedules: Vec<SharedScheduleState> =
                self.state.iter().map(|e| e.value().clone()).collect();
            let mut out = Vec::new();
            for rs in schedules {
                let guard = rs.read().await;
                out.extend(guard.bookings.iter().filter(|b| filter.matches(b)).cloned());
            }
            out
        };

        matched.sort_by_key(|b| b.start);
        let total = matched.len();
        let limit = page.limit.min(self.config.max_page_limit);
        let items = matched.into_iter().skip(page.offset).take(limit).collect();
        Ok(PagedResult { items, total })
    }

    /// Booking counts per status, for one professional or across the board.
    pub async fn count_by_status(&self, professional_id: Option<Ulid>) -> StatusCounts {
        let schedules: Vec<SharedScheduleState> = match professional_id {
            Some(id) => self.get_schedule(&id).into_iter().collect(),
            None => self.state.iter().map(|e| e.value().clone()).collect(),
        };
        let mut counts = StatusCounts::default();
        for rs in schedules {
            let guard = rs.read().await;
            for b in &guard.bookings {
                counts.record(b.status);
            }
        }
        counts
    }

    /// Would `[start, start + duration)` collide with a non-cancelled
    /// booking on this professional's schedule? `exclude` removes one
    /// booking from the candidate set. A point-in-time probe: the
    /// authoritative check still happens under the write lock inside the
    /// mutations.
    pub async fn check_conflict(
        &self,
        professional_id: Ulid,
        start: Ms,
        duration_minutes: u32,
        exclude: Option<Ulid>,
    ) -> bool {
        let Some(rs) = self.get_schedule(&professional_id) else {
            return false;
        };
        let guard = rs.read().await;
        let span = Span::new(start, start + duration_minutes as Ms * MINUTE_MS);
        find_conflict(&guard, &span, exclude).is_some()
    }

    /// Open gaps in a professional's schedule inside `window`, optionally
    /// keeping only gaps of at least `min_duration_ms`.
    pub async fn free_windows(
        &self,
        professional_id: Ulid,
        window: Span,
        min_duration_ms: Option<Ms>,
    ) -> Vec<Span> {
        let Some(rs) = self.get_schedule(&professional_id) else {
            return vec![window];
        };
        let guard = rs.read().await;
        let mut free = windows::free_windows(&guard, &window);
        if let Some(min) = min_duration_ms {
            free.retain(|s| s.duration_ms() >= min);
        }
        free
    }
}
