use crate::model::Ms;

/// Engine policy knobs, injected at construction. Defaults carry the
/// production values; tests override individual fields.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Shortest bookable appointment.
    pub min_duration_minutes: u32,
    /// Longest bookable appointment.
    pub max_duration_minutes: u32,
    /// Applied when a creation request omits the duration.
    pub default_duration_minutes: u32,
    /// Minimum lead time before the appointment start for cancellation.
    pub cancellation_cutoff_ms: Ms,
    /// Upper bound on free-text notes, in characters.
    pub max_notes_len: usize,
    /// Upper bound on the cancellation reason, in characters.
    pub max_reason_len: usize,
    /// Hard cap on bookings held per professional schedule.
    pub max_bookings_per_professional: usize,
    /// Listing page size clamp.
    pub max_page_limit: usize,
    /// Journal appends tolerated before the compactor rewrites it.
    pub journal_compact_threshold: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_duration_minutes: 15,
            max_duration_minutes: 480,
            default_duration_minutes: 60,
            cancellation_cutoff_ms: 2 * 60 * 60 * 1000,
            max_notes_len: 1000,
            max_reason_len: 500,
            max_bookings_per_professional: 10_000,
            max_page_limit: 500,
            journal_compact_threshold: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_policy() {
        let cfg = SchedulerConfig::default();
        assert_eq!(cfg.min_duration_minutes, 15);
        assert_eq!(cfg.max_duration_minutes, 480);
        assert_eq!(cfg.default_duration_minutes, 60);
        assert_eq!(cfg.cancellation_cutoff_ms, 7_200_000);
    }
}
