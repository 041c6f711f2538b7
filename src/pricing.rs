//! Appointment price computation.

use rust_decimal::{Decimal, RoundingStrategy};

/// `hourly_rate * duration_minutes / 60`, rounded half-away-from-zero to
/// two decimal places. This is the only rounding site — recomputing from
/// the same inputs always yields the same total.
pub fn total_amount(hourly_rate: Decimal, duration_minutes: u32) -> Decimal {
    (hourly_rate * Decimal::from(duration_minutes) / Decimal::from(60))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_hour_is_the_rate() {
        assert_eq!(total_amount(Decimal::from(50), 60), Decimal::from(50));
    }

    #[test]
    fn half_hour_is_half_the_rate() {
        assert_eq!(total_amount(Decimal::from(50), 30), Decimal::new(2500, 2));
    }

    #[test]
    fn fractional_rate_rounds_to_cents() {
        // 99.99 * 45 / 60 = 74.9925 → 74.99
        assert_eq!(total_amount(Decimal::new(9999, 2), 45), Decimal::new(7499, 2));
    }

    #[test]
    fn midpoint_rounds_away_from_zero() {
        // 0.25 * 30 / 60 = 0.125 → 0.13
        assert_eq!(total_amount(Decimal::new(25, 2), 30), Decimal::new(13, 2));
    }

    #[test]
    fn zero_rate_gives_zero() {
        assert_eq!(total_amount(Decimal::ZERO, 480), Decimal::ZERO);
    }

    #[test]
    fn recompute_is_idempotent() {
        let rate = Decimal::new(8750, 2); // 87.50
        let a = total_amount(rate, 75);
        let b = total_amount(rate, 75);
        assert_eq!(a, b);
        // 87.50 * 75 / 60 = 109.375 → 109.38
        assert_eq!(a, Decimal::new(10938, 2));
    }
}
