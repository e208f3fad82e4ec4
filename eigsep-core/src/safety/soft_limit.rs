//! Calibrated soft limits

use crate::config::VoltageRange;
use crate::sensor::Direction;

/// Check if an axis moving in `sensed` direction has reached the end of
/// its calibrated range
///
/// Only the end in the direction of travel counts, so an axis that has
/// already turned around is not flagged again.
pub fn soft_limit_reached(range: &VoltageRange, sensed: Direction, volts: f32) -> bool {
    match sensed {
        Direction::Forward => range.at_max(volts),
        Direction::Reverse => range.at_min(volts),
        Direction::Stationary => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Axis;

    #[test]
    fn test_only_end_in_travel_direction() {
        let range = VoltageRange::new(Axis::Alt, 0.7, 1.7).unwrap();

        assert!(soft_limit_reached(&range, Direction::Forward, 1.7));
        assert!(soft_limit_reached(&range, Direction::Forward, 2.0));
        assert!(!soft_limit_reached(&range, Direction::Reverse, 2.0));

        assert!(soft_limit_reached(&range, Direction::Reverse, 0.65));
        assert!(!soft_limit_reached(&range, Direction::Forward, 0.65));

        assert!(!soft_limit_reached(&range, Direction::Stationary, 2.0));
        assert!(!soft_limit_reached(&range, Direction::Forward, 1.2));
    }
}
