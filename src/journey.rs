//! Journey travel state: a monotonically advancing position along Z.

use crate::params::JourneyConfig;

/// Travel position for journey mode.
///
/// The spawn planner reads `spawn_z()` for ahead-of-camera placement and
/// the camera follows `position()`. Advancing is gated by the caller
/// (journey mode + active playback); resetting returns to the origin.
pub struct JourneyState {
    position: f32,
    pub speed: f32,
    pub spawn_distance: f32,
}

impl JourneyState {
    pub fn new(config: &JourneyConfig) -> Self {
        Self {
            position: 0.0,
            speed: config.speed,
            spawn_distance: config.spawn_distance,
        }
    }

    /// Advance by one frame of travel
    pub fn advance(&mut self) {
        self.position += self.speed;
    }

    pub fn reset(&mut self) {
        self.position = 0.0;
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    /// Z coordinate where new nodes are placed (ahead of the travel position)
    pub fn spawn_z(&self) -> f32 {
        self.position + self.spawn_distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_is_monotonic() {
        let mut journey = JourneyState::new(&JourneyConfig::default());

        let mut previous = journey.position();
        for _ in 0..100 {
            journey.advance();
            assert!(journey.position() > previous);
            previous = journey.position();
        }
        assert!((journey.position() - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_spawn_z_leads_position() {
        let mut journey = JourneyState::new(&JourneyConfig::default());
        journey.advance();

        assert!((journey.spawn_z() - (journey.position() + 10.0)).abs() < 1e-6);
    }

    #[test]
    fn test_reset_returns_to_origin() {
        let mut journey = JourneyState::new(&JourneyConfig::default());
        for _ in 0..42 {
            journey.advance();
        }
        assert!(journey.position() > 0.0);

        journey.reset();
        assert_eq!(journey.position(), 0.0);
    }
}
