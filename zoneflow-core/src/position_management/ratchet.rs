/// Monotonic stop level.
///
/// **Core Rule:** a stop may tighten, never loosen.
///
/// - Long positions: the stop can only rise
/// - Short positions: the stop can only fall
use crate::domain::Direction;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatchetState {
    level: f64,
    direction: Direction,
}

impl RatchetState {
    pub fn new(direction: Direction, initial_level: f64) -> Self {
        Self {
            level: initial_level,
            direction,
        }
    }

    /// Apply a proposed stop and return the resulting level.
    ///
    /// # Example
    /// ```
    /// use zoneflow_core::domain::Direction;
    /// use zoneflow_core::position_management::RatchetState;
    ///
    /// let mut stop = RatchetState::new(Direction::Long, 95.0);
    /// assert_eq!(stop.apply(100.0), 100.0); // tightening allowed
    /// assert_eq!(stop.apply(90.0), 100.0); // loosening blocked
    /// ```
    pub fn apply(&mut self, proposed: f64) -> f64 {
        if proposed.is_finite() {
            self.level = match self.direction {
                Direction::Long => self.level.max(proposed),
                Direction::Short => self.level.min(proposed),
            };
        }
        self.level
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// True if `price` is at or through the stop.
    pub fn is_hit_by(&self, price: f64) -> bool {
        match self.direction {
            Direction::Long => price <= self.level,
            Direction::Short => price >= self.level,
        }
    }
}
