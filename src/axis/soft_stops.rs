use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoftStops {
    pub min: f64,
    pub max: f64,
}

impl SoftStops {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min < self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_are_inclusive() {
        let stops = SoftStops::new(0.0, 180.0);
        assert!(stops.contains(0.0));
        assert!(stops.contains(180.0));
        assert!(!stops.contains(-0.0001));
        assert!(!stops.contains(500.0));
        assert!(!stops.contains(f64::NAN));
    }

    #[test]
    fn test_validity() {
        assert!(SoftStops::new(-45.0, 45.0).is_valid());
        assert!(!SoftStops::new(10.0, 10.0).is_valid());
        assert!(!SoftStops::new(f64::NEG_INFINITY, 0.0).is_valid());
    }
}
