use crate::driver::RawPosition;

pub const MICROSTEPS_PER_STEP: f64 = 256.0;

/// A step count split the way the controller takes it: whole steps plus
/// 1/256 micro-steps, both carrying the sign of the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepPosition {
    pub steps: i32,
    pub microsteps: i16,
}

impl StepPosition {
    pub fn new(steps: i32, microsteps: i16) -> Self {
        Self { steps, microsteps }
    }

    /// Truncates the fractional part to whole micro-steps. `None` when the
    /// whole steps do not fit the controller's signed 32-bit position.
    pub fn from_steps(steps: f64) -> Option<Self> {
        let whole = steps.trunc();
        if !(i32::MIN as f64..=i32::MAX as f64).contains(&whole) {
            return None;
        }
        Some(Self {
            steps: whole as i32,
            microsteps: (steps.fract() * MICROSTEPS_PER_STEP).trunc() as i16,
        })
    }

    pub fn from_physical(value: f64, conversion_factor: f64) -> Option<Self> {
        Self::from_steps(value / conversion_factor)
    }

    pub fn as_steps(&self) -> f64 {
        self.steps as f64 + self.microsteps as f64 / MICROSTEPS_PER_STEP
    }

    pub fn to_physical(&self, conversion_factor: f64) -> f64 {
        self.as_steps() * conversion_factor
    }
}

impl From<RawPosition> for StepPosition {
    fn from(raw: RawPosition) -> Self {
        Self::new(raw.steps, raw.microsteps)
    }
}

/// Speed in physical units per second to (steps/s, 1/256 steps/s). `None`
/// when the step rate is negative or does not fit in 32 bits.
pub fn split_speed(speed: f64, conversion_factor: f64) -> Option<(u32, u8)> {
    let steps_per_sec = speed / conversion_factor;
    let whole = steps_per_sec.trunc();
    if !(0.0..=u32::MAX as f64).contains(&whole) {
        return None;
    }
    let micro = (steps_per_sec.fract() * MICROSTEPS_PER_STEP).trunc() as u8;
    Some((whole as u32, micro))
}

pub fn join_speed(speed: u32, micro_speed: u8, conversion_factor: f64) -> f64 {
    (speed as f64 + micro_speed as f64 / MICROSTEPS_PER_STEP) * conversion_factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_steps() {
        assert_eq!(
            StepPosition::from_physical(10.0, 0.5),
            Some(StepPosition::new(20, 0))
        );
        assert_eq!(
            StepPosition::from_physical(12.5, 0.5).map(|p| p.to_physical(0.5)),
            Some(12.5)
        );
    }

    #[test]
    fn test_fraction_truncates_to_256ths() {
        // 0.1 / 0.00075 = 133.333.. steps -> 133 steps + 85/256
        let pos = StepPosition::from_physical(0.1, 0.00075);
        assert_eq!(pos, Some(StepPosition::new(133, 85)));
    }

    #[test]
    fn test_negative_values_keep_sign_in_both_parts() {
        let pos = StepPosition::from_steps(-1.5).unwrap();
        assert_eq!(pos, StepPosition::new(-1, -128));
        assert_eq!(pos.as_steps(), -1.5);
    }

    #[test]
    fn test_round_trip_within_one_microstep() {
        let factor = 0.00075;
        for value in [-180.0, -45.3, -0.001, 0.0, 7.77, 44.999, 179.5] {
            let back = StepPosition::from_physical(value, factor)
                .unwrap()
                .to_physical(factor);
            assert!(
                (back - value).abs() <= factor / MICROSTEPS_PER_STEP,
                "{} came back as {}",
                value,
                back
            );
        }
    }

    #[test]
    fn test_speed_split() {
        assert_eq!(split_speed(1.0, 0.25), Some((4, 0)));
        assert_eq!(split_speed(0.625, 0.25), Some((2, 128)));
        assert_eq!(join_speed(2, 128, 0.25), 0.625);
    }

    #[test]
    fn test_step_range_is_enforced() {
        assert_eq!(StepPosition::from_physical(10.0, 1e-9), None);
        assert_eq!(StepPosition::from_physical(-10.0, 1e-9), None);
        assert_eq!(StepPosition::from_steps(f64::NAN), None);
        assert_eq!(
            StepPosition::from_steps(i32::MAX as f64),
            Some(StepPosition::new(i32::MAX, 0))
        );
        assert_eq!(
            StepPosition::from_steps(i32::MIN as f64 - 0.5),
            Some(StepPosition::new(i32::MIN, -128))
        );
    }

    #[test]
    fn test_speed_range_is_enforced() {
        assert_eq!(split_speed(10.0, 1e-9), None);
        assert_eq!(split_speed(-1.0, 0.25), None);
        assert_eq!(split_speed(0.1, 0.25), Some((0, 102)));
    }
}
