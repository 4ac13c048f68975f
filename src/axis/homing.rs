use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::driver::HomeSettings;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomingConfig {
    pub fast_home: u32,
    pub slow_home: u32,
    pub home_delta: i32,
    #[serde(default)]
    pub micro_home_delta: i16,
    pub home_flags: u32,
    #[serde(default)]
    pub guard: Option<PreHomeGuard>,
}

impl HomingConfig {
    pub fn apply(&self, settings: &mut HomeSettings) {
        settings.fast_home = self.fast_home;
        settings.micro_fast_home = 0;
        settings.slow_home = self.slow_home;
        settings.micro_slow_home = 0;
        settings.home_delta = self.home_delta;
        settings.micro_home_delta = self.micro_home_delta;
        settings.home_flags = self.home_flags;
    }
}

/// For stages whose limit switch sits near zero: when the axis is at or below
/// `threshold_steps`, it is first moved to `clearance_steps` and allowed to
/// settle for `settle_delay_ms` before polling, so the switch is not
/// re-triggered at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreHomeGuard {
    #[serde(default = "default_guard_steps")]
    pub threshold_steps: i32,
    #[serde(default = "default_guard_steps")]
    pub clearance_steps: i32,
    #[serde(default = "default_guard_settle_ms")]
    pub settle_delay_ms: u64,
}

fn default_guard_steps() -> i32 {
    100
}

fn default_guard_settle_ms() -> u64 {
    1000
}

impl PreHomeGuard {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for PreHomeGuard {
    fn default() -> Self {
        Self {
            threshold_steps: default_guard_steps(),
            clearance_steps: default_guard_steps(),
            settle_delay_ms: default_guard_settle_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_keeps_unrelated_fields() {
        let config = HomingConfig {
            fast_home: 20,
            slow_home: 20,
            home_delta: -8,
            micro_home_delta: -227,
            home_flags: 114,
            guard: Some(PreHomeGuard::default()),
        };
        let mut settings = HomeSettings {
            micro_fast_home: 7,
            ..HomeSettings::default()
        };
        config.apply(&mut settings);

        assert_eq!(settings.fast_home, 20);
        assert_eq!(settings.micro_fast_home, 0);
        assert_eq!(settings.home_delta, -8);
        assert_eq!(settings.micro_home_delta, -227);
        assert_eq!(settings.home_flags, 114);
    }
}
