pub mod conversion;
pub mod error;
pub mod homing;
pub mod soft_stops;
pub mod state;
pub mod state_info;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::driver::{MoveSettings, StageDriver};
use conversion::{join_speed, split_speed, StepPosition};
use error::AxisError;
use homing::HomingConfig;
use soft_stops::SoftStops;
use state::MotionState;
use state_info::AxisStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    pub slot: char,
    pub name: String,
    /// Substring of the enumerated device name this axis binds to.
    pub serial: String,
    pub units: String,
    /// Physical units per step.
    pub conversion_factor: f64,
    pub soft_stops: SoftStops,
    #[serde(default)]
    pub invert_encoder: bool,
    pub homing: HomingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub settle_delay: Duration,
    pub poll_interval: Duration,
    pub max_wait: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(1000),
            poll_interval: Duration::from_millis(100),
            max_wait: Duration::from_secs(120),
        }
    }
}

pub struct Axis {
    config: AxisConfig,
    driver: Box<dyn StageDriver>,
}

impl Axis {
    pub fn new(config: AxisConfig, driver: Box<dyn StageDriver>) -> Self {
        Self { config, driver }
    }

    pub fn slot(&self) -> char {
        self.config.slot
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn units(&self) -> &str {
        &self.config.units
    }

    pub fn config(&self) -> &AxisConfig {
        &self.config
    }

    pub fn device_name(&self) -> &str {
        self.driver.device_name()
    }

    pub async fn move_status(&self) -> Result<MotionState, AxisError> {
        let status = self.driver.get_status().await?;
        Ok(MotionState::from(status))
    }

    pub async fn step_position(&self) -> Result<StepPosition, AxisError> {
        let raw = self.driver.get_position().await?;
        Ok(StepPosition::from(raw))
    }

    pub async fn position(&self) -> Result<(f64, i64), AxisError> {
        let raw = self.driver.get_position().await?;
        let physical = StepPosition::from(raw).to_physical(self.config.conversion_factor);
        let encoder = if self.config.invert_encoder {
            -raw.encoder
        } else {
            raw.encoder
        };
        Ok((physical, encoder))
    }

    pub async fn status(&self) -> Result<AxisStatus, AxisError> {
        let state = self.move_status().await?;
        let (position, encoder) = self.position().await?;
        Ok(AxisStatus::new(state, position, encoder))
    }

    pub async fn speed(&self) -> Result<f64, AxisError> {
        let settings = self.driver.get_move_settings().await?;
        Ok(join_speed(
            settings.speed,
            settings.micro_speed,
            self.config.conversion_factor,
        ))
    }

    pub async fn goto_real(&self, target: f64) -> Result<StepPosition, AxisError> {
        self.check_limits(target)?;
        let steps = self.to_steps(target / self.config.conversion_factor, target)?;
        self.ensure_idle().await?;

        debug!(axis = %self.config.slot, target, ?steps, "goto");
        self.driver.command_move(steps.steps, steps.microsteps).await?;
        Ok(steps)
    }

    pub async fn offset_real(&self, delta: f64) -> Result<StepPosition, AxisError> {
        self.ensure_idle().await?;

        let current = self.step_position().await?;
        let factor = self.config.conversion_factor;
        let target = current.to_physical(factor) + delta;
        self.check_limits(target)?;

        let steps = self.to_steps(current.as_steps() + delta / factor, target)?;
        debug!(axis = %self.config.slot, delta, ?steps, "offset");
        self.driver.command_move(steps.steps, steps.microsteps).await?;
        Ok(steps)
    }

    pub async fn set_speed_real(&self, speed: f64) -> Result<MoveSettings, AxisError> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(AxisError::InvalidSpeed(speed));
        }

        let (whole, micro) = split_speed(speed, self.config.conversion_factor).ok_or_else(|| {
            AxisError::OutOfRange {
                value: speed,
                units: format!("{}/s", self.config.units),
            }
        })?;
        let mut settings = self.driver.get_move_settings().await?;
        settings.speed = whole;
        settings.micro_speed = micro;
        self.driver.set_move_settings(settings).await?;
        Ok(settings)
    }

    /// Writes the axis homing constants and starts homing. Returns once the
    /// controller accepted the home command, not when homing has finished.
    pub async fn home(&self, wait: &WaitPolicy) -> Result<(), AxisError> {
        self.ensure_idle().await?;

        if let Some(guard) = self.config.homing.guard {
            let current = self.step_position().await?;
            if current.as_steps() <= guard.threshold_steps as f64 {
                info!(
                    axis = %self.config.slot,
                    position = current.as_steps(),
                    "moving clear of the limit switch before homing"
                );
                self.driver.command_move(guard.clearance_steps, 0).await?;
                let guard_wait = WaitPolicy {
                    settle_delay: guard.settle_delay(),
                    ..*wait
                };
                self.wait_until_idle(&guard_wait).await?;
            }
        }

        let mut settings = self.driver.get_home_settings().await?;
        self.config.homing.apply(&mut settings);
        self.driver.set_home_settings(settings).await?;
        self.driver.command_home_zero().await?;
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), AxisError> {
        self.driver.command_soft_stop().await?;
        Ok(())
    }

    pub async fn set_zero(&self) -> Result<(), AxisError> {
        self.driver.command_zero().await?;
        Ok(())
    }

    pub async fn wait_until_idle(&self, wait: &WaitPolicy) -> Result<(), AxisError> {
        let polling = async {
            tokio::time::sleep(wait.settle_delay).await;
            while !self.move_status().await?.is_idle() {
                tokio::time::sleep(wait.poll_interval).await;
            }
            Ok::<(), AxisError>(())
        };

        match tokio::time::timeout(wait.max_wait, polling).await {
            Ok(result) => result,
            Err(_) => Err(AxisError::Timeout(wait.max_wait)),
        }
    }

    pub async fn close(&self) -> Result<(), AxisError> {
        self.driver.close().await?;
        Ok(())
    }

    fn check_limits(&self, target: f64) -> Result<(), AxisError> {
        let stops = self.config.soft_stops;
        if stops.contains(target) {
            return Ok(());
        }
        Err(AxisError::OutOfLimits {
            target,
            min: stops.min,
            max: stops.max,
            units: self.config.units.clone(),
        })
    }

    fn to_steps(&self, steps: f64, value: f64) -> Result<StepPosition, AxisError> {
        StepPosition::from_steps(steps).ok_or_else(|| AxisError::OutOfRange {
            value,
            units: self.config.units.clone(),
        })
    }

    async fn ensure_idle(&self) -> Result<(), AxisError> {
        match self.move_status().await? {
            MotionState::Idle => Ok(()),
            other => Err(AxisError::Busy(other)),
        }
    }
}
