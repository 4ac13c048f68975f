pub mod sim;

use thiserror::Error;

/// Low six bits of the motion-command word: the last command issued.
pub const MVCMD_NAME_BITS: u32 = 0x3F;
pub const MVCMD_MOVE: u32 = 0x01;
pub const MVCMD_HOME: u32 = 0x06;
pub const MVCMD_SSTP: u32 = 0x08;
pub const MVCMD_RUNNING: u32 = 0x80;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation}() failed (result {code})")]
pub struct DriverError {
    pub operation: &'static str,
    pub code: i32,
}

impl DriverError {
    pub fn new(operation: &'static str, code: i32) -> Self {
        Self { operation, code }
    }
}

pub type DriverResult<T> = Result<T, DriverError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceStatus {
    pub move_cmd_state: u32,
    pub flags: u32,
}

impl DeviceStatus {
    pub fn is_running(&self) -> bool {
        self.move_cmd_state & MVCMD_RUNNING != 0
    }

    pub fn last_command(&self) -> u32 {
        self.move_cmd_state & MVCMD_NAME_BITS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawPosition {
    pub steps: i32,
    pub microsteps: i16,
    pub encoder: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveSettings {
    pub speed: u32,
    pub micro_speed: u8,
    pub accel: u16,
    pub decel: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HomeSettings {
    pub fast_home: u32,
    pub micro_fast_home: u8,
    pub slow_home: u32,
    pub micro_slow_home: u8,
    pub home_delta: i32,
    pub micro_home_delta: i16,
    pub home_flags: u32,
}

/// One opened motor controller. Every call maps to a single vendor library
/// call and only reports success or failure.
#[async_trait::async_trait]
pub trait StageDriver: Send + Sync {
    fn device_name(&self) -> &str;

    async fn get_status(&self) -> DriverResult<DeviceStatus>;
    async fn get_position(&self) -> DriverResult<RawPosition>;

    async fn get_move_settings(&self) -> DriverResult<MoveSettings>;
    async fn set_move_settings(&self, settings: MoveSettings) -> DriverResult<()>;

    async fn command_move(&self, steps: i32, microsteps: i16) -> DriverResult<()>;
    async fn command_home_zero(&self) -> DriverResult<()>;
    async fn command_soft_stop(&self) -> DriverResult<()>;
    async fn command_zero(&self) -> DriverResult<()>;

    async fn get_home_settings(&self) -> DriverResult<HomeSettings>;
    async fn set_home_settings(&self, settings: HomeSettings) -> DriverResult<()>;

    async fn close(&self) -> DriverResult<()> {
        Ok(())
    }
}

#[async_trait::async_trait]
pub trait DriverBackend: Send + Sync {
    async fn enumerate(&self) -> DriverResult<Vec<String>>;
    async fn open(&self, device_name: &str) -> DriverResult<Box<dyn StageDriver>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_bit_and_command_name() {
        let status = DeviceStatus {
            move_cmd_state: MVCMD_RUNNING | MVCMD_HOME,
            flags: 0,
        };
        assert!(status.is_running());
        assert_eq!(status.last_command(), MVCMD_HOME);

        let done = DeviceStatus {
            move_cmd_state: MVCMD_MOVE,
            flags: 0,
        };
        assert!(!done.is_running());
    }

    #[test]
    fn test_driver_error_names_operation() {
        let err = DriverError::new("command_move", -1);
        assert_eq!(err.to_string(), "command_move() failed (result -1)");
    }
}
