use std::fmt;

use crate::driver::{DeviceStatus, MVCMD_HOME};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Idle,
    Busy,
    Homing,
}

impl MotionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, MotionState::Idle)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MotionState::Idle => "IDLE",
            MotionState::Busy => "BUSY",
            MotionState::Homing => "HOMING",
        }
    }
}

impl From<DeviceStatus> for MotionState {
    fn from(status: DeviceStatus) -> Self {
        if !status.is_running() {
            MotionState::Idle
        } else if status.last_command() == MVCMD_HOME {
            MotionState::Homing
        } else {
            MotionState::Busy
        }
    }
}

impl fmt::Display for MotionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MVCMD_MOVE, MVCMD_RUNNING, MVCMD_SSTP};

    fn status(move_cmd_state: u32) -> DeviceStatus {
        DeviceStatus {
            move_cmd_state,
            flags: 0,
        }
    }

    #[test]
    fn test_state_from_motion_command_word() {
        assert_eq!(MotionState::from(status(0)), MotionState::Idle);
        assert_eq!(MotionState::from(status(MVCMD_SSTP)), MotionState::Idle);
        assert_eq!(
            MotionState::from(status(MVCMD_RUNNING | MVCMD_MOVE)),
            MotionState::Busy
        );
        assert_eq!(
            MotionState::from(status(MVCMD_RUNNING | MVCMD_HOME)),
            MotionState::Homing
        );
    }
}
