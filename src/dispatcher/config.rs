use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::axis::WaitPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyMode {
    #[default]
    Immediate,
    WaitForIdle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub reply_mode: ReplyMode,
    pub poll_interval_ms: u64,
    pub settle_delay_ms: u64,
    pub max_wait_ms: u64,
    pub broadcast_status: bool,
}

impl DispatcherConfig {
    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_wait: Duration::from_millis(self.max_wait_ms),
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            reply_mode: ReplyMode::Immediate,
            poll_interval_ms: 100,
            settle_delay_ms: 1500,
            max_wait_ms: 120_000,
            broadcast_status: true,
        }
    }
}
