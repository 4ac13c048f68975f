use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyLinePolicy {
    #[default]
    Dispatch,
    Ignore,
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketServerConfig {
    pub host: String,
    pub port: u16,
    pub max_line_length: usize,
    pub empty_line: EmptyLinePolicy,
}

impl SocketServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for SocketServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 1024,
            max_line_length: 8192,
            empty_line: EmptyLinePolicy::Dispatch,
        }
    }
}
