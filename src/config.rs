use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    axis::{
        conversion::StepPosition,
        homing::{HomingConfig, PreHomeGuard},
        soft_stops::SoftStops,
        AxisConfig,
    },
    broadcast::config::BroadcastConfig,
    dispatcher::config::{DispatcherConfig, ReplyMode},
    socket_server::config::{EmptyLinePolicy, SocketServerConfig},
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Everything a running service needs. Missing sections take their defaults;
/// a file without `[[axes]]` serves the four-axis deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: SocketServerConfig,
    pub broadcast: BroadcastConfig,
    pub dispatcher: DispatcherConfig,
    pub axes: Vec<AxisConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Preset::FourAxis.config()
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.axes.is_empty() {
            return Err(ConfigError::Invalid("no axes configured".to_string()));
        }
        for (i, axis) in self.axes.iter().enumerate() {
            if !axis.slot.is_ascii_lowercase() {
                return Err(ConfigError::Invalid(format!(
                    "axis slot '{}' must be a lowercase letter",
                    axis.slot
                )));
            }
            if self.axes[..i].iter().any(|other| other.slot == axis.slot) {
                return Err(ConfigError::Invalid(format!(
                    "axis slot '{}' is configured twice",
                    axis.slot
                )));
            }
            if !axis.conversion_factor.is_finite() || axis.conversion_factor <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "axis {}: conversion factor must be positive, got {}",
                    axis.slot, axis.conversion_factor
                )));
            }
            if !axis.soft_stops.is_valid() {
                return Err(ConfigError::Invalid(format!(
                    "axis {}: soft stops [{}, {}] are not a range",
                    axis.slot, axis.soft_stops.min, axis.soft_stops.max
                )));
            }
            let factor = axis.conversion_factor;
            let stops = [axis.soft_stops.min, axis.soft_stops.max];
            if stops
                .iter()
                .any(|&stop| StepPosition::from_physical(stop, factor).is_none())
            {
                return Err(ConfigError::Invalid(format!(
                    "axis {}: soft stops [{}, {}] exceed the controller's step range at factor {}",
                    axis.slot, axis.soft_stops.min, axis.soft_stops.max, factor
                )));
            }
        }
        if self.server.max_line_length == 0 {
            return Err(ConfigError::Invalid(
                "server.max_line_length must be positive".to_string(),
            ));
        }
        if self.broadcast.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "broadcast.queue_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    FourAxis,
    LegacyRtz,
}

impl Preset {
    pub fn config(self) -> Config {
        match self {
            Preset::FourAxis => Config {
                server: SocketServerConfig::default(),
                broadcast: BroadcastConfig::default(),
                dispatcher: DispatcherConfig::default(),
                axes: vec![
                    axis(
                        'a',
                        "Corrector Rotary",
                        "4A291",
                        "deg",
                        0.00075,
                        (-180.0, 0.0),
                        homing(100, 900, 0, None),
                    ),
                    axis(
                        'b',
                        "AOI Rotary",
                        "4A321",
                        "deg",
                        0.00075,
                        (-45.0, 45.0),
                        homing(100, -2900, 0, None),
                    ),
                    axis(
                        'c',
                        "DMD Linear",
                        "4A221",
                        "mm",
                        0.00025,
                        (0.0, 100.0),
                        homing(100, 500, 0, None),
                    ),
                    axis(
                        'd',
                        "DMD Rotary",
                        "4A0C1",
                        "deg",
                        0.0005,
                        (0.0, 180.0),
                        homing(100, -1300, 0, Some(PreHomeGuard::default())),
                    ),
                ],
            },
            Preset::LegacyRtz => {
                let mut theta = axis(
                    't',
                    "Theta",
                    "3F53",
                    "deg",
                    0.144,
                    (-180.0, 180.0),
                    homing(20, -8, -227, Some(PreHomeGuard::default())),
                );
                theta.invert_encoder = true;
                theta.homing.home_flags = 114;

                Config {
                    server: SocketServerConfig {
                        port: 9997,
                        empty_line: EmptyLinePolicy::Disconnect,
                        ..SocketServerConfig::default()
                    },
                    broadcast: BroadcastConfig {
                        enabled: false,
                        ..BroadcastConfig::default()
                    },
                    dispatcher: DispatcherConfig {
                        reply_mode: ReplyMode::WaitForIdle,
                        broadcast_status: false,
                        ..DispatcherConfig::default()
                    },
                    axes: vec![
                        axis(
                            'r',
                            "Radial",
                            "49E5",
                            "mm",
                            0.025,
                            (0.0, 340.0),
                            homing(100, 340, 190, None),
                        ),
                        theta,
                        axis(
                            'z',
                            "Vertical",
                            "49F3",
                            "mm",
                            0.00125,
                            (-12.5, 12.5),
                            homing(500, 10590, 0, None),
                        ),
                    ],
                }
            }
        }
    }
}

const DEFAULT_HOME_FLAGS: u32 = 370;

fn axis(
    slot: char,
    name: &str,
    serial: &str,
    units: &str,
    conversion_factor: f64,
    (min, max): (f64, f64),
    homing: HomingConfig,
) -> AxisConfig {
    AxisConfig {
        slot,
        name: name.to_string(),
        serial: serial.to_string(),
        units: units.to_string(),
        conversion_factor,
        soft_stops: SoftStops::new(min, max),
        invert_encoder: false,
        homing,
    }
}

fn homing(
    speed: u32,
    home_delta: i32,
    micro_home_delta: i16,
    guard: Option<PreHomeGuard>,
) -> HomingConfig {
    HomingConfig {
        fast_home: speed,
        slow_home: speed,
        home_delta,
        micro_home_delta,
        home_flags: DEFAULT_HOME_FLAGS,
        guard,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_empty_file_is_the_four_axis_deployment() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Preset::FourAxis.config());
        assert_eq!(config.server.port, 1024);
        assert_eq!(
            config.axes.iter().map(|a| a.slot).collect::<Vec<_>>(),
            vec!['a', 'b', 'c', 'd']
        );
        assert_eq!(config.axes[1].homing.home_delta, -2900);
        assert!(config.axes[3].homing.guard.is_some());
    }

    #[test]
    fn test_legacy_preset() {
        let config = Preset::LegacyRtz.config();
        config.validate().unwrap();
        assert_eq!(config.server.port, 9997);
        assert_eq!(config.server.empty_line, EmptyLinePolicy::Disconnect);
        assert_eq!(config.dispatcher.reply_mode, ReplyMode::WaitForIdle);

        let theta = &config.axes[1];
        assert_eq!(theta.slot, 't');
        assert!(theta.invert_encoder);
        assert_eq!(theta.homing.micro_home_delta, -227);
        assert_eq!(theta.homing.home_flags, 114);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
host = "127.0.0.1"
port = 2000
empty_line = "ignore"

[broadcast]
enabled = false
target = "192.168.1.255:8888"

[dispatcher]
reply_mode = "wait_for_idle"
max_wait_ms = 5000

[[axes]]
slot = "x"
name = "Bench X"
serial = "ABC1"
units = "mm"
conversion_factor = 0.01
soft_stops = {{ min = -5.0, max = 5.0 }}

[axes.homing]
fast_home = 200
slow_home = 20
home_delta = 150
home_flags = 370

[axes.homing.guard]
threshold_steps = 50
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.bind_address(), "127.0.0.1:2000");
        assert_eq!(config.server.max_line_length, 8192);
        assert_eq!(config.server.empty_line, EmptyLinePolicy::Ignore);
        assert!(!config.broadcast.enabled);
        assert_eq!(config.broadcast.target.to_string(), "192.168.1.255:8888");
        assert_eq!(config.broadcast.tick_interval_ms, 50);
        assert_eq!(config.dispatcher.reply_mode, ReplyMode::WaitForIdle);
        assert_eq!(config.dispatcher.poll_interval_ms, 100);
        assert_eq!(config.dispatcher.max_wait_ms, 5000);

        assert_eq!(config.axes.len(), 1);
        let x = &config.axes[0];
        assert_eq!(x.slot, 'x');
        assert!(!x.invert_encoder);
        assert_eq!(x.homing.micro_home_delta, 0);
        assert_eq!(
            x.homing.guard,
            Some(PreHomeGuard {
                threshold_steps: 50,
                clearance_steps: 100,
                settle_delay_ms: 1000,
            })
        );
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load("/nonexistent/stagehand.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/stagehand.toml"));
    }

    #[test]
    fn test_validation() {
        let mut config = Preset::FourAxis.config();
        config.axes[1].slot = 'a';
        assert!(config.validate().unwrap_err().to_string().contains("twice"));

        let mut config = Preset::FourAxis.config();
        config.axes[0].slot = 'A';
        assert!(config.validate().is_err());

        let mut config = Preset::FourAxis.config();
        config.axes[2].conversion_factor = 0.0;
        assert!(config.validate().is_err());

        let mut config = Preset::FourAxis.config();
        config.axes[2].soft_stops = SoftStops::new(10.0, 10.0);
        assert!(config.validate().is_err());

        let mut config = Preset::FourAxis.config();
        config.axes[0].conversion_factor = 1e-9;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("axis a"));
        assert!(err.contains("step range"));

        let mut config = Preset::FourAxis.config();
        config.axes[2].soft_stops = SoftStops::new(0.0, 1e9);
        assert!(config.validate().is_err());

        let config = Config {
            axes: Vec::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        assert!(matches!(
            Config::from_toml("[server]\nport = \"high\""),
            Err(ConfigError::Toml(_))
        ));
    }
}
