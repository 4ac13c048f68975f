use std::{collections::HashSet, sync::Arc, time::Duration};

use tokio::{sync::Mutex, time::Instant};
use tracing::debug;

use super::{
    DeviceStatus, DriverBackend, DriverError, DriverResult, HomeSettings, MoveSettings,
    RawPosition, StageDriver, MVCMD_HOME, MVCMD_MOVE, MVCMD_RUNNING, MVCMD_SSTP,
};

const SIM_FAILURE_CODE: i32 = -1;

#[derive(Debug, Clone, Copy)]
struct Motion {
    command: u32,
    start: f64,
    target: f64,
    started: Instant,
}

#[derive(Debug)]
struct SimDevice {
    position: f64,
    motion: Option<Motion>,
    last_command: u32,
    move_settings: MoveSettings,
    home_settings: HomeSettings,
    moves: Vec<(i32, i16)>,
    home_count: usize,
    zero_count: usize,
    failing: HashSet<&'static str>,
    closed: bool,
}

impl SimDevice {
    fn settle(&mut self, motion_time: Duration) {
        if let Some(motion) = self.motion {
            if motion.started.elapsed() >= motion_time {
                self.position = motion.target;
                self.motion = None;
            }
        }
    }

    fn progress(&self, motion_time: Duration) -> f64 {
        match self.motion {
            Some(motion) if !motion_time.is_zero() => {
                let fraction =
                    (motion.started.elapsed().as_secs_f64() / motion_time.as_secs_f64()).min(1.0);
                motion.start + (motion.target - motion.start) * fraction
            }
            Some(motion) => motion.target,
            None => self.position,
        }
    }
}

/// In-memory stand-in for a vendor motor controller. Cloning shares the
/// device, so a test can keep a handle while the axis owns another.
#[derive(Clone)]
pub struct SimulatedDriver {
    name: String,
    motion_time: Duration,
    encoder_per_step: f64,
    device: Arc<Mutex<SimDevice>>,
}

impl SimulatedDriver {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            motion_time: Duration::ZERO,
            encoder_per_step: 1.0,
            device: Arc::new(Mutex::new(SimDevice {
                position: 0.0,
                motion: None,
                last_command: 0,
                move_settings: MoveSettings {
                    speed: 1000,
                    micro_speed: 0,
                    accel: 1000,
                    decel: 1000,
                },
                home_settings: HomeSettings::default(),
                moves: Vec::new(),
                home_count: 0,
                zero_count: 0,
                failing: HashSet::new(),
                closed: false,
            })),
        }
    }

    pub fn with_motion_time(mut self, motion_time: Duration) -> Self {
        self.motion_time = motion_time;
        self
    }

    pub fn with_encoder_ratio(mut self, encoder_per_step: f64) -> Self {
        self.encoder_per_step = encoder_per_step;
        self
    }

    pub async fn set_position(&self, steps: f64) {
        let mut device = self.device.lock().await;
        device.motion = None;
        device.position = steps;
    }

    pub async fn commanded_moves(&self) -> Vec<(i32, i16)> {
        self.device.lock().await.moves.clone()
    }

    pub async fn home_count(&self) -> usize {
        self.device.lock().await.home_count
    }

    pub async fn zero_count(&self) -> usize {
        self.device.lock().await.zero_count
    }

    pub async fn is_closed(&self) -> bool {
        self.device.lock().await.closed
    }

    pub async fn fail(&self, operation: &'static str) {
        self.device.lock().await.failing.insert(operation);
    }

    pub async fn recover(&self, operation: &'static str) {
        self.device.lock().await.failing.remove(operation);
    }

    fn check(device: &SimDevice, operation: &'static str) -> DriverResult<()> {
        if device.failing.contains(operation) {
            return Err(DriverError::new(operation, SIM_FAILURE_CODE));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl StageDriver for SimulatedDriver {
    fn device_name(&self) -> &str {
        &self.name
    }

    async fn get_status(&self) -> DriverResult<DeviceStatus> {
        let mut device = self.device.lock().await;
        Self::check(&device, "get_status")?;
        device.settle(self.motion_time);

        let mut move_cmd_state = device.last_command;
        if device.motion.is_some() {
            move_cmd_state |= MVCMD_RUNNING;
        }
        Ok(DeviceStatus {
            move_cmd_state,
            flags: 0,
        })
    }

    async fn get_position(&self) -> DriverResult<RawPosition> {
        let mut device = self.device.lock().await;
        Self::check(&device, "get_position")?;
        device.settle(self.motion_time);

        let position = device.progress(self.motion_time);
        let steps = position.trunc();
        let microsteps = (position.fract() * 256.0).trunc();
        Ok(RawPosition {
            steps: steps as i32,
            microsteps: microsteps as i16,
            encoder: (position * self.encoder_per_step).round() as i64,
        })
    }

    async fn get_move_settings(&self) -> DriverResult<MoveSettings> {
        let device = self.device.lock().await;
        Self::check(&device, "get_move_settings")?;
        Ok(device.move_settings)
    }

    async fn set_move_settings(&self, settings: MoveSettings) -> DriverResult<()> {
        let mut device = self.device.lock().await;
        Self::check(&device, "set_move_settings")?;
        device.move_settings = settings;
        Ok(())
    }

    async fn command_move(&self, steps: i32, microsteps: i16) -> DriverResult<()> {
        let mut device = self.device.lock().await;
        Self::check(&device, "command_move")?;
        device.settle(self.motion_time);

        debug!(device = %self.name, steps, microsteps, "simulated move");
        let start = device.progress(self.motion_time);
        device.moves.push((steps, microsteps));
        device.last_command = MVCMD_MOVE;
        device.motion = Some(Motion {
            command: MVCMD_MOVE,
            start,
            target: steps as f64 + microsteps as f64 / 256.0,
            started: Instant::now(),
        });
        device.settle(self.motion_time);
        Ok(())
    }

    async fn command_home_zero(&self) -> DriverResult<()> {
        let mut device = self.device.lock().await;
        Self::check(&device, "command_homezero")?;
        device.settle(self.motion_time);

        let start = device.progress(self.motion_time);
        device.home_count += 1;
        device.last_command = MVCMD_HOME;
        device.motion = Some(Motion {
            command: MVCMD_HOME,
            start,
            target: 0.0,
            started: Instant::now(),
        });
        device.settle(self.motion_time);
        Ok(())
    }

    async fn command_soft_stop(&self) -> DriverResult<()> {
        let mut device = self.device.lock().await;
        Self::check(&device, "command_sstp")?;

        let position = device.progress(self.motion_time);
        if let Some(motion) = device.motion.take() {
            debug!(device = %self.name, command = motion.command, "simulated soft stop");
        }
        device.position = position;
        device.last_command = MVCMD_SSTP;
        Ok(())
    }

    async fn command_zero(&self) -> DriverResult<()> {
        let mut device = self.device.lock().await;
        Self::check(&device, "command_zero")?;
        device.settle(self.motion_time);
        device.zero_count += 1;
        device.position = 0.0;
        if let Some(motion) = device.motion.as_mut() {
            motion.target -= motion.start;
            motion.start = 0.0;
        }
        Ok(())
    }

    async fn get_home_settings(&self) -> DriverResult<HomeSettings> {
        let device = self.device.lock().await;
        Self::check(&device, "get_home_settings")?;
        Ok(device.home_settings)
    }

    async fn set_home_settings(&self, settings: HomeSettings) -> DriverResult<()> {
        let mut device = self.device.lock().await;
        Self::check(&device, "set_home_settings")?;
        device.home_settings = settings;
        Ok(())
    }

    async fn close(&self) -> DriverResult<()> {
        self.device.lock().await.closed = true;
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct SimulatedBackend {
    devices: Vec<SimulatedDriver>,
}

impl SimulatedBackend {
    pub fn new(devices: Vec<SimulatedDriver>) -> Self {
        Self { devices }
    }

    pub fn with_serials<'a>(serials: impl IntoIterator<Item = &'a str>) -> Self {
        let devices = serials
            .into_iter()
            .map(|serial| SimulatedDriver::new(format!("xi-emu:///{}", serial)))
            .collect();
        Self { devices }
    }

    pub fn devices(&self) -> &[SimulatedDriver] {
        &self.devices
    }

    pub fn device(&self, serial: &str) -> Option<&SimulatedDriver> {
        self.devices.iter().find(|d| d.device_name().contains(serial))
    }
}

#[async_trait::async_trait]
impl DriverBackend for SimulatedBackend {
    async fn enumerate(&self) -> DriverResult<Vec<String>> {
        Ok(self
            .devices
            .iter()
            .map(|d| d.device_name().to_string())
            .collect())
    }

    async fn open(&self, device_name: &str) -> DriverResult<Box<dyn StageDriver>> {
        self.devices
            .iter()
            .find(|d| d.device_name() == device_name)
            .map(|d| Box::new(d.clone()) as Box<dyn StageDriver>)
            .ok_or(DriverError::new("open_device", SIM_FAILURE_CODE))
    }
}
