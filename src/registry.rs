use anyhow::{bail, Result};
use tracing::{error, info, warn};

use crate::{
    axis::{Axis, AxisConfig},
    driver::DriverBackend,
};

pub struct AxisRegistry {
    axes: Vec<Axis>,
}

impl AxisRegistry {
    pub fn new(axes: Vec<Axis>) -> Result<Self> {
        for (i, axis) in axes.iter().enumerate() {
            if axes[..i].iter().any(|other| other.slot() == axis.slot()) {
                bail!("Duplicate axis slot: {}", axis.slot());
            }
        }
        Ok(Self { axes })
    }

    pub async fn open(backend: &dyn DriverBackend, configs: &[AxisConfig]) -> Result<Self> {
        let devices = backend.enumerate().await?;
        info!("Number of devices = {}", devices.len());
        for device in &devices {
            info!("Found device: {}", device);
        }

        let mut axes = Vec::with_capacity(configs.len());
        let mut missing = Vec::new();
        for config in configs {
            let Some(device) = devices.iter().find(|d| d.contains(&config.serial)) else {
                error!("{} ({}) not found", config.name, config.serial);
                missing.push(config.name.clone());
                continue;
            };

            match backend.open(device).await {
                Ok(driver) => {
                    info!("Axis {} bound to {} ({})", config.slot, device, config.name);
                    axes.push(Axis::new(config.clone(), driver));
                }
                Err(e) => {
                    error!("{} connection failed: {}", config.name, e);
                    missing.push(config.name.clone());
                }
            }
        }

        if !missing.is_empty() {
            let registry = Self { axes };
            registry.close_all().await;
            bail!("Not all devices are available: {}", missing.join(", "));
        }

        Self::new(axes)
    }

    pub fn get(&self, slot: char) -> Option<&Axis> {
        self.axes.iter().find(|a| a.slot() == slot)
    }

    pub fn contains(&self, slot: char) -> bool {
        self.get(slot).is_some()
    }

    pub fn slots(&self) -> Vec<char> {
        self.axes.iter().map(|a| a.slot()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Axis> {
        self.axes.iter()
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    pub async fn close_all(&self) {
        for axis in &self.axes {
            if let Err(e) = axis.close().await {
                warn!("Failed to close axis {}: {}", axis.slot(), e);
            }
        }
    }
}
