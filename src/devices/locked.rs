use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::{DeviceCore, MirroredDevice, UNIT_LOCKED};
use crate::error::Result;
use crate::registry::{DeviceRegistry, DeviceSpec, DeviceType};
use crate::vehicle::VehicleStatus;

/// Whether every door of the car is locked (1) or not (0)
pub struct LockedState {
    core: DeviceCore,
    last_locked: Option<bool>,
}

impl LockedState {
    pub fn new(interval: Duration) -> Self {
        let spec = DeviceSpec {
            unit: UNIT_LOCKED,
            name: "Locked".to_string(),
            device_type: DeviceType::Switch,
            description: "The locked/unlocked state of the car".to_string(),
            image: Some("ToyotaLocked".to_string()),
        };
        Self {
            core: DeviceCore::new(spec, interval),
            last_locked: None,
        }
    }
}

#[async_trait]
impl MirroredDevice for LockedState {
    fn core(&self) -> &DeviceCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DeviceCore {
        &mut self.core
    }

    fn seed(&mut self, stored: &str) {
        self.last_locked = match stored.trim() {
            "1" => Some(true),
            "0" => Some(false),
            _ => None,
        };
    }

    async fn create(
        &mut self,
        status: &VehicleStatus,
        registry: &dyn DeviceRegistry,
    ) -> Result<()> {
        // Some models do not report door locks at all
        if status.doors.is_some_and(|d| d.has_any_reading()) {
            self.core.register(registry).await?;
        }
        Ok(())
    }

    async fn update(
        &mut self,
        status: &VehicleStatus,
        registry: &dyn DeviceRegistry,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if !self.exists() {
            return Ok(false);
        }
        let Some(doors) = status.doors else {
            return Ok(false);
        };
        let locked = doors.all_locked();
        if self.last_locked == Some(locked) && !self.requires_refresh(now) {
            return Ok(false);
        }
        let state = i64::from(locked);
        self.core
            .publish(registry, state, &state.to_string(), now)
            .await?;
        self.last_locked = Some(locked);
        Ok(true)
    }
}
