use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::{DeviceCore, MirroredDevice, UNIT_MILEAGE};
use crate::error::Result;
use crate::registry::{DeviceRegistry, DeviceSpec, DeviceType, parse_stored_u64};
use crate::vehicle::VehicleStatus;

/// Odometer mirrored as an incremental counter.
///
/// Only the increase since the last published reading is sent. A reading
/// below the last one is noise and never produces a negative delta.
pub struct Mileage {
    core: DeviceCore,
    last_mileage: u64,
}

impl Mileage {
    pub fn new(interval: Duration) -> Self {
        let spec = DeviceSpec {
            unit: UNIT_MILEAGE,
            name: "Mileage".to_string(),
            device_type: DeviceType::IncrementalCounter {
                unit: "km".to_string(),
            },
            description: "Counter to hold the overall mileage".to_string(),
            image: None,
        };
        Self {
            core: DeviceCore::new(spec, interval),
            last_mileage: 0,
        }
    }

    pub fn last_mileage(&self) -> u64 {
        self.last_mileage
    }

    fn reading(status: &VehicleStatus) -> Option<u64> {
        status.odometer.and_then(|o| o.mileage)
    }
}

#[async_trait]
impl MirroredDevice for Mileage {
    fn core(&self) -> &DeviceCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DeviceCore {
        &mut self.core
    }

    fn seed(&mut self, stored: &str) {
        self.last_mileage = parse_stored_u64(stored);
    }

    async fn create(
        &mut self,
        status: &VehicleStatus,
        registry: &dyn DeviceRegistry,
    ) -> Result<()> {
        if Self::reading(status).is_some() {
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
        let Some(mileage) = Self::reading(status) else {
            return Ok(false);
        };
        let delta = mileage.saturating_sub(self.last_mileage);
        if delta == 0 && !self.requires_refresh(now) {
            return Ok(false);
        }
        self.core
            .publish(registry, 0, &delta.to_string(), now)
            .await?;
        self.last_mileage = self.last_mileage.max(mileage);
        Ok(true)
    }
}
