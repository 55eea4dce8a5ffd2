use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::{DeviceCore, MirroredDevice, UNIT_FUEL};
use crate::error::Result;
use crate::registry::{DeviceRegistry, DeviceSpec, DeviceType, format_decimal, parse_stored_f64};
use crate::vehicle::VehicleStatus;

/// Fuel tank filling in percent
pub struct FuelLevel {
    core: DeviceCore,
    last_fuel: Option<f64>,
}

impl FuelLevel {
    pub fn new(interval: Duration) -> Self {
        let spec = DeviceSpec {
            unit: UNIT_FUEL,
            name: "Fuel level".to_string(),
            device_type: DeviceType::Percentage,
            description: "The filled percentage of the fuel tank".to_string(),
            image: Some("ToyotaFuelMeter".to_string()),
        };
        Self {
            core: DeviceCore::new(spec, interval),
            last_fuel: None,
        }
    }

    fn reading(status: &VehicleStatus) -> Option<f64> {
        status.odometer.and_then(|o| o.fuel_percent)
    }
}

#[async_trait]
impl MirroredDevice for FuelLevel {
    fn core(&self) -> &DeviceCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DeviceCore {
        &mut self.core
    }

    fn seed(&mut self, stored: &str) {
        self.last_fuel = Some(parse_stored_f64(stored));
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
        let Some(fuel) = Self::reading(status) else {
            return Ok(false);
        };
        let changed = self.last_fuel != Some(fuel);
        if !changed && !self.requires_refresh(now) {
            return Ok(false);
        }
        self.core
            .publish(registry, fuel.trunc() as i64, &format_decimal(fuel), now)
            .await?;
        self.last_fuel = Some(fuel);
        Ok(true)
    }
}
