use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use super::{DeviceCore, MirroredDevice, UNIT_ADDRESS, same_position};
use crate::error::Result;
use crate::geocode::Geocoder;
use crate::registry::{DeviceRegistry, DeviceSpec, DeviceType};
use crate::vehicle::VehicleStatus;

/// Postal address of the parking spot, looked up only when the car moved or
/// the refresh interval elapsed.
pub struct ParkingAddress {
    core: DeviceCore,
    geocoder: Arc<dyn Geocoder>,
    last_position: Option<(f64, f64)>,
}

impl ParkingAddress {
    pub fn new(geocoder: Arc<dyn Geocoder>, interval: Duration) -> Self {
        let spec = DeviceSpec {
            unit: UNIT_ADDRESS,
            name: "Parking address".to_string(),
            device_type: DeviceType::Text,
            description: "The address where the car is parked".to_string(),
            image: None,
        };
        Self {
            core: DeviceCore::new(spec, interval),
            geocoder,
            last_position: None,
        }
    }
}

#[async_trait]
impl MirroredDevice for ParkingAddress {
    fn core(&self) -> &DeviceCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DeviceCore {
        &mut self.core
    }

    async fn create(
        &mut self,
        status: &VehicleStatus,
        registry: &dyn DeviceRegistry,
    ) -> Result<()> {
        if status.parking.is_some() {
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
        let Some(parking) = status.parking else {
            return Ok(false);
        };
        let position = (parking.latitude, parking.longitude);
        if same_position(self.last_position, position) && !self.requires_refresh(now) {
            return Ok(false);
        }
        // Retried on the next poll when the lookup fails
        let Some(address) = self.geocoder.reverse(position.0, position.1).await else {
            return Ok(false);
        };
        self.core.publish(registry, 0, &address, now).await?;
        self.last_position = Some(position);
        Ok(true)
    }
}
