use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::{DeviceCore, MirroredDevice, UNIT_DISTANCE, same_position};
use crate::config::HomeCoordinates;
use crate::error::Result;
use crate::geocode::{distance_km, round_to_meters};
use crate::registry::{DeviceRegistry, DeviceSpec, DeviceType};
use crate::vehicle::VehicleStatus;

/// Great-circle distance between the parked car and home, in km.
///
/// Disabled entirely when no home location is configured.
pub struct DistanceToHome {
    core: DeviceCore,
    home: Option<HomeCoordinates>,
    last_position: Option<(f64, f64)>,
}

impl DistanceToHome {
    pub fn new(home: Option<HomeCoordinates>, interval: Duration) -> Self {
        let spec = DeviceSpec {
            unit: UNIT_DISTANCE,
            name: "Distance to home".to_string(),
            device_type: DeviceType::CustomSensor {
                unit: "km".to_string(),
            },
            description: "The distance between home and the car".to_string(),
            image: None,
        };
        Self {
            core: DeviceCore::new(spec, interval),
            home,
            last_position: None,
        }
    }
}

#[async_trait]
impl MirroredDevice for DistanceToHome {
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
        if self.home.is_some() && status.parking.is_some() {
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
        let (Some(home), Some(parking)) = (self.home, status.parking) else {
            return Ok(false);
        };
        if !self.exists() {
            return Ok(false);
        }
        let position = (parking.latitude, parking.longitude);
        if same_position(self.last_position, position) && !self.requires_refresh(now) {
            return Ok(false);
        }
        let distance = round_to_meters(distance_km((home.latitude, home.longitude), position));
        self.core
            .publish(registry, 0, &distance.to_string(), now)
            .await?;
        self.last_position = Some(position);
        Ok(true)
    }
}
