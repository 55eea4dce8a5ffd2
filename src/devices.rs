//! Mirrored devices
//!
//! Each device mirrors one metric of the vehicle into the host registry. A
//! device registers itself lazily once the provider shows the metric exists,
//! and publishes only when its value changed, when its refresh interval
//! elapsed, or when it never published before.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::Arc;

use crate::config::HomeCoordinates;
use crate::error::Result;
use crate::geocode::Geocoder;
use crate::logging::{LogContext, get_logger_with_context};
use crate::registry::{DeviceRegistry, DeviceSpec};
use crate::vehicle::{DrivingStatistics, VehicleStatus};

mod address;
mod consumed;
mod distance;
mod fuel;
mod locked;
mod mileage;

pub use address::ParkingAddress;
pub use consumed::FuelConsumed;
pub use distance::DistanceToHome;
pub use fuel::FuelLevel;
pub use locked::LockedState;
pub use mileage::Mileage;

pub const UNIT_MILEAGE: u8 = 1;
pub const UNIT_FUEL: u8 = 2;
pub const UNIT_DISTANCE: u8 = 3;
pub const UNIT_LOCKED: u8 = 4;
pub const UNIT_ADDRESS: u8 = 5;
pub const UNIT_FUEL_CONSUMED: u8 = 6;

/// Default minimum time between two publications of an unchanged value
pub fn default_refresh_interval() -> Duration {
    Duration::hours(6)
}

/// Debounce state: when a device last published
#[derive(Debug, Clone)]
pub struct RefreshState {
    last_update: Option<DateTime<Utc>>,
    interval: Duration,
}

impl RefreshState {
    pub fn new(interval: Duration) -> Self {
        Self {
            last_update: None,
            interval,
        }
    }

    /// Never updated, or the interval elapsed since the last update
    pub fn requires_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.last_update {
            None => true,
            Some(last) => now - last > self.interval,
        }
    }

    pub fn mark_updated(&mut self, now: DateTime<Utc>) {
        self.last_update = Some(now);
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }
}

/// Registration and refresh bookkeeping shared by all device kinds
pub struct DeviceCore {
    spec: DeviceSpec,
    registered: bool,
    refresh: RefreshState,
    logger: crate::logging::StructuredLogger,
}

impl DeviceCore {
    pub fn new(spec: DeviceSpec, interval: Duration) -> Self {
        let logger = get_logger_with_context(
            LogContext::new("devices").with_field("unit", spec.unit.to_string()),
        );
        Self {
            spec,
            registered: false,
            refresh: RefreshState::new(interval),
            logger,
        }
    }

    pub fn unit(&self) -> u8 {
        self.spec.unit
    }

    pub fn spec(&self) -> &DeviceSpec {
        &self.spec
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn refresh(&self) -> &RefreshState {
        &self.refresh
    }

    /// Register with the host unless already present
    pub async fn register(&mut self, registry: &dyn DeviceRegistry) -> Result<()> {
        if self.registered {
            return Ok(());
        }
        registry.register(&self.spec).await?;
        self.registered = true;
        self.logger.info(&format!("Created device '{}'", self.spec.name));
        Ok(())
    }

    /// Publish a value and restart the refresh interval
    pub async fn publish(
        &mut self,
        registry: &dyn DeviceRegistry,
        n_value: i64,
        s_value: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        registry.publish(self.spec.unit, n_value, s_value).await?;
        self.refresh.mark_updated(now);
        self.logger.debug(&format!(
            "Published '{}' n={} s='{}'",
            self.spec.name, n_value, s_value
        ));
        Ok(())
    }

    fn set_registered(&mut self, registered: bool) {
        self.registered = registered;
    }
}

/// A metric mirrored into the host registry
#[async_trait]
pub trait MirroredDevice: Send + Sync {
    fn core(&self) -> &DeviceCore;

    fn core_mut(&mut self) -> &mut DeviceCore;

    /// Seed the last known value from what the host stored
    fn seed(&mut self, _stored: &str) {}

    fn unit(&self) -> u8 {
        self.core().unit()
    }

    fn name(&self) -> &str {
        &self.core().spec().name
    }

    /// The host device has been registered
    fn exists(&self) -> bool {
        self.core().is_registered()
    }

    fn requires_refresh(&self, now: DateTime<Utc>) -> bool {
        self.core().refresh().requires_refresh(now)
    }

    /// Pick up registration and last value left by a previous run
    async fn restore(&mut self, registry: &dyn DeviceRegistry) {
        let unit = self.unit();
        if !registry.exists(unit).await {
            return;
        }
        self.core_mut().set_registered(true);
        if let Some(stored) = registry.read_last_published(unit).await {
            self.seed(&stored);
        }
    }

    /// Register the device once the status shows the metric is available
    async fn create(&mut self, status: &VehicleStatus, registry: &dyn DeviceRegistry)
    -> Result<()>;

    /// Publish from a fresh status; returns whether anything was published
    async fn update(
        &mut self,
        status: &VehicleStatus,
        registry: &dyn DeviceRegistry,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Publish from driving statistics; most devices ignore them
    async fn update_statistics(
        &mut self,
        _stats: &DrivingStatistics,
        _today: NaiveDate,
        _registry: &dyn DeviceRegistry,
        _now: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(false)
    }
}

/// The full device set in unit order
pub fn standard_devices(
    home: Option<HomeCoordinates>,
    geocoder: Option<Arc<dyn Geocoder>>,
    interval: Duration,
) -> Vec<Box<dyn MirroredDevice>> {
    let mut devices: Vec<Box<dyn MirroredDevice>> = vec![
        Box::new(Mileage::new(interval)),
        Box::new(FuelLevel::new(interval)),
        Box::new(DistanceToHome::new(home, interval)),
        Box::new(LockedState::new(interval)),
    ];
    if let Some(geocoder) = geocoder {
        devices.push(Box::new(ParkingAddress::new(geocoder, interval)));
    }
    devices.push(Box::new(FuelConsumed::new(interval)));
    devices
}

/// Positions closer than this are the same parking spot
const SAME_SPOT_DEGREES: f64 = 1e-7;

pub(crate) fn same_position(a: Option<(f64, f64)>, b: (f64, f64)) -> bool {
    a.is_some_and(|a| {
        (a.0 - b.0).abs() < SAME_SPOT_DEGREES && (a.1 - b.1).abs() < SAME_SPOT_DEGREES
    })
}
