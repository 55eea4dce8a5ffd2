use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Account credentials for the connected services
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub locale: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &"******")
            .field("password", &"******")
            .field("locale", &self.locale)
            .finish()
    }
}

/// One vehicle on the account as listed by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VehicleIdentity {
    pub alias: String,
    pub license_plate: String,
    pub vin: String,
    pub model_name: String,
}

impl VehicleIdentity {
    /// Short human readable label for logging
    pub fn label(&self) -> String {
        [&self.alias, &self.license_plate, &self.model_name, &self.vin]
            .into_iter()
            .find(|s| !s.is_empty())
            .cloned()
            .unwrap_or_else(|| "unknown vehicle".to_string())
    }
}

/// Odometer related readings
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Odometer {
    /// Total distance in km
    pub mileage: Option<u64>,
    /// Fuel tank filling in percent (0-100)
    pub fuel_percent: Option<f64>,
}

/// GPS position where the car was parked
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParkingLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Per-door lock readings; `None` when the car does not report that door
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DoorLocks {
    pub driver: Option<bool>,
    pub passenger: Option<bool>,
    pub rear_left: Option<bool>,
    pub rear_right: Option<bool>,
    pub trunk: Option<bool>,
}

impl DoorLocks {
    fn readings(&self) -> [Option<bool>; 5] {
        [
            self.driver,
            self.passenger,
            self.rear_left,
            self.rear_right,
            self.trunk,
        ]
    }

    /// At least one door reports a lock state
    pub fn has_any_reading(&self) -> bool {
        self.readings().iter().any(Option::is_some)
    }

    /// Every known door is locked; unknown doors count as locked
    pub fn all_locked(&self) -> bool {
        self.readings().iter().all(|door| door.unwrap_or(true))
    }
}

/// Snapshot of the vehicle state at one poll
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleStatus {
    pub odometer: Option<Odometer>,
    pub parking: Option<ParkingLocation>,
    pub doors: Option<DoorLocks>,
}

/// Aggregated driving data for one calendar day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatBucket {
    pub date: NaiveDate,
    /// Fuel consumed in liters
    pub fuel_consumed: Option<f64>,
}

/// Daily statistics keyed by date
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrivingStatistics {
    days: BTreeMap<NaiveDate, StatBucket>,
}

impl DrivingStatistics {
    /// Build from provider buckets; a later bucket for the same day wins
    pub fn from_buckets<I: IntoIterator<Item = StatBucket>>(buckets: I) -> Self {
        Self {
            days: buckets.into_iter().map(|b| (b.date, b)).collect(),
        }
    }

    pub fn day(&self, date: NaiveDate) -> Option<&StatBucket> {
        self.days.get(&date)
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }
}
