//! Vehicle cloud integration for Telemirror
//!
//! This module defines the data model returned by the connected services
//! provider and the client seam used to talk to it. Optional fields are
//! resolved once when a response is mapped, so consumers only ever see
//! explicit `Option`s.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;

pub mod client;
pub mod types;

pub use client::HttpVehicleClient;
pub use types::{
    Credentials, DoorLocks, DrivingStatistics, Odometer, ParkingLocation, StatBucket,
    VehicleIdentity, VehicleStatus,
};

/// Vehicle cloud client trait
#[async_trait]
pub trait VehicleApi: Send + Sync {
    /// Authenticate the account
    async fn login(&mut self, credentials: &Credentials) -> Result<()>;

    /// All vehicles registered on the account
    async fn list_vehicles(&self) -> Result<Vec<VehicleIdentity>>;

    /// Current status of one vehicle
    async fn vehicle_status(&self, vehicle: &VehicleIdentity) -> Result<VehicleStatus>;

    /// Day buckets of driving statistics starting at `from`
    async fn daily_statistics(&self, vin: &str, from: NaiveDate) -> Result<Vec<StatBucket>>;
}
