//! Vehicle cloud session management for Telemirror
//!
//! This module owns the authenticated provider client and the resolved target
//! vehicle. A session counts as connected only when the login succeeded and a
//! vehicle was matched; every fetch reconnects at most once and otherwise
//! waits for the next heartbeat.

use chrono::NaiveDate;

use crate::error::{MirrorError, Result};
use crate::logging::{LogContext, get_logger, get_logger_with_context};
use crate::matcher::match_car;
use crate::vehicle::{Credentials, DrivingStatistics, VehicleApi, VehicleIdentity, VehicleStatus};

/// Session with the vehicle cloud service
pub struct VehicleSession {
    /// Provider client; `None` once disconnected
    client: Option<Box<dyn VehicleApi>>,

    credentials: Credentials,

    /// User supplied car identifier
    car_identifier: Option<String>,

    /// Fallback identifier, the plugin instance name
    fallback_identifier: String,

    logged_on: bool,
    car: Option<VehicleIdentity>,
    logger: crate::logging::StructuredLogger,
}

impl VehicleSession {
    pub fn new(
        client: Box<dyn VehicleApi>,
        credentials: Credentials,
        car_identifier: Option<String>,
        fallback_identifier: String,
    ) -> Self {
        Self {
            client: Some(client),
            credentials,
            car_identifier,
            fallback_identifier,
            logged_on: false,
            car: None,
            logger: get_logger("session"),
        }
    }

    /// Log in and resolve the target vehicle
    pub async fn connect(&mut self) -> Result<()> {
        self.logged_on = false;
        self.car = None;

        let client = self
            .client
            .as_mut()
            .ok_or_else(|| MirrorError::generic("No vehicle client configured"))?;

        if let Err(e) = client.login(&self.credentials).await {
            match &e {
                MirrorError::Login { .. } => self.logger.error(&format!("Login Error: {}", e)),
                MirrorError::InvalidUsername { .. } => {
                    self.logger.error(&format!("Invalid username: {}", e))
                }
                _ => self.logger.error(&format!("Logon failed: {}", e)),
            }
            return Err(e);
        }
        let cars = match client.list_vehicles().await {
            Ok(cars) => cars,
            Err(e) => {
                self.logger.error(&format!("Could not list vehicles: {}", e));
                return Err(e);
            }
        };
        self.logged_on = true;
        self.logger.info("Successfully logged on");

        let identifiers = [
            self.car_identifier.as_deref().unwrap_or_default(),
            self.fallback_identifier.as_str(),
        ];
        self.car = identifiers
            .iter()
            .find_map(|id| match_car(&cars, id))
            .cloned();

        match &self.car {
            Some(car) => {
                self.logger = get_logger_with_context(
                    LogContext::new("session").with_vehicle(car.label()),
                );
                self.logger.info(&format!("Selected vehicle {}", car.label()));
                Ok(())
            }
            None => {
                let msg = format!(
                    "Could not find the desired car among {} vehicle(s) on the account",
                    cars.len()
                );
                self.logger.error(&msg);
                Err(MirrorError::vehicle_not_found(msg))
            }
        }
    }

    /// Logged on and a vehicle was selected
    pub fn is_connected(&self) -> bool {
        self.client.is_some() && self.logged_on && self.car.is_some()
    }

    /// Connect when needed, trying once; returns the resulting state
    pub async fn ensure_connected(&mut self) -> bool {
        if !self.is_connected() {
            // Failures are already logged by connect
            let _ = self.connect().await;
        }
        self.is_connected()
    }

    /// Selected vehicle, if connected
    pub fn vehicle(&self) -> Option<&VehicleIdentity> {
        self.car.as_ref()
    }

    /// Current status of the selected vehicle
    pub async fn get_status(&mut self) -> Option<VehicleStatus> {
        let status = if self.ensure_connected().await {
            self.logger.info("Updating vehicle status");
            match self.fetch_status().await {
                Ok(status) => Some(status),
                Err(e) => {
                    self.handle_fetch_error(&e);
                    None
                }
            }
        } else {
            None
        };
        if status.is_none() {
            self.logger.error("Vehicle status could not be retrieved");
        }
        status
    }

    /// Driving statistics containing the bucket for `date`
    pub async fn get_daily_statistics(&mut self, date: NaiveDate) -> Option<DrivingStatistics> {
        if !self.ensure_connected().await {
            self.logger.error("Driving statistics could not be retrieved");
            return None;
        }
        let buckets = match self.fetch_statistics(date).await {
            Ok(buckets) => buckets,
            Err(e) => {
                self.handle_fetch_error(&e);
                self.logger.error("Driving statistics could not be retrieved");
                return None;
            }
        };
        let stats = DrivingStatistics::from_buckets(buckets);
        if stats.day(date).is_none() {
            self.logger.debug(&format!("No statistics bucket for {}", date));
            return None;
        }
        Some(stats)
    }

    /// Release the provider client
    pub fn disconnect(&mut self) {
        if self.client.take().is_some() {
            self.logger.info("Disconnecting from vehicle cloud");
        }
        self.logged_on = false;
        self.car = None;
    }

    async fn fetch_status(&self) -> Result<VehicleStatus> {
        let (client, car) = self.connected_parts()?;
        client.vehicle_status(car).await
    }

    async fn fetch_statistics(&self, date: NaiveDate) -> Result<Vec<crate::vehicle::StatBucket>> {
        let (client, car) = self.connected_parts()?;
        client.daily_statistics(&car.vin, date).await
    }

    fn connected_parts(&self) -> Result<(&dyn VehicleApi, &VehicleIdentity)> {
        match (self.client.as_deref(), self.car.as_ref()) {
            (Some(client), Some(car)) => Ok((client, car)),
            _ => Err(MirrorError::generic("Not connected")),
        }
    }

    fn handle_fetch_error(&mut self, e: &MirrorError) {
        match e {
            MirrorError::ProviderInternal { .. } => {
                self.logger.warn(&format!("Provider reported an internal error: {}", e));
            }
            _ if e.is_auth() => {
                // Token expired or revoked; log in again on the next poll
                self.logger.warn(&format!("Session rejected by provider: {}", e));
                self.logged_on = false;
            }
            _ => self.logger.error(&format!("Provider request failed: {}", e)),
        }
    }
}
