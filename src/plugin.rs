//! Plugin orchestration
//!
//! `VehiclePlugin` owns the heartbeat scheduler, the vehicle session and the
//! mirrored devices. The host calls `start`, then `heartbeat` at a fixed
//! cadence, then `stop`. All work happens serially inside those calls.

use chrono::{DateTime, Local, NaiveDate, Utc};
use std::future::Future;
use std::sync::Arc;
use tokio::time::{Duration, MissedTickBehavior, interval};

use crate::config::Config;
use crate::devices::{MirroredDevice, standard_devices};
use crate::geocode::Geocoder;
use crate::logging::{StructuredLogger, get_logger};
use crate::registry::DeviceRegistry;
use crate::scheduler::RefreshScheduler;
use crate::session::VehicleSession;
use crate::vehicle::{Credentials, VehicleApi};

/// Mirrors one vehicle into the host device registry
pub struct VehiclePlugin {
    scheduler: RefreshScheduler,
    session: VehicleSession,
    devices: Vec<Box<dyn MirroredDevice>>,
    registry: Arc<dyn DeviceRegistry>,

    /// Dump configuration and devices to the debug log at start
    debug: bool,
    config_summary: Vec<String>,

    total_polls: u64,
    logger: StructuredLogger,
}

impl VehiclePlugin {
    pub fn new(
        scheduler: RefreshScheduler,
        session: VehicleSession,
        devices: Vec<Box<dyn MirroredDevice>>,
        registry: Arc<dyn DeviceRegistry>,
    ) -> Self {
        Self {
            scheduler,
            session,
            devices,
            registry,
            debug: false,
            config_summary: Vec::new(),
            total_polls: 0,
            logger: get_logger("plugin"),
        }
    }

    /// Build the plugin with the standard device set
    pub fn from_config(
        config: &Config,
        client: Box<dyn VehicleApi>,
        geocoder: Option<Arc<dyn Geocoder>>,
        registry: Arc<dyn DeviceRegistry>,
    ) -> Self {
        let logger = get_logger("plugin");
        let home = config.home_coordinates();
        if home.is_none()
            && let Some(raw) = config.home_location.as_deref()
            && !raw.trim().is_empty()
        {
            logger.warn(&format!(
                "Ignoring malformed home location '{}', distance to home disabled",
                raw
            ));
        }

        let credentials = Credentials {
            username: config.account.username.clone(),
            password: config.account.password.clone(),
            locale: config.account.locale.clone(),
        };
        let session = VehicleSession::new(
            client,
            credentials,
            config.account.car.clone(),
            config.name.clone(),
        );
        let devices = standard_devices(home, geocoder, config.refresh_interval());

        let mut plugin = Self::new(
            RefreshScheduler::new(config.heartbeat.interval_ticks),
            session,
            devices,
            registry,
        );
        plugin.debug = config.debug;
        plugin.config_summary = config.redacted_summary();
        plugin
    }

    pub fn session(&self) -> &VehicleSession {
        &self.session
    }

    pub fn devices(&self) -> &[Box<dyn MirroredDevice>] {
        &self.devices
    }

    pub fn registry(&self) -> &Arc<dyn DeviceRegistry> {
        &self.registry
    }

    /// Poll cycles run so far
    pub fn total_polls(&self) -> u64 {
        self.total_polls
    }

    /// Restore known devices and register the ones the vehicle supports
    pub async fn start(&mut self) {
        self.logger.info("Starting vehicle mirror");

        for device in self.devices.iter_mut() {
            device.restore(self.registry.as_ref()).await;
        }

        if self.debug {
            self.dump_to_log().await;
        }

        self.create_devices().await;
    }

    /// Host heartbeat; returns whether a poll cycle ran
    pub async fn heartbeat(&mut self) -> bool {
        if !self.scheduler.tick() {
            return false;
        }
        self.update_devices().await;
        true
    }

    /// Register every device whose metric the current status exposes
    pub async fn create_devices(&mut self) {
        let Some(status) = self.session.get_status().await else {
            return;
        };
        for device in self.devices.iter_mut() {
            if let Err(e) = device.create(&status, self.registry.as_ref()).await {
                self.logger.error(&format!("Failed to create device '{}': {}", device.name(), e));
            }
        }
    }

    /// One poll cycle using the wall clock
    pub async fn update_devices(&mut self) {
        self.update_devices_at(Utc::now(), Local::now().date_naive()).await;
    }

    /// One poll cycle: status to every device, then today's statistics
    pub async fn update_devices_at(&mut self, now: DateTime<Utc>, today: NaiveDate) {
        self.total_polls = self.total_polls.saturating_add(1);
        let registry = self.registry.as_ref();

        if let Some(status) = self.session.get_status().await {
            for device in self.devices.iter_mut() {
                // Metrics can show up after start, e.g. first lock report
                let result = match device.create(&status, registry).await {
                    Ok(()) => device.update(&status, registry, now).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = result {
                    self.logger.error(&format!(
                        "Failed to update device '{}': {}",
                        device.name(),
                        e
                    ));
                }
            }
        }

        // A failed login waits for the next poll instead of retrying here
        if !self.session.is_connected() {
            return;
        }
        if let Some(stats) = self.session.get_daily_statistics(today).await {
            for device in self.devices.iter_mut() {
                if let Err(e) = device
                    .update_statistics(&stats, today, registry, now)
                    .await
                {
                    self.logger.error(&format!(
                        "Failed to update device '{}': {}",
                        device.name(),
                        e
                    ));
                }
            }
        }
    }

    /// Release the vehicle session
    pub fn stop(&mut self) {
        self.session.disconnect();
        self.logger.info(&format!(
            "Vehicle mirror stopped after {} poll(s)",
            self.total_polls
        ));
    }

    /// Deliver heartbeats every `period` until `shutdown` completes, then stop
    pub async fn run_until<F>(&mut self, period: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut heartbeat = interval(period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        heartbeat.tick().await;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    self.heartbeat().await;
                }
                _ = &mut shutdown => {
                    self.logger.info("Shutdown signal received");
                    break;
                }
            }
        }

        self.stop();
    }

    async fn dump_to_log(&self) {
        for line in &self.config_summary {
            self.logger.debug(line);
        }
        let records = self.registry.devices().await;
        self.logger.debug(&format!("Device count: {}", records.len()));
        for record in records {
            self.logger.debug(&format!(
                "Device: {} - '{}' n={} s='{}'",
                record.spec.unit, record.spec.name, record.n_value, record.s_value
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{Mileage, UNIT_MILEAGE, default_refresh_interval};
    use crate::error::{MirrorError, Result};
    use crate::registry::MemoryRegistry;
    use crate::vehicle::{Odometer, StatBucket, VehicleIdentity, VehicleStatus};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct UnreachableApi {
        logins: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl VehicleApi for UnreachableApi {
        async fn login(&mut self, _credentials: &Credentials) -> Result<()> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            Err(MirrorError::network("connection refused"))
        }

        async fn list_vehicles(&self) -> Result<Vec<VehicleIdentity>> {
            Ok(Vec::new())
        }

        async fn vehicle_status(&self, _vehicle: &VehicleIdentity) -> Result<VehicleStatus> {
            Ok(VehicleStatus {
                odometer: Some(Odometer {
                    mileage: Some(1),
                    fuel_percent: None,
                }),
                ..VehicleStatus::default()
            })
        }

        async fn daily_statistics(&self, _vin: &str, _from: NaiveDate) -> Result<Vec<StatBucket>> {
            Ok(Vec::new())
        }
    }

    fn plugin_with(api: UnreachableApi, registry: Arc<MemoryRegistry>) -> VehiclePlugin {
        let session = VehicleSession::new(
            Box::new(api),
            Credentials {
                username: "user".into(),
                password: "secret".into(),
                locale: "en-gb".into(),
            },
            None,
            "Toyota".into(),
        );
        VehiclePlugin::new(
            RefreshScheduler::new(2),
            session,
            vec![Box::new(Mileage::new(default_refresh_interval()))],
            registry,
        )
    }

    fn plugin(registry: Arc<MemoryRegistry>) -> VehiclePlugin {
        plugin_with(UnreachableApi::default(), registry)
    }

    #[tokio::test]
    async fn failed_login_is_tried_once_per_poll() {
        let api = UnreachableApi::default();
        let logins = api.logins.clone();
        let mut plugin = plugin_with(api, Arc::new(MemoryRegistry::new()));

        plugin.update_devices().await;
        assert_eq!(logins.load(Ordering::SeqCst), 1);
        plugin.update_devices().await;
        assert_eq!(logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unreachable_provider_skips_cycles_without_failing() {
        let registry = Arc::new(MemoryRegistry::new());
        let mut plugin = plugin(registry.clone());
        plugin.start().await;
        assert!(!plugin.heartbeat().await);
        assert!(!plugin.heartbeat().await);
        assert!(plugin.heartbeat().await);
        assert_eq!(plugin.total_polls(), 1);
        assert!(!plugin.session().is_connected());
        assert!(!registry.exists(UNIT_MILEAGE).await);
        plugin.stop();
    }

    #[tokio::test]
    async fn run_until_stops_on_shutdown() {
        let registry = Arc::new(MemoryRegistry::new());
        let mut plugin = plugin(registry);
        plugin
            .run_until(Duration::from_millis(2), tokio::time::sleep(Duration::from_millis(100)))
            .await;
        assert!(plugin.total_polls() >= 1);
    }
}
