use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::{DeviceCore, MirroredDevice, UNIT_FUEL_CONSUMED};
use crate::error::Result;
use crate::registry::{DeviceRegistry, DeviceSpec, DeviceType, format_decimal, parse_stored_f64};
use crate::vehicle::{DrivingStatistics, VehicleStatus};

/// Fuel consumed today, mirrored into an incremental counter.
///
/// The provider reports an absolute daily total while the host counter only
/// accepts deltas, so every change is written as the negated previous total
/// followed by the new total.
pub struct FuelConsumed {
    core: DeviceCore,
    last_consumed: f64,
}

impl FuelConsumed {
    pub fn new(interval: Duration) -> Self {
        let spec = DeviceSpec {
            unit: UNIT_FUEL_CONSUMED,
            name: "Fuel consumed".to_string(),
            device_type: DeviceType::IncrementalCounter {
                unit: "l".to_string(),
            },
            description: "The fuel consumed today".to_string(),
            image: None,
        };
        Self {
            core: DeviceCore::new(spec, interval),
            last_consumed: 0.0,
        }
    }

    pub fn last_consumed(&self) -> f64 {
        self.last_consumed
    }
}

#[async_trait]
impl MirroredDevice for FuelConsumed {
    fn core(&self) -> &DeviceCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DeviceCore {
        &mut self.core
    }

    fn seed(&mut self, stored: &str) {
        self.last_consumed = parse_stored_f64(stored);
    }

    /// Statistics are not part of the status; any reachable vehicle has them
    async fn create(
        &mut self,
        _status: &VehicleStatus,
        registry: &dyn DeviceRegistry,
    ) -> Result<()> {
        self.core.register(registry).await
    }

    async fn update(
        &mut self,
        _status: &VehicleStatus,
        _registry: &dyn DeviceRegistry,
        _now: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(false)
    }

    async fn update_statistics(
        &mut self,
        stats: &DrivingStatistics,
        today: NaiveDate,
        registry: &dyn DeviceRegistry,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if !self.exists() {
            return Ok(false);
        }
        let Some(consumed) = stats.day(today).and_then(|b| b.fuel_consumed) else {
            return Ok(false);
        };
        let consumed = (consumed * 1000.0).round() / 1000.0;
        let changed = (consumed - self.last_consumed).abs() > f64::EPSILON;
        if !changed && !self.requires_refresh(now) {
            return Ok(false);
        }
        // A zero total needs no reset write
        if self.last_consumed != 0.0 {
            registry.publish(self.unit(), 0, &format_decimal(-self.last_consumed)).await?;
            // The host total is zero now, even if the set write below fails
            self.last_consumed = 0.0;
        }
        self.core.publish(registry, 0, &format_decimal(consumed), now).await?;
        self.last_consumed = consumed;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::default_refresh_interval;
    use crate::error::MirrorError;
    use crate::registry::{DeviceRecord, MemoryRegistry};
    use crate::vehicle::StatBucket;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Memory registry whose n-th publish (1-based) fails once
    struct FailingPublish {
        inner: MemoryRegistry,
        publishes: AtomicUsize,
        fail_at: usize,
    }

    #[async_trait]
    impl DeviceRegistry for FailingPublish {
        async fn exists(&self, unit: u8) -> bool {
            self.inner.exists(unit).await
        }

        async fn register(&self, spec: &DeviceSpec) -> Result<()> {
            self.inner.register(spec).await
        }

        async fn publish(&self, unit: u8, n_value: i64, s_value: &str) -> Result<()> {
            if self.publishes.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_at {
                return Err(MirrorError::registry("host unavailable"));
            }
            self.inner.publish(unit, n_value, s_value).await
        }

        async fn read_last_published(&self, unit: u8) -> Option<String> {
            self.inner.read_last_published(unit).await
        }

        async fn devices(&self) -> Vec<DeviceRecord> {
            self.inner.devices().await
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 6, 1).unwrap()
    }

    fn stats(consumed: f64) -> DrivingStatistics {
        DrivingStatistics::from_buckets([StatBucket {
            date: today(),
            fuel_consumed: Some(consumed),
        }])
    }

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_622_548_800, 0).unwrap()
    }

    #[tokio::test]
    async fn transition_is_written_as_reset_then_set() {
        let registry = MemoryRegistry::new();
        let mut device = FuelConsumed::new(default_refresh_interval());
        device
            .create(&VehicleStatus::default(), &registry)
            .await
            .unwrap();
        device
            .update_statistics(&stats(12.0), today(), &registry, now())
            .await
            .unwrap();
        registry.clear_writes().await;

        assert!(
            device
                .update_statistics(&stats(15.5), today(), &registry, now())
                .await
                .unwrap()
        );
        let writes: Vec<String> = registry
            .writes_for(UNIT_FUEL_CONSUMED)
            .await
            .into_iter()
            .map(|w| w.s_value)
            .collect();
        assert_eq!(writes, vec!["-12.0", "15.5"]);
        let record = registry.record(UNIT_FUEL_CONSUMED).await.unwrap();
        assert_eq!(record.s_value, "15.5");
    }

    #[tokio::test]
    async fn failed_set_write_does_not_repeat_reset() {
        let registry = FailingPublish {
            inner: MemoryRegistry::new(),
            publishes: AtomicUsize::new(0),
            fail_at: 3,
        };
        let mut device = FuelConsumed::new(default_refresh_interval());
        device
            .create(&VehicleStatus::default(), &registry)
            .await
            .unwrap();
        device
            .update_statistics(&stats(12.0), today(), &registry, now())
            .await
            .unwrap();

        // "-12.0" lands, "15.5" is rejected
        assert!(
            device
                .update_statistics(&stats(15.5), today(), &registry, now())
                .await
                .is_err()
        );
        assert_eq!(device.last_consumed(), 0.0);

        assert!(
            device
                .update_statistics(&stats(15.5), today(), &registry, now())
                .await
                .unwrap()
        );
        let writes: Vec<String> = registry
            .inner
            .writes_for(UNIT_FUEL_CONSUMED)
            .await
            .into_iter()
            .map(|w| w.s_value)
            .collect();
        assert_eq!(writes, vec!["12.0", "-12.0", "15.5"]);
        let record = registry.inner.record(UNIT_FUEL_CONSUMED).await.unwrap();
        assert_eq!(record.s_value, "15.5");
    }

    #[tokio::test]
    async fn first_total_is_a_single_write() {
        let registry = MemoryRegistry::new();
        let mut device = FuelConsumed::new(default_refresh_interval());
        device
            .create(&VehicleStatus::default(), &registry)
            .await
            .unwrap();
        device
            .update_statistics(&stats(2.5), today(), &registry, now())
            .await
            .unwrap();
        let writes = registry.writes_for(UNIT_FUEL_CONSUMED).await;
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].s_value, "2.5");
    }

    #[tokio::test]
    async fn unchanged_total_waits_for_interval() {
        let registry = MemoryRegistry::new();
        let mut device = FuelConsumed::new(default_refresh_interval());
        device
            .create(&VehicleStatus::default(), &registry)
            .await
            .unwrap();
        assert!(
            device
                .update_statistics(&stats(3.0), today(), &registry, now())
                .await
                .unwrap()
        );
        assert!(
            !device
                .update_statistics(&stats(3.0), today(), &registry, now())
                .await
                .unwrap()
        );
        let later = now() + Duration::hours(7);
        assert!(
            device
                .update_statistics(&stats(3.0), today(), &registry, later)
                .await
                .unwrap()
        );
        assert_eq!(registry.record(UNIT_FUEL_CONSUMED).await.unwrap().s_value, "3");
    }

    #[tokio::test]
    async fn missing_bucket_for_today_is_skipped() {
        let registry = MemoryRegistry::new();
        let mut device = FuelConsumed::new(default_refresh_interval());
        device
            .create(&VehicleStatus::default(), &registry)
            .await
            .unwrap();
        let yesterday = today().pred_opt().unwrap();
        assert!(
            !device
                .update_statistics(&stats(4.0), yesterday, &registry, now())
                .await
                .unwrap()
        );
        assert!(registry.writes().await.is_empty());
    }
}
