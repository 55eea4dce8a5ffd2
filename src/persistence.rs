//! Persistence of mirrored devices
//!
//! `FileRegistry` keeps the device table in a JSON file so registrations and
//! last values survive restarts, the way the host's own device store would.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::logging::get_logger;
use crate::registry::{DeviceRecord, DeviceRegistry, DeviceSpec, DeviceTable};

/// Device registry persisted to a JSON file
pub struct FileRegistry {
    file_path: PathBuf,
    table: Mutex<DeviceTable>,
    logger: crate::logging::StructuredLogger,
}

impl FileRegistry {
    /// Open the registry, loading existing devices if the file exists
    pub fn open<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        let logger = get_logger("persistence");
        let path = file_path.as_ref().to_path_buf();

        let table = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let table: DeviceTable = if contents.trim().is_empty() {
                DeviceTable::default()
            } else {
                serde_json::from_str(&contents)?
            };
            logger.info(&format!(
                "Loaded {} device(s) from {}",
                table.records().len(),
                path.display()
            ));
            table
        } else {
            logger.info("No device store found, starting empty");
            DeviceTable::default()
        };

        Ok(Self {
            file_path: path,
            table: Mutex::new(table),
            logger,
        })
    }

    fn save(&self, table: &DeviceTable) -> Result<()> {
        let contents = serde_json::to_string_pretty(table)?;
        if let Some(parent) = self.file_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        // Write then rename so a crash never leaves a truncated store
        let tmp = self.file_path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.file_path)?;
        self.logger.trace("Saved device store to disk");
        Ok(())
    }
}

#[async_trait]
impl DeviceRegistry for FileRegistry {
    async fn exists(&self, unit: u8) -> bool {
        self.table.lock().await.get(unit).is_some()
    }

    async fn register(&self, spec: &DeviceSpec) -> Result<()> {
        let mut table = self.table.lock().await;
        if table.register(spec) {
            self.logger.info(&format!("Registered device {} '{}'", spec.unit, spec.name));
            self.save(&table)?;
        }
        Ok(())
    }

    async fn publish(&self, unit: u8, n_value: i64, s_value: &str) -> Result<()> {
        let mut table = self.table.lock().await;
        table.publish(unit, n_value, s_value)?;
        self.save(&table)
    }

    async fn read_last_published(&self, unit: u8) -> Option<String> {
        self.table
            .lock()
            .await
            .get(unit)
            .map(|r| r.s_value.clone())
    }

    async fn devices(&self) -> Vec<DeviceRecord> {
        self.table.lock().await.records()
    }
}
