//! # Telemirror - connected car telematics mirror
//!
//! Polls a vehicle cloud service on a throttled heartbeat and mirrors a handful
//! of readings into a home automation device registry: mileage, fuel level,
//! distance to home, lock state, parking address and fuel consumed today.
//!
//! ## Architecture
//!
//! - `config`: YAML configuration with defaults and validation
//! - `logging`: Structured logging and tracing
//! - `vehicle`: Provider types, the `VehicleApi` seam and its HTTP client
//! - `matcher`: Selects the target car from a free-text identifier
//! - `session`: Authenticated provider session and target vehicle
//! - `geocode`: Great-circle distance and reverse geocoding
//! - `registry`: Host device registry seam and in-memory registry
//! - `persistence`: JSON file backed device registry
//! - `devices`: One mirrored device per metric
//! - `scheduler`: Heartbeat throttling
//! - `plugin`: Orchestrates start, heartbeat and stop

pub mod config;
pub mod devices;
pub mod error;
pub mod geocode;
pub mod logging;
pub mod matcher;
pub mod persistence;
pub mod plugin;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod vehicle;

// Re-export commonly used types
pub use config::Config;
pub use error::{MirrorError, Result};
pub use plugin::VehiclePlugin;
