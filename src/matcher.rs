//! Selection of the target vehicle from a free-text identifier
//!
//! The identifier may be any part of the alias, license plate, VIN or model
//! name. Matching is case-insensitive and the first vehicle in provider order
//! wins.

use crate::vehicle::VehicleIdentity;

/// Find the first car whose alias, plate, VIN or model contains `identifier`
pub fn match_car<'a>(cars: &'a [VehicleIdentity], identifier: &str) -> Option<&'a VehicleIdentity> {
    let needle = identifier.trim().to_uppercase();
    if needle.is_empty() {
        return None;
    }
    cars.iter().find(|car| {
        [
            &car.alias,
            &car.license_plate,
            &car.vin,
            &car.model_name,
        ]
        .iter()
        .any(|field| field.to_uppercase().contains(&needle))
    })
}
