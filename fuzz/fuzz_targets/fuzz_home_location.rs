#![no_main]
use libfuzzer_sys::fuzz_target;
use telemirror::config::HomeCoordinates;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    if let Ok(home) = HomeCoordinates::parse(&input) {
        // Accepted coordinates are always in range
        assert!((-90.0..=90.0).contains(&home.latitude));
        assert!((-180.0..=180.0).contains(&home.longitude));
        let _ = telemirror::geocode::distance_km((home.latitude, home.longitude), (0.0, 0.0));
    }
});
