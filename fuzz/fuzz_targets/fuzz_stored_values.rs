#![no_main]
use libfuzzer_sys::fuzz_target;
use telemirror::registry::{DeviceTable, DeviceSpec, DeviceType, parse_stored_f64, parse_stored_u64};

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let _ = parse_stored_u64(&input);
    assert!(parse_stored_f64(&input).is_finite());

    // Counter accumulation never panics on arbitrary stored text
    let mut table = DeviceTable::default();
    table.register(&DeviceSpec {
        unit: 1,
        name: "Counter".to_string(),
        device_type: DeviceType::IncrementalCounter {
            unit: "km".to_string(),
        },
        description: String::new(),
        image: None,
    });
    let _ = table.publish(1, 0, &input);
    let _ = table.publish(1, 0, &input);
});
