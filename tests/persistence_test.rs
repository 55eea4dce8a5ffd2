use telemirror::persistence::FileRegistry;
use telemirror::registry::{DeviceRegistry, DeviceSpec, DeviceType};

fn mileage_spec() -> DeviceSpec {
    DeviceSpec {
        unit: 1,
        name: "Mileage".to_string(),
        device_type: DeviceType::IncrementalCounter {
            unit: "km".to_string(),
        },
        description: "Counter to hold the overall mileage".to_string(),
        image: None,
    }
}

#[tokio::test]
async fn missing_file_starts_empty() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let registry = FileRegistry::open(tmp_dir.path().join("devices.json")).unwrap();
    assert!(registry.devices().await.is_empty());
    assert!(!registry.exists(1).await);
    assert!(registry.read_last_published(1).await.is_none());
}

#[tokio::test]
async fn registrations_and_values_survive_reopen() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("state").join("devices.json");

    let registry = FileRegistry::open(&path).unwrap();
    registry.register(&mileage_spec()).await.unwrap();
    registry.publish(1, 0, "12000").await.unwrap();
    registry.publish(1, 0, "35").await.unwrap();
    drop(registry);

    let reopened = FileRegistry::open(&path).unwrap();
    assert!(reopened.exists(1).await);
    assert_eq!(reopened.read_last_published(1).await.as_deref(), Some("12035"));
    let devices = reopened.devices().await;
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].spec, mileage_spec());
    assert!(devices[0].last_update.is_some());
}

#[tokio::test]
async fn empty_file_is_an_empty_store() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let registry = FileRegistry::open(tmp.path()).unwrap();
    assert!(registry.devices().await.is_empty());
}

#[tokio::test]
async fn corrupt_file_is_rejected() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(tmp.path(), b"{not json").unwrap();
    let err = FileRegistry::open(tmp.path()).err().unwrap();
    assert!(format!("{}", err).contains("Serialization error"));
}

#[tokio::test]
async fn publish_to_unregistered_unit_fails() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let registry = FileRegistry::open(tmp_dir.path().join("devices.json")).unwrap();
    assert!(registry.publish(3, 0, "1.0").await.is_err());
}
