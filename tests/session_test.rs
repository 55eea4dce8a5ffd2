use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use telemirror::error::{MirrorError, Result};
use telemirror::session::VehicleSession;
use telemirror::vehicle::{
    Credentials, Odometer, StatBucket, VehicleApi, VehicleIdentity, VehicleStatus,
};

#[derive(Clone, Copy)]
enum Failure {
    Login,
    InvalidUsername,
    Internal,
    TokenExpired,
}

impl Failure {
    fn error(self) -> MirrorError {
        match self {
            Failure::Login => MirrorError::login("bad password"),
            Failure::InvalidUsername => MirrorError::invalid_username("unknown user"),
            Failure::Internal => MirrorError::provider_internal("upstream 500"),
            Failure::TokenExpired => MirrorError::login("token expired"),
        }
    }
}

#[derive(Default)]
struct Script {
    login_failure: Option<Failure>,
    list_failure: Option<Failure>,
    status_failure: Option<Failure>,
}

struct FakeApi {
    cars: Vec<VehicleIdentity>,
    buckets: Vec<StatBucket>,
    script: Arc<Mutex<Script>>,
    logins: Arc<AtomicUsize>,
}

#[async_trait]
impl VehicleApi for FakeApi {
    async fn login(&mut self, _credentials: &Credentials) -> Result<()> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().login_failure {
            Some(failure) => Err(failure.error()),
            None => Ok(()),
        }
    }

    async fn list_vehicles(&self) -> Result<Vec<VehicleIdentity>> {
        if let Some(failure) = self.script.lock().unwrap().list_failure.take() {
            return Err(failure.error());
        }
        Ok(self.cars.clone())
    }

    async fn vehicle_status(&self, _vehicle: &VehicleIdentity) -> Result<VehicleStatus> {
        if let Some(failure) = self.script.lock().unwrap().status_failure.take() {
            return Err(failure.error());
        }
        Ok(VehicleStatus {
            odometer: Some(Odometer {
                mileage: Some(120),
                fuel_percent: Some(50.0),
            }),
            ..VehicleStatus::default()
        })
    }

    async fn daily_statistics(&self, _vin: &str, _from: NaiveDate) -> Result<Vec<StatBucket>> {
        Ok(self.buckets.clone())
    }
}

fn car(alias: &str, plate: &str, vin: &str, model: &str) -> VehicleIdentity {
    VehicleIdentity {
        alias: alias.to_string(),
        license_plate: plate.to_string(),
        vin: vin.to_string(),
        model_name: model.to_string(),
    }
}

fn garage() -> Vec<VehicleIdentity> {
    vec![
        car("Family", "XX-999-Y", "JTDKB000001", "Corolla Touring"),
        car("", "AB-123-C", "VNKKJ000002", "Yaris"),
    ]
}

struct Harness {
    session: VehicleSession,
    script: Arc<Mutex<Script>>,
    logins: Arc<AtomicUsize>,
}

fn harness(identifier: Option<&str>, fallback: &str, buckets: Vec<StatBucket>) -> Harness {
    let script = Arc::new(Mutex::new(Script::default()));
    let logins = Arc::new(AtomicUsize::new(0));
    let api = FakeApi {
        cars: garage(),
        buckets,
        script: script.clone(),
        logins: logins.clone(),
    };
    let session = VehicleSession::new(
        Box::new(api),
        Credentials {
            username: "driver@example.com".to_string(),
            password: "secret".to_string(),
            locale: "en-gb".to_string(),
        },
        identifier.map(str::to_string),
        fallback.to_string(),
    );
    Harness {
        session,
        script,
        logins,
    }
}

#[tokio::test]
async fn connect_selects_car_by_identifier() {
    let mut h = harness(Some(" ab-123 "), "Toyota", Vec::new());
    h.session.connect().await.unwrap();
    assert!(h.session.is_connected());
    assert_eq!(h.session.vehicle().unwrap().vin, "VNKKJ000002");
}

#[tokio::test]
async fn falls_back_to_instance_name() {
    let mut h = harness(None, "corolla", Vec::new());
    assert!(h.session.ensure_connected().await);
    assert_eq!(h.session.vehicle().unwrap().alias, "Family");
}

#[tokio::test]
async fn unknown_car_is_not_connected_and_retried() {
    let mut h = harness(Some("Prius"), "Toyota", Vec::new());
    let err = h.session.connect().await.unwrap_err();
    assert!(matches!(err, MirrorError::VehicleNotFound { .. }));
    assert!(!h.session.is_connected());

    assert!(h.session.get_status().await.is_none());
    assert!(h.session.get_status().await.is_none());
    assert_eq!(h.logins.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn login_errors_are_reported_and_retried_next_call() {
    let mut h = harness(Some("Yaris"), "Toyota", Vec::new());
    h.script.lock().unwrap().login_failure = Some(Failure::Login);
    assert!(h.session.connect().await.unwrap_err().is_auth());
    assert!(h.session.get_status().await.is_none());

    h.script.lock().unwrap().login_failure = Some(Failure::InvalidUsername);
    assert!(matches!(
        h.session.connect().await.unwrap_err(),
        MirrorError::InvalidUsername { .. }
    ));

    h.script.lock().unwrap().login_failure = None;
    let status = h.session.get_status().await.unwrap();
    assert_eq!(status.odometer.unwrap().mileage, Some(120));
    assert_eq!(h.logins.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn vehicle_list_failure_is_returned_and_retried() {
    let mut h = harness(Some("Yaris"), "Toyota", Vec::new());
    h.script.lock().unwrap().list_failure = Some(Failure::Internal);

    let err = h.session.connect().await.unwrap_err();
    assert!(matches!(err, MirrorError::ProviderInternal { .. }));
    assert!(!h.session.is_connected());

    assert!(h.session.get_status().await.is_some());
    assert_eq!(h.logins.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn internal_provider_error_skips_one_poll() {
    let mut h = harness(Some("Yaris"), "Toyota", Vec::new());
    h.session.connect().await.unwrap();
    h.script.lock().unwrap().status_failure = Some(Failure::Internal);

    assert!(h.session.get_status().await.is_none());
    assert!(h.session.is_connected());
    assert!(h.session.get_status().await.is_some());
    assert_eq!(h.logins.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_token_forces_new_login() {
    let mut h = harness(Some("Yaris"), "Toyota", Vec::new());
    h.session.connect().await.unwrap();
    h.script.lock().unwrap().status_failure = Some(Failure::TokenExpired);

    assert!(h.session.get_status().await.is_none());
    assert!(!h.session.is_connected());
    assert!(h.session.get_status().await.is_some());
    assert_eq!(h.logins.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn daily_statistics_require_bucket_for_date() {
    let today = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
    let buckets = vec![StatBucket {
        date: today,
        fuel_consumed: Some(15.5),
    }];
    let mut h = harness(Some("Yaris"), "Toyota", buckets);

    let stats = h.session.get_daily_statistics(today).await.unwrap();
    assert_eq!(stats.day(today).unwrap().fuel_consumed, Some(15.5));

    let tomorrow = today.succ_opt().unwrap();
    assert!(h.session.get_daily_statistics(tomorrow).await.is_none());
}

#[tokio::test]
async fn disconnect_is_idempotent() {
    let mut h = harness(Some("Yaris"), "Toyota", Vec::new());
    h.session.disconnect();
    h.session.disconnect();
    assert!(!h.session.is_connected());
    assert!(h.session.get_status().await.is_none());

    let mut h = harness(Some("Yaris"), "Toyota", Vec::new());
    assert!(h.session.ensure_connected().await);
    h.session.disconnect();
    assert!(!h.session.is_connected());
    assert!(h.session.get_status().await.is_none());
}
