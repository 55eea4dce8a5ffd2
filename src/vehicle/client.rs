use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::error::{MirrorError, Result};
use crate::logging::get_logger;

use super::VehicleApi;
use super::types::{
    Credentials, DoorLocks, Odometer, ParkingLocation, StatBucket, VehicleIdentity, VehicleStatus,
};

const TOKEN_HEADER: &str = "X-TME-TOKEN";
const LOCALE_HEADER: &str = "X-TME-LC";
const VIN_HEADER: &str = "VIN";

/// Token and account id returned by a successful login
#[derive(Debug, Clone)]
struct AuthSession {
    token: String,
    uuid: String,
}

/// REST client for the connected services cloud
pub struct HttpVehicleClient {
    http: Client,
    config: ProviderConfig,
    locale: String,
    auth: Option<AuthSession>,
    logger: crate::logging::StructuredLogger,
}

impl HttpVehicleClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MirrorError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            config: config.clone(),
            locale: "en-gb".to_string(),
            auth: None,
            logger: get_logger("provider"),
        })
    }

    pub fn is_logged_in(&self) -> bool {
        self.auth.is_some()
    }

    fn auth(&self) -> Result<&AuthSession> {
        self.auth
            .as_ref()
            .ok_or_else(|| MirrorError::api("Not logged in"))
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// GET a JSON resource; `None` when the provider does not have it
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        vin: Option<&str>,
    ) -> Result<Option<T>> {
        let auth = self.auth()?;
        let mut request = self
            .http
            .get(url)
            .header(TOKEN_HEADER, &auth.token)
            .header(LOCALE_HEADER, &self.locale)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("telemirror/", env!("APP_VERSION")));
        if let Some(vin) = vin {
            request = request.header(VIN_HEADER, vin);
        }

        self.logger.trace(&format!("GET {}", url));
        let resp = request.send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            self.logger.debug(&format!("{} not available ({})", url, status));
            return Ok(None);
        }
        if status.is_server_error() {
            return Err(MirrorError::provider_internal(format!(
                "{} returned {}",
                url, status
            )));
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(MirrorError::login(format!("Token rejected ({})", status)));
        }
        if !status.is_success() {
            return Err(MirrorError::api(format!("{} returned {}", url, status)));
        }
        Ok(Some(resp.json::<T>().await?))
    }

    async fn fetch_odometer(&self, vin: &str) -> Result<Option<Odometer>> {
        let url = self.api_url(&format!("/vehicle/{}/addtionalInfo", vin));
        let items: Option<Vec<RawOdometerItem>> = self.get_json(&url, None).await?;
        Ok(items.map(map_odometer))
    }

    async fn fetch_parking(&self, vin: &str) -> Result<Option<ParkingLocation>> {
        let uuid = self.auth()?.uuid.clone();
        let url = self.api_url(&format!("/users/{}/vehicle/location", uuid));
        let raw: Option<RawParking> = self.get_json(&url, Some(vin)).await?;
        Ok(raw.and_then(map_parking))
    }

    async fn fetch_doors(&self, vin: &str) -> Result<Option<DoorLocks>> {
        let url = self.api_url(&format!("/vehicles/{}/remoteControl/status", vin));
        let raw: Option<RawRemoteStatus> = self.get_json(&url, None).await?;
        Ok(raw.and_then(map_doors))
    }
}

#[async_trait]
impl VehicleApi for HttpVehicleClient {
    async fn login(&mut self, credentials: &Credentials) -> Result<()> {
        self.auth = None;
        self.locale = credentials.locale.clone();
        let url = format!(
            "{}/authenticate",
            self.config.auth_url.trim_end_matches('/')
        );

        let resp = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("telemirror/", env!("APP_VERSION")))
            .json(&serde_json::json!({
                "username": credentials.username,
                "password": credentials.password,
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_login_failure(status, &body));
        }

        let body: RawAuthResponse = resp.json().await?;
        let token = body.token.filter(|t| !t.is_empty());
        let uuid = body
            .customer_profile
            .and_then(|p| p.uuid)
            .filter(|u| !u.is_empty());
        match (token, uuid) {
            (Some(token), Some(uuid)) => {
                self.auth = Some(AuthSession { token, uuid });
                Ok(())
            }
            _ => Err(MirrorError::login(
                "Authentication response did not contain a token",
            )),
        }
    }

    async fn list_vehicles(&self) -> Result<Vec<VehicleIdentity>> {
        let uuid = self.auth()?.uuid.clone();
        let url = format!(
            "{}/vehicle/user/{}/vehicles?services=uio&legacy=true",
            self.config.vehicles_url.trim_end_matches('/'),
            uuid
        );
        let raw: Option<Vec<RawVehicle>> = self.get_json(&url, None).await?;
        Ok(raw
            .unwrap_or_default()
            .into_iter()
            .map(RawVehicle::into_identity)
            .collect())
    }

    async fn vehicle_status(&self, vehicle: &VehicleIdentity) -> Result<VehicleStatus> {
        let vin = vehicle.vin.as_str();
        Ok(VehicleStatus {
            odometer: self.fetch_odometer(vin).await?,
            parking: self.fetch_parking(vin).await?,
            doors: self.fetch_doors(vin).await?,
        })
    }

    async fn daily_statistics(&self, vin: &str, from: NaiveDate) -> Result<Vec<StatBucket>> {
        let url = self.api_url(&format!(
            "/v2/trips/summarize?from={}&calendarInterval=day",
            from.format("%Y-%m-%d")
        ));
        let raw: Option<RawTripSummary> = self.get_json(&url, Some(vin)).await?;
        Ok(raw.map(map_statistics).unwrap_or_default())
    }
}

fn classify_login_failure(status: StatusCode, body: &str) -> MirrorError {
    let detail = if body.trim().is_empty() {
        status.to_string()
    } else {
        body.trim().to_string()
    };
    if status.is_server_error() {
        MirrorError::provider_internal(detail)
    } else if body.to_ascii_lowercase().contains("username") {
        MirrorError::invalid_username(detail)
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        MirrorError::login(detail)
    } else {
        MirrorError::api(detail)
    }
}

// Wire formats. Everything is optional because the provider omits fields
// depending on vehicle model and connectivity.

#[derive(Debug, Deserialize)]
struct RawAuthResponse {
    token: Option<String>,
    #[serde(rename = "customerProfile")]
    customer_profile: Option<RawCustomerProfile>,
}

#[derive(Debug, Deserialize)]
struct RawCustomerProfile {
    uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVehicle {
    alias: Option<String>,
    license_plate: Option<String>,
    vin: Option<String>,
    model_name: Option<String>,
}

impl RawVehicle {
    fn into_identity(self) -> VehicleIdentity {
        VehicleIdentity {
            alias: self.alias.unwrap_or_default(),
            license_plate: self.license_plate.unwrap_or_default(),
            vin: self.vin.unwrap_or_default(),
            model_name: self.model_name.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawOdometerItem {
    #[serde(rename = "type")]
    kind: Option<String>,
    value: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawParking {
    event: Option<RawParkingEvent>,
}

#[derive(Debug, Deserialize)]
struct RawParkingEvent {
    lat: Option<serde_json::Value>,
    lon: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRemoteStatus {
    protection_state: Option<RawProtectionState>,
}

#[derive(Debug, Deserialize)]
struct RawProtectionState {
    doors: Option<RawDoors>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDoors {
    driver_seat_door: Option<RawDoor>,
    passenger_seat_door: Option<RawDoor>,
    rear_left_seat_door: Option<RawDoor>,
    rear_right_seat_door: Option<RawDoor>,
    back_door: Option<RawDoor>,
}

#[derive(Debug, Deserialize)]
struct RawDoor {
    locked: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawTripSummary {
    histogram: Option<Vec<RawHistogramEntry>>,
}

#[derive(Debug, Deserialize)]
struct RawHistogramEntry {
    bucket: Option<RawBucket>,
    summary: Option<RawBucketSummary>,
}

#[derive(Debug, Deserialize)]
struct RawBucket {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawBucketSummary {
    #[serde(rename = "fuelConsumedInL")]
    fuel_consumed_in_l: Option<f64>,
}

/// Numbers arrive either as JSON numbers or as strings
fn lenient_f64(value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn map_odometer(items: Vec<RawOdometerItem>) -> Odometer {
    let mut odometer = Odometer::default();
    for item in items {
        let (Some(kind), Some(value)) = (item.kind, item.value.as_ref().and_then(lenient_f64))
        else {
            continue;
        };
        if kind.eq_ignore_ascii_case("mileage") && value >= 0.0 {
            odometer.mileage = Some(value.round() as u64);
        } else if kind.eq_ignore_ascii_case("fuel") {
            odometer.fuel_percent = Some(value.clamp(0.0, 100.0));
        }
    }
    odometer
}

fn map_parking(raw: RawParking) -> Option<ParkingLocation> {
    let event = raw.event?;
    Some(ParkingLocation {
        latitude: lenient_f64(event.lat.as_ref()?)?,
        longitude: lenient_f64(event.lon.as_ref()?)?,
    })
}

fn map_doors(raw: RawRemoteStatus) -> Option<DoorLocks> {
    let doors = raw.protection_state?.doors?;
    let locked = |door: Option<RawDoor>| door.and_then(|d| d.locked);
    Some(DoorLocks {
        driver: locked(doors.driver_seat_door),
        passenger: locked(doors.passenger_seat_door),
        rear_left: locked(doors.rear_left_seat_door),
        rear_right: locked(doors.rear_right_seat_door),
        trunk: locked(doors.back_door),
    })
}

fn map_statistics(raw: RawTripSummary) -> Vec<StatBucket> {
    raw.histogram
        .unwrap_or_default()
        .into_iter()
        .filter_map(|entry| {
            let date = entry.bucket?.date?;
            let date = NaiveDate::parse_from_str(date.get(..10)?, "%Y-%m-%d").ok()?;
            Some(StatBucket {
                date,
                fuel_consumed: entry.summary.and_then(|s| s.fuel_consumed_in_l),
            })
        })
        .collect()
}
