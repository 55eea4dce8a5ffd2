use super::*;

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            locale: "en-gb".to_string(),
            car: None,
            region: "europe".to_string(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_ticks: 10,
            period_secs: 10,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            auth_url: "https://ssoms.toyota-europe.com".to_string(),
            vehicles_url: "https://cpb2cs.toyota-europe.com".to_string(),
            api_url: "https://myt-agg.toyota-europe.com/cma/api".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: format!("telemirror/{}", env!("APP_VERSION")),
            timeout_secs: 10,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            state_file: "/data/telemirror_devices.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/tmp/telemirror.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "Toyota".to_string(),
            account: AccountConfig::default(),
            home_location: None,
            heartbeat: HeartbeatConfig::default(),
            refresh_interval_hours: 6,
            provider: ProviderConfig::default(),
            geocoding: GeocodingConfig::default(),
            registry: RegistryConfig::default(),
            logging: LoggingConfig::default(),
            debug: false,
        }
    }
}
