use serde::{Deserialize, Serialize};

/// Hysteresis band and polling cadence for the control loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ControlConfig {
    pub low_threshold_c: f32,
    pub high_threshold_c: f32,
    pub poll_period_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            low_threshold_c: 30.0,
            high_threshold_c: 30.2,
            poll_period_ms: 10_000,
        }
    }
}

impl ControlConfig {
    pub fn sanitize(&mut self) {
        if !self.low_threshold_c.is_finite() || !self.high_threshold_c.is_finite() {
            *self = Self {
                poll_period_ms: self.poll_period_ms,
                ..Self::default()
            };
        }

        // The band must be non-empty or the relay chatters at the boundary.
        if self.low_threshold_c >= self.high_threshold_c {
            self.high_threshold_c = self.low_threshold_c + 0.2;
        }

        if self.poll_period_ms == 0 {
            self.poll_period_ms = Self::default().poll_period_ms;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub wifi_ssid: String,
    pub wifi_pass: String,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_key: String,
    pub db_host: String,
    pub db_port: u16,
    pub db_name: String,
    pub db_user: String,
    pub db_pass: String,
    pub ota_password: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: String::new(),
            wifi_pass: String::new(),
            mqtt_host: "io.adafruit.com".to_string(),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_key: String::new(),
            db_host: "influxdb.local".to_string(),
            db_port: 8086,
            db_name: "incubator".to_string(),
            db_user: String::new(),
            db_pass: String::new(),
            ota_password: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub control: ControlConfig,
    pub network: NetworkConfig,
}

impl RuntimeConfig {
    /// Build-time configuration: every credential and endpoint is baked in at
    /// compile time, with `CHANGE_ME` placeholders when an env var is unset.
    pub fn from_build_env() -> Self {
        let mut config = Self::default();

        config.network.wifi_ssid = option_env!("WIFI_SSID").unwrap_or("CHANGE_ME").to_string();
        config.network.wifi_pass = option_env!("WIFI_PASS").unwrap_or("CHANGE_ME").to_string();

        if let Some(host) = option_env!("MQTT_HOST") {
            config.network.mqtt_host = host.to_string();
        }
        if let Some(port) = option_env!("MQTT_PORT").and_then(|value| value.parse().ok()) {
            config.network.mqtt_port = port;
        }
        config.network.mqtt_user = option_env!("MQTT_USER").unwrap_or("CHANGE_ME").to_string();
        config.network.mqtt_key = option_env!("MQTT_KEY").unwrap_or("CHANGE_ME").to_string();

        if let Some(host) = option_env!("DB_HOST") {
            config.network.db_host = host.to_string();
        }
        if let Some(port) = option_env!("DB_PORT").and_then(|value| value.parse().ok()) {
            config.network.db_port = port;
        }
        if let Some(name) = option_env!("DB_NAME") {
            config.network.db_name = name.to_string();
        }
        config.network.db_user = option_env!("DB_USER").unwrap_or_default().to_string();
        config.network.db_pass = option_env!("DB_PASS").unwrap_or_default().to_string();

        config.network.ota_password = option_env!("OTA_PASSWORD").unwrap_or_default().to_string();

        config.control.sanitize();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_band_matches_firmware_thresholds() {
        let config = ControlConfig::default();
        assert_eq!(config.low_threshold_c, 30.0);
        assert_eq!(config.high_threshold_c, 30.2);
        assert_eq!(config.poll_period_ms, 10_000);
    }

    #[test]
    fn sanitize_reopens_inverted_band() {
        let mut config = ControlConfig {
            low_threshold_c: 31.0,
            high_threshold_c: 30.0,
            poll_period_ms: 10_000,
        };
        config.sanitize();
        assert!(config.low_threshold_c < config.high_threshold_c);
    }

    #[test]
    fn sanitize_rejects_zero_period() {
        let mut config = ControlConfig {
            poll_period_ms: 0,
            ..ControlConfig::default()
        };
        config.sanitize();
        assert_eq!(config.poll_period_ms, 10_000);
    }

    #[test]
    fn sanitize_replaces_non_finite_thresholds() {
        let mut config = ControlConfig {
            low_threshold_c: f32::NAN,
            high_threshold_c: 30.2,
            poll_period_ms: 5_000,
        };
        config.sanitize();
        assert_eq!(config.low_threshold_c, 30.0);
        assert_eq!(config.poll_period_ms, 5_000);
    }
}
