//! Context lookup configuration

use serde::{Deserialize, Serialize};

/// Endpoints and credentials for the context services
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// OpenWeather current-weather endpoint
    pub weather_url: String,
    pub weather_api_key: Option<String>,

    /// TomTom flow segment endpoint
    pub traffic_url: String,
    pub traffic_api_key: Option<String>,

    /// Nominatim reverse geocoding endpoint
    pub road_url: String,

    /// User-Agent header (required by Nominatim's usage policy)
    pub user_agent: String,

    /// Per-request timeout (milliseconds); the HTTP client's own
    /// behavior applies when unset
    pub timeout_ms: Option<u64>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            weather_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            weather_api_key: None,
            traffic_url:
                "https://api.tomtom.com/traffic/services/4/flowSegmentData/absolute/10/json"
                    .to_string(),
            traffic_api_key: None,
            road_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
            user_agent: "DrivingBehaviorMonitor/1.0".to_string(),
            timeout_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_unset_by_default() {
        assert_eq!(ContextConfig::default().timeout_ms, None);

        let config: ContextConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.timeout_ms, None);
        assert_eq!(config.user_agent, "DrivingBehaviorMonitor/1.0");

        let config: ContextConfig = serde_json::from_str(r#"{"timeout_ms": 2500}"#).unwrap();
        assert_eq!(config.timeout_ms, Some(2500));
    }
}
