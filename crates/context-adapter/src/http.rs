//! HTTP-backed context provider

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

use crate::parse::{self, ReverseGeocodeResponse, TrafficResponse, WeatherResponse};
use crate::{ContextConfig, ContextProvider, Lookup, LookupError};

/// Context provider calling the public weather, traffic and geocoding APIs.
///
/// Requests carry no timeout of their own unless `timeout_ms` is set, and
/// nothing is retried.
pub struct HttpContextAdapter {
    client: reqwest::Client,
    config: ContextConfig,
}

impl HttpContextAdapter {
    pub fn new(config: ContextConfig) -> Result<Self, LookupError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout_ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        let client = builder.build()?;
        info!(
            "Context adapter ready (weather key: {}, traffic key: {})",
            config.weather_api_key.is_some(),
            config.traffic_api_key.is_some()
        );
        Ok(Self { client, config })
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, LookupError> {
        debug!("GET {}", url);
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }
        Ok(response.json::<T>().await?)
    }

    async fn weather(&self, latitude: f64, longitude: f64) -> Result<String, LookupError> {
        let key = self
            .config
            .weather_api_key
            .as_deref()
            .ok_or(LookupError::MissingApiKey("weather"))?;
        let query = [
            ("lat", latitude.to_string()),
            ("lon", longitude.to_string()),
            ("appid", key.to_string()),
            ("units", "metric".to_string()),
        ];
        let response: WeatherResponse = self.fetch_json(&self.config.weather_url, &query).await?;
        parse::describe_weather(&response)
    }

    async fn traffic(&self, latitude: f64, longitude: f64) -> Result<String, LookupError> {
        let key = self
            .config
            .traffic_api_key
            .as_deref()
            .ok_or(LookupError::MissingApiKey("traffic"))?;
        let query = [
            ("point", format!("{},{}", latitude, longitude)),
            ("unit", "KMPH".to_string()),
            ("key", key.to_string()),
        ];
        let response: TrafficResponse = self.fetch_json(&self.config.traffic_url, &query).await?;
        parse::describe_traffic(&response)
    }

    async fn road_type(&self, latitude: f64, longitude: f64) -> Result<String, LookupError> {
        let query = [
            ("lat", latitude.to_string()),
            ("lon", longitude.to_string()),
            ("format", "json".to_string()),
            ("zoom", "18".to_string()),
            ("addressdetails", "1".to_string()),
        ];
        let response: ReverseGeocodeResponse =
            self.fetch_json(&self.config.road_url, &query).await?;
        parse::describe_road_type(&response)
    }
}

#[async_trait]
impl ContextProvider for HttpContextAdapter {
    async fn describe_weather(&self, latitude: f64, longitude: f64) -> Lookup {
        Lookup::from_result("Weather", self.weather(latitude, longitude).await)
    }

    async fn describe_traffic(&self, latitude: f64, longitude: f64) -> Lookup {
        Lookup::from_result("Traffic", self.traffic(latitude, longitude).await)
    }

    async fn describe_road_type(&self, latitude: f64, longitude: f64) -> Lookup {
        Lookup::from_result("Road type", self.road_type(latitude, longitude).await)
    }
}
