//! Driving Context Lookups
//!
//! Descriptions shown next to the classified events:
//! - Weather (OpenWeather current conditions)
//! - Traffic flow (TomTom flow segment data)
//! - Road type (Nominatim reverse geocoding)
//!
//! Lookups are never retried or cached. Any transport or parse failure is
//! logged and reported as [`Lookup::Unavailable`].

mod config;
mod http;
pub mod parse;

pub use config::ContextConfig;
pub use http::HttpContextAdapter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Lookup error types
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    Parse(String),

    #[error("No API key configured for {0}")]
    MissingApiKey(&'static str),
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LookupError::Parse(err.to_string())
        } else {
            LookupError::Transport(err.to_string())
        }
    }
}

/// Result of a context lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum Lookup {
    Available(String),
    Unavailable,
}

impl Lookup {
    /// Collapse a lookup result, logging the failure
    pub fn from_result(what: &str, result: Result<String, LookupError>) -> Self {
        match result {
            Ok(text) => Lookup::Available(text),
            Err(e) => {
                warn!("{} lookup unavailable: {}", what, e);
                Lookup::Unavailable
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Lookup::Available(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Lookup::Available(text) => Some(text),
            Lookup::Unavailable => None,
        }
    }
}

/// Coordinate-keyed context lookups
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn describe_weather(&self, latitude: f64, longitude: f64) -> Lookup;

    async fn describe_traffic(&self, latitude: f64, longitude: f64) -> Lookup;

    async fn describe_road_type(&self, latitude: f64, longitude: f64) -> Lookup;
}

/// All three descriptions for one coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextReport {
    pub latitude: f64,
    pub longitude: f64,
    pub weather: Lookup,
    pub traffic: Lookup,
    pub road_type: Lookup,
}

impl ContextReport {
    /// Report with every lookup unavailable
    pub fn unavailable(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            weather: Lookup::Unavailable,
            traffic: Lookup::Unavailable,
            road_type: Lookup::Unavailable,
        }
    }
}

/// Run the three lookups concurrently
pub async fn describe_all<P>(provider: &P, latitude: f64, longitude: f64) -> ContextReport
where
    P: ContextProvider + ?Sized,
{
    let (weather, traffic, road_type) = tokio::join!(
        provider.describe_weather(latitude, longitude),
        provider.describe_traffic(latitude, longitude),
        provider.describe_road_type(latitude, longitude),
    );
    ContextReport {
        latitude,
        longitude,
        weather,
        traffic,
        road_type,
    }
}
