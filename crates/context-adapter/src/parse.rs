//! Provider response parsing

use serde::Deserialize;

use crate::LookupError;

#[derive(Debug, Deserialize)]
pub struct WeatherResponse {
    pub weather: Vec<WeatherCondition>,
    pub main: WeatherMain,
}

#[derive(Debug, Deserialize)]
pub struct WeatherCondition {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct WeatherMain {
    pub temp: f64,
    pub humidity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficResponse {
    pub flow_segment_data: FlowSegment,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSegment {
    pub current_speed: f64,
    pub free_flow_speed: f64,
}

#[derive(Debug, Deserialize)]
pub struct ReverseGeocodeResponse {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub address: Option<Address>,
}

#[derive(Debug, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub road: Option<String>,
}

/// Three-line weather summary
pub fn describe_weather(response: &WeatherResponse) -> Result<String, LookupError> {
    let condition = response
        .weather
        .first()
        .ok_or_else(|| LookupError::Parse("empty weather list".to_string()))?;

    Ok(format!(
        "Weather: {}\nTemp: {}°C\nHumidity: {}%",
        capitalize_first(&condition.description),
        response.main.temp,
        response.main.humidity
    ))
}

/// Traffic level from the current / free-flow speed ratio
pub fn describe_traffic(response: &TrafficResponse) -> Result<String, LookupError> {
    let segment = &response.flow_segment_data;
    if !(segment.free_flow_speed > 0.0) || !segment.current_speed.is_finite() {
        return Err(LookupError::Parse(format!(
            "unusable flow speeds {} / {}",
            segment.current_speed, segment.free_flow_speed
        )));
    }

    let ratio = segment.current_speed / segment.free_flow_speed;
    let level = if ratio > 0.8 {
        "Light traffic"
    } else if ratio > 0.5 {
        "Moderate traffic"
    } else {
        "Heavy traffic"
    };
    Ok(level.to_string())
}

/// Road class label, followed by the road name when known
pub fn describe_road_type(response: &ReverseGeocodeResponse) -> Result<String, LookupError> {
    let label = match response.kind.as_str() {
        "motorway" => "Highway".to_string(),
        "residential" => "Residential Street".to_string(),
        "primary" => "Primary Road".to_string(),
        "tertiary" => "Tertiary Road".to_string(),
        "unclassified" => "Local Road".to_string(),
        "" => "Unknown Road".to_string(),
        other => capitalize_first(other),
    };

    let road = response
        .address
        .as_ref()
        .and_then(|a| a.road.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty());

    Ok(match road {
        Some(name) => format!("{} ({})", label, name),
        None => label,
    })
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse<T: serde::de::DeserializeOwned>(json: &str) -> T {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_weather_summary() {
        let response: WeatherResponse = parse(
            r#"{"weather":[{"id":500,"description":"light rain"}],
                "main":{"temp":12.5,"humidity":81,"pressure":1012}}"#,
        );
        assert_eq!(
            describe_weather(&response).unwrap(),
            "Weather: Light rain\nTemp: 12.5°C\nHumidity: 81%"
        );
    }

    #[test]
    fn test_weather_without_conditions_fails() {
        let response: WeatherResponse = parse(r#"{"weather":[],"main":{"temp":1.0,"humidity":2}}"#);
        assert!(matches!(describe_weather(&response), Err(LookupError::Parse(_))));
    }

    #[test]
    fn test_traffic_levels() {
        let level = |current: f64, free: f64| {
            describe_traffic(&TrafficResponse {
                flow_segment_data: FlowSegment {
                    current_speed: current,
                    free_flow_speed: free,
                },
            })
        };
        assert_eq!(level(90.0, 100.0).unwrap(), "Light traffic");
        assert_eq!(level(80.0, 100.0).unwrap(), "Moderate traffic");
        assert_eq!(level(51.0, 100.0).unwrap(), "Moderate traffic");
        assert_eq!(level(50.0, 100.0).unwrap(), "Heavy traffic");
        assert!(level(50.0, 0.0).is_err());
    }

    #[test]
    fn test_traffic_json_field_names() {
        let response: TrafficResponse = parse(
            r#"{"flowSegmentData":{"frc":"FRC2","currentSpeed":30,"freeFlowSpeed":60}}"#,
        );
        assert_eq!(describe_traffic(&response).unwrap(), "Heavy traffic");
    }

    #[test]
    fn test_road_labels() {
        let response: ReverseGeocodeResponse =
            parse(r#"{"type":"residential","address":{"road":"Elm Street"}}"#);
        assert_eq!(
            describe_road_type(&response).unwrap(),
            "Residential Street (Elm Street)"
        );

        let response: ReverseGeocodeResponse = parse(r#"{"type":"motorway","address":{}}"#);
        assert_eq!(describe_road_type(&response).unwrap(), "Highway");

        let response: ReverseGeocodeResponse =
            parse(r#"{"type":"secondary","address":{"road":"  "}}"#);
        assert_eq!(describe_road_type(&response).unwrap(), "Secondary");

        let response: ReverseGeocodeResponse = parse(r#"{}"#);
        assert_eq!(describe_road_type(&response).unwrap(), "Unknown Road");
    }
}
