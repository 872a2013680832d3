use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::debug;

use super::{base, FetchError};
use crate::models::ForecastSample;
use crate::utils;

const FORECAST_PATH: &str = "/data/2.5/forecast";
const SAMPLE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct OpenWeatherClient {
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// 5-day forecast in 3-hour steps, metric units, in upstream order.
    pub fn fetch_forecast(&self, city: &str) -> Result<Vec<ForecastSample>, FetchError> {
        let url = base::endpoint(&self.base_url, FORECAST_PATH)?;
        debug!(city, "requesting forecast");
        let body = base::send(base::client().get(url).query(&[
            ("q", city),
            ("appid", self.api_key.as_str()),
            ("units", "metric"),
        ]))?;
        parse_forecast(&body)
    }
}

pub fn parse_forecast(body: &str) -> Result<Vec<ForecastSample>, FetchError> {
    let response: ForecastResponse = base::parse_json(body)?;
    response
        .list
        .into_iter()
        .map(ForecastDoc::into_sample)
        .collect()
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastDoc>,
}

#[derive(Debug, Deserialize)]
struct ForecastDoc {
    dt_txt: String,
    main: MainDoc,
    #[serde(default)]
    weather: Vec<ConditionDoc>,
    wind: Option<WindDoc>,
    rain: Option<RainDoc>,
}

#[derive(Debug, Deserialize)]
struct MainDoc {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
    #[serde(default)]
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionDoc {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct WindDoc {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct RainDoc {
    #[serde(rename = "3h", default)]
    three_hours: f64,
}

impl ForecastDoc {
    fn into_sample(self) -> Result<ForecastSample, FetchError> {
        let timestamp = NaiveDateTime::parse_from_str(&self.dt_txt, SAMPLE_TIME_FORMAT)
            .map_err(|err| FetchError::Malformed(format!("bad dt_txt {:?}: {err}", self.dt_txt)))?;
        let description = self
            .weather
            .into_iter()
            .next()
            .map(|condition| utils::clean_text(&condition.description))
            .unwrap_or_default();

        Ok(ForecastSample {
            timestamp,
            temp: self.main.temp,
            temp_max: self.main.temp_max,
            temp_min: self.main.temp_min,
            precipitation_3h: self.rain.map(|rain| rain.three_hours).unwrap_or(0.0),
            wind_speed: self.wind.map(|wind| wind.speed).unwrap_or(0.0),
            humidity: self.main.humidity,
            description,
        })
    }
}
