use std::{fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::utils;

pub const DEFAULT_FLIGHTS_BASE: &str = "https://test.api.amadeus.com";
pub const DEFAULT_EVENTS_BASE: &str = "https://app.ticketmaster.com";
pub const DEFAULT_PLACES_BASE: &str = "https://maps.googleapis.com";
pub const DEFAULT_WEATHER_BASE: &str = "https://api.openweathermap.org";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub google_places_api_key: Option<String>,
    pub ticketmaster_api_key: Option<String>,
    pub openweather_api_key: Option<String>,
    pub amadeus_client_id: Option<String>,
    pub amadeus_client_secret: Option<String>,
    pub gazetteer_path: Option<PathBuf>,
    pub endpoints: Endpoints,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub flights: String,
    pub events: String,
    pub places: String,
    pub weather: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            flights: DEFAULT_FLIGHTS_BASE.to_string(),
            events: DEFAULT_EVENTS_BASE.to_string(),
            places: DEFAULT_PLACES_BASE.to_string(),
            weather: DEFAULT_WEATHER_BASE.to_string(),
        }
    }
}

impl AppConfig {
    /// Reads `config.json` from the data directory, then lets environment
    /// variables override individual credentials.
    pub fn load() -> Self {
        let path = utils::config_path();
        let mut config = match read_config(&path) {
            Ok(config) => config,
            Err(err) => {
                warn!("ignoring unreadable config {}: {err}", path.display());
                AppConfig::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = read("GOOGLE_PLACES_API_KEY") {
            self.google_places_api_key = Some(value);
        }
        if let Some(value) = read("TICKETMASTER_API_KEY") {
            self.ticketmaster_api_key = Some(value);
        }
        if let Some(value) = read("OPENWEATHER_API_KEY") {
            self.openweather_api_key = Some(value);
        }
        if let Some(value) = read("AMADEUS_CLIENT_ID") {
            self.amadeus_client_id = Some(value);
        }
        if let Some(value) = read("AMADEUS_CLIENT_SECRET") {
            self.amadeus_client_secret = Some(value);
        }
        if let Some(value) = read("TRAVEL_DASH_GAZETTEER") {
            self.gazetteer_path = Some(PathBuf::from(value));
        }
    }

    pub fn gazetteer_path(&self) -> PathBuf {
        self.gazetteer_path
            .clone()
            .unwrap_or_else(utils::default_gazetteer_path)
    }
}

fn read_config(path: &Path) -> Result<AppConfig, String> {
    if !path.exists() {
        debug!("no config file at {}", path.display());
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|err| err.to_string())?;
    serde_json::from_str(&contents).map_err(|err| err.to_string())
}
