pub mod config;
pub mod forecast;
pub mod format;
pub mod gazetteer;
pub mod map;
pub mod models;
pub mod sources;
mod utils;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub use config::AppConfig;
use forecast::{EXTENDED_OUTLOOK_DAYS, HOURLY_WINDOW_HOURS, SHORT_OUTLOOK_DAYS};
use map::MapView;
use models::{Category, CityLocation, DailyForecast, EventRecord, ForecastSample, Hotel, HourlyPoint};
use sources::events::{self, EventPageSource, EventQuery, EventSearch, TicketmasterClient};
use sources::flights::{AmadeusClient, FlightRequest, FlightSearch};
use sources::hotels::PlacesClient;
use sources::weather::OpenWeatherClient;
pub use sources::FetchError;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("unknown city: {0}")]
    UnknownCity(String),
    #[error("city table has not been loaded")]
    GazetteerNotLoaded,
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[derive(Debug, Clone, Serialize)]
pub struct EventReport {
    pub city: CityLocation,
    pub search: EventSearch,
    pub forecast: Vec<DailyForecast>,
    pub warnings: Vec<String>,
}

impl EventReport {
    pub fn forecast_for(&self, event: &EventRecord) -> Option<&DailyForecast> {
        forecast::forecast_for_event(&self.forecast, event.start_date)
    }

    pub fn map_view(&self) -> MapView {
        MapView::for_events(&self.city, &self.search)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HotelReport {
    pub city: CityLocation,
    pub hotels: Vec<Hotel>,
    pub photo_urls: Vec<Option<String>>,
}

impl HotelReport {
    pub fn map_view(&self) -> MapView {
        MapView::for_hotels(&self.city, &self.hotels)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WeatherReport {
    pub city: String,
    pub outlook: Vec<DailyForecast>,
    pub hourly: Vec<HourlyPoint>,
    pub extended: Vec<DailyForecast>,
}

impl WeatherReport {
    pub fn from_samples(city: &str, samples: &[ForecastSample], now: NaiveDateTime) -> Self {
        Self {
            city: city.to_string(),
            outlook: forecast::reduce_to_daily(samples, SHORT_OUTLOOK_DAYS),
            hourly: forecast::reduce_to_hourly_window(samples, now, HOURLY_WINDOW_HOURS),
            extended: forecast::reduce_to_daily(samples, EXTENDED_OUTLOOK_DAYS),
        }
    }
}

pub struct Dashboard {
    config: AppConfig,
}

impl Dashboard {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn search_flights(&self, request: &FlightRequest) -> Result<FlightSearch, DashboardError> {
        request.validate().map_err(DashboardError::InvalidRequest)?;
        let client = AmadeusClient::new(
            &self.config.endpoints.flights,
            credential(&self.config.amadeus_client_id, "AMADEUS_CLIENT_ID")?,
            credential(&self.config.amadeus_client_secret, "AMADEUS_CLIENT_SECRET")?,
        );
        let search = client.search(request)?;
        info!(
            origin = %request.origin,
            destination = %request.destination,
            offers = search.offers.len(),
            "flight search finished"
        );
        Ok(search)
    }

    pub fn search_hotels(
        &self,
        city: &CityLocation,
        start: NaiveDate,
        end: NaiveDate,
        radius_m: u32,
    ) -> Result<HotelReport, DashboardError> {
        if end < start {
            return Err(DashboardError::InvalidRequest(
                "End date cannot be before start date".into(),
            ));
        }
        let client = PlacesClient::new(
            &self.config.endpoints.places,
            credential(&self.config.google_places_api_key, "GOOGLE_PLACES_API_KEY")?,
        );
        let hotels = client.search_hotels(&city.location_param(), radius_m)?;
        let photo_urls = hotels
            .iter()
            .map(|hotel| {
                hotel
                    .photo_reference
                    .as_deref()
                    .and_then(|reference| client.photo_url(reference).ok())
            })
            .collect();
        info!(city = %city.name, hotels = hotels.len(), "hotel search finished");

        Ok(HotelReport {
            city: city.clone(),
            hotels,
            photo_urls,
        })
    }

    /// Events for the date range plus the city's daily forecast. A failed
    /// category or a missing forecast shows up in `warnings`, not as an error.
    pub fn search_events(
        &self,
        city: &CityLocation,
        start: NaiveDate,
        end: NaiveDate,
        categories: &[Category],
    ) -> Result<EventReport, DashboardError> {
        let client = TicketmasterClient::new(
            &self.config.endpoints.events,
            credential(&self.config.ticketmaster_api_key, "TICKETMASTER_API_KEY")?,
        );
        self.search_events_with(&client, city, start, end, categories)
    }

    pub fn search_events_with<S: EventPageSource + ?Sized>(
        &self,
        source: &S,
        city: &CityLocation,
        start: NaiveDate,
        end: NaiveDate,
        categories: &[Category],
    ) -> Result<EventReport, DashboardError> {
        let query = event_query(&city.name, start, end, categories)?;
        let search = events::collect_events(source, &query, categories);

        let mut warnings: Vec<String> = search
            .failures
            .iter()
            .map(|failure| {
                format!(
                    "Could not retrieve {} events (page {}): {}",
                    failure.category,
                    failure.page + 1,
                    failure.error
                )
            })
            .collect();
        if !search.skipped.is_empty() {
            let skipped: Vec<String> = search.skipped.iter().map(|c| c.to_string()).collect();
            warnings.push(format!("Skipped categories: {}", skipped.join(", ")));
        }

        let forecast = match self.fetch_forecast(&city.name) {
            Ok(samples) => forecast::reduce_to_daily(&samples, EXTENDED_OUTLOOK_DAYS),
            Err(err) => {
                warn!(city = %city.name, "forecast unavailable: {err}");
                warnings.push(format!("Weather data could not be retrieved: {err}"));
                Vec::new()
            }
        };

        info!(
            city = %city.name,
            events = search.events.len(),
            failures = search.failures.len(),
            "event search finished"
        );
        Ok(EventReport {
            city: city.clone(),
            search,
            forecast,
            warnings,
        })
    }

    pub fn fetch_forecast(&self, city: &str) -> Result<Vec<ForecastSample>, DashboardError> {
        let client = OpenWeatherClient::new(
            &self.config.endpoints.weather,
            credential(&self.config.openweather_api_key, "OPENWEATHER_API_KEY")?,
        );
        Ok(client.fetch_forecast(city)?)
    }

    pub fn weather_report(
        &self,
        city: &str,
        now: NaiveDateTime,
    ) -> Result<WeatherReport, DashboardError> {
        let samples = self.fetch_forecast(city)?;
        info!(city, samples = samples.len(), "forecast received");
        Ok(WeatherReport::from_samples(city, &samples, now))
    }
}

pub fn event_query(
    city: &str,
    start: NaiveDate,
    end: NaiveDate,
    categories: &[Category],
) -> Result<EventQuery, DashboardError> {
    if start > end {
        return Err(DashboardError::InvalidRequest(
            "Start date cannot be after end date".into(),
        ));
    }
    if categories.is_empty() {
        return Err(DashboardError::InvalidRequest(
            "Please select at least one event category".into(),
        ));
    }
    let start = start
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| DashboardError::InvalidRequest(format!("invalid start date {start}")))?;
    let end = end
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| DashboardError::InvalidRequest(format!("invalid end date {end}")))?;
    Ok(EventQuery {
        city: city.to_string(),
        start,
        end,
    })
}

pub fn city_location(name: &str) -> Result<CityLocation, DashboardError> {
    lookup_city(gazetteer::global(), name)
}

fn lookup_city(
    table: Option<&gazetteer::Gazetteer>,
    name: &str,
) -> Result<CityLocation, DashboardError> {
    table
        .ok_or(DashboardError::GazetteerNotLoaded)?
        .lookup(name)
        .cloned()
        .ok_or_else(|| DashboardError::UnknownCity(name.to_string()))
}

fn credential<'a>(
    value: &'a Option<String>,
    name: &'static str,
) -> Result<&'a str, DashboardError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(DashboardError::MissingCredential(name))
}
