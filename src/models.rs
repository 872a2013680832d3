use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Music,
    Sports,
    ArtsTheatre,
    Comedy,
    Festivals,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Music,
        Category::Sports,
        Category::ArtsTheatre,
        Category::Comedy,
        Category::Festivals,
    ];

    /// The classification name the event discovery API filters on.
    pub fn classification_name(&self) -> &'static str {
        match self {
            Category::Music => "Music",
            Category::Sports => "Sports",
            Category::ArtsTheatre => "Arts & Theatre",
            Category::Comedy => "Comedy",
            Category::Festivals => "Festivals",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.classification_name())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "music" => Ok(Category::Music),
            "sports" => Ok(Category::Sports),
            "artstheatre" | "artstheater" | "arts" | "theatre" => Ok(Category::ArtsTheatre),
            "comedy" => Ok(Category::Comedy),
            "festivals" | "festival" => Ok(Category::Festivals),
            _ => Err(format!("unknown event category: {s}")),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EventRecord {
    pub id: String,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub venue_name: String,
    pub venue_address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image_url: Option<String>,
    pub detail_url: String,
    pub category: Category,
}

impl EventRecord {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ForecastSample {
    pub timestamp: NaiveDateTime,
    pub temp: f64,
    pub temp_max: f64,
    pub temp_min: f64,
    pub precipitation_3h: f64,
    pub wind_speed: f64,
    pub humidity: f64,
    pub description: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub high_temp: f64,
    pub low_temp: f64,
    pub precipitation_mm: f64,
    pub description: String,
    pub icon: &'static str,
    pub recommendation: &'static str,
    pub humidity: f64,
    pub wind_speed_ms: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct HourlyPoint {
    pub time: NaiveDateTime,
    pub temperature: f64,
    pub precipitation_3h: f64,
    pub wind_speed_kmh: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlightOffer {
    #[serde(default)]
    pub id: String,
    pub price: OfferPrice,
    pub itineraries: Vec<Itinerary>,
}

impl FlightOffer {
    pub fn grand_total(&self) -> Option<f64> {
        self.price.grand_total.trim().parse().ok()
    }

    pub fn outbound(&self) -> Option<&Itinerary> {
        self.itineraries.first()
    }

    pub fn inbound(&self) -> Option<&Itinerary> {
        self.itineraries.get(1)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OfferPrice {
    pub currency: String,
    pub grand_total: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Itinerary {
    #[serde(default)]
    pub duration: String,
    pub segments: Vec<Segment>,
}

impl Itinerary {
    pub fn stops(&self) -> usize {
        self.segments.len().saturating_sub(1)
    }

    /// `ORIGIN - DESTINATION` from the first and last segment.
    pub fn route(&self) -> Option<String> {
        let first = self.segments.first()?;
        let last = self.segments.last()?;
        Some(format!(
            "{} - {}",
            first.departure.iata_code, last.arrival.iata_code
        ))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    #[serde(default)]
    pub carrier_code: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub aircraft: Option<AircraftRef>,
    pub departure: FlightEndpoint,
    pub arrival: FlightEndpoint,
    #[serde(default)]
    pub duration: String,
}

impl Segment {
    pub fn aircraft_code(&self) -> Option<&str> {
        self.aircraft.as_ref().map(|aircraft| aircraft.code.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AircraftRef {
    pub code: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlightEndpoint {
    pub iata_code: String,
    pub at: NaiveDateTime,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ReferenceDictionaries {
    pub carriers: HashMap<String, String>,
    pub aircraft: HashMap<String, String>,
    pub locations: HashMap<String, LocationInfo>,
}

impl ReferenceDictionaries {
    pub fn carrier_name(&self, code: &str) -> &str {
        self.carriers
            .get(code)
            .map(String::as_str)
            .unwrap_or("Unknown Airline")
    }

    pub fn aircraft_name(&self, code: &str) -> &str {
        self.aircraft
            .get(code)
            .map(String::as_str)
            .unwrap_or("Unknown Aircraft")
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationInfo {
    pub city_code: Option<String>,
    pub country_code: Option<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Hotel {
    pub name: String,
    pub rating: Option<f64>,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub photo_reference: Option<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CityLocation {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub country: Option<String>,
}

impl CityLocation {
    /// The `lat,lng` string the places API expects.
    pub fn location_param(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_category_labels() {
        assert_eq!("Music".parse::<Category>(), Ok(Category::Music));
        assert_eq!(
            "Arts & Theatre".parse::<Category>(),
            Ok(Category::ArtsTheatre)
        );
        assert_eq!("arts-theatre".parse::<Category>(), Ok(Category::ArtsTheatre));
        assert!("opera".parse::<Category>().is_err());
        assert_eq!(Category::ArtsTheatre.to_string(), "Arts & Theatre");
    }

    #[test]
    fn dictionary_lookups_fall_back() {
        let mut dictionaries = ReferenceDictionaries::default();
        dictionaries
            .carriers
            .insert("DL".to_string(), "DELTA AIR LINES".to_string());
        assert_eq!(dictionaries.carrier_name("DL"), "DELTA AIR LINES");
        assert_eq!(dictionaries.carrier_name("ZZ"), "Unknown Airline");
        assert_eq!(dictionaries.aircraft_name("321"), "Unknown Aircraft");
    }

    #[test]
    fn city_location_param() {
        let city = CityLocation {
            name: "Tokyo".to_string(),
            lat: 35.6897,
            lng: 139.6922,
            country: Some("Japan".to_string()),
        };
        assert_eq!(city.location_param(), "35.6897,139.6922");
    }
}
