use serde::Serialize;
use serde_json::{json, Value};

use crate::models::{CityLocation, Hotel};
use crate::sources::events::EventSearch;

pub const DEFAULT_ZOOM: u8 = 12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub lat: f64,
    pub lng: f64,
    pub title: String,
    pub popup: String,
}

/// Marker data for a map centred on a city. Built from the result of a
/// search, never from remembered state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub center: (f64, f64),
    pub zoom: u8,
    pub markers: Vec<MapMarker>,
}

impl MapView {
    pub fn centered_on(city: &CityLocation) -> Self {
        Self {
            center: (city.lat, city.lng),
            zoom: DEFAULT_ZOOM,
            markers: Vec::new(),
        }
    }

    /// Events without venue coordinates are left off the map.
    pub fn for_events(city: &CityLocation, search: &EventSearch) -> Self {
        let mut view = Self::centered_on(city);
        view.markers = search
            .events
            .iter()
            .filter_map(|event| {
                let (lat, lng) = event.coordinates()?;
                let date = event
                    .start_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "N/A".to_string());
                Some(MapMarker {
                    lat,
                    lng,
                    title: event.name.clone(),
                    popup: format!(
                        "{}\nDate: {date}\nAddress: {}",
                        event.name, event.venue_address
                    ),
                })
            })
            .collect();
        view
    }

    pub fn for_hotels(city: &CityLocation, hotels: &[Hotel]) -> Self {
        let mut view = Self::centered_on(city);
        view.markers = hotels
            .iter()
            .map(|hotel| MapMarker {
                lat: hotel.latitude,
                lng: hotel.longitude,
                title: hotel.name.clone(),
                popup: format!(
                    "{}\nRating: {}",
                    hotel.name,
                    hotel
                        .rating
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "N/A".to_string())
                ),
            })
            .collect();
        view
    }

    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> = self
            .markers
            .iter()
            .map(|marker| {
                json!({
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [marker.lng, marker.lat]},
                    "properties": {"title": marker.title, "popup": marker.popup},
                })
            })
            .collect();
        json!({
            "type": "FeatureCollection",
            "center": [self.center.1, self.center.0],
            "zoom": self.zoom,
            "features": features,
        })
    }
}
