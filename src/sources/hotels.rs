use serde::Deserialize;
use tracing::debug;

use super::{base, FetchError};
use crate::models::Hotel;

const NEARBY_PATH: &str = "/maps/api/place/nearbysearch/json";
const PHOTO_PATH: &str = "/maps/api/place/photo";
pub const DEFAULT_RADIUS_M: u32 = 5000;
const PHOTO_MAX_WIDTH: u32 = 400;

pub struct PlacesClient {
    base_url: String,
    api_key: String,
}

impl PlacesClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Lodging around a `lat,lng` location string.
    pub fn search_hotels(&self, location: &str, radius_m: u32) -> Result<Vec<Hotel>, FetchError> {
        let url = base::endpoint(&self.base_url, NEARBY_PATH)?;
        let radius = radius_m.to_string();
        debug!(location, radius_m, "requesting nearby lodging");
        let body = base::send(base::client().get(url).query(&[
            ("location", location),
            ("radius", radius.as_str()),
            ("type", "lodging"),
            ("key", self.api_key.as_str()),
        ]))?;
        parse_hotels(&body)
    }

    pub fn photo_url(&self, photo_reference: &str) -> Result<String, FetchError> {
        let mut url = base::endpoint(&self.base_url, PHOTO_PATH)?;
        url.query_pairs_mut()
            .append_pair("maxwidth", &PHOTO_MAX_WIDTH.to_string())
            .append_pair("photoreference", photo_reference)
            .append_pair("key", &self.api_key);
        Ok(url.into())
    }
}

#[derive(Debug, Deserialize)]
struct NearbyResponse {
    #[serde(default)]
    results: Vec<PlaceDoc>,
    status: Option<String>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceDoc {
    name: String,
    rating: Option<f64>,
    vicinity: Option<String>,
    geometry: GeometryDoc,
    #[serde(default)]
    photos: Vec<PhotoDoc>,
}

#[derive(Debug, Deserialize)]
struct GeometryDoc {
    location: LatLngDoc,
}

#[derive(Debug, Deserialize)]
struct LatLngDoc {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct PhotoDoc {
    photo_reference: String,
}

pub fn parse_hotels(body: &str) -> Result<Vec<Hotel>, FetchError> {
    let response: NearbyResponse = base::parse_json(body)?;
    match response.status.as_deref() {
        None | Some("OK") | Some("ZERO_RESULTS") => {}
        Some(status) => {
            return Err(FetchError::Upstream {
                status: 200,
                body: format!(
                    "{status}: {}",
                    response.error_message.unwrap_or_default()
                ),
            });
        }
    }

    Ok(response
        .results
        .into_iter()
        .map(|place| Hotel {
            name: place.name,
            rating: place.rating,
            address: place.vicinity,
            latitude: place.geometry.location.lat,
            longitude: place.geometry.location.lng,
            photo_reference: place
                .photos
                .into_iter()
                .next()
                .map(|photo| photo.photo_reference),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_JSON: &str = r#"
    {
      "html_attributions": [],
      "results": [
        {
          "name": "The Grove Hotel",
          "place_id": "ChIJ1",
          "rating": 4.3,
          "vicinity": "245 S Capitol Blvd, Boise",
          "geometry": {"location": {"lat": 43.6139, "lng": -116.2025}},
          "photos": [{"height": 1365, "width": 2048, "photo_reference": "AZose0k"}]
        },
        {
          "name": "Riverside Motel",
          "geometry": {"location": {"lat": 43.62, "lng": -116.21}}
        }
      ],
      "status": "OK"
    }
    "#;

    #[test]
    fn parses_lodging_results() {
        let hotels = parse_hotels(SAMPLE_JSON).expect("parse hotels");
        assert_eq!(hotels.len(), 2);
        assert_eq!(hotels[0].name, "The Grove Hotel");
        assert_eq!(hotels[0].rating, Some(4.3));
        assert_eq!(hotels[0].photo_reference.as_deref(), Some("AZose0k"));
        assert_eq!(hotels[1].address, None);
        assert_eq!(hotels[1].photo_reference, None);
    }

    #[test]
    fn zero_results_is_empty_not_error() {
        let hotels = parse_hotels(r#"{"results": [], "status": "ZERO_RESULTS"}"#)
            .expect("zero results");
        assert!(hotels.is_empty());
    }

    #[test]
    fn denied_request_is_upstream_error() {
        let err = parse_hotels(
            r#"{"results": [], "status": "REQUEST_DENIED", "error_message": "The provided API key is invalid."}"#,
        )
        .unwrap_err();
        match err {
            FetchError::Upstream { body, .. } => assert!(body.starts_with("REQUEST_DENIED")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn builds_photo_urls() {
        let client = PlacesClient::new("https://maps.googleapis.com", "k-123");
        let url = client.photo_url("AZose0k").expect("photo url");
        assert_eq!(
            url,
            "https://maps.googleapis.com/maps/api/place/photo?maxwidth=400&photoreference=AZose0k&key=k-123"
        );
    }
}
