use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{base, FetchError};
use crate::models::{FlightOffer, Itinerary, ReferenceDictionaries};

const TOKEN_PATH: &str = "/v1/security/oauth2/token";
const OFFERS_PATH: &str = "/v2/shopping/flight-offers";
const CURRENCY: &str = "USD";
pub const MAX_RESULTS: u32 = 249;
pub const MAX_PASSENGERS: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum StopPolicy {
    #[default]
    All,
    NonStop,
    OneStop,
    TwoPlusStops,
}

impl StopPolicy {
    pub fn accepts(&self, itinerary: &Itinerary) -> bool {
        let segments = itinerary.segments.len();
        match self {
            StopPolicy::All => true,
            StopPolicy::NonStop => segments == 1,
            StopPolicy::OneStop => segments == 2,
            StopPolicy::TwoPlusStops => segments >= 3,
        }
    }

    /// An offer qualifies when any one of its itineraries does.
    pub fn accepts_offer(&self, offer: &FlightOffer) -> bool {
        offer
            .itineraries
            .iter()
            .any(|itinerary| self.accepts(itinerary))
    }
}

impl fmt::Display for StopPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopPolicy::All => "All",
            StopPolicy::NonStop => "Non-stop",
            StopPolicy::OneStop => "1 Stop",
            StopPolicy::TwoPlusStops => "2+ Stops",
        })
    }
}

impl FromStr for StopPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '+')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "all" | "any" => Ok(StopPolicy::All),
            "nonstop" | "direct" | "0" => Ok(StopPolicy::NonStop),
            "1stop" | "onestop" | "1" => Ok(StopPolicy::OneStop),
            "2stops" | "2+stops" | "2+" | "2" => Ok(StopPolicy::TwoPlusStops),
            _ => Err(format!("unknown stop policy: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TravelClass {
    #[default]
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl TravelClass {
    pub fn as_param(&self) -> &'static str {
        match self {
            TravelClass::Economy => "ECONOMY",
            TravelClass::PremiumEconomy => "PREMIUM_ECONOMY",
            TravelClass::Business => "BUSINESS",
            TravelClass::First => "FIRST",
        }
    }
}

impl FromStr for TravelClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "ECONOMY" => Ok(TravelClass::Economy),
            "PREMIUM_ECONOMY" => Ok(TravelClass::PremiumEconomy),
            "BUSINESS" => Ok(TravelClass::Business),
            "FIRST" => Ok(TravelClass::First),
            _ => Err(format!("unknown travel class: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TripType {
    #[default]
    OneWay,
    RoundTrip,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlightRequest {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub passengers: u8,
    pub travel_class: TravelClass,
    pub trip_type: TripType,
    pub stop_policy: StopPolicy,
}

impl FlightRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.origin.trim().is_empty() || self.destination.trim().is_empty() {
            return Err("Departure and destination airport codes are required".into());
        }
        if self.passengers == 0 || self.passengers > MAX_PASSENGERS {
            return Err(format!(
                "Number of passengers must be between 1 and {MAX_PASSENGERS}"
            ));
        }
        if self.trip_type == TripType::RoundTrip {
            if let Some(return_date) = self.return_date {
                if return_date < self.departure_date {
                    return Err("Return date cannot be before the departure date".into());
                }
            }
        }
        Ok(())
    }

    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("originLocationCode", self.origin.trim().to_ascii_uppercase()),
            (
                "destinationLocationCode",
                self.destination.trim().to_ascii_uppercase(),
            ),
            (
                "departureDate",
                self.departure_date.format("%Y-%m-%d").to_string(),
            ),
            ("adults", self.passengers.to_string()),
            ("travelClass", self.travel_class.as_param().to_string()),
            ("currencyCode", CURRENCY.to_string()),
            ("max", MAX_RESULTS.to_string()),
        ];
        if self.trip_type == TripType::RoundTrip {
            if let Some(return_date) = self.return_date {
                params.push(("returnDate", return_date.format("%Y-%m-%d").to_string()));
            }
        }
        params
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FlightSearch {
    pub offers: Vec<FlightOffer>,
    pub dictionaries: ReferenceDictionaries,
}

pub fn filter_offers(offers: Vec<FlightOffer>, policy: StopPolicy) -> Vec<FlightOffer> {
    offers
        .into_iter()
        .filter(|offer| policy.accepts_offer(offer))
        .collect()
}

pub struct AmadeusClient {
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl AmadeusClient {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Client-credentials exchange. Every search calls this afresh.
    pub fn fetch_token(&self) -> Result<String, FetchError> {
        let url = base::endpoint(&self.base_url, TOKEN_PATH)?;
        let body = base::send(base::client().post(url).form(&[
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ]))
        .map_err(into_auth_error)?;
        parse_token(&body)
    }

    pub fn search(&self, request: &FlightRequest) -> Result<FlightSearch, FetchError> {
        let token = self.fetch_token()?;
        let url = base::endpoint(&self.base_url, OFFERS_PATH)?;
        debug!(
            origin = %request.origin,
            destination = %request.destination,
            "requesting flight offers"
        );
        let body = base::send(
            base::client()
                .get(url)
                .bearer_auth(token)
                .query(&request.query_params()),
        )?;
        let search = parse_offers(&body, request.stop_policy)?;
        info!(
            kept = search.offers.len(),
            policy = %request.stop_policy,
            "flight offers filtered"
        );
        Ok(search)
    }
}

fn into_auth_error(err: FetchError) -> FetchError {
    match err {
        FetchError::Network(_) | FetchError::InvalidUrl(_) | FetchError::Auth(_) => err,
        other => FetchError::Auth(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

pub fn parse_token(body: &str) -> Result<String, FetchError> {
    let token: TokenResponse = base::parse_json(body).map_err(into_auth_error)?;
    token
        .access_token
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| FetchError::Auth("token response missing access_token".to_string()))
}

#[derive(Debug, Deserialize)]
struct OffersResponse {
    #[serde(default)]
    data: Vec<FlightOffer>,
    #[serde(default)]
    dictionaries: ReferenceDictionaries,
}

pub fn parse_offers(body: &str, policy: StopPolicy) -> Result<FlightSearch, FetchError> {
    let response: OffersResponse = base::parse_json(body)?;
    Ok(FlightSearch {
        offers: filter_offers(response.data, policy),
        dictionaries: response.dictionaries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_JSON: &str = r#"
    {
      "meta": {"count": 2},
      "data": [
        {
          "type": "flight-offer",
          "id": "1",
          "itineraries": [
            {
              "duration": "PT5H30M",
              "segments": [
                {
                  "departure": {"iataCode": "JFK", "terminal": "4", "at": "2024-11-18T08:00:00"},
                  "arrival": {"iataCode": "LAX", "at": "2024-11-18T11:30:00"},
                  "carrierCode": "DL",
                  "number": "123",
                  "aircraft": {"code": "321"},
                  "duration": "PT5H30M",
                  "numberOfStops": 0
                }
              ]
            },
            {
              "duration": "PT9H",
              "segments": [
                {"departure": {"iataCode": "LAX", "at": "2024-11-22T07:00:00"}, "arrival": {"iataCode": "DEN", "at": "2024-11-22T10:00:00"}, "carrierCode": "UA", "number": "1", "duration": "PT2H"},
                {"departure": {"iataCode": "DEN", "at": "2024-11-22T11:00:00"}, "arrival": {"iataCode": "ORD", "at": "2024-11-22T14:00:00"}, "carrierCode": "UA", "number": "2", "duration": "PT2H"},
                {"departure": {"iataCode": "ORD", "at": "2024-11-22T15:00:00"}, "arrival": {"iataCode": "JFK", "at": "2024-11-22T18:00:00"}, "carrierCode": "UA", "number": "3", "duration": "PT2H"}
              ]
            }
          ],
          "price": {"currency": "USD", "total": "412.30", "base": "350.00", "grandTotal": "412.30"}
        },
        {
          "type": "flight-offer",
          "id": "2",
          "itineraries": [
            {
              "duration": "PT7H",
              "segments": [
                {"departure": {"iataCode": "JFK", "at": "2024-11-18T09:00:00"}, "arrival": {"iataCode": "ORD", "at": "2024-11-18T11:00:00"}, "carrierCode": "AA", "number": "10", "duration": "PT3H"},
                {"departure": {"iataCode": "ORD", "at": "2024-11-18T12:00:00"}, "arrival": {"iataCode": "LAX", "at": "2024-11-18T14:00:00"}, "carrierCode": "AA", "number": "11", "duration": "PT4H"}
              ]
            }
          ],
          "price": {"currency": "USD", "grandTotal": "289.00"}
        }
      ],
      "dictionaries": {
        "locations": {"JFK": {"cityCode": "NYC", "countryCode": "US"}},
        "aircraft": {"321": "AIRBUS A321"},
        "currencies": {"USD": "US DOLLAR"},
        "carriers": {"DL": "DELTA AIR LINES", "AA": "AMERICAN AIRLINES", "UA": "UNITED AIRLINES"}
      }
    }
    "#;

    fn ids(search: &FlightSearch) -> Vec<&str> {
        search.offers.iter().map(|o| o.id.as_str()).collect()
    }

    #[test]
    fn parses_offers_and_dictionaries() {
        let search = parse_offers(SAMPLE_JSON, StopPolicy::All).expect("parse offers");
        assert_eq!(ids(&search), vec!["1", "2"]);

        let first = &search.offers[0];
        assert_eq!(first.grand_total(), Some(412.30));
        assert_eq!(first.price.currency, "USD");
        assert_eq!(first.outbound().and_then(|i| i.route()).as_deref(), Some("JFK - LAX"));
        assert_eq!(first.inbound().map(|i| i.stops()), Some(2));
        assert_eq!(first.itineraries[0].segments[0].aircraft_code(), Some("321"));

        assert_eq!(search.dictionaries.carrier_name("DL"), "DELTA AIR LINES");
        assert_eq!(search.dictionaries.aircraft_name("321"), "AIRBUS A321");
        assert_eq!(
            search.dictionaries.locations["JFK"].city_code.as_deref(),
            Some("NYC")
        );
    }

    #[test]
    fn any_qualifying_itinerary_keeps_the_offer() {
        let search = parse_offers(SAMPLE_JSON, StopPolicy::NonStop).expect("parse offers");
        assert_eq!(ids(&search), vec!["1"]);
        // the 3-segment return leg rides along untouched
        assert_eq!(search.offers[0].itineraries.len(), 2);
    }

    #[test]
    fn two_plus_stops_excludes_single_stop_offer() {
        let search = parse_offers(SAMPLE_JSON, StopPolicy::TwoPlusStops).expect("parse offers");
        assert_eq!(ids(&search), vec!["1"]);

        let search = parse_offers(SAMPLE_JSON, StopPolicy::OneStop).expect("parse offers");
        assert_eq!(ids(&search), vec!["2"]);
    }

    #[test]
    fn non_json_offer_body_is_upstream_error() {
        let err = parse_offers("<!DOCTYPE html><p>Gateway timeout</p>", StopPolicy::All)
            .unwrap_err();
        assert!(err.is_upstream());
    }

    #[test]
    fn token_failures_are_auth_errors() {
        assert_eq!(
            parse_token(r#"{"type": "amadeusOAuth2Token", "access_token": "tok-1", "expires_in": 1799}"#)
                .expect("token"),
            "tok-1"
        );
        assert!(matches!(
            parse_token(r#"{"error": "invalid_client"}"#),
            Err(FetchError::Auth(_))
        ));
        assert!(matches!(parse_token("not json"), Err(FetchError::Auth(_))));
        assert!(matches!(
            into_auth_error(FetchError::Upstream {
                status: 401,
                body: "invalid_client".to_string()
            }),
            FetchError::Auth(_)
        ));
    }

    fn request(trip_type: TripType, return_date: Option<NaiveDate>) -> FlightRequest {
        FlightRequest {
            origin: " jfk ".to_string(),
            destination: "LAX".to_string(),
            departure_date: NaiveDate::from_ymd_opt(2024, 11, 18).expect("date"),
            return_date,
            passengers: 2,
            travel_class: TravelClass::Business,
            trip_type,
            stop_policy: StopPolicy::All,
        }
    }

    #[test]
    fn return_date_only_sent_for_round_trips() {
        let back = NaiveDate::from_ymd_opt(2024, 11, 22);

        let params = request(TripType::RoundTrip, back).query_params();
        assert!(params.contains(&("returnDate", "2024-11-22".to_string())));
        assert!(params.contains(&("originLocationCode", "JFK".to_string())));
        assert!(params.contains(&("travelClass", "BUSINESS".to_string())));
        assert!(params.contains(&("currencyCode", "USD".to_string())));
        assert!(params.contains(&("max", "249".to_string())));
        assert!(params.contains(&("adults", "2".to_string())));

        let params = request(TripType::OneWay, back).query_params();
        assert!(params.iter().all(|(key, _)| *key != "returnDate"));
    }

    #[test]
    fn validates_dates_and_passengers() {
        assert!(request(TripType::RoundTrip, NaiveDate::from_ymd_opt(2024, 11, 22))
            .validate()
            .is_ok());
        assert!(request(TripType::RoundTrip, NaiveDate::from_ymd_opt(2024, 11, 17))
            .validate()
            .is_err());
        assert!(request(TripType::OneWay, NaiveDate::from_ymd_opt(2024, 11, 17))
            .validate()
            .is_ok());

        let mut crowd = request(TripType::OneWay, None);
        crowd.passengers = 10;
        assert!(crowd.validate().is_err());
        crowd.passengers = 0;
        assert!(crowd.validate().is_err());
    }

    #[test]
    fn parses_policy_and_class_labels() {
        assert_eq!("Non-stop".parse::<StopPolicy>(), Ok(StopPolicy::NonStop));
        assert_eq!("1 Stop".parse::<StopPolicy>(), Ok(StopPolicy::OneStop));
        assert_eq!("2+ Stops".parse::<StopPolicy>(), Ok(StopPolicy::TwoPlusStops));
        assert_eq!("all".parse::<StopPolicy>(), Ok(StopPolicy::All));
        assert!("three".parse::<StopPolicy>().is_err());
        assert_eq!(StopPolicy::TwoPlusStops.to_string(), "2+ Stops");

        assert_eq!(
            "premium economy".parse::<TravelClass>(),
            Ok(TravelClass::PremiumEconomy)
        );
        assert_eq!("first".parse::<TravelClass>(), Ok(TravelClass::First));
    }
}
