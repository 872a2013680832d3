use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::forecast;
use crate::models::{
    DailyForecast, EventRecord, FlightOffer, Hotel, HourlyPoint, Itinerary,
    ReferenceDictionaries,
};
use crate::utils;

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?)?$").expect("valid duration regex")
});

/// `PT2H30M` → `(2, 30)`. A day component is folded into the hours.
pub fn parse_duration(value: &str) -> Option<(u32, u32)> {
    let caps = DURATION_RE.captures(value.trim())?;
    if caps.iter().skip(1).all(|group| group.is_none()) {
        return None;
    }
    let number = |idx: usize| -> Option<u32> {
        match caps.get(idx) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    let hours = number(1)?.checked_mul(24)?.checked_add(number(2)?)?;
    Some((hours, number(3)?))
}

pub fn format_duration(value: &str) -> String {
    match parse_duration(value) {
        Some((hours, minutes)) => format!("{hours} hours {minutes} minutes"),
        None => value.to_string(),
    }
}

pub fn format_timestamp(at: &NaiveDateTime) -> String {
    at.format("%b %d, %Y - %I:%M %p").to_string()
}

pub fn format_long_date(date: &NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

pub fn weekday(date: &NaiveDate) -> String {
    date.format("%A").to_string()
}

pub fn hour_label(at: &NaiveDateTime) -> String {
    at.format("%I %p").to_string()
}

pub fn event_card(event: &EventRecord, forecast: Option<&DailyForecast>) -> String {
    let date = event
        .start_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let (icon, advice) = forecast
        .map(|day| (day.icon, day.recommendation))
        .unwrap_or(("🌥️", "Check weather details"));

    let mut lines = vec![
        event.name.clone(),
        format!("Date: {date}"),
        format!("Venue: {}", event.venue_name),
        format!("Address: {}", event.venue_address),
        format!("More Details: {}", event.detail_url),
        format!("Weather: {icon} {advice}"),
    ];
    if let Some(image) = &event.image_url {
        lines.push(format!("Image: {image}"));
    }
    lines.join("\n")
}

pub fn itinerary_lines(itinerary: &Itinerary, dictionaries: &ReferenceDictionaries) -> Vec<String> {
    let mut lines = vec![format!(
        "Total Duration: {}",
        format_duration(&itinerary.duration)
    )];

    for segment in &itinerary.segments {
        let carrier_code = segment.carrier_code.as_deref().unwrap_or("Unknown");
        let flight_number = segment.number.as_deref().unwrap_or("N/A");
        let aircraft_code = segment.aircraft_code().unwrap_or("Unknown");

        lines.push(format!(
            "Airline: {} ({carrier_code}{flight_number})",
            dictionaries.carrier_name(carrier_code)
        ));
        lines.push(format!(
            "Aircraft: {} ({aircraft_code})",
            dictionaries.aircraft_name(aircraft_code)
        ));
        lines.push(format!(
            "Route: {} - {}",
            segment.departure.iata_code, segment.arrival.iata_code
        ));
        lines.push(format!(
            "Departure: {}",
            format_timestamp(&segment.departure.at)
        ));
        lines.push(format!("Arrival: {}", format_timestamp(&segment.arrival.at)));
        lines.push(format!(
            "Flight Duration: {}",
            format_duration(&segment.duration)
        ));
        lines.push("---".to_string());
    }

    lines
}

pub fn flight_summary(
    index: usize,
    offer: &FlightOffer,
    dictionaries: &ReferenceDictionaries,
) -> String {
    let outbound_route = offer
        .outbound()
        .and_then(Itinerary::route)
        .unwrap_or_else(|| "N/A".to_string());
    let inbound_route = offer.inbound().and_then(Itinerary::route);

    let mut lines = vec![
        match &inbound_route {
            Some(inbound) => format!("Flight {index}: {outbound_route} / {inbound}"),
            None => format!("Flight {index}: {outbound_route}"),
        },
        format!("Price: {} {}", offer.price.currency, offer.price.grand_total),
    ];

    if let Some(outbound) = offer.outbound() {
        lines.push("Outbound Flight".to_string());
        lines.extend(itinerary_lines(outbound, dictionaries));
    }
    if let Some(inbound) = offer.inbound() {
        lines.push("Inbound Flight".to_string());
        lines.extend(itinerary_lines(inbound, dictionaries));
    }

    lines.join("\n")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirlinePrice {
    pub airline: String,
    pub average_price: f64,
    pub offers: usize,
}

/// Mean grand total per carrier of the first outbound segment, by airline
/// name. Offers with an unparsable price are left out.
pub fn average_price_by_airline(
    offers: &[FlightOffer],
    dictionaries: &ReferenceDictionaries,
) -> Vec<AirlinePrice> {
    let mut totals: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for offer in offers {
        let Some(price) = offer.grand_total() else {
            continue;
        };
        let carrier = offer
            .outbound()
            .and_then(|itinerary| itinerary.segments.first())
            .and_then(|segment| segment.carrier_code.as_deref())
            .unwrap_or("Unknown");
        let entry = totals
            .entry(dictionaries.carrier_name(carrier).to_string())
            .or_insert((0.0, 0));
        entry.0 += price;
        entry.1 += 1;
    }

    totals
        .into_iter()
        .map(|(airline, (sum, count))| AirlinePrice {
            airline,
            average_price: sum / count as f64,
            offers: count,
        })
        .collect()
}

pub fn daily_card(day: &DailyForecast) -> String {
    [
        weekday(&day.date),
        format_long_date(&day.date),
        format!("Max: {:.0}°C", day.high_temp),
        format!("Min: {:.0}°C", day.low_temp),
        format!("Rain: {:.1} mm", day.precipitation_mm),
        format!(
            "Weather: {} {}",
            utils::capitalize(&day.description),
            forecast::outlook_icon(&day.description)
        ),
    ]
    .join("\n")
}

pub fn extended_row(day: &DailyForecast) -> String {
    format!(
        "{} | {:>3.0}°C | {:>3.0}°C | {:>5.1} mm | {:>4.1} m/s | {:>3.0}% | {}",
        day.date.format("%Y-%m-%d"),
        day.high_temp,
        day.low_temp,
        day.precipitation_mm,
        day.wind_speed_ms,
        day.humidity,
        utils::capitalize(&day.description)
    )
}

pub fn hourly_row(point: &HourlyPoint) -> String {
    format!(
        "{} | {:>3.0}°C | {:>4.1} mm | {:>5.1} km/h",
        hour_label(&point.time),
        point.temperature,
        point.precipitation_3h,
        point.wind_speed_kmh
    )
}

pub fn hotel_card(hotel: &Hotel, photo_url: Option<&str>) -> String {
    let rating = hotel
        .rating
        .map(|r| r.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let mut lines = vec![
        hotel.name.clone(),
        format!(
            "Rating: {rating} | Address: {}",
            hotel.address.as_deref().unwrap_or("N/A")
        ),
    ];
    if let Some(url) = photo_url {
        lines.push(format!("Photo: {url}"));
    }
    lines.join("\n")
}
