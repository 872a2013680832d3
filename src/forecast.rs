use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::models::{DailyForecast, ForecastSample, HourlyPoint};

pub const SHORT_OUTLOOK_DAYS: usize = 3;
pub const EXTENDED_OUTLOOK_DAYS: usize = 14;
pub const HOURLY_WINDOW_HOURS: i64 = 24;

const MS_TO_KMH: f64 = 3.6;
const DEFAULT_ICON: (&str, &str) = ("🌥️", "Check weather details");
const OUTLOOK_DEFAULT_ICON: &str = "🌤️";

const WEATHER_ICONS: [(&str, &str, &str); 7] = [
    (
        "clear sky",
        "☀️",
        "Perfect day for outdoor events! Enjoy the sunshine.",
    ),
    (
        "few clouds",
        "🌤️",
        "Great weather for being outside! Slightly cloudy but enjoyable.",
    ),
    (
        "scattered clouds",
        "⛅",
        "Weather is suitable for events. Expect some clouds but mostly clear.",
    ),
    (
        "overcast clouds",
        "☁️",
        "Event-friendly, but keep an eye out for possible rain.",
    ),
    (
        "rain",
        "🌧️",
        "Not ideal for outdoor events. Consider indoor plans or prepare for rain.",
    ),
    (
        "thunderstorm",
        "⛈️",
        "Avoid outdoor events due to thunderstorms. Stay safe indoors.",
    ),
    (
        "broken clouds",
        "⛅",
        "Partly cloudy with some breaks of sunshine. Great for outdoor plans!",
    ),
];

/// Icon and outdoor-plans advice for an exact forecast description.
pub fn weather_icon(description: &str) -> (&'static str, &'static str) {
    let key = description.trim().to_lowercase();
    WEATHER_ICONS
        .iter()
        .find(|(name, _, _)| *name == key)
        .map(|(_, icon, advice)| (*icon, *advice))
        .unwrap_or(DEFAULT_ICON)
}

/// Icon for the outlook cards, which fall back to a sunny-ish icon rather
/// than the event default.
pub fn outlook_icon(description: &str) -> &'static str {
    let key = description.trim().to_lowercase();
    WEATHER_ICONS
        .iter()
        .find(|(name, _, _)| *name == key)
        .map_or(OUTLOOK_DEFAULT_ICON, |(_, icon, _)| *icon)
}

/// Folds 3-hour samples into at most `max_days` calendar days, in the order
/// the dates first appear. Stops reading at the first sample of a date past
/// the cap.
pub fn reduce_to_daily(samples: &[ForecastSample], max_days: usize) -> Vec<DailyForecast> {
    let mut days: Vec<DailyForecast> = Vec::new();

    for sample in samples {
        let date = sample.timestamp.date();
        if let Some(day) = days.iter_mut().find(|day| day.date == date) {
            day.high_temp = day.high_temp.max(sample.temp_max);
            day.low_temp = day.low_temp.min(sample.temp_min);
            day.precipitation_mm += sample.precipitation_3h;
            continue;
        }

        if days.len() >= max_days {
            break;
        }

        let (icon, recommendation) = weather_icon(&sample.description);
        days.push(DailyForecast {
            date,
            high_temp: sample.temp_max,
            low_temp: sample.temp_min,
            precipitation_mm: sample.precipitation_3h,
            description: sample.description.clone(),
            icon,
            recommendation,
            humidity: sample.humidity,
            wind_speed_ms: sample.wind_speed,
        });
    }

    days
}

/// Samples with `now <= timestamp <= now + window_hours`. An empty result
/// means there is nothing to chart.
pub fn reduce_to_hourly_window(
    samples: &[ForecastSample],
    now: NaiveDateTime,
    window_hours: i64,
) -> Vec<HourlyPoint> {
    let until = now + Duration::hours(window_hours);
    samples
        .iter()
        .filter(|sample| sample.timestamp >= now && sample.timestamp <= until)
        .map(|sample| HourlyPoint {
            time: sample.timestamp,
            temperature: sample.temp,
            precipitation_3h: sample.precipitation_3h,
            wind_speed_kmh: sample.wind_speed * MS_TO_KMH,
        })
        .collect()
}

pub fn forecast_for_event(
    daily: &[DailyForecast],
    date: Option<NaiveDate>,
) -> Option<&DailyForecast> {
    let date = date?;
    daily.iter().find(|day| day.date == date)
}
