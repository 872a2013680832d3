use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use travel_dash_lib::{
    city_location, format, gazetteer,
    models::Category,
    sources::flights::{FlightRequest, StopPolicy, TravelClass, TripType},
    sources::hotels::DEFAULT_RADIUS_M,
    AppConfig, Dashboard,
};

#[derive(Parser)]
#[command(name = "travel-dash")]
#[command(about = "Flights, hotels, events and weather for your destination", long_about = None)]
struct Cli {
    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// City table (CSV with city, lat, lng columns)
    #[arg(long, global = true)]
    gazetteer: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search flight offers
    Flights {
        #[arg(long, default_value = "JFK")]
        origin: String,
        #[arg(long, default_value = "LAX")]
        destination: String,
        /// Departure date (YYYY-MM-DD)
        #[arg(long)]
        depart: NaiveDate,
        /// Return date; makes the search a round trip
        #[arg(long = "return")]
        return_date: Option<NaiveDate>,
        #[arg(long, default_value_t = 1)]
        passengers: u8,
        #[arg(long = "class", default_value = "ECONOMY")]
        travel_class: TravelClass,
        /// All, Non-stop, "1 Stop" or "2+ Stops"
        #[arg(long, default_value = "All")]
        stops: StopPolicy,
    },
    /// Find lodging around a city
    Hotels {
        city: String,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Search radius in meters
        #[arg(long, default_value_t = DEFAULT_RADIUS_M)]
        radius: u32,
        /// Also print map markers as GeoJSON
        #[arg(long)]
        map: bool,
    },
    /// Find events with the weather outlook for each date
    Events {
        city: String,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Music, Sports, "Arts & Theatre", Comedy or Festivals; repeatable
        #[arg(long = "category", required = true)]
        categories: Vec<Category>,
        /// Also print map markers as GeoJSON
        #[arg(long)]
        map: bool,
    },
    /// Short, hourly and extended forecast for a city
    Weather { city: String },
    /// List known cities
    Cities {
        /// Only names containing this text
        #[arg(long)]
        filter: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load();
    if let Some(path) = cli.gazetteer.clone() {
        config.gazetteer_path = Some(path);
    }
    let dashboard = Dashboard::new(config);
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Flights {
            origin,
            destination,
            depart,
            return_date,
            passengers,
            travel_class,
            stops,
        } => {
            let request = FlightRequest {
                origin,
                destination,
                departure_date: depart,
                return_date,
                passengers,
                travel_class,
                trip_type: if return_date.is_some() {
                    TripType::RoundTrip
                } else {
                    TripType::OneWay
                },
                stop_policy: stops,
            };
            let search = dashboard
                .search_flights(&request)
                .context("flight search failed")?;
            if cli.json {
                return print_json(&search);
            }
            if search.offers.is_empty() {
                println!("No flights found for the selected route.");
                return Ok(());
            }
            println!("Average Flight Prices by Airline");
            for row in format::average_price_by_airline(&search.offers, &search.dictionaries) {
                println!("  {:<30} USD {:>9.2}  ({} offers)", row.airline, row.average_price, row.offers);
            }
            println!();
            for (idx, offer) in search.offers.iter().enumerate() {
                println!("{}", format::flight_summary(idx + 1, offer, &search.dictionaries));
                println!();
            }
        }
        Commands::Hotels {
            city,
            start,
            end,
            radius,
            map,
        } => {
            load_gazetteer(&dashboard)?;
            let location = city_location(&city)?;
            let start = start.unwrap_or(today);
            let end = end.unwrap_or(start + Duration::days(3));
            info!(city = %location.name, "searching hotels");
            let report = dashboard
                .search_hotels(&location, start, end, radius)
                .context("hotel search failed")?;
            if cli.json {
                return print_json(&report);
            }
            if report.hotels.is_empty() {
                println!("No hotels found for the selected dates and location.");
            }
            for (hotel, photo) in report.hotels.iter().zip(&report.photo_urls) {
                println!("{}", format::hotel_card(hotel, photo.as_deref()));
                println!("---");
            }
            if map {
                print_json(&report.map_view().to_geojson())?;
            }
        }
        Commands::Events {
            city,
            start,
            end,
            categories,
            map,
        } => {
            load_gazetteer(&dashboard)?;
            let location = city_location(&city)?;
            let start = start.unwrap_or(today);
            let end = end.unwrap_or(start + Duration::days(7));
            let report = dashboard
                .search_events(&location, start, end, &categories)
                .context("event search failed")?;
            for warning in &report.warnings {
                eprintln!("warning: {warning}");
            }
            if cli.json {
                return print_json(&report);
            }
            if report.search.events.is_empty() {
                println!("No events found for the selected criteria.");
            }
            for event in &report.search.events {
                println!("{}", format::event_card(event, report.forecast_for(event)));
                println!("---");
            }
            let duplicates = report.search.duplicate_ids();
            if !duplicates.is_empty() {
                eprintln!(
                    "note: {} events matched more than one category",
                    duplicates.len()
                );
            }
            if map {
                print_json(&report.map_view().to_geojson())?;
            }
        }
        Commands::Weather { city } => {
            let now = Local::now().naive_local();
            let report = dashboard
                .weather_report(&city, now)
                .context("Weather data could not be retrieved")?;
            if cli.json {
                return print_json(&report);
            }
            println!("Weather Forecast for {}", report.city);
            println!();
            println!("3-Day Outlook");
            for day in &report.outlook {
                println!("{}", format::daily_card(day));
                println!();
            }
            println!("Next 24 Hours");
            if report.hourly.is_empty() {
                println!("No data available for the next 24 hours.");
            }
            for point in &report.hourly {
                println!("{}", format::hourly_row(point));
            }
            println!();
            println!("Extended Outlook");
            for day in &report.extended {
                println!("{}", format::extended_row(day));
            }
        }
        Commands::Cities { filter } => {
            let table = load_gazetteer(&dashboard)?;
            let needle = filter.map(|f| f.to_lowercase());
            let names: Vec<&str> = table
                .city_names()
                .into_iter()
                .filter(|name| {
                    needle
                        .as_ref()
                        .map_or(true, |needle| name.to_lowercase().contains(needle))
                })
                .collect();
            if cli.json {
                return print_json(&names);
            }
            for name in names {
                println!("{name}");
            }
        }
    }

    Ok(())
}

fn load_gazetteer(dashboard: &Dashboard) -> Result<&'static gazetteer::Gazetteer> {
    gazetteer::init(&dashboard.config().gazetteer_path())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
