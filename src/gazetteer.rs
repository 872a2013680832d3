use std::{collections::HashSet, fs::File, io::Read, path::Path};

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing::{debug, info};

use crate::models::CityLocation;

static GAZETTEER: OnceCell<Gazetteer> = OnceCell::new();

#[derive(Debug, Deserialize)]
struct CityRow {
    city: String,
    lat: f64,
    lng: f64,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Default)]
pub struct Gazetteer {
    cities: Vec<CityLocation>,
}

impl Gazetteer {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("unable to open city table {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("invalid city table {}", path.display()))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut cities = Vec::new();
        for (idx, row) in csv_reader.deserialize::<CityRow>().enumerate() {
            let row = row.with_context(|| format!("bad city row {}", idx + 1))?;
            cities.push(CityLocation {
                name: row.city.trim().to_string(),
                lat: row.lat,
                lng: row.lng,
                country: row.country.filter(|c| !c.trim().is_empty()),
            });
        }
        debug!(rows = cities.len(), "city table parsed");
        Ok(Self { cities })
    }

    /// First row with this exact name. Duplicate names in other countries
    /// are never reached.
    pub fn lookup(&self, name: &str) -> Option<&CityLocation> {
        let name = name.trim();
        self.cities.iter().find(|city| city.name == name)
    }

    /// Distinct city names in table order.
    pub fn city_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.cities
            .iter()
            .map(|city| city.name.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

/// Loads the process-wide table once; later calls return the first table
/// regardless of `path`.
pub fn init(path: &Path) -> Result<&'static Gazetteer> {
    GAZETTEER.get_or_try_init(|| {
        let gazetteer = Gazetteer::from_path(path)?;
        info!(rows = gazetteer.len(), path = %path.display(), "city table loaded");
        Ok(gazetteer)
    })
}

pub fn global() -> Option<&'static Gazetteer> {
    GAZETTEER.get()
}
