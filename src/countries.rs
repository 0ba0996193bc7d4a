//! Country ingest: operator names → restcountries lookup → `countries` table.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::Url;
use rusqlite::Connection;
use serde::Deserialize;
use tracing::debug;

use crate::db::{self, CountryRow};
use crate::error::EtlError;
use crate::http;
use crate::outcome::{Outcomes, Stage};
use crate::settings::Settings;

pub const API_BASE: &str = "https://restcountries.com/v3.1";

/// Known Portuguese names (and US synonyms) → API query form.
const TRANSLATIONS: &[(&str, &str)] = &[
    ("espanha", "spain"),
    ("noruega", "norway"),
    ("suíça", "switzerland"),
    ("brasil", "brazil"),
    ("eua", "usa"),
    ("estados unidos", "usa"),
    ("japão", "japan"),
    ("united states", "usa"),
    ("united states of america", "usa"),
];

pub fn normalize(name: &str) -> String {
    let key = name.to_lowercase().trim().to_string();
    TRANSLATIONS
        .iter()
        .find(|(pt, _)| *pt == key)
        .map(|(_, en)| en.to_string())
        .unwrap_or(key)
}

// ── API payload ──

/// Every field tolerates both an absent key and an explicit `null`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiCountry {
    name: Option<ApiName>,
    capital: Option<Vec<String>>,
    continents: Option<Vec<String>>,
    continent: Option<String>,
    region: Option<String>,
    subregion: Option<String>,
    population: Option<u64>,
    area: Option<f64>,
    currencies: Option<BTreeMap<String, ApiCurrency>>,
    languages: Option<BTreeMap<String, String>>,
    timezones: Option<Vec<String>>,
    flags: Option<ApiFlags>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiName {
    common: Option<String>,
    official: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiCurrency {
    name: Option<String>,
    symbol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiFlags {
    png: Option<String>,
}

impl From<ApiCountry> for CountryRow {
    fn from(c: ApiCountry) -> Self {
        // BTreeMap iterates in code order, so "first" is the smallest code.
        let currency = c.currencies.and_then(|m| m.into_values().next());
        let (currency_name, currency_symbol) = match currency {
            Some(cur) => (
                Some(cur.name.unwrap_or_default()),
                Some(cur.symbol.unwrap_or_default()),
            ),
            None => (None, None),
        };
        let primary_language = c.languages.and_then(|m| m.into_values().next());

        let continent = match c.continents {
            Some(list) if !list.is_empty() => list.join(", "),
            _ => c.continent.unwrap_or_default(),
        };
        let name = c.name.unwrap_or_default();

        CountryRow {
            common_name: name.common.unwrap_or_default(),
            official_name: name.official.unwrap_or_default(),
            capital: c.capital.unwrap_or_default().join(", "),
            continent,
            region: c.region.unwrap_or_default(),
            subregion: c.subregion.unwrap_or_default(),
            population: i64::try_from(c.population.unwrap_or_default()).unwrap_or(i64::MAX),
            area: c.area.unwrap_or_default().max(0.0),
            currency_name,
            currency_symbol,
            primary_language,
            timezones: c.timezones.unwrap_or_default().join(", "),
            flag_url: c.flags.and_then(|f| f.png).unwrap_or_default(),
        }
    }
}

// ── Lookup ──

pub struct CountryApi<'a> {
    client: &'a Client,
    base: &'a str,
}

impl<'a> CountryApi<'a> {
    pub fn new(client: &'a Client, base: &'a str) -> Self {
        CountryApi { client, base }
    }

    fn name_url(&self, query: &str) -> Result<Url> {
        let mut url =
            Url::parse(self.base).with_context(|| format!("Bad API base {:?}", self.base))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API base {:?} cannot take a path", self.base))?
            .pop_if_empty()
            .push("name")
            .push(query);
        Ok(url)
    }

    /// First match for `query`, in the order the API returned them.
    pub fn lookup(&self, query: &str) -> Result<ApiCountry> {
        let url = self.name_url(query)?;
        debug!(%url, "country lookup");
        let matches: Vec<ApiCountry> = http::get(self.client, url.as_str())?
            .json()
            .with_context(|| format!("Malformed country payload for {:?}", query))?;
        matches
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::Error::from(EtlError::NoMatch(query.to_string())))
    }
}

// ── Stage ──

fn ingest_one(conn: &Connection, api: &CountryApi, name: &str) -> Result<i64> {
    let query = normalize(name);
    let row = CountryRow::from(api.lookup(&query)?);
    db::insert_country(conn, &row)
}

/// Look up and store each name. One failure never blocks the others.
pub fn ingest(
    conn: &Connection,
    api: &CountryApi,
    names: &[String],
    outcomes: &mut dyn Outcomes,
) -> usize {
    let mut stored = 0;
    for name in names {
        match ingest_one(conn, api, name) {
            Ok(id) => {
                debug!(id, name = %name, "country row inserted");
                stored += 1;
                outcomes.succeeded(Stage::Countries, name);
            }
            Err(e) => outcomes.failed(Stage::Countries, name, &e),
        }
    }
    stored
}

/// Stage entry point. Owns its connection for the whole batch.
pub fn run(settings: &Settings, client: &Client, names: &[String], outcomes: &mut dyn Outcomes) {
    let conn = match db::connect(&settings.countries_db).and_then(|conn| {
        db::create_country_table(&conn)?;
        Ok(conn)
    }) {
        Ok(conn) => conn,
        Err(e) => {
            outcomes.failed(Stage::Countries, "storage", &e);
            return;
        }
    };
    let api = CountryApi::new(client, &settings.country_api);
    ingest(&conn, &api, names, outcomes);
}
