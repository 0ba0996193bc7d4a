use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::{catalog, countries};

/// Runtime settings. Defaults, then `etl.toml` (optional), then `ETL_*` env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub countries_db: PathBuf,
    pub books_db: PathBuf,
    pub report_dir: PathBuf,
    pub report_author: String,
    pub country_api: String,
    pub catalog_url: String,
    /// Unset means requests may block forever.
    pub http_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            countries_db: PathBuf::from("countries.db"),
            books_db: PathBuf::from("books.db"),
            report_dir: PathBuf::from("."),
            report_author: "Gabryel".to_string(),
            country_api: countries::API_BASE.to_string(),
            catalog_url: catalog::LISTING_URL.to_string(),
            http_timeout_secs: None,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("etl").required(false))
            .add_source(config::Environment::with_prefix("ETL"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }
}
