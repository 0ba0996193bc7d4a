//! Country + catalog extraction with a spreadsheet report.
//!
//! Runs three stages in order, each isolated from the others' failures:
//!   1. countries  (operator names → restcountries → countries.db)
//!   2. catalog    (books.toscrape listing → books.db)
//!   3. report     (both tables → relatorio_<timestamp>.xlsx)

mod catalog;
mod countries;
mod db;
mod error;
mod http;
mod outcome;
mod prompt;
mod report;
mod settings;
#[cfg(test)]
mod test_support;

use std::io;

use outcome::{ConsoleOutcomes, Outcomes, Stage};
use settings::Settings;
use tracing::{info, warn};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .try_init();
}

fn main() {
    init_tracing();
    let settings = Settings::load().unwrap_or_else(|e| {
        warn!("Ignoring configuration ({:#}), using defaults", e);
        Settings::default()
    });
    info!(settings_loaded = ?settings, msg = "Starting extraction");

    let mut outcomes = ConsoleOutcomes;

    println!("=== Data Extraction ===");

    println!("\nStage 1: countries");
    let names = prompt::read_names(
        &mut io::stdin().lock(),
        &mut io::stdout(),
        prompt::COUNTRY_COUNT,
    );
    let client = http::client(settings.http_timeout());
    match (names, &client) {
        (Ok(names), Ok(client)) => countries::run(&settings, client, &names, &mut outcomes),
        (Err(e), _) => outcomes.failed(Stage::Countries, "operator input", &e),
        (_, Err(e)) => outcomes.failed(Stage::Countries, "http client", e),
    }

    println!("\nStage 2: catalog");
    match &client {
        Ok(client) => catalog::run(&settings, client, &mut outcomes),
        Err(e) => outcomes.failed(Stage::Catalog, "http client", e),
    }

    println!("\nStage 3: report");
    report::run(&settings, &mut outcomes);

    println!("\nDone.");
}
