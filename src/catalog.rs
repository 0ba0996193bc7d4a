//! Catalog scrape: listing page → first ten product entries → `books` table.

use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::blocking::Client;
use rusqlite::Connection;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::db::{self, BookRow};
use crate::error::EtlError;
use crate::http;
use crate::outcome::{Outcomes, Stage};
use crate::settings::Settings;

pub const LISTING_URL: &str = "https://books.toscrape.com/";
pub const MAX_BOOKS: usize = 10;

struct Selectors {
    product: Selector,
    title: Selector,
    price: Selector,
    rating: Selector,
    availability: Selector,
}

fn selectors() -> &'static Selectors {
    static SEL: OnceLock<Selectors> = OnceLock::new();
    SEL.get_or_init(|| {
        let parse = |css: &str| Selector::parse(css).unwrap();
        Selectors {
            product: parse("article.product_pod"),
            title: parse("h3 a[title]"),
            price: parse("p.price_color"),
            rating: parse("p.star-rating"),
            availability: parse("p.availability"),
        }
    })
}

/// Parse `£51.77`, `Â£51.77` or `\u{a0}£51.77` into 51.77.
/// Only the currency symbol and encoding debris may precede the number.
pub fn parse_price(text: &str) -> Result<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^[£Â\s]*([+-]?\d+(?:\.\d+)?)$").unwrap());
    let number = re
        .captures(text.trim())
        .and_then(|c| c.get(1))
        .ok_or_else(|| EtlError::Price(text.to_string()))?;
    number
        .as_str()
        .parse()
        .map_err(|_| EtlError::Price(text.to_string()).into())
}

/// Star-rating class token → 1..5; anything else is 0.
pub fn rating_from_class(token: &str) -> i64 {
    match token {
        "One" => 1,
        "Two" => 2,
        "Three" => 3,
        "Four" => 4,
        "Five" => 5,
        _ => 0,
    }
}

fn text_of(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn parse_entry(index: usize, entry: ElementRef) -> Result<BookRow> {
    let sel = selectors();
    let missing = |field| EtlError::MissingElement { index, field };

    let title = entry
        .select(&sel.title)
        .next()
        .and_then(|a| a.value().attr("title"))
        .ok_or_else(|| missing("title"))?
        .to_string();

    let price_el = entry.select(&sel.price).next().ok_or_else(|| missing("price"))?;
    let price = parse_price(&text_of(price_el))
        .with_context(|| format!("listing entry #{} ({})", index, title))?;

    let rating = entry
        .select(&sel.rating)
        .next()
        .ok_or_else(|| missing("rating"))?
        .value()
        .classes()
        .find(|c| *c != "star-rating")
        .map(rating_from_class)
        .unwrap_or(0);

    let availability = entry
        .select(&sel.availability)
        .next()
        .map(text_of)
        .ok_or_else(|| missing("availability"))?;

    Ok(BookRow {
        title,
        price,
        rating,
        availability,
    })
}

/// First `MAX_BOOKS` entries in document order. Any malformed entry fails the page.
pub fn parse_listing(html: &str) -> Result<Vec<BookRow>> {
    let doc = Html::parse_document(html);
    doc.select(&selectors().product)
        .take(MAX_BOOKS)
        .enumerate()
        .map(|(i, entry)| parse_entry(i + 1, entry))
        .collect()
}

/// Fetch, parse, then store the whole batch in one transaction.
pub fn scrape(conn: &Connection, client: &Client, url: &str) -> Result<usize> {
    let html = http::get(client, url)?
        .text()
        .with_context(|| format!("Failed to read body of {}", url))?;
    let books = parse_listing(&html)?;
    debug!(count = books.len(), "parsed listing");
    db::insert_books(conn, &books)
}

/// Stage entry point. Owns its connection; errors end the stage as a whole.
pub fn run(settings: &Settings, client: &Client, outcomes: &mut dyn Outcomes) {
    let result = db::connect(&settings.books_db).and_then(|conn| {
        db::create_book_table(&conn)?;
        scrape(&conn, client, &settings.catalog_url)
    });
    match result {
        Ok(n) => outcomes.succeeded(Stage::Catalog, &format!("{} books", n)),
        Err(e) => outcomes.failed(Stage::Catalog, &settings.catalog_url, &e),
    }
}
