use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OpenFlags};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    Ok(conn)
}

/// Readers never create the file or the schema: a missing table is an error.
pub fn open_read_only(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("Failed to open {:?} read-only", path))?;
    Ok(conn)
}

// ── Countries ──

#[derive(Debug, Clone, PartialEq)]
pub struct CountryRow {
    pub common_name: String,
    pub official_name: String,
    pub capital: String,
    pub continent: String,
    pub region: String,
    pub subregion: String,
    pub population: i64,
    pub area: f64,
    pub currency_name: Option<String>,
    pub currency_symbol: Option<String>,
    pub primary_language: Option<String>,
    pub timezones: String,
    pub flag_url: String,
}

pub fn create_country_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS countries (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            common_name      TEXT,
            official_name    TEXT,
            capital          TEXT,
            continent        TEXT,
            region           TEXT,
            subregion        TEXT,
            population       INTEGER,
            area             REAL,
            currency_name    TEXT,
            currency_symbol  TEXT,
            primary_language TEXT,
            timezones        TEXT,
            flag_url         TEXT
        );
        ",
    )?;
    Ok(())
}

/// Autocommit: the row is durable as soon as this returns.
pub fn insert_country(conn: &Connection, r: &CountryRow) -> Result<i64> {
    conn.execute(
        "INSERT INTO countries
         (common_name, official_name, capital, continent, region, subregion,
          population, area, currency_name, currency_symbol, primary_language,
          timezones, flag_url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            r.common_name, r.official_name, r.capital, r.continent, r.region, r.subregion,
            r.population, r.area, r.currency_name, r.currency_symbol, r.primary_language,
            r.timezones, r.flag_url,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn fetch_countries(conn: &Connection) -> Result<Vec<CountryRow>> {
    let mut stmt = conn.prepare(
        "SELECT common_name, official_name, capital, continent, region, subregion,
                population, area, currency_name, currency_symbol, primary_language,
                timezones, flag_url
         FROM countries ORDER BY id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(CountryRow {
                common_name: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                official_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                capital: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                continent: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                region: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                subregion: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                population: row.get::<_, Option<i64>>(6)?.unwrap_or_default(),
                area: row.get::<_, Option<f64>>(7)?.unwrap_or_default(),
                currency_name: row.get(8)?,
                currency_symbol: row.get(9)?,
                primary_language: row.get(10)?,
                timezones: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
                flag_url: row.get::<_, Option<String>>(12)?.unwrap_or_default(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Books ──

#[derive(Debug, Clone, PartialEq)]
pub struct BookRow {
    pub title: String,
    pub price: f64,
    pub rating: i64,
    pub availability: String,
}

pub fn create_book_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS books (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            title        TEXT,
            price        REAL,
            rating       INTEGER,
            availability TEXT
        );
        ",
    )?;
    Ok(())
}

/// One transaction for the whole batch. Any failed insert rolls back every row.
pub fn insert_books(conn: &Connection, rows: &[BookRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO books (title, price, rating, availability) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for r in rows {
            count += stmt.execute(params![r.title, r.price, r.rating, r.availability])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn fetch_books(conn: &Connection) -> Result<Vec<BookRow>> {
    let mut stmt =
        conn.prepare("SELECT title, price, rating, availability FROM books ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(BookRow {
                title: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                price: row.get::<_, Option<f64>>(1)?.unwrap_or_default(),
                rating: row.get::<_, Option<i64>>(2)?.unwrap_or_default(),
                availability: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    let n = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
    Ok(n)
}
