//! Report builder: both tables → one xlsx sheet.
//!
//! Layout (1-based rows):
//!   1      title
//!   2      generator identity
//!   3      generation timestamp
//!   5      countries label, 6 headers, 7.. one row per country
//!   7+C+2  books label, then headers, then one row per book

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::db::{self, BookRow, CountryRow};
use crate::outcome::{Outcomes, Stage};
use crate::settings::Settings;

pub const SHEET_NAME: &str = "Relatório";
pub const TITLE: &str = "Relatório de Dados Extraídos";
pub const COUNTRY_LABEL: &str = "Dados dos Países";
pub const BOOK_LABEL: &str = "Dados dos Livros";

pub const COUNTRY_HEADERS: [&str; 13] = [
    "Nome Comum",
    "Nome Oficial",
    "Capital",
    "Continente",
    "Região",
    "Sub-região",
    "População",
    "Área",
    "Moeda (Nome)",
    "Moeda (Símbolo)",
    "Idioma Principal",
    "Fuso Horário",
    "URL da Bandeira",
];

pub const BOOK_HEADERS: [&str; 4] = ["Título", "Preço", "Avaliação", "Disponibilidade"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    countries: u32,
}

impl Layout {
    pub const TITLE_ROW: u32 = 1;
    pub const AUTHOR_ROW: u32 = 2;
    pub const GENERATED_ROW: u32 = 3;
    pub const COUNTRY_LABEL_ROW: u32 = 5;
    pub const COUNTRY_HEADER_ROW: u32 = 6;
    pub const FIRST_COUNTRY_ROW: u32 = 7;

    pub fn new(countries: usize) -> Self {
        Layout {
            countries: countries as u32,
        }
    }

    pub fn book_label_row(&self) -> u32 {
        Self::FIRST_COUNTRY_ROW + self.countries + 2
    }

    pub fn book_header_row(&self) -> u32 {
        self.book_label_row() + 1
    }

    pub fn first_book_row(&self) -> u32 {
        self.book_header_row() + 1
    }
}

enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Empty,
}

fn opt(v: &Option<String>) -> Cell<'_> {
    v.as_deref().map(Cell::Text).unwrap_or(Cell::Empty)
}

fn country_cells(r: &CountryRow) -> [Cell<'_>; 13] {
    [
        Cell::Text(&r.common_name),
        Cell::Text(&r.official_name),
        Cell::Text(&r.capital),
        Cell::Text(&r.continent),
        Cell::Text(&r.region),
        Cell::Text(&r.subregion),
        Cell::Number(r.population as f64),
        Cell::Number(r.area),
        opt(&r.currency_name),
        opt(&r.currency_symbol),
        opt(&r.primary_language),
        Cell::Text(&r.timezones),
        Cell::Text(&r.flag_url),
    ]
}

fn book_cells(r: &BookRow) -> [Cell<'_>; 4] {
    [
        Cell::Text(&r.title),
        Cell::Number(r.price),
        Cell::Number(r.rating as f64),
        Cell::Text(&r.availability),
    ]
}

/// `row` is 1-based; columns start at A.
fn write_row<'a>(
    ws: &mut Worksheet,
    row: u32,
    cells: impl IntoIterator<Item = Cell<'a>>,
) -> Result<()> {
    for (col, cell) in cells.into_iter().enumerate() {
        let col = col as u16;
        match cell {
            Cell::Text(s) => {
                ws.write_string(row - 1, col, s)?;
            }
            Cell::Number(n) => {
                ws.write_number(row - 1, col, n)?;
            }
            Cell::Empty => {}
        }
    }
    Ok(())
}

pub fn render(
    countries: &[CountryRow],
    books: &[BookRow],
    author: &str,
    generated_at: &NaiveDateTime,
) -> Result<Workbook> {
    let layout = Layout::new(countries.len());
    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    ws.set_name(SHEET_NAME)?;

    write_row(ws, Layout::TITLE_ROW, [Cell::Text(TITLE)])?;
    let author = format!("Gerado por: {}", author);
    write_row(ws, Layout::AUTHOR_ROW, [Cell::Text(&author)])?;
    let stamp = format!("Data de geração: {}", generated_at.format("%d/%m/%Y %H:%M:%S"));
    write_row(ws, Layout::GENERATED_ROW, [Cell::Text(&stamp)])?;

    write_row(ws, Layout::COUNTRY_LABEL_ROW, [Cell::Text(COUNTRY_LABEL)])?;
    write_row(ws, Layout::COUNTRY_HEADER_ROW, COUNTRY_HEADERS.map(Cell::Text))?;
    for (i, c) in countries.iter().enumerate() {
        write_row(ws, Layout::FIRST_COUNTRY_ROW + i as u32, country_cells(c))?;
    }

    write_row(ws, layout.book_label_row(), [Cell::Text(BOOK_LABEL)])?;
    write_row(ws, layout.book_header_row(), BOOK_HEADERS.map(Cell::Text))?;
    for (i, b) in books.iter().enumerate() {
        write_row(ws, layout.first_book_row() + i as u32, book_cells(b))?;
    }

    Ok(workbook)
}

pub fn file_name(saved_at: &NaiveDateTime) -> String {
    format!("relatorio_{}.xlsx", saved_at.format("%Y%m%d_%H%M%S"))
}

/// Full scans of both tables, each through its own short-lived connection.
pub fn load(settings: &Settings) -> Result<(Vec<CountryRow>, Vec<BookRow>)> {
    let countries = {
        let conn = db::open_read_only(&settings.countries_db)?;
        db::fetch_countries(&conn).context("Failed to read countries")?
    };
    let books = {
        let conn = db::open_read_only(&settings.books_db)?;
        db::fetch_books(&conn).context("Failed to read books")?
    };
    Ok((countries, books))
}

pub fn build(settings: &Settings) -> Result<PathBuf> {
    let (countries, books) = load(settings)?;
    let generated_at = Local::now().naive_local();
    let mut workbook = render(&countries, &books, &settings.report_author, &generated_at)?;

    fs::create_dir_all(&settings.report_dir)
        .with_context(|| format!("Failed to create {:?}", settings.report_dir))?;
    let path = settings
        .report_dir
        .join(file_name(&Local::now().naive_local()));
    workbook
        .save(&path)
        .with_context(|| format!("Failed to save {:?}", path))?;
    Ok(path)
}

/// Stage entry point.
pub fn run(settings: &Settings, outcomes: &mut dyn Outcomes) {
    match build(settings) {
        Ok(path) => outcomes.succeeded(Stage::Report, &path.display().to_string()),
        Err(e) => outcomes.failed(Stage::Report, "workbook", &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{book, country};
    use crate::outcome::{Recorded, Recorder};
    use calamine::{open_workbook, Data, Range, Reader, Xlsx};
    use chrono::NaiveDate;
    use std::path::Path;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 17)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn read_sheet(path: &Path) -> Range<Data> {
        let mut wb: Xlsx<_> = open_workbook(path).unwrap();
        wb.worksheet_range(SHEET_NAME).unwrap()
    }

    /// 1-based lookup; empty string for blank cells.
    fn cell(range: &Range<Data>, row: u32, col: u32) -> String {
        range
            .get_value((row - 1, col - 1))
            .map(|d| d.to_string())
            .unwrap_or_default()
    }

    fn seed(dir: &Path, countries: &[CountryRow], books: &[BookRow]) -> Settings {
        let settings = Settings {
            countries_db: dir.join("countries.db"),
            books_db: dir.join("books.db"),
            report_dir: dir.join("out"),
            ..Settings::default()
        };
        let conn = db::connect(&settings.countries_db).unwrap();
        db::create_country_table(&conn).unwrap();
        for c in countries {
            db::insert_country(&conn, c).unwrap();
        }
        let conn = db::connect(&settings.books_db).unwrap();
        db::create_book_table(&conn).unwrap();
        db::insert_books(&conn, books).unwrap();
        settings
    }

    #[test]
    fn book_section_offsets() {
        assert_eq!(Layout::new(0).book_label_row(), 9);
        assert_eq!(Layout::new(0).book_header_row(), 10);
        assert_eq!(Layout::new(2).book_label_row(), 11);
        for c in [1usize, 5, 40] {
            let l = Layout::new(c);
            assert_eq!(l.book_label_row(), 7 + c as u32 + 2);
            assert_eq!(l.book_header_row(), l.book_label_row() + 1);
            assert_eq!(l.first_book_row(), l.book_label_row() + 2);
        }
    }

    #[test]
    fn file_name_uses_save_timestamp() {
        assert_eq!(file_name(&at(9, 5, 3)), "relatorio_20261017_090503.xlsx");
    }

    #[test]
    fn render_header_block_and_empty_countries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.xlsx");
        let mut wb = render(&[], &[book("Solo", 9.99, 2)], "Tester", &at(14, 30, 0)).unwrap();
        wb.save(&path).unwrap();

        let sheet = read_sheet(&path);
        assert_eq!(cell(&sheet, 1, 1), TITLE);
        assert_eq!(cell(&sheet, 2, 1), "Gerado por: Tester");
        assert_eq!(cell(&sheet, 3, 1), "Data de geração: 17/10/2026 14:30:00");
        assert_eq!(cell(&sheet, 5, 1), COUNTRY_LABEL);
        assert_eq!(cell(&sheet, 6, 13), "URL da Bandeira");
        for row in 7..9 {
            assert_eq!(cell(&sheet, row, 1), "");
        }
        assert_eq!(cell(&sheet, 9, 1), BOOK_LABEL);
        assert_eq!(cell(&sheet, 10, 4), "Disponibilidade");
        assert_eq!(cell(&sheet, 11, 1), "Solo");
        assert_eq!(cell(&sheet, 11, 3), "2");
    }

    #[test]
    fn null_fields_leave_blank_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.xlsx");
        let mut c = country("Nowhere");
        c.currency_name = None;
        c.currency_symbol = None;
        let mut wb = render(&[c], &[], "Tester", &at(0, 0, 0)).unwrap();
        wb.save(&path).unwrap();

        let sheet = read_sheet(&path);
        assert_eq!(cell(&sheet, 7, 1), "Nowhere");
        assert_eq!(cell(&sheet, 7, 9), "");
        assert_eq!(cell(&sheet, 7, 10), "");
        assert_eq!(cell(&sheet, 7, 11), "");
        assert_eq!(cell(&sheet, 7, 12), "UTC+01:00");
    }

    #[test]
    fn end_to_end_two_countries_three_books() {
        let dir = tempfile::tempdir().unwrap();
        let settings = seed(
            dir.path(),
            &[country("Spain"), country("Norway")],
            &[book("First", 51.77, 3), book("Second", 53.74, 1), book("Third", 50.1, 5)],
        );
        let mut rec = Recorder::default();

        run(&settings, &mut rec);

        let path = match &rec.events[..] {
            [Recorded::Ok(Stage::Report, p)] => PathBuf::from(p),
            other => panic!("unexpected {:?}", other),
        };
        assert!(path.starts_with(&settings.report_dir));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("relatorio_") && name.ends_with(".xlsx"));

        let sheet = read_sheet(&path);
        assert_eq!(cell(&sheet, 2, 1), "Gerado por: Gabryel");
        assert!(cell(&sheet, 3, 1).starts_with("Data de geração: "));

        // countries: exactly two data rows under the header
        assert_eq!(cell(&sheet, 6, 1), "Nome Comum");
        assert_eq!(cell(&sheet, 7, 1), "Spain");
        assert_eq!(cell(&sheet, 8, 1), "Norway");
        assert_eq!(cell(&sheet, 8, 7), "1000000");
        assert_eq!(cell(&sheet, 9, 1), "");
        assert_eq!(cell(&sheet, 10, 1), "");

        // books: label at 7 + 2 + 2
        let layout = Layout::new(2);
        assert_eq!(layout.book_label_row(), 11);
        assert_eq!(cell(&sheet, 11, 1), BOOK_LABEL);
        assert_eq!(cell(&sheet, 12, 1), "Título");
        let titles: Vec<String> = (13..16).map(|r| cell(&sheet, r, 1)).collect();
        assert_eq!(titles, ["First", "Second", "Third"]);
        assert_eq!(cell(&sheet, 13, 2), "51.77");
        assert_eq!(sheet.end().unwrap().0 + 1, 15);
    }

    #[test]
    fn missing_table_produces_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            countries_db: dir.path().join("absent.db"),
            books_db: dir.path().join("absent-too.db"),
            report_dir: dir.path().join("out"),
            ..Settings::default()
        };
        let mut rec = Recorder::default();

        run(&settings, &mut rec);

        assert_eq!(rec.failures().len(), 1);
        assert!(!settings.report_dir.exists());
        assert!(!settings.countries_db.exists());
    }
}
