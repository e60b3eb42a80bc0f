//! Menu file parsing.
//!
//! A menu file is a table whose first row names the columns. `name`, `price`
//! and `category` are required; `description`, `subcategory`, `image_name` and
//! `is_available` are optional. Header matching ignores case and surrounding
//! whitespace. The whole file is validated before anything is stored: the
//! first bad row fails the upload.

use std::io::Cursor;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use calamine::{open_workbook_auto_from_rs, Data, Reader};

/// Largest price accepted by a `NUMERIC(12, 2)` column, exclusive.
const PRICE_LIMIT: i64 = 10_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuFileKind {
    Csv,
    Excel,
}

impl MenuFileKind {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xls" | "xlsx" | "xlsm" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuRow {
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub category: String,
    pub subcategory: Option<String>,
    pub is_available: bool,
    pub image_name: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("unreadable menu file: {0}")]
    Unreadable(String),
    #[error("missing required column: {0}")]
    MissingColumn(&'static str),
    #[error("menu file contains no items")]
    Empty,
    #[error("row {row}: {reason}")]
    Row { row: usize, reason: String },
}

/// Parses a whole menu file. Row numbers in errors are 1-based and count the
/// header row.
pub fn parse_menu(kind: MenuFileKind, bytes: &[u8]) -> Result<Vec<MenuRow>, IngestError> {
    let table = match kind {
        MenuFileKind::Csv => read_csv(bytes)?,
        MenuFileKind::Excel => read_workbook(bytes)?,
    };
    rows_from_table(table)
}

pub fn parse_price(raw: &str) -> Result<BigDecimal, String> {
    let normalized = raw.trim().replace(',', ".");
    if normalized.is_empty() {
        return Err("price is required".to_string());
    }
    let price = BigDecimal::from_str(&normalized).map_err(|_| format!("invalid price {raw:?}"))?;
    if price <= BigDecimal::from(0) {
        return Err(format!("price must be positive, got {raw:?}"));
    }
    if price.normalized().as_bigint_and_exponent().1 > 2 {
        return Err(format!("price {raw:?} has more than two decimal places"));
    }
    if price >= BigDecimal::from(PRICE_LIMIT) {
        return Err(format!("price {raw:?} is too large"));
    }
    Ok(price.with_scale(2))
}

fn parse_available(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        other => Err(format!("invalid is_available value {other:?}")),
    }
}

struct RawTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

fn read_csv(bytes: &[u8]) -> Result<RawTable, IngestError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| IngestError::Unreadable("CSV must be UTF-8 encoded".to_string()))?;
    let text = text.trim_start_matches('\u{feff}');
    let first_line = text.lines().next().unwrap_or_default();
    let delimiter = if !first_line.contains(',') && first_line.contains(';') {
        b';'
    } else {
        b','
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let header = reader
        .headers()
        .map_err(|e| IngestError::Unreadable(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| IngestError::Unreadable(e.to_string()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(RawTable { header, rows })
}

fn read_workbook(bytes: &[u8]) -> Result<RawTable, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| IngestError::Unreadable(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::Unreadable("workbook has no sheets".to_string()))?
        .map_err(|e| IngestError::Unreadable(e.to_string()))?;

    let mut cells = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let header = cells.next().unwrap_or_default();
    Ok(RawTable {
        header,
        rows: cells.collect(),
    })
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        other => other.to_string(),
    }
}

struct Columns {
    name: usize,
    price: usize,
    category: usize,
    description: Option<usize>,
    subcategory: Option<usize>,
    image_name: Option<usize>,
    is_available: Option<usize>,
}

impl Columns {
    fn locate(header: &[String]) -> Result<Self, IngestError> {
        let find = |column: &str| {
            header
                .iter()
                .position(|h| h.trim().trim_start_matches('\u{feff}').eq_ignore_ascii_case(column))
        };
        let required = |column: &'static str| find(column).ok_or(IngestError::MissingColumn(column));

        Ok(Self {
            name: required("name")?,
            price: required("price")?,
            category: required("category")?,
            description: find("description"),
            subcategory: find("subcategory"),
            image_name: find("image_name"),
            is_available: find("is_available"),
        })
    }
}

fn rows_from_table(table: RawTable) -> Result<Vec<MenuRow>, IngestError> {
    let columns = Columns::locate(&table.header)?;

    let mut items = Vec::with_capacity(table.rows.len());
    for (index, cells) in table.rows.iter().enumerate() {
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let row = index + 2;
        let cell = |i: usize| cells.get(i).map(|c| c.trim()).unwrap_or_default();
        let optional = |i: Option<usize>| {
            i.map(|i| cell(i))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let fail = |reason: String| IngestError::Row { row, reason };

        let name = cell(columns.name);
        if name.is_empty() {
            return Err(fail("name is required".to_string()));
        }
        let category = cell(columns.category);
        if category.is_empty() {
            return Err(fail("category is required".to_string()));
        }
        let price = parse_price(cell(columns.price)).map_err(fail)?;
        let is_available = match columns.is_available {
            Some(i) => parse_available(cell(i)).map_err(fail)?,
            None => true,
        };

        items.push(MenuRow {
            name: name.to_string(),
            description: optional(columns.description),
            price,
            category: category.to_string(),
            subcategory: optional(columns.subcategory),
            is_available,
            image_name: optional(columns.image_name),
        });
    }

    if items.is_empty() {
        return Err(IngestError::Empty);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv() {
        let csv = "name,price,category,description,image_name\n\
                   Margherita,12.50,Pizza,Tomato and basil,margherita\n\
                   Cola,2,Drinks,,\n";

        let rows = parse_menu(MenuFileKind::Csv, csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Margherita");
        assert_eq!(rows[0].price.to_string(), "12.50");
        assert_eq!(rows[0].image_name.as_deref(), Some("margherita"));
        assert_eq!(rows[1].price.to_string(), "2.00");
        assert_eq!(rows[1].description, None);
        assert!(rows[1].is_available);
    }

    #[test]
    fn test_header_is_case_insensitive_and_bom_tolerant() {
        let csv = "\u{feff}Name;Price;Category;Is_Available\nSoup;4,20;Starters;no\n";

        let rows = parse_menu(MenuFileKind::Csv, csv.as_bytes()).unwrap();

        assert_eq!(rows[0].price.to_string(), "4.20");
        assert!(!rows[0].is_available);
    }

    #[test]
    fn test_bad_price_rejects_whole_file() {
        let csv = "name,price,category\nA,1.00,X\nB,abc,X\nC,3.00,X\n";

        let err = parse_menu(MenuFileKind::Csv, csv.as_bytes()).unwrap_err();

        assert_eq!(
            err,
            IngestError::Row {
                row: 3,
                reason: "invalid price \"abc\"".to_string()
            }
        );
        assert_eq!(err.to_string(), "row 3: invalid price \"abc\"");
    }

    #[test]
    fn test_missing_column() {
        let csv = "name,category\nA,X\n";
        assert_eq!(
            parse_menu(MenuFileKind::Csv, csv.as_bytes()).unwrap_err(),
            IngestError::MissingColumn("price")
        );
    }

    #[test]
    fn test_blank_rows_are_skipped_but_empty_file_rejected() {
        let csv = "name,price,category\n,,\nA,1,X\n";
        assert_eq!(parse_menu(MenuFileKind::Csv, csv.as_bytes()).unwrap().len(), 1);

        let header_only = "name,price,category\n";
        assert_eq!(
            parse_menu(MenuFileKind::Csv, header_only.as_bytes()).unwrap_err(),
            IngestError::Empty
        );
    }

    #[test]
    fn test_parse_price_rules() {
        assert_eq!(parse_price("12.5").unwrap().to_string(), "12.50");
        assert_eq!(parse_price("12.500").unwrap().to_string(), "12.50");
        assert!(parse_price("0").is_err());
        assert!(parse_price("-3").is_err());
        assert!(parse_price("1.005").is_err());
        assert!(parse_price("").is_err());
        assert!(parse_price("10000000000").is_err());
    }

    #[test]
    fn test_parse_xlsx() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, header) in ["name", "price", "category", "subcategory"].iter().enumerate() {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        sheet.write_string(1, 0, "Diavola").unwrap();
        sheet.write_number(1, 1, 12.5).unwrap();
        sheet.write_string(1, 2, "Pizza").unwrap();
        sheet.write_string(1, 3, "Spicy").unwrap();
        sheet.write_string(2, 0, "Tea").unwrap();
        sheet.write_string(2, 1, "3.10").unwrap();
        sheet.write_string(2, 2, "Drinks").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let rows = parse_menu(MenuFileKind::Excel, &bytes).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].price.to_string(), "12.50");
        assert_eq!(rows[0].subcategory.as_deref(), Some("Spicy"));
        assert_eq!(rows[1].price.to_string(), "3.10");
        assert_eq!(rows[1].subcategory, None);
    }

    #[test]
    fn test_garbage_workbook_is_unreadable() {
        let err = parse_menu(MenuFileKind::Excel, b"not a workbook").unwrap_err();
        assert!(matches!(err, IngestError::Unreadable(_)));
    }

    #[test]
    fn test_file_kind() {
        assert_eq!(MenuFileKind::from_extension("CSV"), Some(MenuFileKind::Csv));
        assert_eq!(MenuFileKind::from_extension("xls"), Some(MenuFileKind::Excel));
        assert_eq!(MenuFileKind::from_extension("pdf"), None);
    }
}
