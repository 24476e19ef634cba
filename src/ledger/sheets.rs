//! Google Sheets v4 adapter for the ledger.
//!
//! Reads go through `spreadsheets.get` with a field mask so every cell comes
//! back as its effective value plus its number-format type. A cell counts as a
//! date only when the sheet formats it as one; its value is then a serial
//! number of days since 1899-12-30, independent of the spreadsheet locale.
//! Writes use `values.update`.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use reqwest::Url;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::domain::CellValue;
use crate::error::{LedgerError, PipelineError};
use crate::ledger::LedgerStore;

const BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Only what cell classification needs.
const GRID_FIELDS: &str = "sheets.data(startRow,rowData.values(effectiveValue,effectiveFormat.numberFormat.type))";

const SECONDS_PER_DAY: f64 = 86_400.0;

pub struct SheetsClient {
    client: Client,
    spreadsheet_id: String,
    access_token: String,
}

impl SheetsClient {
    pub fn new(spreadsheet_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            spreadsheet_id: spreadsheet_id.into(),
            access_token: access_token.into(),
        }
    }

    fn url(&self, tail: &[&str]) -> Result<Url, PipelineError> {
        let mut url = Url::parse(BASE_URL).map_err(|e| PipelineError::transport("sheets", e))?;
        url.path_segments_mut()
            .map_err(|_| PipelineError::transport("sheets", "base URL cannot take a path"))?
            .push(&self.spreadsheet_id)
            .extend(tail);
        Ok(url)
    }

    fn read_range(&self, sheet: &str, range: &str) -> Result<Vec<CellValue>, PipelineError> {
        let url = self.url(&[])?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[("ranges", range), ("fields", GRID_FIELDS)])
            .send()
            .map_err(|e| store_error(sheet, format!("read {range} failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(store_error(sheet, format!("read {range} returned status {}", resp.status())));
        }

        let body: Spreadsheet = resp
            .json()
            .map_err(|e| store_error(sheet, format!("failed to parse grid for {range}: {e}")))?;
        Ok(cells_from_grid(body))
    }
}

impl LedgerStore for SheetsClient {
    fn get_column_range(
        &self,
        sheet: &str,
        column: usize,
        row_count: Option<usize>,
    ) -> Result<Vec<CellValue>, PipelineError> {
        let letter = column_letter(column);
        let range = match row_count {
            Some(n) => a1_range(sheet, &format!("{letter}1:{letter}{n}")),
            None => a1_range(sheet, &format!("{letter}:{letter}")),
        };

        let mut cells = self.read_range(sheet, &range)?;
        // The API drops trailing empty rows.
        if let Some(n) = row_count {
            cells.resize(n, CellValue::Empty);
        }
        Ok(cells)
    }

    fn get_cell(&self, sheet: &str, row: usize, column: usize) -> Result<CellValue, PipelineError> {
        let range = a1_range(sheet, &format!("{}{row}", column_letter(column)));
        let cells = self.read_range(sheet, &range)?;
        // A single-cell grid starts at `row - 1`, so the cell is the last one.
        Ok(cells.into_iter().next_back().unwrap_or(CellValue::Empty))
    }

    fn set_cell(&self, sheet: &str, row: usize, column: usize, value: f64) -> Result<(), PipelineError> {
        let range = a1_range(sheet, &format!("{}{row}", column_letter(column)));
        let url = self.url(&["values", range.as_str()])?;
        let body = ValueRangeWrite {
            range: &range,
            major_dimension: "ROWS",
            values: [[value]],
        };

        let resp = self
            .client
            .put(url)
            .bearer_auth(&self.access_token)
            .query(&[("valueInputOption", "RAW")])
            .json(&body)
            .send()
            .map_err(|e| store_error(sheet, format!("write {range} failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(store_error(sheet, format!("write {range} returned status {}", resp.status())));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<SheetGrid>,
}

#[derive(Debug, Default, Deserialize)]
struct SheetGrid {
    #[serde(default)]
    data: Vec<GridData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridData {
    /// 0-based; omitted when the grid starts at the first row.
    #[serde(default)]
    start_row: usize,
    #[serde(default)]
    row_data: Vec<RowData>,
}

#[derive(Debug, Default, Deserialize)]
struct RowData {
    #[serde(default)]
    values: Vec<CellData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CellData {
    effective_value: Option<ExtendedValue>,
    effective_format: Option<CellFormat>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtendedValue {
    number_value: Option<f64>,
    string_value: Option<String>,
    bool_value: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CellFormat {
    number_format: Option<NumberFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct NumberFormat {
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeWrite<'a> {
    range: &'a str,
    major_dimension: &'a str,
    values: [[f64; 1]; 1],
}

fn store_error(sheet: &str, message: String) -> PipelineError {
    LedgerError::Store {
        sheet: sheet.to_string(),
        message,
    }
    .into()
}

/// 1-based column index to A1 letters (1 = A, 27 = AA).
pub fn column_letter(column: usize) -> String {
    let mut n = column;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Quote a sheet name for A1 notation (`'It''s'!A1`).
fn a1_range(sheet: &str, cells: &str) -> String {
    format!("'{}'!{cells}", sheet.replace('\'', "''"))
}

/// Flatten the first column of the first grid into 0-based row order.
fn cells_from_grid(body: Spreadsheet) -> Vec<CellValue> {
    let Some(grid) = body
        .sheets
        .into_iter()
        .next()
        .and_then(|sheet| sheet.data.into_iter().next())
    else {
        return Vec::new();
    };

    let mut cells = vec![CellValue::Empty; grid.start_row];
    cells.extend(
        grid.row_data
            .into_iter()
            .map(|row| row.values.into_iter().next().map(cell_value).unwrap_or(CellValue::Empty)),
    );
    cells
}

fn cell_value(cell: CellData) -> CellValue {
    let is_date = cell
        .effective_format
        .and_then(|f| f.number_format)
        .is_some_and(|nf| matches!(nf.kind.as_str(), "DATE" | "DATE_TIME"));

    let Some(value) = cell.effective_value else {
        return CellValue::Empty;
    };
    if let Some(n) = value.number_value {
        return match is_date.then(|| serial_to_date_time(n)).flatten() {
            Some(dt) => CellValue::Date(dt),
            None => CellValue::Number(n),
        };
    }
    match (value.string_value, value.bool_value) {
        (Some(s), _) if s.trim().is_empty() => CellValue::Empty,
        (Some(s), _) => CellValue::Text(s),
        (None, Some(b)) => CellValue::Text(b.to_string()),
        (None, None) => CellValue::Empty,
    }
}

/// Spreadsheet serial (days since 1899-12-30, fraction = time of day).
pub fn serial_to_date_time(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let days = serial.floor();
    let seconds = ((serial - days) * SECONDS_PER_DAY).round() as i64;
    NaiveDate::from_ymd_opt(1899, 12, 30)?
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(TimeDelta::try_days(days as i64)?)?
        .checked_add_signed(TimeDelta::try_seconds(seconds)?)
}
