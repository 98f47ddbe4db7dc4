//! Электронная таблица (первый лист). Строка заголовков ищется среди первых
//! строк по токенам "fecha", "tipo", "punto de venta"; всё ниже — данные.

use crate::{
    error::{FiscoError, Result},
    ingest::{is_blank_row, normalize_header, RawTable},
};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::{Cursor, Read};
use tracing::debug;

/// Сколько строк просматривается в поиске заголовка.
pub const HEADER_SCAN_ROWS: usize = 20;

const HEADER_TOKENS: [&str; 3] = ["fecha", "tipo", "punto de venta"];

pub struct Spreadsheet;

impl crate::traits::ReadTable for Spreadsheet {
    fn read<R: Read>(mut r: R) -> Result<RawTable> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| FiscoError::Parse("workbook has no sheets".into()))??;

        let grid: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(render_cell).collect())
            .collect();
        table_from_grid(grid)
    }
}

/// Отделяет заголовок от данных в уже прочитанной сетке ячеек.
pub fn table_from_grid(grid: Vec<Vec<String>>) -> Result<RawTable> {
    let header_idx = grid
        .iter()
        .take(HEADER_SCAN_ROWS)
        .position(|row| is_header_row(row))
        .ok_or(FiscoError::NoHeader(HEADER_SCAN_ROWS))?;

    let mut rows = grid.into_iter().skip(header_idx);
    let headers: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(|h| normalize_header(h)).collect())
        .unwrap_or_default();
    let rows: Vec<Vec<String>> = rows.filter(|row| !is_blank_row(row)).collect();

    debug!(header_row = header_idx, columns = headers.len(), rows = rows.len(), "spreadsheet table read");
    Ok(RawTable { headers, rows })
}

fn is_header_row(row: &[String]) -> bool {
    let cells: Vec<String> = row.iter().map(|c| normalize_header(c)).collect();
    HEADER_TOKENS
        .iter()
        .all(|token| cells.iter().any(|c| c.contains(token)))
}

/// Числа — в локальной записи (десятичная запятая), даты — `YYYY-MM-DD`,
/// чтобы дальше приведение видело одну кодировку независимо от типа ячейки.
pub fn render_cell(cell: &Data) -> String {
    match cell {
        Data::String(v) => v.to_string(),
        Data::Float(v) => v.to_string().replace('.', ","),
        Data::Int(v) => v.to_string(),
        Data::Bool(v) => v.to_string(),
        Data::DateTime(v) => v
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| v.to_string()),
        Data::DateTimeIso(v) => v.to_string(),
        Data::DurationIso(v) => v.to_string(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}
