//! Чтение файла в «сырую» таблицу: нормализованные заголовки + строки ячеек.

use crate::{
    error::Result,
    formats::{delimited::Delimited, spreadsheet::Spreadsheet},
    traits::ReadTable,
};
use std::path::Path;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Заголовки и строки данных до приведения типов. Живёт только до построения записей.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited,
    Spreadsheet,
}

impl SourceFormat {
    /// По расширению, иначе по сигнатуре (ZIP / OLE2 -> таблица).
    pub fn detect(path: Option<&Path>, bytes: &[u8]) -> Self {
        let by_ext = path
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match by_ext.as_deref() {
            Some("csv" | "txt") => return SourceFormat::Delimited,
            Some("xlsx" | "xlsm" | "xls" | "xlsb" | "ods") => return SourceFormat::Spreadsheet,
            _ => {}
        }

        const ZIP: &[u8] = b"PK\x03\x04";
        const OLE2: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];
        if bytes.starts_with(ZIP) || bytes.starts_with(OLE2) {
            SourceFormat::Spreadsheet
        } else {
            SourceFormat::Delimited
        }
    }
}

pub fn read_table(format: SourceFormat, bytes: &[u8]) -> Result<RawTable> {
    match format {
        SourceFormat::Delimited => Delimited::read(bytes),
        SourceFormat::Spreadsheet => Spreadsheet::read(bytes),
    }
}

/// Нижний регистр, без диакритики и кавычек, пробелы схлопнуты.
pub fn normalize_header(raw: &str) -> String {
    let folded: String = strip_quotes(raw)
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Снимает окружающие кавычки (`"`, `'`) и пробелы.
pub fn strip_quotes(raw: &str) -> &str {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
}

pub(crate) fn is_blank_row(cells: &[String]) -> bool {
    cells.iter().all(|c| c.trim().is_empty())
}
