//! Текст с разделителями: разделитель `;`, если он есть в строке заголовков,
//! иначе `,`. Кавычки вокруг ячеек снимаются, пустые строки пропускаются.

use crate::{
    error::{FiscoError, Result},
    ingest::{is_blank_row, normalize_header, strip_quotes, RawTable},
};
use csv::ReaderBuilder;
use std::io::Read;
use tracing::debug;

pub struct Delimited;

impl crate::traits::ReadTable for Delimited {
    fn read<R: Read>(mut r: R) -> Result<RawTable> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;
        let text = String::from_utf8_lossy(&bytes);
        let text = text.trim_start_matches('\u{feff}');

        let header_line = text
            .lines()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| FiscoError::Parse("empty file".into()))?;
        let delimiter = if header_line.contains(';') { b';' } else { b',' };

        let mut rdr = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut headers: Option<Vec<String>> = None;
        let mut rows = Vec::new();
        for rec in rdr.records() {
            let rec = rec?;
            let cells: Vec<String> = rec.iter().map(|c| strip_quotes(c).to_string()).collect();
            if is_blank_row(&cells) {
                continue;
            }
            match headers {
                None => headers = Some(cells.iter().map(|h| normalize_header(h)).collect()),
                Some(_) => rows.push(cells),
            }
        }

        let headers = headers.ok_or_else(|| FiscoError::Parse("empty file".into()))?;
        debug!(delimiter = %(delimiter as char), columns = headers.len(), rows = rows.len(), "delimited table read");
        Ok(RawTable { headers, rows })
    }
}
