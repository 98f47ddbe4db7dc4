//! fiscolib — импорт фискальных документов из CSV/XLSX, нормализация ставок НДС
//! и распределение перцепций перед отправкой пакета.

pub mod batch;
pub mod coerce;
pub mod config;
pub mod error;
pub mod headers;
pub mod ingest;
pub mod model;
pub mod payload;
pub mod perceptions;
pub mod pipeline;
pub mod preview;
pub mod rates;
pub mod traits;
pub mod validate;

pub mod formats {
    pub mod delimited;
    pub mod spreadsheet;
}

pub use batch::{BatchState, ImportBatch, SubmitOutcome};
pub use config::ImportConfig;
pub use error::{FiscoError, Result};
pub use model::{Allocation, FieldKey, FiscalRecord, TaxClass};
