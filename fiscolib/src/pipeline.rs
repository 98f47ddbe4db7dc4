//! Явный конвейер: `ingest -> normalize -> validate(config) -> view`.
//! Производные данные (проблемы, валидные строки, итоги) пересчитываются
//! по требованию из текущих записей, без кэша.

use crate::{
    coerce::{coerce, parse_decimal},
    config::ImportConfig,
    error::Result,
    headers::{ColumnTarget, HeaderMap},
    ingest::{read_table, RawTable, SourceFormat},
    model::{ColumnConflict, FieldKey, FiscalRecord, NationalPerceptionKind},
    perceptions,
    preview::{preview, PreviewTotals},
    rates::{self, RateResolution, RateTable},
    validate::{valid_rows, validate_all, ValidationIssue},
};
use rust_decimal::Decimal;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct Ingested {
    pub format: SourceFormat,
    pub records: Vec<FiscalRecord>,
    /// Slug-имена нераспознанных колонок.
    pub unmapped: Vec<String>,
}

/// Файл -> нормализованные записи с начальными распределениями и выведенными ставками.
pub fn ingest(bytes: &[u8], format: SourceFormat, config: &ImportConfig) -> Result<Ingested> {
    let table = read_table(format, bytes)?;
    Ok(normalize(table, format, config))
}

/// Сырая таблица поглощается: после приведения сырые строки не нужны.
pub fn normalize(table: RawTable, format: SourceFormat, config: &ImportConfig) -> Ingested {
    let map = HeaderMap::build(&table.headers, format);
    let unmapped: Vec<String> = map.unmapped().map(str::to_string).collect();
    if !unmapped.is_empty() {
        debug!(?unmapped, "unmapped columns kept as extras");
    }

    let records: Vec<FiscalRecord> = table
        .rows
        .into_iter()
        .map(|row| {
            let mut record = build_record(&map, row);
            prepare(&mut record, config);
            record
        })
        .collect();

    let inferred = records
        .iter()
        .filter(|r| matches!(r.rate_resolution, RateResolution::Inferred(_)))
        .count();
    info!(rows = records.len(), inferred, ?format, "records normalized");

    Ingested {
        format,
        records,
        unmapped,
    }
}

fn build_record(map: &HeaderMap, row: Vec<String>) -> FiscalRecord {
    let mut record = FiscalRecord::default();
    for (target, cell) in map.columns().iter().zip(row) {
        match target {
            ColumnTarget::Field(key) => {
                // при дублирующихся колонках выигрывает первая непустая
                if !record.get(*key).is_empty() {
                    continue;
                }
                let value = coerce(key.kind(), &cell);
                if !value.is_empty() {
                    record.set(*key, value);
                }
            }
            ColumnTarget::NationalPerception(kind) => {
                if let Some(amount) = parse_decimal(&cell).filter(|a| !a.is_zero()) {
                    take_national_perception(&mut record, *kind, amount);
                }
            }
            ColumnTarget::Extra(slug) => {
                record.extras.entry(slug.clone()).or_insert(cell);
            }
        }
    }
    record
}

/// Поле национальной перцепции одно; вторая непустая колонка с суммой
/// или расходящийся тег фиксируются как конфликт, а не теряются молча.
fn take_national_perception(record: &mut FiscalRecord, kind: NationalPerceptionKind, amount: Decimal) {
    let national = &mut record.perception_other_national;
    let conflict = match national.amount {
        Some(kept) => Some(ColumnConflict {
            field: FieldKey::PerceptionOtherNationalAmount,
            kept: format!("{} {kept}", national.type_tag.as_deref().unwrap_or("?")),
            dropped: format!("{} {amount}", kind.tag()),
        }),
        None => {
            national.amount = Some(amount);
            match national.type_tag.as_deref() {
                None => {
                    national.type_tag = Some(kind.tag().to_string());
                    None
                }
                Some(tag) if NationalPerceptionKind::parse(tag) == Some(kind) => None,
                Some(tag) => Some(ColumnConflict {
                    field: FieldKey::PerceptionOtherNationalType,
                    kept: tag.to_string(),
                    dropped: kind.tag().to_string(),
                }),
            }
        }
    };
    if let Some(conflict) = conflict {
        debug!(field = ?conflict.field, kept = %conflict.kept, dropped = %conflict.dropped, "column conflict");
        record.conflicts.push(conflict);
    }
}

/// Начальные распределения + вывод ставки.
pub fn prepare(record: &mut FiscalRecord, config: &ImportConfig) {
    perceptions::seed_defaults(record);
    rates::resolve(record, config);
}

/// Производное состояние пакета.
#[derive(Debug, Clone, Default)]
pub struct BatchView {
    pub issues: Vec<ValidationIssue>,
    pub valid_rows: Vec<usize>,
    pub preview: PreviewTotals,
}

impl BatchView {
    pub fn issues_for(&self, row: usize) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.row_index == row)
    }
}

pub fn derive(records: &[FiscalRecord], config: &ImportConfig, rates: &RateTable) -> BatchView {
    let issues = validate_all(records, config, rates);
    let valid_rows = valid_rows(records.len(), &issues);
    BatchView {
        preview: preview(records, rates),
        valid_rows,
        issues,
    }
}
