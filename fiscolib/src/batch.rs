//! Пакет импорта и его жизненный цикл.
//!
//! ```text
//! Empty -> Loaded -> Edited -> Submitting -> Empty          (успех)
//!                                        \-> Loaded/Edited  (ошибка)
//! ```
//! Загрузка нового файла всегда заменяет текущий пакет без подтверждения.

use crate::{
    coerce::coerce,
    config::ImportConfig,
    error::{FiscoError, Result},
    ingest::SourceFormat,
    model::{Allocation, FieldKey, FiscalRecord, TaxClass},
    payload::{build_payload, Payload, SubmissionResponse},
    perceptions::{self, BulkApplyReport},
    pipeline::{self, BatchView},
    rates::{self, RateTable},
    traits::SubmissionEndpoint,
};
use std::{fs, path::Path};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchState {
    #[default]
    Empty,
    Loaded,
    Edited,
    Submitting,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows: usize,
    pub unmapped: Vec<String>,
    /// Нефатальные ошибки разбора; при них пакет остаётся пустым.
    pub warnings: Vec<String>,
}

/// Результат отправки по одному документу.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    /// Индекс строки в пакете на момент отправки.
    pub row_index: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Все документы приняты, пакет очищен.
    Accepted {
        documents: usize,
        warnings: Vec<DocumentReport>,
    },
    /// Принятые строки удалены, отклонённые остались в пакете.
    Partial {
        accepted: usize,
        rejected: Vec<DocumentReport>,
        warnings: Vec<DocumentReport>,
    },
    /// Пакет не изменён.
    Failed { error: String },
}

pub struct ImportBatch {
    config: ImportConfig,
    rates: RateTable,
    state: BatchState,
    records: Vec<FiscalRecord>,
    source: Option<String>,
    /// Строки, ушедшие в текущую отправку, и состояние до неё.
    in_flight: Option<(Vec<usize>, BatchState)>,
}

impl ImportBatch {
    pub fn new(config: ImportConfig) -> Self {
        let rates = config.rate_table();
        Self {
            config,
            rates,
            state: BatchState::Empty,
            records: Vec::new(),
            source: None,
            in_flight: None,
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn rate_table(&self) -> &RateTable {
        &self.rates
    }

    pub fn records(&self) -> &[FiscalRecord] {
        &self.records
    }

    pub fn record(&self, row: usize) -> Option<&FiscalRecord> {
        self.records.get(row)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<LoadReport> {
        self.load_file_as(path, None)
    }

    /// Как [`Self::load_file`], но с явным форматом; `None` — определить по файлу.
    /// Нечитаемый файл становится предупреждением, пакет остаётся пустым.
    pub fn load_file_as(&mut self, path: impl AsRef<Path>, format: Option<SourceFormat>) -> Result<LoadReport> {
        let path = path.as_ref();
        self.ensure_not_submitting()?;
        match fs::read(path) {
            Ok(bytes) => {
                let format = format.unwrap_or_else(|| SourceFormat::detect(Some(path), &bytes));
                self.load_bytes(&path.display().to_string(), &bytes, format)
            }
            Err(e) => {
                self.reset();
                warn!(path = %path.display(), error = %e, "file unreadable");
                Ok(LoadReport {
                    warnings: vec![format!("{}: {e}", path.display())],
                    ..LoadReport::default()
                })
            }
        }
    }

    /// Заменяет пакет содержимым файла. Ошибки разбора становятся предупреждениями.
    pub fn load_bytes(&mut self, name: &str, bytes: &[u8], format: SourceFormat) -> Result<LoadReport> {
        self.ensure_not_submitting()?;
        self.reset();

        match pipeline::ingest(bytes, format, &self.config) {
            Ok(ingested) if ingested.records.is_empty() => {
                warn!(source = name, "no data rows");
                Ok(LoadReport {
                    unmapped: ingested.unmapped,
                    warnings: vec![format!("{name}: no data rows")],
                    ..LoadReport::default()
                })
            }
            Ok(ingested) => {
                self.records = ingested.records;
                self.source = Some(name.to_string());
                self.state = BatchState::Loaded;
                info!(source = name, rows = self.records.len(), "batch loaded");
                Ok(LoadReport {
                    rows: self.records.len(),
                    unmapped: ingested.unmapped,
                    warnings: Vec::new(),
                })
            }
            Err(e) => {
                warn!(source = name, error = %e, "ingestion failed");
                Ok(LoadReport {
                    warnings: vec![format!("{name}: {e}")],
                    ..LoadReport::default()
                })
            }
        }
    }

    pub fn clear(&mut self) -> Result<()> {
        self.ensure_not_submitting()?;
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        self.records.clear();
        self.source = None;
        self.in_flight = None;
        self.state = BatchState::Empty;
    }

    /// Правка ячейки: приведение, пересинхронизация распределений, повторный вывод ставки.
    pub fn edit_cell(&mut self, row: usize, key: FieldKey, raw: &str) -> Result<()> {
        let config = &self.config;
        let record = Self::editable(&mut self.records, self.state, row)?;
        record.set(key, coerce(key.kind(), raw));
        record.clear_conflicts(key);

        match key {
            FieldKey::PerceptionGrossRevenueAmount => perceptions::resync(
                &mut record.perception_gross_revenue.allocations,
                record.perception_gross_revenue.amount,
                TaxClass::GrossRevenue,
            ),
            FieldKey::OtherTaxesAmount => perceptions::resync(
                &mut record.other_taxes_allocations,
                record.other_taxes_amount,
                TaxClass::Unassigned,
            ),
            _ => {}
        }
        rates::resolve(record, config);
        self.touch();
        Ok(())
    }

    /// Правка по каноническому имени поля или slug-имени дополнительной колонки.
    pub fn edit_named(&mut self, row: usize, name: &str, raw: &str) -> Result<()> {
        match FieldKey::from_canonical(name) {
            Some(key) => self.edit_cell(row, key, raw),
            None => {
                let record = Self::editable(&mut self.records, self.state, row)?;
                record.extras.insert(name.to_string(), raw.to_string());
                self.touch();
                Ok(())
            }
        }
    }

    pub fn set_gross_revenue_allocations(&mut self, row: usize, allocations: Vec<Allocation>) -> Result<()> {
        let record = Self::editable(&mut self.records, self.state, row)?;
        record.perception_gross_revenue.allocations = allocations
            .into_iter()
            .map(|a| Allocation {
                classification: TaxClass::GrossRevenue,
                ..a
            })
            .collect();
        self.touch();
        Ok(())
    }

    pub fn set_other_taxes_allocations(&mut self, row: usize, allocations: Vec<Allocation>) -> Result<()> {
        let record = Self::editable(&mut self.records, self.state, row)?;
        record.other_taxes_allocations = allocations;
        self.touch();
        Ok(())
    }

    pub fn set_national_perception_type(&mut self, row: usize, tag: Option<&str>) -> Result<()> {
        let record = Self::editable(&mut self.records, self.state, row)?;
        record.perception_other_national.type_tag = tag
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        record.clear_conflicts(FieldKey::PerceptionOtherNationalType);
        self.touch();
        Ok(())
    }

    pub fn bulk_apply_jurisdiction(&mut self, rows: &[usize], jurisdiction: &str) -> Result<BulkApplyReport> {
        self.ensure_editable()?;
        let report = perceptions::bulk_apply_jurisdiction(&mut self.records, rows, jurisdiction);
        if report.skipped_split > 0 {
            info!(jurisdiction, skipped = report.skipped_split, "split rows left untouched");
        }
        if report.updated > 0 {
            self.touch();
        }
        Ok(report)
    }

    pub fn remove_row(&mut self, row: usize) -> Result<FiscalRecord> {
        Self::editable(&mut self.records, self.state, row)?;
        let removed = self.records.remove(row);
        if self.records.is_empty() {
            self.reset();
        } else {
            self.touch();
        }
        Ok(removed)
    }

    /// Проблемы, валидные строки и итоги по текущему содержимому.
    pub fn view(&self) -> BatchView {
        pipeline::derive(&self.records, &self.config, &self.rates)
    }

    /// Строит пакет из валидных строк и переводит его в `Submitting`.
    pub fn begin_submit(&mut self) -> Result<Payload> {
        self.ensure_editable()?;
        let rows = self.view().valid_rows;
        if rows.is_empty() {
            return Err(FiscoError::InvalidState("no valid rows to submit"));
        }
        let payload = build_payload(&self.records, &rows, &self.config, &self.rates);
        info!(documents = payload.documents.len(), "submitting batch");
        self.in_flight = Some((rows, self.state));
        self.state = BatchState::Submitting;
        Ok(payload)
    }

    /// Применяет ответ точки сохранения. Повторных попыток нет.
    pub fn finish_submit(&mut self, response: Result<SubmissionResponse>) -> Result<SubmitOutcome> {
        let (rows, prior) = self
            .in_flight
            .take()
            .ok_or(FiscoError::InvalidState("no submission in flight"))?;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                self.state = prior;
                warn!(error = %e, "submission failed");
                return Ok(SubmitOutcome::Failed { error: e.to_string() });
            }
        };

        let mut accepted_rows = Vec::new();
        let mut rejected = Vec::new();
        let mut warnings = Vec::new();
        for (index, &row_index) in rows.iter().enumerate() {
            let result = response.documents.iter().find(|d| d.index == index);
            let report = DocumentReport {
                row_index,
                errors: result.map(|d| d.errors.clone()).unwrap_or_default(),
                warnings: result.map(|d| d.warnings.clone()).unwrap_or_default(),
            };
            if !report.warnings.is_empty() {
                warnings.push(report.clone());
            }
            match result {
                Some(d) if d.accepted => accepted_rows.push(row_index),
                Some(_) => rejected.push(report),
                None => rejected.push(DocumentReport {
                    errors: vec!["no result reported for document".into()],
                    ..report
                }),
            }
        }

        if rejected.is_empty() {
            info!(documents = accepted_rows.len(), "batch accepted");
            self.reset();
            return Ok(SubmitOutcome::Accepted {
                documents: accepted_rows.len(),
                warnings,
            });
        }

        warn!(accepted = accepted_rows.len(), rejected = rejected.len(), "batch partially accepted");
        for &row in accepted_rows.iter().rev() {
            self.records.remove(row);
        }
        self.state = if accepted_rows.is_empty() {
            prior
        } else if self.records.is_empty() {
            BatchState::Empty
        } else {
            BatchState::Edited
        };
        Ok(SubmitOutcome::Partial {
            accepted: accepted_rows.len(),
            rejected,
            warnings,
        })
    }

    pub fn submit<E: SubmissionEndpoint>(&mut self, endpoint: &mut E) -> Result<SubmitOutcome> {
        let payload = self.begin_submit()?;
        let response = endpoint.submit(&payload);
        self.finish_submit(response)
    }

    fn touch(&mut self) {
        self.state = BatchState::Edited;
    }

    fn ensure_not_submitting(&self) -> Result<()> {
        match self.state {
            BatchState::Submitting => Err(FiscoError::InvalidState("batch is being submitted")),
            _ => Ok(()),
        }
    }

    fn ensure_editable(&self) -> Result<()> {
        match self.state {
            BatchState::Loaded | BatchState::Edited => Ok(()),
            BatchState::Empty => Err(FiscoError::InvalidState("batch is empty")),
            BatchState::Submitting => Err(FiscoError::InvalidState("batch is being submitted")),
        }
    }

    fn editable(records: &mut [FiscalRecord], state: BatchState, row: usize) -> Result<&mut FiscalRecord> {
        match state {
            BatchState::Submitting => return Err(FiscoError::InvalidState("batch is being submitted")),
            BatchState::Empty => return Err(FiscoError::InvalidState("batch is empty")),
            BatchState::Loaded | BatchState::Edited => {}
        }
        records.get_mut(row).ok_or(FiscoError::RowOutOfRange(row))
    }
}
