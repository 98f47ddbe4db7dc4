//! Построчная проверка. Каждая строка проверяется независимо, все проблемы
//! собираются (не только первая); строка с проблемами исключается из отправки,
//! но остаётся в пакете и в предварительных итогах.

use crate::{
    config::{DocumentFlow, ImportConfig},
    model::FiscalRecord,
    perceptions::{self, AllocationProblem},
    rates::{RateResolution, RateTable},
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingDocumentType,
    UnknownDocumentType,
    MissingPointOfSale,
    MissingCounterparty,
    UnconfiguredRate,
    UndeterminableRate,
    InvalidPerceptionType,
    AllocationSumMismatch,
    MissingJurisdiction,
    UnknownJurisdiction,
    UnclassifiedAllocation,
    ConflictingColumns,
    AmountOverflow,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub row_index: usize,
    pub kind: IssueKind,
    pub message: String,
}

impl ValidationIssue {
    fn new(row_index: usize, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            row_index,
            kind,
            message: message.into(),
        }
    }
}

pub fn validate_row(
    row_index: usize,
    record: &FiscalRecord,
    config: &ImportConfig,
    rates: &RateTable,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut push = |kind: IssueKind, message: String| {
        issues.push(ValidationIssue::new(row_index, kind, message));
    };

    match record.document_type_code {
        None => push(IssueKind::MissingDocumentType, "document type is missing".into()),
        Some(code) if config.document_type(code).is_none() => push(
            IssueKind::UnknownDocumentType,
            format!("document type {code:03} is not in the document type table"),
        ),
        Some(_) => {}
    }

    if record.pos_number.is_none() {
        push(IssueKind::MissingPointOfSale, "point of sale is missing".into());
    }

    if config.flow == DocumentFlow::Purchase && record.counterparty_doc_number.is_none() {
        push(
            IssueKind::MissingCounterparty,
            "counterparty document number is missing".into(),
        );
    }

    match record.rate_resolution {
        RateResolution::Unresolved | RateResolution::Undeterminable => push(
            IssueKind::UndeterminableRate,
            "tax rate could not be determined from net and tax amounts".into(),
        ),
        _ => {}
    }

    for (rate, amount) in record.rate_buckets() {
        if !amount.is_zero() && !rates.is_configured(rate) {
            push(
                IssueKind::UnconfiguredRate,
                format!("rate {} is not an active tax rate", rates.label(rate)),
            );
        }
    }

    for conflict in &record.conflicts {
        push(
            IssueKind::ConflictingColumns,
            format!(
                "columns disagree on {}: kept {}, dropped {}",
                conflict.field.canonical_name(),
                conflict.kept,
                conflict.dropped
            ),
        );
    }

    for problem in perceptions::check(record, config) {
        let kind = match &problem {
            AllocationProblem::SumMismatch { .. } => IssueKind::AllocationSumMismatch,
            AllocationProblem::MissingJurisdiction { .. } => IssueKind::MissingJurisdiction,
            AllocationProblem::UnknownJurisdiction { .. } => IssueKind::UnknownJurisdiction,
            AllocationProblem::Unclassified { .. } => IssueKind::UnclassifiedAllocation,
            AllocationProblem::Overflow { .. } => IssueKind::AmountOverflow,
            AllocationProblem::MissingNationalType | AllocationProblem::InvalidNationalType(_) => {
                IssueKind::InvalidPerceptionType
            }
        };
        push(kind, problem.to_string());
    }

    issues
}

pub fn validate_all(
    records: &[FiscalRecord],
    config: &ImportConfig,
    rates: &RateTable,
) -> Vec<ValidationIssue> {
    records
        .iter()
        .enumerate()
        .flat_map(|(i, r)| validate_row(i, r, config, rates))
        .collect()
}

/// Индексы строк без единой проблемы.
pub fn valid_rows(record_count: usize, issues: &[ValidationIssue]) -> Vec<usize> {
    (0..record_count)
        .filter(|i| !issues.iter().any(|issue| issue.row_index == *i))
        .collect()
}
