//! Распределение агрегатных перцепций по типам налога и юрисдикциям.
//!
//! Три независимых поля:
//! - национальная перцепция — один тег типа, всегда одна строка на 100% суммы;
//! - перцепция налога на валовый доход — делится по юрисдикциям;
//! - прочие налоги — каждая строка классифицируется пользователем.

use crate::{
    config::ImportConfig,
    model::{Allocation, FiscalRecord, NationalPerceptionKind, TaxClass},
};
use rust_decimal::Decimal;
use std::{collections::BTreeSet, fmt};

/// Какое из трёх агрегатных полей распределяется.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocatedField {
    OtherNational,
    GrossRevenue,
    OtherTaxes,
}

impl fmt::Display for AllocatedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AllocatedField::OtherNational => "other national perception",
            AllocatedField::GrossRevenue => "gross revenue perception",
            AllocatedField::OtherTaxes => "other taxes",
        })
    }
}

/// Распределение по умолчанию: одна строка на всю сумму, без юрисдикции.
pub fn default_allocations(amount: Option<Decimal>, classification: TaxClass) -> Vec<Allocation> {
    match amount.filter(|a| !a.is_zero()) {
        Some(amount) => vec![Allocation::new(classification, None, amount)],
        None => Vec::new(),
    }
}

/// Начальные распределения сразу после импорта.
pub fn seed_defaults(record: &mut FiscalRecord) {
    record.perception_gross_revenue.allocations =
        default_allocations(record.perception_gross_revenue.amount, TaxClass::GrossRevenue);
    record.other_taxes_allocations =
        default_allocations(record.other_taxes_amount, TaxClass::Unassigned);
}

/// Подстраивает распределение под изменённую агрегатную сумму.
/// Неразбитая строка получает новую сумму; разбитое распределение не трогается,
/// расхождение покажет валидация.
pub fn resync(allocations: &mut Vec<Allocation>, amount: Option<Decimal>, classification: TaxClass) {
    let amount = amount.filter(|a| !a.is_zero());
    match (allocations.len(), amount) {
        (0, _) => *allocations = default_allocations(amount, classification),
        (1, Some(amount)) => allocations[0].amount = amount,
        (1, None) => allocations.clear(),
        _ => {}
    }
}

/// Единственная строка национальной перцепции (если сумма ненулевая).
pub fn national_allocation(record: &FiscalRecord) -> Option<Allocation> {
    let amount = record
        .perception_other_national
        .amount
        .filter(|a| !a.is_zero())?;
    let classification = record
        .perception_other_national
        .type_tag
        .as_deref()
        .and_then(NationalPerceptionKind::parse)
        .map_or(TaxClass::Unassigned, |k| k.class());
    Some(Allocation::new(classification, None, amount))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkApplyReport {
    pub updated: usize,
    /// Уже разбиты на несколько юрисдикций — не перезаписываются.
    pub skipped_split: usize,
    pub without_allocation: usize,
    pub out_of_range: usize,
}

/// Проставляет юрисдикцию выбранным строкам с неразбитым распределением IIBB.
pub fn bulk_apply_jurisdiction(
    records: &mut [FiscalRecord],
    rows: &[usize],
    jurisdiction: &str,
) -> BulkApplyReport {
    let jurisdiction = jurisdiction.trim();
    let mut report = BulkApplyReport::default();
    let rows: BTreeSet<usize> = rows.iter().copied().collect();

    for row in rows {
        let Some(record) = records.get_mut(row) else {
            report.out_of_range += 1;
            continue;
        };
        match record.perception_gross_revenue.allocations.as_mut_slice() {
            [] => report.without_allocation += 1,
            [single] => {
                single.jurisdiction = Some(jurisdiction.to_string());
                report.updated += 1;
            }
            _ => report.skipped_split += 1,
        }
    }
    report
}

/// Нарушение инвариантов распределения.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationProblem {
    SumMismatch {
        field: AllocatedField,
        expected: Decimal,
        actual: Decimal,
    },
    MissingJurisdiction {
        field: AllocatedField,
        line: usize,
    },
    UnknownJurisdiction {
        field: AllocatedField,
        line: usize,
        code: String,
    },
    Unclassified {
        line: usize,
    },
    MissingNationalType,
    InvalidNationalType(String),
    /// Сумма строк не помещается в `Decimal`.
    Overflow {
        field: AllocatedField,
    },
}

impl fmt::Display for AllocationProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationProblem::SumMismatch { field, expected, actual } => write!(
                f,
                "{field}: allocations sum to {actual}, expected {expected}"
            ),
            AllocationProblem::MissingJurisdiction { field, line } => {
                write!(f, "{field}: line {} has no jurisdiction", line + 1)
            }
            AllocationProblem::UnknownJurisdiction { field, line, code } => {
                write!(f, "{field}: line {} has unknown jurisdiction '{code}'", line + 1)
            }
            AllocationProblem::Unclassified { line } => {
                write!(f, "other taxes: line {} is not classified", line + 1)
            }
            AllocationProblem::MissingNationalType => {
                f.write_str("other national perception has no type")
            }
            AllocationProblem::InvalidNationalType(tag) => {
                write!(f, "invalid other national perception type '{tag}'")
            }
            AllocationProblem::Overflow { field } => {
                write!(f, "{field}: allocation amounts are too large to sum")
            }
        }
    }
}

/// Проверка на сохранение: суммы, юрисдикции, классификация.
pub fn check(record: &FiscalRecord, config: &ImportConfig) -> Vec<AllocationProblem> {
    let epsilon = config.tolerances.sum_epsilon;
    let mut problems = Vec::new();

    let national = &record.perception_other_national;
    match national.type_tag.as_deref().map(str::trim) {
        Some(tag) if !tag.is_empty() && NationalPerceptionKind::parse(tag).is_none() => {
            problems.push(AllocationProblem::InvalidNationalType(tag.to_string()));
        }
        Some(tag) if !tag.is_empty() => {}
        _ => {
            if national.amount.is_some_and(|a| !a.is_zero()) {
                problems.push(AllocationProblem::MissingNationalType);
            }
        }
    }

    let gross = &record.perception_gross_revenue;
    check_sum(AllocatedField::GrossRevenue, gross.amount, &gross.allocations, epsilon, &mut problems);
    check_lines(AllocatedField::GrossRevenue, &gross.allocations, config, &mut problems);

    check_sum(
        AllocatedField::OtherTaxes,
        record.other_taxes_amount,
        &record.other_taxes_allocations,
        epsilon,
        &mut problems,
    );
    check_lines(AllocatedField::OtherTaxes, &record.other_taxes_allocations, config, &mut problems);

    problems
}

fn check_sum(
    field: AllocatedField,
    amount: Option<Decimal>,
    allocations: &[Allocation],
    epsilon: Decimal,
    problems: &mut Vec<AllocationProblem>,
) {
    let expected = amount.unwrap_or_default();
    let actual = allocations
        .iter()
        .try_fold(Decimal::ZERO, |acc, a| acc.checked_add(a.amount));
    let Some(actual) = actual else {
        problems.push(AllocationProblem::Overflow { field });
        return;
    };
    match expected.checked_sub(actual) {
        Some(diff) if diff.abs() <= epsilon => {}
        Some(_) => problems.push(AllocationProblem::SumMismatch { field, expected, actual }),
        None => problems.push(AllocationProblem::Overflow { field }),
    }
}

fn check_lines(
    field: AllocatedField,
    allocations: &[Allocation],
    config: &ImportConfig,
    problems: &mut Vec<AllocationProblem>,
) {
    for (line, a) in allocations.iter().enumerate() {
        // В прочих налогах класс выбирает пользователь; у IIBB он фиксирован.
        let classification = match field {
            AllocatedField::GrossRevenue => TaxClass::GrossRevenue,
            _ => a.classification,
        };
        if classification == TaxClass::Unassigned && !a.amount.is_zero() {
            problems.push(AllocationProblem::Unclassified { line });
        }
        match a.jurisdiction() {
            None if classification == TaxClass::GrossRevenue => {
                problems.push(AllocationProblem::MissingJurisdiction { field, line });
            }
            Some(code)
                if !config.jurisdictions.is_empty() && config.jurisdiction_name(code).is_none() =>
            {
                problems.push(AllocationProblem::UnknownJurisdiction {
                    field,
                    line,
                    code: code.to_string(),
                });
            }
            _ => {}
        }
    }
}
