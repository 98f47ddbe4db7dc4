//! Предварительные итоги пакета по корзинам ставок. Считаются по всем строкам,
//! включая невалидные.

use crate::{
    model::FiscalRecord,
    rates::{Rate, RateTable},
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Нулевая ставка, необлагаемое и освобождённое сводятся в одну строку.
pub const EXEMPT_LABEL: &str = "Exento/No Gravado";
pub const OTHER_TAXES_LABEL: &str = "Otros Tributos";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreviewTotals {
    totals: Vec<(String, Decimal)>,
}

impl PreviewTotals {
    fn add(&mut self, label: &str, amount: Decimal) {
        match self.totals.iter_mut().find(|(l, _)| l == label) {
            Some((_, total)) => *total = total.saturating_add(amount),
            None => self.totals.push((label.to_string(), amount)),
        }
    }

    pub fn get(&self, label: &str) -> Option<Decimal> {
        self.totals
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, total)| *total)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.totals.iter().map(|(l, t)| (l.as_str(), *t))
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn grand_total(&self) -> Decimal {
        self.totals
            .iter()
            .fold(Decimal::ZERO, |acc, (_, t)| acc.saturating_add(*t))
    }
}

/// Суммы насыщаются на границе `Decimal`: импорт ограничивает каждую сумму
/// (см. [`crate::coerce::MAX_AMOUNT`]), так что предел недостижим на реальных пакетах.
pub fn preview(records: &[FiscalRecord], rates: &RateTable) -> PreviewTotals {
    let mut totals = PreviewTotals::default();

    // порядок строк: ставки по возрастанию, затем освобождённое, затем прочие
    let mut by_rate: BTreeMap<Rate, Decimal> = BTreeMap::new();
    let mut exempt = Decimal::ZERO;
    for record in records {
        for (rate, amount) in record.rate_buckets() {
            if rate.is_zero() {
                exempt = exempt.saturating_add(amount);
            } else {
                let total = by_rate.entry(rate).or_default();
                *total = total.saturating_add(amount);
            }
        }
        exempt = [record.non_taxed_amount, record.exempt_amount]
            .into_iter()
            .flatten()
            .fold(exempt, Decimal::saturating_add);
    }

    for (rate, amount) in by_rate {
        totals.add(&rates.label(rate), amount);
    }
    totals.add(EXEMPT_LABEL, exempt);

    let other = records
        .iter()
        .filter_map(|r| r.other_taxes_amount)
        .fold(Decimal::ZERO, Decimal::saturating_add);
    totals.add(OTHER_TAXES_LABEL, other);

    totals.totals.retain(|(_, t)| !t.is_zero());
    totals
}
