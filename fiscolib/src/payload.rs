//! Исходящий пакет для точки сохранения и её ответ.

use crate::{
    config::ImportConfig,
    model::{Allocation, FiscalRecord, TaxClass},
    perceptions::national_allocation,
    rates::RateTable,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Payload {
    pub company: String,
    pub due_date_offset_days: u32,
    pub documents: Vec<DocumentPayload>,
}

/// Унифицированная строка перцепции.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PerceptionLine {
    #[serde(rename = "type")]
    pub kind: String,
    pub jurisdiction: Option<String>,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DocumentPayload {
    pub emission_date: Option<String>,
    pub document_type_code: Option<u64>,
    pub pos_number: Option<u64>,
    pub number_from: Option<u64>,
    pub number_to: Option<u64>,
    pub authorization_code: Option<String>,
    pub counterparty_doc_type: Option<String>,
    pub counterparty_doc_number: Option<String>,
    pub counterparty_name: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub currency_code: Option<String>,
    /// Ключ корзины (`net_21`) -> нетто.
    pub net_by_rate: BTreeMap<String, Decimal>,
    pub non_taxed_amount: Option<Decimal>,
    pub exempt_amount: Option<Decimal>,
    pub other_taxes_amount: Option<Decimal>,
    pub net_total: Option<Decimal>,
    pub tax_total: Option<Decimal>,
    pub grand_total: Option<Decimal>,
    pub perception_other_national_amount: Option<Decimal>,
    pub perception_other_national_type: Option<String>,
    pub perception_gross_revenue_amount: Option<Decimal>,
    pub perception_gross_revenue_allocations: Vec<Allocation>,
    pub perceptions: Vec<PerceptionLine>,
    pub other_taxes_allocations: Vec<Allocation>,
}

/// Плоский список перцепций из всех трёх источников без нулевых и no-op строк.
pub fn flatten_perceptions(record: &FiscalRecord) -> Vec<PerceptionLine> {
    let gross = record.perception_gross_revenue.allocations.iter().map(|a| Allocation {
        classification: TaxClass::GrossRevenue,
        ..a.clone()
    });

    national_allocation(record)
        .into_iter()
        .chain(gross)
        .chain(record.other_taxes_allocations.iter().cloned())
        .filter(|a| !a.amount.is_zero())
        .filter_map(|a| {
            let kind = a.classification.perception_tag()?;
            Some(PerceptionLine {
                kind: kind.to_string(),
                jurisdiction: a.jurisdiction().map(str::to_string),
                amount: a.amount,
            })
        })
        .collect()
}

pub fn build_document(record: &FiscalRecord, rates: &RateTable) -> DocumentPayload {
    DocumentPayload {
        emission_date: record.emission_date.clone(),
        document_type_code: record.document_type_code,
        pos_number: record.pos_number,
        number_from: record.number_from,
        number_to: record.number_to,
        authorization_code: record.authorization_code.clone(),
        counterparty_doc_type: record.counterparty_doc_type.clone(),
        counterparty_doc_number: record.counterparty_doc_number.clone(),
        counterparty_name: record.counterparty_name.clone(),
        exchange_rate: record.exchange_rate,
        currency_code: record.currency_code.clone(),
        net_by_rate: record
            .rate_buckets()
            .into_iter()
            .map(|(rate, amount)| (rates.key(rate), amount))
            .collect(),
        non_taxed_amount: record.non_taxed_amount,
        exempt_amount: record.exempt_amount,
        other_taxes_amount: record.other_taxes_amount,
        net_total: record.net_total,
        tax_total: record.tax_total,
        grand_total: record.grand_total,
        perception_other_national_amount: record.perception_other_national.amount,
        perception_other_national_type: record.perception_other_national.type_tag.clone(),
        perception_gross_revenue_amount: record.perception_gross_revenue.amount,
        perception_gross_revenue_allocations: record.perception_gross_revenue.allocations.clone(),
        perceptions: flatten_perceptions(record),
        other_taxes_allocations: record.other_taxes_allocations.clone(),
    }
}

/// Пакет из строк `rows` (валидных) в порядке их следования.
pub fn build_payload(
    records: &[FiscalRecord],
    rows: &[usize],
    config: &ImportConfig,
    rates: &RateTable,
) -> Payload {
    Payload {
        company: config.company.clone(),
        due_date_offset_days: config.due_date_offset_days,
        documents: rows
            .iter()
            .filter_map(|&i| records.get(i))
            .map(|r| build_document(r, rates))
            .collect(),
    }
}

/// Ответ точки сохранения по одному документу; `index` — позиция в `documents`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentResult {
    pub index: usize,
    pub accepted: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    /// Например, расхождение итогов документа.
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionResponse {
    pub documents: Vec<DocumentResult>,
}

impl SubmissionResponse {
    /// Все документы приняты.
    pub fn accept_all(count: usize) -> Self {
        Self {
            documents: (0..count)
                .map(|index| DocumentResult {
                    index,
                    accepted: true,
                    errors: Vec::new(),
                    warnings: Vec::new(),
                })
                .collect(),
        }
    }
}
