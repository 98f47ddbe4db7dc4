//! Доменные модели — канонический слой между форматами файлов и отправкой.

use crate::rates::{Rate, RateResolution};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Тип значения, к которому приводится ячейка.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Decimal,
    IntegerCode,
    Date,
    Text,
    DocType,
}

/// Каноническое поле записи.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    EmissionDate,
    DocumentTypeCode,
    PosNumber,
    NumberFrom,
    NumberTo,
    AuthorizationCode,
    CounterpartyDocType,
    CounterpartyDocNumber,
    CounterpartyName,
    ExchangeRate,
    CurrencyCode,
    NetAtRate(Rate),
    NonTaxedAmount,
    ExemptAmount,
    OtherTaxesAmount,
    NetTotal,
    TaxTotal,
    GrandTotal,
    PerceptionOtherNationalAmount,
    PerceptionOtherNationalType,
    PerceptionGrossRevenueAmount,
}

impl FieldKey {
    /// Все поля, кроме сетки по ставкам.
    pub const SCALARS: [FieldKey; 20] = [
        FieldKey::EmissionDate,
        FieldKey::DocumentTypeCode,
        FieldKey::PosNumber,
        FieldKey::NumberFrom,
        FieldKey::NumberTo,
        FieldKey::AuthorizationCode,
        FieldKey::CounterpartyDocType,
        FieldKey::CounterpartyDocNumber,
        FieldKey::CounterpartyName,
        FieldKey::ExchangeRate,
        FieldKey::CurrencyCode,
        FieldKey::NonTaxedAmount,
        FieldKey::ExemptAmount,
        FieldKey::OtherTaxesAmount,
        FieldKey::NetTotal,
        FieldKey::TaxTotal,
        FieldKey::GrandTotal,
        FieldKey::PerceptionOtherNationalAmount,
        FieldKey::PerceptionOtherNationalType,
        FieldKey::PerceptionGrossRevenueAmount,
    ];

    pub fn kind(&self) -> FieldKind {
        match self {
            FieldKey::EmissionDate => FieldKind::Date,
            FieldKey::DocumentTypeCode
            | FieldKey::PosNumber
            | FieldKey::NumberFrom
            | FieldKey::NumberTo => FieldKind::IntegerCode,
            FieldKey::CounterpartyDocType => FieldKind::DocType,
            FieldKey::AuthorizationCode
            | FieldKey::CounterpartyDocNumber
            | FieldKey::CounterpartyName
            | FieldKey::CurrencyCode
            | FieldKey::PerceptionOtherNationalType => FieldKind::Text,
            FieldKey::ExchangeRate
            | FieldKey::NetAtRate(_)
            | FieldKey::NonTaxedAmount
            | FieldKey::ExemptAmount
            | FieldKey::OtherTaxesAmount
            | FieldKey::NetTotal
            | FieldKey::TaxTotal
            | FieldKey::GrandTotal
            | FieldKey::PerceptionOtherNationalAmount
            | FieldKey::PerceptionGrossRevenueAmount => FieldKind::Decimal,
        }
    }

    /// Стабильное каноническое имя (`net_total`, `net_10_5`, ...).
    pub fn canonical_name(&self) -> String {
        let name = match self {
            FieldKey::EmissionDate => "emission_date",
            FieldKey::DocumentTypeCode => "document_type_code",
            FieldKey::PosNumber => "pos_number",
            FieldKey::NumberFrom => "number_from",
            FieldKey::NumberTo => "number_to",
            FieldKey::AuthorizationCode => "authorization_code",
            FieldKey::CounterpartyDocType => "counterparty_doc_type",
            FieldKey::CounterpartyDocNumber => "counterparty_doc_number",
            FieldKey::CounterpartyName => "counterparty_name",
            FieldKey::ExchangeRate => "exchange_rate",
            FieldKey::CurrencyCode => "currency_code",
            FieldKey::NetAtRate(rate) => return rate.bucket_key(),
            FieldKey::NonTaxedAmount => "non_taxed_amount",
            FieldKey::ExemptAmount => "exempt_amount",
            FieldKey::OtherTaxesAmount => "other_taxes_amount",
            FieldKey::NetTotal => "net_total",
            FieldKey::TaxTotal => "tax_total",
            FieldKey::GrandTotal => "grand_total",
            FieldKey::PerceptionOtherNationalAmount => "perception_other_national_amount",
            FieldKey::PerceptionOtherNationalType => "perception_other_national_type",
            FieldKey::PerceptionGrossRevenueAmount => "perception_gross_revenue_amount",
        };
        name.to_string()
    }

    pub fn from_canonical(name: &str) -> Option<FieldKey> {
        if let Some(rate) = Rate::from_bucket_key(name) {
            return Some(FieldKey::NetAtRate(rate));
        }
        FieldKey::SCALARS
            .iter()
            .copied()
            .find(|k| k.canonical_name() == name)
    }
}

/// Приведённое значение ячейки. `Empty` — пустой «нетипизированный» сентинел.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Decimal(Decimal),
    Code(u64),
    Text(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    fn decimal(self) -> Option<Decimal> {
        match self {
            CellValue::Decimal(d) => Some(d),
            _ => None,
        }
    }

    fn code(self) -> Option<u64> {
        match self {
            CellValue::Code(c) => Some(c),
            _ => None,
        }
    }

    fn text(self) -> Option<String> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Option<Decimal>> for CellValue {
    fn from(v: Option<Decimal>) -> Self {
        v.map_or(CellValue::Empty, CellValue::Decimal)
    }
}

impl From<Option<u64>> for CellValue {
    fn from(v: Option<u64>) -> Self {
        v.map_or(CellValue::Empty, CellValue::Code)
    }
}

impl From<Option<String>> for CellValue {
    fn from(v: Option<String>) -> Self {
        v.map_or(CellValue::Empty, CellValue::Text)
    }
}

/// Классификация строки распределения.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaxClass {
    /// Ещё не классифицировано пользователем.
    #[default]
    Unassigned,
    NoOp,
    GrossRevenue,
    Vat,
    Income,
}

impl TaxClass {
    /// Тег для исходящего массива `perceptions`; `None` для неотправляемых строк.
    pub fn perception_tag(&self) -> Option<&'static str> {
        match self {
            TaxClass::GrossRevenue => Some("IIBB"),
            TaxClass::Vat => Some("IVA"),
            TaxClass::Income => Some("GANANCIAS"),
            TaxClass::Unassigned | TaxClass::NoOp => None,
        }
    }
}

/// Часть агрегатной суммы перцепции / прочих налогов.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Allocation {
    pub classification: TaxClass,
    pub jurisdiction: Option<String>,
    pub amount: Decimal,
}

impl Allocation {
    pub fn new(classification: TaxClass, jurisdiction: Option<&str>, amount: Decimal) -> Self {
        Self {
            classification,
            jurisdiction: jurisdiction.map(str::to_string),
            amount,
        }
    }

    pub fn jurisdiction(&self) -> Option<&str> {
        self.jurisdiction
            .as_deref()
            .map(str::trim)
            .filter(|j| !j.is_empty())
    }
}

/// Перцепция «прочего национального налога»: одна сумма, один тег типа.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NationalPerception {
    pub amount: Option<Decimal>,
    pub type_tag: Option<String>,
}

/// Разрешённые теги национальной перцепции.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NationalPerceptionKind {
    Iva,
    Ganancias,
}

impl NationalPerceptionKind {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "IVA" => Some(NationalPerceptionKind::Iva),
            "GANANCIAS" => Some(NationalPerceptionKind::Ganancias),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            NationalPerceptionKind::Iva => "IVA",
            NationalPerceptionKind::Ganancias => "GANANCIAS",
        }
    }

    pub fn class(&self) -> TaxClass {
        match self {
            NationalPerceptionKind::Iva => TaxClass::Vat,
            NationalPerceptionKind::Ganancias => TaxClass::Income,
        }
    }
}

/// Перцепция налога на валовый доход, делимая по юрисдикциям.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GrossRevenuePerception {
    pub amount: Option<Decimal>,
    pub allocations: Vec<Allocation>,
}

/// Две колонки файла дали полю разные значения; сохранено первое.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnConflict {
    pub field: FieldKey,
    pub kept: String,
    pub dropped: String,
}

/// Нормализованный фискальный документ (одна строка импорта).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FiscalRecord {
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
    pub net_by_rate: BTreeMap<Rate, Decimal>,
    pub non_taxed_amount: Option<Decimal>,
    pub exempt_amount: Option<Decimal>,
    pub other_taxes_amount: Option<Decimal>,
    pub net_total: Option<Decimal>,
    pub tax_total: Option<Decimal>,
    pub grand_total: Option<Decimal>,
    pub perception_other_national: NationalPerception,
    pub perception_gross_revenue: GrossRevenuePerception,
    pub other_taxes_allocations: Vec<Allocation>,
    pub rate_resolution: RateResolution,
    /// Нераспознанные колонки: slug заголовка -> сырое значение.
    pub extras: BTreeMap<String, String>,
    /// Снимаются правкой соответствующего поля.
    pub conflicts: Vec<ColumnConflict>,
}

impl FiscalRecord {
    pub fn get(&self, key: FieldKey) -> CellValue {
        match key {
            FieldKey::EmissionDate => self.emission_date.clone().into(),
            FieldKey::DocumentTypeCode => self.document_type_code.into(),
            FieldKey::PosNumber => self.pos_number.into(),
            FieldKey::NumberFrom => self.number_from.into(),
            FieldKey::NumberTo => self.number_to.into(),
            FieldKey::AuthorizationCode => self.authorization_code.clone().into(),
            FieldKey::CounterpartyDocType => self.counterparty_doc_type.clone().into(),
            FieldKey::CounterpartyDocNumber => self.counterparty_doc_number.clone().into(),
            FieldKey::CounterpartyName => self.counterparty_name.clone().into(),
            FieldKey::ExchangeRate => self.exchange_rate.into(),
            FieldKey::CurrencyCode => self.currency_code.clone().into(),
            FieldKey::NetAtRate(rate) => self.net_by_rate.get(&rate).copied().into(),
            FieldKey::NonTaxedAmount => self.non_taxed_amount.into(),
            FieldKey::ExemptAmount => self.exempt_amount.into(),
            FieldKey::OtherTaxesAmount => self.other_taxes_amount.into(),
            FieldKey::NetTotal => self.net_total.into(),
            FieldKey::TaxTotal => self.tax_total.into(),
            FieldKey::GrandTotal => self.grand_total.into(),
            FieldKey::PerceptionOtherNationalAmount => self.perception_other_national.amount.into(),
            FieldKey::PerceptionOtherNationalType => {
                self.perception_other_national.type_tag.clone().into()
            }
            FieldKey::PerceptionGrossRevenueAmount => self.perception_gross_revenue.amount.into(),
        }
    }

    /// Записывает значение; несовпадающий по типу вариант трактуется как пустой.
    pub fn set(&mut self, key: FieldKey, value: CellValue) {
        match key {
            FieldKey::EmissionDate => self.emission_date = value.text(),
            FieldKey::DocumentTypeCode => self.document_type_code = value.code(),
            FieldKey::PosNumber => self.pos_number = value.code(),
            FieldKey::NumberFrom => self.number_from = value.code(),
            FieldKey::NumberTo => self.number_to = value.code(),
            FieldKey::AuthorizationCode => self.authorization_code = value.text(),
            FieldKey::CounterpartyDocType => self.counterparty_doc_type = value.text(),
            FieldKey::CounterpartyDocNumber => self.counterparty_doc_number = value.text(),
            FieldKey::CounterpartyName => self.counterparty_name = value.text(),
            FieldKey::ExchangeRate => self.exchange_rate = value.decimal(),
            FieldKey::CurrencyCode => self.currency_code = value.text(),
            FieldKey::NetAtRate(rate) => match value.decimal() {
                Some(amount) => {
                    self.net_by_rate.insert(rate, amount);
                }
                None => {
                    self.net_by_rate.remove(&rate);
                }
            },
            FieldKey::NonTaxedAmount => self.non_taxed_amount = value.decimal(),
            FieldKey::ExemptAmount => self.exempt_amount = value.decimal(),
            FieldKey::OtherTaxesAmount => self.other_taxes_amount = value.decimal(),
            FieldKey::NetTotal => self.net_total = value.decimal(),
            FieldKey::TaxTotal => self.tax_total = value.decimal(),
            FieldKey::GrandTotal => self.grand_total = value.decimal(),
            FieldKey::PerceptionOtherNationalAmount => {
                self.perception_other_national.amount = value.decimal()
            }
            FieldKey::PerceptionOtherNationalType => {
                self.perception_other_national.type_tag = value.text()
            }
            FieldKey::PerceptionGrossRevenueAmount => {
                self.perception_gross_revenue.amount = value.decimal()
            }
        }
    }

    /// Есть ли явная разбивка нетто по ставкам.
    pub fn has_explicit_breakdown(&self) -> bool {
        !self.net_by_rate.is_empty()
    }

    /// Нетто по ставкам с учётом результата вывода ставки.
    pub fn rate_buckets(&self) -> BTreeMap<Rate, Decimal> {
        match self.rate_resolution {
            RateResolution::Explicit => self.net_by_rate.clone(),
            RateResolution::Inferred(rate) => {
                BTreeMap::from([(rate, self.net_total.unwrap_or_default())])
            }
            RateResolution::SimplifiedRegime => {
                BTreeMap::from([(Rate::zero(), self.simplified_regime_base())])
            }
            RateResolution::Unresolved | RateResolution::Undeterminable => BTreeMap::new(),
        }
    }

    /// Итог за вычетом сумм, которые в итогах учитываются отдельно
    /// (необлагаемое, освобождённое, прочие налоги, перцепции).
    fn simplified_regime_base(&self) -> Decimal {
        match self.grand_total {
            Some(total) => [
                self.non_taxed_amount,
                self.exempt_amount,
                self.other_taxes_amount,
                self.perception_other_national.amount,
                self.perception_gross_revenue.amount,
            ]
            .into_iter()
            .flatten()
            .fold(total, Decimal::saturating_sub)
            .max(Decimal::ZERO),
            None => self.net_total.unwrap_or_default(),
        }
    }

    pub fn clear_conflicts(&mut self, field: FieldKey) {
        self.conflicts.retain(|c| c.field != field);
    }
}
