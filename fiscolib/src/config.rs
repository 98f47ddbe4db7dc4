//! Конфигурация импорта: внешние справочники (ставки, типы документов,
//! юрисдикции), допуски и реквизиты отправки. Загружается из TOML.

use crate::{
    error::Result,
    rates::{candidate_rates, Rate, RateTable},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path};

/// Буква класса документов упрощённого режима (монотрибутисты).
pub const SIMPLIFIED_REGIME_LETTER: &str = "C";

/// Направление документов: покупки требуют идентификатор контрагента.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFlow {
    #[default]
    Purchase,
    Sales,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Tolerances {
    /// Допуск вывода ставки, в процентных пунктах.
    pub rate_inference_points: Decimal,
    /// Допуск сверки сумм распределений, в единицах валюты.
    pub sum_epsilon: Decimal,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            rate_inference_points: Decimal::new(3, 1),
            sum_epsilon: Decimal::new(1, 2),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DocumentTypeInfo {
    pub category: String,
    pub letter: String,
    pub description: String,
}

impl DocumentTypeInfo {
    fn new(category: &str, letter: &str, description: &str) -> Self {
        Self {
            category: category.to_string(),
            letter: letter.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub company: String,
    pub due_date_offset_days: u32,
    pub flow: DocumentFlow,
    /// Действующие ставки НДС.
    pub rates: Vec<Rate>,
    pub tolerances: Tolerances,
    /// Код типа документа -> метаданные. Ключи сравниваются как числа ("001" == "1").
    pub document_types: BTreeMap<String, DocumentTypeInfo>,
    /// Код юрисдикции -> название.
    pub jurisdictions: BTreeMap<String, String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            company: String::new(),
            due_date_offset_days: 30,
            flow: DocumentFlow::Purchase,
            rates: candidate_rates().to_vec(),
            tolerances: Tolerances::default(),
            document_types: default_document_types(),
            jurisdictions: default_jurisdictions(),
        }
    }
}

impl ImportConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_rates(mut self, rates: &[Decimal]) -> Self {
        self.rates = rates.iter().copied().map(Rate::new).collect();
        self
    }

    pub fn with_flow(mut self, flow: DocumentFlow) -> Self {
        self.flow = flow;
        self
    }

    pub fn rate_table(&self) -> RateTable {
        RateTable::new(&self.rates)
    }

    pub fn document_type(&self, code: u64) -> Option<&DocumentTypeInfo> {
        self.document_types
            .iter()
            .find(|(key, _)| key.trim().parse::<u64>().ok() == Some(code))
            .map(|(_, info)| info)
    }

    pub fn is_simplified_regime(&self, code: u64) -> bool {
        self.document_type(code)
            .is_some_and(|info| info.letter.trim().eq_ignore_ascii_case(SIMPLIFIED_REGIME_LETTER))
    }

    pub fn jurisdiction_name(&self, code: &str) -> Option<&str> {
        self.jurisdictions.get(code.trim()).map(String::as_str)
    }
}

fn default_document_types() -> BTreeMap<String, DocumentTypeInfo> {
    [
        ("1", "factura", "A", "Factura A"),
        ("2", "nota_debito", "A", "Nota de Débito A"),
        ("3", "nota_credito", "A", "Nota de Crédito A"),
        ("6", "factura", "B", "Factura B"),
        ("7", "nota_debito", "B", "Nota de Débito B"),
        ("8", "nota_credito", "B", "Nota de Crédito B"),
        ("11", "factura", "C", "Factura C"),
        ("12", "nota_debito", "C", "Nota de Débito C"),
        ("13", "nota_credito", "C", "Nota de Crédito C"),
        ("51", "factura", "M", "Factura M"),
        ("52", "nota_debito", "M", "Nota de Débito M"),
        ("53", "nota_credito", "M", "Nota de Crédito M"),
        ("81", "tique", "A", "Tique Factura A"),
        ("82", "tique", "B", "Tique Factura B"),
        ("111", "tique", "C", "Tique Factura C"),
        ("201", "factura", "A", "Factura de Crédito Electrónica MiPyMEs A"),
        ("206", "factura", "B", "Factura de Crédito Electrónica MiPyMEs B"),
        ("211", "factura", "C", "Factura de Crédito Electrónica MiPyMEs C"),
    ]
    .into_iter()
    .map(|(code, category, letter, description)| {
        (code.to_string(), DocumentTypeInfo::new(category, letter, description))
    })
    .collect()
}

fn default_jurisdictions() -> BTreeMap<String, String> {
    [
        ("AR-A", "Salta"),
        ("AR-B", "Buenos Aires"),
        ("AR-C", "Ciudad Autónoma de Buenos Aires"),
        ("AR-D", "San Luis"),
        ("AR-E", "Entre Ríos"),
        ("AR-F", "La Rioja"),
        ("AR-G", "Santiago del Estero"),
        ("AR-H", "Chaco"),
        ("AR-J", "San Juan"),
        ("AR-K", "Catamarca"),
        ("AR-L", "La Pampa"),
        ("AR-M", "Mendoza"),
        ("AR-N", "Misiones"),
        ("AR-P", "Formosa"),
        ("AR-Q", "Neuquén"),
        ("AR-R", "Río Negro"),
        ("AR-S", "Santa Fe"),
        ("AR-T", "Tucumán"),
        ("AR-U", "Chubut"),
        ("AR-V", "Tierra del Fuego"),
        ("AR-W", "Corrientes"),
        ("AR-X", "Córdoba"),
        ("AR-Y", "Jujuy"),
        ("AR-Z", "Santa Cruz"),
    ]
    .into_iter()
    .map(|(code, name)| (code.to_string(), name.to_string()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_overrides_defaults() {
        let cfg = ImportConfig::from_toml(
            r#"
company = "ACME SA"
flow = "sales"
rates = ["0", "21"]

[tolerances]
sum_epsilon = "0.05"

[document_types.001]
category = "factura"
letter = "A"
description = "Factura A"
"#,
        )
        .expect("parse config");

        assert_eq!(cfg.company, "ACME SA");
        assert_eq!(cfg.flow, DocumentFlow::Sales);
        assert_eq!(cfg.rates.len(), 2);
        assert_eq!(cfg.tolerances.sum_epsilon, Decimal::new(5, 2));
        assert_eq!(cfg.tolerances.rate_inference_points, Decimal::new(3, 1));
        assert_eq!(cfg.document_type(1).map(|d| d.letter.as_str()), Some("A"));
        assert!(cfg.document_type(11).is_none());
        // таблица юрисдикций не задана -> встроенная
        assert_eq!(cfg.jurisdiction_name("AR-S"), Some("Santa Fe"));
    }

    #[test]
    fn letter_c_is_simplified() {
        let cfg = ImportConfig::default();
        assert!(cfg.is_simplified_regime(11));
        assert!(!cfg.is_simplified_regime(1));
        assert!(!cfg.is_simplified_regime(999));
    }
}
