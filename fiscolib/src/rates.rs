//! Ставки НДС: таблица «ставка ↔ ключ колонки ↔ подпись» и вывод ставки
//! по соотношению налог / нетто, когда разбивки по ставкам в файле нет.

use crate::{config::ImportConfig, model::FiscalRecord};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

const BUCKET_PREFIX: &str = "net_";

/// Ставка в процентных пунктах (21 означает 21%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rate(Decimal);

impl Rate {
    pub fn new(percent: Decimal) -> Self {
        Rate(percent.normalize())
    }

    pub fn zero() -> Self {
        Rate(Decimal::ZERO)
    }

    pub fn percent(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `net_21`, `net_10_5`, `net_0`.
    pub fn bucket_key(&self) -> String {
        format!("{BUCKET_PREFIX}{}", self.0.normalize().to_string().replace('.', "_"))
    }

    pub fn from_bucket_key(key: &str) -> Option<Rate> {
        let digits = key.strip_prefix(BUCKET_PREFIX)?.replace('_', ".");
        let percent = Decimal::from_str(&digits).ok()?;
        (!percent.is_sign_negative()).then(|| Rate::new(percent))
    }

    pub fn label(&self) -> String {
        format!("{}%", self.0.normalize())
    }
}

/// Фиксированный набор ставок-кандидатов для вывода.
pub fn candidate_rates() -> [Rate; 6] {
    [
        Rate::new(Decimal::ZERO),
        Rate::new(Decimal::new(25, 1)),
        Rate::new(Decimal::new(5, 0)),
        Rate::new(Decimal::new(105, 1)),
        Rate::new(Decimal::new(21, 0)),
        Rate::new(Decimal::new(27, 0)),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateBucket {
    pub rate: Rate,
    pub key: String,
    pub label: String,
    /// Ставка присутствует во внешней конфигурации действующих ставок.
    pub configured: bool,
}

/// Единая двунаправленная таблица корзин, строится один раз из конфигурации.
/// Кандидаты включаются всегда, чтобы неразрешённые ставки из файла
/// распознавались и помечались валидатором.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    buckets: Vec<RateBucket>,
}

impl RateTable {
    pub fn new(configured: &[Rate]) -> Self {
        let mut rates: Vec<Rate> = candidate_rates().to_vec();
        rates.extend(configured.iter().copied());
        rates.sort();
        rates.dedup();

        let buckets = rates
            .into_iter()
            .map(|rate| RateBucket {
                rate,
                key: rate.bucket_key(),
                label: rate.label(),
                configured: configured.contains(&rate),
            })
            .collect();
        Self { buckets }
    }

    pub fn buckets(&self) -> &[RateBucket] {
        &self.buckets
    }

    pub fn by_rate(&self, rate: Rate) -> Option<&RateBucket> {
        self.buckets.iter().find(|b| b.rate == rate)
    }

    pub fn by_key(&self, key: &str) -> Option<&RateBucket> {
        self.buckets.iter().find(|b| b.key == key)
    }

    pub fn is_configured(&self, rate: Rate) -> bool {
        self.by_rate(rate).is_some_and(|b| b.configured)
    }

    pub fn label(&self, rate: Rate) -> String {
        self.by_rate(rate)
            .map(|b| b.label.clone())
            .unwrap_or_else(|| rate.label())
    }

    pub fn key(&self, rate: Rate) -> String {
        self.by_rate(rate)
            .map(|b| b.key.clone())
            .unwrap_or_else(|| rate.bucket_key())
    }
}

/// Как для записи получена разбивка нетто по ставкам.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateResolution {
    /// Вывод ещё не выполнялся.
    #[default]
    Unresolved,
    /// В файле есть колонки нетто по ставкам.
    Explicit,
    Inferred(Rate),
    /// Упрощённый режим: весь итог в нулевую ставку, налог обнулён.
    SimplifiedRegime,
    Undeterminable,
}

/// Ближайшая ставка-кандидат к `tax / net * 100`, если отклонение в пределах допуска.
pub fn infer_rate(net: Decimal, tax: Decimal, tolerance: Decimal) -> Option<Rate> {
    if net.is_zero() {
        return None;
    }
    let implied = tax.checked_div(net)?.checked_mul(Decimal::ONE_HUNDRED)?;

    candidate_rates()
        .into_iter()
        .map(|rate| (rate, (implied - rate.percent()).abs()))
        .min_by(|a, b| a.1.cmp(&b.1))
        .filter(|(_, diff)| *diff <= tolerance)
        .map(|(rate, _)| rate)
}

/// Определяет разбивку по ставкам для записи и сохраняет результат в ней.
/// Явная разбивка никогда не изменяется.
pub fn resolve(record: &mut FiscalRecord, config: &ImportConfig) -> RateResolution {
    let resolution = if record.has_explicit_breakdown() {
        RateResolution::Explicit
    } else if qualifies_for_simplified_regime(record, config) {
        record.tax_total = Some(Decimal::ZERO);
        RateResolution::SimplifiedRegime
    } else {
        match record.net_total.filter(|n| !n.is_zero()) {
            Some(net) => {
                let tax = record.tax_total.unwrap_or_default();
                match infer_rate(net, tax, config.tolerances.rate_inference_points) {
                    Some(rate) => RateResolution::Inferred(rate),
                    None => {
                        debug!(%net, %tax, "rate undeterminable");
                        RateResolution::Undeterminable
                    }
                }
            }
            None => RateResolution::Undeterminable,
        }
    };
    record.rate_resolution = resolution;
    resolution
}

fn qualifies_for_simplified_regime(record: &FiscalRecord, config: &ImportConfig) -> bool {
    let simplified = record
        .document_type_code
        .is_some_and(|code| config.is_simplified_regime(code));
    let no_tax = record.tax_total.map_or(true, |t| t.is_zero());
    let has_total = record.grand_total.or(record.net_total).is_some();
    simplified && no_tax && has_total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn bucket_keys_roundtrip() {
        let r = Rate::new(dec("10.50"));
        assert_eq!(r.bucket_key(), "net_10_5");
        assert_eq!(r.label(), "10.5%");
        assert_eq!(Rate::from_bucket_key("net_10_5"), Some(r));
        assert_eq!(Rate::from_bucket_key("net_total"), None);
        assert_eq!(Rate::zero().bucket_key(), "net_0");
    }

    #[test]
    fn nearest_candidate_wins_ties_low() {
        // 7.75 одинаково далеко от 5 и 10.5, берётся меньшая
        assert_eq!(infer_rate(dec("100"), dec("7.75"), dec("3")), Some(Rate::new(dec("5"))));
    }

    #[test]
    fn table_marks_configured() {
        let t = RateTable::new(&[Rate::zero(), Rate::new(dec("21"))]);
        assert!(t.is_configured(Rate::new(dec("21.0"))));
        assert!(!t.is_configured(Rate::new(dec("10.5"))));
        assert_eq!(t.by_key("net_27").map(|b| b.label.as_str()), Some("27%"));
    }
}
