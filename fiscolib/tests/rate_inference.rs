use fiscolib::{
    config::ImportConfig,
    model::{FiscalRecord, GrossRevenuePerception},
    preview::{preview, EXEMPT_LABEL, OTHER_TAXES_LABEL},
    rates::{infer_rate, resolve, Rate, RateResolution},
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn tolerance() -> Decimal {
    ImportConfig::default().tolerances.rate_inference_points
}

#[test]
fn nearest_match_within_tolerance() {
    assert_eq!(infer_rate(dec("1000"), dec("210"), tolerance()), Some(Rate::new(dec("21"))));
    assert_eq!(infer_rate(dec("1000"), dec("213"), tolerance()), Some(Rate::new(dec("21"))));
    assert_eq!(infer_rate(dec("1000"), dec("105"), tolerance()), Some(Rate::new(dec("10.5"))));
    assert_eq!(infer_rate(dec("1000"), dec("0"), tolerance()), Some(Rate::zero()));
    // 23% отстоит от 21 и 27 на 2 и 4 пункта
    assert_eq!(infer_rate(dec("1000"), dec("230"), tolerance()), None);
    assert_eq!(infer_rate(dec("0"), dec("10"), tolerance()), None);
}

#[test]
fn tolerance_is_configurable() {
    let mut config = ImportConfig::default();
    config.tolerances.rate_inference_points = dec("0.2");

    let mut record = FiscalRecord {
        document_type_code: Some(1),
        net_total: Some(dec("1000")),
        tax_total: Some(dec("213")),
        ..FiscalRecord::default()
    };
    assert_eq!(resolve(&mut record, &config), RateResolution::Undeterminable);
    assert!(record.rate_buckets().is_empty());
}

#[test]
fn explicit_breakdown_is_never_touched() {
    let config = ImportConfig::default();
    let breakdown = BTreeMap::from([
        (Rate::new(dec("10.5")), dec("100")),
        (Rate::new(dec("21")), dec("900")),
    ]);
    let mut record = FiscalRecord {
        document_type_code: Some(11),
        net_by_rate: breakdown.clone(),
        net_total: Some(dec("1000")),
        tax_total: Some(dec("999")),
        ..FiscalRecord::default()
    };

    for _ in 0..2 {
        assert_eq!(resolve(&mut record, &config), RateResolution::Explicit);
        assert_eq!(record.net_by_rate, breakdown);
        assert_eq!(record.tax_total, Some(dec("999")));
        assert_eq!(record.rate_buckets(), breakdown);
    }
}

#[test]
fn inferred_rate_takes_whole_net() {
    let mut record = FiscalRecord {
        document_type_code: Some(1),
        net_total: Some(dec("1000")),
        tax_total: Some(dec("210")),
        ..FiscalRecord::default()
    };
    resolve(&mut record, &ImportConfig::default());
    assert!(record.net_by_rate.is_empty());
    assert_eq!(
        record.rate_buckets(),
        BTreeMap::from([(Rate::new(dec("21")), dec("1000"))])
    );
}

#[test]
fn simplified_regime_goes_to_zero_rate() {
    let config = ImportConfig::default();
    let mut record = FiscalRecord {
        document_type_code: Some(11),
        grand_total: Some(dec("1210")),
        ..FiscalRecord::default()
    };

    assert_eq!(resolve(&mut record, &config), RateResolution::SimplifiedRegime);
    assert_eq!(record.tax_total, Some(Decimal::ZERO));
    assert_eq!(record.rate_buckets(), BTreeMap::from([(Rate::zero(), dec("1210"))]));
}

#[test]
fn simplified_regime_excludes_separately_reported_amounts() {
    let config = ImportConfig::default();
    let mut record = FiscalRecord {
        document_type_code: Some(11),
        grand_total: Some(dec("1260")),
        exempt_amount: Some(dec("20")),
        other_taxes_amount: Some(dec("10")),
        perception_gross_revenue: GrossRevenuePerception {
            amount: Some(dec("30")),
            allocations: vec![],
        },
        ..FiscalRecord::default()
    };
    assert_eq!(resolve(&mut record, &config), RateResolution::SimplifiedRegime);
    assert_eq!(record.rate_buckets(), BTreeMap::from([(Rate::zero(), dec("1200"))]));

    // итоги не считают прочие налоги дважды
    let totals = preview(std::slice::from_ref(&record), &config.rate_table());
    assert_eq!(totals.get(EXEMPT_LABEL), Some(dec("1220")));
    assert_eq!(totals.get(OTHER_TAXES_LABEL), Some(dec("10")));
    assert_eq!(totals.grand_total(), dec("1230"));
}

#[test]
fn simplified_regime_needs_missing_tax() {
    let config = ImportConfig::default();
    let mut record = FiscalRecord {
        document_type_code: Some(11),
        net_total: Some(dec("1000")),
        tax_total: Some(dec("210")),
        ..FiscalRecord::default()
    };
    assert_eq!(
        resolve(&mut record, &config),
        RateResolution::Inferred(Rate::new(dec("21")))
    );

    // класс B не упрощённый режим: без налога выводится 0%
    let mut record = FiscalRecord {
        document_type_code: Some(6),
        grand_total: Some(dec("500")),
        net_total: Some(dec("500")),
        ..FiscalRecord::default()
    };
    assert_eq!(resolve(&mut record, &config), RateResolution::Inferred(Rate::zero()));
    assert_eq!(record.tax_total, None);
}
