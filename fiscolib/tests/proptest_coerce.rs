use fiscolib::{
    coerce::{format_decimal, parse_decimal},
    config::ImportConfig,
    model::FiscalRecord,
    pipeline::prepare,
    preview::preview,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn amount() -> impl Strategy<Value = Decimal> {
    (-10_000_000_000i64..10_000_000_000i64, 0u32..=4).prop_map(|(m, scale)| Decimal::new(m, scale))
}

fn cents() -> impl Strategy<Value = Option<Decimal>> {
    prop::option::of((0i64..10_000).prop_map(|c| Decimal::new(c, 2)))
}

fn record() -> impl Strategy<Value = FiscalRecord> {
    (
        prop::sample::select(vec![1u64, 6, 11]),
        0i64..1_000_000,
        prop::sample::select(vec![0i64, 25, 50, 105, 210, 270]),
        (cents(), cents(), cents()),
        prop::option::of(0i64..2_000_000),
    )
        .prop_map(|(doc_type, net_cents, per_mille, (non_taxed, exempt, other), grand)| {
            let net = Decimal::new(net_cents, 2);
            let mut record = FiscalRecord {
                document_type_code: Some(doc_type),
                net_total: Some(net),
                tax_total: Some((net * Decimal::new(per_mille, 3)).round_dp(2)),
                grand_total: grand.map(|c| Decimal::new(c, 2)),
                non_taxed_amount: non_taxed,
                exempt_amount: exempt,
                other_taxes_amount: other,
                ..FiscalRecord::default()
            };
            prepare(&mut record, &ImportConfig::default());
            record
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn locale_format_parses_back(value in amount()) {
        prop_assert_eq!(parse_decimal(&format_decimal(value)), Some(value));
    }

    #[test]
    fn preview_is_additive(a in prop::collection::vec(record(), 0..8), b in prop::collection::vec(record(), 0..8)) {
        let rates = ImportConfig::default().rate_table();
        let joined: Vec<FiscalRecord> = a.iter().chain(&b).cloned().collect();

        let whole = preview(&joined, &rates);
        let left = preview(&a, &rates);
        let right = preview(&b, &rates);

        prop_assert_eq!(whole.grand_total(), left.grand_total() + right.grand_total());
        for (label, total) in whole.iter() {
            let parts = left.get(label).unwrap_or_default() + right.get(label).unwrap_or_default();
            prop_assert_eq!(total, parts, "label {}", label);
        }
    }

    #[test]
    fn preview_matches_row_amounts(records in prop::collection::vec(record(), 0..12)) {
        let rates = ImportConfig::default().rate_table();
        let expected: Decimal = records
            .iter()
            .map(|r| {
                let buckets: Decimal = r.rate_buckets().values().copied().sum();
                buckets
                    + r.non_taxed_amount.unwrap_or_default()
                    + r.exempt_amount.unwrap_or_default()
                    + r.other_taxes_amount.unwrap_or_default()
            })
            .sum();

        prop_assert_eq!(preview(&records, &rates).grand_total(), expected);
    }
}
