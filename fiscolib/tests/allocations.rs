use fiscolib::{
    batch::ImportBatch,
    config::ImportConfig,
    ingest::SourceFormat,
    model::{Allocation, FieldKey, TaxClass},
    payload::flatten_perceptions,
    validate::IssueKind,
};
use rust_decimal::Decimal;
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

const HEADER: &str = "document_type_code;pos_number;counterparty_doc_number;net_total;tax_total;perception_gross_revenue_amount;other_taxes_amount;perception_other_national_amount;perception_other_national_type";

fn batch_with(rows: &[&str]) -> ImportBatch {
    let mut csv = String::from(HEADER);
    for row in rows {
        csv.push('\n');
        csv.push_str(row);
    }
    let mut batch = ImportBatch::new(ImportConfig::default());
    let report = batch
        .load_bytes("test.csv", csv.as_bytes(), SourceFormat::Delimited)
        .expect("load");
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    batch
}

fn kinds(batch: &ImportBatch, row: usize) -> Vec<IssueKind> {
    batch.view().issues_for(row).map(|i| i.kind).collect()
}

fn iibb(code: &str, amount: &str) -> Allocation {
    Allocation::new(TaxClass::GrossRevenue, Some(code), dec(amount))
}

#[test]
fn gross_revenue_split_must_sum() {
    let mut batch = batch_with(&["1;3;20111111112;1.000,00;210,00;1.500,00;;;"]);

    // по умолчанию одна строка без юрисдикции
    let record = batch.record(0).unwrap();
    assert_eq!(record.perception_gross_revenue.allocations, vec![Allocation::new(
        TaxClass::GrossRevenue,
        None,
        dec("1500")
    )]);
    assert_eq!(kinds(&batch, 0), vec![IssueKind::MissingJurisdiction]);

    batch
        .set_gross_revenue_allocations(0, vec![iibb("AR-B", "1000"), iibb("AR-C", "500")])
        .unwrap();
    assert!(kinds(&batch, 0).is_empty());
    assert_eq!(batch.view().valid_rows, vec![0]);

    batch
        .set_gross_revenue_allocations(0, vec![iibb("AR-B", "1000"), iibb("AR-C", "400")])
        .unwrap();
    let view = batch.view();
    assert_eq!(view.issues.len(), 1);
    assert_eq!(view.issues[0].row_index, 0);
    assert_eq!(view.issues[0].kind, IssueKind::AllocationSumMismatch);
    assert!(view.valid_rows.is_empty());
    // невалидная строка остаётся в итогах
    assert_eq!(view.preview.get("21%"), Some(dec("1000")));
}

#[test]
fn sum_within_epsilon_passes() {
    let mut batch = batch_with(&["1;3;20111111112;1.000,00;210,00;100,00;;;"]);
    batch
        .set_gross_revenue_allocations(0, vec![iibb("AR-B", "33.33"), iibb("AR-C", "66.66")])
        .unwrap();
    assert!(kinds(&batch, 0).is_empty());
}

#[test]
fn unknown_jurisdiction_flagged() {
    let mut batch = batch_with(&["1;3;20111111112;1.000,00;210,00;100,00;;;"]);
    batch.bulk_apply_jurisdiction(&[0], "AR-ZZ").unwrap();
    assert_eq!(kinds(&batch, 0), vec![IssueKind::UnknownJurisdiction]);
}

#[test]
fn bulk_apply_skips_split_rows() {
    let row = "1;3;20111111112;1.000,00;210,00;100,00;;;";
    let mut batch = batch_with(&[row, row, row, row]);
    batch
        .set_gross_revenue_allocations(3, vec![iibb("AR-B", "60"), iibb("AR-C", "40")])
        .unwrap();

    let report = batch.bulk_apply_jurisdiction(&[0, 1, 2, 3], "AR-S").unwrap();
    assert_eq!(report.updated, 3);
    assert_eq!(report.skipped_split, 1);

    for row in 0..3 {
        let allocations = &batch.record(row).unwrap().perception_gross_revenue.allocations;
        assert_eq!(allocations.len(), 1);
        assert_eq!(allocations[0].jurisdiction.as_deref(), Some("AR-S"));
        assert_eq!(allocations[0].amount, dec("100"));
    }
    let split = &batch.record(3).unwrap().perception_gross_revenue.allocations;
    assert_eq!(split, &vec![iibb("AR-B", "60"), iibb("AR-C", "40")]);
    assert_eq!(batch.view().valid_rows, vec![0, 1, 2, 3]);
}

#[test]
fn bulk_apply_counts_each_row_once() {
    let row = "1;3;20111111112;1.000,00;210,00;100,00;;;";
    let mut batch = batch_with(&[row, row]);
    let report = batch.bulk_apply_jurisdiction(&[1, 0, 1, 0, 9, 9], "AR-B").unwrap();
    assert_eq!(report.updated, 2);
    assert_eq!(report.out_of_range, 1);
}

#[test]
fn oversized_allocations_are_flagged() {
    let mut batch = batch_with(&["1;3;20111111112;1.000,00;210,00;100,00;;;"]);
    batch
        .set_gross_revenue_allocations(0, vec![
            Allocation::new(TaxClass::GrossRevenue, Some("AR-B"), Decimal::MAX),
            Allocation::new(TaxClass::GrossRevenue, Some("AR-C"), Decimal::MAX),
        ])
        .unwrap();
    assert_eq!(kinds(&batch, 0), vec![IssueKind::AmountOverflow]);
}

#[test]
fn bulk_apply_counts_rows_without_allocation() {
    let mut batch = batch_with(&["1;3;20111111112;1.000,00;210,00;;;;"]);
    let report = batch.bulk_apply_jurisdiction(&[0, 7], "AR-S").unwrap();
    assert_eq!(report.updated, 0);
    assert_eq!(report.without_allocation, 1);
    assert_eq!(report.out_of_range, 1);
}

#[test]
fn other_taxes_need_classification() {
    let mut batch = batch_with(&["1;3;20111111112;1.000,00;210,00;;50,00;;"]);
    assert_eq!(kinds(&batch, 0), vec![IssueKind::UnclassifiedAllocation]);

    batch
        .set_other_taxes_allocations(0, vec![
            Allocation::new(TaxClass::Vat, None, dec("30")),
            Allocation::new(TaxClass::GrossRevenue, None, dec("20")),
        ])
        .unwrap();
    assert_eq!(kinds(&batch, 0), vec![IssueKind::MissingJurisdiction]);

    batch
        .set_other_taxes_allocations(0, vec![
            Allocation::new(TaxClass::Vat, None, dec("25")),
            Allocation::new(TaxClass::GrossRevenue, Some("AR-X"), dec("20")),
            Allocation::new(TaxClass::NoOp, None, dec("5")),
        ])
        .unwrap();
    assert!(kinds(&batch, 0).is_empty());

    let lines = flatten_perceptions(batch.record(0).unwrap());
    let flat: Vec<(&str, Option<&str>, Decimal)> = lines
        .iter()
        .map(|l| (l.kind.as_str(), l.jurisdiction.as_deref(), l.amount))
        .collect();
    assert_eq!(flat, vec![("IVA", None, dec("25")), ("IIBB", Some("AR-X"), dec("20"))]);
}

#[test]
fn editing_aggregate_follows_unsplit_allocation() {
    let mut batch = batch_with(&["1;3;20111111112;1.000,00;210,00;100,00;;;"]);
    batch.bulk_apply_jurisdiction(&[0], "AR-B").unwrap();
    batch
        .edit_cell(0, FieldKey::PerceptionGrossRevenueAmount, "150,00")
        .unwrap();
    assert_eq!(
        batch.record(0).unwrap().perception_gross_revenue.allocations,
        vec![iibb("AR-B", "150")]
    );
    assert!(kinds(&batch, 0).is_empty());

    batch
        .set_gross_revenue_allocations(0, vec![iibb("AR-B", "100"), iibb("AR-C", "50")])
        .unwrap();
    batch
        .edit_cell(0, FieldKey::PerceptionGrossRevenueAmount, "200,00")
        .unwrap();
    assert_eq!(kinds(&batch, 0), vec![IssueKind::AllocationSumMismatch]);
}

#[test]
fn national_perception_type_tag() {
    let mut batch = batch_with(&[
        "1;3;20111111112;1.000,00;210,00;;;10,00;IVA",
        "1;3;20111111112;1.000,00;210,00;;;10,00;XYZ",
        "1;3;20111111112;1.000,00;210,00;;;10,00;",
    ]);
    assert!(kinds(&batch, 0).is_empty());
    assert_eq!(kinds(&batch, 1), vec![IssueKind::InvalidPerceptionType]);
    assert_eq!(kinds(&batch, 2), vec![IssueKind::InvalidPerceptionType]);

    let lines = flatten_perceptions(batch.record(0).unwrap());
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].kind, "IVA");
    assert_eq!(lines[0].amount, dec("10"));

    batch.set_national_perception_type(2, Some("ganancias")).unwrap();
    assert!(kinds(&batch, 2).is_empty());
    assert_eq!(flatten_perceptions(batch.record(2).unwrap())[0].kind, "GANANCIAS");
}
