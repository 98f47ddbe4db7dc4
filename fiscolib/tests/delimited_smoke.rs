use fiscolib::{
    config::ImportConfig,
    ingest::SourceFormat,
    pipeline,
    rates::{Rate, RateResolution},
};
use rust_decimal::Decimal;
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[test]
fn semicolon_export_with_aliases() {
    let input = "\u{feff}Fecha;Tipo;Punto de Venta;\"Número Desde\";CUIT;Razón Social;Neto Gravado;IVA;Total;Nro. Interno\n\
\n\
2024-03-05;\"1 - Factura A\";0003;'00012345';20111111112;\"Pérez; Hnos\";1.234,56;259,26;1.493,82;A-77\n\
\n";

    let ingested = pipeline::ingest(input.as_bytes(), SourceFormat::Delimited, &ImportConfig::default())
        .expect("ingest csv");
    assert_eq!(ingested.records.len(), 1);
    assert_eq!(ingested.unmapped, vec!["nro_interno".to_string()]);

    let r = &ingested.records[0];
    assert_eq!(r.emission_date.as_deref(), Some("05/03/2024"));
    assert_eq!(r.document_type_code, Some(1));
    assert_eq!(r.pos_number, Some(3));
    assert_eq!(r.number_from, Some(12345));
    assert_eq!(r.counterparty_doc_number.as_deref(), Some("20111111112"));
    assert_eq!(r.counterparty_name.as_deref(), Some("Pérez; Hnos"));
    assert_eq!(r.net_total, Some(dec("1234.56")));
    assert_eq!(r.tax_total, Some(dec("259.26")));
    assert_eq!(r.grand_total, Some(dec("1493.82")));
    assert_eq!(r.rate_resolution, RateResolution::Inferred(Rate::new(dec("21"))));
    assert_eq!(r.extras.get("nro_interno").map(String::as_str), Some("A-77"));
}

#[test]
fn comma_fallback_and_explicit_buckets() {
    let input = "tipo_comprobante,punto_venta,nro_doc,neto_21,neto_10_5,exento,iva\n\
6,1,20111111112,\"1.000,00\",\"200,00\",\"50,00\",\"231,00\"\n";

    let ingested = pipeline::ingest(input.as_bytes(), SourceFormat::Delimited, &ImportConfig::default())
        .expect("ingest csv");
    let r = &ingested.records[0];
    assert_eq!(r.rate_resolution, RateResolution::Explicit);
    assert_eq!(r.net_by_rate.get(&Rate::new(dec("21"))), Some(&dec("1000")));
    assert_eq!(r.net_by_rate.get(&Rate::new(dec("10.5"))), Some(&dec("200")));
    assert_eq!(r.exempt_amount, Some(dec("50")));
}

#[test]
fn unparsable_cells_degrade_to_empty() {
    let input = "net_total;tax_total;document_type_code;pos_number\nabc;;Factura;x\n";
    let ingested = pipeline::ingest(input.as_bytes(), SourceFormat::Delimited, &ImportConfig::default())
        .expect("ingest csv");
    let r = &ingested.records[0];
    assert_eq!(r.net_total, None);
    assert_eq!(r.tax_total, None);
    assert_eq!(r.document_type_code, None);
    assert_eq!(r.pos_number, None);
    assert_eq!(r.rate_resolution, RateResolution::Undeterminable);
}

#[test]
fn duplicate_columns_first_non_empty_wins() {
    let input = "neto;importe neto\n;100\n200;300\n";
    let ingested = pipeline::ingest(input.as_bytes(), SourceFormat::Delimited, &ImportConfig::default())
        .expect("ingest csv");
    assert_eq!(ingested.records[0].net_total, Some(dec("100")));
    assert_eq!(ingested.records[1].net_total, Some(dec("200")));
}

#[test]
fn empty_file_is_an_error() {
    let err = pipeline::ingest(b"\n\n  \n", SourceFormat::Delimited, &ImportConfig::default());
    assert!(err.is_err());
}
