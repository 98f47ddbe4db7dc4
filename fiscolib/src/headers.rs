//! Сопоставление заголовков колонок каноническим полям.
//!
//! Каждый формат владеет своей таблицей синонимов: одна и та же логическая
//! колонка подписана в выгрузках по-разному. Таблицы — чистые данные,
//! новый вариант заголовка добавляется одной строкой. Канонические имена
//! (`net_total`, `net_21`, ...) принимаются любым форматом.
//!
//! Колонки национальной перцепции, в заголовке которых назван налог,
//! несут ещё и тип: сумма идёт в одно поле, тег выводится из заголовка.

use crate::{
    ingest::SourceFormat,
    model::{FieldKey, NationalPerceptionKind},
};

type AliasTable = &'static [(&'static str, &'static str)];

/// Выгрузка «Mis Comprobantes» (xlsx). Заголовки уже нормализованы.
const SPREADSHEET_ALIASES: AliasTable = &[
    ("fecha", "emission_date"),
    ("fecha de emision", "emission_date"),
    ("tipo", "document_type_code"),
    ("tipo de comprobante", "document_type_code"),
    ("punto de venta", "pos_number"),
    ("numero desde", "number_from"),
    ("numero hasta", "number_to"),
    ("cod. autorizacion", "authorization_code"),
    ("tipo doc. emisor", "counterparty_doc_type"),
    ("tipo doc. receptor", "counterparty_doc_type"),
    ("nro. doc. emisor", "counterparty_doc_number"),
    ("nro. doc. receptor", "counterparty_doc_number"),
    ("denominacion emisor", "counterparty_name"),
    ("denominacion receptor", "counterparty_name"),
    ("tipo cambio", "exchange_rate"),
    ("moneda", "currency_code"),
    ("neto grav. iva 0%", "net_0"),
    ("neto grav. iva 2,5%", "net_2_5"),
    ("neto grav. iva 5%", "net_5"),
    ("neto grav. iva 10,5%", "net_10_5"),
    ("neto grav. iva 21%", "net_21"),
    ("neto grav. iva 27%", "net_27"),
    ("imp. neto gravado", "net_total"),
    ("imp. neto gravado total", "net_total"),
    ("imp. neto no gravado", "non_taxed_amount"),
    ("imp. op. exentas", "exempt_amount"),
    ("otros tributos", "other_taxes_amount"),
    ("iva", "tax_total"),
    ("total iva", "tax_total"),
    ("imp. total", "grand_total"),
    ("tipo percepcion", "perception_other_national_type"),
    ("percepcion iibb", "perception_gross_revenue_amount"),
    ("percepciones iibb", "perception_gross_revenue_amount"),
];

/// CSV из бухгалтерских систем и ручных шаблонов.
const DELIMITED_ALIASES: AliasTable = &[
    ("fecha", "emission_date"),
    ("fecha emision", "emission_date"),
    ("fecha_emision", "emission_date"),
    ("fecha comprobante", "emission_date"),
    ("tipo", "document_type_code"),
    ("tipo comprobante", "document_type_code"),
    ("tipo_comprobante", "document_type_code"),
    ("cod_comprobante", "document_type_code"),
    ("punto de venta", "pos_number"),
    ("punto_venta", "pos_number"),
    ("pto. venta", "pos_number"),
    ("pto vta", "pos_number"),
    ("numero", "number_from"),
    ("numero desde", "number_from"),
    ("numero_desde", "number_from"),
    ("nro_desde", "number_from"),
    ("numero comprobante", "number_from"),
    ("numero hasta", "number_to"),
    ("numero_hasta", "number_to"),
    ("nro_hasta", "number_to"),
    ("cae", "authorization_code"),
    ("cod_autorizacion", "authorization_code"),
    ("tipo_doc", "counterparty_doc_type"),
    ("tipo documento", "counterparty_doc_type"),
    ("nro_doc", "counterparty_doc_number"),
    ("cuit", "counterparty_doc_number"),
    ("numero documento", "counterparty_doc_number"),
    ("razon social", "counterparty_name"),
    ("razon_social", "counterparty_name"),
    ("denominacion", "counterparty_name"),
    ("proveedor", "counterparty_name"),
    ("cliente", "counterparty_name"),
    ("tipo_cambio", "exchange_rate"),
    ("tipo de cambio", "exchange_rate"),
    ("cotizacion", "exchange_rate"),
    ("moneda", "currency_code"),
    ("cod_moneda", "currency_code"),
    ("neto_0", "net_0"),
    ("neto 0%", "net_0"),
    ("neto_2_5", "net_2_5"),
    ("neto 2,5%", "net_2_5"),
    ("neto_5", "net_5"),
    ("neto 5%", "net_5"),
    ("neto_10_5", "net_10_5"),
    ("neto 10,5%", "net_10_5"),
    ("neto_21", "net_21"),
    ("neto 21%", "net_21"),
    ("neto_27", "net_27"),
    ("neto 27%", "net_27"),
    ("neto", "net_total"),
    ("neto gravado", "net_total"),
    ("neto_gravado", "net_total"),
    ("importe neto", "net_total"),
    ("no gravado", "non_taxed_amount"),
    ("no_gravado", "non_taxed_amount"),
    ("neto_no_gravado", "non_taxed_amount"),
    ("exento", "exempt_amount"),
    ("exentas", "exempt_amount"),
    ("op_exentas", "exempt_amount"),
    ("otros tributos", "other_taxes_amount"),
    ("otros_tributos", "other_taxes_amount"),
    ("iva", "tax_total"),
    ("iva_total", "tax_total"),
    ("total iva", "tax_total"),
    ("total", "grand_total"),
    ("importe total", "grand_total"),
    ("tipo_percepcion", "perception_other_national_type"),
    ("tipo percepcion", "perception_other_national_type"),
    ("percepcion_iibb", "perception_gross_revenue_amount"),
    ("percepciones iibb", "perception_gross_revenue_amount"),
    ("perc_iibb", "perception_gross_revenue_amount"),
];

/// Заголовки с типом национальной перцепции, общие для обоих форматов.
const TYPED_NATIONAL_ALIASES: &[(&str, NationalPerceptionKind)] = &[
    ("percepcion iva", NationalPerceptionKind::Iva),
    ("percepciones iva", NationalPerceptionKind::Iva),
    ("percepcion_iva", NationalPerceptionKind::Iva),
    ("perc_iva", NationalPerceptionKind::Iva),
    ("percepcion ganancias", NationalPerceptionKind::Ganancias),
    ("percepciones ganancias", NationalPerceptionKind::Ganancias),
    ("percepcion_ganancias", NationalPerceptionKind::Ganancias),
    ("perc_ganancias", NationalPerceptionKind::Ganancias),
];

fn aliases(format: SourceFormat) -> AliasTable {
    match format {
        SourceFormat::Delimited => DELIMITED_ALIASES,
        SourceFormat::Spreadsheet => SPREADSHEET_ALIASES,
    }
}

/// Куда попадает колонка.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnTarget {
    Field(FieldKey),
    /// Сумма национальной перцепции заданного типа.
    NationalPerception(NationalPerceptionKind),
    /// Нераспознанная колонка: сохраняется под slug-именем, в проверках не участвует.
    Extra(String),
}

/// Сопоставление для одного нормализованного заголовка.
pub fn map_header(header: &str, format: SourceFormat) -> ColumnTarget {
    if let Some((_, kind)) = TYPED_NATIONAL_ALIASES.iter().find(|(alias, _)| *alias == header) {
        return ColumnTarget::NationalPerception(*kind);
    }
    let key = FieldKey::from_canonical(header).or_else(|| {
        aliases(format)
            .iter()
            .find(|(alias, _)| *alias == header)
            .and_then(|(_, canonical)| FieldKey::from_canonical(canonical))
    });
    match key {
        Some(key) => ColumnTarget::Field(key),
        None => ColumnTarget::Extra(slugify(header)),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    columns: Vec<ColumnTarget>,
}

impl HeaderMap {
    pub fn build(headers: &[String], format: SourceFormat) -> Self {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(i, h)| match map_header(h, format) {
                ColumnTarget::Extra(slug) if slug.is_empty() => {
                    ColumnTarget::Extra(format!("column_{}", i + 1))
                }
                target => target,
            })
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnTarget] {
        &self.columns
    }

    pub fn unmapped(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().filter_map(|c| match c {
            ColumnTarget::Extra(slug) => Some(slug.as_str()),
            ColumnTarget::Field(_) | ColumnTarget::NationalPerception(_) => None,
        })
    }
}

/// "Nro. Interno (ERP)" -> "nro_interno_erp".
pub fn slugify(header: &str) -> String {
    let mut slug = String::with_capacity(header.len());
    for ch in header.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }
    slug.trim_end_matches('_').to_string()
}
