//! Приведение сырых строк ячеек к типизированным значениям.
//! Никогда не падает: непарсящееся значение становится `CellValue::Empty`.

use crate::model::{CellValue, FieldKind};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

pub fn coerce(kind: FieldKind, raw: &str) -> CellValue {
    match kind {
        FieldKind::Decimal => parse_decimal(raw).into(),
        FieldKind::IntegerCode => parse_code(raw).into(),
        FieldKind::Date => normalize_date(raw).into(),
        FieldKind::DocType => normalize_doc_type(raw).into(),
        FieldKind::Text => non_blank(raw).map(str::to_string).into(),
    }
}

/// Предел модуля суммы в ячейке. Больше — не сумма документа, а мусор
/// в файле; такое значение приводится к пустому.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0); // 1_000_000_000_000_000

/// Локальный формат: `.` — разделитель тысяч, `,` — десятичный ("1.234,56").
/// Допускаются `$`, пробелы, ведущий минус и отрицательные суммы в скобках.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let mut s = non_blank(raw)?;
    let mut negative = false;
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        negative = true;
        s = inner;
    }

    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, '.' | '$' | ' ' | '\u{a0}'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let value = Decimal::from_str(&cleaned).ok()?;
    if value.abs() > MAX_AMOUNT {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Обратная операция к [`parse_decimal`]: "1234.56" -> "1.234,56".
pub fn format_decimal(value: Decimal) -> String {
    let plain = value.abs().to_string();
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (plain.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let mut out = String::new();
    if value.is_sign_negative() && !value.is_zero() {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push(',');
        out.push_str(frac);
    }
    out
}

/// Ведущая последовательность цифр: "1 - Factura A" -> 1.
pub fn parse_code(raw: &str) -> Option<u64> {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// `YYYY-MM-DD` -> `DD/MM/YYYY`; остальные форматы возвращаются как есть.
pub fn normalize_date(raw: &str) -> Option<String> {
    let s = non_blank(raw)?;
    match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        Ok(date) if s.len() == 10 => Some(date.format("%d/%m/%Y").to_string()),
        _ => Some(s.to_string()),
    }
}

/// Текстовые типы документа контрагента -> фиксированные коды.
pub fn normalize_doc_type(raw: &str) -> Option<String> {
    let s = non_blank(raw)?;
    let code = match s.to_ascii_uppercase().as_str() {
        "CUIT" => "80",
        "CUIL" => "86",
        "DNI" => "96",
        _ => s,
    };
    Some(code.to_string())
}

fn non_blank(raw: &str) -> Option<&str> {
    let s = raw.trim();
    (!s.is_empty()).then_some(s)
}
