//! Per-row cleaning and type coercion.
//!
//! Nothing here fails: a bad cell becomes an omitted offer and a bad row
//! becomes a [`RowOutcome::Skip`]. Rows are independent, so a batch can be
//! normalised in parallel.

use super::reader::{CellValue, Row};
use super::schema::Schema;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Whitespace (incl. NBSP) and currency markers that may surround a price.
static PRICE_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[\s\u{00A0}]|₺|TRY|TL|\$|€").expect("valid regex"));

/// A validated vehicle row ready to be stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub brand: String,
    pub model: String,
    pub year: String,
    pub offers: BTreeMap<String, u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    MissingIdentity,
    InvalidYear,
    NoOffers,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowOutcome {
    Record(NormalizedRecord),
    Skip(SkipReason),
}

/// Result of coercing one price cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceCell {
    Price(u64),
    Omitted,
}

/// Reads a decimal number written with either `,` or `.` as the decimal point.
///
/// With both separators present the right-most one is the decimal point. A
/// separator that occurs once is the decimal point; one that occurs several
/// times groups thousands.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let commas = s.matches(',').count();
    let dots = s.matches('.').count();

    let canonical = match (commas, dots) {
        (0, 0) => s.to_string(),
        (_, 0) if commas > 1 => s.replace(',', ""),
        (_, 0) => s.replace(',', "."),
        (0, _) if dots > 1 => s.replace('.', ""),
        (0, _) => s.to_string(),
        _ => {
            let last_comma = s.rfind(',').unwrap_or(0);
            let last_dot = s.rfind('.').unwrap_or(0);
            if last_comma > last_dot {
                s.replace('.', "").replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
    };
    canonical
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn whole_positive(value: f64) -> PriceCell {
    let truncated = value.trunc();
    if value.is_finite() && truncated >= 1.0 && truncated <= u64::MAX as f64 {
        PriceCell::Price(truncated as u64)
    } else {
        PriceCell::Omitted
    }
}

/// Turns a price cell into a positive whole amount; zero, negative, empty and
/// unreadable cells are omitted. Fractions are truncated.
pub fn coerce_price(cell: &CellValue) -> PriceCell {
    match cell {
        CellValue::Empty => PriceCell::Omitted,
        CellValue::Number(n) => whole_positive(*n),
        CellValue::Text(raw) => {
            let cleaned = PRICE_NOISE.replace_all(raw, "");
            match parse_decimal(&cleaned) {
                Some(value) => whole_positive(value),
                None => PriceCell::Omitted,
            }
        }
    }
}

/// Canonical integer text for a model year: `2024`, `"2024"` and `"2024.0"`
/// all become `"2024"`.
pub fn canonical_year(cell: &CellValue) -> Option<String> {
    let value = match cell {
        CellValue::Empty => return None,
        CellValue::Number(n) => *n,
        CellValue::Text(raw) => {
            let raw = raw.trim();
            match raw.parse::<i64>() {
                Ok(year) => year as f64,
                Err(_) => parse_decimal(raw)?,
            }
        }
    };
    let year = value.trunc();
    if value.is_finite() && year >= 1.0 && year <= i64::MAX as f64 {
        Some(format!("{}", year as i64))
    } else {
        None
    }
}

fn identity_text(cell: &CellValue) -> Option<String> {
    let text = cell.to_text().trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

pub fn normalize_row(row: &Row, schema: &Schema) -> RowOutcome {
    let (Some(brand), Some(model)) = (
        identity_text(row.get(schema.brand)),
        identity_text(row.get(schema.model)),
    ) else {
        return RowOutcome::Skip(SkipReason::MissingIdentity);
    };
    let Some(year) = canonical_year(row.get(schema.year)) else {
        return RowOutcome::Skip(SkipReason::InvalidYear);
    };

    let offers: BTreeMap<String, u64> = schema
        .offers
        .iter()
        .filter_map(|column| match coerce_price(row.get(column.index)) {
            PriceCell::Price(price) => Some((column.name.clone(), price)),
            PriceCell::Omitted => None,
        })
        .collect();
    if offers.is_empty() {
        return RowOutcome::Skip(SkipReason::NoOffers);
    }

    RowOutcome::Record(NormalizedRecord {
        brand,
        model,
        year,
        offers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::schema::detect_schema;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn schema() -> Schema {
        let header: Vec<String> = ["MARKA", "MODEL", "YIL", "AXA", "Allianz"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        detect_schema(&header).unwrap()
    }

    fn row(cells: Vec<CellValue>) -> Row {
        Row { line: 2, cells }
    }

    #[test]
    fn year_forms_share_one_canonical_text() {
        assert_eq!(canonical_year(&text("2024")).as_deref(), Some("2024"));
        assert_eq!(canonical_year(&CellValue::Number(2024.0)).as_deref(), Some("2024"));
        assert_eq!(canonical_year(&text("2024.0")).as_deref(), Some("2024"));
        assert_eq!(canonical_year(&text(" 2024,0 ")).as_deref(), Some("2024"));
        assert_eq!(canonical_year(&text("1999")).as_deref(), Some("1999"));
    }

    #[test]
    fn unusable_years_are_rejected() {
        assert_eq!(canonical_year(&text("abc")), None);
        assert_eq!(canonical_year(&text("")), None);
        assert_eq!(canonical_year(&CellValue::Empty), None);
        assert_eq!(canonical_year(&CellValue::Number(-3.0)), None);
    }

    #[test]
    fn decimal_separators_are_interchangeable() {
        assert_eq!(coerce_price(&text("1.250,50")), PriceCell::Price(1250));
        assert_eq!(coerce_price(&text("1250.5")), PriceCell::Price(1250));
        assert_eq!(coerce_price(&text("1250,5")), PriceCell::Price(1250));
        assert_eq!(coerce_price(&text("1,250.50")), PriceCell::Price(1250));
        assert_eq!(coerce_price(&text("1.250.000")), PriceCell::Price(1_250_000));
        assert_eq!(coerce_price(&CellValue::Number(1250.99)), PriceCell::Price(1250));
    }

    #[test]
    fn price_noise_is_stripped() {
        assert_eq!(coerce_price(&text(" 1 250 ")), PriceCell::Price(1250));
        assert_eq!(coerce_price(&text("₺1.250,00")), PriceCell::Price(1250));
        assert_eq!(coerce_price(&text("980 TL")), PriceCell::Price(980));
        assert_eq!(coerce_price(&text("1\u{00A0}000")), PriceCell::Price(1000));
        assert_eq!(coerce_price(&text("980TL")), PriceCell::Price(980));
        assert_eq!(coerce_price(&text("1.250,00TL")), PriceCell::Price(1250));
        assert_eq!(coerce_price(&text("TL980")), PriceCell::Price(980));
        assert_eq!(coerce_price(&text("750try")), PriceCell::Price(750));
    }

    #[test]
    fn zero_negative_and_garbage_are_omitted() {
        assert_eq!(coerce_price(&text("0")), PriceCell::Omitted);
        assert_eq!(coerce_price(&CellValue::Number(0.0)), PriceCell::Omitted);
        assert_eq!(coerce_price(&CellValue::Number(0.4)), PriceCell::Omitted);
        assert_eq!(coerce_price(&text("-5")), PriceCell::Omitted);
        assert_eq!(coerce_price(&text("")), PriceCell::Omitted);
        assert_eq!(coerce_price(&text("n/a")), PriceCell::Omitted);
        assert_eq!(coerce_price(&text("12abc")), PriceCell::Omitted);
        assert_eq!(coerce_price(&CellValue::Empty), PriceCell::Omitted);
    }

    #[test]
    fn row_keeps_only_positive_offers() {
        let outcome = normalize_row(
            &row(vec![
                text(" Toyota "),
                text("Corolla "),
                CellValue::Number(2024.0),
                text("1000"),
                text("0"),
            ]),
            &schema(),
        );
        let record = match outcome {
            RowOutcome::Record(record) => record,
            other => panic!("expected a record, got {other:?}"),
        };
        assert_eq!(record.brand, "Toyota");
        assert_eq!(record.model, "Corolla");
        assert_eq!(record.year, "2024");
        assert_eq!(record.offers, BTreeMap::from([("AXA".to_string(), 1000)]));
    }

    #[test]
    fn rows_without_any_offer_are_skipped() {
        for prices in [
            vec![text(""), text("")],
            vec![text("-5"), CellValue::Empty],
            vec![text("abc"), CellValue::Number(0.0)],
        ] {
            let mut cells = vec![text("Ford"), text("Focus"), text("2023.0")];
            cells.extend(prices);
            assert_eq!(
                normalize_row(&row(cells), &schema()),
                RowOutcome::Skip(SkipReason::NoOffers)
            );
        }
    }

    #[test]
    fn bad_identity_skips_the_row() {
        let missing_brand = row(vec![text("  "), text("Focus"), text("2023"), text("10")]);
        assert_eq!(
            normalize_row(&missing_brand, &schema()),
            RowOutcome::Skip(SkipReason::MissingIdentity)
        );
        let bad_year = row(vec![text("Ford"), text("Focus"), text("yeni"), text("10")]);
        assert_eq!(
            normalize_row(&bad_year, &schema()),
            RowOutcome::Skip(SkipReason::InvalidYear)
        );
    }

    #[test]
    fn numeric_model_names_render_as_integers() {
        let outcome = normalize_row(
            &row(vec![text("Fiat"), CellValue::Number(500.0), text("2021"), text("700")]),
            &schema(),
        );
        match outcome {
            RowOutcome::Record(record) => assert_eq!(record.model, "500"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn schema_without_offer_columns_skips_everything() {
        let header: Vec<String> = ["MARKA", "MODEL", "YIL"].iter().map(|s| s.to_string()).collect();
        let bare = detect_schema(&header).unwrap();
        let outcome = normalize_row(&row(vec![text("Fiat"), text("Egea"), text("2021")]), &bare);
        assert_eq!(outcome, RowOutcome::Skip(SkipReason::NoOffers));
    }
}
