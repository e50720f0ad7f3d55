use super::IngestError;
use log::warn;

pub const BRAND_COLUMN: &str = "MARKA";
pub const MODEL_COLUMN: &str = "MODEL";
pub const YEAR_COLUMN: &str = "YIL";

/// A provider price column discovered in the header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OfferColumn {
    pub index: usize,
    pub name: String,
}

/// Header split into the fixed identity columns and the provider columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    pub brand: usize,
    pub model: usize,
    pub year: usize,
    pub offers: Vec<OfferColumn>,
}

/// Partitions `header` before any row is looked at.
///
/// Identity names are matched exactly (case-sensitive). Every other non-empty
/// name is a provider column; a repeated name keeps its first position.
pub fn detect_schema(header: &[String]) -> Result<Schema, IngestError> {
    let position = |wanted: &str| {
        header
            .iter()
            .position(|name| name == wanted)
            .ok_or_else(|| IngestError::Schema {
                column: wanted.to_string(),
            })
    };
    let brand = position(BRAND_COLUMN)?;
    let model = position(MODEL_COLUMN)?;
    let year = position(YEAR_COLUMN)?;

    let mut offers: Vec<OfferColumn> = Vec::new();
    for (index, name) in header.iter().enumerate() {
        if name.is_empty() || index == brand || index == model || index == year {
            continue;
        }
        if [BRAND_COLUMN, MODEL_COLUMN, YEAR_COLUMN].contains(&name.as_str())
            || offers.iter().any(|o| &o.name == name)
        {
            warn!("ignoring repeated column '{}' at position {}", name, index + 1);
            continue;
        }
        offers.push(OfferColumn {
            index,
            name: name.clone(),
        });
    }

    Ok(Schema {
        brand,
        model,
        year,
        offers,
    })
}
