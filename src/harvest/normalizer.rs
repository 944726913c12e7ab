//! Cleanup and validation of raw grid rows into storable records.

use crate::error::HarvestError;
use crate::portal::models::{PropertyRecord, RawRecord, SearchCombination};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::warn;

/// Rounds to 2 decimal places, half away from zero, so 100.5555 lands on
/// 100.56 the way the municipal statements print it.
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Turns one raw row into a validated record.
///
/// Text fields are trimmed; numeric fields are stripped of currency
/// symbols, thousands separators and units before parsing, then rounded
/// to 2 decimal places. The capture date stays unset here; the store
/// stamps whole batches.
pub fn normalize(
    raw: &RawRecord,
    combination: &SearchCombination,
) -> Result<PropertyRecord, HarvestError> {
    let description = raw.description.trim();
    if description.is_empty() {
        return Err(HarvestError::Validation("empty property description".into()));
    }
    if combination.property_type.trim().is_empty() {
        return Err(HarvestError::Validation("empty property type".into()));
    }
    if combination.volume_no.trim().is_empty() {
        return Err(HarvestError::Validation("empty volume number".into()));
    }

    Ok(PropertyRecord {
        property_type: combination.property_type.trim().to_string(),
        volume_no: combination.volume_no.trim().to_string(),
        description: description.to_string(),
        street_address: raw.street_address.trim().to_string(),
        extent: parse_quantity(&raw.extent, "extent")?,
        market_value: parse_quantity(&raw.market_value, "market value")?,
        captured_on: None,
    })
}

/// Normalizes a whole page of rows, dropping the invalid ones.
///
/// A bad row is logged and dropped; it never takes its neighbours or the
/// combination down with it.
pub fn normalize_batch(
    raws: Vec<RawRecord>,
    combination: &SearchCombination,
) -> (Vec<PropertyRecord>, Vec<HarvestError>) {
    let mut records = Vec::with_capacity(raws.len());
    let mut dropped = Vec::new();

    for raw in &raws {
        match normalize(raw, combination) {
            Ok(record) => records.push(record),
            Err(err) => {
                warn!(
                    combination = %combination,
                    description = raw.description.trim(),
                    error = %err,
                    "dropping invalid record"
                );
                dropped.push(err);
            }
        }
    }

    (records, dropped)
}

/// Parses a grid quantity like " R 1,250,000.00 " or "450 m²".
///
/// Keeps digits, the decimal point and a sign; everything else is
/// presentation. Negative quantities are rejected, the register has no
/// business holding them.
fn parse_quantity(raw: &str, field: &str) -> Result<Decimal, HarvestError> {
    let cleaned: String =
        raw.chars().filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-').collect();

    if cleaned.is_empty() {
        return Err(HarvestError::Validation(format!(
            "{field} has no numeric content: {raw:?}"
        )));
    }

    let value: Decimal = cleaned.parse().map_err(|_| {
        HarvestError::Validation(format!("{field} is not a number: {raw:?}"))
    })?;

    if value.is_sign_negative() {
        return Err(HarvestError::Validation(format!("{field} is negative: {raw:?}")));
    }

    Ok(round_currency(value))
}
