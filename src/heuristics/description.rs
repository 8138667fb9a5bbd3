use super::AuditedWeight;
use crate::fields::parse_locale_decimal;
use crate::units::{Unit, to_kg};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use rust_decimal::Decimal;
use tracing::debug;

// "20x500g", "12 x 1,5l". The unit must not run into another letter, so the
// trailing non-letter (or end of text) is consumed as part of the match.
static PACKAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:[.,]\d+)?)\s*x\s*(\d+(?:[.,]\d+)?)\s*(gr|g|kg|l)(?:[^a-z]|$)")
        .expect("package pattern compiles")
});

// "0.400kg", "500 g"
static SINGLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:[.,]\d+)?)\s*(g|gr|kg|l)\b").expect("single-item pattern compiles")
});

pub fn audit(description: &str, commercial_qty: Decimal) -> Option<AuditedWeight> {
    if description.trim().is_empty() || commercial_qty.is_zero() {
        return None;
    }

    let lowered = description.to_lowercase();

    // Package pattern wins outright; a match that fails to compute does not
    // fall through to the single-item pattern.
    if let Some(caps) = PACKAGE_RE.captures(&lowered) {
        return package_weight(&caps, commercial_qty);
    }

    let caps = SINGLE_RE.captures(&lowered)?;
    single_weight(&caps, commercial_qty)
}

fn package_weight(caps: &Captures, commercial_qty: Decimal) -> Option<AuditedWeight> {
    let count = parse_locale_decimal(&caps[1])?;
    let per_sub_unit = parse_locale_decimal(&caps[2])?;
    let unit = Unit::parse(&caps[3]);

    let per_commercial_unit = count.checked_mul(per_sub_unit);
    let total = per_commercial_unit.and_then(|w| w.checked_mul(commercial_qty));
    finish(total, unit, &caps[0])
}

fn single_weight(caps: &Captures, commercial_qty: Decimal) -> Option<AuditedWeight> {
    let per_item = parse_locale_decimal(&caps[1])?;
    let unit = Unit::parse(&caps[2]);

    finish(per_item.checked_mul(commercial_qty), unit, &caps[0])
}

fn finish(total: Option<Decimal>, unit: Unit, matched: &str) -> Option<AuditedWeight> {
    let Some(total) = total else {
        debug!(pattern = %matched.trim(), "Audited weight overflowed; ignoring description");
        return None;
    };
    let weight_kg = to_kg(total, unit).ok().flatten()?;
    debug!(pattern = %matched.trim(), weight_kg = %weight_kg, unit = unit.symbol(), "Description audit matched");
    Some(AuditedWeight {
        weight_kg,
        source_unit: unit,
    })
}
