// src/resolver.rs

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::heuristics::{AuditedWeight, audit_description};
use crate::models::WeightSource;
use crate::units::{Unit, UnitQuantity};

/// The declared facts about one product line that feed weight resolution.
#[derive(Debug, Clone, Copy)]
pub struct ItemInputs<'a> {
    /// `qTrib` / `uTrib`.
    pub tax: UnitQuantity,
    /// `qCom` / `uCom`.
    pub commercial: UnitQuantity,
    pub description: &'a str,
}

impl ItemInputs<'_> {
    /// Declared commercial quantity, falling back to the tax quantity only
    /// when it is exactly zero.
    pub fn commercial_quantity(&self) -> Decimal {
        if self.commercial.magnitude().is_zero() {
            self.tax.magnitude()
        } else {
            self.commercial.magnitude()
        }
    }
}

/// Outcome of resolving one product line's weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedWeight {
    pub weight_kg: Decimal,
    pub source: WeightSource,
    /// Set when the description's weight replaced the declared one.
    pub unit_override: Option<Unit>,
    pub declared_kg: Decimal,
    pub audited: Option<AuditedWeight>,
}

/// Kilograms for one declared pair; a conversion that overflows is treated
/// as carrying no weight.
fn weight_of(quantity: UnitQuantity) -> Option<Decimal> {
    if !quantity.unit().is_weight_bearing() {
        return None;
    }
    match quantity.to_kg() {
        Ok(kg) => kg,
        Err(e) => {
            warn!(
                magnitude = %quantity.magnitude(),
                unit = quantity.unit().symbol(),
                error = %e,
                "Declared quantity not convertible; treating as weightless"
            );
            None
        }
    }
}

/// Weight from the unit fields alone: tax unit first, then commercial unit.
/// Neither being weight-bearing yields zero, not an error.
pub fn declared_weight(tax: UnitQuantity, commercial: UnitQuantity) -> (Decimal, WeightSource) {
    if let Some(kg) = weight_of(tax) {
        return (kg, WeightSource::TaxUnit);
    }
    if let Some(kg) = weight_of(commercial) {
        return (kg, WeightSource::CommercialUnit);
    }
    (Decimal::ZERO, WeightSource::None)
}

/// Combines the declared weight with the description audit.
///
/// The audited weight replaces the declared one when they differ by more than
/// `tolerance_kg`.
pub fn resolve_weight(inputs: &ItemInputs, tolerance_kg: Decimal) -> ResolvedWeight {
    let (declared_kg, declared_source) = declared_weight(inputs.tax, inputs.commercial);
    let audited = audit_description(inputs.description, inputs.commercial_quantity());

    let mut resolved = ResolvedWeight {
        weight_kg: declared_kg,
        source: declared_source,
        unit_override: None,
        declared_kg,
        audited,
    };

    let Some(audit) = audited else {
        return resolved;
    };

    let Some(diff) = declared_kg.checked_sub(audit.weight_kg).map(|d| d.abs()) else {
        warn!(
            declared_kg = %declared_kg,
            audited_kg = %audit.weight_kg,
            "Weights not comparable; keeping declared weight"
        );
        return resolved;
    };

    if diff > tolerance_kg {
        info!(
            desc = %inputs.description,
            declared_kg = %declared_kg,
            audited_kg = %audit.weight_kg,
            unit = audit.source_unit.symbol(),
            "Declared weight disagrees with description; using audited weight"
        );
        resolved.weight_kg = audit.weight_kg;
        resolved.source = WeightSource::Description;
        resolved.unit_override = Some(audit.source_unit);
    }

    resolved
}

/// Quantity, unit price and line total after filling in whichever of the
/// prices was declared as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pricing {
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
}

/// Derives a zero unit price as `total / quantity`, then a zero total as
/// `unit_price * quantity`, whenever the inputs to the derivation are positive.
/// A derivation that overflows leaves the declared zero in place.
pub fn resolve_pricing(quantity: Decimal, unit_price: Decimal, total: Decimal) -> Pricing {
    let positive = |d: Decimal| d > Decimal::ZERO;

    let unit_price = if unit_price.is_zero() && positive(total) && positive(quantity) {
        total.checked_div(quantity).unwrap_or_else(|| {
            warn!(total = %total, quantity = %quantity, "Unit price derivation overflowed");
            unit_price
        })
    } else {
        unit_price
    };

    let total = if total.is_zero() && positive(unit_price) && positive(quantity) {
        unit_price.checked_mul(quantity).unwrap_or_else(|| {
            warn!(unit_price = %unit_price, quantity = %quantity, "Line total derivation overflowed");
            total
        })
    } else {
        total
    };

    Pricing {
        quantity,
        unit_price,
        total,
    }
}
