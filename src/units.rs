// src/units.rs

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{EngineError, Result};

/// Unit symbol attached to a declared quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Unit {
    Kg,
    /// Grams; also spelled `GR` in the wild.
    G,
    /// Metric tonnes.
    T,
    /// Liters, converted with a fixed milk-equivalent density.
    L,
    /// Anything else (`UN`, `CX`, `PCT`...). Never converted.
    Other,
}

impl Unit {
    /// Parses a unit symbol, ignoring case and surrounding whitespace.
    pub fn parse(symbol: &str) -> Unit {
        match symbol.trim().to_uppercase().as_str() {
            "KG" => Unit::Kg,
            "G" | "GR" => Unit::G,
            "T" => Unit::T,
            "L" => Unit::L,
            _ => Unit::Other,
        }
    }

    pub fn is_weight_bearing(self) -> bool {
        self != Unit::Other
    }

    /// Kilograms per one of this unit; `None` for [`Unit::Other`].
    pub fn kg_factor(self) -> Option<Decimal> {
        match self {
            Unit::Kg => Some(Decimal::ONE),
            Unit::G => Some(Decimal::new(1, 3)),
            Unit::T => Some(Decimal::from(1000)),
            Unit::L => Some(Decimal::new(103, 2)),
            Unit::Other => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Kg => "KG",
            Unit::G => "G",
            Unit::T => "T",
            Unit::L => "L",
            Unit::Other => "OTHER",
        }
    }
}

/// Converts `quantity` of `unit` into kilograms.
///
/// `Ok(None)` means the unit carries no weight information, which is not the
/// same as a zero weight.
pub fn to_kg(quantity: Decimal, unit: Unit) -> Result<Option<Decimal>> {
    let Some(factor) = unit.kg_factor() else {
        return Ok(None);
    };
    quantity
        .checked_mul(factor)
        .map(Some)
        .ok_or_else(|| EngineError::overflow("unit conversion"))
}

/// A declared magnitude with its unit, kept as declared. Negative magnitudes
/// weigh nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitQuantity {
    magnitude: Decimal,
    unit: Unit,
}

impl UnitQuantity {
    pub fn new(magnitude: Decimal, unit: Unit) -> Self {
        Self { magnitude, unit }
    }

    pub fn magnitude(&self) -> Decimal {
        self.magnitude
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Converts the magnitude, clamped at zero, into kilograms.
    pub fn to_kg(&self) -> Result<Option<Decimal>> {
        to_kg(self.magnitude.max(Decimal::ZERO), self.unit)
    }
}
