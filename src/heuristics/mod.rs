// src/heuristics/mod.rs

mod description;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::units::Unit;

/// A weight recovered from a product description, independent of the
/// declared unit fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuditedWeight {
    #[serde(with = "rust_decimal::serde::float")]
    pub weight_kg: Decimal,
    /// Unit the description was written in: `G`, `KG` or `L`.
    pub source_unit: Unit,
}

/// Audit a product description for embedded packaging or weight patterns.
///
/// Returns `None` when nothing matched, the description is empty, or the
/// commercial quantity is zero. `None` means "keep the declared weight".
pub fn audit_description(description: &str, commercial_qty: Decimal) -> Option<AuditedWeight> {
    description::audit(description, commercial_qty)
}
