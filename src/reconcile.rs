// src/reconcile.rs

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::EngineSettings;
use crate::error::{EngineError, Result};

/// One `transp/vol` entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VolumeWeight {
    pub net_kg: Decimal,
    pub gross_kg: Decimal,
}

/// Which source produced a document-level weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightOrigin {
    /// Sum of resolved item weights.
    Items,
    /// Sum over shipping volumes.
    Volumes,
    /// Net weight with the packaging markup applied.
    Derived,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DocumentWeights {
    #[serde(with = "rust_decimal::serde::float")]
    pub net_weight_kg: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gross_weight_kg: Decimal,
    pub net_origin: WeightOrigin,
    pub gross_origin: WeightOrigin,
}

fn checked_sum(values: impl IntoIterator<Item = Decimal>, context: &str) -> Result<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or_else(|| EngineError::overflow(context))
}

/// Picks the document net weight from the item sum and the volume net sum.
///
/// The volume sum only wins when it is larger than the item sum and within
/// `tolerance_pct` percent of it.
pub fn reconcile_net(item_sum: Decimal, volume_sum: Decimal, tolerance_pct: Decimal) -> Result<(Decimal, WeightOrigin)> {
    let items_known = item_sum > Decimal::ZERO;
    let volumes_known = volume_sum > Decimal::ZERO;

    match (items_known, volumes_known) {
        (true, true) => {
            let diff = item_sum
                .checked_sub(volume_sum)
                .ok_or_else(|| EngineError::overflow("net weight difference"))?
                .abs();
            let pct = diff
                .checked_div(item_sum)
                .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
                .ok_or_else(|| EngineError::overflow("net weight percentage"))?;

            if pct <= tolerance_pct && volume_sum > item_sum {
                debug!(item_sum = %item_sum, volume_sum = %volume_sum, pct = %pct.round_dp(2), "Volume net weight accepted");
                return Ok((volume_sum, WeightOrigin::Volumes));
            }
            if pct > tolerance_pct {
                warn!(
                    item_sum = %item_sum,
                    volume_sum = %volume_sum,
                    pct = %pct.round_dp(2),
                    "Item and volume net weights disagree beyond tolerance; keeping item sum"
                );
            }
            Ok((item_sum, WeightOrigin::Items))
        }
        (true, false) => Ok((item_sum, WeightOrigin::Items)),
        (false, true) => Ok((volume_sum, WeightOrigin::Volumes)),
        (false, false) => Ok((Decimal::ZERO, WeightOrigin::None)),
    }
}

/// Gross weight: volume gross sum, else `net * markup`, else zero.
pub fn reconcile_gross(net: Decimal, volume_gross_sum: Decimal, markup: Decimal) -> Result<(Decimal, WeightOrigin)> {
    if volume_gross_sum > Decimal::ZERO {
        return Ok((volume_gross_sum, WeightOrigin::Volumes));
    }
    if net > Decimal::ZERO {
        let gross = net
            .checked_mul(markup)
            .ok_or_else(|| EngineError::overflow("gross weight markup"))?;
        return Ok((gross, WeightOrigin::Derived));
    }
    Ok((Decimal::ZERO, WeightOrigin::None))
}

/// Aggregates resolved item weights and reconciles them against the
/// shipping volumes.
pub fn reconcile(item_weights: &[Decimal], volumes: &[VolumeWeight], settings: &EngineSettings) -> Result<DocumentWeights> {
    let item_sum = checked_sum(item_weights.iter().copied(), "item weight sum")?;
    let volume_net = checked_sum(volumes.iter().map(|v| v.net_kg), "volume net sum")?;
    let volume_gross = checked_sum(volumes.iter().map(|v| v.gross_kg), "volume gross sum")?;

    let (net, net_origin) = reconcile_net(item_sum, volume_net, settings.volume_tolerance_pct)?;
    let (gross, gross_origin) = reconcile_gross(net, volume_gross, settings.gross_markup)?;

    Ok(DocumentWeights {
        net_weight_kg: net.normalize(),
        gross_weight_kg: gross.normalize(),
        net_origin,
        gross_origin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn net(items: &str, volumes: &str) -> (Decimal, WeightOrigin) {
        reconcile_net(dec(items), dec(volumes), dec("5")).unwrap()
    }

    #[test]
    fn test_close_larger_volume_wins() {
        assert_eq!(net("100", "103"), (dec("103"), WeightOrigin::Volumes));
        assert_eq!(net("100", "105"), (dec("105"), WeightOrigin::Volumes));
    }

    #[test]
    fn test_smaller_volume_loses() {
        assert_eq!(net("100", "90"), (dec("100"), WeightOrigin::Items));
        assert_eq!(net("100", "99"), (dec("100"), WeightOrigin::Items));
    }

    #[test]
    fn test_far_larger_volume_loses() {
        assert_eq!(net("100", "150"), (dec("100"), WeightOrigin::Items));
        assert_eq!(net("100", "105.01"), (dec("100"), WeightOrigin::Items));
    }

    #[test]
    fn test_single_source() {
        assert_eq!(net("0", "12"), (dec("12"), WeightOrigin::Volumes));
        assert_eq!(net("7", "0"), (dec("7"), WeightOrigin::Items));
        assert_eq!(net("0", "0"), (Decimal::ZERO, WeightOrigin::None));
    }

    #[test]
    fn test_gross_policy() {
        let m = dec("1.035");
        assert_eq!(reconcile_gross(dec("40"), dec("0"), m).unwrap(), (dec("41.4"), WeightOrigin::Derived));
        assert_eq!(reconcile_gross(dec("40"), dec("44"), m).unwrap(), (dec("44"), WeightOrigin::Volumes));
        assert_eq!(reconcile_gross(dec("0"), dec("0"), m).unwrap(), (Decimal::ZERO, WeightOrigin::None));
    }

    #[test]
    fn test_reconcile_sums_items_and_volumes() {
        let volumes = [
            VolumeWeight { net_kg: dec("50"), gross_kg: dec("52") },
            VolumeWeight { net_kg: dec("53"), gross_kg: dec("55") },
        ];
        let w = reconcile(&[dec("60"), dec("40")], &volumes, &EngineSettings::default()).unwrap();
        assert_eq!(w.net_weight_kg, dec("103"));
        assert_eq!(w.gross_weight_kg, dec("107"));
        assert_eq!((w.net_origin, w.gross_origin), (WeightOrigin::Volumes, WeightOrigin::Volumes));
    }

    #[test]
    fn test_reconcile_without_volumes() {
        let w = reconcile(&[dec("10")], &[], &EngineSettings::default()).unwrap();
        assert_eq!(w.net_weight_kg, dec("10"));
        assert_eq!(w.gross_weight_kg, dec("10.35"));
        assert_eq!(w.gross_origin, WeightOrigin::Derived);
    }

    #[test]
    fn test_reconcile_overflow_is_internal() {
        let err = reconcile(&[Decimal::MAX, Decimal::MAX], &[], &EngineSettings::default()).unwrap_err();
        assert!(matches!(err, EngineError::Internal(_)));
    }

    #[test]
    fn test_weights_serialize_as_numbers() {
        let w = reconcile(&[dec("10")], &[], &EngineSettings::default()).unwrap();
        let v = serde_json::to_value(w).unwrap();
        assert_eq!(v["net_weight_kg"], serde_json::json!(10.0));
        assert_eq!(v["gross_weight_kg"], serde_json::json!(10.35));
        assert_eq!(v["gross_origin"], serde_json::json!("derived"));
    }
}
