//! Area aggregation and the efficiency ratio.

use serde::{Deserialize, Serialize};

use crate::geometry;
use crate::{Corridor, Ilot, Zone, ZoneKind};

/// Efficiency ratio, or the explicit signal that the denominator
/// (usable minus corridor area) was not positive. Never a silent zero or NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum EfficiencyRatio {
    Valid(f64),
    Invalid,
}

impl EfficiencyRatio {
    pub fn value(&self) -> Option<f64> {
        match self {
            EfficiencyRatio::Valid(v) => Some(*v),
            EfficiencyRatio::Invalid => None,
        }
    }
}

/// Aggregated areas of one layout.
#[derive(Debug, Clone, Copy)]
pub struct Metrics {
    pub total_usable_area: f64,
    pub total_ilot_area: f64,
    pub total_corridor_area: f64,
    pub efficiency_ratio: EfficiencyRatio,
}

/// Sum the areas and compute the efficiency ratio. Usable area is taken
/// before corridor subtraction; corridor area is length times width over the
/// final set.
pub fn compute(zones: &[Zone], ilots: &[Ilot], corridors: &[Corridor]) -> Metrics {
    let total_usable_area: f64 = zones
        .iter()
        .filter(|z| z.kind == ZoneKind::Usable)
        .map(|z| geometry::area(&z.bounds))
        .sum();
    let total_ilot_area: f64 = ilots.iter().map(|i| i.area).sum();
    let total_corridor_area: f64 = corridors.iter().map(|c| c.length * c.width).sum();

    let denominator = total_usable_area - total_corridor_area;
    let efficiency_ratio = if denominator > 0.0 {
        EfficiencyRatio::Valid(total_ilot_area / denominator)
    } else {
        EfficiencyRatio::Invalid
    };

    Metrics {
        total_usable_area,
        total_ilot_area,
        total_corridor_area,
        efficiency_ratio,
    }
}
