//! Cosmetic display post-pass.
//!
//! The placement result stays authoritative; this module derives a
//! display-facing copy with jittered areas and proximity-based color
//! intensity. Geometry, overlap status, and connectivity are never touched,
//! so correctness tests have no reason to look here.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::geometry;
use crate::{Ilot, Zone};

/// Display-facing copy of one unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayIlot {
    pub id: usize,
    pub label: String,
    /// 90 to 100 percent of the true area, for label rendering.
    pub display_area: f64,
    /// 0 (far from every obstacle) to 1 (touching one).
    pub color_intensity: f64,
}

/// The display-adjusted variant of a placement result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayAdjustedResult {
    pub units: Vec<DisplayIlot>,
}

/// Pure transform from placed units to their display representation.
pub fn adjust_for_display(ilots: &[Ilot], zones: &[Zone]) -> DisplayAdjustedResult {
    let obstacles: Vec<&Zone> = zones.iter().filter(|z| z.kind.is_obstacle()).collect();

    let distances: Vec<f64> = ilots
        .iter()
        .map(|ilot| nearest_obstacle_distance(&geometry::center(&ilot.bounds), &obstacles))
        .collect();
    let max_distance = distances.iter().cloned().fold(0.0_f64, f64::max);

    let units = ilots
        .iter()
        .zip(&distances)
        .map(|(ilot, distance)| {
            let intensity = if max_distance > 0.0 {
                (1.0 - distance / max_distance).clamp(0.0, 1.0)
            } else {
                1.0
            };
            DisplayIlot {
                id: ilot.id,
                label: ilot.label.clone(),
                display_area: ilot.area * area_jitter(ilot.id),
                color_intensity: intensity,
            }
        })
        .collect();

    DisplayAdjustedResult { units }
}

/// Deterministic factor in [0.9, 1.0], keyed by unit id through a linear
/// congruential step.
fn area_jitter(id: usize) -> f64 {
    let mut state = (id as u64).wrapping_add(0x9e37_79b9_7f4a_7c15);
    state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
    0.9 + unit * 0.1
}

fn nearest_obstacle_distance(center: &Point2<f64>, obstacles: &[&Zone]) -> f64 {
    let best = obstacles
        .iter()
        .map(|z| geometry::distance_to_rect(center, &z.bounds))
        .fold(f64::INFINITY, f64::min);
    if best.is_finite() {
        best
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SizeClass, ZoneKind};

    fn ilot(id: usize, x: f64, y: f64) -> Ilot {
        Ilot {
            id,
            bounds: geometry::rect(x, y, x + 1.6, y + 1.2),
            area: 1.92,
            size_class: SizeClass::Medium,
            label: format!("Ilot {}", id + 1),
        }
    }

    fn wall(x1: f64, y1: f64, x2: f64, y2: f64) -> Zone {
        Zone {
            kind: ZoneKind::Wall,
            bounds: geometry::rect(x1, y1, x2, y2),
            door_swing: None,
        }
    }

    #[test]
    fn display_area_stays_within_jitter_band() {
        let ilots = vec![ilot(0, 0.0, 0.0), ilot(1, 5.0, 0.0), ilot(2, 10.0, 0.0)];
        let result = adjust_for_display(&ilots, &[]);

        for (unit, source) in result.units.iter().zip(&ilots) {
            assert!(unit.display_area >= source.area * 0.9 - 1e-9);
            assert!(unit.display_area <= source.area + 1e-9);
        }
    }

    #[test]
    fn transform_is_deterministic() {
        let ilots = vec![ilot(0, 0.0, 0.0), ilot(1, 5.0, 0.0)];
        let zones = vec![wall(-1.0, 0.0, -0.5, 10.0)];

        let a = adjust_for_display(&ilots, &zones);
        let b = adjust_for_display(&ilots, &zones);

        for (x, y) in a.units.iter().zip(&b.units) {
            assert_eq!(x.display_area, y.display_area);
            assert_eq!(x.color_intensity, y.color_intensity);
        }
    }

    #[test]
    fn intensity_tracks_obstacle_proximity() {
        let ilots = vec![ilot(0, 0.0, 0.0), ilot(1, 12.0, 0.0)];
        let zones = vec![wall(-1.0, 0.0, -0.5, 10.0)];
        let result = adjust_for_display(&ilots, &zones);

        // The unit nearer the wall renders hotter.
        assert!(result.units[0].color_intensity > result.units[1].color_intensity);
    }

    #[test]
    fn source_geometry_is_untouched() {
        let ilots = vec![ilot(0, 0.0, 0.0)];
        let before = ilots[0].bounds;
        let _ = adjust_for_display(&ilots, &[]);

        assert_eq!(ilots[0].bounds.min(), before.min());
        assert_eq!(ilots[0].bounds.max(), before.max());
        assert_eq!(ilots[0].area, 1.92);
    }
}
