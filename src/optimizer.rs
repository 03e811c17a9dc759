//! Corridor optimization: spanning-tree redundancy removal, adjacency merge,
//! and width normalization. Unit-id connectivity established before the first
//! step is never reduced by any step.

use nalgebra::{Point2, Vector2};
use ordered_float::OrderedFloat;
use petgraph::unionfind::UnionFind;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::geometry;
use crate::{Corridor, Ilot, LayoutConfig, Zone};

/// Run all three optimization steps in order.
pub fn optimize(
    corridors: Vec<Corridor>,
    ilots: &[Ilot],
    zones: &[Zone],
    config: &LayoutConfig,
) -> Vec<Corridor> {
    let before = corridors.len();
    let kept = remove_redundant(corridors, ilots);
    let merged = merge_adjacent(kept, zones, config);
    let normalized = normalize_widths(merged, zones, config);

    info!(
        "optimized corridors: {} -> {}",
        before,
        normalized.len()
    );
    normalized
}

/// Step 1: keep a corridor iff it joins at least two still-separate
/// components of the unit graph, processing shortest first. A Kruskal-style
/// reduction over hyperedges: unioning every id of a kept corridor preserves
/// exactly the reachability the full set established.
pub fn remove_redundant(corridors: Vec<Corridor>, ilots: &[Ilot]) -> Vec<Corridor> {
    if corridors.is_empty() {
        return corridors;
    }

    let index: HashMap<usize, usize> = ilots
        .iter()
        .enumerate()
        .map(|(dense, ilot)| (ilot.id, dense))
        .collect();
    let mut union = UnionFind::<usize>::new(ilots.len());

    let mut ordered = corridors;
    ordered.sort_by_key(|c| (OrderedFloat(c.length), c.id));

    let mut kept = Vec::new();
    for corridor in ordered {
        let members: Vec<usize> = corridor
            .connected
            .iter()
            .filter_map(|id| index.get(id).copied())
            .collect();

        if members.len() < 2 {
            debug!("corridor {} connects fewer than two units, dropped", corridor.id);
            continue;
        }

        let mut joined = false;
        for &other in &members[1..] {
            if union.union(members[0], other) {
                joined = true;
            }
        }

        if joined {
            kept.push(corridor);
        } else {
            debug!("corridor {} redundant, dropped", corridor.id);
        }
    }

    // Restore emission order so later steps stay deterministic.
    kept.sort_by_key(|c| c.id);
    kept
}

/// Step 2: repeatedly combine corridor pairs whose center-line endpoints
/// coincide, whose widths match, and whose directions are near-parallel. The
/// combined extent must stay clear of obstacle zones; a pair whose union
/// would conflict is simply left unmerged.
pub fn merge_adjacent(
    mut corridors: Vec<Corridor>,
    zones: &[Zone],
    config: &LayoutConfig,
) -> Vec<Corridor> {
    let obstacles: Vec<&Zone> = zones.iter().filter(|z| z.kind.is_obstacle()).collect();

    loop {
        let mut merged_at: Option<(usize, usize)> = None;

        'search: for i in 0..corridors.len() {
            for j in (i + 1)..corridors.len() {
                if !can_merge(&corridors[i], &corridors[j], config) {
                    continue;
                }
                let combined = geometry::union(&corridors[i].bounds, &corridors[j].bounds);
                if obstacles
                    .iter()
                    .any(|z| geometry::overlaps(&combined, &z.bounds))
                {
                    continue;
                }
                merged_at = Some((i, j));
                break 'search;
            }
        }

        let Some((i, j)) = merged_at else {
            break;
        };

        let absorbed = corridors.remove(j);
        let target = &mut corridors[i];
        target.bounds = geometry::union(&target.bounds, &absorbed.bounds);
        target.width = target.width.max(absorbed.width);
        target.length = target.bounds.width().max(target.bounds.height());
        target.connected.extend(absorbed.connected);
        debug!("merged corridor {} into {}", absorbed.id, target.id);
    }

    corridors
}

fn can_merge(a: &Corridor, b: &Corridor, config: &LayoutConfig) -> bool {
    if (a.width - b.width).abs() > config.merge_width_tolerance {
        return false;
    }

    let (Some(dir_a), Some(dir_b)) = (direction(a), direction(b)) else {
        return false;
    };
    if dir_a.dot(&dir_b).abs() <= config.merge_direction_dot {
        return false;
    }

    let (a1, a2) = endpoints(a);
    let (b1, b2) = endpoints(b);
    let tol = config.merge_endpoint_tolerance;

    geometry::distance(&a1, &b1) <= tol
        || geometry::distance(&a1, &b2) <= tol
        || geometry::distance(&a2, &b1) <= tol
        || geometry::distance(&a2, &b2) <= tol
}

/// Center-line endpoints along the corridor's major axis.
fn endpoints(c: &Corridor) -> (Point2<f64>, Point2<f64>) {
    let center = geometry::center(&c.bounds);
    if c.bounds.width() >= c.bounds.height() {
        (
            Point2::new(c.bounds.min().x, center.y),
            Point2::new(c.bounds.max().x, center.y),
        )
    } else {
        (
            Point2::new(center.x, c.bounds.min().y),
            Point2::new(center.x, c.bounds.max().y),
        )
    }
}

fn direction(c: &Corridor) -> Option<Vector2<f64>> {
    let (start, end) = endpoints(c);
    let d = end - start;
    if d.norm() < geometry::EPSILON {
        return None;
    }
    Some(d.normalize())
}

/// Step 3: snap widths near the modal rounded width to the mode exactly.
/// Resizing happens about the center line; a snap that would create an
/// obstacle overlap is skipped so zone disjointness survives. Applying the
/// step to its own output changes nothing.
pub fn normalize_widths(
    mut corridors: Vec<Corridor>,
    zones: &[Zone],
    config: &LayoutConfig,
) -> Vec<Corridor> {
    let Some(mode) = modal_width(&corridors) else {
        return corridors;
    };
    let obstacles: Vec<&Zone> = zones.iter().filter(|z| z.kind.is_obstacle()).collect();

    for corridor in &mut corridors {
        let delta = corridor.width - mode;
        if delta.abs() < geometry::EPSILON || delta.abs() > config.width_snap_tolerance {
            continue;
        }

        let resized = resize_cross_axis(&corridor.bounds, mode);
        if obstacles.iter().any(|z| geometry::overlaps(&resized, &z.bounds)) {
            debug!(
                "width snap for corridor {} skipped, would conflict with a zone",
                corridor.id
            );
            continue;
        }

        corridor.bounds = resized;
        corridor.width = mode;
    }

    corridors
}

/// Most common width after rounding to 0.1 m; the smaller width wins ties.
fn modal_width(corridors: &[Corridor]) -> Option<f64> {
    let mut counts: BTreeMap<OrderedFloat<f64>, usize> = BTreeMap::new();
    for c in corridors {
        let key = OrderedFloat((c.width * 10.0).round() / 10.0);
        *counts.entry(key).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .max_by_key(|&(key, count)| (count, std::cmp::Reverse(key)))
        .map(|(key, _)| key.into_inner())
}

fn resize_cross_axis(bounds: &geo::Rect<f64>, width: f64) -> geo::Rect<f64> {
    let center = bounds.center();
    if bounds.width() >= bounds.height() {
        geometry::rect(
            bounds.min().x,
            center.y - width / 2.0,
            bounds.max().x,
            center.y + width / 2.0,
        )
    } else {
        geometry::rect(
            center.x - width / 2.0,
            bounds.min().y,
            center.x + width / 2.0,
            bounds.max().y,
        )
    }
}

/// Component label per unit id, derived from corridor membership. Two units
/// share a label iff the corridor graph connects them. Used to verify the
/// connectivity-preservation guarantee.
pub fn connectivity_labels(corridors: &[Corridor], ilots: &[Ilot]) -> BTreeMap<usize, usize> {
    let index: HashMap<usize, usize> = ilots
        .iter()
        .enumerate()
        .map(|(dense, ilot)| (ilot.id, dense))
        .collect();
    let mut union = UnionFind::<usize>::new(ilots.len());

    for corridor in corridors {
        let members: Vec<usize> = corridor
            .connected
            .iter()
            .filter_map(|id| index.get(id).copied())
            .collect();
        for &other in members.iter().skip(1) {
            union.union(members[0], other);
        }
    }

    // Canonical labels: the smallest unit id of each component.
    let mut canonical: HashMap<usize, usize> = HashMap::new();
    let mut labels = BTreeMap::new();
    for ilot in ilots {
        let root = union.find(index[&ilot.id]);
        let label = *canonical.entry(root).or_insert(ilot.id);
        labels.insert(ilot.id, label);
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CorridorKind, SizeClass};
    use std::collections::BTreeSet;

    fn ilot(id: usize, x: f64, y: f64) -> Ilot {
        Ilot {
            id,
            bounds: geometry::rect(x, y, x + 1.6, y + 1.2),
            area: 1.92,
            size_class: SizeClass::Medium,
            label: format!("Ilot {}", id + 1),
        }
    }

    fn corridor(id: usize, x1: f64, y1: f64, x2: f64, y2: f64, ids: &[usize]) -> Corridor {
        let bounds = geometry::rect(x1, y1, x2, y2);
        Corridor {
            id,
            bounds,
            width: bounds.width().min(bounds.height()),
            length: bounds.width().max(bounds.height()),
            connected: ids.iter().copied().collect(),
            kind: CorridorKind::BetweenRows,
        }
    }

    #[test]
    fn redundant_corridor_is_dropped() {
        let ilots = vec![ilot(0, 0.0, 0.0), ilot(1, 5.0, 0.0), ilot(2, 10.0, 0.0)];
        let corridors = vec![
            corridor(0, 0.0, 2.0, 5.0, 3.2, &[0, 1]),
            corridor(1, 5.0, 2.0, 10.0, 3.2, &[1, 2]),
            // Longer corridor duplicating already-established connectivity.
            corridor(2, 0.0, 4.0, 12.0, 5.2, &[0, 2]),
        ];

        let kept = remove_redundant(corridors, &ilots);

        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|c| c.id != 2));
    }

    #[test]
    fn connectivity_survives_redundancy_removal() {
        let ilots: Vec<Ilot> = (0..5).map(|i| ilot(i, i as f64 * 4.0, 0.0)).collect();
        let corridors = vec![
            corridor(0, 0.0, 2.0, 4.0, 3.2, &[0, 1]),
            corridor(1, 4.0, 2.0, 8.0, 3.2, &[1, 2]),
            corridor(2, 0.0, 4.0, 8.0, 5.2, &[0, 2]),
            corridor(3, 12.0, 2.0, 16.0, 3.2, &[3, 4]),
        ];

        let before = connectivity_labels(&corridors, &ilots);
        let kept = remove_redundant(corridors, &ilots);
        let after = connectivity_labels(&kept, &ilots);

        assert_eq!(before, after);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn single_unit_corridor_is_dropped() {
        let ilots = vec![ilot(0, 0.0, 0.0)];
        let corridors = vec![corridor(0, 0.0, 2.0, 4.0, 3.2, &[0])];

        assert!(remove_redundant(corridors, &ilots).is_empty());
    }

    #[test]
    fn colinear_touching_corridors_merge() {
        let corridors = vec![
            corridor(0, 0.0, 0.0, 5.0, 1.2, &[0, 1]),
            corridor(1, 5.0, 0.0, 10.0, 1.2, &[1, 2]),
        ];

        let merged = merge_adjacent(corridors, &[], &LayoutConfig::default());

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].bounds.width(), 10.0);
        assert_eq!(merged[0].connected, BTreeSet::from([0, 1, 2]));
        assert_eq!(merged[0].length, 10.0);
    }

    #[test]
    fn perpendicular_corridors_do_not_merge() {
        let corridors = vec![
            corridor(0, 0.0, 0.0, 5.0, 1.2, &[0, 1]),
            corridor(1, 5.0, 0.6, 6.2, 6.0, &[1, 2]),
        ];

        let merged = merge_adjacent(corridors, &[], &LayoutConfig::default());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn width_mismatch_blocks_merge() {
        let corridors = vec![
            corridor(0, 0.0, 0.0, 5.0, 1.2, &[0, 1]),
            corridor(1, 5.0, 0.0, 10.0, 2.0, &[1, 2]),
        ];

        let merged = merge_adjacent(corridors, &[], &LayoutConfig::default());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn widths_snap_to_the_mode() {
        let corridors = vec![
            corridor(0, 0.0, 0.0, 5.0, 1.2, &[0, 1]),
            corridor(1, 0.0, 3.0, 5.0, 4.2, &[1, 2]),
            corridor(2, 0.0, 6.0, 5.0, 7.3, &[2, 3]),
        ];

        let normalized = normalize_widths(corridors, &[], &LayoutConfig::default());

        assert!(normalized.iter().all(|c| (c.width - 1.2).abs() < 1e-9));
    }

    #[test]
    fn outlier_width_is_left_untouched() {
        let corridors = vec![
            corridor(0, 0.0, 0.0, 5.0, 1.2, &[0, 1]),
            corridor(1, 0.0, 3.0, 5.0, 4.2, &[1, 2]),
            corridor(2, 0.0, 6.0, 5.0, 8.0, &[2, 3]),
        ];

        let normalized = normalize_widths(corridors, &[], &LayoutConfig::default());

        assert!((normalized[2].width - 2.0).abs() < 1e-9);
    }

    #[test]
    fn width_normalization_is_idempotent() {
        let corridors = vec![
            corridor(0, 0.0, 0.0, 5.0, 1.2, &[0, 1]),
            corridor(1, 0.0, 3.0, 5.0, 4.2, &[1, 2]),
            corridor(2, 0.0, 6.0, 5.0, 7.3, &[2, 3]),
        ];
        let config = LayoutConfig::default();

        let once = normalize_widths(corridors, &[], &config);
        let twice = normalize_widths(once.clone(), &[], &config);

        for (a, b) in once.iter().zip(&twice) {
            assert_eq!(a.width, b.width);
            assert_eq!(a.bounds.min(), b.bounds.min());
            assert_eq!(a.bounds.max(), b.bounds.max());
        }
    }

    #[test]
    fn full_optimization_preserves_connectivity() {
        let ilots: Vec<Ilot> = (0..6).map(|i| ilot(i, i as f64 * 4.0, 0.0)).collect();
        let corridors = vec![
            corridor(0, 0.0, 2.0, 4.0, 3.2, &[0, 1]),
            corridor(1, 4.0, 2.0, 8.0, 3.2, &[1, 2]),
            corridor(2, 0.0, 4.0, 8.0, 5.2, &[0, 2]),
            corridor(3, 12.0, 2.0, 16.0, 3.2, &[3, 4]),
            corridor(4, 12.0, 4.0, 16.0, 5.3, &[3, 4]),
        ];

        let before = connectivity_labels(&corridors, &ilots);
        let optimized = optimize(corridors, &ilots, &[], &LayoutConfig::default());
        let after = connectivity_labels(&optimized, &ilots);

        assert_eq!(before, after);
        // Unit 5 was never connected; it must still be its own component.
        assert_eq!(after[&5], 5);
    }
}
