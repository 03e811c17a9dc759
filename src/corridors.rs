//! Corridor synthesis: facing-row corridors, row-end access corridors, and
//! link segments for isolated units.

use geo::Rect;
use nalgebra::Point2;
use ordered_float::OrderedFloat;
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::geometry;
use crate::rows::RowGroup;
use crate::{Corridor, CorridorKind, Ilot, LayoutConfig, Zone};

/// Emit the un-optimized corridor set for the given row groups.
///
/// Corridors conflicting with a wall, restricted, or entrance zone are
/// discarded rather than re-routed; access corridors additionally must not
/// overlap any unit. Units left out of every corridor's connected set stay
/// isolated and are surfaced by the engine as unreached.
pub fn synthesize(
    groups: &[RowGroup],
    ilots: &[Ilot],
    zones: &[Zone],
    config: &LayoutConfig,
) -> Vec<Corridor> {
    let obstacles: Vec<&Zone> = zones.iter().filter(|z| z.kind.is_obstacle()).collect();
    let width = config.corridor_width;
    let mut corridors: Vec<Corridor> = Vec::new();
    let mut discarded = 0usize;

    for group in groups {
        // Corridors between vertically adjacent row pairs.
        for pair in group.rows.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            let gap = upper.bounds.min().y - lower.bounds.max().y;
            if gap < config.facing_gap_min_factor * width
                || gap > config.facing_gap_max_factor * width
            {
                continue;
            }

            let overlap_min = lower.bounds.min().x.max(upper.bounds.min().x);
            let overlap_max = lower.bounds.max().x.min(upper.bounds.max().x);
            let overlap = overlap_max - overlap_min;
            let narrower = lower.bounds.width().min(upper.bounds.width());

            let (bounds, kind) = if overlap >= config.facing_overlap_fraction * narrower {
                let mid = lower.bounds.max().y + gap / 2.0;
                (
                    geometry::rect(overlap_min, mid - width / 2.0, overlap_max, mid + width / 2.0),
                    CorridorKind::BetweenRows,
                )
            } else if overlap <= 0.0 {
                // Rows without horizontal overlap get a straight segment
                // between centers, standing in for an L-shaped path.
                (
                    segment_rect(
                        &geometry::center(&lower.bounds),
                        &geometry::center(&upper.bounds),
                        width,
                    ),
                    CorridorKind::Link,
                )
            } else {
                continue;
            };

            let connected: BTreeSet<usize> =
                lower.ilots.iter().chain(upper.ilots.iter()).copied().collect();

            if conflicts_with_zones(&bounds, &obstacles) {
                discarded += 1;
                debug!("row-pair corridor discarded on zone conflict");
                continue;
            }
            push_corridor(&mut corridors, bounds, width, connected, kind);
        }

        // Perpendicular access corridors at both ends of multi-unit rows.
        for row in group.rows.iter().filter(|r| r.ilots.len() >= 2) {
            let b = &row.bounds;
            let ends = [
                geometry::rect(b.min().x - width, b.min().y, b.min().x, b.max().y),
                geometry::rect(b.max().x, b.min().y, b.max().x + width, b.max().y),
            ];

            for bounds in ends {
                if conflicts_with_zones(&bounds, &obstacles)
                    || ilots.iter().any(|i| geometry::overlaps(&bounds, &i.bounds))
                {
                    discarded += 1;
                    debug!("access corridor discarded on conflict");
                    continue;
                }
                let connected: BTreeSet<usize> = row.ilots.iter().copied().collect();
                push_corridor(&mut corridors, bounds, width, connected, CorridorKind::Access);
            }
        }
    }

    connect_isolated(&mut corridors, ilots, &obstacles, width, &mut discarded);

    info!(
        "synthesized {} corridors ({} discarded on conflict)",
        corridors.len(),
        discarded
    );

    corridors
}

/// Link every unit absent from the corridor network to its nearest corridor
/// midpoint or nearest other unit, whichever is closer. Membership is
/// re-evaluated as links land, so the partner of a fresh link is covered.
fn connect_isolated(
    corridors: &mut Vec<Corridor>,
    ilots: &[Ilot],
    obstacles: &[&Zone],
    width: f64,
    discarded: &mut usize,
) {
    for ilot in ilots {
        let already_connected = corridors.iter().any(|c| c.connected.contains(&ilot.id));
        if already_connected {
            continue;
        }

        let center = geometry::center(&ilot.bounds);

        let nearest_corridor = corridors
            .iter()
            .min_by_key(|c| OrderedFloat(geometry::distance(&center, &geometry::center(&c.bounds))));
        let nearest_ilot = ilots
            .iter()
            .filter(|other| other.id != ilot.id)
            .min_by_key(|other| {
                OrderedFloat(geometry::distance(&center, &geometry::center(&other.bounds)))
            });

        // Target: whichever anchor is closer. The link inherits the anchor's
        // connectivity so one segment attaches the unit to the network.
        let (target, basis) = match (nearest_corridor, nearest_ilot) {
            (Some(c), Some(i)) => {
                let dc = geometry::distance(&center, &geometry::center(&c.bounds));
                let di = geometry::distance(&center, &geometry::center(&i.bounds));
                if dc <= di {
                    (geometry::center(&c.bounds), c.connected.clone())
                } else {
                    (geometry::center(&i.bounds), BTreeSet::from([i.id]))
                }
            }
            (Some(c), None) => (geometry::center(&c.bounds), c.connected.clone()),
            (None, Some(i)) => (geometry::center(&i.bounds), BTreeSet::from([i.id])),
            (None, None) => continue,
        };

        let bounds = segment_rect(&center, &target, width);
        if conflicts_with_zones(&bounds, obstacles) {
            *discarded += 1;
            debug!("link for unit {} discarded on zone conflict", ilot.id);
            continue;
        }

        let mut connected = basis;
        connected.insert(ilot.id);
        push_corridor(corridors, bounds, width, connected, CorridorKind::Link);
    }
}

fn push_corridor(
    corridors: &mut Vec<Corridor>,
    bounds: Rect<f64>,
    width: f64,
    connected: BTreeSet<usize>,
    kind: CorridorKind,
) {
    let id = corridors.len();
    corridors.push(Corridor {
        id,
        bounds,
        width,
        length: bounds.width().max(bounds.height()),
        connected,
        kind,
    });
}

/// Straight segment between two points, oriented along the dominant
/// displacement axis, with the given cross width.
fn segment_rect(a: &Point2<f64>, b: &Point2<f64>, width: f64) -> Rect<f64> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;

    if dx.abs() >= dy.abs() {
        let y = (a.y + b.y) / 2.0;
        geometry::rect(a.x.min(b.x), y - width / 2.0, a.x.max(b.x), y + width / 2.0)
    } else {
        let x = (a.x + b.x) / 2.0;
        geometry::rect(x - width / 2.0, a.y.min(b.y), x + width / 2.0, a.y.max(b.y))
    }
}

fn conflicts_with_zones(bounds: &Rect<f64>, obstacles: &[&Zone]) -> bool {
    obstacles.iter().any(|z| geometry::overlaps(bounds, &z.bounds))
}
