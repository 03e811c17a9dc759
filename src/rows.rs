//! Row organization: proximity grouping and row partitioning of placed units.

use geo::Rect;
use ordered_float::OrderedFloat;
use petgraph::unionfind::UnionFind;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, warn};

use crate::geometry;
use crate::{Ilot, LayoutConfig};

/// One aligned row: unit ids ordered left to right, plus the row's bounding
/// rectangle.
#[derive(Debug, Clone)]
pub struct IlotRow {
    pub ilots: Vec<usize>,
    pub bounds: Rect<f64>,
}

/// A proximity group of units, partitioned into rows ordered bottom to top.
#[derive(Debug, Clone)]
pub struct RowGroup {
    pub rows: Vec<IlotRow>,
}

/// Cluster units by spatial proximity and partition each cluster into rows.
///
/// Grouping runs union-find over an adaptive threshold derived from the
/// average unit half-extent and the extent of the whole unit cloud. Units are
/// pre-sorted before bucketing so the result is independent of input order;
/// ties break on ascending id. The pairwise loop honors the deadline: on
/// expiry the groups found so far are kept and the remainder degrade to
/// singletons.
pub fn organize(ilots: &[Ilot], config: &LayoutConfig, deadline: Option<Instant>) -> Vec<RowGroup> {
    if ilots.is_empty() {
        return Vec::new();
    }

    let threshold = proximity_threshold(ilots, config);
    let centers: Vec<_> = ilots.iter().map(|i| geometry::center(&i.bounds)).collect();

    let mut union = UnionFind::<usize>::new(ilots.len());
    let mut expired = false;

    'pairs: for i in 0..ilots.len() {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                expired = true;
                break 'pairs;
            }
        }
        for j in (i + 1)..ilots.len() {
            if geometry::distance(&centers[i], &centers[j]) <= threshold {
                union.union(i, j);
            }
        }
    }

    if expired {
        warn!("grouping deadline expired, remaining units become singleton groups");
    }

    // Members are collected in index order, so each group lists ids
    // ascending and groups sort by their smallest member.
    let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..ilots.len() {
        members.entry(union.find(i)).or_default().push(i);
    }
    let mut groups: Vec<Vec<usize>> = members.into_values().collect();
    groups.sort_by_key(|g| g[0]);

    let result: Vec<RowGroup> = groups
        .into_iter()
        .map(|group| RowGroup {
            rows: partition_rows(&group, ilots, config),
        })
        .collect();

    debug!(
        "organized {} units into {} groups / {} rows (threshold {:.2})",
        ilots.len(),
        result.len(),
        result.iter().map(|g| g.rows.len()).sum::<usize>(),
        threshold
    );

    result
}

/// Adaptive grouping distance: units within reach of each other's typical
/// half-extent, widened by a fraction of the overall cloud size.
fn proximity_threshold(ilots: &[Ilot], config: &LayoutConfig) -> f64 {
    let avg_half_extent = ilots
        .iter()
        .map(|i| i.bounds.width().max(i.bounds.height()) / 2.0)
        .sum::<f64>()
        / ilots.len() as f64;

    let cloud = ilots
        .iter()
        .skip(1)
        .fold(ilots[0].bounds, |acc, i| geometry::union(&acc, &i.bounds));
    let cloud_extent = cloud.width().max(cloud.height());

    avg_half_extent * config.group_reach_factor + cloud_extent * config.cloud_extent_fraction
}

/// First-fit bucketing on the y axis with an adaptive tolerance, then
/// left-to-right ordering within each row.
fn partition_rows(group: &[usize], ilots: &[Ilot], config: &LayoutConfig) -> Vec<IlotRow> {
    let avg_height = group
        .iter()
        .map(|&i| ilots[i].bounds.height())
        .sum::<f64>()
        / group.len() as f64;
    let tolerance = avg_height * config.row_tolerance_factor;

    let mut ordered: Vec<usize> = group.to_vec();
    ordered.sort_by_key(|&i| {
        let c = geometry::center(&ilots[i].bounds);
        (OrderedFloat(c.y), OrderedFloat(c.x), ilots[i].id)
    });

    // Buckets carry a running mean y; a unit joins the first bucket within
    // tolerance of that mean, else opens a new one.
    let mut buckets: Vec<(f64, Vec<usize>)> = Vec::new();
    for &i in &ordered {
        let cy = geometry::center(&ilots[i].bounds).y;
        match buckets
            .iter_mut()
            .find(|(sum, members)| (cy - sum / members.len() as f64).abs() <= tolerance)
        {
            Some((sum, members)) => {
                *sum += cy;
                members.push(i);
            }
            None => buckets.push((cy, vec![i])),
        }
    }

    let mut rows: Vec<IlotRow> = buckets
        .into_iter()
        .map(|(_, mut members)| {
            members.sort_by_key(|&i| {
                let c = geometry::center(&ilots[i].bounds);
                (OrderedFloat(c.x), ilots[i].id)
            });
            let bounds = members
                .iter()
                .skip(1)
                .fold(ilots[members[0]].bounds, |acc, &i| {
                    geometry::union(&acc, &ilots[i].bounds)
                });
            IlotRow {
                ilots: members.iter().map(|&i| ilots[i].id).collect(),
                bounds,
            }
        })
        .collect();

    rows.sort_by_key(|row| OrderedFloat(row.bounds.center().y));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SizeClass;

    fn ilot(id: usize, x: f64, y: f64) -> Ilot {
        Ilot {
            id,
            bounds: geometry::rect(x, y, x + 1.6, y + 1.2),
            area: 1.92,
            size_class: SizeClass::Medium,
            label: format!("Ilot {}", id + 1),
        }
    }

    #[test]
    fn grid_of_units_forms_one_group_with_rows() {
        let mut ilots = Vec::new();
        for row in 0..3 {
            for col in 0..4 {
                ilots.push(ilot(ilots.len(), col as f64 * 3.3, row as f64 * 2.9));
            }
        }

        let groups = organize(&ilots, &LayoutConfig::default(), None);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].rows.len(), 3);
        for row in &groups[0].rows {
            assert_eq!(row.ilots.len(), 4);
        }
    }

    #[test]
    fn distant_clusters_form_separate_groups() {
        let ilots = vec![
            ilot(0, 0.0, 0.0),
            ilot(1, 3.3, 0.0),
            ilot(2, 50.0, 0.0),
            ilot(3, 53.3, 0.0),
        ];

        let groups = organize(&ilots, &LayoutConfig::default(), None);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].rows[0].ilots, vec![0, 1]);
        assert_eq!(groups[1].rows[0].ilots, vec![2, 3]);
    }

    #[test]
    fn rows_are_ordered_bottom_to_top_and_left_to_right() {
        let ilots = vec![
            ilot(0, 3.3, 2.9),
            ilot(1, 0.0, 2.9),
            ilot(2, 3.3, 0.0),
            ilot(3, 0.0, 0.0),
        ];

        let groups = organize(&ilots, &LayoutConfig::default(), None);

        assert_eq!(groups.len(), 1);
        let rows = &groups[0].rows;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ilots, vec![3, 2]);
        assert_eq!(rows[1].ilots, vec![1, 0]);
    }

    #[test]
    fn result_is_independent_of_input_order() {
        let forward = vec![ilot(0, 0.0, 0.0), ilot(1, 3.3, 0.0), ilot(2, 0.0, 2.9)];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = organize(&forward, &LayoutConfig::default(), None);
        let b = organize(&reversed, &LayoutConfig::default(), None);

        let rows_a: Vec<Vec<usize>> = a.iter().flat_map(|g| g.rows.iter().map(|r| r.ilots.clone())).collect();
        let rows_b: Vec<Vec<usize>> = b.iter().flat_map(|g| g.rows.iter().map(|r| r.ilots.clone())).collect();
        assert_eq!(rows_a, rows_b);
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(organize(&[], &LayoutConfig::default(), None).is_empty());
    }

    #[test]
    fn expired_deadline_degrades_to_singletons() {
        let ilots = vec![ilot(0, 0.0, 0.0), ilot(1, 3.3, 0.0)];
        let past = Instant::now() - std::time::Duration::from_millis(1);

        let groups = organize(&ilots, &LayoutConfig::default(), Some(past));

        // No pair was examined, so each unit stands alone.
        assert_eq!(groups.len(), 2);
    }
}
