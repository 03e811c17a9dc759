//! Placement-and-connectivity engine for floor plans.
//!
//! The engine consumes a geometry snapshot produced by an external CAD/PDF
//! ingestion collaborator, classifies its entities into typed zones, packs
//! rectangular occupancy units ("îlots") into the usable area under a target
//! density, synthesizes a corridor network connecting the units, reduces the
//! network to a connectivity-preserving minimum, and reports area metrics.
//!
//! The computation is synchronous, single threaded, and deterministic: the
//! same snapshot and configuration always produce the same layout. It never
//! fails; malformed or infeasible input degrades to a partial or empty, still
//! internally consistent [`Layout`].

use geo::Rect;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub mod corridors;
pub mod display;
pub mod engine;
pub mod geometry;
pub mod metrics;
pub mod optimizer;
pub mod placement;
pub mod rows;
pub mod snapshot;
pub mod zones;

pub use engine::LayoutEngine;
pub use metrics::EfficiencyRatio;
pub use snapshot::GeometrySnapshot;

// Input hygiene limits. Entities outside these bounds are skipped, never fatal.
pub(crate) const MAX_COORDINATE_VALUE: f64 = 1_000_000.0;
pub(crate) const MIN_COORDINATE_VALUE: f64 = -1_000_000.0;

/// Zone classification, in placement-priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Wall,
    Restricted,
    Entrance,
    Usable,
}

impl ZoneKind {
    /// Walls, restricted areas, and entrances all exclude placement.
    pub fn is_obstacle(&self) -> bool {
        !matches!(self, ZoneKind::Usable)
    }
}

/// Door-swing arc captured from an entrance entity, kept for rendering
/// collaborators. Angles are in degrees, as the ingestion side emits them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DoorSwing {
    pub center: geo::Coord<f64>,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
}

/// A typed rectangular region of the floor plan. Produced once per run by the
/// zone classifier and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub kind: ZoneKind,
    pub bounds: Rect<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub door_swing: Option<DoorSwing>,
}

/// Size vocabulary for placed units. The catalog in [`placement`] is the only
/// source of concrete dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

/// A placed occupancy unit. Geometry is fixed at placement time; only the
/// display post-pass derives cosmetic values, and it works on a copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ilot {
    pub id: usize,
    pub bounds: Rect<f64>,
    pub area: f64,
    pub size_class: SizeClass,
    pub label: String,
}

/// Origin of a corridor, for inspection only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorridorKind {
    /// Emitted between two facing rows.
    BetweenRows,
    /// Perpendicular corridor at a row end.
    Access,
    /// Minimal segment connecting an otherwise isolated unit or two row
    /// centers without horizontal overlap.
    Link,
}

/// A fixed-width connecting rectangle. `length` is the extent along the
/// corridor's major axis; `connected` holds the ids of every unit the
/// corridor serves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Corridor {
    pub id: usize,
    pub bounds: Rect<f64>,
    pub width: f64,
    pub length: f64,
    pub connected: BTreeSet<usize>,
    pub kind: CorridorKind,
}

/// Aggregate result of one engine run. Built once, immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layout {
    pub zones: Vec<Zone>,
    pub ilots: Vec<Ilot>,
    pub corridors: Vec<Corridor>,
    pub total_usable_area: f64,
    pub total_ilot_area: f64,
    pub total_corridor_area: f64,
    pub efficiency_ratio: EfficiencyRatio,
    /// Units absent from every corridor's connected set. A distinct,
    /// inspectable condition rather than a silent gap.
    pub unreached_ilots: Vec<usize>,
}

impl Layout {
    /// The layout returned for empty or malformed geometry.
    pub fn empty() -> Self {
        Layout {
            zones: Vec::new(),
            ilots: Vec::new(),
            corridors: Vec::new(),
            total_usable_area: 0.0,
            total_ilot_area: 0.0,
            total_corridor_area: 0.0,
            efficiency_ratio: EfficiencyRatio::Invalid,
            unreached_ilots: Vec::new(),
        }
    }
}

/// Every tunable constant of the pipeline, deserializable from caller
/// configuration. Defaults reproduce the reference behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Corridor width in meters. Recommended range [0.8, 2.0].
    #[serde(default = "default_corridor_width")]
    pub corridor_width: f64,
    /// Target unit density over usable area, in (0, 1].
    #[serde(default = "default_target_density")]
    pub target_density: f64,
    /// Minimum clearance added to the grid pitch between units.
    #[serde(default = "default_min_clearance")]
    pub min_clearance: f64,
    /// Stroke weight above which a bare line is treated as a wall.
    #[serde(default = "default_wall_stroke_threshold")]
    pub wall_stroke_threshold: f64,
    /// Thickness given to zero-thickness wall lines so overlap tests hold.
    #[serde(default = "default_wall_thickness")]
    pub wall_thickness: f64,
    /// Closed polylines below this area are treated as wall segments.
    #[serde(default = "default_small_outline_area")]
    pub small_outline_area: f64,
    /// Radius window for the door-swing arc heuristic, meters.
    #[serde(default = "default_door_radius_range")]
    pub door_radius_range: (f64, f64),
    /// Angular sweep window for the door-swing arc heuristic, degrees.
    #[serde(default = "default_door_sweep_range")]
    pub door_sweep_range: (f64, f64),
    /// Densities at or below this use the small template.
    #[serde(default = "default_small_density_max")]
    pub small_density_max: f64,
    /// Densities at or below this (and above the small tier) use medium.
    #[serde(default = "default_medium_density_max")]
    pub medium_density_max: f64,
    /// Multiplier on average unit half-extent in the grouping threshold.
    #[serde(default = "default_group_reach_factor")]
    pub group_reach_factor: f64,
    /// Fraction of the unit-cloud extent added to the grouping threshold.
    #[serde(default = "default_cloud_extent_fraction")]
    pub cloud_extent_fraction: f64,
    /// Multiplier on average unit height for row bucketing tolerance.
    #[serde(default = "default_row_tolerance_factor")]
    pub row_tolerance_factor: f64,
    /// Facing rows: minimum gap as a multiple of corridor width.
    #[serde(default = "default_facing_gap_min_factor")]
    pub facing_gap_min_factor: f64,
    /// Facing rows: maximum gap as a multiple of corridor width.
    #[serde(default = "default_facing_gap_max_factor")]
    pub facing_gap_max_factor: f64,
    /// Facing rows: minimum horizontal overlap as a fraction of the narrower row.
    #[serde(default = "default_facing_overlap_fraction")]
    pub facing_overlap_fraction: f64,
    /// Endpoint coincidence tolerance for the adjacency merge, meters.
    #[serde(default = "default_merge_endpoint_tolerance")]
    pub merge_endpoint_tolerance: f64,
    /// Width match tolerance for the adjacency merge, meters.
    #[serde(default = "default_merge_width_tolerance")]
    pub merge_width_tolerance: f64,
    /// Minimum |dot| of direction vectors for the adjacency merge.
    #[serde(default = "default_merge_direction_dot")]
    pub merge_direction_dot: f64,
    /// Corridors within this distance of the modal width snap to it.
    #[serde(default = "default_width_snap_tolerance")]
    pub width_snap_tolerance: f64,
    /// Hard cap on placed units; placement stops at the cap.
    #[serde(default = "default_max_ilots")]
    pub max_ilots: usize,
    /// Hard cap on classified entities; the rest are ignored.
    #[serde(default = "default_max_entities")]
    pub max_entities: usize,
    /// Optional wall-clock budget; on expiry the engine returns the best
    /// layout computed so far.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

fn default_corridor_width() -> f64 {
    1.2
}

fn default_target_density() -> f64 {
    0.6
}

fn default_min_clearance() -> f64 {
    0.5
}

fn default_wall_stroke_threshold() -> f64 {
    0.5
}

fn default_wall_thickness() -> f64 {
    0.15
}

fn default_small_outline_area() -> f64 {
    1.0
}

fn default_door_radius_range() -> (f64, f64) {
    (0.6, 1.2)
}

fn default_door_sweep_range() -> (f64, f64) {
    (60.0, 120.0)
}

fn default_small_density_max() -> f64 {
    0.4
}

fn default_medium_density_max() -> f64 {
    0.8
}

fn default_group_reach_factor() -> f64 {
    6.0
}

fn default_cloud_extent_fraction() -> f64 {
    0.05
}

fn default_row_tolerance_factor() -> f64 {
    0.5
}

fn default_facing_gap_min_factor() -> f64 {
    0.8
}

fn default_facing_gap_max_factor() -> f64 {
    3.0
}

fn default_facing_overlap_fraction() -> f64 {
    0.3
}

fn default_merge_endpoint_tolerance() -> f64 {
    0.25
}

fn default_merge_width_tolerance() -> f64 {
    0.1
}

fn default_merge_direction_dot() -> f64 {
    0.9
}

fn default_width_snap_tolerance() -> f64 {
    0.2
}

fn default_max_ilots() -> usize {
    2_000
}

fn default_max_entities() -> usize {
    10_000
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            corridor_width: default_corridor_width(),
            target_density: default_target_density(),
            min_clearance: default_min_clearance(),
            wall_stroke_threshold: default_wall_stroke_threshold(),
            wall_thickness: default_wall_thickness(),
            small_outline_area: default_small_outline_area(),
            door_radius_range: default_door_radius_range(),
            door_sweep_range: default_door_sweep_range(),
            small_density_max: default_small_density_max(),
            medium_density_max: default_medium_density_max(),
            group_reach_factor: default_group_reach_factor(),
            cloud_extent_fraction: default_cloud_extent_fraction(),
            row_tolerance_factor: default_row_tolerance_factor(),
            facing_gap_min_factor: default_facing_gap_min_factor(),
            facing_gap_max_factor: default_facing_gap_max_factor(),
            facing_overlap_fraction: default_facing_overlap_fraction(),
            merge_endpoint_tolerance: default_merge_endpoint_tolerance(),
            merge_width_tolerance: default_merge_width_tolerance(),
            merge_direction_dot: default_merge_direction_dot(),
            width_snap_tolerance: default_width_snap_tolerance(),
            max_ilots: default_max_ilots(),
            max_entities: default_max_entities(),
            deadline_ms: None,
        }
    }
}

/// Run the full pipeline on a snapshot with the given configuration.
pub fn compute_layout(snapshot: &GeometrySnapshot, config: &LayoutConfig) -> Layout {
    LayoutEngine::new(config.clone()).compute(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_reference_values() {
        let config = LayoutConfig::default();
        assert_eq!(config.corridor_width, 1.2);
        assert_eq!(config.target_density, 0.6);
        assert_eq!(config.min_clearance, 0.5);
        assert_eq!(config.max_ilots, 2_000);
    }

    #[test]
    fn config_deserializes_with_partial_fields() {
        let config: LayoutConfig =
            serde_json::from_str(r#"{"corridor_width": 1.5}"#).expect("valid config");
        assert_eq!(config.corridor_width, 1.5);
        assert_eq!(config.target_density, 0.6);
    }

    #[test]
    fn empty_layout_reports_invalid_ratio() {
        let layout = Layout::empty();
        assert_eq!(layout.efficiency_ratio, EfficiencyRatio::Invalid);
        assert!(layout.ilots.is_empty());
    }
}
