//! Zone classification: raw geometry entities to typed zone rectangles.

use geo::Coord;
use serde_json::Value;
use tracing::{debug, warn};

use crate::geometry;
use crate::snapshot::{Entity, EntityKind, GeometrySnapshot};
use crate::{DoorSwing, LayoutConfig, Zone, ZoneKind};

// Layer name fragments, matched case-insensitively. French variants appear
// alongside English because the reference drawings carry both.
const WALL_LAYER_PATTERNS: &[&str] = &["wall", "mur", "cloison", "wand"];
const RESTRICTED_LAYER_PATTERNS: &[&str] = &[
    "restrict", "stair", "escalier", "elevator", "ascenseur", "no_entry", "interdit", "tech",
];
const ENTRANCE_LAYER_PATTERNS: &[&str] = &[
    "door", "porte", "entry", "entree", "entrance", "exit", "sortie", "access",
];

enum Classified {
    Zone(Zone),
    Usable,
    Skipped,
}

/// Classify every entity into a typed zone, in input order, and append the
/// single usable zone covering the scene bounds. Entities with missing or
/// invalid coordinates are skipped, never fatal.
pub fn classify(snapshot: &GeometrySnapshot, config: &LayoutConfig) -> Vec<Zone> {
    let scale = snapshot.effective_scale();
    let mut zones = Vec::new();
    let mut skipped = 0usize;

    if snapshot.entities.len() > config.max_entities {
        warn!(
            "snapshot has {} entities, classifying only the first {}",
            snapshot.entities.len(),
            config.max_entities
        );
    }

    for entity in snapshot.entities.iter().take(config.max_entities) {
        match classify_entity(entity, scale, config) {
            Classified::Zone(zone) => zones.push(zone),
            Classified::Usable => {}
            Classified::Skipped => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("skipped {} entities with missing or invalid coordinates", skipped);
    }

    match snapshot.bounds.to_rect(scale) {
        Some(bounds) => zones.push(Zone {
            kind: ZoneKind::Usable,
            bounds,
            door_swing: None,
        }),
        None => warn!("scene bounds are degenerate, no usable zone emitted"),
    }

    debug!(
        "classified {} zones ({} wall, {} restricted, {} entrance)",
        zones.len(),
        zones.iter().filter(|z| z.kind == ZoneKind::Wall).count(),
        zones.iter().filter(|z| z.kind == ZoneKind::Restricted).count(),
        zones.iter().filter(|z| z.kind == ZoneKind::Entrance).count(),
    );

    zones
}

fn classify_entity(entity: &Entity, scale: f64, config: &LayoutConfig) -> Classified {
    let Some(coords) = entity.scaled_coords(scale) else {
        return Classified::Skipped;
    };

    // Arcs and circles are described by center plus radius; everything else
    // by its coordinate extent.
    let kind = entity.entity_kind();
    let bounds = match kind {
        EntityKind::Arc | EntityKind::Circle => {
            let radius = entity.property_f64("radius").unwrap_or(0.0) * scale;
            if radius <= 0.0 {
                return Classified::Skipped;
            }
            let c = coords[0];
            geometry::rect(c.x - radius, c.y - radius, c.x + radius, c.y + radius)
        }
        _ => match geometry::bounding_rect(&coords) {
            Some(r) => r,
            None => return Classified::Skipped,
        },
    };

    if is_wall(entity, kind, &coords, config) {
        return Classified::Zone(Zone {
            kind: ZoneKind::Wall,
            bounds: geometry::ensure_thickness(&bounds, config.wall_thickness),
            door_swing: None,
        });
    }

    if is_restricted(entity) {
        return Classified::Zone(Zone {
            kind: ZoneKind::Restricted,
            bounds: geometry::ensure_thickness(&bounds, config.wall_thickness),
            door_swing: None,
        });
    }

    if let Some(door_swing) = entrance_door_swing(entity, kind, &coords, scale, config) {
        return Classified::Zone(Zone {
            kind: ZoneKind::Entrance,
            bounds: geometry::ensure_thickness(&bounds, config.wall_thickness),
            door_swing,
        });
    }

    Classified::Usable
}

fn layer_matches(layer: &str, patterns: &[&str]) -> bool {
    let lower = layer.to_ascii_lowercase();
    patterns.iter().any(|p| lower.contains(p))
}

fn is_wall(entity: &Entity, kind: EntityKind, coords: &[Coord<f64>], config: &LayoutConfig) -> bool {
    if layer_matches(&entity.layer, WALL_LAYER_PATTERNS) {
        return true;
    }

    // Heavy stroke on a bare line reads as a structural wall.
    if kind == EntityKind::Line {
        if let Some(weight) = entity.property_f64("lineweight") {
            if weight > config.wall_stroke_threshold {
                return true;
            }
        }
    }

    // Small closed outlines are typically wall posts or column footprints.
    if matches!(kind, EntityKind::LwPolyline | EntityKind::Polyline)
        && entity.property_bool("closed").unwrap_or(false)
        && geometry::polygon_area(coords) < config.small_outline_area
    {
        return true;
    }

    false
}

fn is_restricted(entity: &Entity) -> bool {
    if layer_matches(&entity.layer, RESTRICTED_LAYER_PATTERNS) {
        return true;
    }

    entity
        .properties
        .get("color")
        .map(is_blue_family)
        .unwrap_or(false)
}

/// Blue-family test on a free-form color value: hex string or [r, g, b].
fn is_blue_family(value: &Value) -> bool {
    let rgb = match value {
        Value::String(s) => parse_hex_color(s),
        Value::Array(parts) if parts.len() == 3 => {
            let mut rgb = [0u8; 3];
            for (i, part) in parts.iter().enumerate() {
                match part.as_f64() {
                    Some(v) if (0.0..=255.0).contains(&v) => rgb[i] = v as u8,
                    _ => return false,
                }
            }
            Some(rgb)
        }
        _ => None,
    };

    match rgb {
        Some([r, g, b]) => b > 120 && b > r && b > g,
        None => false,
    }
}

fn parse_hex_color(raw: &str) -> Option<[u8; 3]> {
    let hex = raw.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some([r, g, b])
}

/// Entrance detection. Returns the captured door swing for arcs that match
/// the heuristic; layer-matched entities yield an entrance without a swing.
fn entrance_door_swing(
    entity: &Entity,
    kind: EntityKind,
    coords: &[Coord<f64>],
    scale: f64,
    config: &LayoutConfig,
) -> Option<Option<DoorSwing>> {
    if layer_matches(&entity.layer, ENTRANCE_LAYER_PATTERNS) {
        let door_swing = arc_descriptor(entity, kind, coords, scale);
        return Some(door_swing);
    }

    if kind == EntityKind::Arc {
        if let Some(swing) = arc_descriptor(entity, kind, coords, scale) {
            let (r_min, r_max) = config.door_radius_range;
            let (s_min, s_max) = config.door_sweep_range;
            let sweep = (swing.end_angle - swing.start_angle).rem_euclid(360.0);
            if swing.radius >= r_min && swing.radius <= r_max && sweep >= s_min && sweep <= s_max {
                return Some(Some(swing));
            }
        }
    }

    None
}

fn arc_descriptor(
    entity: &Entity,
    kind: EntityKind,
    coords: &[Coord<f64>],
    scale: f64,
) -> Option<DoorSwing> {
    if kind != EntityKind::Arc {
        return None;
    }
    let radius = entity.property_f64("radius")? * scale;
    Some(DoorSwing {
        center: coords[0],
        radius,
        start_angle: entity.property_f64("start_angle").unwrap_or(0.0),
        end_angle: entity.property_f64("end_angle").unwrap_or(0.0),
    })
}
