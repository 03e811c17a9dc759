//! Geometry snapshot ingestion.
//!
//! The snapshot is the JSON record handed over by the CAD/PDF ingestion
//! collaborator: a flat entity list with layer names and free-form
//! properties, overall scene bounds, and a scale factor to meters. Parsing
//! is the engine's only fallible surface.

use anyhow::{Context, Result};
use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geometry;

/// Entity kinds the ingestion collaborator emits. Anything else is `Unknown`
/// and falls through to the usable-area default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Line,
    LwPolyline,
    Polyline,
    Circle,
    Arc,
    Insert,
    Text,
    MText,
    Unknown,
}

/// One geometry entity: kind tag, source layer, coordinate list, and
/// free-form properties (radius, angles, color, lineweight, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_layer")]
    pub layer: String,
    #[serde(default)]
    pub coordinates: Vec<[f64; 2]>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

fn default_layer() -> String {
    "DEFAULT".to_string()
}

impl Entity {
    /// The kind tag, tolerating unknown and oddly cased values.
    pub fn entity_kind(&self) -> EntityKind {
        match self.kind.to_ascii_uppercase().as_str() {
            "LINE" => EntityKind::Line,
            "LWPOLYLINE" => EntityKind::LwPolyline,
            "POLYLINE" => EntityKind::Polyline,
            "CIRCLE" => EntityKind::Circle,
            "ARC" => EntityKind::Arc,
            "INSERT" => EntityKind::Insert,
            "TEXT" => EntityKind::Text,
            "MTEXT" => EntityKind::MText,
            _ => EntityKind::Unknown,
        }
    }

    /// Numeric property lookup, accepting both integer and float JSON values.
    pub fn property_f64(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(Value::as_f64)
    }

    pub fn property_bool(&self, key: &str) -> Option<bool> {
        self.properties.get(key).and_then(Value::as_bool)
    }

    /// Coordinates scaled to meters, or `None` when any coordinate is
    /// missing, non-finite, or out of range.
    pub fn scaled_coords(&self, scale: f64) -> Option<Vec<Coord<f64>>> {
        if self.coordinates.is_empty() {
            return None;
        }

        let mut coords = Vec::with_capacity(self.coordinates.len());
        for [x, y] in &self.coordinates {
            if !geometry::coord_is_valid(*x, *y) {
                return None;
            }
            coords.push(Coord {
                x: x * scale,
                y: y * scale,
            });
        }
        Some(coords)
    }
}

/// Overall scene bounds, camelCase keys as emitted by the collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SceneBounds {
    #[serde(rename = "minX")]
    pub min_x: f64,
    #[serde(rename = "minY")]
    pub min_y: f64,
    #[serde(rename = "maxX")]
    pub max_x: f64,
    #[serde(rename = "maxY")]
    pub max_y: f64,
}

impl SceneBounds {
    pub fn is_degenerate(&self) -> bool {
        !(self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite())
            || self.max_x <= self.min_x
            || self.max_y <= self.min_y
    }

    /// Scene rectangle scaled to meters, `None` when degenerate.
    pub fn to_rect(&self, scale: f64) -> Option<Rect<f64>> {
        if self.is_degenerate() {
            return None;
        }
        Some(geometry::rect(
            self.min_x * scale,
            self.min_y * scale,
            self.max_x * scale,
            self.max_y * scale,
        ))
    }
}

/// The full geometry snapshot consumed by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometrySnapshot {
    #[serde(default)]
    pub entities: Vec<Entity>,
    pub bounds: SceneBounds,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl GeometrySnapshot {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("failed to parse geometry snapshot JSON")
    }

    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).context("failed to decode geometry snapshot value")
    }

    /// Scale factor, defended against zero or non-finite input.
    pub fn effective_scale(&self) -> f64 {
        if self.scale.is_finite() && self.scale > 0.0 {
            self.scale
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_collaborator_shape() {
        let raw = r#"{
            "entities": [
                {
                    "type": "LINE",
                    "layer": "WALLS",
                    "coordinates": [[0.0, 0.0], [10.0, 0.0]],
                    "properties": {}
                },
                {
                    "type": "ARC",
                    "layer": "DOORS",
                    "coordinates": [[5.0, 2.0]],
                    "properties": {"radius": 0.9, "start_angle": 0.0, "end_angle": 90.0}
                }
            ],
            "bounds": {"minX": 0.0, "minY": 0.0, "maxX": 20.0, "maxY": 10.0},
            "scale": 1.0,
            "units": "m",
            "layers": ["WALLS", "DOORS"]
        }"#;

        let snapshot = GeometrySnapshot::from_json_str(raw).expect("valid snapshot");
        assert_eq!(snapshot.entities.len(), 2);
        assert_eq!(snapshot.entities[0].entity_kind(), EntityKind::Line);
        assert_eq!(snapshot.entities[1].property_f64("radius"), Some(0.9));
        assert_eq!(snapshot.bounds.max_x, 20.0);
    }

    #[test]
    fn unknown_kind_and_missing_layer_default() {
        let raw = r#"{
            "entities": [{"type": "HATCH", "coordinates": [[1.0, 1.0]]}],
            "bounds": {"minX": 0.0, "minY": 0.0, "maxX": 5.0, "maxY": 5.0}
        }"#;

        let snapshot = GeometrySnapshot::from_json_str(raw).expect("valid snapshot");
        assert_eq!(snapshot.entities[0].entity_kind(), EntityKind::Unknown);
        assert_eq!(snapshot.entities[0].layer, "DEFAULT");
        assert_eq!(snapshot.scale, 1.0);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(GeometrySnapshot::from_json_str("{not json").is_err());
    }

    #[test]
    fn scaled_coords_reject_non_finite() {
        let entity = Entity {
            kind: "LINE".to_string(),
            layer: "WALLS".to_string(),
            coordinates: vec![[0.0, 0.0], [f64::NAN, 1.0]],
            properties: Map::new(),
        };
        assert!(entity.scaled_coords(1.0).is_none());
    }

    #[test]
    fn degenerate_bounds_have_no_rect() {
        let bounds = SceneBounds {
            min_x: 5.0,
            min_y: 0.0,
            max_x: 5.0,
            max_y: 10.0,
        };
        assert!(bounds.to_rect(1.0).is_none());
    }
}
