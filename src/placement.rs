//! Unit placement: grid packing of catalog rectangles into usable zones.

use tracing::{debug, info, warn};

use crate::geometry::{self, EPSILON};
use crate::{Ilot, LayoutConfig, SizeClass, Zone};

/// One of the three fixed rectangle templates. The catalog is the only size
/// vocabulary; there is no continuous sizing.
#[derive(Debug, Clone, Copy)]
pub struct IlotTemplate {
    pub size_class: SizeClass,
    pub width: f64,
    pub height: f64,
}

impl IlotTemplate {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

pub const CATALOG: [IlotTemplate; 3] = [
    IlotTemplate {
        size_class: SizeClass::Small,
        width: 1.0,
        height: 0.8,
    },
    IlotTemplate {
        size_class: SizeClass::Medium,
        width: 1.6,
        height: 1.2,
    },
    IlotTemplate {
        size_class: SizeClass::Large,
        width: 2.0,
        height: 1.6,
    },
];

/// Template tier for a density target: low densities pack small units,
/// high densities pack large ones.
pub fn template_for_density(density: f64, config: &LayoutConfig) -> IlotTemplate {
    if density <= config.small_density_max {
        CATALOG[0]
    } else if density <= config.medium_density_max {
        CATALOG[1]
    } else {
        CATALOG[2]
    }
}

/// Fill every usable zone with grid-placed units.
///
/// Candidates sit on a grid with per-axis pitch
/// `unit dimension + corridor width + minimum clearance`. A candidate is
/// accepted iff it stays inside the zone and overlaps no obstacle zone.
/// Placement per zone stops once cumulative unit area would exceed
/// `target_density` times the zone area; a zone too small for a single unit
/// yields zero units. Deterministic throughout.
pub fn place(zones: &[Zone], config: &LayoutConfig) -> Vec<Ilot> {
    let usable: Vec<&Zone> = zones.iter().filter(|z| !z.kind.is_obstacle()).collect();
    let obstacles: Vec<&Zone> = zones.iter().filter(|z| z.kind.is_obstacle()).collect();

    let density = if config.target_density.is_finite() && config.target_density > 0.0 {
        config.target_density.min(1.0)
    } else {
        warn!(
            "target density {} out of range, falling back to default",
            config.target_density
        );
        crate::LayoutConfig::default().target_density
    };

    let template = template_for_density(density, config);
    let pitch_x = template.width + config.corridor_width + config.min_clearance;
    let pitch_y = template.height + config.corridor_width + config.min_clearance;

    let mut ilots: Vec<Ilot> = Vec::new();
    let mut capped = false;

    'zones: for zone in usable {
        let budget = density * geometry::area(&zone.bounds);
        let mut placed_area = 0.0;

        let min = zone.bounds.min();
        let max = zone.bounds.max();

        let mut y = min.y;
        'grid: while y + template.height <= max.y + EPSILON {
            let mut x = min.x;
            while x + template.width <= max.x + EPSILON {
                if ilots.len() >= config.max_ilots {
                    capped = true;
                    break 'zones;
                }
                if placed_area + template.area() > budget + EPSILON {
                    break 'grid;
                }

                let candidate = geometry::rect(x, y, x + template.width, y + template.height);
                let blocked = obstacles
                    .iter()
                    .any(|z| geometry::overlaps(&candidate, &z.bounds));

                if !blocked {
                    let id = ilots.len();
                    ilots.push(Ilot {
                        id,
                        bounds: candidate,
                        area: template.area(),
                        size_class: template.size_class,
                        label: format!("Ilot {}", id + 1),
                    });
                    placed_area += template.area();
                }

                x += pitch_x;
            }
            y += pitch_y;
        }

        debug!(
            "zone {:.1}x{:.1}: placed area {:.2} of budget {:.2}",
            zone.bounds.width(),
            zone.bounds.height(),
            placed_area,
            budget
        );
    }

    if capped {
        warn!(
            "unit cap of {} reached, returning partial placement",
            config.max_ilots
        );
    }

    info!(
        "placed {} {:?} units ({}x{} on {:.2}/{:.2} pitch)",
        ilots.len(),
        template.size_class,
        template.width,
        template.height,
        pitch_x,
        pitch_y
    );

    ilots
}
