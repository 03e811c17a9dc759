//! Pipeline orchestration: zones, placement, rows, corridors, optimization,
//! metrics, in strict sequence.

use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::snapshot::GeometrySnapshot;
use crate::{corridors, metrics, optimizer, placement, rows, zones};
use crate::{Layout, LayoutConfig};

/// The layout engine. One instance per configuration; `compute` holds no
/// state between invocations, so independent requests may run in parallel on
/// separate instances or share one behind a reference.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        LayoutEngine { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Run the full pipeline. Never fails: malformed or empty geometry
    /// degrades to an empty layout, infeasible regions to partial ones.
    pub fn compute(&self, snapshot: &GeometrySnapshot) -> Layout {
        let started = Instant::now();
        let deadline = self
            .config
            .deadline_ms
            .map(|ms| started + Duration::from_millis(ms));

        if snapshot.entities.is_empty() {
            info!("empty geometry snapshot, returning empty layout");
            return Layout::empty();
        }

        let zone_list = zones::classify(snapshot, &self.config);
        info!(
            "classified {} zones in {} ms",
            zone_list.len(),
            started.elapsed().as_millis()
        );

        let ilots = placement::place(&zone_list, &self.config);
        let groups = rows::organize(&ilots, &self.config, deadline);
        let raw = corridors::synthesize(&groups, &ilots, &zone_list, &self.config);
        let final_corridors = optimizer::optimize(raw, &ilots, &zone_list, &self.config);

        let m = metrics::compute(&zone_list, &ilots, &final_corridors);

        let unreached_ilots: Vec<usize> = ilots
            .iter()
            .map(|i| i.id)
            .filter(|id| !final_corridors.iter().any(|c| c.connected.contains(id)))
            .collect();
        if !unreached_ilots.is_empty() {
            warn!("{} units unreached by the corridor network", unreached_ilots.len());
        }

        info!(
            "layout complete: {} units, {} corridors, efficiency {:?}, {} ms",
            ilots.len(),
            final_corridors.len(),
            m.efficiency_ratio,
            started.elapsed().as_millis()
        );

        Layout {
            zones: zone_list,
            ilots,
            corridors: final_corridors,
            total_usable_area: m.total_usable_area,
            total_ilot_area: m.total_ilot_area,
            total_corridor_area: m.total_corridor_area,
            efficiency_ratio: m.efficiency_ratio,
            unreached_ilots,
        }
    }
}
