use std::collections::{HashMap, HashSet};

use bevy::log::{debug, warn};
use bevy::math::IVec2;

use crate::config::LevelConfig;
use crate::distance::DistanceAlg;
use crate::error::{GenError, GenWarning};
use crate::map::TerrainMap;
use crate::rng::LevelRng;

use super::{BuilderMap, CellGeometry, MetaMapBuilder, PortalAnchor};

/// Maximal horizontal run of platform tiles on one row, covering `x1..x2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCluster {
    pub y: i32,
    pub x1: i32,
    pub x2: i32,
}

impl PlatformCluster {
    pub fn len(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 0
    }

    pub fn center(&self) -> IVec2 {
        IVec2::new(self.x1 + self.len() / 2, self.y)
    }

    fn contains(&self, x: i32, y: i32) -> bool {
        y == self.y && x >= self.x1 && x < self.x2
    }
}

pub fn find_clusters(map: &TerrainMap) -> Vec<PlatformCluster> {
    let mut clusters = Vec::new();
    for y in 0..map.height {
        let mut start = None;
        for x in 0..=map.width {
            match (start, map.is_platform(x, y)) {
                (None, true) => start = Some(x),
                (Some(x1), false) => {
                    clusters.push(PlatformCluster { y, x1, x2: x });
                    start = None;
                }
                _ => {}
            }
        }
    }
    clusters
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerifierReport {
    pub rounds: usize,
    pub relays_placed: usize,
    pub unresolved: Vec<PlatformCluster>,
    /// Cells that hit the relay cap, in the order they hit it.
    pub capped_cells: Vec<IVec2>,
}

/// Finds platform clusters a jumping character cannot reach and drops relay
/// platforms under them.
pub struct PlatformAccessibilityVerifier {
    max_rounds: usize,
    floor_threshold: i32,
    horizontal_scan: i32,
    ceiling_check: i32,
    portal_clearance: f32,
    max_relays_per_cell: usize,
    reach: i32,
    step_height: i32,
    platform_width: i32,
    horizontal_offset: i32,
}

impl PlatformAccessibilityVerifier {
    pub fn new(config: &LevelConfig) -> Box<Self> {
        let access = &config.accessibility;
        Box::new(Self {
            max_rounds: access.max_rounds,
            floor_threshold: access.floor_height_threshold,
            horizontal_scan: access.horizontal_scan,
            ceiling_check: access.ceiling_check,
            portal_clearance: access.portal_clearance_radius,
            max_relays_per_cell: access.max_relays_per_cell,
            reach: config.jump.safe_vertical_reach(),
            step_height: config.stairs.safe_step_height,
            platform_width: config.stairs.platform_width,
            horizontal_offset: config.stairs.horizontal_offset,
        })
    }

    fn ceiling_mounted(&self, map: &TerrainMap, cluster: &PlatformCluster) -> bool {
        let c = cluster.center();
        (1..=self.ceiling_check).any(|dy| map.is_solid(c.x, c.y - dy) || map.is_platform(c.x, c.y - dy))
    }

    /// Rows from the cluster down to the first solid or platform tile under `x`.
    fn drop_below(map: &TerrainMap, x: i32, y: i32) -> i32 {
        (y + 1..map.height)
            .find(|row| map.is_solid(x, *row) || map.is_platform(x, *row))
            .map_or(map.height - y, |row| row - y)
    }

    fn standable_nearby(&self, map: &TerrainMap, cluster: &PlatformCluster) -> bool {
        let top = cluster.y - self.step_height;
        let bottom = cluster.y + self.reach;
        for x in cluster.x1 - self.horizontal_scan..cluster.x2 + self.horizontal_scan {
            for y in top..=bottom {
                if cluster.contains(x, y) {
                    continue;
                }
                if map.is_support(x, y) && map.is_open(x, y - 1) {
                    return true;
                }
            }
        }
        false
    }

    fn near_portal(&self, map: &TerrainMap, cluster: &PlatformCluster, portals: &[PortalAnchor]) -> bool {
        let center = map.tile_center(cluster.center());
        portals
            .iter()
            .any(|p| DistanceAlg::Pythagoras.distance2d(center, p.point) <= self.portal_clearance)
    }

    pub fn is_unreachable(&self, map: &TerrainMap, cluster: &PlatformCluster, portals: &[PortalAnchor]) -> bool {
        if self.ceiling_mounted(map, cluster) {
            return false;
        }
        if map.height - 1 - cluster.y <= self.floor_threshold {
            return false;
        }
        let gap = [cluster.x1, cluster.center().x, cluster.x2 - 1]
            .into_iter()
            .map(|x| Self::drop_below(map, x, cluster.y))
            .min()
            .unwrap_or(0);
        if gap <= self.reach {
            return false;
        }
        !self.standable_nearby(map, cluster) && !self.near_portal(map, cluster, portals)
    }

    pub fn unreachable_clusters(&self, map: &TerrainMap, portals: &[PortalAnchor]) -> Vec<PlatformCluster> {
        find_clusters(map)
            .into_iter()
            .filter(|c| self.is_unreachable(map, c, portals))
            .collect()
    }

    /// Runs repair rounds on `map` until nothing changes or the round cap is hit.
    pub fn verify(&self, map: &mut TerrainMap, portals: &[PortalAnchor], geometry: &CellGeometry) -> VerifierReport {
        let mut report = VerifierReport::default();
        let mut relays_per_cell: HashMap<IVec2, usize> = HashMap::new();
        let mut capped: HashSet<IVec2> = HashSet::new();
        let mut left = true;

        while report.rounds < self.max_rounds {
            let unreachable = self.unreachable_clusters(map, portals);
            if unreachable.is_empty() {
                break;
            }
            report.rounds += 1;

            let mut inserted = 0;
            for cluster in unreachable {
                let offset = if left { -self.horizontal_offset } else { self.horizontal_offset };
                let center = IVec2::new(cluster.center().x + offset, cluster.y + self.reach);
                let cell = geometry.cell_of(center);

                let count = relays_per_cell.entry(cell).or_insert(0);
                if *count >= self.max_relays_per_cell {
                    if capped.insert(cell) {
                        report.capped_cells.push(cell);
                    }
                    continue;
                }

                let x1 = center.x - self.platform_width / 2;
                let mut placed = false;
                for x in x1..x1 + self.platform_width {
                    if map.is_open(x, center.y) && !map.is_platform(x, center.y) {
                        map.platforms.set_clipped(x, center.y, true);
                        placed = true;
                    }
                }
                if placed {
                    *count += 1;
                    inserted += 1;
                    left = !left;
                }
            }

            report.relays_placed += inserted;
            if inserted == 0 {
                break;
            }
        }

        report.unresolved = self.unreachable_clusters(map, portals);
        report
    }
}

impl MetaMapBuilder for PlatformAccessibilityVerifier {
    fn build_map(&mut self, _rng: &mut LevelRng, build_data: &mut BuilderMap) -> Result<(), GenError> {
        let geometry = build_data.geometry;
        let report = self.verify(&mut build_data.map, &build_data.portals, &geometry);
        let room = build_data.room_index;
        debug!(
            "room {room}: accessibility took {} rounds, {} relays",
            report.rounds, report.relays_placed
        );

        for cell in report.capped_cells {
            let warning = GenWarning::RelayCapReached { room, cell };
            warn!("{warning}");
            build_data.warnings.push(warning);
        }
        if !report.unresolved.is_empty() {
            let warning = GenWarning::AccessibilityUnresolvable {
                room,
                clusters: report.unresolved.len(),
                rounds: report.rounds,
            };
            warn!("{warning}");
            build_data.warnings.push(warning);
        }

        build_data.take_snapshot();
        Ok(())
    }
}
