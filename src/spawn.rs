use std::collections::VecDeque;

use bevy::log::debug;
use bevy::math::{IVec2, Vec2};

use crate::config::SpawnConfig;
use crate::direction::Direction;
use crate::distance::DistanceAlg;
use crate::grid::Grid;
use crate::map::TerrainMap;
use crate::shapes::Rect;

/// Picks the standable tile farthest (by walk distance through open tiles) from a door.
pub struct SpawnExitLocator {
    headroom: i32,
}

impl SpawnExitLocator {
    pub fn new(config: &SpawnConfig) -> Self {
        Self {
            headroom: config.headroom,
        }
    }

    /// Open tile closest to `anchor` inside `region`, searched ring by ring.
    pub fn nearest_open(map: &TerrainMap, region: &Rect, anchor: IVec2) -> Option<IVec2> {
        let max_radius = region.width().max(region.height());
        for radius in 0..=max_radius {
            let best = (-radius..=radius)
                .flat_map(|dy| (-radius..=radius).map(move |dx| IVec2::new(dx, dy)))
                .filter(|d| DistanceAlg::Chebyshev.distance_tiles(IVec2::ZERO, *d) == radius)
                .map(|d| anchor + d)
                .filter(|p| region.contains(*p) && map.is_open(p.x, p.y))
                .min_by_key(|p| (p.distance_squared(anchor), p.y, p.x));
            if best.is_some() {
                return best;
            }
        }
        None
    }

    /// 4-way breadth-first distances over open tiles of `region`, sized like the map.
    pub fn distances(map: &TerrainMap, region: &Rect, start: IVec2) -> Grid<Option<u32>> {
        let mut dist = Grid::new(map.width, map.height, None);
        if !region.contains(start) || !map.is_open(start.x, start.y) {
            return dist;
        }
        dist.set_clipped(start.x, start.y, Some(0));
        let mut queue = VecDeque::from([start]);

        while let Some(pos) = queue.pop_front() {
            let d = dist.at(pos).flatten().unwrap_or(0);
            for direction in Direction::ALL {
                let next = pos + direction.offset();
                if !region.contains(next) || !map.is_open(next.x, next.y) {
                    continue;
                }
                if dist.at(next) == Some(None) {
                    dist.set_clipped(next.x, next.y, Some(d + 1));
                    queue.push_back(next);
                }
            }
        }
        dist
    }

    /// Supported from below, clear above, and not wedged into a one-tile shaft.
    pub fn is_standable(&self, map: &TerrainMap, pos: IVec2) -> bool {
        let (x, y) = (pos.x, pos.y);
        if !map.is_open(x, y) || map.is_platform(x, y) || !map.is_support(x, y + 1) {
            return false;
        }
        if (1..=self.headroom).any(|k| map.is_solid(x, y - k)) {
            return false;
        }
        let boxed = |row: i32| map.is_solid(x - 1, row) && map.is_solid(x + 1, row);
        !boxed(y) && !boxed(y - 1)
    }

    /// Farthest standable tile from `anchor` (room-local tile units) and its walk
    /// distance, or `None` when nothing in the region qualifies.
    pub fn farthest_standable(&self, map: &TerrainMap, region: &Rect, anchor: Vec2) -> Option<(IVec2, u32)> {
        let anchor_tile = anchor.floor().as_ivec2().clamp(
            IVec2::new(region.x1, region.y1),
            IVec2::new(region.x2 - 1, region.y2 - 1),
        );
        let start = Self::nearest_open(map, region, anchor_tile)?;
        let dist = Self::distances(map, region, start);

        let mut reached: Vec<(usize, u32)> = dist
            .cells()
            .iter()
            .enumerate()
            .filter_map(|(idx, d)| d.map(|d| (idx, d)))
            .collect();
        reached.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        debug!("standable search: {} tiles reached from {start}", reached.len());

        reached
            .into_iter()
            .map(|(idx, d)| (dist.idx_xy(idx), d))
            .find(|(pos, _)| self.is_standable(map, *pos))
    }
}
