use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use bevy::log::debug;
use bevy::math::{IVec2, Rect, Vec2};

use crate::config::PathfindingConfig;
use crate::direction::Direction;
use crate::distance::DistanceAlg;
use crate::grid::Grid;
use crate::map_builders::PortalAnchor;

/// Strict containment: points on the edge are outside.
fn strictly_inside(rect: &Rect, p: Vec2) -> bool {
    p.x > rect.min.x && p.x < rect.max.x && p.y > rect.min.y && p.y < rect.max.y
}

/// True when every consecutive pair of points shares exactly one coordinate.
pub fn is_axis_aligned(points: &[Vec2]) -> bool {
    points
        .windows(2)
        .all(|w| (w[0].x == w[1].x) != (w[0].y == w[1].y))
}

/// Coarse occupancy of the layout, baked once from the obstacle rectangles.
#[derive(Debug, Clone)]
pub struct WalkableGrid {
    origin: Vec2,
    resolution: f32,
    cells: Grid<bool>,
}

impl WalkableGrid {
    pub fn bake(bounds: Rect, expanded_obstacles: &[Rect], resolution: f32) -> Self {
        let width = (bounds.width() / resolution).ceil() as i32;
        let height = (bounds.height() / resolution).ceil() as i32;
        let mut grid = WalkableGrid {
            origin: bounds.min,
            resolution,
            cells: Grid::new(width, height, false),
        };

        for y in 0..height {
            for x in 0..width {
                let center = grid.cell_center(IVec2::new(x, y));
                let walkable = bounds.contains(center)
                    && !expanded_obstacles.iter().any(|r| r.contains(center));
                grid.cells.set_clipped(x, y, walkable);
            }
        }
        grid
    }

    pub fn width(&self) -> i32 {
        self.cells.width()
    }

    pub fn height(&self) -> i32 {
        self.cells.height()
    }

    pub fn cell_center(&self, cell: IVec2) -> Vec2 {
        self.origin + (cell.as_vec2() + Vec2::splat(0.5)) * self.resolution
    }

    pub fn cell_of(&self, p: Vec2) -> IVec2 {
        ((p - self.origin) / self.resolution).floor().as_ivec2()
    }

    pub fn is_walkable(&self, cell: IVec2) -> bool {
        self.cells.at(cell).unwrap_or(false)
    }

    /// Closest walkable cell to `cell`, searched ring by ring outward.
    pub fn nearest_walkable(&self, cell: IVec2) -> Option<IVec2> {
        if self.is_walkable(cell) {
            return Some(cell);
        }
        let max_radius = self.width().max(self.height());
        for radius in 1..=max_radius {
            let best = (-radius..=radius)
                .flat_map(|dy| (-radius..=radius).map(move |dx| IVec2::new(dx, dy)))
                .filter(|d| DistanceAlg::Chebyshev.distance_tiles(IVec2::ZERO, *d) == radius)
                .map(|d| cell + d)
                .filter(|c| self.is_walkable(*c))
                .min_by_key(|c| (c.distance_squared(cell), c.y, c.x));
            if best.is_some() {
                return best;
            }
        }
        None
    }
}

#[derive(Clone, Copy, Eq, PartialEq)]
struct Node {
    state: usize,
    f_score: u32,
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (lowest f_score first)
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.state.cmp(&self.state))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

const STEP_COST: u32 = 100;
/// Direction slot used for the start state, which has no incoming direction.
const NO_DIRECTION: usize = 4;

/// Routes axis-aligned corridors around room rectangles inside the layout bounds.
pub struct CorridorPathfinder {
    bounds: Rect,
    obstacles: Vec<Rect>,
    expanded: Vec<Rect>,
    walkable: WalkableGrid,
    clearance: f32,
    margin: f32,
    sample_step: f32,
    max_expansions: usize,
    min_spacing: f32,
    z_ratios: Vec<f32>,
    turn_cost: u32,
}

impl CorridorPathfinder {
    pub fn new(config: &PathfindingConfig, bounds: Rect, obstacles: Vec<Rect>) -> Self {
        let expanded: Vec<Rect> = obstacles
            .iter()
            .map(|r| r.inflate(config.obstacle_margin))
            .collect();
        let walkable = WalkableGrid::bake(bounds, &expanded, config.grid_resolution);
        debug!(
            "walkable grid baked: {}x{} cells, {} obstacles",
            walkable.width(),
            walkable.height(),
            obstacles.len()
        );
        Self {
            bounds,
            obstacles,
            expanded,
            walkable,
            clearance: config.clearance,
            margin: config.obstacle_margin,
            sample_step: config.sample_step,
            max_expansions: config.max_expansions,
            min_spacing: config.min_point_spacing,
            z_ratios: config.z_offset_ratios.clone(),
            turn_cost: config.turn_tie_break,
        }
    }

    pub fn walkable(&self) -> &WalkableGrid {
        &self.walkable
    }

    pub fn obstacles(&self) -> &[Rect] {
        &self.obstacles
    }

    pub fn expanded_obstacles(&self) -> &[Rect] {
        &self.expanded
    }

    pub fn point_clear(&self, p: Vec2) -> bool {
        self.bounds.contains(p) && !self.expanded.iter().any(|r| strictly_inside(r, p))
    }

    /// Dense sampling of the segment against the expanded obstacles and the bounds.
    pub fn segment_clear(&self, a: Vec2, b: Vec2) -> bool {
        let samples = ((a.distance(b) / self.sample_step).ceil() as usize).max(1);
        (0..=samples).all(|i| self.point_clear(a.lerp(b, i as f32 / samples as f32)))
    }

    fn polyline_clear(&self, points: &[Vec2]) -> bool {
        points.windows(2).all(|w| self.segment_clear(w[0], w[1]))
    }

    /// Moves a point that sits inside an expanded obstacle out past its nearest edge.
    fn project(&self, p: Vec2) -> Vec2 {
        let mut p = p;
        for _ in 0..self.expanded.len() {
            let Some(rect) = self.expanded.iter().find(|r| strictly_inside(r, p)) else {
                break;
            };
            let exits = [
                (p.x - rect.min.x, Vec2::new(rect.min.x - self.clearance, p.y)),
                (rect.max.x - p.x, Vec2::new(rect.max.x + self.clearance, p.y)),
                (p.y - rect.min.y, Vec2::new(p.x, rect.min.y - self.clearance)),
                (rect.max.y - p.y, Vec2::new(p.x, rect.max.y + self.clearance)),
            ];
            let mut best = exits[0];
            for exit in &exits[1..] {
                if exit.0 < best.0 {
                    best = *exit;
                }
            }
            p = best.1;
        }
        p.clamp(self.bounds.min, self.bounds.max)
    }

    /// Straight, L and Z shaped candidates, cheapest first.
    fn connectors(&self, a: Vec2, b: Vec2) -> Vec<Vec<Vec2>> {
        let mut candidates = Vec::new();
        if a.x == b.x || a.y == b.y {
            candidates.push(vec![a, b]);
        }
        candidates.push(vec![a, Vec2::new(b.x, a.y), b]);
        candidates.push(vec![a, Vec2::new(a.x, b.y), b]);
        for ratio in &self.z_ratios {
            let mx = a.x + (b.x - a.x) * ratio;
            candidates.push(vec![a, Vec2::new(mx, a.y), Vec2::new(mx, b.y), b]);
            let my = a.y + (b.y - a.y) * ratio;
            candidates.push(vec![a, Vec2::new(a.x, my), Vec2::new(b.x, my), b]);
        }
        candidates
    }

    fn a_star(&self, start: IVec2, goal: IVec2) -> Option<Vec<IVec2>> {
        let grid = &self.walkable;
        let cell_index = |c: IVec2| (c.y * grid.width() + c.x) as usize;
        let heuristic = |c: IVec2| DistanceAlg::Manhattan.distance_tiles(c, goal) as u32 * STEP_COST;

        let start_state = cell_index(start) * 5 + NO_DIRECTION;
        let mut open_set = BinaryHeap::new();
        let mut came_from: HashMap<usize, usize> = HashMap::new();
        let mut g_score: HashMap<usize, u32> = HashMap::new();
        g_score.insert(start_state, 0);
        open_set.push(Node {
            state: start_state,
            f_score: heuristic(start),
        });

        let mut expansions = 0;
        while let Some(current) = open_set.pop() {
            let cell = grid.cells.idx_xy(current.state / 5);
            let dir = current.state % 5;
            let current_g = g_score.get(&current.state).copied().unwrap_or(u32::MAX);
            if current.f_score > current_g.saturating_add(heuristic(cell)) {
                continue; // stale entry
            }

            if cell == goal {
                let mut path = vec![cell];
                let mut state = current.state;
                while let Some(&prev) = came_from.get(&state) {
                    path.push(grid.cells.idx_xy(prev / 5));
                    state = prev;
                }
                path.reverse();
                return Some(path);
            }

            expansions += 1;
            if expansions > self.max_expansions {
                debug!("a* gave up after {expansions} expansions");
                return None;
            }

            for (next_dir, direction) in Direction::ALL.into_iter().enumerate() {
                let next = cell + direction.offset();
                if !grid.is_walkable(next) {
                    continue;
                }
                let turn = if dir != NO_DIRECTION && dir != next_dir {
                    self.turn_cost
                } else {
                    0
                };
                let tentative_g = current_g + STEP_COST + turn;
                let next_state = cell_index(next) * 5 + next_dir;
                if tentative_g < g_score.get(&next_state).copied().unwrap_or(u32::MAX) {
                    came_from.insert(next_state, current.state);
                    g_score.insert(next_state, tentative_g);
                    open_set.push(Node {
                        state: next_state,
                        f_score: tentative_g + heuristic(next),
                    });
                }
            }
        }

        None
    }

    fn grid_search(&self, a: Vec2, b: Vec2) -> Option<Vec<IVec2>> {
        let start = self.walkable.nearest_walkable(self.walkable.cell_of(a))?;
        let goal = self.walkable.nearest_walkable(self.walkable.cell_of(b))?;
        self.a_star(start, goal)
    }

    /// Two-leg search through the layout's inset corners or its center.
    fn waypoint_search(&self, a: Vec2, b: Vec2) -> Option<Vec<IVec2>> {
        let inset = self.margin + self.clearance + self.walkable.resolution;
        let (min, max) = (self.bounds.min + inset, self.bounds.max - inset);
        let mut waypoints = vec![
            min,
            Vec2::new(max.x, min.y),
            Vec2::new(min.x, max.y),
            max,
            self.bounds.center(),
        ];
        let manhattan = DistanceAlg::Manhattan;
        waypoints.sort_by(|p, q| {
            let cost_p = manhattan.distance2d(a, *p) + manhattan.distance2d(*p, b);
            let cost_q = manhattan.distance2d(a, *q) + manhattan.distance2d(*q, b);
            cost_p.total_cmp(&cost_q)
        });

        let start = self.walkable.nearest_walkable(self.walkable.cell_of(a))?;
        let goal = self.walkable.nearest_walkable(self.walkable.cell_of(b))?;
        for waypoint in waypoints {
            let cell = self.walkable.cell_of(waypoint);
            if !self.walkable.is_walkable(cell) {
                continue;
            }
            let Some(mut first) = self.a_star(start, cell) else {
                continue;
            };
            let Some(second) = self.a_star(cell, goal) else {
                continue;
            };
            first.extend(second.into_iter().skip(1));
            return Some(first);
        }
        None
    }

    /// Appends `next`, inserting an axis-aligned elbow when the two points differ on both axes.
    fn join(&self, points: &mut Vec<Vec2>, next: Vec2) {
        let Some(&last) = points.last() else {
            points.push(next);
            return;
        };
        if last == next {
            return;
        }
        if last.x != next.x && last.y != next.y {
            let vertical_first = Vec2::new(last.x, next.y);
            let horizontal_first = Vec2::new(next.x, last.y);
            let elbow = if self.polyline_clear(&[last, vertical_first, next]) {
                vertical_first
            } else if self.polyline_clear(&[last, horizontal_first, next]) {
                horizontal_first
            } else {
                vertical_first
            };
            points.push(elbow);
        }
        points.push(next);
    }

    /// Axis-aligned polyline from `start` to `end`, or `None` when every strategy fails.
    pub fn query(&self, start: Vec2, end: Vec2) -> Option<Vec<Vec2>> {
        if start == end {
            return Some(vec![start]);
        }
        let a = self.project(start);
        let b = self.project(end);

        let route = match self
            .connectors(a, b)
            .into_iter()
            .find(|c| self.polyline_clear(c))
        {
            Some(connector) => connector,
            None => {
                let cells = self
                    .grid_search(a, b)
                    .or_else(|| self.waypoint_search(a, b))?;
                cells
                    .into_iter()
                    .map(|c| self.walkable.cell_center(c))
                    .collect()
            }
        };

        let mut points = vec![start];
        self.join(&mut points, a);
        for p in route {
            self.join(&mut points, p);
        }
        self.join(&mut points, b);
        self.join(&mut points, end);
        Some(simplify_polyline(points, self.min_spacing))
    }

    /// Full corridor between two doors: anchor, outward stub to the approach point,
    /// the routed path, and the same in reverse at the far door.
    pub fn route(&self, from: &PortalAnchor, to: &PortalAnchor) -> Option<Vec<Vec2>> {
        let middle = self.query(from.approach, to.approach)?;
        let mut points = vec![from.point];
        for p in middle {
            self.join(&mut points, p);
        }
        self.join(&mut points, to.point);
        Some(simplify_polyline(points, self.min_spacing))
    }
}

/// Drops interior points that continue a straight run.
fn collapse_colinear(points: Vec<Vec2>) -> Vec<Vec2> {
    let mut out: Vec<Vec2> = Vec::with_capacity(points.len());
    for p in points {
        if out.last() == Some(&p) {
            continue;
        }
        if out.len() >= 2 {
            let a = out[out.len() - 2];
            let b = out[out.len() - 1];
            let horizontal = a.y == b.y && b.y == p.y;
            let vertical = a.x == b.x && b.x == p.x;
            if horizontal || vertical {
                out.pop();
            }
        }
        out.push(p);
    }
    out
}

/// Colinear collapse, then removal of near-duplicate points where that keeps the
/// polyline axis-aligned. Endpoints are never moved.
pub fn simplify_polyline(points: Vec<Vec2>, min_spacing: f32) -> Vec<Vec2> {
    let mut points = collapse_colinear(points);

    let mut i = 1;
    while i + 1 < points.len() {
        let prev = points[i - 1];
        let next = points[i + 1];
        let close = points[i].distance(prev) < min_spacing || points[i].distance(next) < min_spacing;
        let aligned = (prev.x == next.x) != (prev.y == next.y);
        if close && aligned {
            points.remove(i);
        } else {
            i += 1;
        }
    }

    collapse_colinear(points)
}
