use bevy::log::debug;
use bevy::math::IVec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::LevelConfig;
use crate::direction::{Direction, DirectionSet};
use crate::error::GenError;
use crate::grid::Grid;
use crate::rng::LevelRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomRole {
    Entry,
    Exit,
    Boss,
    Shop,
    /// Off the critical path.
    Side,
    /// Critical path cell entered and left vertically.
    Vertical,
    /// Critical path cell entered and left horizontally.
    Horizontal,
    /// Critical path cell that turns.
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomNode {
    pub pos: IVec2,
    pub role: RoomRole,
    pub connections: DirectionSet,
    /// Outer walls that carry a portal (Entry: North, Exit: South).
    pub doors: DirectionSet,
    pub on_critical_path: bool,
    /// Off-path cell connected to the path.
    pub branch: bool,
}

impl RoomNode {
    fn new(pos: IVec2) -> Self {
        Self {
            pos,
            role: RoomRole::Side,
            connections: DirectionSet::EMPTY,
            doors: DirectionSet::EMPTY,
            on_critical_path: false,
            branch: false,
        }
    }

    /// Sides the rasterizer must open: connections plus doors.
    pub fn open_sides(&self) -> DirectionSet {
        self.connections.iter().chain(self.doors.iter()).collect()
    }
}

/// Connectivity over the room grid. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomGraph {
    nodes: Grid<Option<RoomNode>>,
    critical_path: Vec<IVec2>,
}

impl RoomGraph {
    pub fn width(&self) -> i32 {
        self.nodes.width()
    }

    pub fn height(&self) -> i32 {
        self.nodes.height()
    }

    pub fn is_valid(&self, pos: IVec2) -> bool {
        matches!(self.nodes.get_ref(pos.x, pos.y), Some(Some(_)))
    }

    pub fn node(&self, pos: IVec2) -> Option<&RoomNode> {
        self.nodes.get_ref(pos.x, pos.y).and_then(|n| n.as_ref())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &RoomNode> {
        self.nodes.cells().iter().filter_map(|n| n.as_ref())
    }

    pub fn critical_path(&self) -> &[IVec2] {
        &self.critical_path
    }

    pub fn entry(&self) -> IVec2 {
        self.critical_path[0]
    }

    pub fn exit(&self) -> IVec2 {
        self.critical_path[self.critical_path.len() - 1]
    }

    pub fn is_on_path(&self, pos: IVec2) -> bool {
        self.node(pos).is_some_and(|n| n.on_critical_path)
    }

    /// Lowest and highest row the critical path touches.
    pub fn path_rows(&self) -> (i32, i32) {
        let min = self.critical_path.iter().map(|p| p.y).min().unwrap_or(0);
        let max = self.critical_path.iter().map(|p| p.y).max().unwrap_or(0);
        (min, max)
    }

    pub fn connected(&self, a: IVec2, b: IVec2) -> bool {
        let Some(dir) = Direction::between(a, b) else {
            return false;
        };
        match (self.node(a), self.node(b)) {
            (Some(na), Some(nb)) => {
                na.connections.contains(dir) && nb.connections.contains(dir.opposite())
            }
            _ => false,
        }
    }

    /// Every connected pair of cells, each listed once.
    pub fn connection_pairs(&self) -> Vec<(IVec2, Direction)> {
        let mut pairs = Vec::new();
        for node in self.nodes() {
            for dir in node.connections.iter() {
                if matches!(dir, Direction::East | Direction::South) {
                    pairs.push((node.pos, dir));
                }
            }
        }
        pairs
    }
}

/// Critical-path synthesis: a downward pseudorandom walk through the room grid.
pub struct RoomGraphBuilder {
    width: i32,
    height: i32,
    disabled: Vec<(i32, i32)>,
    min_steps: i32,
    max_steps: i32,
    max_path_cells: usize,
    branch_count: usize,
}

impl RoomGraphBuilder {
    pub fn new(config: &LevelConfig) -> Self {
        let grid = &config.grid;
        Self {
            width: grid.width,
            height: grid.height,
            disabled: grid.disabled_cells.clone(),
            min_steps: grid.min_steps,
            max_steps: grid.max_steps,
            max_path_cells: grid.max_path_cells,
            branch_count: grid.branch_count,
        }
    }

    fn valid_mask(&self) -> Grid<bool> {
        let mut valid = Grid::new(self.width, self.height, true);
        for &(x, y) in &self.disabled {
            valid.set_clipped(x, y, false);
        }
        valid
    }

    pub fn build(&self, rng: &mut LevelRng) -> Result<RoomGraph, GenError> {
        if self.min_steps < 0 || self.min_steps > self.max_steps {
            return Err(GenError::invalid(format!(
                "step range {}..={} is empty or negative",
                self.min_steps, self.max_steps
            )));
        }
        let valid = self.valid_mask();
        let mut nodes: Grid<Option<RoomNode>> = Grid::new(self.width, self.height, None);
        for (pos, ok) in valid.iter() {
            if *ok {
                nodes.set(pos.x, pos.y, Some(RoomNode::new(pos)))?;
            }
        }

        let path = self.walk(&valid, rng)?;

        for pair in path.windows(2) {
            connect(&mut nodes, pair[0], pair[1])?;
        }
        for &pos in &path {
            if let Some(Some(node)) = nodes.get_mut(pos.x, pos.y) {
                node.on_critical_path = true;
                node.role = shape_role(node.connections);
            }
        }

        let entry = path[0];
        let exit = path[path.len() - 1];
        if let Some(Some(node)) = nodes.get_mut(exit.x, exit.y) {
            node.role = RoomRole::Exit;
            node.doors.insert(Direction::South);
        }
        if let Some(Some(node)) = nodes.get_mut(entry.x, entry.y) {
            node.role = RoomRole::Entry;
            node.doors.insert(Direction::North);
        }
        if path.len() >= 3 {
            let boss = path[path.len() - 2];
            if let Some(Some(node)) = nodes.get_mut(boss.x, boss.y) {
                node.role = RoomRole::Boss;
            }
        }

        let mut graph = RoomGraph {
            nodes,
            critical_path: path,
        };
        self.add_branches(&mut graph, rng)?;

        debug!(
            "room graph: {} path cells from {} to {}",
            graph.critical_path.len(),
            graph.entry(),
            graph.exit()
        );
        Ok(graph)
    }

    fn walk(&self, valid: &Grid<bool>, rng: &mut LevelRng) -> Result<Vec<IVec2>, GenError> {
        let is_valid = |p: IVec2| valid.at(p).unwrap_or(false);

        let top: Vec<i32> = (0..self.width)
            .filter(|&x| is_valid(IVec2::new(x, 0)))
            .collect();
        if top.is_empty() {
            return Err(GenError::invalid("no valid entry cell in the top row"));
        }
        let mut current = IVec2::new(top[rng.0.gen_range(0..top.len())], 0);
        let mut path = vec![current];

        for row in 0..self.height {
            // Each later row needs at least one cell for the descent.
            let rows_left = (self.height - 1 - row) as usize;
            let budget = self
                .max_path_cells
                .saturating_sub(path.len() + rows_left) as i32;
            let steps = rng.0.gen_range(self.min_steps..=self.max_steps).min(budget);

            let last_row = row == self.height - 1;
            let down = Direction::South.offset();
            // A column this walk can still descend from, at `from` or further along `dir`.
            let descent_ahead = |from: IVec2, dir: Direction, path: &[IVec2]| -> Option<Vec<IVec2>> {
                let mut probe = from;
                let mut cells = Vec::new();
                loop {
                    if is_valid(probe + down) {
                        return Some(cells);
                    }
                    probe += dir.offset();
                    if !is_valid(probe) || path.contains(&probe) {
                        return None;
                    }
                    cells.push(probe);
                }
            };

            let mut dir = if rng.0.gen_bool(0.5) {
                Direction::East
            } else {
                Direction::West
            };
            let blocked = !is_valid(current + dir.offset())
                || (!last_row && descent_ahead(current, dir, &path).is_none());
            if blocked {
                dir = dir.opposite();
            }

            for _ in 0..steps {
                let next = current + dir.offset();
                if !is_valid(next) || path.contains(&next) {
                    break;
                }
                if !last_row && descent_ahead(next, dir, &path).is_none() {
                    break;
                }
                current = next;
                path.push(current);
            }

            if last_row {
                break;
            }

            // Slide along the row to the nearest column that can descend.
            let slide = descent_ahead(current, dir, &path)
                .or_else(|| descent_ahead(current, dir.opposite(), &path))
                .ok_or_else(|| {
                    GenError::invalid(format!("critical path cannot descend from row {row}"))
                })?;
            for cell in slide {
                current = cell;
                path.push(current);
            }

            current += down;
            path.push(current);
        }

        Ok(path)
    }

    fn add_branches(&self, graph: &mut RoomGraph, rng: &mut LevelRng) -> Result<(), GenError> {
        for branch in 0..self.branch_count {
            let mut candidates = Vec::new();
            for &pos in &graph.critical_path {
                let Some(node) = graph.node(pos) else {
                    continue;
                };
                if matches!(node.role, RoomRole::Entry | RoomRole::Exit | RoomRole::Boss) {
                    continue;
                }
                for dir in Direction::ALL {
                    let side = pos + dir.offset();
                    let free = graph
                        .node(side)
                        .is_some_and(|n| !n.on_critical_path && !n.branch);
                    if free {
                        candidates.push((pos, side));
                    }
                }
            }
            if candidates.is_empty() {
                break;
            }

            let (from, to) = candidates[rng.0.gen_range(0..candidates.len())];
            connect(&mut graph.nodes, from, to)?;
            if let Some(Some(node)) = graph.nodes.get_mut(to.x, to.y) {
                node.branch = true;
                node.role = if branch == 0 {
                    RoomRole::Shop
                } else {
                    RoomRole::Side
                };
            }
        }
        Ok(())
    }
}

fn connect(nodes: &mut Grid<Option<RoomNode>>, a: IVec2, b: IVec2) -> Result<(), GenError> {
    let dir = Direction::between(a, b)
        .ok_or_else(|| GenError::invalid(format!("cells {a} and {b} are not adjacent")))?;
    if let Some(Some(node)) = nodes.get_mut(a.x, a.y) {
        node.connections.insert(dir);
    }
    if let Some(Some(node)) = nodes.get_mut(b.x, b.y) {
        node.connections.insert(dir.opposite());
    }
    Ok(())
}

fn shape_role(connections: DirectionSet) -> RoomRole {
    match (connections.horizontal_count(), connections.vertical_count()) {
        (0, _) => RoomRole::Vertical,
        (_, 0) => RoomRole::Horizontal,
        _ => RoomRole::Mixed,
    }
}
