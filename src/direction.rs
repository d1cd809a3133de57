use bevy::math::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

struct DirectionInfo {
    offset: IVec2,
    opposite: Direction,
}

// Tile space has y growing downward, so North is -y.
const TABLE: [DirectionInfo; 4] = [
    DirectionInfo {
        offset: IVec2::new(0, -1),
        opposite: Direction::South,
    },
    DirectionInfo {
        offset: IVec2::new(0, 1),
        opposite: Direction::North,
    },
    DirectionInfo {
        offset: IVec2::new(1, 0),
        opposite: Direction::West,
    },
    DirectionInfo {
        offset: IVec2::new(-1, 0),
        opposite: Direction::East,
    },
];

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    fn info(self) -> &'static DirectionInfo {
        &TABLE[self as usize]
    }

    pub fn offset(self) -> IVec2 {
        self.info().offset
    }

    pub fn unit(self) -> Vec2 {
        self.offset().as_vec2()
    }

    pub fn opposite(self) -> Direction {
        self.info().opposite
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::North | Direction::South)
    }

    pub fn is_horizontal(self) -> bool {
        !self.is_vertical()
    }

    /// Direction from `from` to a 4-adjacent `to`, if they are adjacent.
    pub fn between(from: IVec2, to: IVec2) -> Option<Direction> {
        let delta = to - from;
        Direction::ALL.into_iter().find(|d| d.offset() == delta)
    }
}

/// Small set of directions, stored as bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectionSet(u8);

impl DirectionSet {
    pub const EMPTY: DirectionSet = DirectionSet(0);

    fn bit(direction: Direction) -> u8 {
        1 << direction as u8
    }

    pub fn insert(&mut self, direction: Direction) {
        self.0 |= Self::bit(direction);
    }

    pub fn with(mut self, direction: Direction) -> Self {
        self.insert(direction);
        self
    }

    pub fn contains(self, direction: Direction) -> bool {
        self.0 & Self::bit(direction) != 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |d| self.contains(*d))
    }

    pub fn horizontal_count(self) -> usize {
        self.iter().filter(|d| d.is_horizontal()).count()
    }

    pub fn vertical_count(self) -> usize {
        self.iter().filter(|d| d.is_vertical()).count()
    }
}

impl FromIterator<Direction> for DirectionSet {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        let mut set = DirectionSet::EMPTY;
        for direction in iter {
            set.insert(direction);
        }
        set
    }
}
