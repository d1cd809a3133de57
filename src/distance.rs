use bevy::math::{IVec2, Vec2};

/// Distance calculation algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceAlg {
    /// Straight-line distance: sqrt((x2-x1)² + (y2-y1)²)
    /// Used for clearance radii around portals.
    Pythagoras,
    /// Axis-aligned travel: |x2-x1| + |y2-y1|
    /// Used for corridor heuristics and waypoint ranking.
    Manhattan,
    /// max(|x2-x1|, |y2-y1|)
    /// Used for ring-by-ring searches.
    Chebyshev,
}

impl DistanceAlg {
    pub fn distance2d(&self, p1: Vec2, p2: Vec2) -> f32 {
        let delta = (p2 - p1).abs();

        match self {
            DistanceAlg::Pythagoras => delta.length(),
            DistanceAlg::Manhattan => delta.x + delta.y,
            DistanceAlg::Chebyshev => delta.x.max(delta.y),
        }
    }

    pub fn distance_tiles(&self, p1: IVec2, p2: IVec2) -> i32 {
        let delta = (p2 - p1).abs();

        match self {
            DistanceAlg::Pythagoras => (delta.as_vec2().length()).round() as i32,
            DistanceAlg::Manhattan => delta.x + delta.y,
            DistanceAlg::Chebyshev => delta.x.max(delta.y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_agree_on_axis() {
        let a = Vec2::new(1.0, 1.0);
        let b = Vec2::new(4.0, 1.0);
        for alg in [DistanceAlg::Pythagoras, DistanceAlg::Manhattan, DistanceAlg::Chebyshev] {
            assert_eq!(alg.distance2d(a, b), 3.0);
        }
    }

    #[test]
    fn metrics_differ_on_diagonal() {
        let a = IVec2::new(0, 0);
        let b = IVec2::new(3, 4);
        assert_eq!(DistanceAlg::Manhattan.distance_tiles(a, b), 7);
        assert_eq!(DistanceAlg::Chebyshev.distance_tiles(a, b), 4);
        assert_eq!(DistanceAlg::Pythagoras.distance_tiles(a, b), 5);
    }
}
