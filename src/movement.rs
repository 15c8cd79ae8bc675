//! Compass-direction movement resolution.
//!
//! Remote peers phrase movement as `(direction label, distance in grid
//! units)`. This module turns that into a pixel-space displacement:
//!
//! ```text
//! displacement = (unit / |unit|) * distance * pixels_per_unit
//! ```
//!
//! Direction vectors use screen coordinates (y grows downward), so
//! `north` is `(0, -1)`. Diagonals store `(±1, ±1)` and are normalized
//! here, at resolve time, never in the table. An unknown label resolves
//! to a zero displacement; callers treat that as "no move", not an error.

use crate::types::Vec2;

// ---------------------------------------------------------------------------
// Directions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Northeast,
    Southeast,
    Southwest,
    Northwest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::Northeast,
        Direction::Southeast,
        Direction::Southwest,
        Direction::Northwest,
    ];

    /// Exact label match. Labels are lowercase English compass points;
    /// anything else is `None`.
    pub fn parse(label: &str) -> Option<Direction> {
        match label {
            "north" => Some(Direction::North),
            "south" => Some(Direction::South),
            "east" => Some(Direction::East),
            "west" => Some(Direction::West),
            "northeast" => Some(Direction::Northeast),
            "southeast" => Some(Direction::Southeast),
            "southwest" => Some(Direction::Southwest),
            "northwest" => Some(Direction::Northwest),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
            Direction::Northeast => "northeast",
            Direction::Southeast => "southeast",
            Direction::Southwest => "southwest",
            Direction::Northwest => "northwest",
        }
    }

    /// Raw direction vector in screen coordinates (y down), diagonals
    /// not normalized.
    pub fn unit(&self) -> Vec2 {
        match self {
            Direction::North => Vec2::new(0.0, -1.0),
            Direction::South => Vec2::new(0.0, 1.0),
            Direction::East => Vec2::new(1.0, 0.0),
            Direction::West => Vec2::new(-1.0, 0.0),
            Direction::Northeast => Vec2::new(1.0, -1.0),
            Direction::Southeast => Vec2::new(1.0, 1.0),
            Direction::Southwest => Vec2::new(-1.0, 1.0),
            Direction::Northwest => Vec2::new(-1.0, -1.0),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Displacement
// ---------------------------------------------------------------------------

/// Resolve a direction label and distance (grid units) into a pixel
/// displacement. Unknown labels yield exactly `(0, 0)`.
pub fn displacement(label: &str, distance: f64, pixels_per_unit: f64) -> Vec2 {
    let dir = Direction::parse(label)
        .map(|d| d.unit())
        .unwrap_or_else(Vec2::zero);

    // Zero magnitude counts as 1 so the zero vector stays zero instead
    // of dividing 0/0.
    let normalizer = match dir.magnitude() {
        m if m == 0.0 => 1.0,
        m => m,
    };

    let move_distance = distance * pixels_per_unit;
    Vec2::new(
        (dir.x / normalizer) * move_distance,
        (dir.y / normalizer) * move_distance,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_eight_labels() {
        for dir in Direction::ALL {
            assert_eq!(Direction::parse(dir.label()), Some(dir));
        }
        assert_eq!(Direction::parse("sideways"), None);
        assert_eq!(Direction::parse("North"), None); // exact match only
        assert_eq!(Direction::parse(""), None);
    }

    #[test]
    fn cardinal_displacement_scales_by_grid() {
        // 2 grid units north at 150 px/unit = 300 px straight up.
        let d = displacement("north", 2.0, 150.0);
        assert_eq!(d, Vec2::new(0.0, -300.0));

        let d = displacement("east", 1.0, 70.0);
        assert_eq!(d, Vec2::new(70.0, 0.0));
    }

    #[test]
    fn every_direction_covers_the_commanded_distance() {
        for dir in Direction::ALL {
            let d = displacement(dir.label(), 3.0, 70.0);
            assert!((d.magnitude() - 210.0).abs() < 1e-9, "{dir}");
        }
    }

    #[test]
    fn diagonal_displacement_is_normalized() {
        let d = displacement("northeast", 1.0, 150.0);
        let expected = (1.0 / 2.0_f64.sqrt()) * 150.0;
        assert_eq!(d.x, expected);
        assert_eq!(d.y, -expected);
        // Total distance still one grid unit.
        assert!((d.magnitude() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn southwest_points_down_left() {
        let d = displacement("southwest", 1.0, 100.0);
        assert!(d.x < 0.0);
        assert!(d.y > 0.0);
    }

    #[test]
    fn unknown_direction_is_a_zero_move() {
        assert_eq!(displacement("upward", 5.0, 150.0), Vec2::zero());
        assert_eq!(displacement("", 5.0, 150.0), Vec2::zero());
    }

    #[test]
    fn zero_distance_moves_nowhere() {
        assert_eq!(displacement("south", 0.0, 150.0), Vec2::zero());
    }
}
