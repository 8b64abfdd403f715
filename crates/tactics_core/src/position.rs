//! Grid coordinates, facings and board bounds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A (row, column) square on the board.
///
/// Rows grow downward and columns grow to the right. The only meaningful
/// negative coordinate is [`Position::UNPLACED`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    /// Row index.
    pub row: i32,
    /// Column index.
    pub col: i32,
}

impl Position {
    /// Sentinel for an occupant that is not placed on any board.
    pub const UNPLACED: Self = Self { row: -1, col: -1 };

    /// Create a new position.
    #[must_use]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Translate by a relative (row, column) offset.
    #[must_use]
    pub const fn offset(self, d_row: i32, d_col: i32) -> Self {
        Self {
            row: self.row + d_row,
            col: self.col + d_col,
        }
    }

    /// The neighbouring square one step in `direction`.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (d_row, d_col) = direction.delta();
        self.offset(d_row, d_col)
    }

    /// Whether this is a real board square rather than the sentinel.
    #[must_use]
    pub const fn is_placed(self) -> bool {
        self.row >= 0 && self.col >= 0
    }

    /// Grid (taxicab) distance between two squares.
    #[must_use]
    pub const fn manhattan_distance(self, other: Self) -> u32 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl From<(i32, i32)> for Position {
    fn from((row, col): (i32, i32)) -> Self {
        Self::new(row, col)
    }
}

/// Cardinal facing, used both for single movement steps and for orienting
/// an attack shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Toward row 0.
    #[default]
    Up,
    /// Toward higher columns.
    Right,
    /// Toward higher rows.
    Down,
    /// Toward column 0.
    Left,
}

impl Direction {
    /// All facings in clockwise order starting from `Up`.
    pub const ALL: [Self; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    /// Single-step (row, column) delta.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (-1, 0),
            Self::Right => (0, 1),
            Self::Down => (1, 0),
            Self::Left => (0, -1),
        }
    }

    /// The facing pointing the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Right => Self::Left,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
        }
    }

    /// Rotate an offset authored facing `Up` so that it faces `self`.
    ///
    /// Each clockwise quarter turn maps `(r, c)` to `(c, -r)`.
    #[must_use]
    pub const fn rotate(self, (d_row, d_col): (i32, i32)) -> (i32, i32) {
        match self {
            Self::Up => (d_row, d_col),
            Self::Right => (d_col, -d_row),
            Self::Down => (-d_row, -d_col),
            Self::Left => (-d_col, d_row),
        }
    }
}

/// Rectangular board dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardSize {
    /// Number of rows.
    pub rows: u32,
    /// Number of columns.
    pub cols: u32,
}

impl BoardSize {
    /// Create board dimensions.
    #[must_use]
    pub const fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    /// Whether `position` is a square of this board.
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        position.is_placed()
            && (position.row as u32) < self.rows
            && (position.col as u32) < self.cols
    }

    /// Every square in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.rows as i32)
            .flat_map(move |row| (0..self.cols as i32).map(move |col| Position::new(row, col)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_and_step() {
        let origin = Position::new(2, 3);
        assert_eq!(origin.offset(-1, 2), Position::new(1, 5));
        assert_eq!(origin.step(Direction::Up), Position::new(1, 3));
        assert_eq!(origin.step(Direction::Left), Position::new(2, 2));
    }

    #[test]
    fn test_unplaced_sentinel() {
        assert!(!Position::UNPLACED.is_placed());
        assert!(Position::new(0, 0).is_placed());
        assert!(!BoardSize::new(5, 5).contains(Position::UNPLACED));
    }

    #[test]
    fn test_rotation_of_forward_offset() {
        let forward = (-1, 0);
        assert_eq!(Direction::Up.rotate(forward), Direction::Up.delta());
        assert_eq!(Direction::Right.rotate(forward), Direction::Right.delta());
        assert_eq!(Direction::Down.rotate(forward), Direction::Down.delta());
        assert_eq!(Direction::Left.rotate(forward), Direction::Left.delta());
    }

    #[test]
    fn test_rotation_of_diagonal_offset() {
        // Forward-right diagonal
        let offset = (-1, 1);
        assert_eq!(Direction::Right.rotate(offset), (1, 1));
        assert_eq!(Direction::Down.rotate(offset), (1, -1));
        assert_eq!(Direction::Left.rotate(offset), (-1, -1));
    }

    #[test]
    fn test_opposite() {
        for direction in Direction::ALL {
            assert_eq!(direction.opposite().opposite(), direction);
            assert_ne!(direction.opposite(), direction);
        }
    }

    #[test]
    fn test_board_bounds() {
        let size = BoardSize::new(3, 4);
        assert!(size.contains(Position::new(2, 3)));
        assert!(!size.contains(Position::new(3, 0)));
        assert!(!size.contains(Position::new(0, 4)));
        assert!(!size.contains(Position::new(-1, 2)));
        assert_eq!(size.positions().count(), 12);
    }

    #[test]
    fn test_manhattan_distance() {
        assert_eq!(Position::new(0, 0).manhattan_distance(Position::new(2, 3)), 5);
        assert_eq!(Position::new(4, 1).manhattan_distance(Position::new(1, 4)), 6);
    }
}
