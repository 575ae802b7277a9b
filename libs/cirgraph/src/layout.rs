//! Cosmetic 2-D placement for reconstructed schematics.
//!
//! Positions are a presentation concern: the topology engine never reads
//! them. The reconstruction pipeline accepts any [`Placer`] so that a host
//! tool can substitute its own layout policy.

use serde::{Deserialize, Serialize};

/// A 2-D layout position.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// A source of layout positions for newly created nodes.
pub trait Placer {
    /// Returns the position for the next node.
    fn next_position(&mut self) -> Position;
}

/// A row-wrapping position generator.
///
/// Positions advance left to right by `margin` and wrap to a new row once
/// `max_width` is exceeded. When `alternate` is set, even rows are shifted
/// right by half a margin so vertically adjacent nodes do not stack.
#[derive(Debug, Clone)]
pub struct GridPlacer {
    margin: f64,
    max_width: f64,
    alternate: bool,
    x: f64,
    y: f64,
    row: u32,
}

impl GridPlacer {
    /// Creates a grid placer with the given margin and row width.
    pub fn new(margin: f64, max_width: f64, alternate: bool) -> Self {
        Self {
            margin,
            max_width,
            alternate,
            x: 50.0,
            y: 50.0,
            row: 0,
        }
    }
}

impl Default for GridPlacer {
    fn default() -> Self {
        Self::new(200.0, 800.0, true)
    }
}

impl Placer for GridPlacer {
    fn next_position(&mut self) -> Position {
        if self.x + self.margin > self.max_width {
            self.x = 50.0;
            self.y += self.margin;
            self.row += 1;
        }
        self.x += self.margin;
        let x = if self.row % 2 == 0 && self.alternate {
            self.x + self.margin / 2.0
        } else {
            self.x
        };
        Position { x, y: self.y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_placer_wraps_rows() {
        let mut placer = GridPlacer::new(200.0, 800.0, false);
        let first = placer.next_position();
        assert_eq!(first, Position { x: 250.0, y: 50.0 });
        let second = placer.next_position();
        assert_eq!(second, Position { x: 450.0, y: 50.0 });
        // Third placement exceeds the row width and wraps.
        let _third = placer.next_position();
        let fourth = placer.next_position();
        assert_eq!(fourth.y, 250.0);
    }

    #[test]
    fn alternating_rows_are_offset() {
        let mut plain = GridPlacer::new(200.0, 800.0, false);
        let mut offset = GridPlacer::new(200.0, 800.0, true);
        let a = plain.next_position();
        let b = offset.next_position();
        assert_eq!(b.x, a.x + 100.0);
        assert_eq!(b.y, a.y);
    }
}
