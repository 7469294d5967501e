//! 3D Bresenham traversal between two grid cells.

use crate::distance_field::GridCell;

/// Iterator over the cells of the digital line from `start` to `end`, both included.
/// The driving axis is the one with the largest extent; every step advances it by one.
#[derive(Debug, Clone)]
pub struct Bresenham3d {
    current: [i32; 3],
    step: [i32; 3],
    delta: [i32; 3],
    /// Index of the driving axis.
    driver: usize,
    errors: [i32; 3],
    remaining: i32,
    done: bool,
}

impl Bresenham3d {
    pub fn new(start: GridCell, end: GridCell) -> Self {
        let s = [start.x, start.y, start.z];
        let e = [end.x, end.y, end.z];
        let delta = [(e[0] - s[0]).abs(), (e[1] - s[1]).abs(), (e[2] - s[2]).abs()];
        let step = [(e[0] - s[0]).signum(), (e[1] - s[1]).signum(), (e[2] - s[2]).signum()];
        let driver = if delta[0] >= delta[1] && delta[0] >= delta[2] {
            0
        } else if delta[1] >= delta[2] {
            1
        } else {
            2
        };
        let mut errors = [0; 3];
        for axis in 0..3 {
            if axis != driver {
                errors[axis] = 2 * delta[axis] - delta[driver];
            }
        }
        Bresenham3d {
            current: s,
            step,
            delta,
            driver,
            errors,
            remaining: delta[driver],
            done: false,
        }
    }
}

impl Iterator for Bresenham3d {
    type Item = GridCell;

    fn next(&mut self) -> Option<GridCell> {
        if self.done {
            return None;
        }
        let cell = GridCell::new(self.current[0], self.current[1], self.current[2]);
        if self.remaining == 0 {
            self.done = true;
            return Some(cell);
        }
        let d = self.driver;
        for axis in 0..3 {
            if axis == d {
                continue;
            }
            if self.errors[axis] >= 0 {
                self.current[axis] += self.step[axis];
                self.errors[axis] -= 2 * self.delta[d];
            }
            self.errors[axis] += 2 * self.delta[axis];
        }
        self.current[d] += self.step[d];
        self.remaining -= 1;
        Some(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(a: (i32, i32, i32), b: (i32, i32, i32)) -> Vec<GridCell> {
        Bresenham3d::new(GridCell::new(a.0, a.1, a.2), GridCell::new(b.0, b.1, b.2)).collect()
    }

    #[test]
    fn test_single_cell() {
        assert_eq!(cells((2, 3, 4), (2, 3, 4)), vec![GridCell::new(2, 3, 4)]);
    }

    #[test]
    fn test_axis_aligned() {
        let line = cells((0, 0, 0), (4, 0, 0));
        assert_eq!(line.len(), 5);
        for (i, c) in line.iter().enumerate() {
            assert_eq!(*c, GridCell::new(i as i32, 0, 0));
        }
    }

    #[test]
    fn test_negative_direction() {
        let line = cells((0, 5, 0), (0, 1, 0));
        assert_eq!(line.first(), Some(&GridCell::new(0, 5, 0)));
        assert_eq!(line.last(), Some(&GridCell::new(0, 1, 0)));
        assert_eq!(line.len(), 5);
    }

    #[test]
    fn test_diagonal_is_connected() {
        let line = cells((1, 2, 3), (9, -4, 7));
        assert_eq!(line.len(), 9);
        assert_eq!(line.first(), Some(&GridCell::new(1, 2, 3)));
        assert_eq!(line.last(), Some(&GridCell::new(9, -4, 7)));
        for pair in line.windows(2) {
            assert!((pair[1].x - pair[0].x).abs() <= 1);
            assert!((pair[1].y - pair[0].y).abs() <= 1);
            assert!((pair[1].z - pair[0].z).abs() <= 1);
        }
    }
}
