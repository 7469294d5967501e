//! Distance field: for every cell of a regular 3D grid, the distance to the nearest
//! occupied cell, saturated at a maximum distance.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;

use nalgebra::{Point3, Vector3};

/// Integer cell coordinate. Signed, as world points outside of the grid map to
/// negative indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridCell {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        GridCell { x, y, z }
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.x, self.y, self.z)
    }
}

/// Spatial distance index used by the collision checks.
pub trait DistanceField {
    /// Edge length of a cell, meters.
    fn resolution(&self) -> f64;

    /// World position of the center of cell (0, 0, 0).
    fn origin(&self) -> Point3<f64>;

    /// Number of cells along x, y and z.
    fn cell_counts(&self) -> (usize, usize, usize);

    /// Distance at which the field saturates.
    fn max_distance(&self) -> f64;

    fn world_to_grid(&self, point: &Point3<f64>) -> GridCell {
        let local = (point - self.origin()) / self.resolution();
        GridCell::new(local.x.round() as i32, local.y.round() as i32, local.z.round() as i32)
    }

    fn grid_to_world(&self, cell: GridCell) -> Point3<f64> {
        self.origin() + Vector3::new(cell.x as f64, cell.y as f64, cell.z as f64) * self.resolution()
    }

    fn is_in_bounds(&self, cell: GridCell) -> bool {
        let (nx, ny, nz) = self.cell_counts();
        cell.x >= 0 && cell.y >= 0 && cell.z >= 0
            && (cell.x as usize) < nx && (cell.y as usize) < ny && (cell.z as usize) < nz
    }

    /// Distance from the cell to the nearest obstacle, meters. Cells out of bounds
    /// report the saturation distance; check bounds first.
    fn distance(&self, cell: GridCell) -> f64;

    /// Marks the cells containing the points as occupied and updates distances.
    /// Points outside of the grid are ignored.
    fn add_points(&mut self, points: &[Point3<f64>]);

    /// Clears all obstacles.
    fn reset(&mut self);
}

/// Dense distance field. Obstacles are propagated from every occupied cell through the
/// 26-neighbourhood; each cell keeps its nearest obstacle cell, the distance is the
/// Euclidean distance between the two cell centers. Propagation stops at `max_distance`.
#[derive(Debug, Clone)]
pub struct PropagationDistanceField {
    resolution: f64,
    origin: Point3<f64>,
    counts: (usize, usize, usize),
    max_distance: f64,
    /// Saturation in squared cell units.
    max_distance_sq: i64,
    /// Squared distance to the nearest obstacle in cell units.
    distance_sq: Vec<i64>,
    /// Nearest obstacle cell, if any within range.
    closest: Vec<Option<GridCell>>,
}

const NEIGHBOURS: [(i32, i32, i32); 26] = {
    let mut n = [(0, 0, 0); 26];
    let mut i = 0;
    let mut dx = -1;
    while dx <= 1 {
        let mut dy = -1;
        while dy <= 1 {
            let mut dz = -1;
            while dz <= 1 {
                if dx != 0 || dy != 0 || dz != 0 {
                    n[i] = (dx, dy, dz);
                    i += 1;
                }
                dz += 1;
            }
            dy += 1;
        }
        dx += 1;
    }
    n
};

impl PropagationDistanceField {
    /// Creates the field covering `size` meters from `origin` (the center of the first cell).
    pub fn new(size: Vector3<f64>, resolution: f64, origin: Point3<f64>, max_distance: f64) -> Self {
        let count = |s: f64| ((s / resolution).round() as usize).max(1);
        let counts = (count(size.x), count(size.y), count(size.z));
        let cells = counts.0 * counts.1 * counts.2;
        let max_cells = max_distance / resolution;
        let max_distance_sq = (max_cells * max_cells).ceil() as i64;
        PropagationDistanceField {
            resolution,
            origin,
            counts,
            max_distance,
            max_distance_sq,
            distance_sq: vec![max_distance_sq; cells],
            closest: vec![None; cells],
        }
    }

    fn index(&self, cell: GridCell) -> usize {
        let (nx, ny, _) = self.counts;
        (cell.z as usize * ny + cell.y as usize) * nx + cell.x as usize
    }

    fn cell_of(&self, index: usize) -> GridCell {
        let (nx, ny, _) = self.counts;
        let x = index % nx;
        let y = (index / nx) % ny;
        let z = index / (nx * ny);
        GridCell::new(x as i32, y as i32, z as i32)
    }

    fn squared_cells(a: GridCell, b: GridCell) -> i64 {
        let dx = (a.x - b.x) as i64;
        let dy = (a.y - b.y) as i64;
        let dz = (a.z - b.z) as i64;
        dx * dx + dy * dy + dz * dz
    }

    fn propagate(&mut self, mut queue: BinaryHeap<Reverse<(i64, usize)>>) {
        while let Some(Reverse((dist_sq, index))) = queue.pop() {
            if dist_sq > self.distance_sq[index] {
                continue; // Stale entry
            }
            let Some(obstacle) = self.closest[index] else { continue };
            let cell = self.cell_of(index);
            for (dx, dy, dz) in NEIGHBOURS {
                let next = GridCell::new(cell.x + dx, cell.y + dy, cell.z + dz);
                if !self.is_in_bounds(next) {
                    continue;
                }
                let next_dist_sq = Self::squared_cells(next, obstacle);
                if next_dist_sq >= self.max_distance_sq {
                    continue;
                }
                let next_index = self.index(next);
                if next_dist_sq < self.distance_sq[next_index] {
                    self.distance_sq[next_index] = next_dist_sq;
                    self.closest[next_index] = Some(obstacle);
                    queue.push(Reverse((next_dist_sq, next_index)));
                }
            }
        }
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.distance_sq.iter().filter(|&&d| d == 0).count()
    }
}

impl DistanceField for PropagationDistanceField {
    fn resolution(&self) -> f64 {
        self.resolution
    }

    fn origin(&self) -> Point3<f64> {
        self.origin
    }

    fn cell_counts(&self) -> (usize, usize, usize) {
        self.counts
    }

    fn max_distance(&self) -> f64 {
        self.max_distance
    }

    fn distance(&self, cell: GridCell) -> f64 {
        if !self.is_in_bounds(cell) {
            return self.max_distance;
        }
        let dist_sq = self.distance_sq[self.index(cell)];
        if dist_sq >= self.max_distance_sq {
            return self.max_distance;
        }
        ((dist_sq as f64).sqrt() * self.resolution).min(self.max_distance)
    }

    fn add_points(&mut self, points: &[Point3<f64>]) {
        let mut queue = BinaryHeap::with_capacity(points.len());
        for point in points {
            let cell = self.world_to_grid(point);
            if !self.is_in_bounds(cell) {
                continue;
            }
            let index = self.index(cell);
            if self.distance_sq[index] != 0 {
                self.distance_sq[index] = 0;
                self.closest[index] = Some(cell);
                queue.push(Reverse((0, index)));
            }
        }
        self.propagate(queue);
    }

    fn reset(&mut self) {
        self.distance_sq.fill(self.max_distance_sq);
        self.closest.fill(None);
    }
}
