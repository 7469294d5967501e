//! Occupancy grid: the distance field the collision space queries, together with the
//! frame it is expressed in and helpers to fill it with obstacles.

use nalgebra::{Isometry3, Point3, Vector3};
use tracing::debug;

use crate::collision_object::{CollisionMap, PlacedShape};
use crate::distance_field::{DistanceField, GridCell, PropagationDistanceField};
use crate::parameters::OccupancyGridConfig;

/// Distance field either owned by the grid or lent to it by the caller. Only an owned field
/// is dropped with the grid.
pub enum GridHandle<'a> {
    Owned(Box<dyn DistanceField + 'a>),
    Borrowed(&'a mut (dyn DistanceField + 'a)),
}

impl<'a> GridHandle<'a> {
    fn field(&self) -> &(dyn DistanceField + 'a) {
        match self {
            GridHandle::Owned(field) => field.as_ref(),
            GridHandle::Borrowed(field) => &**field,
        }
    }

    fn field_mut(&mut self) -> &mut (dyn DistanceField + 'a) {
        match self {
            GridHandle::Owned(field) => field.as_mut(),
            GridHandle::Borrowed(field) => &mut **field,
        }
    }
}

pub struct OccupancyGrid<'a> {
    handle: GridHandle<'a>,
    reference_frame: String,
}

impl OccupancyGrid<'static> {
    /// Grid owning a new [`PropagationDistanceField`].
    pub fn new(config: &OccupancyGridConfig) -> Self {
        let field = PropagationDistanceField::new(
            config.size,
            config.resolution,
            config.origin,
            config.max_distance,
        );
        let (nx, ny, nz) = field.cell_counts();
        debug!("Occupancy grid {}x{}x{} cells at {:.3} m in '{}'",
            nx, ny, nz, config.resolution, config.reference_frame);
        OccupancyGrid {
            handle: GridHandle::Owned(Box::new(field)),
            reference_frame: config.reference_frame.clone(),
        }
    }
}

impl<'a> OccupancyGrid<'a> {
    /// Grid over an existing field the caller keeps owning.
    pub fn borrowed(field: &'a mut (dyn DistanceField + 'a), reference_frame: &str) -> Self {
        OccupancyGrid {
            handle: GridHandle::Borrowed(field),
            reference_frame: reference_frame.to_string(),
        }
    }

    /// Grid taking ownership of any distance field implementation.
    pub fn owned(field: Box<dyn DistanceField + 'a>, reference_frame: &str) -> Self {
        OccupancyGrid {
            handle: GridHandle::Owned(field),
            reference_frame: reference_frame.to_string(),
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self.handle, GridHandle::Owned(_))
    }

    pub fn field(&self) -> &(dyn DistanceField + 'a) {
        self.handle.field()
    }

    pub fn reference_frame(&self) -> &str {
        &self.reference_frame
    }

    pub fn set_reference_frame(&mut self, frame: &str) {
        self.reference_frame = frame.to_string();
    }

    pub fn resolution(&self) -> f64 {
        self.field().resolution()
    }

    pub fn origin(&self) -> Point3<f64> {
        self.field().origin()
    }

    /// Number of cells along each axis.
    pub fn grid_size(&self) -> (usize, usize, usize) {
        self.field().cell_counts()
    }

    /// Extent of the grid, meters.
    pub fn world_size(&self) -> Vector3<f64> {
        let (nx, ny, nz) = self.grid_size();
        Vector3::new(nx as f64, ny as f64, nz as f64) * self.resolution()
    }

    pub fn max_distance(&self) -> f64 {
        self.field().max_distance()
    }

    pub fn reset(&mut self) {
        self.handle.field_mut().reset();
    }

    pub fn world_to_grid(&self, point: &Point3<f64>) -> GridCell {
        self.field().world_to_grid(point)
    }

    pub fn grid_to_world(&self, cell: GridCell) -> Point3<f64> {
        self.field().grid_to_world(cell)
    }

    pub fn is_in_bounds(&self, cell: GridCell) -> bool {
        self.field().is_in_bounds(cell)
    }

    pub fn distance(&self, cell: GridCell) -> f64 {
        self.field().distance(cell)
    }

    /// Distance at a world point, `None` outside of the grid.
    pub fn distance_from_point(&self, point: &Point3<f64>) -> Option<f64> {
        let cell = self.world_to_grid(point);
        if self.is_in_bounds(cell) {
            Some(self.distance(cell))
        } else {
            None
        }
    }

    pub fn add_points(&mut self, points: &[Point3<f64>]) {
        self.handle.field_mut().add_points(points);
    }

    /// Fills an axis-aligned box with obstacle points at the grid resolution.
    pub fn add_cube(&mut self, center: &Point3<f64>, size: &Vector3<f64>) {
        let resolution = self.resolution();
        let corner = center - size / 2.0;
        let steps = size.map(|s| (s / resolution + 1E-9).floor().max(0.0) as usize);
        let mut points = Vec::with_capacity((steps.x + 1) * (steps.y + 1) * (steps.z + 1));
        for i in 0..=steps.x {
            for j in 0..=steps.y {
                for k in 0..=steps.z {
                    points.push(corner + Vector3::new(i as f64, j as f64, k as f64) * resolution);
                }
            }
        }
        self.add_points(&points);
    }

    /// Inserts the box centers of a collision map and takes its frame as reference frame.
    pub fn add_collision_map(&mut self, map: &CollisionMap) {
        if map.boxes.is_empty() {
            debug!("Collision map in '{}' is empty", map.frame_id);
            return;
        }
        self.reference_frame = map.frame_id.clone();
        self.add_points(&map.boxes);
        debug!("Added collision map with {} boxes", map.boxes.len());
    }

    /// Rasterizes a shape placed in the grid frame: every cell whose center lies inside
    /// the shape becomes occupied. A shape that covers no cell center still occupies the
    /// cell of its origin. Returns the number of points inserted.
    pub fn add_shape(&mut self, shape: &PlacedShape) -> usize {
        let points = self.shape_points(shape);
        self.add_points(&points);
        points.len()
    }

    fn shape_points(&self, placed: &PlacedShape) -> Vec<Point3<f64>> {
        let (shape, pose) = placed.parry_pose(&Isometry3::identity());
        let aabb = shape.compute_aabb(&pose);
        let (nx, ny, nz) = self.grid_size();
        let low = self.world_to_grid(&aabb.mins.cast::<f64>());
        let high = self.world_to_grid(&aabb.maxs.cast::<f64>());
        let clamp = |v: i32, n: usize| v.clamp(0, n as i32 - 1);

        let mut points = Vec::new();
        for x in clamp(low.x, nx)..=clamp(high.x, nx) {
            for y in clamp(low.y, ny)..=clamp(high.y, ny) {
                for z in clamp(low.z, nz)..=clamp(high.z, nz) {
                    let center = self.grid_to_world(GridCell::new(x, y, z));
                    if shape.contains_point(&pose, &center.cast::<f32>()) {
                        points.push(center);
                    }
                }
            }
        }
        if points.is_empty() {
            points.push(Point3::from(placed.pose.translation.vector));
        }
        points
    }

    /// World positions of all occupied cells.
    pub fn occupied_voxels(&self) -> Vec<Point3<f64>> {
        let (nx, ny, nz) = self.grid_size();
        let mut voxels = Vec::new();
        for x in 0..nx as i32 {
            for y in 0..ny as i32 {
                for z in 0..nz as i32 {
                    let cell = GridCell::new(x, y, z);
                    if self.distance(cell) == 0.0 {
                        voxels.push(self.grid_to_world(cell));
                    }
                }
            }
        }
        voxels
    }

    /// Occupied cells within the cube of half edge `radius` around `center`.
    pub fn occupied_voxels_in_sphere(&self, center: &Point3<f64>, radius: f64) -> Vec<Point3<f64>> {
        let reach = (radius / self.resolution()).ceil() as i32;
        let middle = self.world_to_grid(center);
        let mut voxels = Vec::new();
        for x in -reach..=reach {
            for y in -reach..=reach {
                for z in -reach..=reach {
                    let cell = GridCell::new(middle.x + x, middle.y + y, middle.z + z);
                    if self.is_in_bounds(cell) && self.distance(cell) == 0.0 {
                        voxels.push(self.grid_to_world(cell));
                    }
                }
            }
        }
        voxels
    }

    /// Points sampling an oriented box at the grid resolution, in the grid frame.
    /// The field is not touched.
    pub fn occupied_voxels_of_box(&self, pose: &Isometry3<f64>, dims: &Vector3<f64>) -> Vec<Point3<f64>> {
        let resolution = self.resolution();
        let steps = dims.map(|d| (d / resolution + 1E-9).floor().max(0.0) as usize);
        let corner = -dims / 2.0;
        let mut voxels = Vec::with_capacity((steps.x + 1) * (steps.y + 1) * (steps.z + 1));
        for i in 0..=steps.x {
            for j in 0..=steps.y {
                for k in 0..=steps.z {
                    let local = corner + Vector3::new(i as f64, j as f64, k as f64) * resolution;
                    voxels.push(pose.transform_point(&Point3::from(local)));
                }
            }
        }
        voxels
    }
}
