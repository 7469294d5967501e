//! Configuration of the collision space and of the occupancy grid.

use nalgebra::{Point3, Vector3};

/// Default angular step between interpolated waypoints, per joint (about 2 degrees).
pub const DEFAULT_INCREMENT: f64 = 0.0348;

/// Default safety margin added to every sphere radius, meters.
pub const DEFAULT_PADDING: f64 = 0.005;

/// Default radius of the spheres an attached object is filled with, meters.
pub const DEFAULT_OBJECT_SPHERE_RADIUS: f64 = 0.03;

/// Default saturation distance of the distance field, meters.
pub const DEFAULT_MAX_DISTANCE: f64 = 0.40;

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionSpaceConfig {
    /// Sphere group the planner plans for (the default group).
    pub group_name: String,

    /// Planning joints, in the order configurations are given.
    pub planning_joints: Vec<String>,

    /// Maximal change of every joint between two interpolated waypoints, radians.
    /// Empty means [`DEFAULT_INCREMENT`] for each planning joint.
    pub increments: Vec<f64>,

    /// Added to every sphere radius before any contact test.
    pub padding: f64,

    /// Check coarse spheres first and fall back to fine ones only if they collide.
    pub use_multi_level_collision_check: bool,

    /// Radius of the spheres attached objects are filled with.
    pub object_enclosing_sphere_radius: f64,
}

impl Default for CollisionSpaceConfig {
    fn default() -> Self {
        CollisionSpaceConfig {
            group_name: String::new(),
            planning_joints: Vec::new(),
            increments: Vec::new(),
            padding: DEFAULT_PADDING,
            use_multi_level_collision_check: true,
            object_enclosing_sphere_radius: DEFAULT_OBJECT_SPHERE_RADIUS,
        }
    }
}

impl CollisionSpaceConfig {
    pub fn new(group_name: &str, planning_joints: &[&str]) -> Self {
        CollisionSpaceConfig {
            group_name: group_name.to_string(),
            planning_joints: planning_joints.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Increments for every planning joint, filling in the default when not configured.
    pub fn increments_or_default(&self) -> Vec<f64> {
        if self.increments.is_empty() {
            vec![DEFAULT_INCREMENT; self.planning_joints.len()]
        } else {
            self.increments.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGridConfig {
    /// Extent of the tracked volume, meters.
    pub size: Vector3<f64>,
    /// Cell edge, meters.
    pub resolution: f64,
    /// World position of the first cell.
    pub origin: Point3<f64>,
    /// Distances saturate at this value.
    pub max_distance: f64,
    /// Frame the grid is expressed in.
    pub reference_frame: String,
}

impl Default for OccupancyGridConfig {
    fn default() -> Self {
        OccupancyGridConfig {
            size: Vector3::new(2.0, 2.0, 2.0),
            resolution: 0.02,
            origin: Point3::new(-1.0, -1.0, -1.0),
            max_distance: DEFAULT_MAX_DISTANCE,
            reference_frame: "base_link".to_string(),
        }
    }
}
