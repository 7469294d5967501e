//! Collision checking for robot arms approximated by spheres, intended to be called from the
//! inner loop of a discrete search motion planner.
//!
//! The robot body is described by sphere groups: named sets of spheres rigidly attached to
//! links, each available as a few large coarse spheres and many small fine ones. Obstacles
//! live in a distance field (occupancy grid) that returns, for every cell, the distance to the
//! nearest occupied cell. A sphere is in collision if the distance at its center does not
//! exceed its radius plus a uniform padding.
//!
//! # Features
//!
//! - Two level checks: the coarse spheres are tested first, the fine ones only if the coarse
//!   pass reports a possible collision. Forward kinematics is shared between the passes.
//! - Self collisions between the planning group and the other sphere groups, and parts of the
//!   robot inserted into the distance field as voxel groups.
//! - Path checks over interpolated waypoints, visited in interleaved order so that a collision
//!   anywhere along the path is found early.
//! - Objects attached to a link, filled with spheres and enclosed by a single sphere for the
//!   coarse pass.
//! - Clearance reporting, line segment checks over grid cells, scene updates.
//! - Robot descriptions and configuration from YAML (feature `allow_filesystem`).
//!
//! Out of bounds spheres, forward kinematics failures and mismatched joint counts are
//! reported as errors, never as "valid" or "in collision".
//!
//! # Example
//!
//! ```
//! use arm_collision_space::collisions::{CheckFlags, CollisionSpace};
//! use arm_collision_space::constraints::JointLimit;
//! use arm_collision_space::kinematics_impl::{ChainRobotModel, SegmentSpec, SphereSpec};
//! use arm_collision_space::occupancy_grid::OccupancyGrid;
//! use arm_collision_space::parameters::{CollisionSpaceConfig, OccupancyGridConfig};
//! use arm_collision_space::sphere_group::Resolution;
//! use nalgebra::{Isometry3, Point3, Vector3};
//!
//! let mut robot = ChainRobotModel::new("base_link");
//! robot.add_joint("shoulder", Vector3::z(), JointLimit::new(-3.0, 3.0));
//! robot.add_chain("arm", Isometry3::identity(), vec![SegmentSpec {
//!     link: "upper_arm".into(), origin: Isometry3::identity(), joint: Some("shoulder".into()),
//! }]).unwrap();
//! robot.add_sphere_group("arm", &["arm"], vec![SphereSpec {
//!     name: "s0".into(), link: "upper_arm".into(), center: Vector3::new(0.3, 0.0, 0.0),
//!     radius: 0.05, resolution: Resolution::Fine,
//! }]).unwrap();
//!
//! let mut grid = OccupancyGrid::new(&OccupancyGridConfig::default());
//! grid.add_points(&[Point3::new(0.0, 0.3, 0.0)]);
//!
//! let config = CollisionSpaceConfig::new("arm", &["shoulder"]);
//! let mut space = CollisionSpace::new(robot, grid, &config).unwrap();
//! assert!(space.check_collision(&[0.0], CheckFlags::empty()).unwrap().is_valid());
//! assert!(!space.check_collision(&[std::f64::consts::FRAC_PI_2], CheckFlags::empty()).unwrap().is_valid());
//! ```

pub mod parameters;

#[cfg(feature = "allow_filesystem")]
pub mod parameters_from_file;

#[cfg(feature = "allow_filesystem")]
pub mod robot_from_file;

pub mod parameter_error;
pub mod error;

#[path = "utils/utils.rs"]
pub mod utils;
pub mod kinematic_traits;
pub mod kinematics_impl;

pub mod constraints;

pub mod sphere_group;

pub mod distance_field;

pub mod bresenham;

pub mod occupancy_grid;

pub mod collision_object;

#[path = "path_plan/interpolator.rs"]
pub mod interpolator;

pub mod collisions;

pub mod scene;

#[cfg(test)]
mod tests;
