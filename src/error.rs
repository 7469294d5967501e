//! Failures of collision queries and model setup.
//!
//! A query that returns `Err` did not produce a verdict at all. This is different from a
//! configuration that is in collision: an out-of-bounds sphere means the state of the robot
//! is unknown, not that it is blocked.

use nalgebra::Point3;

use crate::distance_field::GridCell;
use crate::kinematic_traits::FrameKey;

#[derive(Debug, thiserror::Error)]
pub enum CollisionError {
    /// A sphere or voxel link refers to a transform the forward kinematics does not produce.
    #[error("frame key {key} of '{owner}' does not exist in the frames of group '{group}'")]
    FrameKey {
        group: String,
        owner: String,
        key: FrameKey,
    },

    #[error("failed to compute forward kinematics for group '{0}'")]
    ForwardKinematics(String),

    /// Posed sphere center is outside the volume tracked by the distance field.
    #[error("sphere '{sphere}' with center at {position} (cell {cell}) is out of bounds")]
    OutOfBounds {
        sphere: String,
        position: Point3<f64>,
        cell: GridCell,
    },

    /// A cell passed directly (line segment checks) is outside of the field.
    #[error("cell {0} is out of bounds")]
    CellOutOfBounds(GridCell),

    #[error("expected {expected} joint values, found {found}")]
    JointCountMismatch { expected: usize, found: usize },

    #[error(
        "length of sphere lists received don't match up (group1: {group1} {{{declared1}, {posed1}}}  \
         group2: {group2} {{{declared2}, {posed2}}})"
    )]
    SphereCountMismatch {
        group1: String,
        declared1: usize,
        posed1: usize,
        group2: String,
        declared2: usize,
        posed2: usize,
    },

    /// The path between two configurations cannot be interpolated, normally because one of
    /// the end points violates joint limits.
    #[error(
        "failed to interpolate the path\n  start: {start:?}\n    end: {end:?}\n    min: {min:?}\n    max: {max:?}"
    )]
    Interpolation {
        start: Vec<f64>,
        end: Vec<f64>,
        min: Vec<f64>,
        max: Vec<f64>,
    },

    #[error("unknown group '{0}'")]
    UnknownGroup(String),

    #[error("unknown joint '{0}'")]
    UnknownJoint(String),

    #[error("link '{link}' is not part of group '{group}'")]
    UnknownLink { group: String, link: String },

    #[error("default group name is not set, set it before setting planning joints")]
    DefaultGroupNotSet,

    #[error("planning scene rejected: {0}")]
    Scene(String),
}
