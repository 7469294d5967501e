//! Implements collision detection

use bitflags::bitflags;
use nalgebra::Point3;
use tracing::{debug, error, info, warn};

use crate::bresenham::Bresenham3d;
use crate::collision_object::{AttachedObject, CollisionMap, CollisionObject};
use crate::constraints::{JointLimit, JointLimits};
use crate::distance_field::GridCell;
use crate::error::CollisionError;
use crate::interpolator;
use crate::kinematic_traits::{Frames, Joints, RobotModel};
use crate::occupancy_grid::OccupancyGrid;
use crate::parameters::{CollisionSpaceConfig, DEFAULT_INCREMENT};
use crate::sphere_group::{PosedSphere, Resolution, Sphere, SphereGroup};
use crate::utils::{format_joints, format_values, normalize_joints};

/// Number of interleaved phases the waypoints of a path are visited in.
pub const PATH_CHECK_PHASES: usize = 5;

bitflags! {
    /// Diagnostics requested from a collision query.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CheckFlags: u32 {
        /// Log every violation (and out of bounds sphere) at info level.
        const VERBOSE =     0b0000_0001;

        /// Do not stop on the first violation, collect all violating spheres into
        /// [`CheckReport::contacts`]. The verdict is the same.
        const COLLECT_ALL = 0b0000_0010;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Collision,
}

/// Outcome of a point query.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub validity: Validity,
    /// Minimal distance observed over all sub-checks performed, meters.
    pub clearance: f64,
    /// Violating spheres with their world centers, filled only with [`CheckFlags::COLLECT_ALL`].
    /// A violating pair contributes both spheres.
    pub contacts: Vec<PosedSphere>,
}

impl CheckReport {
    pub fn is_valid(&self) -> bool {
        self.validity == Validity::Valid
    }
}

/// Outcome of a path query.
#[derive(Debug, Clone, PartialEq)]
pub struct PathCheck {
    pub validity: Validity,
    pub clearance: f64,
    /// Number of interpolated waypoints.
    pub path_length: usize,
    /// Number of waypoints actually checked.
    pub num_checks: usize,
}

impl PathCheck {
    pub fn is_valid(&self) -> bool {
        self.validity == Validity::Valid
    }
}

/// One cell visited by [`CollisionSpace::trace_line_segment`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TracedCell {
    pub cell: GridCell,
    pub distance: f64,
    pub obstacle: bool,
}

/// Result of a single sub-check (one sphere list against the world or one group pair).
#[derive(Debug, Clone, Copy)]
struct SubCheck {
    collision: bool,
    clearance: f64,
}

impl SubCheck {
    fn free() -> Self {
        SubCheck { collision: false, clearance: f64::INFINITY }
    }

    /// Folds another sub-check in. Returns true if checking should stop.
    fn merge(&mut self, other: SubCheck, collect_all: bool) -> bool {
        self.clearance = self.clearance.min(other.clearance);
        self.collision |= other.collision;
        other.collision && !collect_all
    }
}

/// Forward kinematics and posed centers kept between calls.
///
/// The default group is recomputed for every configuration. Other groups only depend on
/// the stored joint state, their frames stay valid until that state changes.
#[derive(Debug, Default)]
struct FrameCache {
    default: Frames,
    groups: Vec<Frames>,
    default_posed: Vec<Point3<f64>>,
    group_posed: Vec<Point3<f64>>,
    object_posed: Vec<Point3<f64>>,
}

impl FrameCache {
    fn invalidate(&mut self) {
        self.default.clear();
        for frames in &mut self.groups {
            frames.clear();
        }
    }
}

/// Answers point and path validity queries for a robot approximated by spheres, against
/// the obstacles of an occupancy grid and against its own parts.
pub struct CollisionSpace<'a, M: RobotModel> {
    pub(crate) model: M,
    pub(crate) grid: OccupancyGrid<'a>,
    pub(crate) group_name: String,
    pub(crate) planning_joints: Vec<String>,
    limits: JointLimits,
    increments: Vec<f64>,
    padding: f64,
    use_multi_level_collision_check: bool,
    pub(crate) object_enclosing_sphere_radius: f64,
    pub(crate) attached_object: Option<AttachedObject>,
    pub(crate) collision_objects: Vec<CollisionObject>,
    pub(crate) collision_map: Option<CollisionMap>,
    frames: FrameCache,
}

impl<'a, M: RobotModel> CollisionSpace<'a, M> {
    /// Initializes the groups of the model, selects the default group and the planning joints.
    pub fn new(mut model: M, grid: OccupancyGrid<'a>, config: &CollisionSpaceConfig)
               -> Result<Self, CollisionError> {
        model.init_all_groups()?;
        model.set_default_group(&config.group_name)?;

        let mut space = CollisionSpace {
            model,
            grid,
            group_name: config.group_name.clone(),
            planning_joints: Vec::new(),
            limits: JointLimits::default(),
            increments: Vec::new(),
            padding: config.padding,
            use_multi_level_collision_check: config.use_multi_level_collision_check,
            object_enclosing_sphere_radius: config.object_enclosing_sphere_radius,
            attached_object: None,
            collision_objects: Vec::new(),
            collision_map: None,
            frames: FrameCache::default(),
        };
        space.set_planning_joints(&config.planning_joints)?;

        let increments = config.increments_or_default();
        if increments.len() != space.planning_joints.len() {
            return Err(CollisionError::JointCountMismatch {
                expected: space.planning_joints.len(),
                found: increments.len(),
            });
        }
        space.increments = increments;
        Ok(space)
    }

    /// Resolves the limits of the planning joints and fixes their order in the model.
    pub fn set_planning_joints(&mut self, joint_names: &[String]) -> Result<(), CollisionError> {
        let group = self.model.default_group().ok_or(CollisionError::DefaultGroupNotSet)?;
        let group_name = group.name.clone();

        let limits = joint_names
            .iter()
            .map(|name| {
                self.model
                    .joint_limits(&group_name, name)
                    .ok_or_else(|| CollisionError::UnknownJoint(name.clone()))
            })
            .collect::<Result<Vec<JointLimit>, CollisionError>>()?;
        self.model.set_order_of_joint_positions(joint_names, &group_name)?;

        for (name, limit) in joint_names.iter().zip(&limits) {
            info!("[{}] min: {:.3} max: {:.3} continuous: {}", name, limit.min, limit.max,
                if limit.continuous { "yes" } else { "no" });
        }
        if self.increments.len() != joint_names.len() {
            self.increments = vec![DEFAULT_INCREMENT; joint_names.len()];
        }
        self.planning_joints = joint_names.to_vec();
        self.limits = JointLimits::new(limits);
        self.frames.invalidate();
        Ok(())
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Mutable access to the model. Cached frames are dropped, as the joint state may change.
    pub fn model_mut(&mut self) -> &mut M {
        self.frames.invalidate();
        &mut self.model
    }

    pub fn grid(&self) -> &OccupancyGrid<'a> {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut OccupancyGrid<'a> {
        &mut self.grid
    }

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    pub fn planning_joints(&self) -> &[String] {
        &self.planning_joints
    }

    pub fn limits(&self) -> &JointLimits {
        &self.limits
    }

    pub fn increments(&self) -> &[f64] {
        &self.increments
    }

    pub fn padding(&self) -> f64 {
        self.padding
    }

    pub fn set_padding(&mut self, padding: f64) {
        self.padding = padding;
    }

    pub fn set_multi_level_collision_check(&mut self, enabled: bool) {
        self.use_multi_level_collision_check = enabled;
    }

    pub fn attached_object(&self) -> Option<&AttachedObject> {
        self.attached_object.as_ref()
    }

    pub fn set_joint_position(&mut self, name: &str, position: f64) -> Result<(), CollisionError> {
        debug!("Setting {} with position = {:.3}", name, position);
        self.model.set_joint_position(name, position)?;
        self.frames.invalidate();
        Ok(())
    }

    pub fn collision_objects(&self) -> &[CollisionObject] {
        &self.collision_objects
    }

    pub(crate) fn invalidate_frames(&mut self) {
        self.frames.invalidate();
    }

    /// Checks the configuration of the planning joints.
    ///
    /// With multi-level checking the coarse spheres are tested first and the configuration
    /// is accepted if they are free. Only if they are not, the fine spheres decide. Frames
    /// of the default group are computed once and reused by both passes.
    pub fn check_collision(&mut self, angles: &[f64], flags: CheckFlags)
                           -> Result<CheckReport, CollisionError> {
        if angles.len() != self.planning_joints.len() {
            return Err(CollisionError::JointCountMismatch {
                expected: self.planning_joints.len(),
                found: angles.len(),
            });
        }
        self.frames.default.clear();

        let mut contacts = Vec::new();
        if self.use_multi_level_collision_check {
            let coarse = self.check_at_resolution(angles, Resolution::Coarse, flags, &mut contacts)?;
            if !coarse.collision {
                return Ok(CheckReport { validity: Validity::Valid, clearance: coarse.clearance, contacts });
            }
            contacts.clear();
        }
        let fine = self.check_at_resolution(angles, Resolution::Fine, flags, &mut contacts)?;
        Ok(CheckReport {
            validity: if fine.collision { Validity::Collision } else { Validity::Valid },
            clearance: fine.clearance,
            contacts,
        })
    }

    /// Full check with spheres of one resolution only, without the coarse/fine shortcut.
    pub fn check_collision_at_resolution(&mut self, angles: &[f64], resolution: Resolution,
                                         flags: CheckFlags) -> Result<CheckReport, CollisionError> {
        if angles.len() != self.planning_joints.len() {
            return Err(CollisionError::JointCountMismatch {
                expected: self.planning_joints.len(),
                found: angles.len(),
            });
        }
        self.frames.default.clear();
        let mut contacts = Vec::new();
        let check = self.check_at_resolution(angles, resolution, flags, &mut contacts)?;
        Ok(CheckReport {
            validity: if check.collision { Validity::Collision } else { Validity::Valid },
            clearance: check.clearance,
            contacts,
        })
    }

    pub fn is_state_valid(&mut self, angles: &[f64], flags: CheckFlags) -> Result<CheckReport, CollisionError> {
        self.check_collision(angles, flags)
    }

    pub fn is_state_to_state_valid(&mut self, start: &[f64], end: &[f64], flags: CheckFlags)
                                   -> Result<PathCheck, CollisionError> {
        self.check_path_for_collision(start, end, flags)
    }

    fn check_at_resolution(&mut self, angles: &[f64], resolution: Resolution, flags: CheckFlags,
                           contacts: &mut Vec<PosedSphere>) -> Result<SubCheck, CollisionError> {
        let collect_all = flags.contains(CheckFlags::COLLECT_ALL);
        let default_index = self.model.default_group_index().ok_or(CollisionError::DefaultGroupNotSet)?;
        let groups = self.model.sphere_groups();
        let default_group = &groups[default_index];

        if self.frames.default.is_empty() {
            self.model
                .compute_fk(&default_group.chains, angles, &mut self.frames.default)
                .map_err(|e| {
                    error!("Failed to compute forward kinematics: {}", e);
                    e
                })?;
        }
        if self.frames.groups.len() != groups.len() {
            self.frames.groups.resize_with(groups.len(), Frames::new);
        }

        let mut total = SubCheck::free();

        if let Some(object) = &self.attached_object {
            let check = spheres_against_world(&self.grid, self.padding, &object.id,
                                              &self.frames.default, object.spheres(resolution), flags,
                                              &mut self.frames.object_posed, contacts)?;
            if total.merge(check, collect_all) {
                return Ok(total);
            }
        }

        let check = spheres_against_world(&self.grid, self.padding, &default_group.name,
                                          &self.frames.default, default_group.spheres(resolution), flags,
                                          &mut self.frames.default_posed, contacts)?;
        if total.merge(check, collect_all) {
            return Ok(total);
        }

        for (index, group) in groups.iter().enumerate() {
            if index == default_index {
                continue;
            }
            let frames = &mut self.frames.groups[index];
            if frames.is_empty() {
                self.model.compute_fk(&group.chains, &[], frames).map_err(|e| {
                    error!("Failed to compute FK for sphere group '{}': {}", group.name, e);
                    e
                })?;
            }

            let check = spheres_against_world(&self.grid, self.padding, &group.name, frames,
                                              group.spheres(resolution), flags,
                                              &mut self.frames.group_posed, contacts)?;
            if total.merge(check, collect_all) {
                return Ok(total);
            }

            // Only the default group is checked against the other groups
            let check = groups_against_each_other(
                self.padding,
                (default_group, resolution, self.frames.default_posed.as_slice()),
                (group, resolution, self.frames.group_posed.as_slice()),
                flags,
                contacts,
            )?;
            if total.merge(check, collect_all) {
                return Ok(total);
            }
        }

        Ok(total)
    }

    /// Tests spheres posed by `frames` against the obstacles of the grid.
    pub fn check_spheres_against_world(&self, frames: &Frames, spheres: &[Sphere], flags: CheckFlags)
                                       -> Result<CheckReport, CollisionError> {
        let mut posed = Vec::with_capacity(spheres.len());
        let mut contacts = Vec::new();
        let check = spheres_against_world(&self.grid, self.padding, "", frames, spheres, flags,
                                          &mut posed, &mut contacts)?;
        Ok(CheckReport {
            validity: if check.collision { Validity::Collision } else { Validity::Valid },
            clearance: check.clearance,
            contacts,
        })
    }

    /// Tests every sphere of `group1` against every sphere of `group2`, both already posed.
    /// A pair is in contact if the distance between the centers does not exceed the larger
    /// of the two padded radii.
    pub fn check_sphere_group_against_sphere_group(
        &self,
        group1: &SphereGroup,
        group2: &SphereGroup,
        posed1: &[Point3<f64>],
        posed2: &[Point3<f64>],
        resolution1: Resolution,
        resolution2: Resolution,
        flags: CheckFlags,
    ) -> Result<CheckReport, CollisionError> {
        let mut contacts = Vec::new();
        let check = groups_against_each_other(
            self.padding,
            (group1, resolution1, posed1),
            (group2, resolution2, posed2),
            flags,
            &mut contacts,
        )?;
        Ok(CheckReport {
            validity: if check.collision { Validity::Collision } else { Validity::Valid },
            clearance: check.clearance,
            contacts,
        })
    }

    /// Checks one sphere group, posed for `angles`, against the world only.
    pub fn check_sphere_group_against_world(&self, angles: &[f64], group_name: &str,
                                            resolution: Resolution, flags: CheckFlags)
                                            -> Result<CheckReport, CollisionError> {
        let group = self.model
            .group(group_name)
            .ok_or_else(|| CollisionError::UnknownGroup(group_name.to_string()))?;
        let mut frames = Frames::new();
        self.model.compute_fk(&group.chains, angles, &mut frames).map_err(|e| {
            error!("Failed to compute FK for sphere group '{}': {}", group.name, e);
            e
        })?;
        let mut posed = Vec::with_capacity(group.sphere_count(resolution));
        let mut contacts = Vec::new();
        let check = spheres_against_world(&self.grid, self.padding, &group.name, &frames,
                                          group.spheres(resolution), flags, &mut posed, &mut contacts)?;
        Ok(CheckReport {
            validity: if check.collision { Validity::Collision } else { Validity::Valid },
            clearance: check.clearance,
            contacts,
        })
    }

    /// Checks the motion from `start` to `end`. Both are normalized and interpolated with the
    /// configured increments; the waypoints are visited in [`PATH_CHECK_PHASES`] interleaved
    /// phases so that a collision anywhere along the path is found early.
    pub fn check_path_for_collision(&mut self, start: &[f64], end: &[f64], flags: CheckFlags)
                                    -> Result<PathCheck, CollisionError> {
        for configuration in [start, end] {
            if configuration.len() != self.planning_joints.len() {
                return Err(CollisionError::JointCountMismatch {
                    expected: self.planning_joints.len(),
                    found: configuration.len(),
                });
            }
        }
        let mut start: Joints = start.to_vec();
        let mut end: Joints = end.to_vec();
        normalize_joints(&mut start);
        normalize_joints(&mut end);
        let path = self.interpolate_path(&start, &end)?;

        let flags = flags.difference(CheckFlags::COLLECT_ALL);
        let mut clearance = f64::INFINITY;
        let mut num_checks = 0;
        for index in interleaved_order(path.len(), PATH_CHECK_PHASES) {
            num_checks += 1;
            let report = self.check_collision(&path[index], flags)?;
            clearance = clearance.min(report.clearance);
            if !report.is_valid() {
                if flags.contains(CheckFlags::VERBOSE) {
                    info!("Waypoint {} of {} is in collision: {}", index, path.len(),
                        format_joints(&path[index]));
                }
                return Ok(PathCheck {
                    validity: Validity::Collision,
                    clearance,
                    path_length: path.len(),
                    num_checks,
                });
            }
        }
        Ok(PathCheck { validity: Validity::Valid, clearance, path_length: path.len(), num_checks })
    }

    /// Waypoints from `start` to `end` with the configured increments and joint limits.
    pub fn interpolate_path(&self, start: &[f64], end: &[f64]) -> Result<Vec<Joints>, CollisionError> {
        interpolator::interpolate_path(start, end, &self.limits, &self.increments).map_err(|e| {
            error!("Failed to interpolate the path ({:?}), it's probably infeasible due to joint limits", e);
            error!("[interpolate]  start: {}", format_values(start));
            error!("[interpolate]    end: {}", format_values(end));
            error!("[interpolate]    min: {}", format_values(&self.limits.min_limits()));
            error!("[interpolate]    max: {}", format_values(&self.limits.max_limits()));
            CollisionError::Interpolation {
                start: start.to_vec(),
                end: end.to_vec(),
                min: self.limits.min_limits(),
                max: self.limits.max_limits(),
            }
        })
    }

    /// Walks the grid cells from `a` to `b` in Bresenham order. Returns the distance of the
    /// first cell within `radius` of an obstacle (0 for an occupied cell), or the minimal
    /// distance along the segment if there is none. Leaving the grid is an error.
    pub fn is_valid_line_segment(&self, a: GridCell, b: GridCell, radius: f64) -> Result<f64, CollisionError> {
        let mut min_distance = f64::INFINITY;
        for cell in Bresenham3d::new(a, b) {
            if !self.grid.is_in_bounds(cell) {
                return Err(CollisionError::CellOutOfBounds(cell));
            }
            let distance = self.grid.distance(cell);
            if distance <= radius {
                return Ok(distance);
            }
            min_distance = min_distance.min(distance);
        }
        Ok(min_distance)
    }

    /// As [`CollisionSpace::is_valid_line_segment`], but visits the whole segment and returns
    /// every tested cell. The distance is 0 if any cell was within `radius`.
    pub fn trace_line_segment(&self, a: GridCell, b: GridCell, radius: f64)
                              -> Result<(f64, Vec<TracedCell>), CollisionError> {
        let mut min_distance = f64::INFINITY;
        let mut blocked = false;
        let mut cells = Vec::new();
        for cell in Bresenham3d::new(a, b) {
            if !self.grid.is_in_bounds(cell) {
                return Err(CollisionError::CellOutOfBounds(cell));
            }
            let distance = self.grid.distance(cell);
            let obstacle = distance <= radius;
            blocked |= obstacle;
            min_distance = min_distance.min(distance);
            cells.push(TracedCell { cell, distance, obstacle });
        }
        Ok((if blocked { 0.0 } else { min_distance }, cells))
    }

    /// Clearance of the fine spheres of the default group: the distance of each sphere
    /// surface to the nearest obstacle. Returns the average over the first `num_spheres`
    /// spheres (fewer if the group is smaller) and the minimum over all of them.
    /// With nothing to average, the average is the minimum.
    pub fn clearance(&self, angles: &[f64], num_spheres: usize) -> Result<(f64, f64), CollisionError> {
        let group = self.model.default_group().ok_or(CollisionError::DefaultGroupNotSet)?;
        let mut frames = Frames::new();
        self.model.compute_fk(&group.chains, angles, &mut frames).map_err(|e| {
            error!("Failed to compute forward kinematics: {}", e);
            e
        })?;

        let spheres = group.spheres(Resolution::Fine);
        let count = num_spheres.min(spheres.len());
        let mut sum = 0.0;
        let mut min_distance = f64::INFINITY;
        for (i, sphere) in spheres.iter().enumerate() {
            let center = pose_sphere(&frames, &group.name, sphere)?;
            let cell = self.grid.world_to_grid(&center);
            if !self.grid.is_in_bounds(cell) {
                return Err(CollisionError::OutOfBounds { sphere: sphere.name.clone(), position: center, cell });
            }
            let distance = self.grid.distance(cell) - sphere.radius;
            min_distance = min_distance.min(distance);
            if i < count {
                sum += distance;
            }
        }
        let average = if count > 0 { sum / count as f64 } else { min_distance };
        debug!("num_spheres: {} avg_dist: {:.2} min_dist: {:.2}", count, average, min_distance);
        Ok((average, min_distance))
    }

    /// World centers and radii of a group posed for `angles`, followed by the fine spheres
    /// of the attached object if there is one.
    pub fn collision_spheres(&self, angles: &[f64], group_name: &str, resolution: Resolution)
                             -> Result<Vec<PosedSphere>, CollisionError> {
        let group = self.model
            .group(group_name)
            .ok_or_else(|| CollisionError::UnknownGroup(group_name.to_string()))?;
        let mut frames = Frames::new();
        self.model.compute_fk(&group.chains, angles, &mut frames)?;

        let mut spheres = Vec::with_capacity(group.sphere_count(resolution));
        for sphere in group.spheres(resolution) {
            let center = pose_sphere(&frames, &group.name, sphere)?;
            debug!("[robot] {} xyz: {:.3} {:.3} {:.3} radius: {:.3}",
                sphere.name, center.x, center.y, center.z, sphere.radius);
            spheres.push(PosedSphere { name: sphere.name.clone(), center, radius: sphere.radius });
        }

        if let Some(object) = &self.attached_object {
            let mut default_frames = Frames::new();
            self.model.compute_default_group_fk(angles, &mut default_frames)?;
            for sphere in object.spheres(Resolution::Fine) {
                let center = pose_sphere(&default_frames, &object.id, sphere)?;
                spheres.push(PosedSphere { name: sphere.name.clone(), center, radius: sphere.radius });
            }
        }
        Ok(spheres)
    }

    /// Inserts every voxel group, posed for the stored joint state, into the grid.
    pub fn update_voxel_groups(&mut self) -> Result<(), CollisionError> {
        let mut result = Ok(());
        for index in 0..self.model.voxel_groups().len() {
            if let Err(e) = self.update_voxel_group_at(index) {
                error!("Failed to update the '{}' voxel group: {}", self.model.voxel_groups()[index].name, e);
                result = Err(e);
            }
        }
        result
    }

    pub fn update_voxel_group(&mut self, name: &str) -> Result<(), CollisionError> {
        let index = self.model
            .voxel_groups()
            .iter()
            .position(|g| g.name == name)
            .ok_or_else(|| CollisionError::UnknownGroup(name.to_string()))?;
        self.update_voxel_group_at(index)
    }

    fn update_voxel_group_at(&mut self, index: usize) -> Result<(), CollisionError> {
        let group = &self.model.voxel_groups()[index];
        debug!("Updating voxel group: {}", group.name);
        let mut frames = Frames::new();
        self.model.compute_fk(&group.chains, &[], &mut frames).map_err(|e| {
            error!("Failed to compute forward kinematics for group '{}': {}", group.name, e);
            e
        })?;

        for link in &group.links {
            let frame = frames.get(link.key).ok_or_else(|| CollisionError::FrameKey {
                group: group.name.clone(),
                owner: link.name.clone(),
                key: link.key,
            })?;
            let points: Vec<Point3<f64>> = link.voxels
                .iter()
                .map(|v| frame.transform_point(&Point3::from(*v)))
                .collect();
            debug!("Updating voxel group {} with {} voxels of '{}'", group.name, points.len(), link.name);
            self.grid.add_points(&points);
        }
        Ok(())
    }
}

/// Order in which the waypoints of a path are checked: every `phases`-th waypoint starting
/// from 0, then starting from 1 and so on. Short paths are checked front to back.
pub fn interleaved_order(len: usize, phases: usize) -> Vec<usize> {
    if len <= phases || phases == 0 {
        return (0..len).collect();
    }
    (0..phases)
        .flat_map(|phase| (phase..len).step_by(phases))
        .collect()
}

fn pose_sphere(frames: &Frames, group: &str, sphere: &Sphere) -> Result<Point3<f64>, CollisionError> {
    frames.transform(sphere.key, &sphere.center).ok_or_else(|| CollisionError::FrameKey {
        group: group.to_string(),
        owner: sphere.name.clone(),
        key: sphere.key,
    })
}

fn spheres_against_world(
    grid: &OccupancyGrid,
    padding: f64,
    group: &str,
    frames: &Frames,
    spheres: &[Sphere],
    flags: CheckFlags,
    posed: &mut Vec<Point3<f64>>,
    contacts: &mut Vec<PosedSphere>,
) -> Result<SubCheck, CollisionError> {
    let verbose = flags.contains(CheckFlags::VERBOSE);
    let collect_all = flags.contains(CheckFlags::COLLECT_ALL);
    let mut in_collision = false;
    let mut clearance = f64::INFINITY;
    posed.clear();

    for (i, sphere) in spheres.iter().enumerate() {
        let center = pose_sphere(frames, group, sphere)?;
        posed.push(center);

        let cell = grid.world_to_grid(&center);
        if !grid.is_in_bounds(cell) {
            if verbose {
                info!("Sphere '{}' with center at {{{:.2} {:.2} {:.2}}} ({}) is out of bounds",
                    sphere.name, center.x, center.y, center.z, cell);
            } else {
                warn!("Sphere '{}' is out of bounds", sphere.name);
            }
            return Err(CollisionError::OutOfBounds { sphere: sphere.name.clone(), position: center, cell });
        }

        let distance = grid.distance(cell);
        clearance = clearance.min(distance);
        if distance <= sphere.radius + padding {
            if verbose {
                info!("    [sphere: {}] name: {:>6} {} radius: {:.3}m  dist: {:.3}m  *collision*",
                    i, sphere.name, cell, sphere.radius + padding, distance);
            }
            if !collect_all {
                return Ok(SubCheck { collision: true, clearance });
            }
            in_collision = true;
            contacts.push(PosedSphere { name: sphere.name.clone(), center, radius: sphere.radius });
        }
    }
    Ok(SubCheck { collision: in_collision, clearance })
}

fn groups_against_each_other(
    padding: f64,
    (group1, resolution1, posed1): (&SphereGroup, Resolution, &[Point3<f64>]),
    (group2, resolution2, posed2): (&SphereGroup, Resolution, &[Point3<f64>]),
    flags: CheckFlags,
    contacts: &mut Vec<PosedSphere>,
) -> Result<SubCheck, CollisionError> {
    let spheres1 = group1.spheres(resolution1);
    let spheres2 = group2.spheres(resolution2);
    if spheres1.len() != posed1.len() || spheres2.len() != posed2.len() {
        let e = CollisionError::SphereCountMismatch {
            group1: group1.name.clone(),
            declared1: spheres1.len(),
            posed1: posed1.len(),
            group2: group2.name.clone(),
            declared2: spheres2.len(),
            posed2: posed2.len(),
        };
        error!("{}", e);
        return Err(e);
    }

    let verbose = flags.contains(CheckFlags::VERBOSE);
    let collect_all = flags.contains(CheckFlags::COLLECT_ALL);
    let mut in_collision = false;
    let mut clearance = f64::INFINITY;
    for (s1, p1) in spheres1.iter().zip(posed1) {
        for (s2, p2) in spheres2.iter().zip(posed2) {
            let d = (p1 - p2).norm();
            clearance = clearance.min(d);
            if d <= (s1.radius + padding).max(s2.radius + padding) {
                if verbose {
                    info!("[group1: {}  sphere: {}] [group2: {}  sphere: {}] *collision* found. \
                           (rad1: {:.3}m  rad2: {:.3}m  dist: {:.3}m)",
                        group1.name, s1.name, group2.name, s2.name,
                        s1.radius + padding, s2.radius + padding, d);
                }
                if !collect_all {
                    return Ok(SubCheck { collision: true, clearance });
                }
                in_collision = true;
                contacts.push(PosedSphere { name: s1.name.clone(), center: *p1, radius: s1.radius });
                contacts.push(PosedSphere { name: s2.name.clone(), center: *p2, radius: s2.radius });
            }
        }
    }
    debug!("Group to group check uses {} distance computations ({} x {} spheres)",
        spheres1.len() * spheres2.len(), spheres1.len(), spheres2.len());
    Ok(SubCheck { collision: in_collision, clearance })
}
