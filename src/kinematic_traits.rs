use std::fmt;

use nalgebra::{Isometry3, Point3, Vector3};

use crate::constraints::JointLimit;
use crate::error::CollisionError;
use crate::sphere_group::{SphereGroup, VoxelGroup};

/// Joint values of the planning joints in the order set with
/// [`RobotModel::set_order_of_joint_positions`], radians.
pub type Joints = Vec<f64>;

/// Pose of a link in the world frame.
pub type Frame = Isometry3<f64>;

/// Address of one transform inside the [`Frames`] of a group: the chain (position in the
/// group's chain list) and the segment along that chain.
///
/// Keys are resolved from link names when the group is built and validated against the
/// chain lengths by [`RobotModel::init_all_groups`], so a key never indexes past the frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameKey {
    pub chain: usize,
    pub segment: usize,
}

impl FrameKey {
    pub const fn new(chain: usize, segment: usize) -> Self {
        FrameKey { chain, segment }
    }
}

impl fmt::Display for FrameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.chain, self.segment)
    }
}

/// Transforms computed by forward kinematics for one group, indexed by chain, then segment.
/// The buffers are kept between calls so recomputing the frames does not allocate.
#[derive(Debug, Clone, Default)]
pub struct Frames {
    chains: Vec<Vec<Frame>>,
}

impl Frames {
    pub fn new() -> Self {
        Frames { chains: Vec::new() }
    }

    pub fn from_chains(chains: Vec<Vec<Frame>>) -> Self {
        Frames { chains }
    }

    /// True if nothing has been computed yet (or after [`Frames::clear`]).
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Drops the computed transforms, keeping the allocations.
    pub fn clear(&mut self) {
        self.chains.clear();
    }

    /// Mutable access to the transforms of the chain at the given position, growing the
    /// chain list if needed. Used by forward kinematics implementations.
    pub fn chain_mut(&mut self, chain: usize) -> &mut Vec<Frame> {
        if self.chains.len() <= chain {
            self.chains.resize_with(chain + 1, Vec::new);
        }
        &mut self.chains[chain]
    }

    pub fn truncate_chains(&mut self, len: usize) {
        self.chains.truncate(len);
    }

    pub fn get(&self, key: FrameKey) -> Option<&Frame> {
        self.chains.get(key.chain).and_then(|c| c.get(key.segment))
    }

    /// Transforms a point given in the local frame of `key` into the world frame.
    pub fn transform(&self, key: FrameKey, local: &Vector3<f64>) -> Option<Point3<f64>> {
        self.get(key).map(|frame| frame.transform_point(&Point3::from(*local)))
    }

    pub fn chain_lengths(&self) -> impl Iterator<Item = usize> + '_ {
        self.chains.iter().map(|c| c.len())
    }
}

/// Kinematic robot model the collision space works with. It owns the sphere and voxel
/// groups, the current joint state and the joint limits.
///
/// Sphere groups are returned as a slice, the default group is addressed by index into it.
pub trait RobotModel {
    /// Limits of the joint, `None` if the group does not have it.
    fn joint_limits(&self, group: &str, joint: &str) -> Option<JointLimit>;

    /// Fixes which joints the `angles` passed to forward kinematics refer to, and in which
    /// order. Other joints take their value from the stored joint state.
    fn set_order_of_joint_positions(&mut self, joint_names: &[String], group: &str)
                                    -> Result<(), CollisionError>;

    /// Number of planning joints as set by [`RobotModel::set_order_of_joint_positions`].
    fn planning_joint_count(&self) -> usize;

    /// Validates every group, including all frame keys. Must be called once after the
    /// model has been assembled.
    fn init_all_groups(&mut self) -> Result<(), CollisionError>;

    fn set_default_group(&mut self, name: &str) -> Result<(), CollisionError>;

    fn default_group_index(&self) -> Option<usize>;

    fn sphere_groups(&self) -> &[SphereGroup];

    fn voxel_groups(&self) -> &[VoxelGroup];

    /// Forward kinematics over the given chains. An empty `angles` means the stored joint
    /// state is used for every joint.
    fn compute_fk(&self, chains: &[usize], angles: &[f64], frames: &mut Frames)
                  -> Result<(), CollisionError>;

    /// Key of the link within the frames of the named sphere group.
    fn frame_key(&self, group: &str, link: &str) -> Option<FrameKey>;

    /// True if the model has a joint with this name.
    fn has_joint(&self, name: &str) -> bool;

    fn set_joint_position(&mut self, name: &str, position: f64) -> Result<(), CollisionError>;

    /// Places the model in the world. `world_frame` names the frame the transform maps into.
    fn set_model_to_world_transform(&mut self, transform: Frame, world_frame: &str);

    fn world_frame(&self) -> &str;

    fn default_group(&self) -> Option<&SphereGroup> {
        self.default_group_index().and_then(|i| self.sphere_groups().get(i))
    }

    /// Index of the sphere group with the given name.
    fn sphere_group_index(&self, name: &str) -> Option<usize> {
        self.sphere_groups().iter().position(|g| g.name == name)
    }

    fn group(&self, name: &str) -> Option<&SphereGroup> {
        self.sphere_groups().iter().find(|g| g.name == name)
    }

    fn compute_default_group_fk(&self, angles: &[f64], frames: &mut Frames)
                                -> Result<(), CollisionError> {
        let group = self.default_group().ok_or(CollisionError::DefaultGroupNotSet)?;
        self.compute_fk(&group.chains, angles, frames)
    }

    /// Forward kinematics of the sphere group at `index` in [`RobotModel::sphere_groups`].
    fn compute_group_fk(&self, index: usize, angles: &[f64], frames: &mut Frames)
                        -> Result<(), CollisionError> {
        let group = self.sphere_groups()
            .get(index)
            .ok_or_else(|| CollisionError::UnknownGroup(format!("#{}", index)))?;
        self.compute_fk(&group.chains, angles, frames)
    }
}
