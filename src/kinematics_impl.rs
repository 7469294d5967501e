//! Robot model built from kinematic chains of fixed and revolute segments.

use std::collections::HashMap;

use nalgebra::{Isometry3, Unit, UnitQuaternion, Vector3};
use tracing::{debug, info};

use crate::constraints::JointLimit;
use crate::error::CollisionError;
use crate::kinematic_traits::{Frame, FrameKey, Frames, RobotModel};
use crate::sphere_group::{Resolution, Sphere, SphereGroup, VoxelGroup, VoxelLink};

/// Revolute joint rotating about `axis`, given in the frame of the segment it moves.
#[derive(Debug, Clone)]
pub struct JointSpec {
    pub name: String,
    pub axis: Unit<Vector3<f64>>,
    pub limit: JointLimit,
}

/// One link along a chain. The transform of the link is the transform of the previous link,
/// then `origin`, then the rotation of `joint` if the segment has one.
#[derive(Debug, Clone)]
pub struct Segment {
    pub link: String,
    pub origin: Isometry3<f64>,
    /// Index into the joints of the model, `None` for a fixed segment.
    pub joint: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Chain {
    pub name: String,
    /// Pose of the chain root in the model frame.
    pub base: Isometry3<f64>,
    pub segments: Vec<Segment>,
}

/// Description of a segment before joint names are resolved.
#[derive(Debug, Clone)]
pub struct SegmentSpec {
    pub link: String,
    pub origin: Isometry3<f64>,
    pub joint: Option<String>,
}

/// Description of a sphere before its link is resolved into a frame key.
#[derive(Debug, Clone)]
pub struct SphereSpec {
    pub name: String,
    pub link: String,
    pub center: Vector3<f64>,
    pub radius: f64,
    pub resolution: Resolution,
}

/// Robot model made of chains. Several chains may share joints (a torso joint in front of
/// two arms), each chain is posed independently starting from its base.
#[derive(Debug, Clone)]
pub struct ChainRobotModel {
    joints: Vec<JointSpec>,
    joint_index: HashMap<String, usize>,
    /// Stored joint state, indexed like `joints`.
    positions: Vec<f64>,
    chains: Vec<Chain>,
    chain_index: HashMap<String, usize>,
    sphere_groups: Vec<SphereGroup>,
    voxel_groups: Vec<VoxelGroup>,
    default_group: Option<usize>,
    /// For each joint, its position among the planning joints if it is one.
    planning_slots: Vec<Option<usize>>,
    planning_count: usize,
    model_to_world: Isometry3<f64>,
    world_frame: String,
}

impl ChainRobotModel {
    pub fn new(world_frame: &str) -> Self {
        ChainRobotModel {
            joints: Vec::new(),
            joint_index: HashMap::new(),
            positions: Vec::new(),
            chains: Vec::new(),
            chain_index: HashMap::new(),
            sphere_groups: Vec::new(),
            voxel_groups: Vec::new(),
            default_group: None,
            planning_slots: Vec::new(),
            planning_count: 0,
            model_to_world: Isometry3::identity(),
            world_frame: world_frame.to_string(),
        }
    }

    /// Adds a revolute joint at position 0. Returns its index.
    pub fn add_joint(&mut self, name: &str, axis: Vector3<f64>, limit: JointLimit) -> usize {
        let index = self.joints.len();
        self.joints.push(JointSpec {
            name: name.to_string(),
            axis: Unit::new_normalize(axis),
            limit,
        });
        self.joint_index.insert(name.to_string(), index);
        self.positions.push(0.0);
        self.planning_slots.push(None);
        index
    }

    pub fn add_chain(&mut self, name: &str, base: Isometry3<f64>, segments: Vec<SegmentSpec>)
                     -> Result<usize, CollisionError> {
        let segments = segments
            .into_iter()
            .map(|spec| {
                let joint = match spec.joint {
                    Some(joint) => Some(
                        *self.joint_index.get(&joint).ok_or(CollisionError::UnknownJoint(joint))?,
                    ),
                    None => None,
                };
                Ok(Segment { link: spec.link, origin: spec.origin, joint })
            })
            .collect::<Result<Vec<_>, CollisionError>>()?;

        let index = self.chains.len();
        self.chains.push(Chain { name: name.to_string(), base, segments });
        self.chain_index.insert(name.to_string(), index);
        Ok(index)
    }

    fn resolve_chains(&self, chain_names: &[&str]) -> Result<Vec<usize>, CollisionError> {
        chain_names
            .iter()
            .map(|name| {
                self.chain_index
                    .get(*name)
                    .copied()
                    .ok_or_else(|| CollisionError::UnknownGroup(format!("chain {}", name)))
            })
            .collect()
    }

    /// Finds the first segment with the given link among the chains, in chain order.
    fn resolve_link(&self, chains: &[usize], link: &str) -> Option<FrameKey> {
        chains.iter().enumerate().find_map(|(pos, &chain)| {
            self.chains[chain]
                .segments
                .iter()
                .position(|s| s.link == link)
                .map(|segment| FrameKey::new(pos, segment))
        })
    }

    pub fn add_sphere_group(&mut self, name: &str, chain_names: &[&str], spheres: Vec<SphereSpec>)
                            -> Result<usize, CollisionError> {
        let chains = self.resolve_chains(chain_names)?;
        let mut links: Vec<String> = Vec::new();
        let mut resolved = Vec::with_capacity(spheres.len());
        for spec in spheres {
            let key = self.resolve_link(&chains, &spec.link).ok_or_else(|| CollisionError::UnknownLink {
                group: name.to_string(),
                link: spec.link.clone(),
            })?;
            if !links.contains(&spec.link) {
                links.push(spec.link.clone());
            }
            resolved.push(Sphere::new(&spec.name, spec.center, spec.radius, key, spec.resolution));
        }
        self.sphere_groups.push(SphereGroup::new(name, chains, links, resolved));
        Ok(self.sphere_groups.len() - 1)
    }

    pub fn add_voxel_group(&mut self, name: &str, chain_names: &[&str],
                           links: Vec<(String, Vec<Vector3<f64>>)>) -> Result<usize, CollisionError> {
        let chains = self.resolve_chains(chain_names)?;
        let links = links
            .into_iter()
            .map(|(link, voxels)| {
                let key = self.resolve_link(&chains, &link).ok_or_else(|| CollisionError::UnknownLink {
                    group: name.to_string(),
                    link: link.clone(),
                })?;
                Ok(VoxelLink { name: link, key, voxels })
            })
            .collect::<Result<Vec<_>, CollisionError>>()?;
        self.voxel_groups.push(VoxelGroup::new(name, chains, links));
        Ok(self.voxel_groups.len() - 1)
    }

    pub fn joint_position(&self, name: &str) -> Option<f64> {
        self.joint_index.get(name).map(|&i| self.positions[i])
    }

    pub fn joints(&self) -> &[JointSpec] {
        &self.joints
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn model_to_world(&self) -> &Isometry3<f64> {
        &self.model_to_world
    }

    fn group_chains(&self, group: &str) -> Option<&[usize]> {
        self.sphere_groups
            .iter()
            .find(|g| g.name == group)
            .map(|g| g.chains.as_slice())
            .or_else(|| {
                self.voxel_groups
                    .iter()
                    .find(|g| g.name == group)
                    .map(|g| g.chains.as_slice())
            })
    }

    fn validate_key(&self, group: &str, chains: &[usize], owner: &str, key: FrameKey)
                    -> Result<(), CollisionError> {
        let valid = chains
            .get(key.chain)
            .and_then(|&c| self.chains.get(c))
            .is_some_and(|chain| key.segment < chain.segments.len());
        if valid {
            Ok(())
        } else {
            Err(CollisionError::FrameKey {
                group: group.to_string(),
                owner: owner.to_string(),
                key,
            })
        }
    }
}

impl RobotModel for ChainRobotModel {
    fn joint_limits(&self, group: &str, joint: &str) -> Option<JointLimit> {
        let chains = self.group_chains(group)?;
        let index = *self.joint_index.get(joint)?;
        let in_group = chains
            .iter()
            .any(|&c| self.chains[c].segments.iter().any(|s| s.joint == Some(index)));
        if in_group { Some(self.joints[index].limit) } else { None }
    }

    fn set_order_of_joint_positions(&mut self, joint_names: &[String], group: &str)
                                    -> Result<(), CollisionError> {
        if self.group_chains(group).is_none() {
            return Err(CollisionError::UnknownGroup(group.to_string()));
        }
        let mut slots = vec![None; self.joints.len()];
        for (slot, name) in joint_names.iter().enumerate() {
            let index = *self.joint_index.get(name)
                .ok_or_else(|| CollisionError::UnknownJoint(name.clone()))?;
            slots[index] = Some(slot);
        }
        self.planning_slots = slots;
        self.planning_count = joint_names.len();
        Ok(())
    }

    fn planning_joint_count(&self) -> usize {
        self.planning_count
    }

    fn init_all_groups(&mut self) -> Result<(), CollisionError> {
        for group in &self.sphere_groups {
            for sphere in group.all_spheres() {
                self.validate_key(&group.name, &group.chains, &sphere.name, sphere.key)?;
            }
            debug!("Sphere group '{}': {} coarse, {} fine spheres over links {:?}",
                group.name, group.sphere_count(Resolution::Coarse),
                group.sphere_count(Resolution::Fine), group.links);
        }
        for group in &self.voxel_groups {
            for link in &group.links {
                self.validate_key(&group.name, &group.chains, &link.name, link.key)?;
            }
            debug!("Voxel group '{}': {} voxels in {} links",
                group.name, group.voxel_count(), group.links.len());
        }
        info!("Initialized {} sphere groups and {} voxel groups",
            self.sphere_groups.len(), self.voxel_groups.len());
        Ok(())
    }

    fn set_default_group(&mut self, name: &str) -> Result<(), CollisionError> {
        let index = self.sphere_groups
            .iter()
            .position(|g| g.name == name)
            .ok_or_else(|| CollisionError::UnknownGroup(name.to_string()))?;
        self.default_group = Some(index);
        Ok(())
    }

    fn default_group_index(&self) -> Option<usize> {
        self.default_group
    }

    fn sphere_groups(&self) -> &[SphereGroup] {
        &self.sphere_groups
    }

    fn voxel_groups(&self) -> &[VoxelGroup] {
        &self.voxel_groups
    }

    fn compute_fk(&self, chains: &[usize], angles: &[f64], frames: &mut Frames)
                  -> Result<(), CollisionError> {
        if !angles.is_empty() && angles.len() != self.planning_count {
            return Err(CollisionError::JointCountMismatch {
                expected: self.planning_count,
                found: angles.len(),
            });
        }

        for (pos, &chain_index) in chains.iter().enumerate() {
            let chain = self.chains.get(chain_index)
                .ok_or_else(|| CollisionError::ForwardKinematics(format!("chain #{}", chain_index)))?;
            let out = frames.chain_mut(pos);
            out.clear();
            let mut transform: Frame = self.model_to_world * chain.base;
            for segment in &chain.segments {
                transform = transform * segment.origin;
                if let Some(joint) = segment.joint {
                    let q = match self.planning_slots[joint] {
                        Some(slot) if !angles.is_empty() => angles[slot],
                        _ => self.positions[joint],
                    };
                    if !q.is_finite() {
                        return Err(CollisionError::ForwardKinematics(chain.name.clone()));
                    }
                    transform = transform * UnitQuaternion::from_axis_angle(&self.joints[joint].axis, q);
                }
                out.push(transform);
            }
        }
        frames.truncate_chains(chains.len());
        Ok(())
    }

    fn frame_key(&self, group: &str, link: &str) -> Option<FrameKey> {
        let group = self.sphere_groups.iter().find(|g| g.name == group)?;
        self.resolve_link(&group.chains, link)
    }

    fn has_joint(&self, name: &str) -> bool {
        self.joint_index.contains_key(name)
    }

    fn set_joint_position(&mut self, name: &str, position: f64) -> Result<(), CollisionError> {
        let index = *self.joint_index.get(name)
            .ok_or_else(|| CollisionError::UnknownJoint(name.to_string()))?;
        self.positions[index] = position;
        Ok(())
    }

    fn set_model_to_world_transform(&mut self, transform: Frame, world_frame: &str) {
        self.model_to_world = transform;
        self.world_frame = world_frame.to_string();
    }

    fn world_frame(&self) -> &str {
        &self.world_frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::Point3;
    use std::f64::consts::PI;

    /// Planar two link arm in the XY plane, links of 1.0 along X, joints about Z.
    fn planar_arm() -> ChainRobotModel {
        let mut model = ChainRobotModel::new("world");
        model.add_joint("j1", Vector3::z(), JointLimit::new(-PI, PI));
        model.add_joint("j2", Vector3::z(), JointLimit::continuous());
        model.add_chain("arm", Isometry3::identity(), vec![
            SegmentSpec { link: "l1".into(), origin: Isometry3::identity(), joint: Some("j1".into()) },
            SegmentSpec { link: "l2".into(), origin: Isometry3::translation(1.0, 0.0, 0.0), joint: Some("j2".into()) },
            SegmentSpec { link: "tip".into(), origin: Isometry3::translation(1.0, 0.0, 0.0), joint: None },
        ]).unwrap();
        model.add_sphere_group("arm", &["arm"], vec![SphereSpec {
            name: "tip".into(),
            link: "tip".into(),
            center: Vector3::zeros(),
            radius: 0.1,
            resolution: Resolution::Fine,
        }]).unwrap();
        model.init_all_groups().unwrap();
        model.set_default_group("arm").unwrap();
        model.set_order_of_joint_positions(&["j1".to_string(), "j2".to_string()], "arm").unwrap();
        model
    }

    fn tip(model: &ChainRobotModel, angles: &[f64]) -> Point3<f64> {
        let mut frames = Frames::new();
        model.compute_default_group_fk(angles, &mut frames).unwrap();
        frames.transform(FrameKey::new(0, 2), &Vector3::zeros()).unwrap()
    }

    #[test]
    fn test_forward_kinematics() {
        let model = planar_arm();
        let p = tip(&model, &[0.0, 0.0]);
        assert_abs_diff_eq!(p, Point3::new(2.0, 0.0, 0.0), epsilon = 1E-12);

        let p = tip(&model, &[PI / 2.0, 0.0]);
        assert_abs_diff_eq!(p, Point3::new(0.0, 2.0, 0.0), epsilon = 1E-12);

        let p = tip(&model, &[0.0, PI / 2.0]);
        assert_abs_diff_eq!(p, Point3::new(1.0, 1.0, 0.0), epsilon = 1E-12);
    }

    #[test]
    fn test_empty_angles_use_joint_state() {
        let mut model = planar_arm();
        model.set_joint_position("j1", PI).unwrap();
        let p = tip(&model, &[]);
        assert_abs_diff_eq!(p, Point3::new(-2.0, 0.0, 0.0), epsilon = 1E-12);
    }

    #[test]
    fn test_model_to_world_transform() {
        let mut model = planar_arm();
        model.set_model_to_world_transform(Isometry3::translation(0.0, 0.0, 0.5), "map");
        assert_eq!(model.world_frame(), "map");
        let p = tip(&model, &[0.0, 0.0]);
        assert_abs_diff_eq!(p, Point3::new(2.0, 0.0, 0.5), epsilon = 1E-12);
    }

    #[test]
    fn test_wrong_joint_count() {
        let model = planar_arm();
        let mut frames = Frames::new();
        let result = model.compute_default_group_fk(&[0.0], &mut frames);
        assert!(matches!(result, Err(CollisionError::JointCountMismatch { expected: 2, found: 1 })));
    }

    #[test]
    fn test_non_finite_angle_fails() {
        let model = planar_arm();
        let mut frames = Frames::new();
        let result = model.compute_default_group_fk(&[f64::NAN, 0.0], &mut frames);
        assert!(matches!(result, Err(CollisionError::ForwardKinematics(_))));
    }

    #[test]
    fn test_joint_limits_and_lookup() {
        let model = planar_arm();
        assert_eq!(model.joint_limits("arm", "j2"), Some(JointLimit::continuous()));
        assert_eq!(model.joint_limits("arm", "nope"), None);
        assert_eq!(model.joint_limits("nope", "j1"), None);
        assert_eq!(model.frame_key("arm", "l2"), Some(FrameKey::new(0, 1)));
        assert_eq!(model.frame_key("arm", "missing"), None);
    }

    #[test]
    fn test_unknown_link_rejected() {
        let mut model = planar_arm();
        let result = model.add_sphere_group("bad", &["arm"], vec![SphereSpec {
            name: "s".into(),
            link: "nowhere".into(),
            center: Vector3::zeros(),
            radius: 0.1,
            resolution: Resolution::Fine,
        }]);
        assert!(matches!(result, Err(CollisionError::UnknownLink { .. })));
        assert!(matches!(model.set_default_group("missing"), Err(CollisionError::UnknownGroup(_))));
    }
}
