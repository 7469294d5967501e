//! Robot state and obstacle updates. These are the only operations that change what the
//! collision queries see; none of them may run while a query is in progress.

use nalgebra::Isometry3;
use tracing::{debug, info, warn};

use crate::collision_object::{AttachedObject, AttachedObjectDescriptor, CollisionMap, CollisionObject,
                              ObjectOperation};
use crate::collisions::CollisionSpace;
use crate::error::CollisionError;
use crate::kinematic_traits::RobotModel;

/// Complete description of the world and the robot in it.
#[derive(Debug, Clone, Default)]
pub struct PlanningScene {
    /// Joint names with their positions. Joints not listed keep their value.
    pub robot_state: Vec<(String, f64)>,
    /// Pose of the robot model in `world_frame`, if it is to be changed.
    pub model_to_world: Option<Isometry3<f64>>,
    pub world_frame: String,
    pub collision_objects: Vec<CollisionObject>,
    pub attached_objects: Vec<AttachedObjectDescriptor>,
    /// Replaces the previous map; `None` removes it.
    pub collision_map: Option<CollisionMap>,
}

impl<'a, M: RobotModel> CollisionSpace<'a, M> {
    /// Sets the joint state and rebuilds the obstacles of the grid, as voxel groups
    /// move with the joints. Nothing changes if any of the joints is unknown.
    pub fn set_robot_state(&mut self, names: &[String], positions: &[f64]) -> Result<(), CollisionError> {
        if names.len() != positions.len() {
            return Err(CollisionError::Scene(format!(
                "robot state has {} joint names but {} positions", names.len(), positions.len())));
        }
        self.check_joint_names(names.iter())?;
        let state: Vec<(String, f64)> = names.iter().cloned().zip(positions.iter().copied()).collect();
        self.apply_joint_state(&state)
    }

    /// Replaces the whole scene: joint state, placement of the robot, obstacles, attached
    /// objects and the collision map. The grid is rebuilt from scratch.
    ///
    /// Unknown joints, a transform in another frame than the grid and attached objects that
    /// cannot be built are reported before anything is changed.
    pub fn set_planning_scene(&mut self, scene: &PlanningScene) -> Result<(), CollisionError> {
        self.check_joint_names(scene.robot_state.iter().map(|(name, _)| name))?;
        if scene.model_to_world.is_some() && scene.world_frame != self.grid.reference_frame() {
            return Err(CollisionError::Scene(format!(
                "model to world transform is in '{}', the grid is in '{}'",
                scene.world_frame, self.grid.reference_frame())));
        }
        let attached = scene
            .attached_objects
            .iter()
            .map(|descriptor| match descriptor.operation {
                ObjectOperation::Add => self.build_attached_object(descriptor).map(Some),
                ObjectOperation::Remove => Ok(None),
            })
            .collect::<Result<Vec<_>, CollisionError>>()?;

        if let Some(transform) = scene.model_to_world {
            self.model.set_model_to_world_transform(transform, &scene.world_frame);
        }
        for object in &scene.collision_objects {
            self.register_collision_object(object);
        }
        for (descriptor, object) in scene.attached_objects.iter().zip(attached) {
            match object {
                Some(object) => self.attach(object),
                None => self.detach(&descriptor.id),
            }
        }

        if let Some(map) = &scene.collision_map {
            if map.frame_id != self.grid.reference_frame() {
                warn!("Collision map is in '{}', expected '{}'", map.frame_id, self.grid.reference_frame());
            }
        }
        self.collision_map = scene.collision_map.clone();
        self.apply_joint_state(&scene.robot_state)
    }

    fn check_joint_names<'n>(&self, mut names: impl Iterator<Item = &'n String>) -> Result<(), CollisionError> {
        match names.find(|name| !self.model.has_joint(name)) {
            Some(name) => Err(CollisionError::UnknownJoint(name.clone())),
            None => Ok(()),
        }
    }

    /// Writes the joints, then drops the cached frames and rebuilds the grid even if the
    /// model refused one of them.
    fn apply_joint_state(&mut self, state: &[(String, f64)]) -> Result<(), CollisionError> {
        let written = state
            .iter()
            .try_for_each(|(name, position)| self.model.set_joint_position(name, *position));
        self.invalidate_frames();
        let rebuilt = self.rebuild_obstacles();
        written.and(rebuilt)
    }

    /// Adds, replaces or removes one obstacle. Added objects go straight into the grid;
    /// removing one rebuilds the grid.
    pub fn process_collision_object(&mut self, object: &CollisionObject) -> Result<(), CollisionError> {
        self.register_collision_object(object);
        match object.operation {
            ObjectOperation::Add => {
                for shape in &object.shapes {
                    self.grid.add_shape(shape);
                }
                Ok(())
            }
            ObjectOperation::Remove => self.rebuild_obstacles(),
        }
    }

    fn register_collision_object(&mut self, object: &CollisionObject) {
        self.collision_objects.retain(|o| o.id != object.id);
        match object.operation {
            ObjectOperation::Add => {
                debug!("Adding collision object '{}' with {} shapes", object.id, object.shapes.len());
                self.collision_objects.push(object.clone());
            }
            ObjectOperation::Remove => debug!("Removing collision object '{}'", object.id),
        }
    }

    /// Attaches an object to a link of the default group, or detaches it.
    pub fn process_attached_object(&mut self, descriptor: &AttachedObjectDescriptor)
                                   -> Result<(), CollisionError> {
        match descriptor.operation {
            ObjectOperation::Add => {
                let object = self.build_attached_object(descriptor)?;
                self.attach(object);
            }
            ObjectOperation::Remove => self.detach(&descriptor.id),
        }
        Ok(())
    }

    fn build_attached_object(&self, descriptor: &AttachedObjectDescriptor) -> Result<AttachedObject, CollisionError> {
        let key = self.model.frame_key(&self.group_name, &descriptor.link_name).ok_or_else(|| {
            CollisionError::UnknownLink {
                group: self.group_name.clone(),
                link: descriptor.link_name.clone(),
            }
        })?;
        AttachedObject::from_shapes(&descriptor.id, &descriptor.link_name, key, &descriptor.shapes,
                                    self.object_enclosing_sphere_radius)
            .ok_or_else(|| CollisionError::Scene(format!(
                "attached object '{}' has no shapes or the sphere radius {} is not positive",
                descriptor.id, self.object_enclosing_sphere_radius)))
    }

    fn attach(&mut self, object: AttachedObject) {
        info!("Attached '{}' to '{}' as {} spheres, enclosing radius {:.3}",
            object.id, object.link_name, object.spheres.len(), object.enclosing.radius);
        self.attached_object = Some(object);
    }

    fn detach(&mut self, id: &str) {
        if self.attached_object.as_ref().is_some_and(|o| o.id == id) {
            info!("Detached '{}'", id);
            self.attached_object = None;
        } else {
            debug!("Object '{}' is not attached", id);
        }
    }

    pub fn remove_attached_object(&mut self) {
        self.attached_object = None;
    }

    /// Resets the grid, then inserts the registered obstacles, the collision map and the
    /// voxel groups.
    pub fn rebuild_obstacles(&mut self) -> Result<(), CollisionError> {
        self.grid.reset();
        for object in &self.collision_objects {
            for shape in &object.shapes {
                self.grid.add_shape(shape);
            }
        }
        if let Some(map) = &self.collision_map {
            self.grid.add_points(&map.boxes);
        }
        self.update_voxel_groups()
    }
}
