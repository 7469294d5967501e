//! Obstacles and attached objects as they come with a planning scene.

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use parry3d::bounding_volume::{BoundingSphere, BoundingVolume};
use parry3d::shape::SharedShape;

use crate::kinematic_traits::FrameKey;
use crate::sphere_group::{Resolution, Sphere};

/// Primitive shape of an obstacle or attached object. Dimensions in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectShape {
    /// Full edge lengths along x, y, z.
    Box { size: Vector3<f64> },
    Sphere { radius: f64 },
    /// Cylinder along the local z axis.
    Cylinder { radius: f64, length: f64 },
}

impl ObjectShape {
    /// Parry shape and the local transform that brings it into this shape's frame
    /// (parry cylinders are along y).
    pub(crate) fn to_parry(&self) -> (SharedShape, Isometry3<f32>) {
        match *self {
            ObjectShape::Box { size } => (
                SharedShape::cuboid(size.x as f32 / 2.0, size.y as f32 / 2.0, size.z as f32 / 2.0),
                Isometry3::identity(),
            ),
            ObjectShape::Sphere { radius } => (SharedShape::ball(radius as f32), Isometry3::identity()),
            ObjectShape::Cylinder { radius, length } => (
                SharedShape::cylinder(length as f32 / 2.0, radius as f32),
                Isometry3::from_parts(
                    Translation3::identity(),
                    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f32::consts::FRAC_PI_2),
                ),
            ),
        }
    }
}

/// Shape with its pose, relative to the frame of whatever owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedShape {
    pub shape: ObjectShape,
    pub pose: Isometry3<f64>,
}

impl PlacedShape {
    pub fn new(shape: ObjectShape, pose: Isometry3<f64>) -> Self {
        PlacedShape { shape, pose }
    }

    /// World-placed parry shape for the given owner transform.
    pub(crate) fn parry_pose(&self, owner: &Isometry3<f64>) -> (SharedShape, Isometry3<f32>) {
        let (shape, local) = self.shape.to_parry();
        let pose: Isometry3<f32> = (owner * self.pose).cast::<f32>() * local;
        (shape, pose)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectOperation {
    Add,
    Remove,
}

/// Named static obstacle in the world frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionObject {
    pub id: String,
    pub operation: ObjectOperation,
    pub shapes: Vec<PlacedShape>,
}

/// Object held by the robot. Shapes are placed relative to `link_name`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachedObjectDescriptor {
    pub id: String,
    pub link_name: String,
    pub operation: ObjectOperation,
    pub shapes: Vec<PlacedShape>,
}

/// Bulk obstacle cells (box centers) in the `frame_id` frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionMap {
    pub frame_id: String,
    pub boxes: Vec<Point3<f64>>,
}

/// Attached object as a set of spheres in the frame of the link it is attached to.
/// The coarse pass uses a single sphere enclosing all of them.
#[derive(Debug, Clone)]
pub struct AttachedObject {
    pub id: String,
    pub link_name: String,
    pub spheres: Vec<Sphere>,
    pub enclosing: Sphere,
}

impl AttachedObject {
    /// Fills the shapes with spheres of `sphere_radius`. Spheres are centered on a cubic
    /// lattice over the bounding box of each shape and sized to cover their lattice cell,
    /// only cells touching the shape are kept. Returns `None` if there are no shapes or the
    /// radius is not positive.
    pub fn from_shapes(id: &str, link_name: &str, key: FrameKey, shapes: &[PlacedShape],
                       sphere_radius: f64) -> Option<Self> {
        if sphere_radius.is_nan() || sphere_radius <= 0.0 {
            return None;
        }
        let spacing = sphere_radius * 2.0 / 3f64.sqrt();
        let mut spheres = Vec::new();
        for placed in shapes {
            if let ObjectShape::Sphere { radius } = placed.shape {
                spheres.push(Sphere::new(
                    &format!("{}_{}", id, spheres.len()),
                    placed.pose.translation.vector,
                    radius,
                    key,
                    Resolution::Fine,
                ));
                continue;
            }
            let (shape, pose) = placed.parry_pose(&Isometry3::identity());
            let aabb = shape.compute_aabb(&pose);
            let mins = aabb.mins.cast::<f64>();
            let extent = aabb.maxs.cast::<f64>() - mins;
            let counts = extent.map(|e| ((e / spacing).ceil() as usize).max(1));
            for i in 0..counts.x {
                for j in 0..counts.y {
                    for k in 0..counts.z {
                        let center = mins + Vector3::new(
                            (i as f64 + 0.5) * spacing,
                            (j as f64 + 0.5) * spacing,
                            (k as f64 + 0.5) * spacing,
                        );
                        let distance = shape.distance_to_point(&pose, &center.cast::<f32>(), true);
                        if (distance as f64) <= sphere_radius {
                            spheres.push(Sphere::new(
                                &format!("{}_{}", id, spheres.len()),
                                center.coords,
                                sphere_radius,
                                key,
                                Resolution::Fine,
                            ));
                        }
                    }
                }
            }
        }

        let bounding = spheres
            .iter()
            .map(|s| BoundingSphere::new(Point3::from(s.center.cast::<f32>()), s.radius as f32))
            .reduce(|a, b| a.merged(&b))?;
        let enclosing = Sphere::new(
            &format!("{}_enclosing", id),
            bounding.center().coords.cast::<f64>(),
            // f32 rounding must not make the enclosing sphere smaller than its content
            bounding.radius() as f64 + 1E-5,
            key,
            Resolution::Coarse,
        );
        Some(AttachedObject {
            id: id.to_string(),
            link_name: link_name.to_string(),
            spheres,
            enclosing,
        })
    }

    /// Spheres to test for the given pass.
    pub fn spheres(&self, resolution: Resolution) -> &[Sphere] {
        match resolution {
            Resolution::Coarse => std::slice::from_ref(&self.enclosing),
            Resolution::Fine => &self.spheres,
        }
    }
}
