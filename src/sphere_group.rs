//! Sphere and voxel approximations of the robot body.

use nalgebra::{Point3, Vector3};

use crate::kinematic_traits::FrameKey;

/// Level of detail of a sphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// Few, large spheres. Each one bounds the fine spheres it stands for.
    Coarse,
    /// Many small spheres that follow the body closely.
    Fine,
}

/// Collision sphere, rigidly attached to one link.
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    pub name: String,
    /// Center in the frame of the link.
    pub center: Vector3<f64>,
    pub radius: f64,
    /// Frame the center is given in.
    pub key: FrameKey,
    pub resolution: Resolution,
}

impl Sphere {
    pub fn new(name: &str, center: Vector3<f64>, radius: f64, key: FrameKey, resolution: Resolution) -> Self {
        Sphere {
            name: name.to_string(),
            center,
            radius,
            key,
            resolution,
        }
    }
}

/// Sphere with its center in the world frame, as reported in collision diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct PosedSphere {
    pub name: String,
    pub center: Point3<f64>,
    pub radius: f64,
}

/// Named group of spheres approximating one functional part of the robot (arm, torso,
/// head), available at two resolutions.
#[derive(Debug, Clone)]
pub struct SphereGroup {
    pub name: String,
    /// Chains of the robot model whose forward kinematics pose this group; a
    /// [`FrameKey::chain`] is a position in this list.
    pub chains: Vec<usize>,
    /// Links of the group, used for reporting.
    pub links: Vec<String>,
    coarse: Vec<Sphere>,
    fine: Vec<Sphere>,
}

impl SphereGroup {
    /// Creates the group, sorting spheres by their resolution tag.
    pub fn new(name: &str, chains: Vec<usize>, links: Vec<String>, spheres: Vec<Sphere>) -> Self {
        let (coarse, fine) = spheres
            .into_iter()
            .partition(|s| s.resolution == Resolution::Coarse);
        SphereGroup {
            name: name.to_string(),
            chains,
            links,
            coarse,
            fine,
        }
    }

    /// Spheres of the given resolution. A group declared without coarse spheres uses the
    /// fine ones for both passes.
    pub fn spheres(&self, resolution: Resolution) -> &[Sphere] {
        match resolution {
            Resolution::Coarse if !self.coarse.is_empty() => &self.coarse,
            _ => &self.fine,
        }
    }

    pub fn sphere_count(&self, resolution: Resolution) -> usize {
        self.spheres(resolution).len()
    }

    /// All spheres, coarse first.
    pub fn all_spheres(&self) -> impl Iterator<Item = &Sphere> {
        self.coarse.iter().chain(self.fine.iter())
    }
}

/// Point cloud sampled from the surface of one link.
#[derive(Debug, Clone)]
pub struct VoxelLink {
    pub name: String,
    pub key: FrameKey,
    /// Points in the frame of the link.
    pub voxels: Vec<Vector3<f64>>,
}

/// Part of the robot represented by dense points inserted into the distance field rather
/// than by spheres, so that sphere groups avoid colliding with it.
#[derive(Debug, Clone)]
pub struct VoxelGroup {
    pub name: String,
    pub chains: Vec<usize>,
    pub links: Vec<VoxelLink>,
}

impl VoxelGroup {
    pub fn new(name: &str, chains: Vec<usize>, links: Vec<VoxelLink>) -> Self {
        VoxelGroup { name: name.to_string(), chains, links }
    }

    pub fn voxel_count(&self) -> usize {
        self.links.iter().map(|l| l.voxels.len()).sum()
    }
}
