//! Supports reading the robot description (chains, sphere and voxel groups) from YAML (optional)

use std::path::Path;

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use yaml_rust2::Yaml;

use crate::constraints::JointLimit;
use crate::kinematics_impl::{ChainRobotModel, SegmentSpec, SphereSpec};
use crate::parameter_error::ParameterError;
use crate::parameters_from_file::{angle, angles, array, is_missing, load_document, number, required,
                                  string, strings, vector3};
use crate::sphere_group::Resolution;

/// Spacing of voxels sampled from a `box` entry of a voxel link, if not given.
const DEFAULT_VOXEL_SPACING: f64 = 0.02;

/// Pose from optional `xyz` and `rpy` (roll, pitch, yaw; `deg(...)` accepted) entries.
fn pose(node: &Yaml, field: &str) -> Result<Isometry3<f64>, ParameterError> {
    let xyz = if is_missing(&node["xyz"]) {
        Vector3::zeros()
    } else {
        vector3(&node["xyz"], &format!("{}.xyz", field))?
    };
    let rpy = if is_missing(&node["rpy"]) {
        vec![0.0; 3]
    } else {
        angles(&node["rpy"], &format!("{}.rpy", field))?
    };
    if rpy.len() != 3 {
        return Err(ParameterError::InvalidLength {
            field: format!("{}.rpy", field),
            expected: 3,
            found: rpy.len(),
        });
    }
    Ok(Isometry3::from_parts(
        Translation3::from(xyz),
        UnitQuaternion::from_euler_angles(rpy[0], rpy[1], rpy[2]),
    ))
}

fn joint_limit(node: &Yaml, name: &str) -> Result<JointLimit, ParameterError> {
    if node["continuous"].as_bool() == Some(true) {
        return Ok(JointLimit::continuous());
    }
    let field = format!("joints.{}.limits", name);
    let limits = array(required(node, "limits")?, &field)?;
    if limits.len() != 2 {
        return Err(ParameterError::InvalidLength { field, expected: 2, found: limits.len() });
    }
    let min = angle(&limits[0], &field)?;
    let max = angle(&limits[1], &field)?;
    if min > max {
        return Err(ParameterError::ParseError(format!("{}: min {} is above max {}", field, min, max)));
    }
    Ok(JointLimit::new(min, max))
}

fn box_voxels(dims: &Vector3<f64>, center: &Vector3<f64>, spacing: f64) -> Vec<Vector3<f64>> {
    let steps = dims.map(|d| (d / spacing + 1E-9).floor() as usize);
    let corner = center - dims / 2.0;
    let mut voxels = Vec::with_capacity((steps.x + 1) * (steps.y + 1) * (steps.z + 1));
    for i in 0..=steps.x {
        for j in 0..=steps.y {
            for k in 0..=steps.z {
                voxels.push(corner + Vector3::new(i as f64, j as f64, k as f64) * spacing);
            }
        }
    }
    voxels
}

impl ChainRobotModel {
    /// Reads the robot from YAML like
    /// ```yaml
    /// world_frame: base_link
    /// joints:
    ///   - { name: shoulder, axis: [0, 0, 1], limits: [deg(-170), deg(170)] }
    ///   - { name: wrist, axis: [0, 0, 1], continuous: true }
    /// chains:
    ///   - name: arm
    ///     base: { xyz: [0, 0, 0.1] }
    ///     segments:
    ///       - { link: upper_arm, joint: shoulder }
    ///       - { link: forearm, xyz: [0.4, 0, 0], joint: wrist }
    /// sphere_groups:
    ///   - name: arm
    ///     chains: [arm]
    ///     spheres:
    ///       - { name: upper, link: upper_arm, center: [0.2, 0, 0], radius: 0.25, coarse: true }
    ///       - { name: upper_1, link: upper_arm, center: [0.1, 0, 0], radius: 0.06 }
    /// voxel_groups:
    ///   - name: base
    ///     chains: [arm]
    ///     links:
    ///       - { link: upper_arm, box: [0.1, 0.1, 0.1], spacing: 0.02 }
    ///       - { link: forearm, voxels: [[0, 0, 0], [0.1, 0, 0]] }
    /// ```
    /// Segments without `joint` are fixed. Voxel links either list their points or give a
    /// box (optionally with `center`) that is sampled at `spacing`.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ParameterError> {
        let doc = load_document(contents)?;
        let world_frame = if is_missing(&doc["world_frame"]) {
            "base_link".to_string()
        } else {
            string(&doc["world_frame"], "world_frame")?
        };
        let mut model = ChainRobotModel::new(&world_frame);

        for joint in array(required(&doc, "joints")?, "joints")? {
            let name = string(required(joint, "name")?, "joints.name")?;
            let axis = vector3(required(joint, "axis")?, &format!("joints.{}.axis", name))?;
            if axis.norm() < 1E-9 {
                return Err(ParameterError::ParseError(format!("joint {} has a zero axis", name)));
            }
            let limit = joint_limit(joint, &name)?;
            model.add_joint(&name, axis, limit);
        }

        for chain in array(required(&doc, "chains")?, "chains")? {
            let name = string(required(chain, "name")?, "chains.name")?;
            let base = pose(&chain["base"], &format!("chains.{}.base", name))?;
            let segments = array(required(chain, "segments")?, "segments")?
                .iter()
                .map(|segment| {
                    let link = string(required(segment, "link")?, "segments.link")?;
                    let origin = pose(segment, &format!("segments.{}", link))?;
                    let joint = if is_missing(&segment["joint"]) {
                        None
                    } else {
                        Some(string(&segment["joint"], "segments.joint")?)
                    };
                    Ok(SegmentSpec { link, origin, joint })
                })
                .collect::<Result<Vec<_>, ParameterError>>()?;
            model
                .add_chain(&name, base, segments)
                .map_err(|e| ParameterError::ModelError(e.to_string()))?;
        }

        for group in array(required(&doc, "sphere_groups")?, "sphere_groups")? {
            let name = string(required(group, "name")?, "sphere_groups.name")?;
            let chains = strings(required(group, "chains")?, "sphere_groups.chains")?;
            let spheres = array(required(group, "spheres")?, "spheres")?
                .iter()
                .map(|sphere| {
                    let sphere_name = string(required(sphere, "name")?, "spheres.name")?;
                    let radius = number(required(sphere, "radius")?, &format!("{}.radius", sphere_name))?;
                    if radius <= 0.0 {
                        return Err(ParameterError::ParseError(format!(
                            "sphere {} must have a positive radius", sphere_name)));
                    }
                    let coarse = sphere["coarse"].as_bool().unwrap_or(false);
                    Ok(SphereSpec {
                        link: string(required(sphere, "link")?, "spheres.link")?,
                        center: vector3(required(sphere, "center")?, &format!("{}.center", sphere_name))?,
                        radius,
                        resolution: if coarse { Resolution::Coarse } else { Resolution::Fine },
                        name: sphere_name,
                    })
                })
                .collect::<Result<Vec<_>, ParameterError>>()?;
            let chain_names: Vec<&str> = chains.iter().map(String::as_str).collect();
            model
                .add_sphere_group(&name, &chain_names, spheres)
                .map_err(|e| ParameterError::ModelError(e.to_string()))?;
        }

        if !is_missing(&doc["voxel_groups"]) {
            for group in array(&doc["voxel_groups"], "voxel_groups")? {
                let name = string(required(group, "name")?, "voxel_groups.name")?;
                let chains = strings(required(group, "chains")?, "voxel_groups.chains")?;
                let links = array(required(group, "links")?, "links")?
                    .iter()
                    .map(|link| {
                        let link_name = string(required(link, "link")?, "links.link")?;
                        let voxels = if !is_missing(&link["box"]) {
                            let dims = vector3(&link["box"], &format!("{}.box", link_name))?;
                            let center = if is_missing(&link["center"]) {
                                Vector3::zeros()
                            } else {
                                vector3(&link["center"], &format!("{}.center", link_name))?
                            };
                            let spacing = if is_missing(&link["spacing"]) {
                                DEFAULT_VOXEL_SPACING
                            } else {
                                number(&link["spacing"], &format!("{}.spacing", link_name))?
                            };
                            if spacing <= 0.0 {
                                return Err(ParameterError::ParseError(format!(
                                    "{}: spacing must be positive", link_name)));
                            }
                            box_voxels(&dims, &center, spacing)
                        } else {
                            array(required(link, "voxels")?, "voxels")?
                                .iter()
                                .map(|v| vector3(v, &format!("{}.voxels", link_name)))
                                .collect::<Result<Vec<_>, ParameterError>>()?
                        };
                        Ok((link_name, voxels))
                    })
                    .collect::<Result<Vec<_>, ParameterError>>()?;
                let chain_names: Vec<&str> = chains.iter().map(String::as_str).collect();
                model
                    .add_voxel_group(&name, &chain_names, links)
                    .map_err(|e| ParameterError::ModelError(e.to_string()))?;
            }
        }
        Ok(model)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ParameterError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }
}
