//! Supports reading the collision space and occupancy grid configuration from YAML (optional)

use std::path::Path;

use nalgebra::{Point3, Vector3};
use yaml_rust2::{Yaml, YamlLoader};

use crate::parameter_error::ParameterError;
use crate::parameters::{CollisionSpaceConfig, OccupancyGridConfig};

/// Parses the first document of the YAML text.
pub(crate) fn load_document(contents: &str) -> Result<Yaml, ParameterError> {
    let mut docs = YamlLoader::load_from_str(contents)
        .map_err(|e| ParameterError::ParseError(format!("{}", e)))?;
    if docs.is_empty() {
        return Err(ParameterError::ParseError("empty YAML document".to_string()));
    }
    Ok(docs.swap_remove(0))
}

pub(crate) fn is_missing(value: &Yaml) -> bool {
    value.is_badvalue() || value.is_null()
}

/// Number, accepting integers as well as reals.
pub(crate) fn number(value: &Yaml, field: &str) -> Result<f64, ParameterError> {
    let parsed = match value {
        Yaml::Real(_) => value.as_f64(),
        Yaml::Integer(i) => Some(*i as f64),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParameterError::ParseError(format!("'{}' must be a finite number", field)))
}

/// Angle in radians. Besides plain numbers, `deg(angle)` is accepted for degrees.
pub(crate) fn angle(value: &Yaml, field: &str) -> Result<f64, ParameterError> {
    if let Some(text) = value.as_str() {
        let degrees = text
            .trim()
            .strip_prefix("deg(")
            .and_then(|rest| rest.strip_suffix(')'))
            .and_then(|inner| inner.trim().parse::<f64>().ok())
            .ok_or_else(|| ParameterError::ParseError(format!("'{}': cannot parse angle '{}'", field, text)))?;
        return Ok(degrees.to_radians());
    }
    number(value, field)
}

pub(crate) fn required<'y>(parent: &'y Yaml, field: &str) -> Result<&'y Yaml, ParameterError> {
    let value = &parent[field];
    if is_missing(value) {
        Err(ParameterError::MissingField(field.to_string()))
    } else {
        Ok(value)
    }
}

pub(crate) fn string(value: &Yaml, field: &str) -> Result<String, ParameterError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ParameterError::ParseError(format!("'{}' must be a string", field)))
}

pub(crate) fn array<'y>(value: &'y Yaml, field: &str) -> Result<&'y [Yaml], ParameterError> {
    value
        .as_vec()
        .map(Vec::as_slice)
        .ok_or_else(|| ParameterError::ParseError(format!("'{}' must be a list", field)))
}

pub(crate) fn strings(value: &Yaml, field: &str) -> Result<Vec<String>, ParameterError> {
    array(value, field)?.iter().map(|v| string(v, field)).collect()
}

pub(crate) fn numbers(value: &Yaml, field: &str) -> Result<Vec<f64>, ParameterError> {
    array(value, field)?.iter().map(|v| number(v, field)).collect()
}

pub(crate) fn angles(value: &Yaml, field: &str) -> Result<Vec<f64>, ParameterError> {
    array(value, field)?.iter().map(|v| angle(v, field)).collect()
}

pub(crate) fn vector3(value: &Yaml, field: &str) -> Result<Vector3<f64>, ParameterError> {
    let values = numbers(value, field)?;
    if values.len() != 3 {
        return Err(ParameterError::InvalidLength {
            field: field.to_string(),
            expected: 3,
            found: values.len(),
        });
    }
    Ok(Vector3::new(values[0], values[1], values[2]))
}

fn boolean(value: &Yaml, field: &str) -> Result<bool, ParameterError> {
    value
        .as_bool()
        .ok_or_else(|| ParameterError::ParseError(format!("'{}' must be true or false", field)))
}

impl CollisionSpaceConfig {
    /// Reads the configuration from YAML like
    /// ```yaml
    /// group_name: right_arm
    /// planning_joints: [shoulder_pan, shoulder_lift, elbow]
    /// increments: [deg(2), deg(2), deg(2)]
    /// padding: 0.005
    /// use_multi_level_collision_check: true
    /// object_enclosing_sphere_radius: 0.03
    /// ```
    /// Only `group_name` and `planning_joints` are required. If given, `increments` must
    /// list one value per planning joint.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ParameterError> {
        let doc = load_document(contents)?;
        let mut config = CollisionSpaceConfig {
            group_name: string(required(&doc, "group_name")?, "group_name")?,
            planning_joints: strings(required(&doc, "planning_joints")?, "planning_joints")?,
            ..Default::default()
        };

        if !is_missing(&doc["increments"]) {
            config.increments = angles(&doc["increments"], "increments")?;
            if config.increments.len() != config.planning_joints.len() {
                return Err(ParameterError::InvalidLength {
                    field: "increments".to_string(),
                    expected: config.planning_joints.len(),
                    found: config.increments.len(),
                });
            }
            if let Some(bad) = config.increments.iter().find(|&&inc| inc <= 0.0) {
                return Err(ParameterError::ParseError(format!("increments must be positive (got {})", bad)));
            }
        }
        if !is_missing(&doc["padding"]) {
            config.padding = number(&doc["padding"], "padding")?;
        }
        if !is_missing(&doc["use_multi_level_collision_check"]) {
            config.use_multi_level_collision_check =
                boolean(&doc["use_multi_level_collision_check"], "use_multi_level_collision_check")?;
        }
        if !is_missing(&doc["object_enclosing_sphere_radius"]) {
            config.object_enclosing_sphere_radius =
                number(&doc["object_enclosing_sphere_radius"], "object_enclosing_sphere_radius")?;
            let radius = config.object_enclosing_sphere_radius;
            if radius.is_nan() || radius <= 0.0 {
                return Err(ParameterError::ParseError(format!(
                    "object_enclosing_sphere_radius must be positive (got {})", radius)));
            }
        }
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ParameterError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }
}

impl OccupancyGridConfig {
    /// Reads the grid from the `occupancy_grid` section (or from the top level if there is
    /// no such section). Missing fields keep their defaults.
    /// ```yaml
    /// occupancy_grid:
    ///   size: [2.0, 2.0, 1.5]
    ///   resolution: 0.02
    ///   origin: [-1.0, -1.0, 0.0]
    ///   max_distance: 0.4
    ///   reference_frame: base_link
    /// ```
    pub fn from_yaml_str(contents: &str) -> Result<Self, ParameterError> {
        let doc = load_document(contents)?;
        let section = if is_missing(&doc["occupancy_grid"]) { &doc } else { &doc["occupancy_grid"] };
        let mut config = OccupancyGridConfig::default();

        if !is_missing(&section["size"]) {
            config.size = vector3(&section["size"], "size")?;
        }
        if !is_missing(&section["resolution"]) {
            config.resolution = number(&section["resolution"], "resolution")?;
        }
        if !is_missing(&section["origin"]) {
            config.origin = Point3::from(vector3(&section["origin"], "origin")?);
        }
        if !is_missing(&section["max_distance"]) {
            config.max_distance = number(&section["max_distance"], "max_distance")?;
        }
        if !is_missing(&section["reference_frame"]) {
            config.reference_frame = string(&section["reference_frame"], "reference_frame")?;
        }

        if config.resolution <= 0.0 {
            return Err(ParameterError::ParseError(format!(
                "resolution must be positive (got {})", config.resolution)));
        }
        if config.size.iter().any(|&s| s <= 0.0) {
            return Err(ParameterError::ParseError("size must be positive".to_string()));
        }
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ParameterError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }
}
