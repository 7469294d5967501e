use rand::Rng;
use std::f64::consts::PI;

use crate::utils::normalize_angle;

/// Limits of one joint. Continuous joints have no fixed limits and wrap at ±π,
/// `min` and `max` are then not used.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointLimit {
    pub min: f64,
    pub max: f64,
    pub continuous: bool,
}

impl JointLimit {
    pub fn new(min: f64, max: f64) -> Self {
        JointLimit { min, max, continuous: false }
    }

    pub fn continuous() -> Self {
        JointLimit { min: -PI, max: PI, continuous: true }
    }

    pub fn compliant(&self, angle: f64) -> bool {
        self.continuous || (angle >= self.min && angle <= self.max)
    }

    /// Clamps into the limits; continuous joints are normalized instead.
    pub fn clamp(&self, angle: f64) -> f64 {
        if self.continuous {
            normalize_angle(angle)
        } else {
            angle.clamp(self.min, self.max)
        }
    }
}

/// Limit table of the planning joints, indexed in the same order as the planning joints.
#[derive(Clone, Debug, Default)]
pub struct JointLimits {
    pub limits: Vec<JointLimit>,
}

impl JointLimits {
    pub fn new(limits: Vec<JointLimit>) -> Self {
        JointLimits { limits }
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    pub fn compliant(&self, angles: &[f64]) -> bool {
        angles.len() == self.limits.len()
            && self.limits.iter().zip(angles).all(|(limit, &angle)| limit.compliant(angle))
    }

    pub fn min_limits(&self) -> Vec<f64> {
        self.limits.iter().map(|l| l.min).collect()
    }

    pub fn max_limits(&self) -> Vec<f64> {
        self.limits.iter().map(|l| l.max).collect()
    }

    /// Random joint configuration that satisfies the limits. Continuous joints
    /// cover the whole circle.
    pub fn random_angles<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        self.limits.iter()
            .map(|limit| {
                if limit.continuous {
                    rng.gen_range(-PI..PI)
                } else if limit.min < limit.max {
                    rng.gen_range(limit.min..=limit.max)
                } else {
                    limit.min
                }
            })
            .collect()
    }
}
