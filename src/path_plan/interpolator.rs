use crate::constraints::JointLimits;
use crate::utils::{normalize_angle, shortest_angular_distance};

/// Reasons the interpolation between two configurations is refused.
#[derive(Debug, Clone, PartialEq)]
pub enum InterpolationError {
    /// Start, end, limits and increments do not all have the same number of joints.
    LengthMismatch,
    /// Joint `joint` of the start configuration is outside of its limits.
    StartOutOfLimits { joint: usize, value: f64 },
    /// Joint `joint` of the end configuration is outside of its limits.
    EndOutOfLimits { joint: usize, value: f64 },
    /// Increments must be positive and finite.
    InvalidIncrement { joint: usize, value: f64 },
}

/// Expands the move from `start` to `end` into waypoints, both ends included, so that no
/// joint changes by more than its increment between two consecutive waypoints.
///
/// Continuous joints take the shorter way around the circle (possibly through ±π) and
/// their values are normalized into (-π, π]. Other joints move linearly and are
/// clamped to their limits. Fails if an end point of a non-continuous joint lies outside
/// its limits.
pub fn interpolate_path(
    start: &[f64],
    end: &[f64],
    limits: &JointLimits,
    increments: &[f64],
) -> Result<Vec<Vec<f64>>, InterpolationError> {
    let n = start.len();
    if end.len() != n || limits.len() != n || increments.len() != n {
        return Err(InterpolationError::LengthMismatch);
    }

    let mut diffs = Vec::with_capacity(n);
    let mut steps = 1usize;
    for j in 0..n {
        let limit = &limits.limits[j];
        if !limit.compliant(start[j]) {
            return Err(InterpolationError::StartOutOfLimits { joint: j, value: start[j] });
        }
        if !limit.compliant(end[j]) {
            return Err(InterpolationError::EndOutOfLimits { joint: j, value: end[j] });
        }
        if !(increments[j] > 0.0 && increments[j].is_finite()) {
            return Err(InterpolationError::InvalidIncrement { joint: j, value: increments[j] });
        }

        let diff = if limit.continuous {
            shortest_angular_distance(start[j], end[j])
        } else {
            end[j] - start[j]
        };
        // The small tolerance keeps exact multiples (1.0 / 0.25) from gaining a step
        let joint_steps = ((diff.abs() / increments[j]) - 1E-9).ceil().max(0.0) as usize;
        steps = steps.max(joint_steps);
        diffs.push(diff);
    }

    let mut path = Vec::with_capacity(steps + 1);
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let waypoint = (0..n)
            .map(|j| {
                let limit = &limits.limits[j];
                if i == steps && !limit.continuous {
                    end[j]
                } else if limit.continuous {
                    normalize_angle(start[j] + t * diffs[j])
                } else {
                    limit.clamp(start[j] + t * diffs[j])
                }
            })
            .collect();
        path.push(waypoint);
    }
    Ok(path)
}
