//! Helper functions

use std::f64::consts::PI;

/// Normalizes the angle into the (-π, π] range.
pub fn normalize_angle(angle: f64) -> f64 {
    let two_pi = 2.0 * PI;
    let a = angle.rem_euclid(two_pi);
    if a > PI { a - two_pi } else { a }
}

/// Signed angular difference `to - from` along the shorter way around the circle.
pub fn shortest_angular_distance(from: f64, to: f64) -> f64 {
    normalize_angle(to - from)
}

/// Normalizes every joint value in place.
pub fn normalize_joints(joints: &mut [f64]) {
    for q in joints.iter_mut() {
        *q = normalize_angle(*q);
    }
}

/// Formats joint values, converting radians to degrees.
pub fn format_joints(joints: &[f64]) -> String {
    let mut row_str = String::new();
    for q in joints {
        row_str.push_str(&format!("{:5.2} ", q.to_degrees()));
    }
    format!("[{}]", row_str.trim_end())
}

/// Formats plain values (limits, meters) with three decimals.
pub fn format_values(values: &[f64]) -> String {
    let items: Vec<String> = values.iter().map(|v| format!("{:.3}", v)).collect();
    format!("[{}]", items.join(" "))
}
