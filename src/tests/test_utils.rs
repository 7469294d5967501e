//! Sample robot and world shared by the collision space tests.
//!
//! The arm lies in the XY plane of `base_link`: three links rotating about Z with the
//! shoulder at the origin, 0.3 m upper arm, 0.25 m forearm and a short hand. Each link has
//! fine spheres and one coarse sphere that covers them with a margin of three grid cells.
//! A fixed torso sphere sits 0.26 m to the -Y side of the shoulder, with a pedestal voxel
//! group further out.

use nalgebra::{Isometry3, Point3, Vector3};

use crate::collisions::CollisionSpace;
use crate::constraints::JointLimit;
use crate::kinematics_impl::{ChainRobotModel, SegmentSpec, SphereSpec};
use crate::occupancy_grid::OccupancyGrid;
use crate::parameters::{CollisionSpaceConfig, OccupancyGridConfig};
use crate::sphere_group::Resolution;

pub const ARM_JOINTS: [&str; 3] = ["shoulder", "elbow", "wrist"];

/// Small square obstacle in the way of the stretched arm.
pub const OBSTACLE_CENTER: [f64; 3] = [0.46, 0.0, 0.0];
pub const OBSTACLE_SIZE: f64 = 0.08;

fn segment(link: &str, x: f64, joint: Option<&str>) -> SegmentSpec {
    SegmentSpec {
        link: link.to_string(),
        origin: Isometry3::translation(x, 0.0, 0.0),
        joint: joint.map(str::to_string),
    }
}

pub fn sphere(name: &str, link: &str, x: f64, radius: f64, resolution: Resolution) -> SphereSpec {
    SphereSpec {
        name: name.to_string(),
        link: link.to_string(),
        center: Vector3::new(x, 0.0, 0.0),
        radius,
        resolution,
    }
}

pub fn sample_robot() -> ChainRobotModel {
    use Resolution::{Coarse, Fine};

    let mut robot = ChainRobotModel::new("base_link");
    robot.add_joint("shoulder", Vector3::z(), JointLimit::new(-2.5, 2.5));
    robot.add_joint("elbow", Vector3::z(), JointLimit::new(-2.5, 2.5));
    robot.add_joint("wrist", Vector3::z(), JointLimit::continuous());

    robot.add_chain("arm", Isometry3::identity(), vec![
        segment("upper_arm", 0.0, Some("shoulder")),
        segment("forearm", 0.3, Some("elbow")),
        segment("hand", 0.25, Some("wrist")),
    ]).unwrap();
    robot.add_chain("torso", Isometry3::identity(), vec![SegmentSpec {
        link: "torso_link".to_string(),
        origin: Isometry3::translation(0.0, -0.26, 0.0),
        joint: None,
    }]).unwrap();

    robot.add_sphere_group("arm", &["arm"], vec![
        sphere("upper_0", "upper_arm", 0.10, 0.05, Fine),
        sphere("upper_1", "upper_arm", 0.20, 0.05, Fine),
        sphere("forearm_0", "forearm", 0.08, 0.05, Fine),
        sphere("forearm_1", "forearm", 0.16, 0.05, Fine),
        sphere("hand_0", "hand", 0.05, 0.04, Fine),
        sphere("upper", "upper_arm", 0.15, 0.16, Coarse),
        sphere("forearm", "forearm", 0.12, 0.15, Coarse),
        sphere("hand", "hand", 0.05, 0.10, Coarse),
    ]).unwrap();

    robot.add_sphere_group("torso", &["torso"], vec![
        sphere("torso_0", "torso_link", 0.0, 0.08, Fine),
        sphere("torso", "torso_link", 0.0, 0.14, Coarse),
    ]).unwrap();

    // 4 x 4 x 4 points on grid cell centers, from y = -0.40 to -0.34 in base_link
    let mut pedestal = Vec::new();
    for i in 0..4 {
        for j in 0..4 {
            for k in 0..4 {
                pedestal.push(Vector3::new(
                    -0.04 + 0.02 * i as f64,
                    -0.14 + 0.02 * j as f64,
                    -0.04 + 0.02 * k as f64,
                ));
            }
        }
    }
    robot.add_voxel_group("pedestal", &["torso"], vec![("torso_link".to_string(), pedestal)]).unwrap();
    robot
}

pub fn grid_config() -> OccupancyGridConfig {
    OccupancyGridConfig {
        size: Vector3::new(1.6, 1.6, 0.8),
        resolution: 0.02,
        origin: Point3::new(-0.8, -0.8, -0.4),
        max_distance: 0.4,
        reference_frame: "base_link".to_string(),
    }
}

pub fn space_config() -> CollisionSpaceConfig {
    CollisionSpaceConfig::new("arm", &ARM_JOINTS)
}

/// Collision space over an empty grid.
pub fn sample_space() -> CollisionSpace<'static, ChainRobotModel> {
    let grid = OccupancyGrid::new(&grid_config());
    CollisionSpace::new(sample_robot(), grid, &space_config()).unwrap()
}

/// Collision space with the obstacle in front of the stretched arm.
pub fn space_with_obstacle() -> CollisionSpace<'static, ChainRobotModel> {
    let mut grid = OccupancyGrid::new(&grid_config());
    grid.add_cube(
        &Point3::from(OBSTACLE_CENTER),
        &Vector3::repeat(OBSTACLE_SIZE),
    );
    CollisionSpace::new(sample_robot(), grid, &space_config()).unwrap()
}
