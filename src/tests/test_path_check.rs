#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use nalgebra::{Point3, Vector3};

    use crate::collisions::{CheckFlags, CollisionSpace, Validity};
    use crate::error::CollisionError;
    use crate::kinematics_impl::ChainRobotModel;
    use crate::occupancy_grid::OccupancyGrid;
    use crate::sphere_group::Resolution;
    use crate::tests::test_utils::{grid_config, sample_robot, space_config};

    fn space() -> CollisionSpace<'static, ChainRobotModel> {
        let mut config = space_config();
        config.increments = vec![0.1; 3];
        CollisionSpace::new(sample_robot(), OccupancyGrid::new(&grid_config()), &config).unwrap()
    }

    #[test]
    fn test_free_path_checks_every_waypoint() {
        let mut space = space();
        let check = space.check_path_for_collision(&[0.0, 0.0, 0.0], &[1.1, 0.0, 0.0], CheckFlags::empty())
            .unwrap();
        assert_eq!(check.validity, Validity::Valid);
        assert_eq!(check.path_length, 12);
        assert_eq!(check.num_checks, 12);
        assert!(check.clearance > 0.0);
    }

    #[test]
    fn test_collision_near_the_end_is_found_early() {
        let mut space = space();
        let end = [1.1, 0.0, 0.0];
        let hand = space
            .collision_spheres(&end, "arm", Resolution::Fine).unwrap()
            .into_iter()
            .find(|s| s.name == "hand_0")
            .unwrap();
        space.grid_mut().add_cube(&hand.center, &Vector3::repeat(0.04));
        assert!(!space.check_collision(&end, CheckFlags::empty()).unwrap().is_valid());
        assert!(space.check_collision(&[0.0, 0.0, 0.0], CheckFlags::empty()).unwrap().is_valid());

        let check = space.check_path_for_collision(&[0.0, 0.0, 0.0], &end, CheckFlags::COLLECT_ALL).unwrap();
        assert_eq!(check.validity, Validity::Collision);
        assert_eq!(check.path_length, 12);
        // Waypoints are visited as 0, 5, 10, 1, 6, 11, ... so the last one is the 6th check
        assert!(check.num_checks <= 6, "{} checks", check.num_checks);
    }

    #[test]
    fn test_short_path_is_checked_in_order() {
        let mut space = space();
        let check = space.check_path_for_collision(&[0.0, 0.0, 0.0], &[0.3, 0.0, 0.0], CheckFlags::empty())
            .unwrap();
        assert!(check.is_valid());
        assert_eq!(check.path_length, 4);
        assert_eq!(check.num_checks, 4);
    }

    #[test]
    fn test_end_outside_limits() {
        let mut space = space();
        let result = space.check_path_for_collision(&[0.0, 0.0, 0.0], &[3.0, 0.0, 0.0], CheckFlags::empty());
        match result {
            Err(CollisionError::Interpolation { start, end, min, max }) => {
                assert_eq!(start, vec![0.0, 0.0, 0.0]);
                assert_eq!(end, vec![3.0, 0.0, 0.0]);
                assert_eq!(min[0], -2.5);
                assert_eq!(max[0], 2.5);
            }
            other => panic!("expected interpolation error, got {:?}", other),
        }
    }

    #[test]
    fn test_continuous_joint_takes_short_way() {
        let mut space = space();
        let check = space.check_path_for_collision(&[0.0, 0.0, 3.0], &[0.0, 0.0, -3.0], CheckFlags::empty())
            .unwrap();
        assert!(check.is_valid());
        // 2π - 6 = 0.283 rad in steps of 0.1
        assert_eq!(check.path_length, 4);
    }

    #[test]
    fn test_end_points_are_normalized() {
        let mut space = space();
        let check = space.check_path_for_collision(&[2.0 * PI, 0.0, 0.0], &[0.0, 0.0, 0.0], CheckFlags::empty())
            .unwrap();
        assert!(check.is_valid());
        assert_eq!(check.path_length, 2);
    }

    #[test]
    fn test_path_with_wrong_joint_count() {
        let mut space = space();
        let result = space.check_path_for_collision(&[0.0, 0.0, 0.0], &[0.0, 0.0], CheckFlags::empty());
        assert!(matches!(result, Err(CollisionError::JointCountMismatch { expected: 3, found: 2 })));
    }

    #[test]
    fn test_path_clearance_is_minimum_over_waypoints() {
        let mut space = space();
        space.grid_mut().add_cube(&Point3::new(0.3, 0.3, 0.0), &Vector3::repeat(0.04));
        let start = [0.0, 0.0, 0.0];
        let end = [0.4, 0.0, 0.0];
        let check = space.is_state_to_state_valid(&start, &end, CheckFlags::empty()).unwrap();
        assert!(check.is_valid());
        assert_eq!(check.num_checks, check.path_length);

        let path = space.interpolate_path(&start, &end).unwrap();
        assert_eq!(path.len(), check.path_length);
        for waypoint in &path {
            let report = space.check_collision(waypoint, CheckFlags::empty()).unwrap();
            assert!(check.clearance <= report.clearance);
        }
    }
}
