#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use approx::assert_abs_diff_eq;
    use nalgebra::{Isometry3, Point3, Vector3};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::collisions::{CheckFlags, CollisionSpace, Validity};
    use crate::distance_field::GridCell;
    use crate::error::CollisionError;
    use crate::kinematic_traits::{FrameKey, Frames, RobotModel};
    use crate::kinematics_impl::ChainRobotModel;
    use crate::sphere_group::{Resolution, Sphere, SphereGroup};
    use crate::tests::test_utils::{sample_space, space_with_obstacle};

    const STRETCHED: [f64; 3] = [0.0, 0.0, 0.0];
    const RAISED: [f64; 3] = [FRAC_PI_2, 0.0, 0.0];
    /// Upper arm pointing at the torso.
    const LOWERED: [f64; 3] = [-FRAC_PI_2, 0.0, 0.0];

    #[test]
    fn test_free_configuration() {
        let mut space = space_with_obstacle();
        let report = space.check_collision(&RAISED, CheckFlags::empty()).unwrap();
        assert_eq!(report.validity, Validity::Valid);
        assert!(report.contacts.is_empty());
        assert!(report.clearance > 0.0);
    }

    #[test]
    fn test_obstacle_hit() {
        let mut space = space_with_obstacle();
        let report = space.check_collision(&STRETCHED, CheckFlags::empty()).unwrap();
        assert_eq!(report.validity, Validity::Collision);
        assert!(!report.is_valid());
        assert!(report.contacts.is_empty(), "contacts are only collected with COLLECT_ALL");
    }

    #[test]
    fn test_collect_all_reports_every_contact() {
        let mut space = space_with_obstacle();
        let fast = space.check_collision(&STRETCHED, CheckFlags::empty()).unwrap();
        let all = space.check_collision(&STRETCHED, CheckFlags::COLLECT_ALL | CheckFlags::VERBOSE).unwrap();
        assert_eq!(fast.validity, all.validity);
        assert!(!all.contacts.is_empty());
        assert!(all.contacts.iter().any(|c| c.name == "forearm_1"), "{:?}", all.contacts);

        let padding = space.padding();
        for contact in &all.contacts {
            let distance = space.grid().distance_from_point(&contact.center).unwrap();
            assert!(distance <= contact.radius + padding, "{} is not in contact", contact.name);
        }
    }

    #[test]
    fn test_self_collision_with_other_group() {
        let mut space = sample_space();
        let report = space.check_collision(&LOWERED, CheckFlags::COLLECT_ALL).unwrap();
        assert_eq!(report.validity, Validity::Collision);
        let names: Vec<&str> = report.contacts.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"upper_1"), "{:?}", names);
        assert!(names.contains(&"torso_0"), "{:?}", names);

        // Same pose, nothing else around: the arm alone is free
        let alone = space.check_sphere_group_against_world(&LOWERED, "arm", Resolution::Fine,
                                                          CheckFlags::empty()).unwrap();
        assert!(alone.is_valid());
    }

    #[test]
    fn test_voxel_groups_are_obstacles() {
        let mut space = sample_space();
        assert!(space.check_sphere_group_against_world(&LOWERED, "arm", Resolution::Fine,
                                                       CheckFlags::empty()).unwrap().is_valid());
        space.update_voxel_groups().unwrap();
        assert_eq!(space.grid().distance_from_point(&Point3::new(0.0, -0.36, 0.0)), Some(0.0));

        let report = space.check_sphere_group_against_world(&LOWERED, "arm", Resolution::Fine,
                                                            CheckFlags::COLLECT_ALL).unwrap();
        assert_eq!(report.validity, Validity::Collision);
        assert!(report.contacts.iter().any(|c| c.name == "forearm_0"), "{:?}", report.contacts);

        assert!(matches!(space.update_voxel_group("no_such_group"), Err(CollisionError::UnknownGroup(_))));
    }

    #[test]
    fn test_wrong_joint_count() {
        let mut space = sample_space();
        let result = space.check_collision(&[0.0, 0.0], CheckFlags::empty());
        assert!(matches!(result, Err(CollisionError::JointCountMismatch { expected: 3, found: 2 })));

        let result = space.check_collision_at_resolution(&[0.0; 4], Resolution::Coarse, CheckFlags::empty());
        assert!(matches!(result, Err(CollisionError::JointCountMismatch { expected: 3, found: 4 })));
    }

    #[test]
    fn test_out_of_bounds_is_an_error() {
        let mut space = sample_space();
        space.model_mut().set_model_to_world_transform(Isometry3::translation(5.0, 0.0, 0.0), "base_link");
        for multi_level in [true, false] {
            space.set_multi_level_collision_check(multi_level);
            let result = space.check_collision(&STRETCHED, CheckFlags::empty());
            assert!(matches!(result, Err(CollisionError::OutOfBounds { .. })), "{:?}", result);
        }
    }

    #[test]
    fn test_world_threshold_includes_padding() {
        let mut space = sample_space();
        space.grid_mut().add_points(&[Point3::new(0.2, 0.0, 0.0)]);

        let frames = Frames::from_chains(vec![vec![Isometry3::identity()]]);
        let spheres = [Sphere::new("probe", Vector3::zeros(), 0.1, FrameKey::new(0, 0), Resolution::Fine)];
        let distance = space.grid().distance_from_point(&Point3::origin()).unwrap();
        assert_abs_diff_eq!(distance, 0.2, epsilon = 1E-9);

        space.set_padding(distance - 0.1 + 1E-9);
        assert!(!space.check_spheres_against_world(&frames, &spheres, CheckFlags::empty()).unwrap().is_valid());

        space.set_padding(distance - 0.1 - 1E-6);
        let report = space.check_spheres_against_world(&frames, &spheres, CheckFlags::empty()).unwrap();
        assert!(report.is_valid());
        assert_abs_diff_eq!(report.clearance, distance, epsilon = 1E-12);
    }

    fn single_sphere_group(name: &str, radius: f64) -> SphereGroup {
        let sphere = Sphere::new(&format!("{}_0", name), Vector3::zeros(), radius, FrameKey::new(0, 0),
                                 Resolution::Fine);
        SphereGroup::new(name, vec![0], vec!["link".to_string()], vec![sphere])
    }

    #[test]
    fn test_group_pair_uses_larger_radius() {
        let mut space = sample_space();
        space.set_padding(0.0);
        let small = single_sphere_group("small", 0.3);
        let large = single_sphere_group("large", 0.5);
        let origin = [Point3::origin()];

        let check = |space: &CollisionSpace<'_, ChainRobotModel>, other: Point3<f64>| {
            let forward = space.check_sphere_group_against_sphere_group(
                &small, &large, &origin, &[other], Resolution::Fine, Resolution::Fine,
                CheckFlags::empty()).unwrap();
            let backward = space.check_sphere_group_against_sphere_group(
                &large, &small, &[other], &origin, Resolution::Fine, Resolution::Fine,
                CheckFlags::empty()).unwrap();
            assert_eq!(forward.validity, backward.validity);
            assert_eq!(forward.clearance, backward.clearance);
            forward.is_valid()
        };

        assert!(!check(&space, Point3::new(0.5, 0.0, 0.0)));
        assert!(check(&space, Point3::new(0.5 + 1E-9, 0.0, 0.0)));
        // Not the sum of the radii
        assert!(check(&space, Point3::new(0.0, 0.7, 0.0)));

        space.set_padding(0.1);
        assert!(!check(&space, Point3::new(0.55, 0.0, 0.0)));
        assert!(check(&space, Point3::new(0.0, 0.0, 0.65)));
    }

    #[test]
    fn test_group_pair_count_mismatch() {
        let space = sample_space();
        let small = single_sphere_group("small", 0.3);
        let large = single_sphere_group("large", 0.5);
        let result = space.check_sphere_group_against_sphere_group(
            &small, &large, &[Point3::origin()], &[], Resolution::Fine, Resolution::Fine,
            CheckFlags::empty());
        assert!(matches!(result, Err(CollisionError::SphereCountMismatch { declared2: 1, posed2: 0, .. })));
    }

    #[test]
    fn test_group_pair_symmetric_on_robot() {
        let space = sample_space();
        let arm = space.model().group("arm").unwrap();
        let torso = space.model().group("torso").unwrap();
        let arm_posed: Vec<Point3<f64>> = space
            .collision_spheres(&LOWERED, "arm", Resolution::Fine).unwrap()
            .iter().map(|s| s.center).collect();
        let torso_posed: Vec<Point3<f64>> = space
            .collision_spheres(&LOWERED, "torso", Resolution::Fine).unwrap()
            .iter().map(|s| s.center).collect();

        let forward = space.check_sphere_group_against_sphere_group(
            arm, torso, &arm_posed, &torso_posed, Resolution::Fine, Resolution::Fine,
            CheckFlags::COLLECT_ALL).unwrap();
        let backward = space.check_sphere_group_against_sphere_group(
            torso, arm, &torso_posed, &arm_posed, Resolution::Fine, Resolution::Fine,
            CheckFlags::COLLECT_ALL).unwrap();
        assert_eq!(forward.validity, Validity::Collision);
        assert_eq!(forward.validity, backward.validity);
        assert_eq!(forward.contacts.len(), backward.contacts.len());
        assert_abs_diff_eq!(forward.clearance, backward.clearance, epsilon = 1E-12);
    }

    #[test]
    fn test_padding_is_monotonic() {
        let mut space = space_with_obstacle();
        space.set_multi_level_collision_check(false);
        let mut rng = StdRng::seed_from_u64(7);
        let limits = space.limits().clone();

        let mut collisions = 0;
        for _ in 0..200 {
            let angles = limits.random_angles(&mut rng);
            space.set_padding(0.0);
            let tight = space.check_collision(&angles, CheckFlags::empty()).unwrap();
            space.set_padding(0.05);
            let padded = space.check_collision(&angles, CheckFlags::empty()).unwrap();
            if !tight.is_valid() {
                collisions += 1;
                assert!(!padded.is_valid(), "padding made {:?} valid", angles);
            }
        }
        assert!(collisions > 0, "no configuration hit anything");
    }

    #[test]
    fn test_free_coarse_spheres_mean_free_fine_spheres() {
        let space = space_with_obstacle();
        let mut coarse_hits = 0;
        for i in 0..=16 {
            for j in 0..=16 {
                let angles = [-2.4 + 0.3 * i as f64, -2.4 + 0.3 * j as f64, 0.0];
                let coarse = space.check_sphere_group_against_world(&angles, "arm", Resolution::Coarse,
                                                                    CheckFlags::empty()).unwrap();
                let fine = space.check_sphere_group_against_world(&angles, "arm", Resolution::Fine,
                                                                  CheckFlags::empty()).unwrap();
                if coarse.is_valid() {
                    assert!(fine.is_valid(), "coarse spheres free but fine in collision at {:?}", angles);
                } else {
                    coarse_hits += 1;
                }
            }
        }
        assert!(coarse_hits > 0);
    }

    #[test]
    fn test_multi_level_agrees_with_fine_check() {
        let mut space = space_with_obstacle();
        let mut rng = StdRng::seed_from_u64(11);
        let limits = space.limits().clone();
        for _ in 0..100 {
            let angles = limits.random_angles(&mut rng);
            space.set_multi_level_collision_check(true);
            let two_level = space.check_collision(&angles, CheckFlags::empty()).unwrap();
            let fine = space.check_collision_at_resolution(&angles, Resolution::Fine, CheckFlags::empty()).unwrap();
            // A collision reported by the two level check is always confirmed by the fine spheres
            if !two_level.is_valid() {
                assert!(!fine.is_valid(), "{:?}", angles);
            }
        }
    }

    #[test]
    fn test_clearance() {
        let space = space_with_obstacle();
        let angles = [0.5, -0.4, 0.0];
        let expected: Vec<f64> = space
            .collision_spheres(&angles, "arm", Resolution::Fine).unwrap()
            .iter()
            .map(|s| space.grid().distance_from_point(&s.center).unwrap() - s.radius)
            .collect();
        assert_eq!(expected.len(), 5);
        let min = expected.iter().cloned().fold(f64::INFINITY, f64::min);

        let (average, minimum) = space.clearance(&angles, 2).unwrap();
        assert_abs_diff_eq!(average, (expected[0] + expected[1]) / 2.0, epsilon = 1E-12);
        assert_abs_diff_eq!(minimum, min, epsilon = 1E-12);

        // More spheres requested than the group has
        let (average, _) = space.clearance(&angles, 100).unwrap();
        assert_abs_diff_eq!(average, expected.iter().sum::<f64>() / 5.0, epsilon = 1E-12);

        let (average, minimum) = space.clearance(&angles, 0).unwrap();
        assert_eq!(average, minimum);
    }

    #[test]
    fn test_line_segment_through_obstacle() {
        let space = space_with_obstacle();
        let grid = space.grid();
        let a = grid.world_to_grid(&Point3::new(-0.5, 0.0, 0.0));
        let b = grid.world_to_grid(&Point3::new(0.7, 0.0, 0.0));
        assert_eq!(space.is_valid_line_segment(a, b, 0.0).unwrap(), 0.0);

        let (distance, cells) = space.trace_line_segment(a, b, 0.0).unwrap();
        assert_eq!(distance, 0.0);
        assert_eq!(cells.first().unwrap().cell, a);
        assert_eq!(cells.last().unwrap().cell, b);
        let first_blocked = cells.iter().find(|c| c.obstacle).unwrap();
        assert_eq!(first_blocked.cell, grid.world_to_grid(&Point3::new(0.42, 0.0, 0.0)));
    }

    #[test]
    fn test_line_segment_in_free_space() {
        let space = space_with_obstacle();
        let grid = space.grid();
        let a = grid.world_to_grid(&Point3::new(-0.5, 0.3, 0.0));
        let b = grid.world_to_grid(&Point3::new(0.7, 0.3, 0.0));
        let distance = space.is_valid_line_segment(a, b, 0.1).unwrap();
        assert!(distance > 0.2 && distance < 0.3, "{}", distance);

        let (traced, cells) = space.trace_line_segment(a, b, 0.1).unwrap();
        assert_eq!(traced, distance);
        assert!(cells.iter().all(|c| !c.obstacle));
    }

    #[test]
    fn test_line_segment_leaving_grid() {
        let space = sample_space();
        let a = GridCell::new(70, 40, 20);
        let b = GridCell::new(90, 40, 20);
        let result = space.is_valid_line_segment(a, b, 0.0);
        assert!(matches!(result, Err(CollisionError::CellOutOfBounds(cell)) if cell.x == 80), "{:?}", result);
        assert!(space.trace_line_segment(a, b, 0.0).is_err());
    }

    #[test]
    fn test_unknown_group() {
        let space = sample_space();
        let result = space.collision_spheres(&STRETCHED, "legs", Resolution::Fine);
        assert!(matches!(result, Err(CollisionError::UnknownGroup(name)) if name == "legs"));
    }

    #[test]
    fn test_collision_spheres_follow_the_arm() {
        let space = sample_space();
        let spheres = space.collision_spheres(&RAISED, "arm", Resolution::Fine).unwrap();
        let hand = spheres.iter().find(|s| s.name == "hand_0").unwrap();
        assert_abs_diff_eq!(hand.center, Point3::new(0.0, 0.6, 0.0), epsilon = 1E-12);
        assert_eq!(hand.radius, 0.04);

        let coarse = space.collision_spheres(&RAISED, "arm", Resolution::Coarse).unwrap();
        assert_eq!(coarse.len(), 3);
    }
}
