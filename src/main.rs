use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use nalgebra::{Point3, Vector3};
use rand::SeedableRng;
use rand::rngs::StdRng;

use arm_collision_space::collisions::{CheckFlags, CollisionSpace};
use arm_collision_space::kinematics_impl::ChainRobotModel;
use arm_collision_space::occupancy_grid::OccupancyGrid;
use arm_collision_space::parameters::{CollisionSpaceConfig, OccupancyGridConfig};
use arm_collision_space::utils::format_joints;

/// Checks robot configurations and motions for collisions
#[derive(Parser)]
#[command(name = "arm-collision-space")]
#[command(about = "Sphere based collision checking for robot arms", long_about = None)]
#[command(version)]
struct Cli {
    /// Robot description (joints, chains, sphere and voxel groups)
    #[arg(long)]
    robot: PathBuf,

    /// Collision space configuration, may include an `occupancy_grid` section
    #[arg(long)]
    config: PathBuf,

    /// Box obstacle as x,y,z,dx,dy,dz (meters), may be repeated
    #[arg(long, allow_negative_numbers = true)]
    cube: Vec<String>,

    /// Joint values are given in degrees rather than radians
    #[arg(long)]
    degrees: bool,

    /// Log every violation
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check one configuration
    Check {
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        joints: Vec<f64>,
    },

    /// Check the motion between two configurations
    Path {
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        start: Vec<f64>,

        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        end: Vec<f64>,
    },

    /// Check random configurations within joint limits and report timing
    Bench {
        #[arg(long, default_value_t = 10000)]
        count: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn parse_cube(text: &str) -> Result<(Point3<f64>, Vector3<f64>)> {
    let values = text
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("cannot parse cube '{}'", text))?;
    if values.len() != 6 {
        bail!("cube needs 6 values x,y,z,dx,dy,dz, got {}", values.len());
    }
    Ok((
        Point3::new(values[0], values[1], values[2]),
        Vector3::new(values[3], values[4], values[5]),
    ))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let robot = ChainRobotModel::from_yaml_file(&cli.robot)
        .with_context(|| format!("reading robot from {}", cli.robot.display()))?;
    let config = CollisionSpaceConfig::from_yaml_file(&cli.config)
        .with_context(|| format!("reading configuration from {}", cli.config.display()))?;
    let grid_config = OccupancyGridConfig::from_yaml_file(&cli.config)?;

    let mut grid = OccupancyGrid::new(&grid_config);
    for cube in &cli.cube {
        let (center, size) = parse_cube(cube)?;
        grid.add_cube(&center, &size);
    }

    let mut space = CollisionSpace::new(robot, grid, &config)?;
    space.update_voxel_groups()?;

    let flags = if cli.verbose { CheckFlags::VERBOSE | CheckFlags::COLLECT_ALL } else { CheckFlags::empty() };
    let to_radians = |values: &[f64]| -> Vec<f64> {
        if cli.degrees { values.iter().map(|v| v.to_radians()).collect() } else { values.to_vec() }
    };

    match &cli.command {
        Commands::Check { joints } => {
            let joints = to_radians(joints);
            let report = space.check_collision(&joints, flags)?;
            println!("{}: {:?}, clearance {:.3} m", format_joints(&joints), report.validity, report.clearance);
            for contact in &report.contacts {
                println!("  {} at [{:.3} {:.3} {:.3}] radius {:.3}", contact.name,
                         contact.center.x, contact.center.y, contact.center.z, contact.radius);
            }
        }
        Commands::Path { start, end } => {
            let check = space.check_path_for_collision(&to_radians(start), &to_radians(end), flags)?;
            println!("{:?}: {} waypoints, {} checked, clearance {:.3} m",
                     check.validity, check.path_length, check.num_checks, check.clearance);
        }
        Commands::Bench { count, seed } => {
            let mut rng = StdRng::seed_from_u64(*seed);
            let limits = space.limits().clone();
            let configurations: Vec<Vec<f64>> = (0..*count).map(|_| limits.random_angles(&mut rng)).collect();

            let (mut valid, mut colliding, mut failed) = (0, 0, 0);
            let started = Instant::now();
            for joints in &configurations {
                match space.check_collision(joints, CheckFlags::empty()) {
                    Ok(report) if report.is_valid() => valid += 1,
                    Ok(_) => colliding += 1,
                    Err(_) => failed += 1,
                }
            }
            let elapsed = started.elapsed();
            println!("{} checks in {:?} ({:.2} us per check)", count, elapsed,
                     elapsed.as_secs_f64() * 1E6 / (*count).max(1) as f64);
            println!("valid: {}, in collision: {}, failed: {}", valid, colliding, failed);
        }
    }
    Ok(())
}
