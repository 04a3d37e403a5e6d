use physics::transform::quat_to_rpy_degrees;
use physics::{KinematicSim, PhysicsError, Quat, SimBackend, SimOptions, Vec3};
use std::path::PathBuf;

fn robot_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets/dodo.json")
}

fn built_sim(num_envs: usize) -> anyhow::Result<KinematicSim> {
    let mut sim = KinematicSim::new(SimOptions { dt: 0.01, substeps: 2 });
    sim.add_ground_plane()?;
    sim.load_robot(&robot_path(), Vec3::new(0.0, 0.0, 0.48), Quat::IDENTITY)?;
    sim.build(num_envs)?;
    Ok(sim)
}

#[test]
fn joints_track_position_targets() -> anyhow::Result<()> {
    let mut sim = built_sim(2)?;
    let dofs: Vec<usize> = (0..sim.num_dofs()).collect();
    sim.set_dofs_kp(&vec![40.0; dofs.len()], &dofs)?;
    sim.set_dofs_kv(&vec![4.0; dofs.len()], &dofs)?;

    let mut targets = vec![0.0; 2 * dofs.len()];
    targets[1] = 0.5; // env 0, Left_THIGH_FE
    sim.control_dofs_position(&targets, &dofs)?;
    for _ in 0..1000 {
        sim.step()?;
    }

    let pos = sim.dofs_position(&[1]);
    assert!((pos[0] - 0.5).abs() < 1e-2, "env0 thigh={}", pos[0]);
    assert!(pos[1].abs() < 1e-6, "env1 thigh={}", pos[1]);
    Ok(())
}

#[test]
fn feet_ride_on_the_base() -> anyhow::Result<()> {
    let sim = built_sim(3)?;
    let left = sim.link_index("Left_FOOT_FE")?;
    let heights: Vec<f32> = sim.link_pos(left).iter().map(|p| p.z).collect();
    for h in heights {
        assert!((h - 0.03).abs() < 1e-5, "h={h}");
    }
    Ok(())
}

#[test]
fn base_rotates_with_angular_velocity() -> anyhow::Result<()> {
    let mut sim = built_sim(1)?;
    sim.set_base_velocity(0, Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0))?;
    for _ in 0..50 {
        sim.step()?;
    }
    let rpy = quat_to_rpy_degrees(sim.base_quat()[0]);
    assert!((rpy.y - 0.5_f32.to_degrees()).abs() < 0.1, "pitch={}", rpy.y);
    Ok(())
}

#[test]
fn row_writes_leave_other_rows_alone() -> anyhow::Result<()> {
    let mut sim = built_sim(3)?;
    sim.set_base_pos(&[Vec3::new(1.0, 2.0, 3.0)], &[1], true)?;
    let pos = sim.base_pos();
    assert_eq!(pos[1], Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(pos[0], Vec3::new(0.0, 0.0, 0.48));
    assert_eq!(pos[2], Vec3::new(0.0, 0.0, 0.48));

    // empty row set is a no-op
    sim.set_dofs_position(&[], &[0, 1], &[], true)?;
    sim.zero_all_dofs_velocity(&[])?;
    Ok(())
}

#[test]
fn unknown_names_and_bad_rows_are_errors() -> anyhow::Result<()> {
    let mut sim = built_sim(2)?;
    assert!(matches!(sim.dof_index("Tail"), Err(PhysicsError::UnknownJoint(_))));
    assert!(matches!(sim.link_index("Head"), Err(PhysicsError::UnknownLink(_))));
    assert!(matches!(
        sim.set_base_pos(&[Vec3::ZERO], &[5], false),
        Err(PhysicsError::EnvOutOfRange { index: 5, num_envs: 2 })
    ));
    assert!(matches!(
        sim.control_dofs_position(&[0.0; 3], &[0]),
        Err(PhysicsError::ShapeMismatch { expected: 2, actual: 3 })
    ));
    Ok(())
}

#[test]
fn stepping_before_build_fails() {
    let mut sim = KinematicSim::default();
    assert!(matches!(sim.step(), Err(PhysicsError::NotBuilt)));
    assert!(matches!(sim.build(4), Err(PhysicsError::NoRobot)));
}
