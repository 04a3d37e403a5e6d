#![allow(dead_code)]

use physics::KinematicSim;
use rl::{BipedEnv, TrainConfig};
use std::path::PathBuf;

pub fn config_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets/dodo_config.json")
}

/// The shipped sample configuration, resized to `num_envs`.
pub fn config(num_envs: usize) -> TrainConfig {
    let mut cfg = TrainConfig::from_path(&config_path()).expect("sample config loads");
    cfg.num_envs = num_envs;
    cfg
}

pub fn env(cfg: &TrainConfig) -> BipedEnv<KinematicSim> {
    BipedEnv::kinematic(cfg).expect("environment builds")
}

pub fn zeros(env: &BipedEnv<KinematicSim>) -> Vec<f32> {
    use rl::VecEnv;
    vec![0.0; env.num_envs() * env.num_actions()]
}
