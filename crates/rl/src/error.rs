use physics::PhysicsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("no default angle configured for joint `{0}`")]
    MissingDefaultAngle(String),
    #[error("no reward function registered under `{0}`")]
    UnknownReward(String),
    #[error("joint `{0}` is not part of the actuated joint list")]
    UnknownJoint(String),
    #[error("observation width mismatch: configured {expected}, assembled {actual}")]
    ObservationWidth { expected: usize, actual: usize },
    #[error("environment index {index} out of range ({num_envs} environments)")]
    EnvOutOfRange { index: usize, num_envs: usize },
    #[error("action batch has {actual} values, expected {expected}")]
    ActionShape { expected: usize, actual: usize },
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Physics(#[from] PhysicsError),
}
