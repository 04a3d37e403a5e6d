use thiserror::Error;

/// Errors reported by a simulation backend.
#[derive(Error, Debug)]
pub enum PhysicsError {
    #[error("scene has not been built yet")]
    NotBuilt,
    #[error("scene is already built; entities can no longer be added")]
    AlreadyBuilt,
    #[error("no robot has been loaded")]
    NoRobot,
    #[error("unknown joint `{0}`")]
    UnknownJoint(String),
    #[error("unknown link `{0}`")]
    UnknownLink(String),
    #[error("dof index {index} out of range ({num_dofs} dofs)")]
    DofOutOfRange { index: usize, num_dofs: usize },
    #[error("environment index {index} out of range ({num_envs} environments)")]
    EnvOutOfRange { index: usize, num_envs: usize },
    #[error("buffer shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("invalid robot description: {0}")]
    InvalidRobot(String),
    #[error("failed to read robot description: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse robot description: {0}")]
    Parse(#[from] serde_json::Error),
}
