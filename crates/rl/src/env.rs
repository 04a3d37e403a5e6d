use crate::error::EnvError;
use crate::reward::EpisodeLog;

/// Batched reinforcement learning environment.
///
/// Like the classic Gym interface, but every call advances all `num_envs`
/// environments together and returns flat, row-major buffers: observations
/// are `num_envs * num_obs` values, actions `num_envs * num_actions`.
/// Finished environments are reset inside [`step`], so the caller never
/// resets rows by hand.
///
/// [`step`]: VecEnv::step
pub trait VecEnv {
    /// Reset every environment and return `(obs, privileged_obs)`.
    ///
    /// # Errors
    /// Backend failures while writing the reset state.
    fn reset(&mut self) -> Result<(&[f32], Option<&[f32]>), EnvError>;

    /// Apply one batch of actions and advance one physics tick.
    ///
    /// # Errors
    /// [`EnvError::ActionShape`] for a wrongly sized batch, and backend
    /// failures, which are not retried.
    fn step(&mut self, actions: &[f32]) -> Result<Step<'_>, EnvError>;

    /// Current observations and extras without advancing.
    fn get_observations(&self) -> (&[f32], &Extras);

    /// There is no privileged channel; kept for runner compatibility.
    fn get_privileged_observations(&self) -> Option<&[f32]> {
        None
    }

    fn num_envs(&self) -> usize;
    fn num_obs(&self) -> usize;
    fn num_actions(&self) -> usize;
}

/// Buffers returned by [`VecEnv::step`], borrowed from the environment.
#[derive(Debug, Clone, Copy)]
pub struct Step<'a> {
    pub obs: &'a [f32],
    pub rew: &'a [f32],
    pub done: &'a [bool],
    pub extras: &'a Extras,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observations {
    /// Critic view; identical to the policy observation.
    pub critic: Vec<f32>,
}

/// Side-channel outputs of a step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extras {
    pub observations: Observations,
    /// Per-term episode averages, present only on ticks where at least one
    /// row was reset.
    pub episode: Option<EpisodeLog>,
}
