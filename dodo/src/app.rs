//! # Rollout Loop
//!
//! [`run`] drives a [`BipedEnv`] on the kinematic backend with a fixed
//! policy. It does not learn anything: it exists to exercise the
//! environment end to end and to report how rewards and resets behave for a
//! given configuration.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rl::{BipedEnv, EpisodeLog, TrainConfig, VecEnv};
use std::path::PathBuf;

/// Command-line arguments of the `dodo` binary.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dodo",
    about = "Roll out a fixed policy in the dodo locomotion environment"
)]
pub struct Args {
    /// Environment configuration (JSON).
    #[arg(long)]
    pub config: PathBuf,

    /// Override the number of parallel environments.
    #[arg(long)]
    pub num_envs: Option<usize>,

    /// Number of environment steps to run.
    #[arg(long, default_value_t = 1000)]
    pub steps: u64,

    /// Override the command sampling seed. The random policy derives its own
    /// seed from it.
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = Policy::Zero)]
    pub policy: Policy,

    /// Log progress every N steps.
    #[arg(long, default_value_t = 100)]
    pub log_every: u64,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// All-zero actions: hold the default pose.
    Zero,
    /// Independent uniform actions in `[-1, 1]`.
    Random,
}

/// What a rollout did.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub steps: u64,
    /// Total number of row resets triggered by termination.
    pub resets: usize,
    /// Reward per environment per step, averaged over the whole rollout.
    pub mean_reward: f32,
    /// Episode averages reported by the most recent reset.
    pub last_episode: Option<EpisodeLog>,
}

/// Load the configuration named by `args` and roll out the chosen policy.
///
/// # Errors
/// Fails when the configuration cannot be loaded or is invalid, or when the
/// environment reports an error during a step.
pub fn run(args: &Args) -> Result<RunSummary> {
    let mut cfg = TrainConfig::from_path(&args.config)
        .with_context(|| format!("loading configuration {}", args.config.display()))?;
    if let Some(num_envs) = args.num_envs {
        cfg.num_envs = num_envs;
    }
    if let Some(seed) = args.seed {
        cfg.seed = seed;
    }

    let mut env = BipedEnv::kinematic(&cfg).context("building environment")?;
    env.reset().context("initial reset")?;

    let num_envs = env.num_envs();
    let mut actions = vec![0.0_f32; num_envs * env.num_actions()];
    let mut rng = fastrand::Rng::with_seed(cfg.seed.wrapping_add(1));
    let log_every = args.log_every.max(1);

    tracing::info!(
        config = %args.config.display(),
        num_envs,
        steps = args.steps,
        policy = ?args.policy,
        "starting rollout"
    );

    let mut summary = RunSummary::default();
    let mut reward_total = 0.0_f64;
    let mut window_reward = 0.0_f64;
    let mut window_resets = 0;
    for step in 1..=args.steps {
        if args.policy == Policy::Random {
            for a in &mut actions {
                *a = rng.f32() * 2.0 - 1.0;
            }
        }
        let out = env
            .step(&actions)
            .with_context(|| format!("environment step {step}"))?;

        let resets = out.done.iter().filter(|&&d| d).count();
        let step_reward: f64 = out.rew.iter().map(|&r| f64::from(r)).sum();
        reward_total += step_reward;
        window_reward += step_reward;
        window_resets += resets;
        summary.resets += resets;
        summary.steps = step;
        if let Some(log) = &out.extras.episode {
            tracing::debug!(step, resets, episode = %format_log(log), "episodes finished");
            summary.last_episode = Some(log.clone());
        }

        if step % log_every == 0 {
            #[allow(clippy::cast_precision_loss)]
            let mean = window_reward / (log_every as f64 * num_envs.max(1) as f64);
            tracing::info!(step, mean_reward = mean, resets = window_resets, "progress");
            if let Some(log) = &summary.last_episode {
                tracing::info!(episode = %format_log(log), "last episode averages");
            }
            window_reward = 0.0;
            window_resets = 0;
        }
    }

    if summary.steps > 0 {
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let mean = (reward_total / (summary.steps as f64 * num_envs.max(1) as f64)) as f32;
        summary.mean_reward = mean;
    }
    Ok(summary)
}

/// `rew_a=0.0123 rew_b=-0.4000 ...`
fn format_log(log: &EpisodeLog) -> String {
    log.iter()
        .map(|(name, value)| format!("{name}={value:.4}"))
        .collect::<Vec<_>>()
        .join(" ")
}
