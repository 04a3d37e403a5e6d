#![deny(clippy::all, clippy::pedantic)]
//! # Dodo: Biped Locomotion Environment
//!
//! A batched reinforcement learning environment for a small bipedal robot,
//! written in Rust.
//!
//! ## Overview
//!
//! The environment advances simulated physics, samples velocity commands,
//! detects falls and timeouts, and scores each tick with a weighted sum of
//! locomotion reward terms (velocity tracking, gait phase, contact
//! alternation, foot orientation, joint-limit penalties). Training code sees
//! a vectorized `reset`/`step` interface over thousands of robots at once.
//!
//! ### The Crates
//!
//! -   **`dodo`:** The crate you are currently viewing. It ships the `dodo`
//!     binary, a headless rollout runner used for smoke tests and profiling.
//! -   **[`physics`]:** The simulation-backend contract and a kinematic CPU
//!     reference backend.
//! -   **[`rl`]:** The environment itself: configuration, reward registry,
//!     contact/gait estimation, observation assembly and the episode state
//!     machine.
//!
//! ## Getting Started
//!
//! ```text
//! cargo run -p dodo -- --config assets/dodo_config.json --steps 2000 --policy random
//! ```

pub use physics;
pub use rl;

pub mod app;
