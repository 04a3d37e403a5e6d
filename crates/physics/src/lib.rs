#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! # Dodo Physics Layer
//!
//! The simulation side of the dodo locomotion stack.
//!
//! The environment crate treats physics as a black box. This crate defines
//! that box and ships one implementation of it.
//!
//! ## Key Components
//!
//! -   **Backend contract:** [`SimBackend`] in the [`backend`] module lists
//!     everything an environment may ask of a simulator: scene setup, PD
//!     gains, position targets, one-tick stepping, batched state read-back and
//!     per-row writes for resets.
//! -   **Reference backend:** [`KinematicSim`] in the [`simulation`] module is
//!     a batched CPU backend with PD joints and a kinematic base. It is meant
//!     for tests, benchmarks and headless smoke runs, not for training.
//! -   **Robot descriptions:** [`RobotDescription`] in the [`robot`] module
//!     parses the JSON format used to declare joints and links.
//! -   **Frames:** the [`transform`] module converts between the `[w, x, y, z]`
//!     quaternions used in configuration files and `glam` types, and extracts
//!     roll/pitch/yaw.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use physics::{KinematicSim, SimBackend, SimOptions};
//!
//! let mut sim = KinematicSim::new(SimOptions::default());
//! sim.add_ground_plane()?;
//! sim.load_robot(Path::new("assets/dodo.json"), Vec3::new(0.0, 0.0, 0.48), Quat::IDENTITY)?;
//! sim.build(4096)?;
//! sim.step()?;
//! ```

pub mod backend;
pub mod error;
pub mod integrator;
pub mod robot;
pub mod simulation;
pub mod transform;
pub mod types;

pub use backend::SimBackend;
pub use error::PhysicsError;
pub use robot::{JointDef, LinkDef, RobotDescription};
pub use simulation::KinematicSim;
pub use types::{BaseBody, DofParams, SimOptions};

pub use glam::{Quat, Vec3};
