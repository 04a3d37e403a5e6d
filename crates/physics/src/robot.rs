//! # Robot Descriptions
//!
//! A small JSON format for articulated robots: a list of actuated joints with
//! position limits, and a list of named links rigidly attached to the base.
//!
//! ```json
//! {
//!   "name": "dodo",
//!   "joints": [ { "name": "Left_HIP_AA", "lower": -0.5, "upper": 0.5 } ],
//!   "links":  [ { "name": "Left_FOOT_FE", "offset": [0.0, 0.09, -0.45] } ]
//! }
//! ```

use crate::error::PhysicsError;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct RobotDescription {
    #[serde(default)]
    pub name: String,
    pub joints: Vec<JointDef>,
    #[serde(default)]
    pub links: Vec<LinkDef>,
}

/// One actuated degree of freedom.
#[derive(Debug, Clone, Deserialize)]
pub struct JointDef {
    pub name: String,
    #[serde(default = "neg_inf")]
    pub lower: f32,
    #[serde(default = "pos_inf")]
    pub upper: f32,
}

/// A link whose pose is reported relative to the world frame.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkDef {
    pub name: String,
    /// Position of the link origin in the base frame.
    pub offset: [f32; 3],
    /// Orientation of the link relative to the base, `[w, x, y, z]`.
    #[serde(default = "identity_wxyz")]
    pub quat: [f32; 4],
}

fn neg_inf() -> f32 {
    f32::NEG_INFINITY
}

fn pos_inf() -> f32 {
    f32::INFINITY
}

fn identity_wxyz() -> [f32; 4] {
    [1.0, 0.0, 0.0, 0.0]
}

impl RobotDescription {
    /// Parse and validate a description from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::Parse`] for malformed JSON and
    /// [`PhysicsError::InvalidRobot`] for duplicate names or inverted limits.
    pub fn from_json(json: &str) -> Result<Self, PhysicsError> {
        let desc: Self = serde_json::from_str(json)?;
        desc.validate()?;
        Ok(desc)
    }

    /// Read a description from disk.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures as well as everything [`Self::from_json`] rejects.
    pub fn from_path(path: &Path) -> Result<Self, PhysicsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), PhysicsError> {
        let mut seen = HashSet::new();
        for joint in &self.joints {
            if !seen.insert(joint.name.as_str()) {
                return Err(PhysicsError::InvalidRobot(format!(
                    "duplicate joint `{}`",
                    joint.name
                )));
            }
            if joint.lower > joint.upper {
                return Err(PhysicsError::InvalidRobot(format!(
                    "joint `{}` has lower limit above upper limit",
                    joint.name
                )));
            }
        }
        seen.clear();
        for link in &self.links {
            if !seen.insert(link.name.as_str()) {
                return Err(PhysicsError::InvalidRobot(format!(
                    "duplicate link `{}`",
                    link.name
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    #[must_use]
    pub fn link_index(&self, name: &str) -> Option<usize> {
        self.links.iter().position(|l| l.name == name)
    }
}
