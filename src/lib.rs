//! # Multi Sim
//!
//! A batch experiment harness for two-agent reciprocal crossings under local
//! collision avoidance.
//!
//! ## Experiment
//!
//! Each trial places two agents on a circle of radius 2 around the origin and
//! sends each one to the antipodal point, so their paths cross near the center.
//! Every step the harness steers both agents at their goals (plus a tiny random
//! nudge that breaks head-on symmetry), lets the engine resolve one
//! collision-free move, and records time and positions. A trial ends once both
//! agents are within their radius of their goals.
//!
//! ## Components
//!
//! - **scenario**: randomized, non-degenerate start/goal layouts
//! - **policy**: per-step preferred velocities
//! - **convergence**: the all-agents-at-goal test
//! - **driver**: one trial, from fresh engine to final snapshot
//! - **batch**: many trials, one file each, shared or per-trial randomness
//! - **engine** / **orca**: the stepping interface and its ORCA implementation
//!
//! ## Usage
//!
//! The `multi_sim` binary runs the reference batch of 1500 trials into
//! `multi_sim/`. With the `python` feature the crate also builds as a Python
//! extension exposing `run_batch_py` and `run_trial_py`.

pub mod batch;
pub mod config;
pub mod convergence;
pub mod driver;
pub mod engine;
pub mod error;
mod orca;
pub mod policy;
pub mod scenario;
pub mod structs;
pub mod telemetry;

#[cfg(feature = "python")]
mod python;

pub use batch::{BatchConfig, BatchReport, BatchRunner, RandomnessMode};
pub use config::HarnessConfig;
pub use driver::{SimulationConfig, SimulationDriver, TrialState, TrialSummary};
pub use engine::{NavigationEngine, OrcaSimulator};
pub use error::{HarnessError, HarnessResult};
pub use scenario::{Agent, CrossingLayout, ScenarioConfig, ScenarioGenerator};
pub use structs::{AgentParams, Vector2D};
