//! # Batch Runner
//!
//! Repeats the crossing trial many times, one output file per trial
//! (`<output_dir>/<index>.txt`).
//!
//! ## Randomness coupling
//!
//! With [`RandomnessMode::Shared`] one generator is seeded once for the whole
//! batch and never reseeded. Trials then depend on each other: the draws
//! consumed by earlier trials (two per rejected scenario attempt, two per agent
//! per step) shift the sequence later trials see, so trial N's trajectory is a
//! function of everything that ran before it. This is the behavior of the
//! reference experiment.
//!
//! [`RandomnessMode::ReseedPerTrial`] derives a fresh generator for every trial
//! from the batch seed and the trial index, which makes each trial reproducible
//! on its own regardless of which trials ran before.

use crate::config::HarnessConfig;
use crate::driver::{SimulationDriver, TrialSummary};
use crate::engine::OrcaSimulator;
use crate::error::{HarnessError, HarnessResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomnessMode {
    /// One generator for the whole batch
    #[default]
    Shared,
    /// A generator per trial, seeded from the batch seed and the trial index
    ReseedPerTrial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub trial_count: usize,
    pub output_dir: PathBuf,
    /// Fixed seed; `None` draws one from OS entropy
    pub seed: Option<u64>,
    pub randomness: RandomnessMode,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            trial_count: 1500,
            output_dir: PathBuf::from("multi_sim"),
            seed: None,
            randomness: RandomnessMode::Shared,
        }
    }
}

#[derive(Debug)]
pub struct TrialFailure {
    pub index: usize,
    pub path: PathBuf,
    pub error: HarnessError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    /// Seed the batch ran with
    pub seed: u64,
    pub completed: usize,
    pub failures: Vec<TrialFailure>,
}

pub fn trial_path(output_dir: &Path, index: usize) -> PathBuf {
    output_dir.join(format!("{}.txt", index))
}

/// Per-trial seed for [`RandomnessMode::ReseedPerTrial`].
fn trial_seed(batch_seed: u64, index: usize) -> u64 {
    batch_seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

pub struct BatchRunner {
    config: HarnessConfig,
}

impl BatchRunner {
    pub fn new(config: HarnessConfig) -> HarnessResult<Self> {
        config.validate()?;
        Ok(BatchRunner { config })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Runs trials `0..trial_count`.
    pub fn run(&self) -> HarnessResult<BatchReport> {
        self.run_trials(0..self.config.batch.trial_count)
    }

    /// Runs the given trial indices in order, all from one freshly seeded
    /// generator. Index only names the file (and, when reseeding per trial,
    /// picks the trial's seed).
    ///
    /// Failures of a single trial are logged and collected in the report;
    /// only errors that would repeat for every trial abort the batch.
    pub fn run_trials(&self, trials: Range<usize>) -> HarnessResult<BatchReport> {
        let batch = &self.config.batch;
        let seed = batch.seed.unwrap_or_else(rand::random);
        info!(seed, mode = ?batch.randomness, trials = trials.len(), "starting batch");

        fs::create_dir_all(&batch.output_dir)
            .map_err(|e| HarnessError::io(&batch.output_dir, e))?;

        let driver = SimulationDriver::new(&self.config.scenario, &self.config.simulation);
        let mut shared = StdRng::seed_from_u64(seed);
        let mut report = BatchReport {
            seed,
            ..BatchReport::default()
        };

        for index in trials {
            let path = trial_path(&batch.output_dir, index);
            info!("Writing to {}", path.display());

            let outcome = match batch.randomness {
                RandomnessMode::Shared => run_trial(&driver, &path, &mut shared),
                RandomnessMode::ReseedPerTrial => {
                    let mut rng = StdRng::seed_from_u64(trial_seed(seed, index));
                    run_trial(&driver, &path, &mut rng)
                }
            };

            match outcome {
                Ok(summary) => {
                    debug!(trial = index, steps = summary.steps, global_time = summary.global_time, "trial converged");
                    report.completed += 1;
                }
                Err(err @ HarnessError::Config(_)) => return Err(err),
                Err(err) => {
                    error!(trial = index, error = %err, "trial failed");
                    report.failures.push(TrialFailure {
                        index,
                        path,
                        error: err,
                    });
                }
            }
        }

        Ok(report)
    }
}

fn run_trial<R: Rng + ?Sized>(
    driver: &SimulationDriver<'_>,
    path: &Path,
    rng: &mut R,
) -> HarnessResult<TrialSummary> {
    let file = File::create(path).map_err(|e| HarnessError::io(path, e))?;
    driver.run(OrcaSimulator::new(), BufWriter::new(file), rng)
}
