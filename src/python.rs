//! Python bindings, enabled with the `python` feature.

use crate::batch::{BatchRunner, RandomnessMode};
use crate::config::HarnessConfig;
use crate::driver::SimulationDriver;
use crate::engine::OrcaSimulator;
use pyo3::exceptions::PyRuntimeError;
use pyo3::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

fn to_py_err(err: crate::error::HarnessError) -> PyErr {
    PyRuntimeError::new_err(err.to_string())
}

/// Runs a batch and returns `(completed, failed)` trial counts.
#[pyfunction]
#[pyo3(signature = (output_dir, trial_count, seed=None, reseed_per_trial=false))]
fn run_batch_py(
    output_dir: PathBuf,
    trial_count: usize,
    seed: Option<u64>,
    reseed_per_trial: bool,
) -> PyResult<(usize, usize)> {
    let mut config = HarnessConfig::default();
    config.batch.output_dir = output_dir;
    config.batch.trial_count = trial_count;
    config.batch.seed = seed;
    config.batch.randomness = if reseed_per_trial {
        RandomnessMode::ReseedPerTrial
    } else {
        RandomnessMode::Shared
    };

    let report = BatchRunner::new(config)
        .and_then(|runner| runner.run())
        .map_err(to_py_err)?;
    Ok((report.completed, report.failures.len()))
}

/// Runs a single trial in memory and returns its telemetry text.
#[pyfunction]
fn run_trial_py(seed: u64) -> PyResult<String> {
    let config = HarnessConfig::default();
    let driver = SimulationDriver::new(&config.scenario, &config.simulation);
    let mut out = Vec::new();
    driver
        .run(OrcaSimulator::new(), &mut out, &mut StdRng::seed_from_u64(seed))
        .map_err(to_py_err)?;
    String::from_utf8(out).map_err(|e| PyRuntimeError::new_err(e.to_string()))
}

#[pymodule]
fn multi_sim(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(run_batch_py, m)?)?;
    m.add_function(wrap_pyfunction!(run_trial_py, m)?)?;
    Ok(())
}
