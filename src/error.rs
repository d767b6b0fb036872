use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scenario generation gave up after {attempts} rejected draws")]
    ScenarioRejected { attempts: usize },

    #[error("Trial did not converge within {steps} steps (global time {global_time})")]
    NonConvergence { steps: usize, global_time: f64 },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Telemetry write failed: {0}")]
    Telemetry(#[from] io::Error),

    #[error("Invalid config file: {0}")]
    ConfigFile(#[from] toml::de::Error),
}

impl HarnessError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        HarnessError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;
