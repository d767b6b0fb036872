use crate::batch::BatchConfig;
use crate::driver::SimulationConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::scenario::ScenarioConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Every tunable of a batch. `Default` is the reference experiment:
/// 1500 trials into `multi_sim/`, time step 1.0, agents of radius 0.3 and
/// max speed 1.0 on a radius-2 circle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub batch: BatchConfig,
    pub scenario: ScenarioConfig,
    pub simulation: SimulationConfig,
}

impl HarnessConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> HarnessResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        let config: HarnessConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path` when it exists, otherwise falls back to the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> HarnessResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> HarnessResult<()> {
        self.scenario.validate()?;
        self.simulation.validate()?;
        Ok(())
    }
}
