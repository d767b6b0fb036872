//! # Simulation Driver
//!
//! Runs one trial against a fresh engine:
//!
//! - **Initializing**: configure the engine, install the crossing scenario,
//!   write the header
//! - **Stepping**: snapshot, set preferred velocities, step, test convergence
//! - **Converged**: one extra snapshot of the final positions
//! - **Closed**: flush the telemetry and drop the engine
//!
//! The stepping loop is bounded by `max_steps`; reaching it without
//! convergence closes the trial and reports [`HarnessError::NonConvergence`].
//! Whatever telemetry was produced up to that point stays written.

use crate::convergence::reached_goal;
use crate::engine::NavigationEngine;
use crate::error::{HarnessError, HarnessResult};
use crate::policy::set_preferred_velocities;
use crate::scenario::{Agent, CrossingLayout, ScenarioConfig, ScenarioGenerator};
use crate::telemetry::TelemetryWriter;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub time_step: f64,
    /// Steps allowed before a trial is declared non-convergent
    pub max_steps: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            time_step: 1.0,
            max_steps: 10_000,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> HarnessResult<()> {
        if !(self.time_step > 0.0) {
            return Err(HarnessError::Config(format!(
                "time step must be positive, got {}",
                self.time_step
            )));
        }
        if self.max_steps == 0 {
            return Err(HarnessError::Config("max_steps must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    Initializing,
    Stepping,
    Converged,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrialSummary {
    pub steps: usize,
    pub global_time: f64,
    pub telemetry_lines: usize,
}

pub struct SimulationDriver<'a> {
    scenario: &'a ScenarioConfig,
    simulation: &'a SimulationConfig,
}

impl<'a> SimulationDriver<'a> {
    pub fn new(scenario: &'a ScenarioConfig, simulation: &'a SimulationConfig) -> Self {
        SimulationDriver {
            scenario,
            simulation,
        }
    }

    /// Runs one trial with a freshly drawn scenario.
    pub fn run<E, W, R>(&self, engine: E, out: W, rng: &mut R) -> HarnessResult<TrialSummary>
    where
        E: NavigationEngine,
        W: Write,
        R: Rng + ?Sized,
    {
        let layout = ScenarioGenerator::new(self.scenario).draw_layout(rng)?;
        self.run_layout(engine, &layout, out, rng)
    }

    /// Runs one trial from a given layout. `rng` feeds the velocity perturbation.
    pub fn run_layout<E, W, R>(
        &self,
        mut engine: E,
        layout: &CrossingLayout,
        out: W,
        rng: &mut R,
    ) -> HarnessResult<TrialSummary>
    where
        E: NavigationEngine,
        W: Write,
        R: Rng + ?Sized,
    {
        let mut state = TrialState::Initializing;
        if engine.num_agents() != 0 {
            return Err(HarnessError::Config(format!(
                "trial needs an empty engine, found {} agents",
                engine.num_agents()
            )));
        }

        let mut telemetry = TelemetryWriter::new(out);
        engine.set_time_step(self.simulation.time_step);
        let agents =
            ScenarioGenerator::new(self.scenario).install(&mut engine, layout, &mut telemetry)?;
        debug_assert_eq!(agents.len(), engine.num_agents());

        advance(&mut state, TrialState::Stepping);
        let mut steps = 0;
        loop {
            write_snapshot(&engine, &agents, &mut telemetry)?;
            set_preferred_velocities(&mut engine, &agents, rng);
            engine.do_step();
            steps += 1;

            if reached_goal(&engine, &agents) {
                break;
            }
            if steps >= self.simulation.max_steps {
                telemetry.flush()?;
                advance(&mut state, TrialState::Closed);
                return Err(HarnessError::NonConvergence {
                    steps,
                    global_time: engine.global_time(),
                });
            }
        }

        advance(&mut state, TrialState::Converged);
        write_snapshot(&engine, &agents, &mut telemetry)?;
        telemetry.flush()?;

        let summary = TrialSummary {
            steps,
            global_time: engine.global_time(),
            telemetry_lines: telemetry.lines(),
        };
        drop(engine);
        advance(&mut state, TrialState::Closed);

        Ok(summary)
    }
}

fn advance(state: &mut TrialState, next: TrialState) {
    trace!(from = ?*state, to = ?next, "trial state");
    *state = next;
}

fn write_snapshot<E, W>(
    engine: &E,
    agents: &[Agent],
    telemetry: &mut TelemetryWriter<W>,
) -> HarnessResult<()>
where
    E: NavigationEngine + ?Sized,
    W: Write,
{
    let time = engine.global_time();
    debug!(global_time = time, "snapshot");
    telemetry.write_snapshot(time, agents.iter().map(|a| engine.agent_position(a.id())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::OrcaSimulator;
    use crate::structs::{AgentParams, Vector2D};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn head_on() -> CrossingLayout {
        CrossingLayout {
            starts: [Vector2D::new(2.0, 0.0), Vector2D::new(-2.0, 0.0)],
        }
    }

    fn parse_line(line: &str) -> Vec<f64> {
        line.split(' ').map(|field| field.parse().unwrap()).collect()
    }

    #[test]
    fn test_head_on_trial_converges_at_goals() {
        let scenario = ScenarioConfig::default();
        let simulation = SimulationConfig {
            max_steps: 1_000,
            ..SimulationConfig::default()
        };
        let driver = SimulationDriver::new(&scenario, &simulation);
        let mut out = Vec::new();
        let mut rng = StdRng::seed_from_u64(2024);

        let summary = driver
            .run_layout(OrcaSimulator::new(), &head_on(), &mut out, &mut rng)
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2 + summary.steps + 1);
        assert_eq!(summary.telemetry_lines, lines.len());
        assert_eq!(lines[0], "-2 -0 0.3 1");
        assert_eq!(lines[1], "2 -0 0.3 1");
        assert_eq!(lines[2], "0 2 0 -2 0");

        let last = parse_line(lines[lines.len() - 1]);
        assert_eq!(last.len(), 5);
        assert_eq!(last[0], summary.global_time);
        let end0 = Vector2D::new(last[1], last[2]);
        let end1 = Vector2D::new(last[3], last[4]);
        assert!((end0 - Vector2D::new(-2.0, 0.0)).magnitude() <= 0.3, "agent 0 ended at {:?}", end0);
        assert!((end1 - Vector2D::new(2.0, 0.0)).magnitude() <= 0.3, "agent 1 ended at {:?}", end1);
    }

    #[test]
    fn test_time_column_advances_by_time_step() {
        let scenario = ScenarioConfig::default();
        let simulation = SimulationConfig::default();
        let driver = SimulationDriver::new(&scenario, &simulation);
        let mut out = Vec::new();

        let summary = driver
            .run(OrcaSimulator::new(), &mut out, &mut StdRng::seed_from_u64(8))
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let times: Vec<f64> = text.lines().skip(2).map(|l| parse_line(l)[0]).collect();
        assert_eq!(times.len(), summary.steps + 1);
        for (i, t) in times.iter().take(summary.steps).enumerate() {
            assert_eq!(*t, i as f64);
        }
        // The post-convergence snapshot carries the time after the last step
        assert_eq!(times[summary.steps], times[summary.steps - 1] + 1.0);
    }

    /// Engine whose agents never move.
    #[derive(Default)]
    struct FrozenEngine {
        positions: Vec<Vector2D>,
        time: f64,
        step: f64,
        radius: f64,
    }

    impl NavigationEngine for FrozenEngine {
        fn set_time_step(&mut self, time_step: f64) {
            self.step = time_step;
        }
        fn set_agent_defaults(&mut self, params: AgentParams) {
            self.radius = params.radius;
        }
        fn add_agent(&mut self, position: Vector2D) -> usize {
            self.positions.push(position);
            self.positions.len() - 1
        }
        fn set_agent_pref_velocity(&mut self, _agent: usize, _velocity: Vector2D) {}
        fn agent_pref_velocity(&self, _agent: usize) -> Vector2D {
            Vector2D::ZERO
        }
        fn do_step(&mut self) {
            self.time += self.step;
        }
        fn num_agents(&self) -> usize {
            self.positions.len()
        }
        fn agent_position(&self, agent: usize) -> Vector2D {
            self.positions[agent]
        }
        fn agent_radius(&self, _agent: usize) -> f64 {
            self.radius
        }
        fn global_time(&self) -> f64 {
            self.time
        }
    }

    #[test]
    fn test_step_cap_reports_non_convergence() {
        let scenario = ScenarioConfig::default();
        let simulation = SimulationConfig {
            time_step: 0.5,
            max_steps: 25,
        };
        let driver = SimulationDriver::new(&scenario, &simulation);
        let mut out = Vec::new();

        let err = driver
            .run_layout(FrozenEngine::default(), &head_on(), &mut out, &mut StdRng::seed_from_u64(1))
            .unwrap_err();

        match err {
            HarnessError::NonConvergence { steps, global_time } => {
                assert_eq!(steps, 25);
                assert_eq!(global_time, 12.5);
            }
            other => panic!("expected NonConvergence, got {:?}", other),
        }
        // Header plus one snapshot per attempted step, no final snapshot
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2 + 25);
    }

    #[test]
    fn test_rejects_engine_with_agents() {
        let scenario = ScenarioConfig::default();
        let simulation = SimulationConfig::default();
        let driver = SimulationDriver::new(&scenario, &simulation);
        let mut engine = OrcaSimulator::new();
        engine.add_agent(Vector2D::ZERO);

        let err = driver
            .run(engine, Vec::new(), &mut StdRng::seed_from_u64(1))
            .unwrap_err();

        assert!(matches!(err, HarnessError::Config(_)), "got {:?}", err);
    }

    #[test]
    fn test_config_validation() {
        assert!(SimulationConfig::default().validate().is_ok());
        assert!(SimulationConfig { time_step: 0.0, ..SimulationConfig::default() }.validate().is_err());
        assert!(SimulationConfig { max_steps: 0, ..SimulationConfig::default() }.validate().is_err());
    }
}
