//! # Reciprocal Crossing Scenario
//!
//! Two agents start on a circle around the origin and each heads for the
//! antipodal point, so their straight-line paths cross near the center.
//! Start angles are redrawn together until the two starts are far enough apart.

use crate::engine::NavigationEngine;
use crate::error::{HarnessError, HarnessResult};
use crate::structs::{AgentParams, Vector2D};
use crate::telemetry::TelemetryWriter;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::io::Write;
use tracing::debug;

/// One navigating agent as the harness sees it: the engine index plus the goal
/// the harness steers it toward. The goal is fixed for the agent's lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Agent {
    id: usize,
    goal: Vector2D,
}

impl Agent {
    pub fn new(id: usize, goal: Vector2D) -> Self {
        Agent { id, goal }
    }

    /// Index of this agent inside the engine.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn goal(&self) -> Vector2D {
        self.goal
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Radius of the circle the start positions are drawn on
    pub circle_radius: f64,
    /// Smallest accepted squared distance between the two starts
    pub min_start_separation_sq: f64,
    /// Rejected draws tolerated before giving up
    pub max_attempts: usize,
    pub agent: AgentParams,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        ScenarioConfig {
            circle_radius: 2.0,
            min_start_separation_sq: 0.2,
            max_attempts: 10_000,
            agent: AgentParams::default(),
        }
    }
}

impl ScenarioConfig {
    pub fn validate(&self) -> HarnessResult<()> {
        if !(self.circle_radius > 0.0) {
            return Err(HarnessError::Config(format!(
                "circle radius must be positive, got {}",
                self.circle_radius
            )));
        }
        // Two points on the circle are at most one diameter apart
        let diameter_sq = 4.0 * self.circle_radius * self.circle_radius;
        if self.min_start_separation_sq >= diameter_sq {
            return Err(HarnessError::Config(format!(
                "start separation {} (squared) is unreachable on a circle of radius {}",
                self.min_start_separation_sq, self.circle_radius
            )));
        }
        if self.max_attempts == 0 {
            return Err(HarnessError::Config("max_attempts must be at least 1".into()));
        }
        if !(self.agent.radius > 0.0) || !(self.agent.max_speed > 0.0) {
            return Err(HarnessError::Config(
                "agent radius and max speed must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Start positions of both agents. Goals are their negations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossingLayout {
    pub starts: [Vector2D; 2],
}

impl CrossingLayout {
    pub fn goals(&self) -> [Vector2D; 2] {
        [-self.starts[0], -self.starts[1]]
    }
}

pub struct ScenarioGenerator<'a> {
    config: &'a ScenarioConfig,
}

impl<'a> ScenarioGenerator<'a> {
    pub fn new(config: &'a ScenarioConfig) -> Self {
        ScenarioGenerator { config }
    }

    /// Draws start positions until the two starts are at least
    /// `min_start_separation_sq` apart (squared).
    pub fn draw_layout<R: Rng + ?Sized>(&self, rng: &mut R) -> HarnessResult<CrossingLayout> {
        self.config.validate()?;

        for attempt in 1..=self.config.max_attempts {
            let angle1 = rng.gen_range(0.0..TAU);
            let angle2 = rng.gen_range(0.0..TAU);

            let p1 = Vector2D::from_angle(angle1) * self.config.circle_radius;
            let p2 = Vector2D::from_angle(angle2) * self.config.circle_radius;

            if (p1 - p2).abs_sq() >= self.config.min_start_separation_sq {
                debug!(attempt, angle1, angle2, "scenario accepted");
                return Ok(CrossingLayout { starts: [p1, p2] });
            }
        }

        Err(HarnessError::ScenarioRejected {
            attempts: self.config.max_attempts,
        })
    }

    /// Registers `layout` with an empty engine and writes one header line per
    /// agent in creation order.
    pub fn install<E, W>(
        &self,
        engine: &mut E,
        layout: &CrossingLayout,
        telemetry: &mut TelemetryWriter<W>,
    ) -> HarnessResult<Vec<Agent>>
    where
        E: NavigationEngine + ?Sized,
        W: Write,
    {
        let params = self.config.agent;
        engine.set_agent_defaults(params);

        let mut agents = Vec::with_capacity(layout.starts.len());
        for (start, goal) in layout.starts.iter().zip(layout.goals()) {
            let id = engine.add_agent(*start);
            agents.push(Agent::new(id, goal));
        }

        for agent in &agents {
            telemetry.write_header(agent.goal(), params.radius, params.max_speed)?;
        }

        Ok(agents)
    }

    /// Draws a layout and installs it.
    pub fn generate<E, W, R>(
        &self,
        engine: &mut E,
        telemetry: &mut TelemetryWriter<W>,
        rng: &mut R,
    ) -> HarnessResult<Vec<Agent>>
    where
        E: NavigationEngine + ?Sized,
        W: Write,
        R: Rng + ?Sized,
    {
        let layout = self.draw_layout(rng)?;
        self.install(engine, &layout, telemetry)
    }
}
