//! # Navigation Engine
//!
//! The stepping interface the harness drives, and [`OrcaSimulator`], the ORCA
//! implementation shipped with the crate.
//!
//! Agents are addressed by the zero-based index returned from `add_agent`,
//! assigned monotonically in call order.

use crate::orca::compute_new_velocity;
use crate::structs::{AgentParams, AgentState, Vector2D};
use ordered_float::OrderedFloat;
use priority_queue::PriorityQueue;
use tracing::trace;

/// Local collision-avoidance stepping engine.
pub trait NavigationEngine {
    fn set_time_step(&mut self, time_step: f64);

    /// Defaults for every agent added afterwards.
    fn set_agent_defaults(&mut self, params: AgentParams);

    fn add_agent(&mut self, position: Vector2D) -> usize;

    fn set_agent_pref_velocity(&mut self, agent: usize, velocity: Vector2D);

    fn agent_pref_velocity(&self, agent: usize) -> Vector2D;

    /// Advances global time by one time step, moving every agent once.
    fn do_step(&mut self);

    fn num_agents(&self) -> usize;

    fn agent_position(&self, agent: usize) -> Vector2D;

    fn agent_radius(&self, agent: usize) -> f64;

    fn global_time(&self) -> f64;
}

#[derive(Debug, Clone)]
pub struct OrcaSimulator {
    agents: Vec<AgentState>,
    defaults: AgentParams,
    time_step: f64,
    global_time: f64,
}

impl Default for OrcaSimulator {
    fn default() -> Self {
        OrcaSimulator::new()
    }
}

impl OrcaSimulator {
    pub fn new() -> Self {
        OrcaSimulator {
            agents: Vec::new(),
            defaults: AgentParams::default(),
            time_step: 1.0,
            global_time: 0.0,
        }
    }

    pub fn agent(&self, agent: usize) -> &AgentState {
        &self.agents[agent]
    }

    /// Up to `max_neighbors` nearest agents strictly within `neighbor_dist`,
    /// closest first.
    fn neighbors_of(&self, agent: usize) -> Vec<&AgentState> {
        let me = &self.agents[agent];
        let range_sq = me.neighbor_dist * me.neighbor_dist;

        // Max-queue on distance: popping evicts the farthest candidate
        let mut queue = PriorityQueue::new();
        for other in self.agents.iter().filter(|other| other.id != me.id) {
            let dist_sq = me.distance_sq_to(other);
            if dist_sq < range_sq {
                queue.push(other.id, OrderedFloat(dist_sq));
                if queue.len() > me.max_neighbors {
                    queue.pop();
                }
            }
        }

        let mut nearest: Vec<(usize, OrderedFloat<f64>)> = queue.into_iter().collect();
        nearest.sort_by_key(|&(id, dist_sq)| (dist_sq, id));
        nearest.into_iter().map(|(id, _)| &self.agents[id]).collect()
    }
}

impl NavigationEngine for OrcaSimulator {
    fn set_time_step(&mut self, time_step: f64) {
        self.time_step = time_step;
    }

    fn set_agent_defaults(&mut self, params: AgentParams) {
        self.defaults = params;
    }

    fn add_agent(&mut self, position: Vector2D) -> usize {
        let id = self.agents.len();
        self.agents.push(AgentState::new(id, position, &self.defaults));
        id
    }

    fn set_agent_pref_velocity(&mut self, agent: usize, velocity: Vector2D) {
        self.agents[agent].pref_velocity = velocity;
    }

    fn agent_pref_velocity(&self, agent: usize) -> Vector2D {
        self.agents[agent].pref_velocity
    }

    fn do_step(&mut self) {
        // All new velocities are computed from the same snapshot before anyone moves
        let new_velocities: Vec<Vector2D> = (0..self.agents.len())
            .map(|i| compute_new_velocity(&self.agents[i], &self.neighbors_of(i), self.time_step))
            .collect();

        for (agent, velocity) in self.agents.iter_mut().zip(new_velocities) {
            agent.velocity = velocity;
            agent.position += velocity * self.time_step;
        }

        self.global_time += self.time_step;
        trace!(global_time = self.global_time, agents = self.agents.len(), "engine step");
    }

    fn num_agents(&self) -> usize {
        self.agents.len()
    }

    fn agent_position(&self, agent: usize) -> Vector2D {
        self.agents[agent].position
    }

    fn agent_radius(&self, agent: usize) -> f64 {
        self.agents[agent].radius
    }

    fn global_time(&self) -> f64 {
        self.global_time
    }
}
