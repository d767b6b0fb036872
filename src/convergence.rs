use crate::engine::NavigationEngine;
use crate::scenario::Agent;

/// True once every agent lies within its own radius of its goal.
///
/// Agents are checked in index order and the check stops at the first agent
/// still outside its goal disk.
pub fn reached_goal<E>(engine: &E, agents: &[Agent]) -> bool
where
    E: NavigationEngine + ?Sized,
{
    agents.iter().all(|agent| {
        let radius = engine.agent_radius(agent.id());
        (engine.agent_position(agent.id()) - agent.goal()).abs_sq() <= radius * radius
    })
}
