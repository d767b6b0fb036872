//! # Core Data Structures
//!
//! Value types shared by the harness and the stepping engine:
//!
//! - **Vector2D**: 2D position/velocity/goal with arithmetic operations
//! - **AgentParams**: per-agent defaults handed to the engine before agents are added
//! - **AgentState**: engine-side state of one agent (position, velocity, radius, ...)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2D {
    pub x: f64,
    pub y: f64,
}

impl Vector2D {
    pub const ZERO: Vector2D = Vector2D { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Vector2D { x, y }
    }

    /// Unit vector at `angle` radians from the positive x axis.
    pub fn from_angle(angle: f64) -> Self {
        Vector2D::new(angle.cos(), angle.sin())
    }

    pub fn abs_sq(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn magnitude(&self) -> f64 {
        self.abs_sq().sqrt()
    }

    pub fn normalize(&self) -> Vector2D {
        let mag = self.magnitude();
        if mag > 0.0 {
            Vector2D {
                x: self.x / mag,
                y: self.y / mag,
            }
        } else {
            Vector2D::ZERO
        }
    }

    pub fn dot(&self, other: &Vector2D) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product (z component of the 3D cross product).
    pub fn det(&self, other: &Vector2D) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Rotated 90 degrees counter-clockwise.
    pub fn perpendicular(&self) -> Vector2D {
        Vector2D {
            x: -self.y,
            y: self.x,
        }
    }
}

impl fmt::Display for Vector2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.x, self.y)
    }
}

impl Add for Vector2D {
    type Output = Vector2D;

    fn add(self, other: Vector2D) -> Vector2D {
        Vector2D {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl AddAssign for Vector2D {
    fn add_assign(&mut self, other: Vector2D) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vector2D {
    type Output = Vector2D;

    fn sub(self, other: Vector2D) -> Vector2D {
        Vector2D {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl Mul<f64> for Vector2D {
    type Output = Vector2D;

    fn mul(self, scalar: f64) -> Vector2D {
        Vector2D {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }
}

impl Mul<Vector2D> for f64 {
    type Output = Vector2D;

    fn mul(self, vector: Vector2D) -> Vector2D {
        vector * self
    }
}

impl Neg for Vector2D {
    type Output = Vector2D;

    fn neg(self) -> Vector2D {
        Vector2D {
            x: -self.x,
            y: -self.y,
        }
    }
}

/// Defaults applied to every agent added after `set_agent_defaults`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentParams {
    /// Maximum distance at which other agents are considered neighbors
    pub neighbor_dist: f64,
    /// Maximum number of neighbors taken into account
    pub max_neighbors: usize,
    /// Time horizon for agent-agent velocity obstacles
    pub time_horizon: f64,
    /// Time horizon for obstacles (kept for engine parity, no obstacles exist)
    pub time_horizon_obst: f64,
    pub radius: f64,
    pub max_speed: f64,
}

impl Default for AgentParams {
    fn default() -> Self {
        AgentParams {
            neighbor_dist: 15.0,
            max_neighbors: 10,
            time_horizon: 5.0,
            time_horizon_obst: 5.0,
            radius: 0.3,
            max_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentState {
    pub id: usize,
    pub position: Vector2D,
    pub velocity: Vector2D,
    pub radius: f64,
    pub pref_velocity: Vector2D,
    pub max_speed: f64,
    pub neighbor_dist: f64,
    pub max_neighbors: usize,
    pub time_horizon: f64,
}

impl AgentState {
    pub fn new(id: usize, position: Vector2D, params: &AgentParams) -> Self {
        AgentState {
            id,
            position,
            velocity: Vector2D::ZERO,
            radius: params.radius,
            pref_velocity: Vector2D::ZERO,
            max_speed: params.max_speed,
            neighbor_dist: params.neighbor_dist,
            max_neighbors: params.max_neighbors,
            time_horizon: params.time_horizon,
        }
    }

    pub fn distance_sq_to(&self, other: &AgentState) -> f64 {
        (self.position - other.position).abs_sq()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Vector2D Tests ====================

    #[test]
    fn test_vector2d_new() {
        let v = Vector2D::new(3.0, 4.0);
        assert_eq!(v.x, 3.0);
        assert_eq!(v.y, 4.0);
    }

    #[test]
    fn test_vector2d_abs_sq_345() {
        let v = Vector2D::new(3.0, 4.0);
        assert_eq!(v.abs_sq(), 25.0);
        assert_eq!(v.magnitude(), 5.0);
    }

    #[test]
    fn test_vector2d_normalize_zero() {
        let n = Vector2D::ZERO.normalize();
        assert_eq!(n, Vector2D::ZERO);
    }

    #[test]
    fn test_vector2d_normalize_345() {
        let n = Vector2D::new(-3.0, -4.0).normalize();
        assert!((n.x - (-0.6)).abs() < 1e-10);
        assert!((n.y - (-0.8)).abs() < 1e-10);
        assert!((n.magnitude() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_vector2d_det() {
        let a = Vector2D::new(1.0, 0.0);
        let b = Vector2D::new(0.0, 1.0);
        assert_eq!(a.det(&b), 1.0);
        assert_eq!(b.det(&a), -1.0);
        assert_eq!(a.det(&a), 0.0);
    }

    #[test]
    fn test_vector2d_perpendicular_general() {
        let v = Vector2D::new(3.0, 4.0);
        let p = v.perpendicular();
        assert_eq!(p, Vector2D::new(-4.0, 3.0));
        assert_eq!(v.dot(&p), 0.0);
    }

    #[test]
    fn test_vector2d_operators() {
        let v1 = Vector2D::new(1.0, 2.0);
        let v2 = Vector2D::new(3.0, 4.0);
        assert_eq!(v1 + v2, Vector2D::new(4.0, 6.0));
        assert_eq!(v2 - v1, Vector2D::new(2.0, 2.0));
        assert_eq!(v1 * 2.0, Vector2D::new(2.0, 4.0));
        assert_eq!(2.0 * v1, Vector2D::new(2.0, 4.0));
        assert_eq!(-v1, Vector2D::new(-1.0, -2.0));

        let mut v3 = v1;
        v3 += v2;
        assert_eq!(v3, Vector2D::new(4.0, 6.0));
    }

    #[test]
    fn test_vector2d_from_angle() {
        let v = Vector2D::from_angle(std::f64::consts::FRAC_PI_2);
        assert!(v.x.abs() < 1e-12);
        assert!((v.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_vector2d_display_is_space_separated() {
        assert_eq!(Vector2D::new(1.5, -2.0).to_string(), "1.5 -2");
    }

    // ==================== AgentParams / AgentState Tests ====================

    #[test]
    fn test_agent_params_default_matches_experiment() {
        let p = AgentParams::default();
        assert_eq!(p.neighbor_dist, 15.0);
        assert_eq!(p.max_neighbors, 10);
        assert_eq!(p.time_horizon, 5.0);
        assert_eq!(p.time_horizon_obst, 5.0);
        assert_eq!(p.radius, 0.3);
        assert_eq!(p.max_speed, 1.0);
    }

    #[test]
    fn test_agent_state_new_starts_at_rest() {
        let agent = AgentState::new(3, Vector2D::new(1.0, 2.0), &AgentParams::default());
        assert_eq!(agent.id, 3);
        assert_eq!(agent.position, Vector2D::new(1.0, 2.0));
        assert_eq!(agent.velocity, Vector2D::ZERO);
        assert_eq!(agent.pref_velocity, Vector2D::ZERO);
        assert_eq!(agent.radius, 0.3);
    }

    #[test]
    fn test_agent_state_distance_sq() {
        let params = AgentParams::default();
        let a = AgentState::new(0, Vector2D::new(0.0, 0.0), &params);
        let b = AgentState::new(1, Vector2D::new(3.0, 4.0), &params);
        assert_eq!(a.distance_sq_to(&b), 25.0);
    }
}
