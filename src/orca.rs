//! # ORCA - Optimal Reciprocal Collision Avoidance
//!
//! Velocity selection used by [`OrcaSimulator`](crate::engine::OrcaSimulator),
//! following "Reciprocal n-body Collision Avoidance" by van den Berg et al. (ISRR 2011).
//!
//! ## Algorithm Overview
//!
//! For every agent, each step:
//! 1. Build one half-plane ("ORCA line") per neighbor from the truncated
//!    Velocity Obstacle (VO) the neighbor induces over the time horizon
//! 2. Find the velocity closest (L2) to the preferred velocity inside all
//!    half-planes and the max-speed disk, as a quadratic program solved by OSQP
//! 3. If that program is infeasible, fall back to a 3D linear program that
//!    minimizes the largest half-plane violation
//!
//! Each agent takes half of the responsibility for avoiding a collision, so two
//! agents running the same computation pick complementary velocities.
//!
//! ## Half-plane construction
//!
//! With `p` the relative position, `v` the relative velocity, `r` the combined
//! radius and `tau` the time horizon, the VO is a cone with apex at the origin
//! cut off by a disk of radius `r / tau` centered at `p / tau`. The vector `u`
//! from `v` to the closest point on the VO boundary defines the line through
//! `own_velocity + u / 2`. Three cases:
//!
//! - `v` projects onto the cut-off circle
//! - `v` projects onto the left or right leg of the cone
//! - the agents already overlap: use a cut-off disk over one time step so they
//!   separate in the next move
//!
//! ## Symmetry
//!
//! A perfectly symmetric head-on approach produces mirror-image constraints and
//! the agents can stall against each other. The solver does not break that
//! symmetry; the harness perturbs preferred velocities instead.

use crate::structs::{AgentState, Vector2D};
use osqp::{CscMatrix, Problem, Settings};
use std::borrow::Cow;

const EPSILON: f64 = 1e-10;
/// Sides of the polygon approximating the max-speed disk
const SPEED_POLYGON_SIDES: usize = 16;
/// Slack tolerated on top of max speed before a solver result is rescaled
const SPEED_TOLERANCE: f64 = 0.01;

/// Represents an ORCA constraint as a half-plane in velocity space.
/// A velocity 'v' is considered valid if: (v - point) · direction >= 0
#[derive(Debug, Clone)]
pub struct OrcaLine {
    /// A point on the dividing line of the half-plane
    pub point: Vector2D,
    /// The inward-pointing unit normal of the half-plane's boundary
    pub direction: Vector2D,
}

impl OrcaLine {
    pub fn new(point: Vector2D, direction: Vector2D) -> Self {
        OrcaLine { point, direction }
    }

    /// Signed distance by which `velocity` lies outside the half-plane.
    /// Zero or negative means the constraint is satisfied.
    pub fn violation(&self, velocity: &Vector2D) -> f64 {
        -(*velocity - self.point).dot(&self.direction)
    }
}

/// Computes a new, safe velocity for the given agent.
///
/// `time_step` is only used when the agent already overlaps a neighbor.
pub fn compute_new_velocity(
    agent: &AgentState,
    neighbors: &[&AgentState],
    time_step: f64,
) -> Vector2D {
    // Step 1: Collect all ORCA constraints from neighbors
    let orca_lines: Vec<OrcaLine> = neighbors
        .iter()
        .filter_map(|neighbor| compute_orca_line_for_agent(agent, neighbor, time_step))
        .collect();

    // Special case: no ORCA constraints, just clip the preferred velocity
    if orca_lines.is_empty() {
        return clamp_speed(agent.pref_velocity, agent.max_speed);
    }

    // Step 2: Attempt to solve 2D quadratic program (feasible case)
    if let Some(new_velocity) =
        solve_2d_quadratic_program(&orca_lines, agent.max_speed, &agent.pref_velocity)
    {
        return new_velocity;
    }

    // Step 3: Handle infeasible case with 3D linear program
    solve_3d_linear_program(&orca_lines, agent.max_speed)
}

fn clamp_speed(velocity: Vector2D, max_speed: f64) -> Vector2D {
    if velocity.abs_sq() > max_speed * max_speed {
        velocity.normalize() * max_speed
    } else {
        velocity
    }
}

/// Computes the ORCA half-plane `agent` must respect with respect to `neighbor`.
///
/// Returns `None` only for exactly coincident agents, where no separating
/// direction exists.
fn compute_orca_line_for_agent(
    agent: &AgentState,
    neighbor: &AgentState,
    time_step: f64,
) -> Option<OrcaLine> {
    let relative_position = neighbor.position - agent.position;
    let relative_velocity = agent.velocity - neighbor.velocity;
    let dist_sq = relative_position.abs_sq();
    let combined_radius = agent.radius + neighbor.radius;
    let combined_radius_sq = combined_radius * combined_radius;

    if dist_sq < EPSILON {
        return None;
    }

    // `line_dir` is the direction of the boundary line; the valid side is to its left.
    let (line_dir, u) = if dist_sq > combined_radius_sq {
        let inv_time_horizon = 1.0 / agent.time_horizon;

        // Vector from cut-off center to relative velocity
        let w = relative_velocity - relative_position * inv_time_horizon;
        let w_length_sq = w.abs_sq();
        let dot_product = w.dot(&relative_position);

        if dot_product < 0.0 && dot_product * dot_product > combined_radius_sq * w_length_sq {
            // Project on cut-off circle
            let w_length = w_length_sq.sqrt();
            let unit_w = w * (1.0 / w_length);
            let line_dir = Vector2D::new(unit_w.y, -unit_w.x);
            let u = unit_w * (combined_radius * inv_time_horizon - w_length);
            (line_dir, u)
        } else {
            // Project on legs
            let leg = (dist_sq - combined_radius_sq).sqrt();
            let line_dir = if relative_position.det(&w) > 0.0 {
                // Left leg
                Vector2D::new(
                    relative_position.x * leg - relative_position.y * combined_radius,
                    relative_position.x * combined_radius + relative_position.y * leg,
                ) * (1.0 / dist_sq)
            } else {
                // Right leg
                -Vector2D::new(
                    relative_position.x * leg + relative_position.y * combined_radius,
                    -relative_position.x * combined_radius + relative_position.y * leg,
                ) * (1.0 / dist_sq)
            };
            let u = line_dir * relative_velocity.dot(&line_dir) - relative_velocity;
            (line_dir, u)
        }
    } else {
        // Collision: project on cut-off circle of one time step
        let inv_time_step = 1.0 / time_step;
        let w = relative_velocity - relative_position * inv_time_step;
        let w_length = w.magnitude();
        if w_length < EPSILON {
            return None;
        }
        let unit_w = w * (1.0 / w_length);
        let line_dir = Vector2D::new(unit_w.y, -unit_w.x);
        let u = unit_w * (combined_radius * inv_time_step - w_length);
        (line_dir, u)
    };

    // Each agent takes half of the responsibility
    let orca_point = agent.velocity + u * 0.5;
    Some(OrcaLine::new(orca_point, line_dir.perpendicular()))
}

/// Converts dense constraint rows into OSQP's compressed sparse column format.
fn dense_to_csc<const N: usize>(rows: &[[f64; N]]) -> CscMatrix<'static> {
    let mut data = Vec::new();
    let mut indices = Vec::new();
    let mut indptr = vec![0];

    for col in 0..N {
        for (row_idx, row) in rows.iter().enumerate() {
            if row[col] != 0.0 {
                data.push(row[col]);
                indices.push(row_idx);
            }
        }
        indptr.push(data.len());
    }

    CscMatrix {
        nrows: rows.len(),
        ncols: N,
        indptr: Cow::Owned(indptr),
        indices: Cow::Owned(indices),
        data: Cow::Owned(data),
    }
}

/// Outward normals of the polygon circumscribing the max-speed disk.
fn speed_polygon_normals() -> impl Iterator<Item = Vector2D> {
    (0..SPEED_POLYGON_SIDES).map(|i| {
        let angle = (i as f64 / SPEED_POLYGON_SIDES as f64) * std::f64::consts::TAU;
        Vector2D::from_angle(angle)
    })
}

fn solver_settings() -> Settings {
    Settings::default()
        .verbose(false)
        .eps_abs(1e-6)
        .eps_rel(1e-6)
        .max_iter(4000)
        .polishing(true)
}

/// Solves 2D quadratic program to find optimal velocity using L2 distance
/// Objective: Minimize ||v - pref_velocity||^2 = (vx - pvx)^2 + (vy - pvy)^2
///
/// Returns `None` when OSQP reports the half-planes as infeasible.
fn solve_2d_quadratic_program(
    orca_lines: &[OrcaLine],
    max_speed: f64,
    pref_velocity: &Vector2D,
) -> Option<Vector2D> {
    if orca_lines.is_empty() {
        return Some(clamp_speed(*pref_velocity, max_speed));
    }

    // q vector (linear term) for minimizing ||v - pref_velocity||^2
    let q = &[-2.0 * pref_velocity.x, -2.0 * pref_velocity.y];

    // Linear constraints in the form l <= Ax <= u
    let mut rows: Vec<[f64; 2]> = Vec::with_capacity(orca_lines.len() + SPEED_POLYGON_SIDES);
    let mut l_bounds = Vec::with_capacity(rows.capacity());
    let mut u_bounds = Vec::with_capacity(rows.capacity());

    // ORCA constraints: v·n >= p·n
    for line in orca_lines {
        rows.push([line.direction.x, line.direction.y]);
        l_bounds.push(line.point.dot(&line.direction));
        u_bounds.push(f64::INFINITY);
    }

    // Speed limit: v·n_k <= max_speed for every polygon side
    for normal in speed_polygon_normals() {
        rows.push([normal.x, normal.y]);
        l_bounds.push(f64::NEG_INFINITY);
        u_bounds.push(max_speed);
    }

    // P = [[2, 0], [0, 2]], upper triangular
    let p_matrix = CscMatrix {
        nrows: 2,
        ncols: 2,
        indptr: Cow::Borrowed(&[0, 1, 2]),
        indices: Cow::Borrowed(&[0, 1]),
        data: Cow::Borrowed(&[2.0, 2.0]),
    };

    let mut problem = Problem::new(
        p_matrix,
        q,
        dense_to_csc(&rows),
        &l_bounds,
        &u_bounds,
        &solver_settings(),
    )
    .ok()?;

    let velocity = match problem.solve() {
        osqp::Status::Solved(sol) => Vector2D::new(sol.x()[0], sol.x()[1]),
        osqp::Status::SolvedInaccurate(sol) => Vector2D::new(sol.x()[0], sol.x()[1]),
        _ => return None,
    };

    if velocity.magnitude() <= max_speed + SPEED_TOLERANCE {
        Some(velocity)
    } else {
        Some(velocity.normalize() * max_speed)
    }
}

/// Solves 3D linear program for infeasible case using OSQP
/// Variables: x = [vx, vy, d] where d is the largest constraint violation
/// Objective: minimize d
fn solve_3d_linear_program(orca_lines: &[OrcaLine], max_speed: f64) -> Vector2D {
    let q = &[0.0, 0.0, 1.0];

    // Small regularization on vx, vy keeps OSQP numerically stable
    let p_matrix = CscMatrix {
        nrows: 3,
        ncols: 3,
        indptr: Cow::Borrowed(&[0, 1, 2, 2]),
        indices: Cow::Borrowed(&[0, 1]),
        data: Cow::Borrowed(&[1e-6, 1e-6]),
    };

    let mut rows: Vec<[f64; 3]> = Vec::new();
    let mut l_bounds = Vec::new();
    let mut u_bounds = Vec::new();

    // Relaxed ORCA constraints: v·n + d >= p·n
    for line in orca_lines {
        rows.push([line.direction.x, line.direction.y, 1.0]);
        l_bounds.push(line.point.dot(&line.direction));
        u_bounds.push(f64::INFINITY);
    }

    for normal in speed_polygon_normals() {
        rows.push([normal.x, normal.y, 0.0]);
        l_bounds.push(f64::NEG_INFINITY);
        u_bounds.push(max_speed);
    }

    // d >= 0
    rows.push([0.0, 0.0, 1.0]);
    l_bounds.push(0.0);
    u_bounds.push(f64::INFINITY);

    let mut problem = match Problem::new(
        p_matrix,
        q,
        dense_to_csc(&rows),
        &l_bounds,
        &u_bounds,
        &solver_settings(),
    ) {
        Ok(p) => p,
        Err(_) => return solve_3d_linear_program_fallback(orca_lines, max_speed),
    };

    let solution = match problem.solve() {
        osqp::Status::Solved(sol) => Some(Vector2D::new(sol.x()[0], sol.x()[1])),
        osqp::Status::SolvedInaccurate(sol) => Some(Vector2D::new(sol.x()[0], sol.x()[1])),
        osqp::Status::MaxIterationsReached(sol) => Some(Vector2D::new(sol.x()[0], sol.x()[1])),
        _ => None,
    };

    match solution {
        Some(velocity) => clamp_speed(velocity, max_speed),
        None => solve_3d_linear_program_fallback(orca_lines, max_speed),
    }
}

/// Sampling search used when OSQP cannot set up or solve the 3D program.
/// Picks the candidate inside the speed disk with the smallest worst violation.
fn solve_3d_linear_program_fallback(orca_lines: &[OrcaLine], max_speed: f64) -> Vector2D {
    let max_violation = |v: &Vector2D| -> f64 {
        orca_lines
            .iter()
            .map(|line| line.violation(v))
            .fold(0.0_f64, f64::max)
    };

    let mut best_velocity = Vector2D::ZERO;
    let mut min_violation = max_violation(&best_velocity);

    let mut try_candidate = |candidate: Vector2D| {
        if candidate.magnitude() <= max_speed + EPSILON {
            let violation = max_violation(&candidate);
            if violation < min_violation {
                min_violation = violation;
                best_velocity = candidate;
            }
        }
    };

    // Dense angular sampling at multiple speeds
    let num_angles = 64;
    let speed_fractions = [0.1, 0.25, 0.5, 0.75, 0.9, 1.0];
    for i in 0..num_angles {
        let dir = Vector2D::from_angle((i as f64 / num_angles as f64) * std::f64::consts::TAU);
        for fraction in speed_fractions {
            try_candidate(dir * (max_speed * fraction));
        }
    }

    // Points on each line and small offsets along its normal
    for line in orca_lines {
        try_candidate(line.point);
        for offset in [0.1, 0.5] {
            try_candidate(line.point + line.direction * offset);
        }
    }

    best_velocity
}
