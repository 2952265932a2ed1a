use glam::Vec3;

use crate::config::Config;

/// Behavioral mode of a vertex.
///
/// Transitions are monotonic forward only: `Search → Optimize → Constrain`.
/// A vertex never returns to `Search` once it has saturated. `Constrain` is
/// a reserved hook for geometric constraint resolution; no current rule
/// enters it, but it must remain a valid, inert state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexState {
    Search,
    Optimize,
    Constrain,
}

impl VertexState {
    fn rank(self) -> u8 {
        match self {
            VertexState::Search => 0,
            VertexState::Optimize => 1,
            VertexState::Constrain => 2,
        }
    }

    /// Applies `next` only if it is a forward transition.
    ///
    /// Returns `true` if the state changed; regressions leave the state
    /// untouched.
    pub fn advance(&mut self, next: VertexState) -> bool {
        if next.rank() > self.rank() {
            *self = next;
            true
        } else {
            false
        }
    }
}

/// Per-vertex simulation record, owned by the simulation and keyed by
/// [`crate::types::VertexId`].
#[derive(Clone, Debug)]
pub struct Vertex {
    pub pos: Vec3,
    pub state: VertexState,
    pub sight_radius: f32,
    pub connection_radius: f32,
    pub repulsion_radius: f32,
    pub repulsion_strength: f32,
}

impl Vertex {
    /// Creates a search-state vertex at `pos` with radii stamped from `cfg`.
    pub fn at(pos: Vec3, cfg: &Config) -> Self {
        Self {
            pos,
            state: VertexState::Search,
            sight_radius: cfg.sight_radius,
            connection_radius: cfg.connection_radius,
            repulsion_radius: cfg.repulsion_radius,
            repulsion_strength: cfg.repulsion_strength,
        }
    }
}
