//! High-level per-frame passes for the graph-growth system.
//!
//! The update loop runs, over the whole vertex set:
//! 1. [`compute_phase`] — every vertex computes its desired direction into
//!    the [`InfluenceMap`]; connection candidates go to the
//!    [`ConnectionQueue`]. Reads only.
//! 2. [`connect_phase`] — queued requests are applied to the [`Graph`] in
//!    discovery order, firing the search → optimize transition where a
//!    degree reaches the cap.
//! 3. [`integrate_phase`] — own, neighbor, and repulsion influences combine
//!    into a position delta scaled by elapsed time.
//!
//! Keeping the passes separate guarantees that every decision in a frame is
//! based on one consistent snapshot of the graph, not on whatever earlier
//! vertices in the same sweep already changed.

use std::collections::HashMap;

use glam::Vec3;
use rand::Rng;

use crate::behavior;
use crate::config::Config;
use crate::graph::{ConnectOutcome, Graph};
use crate::influence_map::InfluenceMap;
use crate::queue::ConnectionQueue;
use crate::spatial::SpatialIndex;
use crate::types::VertexId;
use crate::vertex::{Vertex, VertexState};

/// Computes this frame's direction for every vertex.
///
/// The previous frame's influences are cleared first. Each vertex writes
/// only its own slot, so the pass could run per-vertex in parallel; graph
/// and positions are never mutated here.
///
/// ### Parameters
/// - `order` - Vertex ids in insertion order, for deterministic traversal.
/// - `vertices` - Per-vertex records, read-only.
/// - `graph` - Current adjacency, read-only.
/// - `index` - Spatial snapshot taken at the start of the frame.
/// - `cfg` - Global configuration.
/// - `influence` - Receives one direction per vertex.
/// - `queue` - Receives connection requests discovered while searching.
/// - `rng` - Randomness source for the optimize perturbation.
/// - `scratch` - Reusable buffer for spatial query results.
pub fn compute_phase(
    order: &[VertexId],
    vertices: &HashMap<VertexId, Vertex>,
    graph: &Graph,
    index: &dyn SpatialIndex,
    cfg: &Config,
    influence: &mut InfluenceMap,
    queue: &mut ConnectionQueue,
    rng: &mut impl Rng,
    scratch: &mut Vec<VertexId>,
) {
    influence.clear();
    for &id in order {
        let dir =
            behavior::compute_direction(id, vertices, graph, index, cfg, queue, rng, scratch);
        influence.set(id, dir);
    }
}

/// Applies the queued connection requests in discovery order.
///
/// A request whose endpoints are already connected is skipped; a request
/// whose endpoint saturated earlier in the same batch is dropped silently.
/// Every endpoint whose degree just reached `cfg.desired_degree` advances
/// from search to optimize — only that endpoint, not its partner.
pub fn connect_phase(
    vertices: &mut HashMap<VertexId, Vertex>,
    graph: &mut Graph,
    cfg: &Config,
    queue: &mut ConnectionQueue,
) {
    for (a, b) in queue.drain() {
        if graph.connected(a, b) {
            continue;
        }
        match graph.connect(a, b, cfg.desired_degree) {
            ConnectOutcome::Connected { saturated } => {
                tracing::debug!(?a, ?b, "edge added");
                for (id, full) in [(a, saturated[0]), (b, saturated[1])] {
                    if !full {
                        continue;
                    }
                    let v = vertices.get_mut(&id).expect("endpoint is tracked");
                    if v.state.advance(VertexState::Optimize) {
                        tracing::debug!(vertex = ?id, "degree cap reached, optimizing");
                    }
                }
            }
            ConnectOutcome::Rejected => {
                tracing::trace!(?a, ?b, "request dropped, endpoint at capacity");
            }
        }
    }
}

/// Moves every vertex by its combined influence.
///
/// For each vertex the translation is its own influence plus, for every
/// connected neighbor, the neighbor's influence twice: once scaled by the
/// speed matching the neighbor's state, once raw. Constrained neighbors
/// contribute nothing. A repulsion term is added on top and the total is
/// scaled by `dt`.
///
/// Translations are computed against pre-step positions for all vertices
/// and applied afterwards in one sweep, so traversal order cannot leak into
/// the result.
pub fn integrate_phase(
    order: &[VertexId],
    vertices: &mut HashMap<VertexId, Vertex>,
    graph: &Graph,
    index: &dyn SpatialIndex,
    cfg: &Config,
    influence: &InfluenceMap,
    dt: f32,
    scratch: &mut Vec<VertexId>,
) {
    let mut moves: Vec<(VertexId, Vec3)> = Vec::with_capacity(order.len());
    for &id in order {
        let mut translation = influence.get(id);
        for &e in graph.neighbors(id) {
            let weight = match vertices[&e].state {
                VertexState::Search => cfg.search_speed,
                VertexState::Optimize => cfg.optimize_speed,
                VertexState::Constrain => continue,
            };
            let dir = influence.get(e);
            // Neighbor influence lands twice: once weighted, once raw.
            translation += dir * weight + dir;
        }
        translation += behavior::repulse(id, vertices, index, scratch);
        moves.push((id, translation * dt));
    }

    for (id, delta) in moves {
        vertices
            .get_mut(&id)
            .expect("vertex in traversal order")
            .pos += delta;
    }
}
