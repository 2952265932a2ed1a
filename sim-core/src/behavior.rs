//! Per-state direction computation for vertices.
//!
//! [`compute_direction`] dispatches on the vertex's current state. None of
//! the functions here mutate the graph or any position; the only side effect
//! is that [`search`] records connection candidates in the
//! [`ConnectionQueue`], so no vertex acts on topology that is still being
//! decided within the same frame.

use std::collections::HashMap;

use glam::Vec3;
use rand::Rng;

use crate::config::Config;
use crate::graph::Graph;
use crate::queue::ConnectionQueue;
use crate::spatial::SpatialIndex;
use crate::types::VertexId;
use crate::vertex::{Vertex, VertexState};

/// Computes the desired movement direction for one vertex this frame.
///
/// ### Parameters
/// - `id` - The vertex to compute for; must be present in `vertices`.
/// - `vertices` - All per-vertex records, read-only.
/// - `graph` - Current adjacency, read-only.
/// - `index` - Spatial snapshot for this frame.
/// - `cfg` - Global configuration (target angles, perturbation).
/// - `queue` - Receives connection requests discovered while searching.
/// - `rng` - Randomness source for the optimize perturbation.
/// - `scratch` - Reusable buffer for spatial query results.
///
/// ### Returns
/// A unit direction, or the zero vector when the vertex has nothing to do.
pub fn compute_direction(
    id: VertexId,
    vertices: &HashMap<VertexId, Vertex>,
    graph: &Graph,
    index: &dyn SpatialIndex,
    cfg: &Config,
    queue: &mut ConnectionQueue,
    rng: &mut impl Rng,
    scratch: &mut Vec<VertexId>,
) -> Vec3 {
    match vertices[&id].state {
        VertexState::Search => search(id, vertices, graph, index, queue, scratch),
        VertexState::Optimize => optimize(id, vertices, graph, cfg, rng),
        VertexState::Constrain => constrain(),
    }
}

/// Looks for connection partners within sight.
///
/// Candidates beyond the connection radius pull the vertex toward them;
/// candidates in reach are queued for the connect pass instead of being
/// linked on the spot, so the scan never observes a half-updated graph and
/// the same pair is never processed from both sides.
///
/// ### Returns
/// The normalized sum of steering contributions, or zero when there is
/// nothing to steer toward.
pub fn search(
    id: VertexId,
    vertices: &HashMap<VertexId, Vertex>,
    graph: &Graph,
    index: &dyn SpatialIndex,
    queue: &mut ConnectionQueue,
    scratch: &mut Vec<VertexId>,
) -> Vec3 {
    let vertex = &vertices[&id];
    index.query_nearby(vertex.pos, vertex.sight_radius, scratch);

    let mut steering = Vec3::ZERO;
    for &cand_id in scratch.iter() {
        // State is authoritative over an in-flight scan: a vertex that is no
        // longer searching discards whatever it accumulated.
        if vertices[&id].state != VertexState::Search {
            return Vec3::ZERO;
        }
        if cand_id == id {
            continue;
        }
        // The index may track entities that are not simulation vertices.
        let Some(cand) = vertices.get(&cand_id) else {
            continue;
        };
        if cand.state != VertexState::Search || graph.connected(id, cand_id) {
            continue;
        }

        if vertex.pos.distance(cand.pos) > vertex.connection_radius {
            steering += (cand.pos - vertex.pos).normalize_or_zero();
        } else {
            queue.enqueue(id, cand_id);
        }
    }

    steering.normalize_or_zero()
}

/// Picks a nudge direction that brings the angles between existing edges
/// closer to the configured targets.
///
/// Candidate directions are the unit vectors toward each neighbor plus the
/// normalized bisector of each consecutive pair (adjacency order as stored),
/// so the optimizer can also settle "between" edges. For every candidate,
/// every ordered neighbor pair `(i, k)` including `i == k`, and every target
/// angle, the signed difference between the angle seen from the hypothetical
/// position and the target is compared; the candidate with the smallest
/// difference overall wins. The winner is nudged on one axis by a small
/// random offset and renormalized, so symmetric configurations cannot lock
/// in place.
///
/// ### Returns
/// The perturbed unit direction, or zero when the vertex has fewer than two
/// neighbors.
pub fn optimize(
    id: VertexId,
    vertices: &HashMap<VertexId, Vertex>,
    graph: &Graph,
    cfg: &Config,
    rng: &mut impl Rng,
) -> Vec3 {
    let vertex = &vertices[&id];
    let neighbors = graph.neighbors(id);

    let dirs: Vec<Vec3> = neighbors
        .iter()
        .map(|n| (vertices[n].pos - vertex.pos).normalize_or_zero())
        .collect();

    // Fewer than two edges leave nothing to balance.
    if dirs.len() < 2 {
        return Vec3::ZERO;
    }

    let mut candidates = dirs.clone();
    for pair in dirs.windows(2) {
        candidates.push(((pair[0] + pair[1]) * 0.5).normalize_or_zero());
    }

    let mut best = Vec3::ZERO;
    let mut min_diff = f32::INFINITY;
    for &cand in &candidates {
        let eye = vertex.pos + cand;
        for &i in neighbors {
            for &k in neighbors {
                let angle = relative_angle_deg(eye, vertices[&i].pos, vertices[&k].pos);
                for &target in &cfg.desired_angles {
                    let diff = angle - target;
                    if diff < min_diff {
                        min_diff = diff;
                        best = cand;
                    }
                }
            }
        }
    }

    best.x += rng.random_range(-cfg.perturbation..=cfg.perturbation);
    best.normalize_or_zero()
}

/// Reserved constraint-resolution hook; inert.
pub fn constrain() -> Vec3 {
    Vec3::ZERO
}

/// Pushes the vertex away from everything inside its repulsion radius.
///
/// Raw offsets are accumulated and the sum normalized, so the result is a
/// unit direction scaled by the vertex's repulsion strength, or zero for an
/// isolated vertex.
pub fn repulse(
    id: VertexId,
    vertices: &HashMap<VertexId, Vertex>,
    index: &dyn SpatialIndex,
    scratch: &mut Vec<VertexId>,
) -> Vec3 {
    let vertex = &vertices[&id];
    index.query_nearby(vertex.pos, vertex.repulsion_radius, scratch);

    let mut away = Vec3::ZERO;
    for &other_id in scratch.iter() {
        if other_id == id {
            continue;
        }
        let Some(other) = vertices.get(&other_id) else {
            continue;
        };
        away += vertex.pos - other.pos;
    }

    away.normalize_or_zero() * vertex.repulsion_strength
}

/// Angle in degrees between the rays `origin → a` and `origin → b`.
///
/// A ray of zero length (a point coinciding with `origin`) yields 0° rather
/// than propagating a NaN out of the normalization.
fn relative_angle_deg(origin: Vec3, a: Vec3, b: Vec3) -> f32 {
    let da = (a - origin).normalize_or_zero();
    let db = (b - origin).normalize_or_zero();
    if da == Vec3::ZERO || db == Vec3::ZERO {
        return 0.0;
    }
    da.angle_between(db).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::RTreeIndex;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn setup(positions: &[Vec3]) -> (HashMap<VertexId, Vertex>, Graph, Vec<VertexId>, Config) {
        let cfg = Config::default();
        let mut vertices = HashMap::new();
        let mut graph = Graph::new();
        let mut ids = Vec::new();
        for (i, &pos) in positions.iter().enumerate() {
            let id = VertexId(i as u64);
            vertices.insert(id, Vertex::at(pos, &cfg));
            graph.insert(id);
            ids.push(id);
        }
        (vertices, graph, ids, cfg)
    }

    fn index_of(vertices: &HashMap<VertexId, Vertex>) -> RTreeIndex {
        RTreeIndex::from_points(vertices.iter().map(|(&id, v)| (id, v.pos)))
    }

    #[test]
    fn search_steers_toward_peer_out_of_connection_range() {
        // In sight (10) but beyond connection range (2).
        let (vertices, graph, ids, _cfg) =
            setup(&[Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0)]);
        let index = index_of(&vertices);
        let mut queue = ConnectionQueue::new();
        let mut scratch = Vec::new();

        let dir_a = search(ids[0], &vertices, &graph, &index, &mut queue, &mut scratch);
        let dir_b = search(ids[1], &vertices, &graph, &index, &mut queue, &mut scratch);

        // Both steer toward each other and nothing is queued yet.
        assert_eq!(dir_a, Vec3::X);
        assert_eq!(dir_b, -Vec3::X);
        assert!(queue.is_empty());
    }

    #[test]
    fn search_queues_exactly_one_request_in_connection_range() {
        let (vertices, graph, ids, _cfg) =
            setup(&[Vec3::ZERO, Vec3::new(1.5, 0.0, 0.0)]);
        let index = index_of(&vertices);
        let mut queue = ConnectionQueue::new();
        let mut scratch = Vec::new();

        let dir_a = search(ids[0], &vertices, &graph, &index, &mut queue, &mut scratch);
        let dir_b = search(ids[1], &vertices, &graph, &index, &mut queue, &mut scratch);

        // In reach: no steering, one deferred request for the pair, and no
        // edge yet.
        assert_eq!(dir_a, Vec3::ZERO);
        assert_eq!(dir_b, Vec3::ZERO);
        assert_eq!(queue.len(), 1);
        assert!(!graph.connected(ids[0], ids[1]));
    }

    #[test]
    fn search_ignores_connected_and_non_searching_peers() {
        let (mut vertices, mut graph, ids, _cfg) = setup(&[
            Vec3::ZERO,
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(0.0, 3.0, 0.0),
        ]);

        // ids[1] is already connected, ids[2] is no longer searching.
        graph.connect(ids[0], ids[1], 4);
        vertices
            .get_mut(&ids[2])
            .unwrap()
            .state
            .advance(VertexState::Optimize);

        let index = index_of(&vertices);
        let mut queue = ConnectionQueue::new();
        let mut scratch = Vec::new();

        let dir = search(ids[0], &vertices, &graph, &index, &mut queue, &mut scratch);

        assert_eq!(dir, Vec3::ZERO);
        assert!(queue.is_empty());
    }

    #[test]
    fn search_returns_zero_when_no_longer_searching() {
        let (mut vertices, graph, ids, _cfg) =
            setup(&[Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0)]);
        vertices
            .get_mut(&ids[0])
            .unwrap()
            .state
            .advance(VertexState::Optimize);

        let index = index_of(&vertices);
        let mut queue = ConnectionQueue::new();
        let mut scratch = Vec::new();

        let dir = search(ids[0], &vertices, &graph, &index, &mut queue, &mut scratch);

        assert_eq!(dir, Vec3::ZERO);
    }

    #[test]
    fn optimize_with_fewer_than_two_neighbors_is_zero() {
        let (vertices, mut graph, ids, cfg) =
            setup(&[Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)]);
        let mut rng = StdRng::seed_from_u64(0);

        // No neighbors.
        assert_eq!(optimize(ids[0], &vertices, &graph, &cfg, &mut rng), Vec3::ZERO);

        // One neighbor.
        graph.connect(ids[0], ids[1], 4);
        assert_eq!(optimize(ids[0], &vertices, &graph, &cfg, &mut rng), Vec3::ZERO);
    }

    #[test]
    fn optimize_is_deterministic_under_a_fixed_seed() {
        // Two neighbors at a right angle, targets {36, 72, 108}.
        let (vertices, mut graph, ids, cfg) = setup(&[
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]);
        graph.connect(ids[0], ids[1], 3);
        graph.connect(ids[0], ids[2], 3);

        let mut rng_a = StdRng::seed_from_u64(0);
        let mut rng_b = StdRng::seed_from_u64(0);
        let a = optimize(ids[0], &vertices, &graph, &cfg, &mut rng_a);
        let b = optimize(ids[0], &vertices, &graph, &cfg, &mut rng_b);

        assert_eq!(a, b);
        assert!(a.is_finite());
        assert!((a.length() - 1.0).abs() < 1e-4, "result is a unit vector");
    }

    #[test]
    fn constrain_is_inert() {
        assert_eq!(constrain(), Vec3::ZERO);
    }

    #[test]
    fn repulse_on_isolated_vertex_is_zero() {
        let (vertices, _graph, ids, _cfg) = setup(&[Vec3::ZERO]);
        let index = index_of(&vertices);
        let mut scratch = Vec::new();

        // The query returns the vertex itself, which must not repel it.
        let dir = repulse(ids[0], &vertices, &index, &mut scratch);

        assert_eq!(dir, Vec3::ZERO);
    }

    #[test]
    fn repulse_points_away_from_crowding_peers() {
        let (vertices, _graph, ids, cfg) =
            setup(&[Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)]);
        let index = index_of(&vertices);
        let mut scratch = Vec::new();

        let dir = repulse(ids[0], &vertices, &index, &mut scratch);

        assert_eq!(dir, -Vec3::X * cfg.repulsion_strength);
    }

    #[test]
    fn relative_angle_handles_degenerate_rays() {
        let p = Vec3::new(1.0, 0.0, 0.0);
        // One ray collapses onto the origin.
        assert_eq!(relative_angle_deg(p, p, Vec3::ZERO), 0.0);

        let right = relative_angle_deg(Vec3::ZERO, Vec3::X, Vec3::Y);
        assert!((right - 90.0).abs() < 1e-3);
    }
}
