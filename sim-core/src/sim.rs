//! The owning simulation state and its host-facing API.
//!
//! [`Simulation`] owns the vertex records, the adjacency [`Graph`], and the
//! per-frame buffers. The host drives it by building a spatial snapshot and
//! calling [`Simulation::step`] once per tick; presentation concerns (drawing
//! edges, cameras, seeding layouts) stay entirely on the host side.

use std::collections::HashMap;

use glam::Vec3;
use rand::Rng;
use thiserror::Error;

use crate::config::Config;
use crate::graph::Graph;
use crate::influence_map::InfluenceMap;
use crate::phases;
use crate::queue::ConnectionQueue;
use crate::spatial::{RTreeIndex, SpatialIndex};
use crate::types::VertexId;
use crate::vertex::{Vertex, VertexState};

/// Contract violations surfaced to the host.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimError {
    /// The handle does not name a live vertex in this simulation.
    #[error("unknown vertex {0:?}")]
    UnknownVertex(VertexId),
}

/// Owns the whole graph-growth state and drives the per-frame pipeline.
///
/// The typical host loop is:
/// 1. Build (or update) a [`SpatialIndex`] from current positions, e.g. via
///    [`Simulation::spatial_snapshot`].
/// 2. Call [`Simulation::step`] with the elapsed time and an RNG.
/// 3. Read positions and adjacency back out for presentation.
pub struct Simulation {
    cfg: Config,
    vertices: HashMap<VertexId, Vertex>,
    /// Ids in insertion order, for deterministic frame traversal.
    order: Vec<VertexId>,
    graph: Graph,
    influence: InfluenceMap,
    queue: ConnectionQueue,
    scratch: Vec<VertexId>,
    next_id: u64,
}

impl Simulation {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            vertices: HashMap::new(),
            order: Vec::new(),
            graph: Graph::new(),
            influence: InfluenceMap::new(),
            queue: ConnectionQueue::new(),
            scratch: Vec::new(),
            next_id: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Adds a vertex at `pos`: search state, empty adjacency, radii stamped
    /// from the configuration defaults.
    pub fn add(&mut self, pos: Vec3) -> VertexId {
        let id = VertexId(self.next_id);
        self.next_id += 1;

        self.vertices.insert(id, Vertex::at(pos, &self.cfg));
        self.order.push(id);
        self.graph.insert(id);
        tracing::debug!(vertex = ?id, ?pos, "vertex added");
        id
    }

    /// Removes a vertex, pruning the adjacency lists on both sides.
    ///
    /// An `Ok` return is the host's signal to destroy the backing entity; it
    /// fires exactly once per vertex, since the handle is dead afterwards.
    pub fn remove(&mut self, id: VertexId) -> Result<(), SimError> {
        if self.vertices.remove(&id).is_none() {
            return Err(SimError::UnknownVertex(id));
        }
        self.order.retain(|&v| v != id);
        self.graph.remove(id);
        tracing::debug!(vertex = ?id, "vertex removed");
        Ok(())
    }

    /// Ordered, read-only view of a vertex's neighbors.
    pub fn get_connected(&self, id: VertexId) -> Result<&[VertexId], SimError> {
        if !self.graph.contains(id) {
            return Err(SimError::UnknownVertex(id));
        }
        Ok(self.graph.neighbors(id))
    }

    /// Some vertex of the set, or `None` when empty.
    ///
    /// This is the first entry of an unordered map traversal: arbitrary, but
    /// NOT uniformly random. Callers that need statistical randomness must
    /// sample on their side.
    pub fn random_vertex(&self) -> Option<VertexId> {
        self.vertices.keys().next().copied()
    }

    pub fn vertex(&self, id: VertexId) -> Result<&Vertex, SimError> {
        self.vertices.get(&id).ok_or(SimError::UnknownVertex(id))
    }

    /// Mutable access to a vertex record, for per-vertex tuning of radii and
    /// repulsion strength.
    pub fn vertex_mut(&mut self, id: VertexId) -> Result<&mut Vertex, SimError> {
        self.vertices
            .get_mut(&id)
            .ok_or(SimError::UnknownVertex(id))
    }

    pub fn state(&self, id: VertexId) -> Result<VertexState, SimError> {
        self.vertex(id).map(|v| v.state)
    }

    pub fn position(&self, id: VertexId) -> Result<Vec3, SimError> {
        self.vertex(id).map(|v| v.pos)
    }

    pub fn set_position(&mut self, id: VertexId, pos: Vec3) -> Result<(), SimError> {
        self.vertex_mut(id).map(|v| v.pos = pos)
    }

    pub fn positions(&self) -> impl Iterator<Item = (VertexId, Vec3)> + '_ {
        self.vertices.iter().map(|(&id, v)| (id, v.pos))
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Builds an [`RTreeIndex`] over current positions, for hosts without a
    /// broad-phase of their own.
    pub fn spatial_snapshot(&self) -> RTreeIndex {
        RTreeIndex::from_points(self.positions())
    }

    /// Advances the simulation by one frame.
    ///
    /// Runs the compute, connect, and integrate passes in that order over
    /// the full vertex set. `index` must reflect positions as of the start
    /// of the frame; `dt` is the elapsed time since the previous step.
    pub fn step(&mut self, dt: f32, index: &dyn SpatialIndex, rng: &mut impl Rng) {
        phases::compute_phase(
            &self.order,
            &self.vertices,
            &self.graph,
            index,
            &self.cfg,
            &mut self.influence,
            &mut self.queue,
            rng,
            &mut self.scratch,
        );
        phases::connect_phase(&mut self.vertices, &mut self.graph, &self.cfg, &mut self.queue);
        phases::integrate_phase(
            &self.order,
            &mut self.vertices,
            &self.graph,
            index,
            &self.cfg,
            &self.influence,
            dt,
            &mut self.scratch,
        );
        tracing::trace!(vertices = self.len(), "frame complete");
    }
}
