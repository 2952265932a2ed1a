use std::collections::HashMap;

use glam::Vec3;

use crate::types::VertexId;

/// Transient map from vertex to the movement direction computed for it this
/// frame.
///
/// The map is populated entirely during the compute pass (each vertex writes
/// only its own slot), consumed during the integrate pass, and cleared at the
/// start of the next frame. Nothing in it survives a frame boundary.
#[derive(Debug, Default)]
pub struct InfluenceMap {
    dirs: HashMap<VertexId, Vec3>,
}

impl InfluenceMap {
    pub fn new() -> Self {
        Self {
            dirs: HashMap::new(),
        }
    }

    /// Drops all entries from the previous frame, keeping capacity.
    pub fn clear(&mut self) {
        self.dirs.clear();
    }

    /// Records the direction computed for `id` this frame.
    ///
    /// Each vertex owns exactly one slot; writing twice overwrites.
    #[inline]
    pub fn set(&mut self, id: VertexId, dir: Vec3) {
        self.dirs.insert(id, dir);
    }

    /// Returns the recorded direction for `id`, or zero for a vertex that
    /// has not been computed this frame.
    #[inline]
    pub fn get(&self, id: VertexId) -> Vec3 {
        self.dirs.get(&id).copied().unwrap_or(Vec3::ZERO)
    }

    /// True if `id` has a recorded direction this frame.
    #[inline]
    pub fn is_influenced(&self, id: VertexId) -> bool {
        self.dirs.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}
