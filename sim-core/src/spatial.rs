use glam::Vec3;
use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::types::VertexId;

/// Broad-phase neighbor query capability, supplied by the host.
///
/// `out` is cleared and then filled with every tracked entity within
/// `radius` of `pos`. The result may include the queried vertex itself, and
/// may include handles the simulation does not know about (a host index can
/// track other kinds of entities); behavior code filters both.
pub trait SpatialIndex {
    fn query_nearby(&self, pos: Vec3, radius: f32, out: &mut Vec<VertexId>);
}

/// Reference [`SpatialIndex`] backed by an R*-tree snapshot.
///
/// Bulk-load it from current positions at the start of a frame; every query
/// in that frame then sees one consistent snapshot, regardless of how
/// positions move during integration.
pub struct RTreeIndex {
    tree: RTree<GeomWithData<[f32; 3], VertexId>>,
}

impl RTreeIndex {
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (VertexId, Vec3)>,
    {
        let entries = points
            .into_iter()
            .map(|(id, pos)| GeomWithData::new(pos.to_array(), id))
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl SpatialIndex for RTreeIndex {
    fn query_nearby(&self, pos: Vec3, radius: f32, out: &mut Vec<VertexId>) {
        out.clear();
        let r2 = radius * radius;
        for entry in self.tree.locate_within_distance(pos.to_array(), r2) {
            out.push(entry.data);
        }
    }
}
