/// Identifier for a vertex in a [`crate::sim::Simulation`].
///
/// Handles are allocated by [`crate::sim::Simulation::add`] and never reused
/// after removal, so a stale handle fails lookups instead of silently
/// aliasing a newer vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub(crate) u64);
