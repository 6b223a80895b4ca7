//! External collaborators (§6): the node manager, synapse model registry and
//! connection sink that the engine drives but never owns. The core only
//! depends on these four narrow interfaces; everything else about the
//! surrounding simulator — the scripting front end, MPI/thread fan-out,
//! connectome storage — is out of scope per §1.

use serde::{Deserialize, Serialize};

/// Opaque node handle supplied by the external node manager. Two distinct
/// nodes never share an id; the engine never interprets the value beyond
/// equality and use as a map/vector key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Thread identifier used to partition driver nodes across worker threads
/// (§5: "parallel threads with data partitioning by driver node").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub u32);

/// Opaque identifier for a synapse model, resolved from a name by a
/// [`SynapseModelRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SynapseModelId(pub u32);

/// Default weight/delay dictionary carried by a registered synapse model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynapseDefaults {
    pub weight: f64,
    pub has_delay: bool,
    pub delay: f64,
}

/// The node manager collaborator (§6): locality, thread affinity, model id
/// lookup and per-layer local-node enumeration.
pub trait NodeManager: Send + Sync {
    fn is_local(&self, node: NodeId) -> bool;
    fn get_thread(&self, node: NodeId) -> ThreadId;
    fn get_model_id(&self, node: NodeId) -> u32;

    /// Nodes of `gids` that are local to this process and pass `filter`
    /// (model id and/or depth, per [`crate::layer::Selector`]).
    fn local_nodes_of_layer(
        &self,
        gids: &[NodeId],
        filter: &crate::layer::Selector,
        depth_of: &dyn Fn(NodeId) -> u32,
    ) -> Vec<NodeId> {
        gids.iter()
            .copied()
            .filter(|&g| self.is_local(g))
            .filter(|&g| filter.model_id.map_or(true, |m| m == self.get_model_id(g)))
            .filter(|&g| filter.depth.map_or(true, |d| d == depth_of(g)))
            .collect()
    }
}

/// The synapse model registry collaborator (§6): name resolution plus
/// per-model defaults, used to fill `weight`/`delay` when a
/// [`crate::connection::ConnectionCreator`] config omits them (§4.8).
pub trait SynapseModelRegistry: Send + Sync {
    fn resolve(&self, name: &str) -> Option<SynapseModelId>;
    fn defaults(&self, model: SynapseModelId) -> SynapseDefaults;
}

/// The connection sink collaborator (§6): the simulation kernel's `connect`
/// entry point. Side-effecting, idempotency not required, may silently drop
/// edges whose target is non-local (used by the divergent strategy, which
/// iterates globally and lets the sink filter).
pub trait ConnectionSink: Send + Sync {
    fn connect(
        &self,
        source: NodeId,
        target: NodeId,
        weight: f64,
        delay: f64,
        synapse_model: SynapseModelId,
    );
}

/// An in-memory [`NodeManager`] reference implementation: every node is
/// local, thread affinity is `id % thread_count`, model id defaults to 0
/// unless overridden. Exists for tests and demos, never for production use
/// — a real simulator always supplies its own node manager (§1).
pub struct InMemoryNodeManager {
    thread_count: u32,
    model_ids: std::collections::HashMap<NodeId, u32>,
}

impl InMemoryNodeManager {
    pub fn new(thread_count: u32) -> Self {
        Self {
            thread_count: thread_count.max(1),
            model_ids: std::collections::HashMap::new(),
        }
    }

    pub fn set_model_id(&mut self, node: NodeId, model_id: u32) {
        self.model_ids.insert(node, model_id);
    }
}

impl NodeManager for InMemoryNodeManager {
    fn is_local(&self, _node: NodeId) -> bool {
        true
    }

    fn get_thread(&self, node: NodeId) -> ThreadId {
        ThreadId((node.0 % self.thread_count as u64) as u32)
    }

    fn get_model_id(&self, node: NodeId) -> u32 {
        self.model_ids.get(&node).copied().unwrap_or(0)
    }
}

/// An in-memory [`SynapseModelRegistry`]: a fixed table of named models with
/// their defaults, resolved by exact name match.
#[derive(Default)]
pub struct InMemorySynapseRegistry {
    models: Vec<(String, SynapseDefaults)>,
}

impl InMemorySynapseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, defaults: SynapseDefaults) -> SynapseModelId {
        let id = SynapseModelId(self.models.len() as u32);
        self.models.push((name.into(), defaults));
        id
    }
}

impl SynapseModelRegistry for InMemorySynapseRegistry {
    fn resolve(&self, name: &str) -> Option<SynapseModelId> {
        self.models
            .iter()
            .position(|(n, _)| n == name)
            .map(|i| SynapseModelId(i as u32))
    }

    fn defaults(&self, model: SynapseModelId) -> SynapseDefaults {
        self.models[model.0 as usize].1
    }
}

/// A recording [`ConnectionSink`] that appends every accepted edge to an
/// internal, lock-protected log. Useful for tests and demos that need to
/// inspect the emitted connectome; a real simulator's sink would instead
/// hand the edge to its synapse storage.
#[derive(Default)]
pub struct RecordingSink {
    edges: parking_lot::Mutex<Vec<(NodeId, NodeId, f64, f64, SynapseModelId)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edges(&self) -> Vec<(NodeId, NodeId, f64, f64, SynapseModelId)> {
        self.edges.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.edges.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ConnectionSink for RecordingSink {
    fn connect(&self, source: NodeId, target: NodeId, weight: f64, delay: f64, synapse_model: SynapseModelId) {
        self.edges.lock().push((source, target, weight, delay, synapse_model));
    }
}
