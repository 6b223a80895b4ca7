//! `ConnectionCreator` (§4.7, §4.8): selects one of the four
//! connection-generation strategies and drives it against a source/target
//! layer pair. Construction follows an `Init → Parsed` pipeline;
//! `ConnectionCreatorParsed::connect` performs the final `Ready`-state
//! binding (dimension check, mask resolution) internally and then runs to
//! completion, matching §3's "constructed, run once, discarded" lifecycle.

pub mod convergent;
pub mod divergent;
pub mod source_driven;
pub mod target_driven;
pub mod vose;

use crate::error::{ConnectError, ConnectResult};
use crate::layer::{Layer, Selector};
use crate::mask::Mask;
use crate::parameter::Parameter;
use crate::rng::{Rng, RngProvider};
use crate::sink::{ConnectionSink, NodeId, NodeManager, SynapseModelId, SynapseModelRegistry};
use serde::{Deserialize, Serialize};

/// The two ways a dictionary-style configuration names its connection rule
/// (§4.8, §6); the concrete strategy is resolved together with whether
/// `number_of_connections` was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    PairwiseBernoulliOnSource,
    PairwiseBernoulliOnTarget,
}

/// The resolved connection-generation strategy (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    TargetDriven,
    SourceDriven,
    Convergent,
    Divergent,
}

fn decode_strategy(connection_type: ConnectionType, number_of_connections: Option<u32>) -> Strategy {
    match (connection_type, number_of_connections.is_some()) {
        (ConnectionType::PairwiseBernoulliOnSource, true) => Strategy::Convergent,
        (ConnectionType::PairwiseBernoulliOnSource, false) => Strategy::TargetDriven,
        (ConnectionType::PairwiseBernoulliOnTarget, true) => Strategy::Divergent,
        (ConnectionType::PairwiseBernoulliOnTarget, false) => Strategy::SourceDriven,
    }
}

/// Raw, user-facing configuration (`Init` state of §4.8's state machine).
pub struct ConnectionCreatorInit {
    connection_type: ConnectionType,
    number_of_connections: Option<u32>,
    allow_autapses: bool,
    allow_multapses: bool,
    allow_oversized_mask: bool,
    mask: Option<Mask>,
    kernel: Option<Parameter>,
    weight: Option<Parameter>,
    delay: Option<Parameter>,
    synapse_model: String,
    source_filter: Selector,
    target_filter: Selector,
}

impl ConnectionCreatorInit {
    pub fn new(connection_type: ConnectionType, synapse_model: impl Into<String>) -> Self {
        Self {
            connection_type,
            number_of_connections: None,
            allow_autapses: true,
            allow_multapses: true,
            allow_oversized_mask: false,
            mask: None,
            kernel: None,
            weight: None,
            delay: None,
            synapse_model: synapse_model.into(),
            source_filter: Selector::default(),
            target_filter: Selector::default(),
        }
    }

    pub fn with_number_of_connections(mut self, n: u32) -> Self {
        self.number_of_connections = Some(n);
        self
    }
    pub fn with_allow_autapses(mut self, v: bool) -> Self {
        self.allow_autapses = v;
        self
    }
    pub fn with_allow_multapses(mut self, v: bool) -> Self {
        self.allow_multapses = v;
        self
    }
    pub fn with_allow_oversized_mask(mut self, v: bool) -> Self {
        self.allow_oversized_mask = v;
        self
    }
    pub fn with_mask(mut self, mask: Mask) -> Self {
        self.mask = Some(mask);
        self
    }
    pub fn with_kernel(mut self, kernel: Parameter) -> Self {
        self.kernel = Some(kernel);
        self
    }
    pub fn with_weight(mut self, weight: Parameter) -> Self {
        self.weight = Some(weight);
        self
    }
    pub fn with_delay(mut self, delay: Parameter) -> Self {
        self.delay = Some(delay);
        self
    }
    pub fn with_source_filter(mut self, filter: Selector) -> Self {
        self.source_filter = filter;
        self
    }
    pub fn with_target_filter(mut self, filter: Selector) -> Self {
        self.target_filter = filter;
        self
    }

    /// Resolves the synapse model name, fills in omitted weight/delay from
    /// its defaults, validates every static `Parameter` constraint, and
    /// decodes the strategy table (§4.8). This is the `Init → Parsed`
    /// transition.
    pub fn parse(self, registry: &dyn SynapseModelRegistry) -> ConnectResult<ConnectionCreatorParsed> {
        let model_id = registry
            .resolve(&self.synapse_model)
            .ok_or_else(|| ConnectError::UnknownSynapseModel(self.synapse_model.clone()))?;
        let defaults = registry.defaults(model_id);

        let weight = self.weight.unwrap_or(Parameter::Constant(defaults.weight));
        let delay = self.delay.unwrap_or(Parameter::Constant(if defaults.has_delay { defaults.delay } else { f64::NAN }));

        weight.validate()?;
        delay.validate()?;
        if let Some(k) = &self.kernel {
            k.validate()?;
        }

        let strategy = decode_strategy(self.connection_type, self.number_of_connections);

        Ok(ConnectionCreatorParsed {
            strategy,
            number_of_connections: self.number_of_connections,
            allow_autapses: self.allow_autapses,
            allow_multapses: self.allow_multapses,
            allow_oversized_mask: self.allow_oversized_mask,
            mask: self.mask,
            kernel: self.kernel,
            weight,
            delay,
            synapse_model: model_id,
            source_filter: self.source_filter,
            target_filter: self.target_filter,
        })
    }
}

/// A fully resolved connection rule (`Parsed` state of §4.8). Immutable;
/// `connect` may be called any number of times against different layer
/// pairs, though the intended lifecycle (§3) is "run once, discard".
pub struct ConnectionCreatorParsed {
    strategy: Strategy,
    number_of_connections: Option<u32>,
    allow_autapses: bool,
    allow_multapses: bool,
    allow_oversized_mask: bool,
    mask: Option<Mask>,
    kernel: Option<Parameter>,
    weight: Parameter,
    delay: Parameter,
    synapse_model: SynapseModelId,
    source_filter: Selector,
    target_filter: Selector,
}

impl ConnectionCreatorParsed {
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Runs the resolved strategy against `(source_layer, target_layer)`
    /// to completion, emitting every accepted edge to `sink`. The `Ready`
    /// state of §4.8 is the validated bundle built at the top of this call
    /// (dimension check plus mask resolution); it is never exposed as a
    /// separate public type since nothing outlives a single `connect`.
    #[tracing::instrument(skip(self, source_layer, target_layer, node_manager, rng_provider, sink), fields(strategy = ?self.strategy))]
    pub fn connect<RP>(
        &self,
        source_layer: &Layer,
        target_layer: &Layer,
        node_manager: &(dyn NodeManager + Sync),
        rng_provider: &RP,
        sink: &(dyn ConnectionSink + Sync),
    ) -> ConnectResult<()>
    where
        RP: RngProvider + Sync,
        RP::R: Rng,
    {
        if source_layer.dim() != target_layer.dim() {
            return Err(ConnectError::DimensionMismatch {
                context: "ConnectionCreatorParsed::connect".into(),
                expected: source_layer.dim(),
                found: target_layer.dim(),
            });
        }
        tracing::debug!(strategy = ?self.strategy, "starting connect");

        let ctx = Context {
            mask: &self.mask,
            kernel: &self.kernel,
            weight: &self.weight,
            delay: &self.delay,
            synapse_model: self.synapse_model,
            allow_autapses: self.allow_autapses,
            allow_multapses: self.allow_multapses,
            allow_oversized_mask: self.allow_oversized_mask,
            number_of_connections: self.number_of_connections,
            source_filter: &self.source_filter,
            target_filter: &self.target_filter,
        };

        match self.strategy {
            Strategy::TargetDriven => target_driven::run(source_layer, target_layer, &ctx, node_manager, rng_provider, sink),
            Strategy::SourceDriven => source_driven::run(source_layer, target_layer, &ctx, node_manager, rng_provider, sink),
            Strategy::Convergent => convergent::run(source_layer, target_layer, &ctx, node_manager, rng_provider, sink),
            Strategy::Divergent => divergent::run(source_layer, target_layer, &ctx, node_manager, rng_provider, sink),
        }
    }
}

/// Everything a strategy needs besides the two layers and the external
/// collaborators, bundled so each strategy module takes one argument
/// instead of a dozen.
pub(crate) struct Context<'a> {
    pub mask: &'a Option<Mask>,
    pub kernel: &'a Option<Parameter>,
    pub weight: &'a Parameter,
    pub delay: &'a Parameter,
    pub synapse_model: SynapseModelId,
    pub allow_autapses: bool,
    pub allow_multapses: bool,
    pub allow_oversized_mask: bool,
    pub number_of_connections: Option<u32>,
    pub source_filter: &'a Selector,
    pub target_filter: &'a Selector,
}

pub(crate) fn passes_filter(node_manager: &dyn NodeManager, layer: &Layer, filter: &Selector, node: NodeId) -> bool {
    filter.model_id.map_or(true, |m| m == node_manager.get_model_id(node)) && filter.depth.map_or(true, |d| layer.depth_of(node) == Some(d))
}

/// Runs `f` over every item, in parallel over driver nodes when the
/// `rayon` feature is enabled (§5's "parallel threads with data
/// partitioning by driver node"), serially otherwise. Short-circuits on the
/// first error.
pub(crate) fn drive<T, F>(items: Vec<T>, f: F) -> ConnectResult<()>
where
    T: Send,
    F: Fn(T) -> ConnectResult<()> + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        items.into_par_iter().try_for_each(f)
    }
    #[cfg(not(feature = "rayon"))]
    {
        items.into_iter().try_for_each(f)
    }
}

/// Picks `number_of_connections` indices from `table`, honoring the
/// autapse/multapse policy (§4.7's shared pre-flight and redraw logic).
/// `candidate_id` maps a candidate index back to its `NodeId` so autapses
/// can be detected; `driver` is the node the draw must not collide with
/// when autapses are forbidden.
pub(crate) fn sample_fixed_degree(
    table: &vose::VoseAlias,
    candidate_ids: &[NodeId],
    driver: NodeId,
    number_of_connections: u32,
    allow_autapses: bool,
    allow_multapses: bool,
    rng: &mut dyn Rng,
) -> ConnectResult<Vec<usize>> {
    let n = candidate_ids.len();
    if n == 0 {
        return Err(ConnectError::InsufficientCandidates { driver, found: 0, needed: number_of_connections as usize });
    }
    if !allow_autapses && n == 1 && candidate_ids[0] == driver {
        return Err(ConnectError::InsufficientCandidates { driver, found: 0, needed: number_of_connections as usize });
    }
    if !allow_multapses && n < number_of_connections as usize {
        return Err(ConnectError::InsufficientCandidates { driver, found: n, needed: number_of_connections as usize });
    }

    let mut selected = Vec::with_capacity(number_of_connections as usize);
    let mut is_selected = vec![false; n];
    let max_attempts = (number_of_connections as usize).saturating_mul(1000).max(10_000);
    let mut attempts = 0;
    while selected.len() < number_of_connections as usize {
        attempts += 1;
        if attempts > max_attempts {
            return Err(ConnectError::InsufficientCandidates { driver, found: selected.len(), needed: number_of_connections as usize });
        }
        let idx = table.draw(rng);
        if !allow_autapses && candidate_ids[idx] == driver {
            continue;
        }
        if !allow_multapses {
            if is_selected[idx] {
                continue;
            }
            is_selected[idx] = true;
        }
        selected.push(idx);
    }
    Ok(selected)
}
