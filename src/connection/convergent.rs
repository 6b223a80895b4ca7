//! Fixed in-degree (Convergent) strategy (§4.7.3): each locally hosted
//! target samples exactly `number_of_connections` sources from a weighted
//! candidate pool via the Vose alias method.

use super::{passes_filter, sample_fixed_degree, Context};
use crate::error::{ConnectError, ConnectResult};
use crate::geometry::compute_displacement;
use crate::layer::Layer;
use crate::mask::Mask;
use crate::masked_layer::MaskedLayer;
use crate::rng::{Rng, RngProvider};
use crate::sink::{ConnectionSink, NodeManager};

use super::vose::VoseAlias;

pub(crate) fn run<RP>(
    source_layer: &Layer,
    target_layer: &Layer,
    ctx: &Context,
    node_manager: &(dyn NodeManager + Sync),
    rng_provider: &RP,
    sink: &(dyn ConnectionSink + Sync),
) -> ConnectResult<()>
where
    RP: RngProvider + Sync,
    RP::R: Rng,
{
    let number_of_connections = ctx
        .number_of_connections
        .ok_or_else(|| ConnectError::BadProperty("convergent strategy requires number_of_connections".into()))?;

    let mask = ctx.mask.clone().unwrap_or(Mask::All { dim: source_layer.dim() });
    let masked = MaskedLayer::new(source_layer, mask, ctx.allow_oversized_mask)?;

    let targets = node_manager.local_nodes_of_layer(target_layer.gids(), ctx.target_filter, &|n| target_layer.depth_of(n).unwrap_or(0));

    super::drive(targets, |target| {
        let target_pos = match target_layer.position_of(target) {
            Some(p) => p,
            None => return Ok(()),
        };
        let mut rng = rng_provider.get_rng(node_manager.get_thread(target));

        let mut candidates = masked.neighbors_of(&target_pos)?;
        candidates.retain(|(_, id)| passes_filter(node_manager, source_layer, ctx.source_filter, *id));
        if !ctx.allow_autapses {
            candidates.retain(|(_, id)| *id != target);
        }
        if candidates.is_empty() {
            return Err(ConnectError::InsufficientCandidates { driver: target, found: 0, needed: number_of_connections as usize });
        }
        if !ctx.allow_multapses && candidates.len() < number_of_connections as usize {
            return Err(ConnectError::InsufficientCandidates { driver: target, found: candidates.len(), needed: number_of_connections as usize });
        }

        let candidate_ids: Vec<_> = candidates.iter().map(|(_, id)| *id).collect();
        let weights: Vec<f64> = match ctx.kernel {
            Some(kernel) => candidates
                .iter()
                .map(|(pos, _)| {
                    let d = compute_displacement(pos, &target_pos, &target_layer.extent, target_layer.periodic)?;
                    kernel.raw_value(&d, &mut rng)
                })
                .collect::<ConnectResult<Vec<f64>>>()?,
            None => vec![1.0; candidates.len()],
        };
        let table = VoseAlias::build(&weights)?;

        let selected = sample_fixed_degree(&table, &candidate_ids, target, number_of_connections, ctx.allow_autapses, ctx.allow_multapses, &mut rng)?;

        for idx in selected {
            let (source_pos, source_id) = candidates[idx];
            let displacement = compute_displacement(&source_pos, &target_pos, &target_layer.extent, target_layer.periodic)?;
            let weight = ctx.weight.raw_value(&displacement, &mut rng)?;
            let delay = ctx.delay.raw_value(&displacement, &mut rng)?;
            sink.connect(source_id, target, weight, delay, ctx.synapse_model);
        }
        Ok(())
    })
}
