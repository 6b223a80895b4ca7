//! Fixed out-degree (Divergent) strategy (§4.7.4): every source node (not
//! just locally hosted ones) samples `number_of_connections` targets,
//! driven by the shared global RNG so every process reaches the same
//! decisions regardless of which targets happen to be local to it — the
//! sink is responsible for discarding edges whose target is not local.
//! Runs strictly sequentially, in gid order, since parallelizing would
//! desynchronize the shared RNG's draw order across processes.

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
        .ok_or_else(|| ConnectError::BadProperty("divergent strategy requires number_of_connections".into()))?;

    let mask = ctx.mask.clone().unwrap_or(Mask::All { dim: target_layer.dim() });
    let masked = MaskedLayer::new(target_layer, mask, ctx.allow_oversized_mask)?;
    let mut rng = rng_provider.get_global_rng();

    for &source in source_layer.gids() {
        if !passes_filter(node_manager, source_layer, ctx.source_filter, source) {
            continue;
        }
        let source_pos = match source_layer.position_of(source) {
            Some(p) => p,
            None => continue,
        };

        let mut candidates = masked.neighbors_of(&source_pos)?;
        candidates.retain(|(_, id)| passes_filter(node_manager, target_layer, ctx.target_filter, *id));
        if !ctx.allow_autapses {
            candidates.retain(|(_, id)| *id != source);
        }
        if candidates.is_empty() {
            return Err(ConnectError::InsufficientCandidates { driver: source, found: 0, needed: number_of_connections as usize });
        }
        if !ctx.allow_multapses && candidates.len() < number_of_connections as usize {
            return Err(ConnectError::InsufficientCandidates { driver: source, found: candidates.len(), needed: number_of_connections as usize });
        }

        let candidate_ids: Vec<_> = candidates.iter().map(|(_, id)| *id).collect();
        let weights: Vec<f64> = match ctx.kernel {
            Some(kernel) => candidates
                .iter()
                .map(|(pos, _)| {
                    let d = compute_displacement(&source_pos, pos, &target_layer.extent, target_layer.periodic)?;
                    kernel.raw_value(&d, &mut rng)
                })
                .collect::<ConnectResult<Vec<f64>>>()?,
            None => vec![1.0; candidates.len()],
        };
        let table = VoseAlias::build(&weights)?;

        let selected = sample_fixed_degree(&table, &candidate_ids, source, number_of_connections, ctx.allow_autapses, ctx.allow_multapses, &mut rng)?;

        for idx in selected {
            let (target_pos, target_id) = candidates[idx];
            let displacement = compute_displacement(&source_pos, &target_pos, &target_layer.extent, target_layer.periodic)?;
            let weight = ctx.weight.raw_value(&displacement, &mut rng)?;
            let delay = ctx.delay.raw_value(&displacement, &mut rng)?;
            sink.connect(source, target_id, weight, delay, ctx.synapse_model);
        }
    }
    Ok(())
}
