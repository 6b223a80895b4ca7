//! Source-driven strategy (§4.7.2): identical control flow to the
//! target-driven strategy, but the candidate search is attached to the
//! source layer in converse mode, so the mask stays defined in the
//! target's frame while running against the source's positions.

use super::{passes_filter, Context};
use crate::error::ConnectResult;
use crate::geometry::compute_displacement;
use crate::layer::Layer;
use crate::mask::Mask;
use crate::masked_layer::MaskedLayer;
use crate::rng::{Rng, RngProvider};
use crate::sink::{ConnectionSink, NodeManager};

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
    let mask = ctx.mask.clone().unwrap_or(Mask::All { dim: target_layer.dim() });
    let masked = MaskedLayer::new_converse(source_layer, target_layer, mask, ctx.allow_oversized_mask)?;

    let targets = node_manager.local_nodes_of_layer(target_layer.gids(), ctx.target_filter, &|n| target_layer.depth_of(n).unwrap_or(0));

    super::drive(targets, |target| {
        let target_pos = match target_layer.position_of(target) {
            Some(p) => p,
            None => return Ok(()),
        };
        let mut rng = rng_provider.get_rng(node_manager.get_thread(target));
        let candidates = masked.neighbors_of(&target_pos)?;

        for (source_pos, source_id) in candidates {
            if !ctx.allow_autapses && source_id == target {
                continue;
            }
            if !passes_filter(node_manager, source_layer, ctx.source_filter, source_id) {
                continue;
            }
            let displacement = compute_displacement(&source_pos, &target_pos, &target_layer.extent, target_layer.periodic)?;
            if let Some(kernel) = ctx.kernel {
                let p = kernel.raw_value(&displacement, &mut rng)?;
                if rng.uniform() >= p {
                    continue;
                }
            }
            let weight = ctx.weight.raw_value(&displacement, &mut rng)?;
            let delay = ctx.delay.raw_value(&displacement, &mut rng)?;
            sink.connect(source_id, target, weight, delay, ctx.synapse_model);
        }
        Ok(())
    })
}
