use spatial_connect::connection::{ConnectionCreatorInit, ConnectionType};
use spatial_connect::geometry::{Periodicity, Position};
use spatial_connect::mask::Mask;
use spatial_connect::rng::DeterministicRngProvider;
use spatial_connect::sink::{InMemoryNodeManager, InMemorySynapseRegistry, NodeId, RecordingSink, SynapseDefaults};
use spatial_connect::{Layer, Parameter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Target-driven connection generation over a 5x4 grid, box mask");

    let gids: Vec<NodeId> = (0..20).map(NodeId).collect();
    let layer = Layer::new_grid(4, 5, 1, Position::D2([-2.5, -2.0]), Position::D2([5.0, 4.0]), Periodicity::NONE, gids)?;

    let mask = Mask::Box {
        lower_left: Position::D2([-1.0, -1.0]),
        upper_right: Position::D2([1.0, 1.0]),
        azimuth: 0.0,
        polar: 0.0,
    };

    let mut registry = InMemorySynapseRegistry::new();
    let synapse = registry.register("static_synapse", SynapseDefaults { weight: 1.0, has_delay: true, delay: 1.0 });

    let creator = ConnectionCreatorInit::new(ConnectionType::PairwiseBernoulliOnSource, "static_synapse")
        .with_mask(mask)
        .with_weight(Parameter::Constant(1.0))
        .with_delay(Parameter::Constant(1.5))
        .with_allow_autapses(false)
        .parse(&registry)?;

    let node_manager = InMemoryNodeManager::new(1);
    let rng_provider = DeterministicRngProvider::new(42);
    let sink = RecordingSink::new();

    creator.connect(&layer, &layer, &node_manager, &rng_provider, &sink)?;

    println!("emitted {} edges via synapse model {:?}", sink.len(), synapse);
    Ok(())
}
