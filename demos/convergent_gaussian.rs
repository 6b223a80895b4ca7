use spatial_connect::connection::{ConnectionCreatorInit, ConnectionType};
use spatial_connect::geometry::{Periodicity, Position};
use spatial_connect::mask::Mask;
use spatial_connect::rng::{DeterministicRng, DeterministicRngProvider, Rng};
use spatial_connect::sink::{InMemoryNodeManager, InMemorySynapseRegistry, NodeId, RecordingSink, SynapseDefaults};
use spatial_connect::{Layer, Parameter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Fixed in-degree convergent connections with a Gaussian kernel");

    let mut rng = DeterministicRng::seeded(7);
    let mut positions = Vec::with_capacity(1000);
    let mut gids = Vec::with_capacity(1000);
    for i in 0..1000 {
        let x = -1.0 + 2.0 * rng.uniform();
        let y = -1.0 + 2.0 * rng.uniform();
        positions.push(Position::D2([x, y]));
        gids.push(NodeId(i));
    }
    let sources = Layer::new_free(positions, Position::D2([-1.0, -1.0]), Position::D2([2.0, 2.0]), Periodicity::NONE, gids)?;

    let target_gid = NodeId(1000);
    let targets = Layer::new_free(vec![Position::D2([0.0, 0.0])], Position::D2([-1.0, -1.0]), Position::D2([2.0, 2.0]), Periodicity::NONE, vec![target_gid])?;

    let mask = Mask::Box { lower_left: Position::D2([-1.0, -1.0]), upper_right: Position::D2([1.0, 1.0]), azimuth: 0.0, polar: 0.0 };
    let kernel = Parameter::Gaussian { p_center: 1.0, mean: 0.0, sigma: 0.3, c: 0.0 };

    let mut registry = InMemorySynapseRegistry::new();
    registry.register("static_synapse", SynapseDefaults { weight: 1.0, has_delay: false, delay: f64::NAN });

    let creator = ConnectionCreatorInit::new(ConnectionType::PairwiseBernoulliOnSource, "static_synapse")
        .with_mask(mask)
        .with_kernel(kernel)
        .with_number_of_connections(10)
        .with_allow_multapses(false)
        .with_weight(Parameter::Constant(1.0))
        .parse(&registry)?;

    let node_manager = InMemoryNodeManager::new(1);
    let rng_provider = DeterministicRngProvider::new(1);
    let sink = RecordingSink::new();

    creator.connect(&sources, &targets, &node_manager, &rng_provider, &sink)?;

    let mean_distance: f64 = sink
        .edges()
        .iter()
        .map(|(src, _, _, _, _)| sources.position_of(*src).unwrap().length())
        .sum::<f64>()
        / sink.len() as f64;
    println!("drew {} edges, mean source distance from target {:.4}", sink.len(), mean_distance);
    Ok(())
}
