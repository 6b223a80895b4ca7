use spatial_connect::connection::{ConnectionCreatorInit, ConnectionType};
use spatial_connect::geometry::{Periodicity, Position};
use spatial_connect::mask::Mask;
use spatial_connect::rng::{DeterministicRng, DeterministicRngProvider, Rng};
use spatial_connect::sink::{InMemoryNodeManager, InMemorySynapseRegistry, NodeId, RecordingSink, SynapseDefaults};
use spatial_connect::{ConnectError, Layer, Parameter};

fn registry_with_static_synapse() -> (InMemorySynapseRegistry, &'static str) {
    let mut registry = InMemorySynapseRegistry::new();
    registry.register("static_synapse", SynapseDefaults { weight: 1.0, has_delay: true, delay: 1.0 });
    (registry, "static_synapse")
}

/// §8 scenario 1: grid 5x4 box mask, no kernel — the target at grid (2,2)
/// receives exactly its 3x3 neighbourhood minus itself.
#[test]
fn grid_box_mask_neighborhood_minus_self_is_eight() {
    let gids: Vec<NodeId> = (0..20).map(NodeId).collect();
    let layer = Layer::new_grid(4, 5, 1, Position::D2([-2.5, -2.0]), Position::D2([5.0, 4.0]), Periodicity::NONE, gids).unwrap();
    let target = NodeId(12); // row 2, col 2

    let mask = Mask::Box { lower_left: Position::D2([-1.0, -1.0]), upper_right: Position::D2([1.0, 1.0]), azimuth: 0.0, polar: 0.0 };
    let (registry, synapse) = registry_with_static_synapse();
    let creator = ConnectionCreatorInit::new(ConnectionType::PairwiseBernoulliOnSource, synapse)
        .with_mask(mask)
        .with_allow_autapses(false)
        .parse(&registry)
        .unwrap();

    let node_manager = InMemoryNodeManager::new(1);
    let rng_provider = DeterministicRngProvider::new(1);
    let sink = RecordingSink::new();
    creator.connect(&layer, &layer, &node_manager, &rng_provider, &sink).unwrap();

    let to_target: Vec<_> = sink.edges().into_iter().filter(|(_, tgt, ..)| *tgt == target).collect();
    assert_eq!(to_target.len(), 8);
    assert!(to_target.iter().all(|(src, ..)| *src != target));
}

/// §8 scenario 3 (single-seed sanity check, not the full 10000-seed sweep):
/// fixed in-degree 10 with a Gaussian kernel concentrates sources near the
/// target and produces exactly 10 distinct edges.
#[test]
fn convergent_gaussian_kernel_produces_exactly_the_requested_indegree() {
    let mut seed_rng = DeterministicRng::seeded(99);
    let mut positions = Vec::with_capacity(1000);
    let mut gids = Vec::with_capacity(1000);
    for i in 0..1000 {
        let x = -1.0 + 2.0 * seed_rng.uniform();
        let y = -1.0 + 2.0 * seed_rng.uniform();
        positions.push(Position::D2([x, y]));
        gids.push(NodeId(i));
    }
    let sources = Layer::new_free(positions, Position::D2([-1.0, -1.0]), Position::D2([2.0, 2.0]), Periodicity::NONE, gids).unwrap();
    let target_gid = NodeId(1000);
    let targets = Layer::new_free(vec![Position::D2([0.0, 0.0])], Position::D2([-1.0, -1.0]), Position::D2([2.0, 2.0]), Periodicity::NONE, vec![target_gid]).unwrap();

    let mask = Mask::Box { lower_left: Position::D2([-1.0, -1.0]), upper_right: Position::D2([1.0, 1.0]), azimuth: 0.0, polar: 0.0 };
    let kernel = Parameter::Gaussian { p_center: 1.0, mean: 0.0, sigma: 0.3, c: 0.0 };
    let (registry, synapse) = registry_with_static_synapse();
    let creator = ConnectionCreatorInit::new(ConnectionType::PairwiseBernoulliOnSource, synapse)
        .with_mask(mask)
        .with_kernel(kernel)
        .with_number_of_connections(10)
        .with_allow_multapses(false)
        .parse(&registry)
        .unwrap();

    let node_manager = InMemoryNodeManager::new(1);
    let rng_provider = DeterministicRngProvider::new(5);
    let sink = RecordingSink::new();
    creator.connect(&sources, &targets, &node_manager, &rng_provider, &sink).unwrap();

    let edges = sink.edges();
    assert_eq!(edges.len(), 10);
    let mut distinct: Vec<NodeId> = edges.iter().map(|(src, ..)| *src).collect();
    distinct.sort();
    distinct.dedup();
    assert_eq!(distinct.len(), 10);
}

#[test]
fn fixed_indegree_with_too_few_candidates_is_insufficient_candidates_error() {
    let gids: Vec<NodeId> = (0..3).map(NodeId).collect();
    let sources = Layer::new_free(
        vec![Position::D2([0.1, 0.1]), Position::D2([0.2, 0.2]), Position::D2([0.3, 0.3])],
        Position::D2([-1.0, -1.0]),
        Position::D2([2.0, 2.0]),
        Periodicity::NONE,
        gids,
    )
    .unwrap();
    let targets = Layer::new_free(vec![Position::D2([0.0, 0.0])], Position::D2([-1.0, -1.0]), Position::D2([2.0, 2.0]), Periodicity::NONE, vec![NodeId(100)]).unwrap();

    let (registry, synapse) = registry_with_static_synapse();
    let creator = ConnectionCreatorInit::new(ConnectionType::PairwiseBernoulliOnSource, synapse)
        .with_number_of_connections(10)
        .with_allow_multapses(false)
        .parse(&registry)
        .unwrap();

    let node_manager = InMemoryNodeManager::new(1);
    let rng_provider = DeterministicRngProvider::new(1);
    let sink = RecordingSink::new();
    let err = creator.connect(&sources, &targets, &node_manager, &rng_provider, &sink).unwrap_err();
    assert!(matches!(err, ConnectError::InsufficientCandidates { .. }));
}

#[test]
fn divergent_same_seed_is_independent_of_thread_count() {
    let gids: Vec<NodeId> = (0..30).map(NodeId).collect();
    let layer = Layer::new_grid(5, 6, 1, Position::D2([0.0, 0.0]), Position::D2([5.0, 6.0]), Periodicity::NONE, gids).unwrap();

    let (registry, synapse) = registry_with_static_synapse();
    let creator = ConnectionCreatorInit::new(ConnectionType::PairwiseBernoulliOnTarget, synapse)
        .with_number_of_connections(4)
        .with_allow_multapses(false)
        .parse(&registry)
        .unwrap();

    let sink_a = RecordingSink::new();
    creator
        .connect(&layer, &layer, &InMemoryNodeManager::new(1), &DeterministicRngProvider::new(123), &sink_a)
        .unwrap();
    let sink_b = RecordingSink::new();
    creator
        .connect(&layer, &layer, &InMemoryNodeManager::new(7), &DeterministicRngProvider::new(123), &sink_b)
        .unwrap();

    let mut a = sink_a.edges();
    let mut b = sink_b.edges();
    a.sort_by_key(|(s, t, ..)| (s.0, t.0));
    b.sort_by_key(|(s, t, ..)| (s.0, t.0));
    assert_eq!(a.len(), b.len());
    for (ea, eb) in a.iter().zip(b.iter()) {
        assert_eq!(ea.0, eb.0);
        assert_eq!(ea.1, eb.1);
    }
}
