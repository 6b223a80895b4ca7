use spatial_connect::geometry::{Periodicity, Position};
use spatial_connect::mask::Mask;
use spatial_connect::sink::NodeId;
use spatial_connect::Layer;

#[test]
fn grid_layer_depth_stacking_matches_gid_count() {
    let gids: Vec<NodeId> = (0..18).map(NodeId).collect();
    let layer = Layer::new_grid(3, 3, 2, Position::D2([0.0, 0.0]), Position::D2([3.0, 3.0]), Periodicity::NONE, gids).unwrap();
    assert_eq!(layer.len(), 18);
    assert_eq!(layer.depth_of(NodeId(0)), Some(0));
    assert_eq!(layer.depth_of(NodeId(9)), Some(1));
}

#[test]
fn grid_layer_rejects_depth_zero() {
    let gids: Vec<NodeId> = (0..9).map(NodeId).collect();
    let err = Layer::new_grid(3, 3, 0, Position::D2([0.0, 0.0]), Position::D2([3.0, 3.0]), Periodicity::NONE, gids).unwrap_err();
    assert!(matches!(err, spatial_connect::ConnectError::BadProperty(_)));
}

#[test]
fn free_layer_rejects_position_outside_extent() {
    let positions = vec![Position::D2([20.0, 20.0])];
    let gids = vec![NodeId(0)];
    let err = Layer::new_free(positions, Position::D2([0.0, 0.0]), Position::D2([10.0, 10.0]), Periodicity::NONE, gids).unwrap_err();
    assert!(matches!(err, spatial_connect::ConnectError::BadProperty(_)));
}

#[test]
fn free_layer_rejects_position_on_periodic_perimeter() {
    let positions = vec![Position::D2([0.0, 5.0])];
    let gids = vec![NodeId(0)];
    let err = Layer::new_free(positions, Position::D2([0.0, 0.0]), Position::D2([10.0, 10.0]), Periodicity::X, gids).unwrap_err();
    assert!(matches!(err, spatial_connect::ConnectError::BadProperty(_)));
}

#[test]
fn masked_iterator_respects_layer_own_periodicity() {
    let gids: Vec<NodeId> = (0..9).map(NodeId).collect();
    let layer = Layer::new_grid(3, 3, 1, Position::D2([0.0, 0.0]), Position::D2([3.0, 3.0]), Periodicity::X | Periodicity::Y, gids).unwrap();
    let mask = Mask::anchored(Mask::Ball { center: Position::D2([0.0, 0.0]), radius: 0.6 }, Position::D2([2.9, 2.9]));
    let found = layer.masked_iterator(&mask).unwrap();
    assert!(!found.is_empty());
}
