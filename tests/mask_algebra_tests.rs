use spatial_connect::geometry::Position;
use spatial_connect::mask::Mask;

#[test]
fn anchored_matches_manual_shift() {
    let ball = Mask::Ball { center: Position::D2([0.0, 0.0]), radius: 1.0 };
    let anchored = Mask::anchored(ball, Position::D2([5.0, 5.0]));
    assert!(anchored.inside(&Position::D2([5.5, 5.0])).unwrap());
    assert!(!anchored.inside(&Position::D2([0.5, 0.0])).unwrap());
}

#[test]
fn converse_mirrors_through_the_origin() {
    let ball = Mask::Ball { center: Position::D2([2.0, 0.0]), radius: 0.5 };
    let converse = Mask::converse(ball);
    assert!(converse.inside(&Position::D2([-2.0, 0.0])).unwrap());
    assert!(!converse.inside(&Position::D2([2.0, 0.0])).unwrap());
}

#[test]
fn intersection_of_two_balls_is_their_overlap() {
    let a = Mask::Ball { center: Position::D2([0.0, 0.0]), radius: 1.0 };
    let b = Mask::Ball { center: Position::D2([1.5, 0.0]), radius: 1.0 };
    let both = Mask::intersection(a, b);
    assert!(both.inside(&Position::D2([0.75, 0.0])).unwrap());
    assert!(!both.inside(&Position::D2([-0.9, 0.0])).unwrap());
}

#[test]
fn difference_excludes_the_subtracted_region() {
    let outer = Mask::Ball { center: Position::D2([0.0, 0.0]), radius: 2.0 };
    let hole = Mask::Ball { center: Position::D2([0.0, 0.0]), radius: 1.0 };
    let ring = Mask::difference(outer, hole);
    assert!(!ring.inside(&Position::D2([0.0, 0.0])).unwrap());
    assert!(ring.inside(&Position::D2([1.5, 0.0])).unwrap());
}

#[test]
fn mismatched_dimension_composition_is_an_error() {
    let a = Mask::Ball { center: Position::D2([0.0, 0.0]), radius: 1.0 };
    let b = Mask::Ball { center: Position::D3([0.0, 0.0, 0.0]), radius: 1.0 };
    let combined = Mask::union(a, b);
    assert!(combined.get_bbox().is_err());
}

#[test]
fn inside_box_implies_every_corner_is_inside() {
    let b = Mask::Box {
        lower_left: Position::D2([-2.0, -2.0]),
        upper_right: Position::D2([2.0, 2.0]),
        azimuth: 0.0,
        polar: 0.0,
    };
    let inner = spatial_connect::Bounds::new(Position::D2([-1.0, -1.0]), Position::D2([1.0, 1.0])).unwrap();
    assert!(b.inside_box(&inner).unwrap());
    assert!(b.inside(&Position::D2([0.9, -0.9])).unwrap());
}
