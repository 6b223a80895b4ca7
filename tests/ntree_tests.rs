use spatial_connect::geometry::{Bounds, Periodicity, Position};
use spatial_connect::mask::Mask;
use spatial_connect::ntree::Ntree;

#[test]
fn masked_iterator_finds_only_points_inside_the_mask() {
    let bounds = Bounds::new(Position::D2([0.0, 0.0]), Position::D2([10.0, 10.0])).unwrap();
    let mut tree = Ntree::with_leaf_capacity(bounds, 2);
    for i in 0..50 {
        let x = (i % 10) as f64;
        let y = (i / 10) as f64 * 2.0;
        tree.insert(Position::D2([x, y]), i);
    }
    let mask = Mask::Ball { center: Position::D2([5.0, 5.0]), radius: 1.5 };
    let found = tree.masked_iterator(&mask, &Position::D2([10.0, 10.0]), Periodicity::NONE).unwrap();
    for (p, _) in &found {
        let d = ((p.get(0) - 5.0).powi(2) + (p.get(1) - 5.0).powi(2)).sqrt();
        assert!(d <= 1.5 + 1e-9);
    }
    assert!(!found.is_empty());
}

#[test]
fn periodic_axis_finds_wraparound_neighbors() {
    let bounds = Bounds::new(Position::D2([0.0, 0.0]), Position::D2([10.0, 10.0])).unwrap();
    let mut tree = Ntree::new(bounds);
    tree.insert(Position::D2([0.2, 5.0]), 1u32);
    tree.insert(Position::D2([9.8, 5.0]), 2u32);

    let mask = Mask::Ball { center: Position::D2([0.0, 0.0]), radius: 0.5 };
    let found = tree.masked_iterator(&mask, &Position::D2([10.0, 10.0]), Periodicity::X).unwrap();
    let ids: Vec<u32> = found.into_iter().map(|(_, v)| *v).collect();
    assert!(ids.contains(&1));
    assert!(ids.contains(&2));
}

#[test]
fn insertion_past_leaf_capacity_preserves_every_point() {
    let bounds = Bounds::new(Position::D2([0.0, 0.0]), Position::D2([100.0, 100.0])).unwrap();
    let mut tree = Ntree::with_leaf_capacity(bounds, 4);
    for i in 0..500 {
        let x = (i as f64 * 37.0) % 100.0;
        let y = (i as f64 * 53.0) % 100.0;
        tree.insert(Position::D2([x, y]), i);
    }
    assert_eq!(tree.len(), 500);
    assert_eq!(tree.all().len(), 500);
}
