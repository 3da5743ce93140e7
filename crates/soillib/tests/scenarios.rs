use glam::{IVec2, Vec3};
use soillib::prelude::*;

fn descending_3x3() -> (Index, Node) {
    let index = Index::flat(&[3, 3]).unwrap();
    let buffer = Buffer::from(vec![9.0f32, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
    (index, Node::cached(buffer))
}

#[test]
fn direction_follows_the_steepest_neighbour() {
    let (index, height) = descending_3x3();
    let directions = Direction::new(&index, &height).full().unwrap();
    let origin = index.flatten(&[0, 0]).unwrap().expect("origin in bounds");
    assert_eq!(directions.get::<IVec2>(origin).unwrap(), IVec2::new(1, 0));
    assert_ne!(directions.get::<IVec2>(origin).unwrap(), IVec2::new(0, 1));

    let codes = Flow::new(&index, &height).full().unwrap();
    assert_eq!(codes.get::<i32>(origin).unwrap(), 4);
}

#[test]
fn constant_node_reads_the_same_value_everywhere() {
    let node = Node::constant(Value::Float32(3.0));
    let index = Index::flat(&[5, 5]).unwrap();
    for i in 0..index.elem() {
        assert_eq!(node.get::<f32>(i).unwrap(), 3.0);
    }
    assert_eq!(node.get::<f32>(1 << 40).unwrap(), 3.0);
}

#[test]
fn accumulation_is_deterministic_for_a_seed() {
    let index = Index::flat(&[4, 4]).unwrap();
    let height = Node::computed(|i| (6 - (i / 4) - (i % 4)) as f32);
    let config = AccumulationConfig::default()
        .with_iterations(1)
        .with_samples(16)
        .with_steps(10)
        .with_seed(2024);
    let acc = Accumulation::new(&index, &height).with_config(config);
    let read = |node: Node| node.buffer().unwrap().as_typed::<i32>().unwrap().to_vec();
    let first = read(acc.full().unwrap());
    let second = read(acc.full().unwrap());
    assert_eq!(first, second);
    // Everything drains toward the low corner at (3, 3).
    assert_eq!(first[15], first.iter().copied().max().unwrap());
    assert_eq!(first[15], 16);
}

#[test]
fn every_algorithm_accepts_an_empty_index() {
    let index = Index::flat(&[0, 0]).unwrap();
    let height = Node::cached(Vec::<f32>::new());
    let outputs = [
        Normal::new(&index, &height).full().unwrap(),
        Direction::new(&index, &height).full().unwrap(),
        Flow::new(&index, &height).full().unwrap(),
        Accumulation::new(&index, &height).full().unwrap(),
    ];
    for out in outputs {
        assert_eq!(out.buffer().expect("cached output").elem(), 0);
    }
}

#[test]
fn vector_heights_are_type_errors() {
    let index = Index::flat(&[2, 2]).unwrap();
    let height = Node::cached(vec![Vec3::ZERO; 4]);
    assert!(matches!(
        Normal::new(&index, &height).full(),
        Err(Error::TypeMismatch { .. })
    ));
    assert!(matches!(
        Accumulation::new(&index, &height).full(),
        Err(Error::TypeMismatch { .. })
    ));
}

#[test]
fn tiled_terrain_runs_end_to_end() {
    // Two 4x4 tiles side by side, sloping toward y = 0.
    let index = Index::quad(vec![
        QuadNode::new([0, 0], [4, 4]),
        QuadNode::new([0, 4], [4, 4]),
    ])
    .unwrap();
    let grid = index.as_grid().unwrap();
    let heights: Vec<f32> = (0..grid.elem())
        .map(|i| grid.unflatten(i).map_or(0.0, |p| p.y as f32))
        .collect();
    let height = Node::cached(heights);

    let directions = Direction::new(&index, &height).full().unwrap();
    let seam = grid.flatten(IVec2::new(2, 4)).unwrap();
    assert_eq!(directions.get::<IVec2>(seam).unwrap(), IVec2::new(0, -1));

    let config = AccumulationConfig::default()
        .with_iterations(1)
        .with_samples(32)
        .with_steps(16)
        .with_start(StartPositions::Ordered);
    let counts = Accumulation::new(&index, &height)
        .with_config(config)
        .full()
        .unwrap()
        .export(&index)
        .unwrap();
    assert_eq!(counts.shape(), &[4, 8]);
    let ArrayData::Int(counts) = counts.into_data() else {
        panic!("counts export as integers");
    };
    // Column y = 0 collects each row's eight walks.
    for x in 0..4 {
        assert_eq!(counts[x * 8], 8);
    }
}

#[test]
fn buffers_alias_until_the_last_handle_drops() {
    let typed = BufferT::from_vec(vec![1.0f64, 2.0, 3.0]);
    let weak = typed.downgrade();
    let erased = Buffer::from(typed.clone());
    erased.set(0, 10.0f64).unwrap();
    assert_eq!(typed.get(0), 10.0);

    assert!(matches!(
        erased.get::<f32>(0),
        Err(Error::TypeMismatch { .. })
    ));

    drop(erased);
    assert_eq!(typed.to_vec(), vec![10.0, 2.0, 3.0]);
    drop(typed);
    assert!(!weak.is_alive());
}

#[test]
fn scaled_nodes_export_with_component_axis() {
    let index = Index::flat(&[2, 2]).unwrap();
    let normals = Normal::new(&index, &Node::constant(0.0f32)).full().unwrap();
    let scaled = normals.scale(2.0f32).unwrap();
    let array = scaled.export(&index).unwrap();
    assert_eq!(array.shape(), &[2, 2, 3]);
    assert_eq!(
        array.data(),
        &ArrayData::Float32([0.0, 0.0, 2.0].repeat(4))
    );
}

#[test]
fn float64_heights_keep_tiny_drops() {
    let index = Index::flat(&[1, 2]).unwrap();
    let height = Node::cached(vec![1000.0f64, 1000.0 + 1e-6]);
    let directions = Direction::new(&index, &height).full().unwrap();
    assert_eq!(directions.get::<IVec2>(1).unwrap(), IVec2::new(0, -1));
}

#[test]
fn noise_terrain_routes_strictly_downhill() {
    let index = Index::flat(&[32, 32]).unwrap();
    let config = NoiseConfig::default().with_frequency(3.0).with_seed(5);
    let height = Noise::new(&index)
        .with_config(config)
        .full()
        .unwrap()
        .bake(&index)
        .unwrap();
    let directions = Direction::new(&index, &height).full().unwrap();
    let grid = index.as_grid().unwrap();
    let mut routed = 0;
    for (i, pos) in grid.positions() {
        let d = directions.get::<IVec2>(i).unwrap();
        if d == IVec2::ZERO {
            continue;
        }
        let j = grid.flatten(pos + d).expect("routes stay inside the index");
        assert!(height.scalar(j).unwrap() < height.scalar(i).unwrap());
        routed += 1;
    }
    assert!(routed > 0);
}
