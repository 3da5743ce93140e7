use std::time::Duration;

use criterion::{Criterion, Throughput};
use soillib::index::Index;
use soillib::node::Node;

pub const SAMPLE_SIZE: usize = 20;
pub const WARM_UP: Duration = Duration::from_secs(1);
pub const MEASUREMENT_TIME: Duration = Duration::from_secs(3);

/// Square grid sizes used across benches.
pub const SIZES: [i32; 3] = [64, 256, 1024];

pub fn default_criterion() -> Criterion {
    Criterion::default()
        .configure_from_args()
        .sample_size(SAMPLE_SIZE)
        .warm_up_time(WARM_UP)
        .measurement_time(MEASUREMENT_TIME)
}

pub fn elements_throughput(elements: usize) -> Throughput {
    Throughput::Elements(elements.max(1) as u64)
}

/// A `size x size` flat index with a cached bowl-shaped height field.
#[allow(dead_code)]
pub fn bowl(size: i32) -> (Index, Node) {
    let index = Index::flat(&[size, size]).expect("2D extent");
    let n = size as usize;
    let c = (size as f32 - 1.0) * 0.5;
    let heights: Vec<f32> = (0..n * n)
        .map(|i| {
            let x = (i / n) as f32 - c;
            let y = (i % n) as f32 - c;
            (x * x + y * y).sqrt() + 0.25 * (x * 0.37).sin() * (y * 0.23).cos()
        })
        .collect();
    (index, Node::cached(heights))
}
