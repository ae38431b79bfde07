// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change delivery to N subscribers, direct and through bindings.

use std::cell::Cell;
use std::rc::Rc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use trellis_element::{BindingMode, ElementTree};
use trellis_property::{ElementKind, PropertyMetadataBuilder, PropertyRegistry};

static NODE: ElementKind = ElementKind::new("Node");

fn bench_dispatch(c: &mut Criterion) {
    let registry: &'static PropertyRegistry = Box::leak(Box::new(PropertyRegistry::new()));
    let value = registry
        .register(&NODE, "Value", PropertyMetadataBuilder::new(0_u64).build())
        .unwrap();

    let mut group = c.benchmark_group("dispatch/observers");
    for subscribers in [1_usize, 16, 256] {
        let tree = ElementTree::with_registry(registry);
        let element = tree.create(&NODE);
        let hits = Rc::new(Cell::new(0_u64));
        for _ in 0..subscribers {
            let hits = hits.clone();
            tree.observe(element, value, move |_, v| hits.set(hits.get() + *v))
                .unwrap();
        }
        let mut next = 0;
        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| {
                b.iter(|| {
                    next += 1;
                    tree.set_local(element, value, next).unwrap();
                });
            },
        );
        black_box(hits.get());
    }
    group.finish();

    let mut group = c.benchmark_group("dispatch/binding_chain");
    for len in [2_usize, 16] {
        let tree = ElementTree::with_registry(registry);
        let nodes: Vec<_> = (0..len).map(|_| tree.create(&NODE)).collect();
        for pair in nodes.windows(2) {
            tree.bind(pair[0], value, pair[1], value, BindingMode::TwoWay)
                .unwrap();
        }
        let mut next = 0;
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| {
                next += 1;
                tree.set_local(nodes[0], value, next).unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
