// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for effective-value resolution and local mutation.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Once;

use trellis_element::{ElementId, ElementTree};
use trellis_property::{
    ElementKind, ErasedValue, Property, PropertyMetadataBuilder, PropertyRegistry, PropertyStore,
};
use trellis_style::{Selector, StyleBuilder};

static NODE: ElementKind = ElementKind::new("Node");

fn leaked_registry() -> &'static PropertyRegistry {
    Box::leak(Box::new(PropertyRegistry::new()))
}

fn bench_property(c: &mut Criterion) {
    static PRINT_SIZES: Once = Once::new();
    PRINT_SIZES.call_once(|| {
        eprintln!(
            "sizes: PropertyStore<ElementId>={} ErasedValue={}",
            size_of::<PropertyStore<ElementId>>(),
            size_of::<ErasedValue>(),
        );
    });

    let registry = leaked_registry();
    let width: Property<f64> = registry
        .register(&NODE, "Width", PropertyMetadataBuilder::new(0.0_f64).build())
        .unwrap();
    let font_size: Property<f64> = registry
        .register(
            &NODE,
            "FontSize",
            PropertyMetadataBuilder::new(12.0_f64).inherits(true).build(),
        )
        .unwrap();
    let tree = ElementTree::with_registry(registry);

    // A small inheritance chain: 0 <- 1 <- ... <- N-1
    let chain_len: usize = 16;
    let chain: Vec<ElementId> = (0..chain_len).map(|_| tree.create(&NODE)).collect();
    for pair in chain.windows(2) {
        tree.append_child(pair[0], pair[1]).unwrap();
    }
    tree.set_local(chain[0], font_size, 16.0).unwrap();
    let leaf = chain[chain_len - 1];

    let styled = tree.create(&NODE);
    tree.attach(styled).unwrap();
    tree.add_rule(
        Selector::of_type(&NODE).class("wide"),
        StyleBuilder::new().set(width, 50.0).build(),
    )
    .unwrap();
    tree.add_class(styled, "wide").unwrap();

    let local = tree.create(&NODE);
    tree.set_local(local, width, 100.0).unwrap();
    let plain = tree.create(&NODE);

    let mut group = c.benchmark_group("property/resolve");
    group.bench_function("local", |b| b.iter(|| black_box(tree.get(local, width))));
    group.bench_function("style", |b| b.iter(|| black_box(tree.get(styled, width))));
    group.bench_function("default", |b| b.iter(|| black_box(tree.get(plain, width))));
    group.bench_function(BenchmarkId::new("inherited", chain_len), |b| {
        b.iter(|| black_box(tree.get(leaf, font_size)));
    });
    group.finish();

    let registry_string = leaked_registry();
    let text: Property<String> = registry_string
        .register(&NODE, "Text", PropertyMetadataBuilder::new(String::new()).build())
        .unwrap();
    let mut group = c.benchmark_group("property/store");
    group.bench_function("get_local/string", |b| {
        let mut store = PropertyStore::new(0_u32);
        store.set_local(text, "hello world hello world hello world".to_string());
        b.iter(|| black_box(store.get_local(text).map(String::len)));
    });
    group.bench_function("get_effective_local/default", |b| {
        let store = PropertyStore::new(0_u32);
        b.iter(|| black_box(store.get_effective_local(text, registry_string)));
    });
    group.finish();

    let mut group = c.benchmark_group("property/mutate");
    group.bench_function("set_local/f64/unobserved", |b| {
        let element = tree.create(&NODE);
        let mut value = 0.0;
        b.iter(|| {
            value += 1.0;
            tree.set_local(element, width, value).unwrap();
        });
    });
    group.bench_function(BenchmarkId::new("set_local/inherited_root", chain_len), |b| {
        let mut value = 16.0;
        b.iter(|| {
            value += 1.0;
            tree.set_local(chain[0], font_size, value).unwrap();
        });
    });
    group.bench_function("create_and_destroy", |b| {
        b.iter(|| {
            let element = tree.create(&NODE);
            tree.destroy(element).unwrap();
        });
    });
    group.finish();
}

criterion_group!(benches, bench_property);
criterion_main!(benches);
