// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Selector matching and restyling over rule sets of increasing size.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use trellis_element::ElementTree;
use trellis_property::{ElementKind, Property, PropertyMetadataBuilder, PropertyRegistry};
use trellis_style::{Selector, SelectorInputs, StyleBuilder, Styles};

static CONTROL: ElementKind = ElementKind::new("Control");
static BUTTON: ElementKind = ElementKind::derived("Button", &CONTROL);
static TOGGLE: ElementKind = ElementKind::derived("ToggleButton", &BUTTON);

fn rules(width: Property<f64>, count: usize) -> Vec<(Selector, trellis_style::Style)> {
    (0..count)
        .map(|i| {
            let selector = match i % 3 {
                0 => Selector::of_type(&CONTROL),
                1 => Selector::of_type(&BUTTON).class(format!("c{}", i % 8)),
                _ => Selector::any().class(":pressed"),
            };
            #[expect(clippy::cast_precision_loss, reason = "small bench counts")]
            let style = StyleBuilder::new().set(width, i as f64).build();
            (selector, style)
        })
        .collect()
}

fn bench_matching(c: &mut Criterion) {
    let registry: &'static PropertyRegistry = Box::leak(Box::new(PropertyRegistry::new()));
    let width = registry
        .register(&CONTROL, "Width", PropertyMetadataBuilder::new(0.0_f64).build())
        .unwrap();

    let mut group = c.benchmark_group("style/best_value");
    for count in [8_usize, 64, 512] {
        let mut styles = Styles::new();
        for (selector, style) in rules(width, count) {
            styles.add_rule(selector, style);
        }
        let classes = vec![String::from("c1"), String::from(":pressed")];
        let inputs = SelectorInputs::new(&TOGGLE, &classes);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| black_box(styles.best_value(&inputs, width.id())));
        });
    }
    group.finish();

    let mut group = c.benchmark_group("style/toggle_class");
    for count in [8_usize, 64] {
        let tree = ElementTree::with_registry(registry);
        for (selector, style) in rules(width, count) {
            tree.add_rule(selector, style).unwrap();
        }
        let button = tree.create(&TOGGLE);
        tree.attach(button).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                tree.add_class(button, ":pressed").unwrap();
                tree.remove_class(button, ":pressed").unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_matching);
criterion_main!(benches);
