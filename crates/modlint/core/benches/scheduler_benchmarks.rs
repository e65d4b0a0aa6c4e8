// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Scheduling and corpus validation benchmarks

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use modlint_core::graph::{DependencyKind, GraphBuilder, ReferenceStrength};
use modlint_core::{DependencyGraph, Element, MemoryLoader, ValidationOrchestrator, ValidationSettings, find_cycles, schedule};
use std::sync::Arc;

/// Layered graph: every document depends on two documents of the previous layer
fn layered_graph(layers: usize, width: usize) -> DependencyGraph {
    let mut builder = GraphBuilder::new();
    for layer in 0..layers {
        for i in 0..width {
            let id = format!("l{layer:03}_{i:03}.json");
            builder.add_node(&id);
            if layer > 0 {
                for offset in 0..2 {
                    let target = format!("l{:03}_{:03}.json", layer - 1, (i + offset) % width);
                    builder.add_edge(&id, &target, DependencyKind::ObjectReference, ReferenceStrength::Strong);
                }
            }
        }
    }
    builder.build()
}

/// Ring of documents, one long cycle
fn ring_graph(size: usize) -> DependencyGraph {
    let mut builder = GraphBuilder::new();
    for i in 0..size {
        builder.add_edge(&format!("r{i:04}.json"), &format!("r{:04}.json", (i + 1) % size), DependencyKind::ObjectReference, ReferenceStrength::Weak);
    }
    builder.build()
}

fn bench_schedule(c: &mut Criterion) {
    let mut group = c.benchmark_group("schedule");
    for layers in [10, 50, 100] {
        let graph = layered_graph(layers, 20);
        group.throughput(Throughput::Elements(graph.node_count() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(layers), &graph, |b, graph| b.iter(|| schedule(black_box(graph))));
    }
    group.finish();
}

fn bench_find_cycles(c: &mut Criterion) {
    let graph = ring_graph(500);
    c.bench_function("find_cycles_ring_500", |b| b.iter(|| find_cycles(black_box(&graph))));
}

fn bench_validate_corpus(c: &mut Criterion) {
    let mut loader = MemoryLoader::new();
    let mut paths = Vec::new();
    for doc in 0..50 {
        let mut root = Element::new("Items");
        for item in 0..40 {
            root = root.with_child(
                Element::new("Item")
                    .with_attr("id", format!("item_{doc}_{item}"))
                    .with_attr("name", "Item")
                    .with_attr("weight", "2.5")
                    .with_child(Element::new("ItemComponent")),
            );
        }
        let path = format!("items_{doc:02}.json");
        loader.insert(path.clone(), root);
        paths.push(path);
    }
    let loader = Arc::new(loader);

    let mut group = c.benchmark_group("validate_corpus");
    for threads in [1, 4] {
        let orchestrator = ValidationOrchestrator::new(loader.clone()).with_settings(ValidationSettings::default().with_max_threads(threads));
        group.bench_with_input(BenchmarkId::new("threads", threads), &paths, |b, paths| b.iter(|| orchestrator.validate_corpus(black_box(paths))));
    }
    group.finish();
}

criterion_group!(benches, bench_schedule, bench_find_cycles, bench_validate_corpus);
criterion_main!(benches);
