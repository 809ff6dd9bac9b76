//! Benchmarks for planning a run.
//!
//! Run with: cargo bench -p tend-task-graph

#![allow(clippy::unwrap_used)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::collections::HashMap;
use std::hint::black_box;
use tend_task_graph::{TaskGraph, TaskNodeData};

#[derive(Debug, Clone)]
struct Decl {
    position: usize,
    deps: Vec<String>,
}

impl TaskNodeData for Decl {
    fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.deps.iter().map(String::as_str)
    }
}

/// A task file of `layers` layers, `per_layer` tasks each. Every task depends
/// on two tasks of the layer below, and `release` depends on the top layer.
fn task_file(layers: usize, per_layer: usize) -> HashMap<String, Decl> {
    let mut decls = HashMap::new();
    let mut position = 0;
    let mut below: Vec<String> = Vec::new();

    for layer in 0..layers {
        let mut current = Vec::with_capacity(per_layer);
        for slot in 0..per_layer {
            let deps = if below.is_empty() {
                Vec::new()
            } else {
                vec![
                    below[slot % below.len()].clone(),
                    below[(slot + 1) % below.len()].clone(),
                ]
            };
            let name = format!("l{layer}_{slot}");
            decls.insert(name.clone(), Decl { position, deps });
            position += 1;
            current.push(name);
        }
        below = current;
    }

    decls.insert(
        "release".to_string(),
        Decl {
            position,
            deps: below,
        },
    );
    decls
}

fn plan(decls: &HashMap<String, Decl>) -> usize {
    let mut graph = TaskGraph::new();
    graph
        .build_for_task("release", |name| decls.get(name).cloned())
        .unwrap();
    graph
        .execution_order_by_key("release", |node| node.task.position)
        .unwrap()
        .len()
}

fn benchmark_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_release");

    for (layers, per_layer) in [(5, 5), (10, 10), (20, 10), (10, 50)] {
        let decls = task_file(layers, per_layer);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{layers}x{per_layer}")),
            &decls,
            |b, decls| b.iter(|| black_box(plan(decls))),
        );
    }

    group.finish();
}

fn benchmark_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_task_file");

    for (layers, per_layer) in [(10, 10), (20, 25), (40, 25)] {
        let decls = task_file(layers, per_layer);
        let mut graph = TaskGraph::new();
        for (name, decl) in &decls {
            graph.add_task(name, decl.clone()).unwrap();
        }
        graph.add_dependency_edges().unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(decls.len()),
            &graph,
            |b, graph| b.iter(|| black_box(graph.validate().is_valid())),
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_plan, benchmark_validate);
criterion_main!(benches);
