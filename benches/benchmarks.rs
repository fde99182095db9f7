//! Criterion benchmarks for dotbot.

use criterion::{criterion_group, criterion_main, Criterion};
use rand::Rng;

use dotbot::graph::{DiagramGraph, GraphLimits};
use dotbot::parser::parse;
use dotbot::render::compile;
use dotbot::types::{Attributes, Edge, Node};

/// Build a large graph using from_parts for fast construction.
fn make_large_graph(node_count: usize, edges_per_node: usize) -> DiagramGraph {
    let mut rng = rand::thread_rng();
    let shapes = ["box", "ellipse", "cylinder", "diamond"];

    let nodes: Vec<Node> = (0..node_count)
        .map(|i| {
            Node::new(format!("n{i}"))
                .with_label(format!("Service {i}"))
                .with_attribute("shape", shapes[i % shapes.len()])
        })
        .collect();

    let mut edges: Vec<Edge> = Vec::with_capacity(node_count * edges_per_node);
    for i in 0..node_count {
        for _ in 0..edges_per_node {
            let target = rng.gen_range(0..node_count);
            edges.push(Edge::new(format!("n{i}"), format!("n{target}")).with_label("calls"));
        }
    }

    DiagramGraph::from_parts(nodes, edges, Vec::new(), GraphLimits::unbounded()).unwrap()
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_add_edge", |b| {
        b.iter(|| parse("add-edge api db \"reads from\" color=blue style=dashed --unique"))
    });
}

fn bench_add_node(c: &mut Criterion) {
    c.bench_function("add_node", |b| {
        let mut graph = DiagramGraph::with_limits(GraphLimits::unbounded());
        let mut i = 0u64;
        b.iter(|| {
            let _ = graph.add_node(&format!("n{i}"), None, Attributes::new());
            i += 1;
        })
    });
}

fn bench_add_edge(c: &mut Criterion) {
    c.bench_function("add_edge", |b| {
        let mut graph = make_large_graph(1_000, 0);
        let mut rng = rand::thread_rng();
        b.iter(|| {
            let s = rng.gen_range(0..1_000);
            let t = rng.gen_range(0..1_000);
            let _ = graph.add_edge(Edge::new(format!("n{s}"), format!("n{t}")), false);
        })
    });
}

fn bench_remove_node_cascade(c: &mut Criterion) {
    let graph = make_large_graph(1_000, 3);
    c.bench_function("remove_node_cascade_1k", |b| {
        b.iter_batched(
            || graph.clone(),
            |mut g| {
                let _ = g.remove_node("n500");
            },
            criterion::BatchSize::LargeInput,
        )
    });
}

fn bench_compile_1k(c: &mut Criterion) {
    let snapshot = make_large_graph(1_000, 2).snapshot();
    c.bench_function("compile_1k_nodes", |b| b.iter(|| compile(&snapshot)));
}

fn bench_snapshot_1k(c: &mut Criterion) {
    let graph = make_large_graph(1_000, 2);
    c.bench_function("snapshot_1k_nodes", |b| b.iter(|| graph.snapshot()));
}

criterion_group!(
    benches,
    bench_parse,
    bench_add_node,
    bench_add_edge,
    bench_remove_node_cascade,
    bench_compile_1k,
    bench_snapshot_1k,
);
criterion_main!(benches);
