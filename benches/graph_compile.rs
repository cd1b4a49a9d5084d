use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use stategraph::event_bus::EventBus;
use stategraph::graphs::GraphBuilder;
use stategraph::state::State;
use stategraph::types::NodeId;
use stategraph::utils::testing::SetFieldNode;

fn linear_builder(len: usize) -> GraphBuilder {
    let mut builder = GraphBuilder::new();
    for i in 0..len {
        builder = builder.add_node(
            format!("n{i}").as_str(),
            SetFieldNode::new(format!("field{i}"), json!(i)),
        );
    }
    builder = builder.add_edge(NodeId::Start, "n0");
    for i in 1..len {
        builder = builder.add_edge(format!("n{}", i - 1).as_str(), format!("n{i}").as_str());
    }
    builder.add_edge(format!("n{}", len - 1).as_str(), NodeId::End)
}

fn fan_out_builder(width: usize) -> GraphBuilder {
    let mut builder = GraphBuilder::new().add_node("join", SetFieldNode::new("joined", json!(true)));
    for i in 0..width {
        let name = format!("w{i}");
        builder = builder
            .add_node(name.as_str(), SetFieldNode::new(name.clone(), json!(i)))
            .add_edge(NodeId::Start, name.as_str())
            .add_edge(name.as_str(), "join");
    }
    builder.add_edge("join", NodeId::End)
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    for len in [4usize, 32, 128] {
        group.bench_with_input(BenchmarkId::new("linear", len), &len, |b, &len| {
            b.iter(|| linear_builder(len).compile().unwrap());
        });
    }
    for width in [4usize, 32, 128] {
        group.bench_with_input(BenchmarkId::new("fan_out", width), &width, |b, &width| {
            b.iter(|| fan_out_builder(width).compile().unwrap());
        });
    }
    group.finish();
}

fn bench_invoke(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    let mut group = c.benchmark_group("invoke");
    for width in [4usize, 16] {
        let workflow = fan_out_builder(width).compile().unwrap();
        group.bench_with_input(BenchmarkId::new("fan_out", width), &workflow, |b, wf| {
            b.to_async(&rt).iter(|| async {
                // Sinkless bus keeps bench output off stdout.
                let bus = EventBus::with_sinks(vec![]);
                wf.invoke_with_bus(State::new(), &bus).await.unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compile, bench_invoke);
criterion_main!(benches);
