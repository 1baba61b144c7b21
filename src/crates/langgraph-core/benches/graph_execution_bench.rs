use criterion::{black_box, criterion_group, criterion_main, Criterion};
use langgraph_core::llm::max_input_tokens;
use langgraph_core::StateGraph;
use serde_json::json;

fn single_node_invoke_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("single node graph invoke", |b| {
        b.to_async(&runtime).iter(|| async {
            let mut graph = StateGraph::new();
            graph.add_node("process", |state| Box::pin(async move { Ok(state) }));
            graph.add_edge("__start__", "process");
            graph.add_edge("process", "__end__");

            let compiled = graph.compile().unwrap();
            compiled.invoke(black_box(json!({"count": 0}))).await.unwrap();
        });
    });
}

fn tailor_max_input_tokens_benchmark(c: &mut Criterion) {
    c.bench_function("tailor max_input_tokens", |b| {
        b.iter(|| max_input_tokens(black_box(200_000)));
    });
}

criterion_group!(benches, single_node_invoke_benchmark, tailor_max_input_tokens_benchmark);
criterion_main!(benches);
