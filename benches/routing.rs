use std::sync::Arc;

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use kroute::{
    Deliverer, EventEnvelope, FilterPredicate, Router, RouterConfig, RoutingTable, Subscriber, ANY_FILTER,
};

/// A table with `n` bindings spread over 64 types and 16 sources, plus a few
/// wildcard bindings on each side.
fn populated_table(n: usize) -> RoutingTable {
    let table = RoutingTable::new();
    let pairs = (0..n).map(|i| {
        let event_type = format!("dev.knative.type{}", i % 64);
        let source = format!("/source{}", i % 16);
        let predicate = match i % 10 {
            0 => FilterPredicate::from_filter_values(&event_type, ANY_FILTER),
            1 => FilterPredicate::from_filter_values(ANY_FILTER, &source),
            _ => FilterPredicate::from_filter_values(&event_type, &source),
        };
        let name = format!("sub-{i}");
        (predicate, Subscriber::new(name.clone(), format!("http://{name}")).unwrap())
    });
    table.bind_all(pairs);
    table.bind(FilterPredicate::any(), Subscriber::new("audit", "http://audit").unwrap());
    table
}

fn bench_match_all(c: &mut Criterion) {
    let env = EventEnvelope::new("dev.knative.type7", "/source7", Bytes::new()).unwrap();

    let mut group = c.benchmark_group("routing/match_all");
    group.throughput(Throughput::Elements(1));
    for n in [100usize, 1_000, 10_000] {
        let table = populated_table(n);
        group.bench_with_input(BenchmarkId::new("indexed", n), &table, |b, table| {
            b.iter(|| black_box(table.match_all(black_box(&env))));
        });
        group.bench_with_input(BenchmarkId::new("scan", n), &table, |b, table| {
            b.iter(|| black_box(table.match_all_scan(black_box(&env))));
        });
    }
    group.finish();
}

fn bench_route_fanout(c: &mut Criterion) {
    let table = Arc::new(RoutingTable::new());
    for i in 0..8 {
        let name = format!("sub-{i}");
        table.bind(FilterPredicate::any(), Subscriber::new(name.clone(), format!("http://{name}")).unwrap());
    }
    let deliverer: Arc<dyn Deliverer> = Arc::new(|_: &Subscriber, _: &EventEnvelope| -> Result<(), String> { Ok(()) });
    let router = Router::new(table, deliverer, RouterConfig::default());
    let env = EventEnvelope::new("dev.knative.type1", "/source1", Bytes::from_static(b"{}")).unwrap();

    let mut group = c.benchmark_group("routing/route");
    group.throughput(Throughput::Elements(8));
    group.bench_function("fanout_8", |b| {
        b.iter(|| black_box(router.route(&env)));
    });
    group.finish();
}

criterion_group!(benches, bench_match_all, bench_route_fanout);
criterion_main!(benches);
