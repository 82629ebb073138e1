//! Extraction benchmarks.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use plancheck_harness::{Query, extract};
use serde_json::{Value, json};

fn cluster_values(pools: usize) -> Value {
    let pools: Vec<Value> = (0..pools)
        .map(|i| {
            json!({
                "name": format!("pool{i}"),
                "vm_size": "Standard_D4s_v5",
                "node_labels": {"workload.sas.com/class": "stateless"},
                "node_taints": [format!("workload.sas.com/class=pool{i}:NoSchedule")]
            })
        })
        .collect();
    json!({
        "name": "default-aks",
        "kubernetes_version": "1.30",
        "default_node_pool": [{"vm_size": "Standard_D8s_v5", "max_count": 5}],
        "azure_active_directory_role_based_access_control": [{"admin_group_object_ids": ["1", "2"]}],
        "node_pools": pools
    })
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");
    let queries = [
        ("scalar", "{$.kubernetes_version}"),
        ("index", "{$.default_node_pool[0].vm_size}"),
        ("wildcard", "{$.node_pools[*].name}"),
        ("descendant", "{$..admin_group_object_ids}"),
        ("missing", "{$.nonexistent.field}"),
    ];

    for pools in [4usize, 64] {
        let tree = cluster_values(pools);
        for (label, query) in queries {
            group.bench_with_input(BenchmarkId::new(label, pools), &tree, |b, tree| {
                b.iter(|| criterion::black_box(extract(tree, query)));
            });
        }
    }
    group.finish();
}

fn bench_parsed_query(c: &mut Criterion) {
    let tree = cluster_values(64);
    let query = Query::parse("{$.node_pools[*].vm_size}").expect("valid query");
    c.bench_function("render_parsed_wildcard_64", |b| {
        b.iter(|| criterion::black_box(query.render(&tree)));
    });
}

criterion_group!(benches, bench_extract, bench_parsed_query);
criterion_main!(benches);
