use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use msgtree::{BranchMap, MessageTree};
use msgtree_test_utils::{linear_conversation, msg, regenerated_conversation};

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_path");

    for depth in [10usize, 100, 1000] {
        let tree = regenerated_conversation(depth, 3);
        let branches = BranchMap::new();
        group.bench_with_input(BenchmarkId::new("default_branch", depth), &tree, |b, tree| {
            b.iter(|| tree.resolve_path(black_box("t0v2"), &branches).unwrap());
        });
    }

    group.finish();
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("add_message/fan_out_100", |b| {
        b.iter(|| {
            let mut tree = MessageTree::new();
            tree.add_message(msg("root", None, 0)).unwrap();
            for i in 0..100u32 {
                tree.add_message(msg(&format!("r{i}"), Some("root"), i % 7)).unwrap();
            }
            tree
        });
    });

    c.bench_function("add_message/reverse_arrival_100", |b| {
        b.iter(|| {
            let mut tree = MessageTree::new();
            for i in (0..100usize).rev() {
                let parent = i.checked_sub(1).map(|p| format!("m{p}"));
                tree.add_message(msg(&format!("m{i}"), parent.as_deref(), 0)).unwrap();
            }
            tree
        });
    });

    c.bench_function("add_message/late_parents_1000", |b| {
        b.iter(|| {
            let mut tree = MessageTree::new();
            for i in 0..1000usize {
                let parent = format!("p{i}");
                tree.add_message(msg(&format!("r{i}"), Some(parent.as_str()), 0)).unwrap();
            }
            for i in 0..1000usize {
                tree.add_message(msg(&format!("p{i}"), None, 0)).unwrap();
            }
            tree
        });
    });
}

fn bench_snapshot(c: &mut Criterion) {
    let tree = linear_conversation(1000);
    c.bench_function("snapshot_then_add/1000", |b| {
        b.iter(|| {
            tree.with(|copy| copy.add_message(msg("tail", Some("m999"), 0)))
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_resolve, bench_insert, bench_snapshot);
criterion_main!(benches);
