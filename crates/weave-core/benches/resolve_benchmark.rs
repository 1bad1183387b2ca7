use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use weave_core::{Node, NodeRef, Path, Resolver, SliceTarget, Transformation, Tree};

fn class_tree(classes: usize, fields: usize) -> Tree {
    let class = |c: usize| -> NodeRef {
        Node::map([
            ("name", Node::class(format!("bench/C{c}"))),
            ("fields", Node::list((0..fields).map(|f| Node::str(format!("f{f}"))))),
        ])
    };
    Tree::new(Node::map([("classes", Node::list((0..classes).map(class)))]))
}

/// One insertion and one rename per class
fn batch(classes: usize) -> Vec<Transformation> {
    (0..classes)
        .flat_map(|c| {
            let fields = Path::parse(&format!("/classes/{c}/fields"));
            [
                Transformation::insert(format!("adder-{}", c % 4), SliceTarget::insert_before(fields, 0), vec![
                    Node::str("added"),
                ]),
                Transformation::set(
                    format!("renamer-{}", c % 4),
                    weave_core::NodeTarget::new(Path::parse(&format!("/classes/{c}/name"))),
                    Node::class(format!("bench/Renamed{c}")),
                ),
            ]
        })
        .collect()
}

fn benchmark_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_batch");
    let resolver = Resolver::new();

    for classes in [10usize, 100, 1000] {
        let tree = class_tree(classes, 16);
        group.bench_with_input(BenchmarkId::from_parameter(classes), &classes, |b, &classes| {
            b.iter(|| {
                let next = resolver.resolve(&tree, batch(classes)).expect("batch resolves");
                black_box(next)
            })
        });
    }
    group.finish();
}

fn benchmark_empty_batch(c: &mut Criterion) {
    let tree = class_tree(1000, 16);
    let resolver = Resolver::new();
    c.bench_function("resolve_empty_batch", |b| {
        b.iter(|| black_box(resolver.resolve(&tree, Vec::new()).expect("empty batch resolves")))
    });
}

criterion_group!(benches, benchmark_resolution, benchmark_empty_batch);
criterion_main!(benches);
