use super::*;
use crate::resolve::ResolveError;
use crate::target::NodeTarget;
use crate::tree::{Node, Path};
use pretty_assertions::assert_eq;

fn empty_class_tree() -> Tree {
    Tree::new(Node::map([(
        "classes",
        Node::list([Node::map([("fields", Node::list([]))])]),
    )]))
}

/// Adds one field at the front of every class that has none
fn add_field(id: &'static str) -> impl Transformer {
    FnTransformer::new(id, move |tree: &Tree| {
        let Some(classes) = tree.cursor().get("classes") else {
            return Vec::new();
        };
        classes
            .children()
            .into_iter()
            .filter_map(|class| class.get("fields"))
            .filter(|fields| fields.is_empty())
            .map(|fields| Transformation::insert(id, fields.insert_at(0), vec![Node::map([("name", Node::str(id))])]))
            .collect()
    })
}

/// Always appends another field
fn grow_forever() -> impl Transformer {
    FnTransformer::new("grower", |tree: &Tree| {
        tree.cursor_at(&Path::parse("/classes/0/fields"))
            .map(|fields| vec![Transformation::insert("grower", fields.append(), vec![Node::int(0)])])
            .unwrap_or_default()
    })
}

#[test]
fn test_no_transformers_is_immediate_fixed_point() {
    let tree = empty_class_tree();
    let summary = Driver::new().run(&tree).unwrap();
    assert_eq!(summary.rounds, 1);
    assert_eq!(summary.transformations, 0);
    assert!(Node::same(summary.tree.root(), tree.root()));
}

#[test]
fn test_converges_in_two_rounds() {
    let tree = empty_class_tree();
    let driver = Driver::new().with_transformer(add_field("adder"));
    let summary = driver.run(&tree).unwrap();

    assert_eq!(summary.rounds, 2);
    assert_eq!(summary.transformations, 1);
    let fields = summary.tree.node_at(&Path::parse("/classes/0/fields")).unwrap();
    assert_eq!(fields.to_string(), r#"[{name: "adder"}]"#);
}

#[test]
fn test_round_limit_is_non_convergent() {
    let tree = empty_class_tree();
    let config = WeaveConfig::default().with_max_rounds(3);
    let driver = Driver::with_config(config).unwrap().with_transformer(grow_forever());

    let err = driver.run(&tree).unwrap_err();
    assert!(matches!(err, WeaveError::NonConvergent { rounds: 3 }));
}

#[test]
fn test_parallel_and_sequential_rounds_agree() {
    let tree = empty_class_tree();
    for parallel in [true, false] {
        let config = WeaveConfig::default().with_parallel(parallel);
        let driver = Driver::with_config(config)
            .unwrap()
            .with_transformer(add_field("b-adder"))
            .with_transformer(add_field("a-adder"));

        let summary = driver.run(&tree).unwrap();
        let fields = summary.tree.node_at(&Path::parse("/classes/0/fields")).unwrap();
        // both saw the same empty list; ties at one gap go by origin id
        assert_eq!(fields.to_string(), r#"[{name: "a-adder"}, {name: "b-adder"}]"#);
        assert_eq!(summary.rounds, 2);
    }
}

#[test]
fn test_resolution_failure_aborts_run() {
    let tree = empty_class_tree();
    let clash = |id: &'static str| {
        FnTransformer::new(id, move |_: &Tree| {
            vec![Transformation::set(id, NodeTarget::new(Path::parse("/classes")), Node::list([]))]
        })
    };
    let driver = Driver::new().with_transformer(clash("x")).with_transformer(clash("y"));
    let err = driver.run(&tree).unwrap_err();
    assert!(matches!(
        err,
        WeaveError::Resolve(ResolveError::OverlappingTransformation { .. })
    ));
}

#[test]
fn test_stats_track_invocations() {
    let tree = empty_class_tree();
    let driver = Driver::new()
        .with_transformer(add_field("adder"))
        .with_transformer(FnTransformer::new("idle", |_: &Tree| Vec::new()));
    driver.run(&tree).unwrap();

    let stats = driver.stats();
    let adder = &stats["adder"];
    assert_eq!(adder.invocations, 2);
    assert_eq!(adder.proposals, 1);
    assert_eq!(adder.average_proposals(), 0.5);
    assert_eq!(stats["idle"].proposals, 0);

    driver.clear_stats();
    let cleared = driver.stats();
    assert_eq!(cleared["adder"].invocations, 0);
    assert_eq!(cleared["adder"].transformer, "adder");
    assert_eq!(cleared["adder"].average_time(), Duration::ZERO);
}

#[test]
fn test_run_round_reports_fixed_point() {
    let tree = empty_class_tree();
    let driver = Driver::new().with_transformer(add_field("adder"));

    let next = match driver.run_round(&tree, 1).unwrap() {
        RoundOutcome::Applied { tree, transformations } => {
            assert_eq!(transformations, 1);
            tree
        }
        RoundOutcome::FixedPoint => panic!("expected an applied round"),
    };
    assert!(matches!(driver.run_round(&next, 2).unwrap(), RoundOutcome::FixedPoint));
}

#[test]
fn test_zero_rounds_is_rejected() {
    let config = WeaveConfig::default().with_max_rounds(0);
    assert!(matches!(Driver::with_config(config), Err(WeaveError::Config(_))));
}

#[test]
fn test_average_time_divides_without_truncation() {
    let stats = TransformerStats {
        invocations: u64::from(u32::MAX) + 1,
        total_time: Duration::from_secs(u64::from(u32::MAX) + 1),
        ..TransformerStats::new("busy".to_string())
    };
    assert_eq!(stats.average_time(), Duration::from_secs(1));

    let stats = TransformerStats {
        invocations: 4,
        total_time: Duration::from_millis(10),
        ..TransformerStats::new("quick".to_string())
    };
    assert_eq!(stats.average_time(), Duration::from_micros(2500));
}
