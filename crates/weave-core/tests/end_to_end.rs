/*!
# End-to-End Pipeline Tests

Decode a fixture, run transformers to a fixed point, and check the encoded
result and the hierarchy derived from it.
*/

use weave_core::{
    decode_str, encode_json, Driver, FnTransformer, MapHierarchy, Node, Path, SuperclassResolver, Transformation,
    Transformer, Tree, TreeHierarchy, WeaveConfig, WeaveError,
};

use serde_json::json;

const EMPTY_CLASS: &str = r#"{"classes": [{"name": {"$class": "app/Main"}, "fields": []}]}"#;

const ONE_FIELD: &str = r#"{"classes": [{"name": {"$class": "app/Main"}, "fields": [{"name": "count", "descriptor": "I"}]}]}"#;

/// Adds a `serialVersionUID` field in front of every class that lacks one
struct SerialVersionAdder;

impl SerialVersionAdder {
    fn field() -> weave_core::NodeRef {
        Node::map([("name", Node::str("serialVersionUID")), ("descriptor", Node::str("J"))])
    }
}

impl Transformer for SerialVersionAdder {
    fn id(&self) -> &str {
        "serial-version"
    }

    fn apply(&self, tree: &Tree) -> Vec<Transformation> {
        let Some(classes) = tree.cursor().get("classes") else {
            return Vec::new();
        };
        classes
            .children()
            .into_iter()
            .filter_map(|class| class.get("fields"))
            .filter(|fields| {
                !fields.children().iter().any(|field| {
                    field.node().get("name").and_then(|n| n.as_value()).and_then(|v| v.as_str()) == Some("serialVersionUID")
                })
            })
            .map(|fields| Transformation::insert(self.id(), fields.insert_at(0), vec![Self::field()]))
            .collect()
    }
}

#[test]
fn test_converging_transformer_reaches_fixed_point() -> anyhow::Result<()> {
    let tree = decode_str(ONE_FIELD)?;
    let driver = Driver::new().with_transformer(SerialVersionAdder);

    let summary = driver.run(&tree)?;
    assert_eq!(summary.rounds, 2);
    assert_eq!(
        encode_json(&summary.tree),
        json!({"classes": [{"name": {"$class": "app/Main"}, "fields": [
            {"name": "serialVersionUID", "descriptor": "J"},
            {"name": "count", "descriptor": "I"}
        ]}]})
    );

    let added = summary.tree.node_at(&Path::parse("/classes/0/fields/0"))?;
    assert_eq!(added.meta().origin(), Some("serial-version"));

    // the existing field moved one slot but is the same node, decode path and all
    let moved = summary.tree.node_at(&Path::parse("/classes/0/fields/1"))?;
    assert!(Node::same(&moved, &tree.node_at(&Path::parse("/classes/0/fields/0"))?));
    assert_eq!(moved.meta().origin(), None);
    assert_eq!(moved.meta().path(), Some(&Path::parse("/classes/0/fields/0")));

    // the input snapshot is unchanged
    assert_eq!(encode_json(&tree), serde_json::from_str::<serde_json::Value>(ONE_FIELD)?);
    Ok(())
}

#[test]
fn test_non_converging_transformer_hits_round_limit() -> anyhow::Result<()> {
    let tree = decode_str(EMPTY_CLASS)?;
    let config = WeaveConfig::from_json_str(r#"{"max_rounds": 5}"#)?;
    let driver = Driver::with_config(config)?.with_transformer(FnTransformer::new("counter", |tree: &Tree| {
        tree.cursor_at(&Path::parse("/classes/0/fields"))
            .map(|fields| {
                let next = fields.len() as i64;
                vec![Transformation::insert("counter", fields.append(), vec![Node::int(next)])]
            })
            .unwrap_or_default()
    }));

    match driver.run(&tree) {
        Err(WeaveError::NonConvergent { rounds }) => assert_eq!(rounds, 5),
        other => panic!("expected NonConvergent, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_co_insertion_from_two_transformers() -> anyhow::Result<()> {
    let tree = decode_str(EMPTY_CLASS)?;
    let adder = |id: &'static str| {
        FnTransformer::new(id, move |tree: &Tree| {
            tree.cursor_at(&Path::parse("/classes/0/fields"))
                .ok()
                .filter(|fields| fields.is_empty())
                .map(|fields| vec![Transformation::insert(id, fields.insert_at(0), vec![Node::str(id)])])
                .unwrap_or_default()
        })
    };
    let driver = Driver::new().with_transformer(adder("second")).with_transformer(adder("first"));

    let summary = driver.run(&tree)?;
    assert_eq!(summary.rounds, 2);
    assert_eq!(summary.transformations, 2);
    assert_eq!(
        encode_json(&summary.tree)["classes"][0]["fields"],
        json!(["first", "second"])
    );
    Ok(())
}

#[test]
fn test_hierarchy_over_final_tree() -> anyhow::Result<()> {
    let tree = decode_str(EMPTY_CLASS)?;
    let driver = Driver::new().with_transformer(FnTransformer::new("extend", |tree: &Tree| {
        let Some(class) = tree.cursor().get("classes").and_then(|c| c.at(0)) else {
            return Vec::new();
        };
        if class.get("super").is_some() {
            return Vec::new();
        }
        vec![Transformation::replace("extend", class.target(), |current, _| {
            weave_core::MapBuilder::from_node(current)
                .with("super", Node::class("java/lang/Number"))
                .freeze()
        })]
    }));
    let summary = driver.run(&tree)?;

    let resolver = SuperclassResolver::new()
        .with_provider(TreeHierarchy::from_tree(&summary.tree))
        .with_provider(
            MapHierarchy::new()
                .with("java/lang/Number", "java/lang/Object")
                .with("java/lang/Integer", "java/lang/Number"),
        );
    assert_eq!(resolver.common_super_class("app/Main", "java/lang/Integer")?, "java/lang/Number");
    Ok(())
}
