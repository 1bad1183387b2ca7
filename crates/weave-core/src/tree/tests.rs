use super::*;
use crate::target::VirtualIndex;
use pretty_assertions::assert_eq;

fn sample() -> NodeRef {
    Node::map([
        ("name", Node::class("a/B")),
        (
            "fields",
            Node::list([Node::str("x"), Node::str("y")]),
        ),
        ("flags", Node::int(33)),
    ])
}

#[test]
fn test_structural_equality_ignores_metadata() {
    let plain = Node::str("x");
    let tagged = plain.with_meta(MetaValue::Origin("t1".into()));
    assert_eq!(plain, tagged);
    assert!(!Node::same(&plain, &tagged));
    assert_eq!(tagged.meta().origin(), Some("t1"));
}

#[test]
fn test_map_equality_is_order_sensitive() {
    let ab = Node::map([("a", Node::int(1)), ("b", Node::int(2))]);
    let ba = Node::map([("b", Node::int(2)), ("a", Node::int(1))]);
    assert_ne!(ab, ba);
}

#[test]
fn test_list_allows_duplicates() {
    let list = Node::list([Node::int(1), Node::int(1)]);
    assert_eq!(list.as_list().unwrap().len(), 2);
}

#[test]
fn test_step_reports_missing_and_mismatch() {
    let root = sample();
    let at = Path::root();

    let err = root.step(&Step::from("missing"), &at).unwrap_err();
    assert!(matches!(err, ResolveError::UnresolvedTarget { ref path, .. } if path == &Path::parse("/missing")));

    let err = root.step(&Step::Index(0), &at).unwrap_err();
    assert_eq!(err, ResolveError::kind_mismatch(Path::root(), "list", "map"));

    let fields = root.get("fields").unwrap();
    let err = fields.step(&Step::Index(5), &Path::parse("/fields")).unwrap_err();
    assert!(matches!(err, ResolveError::UnresolvedTarget { .. }));
}

#[test]
fn test_derive_keeps_metadata() {
    let node = Node::new(
        NodeKind::List(Vec::new()),
        Metadata::of(MetaValue::SourceSpan { start: 4, end: 9 }),
    );
    let derived = node.derive(NodeKind::List(vec![Node::none()]));
    assert_eq!(derived.meta().source_span(), Some((4, 9)));
    assert_eq!(derived.as_list().unwrap().len(), 1);
}

#[test]
fn test_builders_freeze_and_share_children() {
    let root = sample();
    let fields = root.get("fields").unwrap().clone();

    let rebuilt = MapBuilder::from_node(&root)
        .with("access", Node::int(1))
        .freeze();
    assert!(Node::same(rebuilt.get("fields").unwrap(), &fields));
    assert_eq!(
        rebuilt.as_map().unwrap().keys().collect::<Vec<_>>(),
        vec!["name", "fields", "flags", "access"]
    );

    let mut builder = MapBuilder::from_node(&rebuilt);
    builder.remove("fields");
    let trimmed = builder.freeze();
    assert_eq!(
        trimmed.as_map().unwrap().keys().collect::<Vec<_>>(),
        vec!["name", "flags", "access"]
    );

    let mut list = ListBuilder::from_node(&fields);
    list.insert(0, Node::str("w"));
    list.extend([Node::str("z")]);
    assert_eq!(list.remove(9), None);
    assert_eq!(list.len(), 4);
    let frozen = list.freeze();
    assert_eq!(frozen.to_string(), r#"["w", "x", "y", "z"]"#);
}

#[test]
fn test_path_parse_and_display() {
    let path = Path::parse("/classes/0/fields");
    assert_eq!(
        path.steps(),
        &[Step::from("classes"), Step::Index(0), Step::from("fields")]
    );
    assert_eq!(path.to_string(), "/classes/0/fields");
    assert_eq!(Path::root().to_string(), "/");
    assert_eq!(Path::parse("/"), Path::root());
}

#[test]
fn test_path_relations() {
    let list = Path::parse("/classes/0/fields");
    let element = list.index(2);
    assert!(element.starts_with(&list));
    assert!(list.is_ancestor_of(&element));
    assert!(!list.is_ancestor_of(&list));
    assert_eq!(element.parent(), Some(list.clone()));
    assert_eq!(Path::root().parent(), None);
    assert_eq!(
        element.prefixes().map(|p| p.to_string()).collect::<Vec<_>>(),
        vec!["/", "/classes", "/classes/0", "/classes/0/fields", "/classes/0/fields/2"]
    );
}

#[test]
fn test_metadata_merge_prefers_other() {
    let mut meta = Metadata::of(MetaValue::Origin("first".into()));
    meta.insert(MetaValue::Path(Path::parse("/a")));

    let other = Metadata::of(MetaValue::Origin("second".into()));
    meta.merge(&other);

    assert_eq!(meta.len(), 2);
    assert_eq!(meta.origin(), Some("second"));
    assert_eq!(meta.path(), Some(&Path::parse("/a")));
    assert_eq!(meta.remove(MetaKey::Path), Some(MetaValue::Path(Path::parse("/a"))));
    assert!(!meta.contains(MetaKey::Path));
}

#[test]
fn test_tree_ids_are_unique() {
    let root = sample();
    let a = Tree::new(root.clone());
    let b = Tree::new(root);
    assert_ne!(a.id(), b.id());
    assert_eq!(a.clone().id(), a.id());
}

#[test]
fn test_cursor_navigation() {
    let tree = Tree::new(Node::map([("classes", Node::list([sample()]))]));
    let class = tree.cursor().get("classes").unwrap().at(0).unwrap();
    assert_eq!(class.path(), &Path::parse("/classes/0"));
    assert_eq!(class.tree_id(), tree.id());

    let keys: Vec<String> = class.entries().into_iter().map(|(key, _)| key).collect();
    assert_eq!(keys, vec!["name", "fields", "flags"]);

    let fields = class.get("fields").unwrap();
    assert_eq!(fields.len(), 2);
    let paths: Vec<String> = fields.children().iter().map(|c| c.path().to_string()).collect();
    assert_eq!(paths, vec!["/classes/0/fields/0", "/classes/0/fields/1"]);
    assert!(fields.at(2).is_none());

    let append = fields.append();
    assert!(append.is_insertion());
    assert_eq!(append.start(), VirtualIndex::gap(2));
}

#[test]
fn test_node_at_and_cursor_at() {
    let tree = Tree::new(Node::map([("classes", Node::list([sample()]))]));
    let name = tree.node_at(&Path::parse("/classes/0/name")).unwrap();
    assert_eq!(name.as_value(), Some(&Value::Handle(Handle::Class("a/B".into()))));

    let cursor = tree.cursor_at(&Path::parse("/classes/0/fields/1")).unwrap();
    assert_eq!(cursor.node().as_value().and_then(Value::as_str), Some("y"));

    assert!(tree.node_at(&Path::parse("/classes/3")).is_err());
}
