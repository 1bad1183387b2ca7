use super::*;
use pretty_assertions::assert_eq;

const FIXTURE: &str = r#"{
  "version": 52,
  "classes": [
    {
      "name": {"$class": "app/Main"},
      "super": {"$class": "java/lang/Object"},
      "fields": [],
      "code": {"$bytes": [42, 177]},
      "synthetic": false,
      "signature": null
    }
  ]
}"#;

#[test]
fn test_decode_shapes() {
    let tree = decode_str(FIXTURE).unwrap();
    let class = tree.node_at(&Path::parse("/classes/0")).unwrap();

    assert_eq!(
        class.as_map().unwrap().keys().collect::<Vec<_>>(),
        vec!["name", "super", "fields", "code", "synthetic", "signature"]
    );
    assert_eq!(class.get("name").unwrap().as_value(), Some(&Value::Handle(Handle::Class("app/Main".into()))));
    assert_eq!(class.get("code").unwrap().as_value(), Some(&Value::Bytes(vec![42, 177])));
    assert_eq!(class.get("synthetic").unwrap().as_value(), Some(&Value::Bool(false)));
    assert_eq!(class.get("signature").unwrap().as_value(), Some(&Value::None));
    assert_eq!(class.get("fields").unwrap().as_list().map(<[NodeRef]>::len), Some(0));
    assert_eq!(tree.root().get("version").unwrap().as_value().and_then(Value::as_int), Some(52));
}

#[test]
fn test_decode_attaches_paths() {
    let tree = decode_str(FIXTURE).unwrap();
    let name = tree.node_at(&Path::parse("/classes/0/name")).unwrap();
    assert_eq!(name.meta().path(), Some(&Path::parse("/classes/0/name")));
    assert_eq!(tree.root().meta().path(), Some(&Path::root()));
}

#[test]
fn test_encode_inverts_decode() {
    let tree = decode_str(FIXTURE).unwrap();
    let original: Json = serde_json::from_str(FIXTURE).unwrap();
    assert_eq!(encode_json(&tree), original);

    let text = encode_string(&tree).unwrap();
    let again = decode_str(&text).unwrap();
    assert_eq!(again.root(), tree.root());
}

#[test]
fn test_reserved_keys_only_apply_alone() {
    let tree = decode_str(r#"{"$class": "a/B", "extra": 1}"#).unwrap();
    assert!(tree.root().as_map().is_some());
}

#[test]
fn test_decode_errors() {
    assert!(matches!(decode_str("{"), Err(CodecError::Syntax(_))));
    assert!(matches!(
        decode_str(r#"{"ratio": 0.5}"#),
        Err(CodecError::UnsupportedNumber { ref path, .. }) if path == &Path::parse("/ratio")
    ));
    assert!(matches!(
        decode_str(r#"[{"$bytes": [1, 300]}]"#),
        Err(CodecError::InvalidReserved { key: "$bytes", .. })
    ));
    assert!(matches!(
        decode_str(r#"{"$class": 7}"#),
        Err(CodecError::InvalidReserved { key: "$class", .. })
    ));
}
