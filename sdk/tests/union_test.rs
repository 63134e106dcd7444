#![cfg(test)]

use keel::*;
use std::sync::Arc;

fn commands() -> (Arc<StructDesc>, Arc<StructDesc>) {
    let get = StructDesc::new("Get")
        .tag_field("op")
        .field(FieldDesc::new("key", TypeDesc::str()));
    let put = StructDesc::new("Put")
        .tag_field("op")
        .field(FieldDesc::new("key", TypeDesc::str()))
        .field(FieldDesc::new("value", TypeDesc::int()));
    (Arc::new(get), Arc::new(put))
}

fn command_schema() -> Schema {
    let (get, put) = commands();
    compile(&TypeDesc::union([get.into(), put.into()])).unwrap()
}

fn debug(schema: &Schema, input: &str) -> String {
    match json::decode(schema, input.as_bytes()) {
        Ok(value) => format!("{:?}", value),
        Err(err) => err.to_string(),
    }
}

#[test]
fn test_tagged_objects() {
    let schema = command_schema();
    insta::assert_snapshot!([
        debug(&schema, r#"{"op": "Get", "key": "a"}"#),
        debug(&schema, r#"{"key": "a", "value": 1, "op": "Put"}"#),
        debug(&schema, r#"{"key": "a"}"#),
        debug(&schema, r#"{"op": "Del", "key": "a"}"#),
        debug(&schema, r#"{"op": [], "key": "a"}"#),
        debug(&schema, r#"{"op": "Put", "key": "a"}"#),
        debug(&schema, r#"{"op": "Put", "key": "a", "value": "x"}"#),
        debug(&schema, r#"["Get", "a"]"#),
    ].join("\n"), @r###"
    Get {key: "a"}
    Put {key: "a", value: 1}
    Object missing required field `op`
    Invalid value 'Del' - at `$.op`
    Expected `str`, got `array` - at `$.op`
    Object missing required field `value`
    Expected `int`, got `str` - at `$.value`
    Expected `object`, got `array`
    "###);
}

#[test]
fn test_untagged_fallback() {
    let (get, put) = commands();
    let noop = StructDesc::new("Noop").field(FieldDesc::new("why", TypeDesc::str()).default(Value::from("idle")));
    let schema = compile(&TypeDesc::union([get.into(), put.into(), noop.into()])).unwrap();

    assert_eq!(debug(&schema, r#"{"op": "Get", "key": "k"}"#), r#"Get {key: "k"}"#);
    assert_eq!(debug(&schema, r#"{"why": "testing"}"#), r#"Noop {why: "testing"}"#);
    assert_eq!(debug(&schema, "{}"), r#"Noop {why: "idle"}"#);
    // A tag that matches nothing is still an error on objects.
    assert_eq!(debug(&schema, r#"{"op": "Del"}"#), "Invalid value 'Del' - at `$.op`");
}

#[test]
fn test_tagged_arrays() {
    let moves = StructDesc::new("Move")
        .tag(Tag::Int(1))
        .array_like(true)
        .field(FieldDesc::new("x", TypeDesc::int()))
        .field(FieldDesc::new("y", TypeDesc::int()));
    let jump = StructDesc::new("Jump")
        .tag(Tag::Int(2))
        .array_like(true)
        .field(FieldDesc::new("height", TypeDesc::float()));
    let schema = compile(&TypeDesc::list(TypeDesc::union([moves.into(), jump.into()]))).unwrap();

    assert_eq!(debug(&schema, "[[1, 3, 4], [2, 5]]"), "[Move {x: 3, y: 4}, Jump {height: 5.0}]");
    assert_eq!(debug(&schema, "[[1, 3, 4], [3, 1]]"), "Invalid value 3 - at `$[1][0]`");
    assert_eq!(debug(&schema, "[[]]"), "Expected `array` of at least length 1, got 0 - at `$[0]`");
    assert_eq!(debug(&schema, "[[1, 3]]"), "Expected `array` of at least length 3, got 2 - at `$[0]`");

    let value = json::decode(&schema, b"[[2, 0.5], [1, 0, -1]]").unwrap();
    assert_eq!(json::encode(Some(&schema), &value).unwrap(), b"[[2,0.5],[1,0,-1]]");
}

#[test]
fn test_scalar_classes() {
    let schema = compile(&TypeDesc::union([TypeDesc::int(), TypeDesc::str(), TypeDesc::Null])).unwrap();
    assert_eq!(json::decode(&schema, b"7").unwrap(), Value::Int(7));
    assert_eq!(json::decode(&schema, br#""seven""#).unwrap(), Value::from("seven"));
    assert_eq!(json::decode(&schema, b"null").unwrap(), Value::Null);
    assert_eq!(debug(&schema, "7.5"), "Expected `int | str | null`, got `float`");
    assert_eq!(debug(&schema, "[7]"), "Expected `int | str | null`, got `array`");

    let numbers = compile(&TypeDesc::union([TypeDesc::int(), TypeDesc::float()])).unwrap();
    assert_eq!(json::decode(&numbers, b"3").unwrap(), Value::Int(3));
    assert_eq!(json::decode(&numbers, b"3.0").unwrap(), Value::Float(3.0));

    let widening = compile(&TypeDesc::union([TypeDesc::float(), TypeDesc::str()])).unwrap();
    assert_eq!(json::decode(&widening, b"3").unwrap(), Value::Float(3.0));
    assert_eq!(json::encode(Some(&widening), &Value::Int(3)).unwrap(), b"3.0");
}

#[test]
fn test_lax_scalars() {
    let desc = Arc::new(TypeDesc::union([TypeDesc::int(), TypeDesc::Bool, TypeDesc::Null]));
    let schema = global_cache().get_or_compile(&desc).unwrap();
    let lax = json::Decoder::new(schema).with_options(DecodeOptions { strict: false, ..DecodeOptions::default() });

    assert_eq!(lax.decode(br#""12""#).unwrap(), Value::Int(12));
    assert_eq!(lax.decode(br#""false""#).unwrap(), Value::Bool(false));
    assert_eq!(lax.decode(br#""null""#).unwrap(), Value::Null);
    assert_eq!(lax.decode(b"2.0").unwrap(), Value::Int(2));
    assert_eq!(
        lax.decode(br#""twelve""#).unwrap_err().to_string(),
        "Expected `int | bool | null`, got `str`"
    );
    global_cache().remove(&desc);
}

#[test]
fn test_literals_and_enums() {
    let mode = TypeDesc::union([TypeDesc::literal(["r", "w"]), TypeDesc::int()]);
    let schema = compile(&mode).unwrap();
    assert_eq!(json::decode(&schema, br#""w""#).unwrap(), Value::from("w"));
    assert_eq!(json::decode(&schema, b"644").unwrap(), Value::Int(644));
    assert_eq!(debug(&schema, r#""x""#), "Invalid value 'x'");

    let level = EnumDesc::new("Level", [("LOW", 1), ("HIGH", 2)]);
    let schema = compile(&TypeDesc::union([level.into(), TypeDesc::str()])).unwrap();
    assert_eq!(debug(&schema, "2"), "Level::HIGH");
    assert_eq!(debug(&schema, "3"), "Invalid enum value 3");
    assert_eq!(debug(&schema, r#""low""#), r#""low""#);
}

#[test]
fn test_ambiguous_unions_are_rejected() {
    let rejected = |desc: TypeDesc| matches!(compile(&desc), Err(CompileError::AmbiguousUnion { .. }));

    assert!(rejected(TypeDesc::union([TypeDesc::str(), TypeDesc::bytes()])));
    assert!(rejected(TypeDesc::union([TypeDesc::list(TypeDesc::int()), TypeDesc::set(TypeDesc::str())])));
    assert!(rejected(TypeDesc::union([
        StructDesc::new("A").into(),
        StructDesc::new("B").into(),
    ])));
    assert!(rejected(TypeDesc::union([
        StructDesc::new("A").tag_field("kind").into(),
        StructDesc::new("B").tag_field("type").into(),
    ])));
    assert!(rejected(TypeDesc::union([
        TypeDesc::map(TypeDesc::str(), TypeDesc::int()),
        StructDesc::new("A").into(),
    ])));

    assert!(!rejected(TypeDesc::union([TypeDesc::int(), TypeDesc::float(), TypeDesc::str()])));
    assert!(matches!(
        compile(&TypeDesc::union([TypeDesc::int(), TypeDesc::Any])).unwrap().root(),
        Node::Any
    ));
}

#[test]
fn test_encode_writes_the_tag() {
    let (get, put) = commands();
    let schema = compile(&TypeDesc::union([get.into(), put.clone().into()])).unwrap();
    let put_schema = schema.find_struct("Put").unwrap();
    let value = StructValue::new(put_schema, [("key", Value::from("a")), ("value", Value::Int(1))]).unwrap();
    let value = Value::Struct(value);

    assert_eq!(json::encode(Some(&schema), &value).unwrap(), br#"{"op":"Put","key":"a","value":1}"#);
    assert_eq!(json::decode(&schema, &json::encode(None, &value).unwrap()).unwrap(), value);

    let other = compile(&StructDesc::new("Delete").field(FieldDesc::new("key", TypeDesc::str())).into()).unwrap();
    let stranger = StructValue::new(&other.structs()[0], [("key", Value::from("a"))]).unwrap();
    assert_eq!(
        json::encode(Some(&schema), &Value::Struct(stranger)).unwrap_err().to_string(),
        "Expected `object`, got `Delete`"
    );

    // A separate compile of the same description is the same struct.
    let again = compile(&put.into()).unwrap();
    let twin = StructValue::new(&again.structs()[0], [("key", Value::from("b")), ("value", Value::Int(2))]).unwrap();
    assert!(json::encode(Some(&schema), &Value::Struct(twin)).is_ok());
}
