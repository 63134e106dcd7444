#![cfg(test)]

use keel::*;
use std::borrow::Cow;
use std::sync::Arc;

fn user() -> Arc<StructDesc> {
    Arc::new(
        StructDesc::new("User")
            .field(FieldDesc::new("name", TypeDesc::Str(StrConstraints::new().min(1))))
            .field(FieldDesc::new("age", TypeDesc::Int(IntConstraints::new().ge(0))))
            .field(FieldDesc::new("tags", TypeDesc::list(TypeDesc::str())).default_factory(|| Value::List(vec![]))),
    )
}

fn user_schema() -> Schema {
    compile(&user().into()).expect("compile failed")
}

fn error(schema: &Schema, input: &str) -> String {
    json::decode(schema, input.as_bytes()).unwrap_err().to_string()
}

#[test]
fn test_decode_struct() {
    let schema = user_schema();
    let value = json::decode(&schema, br#"{"age": 36, "name": "ada"}"#).unwrap();
    assert_eq!(format!("{:?}", value), r#"User {name: "ada", age: 36, tags: []}"#);

    let user = value.as_struct().unwrap();
    assert_eq!(user.get("age"), Some(&Value::Int(36)));
    match user.get("name") {
        Some(Value::Str(Cow::Borrowed(name))) => assert_eq!(*name, "ada"),
        other => panic!("expected a borrowed string, got {:?}", other),
    }
}

#[test]
fn test_error_messages() {
    let schema = user_schema();
    let messages: Vec<String> = [
        r#"{"name": "ada"}"#,
        r#"{"name": "", "age": 1}"#,
        r#"{"name": "ada", "age": -1}"#,
        r#"{"name": "ada", "age": 1, "tags": ["a", 2]}"#,
        r#"[1]"#,
        r#"{"name": "ada", "age": 1.5}"#,
        r#"{"name": "ada", "age": 1"#,
        r#"{"name": "ada", "age": 1} x"#,
        r#"{"name": "ada", "age": 1, "name": 5}"#,
    ]
    .iter()
    .map(|input| error(&schema, input))
    .collect();

    insta::assert_snapshot!(messages.join("\n"), @r###"
    Object missing required field `age`
    Expected `str` of length >= 1 - at `$.name`
    Expected `int` >= 0 - at `$.age`
    Expected `str`, got `int` - at `$.tags[1]`
    Expected `object`, got `array`
    Expected `int`, got `float` - at `$.age`
    JSON is malformed: unexpected end of input (byte 24)
    JSON is malformed: trailing characters (byte 26)
    Expected `str`, got `int` - at `$.name`
    "###);
}

#[test]
fn test_path_precision() {
    let schema = compile(&TypeDesc::list(TypeDesc::int())).unwrap();
    let err = json::decode(&schema, br#"[1,2,"x"]"#).unwrap_err();
    assert_eq!(err.path(), Some("$[2]"));
    assert_eq!(err.expected(), Some("int"));
    assert_eq!(err.got(), Some("str"));

    let nested = compile(&TypeDesc::map(TypeDesc::str(), TypeDesc::list(TypeDesc::Bool))).unwrap();
    let err = json::decode(&nested, br#"{"a": [true], "b": [false, null]}"#).unwrap_err();
    assert_eq!(err.to_string(), r#"Expected `bool`, got `null` - at `$["b"][1]`"#);
}

#[test]
fn test_unknown_fields() {
    let open: TypeDesc = StructDesc::new("Open").field(FieldDesc::new("a", TypeDesc::int())).into();
    let schema = compile(&open).unwrap();
    let value = json::decode(&schema, br#"{"a":1,"z":{"deep":[1,2,{"x":null}]}}"#).unwrap();
    assert_eq!(format!("{:?}", value), "Open {a: 1}");

    let closed: TypeDesc = StructDesc::new("Closed")
        .forbid_unknown_fields(true)
        .field(FieldDesc::new("a", TypeDesc::int()))
        .into();
    let schema = compile(&closed).unwrap();
    assert_eq!(error(&schema, r#"{"a":1,"z":99}"#), "Object contains unknown field `z`");
}

#[test]
fn test_unknown_fields_are_still_checked() {
    let open: TypeDesc = StructDesc::new("Open").field(FieldDesc::new("a", TypeDesc::int())).into();
    let schema = compile(&open).unwrap();
    let error = |input: &[u8]| json::decode(&schema, input).unwrap_err().to_string();

    insta::assert_snapshot!([
        error(br#"{"a":1,"z":"\q"}"#),
        error(b"{\"a\":1,\"z\":\"\xff\"}"),
        error(br#"{"a":1,"z":"\ud800"}"#),
        error(br#"{"a":1,"z":{"\x":1}}"#),
        error(br#"{"a":1,"z":["ok", "\u00zz"]}"#),
    ].join("\n"), @r###"
    JSON is malformed: invalid escape (byte 13)
    JSON is malformed: invalid UTF-8 (byte 12)
    JSON is malformed: unpaired surrogate (byte 14)
    JSON is malformed: invalid escape (byte 14)
    JSON is malformed: invalid unicode escape (byte 21)
    "###);
}

#[test]
fn test_lax_mode() {
    let desc = TypeDesc::Tuple(vec![TypeDesc::int(), TypeDesc::float(), TypeDesc::Bool, TypeDesc::Null, TypeDesc::Bool]);
    let schema = Arc::new(compile(&desc).unwrap());
    let input = br#"["12", "1.5", "true", "null", 0]"#;

    let strict = json::Decoder::new(schema.clone());
    assert_eq!(strict.decode(input).unwrap_err().to_string(), "Expected `int`, got `str` - at `$[0]`");

    let lax = json::Decoder::new(schema).with_options(DecodeOptions { strict: false, ..DecodeOptions::default() });
    assert_eq!(format!("{:?}", lax.decode(input).unwrap()), "(12, 1.5, true, null, false)");
    assert_eq!(
        lax.decode(br#"["x", 1, true, null, true]"#).unwrap_err().to_string(),
        "Expected `int`, got `str` - at `$[0]`"
    );
}

#[test]
fn test_numbers() {
    let ints = compile(&TypeDesc::list(TypeDesc::int())).unwrap();
    let value = json::decode(&ints, b"[9223372036854775807, 18446744073709551615, -123456789012345678901234567890]").unwrap();
    assert_eq!(value[0], Value::Int(i64::MAX));
    assert_eq!(value[1], Value::UInt(u64::MAX));
    assert!(matches!(value[2], Value::BigInt(_)));
    assert_eq!(
        json::encode(Some(&ints), &value).unwrap(),
        b"[9223372036854775807,18446744073709551615,-123456789012345678901234567890]"
    );

    let floats = compile(&TypeDesc::list(TypeDesc::float())).unwrap();
    let value = json::decode(&floats, b"[1, 9007199254740993, 123456789012345678901234567890, 2.5e-3]").unwrap();
    assert_eq!(value[0], Value::Float(1.0));
    assert_eq!(value[1], Value::Float(9007199254740992.0));
    assert_eq!(value[2], Value::Float(1.2345678901234568e29));
    assert_eq!(value[3], Value::Float(0.0025));

    let float = compile(&TypeDesc::float()).unwrap();
    let long = format!("9007199254740993{}e-900", "0".repeat(900));
    assert_eq!(json::decode(&float, long.as_bytes()).unwrap(), Value::Float(9007199254740992.0));
}

#[test]
fn test_bytes_are_base64() {
    let schema = compile(&TypeDesc::bytes()).unwrap();
    let value = json::decode(&schema, br#""aGVsbG8=""#).unwrap();
    assert_eq!(value, Value::from(&b"hello"[..]));
    assert_eq!(json::encode(Some(&schema), &value).unwrap(), br#""aGVsbG8=""#);
    assert_eq!(
        json::decode(&schema, br#""not base64!""#).unwrap_err().to_string(),
        "Expected `str` of valid base64"
    );
}

#[test]
fn test_int_keys() {
    let schema = compile(&TypeDesc::map(TypeDesc::int(), TypeDesc::str())).unwrap();
    let value = json::decode(&schema, br#"{"1": "a", "-2": "b"}"#).unwrap();
    assert_eq!(value.as_map()[1].0, Value::Int(-2));
    assert_eq!(json::encode(Some(&schema), &value).unwrap(), br#"{"1":"a","-2":"b"}"#);
    assert_eq!(error(&schema, r#"{"one": "a"}"#), "Expected `int`, got `str`");

    let float_keys = Value::map_of(vec![(Value::Float(1.5), Value::Null)]);
    assert_eq!(
        json::encode(None, &float_keys).unwrap_err().to_string(),
        "Only dicts with str-like or int-like keys are supported"
    );
}

#[test]
fn test_sets_and_maps_dedupe() {
    let schema = compile(&TypeDesc::set(TypeDesc::int())).unwrap();
    let value = json::decode(&schema, b"[3, 1, 3, 2, 1]").unwrap();
    assert_eq!(value, Value::Set(vec![Value::Int(3), Value::Int(1), Value::Int(2)]));

    let any = Schema::any();
    let value = json::decode(&any, br#"{"a": 1, "b": 2, "a": 3}"#).unwrap();
    assert_eq!(format!("{:?}", value), r#"{"a": 3, "b": 2}"#);
}

#[test]
fn test_raw_fields() {
    let desc: TypeDesc = StructDesc::new("Envelope")
        .field(FieldDesc::new("id", TypeDesc::int()))
        .field(FieldDesc::new("body", TypeDesc::Raw))
        .into();
    let schema = compile(&desc).unwrap();
    let input = br#"{"id": 1, "body": {"untouched": [1, 2, 3]} }"#;
    let value = json::decode(&schema, input).unwrap();
    let body = value.as_struct().unwrap().get("body").unwrap();
    assert_eq!(format!("{:?}", body), r#"Raw("{\"untouched\": [1, 2, 3]}")"#);
    assert_eq!(
        json::encode(Some(&schema), &value).unwrap(),
        br#"{"id":1,"body":{"untouched": [1, 2, 3]}}"#
    );
}

#[test]
fn test_encode_text() {
    let color = EnumDesc::new("Color", [("RED", "red"), ("GREEN", "green")]);
    let point: TypeDesc = StructDesc::new("Point")
        .tag(Tag::Str("pt".into()))
        .array_like(true)
        .omit_defaults(true)
        .field(FieldDesc::new("x", TypeDesc::float()))
        .field(FieldDesc::new("y", TypeDesc::float()).default(Value::Float(0.0)))
        .into();
    let shape: TypeDesc = StructDesc::new("Shape")
        .omit_defaults(true)
        .field(FieldDesc::new("label", TypeDesc::str()))
        .field(FieldDesc::new("color", color.into()))
        .field(FieldDesc::new("points", TypeDesc::list(point)))
        .field(FieldDesc::new("note", TypeDesc::optional(TypeDesc::str())).default(Value::Null))
        .into();
    let schema = compile(&shape).unwrap();

    let input = br#"{"label": "tab\there \"quoted\"", "color": "green", "points": [["pt", 1], ["pt", 2, 0.5]]}"#;
    let value = json::decode(&schema, input).unwrap();
    let text = String::from_utf8(json::encode(Some(&schema), &value).unwrap()).unwrap();
    insta::assert_snapshot!(text, @r###"{"label":"tab\there \"quoted\"","color":"green","points":[["pt",1.0],["pt",2.0,0.5]]}"###);
}

#[test]
fn test_encode_into() {
    let schema = compile(&TypeDesc::list(TypeDesc::int())).unwrap();
    let value = Value::List(vec![Value::Int(1), Value::Int(2)]);

    let mut buf = b"head".to_vec();
    let range = json::encode_into(Some(&schema), &value, &mut buf, 6).unwrap();
    assert_eq!(range, 6..11);
    assert_eq!(buf, b"head\0\0[1,2]");

    let range = json::encode_into(Some(&schema), &value, &mut buf, 2).unwrap();
    assert_eq!(range, 2..7);
    assert_eq!(buf, b"he[1,2]");

    let bad = Value::List(vec![Value::Custom(Custom::new(5u8))]);
    assert!(json::encode_into(None, &bad, &mut buf, 2).is_err());
    assert_eq!(buf, b"he");
}

#[test]
fn test_decoder_for_type_uses_the_cache() {
    let desc = Arc::new(TypeDesc::from(user()));
    let first = json::Decoder::for_type(&desc).unwrap();
    let second = json::Decoder::for_type(&desc).unwrap();
    assert!(Arc::ptr_eq(first.schema(), second.schema()));
    assert!(first.decode(br#"{"name": "x", "age": 0}"#).is_ok());
    assert!(global_cache().remove(&desc));
}
