#![cfg(test)]

use keel::*;

fn inventory() -> Schema {
    let item = StructDesc::new("Item")
        .omit_defaults(true)
        .field(FieldDesc::new("sku", TypeDesc::str()))
        .field(FieldDesc::new("qty", TypeDesc::Int(IntConstraints::new().ge(0))))
        .field(FieldDesc::new("thumb", TypeDesc::bytes()).default(Value::from(Vec::<u8>::new())));
    let desc: TypeDesc = StructDesc::new("Inventory")
        .tag_field("kind")
        .field(FieldDesc::new("items", TypeDesc::list(item.into())))
        .field(FieldDesc::new("bins", TypeDesc::map(TypeDesc::int(), TypeDesc::str())))
        .into();
    compile(&desc).unwrap()
}

const DOC: &str = r#"{"kind":"Inventory","items":[{"sku":"a-1","qty":3,"thumb":"AAE="},{"sku":"b-2","qty":0}],"bins":{"7":"north"}}"#;

fn json_options() -> ConvertOptions {
    ConvertOptions {
        str_keys: true,
        bytes_as_base64: true,
        ..ConvertOptions::default()
    }
}

#[test]
fn test_generic_matches_json() {
    let schema = inventory();
    let value = json::decode(&schema, DOC.as_bytes()).unwrap();

    let generic = convert::to_generic(&value, &json_options(), &Hooks::new()).unwrap();
    assert_eq!(serde_json::to_string(&generic).unwrap(), DOC);
    assert_eq!(json::encode(Some(&schema), &value).unwrap(), DOC.as_bytes());

    let parsed: Value = serde_json::from_str(DOC).unwrap();
    let back = convert::from_generic(&parsed, &schema, &json_options(), &Hooks::new()).unwrap();
    assert_eq!(back, value);
}

#[test]
fn test_errors_match_json() {
    let schema = inventory();
    for doc in [
        r#"{"items":[{"sku":"a","qty":-1}],"bins":{}}"#,
        r#"{"items":[{"sku":"a","qty":1}],"bins":{"x":"north"}}"#,
        r#"{"items":[{"qty":1}],"bins":{}}"#,
        r#"{"kind":"Shelf","items":[],"bins":{}}"#,
    ] {
        let from_json = json::decode(&schema, doc.as_bytes()).unwrap_err();
        let parsed: Value = serde_json::from_str(doc).unwrap();
        let from_generic = convert::from_generic(&parsed, &schema, &json_options(), &Hooks::new()).unwrap_err();
        assert_eq!(from_generic, from_json, "{}", doc);
    }
}

#[test]
fn test_native_keys_and_bytes() {
    let schema = inventory();
    let value = json::decode(&schema, DOC.as_bytes()).unwrap();
    let generic = convert::to_generic(&value, &ConvertOptions::default(), &Hooks::new()).unwrap();

    let bins = &generic.as_map()[2];
    assert_eq!(bins.0, Value::from("bins"));
    assert_eq!(bins.1, Value::map_of(vec![(Value::Int(7), Value::from("north"))]));
    let first = &generic.as_map()[1].1[0];
    assert_eq!(first.as_map()[2].1, Value::from(vec![0u8, 1]));

    let back = convert::from_generic(&generic, &schema, &ConvertOptions::default(), &Hooks::new()).unwrap();
    assert_eq!(back, value);
}

#[test]
fn test_lax_conversion() {
    let schema = compile(&TypeDesc::Tuple(vec![TypeDesc::int(), TypeDesc::Bool, TypeDesc::float()])).unwrap();
    let parsed: Value = serde_json::from_str(r#"["12", "true", "1e3"]"#).unwrap();
    let lax = ConvertOptions {
        strict: false,
        ..ConvertOptions::default()
    };
    let value = convert::from_generic(&parsed, &schema, &lax, &Hooks::new()).unwrap();
    assert_eq!(format!("{:?}", value), "(12, true, 1000.0)");
    assert!(convert::from_generic(&parsed, &schema, &ConvertOptions::default(), &Hooks::new()).is_err());
}

#[test]
fn test_serialize_typed_values() {
    let schema = inventory();
    let value = json::decode(&schema, DOC.as_bytes()).unwrap();
    let items = &value.as_struct().unwrap().get("items").unwrap()[1];
    assert_eq!(serde_json::to_value(items).unwrap(), serde_json::json!({"sku": "b-2", "qty": 0}));

    let custom = Value::Custom(Custom::new(1u8));
    assert!(serde_json::to_string(&custom).is_err());
}
