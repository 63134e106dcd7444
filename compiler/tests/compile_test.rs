#![cfg(test)]

use keel_compiler::{compile, global_cache, CompileError, SchemaCache};
use keel_schema::*;
use std::sync::Arc;

fn point() -> Arc<StructDesc> {
    Arc::new(
        StructDesc::new("Point")
            .field(FieldDesc::new("x", TypeDesc::int()))
            .field(FieldDesc::new("y", TypeDesc::int()).default(Value::Int(0))),
    )
}

#[test]
fn test_compile_struct() {
    let schema = compile(&point().into()).expect("compile failed");
    let Node::Struct(index) = schema.root() else {
        panic!("expected a struct root, got {:?}", schema.root());
    };
    let point = schema.struct_at(*index);
    assert_eq!(point.name(), "Point");
    assert_eq!(point.fields().len(), 2);
    assert_eq!(point.field_index("y"), Some(1));
    assert_eq!(point.required_len(), 1);
    assert!(!point.is_trackable());
    assert_eq!(point.wire_kind(), "object");
}

#[test]
fn test_recursive_struct() {
    let node = Arc::new(
        StructDesc::new("Node")
            .field(FieldDesc::new("value", TypeDesc::int()))
            .field(
                FieldDesc::new("next", TypeDesc::optional(TypeDesc::reference("Node")))
                    .default(Value::Null),
            ),
    );
    let schema = compile(&node.into()).expect("compile failed");
    assert_eq!(schema.structs().len(), 1);
    let node = &schema.structs()[0];
    assert!(node.is_trackable());
    match &node.field(1).node {
        Node::Union(union) => {
            assert!(union.null);
            assert!(matches!(union.object, Some(ShapeMember::Node(Node::Struct(StructRef(0))))));
        }
        other => panic!("unexpected node {:?}", other),
    }
}

#[test]
fn test_nested_structs_are_shared() {
    let point = point();
    let line = Arc::new(
        StructDesc::new("Line")
            .field(FieldDesc::new("start", point.clone().into()))
            .field(FieldDesc::new("end", point.into())),
    );
    let schema = compile(&TypeDesc::list(line.into())).unwrap();
    assert_eq!(schema.structs().len(), 2);
    assert!(schema.find_struct("Point").is_some());
}

#[test]
fn test_union_expectations() {
    let color = EnumDesc::new("Color", [("RED", "red"), ("GREEN", "green")]);
    let desc = TypeDesc::union([
        TypeDesc::Bool,
        TypeDesc::float(),
        color.into(),
        TypeDesc::list(TypeDesc::int()),
        TypeDesc::Null,
    ]);
    let schema = compile(&desc).unwrap();
    assert_eq!(schema.root().expected(&schema), "float | str enum | bool | array | null");
}

#[test]
fn test_error_messages() {
    let errors: Vec<String> = vec![
        compile(&TypeDesc::reference("Missing")),
        compile(
            &StructDesc::new("Twice")
                .field(FieldDesc::new("a", TypeDesc::int()))
                .field(FieldDesc::new("a", TypeDesc::str()))
                .into(),
        ),
        compile(
            &StructDesc::new("Order")
                .field(FieldDesc::new("a", TypeDesc::int()).default(Value::Int(1)))
                .field(FieldDesc::new("b", TypeDesc::int()))
                .into(),
        ),
        compile(
            &StructDesc::new("Clash")
                .tag_field("kind")
                .field(FieldDesc::new("kind", TypeDesc::str()))
                .into(),
        ),
        compile(&EnumDesc::new("Mixed", [("A", LiteralValue::Int(1)), ("B", "b".into())]).into()),
        compile(&TypeDesc::set(TypeDesc::list(TypeDesc::int()))),
        compile(&TypeDesc::map(TypeDesc::Null, TypeDesc::int())),
        compile(&TypeDesc::union([TypeDesc::int(), TypeDesc::literal([1, 2])])),
        compile(&TypeDesc::union([TypeDesc::Raw, TypeDesc::int()])),
        compile(&TypeDesc::Str(StrConstraints::new().pattern("("))).map_err(|e| match e {
            // Regex error text belongs to the regex crate; keep only the prefix.
            CompileError::InvalidPattern { pattern, .. } => CompileError::InvalidPattern {
                pattern,
                message: "...".into(),
            },
            other => other,
        }),
    ]
    .into_iter()
    .map(|r| r.expect_err("expected a compile error").to_string())
    .collect();

    insta::assert_snapshot!(errors.join("\n"), @r###"
    The type "Missing" is not defined
    The field "a" is defined twice in "Twice"
    Required field "b" cannot follow optional fields in "Order"
    The field "kind" in "Clash" collides with the tag field
    The enum "Mixed" mixes str and int values
    Type `array<int>` is not hashable and can't be a set item or map key
    Type `null` can't be used as a map key
    Type `int | literal<1, 2>` is not supported: more than one int-like type (int, int enum, int literal)
    Type `raw | int` is not supported: `raw` can't be a union member
    Invalid pattern "(": ...
    "###);
}

#[test]
fn test_cache_reuses_schemas() {
    let cache = SchemaCache::new();
    let desc = Arc::new(TypeDesc::from(point()));
    let first = cache.get_or_compile(&desc).unwrap();
    let second = cache.get_or_compile(&desc).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let global = global_cache().get_or_compile(&desc).unwrap();
    assert!(!Arc::ptr_eq(&first, &global));
    assert!(Arc::ptr_eq(&global, &global_cache().get_or_compile(&desc).unwrap()));
    assert!(global_cache().remove(&desc));
}
