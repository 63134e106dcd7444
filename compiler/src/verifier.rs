use crate::{compiler::Compiler, error::CompileError, utils::quote};
use keel_schema::{
    LiteralSchema, LiteralValue, Node, ShapeMember, StructRef, TagTable, TypeDesc, UnionSchema,
};

use std::sync::Arc;
use tracing::debug;

/// Wire shape classes. A union may hold at most one member per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Null,
    Bool,
    Int,
    Float,
    Text,
    Array,
    Object,
}

impl Class {
    fn describe(self) -> &'static str {
        match self {
            Class::Null => "null",
            Class::Bool => "bool",
            Class::Int => "int-like type (int, int enum, int literal)",
            Class::Float => "float",
            Class::Text => "str-like type (str, bytes, str enum, str literal)",
            Class::Array => "array-like type (list, set, tuple, array-like struct)",
            Class::Object => "object-like type (map, struct)",
        }
    }
}

fn flatten<'d>(members: &'d [TypeDesc], out: &mut Vec<&'d TypeDesc>) {
    for member in members {
        match member {
            TypeDesc::Union(inner) => flatten(inner, out),
            other => out.push(other),
        }
    }
}

/// Members competing for the array or object class.
#[derive(Default)]
struct Shape {
    container: Option<Node>,
    structs:   Vec<StructRef>,
}

/// Verifies and compiles a union.
///
/// Nested unions are flattened, literal members merged and `null` members
/// deduplicated; `any` absorbs the whole union. Every remaining member is
/// assigned a wire shape class, and two members in one class are rejected
/// unless they are structs told apart by a shared tag field.
pub(crate) fn union(
    compiler: &mut Compiler,
    desc: &TypeDesc,
    members: &[TypeDesc],
) -> Result<Node, CompileError> {
    let ambiguous = |reason: String| CompileError::AmbiguousUnion {
        ty: desc.to_string(),
        reason,
    };

    let mut flat = Vec::new();
    flatten(members, &mut flat);
    if flat.iter().any(|m| matches!(m, TypeDesc::Any)) {
        return Ok(Node::Any);
    }

    let mut union = UnionSchema::default();
    let mut literals: Vec<LiteralValue> = Vec::new();
    let mut array = Shape::default();
    let mut object = Shape::default();
    let mut count = 0;
    let mut only: Option<Node> = None;

    for member in flat {
        match member {
            TypeDesc::Null => {
                union.null = true;
                continue;
            }
            TypeDesc::Literal(values) => {
                for value in values {
                    if !literals.contains(value) {
                        literals.push(value.clone());
                    }
                }
                continue;
            }
            _ => {}
        }

        let node = compiler.node(member)?;
        let class = classify(compiler, &node)
            .ok_or_else(|| ambiguous(format!("`{}` can't be a union member", member)))?;
        count += 1;
        only = Some(node.clone());

        let slot = match class {
            Class::Null => {
                union.null = true;
                continue;
            }
            Class::Bool => {
                if union.bool {
                    return Err(ambiguous(format!("more than one {}", class.describe())));
                }
                union.bool = true;
                continue;
            }
            Class::Int => &mut union.int,
            Class::Float => &mut union.float,
            Class::Text => &mut union.text,
            Class::Array | Class::Object => {
                let shape = if class == Class::Array { &mut array } else { &mut object };
                match node {
                    Node::Struct(index) => shape.structs.push(index),
                    other => {
                        if shape.container.is_some() {
                            return Err(ambiguous(format!("more than one {}", class.describe())));
                        }
                        shape.container = Some(other);
                    }
                }
                continue;
            }
        };
        if slot.is_some() {
            return Err(ambiguous(format!("more than one {}", class.describe())));
        }
        *slot = Some(node);
    }

    if !literals.is_empty() {
        let (ints, strs): (Vec<_>, Vec<_>) = literals
            .into_iter()
            .partition(|v| matches!(v, LiteralValue::Int(_)));
        for (values, slot, class) in [(ints, &mut union.int, Class::Int), (strs, &mut union.text, Class::Text)] {
            if values.is_empty() {
                continue;
            }
            if slot.is_some() {
                return Err(ambiguous(format!("more than one {}", class.describe())));
            }
            count += 1;
            let node = Node::Literal(Arc::new(LiteralSchema::new(values)));
            only = Some(node.clone());
            *slot = Some(node);
        }
    }

    union.array = shape_member(compiler, array, Class::Array, &ambiguous)?;
    union.object = shape_member(compiler, object, Class::Object, &ambiguous)?;

    if !union.null && count == 1 {
        if let Some(node) = only {
            return Ok(node);
        }
    }
    if count == 0 {
        return Ok(Node::Null);
    }

    union.describe();
    debug!(ty = %desc, expected = %union.expected, "compiled union");
    Ok(Node::Union(Box::new(union)))
}

fn classify(compiler: &Compiler, node: &Node) -> Option<Class> {
    Some(match node {
        Node::Null => Class::Null,
        Node::Bool => Class::Bool,
        Node::Int(_) => Class::Int,
        Node::Float(_) => Class::Float,
        Node::Str(_) | Node::Bytes(_) => Class::Text,
        Node::Enum(schema) if schema.is_int() => Class::Int,
        Node::Enum(_) => Class::Text,
        Node::Literal(literal) if literal.has_ints() => Class::Int,
        Node::Literal(_) => Class::Text,
        Node::Array(_) | Node::Tuple(_) => Class::Array,
        Node::Map(_) => Class::Object,
        Node::Struct(index) if compiler.header(*index).options.array_like => Class::Array,
        Node::Struct(_) => Class::Object,
        Node::Custom(custom) => return classify(compiler, &custom.carrier),
        // Nested unions arrive flattened; these never classify.
        Node::Union(_) | Node::Any | Node::Raw => return None,
    })
}

fn shape_member(
    compiler: &Compiler,
    shape: Shape,
    class: Class,
    ambiguous: &impl Fn(String) -> CompileError,
) -> Result<Option<ShapeMember>, CompileError> {
    match (shape.container, shape.structs.as_slice()) {
        (None, []) => Ok(None),
        (Some(node), []) => Ok(Some(ShapeMember::Node(node))),
        (None, [single]) => Ok(Some(ShapeMember::Node(Node::Struct(*single)))),
        (Some(_), _) => Err(ambiguous(format!(
            "a struct can't share a union with another {}",
            class.describe()
        ))),
        (None, structs) => tag_table(compiler, structs, ambiguous).map(|t| Some(ShapeMember::Tagged(t))),
    }
}

fn tag_table(
    compiler: &Compiler,
    structs: &[StructRef],
    ambiguous: &impl Fn(String) -> CompileError,
) -> Result<TagTable, CompileError> {
    let mut table: Option<TagTable> = None;
    let mut fallback: Option<StructRef> = None;
    let mut owners: Vec<(LiteralValue, StructRef)> = Vec::new();

    for &index in structs {
        let header = compiler.header(index);
        let Some(tag) = &header.tag else {
            if let Some(previous) = fallback {
                return Err(ambiguous(format!(
                    "structs {} and {} are both untagged; a union allows at most one untagged struct",
                    quote(&compiler.header(previous).name),
                    quote(&header.name),
                )));
            }
            fallback = Some(index);
            continue;
        };
        let table = table.get_or_insert_with(|| TagTable::new(tag.field.clone()));
        if table.tag_field != tag.field {
            return Err(ambiguous(format!(
                "tagged structs must share one tag field, found {} and {}",
                quote(&table.tag_field),
                quote(&tag.field),
            )));
        }
        if !table.insert(&tag.value, index) {
            let first = owners
                .iter()
                .find(|(value, _)| *value == tag.value)
                .map(|(_, owner)| compiler.header(*owner).name.clone())
                .unwrap_or_default();
            return Err(CompileError::DuplicateTag {
                tag: tag.value.to_string(),
                first,
                second: header.name.clone(),
            });
        }
        owners.push((tag.value.clone(), index));
    }

    // At least two structs and at most one untagged, so a table exists.
    let mut table = table.unwrap_or_else(|| TagTable::new(crate::compiler::DEFAULT_TAG_FIELD));
    table.fallback = fallback;
    Ok(table)
}
