//! Field name to wire name rules.

use keel_schema::Rename;

/// Applies a struct's rename rule to a field name.
pub fn apply(rule: Rename, name: &str) -> String {
    match rule {
        Rename::Lower => name.to_lowercase(),
        Rename::Upper => name.to_uppercase(),
        Rename::Camel => to_camel_case(name),
        Rename::Pascal => to_pascal_case(name),
        Rename::Kebab => to_kebab_case(name),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().to_string() + chars.as_str(),
    }
}

fn words(s: &str) -> impl Iterator<Item = &str> {
    s.split('_').filter(|word| !word.is_empty())
}

fn to_pascal_case(s: &str) -> String {
    words(s).map(capitalize).collect()
}

fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, word) in words(s).enumerate() {
        if i == 0 {
            out.push_str(word);
        } else {
            out.push_str(&capitalize(word));
        }
    }
    out
}

fn to_kebab_case(s: &str) -> String {
    words(&to_snake_case(s)).collect::<Vec<_>>().join("-")
}

/// `fieldName` and `FieldName` become `field_name`; already-snake names
/// pass through lowercased.
fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut snake = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                // Split before an uppercase run ends: "HTTPServer" -> "http_server".
                if (!prev.is_uppercase() && prev != '_')
                    || (prev.is_uppercase() && chars.get(i + 1).is_some_and(|n| n.is_lowercase()))
                {
                    snake.push('_');
                }
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules() {
        assert_eq!(apply(Rename::Lower, "Field_One"), "field_one");
        assert_eq!(apply(Rename::Upper, "field_one"), "FIELD_ONE");
        assert_eq!(apply(Rename::Camel, "field_one_two"), "fieldOneTwo");
        assert_eq!(apply(Rename::Pascal, "field_one"), "FieldOne");
        assert_eq!(apply(Rename::Kebab, "field_one"), "field-one");
        assert_eq!(apply(Rename::Kebab, "_private_field_"), "private-field");
    }

    #[test]
    fn snake_case_splits_runs() {
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("fieldName"), "field_name");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(apply(Rename::Kebab, "userID"), "user-id");
    }
}
