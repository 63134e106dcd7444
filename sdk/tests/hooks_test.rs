#![cfg(test)]

use keel::*;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Date {
    year:  u16,
    month: u8,
    day:   u8,
}

impl Date {
    fn parse(text: &str) -> Option<Date> {
        let mut parts = text.splitn(3, '-');
        let date = Date {
            year:  parts.next()?.parse().ok()?,
            month: parts.next()?.parse().ok()?,
            day:   parts.next()?.parse().ok()?,
        };
        (1..=12).contains(&date.month).then_some(date)
    }
}

#[derive(Debug, PartialEq)]
struct Cents(i64);

fn event() -> Arc<Schema> {
    let desc: TypeDesc = StructDesc::new("Event")
        .field(FieldDesc::new("name", TypeDesc::str()))
        .field(FieldDesc::new("when", CustomDesc::new("Date", TypeDesc::str()).into()))
        .field(FieldDesc::new("price", CustomDesc::new("Cents", TypeDesc::float()).into()))
        .into();
    Arc::new(compile(&desc).unwrap())
}

fn dec_hooks() -> Hooks {
    Hooks::new().dec_hook(|custom, carrier| match custom.name.as_str() {
        "Date" => Date::parse(carrier.as_str())
            .map(|date| Value::Custom(Custom::new(date)))
            .ok_or_else(|| HookError::invalid(format!("Invalid date '{}'", carrier.as_str()))),
        "Cents" => Ok(Value::Custom(Custom::new(Cents((carrier.as_float() * 100.0).round() as i64)))),
        other => Err(HookError::fatal(format!("no decoder for {}", other))),
    })
}

fn enc_hooks() -> Hooks {
    Hooks::new().enc_hook(|value| match value {
        Value::Custom(custom) => {
            if let Some(date) = custom.downcast_ref::<Date>() {
                Ok(Value::from(format!("{:04}-{:02}-{:02}", date.year, date.month, date.day)))
            } else if let Some(cents) = custom.downcast_ref::<Cents>() {
                // Whole amounts come back as ints and are widened by the schema.
                match cents.0 % 100 {
                    0 => Ok(Value::Int(cents.0 / 100)),
                    _ => Ok(Value::Float(cents.0 as f64 / 100.0)),
                }
            } else {
                Err(HookError::fatal(format!("can't encode {}", custom.type_name())))
            }
        }
        other => Err(HookError::invalid(format!("unexpected {}", other.kind_name()))),
    })
}

#[test]
fn test_dec_hook() {
    let decoder = json::Decoder::new(event()).with_hooks(dec_hooks());
    let value = decoder
        .decode(br#"{"name": "launch", "when": "2024-03-09", "price": 12.5}"#)
        .unwrap();
    let event = value.as_struct().unwrap();
    let Some(Value::Custom(when)) = event.get("when") else {
        panic!("expected a custom value");
    };
    assert_eq!(when.downcast_ref::<Date>(), Some(&Date { year: 2024, month: 3, day: 9 }));
    assert_eq!(event.get("price"), Some(&Value::Custom(Custom::new(Cents(1250)))));

    assert_eq!(
        decoder
            .decode(br#"{"name": "launch", "when": "2024-13-09", "price": 1}"#)
            .unwrap_err()
            .to_string(),
        "Invalid date '2024-13-09' - at `$.when`"
    );
    // The carrier is validated before the hook runs.
    assert_eq!(
        decoder
            .decode(br#"{"name": "launch", "when": 20240309, "price": 1}"#)
            .unwrap_err()
            .to_string(),
        "Expected `str`, got `int` - at `$.when`"
    );
}

#[test]
fn test_without_hooks_the_carrier_is_kept() {
    let value = json::Decoder::new(event())
        .decode(br#"{"name": "launch", "when": "someday", "price": 3}"#)
        .unwrap();
    assert_eq!(format!("{:?}", value), r#"Event {name: "launch", when: "someday", price: 3.0}"#);
}

#[test]
fn test_fatal_errors_pass_through() {
    let schema = Arc::new(compile(&CustomDesc::new("Uuid", TypeDesc::str()).into()).unwrap());
    let err = json::Decoder::new(schema).with_hooks(dec_hooks()).decode(br#""abc""#).unwrap_err();
    assert_eq!(err, Error::Hook(HookError::fatal("no decoder for Uuid")));
    assert_eq!(err.to_string(), "no decoder for Uuid");
    assert_eq!(err.path(), None);
}

#[test]
fn test_enc_hook() {
    let schema = event();
    let decoder = msgpack::Decoder::new(schema.clone()).with_hooks(dec_hooks());
    let encoder = json::Encoder::new(Some(schema.clone())).with_hooks(enc_hooks());

    let value = json::Decoder::new(schema.clone())
        .with_hooks(dec_hooks())
        .decode(br#"{"name": "launch", "when": "2024-03-09", "price": 12}"#)
        .unwrap();
    assert_eq!(
        encoder.encode(&value).unwrap(),
        br#"{"name":"launch","when":"2024-03-09","price":12.0}"#
    );

    let packed = msgpack::Encoder::new(Some(schema)).with_hooks(enc_hooks()).encode(&value).unwrap();
    assert_eq!(decoder.decode(&packed).unwrap(), value);

    assert_eq!(
        json::encode(None, &value).unwrap_err().to_string(),
        "Encoding objects of type `hooks_test::Date` is unsupported - at `$.when`"
    );
}

#[test]
fn test_enc_hook_errors() {
    let encoder = json::Encoder::new(None).with_hooks(enc_hooks());
    let unknown = Value::List(vec![Value::Custom(Custom::new(7u32))]);
    assert_eq!(encoder.encode(&unknown).unwrap_err().to_string(), "can't encode u32");

    // A hook that hands back another custom value is not retried.
    let looping = json::Encoder::new(None).enc_hook(|value| Ok(value.clone().into_owned()));
    assert_eq!(
        looping.encode(&unknown).unwrap_err().to_string(),
        "Encoding objects of type `u32` is unsupported - at `$[0]`"
    );
}

#[test]
fn test_custom_map_keys() {
    let when = Value::Custom(Custom::new(Date { year: 1999, month: 12, day: 31 }));
    let value = Value::map_of(vec![(when, Value::Bool(true))]);
    let encoder = json::Encoder::new(None).with_hooks(enc_hooks());
    assert_eq!(encoder.encode(&value).unwrap(), br#"{"1999-12-31":true}"#);
    assert_eq!(
        json::encode(None, &value).unwrap_err().to_string(),
        "Only dicts with str-like or int-like keys are supported"
    );
}
