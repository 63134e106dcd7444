//! Decodes a newline-delimited stream of drawing commands, re-encodes each
//! one as MessagePack and prints its generic form as JSON.
//!
//! ```text
//! RUST_LOG=keel=trace cargo run -p keel-demo -- commands.ndjson
//! ```
//!
//! Decode options can be given as JSON in `KEEL_DECODE_OPTIONS`, for
//! example `{"strict": false}`.

use keel::{convert, json, msgpack, ConvertOptions, DecodeOptions, Framing, Hooks};
use keel_schema::{FieldDesc, FloatConstraints, StrConstraints, StructDesc, TypeDesc, Value};

use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SAMPLE: &str = r#"{"shape": "Circle", "center": [0, 0], "radius": 2.5}
{"shape": "Rect", "corner": [1, 1], "size": [3, 4], "label": "door"}

{"shape": "Rect", "corner": [1, 1], "size": [3, -4]}
{"shape": "Circle", "center": [2, 2], "radius": "7"}
{"shape": "Triangle"}
"#;

fn shapes() -> TypeDesc {
    let point = || TypeDesc::Tuple(vec![TypeDesc::float(), TypeDesc::float()]);
    let positive = || TypeDesc::Float(FloatConstraints::new().gt(0.0));

    let circle = StructDesc::new("Circle")
        .tag_field("shape")
        .field(FieldDesc::new("center", point()))
        .field(FieldDesc::new("radius", positive()));
    let rect = StructDesc::new("Rect")
        .tag_field("shape")
        .omit_defaults(true)
        .field(FieldDesc::new("corner", point()))
        .field(FieldDesc::new("size", TypeDesc::Tuple(vec![positive(), positive()])))
        .field(
            FieldDesc::new("label", TypeDesc::optional(TypeDesc::Str(StrConstraints::new().max(32))))
                .default(Value::Null),
        );
    TypeDesc::union([circle.into(), rect.into()])
}

fn decode_options() -> DecodeOptions {
    match std::env::var("KEEL_DECODE_OPTIONS") {
        Ok(text) => serde_json::from_str(&text).unwrap_or_else(|err| {
            warn!(%err, "ignoring KEEL_DECODE_OPTIONS");
            DecodeOptions::default()
        }),
        Err(_) => DecodeOptions::default(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let input = match std::env::args().nth(1) {
        Some(path) => std::fs::read(path)?,
        None => SAMPLE.as_bytes().to_vec(),
    };

    let desc = Arc::new(shapes());
    let decoder = json::Decoder::for_type(&desc)?.with_options(decode_options());
    let encoder = msgpack::Encoder::new(Some(decoder.schema().clone()));
    let generic = ConvertOptions {
        str_keys: true,
        ..ConvertOptions::default()
    };

    let (mut ok, mut failed) = (0, 0);
    for message in decoder.messages(&input, Framing::Newline) {
        let value = match message {
            Ok(value) => value,
            Err(err) => {
                warn!(%err, "skipping message");
                failed += 1;
                continue;
            }
        };
        let packed = encoder.encode(&value)?;
        let tree = convert::to_generic(&value, &generic, &Hooks::new())?;
        info!(bytes = packed.len(), "{:?}", value);
        println!("{}", serde_json::to_string(&tree)?);
        ok += 1;
    }

    info!(ok, failed, "done");
    Ok(())
}
