//! Encoding of the whole map to bytes. Defaults to pretty JSON via serde_json.
//!
//! Implement [`Codec`] to persist in another format.

use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::Arc;

/// Converts full map snapshots to and from bytes.
pub trait Codec: fmt::Debug + Send + Sync {
    /// Encode the full map.
    fn encode(&self, map: &Map<String, Value>) -> Result<Vec<u8>>;

    /// Decode a full map. Input that is not a whole map must be rejected
    /// with [`Error::Decode`] rather than read as empty.
    fn decode(&self, bytes: &[u8]) -> Result<Map<String, Value>>;
}

/// Called for every JSON object nested inside a stored value, innermost
/// first, as the file is decoded. Whatever it returns replaces the object.
pub type ObjectHook = Arc<dyn Fn(Map<String, Value>) -> Value + Send + Sync>;

/// Called for every value inside the map, outermost first, as the file is
/// encoded. `Some` replaces the value as written and its children are not
/// visited; `None` keeps it and descends into arrays and objects. Memory is
/// never touched.
///
/// Pair it with an [`ObjectHook`] that undoes it, so values rewritten on
/// read go back to disk in their stored form.
pub type EncodeHook = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// JSON codec.
///
/// Writes a single object with sorted top-level keys, indented by two
/// spaces, with every non-ASCII character escaped as `\uXXXX`. Reads any
/// JSON object document, escaped or not, pretty or compact.
#[derive(Clone)]
pub struct JsonCodec {
    indent: Option<usize>,
    ascii: bool,
    object_hook: Option<ObjectHook>,
    encode_hook: Option<EncodeHook>,
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self {
            indent: Some(2),
            ascii: true,
            object_hook: None,
            encode_hook: None,
        }
    }
}

impl JsonCodec {
    /// Two-space indent, ASCII-only output, no hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Indent nested values by `width` spaces.
    pub fn indent(mut self, width: usize) -> Self {
        self.indent = Some(width);
        self
    }

    /// Single line, no extra whitespace.
    pub fn compact(mut self) -> Self {
        self.indent = None;
        self
    }

    /// Escape non-ASCII characters on write (default: `true`).
    pub fn ascii(mut self, yes: bool) -> Self {
        self.ascii = yes;
        self
    }

    /// Install a hook that rewrites nested objects while decoding.
    pub fn object_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(Map<String, Value>) -> Value + Send + Sync + 'static,
    {
        self.object_hook = Some(Arc::new(hook));
        self
    }

    /// Install a hook that rewrites values while encoding.
    pub fn encode_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.encode_hook = Some(Arc::new(hook));
        self
    }

    fn write_sorted(&self, value: &impl Serialize) -> Result<Vec<u8>> {
        match self.indent {
            Some(width) => {
                let indent = vec![b' '; width];
                self.write_with(value, PrettyFormatter::with_indent(&indent))
            }
            None => self.write_with(value, CompactFormatter),
        }
    }

    fn write_with<F: Formatter>(&self, value: &impl Serialize, formatter: F) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(128);
        let result = if self.ascii {
            value.serialize(&mut serde_json::Serializer::with_formatter(
                &mut out,
                AsciiEscape(formatter),
            ))
        } else {
            value.serialize(&mut serde_json::Serializer::with_formatter(&mut out, formatter))
        };
        result.map_err(|e| Error::Encode(e.to_string()))?;
        Ok(out)
    }
}

impl fmt::Debug for JsonCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonCodec")
            .field("indent", &self.indent)
            .field("ascii", &self.ascii)
            .field("object_hook", &self.object_hook.is_some())
            .field("encode_hook", &self.encode_hook.is_some())
            .finish()
    }
}

impl Codec for JsonCodec {
    fn encode(&self, map: &Map<String, Value>) -> Result<Vec<u8>> {
        // serde_json's Map only sorts without `preserve_order`; sort here so
        // the file stays diffable either way.
        match &self.encode_hook {
            Some(hook) => {
                let sorted: BTreeMap<&str, Value> = map
                    .iter()
                    .map(|(k, v)| (k.as_str(), unapply_hook(v, hook.as_ref())))
                    .collect();
                self.write_sorted(&sorted)
            }
            None => {
                let sorted: BTreeMap<&str, &Value> =
                    map.iter().map(|(k, v)| (k.as_str(), v)).collect();
                self.write_sorted(&sorted)
            }
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<Map<String, Value>> {
        let map = match serde_json::from_slice::<Value>(bytes)? {
            Value::Object(map) => map,
            other => {
                return Err(Error::Decode(format!(
                    "expected a JSON object at the top level, found {}",
                    kind_of(&other)
                )))
            }
        };
        Ok(match &self.object_hook {
            Some(hook) => map
                .into_iter()
                .map(|(k, v)| (k, apply_hook(v, hook.as_ref())))
                .collect(),
            None => map,
        })
    }
}

fn apply_hook(value: Value, hook: &(dyn Fn(Map<String, Value>) -> Value + Send + Sync)) -> Value {
    match value {
        Value::Object(map) => {
            let map = map.into_iter().map(|(k, v)| (k, apply_hook(v, hook))).collect();
            hook(map)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(|v| apply_hook(v, hook)).collect()),
        other => other,
    }
}

fn unapply_hook(value: &Value, hook: &(dyn Fn(&Value) -> Option<Value> + Send + Sync)) -> Value {
    if let Some(replaced) = hook(value) {
        return replaced;
    }
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), unapply_hook(v, hook)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| unapply_hook(v, hook)).collect()),
        other => other.clone(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Wraps another formatter and writes non-ASCII characters as `\uXXXX`
/// escapes, using surrogate pairs outside the BMP.
struct AsciiEscape<F>(F);

impl<F: Formatter> Formatter for AsciiEscape<F> {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let bytes = fragment.as_bytes();
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }
            if start < i {
                writer.write_all(&bytes[start..i])?;
            }
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units).iter() {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(&bytes[start..])
    }

    fn begin_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.begin_array(writer)
    }

    fn end_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.end_array(writer)
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.begin_array_value(writer, first)
    }

    fn end_array_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.end_array_value(writer)
    }

    fn begin_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.begin_object(writer)
    }

    fn end_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.end_object(writer)
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.begin_object_key(writer, first)
    }

    fn end_object_key<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.end_object_key(writer)
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.begin_object_value(writer)
    }

    fn end_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.end_object_value(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map_of(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn default_is_pretty_two_space_sorted() {
        let map = map_of(json!({"b": [1, 2], "a": {"x": null}}));
        let out = String::from_utf8(JsonCodec::new().encode(&map).unwrap()).unwrap();
        assert_eq!(
            out,
            "{\n  \"a\": {\n    \"x\": null\n  },\n  \"b\": [\n    1,\n    2\n  ]\n}"
        );
    }

    #[test]
    fn compact_fits_on_one_line() {
        let map = map_of(json!({"k": {"n": 1}}));
        let out = JsonCodec::new().compact().encode(&map).unwrap();
        assert_eq!(out, br#"{"k":{"n":1}}"#);
    }

    #[test]
    fn custom_indent_width() {
        let map = map_of(json!({"k": 1}));
        let out = JsonCodec::new().indent(4).encode(&map).unwrap();
        assert_eq!(out, b"{\n    \"k\": 1\n}");
    }

    #[test]
    fn non_ascii_is_escaped() {
        let map = map_of(json!({"café": "naïve 🦀"}));
        let out = String::from_utf8(JsonCodec::new().compact().encode(&map).unwrap()).unwrap();
        assert_eq!(out, r#"{"caf\u00e9":"na\u00efve \ud83e\udd80"}"#);
        assert!(out.is_ascii());
        assert_eq!(JsonCodec::new().decode(out.as_bytes()).unwrap(), map);
    }

    #[test]
    fn escapes_compose_with_builtin_ones() {
        let map = map_of(json!({"q": "\"é\"\n"}));
        let out = String::from_utf8(JsonCodec::new().compact().encode(&map).unwrap()).unwrap();
        assert_eq!(out, r#"{"q":"\"\u00e9\"\n"}"#);
    }

    #[test]
    fn ascii_can_be_turned_off() {
        let map = map_of(json!({"k": "é"}));
        let out = String::from_utf8(
            JsonCodec::new().compact().ascii(false).encode(&map).unwrap(),
        )
        .unwrap();
        assert_eq!(out, "{\"k\":\"é\"}");
    }

    #[test]
    fn decode_rejects_empty_input() {
        assert!(matches!(JsonCodec::new().decode(b""), Err(Error::Decode(_))));
        assert!(matches!(JsonCodec::new().decode(b"  \n"), Err(Error::Decode(_))));
    }

    #[test]
    fn decode_rejects_non_object_documents() {
        let err = JsonCodec::new().decode(b"[1, 2]").unwrap_err();
        assert_eq!(
            err,
            Error::Decode("expected a JSON object at the top level, found an array".into())
        );
    }

    #[test]
    fn decode_rejects_truncated_documents() {
        assert!(matches!(
            JsonCodec::new().decode(br#"{"a": [1, 2"#),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn object_hook_runs_innermost_first_on_nested_objects() {
        let codec = JsonCodec::new().object_hook(|mut obj| {
            if let Some(Value::String(tag)) = obj.remove("__tag__") {
                return json!(format!("<{tag}>"));
            }
            obj.insert("seen".into(), json!(true));
            Value::Object(obj)
        });
        let decoded = codec
            .decode(br#"{"a": {"inner": {"__tag__": "when"}}, "b": [{"__tag__": "x"}], "c": 3}"#)
            .unwrap();
        assert_eq!(
            Value::Object(decoded),
            json!({"a": {"inner": "<when>", "seen": true}, "b": ["<x>"], "c": 3})
        );
    }

    fn tagged_dates() -> JsonCodec {
        JsonCodec::new()
            .compact()
            .object_hook(|obj| {
                if obj.len() == 1 {
                    if let Some(Value::String(day)) = obj.get("$date") {
                        return json!(format!("date:{day}"));
                    }
                }
                Value::Object(obj)
            })
            .encode_hook(|value| {
                let day = value.as_str()?.strip_prefix("date:")?;
                Some(json!({ "$date": day }))
            })
    }

    #[test]
    fn encode_hook_rewrites_nested_values_on_write() {
        let map = map_of(json!({
            "released": "date:2024-05-01",
            "history": [{"at": "date:2023-01-02", "note": "plain"}],
            "n": 1
        }));
        let out = String::from_utf8(tagged_dates().encode(&map).unwrap()).unwrap();
        assert_eq!(
            out,
            r#"{"history":[{"at":{"$date":"2023-01-02"},"note":"plain"}],"n":1,"released":{"$date":"2024-05-01"}}"#
        );
        assert_eq!(tagged_dates().decode(out.as_bytes()).unwrap(), map);
    }

    #[test]
    fn encode_hook_output_is_not_revisited() {
        let codec = JsonCodec::new()
            .compact()
            .encode_hook(|value| value.is_array().then(|| json!(["wrapped", value.clone()])));
        let out = codec.encode(&map_of(json!({"k": [1]}))).unwrap();
        assert_eq!(out, br#"{"k":["wrapped",[1]]}"#);
    }

    #[test]
    fn debug_hides_the_hooks() {
        let codec = JsonCodec::new().object_hook(Value::Object);
        let dbg = format!("{codec:?}");
        assert!(dbg.contains("object_hook: true"));
        assert!(dbg.contains("encode_hook: false"));
    }
}
