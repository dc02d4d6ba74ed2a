//! Request body parsers.
//!
//! Each enabled parser is one pipeline stage. A parser handles a request
//! whose `Content-Type` matches one of its types and that no earlier parser
//! handled; it reads the body (bounded by `limit`), stores the decoded value
//! as a [`ParsedBody`] extension and puts the raw bytes back so later
//! extractors can still read them.
//!
//! Failures are forwarded as errors: `413` when the body exceeds the limit,
//! `400` when it cannot be decoded.

use crate::error::HttpError;
use crate::extractors::ParsedBody;
use crate::service::{Middleware, Next};
use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Default body size limit (100 KiB)
pub const DEFAULT_LIMIT: usize = 100 * 1024;

/// Options shared by every parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    /// Maximum body size in bytes
    pub limit: usize,
    /// Accepted content types; `type/*` and `*/*` are wildcards
    pub content_types: Vec<String>,
}

impl ParserOptions {
    fn with_type(content_type: &str) -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            content_types: vec![content_type.to_string()],
        }
    }

    fn matches(&self, content_type: &str) -> bool {
        self.content_types
            .iter()
            .any(|pattern| content_type_matches(pattern, content_type))
    }
}

/// `application/x-www-form-urlencoded` parser options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlencodedOptions {
    /// Common options
    pub common: ParserOptions,
    /// Build nested objects and arrays from bracketed keys
    pub extended: bool,
}

impl Default for UrlencodedOptions {
    fn default() -> Self {
        Self {
            common: ParserOptions::with_type("application/x-www-form-urlencoded"),
            extended: true,
        }
    }
}

/// `text/plain` parser options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOptions {
    /// Common options
    pub common: ParserOptions,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            common: ParserOptions::with_type("text/plain"),
        }
    }
}

/// `application/octet-stream` parser options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOptions {
    /// Common options
    pub common: ParserOptions,
}

impl Default for RawOptions {
    fn default() -> Self {
        Self {
            common: ParserOptions::with_type("application/octet-stream"),
        }
    }
}

/// `application/json` parser options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonOptions {
    /// Common options
    pub common: ParserOptions,
    /// Only accept objects and arrays at the top level
    pub strict: bool,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            common: ParserOptions::with_type("application/json"),
            strict: true,
        }
    }
}

/// Parsers to install at the head of a pipeline. `None` disables one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyParsers {
    /// Form parser
    pub urlencoded: Option<UrlencodedOptions>,
    /// Text parser
    pub text: Option<TextOptions>,
    /// Raw bytes parser
    pub raw: Option<RawOptions>,
    /// JSON parser
    pub json: Option<JsonOptions>,
}

impl BodyParsers {
    /// Every parser with its defaults
    #[must_use]
    pub fn all() -> Self {
        Self {
            urlencoded: Some(UrlencodedOptions::default()),
            text: Some(TextOptions::default()),
            raw: Some(RawOptions::default()),
            json: Some(JsonOptions::default()),
        }
    }

    /// Stages for the enabled parsers, in urlencoded, text, raw, json order,
    /// each with its name.
    #[must_use]
    pub fn stages(&self) -> Vec<(&'static str, Middleware)> {
        let mut stages = Vec::new();
        if let Some(options) = &self.urlencoded {
            let extended = options.extended;
            stages.push((
                "urlencoded",
                parser_stage(options.common.clone(), move |bytes| {
                    Ok(ParsedBody::Form(decode_form(&bytes, extended)))
                }),
            ));
        }
        if let Some(options) = &self.text {
            stages.push((
                "text",
                parser_stage(options.common.clone(), |bytes| {
                    Ok(ParsedBody::Text(String::from_utf8_lossy(&bytes).into_owned()))
                }),
            ));
        }
        if let Some(options) = &self.raw {
            stages.push((
                "raw",
                parser_stage(options.common.clone(), |bytes| Ok(ParsedBody::Raw(bytes))),
            ));
        }
        if let Some(options) = &self.json {
            let strict = options.strict;
            stages.push((
                "json",
                parser_stage(options.common.clone(), move |bytes| {
                    decode_json(&bytes, strict).map(ParsedBody::Json)
                }),
            ));
        }
        stages
    }
}

/// Whether `content_type` (parameters allowed) matches `pattern`.
pub(crate) fn content_type_matches(pattern: &str, content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let pattern = pattern.trim().to_ascii_lowercase();
    if pattern == "*/*" {
        return !essence.is_empty();
    }
    match pattern.strip_suffix("/*") {
        Some(main) => essence
            .split_once('/')
            .is_some_and(|(ty, _)| ty == main),
        None => essence == pattern,
    }
}

fn parser_stage<F>(options: ParserOptions, decode: F) -> Middleware
where
    F: Fn(Bytes) -> Result<ParsedBody, HttpError> + Send + Sync + 'static,
{
    let options = Arc::new(options);
    let decode = Arc::new(decode);
    Middleware::from_fn(move |req: Request, next: Next| {
        let options = Arc::clone(&options);
        let decode = Arc::clone(&decode);
        async move { parse_then_continue(req, next, &options, decode.as_ref()).await }
    })
}

async fn parse_then_continue(
    req: Request,
    next: Next,
    options: &ParserOptions,
    decode: &(dyn Fn(Bytes) -> Result<ParsedBody, HttpError> + Send + Sync),
) -> Response {
    if req.extensions().get::<ParsedBody>().is_some() {
        return next.run(req).await;
    }
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !options.matches(content_type) {
        return next.run(req).await;
    }

    let (mut parts, body) = req.into_parts();
    let declared = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > options.limit) {
        return HttpError::payload_too_large("request entity too large").into_response();
    }

    let bytes = match read_limited(body, options.limit).await {
        Ok(bytes) => bytes,
        Err(err) => return err.into_response(),
    };
    let parsed = match decode(bytes.clone()) {
        Ok(parsed) => parsed,
        Err(err) => return err.into_response(),
    };
    tracing::trace!(len = bytes.len(), "Parsed request body");
    parts.extensions.insert(parsed);
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

async fn read_limited(body: Body, limit: usize) -> Result<Bytes, HttpError> {
    let mut stream = std::pin::pin!(body.into_data_stream());
    let mut collected = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            HttpError::bad_request("request aborted").with_source(anyhow::Error::new(e))
        })?;
        if collected.len() + chunk.len() > limit {
            return Err(HttpError::payload_too_large("request entity too large"));
        }
        collected.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(collected))
}

fn decode_json(bytes: &[u8], strict: bool) -> Result<Value, HttpError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    let value: Value = serde_json::from_slice(bytes).map_err(|e| {
        HttpError::bad_request(format!("Invalid JSON body: {e}")).with_source(e)
    })?;
    if strict && !(value.is_object() || value.is_array()) {
        return Err(HttpError::bad_request(
            "Invalid JSON body: only objects and arrays are accepted",
        ));
    }
    Ok(value)
}

/// Bracket segments read from a form key; the rest of the key is kept as
/// one literal segment.
pub const MAX_FORM_DEPTH: usize = 5;

/// Highest numeric bracket index stored as an array position; larger
/// indexes become object keys.
pub const MAX_FORM_ARRAY_INDEX: usize = 20;

/// Form pairs decoded per body; later pairs are ignored.
pub const MAX_FORM_PARAMETERS: usize = 1000;

/// Decode a form body into a JSON object.
///
/// Flat mode keeps keys as they are; a key seen more than once collects its
/// values into an array. Extended mode also reads bracketed keys:
/// `a[b]=1` nests objects, `a[]=1` appends to arrays and `a[0]=1` fills
/// arrays by index. Nesting stops after [`MAX_FORM_DEPTH`] segments.
#[must_use]
pub fn decode_form(bytes: &[u8], extended: bool) -> Value {
    let mut root = Map::new();
    for (key, value) in url::form_urlencoded::parse(bytes).take(MAX_FORM_PARAMETERS) {
        let value = Value::String(value.into_owned());
        if extended {
            let path = split_bracket_key(&key);
            insert_nested(&mut root, &path, value);
        } else {
            insert_flat(&mut root, key.into_owned(), value);
        }
    }
    Value::Object(root)
}

fn insert_flat(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.get_mut(&key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let previous = existing.take();
            *existing = Value::Array(vec![previous, value]);
        }
        None => {
            map.insert(key, value);
        }
    }
}

/// `a[b][]` becomes `["a", "b", ""]`; malformed brackets keep the raw key.
/// Past [`MAX_FORM_DEPTH`] segments the remainder, brackets included, is
/// one more segment.
fn split_bracket_key(key: &str) -> Vec<String> {
    let Some(open) = key.find('[') else {
        return vec![key.to_string()];
    };
    if open == 0 || !key.ends_with(']') {
        return vec![key.to_string()];
    }
    let mut segments = vec![key[..open].to_string()];
    let mut rest = &key[open..];
    while segments.len() <= MAX_FORM_DEPTH {
        let Some(stripped) = rest.strip_prefix('[') else {
            break;
        };
        let Some(close) = stripped.find(']') else {
            return vec![key.to_string()];
        };
        segments.push(stripped[..close].to_string());
        rest = &stripped[close + 1..];
    }
    if rest.is_empty() {
        segments
    } else if segments.len() > MAX_FORM_DEPTH {
        segments.push(rest.to_string());
        segments
    } else {
        vec![key.to_string()]
    }
}

fn insert_nested(map: &mut Map<String, Value>, path: &[String], value: Value) {
    let Some((head, tail)) = path.split_first() else {
        return;
    };
    if tail.is_empty() {
        insert_flat(map, head.clone(), value);
        return;
    }
    let slot = map.entry(head.clone()).or_insert(Value::Null);
    insert_into(slot, tail, value);
}

/// Array position named by a bracket segment.
fn array_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok().filter(|i| *i <= MAX_FORM_ARRAY_INDEX)
}

fn insert_into(slot: &mut Value, path: &[String], value: Value) {
    let Some((head, tail)) = path.split_first() else {
        *slot = value;
        return;
    };
    let index = array_index(head);
    if head.is_empty() || (index.is_some() && !slot.is_object()) {
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        if let Value::Array(items) = slot {
            // Sparse indexes are compacted
            match index.filter(|i| *i < items.len()) {
                Some(i) if tail.is_empty() => {
                    let previous = items[i].take();
                    items[i] = match previous {
                        Value::Array(mut values) => {
                            values.push(value);
                            Value::Array(values)
                        }
                        previous => Value::Array(vec![previous, value]),
                    };
                }
                Some(i) => insert_into(&mut items[i], tail, value),
                None => {
                    let mut child = Value::Null;
                    insert_into(&mut child, tail, value);
                    items.push(child);
                }
            }
        }
        return;
    }
    if !slot.is_object() {
        let previous = slot.take();
        let mut map = Map::new();
        // An array met by an object key keeps its items under their indexes
        if let Value::Array(items) = previous {
            for (i, item) in items.into_iter().enumerate() {
                map.insert(i.to_string(), item);
            }
        }
        *slot = Value::Object(map);
    }
    if let Value::Object(map) = slot {
        insert_nested(map, path, value);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_content_type_matching() {
        assert!(content_type_matches("application/json", "application/json; charset=utf-8"));
        assert!(content_type_matches("text/*", "text/html"));
        assert!(content_type_matches("*/*", "image/png"));
        assert!(!content_type_matches("*/*", ""));
        assert!(!content_type_matches("application/json", "text/plain"));
        assert!(content_type_matches("Application/JSON", "application/json"));
    }

    #[test]
    fn test_flat_form() {
        let value = decode_form(b"a=1&b=two+words&a=3", false);
        assert_eq!(value, json!({"a": ["1", "3"], "b": "two words"}));
        let value = decode_form(b"a[b]=1", false);
        assert_eq!(value, json!({"a[b]": "1"}));
    }

    #[test]
    fn test_extended_form() {
        let value = decode_form(b"user[name]=bob&user[tags][]=x&user[tags][]=y&plain=1", true);
        assert_eq!(
            value,
            json!({"user": {"name": "bob", "tags": ["x", "y"]}, "plain": "1"})
        );
    }

    #[test]
    fn test_extended_form_malformed_keys_stay_flat() {
        let value = decode_form(b"a[b=1&[x]=2&c[d]e=3", true);
        assert_eq!(value, json!({"a[b": "1", "[x]": "2", "c[d]e": "3"}));
    }

    #[test]
    fn test_extended_form_deep_and_indexed_keys() {
        let value = decode_form(b"a[b][c][d]=1&a[b][c][e]=2&list[0]=x&list[1]=y&rows[0][id]=7&rows[0][name]=n", true);
        assert_eq!(
            value,
            json!({
                "a": {"b": {"c": {"d": "1", "e": "2"}}},
                "list": ["x", "y"],
                "rows": [{"id": "7", "name": "n"}],
            })
        );

        // Out-of-range indexes are plain keys
        let value = decode_form(b"big[21]=z", true);
        assert_eq!(value, json!({"big": {"21": "z"}}));
    }

    #[test]
    fn test_extended_form_depth_is_capped() {
        let value = decode_form(b"a[b][c][d][e][f][g][h]=1", true);
        assert_eq!(
            value,
            json!({"a": {"b": {"c": {"d": {"e": {"f": {"[g][h]": "1"}}}}}}})
        );
    }

    #[test]
    fn test_extended_form_bracket_flood_stays_bounded() {
        let mut body = String::from("a");
        body.push_str(&"[]".repeat(40_000));
        body.push_str("=1");
        let value = decode_form(body.as_bytes(), true);

        let mut depth = 0;
        let mut node = &value["a"];
        while let Some(first) = node.as_array().and_then(|items| items.first()) {
            depth += 1;
            node = first;
        }
        assert_eq!(depth, MAX_FORM_DEPTH);
        assert!(node.is_object());

        let many = "k[]=v&".repeat(MAX_FORM_PARAMETERS + 500);
        let value = decode_form(many.as_bytes(), true);
        assert_eq!(value["k"].as_array().unwrap().len(), MAX_FORM_PARAMETERS);
    }

    #[test]
    fn test_json_strict() {
        assert!(decode_json(b"\"text\"", true).is_err());
        assert_eq!(decode_json(b"\"text\"", false).unwrap(), json!("text"));
        assert_eq!(decode_json(b"[1]", true).unwrap(), json!([1]));
        assert_eq!(decode_json(b"", true).unwrap(), json!({}));
        assert_eq!(
            decode_json(b"{oops", true).unwrap_err().status(),
            axum::http::StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_read_limited() {
        let bytes = read_limited(Body::from("12345"), 5).await.unwrap();
        assert_eq!(&bytes[..], b"12345");
        let err = read_limited(Body::from("123456"), 5).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_stage_order() {
        let names: Vec<&str> = BodyParsers::all().stages().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["urlencoded", "text", "raw", "json"]);
        assert!(BodyParsers::default().stages().is_empty());
    }

    proptest! {
        #[test]
        fn prop_flat_form_keeps_every_value(pairs in proptest::collection::vec(("[a-z]{1,3}", "[a-z0-9 ]{0,5}"), 0..8)) {
            let encoded: String = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .finish();
            let decoded = decode_form(encoded.as_bytes(), false);
            let total: usize = decoded
                .as_object()
                .unwrap()
                .values()
                .map(|v| v.as_array().map_or(1, Vec::len))
                .sum();
            prop_assert_eq!(total, pairs.len());
        }

        #[test]
        fn prop_extended_form_accepts_any_key(key in "[a-z\\[\\]0-9]{0,40}", value in "[a-z]{0,4}") {
            let encoded: String = url::form_urlencoded::Serializer::new(String::new())
                .append_pair(&key, &value)
                .finish();
            let decoded = decode_form(encoded.as_bytes(), true);
            prop_assert!(decoded.is_object());
        }
    }
}
