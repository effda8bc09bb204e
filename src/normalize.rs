//! Turns the model's reply text into a list of raw items.
//!
//! The reply contract has drifted across prompt revisions, so every shape
//! seen so far is accepted here and nowhere else:
//!
//! * a bare array of items
//! * an object holding the array under `results`, `ideas` or `items`,
//!   optionally with `input_analysis_tags`
//! * a single item object
//!
//! Text that is not JSON is searched for the first balanced `{...}` span.

use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};
use crate::models::RawResult;

/// Keys under which revisions have nested the item array, in lookup order.
pub const LEGACY_ARRAY_KEYS: [&str; 3] = ["results", "ideas", "items"];

pub const TAGS_KEY: &str = "input_analysis_tags";

/// Shape of a parsed reply before it is flattened.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyShape {
    Bare(Vec<Value>),
    Keyed {
        key: &'static str,
        tags: Vec<String>,
        items: Vec<Value>,
    },
    Single(Map<String, Value>),
}

/// A reply flattened to items plus whatever tags came with it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedReply {
    pub tags: Vec<String>,
    pub items: Vec<RawResult>,
}

impl NormalizedReply {
    /// Keeps the first `max` items; never pads.
    pub fn truncate(mut self, max: usize) -> Self {
        self.items.truncate(max);
        self
    }
}

/// Parses reply text all the way to items.
pub fn normalize_reply(text: &str) -> Result<NormalizedReply> {
    let value = parse_reply(text)?;
    let shape = classify(value)?;
    Ok(flatten(shape))
}

/// Strict JSON first, then fenced JSON, then the first balanced object.
pub fn parse_reply(text: &str) -> Result<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SchemaError::MalformedReply("empty reply".to_string()));
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    if let Some(inner) = strip_code_fence(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(inner) {
            return Ok(value);
        }
    }

    let span = first_object_span(trimmed).ok_or_else(|| {
        SchemaError::MalformedReply("no JSON object found in reply".to_string())
    })?;
    serde_json::from_str::<Value>(span).map_err(|e| {
        SchemaError::MalformedReply(format!("extracted object is not valid JSON: {e}"))
    })
}

pub fn classify(value: Value) -> Result<ReplyShape> {
    match value {
        Value::Array(items) => Ok(ReplyShape::Bare(items)),
        Value::Object(mut map) => {
            let key = LEGACY_ARRAY_KEYS
                .into_iter()
                .find(|k| map.get(*k).is_some_and(Value::is_array))
                .or_else(|| LEGACY_ARRAY_KEYS.into_iter().find(|k| map.contains_key(*k)));

            // An envelope without a usable array still carries its tags.
            let key = match key {
                Some(key) => key,
                None if map.contains_key(TAGS_KEY) => LEGACY_ARRAY_KEYS[0],
                None => return Ok(ReplyShape::Single(map)),
            };

            let items = match map.remove(key) {
                Some(Value::Array(items)) => items,
                Some(item @ Value::Object(_)) => vec![item],
                Some(other) => {
                    tracing::warn!("Ignoring '{}' of type {} in model reply", key, kind(&other));
                    Vec::new()
                }
                None => Vec::new(),
            };
            let tags = match map.remove(TAGS_KEY) {
                Some(Value::Array(tags)) => tags
                    .into_iter()
                    .filter_map(|t| match t {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
                _ => Vec::new(),
            };
            Ok(ReplyShape::Keyed { key, tags, items })
        }
        other => Err(SchemaError::MalformedReply(format!(
            "expected an array or object, got {}",
            kind(&other)
        ))),
    }
}

pub fn flatten(shape: ReplyShape) -> NormalizedReply {
    let (tags, values) = match shape {
        ReplyShape::Bare(items) => (Vec::new(), items),
        ReplyShape::Keyed { key, tags, items } => {
            tracing::debug!("Model reply carried {} items under '{}'", items.len(), key);
            (tags, items)
        }
        ReplyShape::Single(map) => {
            return NormalizedReply {
                tags: Vec::new(),
                items: vec![RawResult::from(map)],
            };
        }
    };

    let mut items = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::Object(map) => items.push(RawResult::from(map)),
            other => tracing::warn!("Dropping non-object item ({}) from model reply", kind(&other)),
        }
    }

    NormalizedReply { tags, items }
}

fn strip_code_fence(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("```")?;
    // Skip the info string ("json") up to the first newline.
    let body_start = rest.find('\n')? + 1;
    let body = &rest[body_start..];
    let end = body.rfind("```")?;
    Some(body[..end].trim())
}

/// First `{...}` span whose braces balance, ignoring braces inside strings.
pub fn first_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
