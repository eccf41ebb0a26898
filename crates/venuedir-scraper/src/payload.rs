//! Place-record extraction from intercepted internal API payloads.
//!
//! Payloads are deeply nested JSON arrays. A place record is recognised by
//! shape rather than position: `[<id-bearing value>, "<name>", ...]` where the
//! first element holds a place id (`0x…` or `/g/…`) somewhere inside it.

use serde_json::Value;

use crate::error::PayloadError;
use crate::types::DirectoryCard;

/// Anti-JSON-hijacking prefix some responses start with.
const XSSI_PREFIX: &str = ")]}'";

const PLACE_ID_PREFIXES: &[&str] = &["0x", "/g/"];
const CATEGORY_TAG_PREFIX: &str = "gcid:";

/// Nesting deeper than this is not walked.
///
/// Kept under serde_json's 128-level recursion limit so the cap, not the
/// parser, decides what a deep payload yields.
pub const MAX_WALK_DEPTH: usize = 96;

/// Parse one payload body into the place cards it carries, in document order.
///
/// # Errors
///
/// Returns [`PayloadError::Json`] when the body (after prefix stripping) is
/// not JSON, and [`PayloadError::NotContainer`] when the top level is a
/// scalar.
pub fn parse_payload(text: &str) -> Result<Vec<DirectoryCard>, PayloadError> {
    let body = strip_xssi_prefix(text);
    let root: Value = serde_json::from_str(body)?;
    match root {
        Value::Array(_) | Value::Object(_) => Ok(walk_places(&root)),
        other => Err(PayloadError::NotContainer {
            found: value_kind(&other),
        }),
    }
}

/// Parse every payload, skipping (and logging) the ones that fail.
#[must_use]
pub fn extract_cards<S: AsRef<str>>(payloads: &[S]) -> Vec<DirectoryCard> {
    let mut cards = Vec::new();
    for (index, payload) in payloads.iter().enumerate() {
        match parse_payload(payload.as_ref()) {
            Ok(found) => cards.extend(found),
            Err(e) => {
                tracing::debug!(index, error = %e, "skipping unparseable payload");
            }
        }
    }
    cards
}

fn strip_xssi_prefix(text: &str) -> &str {
    let trimmed = text.trim_start();
    trimmed
        .strip_prefix(XSSI_PREFIX)
        .map_or(trimmed, str::trim_start)
}

fn walk_places(root: &Value) -> Vec<DirectoryCard> {
    let mut cards = Vec::new();
    let mut stack: Vec<(&Value, usize)> = vec![(root, 0)];
    let mut truncated = false;

    while let Some((node, depth)) = stack.pop() {
        if depth > MAX_WALK_DEPTH {
            truncated = true;
            continue;
        }
        match node {
            Value::Array(items) => {
                if let Some(card) = place_from_entry(items) {
                    cards.push(card);
                }
                // Nested records share ancestors, so keep descending after a match.
                stack.extend(items.iter().rev().map(|child| (child, depth + 1)));
            }
            Value::Object(map) => {
                let children: Vec<&Value> = map.values().collect();
                stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
            }
            _ => {}
        }
    }

    if truncated {
        tracing::debug!(max_depth = MAX_WALK_DEPTH, "payload nesting truncated");
    }
    cards
}

fn place_from_entry(items: &[Value]) -> Option<DirectoryCard> {
    if items.len() < 2 {
        return None;
    }
    let name = items[1].as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    let place_id = find_string(std::slice::from_ref(&items[0]), |s| {
        PLACE_ID_PREFIXES.iter().any(|prefix| s.starts_with(prefix))
    })?;

    let mut card = DirectoryCard::named(name)?;
    card.link = Some(place_id.to_string());
    card.category = find_category(items).map(str::to_string);
    card.floor = find_string(items, |s| s.trim() != name && is_floor_label(s))
        .map(|s| s.trim().to_string());
    Some(card)
}

fn is_floor_label(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    lower.starts_with("level") || lower.starts_with("floor")
}

/// First string leaf under `roots` (depth-first, document order) accepted by `pred`.
fn find_string<'a>(roots: &'a [Value], pred: impl Fn(&str) -> bool) -> Option<&'a str> {
    let mut stack: Vec<(&Value, usize)> = roots.iter().rev().map(|root| (root, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        match node {
            Value::String(s) if pred(s.as_str()) => return Some(s.as_str()),
            Value::Array(items) if depth < MAX_WALK_DEPTH => {
                stack.extend(items.iter().rev().map(|child| (child, depth + 1)));
            }
            Value::Object(map) if depth < MAX_WALK_DEPTH => {
                let children: Vec<&Value> = map.values().collect();
                stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
            }
            _ => {}
        }
    }
    None
}

/// Label of the first `["<label>", "gcid:<id>"]` pair under `roots`.
fn find_category(roots: &[Value]) -> Option<&str> {
    let mut stack: Vec<(&Value, usize)> = roots.iter().rev().map(|root| (root, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        match node {
            Value::Array(items) => {
                if let [Value::String(label), Value::String(tag)] = items.as_slice() {
                    let label = label.trim();
                    if tag.starts_with(CATEGORY_TAG_PREFIX) && !label.is_empty() {
                        return Some(label);
                    }
                }
                if depth < MAX_WALK_DEPTH {
                    stack.extend(items.iter().rev().map(|child| (child, depth + 1)));
                }
            }
            Value::Object(map) if depth < MAX_WALK_DEPTH => {
                let children: Vec<&Value> = map.values().collect();
                stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
            }
            _ => {}
        }
    }
    None
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[path = "payload_test.rs"]
mod tests;
