//! Bracket-notation decoding of query strings and urlencoded form bodies.
//!
//! HTML forms only send flat `name=value` pairs. Field names carry the shape:
//!
//! | Wire | Decoded |
//! |---|---|
//! | `a=1` | `{a: "1"}` |
//! | `a=1&a=2` | `{a: ["1", "2"]}` |
//! | `a[]=1` | `{a: ["1"]}` |
//! | `a[b]=1` | `{a: {b: "1"}}` |
//! | `a[1]=y&a[0]=x` | `{a: ["x", "y"]}` |
//! | `a=1&a[b]=2` | `{a: {"0": "1", b: "2"}}` |
//!
//! Mixing shapes under one name never drops a value: a plain or pushed value
//! landing on a mapping takes the next free index key.
//!
//! Nesting stops after [`MAX_DEPTH`] bracket groups; whatever follows is kept
//! literally as the last key. Bracketed indices above [`MAX_INDEX`] stay
//! mapping keys.

use url::form_urlencoded;

use crate::value::{SessionData, Value};

/// Deepest nesting honoured in a field name.
pub const MAX_DEPTH: usize = 5;

/// Largest bracketed index that still produces a sequence.
pub const MAX_INDEX: usize = 20;

#[derive(Debug, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
    Push,
}

impl Segment {
    fn parse(inner: &str) -> Self {
        if inner.is_empty() {
            return Self::Push;
        }
        let canonical = inner.bytes().all(|b| b.is_ascii_digit())
            && (inner == "0" || !inner.starts_with('0'));
        match inner.parse() {
            Ok(i) if canonical => Self::Index(i),
            _ => Self::Key(inner.to_owned()),
        }
    }
}

/// Decodes a query string or `application/x-www-form-urlencoded` body.
pub fn parse(input: &[u8]) -> SessionData {
    let mut root = SessionData::new();
    for (name, value) in form_urlencoded::parse(input) {
        let (head, segments) = split_name(&name);
        assign(&mut root, head, &segments, value.into_owned());
    }
    for value in root.values_mut() {
        compact(value);
    }
    root
}

/// Rebuilds `path?query` from decoded fields, in bracket notation.
///
/// Decoding the result with [`parse`] gives back the same shape, except that
/// empty sequences and empty mappings disappear.
pub fn encode(path: &str, query: &SessionData) -> String {
    let mut out = form_urlencoded::Serializer::new(String::new());
    for (key, value) in query {
        append(&mut out, key, value);
    }
    let qs = out.finish();
    if qs.is_empty() { path.to_owned() } else { format!("{path}?{qs}") }
}

fn split_name(name: &str) -> (String, Vec<Segment>) {
    let literal = || (name.to_owned(), Vec::new());
    let Some(open) = name.find('[') else { return literal() };
    if open == 0 {
        return literal();
    }

    let (head, mut rest) = name.split_at(open);
    let mut segments = Vec::new();
    while segments.len() < MAX_DEPTH {
        let Some(inner) = rest.strip_prefix('[') else { break };
        let Some(close) = inner.find(']') else { break };
        segments.push(Segment::parse(&inner[..close]));
        rest = &inner[close + 1..];
    }
    if segments.is_empty() {
        return literal();
    }
    if !rest.is_empty() {
        segments.push(Segment::Key(rest.to_owned()));
    }
    (head.to_owned(), segments)
}

fn assign(target: &mut SessionData, key: String, rest: &[Segment], value: String) {
    match rest.split_first() {
        None => append_leaf(target, key, value),
        Some((Segment::Push, [])) => append_leaf_to_sequence(target, key, value),
        Some((segment, tail)) => {
            let slot = target.entry(key).or_insert_with(|| Value::Mapping(SessionData::new()));
            let child = as_mapping(slot);
            let child_key = match segment {
                Segment::Key(k) => k.clone(),
                Segment::Index(i) => i.to_string(),
                Segment::Push => next_index(child),
            };
            assign(child, child_key, tail, value);
        }
    }
}

fn append_leaf(target: &mut SessionData, key: String, value: String) {
    match target.get_mut(&key) {
        Some(Value::Sequence(items)) => items.push(Value::String(value)),
        Some(existing @ Value::String(_)) => {
            let previous = std::mem::replace(existing, Value::Sequence(Vec::new()));
            *existing = Value::Sequence(vec![previous, Value::String(value)]);
        }
        Some(Value::Mapping(map)) => {
            map.insert(next_index(map), Value::String(value));
        }
        Some(existing) => *existing = Value::String(value),
        None => {
            target.insert(key, Value::String(value));
        }
    }
}

fn append_leaf_to_sequence(target: &mut SessionData, key: String, value: String) {
    match target.get_mut(&key) {
        Some(Value::Sequence(items)) => items.push(Value::String(value)),
        Some(existing @ Value::String(_)) => {
            let previous = std::mem::replace(existing, Value::Sequence(Vec::new()));
            *existing = Value::Sequence(vec![previous, Value::String(value)]);
        }
        Some(Value::Mapping(map)) => {
            map.insert(next_index(map), Value::String(value));
        }
        _ => {
            target.insert(key, Value::Sequence(vec![Value::String(value)]));
        }
    }
}

/// Smallest index key not yet taken in `map`.
fn next_index(map: &SessionData) -> String {
    (0..)
        .map(|i: usize| i.to_string())
        .find(|k| !map.contains_key(k))
        .unwrap_or_default()
}

/// Turns `slot` into a mapping. Sequence elements keep their index; a scalar
/// moves to index `0`.
fn as_mapping(slot: &mut Value) -> &mut SessionData {
    if !matches!(slot, Value::Mapping(_)) {
        let previous = std::mem::replace(slot, Value::Mapping(SessionData::new()));
        if let Value::Mapping(map) = slot {
            match previous {
                Value::Sequence(items) => {
                    map.extend(items.into_iter().enumerate().map(|(i, v)| (i.to_string(), v)));
                }
                Value::Mapping(_) => {}
                scalar => {
                    map.insert("0".to_owned(), scalar);
                }
            }
        }
    }
    match slot {
        Value::Mapping(map) => map,
        _ => unreachable!("slot was just made a mapping"),
    }
}

/// Mappings keyed only by small indices become sequences, ordered by index.
fn compact(value: &mut Value) {
    match value {
        Value::Sequence(items) => items.iter_mut().for_each(compact),
        Value::Mapping(map) => {
            map.values_mut().for_each(compact);
            let indices: Option<Vec<usize>> = map
                .keys()
                .map(|k| match Segment::parse(k) {
                    Segment::Index(i) if i <= MAX_INDEX => Some(i),
                    _ => None,
                })
                .collect();
            if let Some(indices) = indices.filter(|i| !i.is_empty()) {
                let mut entries: Vec<_> = indices.into_iter().zip(std::mem::take(map).into_values()).collect();
                entries.sort_by_key(|(i, _)| *i);
                *value = Value::Sequence(entries.into_iter().map(|(_, v)| v).collect());
            }
        }
        _ => {}
    }
}

fn append(out: &mut form_urlencoded::Serializer<'_, String>, name: &str, value: &Value) {
    match value {
        Value::Sequence(items) => {
            for (i, item) in items.iter().enumerate() {
                if item.is_scalar() {
                    append(out, &format!("{name}[]"), item);
                } else {
                    append(out, &format!("{name}[{i}]"), item);
                }
            }
        }
        Value::Mapping(map) => {
            for (key, item) in map {
                append(out, &format!("{name}[{key}]"), item);
            }
        }
        scalar => {
            out.append_pair(name, &scalar.to_string());
        }
    }
}
