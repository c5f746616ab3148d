//! Frontmatter extraction and the polymorphic value tree.
//!
//! Frontmatter is a dynamically-typed YAML tree. It is modeled as a tagged
//! variant ([`Value`]) rather than `serde_yaml::Value` so the processor can
//! carry domain behavior the raw YAML type can't:
//!
//! - Map entries keep document order, and serialize in that order.
//! - Strings shaped like `YYYY-M[M]-D[D]` are reinterpreted as UTC dates
//!   with strict calendar validation — `2025-2-28` becomes a date,
//!   `2025-2-30` stays a string.
//! - String fields at any depth can be rewritten in place, which is how
//!   `![[embed]]` expressions get expanded once the media catalog exists.

use chrono::NaiveDate;
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::sync::LazyLock;

/// Candidate date strings: 4-digit year, 1-2 digit month and day.
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").unwrap());

/// A frontmatter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// A calendar date, serialized as midnight UTC in ISO-8601.
    Date(NaiveDate),
    Seq(Vec<Value>),
    /// Insertion-ordered mapping.
    Map(Vec<(String, Value)>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a key on a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// JavaScript-style truthiness, matching how the original platform
    /// evaluated the `public` flag: false, null, 0, 0.0, `""` are falsy,
    /// everything else (including `"false"`) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Date(_) | Value::Seq(_) | Value::Map(_) => true,
        }
    }

    /// Apply `f` to every string node, depth-first, mutating in place.
    pub fn for_each_string_mut<F: FnMut(&mut String)>(&mut self, f: &mut F) {
        match self {
            Value::String(s) => f(s),
            Value::Seq(items) => {
                for item in items {
                    item.for_each_string_mut(f);
                }
            }
            Value::Map(entries) => {
                for (_, v) in entries {
                    v.for_each_string_mut(f);
                }
            }
            _ => {}
        }
    }

    /// Mutable access to the top-level entries of a map value.
    pub fn entries_mut(&mut self) -> Option<&mut Vec<(String, Value)>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn entries(&self) -> &[(String, Value)] {
        match self {
            Value::Map(entries) => entries,
            _ => &[],
        }
    }

    fn from_yaml(yaml: serde_yaml::Value) -> Value {
        match yaml {
            serde_yaml::Value::Null => Value::Null,
            serde_yaml::Value::Bool(b) => Value::Bool(b),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_yaml::Value::String(s) => coerce_date(s),
            serde_yaml::Value::Sequence(seq) => {
                Value::Seq(seq.into_iter().map(Value::from_yaml).collect())
            }
            serde_yaml::Value::Mapping(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (yaml_key_to_string(&k), Value::from_yaml(v)))
                    .collect(),
            ),
            // Tags carry no meaning for frontmatter; keep the inner value.
            serde_yaml::Value::Tagged(tagged) => Value::from_yaml(tagged.value),
        }
    }
}

fn yaml_key_to_string(key: &serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Reinterpret `YYYY-M[M]-D[D]` strings as dates. Strict calendar
/// validation: day overflow (`2025-2-30`) keeps the string.
fn coerce_date(s: String) -> Value {
    if let Some(caps) = DATE_RE.captures(&s) {
        let year: i32 = caps[1].parse().unwrap_or(0);
        let month: u32 = caps[2].parse().unwrap_or(0);
        let day: u32 = caps[3].parse().unwrap_or(0);
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Value::Date(date);
        }
    }
    Value::String(s)
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Date(d) => {
                serializer.serialize_str(&format!("{}T00:00:00.000Z", d.format("%Y-%m-%d")))
            }
            Value::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

/// Split raw file content into `(frontmatter, body)`.
///
/// The frontmatter block is delimited by `---` lines at the very start of
/// the file. Returns an empty frontmatter string when there is none.
pub fn extract(content: &str) -> (&str, &str) {
    let Some(after_opening) = content.strip_prefix("---\n") else {
        return ("", content);
    };

    let Some(closing_pos) = after_opening.find("\n---") else {
        return ("", content);
    };

    let frontmatter = &after_opening[..closing_pos];
    let rest = &after_opening[closing_pos + "\n---".len()..];

    // Closing delimiter must end its line
    if rest.is_empty() || rest.starts_with('\n') || rest.starts_with("\r\n") {
        let body = rest.strip_prefix('\n').unwrap_or(rest);
        return (frontmatter, body);
    }

    ("", content)
}

/// Parse a frontmatter block into a [`Value`].
///
/// An empty block parses to an empty map so downstream code can treat
/// frontmatter uniformly.
pub fn parse(frontmatter: &str) -> Result<Value, serde_yaml::Error> {
    if frontmatter.trim().is_empty() {
        return Ok(Value::Map(Vec::new()));
    }
    let yaml: serde_yaml::Value = serde_yaml::from_str(frontmatter)?;
    let value = Value::from_yaml(yaml);
    match value {
        Value::Map(_) => Ok(value),
        // Scalar frontmatter is meaningless; normalize to empty
        _ => Ok(Value::Map(Vec::new())),
    }
}

/// Whether the file's frontmatter carries a truthy `public` key. Used by
/// the walker's inclusion rule; parse failures count as not public.
pub fn is_public(content: &str) -> bool {
    let (frontmatter, _) = extract(content);
    parse(frontmatter)
        .ok()
        .and_then(|v| v.get("public").map(Value::is_truthy))
        .unwrap_or(false)
}
