//! Dictionaries, key resolution and placeholder interpolation

use crate::{I18nError, LocaleId, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("placeholder pattern is valid"));

/// Translated strings for one locale, addressed by dotted key paths.
///
/// Values are nested JSON objects with string leaves; a loaded dictionary is
/// never mutated.
///
/// ```
/// use glossa_i18n::Dictionary;
///
/// let dict = Dictionary::from_json(r#"{"nav": {"home": "Accueil"}}"#).unwrap();
/// assert_eq!(dict.resolve("nav.home"), Some("Accueil"));
/// assert_eq!(dict.resolve("nav"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    root: Map<String, Value>,
}

impl Dictionary {
    /// A dictionary with no entries; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a dictionary document. The top level must be a JSON object.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(I18nError::MalformedDictionary {
                locale: String::new(),
                message: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
        }
    }

    /// Like [`Dictionary::from_value`], attributing failures to `locale`.
    pub(crate) fn for_locale(locale: &LocaleId, value: Value) -> Result<Self> {
        Self::from_value(value).map_err(|err| match err {
            I18nError::MalformedDictionary { message, .. } => I18nError::MalformedDictionary {
                locale: locale.to_string(),
                message,
            },
            other => other,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Descend `key` segment by segment; `None` when a segment is missing or
    /// the terminal value is not a string.
    pub fn resolve(&self, key: &str) -> Option<&str> {
        let mut segments = key.split('.');
        let mut current = self.root.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        current.as_str()
    }

    /// Every leaf flattened to its dotted key, sorted.
    ///
    /// Non-string leaves are rendered as JSON so audits can report them.
    pub fn leaves(&self) -> BTreeMap<String, String> {
        fn walk(prefix: &str, value: &Value, out: &mut BTreeMap<String, String>) {
            match value {
                Value::Object(map) => {
                    for (key, child) in map {
                        let path = if prefix.is_empty() {
                            key.clone()
                        } else {
                            format!("{prefix}.{key}")
                        };
                        walk(&path, child, out);
                    }
                }
                Value::String(s) => {
                    out.insert(prefix.to_string(), s.clone());
                }
                other => {
                    out.insert(prefix.to_string(), other.to_string());
                }
            }
        }

        let mut out = BTreeMap::new();
        for (key, value) in &self.root {
            walk(key, value, &mut out);
        }
        out
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Interpolation arguments
// ============================================================================

/// A value substituted into a `{name}` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Str(s) => f.write_str(s),
            ArgValue::Int(n) => write!(f, "{}", n),
            // f64's Display already drops a zero fraction ("3", "2.5").
            ArgValue::Float(n) => write!(f, "{}", n),
            ArgValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        ArgValue::Str(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        ArgValue::Str(s)
    }
}

impl From<i32> for ArgValue {
    fn from(n: i32) -> Self {
        ArgValue::Int(n.into())
    }
}

impl From<i64> for ArgValue {
    fn from(n: i64) -> Self {
        ArgValue::Int(n)
    }
}

impl From<u32> for ArgValue {
    fn from(n: u32) -> Self {
        ArgValue::Int(n.into())
    }
}

impl From<usize> for ArgValue {
    fn from(n: usize) -> Self {
        i64::try_from(n)
            .map(ArgValue::Int)
            .unwrap_or(ArgValue::Float(n as f64))
    }
}

impl From<f64> for ArgValue {
    fn from(n: f64) -> Self {
        ArgValue::Float(n)
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        ArgValue::Bool(b)
    }
}

/// Named interpolation arguments.
///
/// ```
/// use glossa_i18n::Args;
///
/// let args = Args::new().with("name", "Ada").with("count", 3);
/// assert_eq!(args.get("count").map(|v| v.to_string()).as_deref(), Some("3"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<(String, ArgValue)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an argument.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ArgValue>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Args
where
    K: Into<String>,
    V: Into<ArgValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = Args::new();
        for (k, v) in iter {
            args.insert(k, v);
        }
        args
    }
}

/// Substitute `{name}` placeholders from `args`.
///
/// Placeholders without a matching argument stay in the output verbatim.
///
/// ```
/// use glossa_i18n::{Args, interpolate};
///
/// let args = Args::new().with("name", "X");
/// assert_eq!(interpolate("Hi {name}, {missing}", &args), "Hi X, {missing}");
/// ```
pub fn interpolate(template: &str, args: &Args) -> String {
    if args.is_empty() {
        return template.to_string();
    }
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match args.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
