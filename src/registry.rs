//! A name-keyed plugin registry: tokenizers, token filters, analyzers, KV
//! stores, and highlighters are all looked up by name and built from a
//! small config map, the way bleve's registry resolves a `mapping.json`
//! into live components. Unlike bleve's package-level `init()` side
//! effects (`RegisterAnalyzer("standard", ...)` run at import time, with
//! no way to see or override what got registered), construction here is
//! explicit: call [`Registry::with_defaults`] or build one up by hand
//! with `register_*`, so the set of available plugins is always a value
//! you can inspect, not module-load-order-dependent global state.

use std::collections::HashMap;
use std::sync::Arc;

use crate::analysis::{Analyzer, SimpleAnalyzer, TokenFilter, Tokenizer};
use crate::error::{ConfigError, Result};
use crate::kv::memory::MemoryStore;
use crate::kv::merge::NoopMergeOperator;
use crate::kv::KvStore;
use crate::row::TermVector;

/// A constructor option. Kept intentionally small — a plugin needing
/// richer configuration takes a nested `Config` under one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

pub type Config = HashMap<String, ConfigValue>;

impl ConfigValue {
    /// Converts a JSON scalar into a `ConfigValue`. `null`, arrays, and
    /// objects have no config representation and return `None` — a
    /// plugin's config map is flat by design.
    fn from_json(value: serde_json::Value) -> Option<ConfigValue> {
        match value {
            serde_json::Value::String(s) => Some(ConfigValue::String(s)),
            serde_json::Value::Bool(b) => Some(ConfigValue::Bool(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(ConfigValue::Integer(i))
                } else {
                    n.as_f64().map(ConfigValue::Float)
                }
            }
            serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

/// Builds a plugin `Config` from a flat JSON object, the shape a
/// mapping/settings file hands a constructor. Non-scalar values are
/// dropped rather than rejected, since a plugin only reads the options it
/// declared via `require_*`/`optional_*`.
pub fn config_from_json(value: &serde_json::Value) -> Config {
    match value.as_object() {
        Some(object) => object
            .iter()
            .filter_map(|(k, v)| ConfigValue::from_json(v.clone()).map(|v| (k.clone(), v)))
            .collect(),
        None => Config::new(),
    }
}

pub fn require_str<'a>(config: &'a Config, name: &'static str) -> Result<&'a str> {
    match config.get(name) {
        Some(ConfigValue::String(value)) => Ok(value),
        Some(_) => Err(ConfigError::WrongOptionType { name, expected: "string" }.into()),
        None => Err(ConfigError::MissingOption(name).into()),
    }
}

pub fn require_integer(config: &Config, name: &'static str) -> Result<i64> {
    match config.get(name) {
        Some(ConfigValue::Integer(value)) => Ok(*value),
        Some(_) => Err(ConfigError::WrongOptionType { name, expected: "integer" }.into()),
        None => Err(ConfigError::MissingOption(name).into()),
    }
}

pub fn optional_integer(config: &Config, name: &'static str, default: i64) -> Result<i64> {
    match config.get(name) {
        Some(ConfigValue::Integer(value)) => Ok(*value),
        Some(_) => Err(ConfigError::WrongOptionType { name, expected: "integer" }.into()),
        None => Ok(default),
    }
}

/// Renders a highlighted fragment of `text` given the term vectors that
/// matched it.
pub trait Highlighter: Send + Sync {
    fn highlight(&self, text: &str, vectors: &[TermVector]) -> String;
}

/// Wraps each matched span in `<b>...</b>`, the simplest possible
/// highlighter and a reasonable default to register under "simple".
#[derive(Debug, Default, Clone, Copy)]
pub struct TagHighlighter;

impl Highlighter for TagHighlighter {
    fn highlight(&self, text: &str, vectors: &[TermVector]) -> String {
        let mut spans: Vec<(usize, usize)> =
            vectors.iter().map(|v| (v.start as usize, v.end as usize)).filter(|(s, e)| *e <= text.len() && s <= e).collect();
        spans.sort_unstable();

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for (start, end) in spans {
            if start < cursor {
                continue;
            }
            out.push_str(&text[cursor..start]);
            out.push_str("<b>");
            out.push_str(&text[start..end]);
            out.push_str("</b>");
            cursor = end;
        }
        out.push_str(&text[cursor..]);
        out
    }
}

pub type TokenizerConstructor = fn(&Config) -> Result<Arc<dyn Tokenizer>>;
pub type TokenFilterConstructor = fn(&Config) -> Result<Arc<dyn TokenFilter>>;
pub type AnalyzerConstructor = fn(&Config) -> Result<Arc<dyn Analyzer>>;
pub type KvStoreConstructor = fn(&Config) -> Result<Arc<dyn KvStore>>;
pub type HighlighterConstructor = fn(&Config) -> Result<Arc<dyn Highlighter>>;

/// Registered plugin constructors, looked up by name at index-open time.
#[derive(Default)]
pub struct Registry {
    tokenizers: HashMap<String, TokenizerConstructor>,
    token_filters: HashMap<String, TokenFilterConstructor>,
    analyzers: HashMap<String, AnalyzerConstructor>,
    kv_stores: HashMap<String, KvStoreConstructor>,
    highlighters: HashMap<String, HighlighterConstructor>,
}

macro_rules! registry_category {
    ($register:ident, $build:ident, $field:ident, $ctor:ty, $trait:path) => {
        pub fn $register(&mut self, name: impl Into<String>, ctor: $ctor) {
            self.$field.insert(name.into(), ctor);
        }

        pub fn $build(&self, name: &str, config: &Config) -> Result<Arc<dyn $trait>> {
            let ctor = self.$field.get(name).ok_or_else(|| ConfigError::UnknownPlugin(name.to_owned()))?;
            ctor(config)
        }
    };
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// A registry preloaded with this crate's own reference
    /// implementations: the `simple` analyzer, the `tag` highlighter,
    /// and the `memory` KV store.
    pub fn with_defaults() -> Registry {
        let mut registry = Registry::new();
        registry.register_analyzer("simple", |_config| Ok(Arc::new(SimpleAnalyzer::default())));
        registry.register_highlighter("tag", |_config| Ok(Arc::new(TagHighlighter)));
        registry.register_kv_store("memory", |_config| Ok(Arc::new(MemoryStore::new(Arc::new(NoopMergeOperator)))));
        registry
    }

    registry_category!(register_tokenizer, build_tokenizer, tokenizers, TokenizerConstructor, Tokenizer);
    registry_category!(register_token_filter, build_token_filter, token_filters, TokenFilterConstructor, TokenFilter);
    registry_category!(register_analyzer, build_analyzer, analyzers, AnalyzerConstructor, Analyzer);
    registry_category!(register_kv_store, build_kv_store, kv_stores, KvStoreConstructor, KvStore);
    registry_category!(register_highlighter, build_highlighter, highlighters, HighlighterConstructor, Highlighter);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build_the_simple_analyzer() {
        let registry = Registry::with_defaults();
        let config = Config::new();
        let analyzer = registry.build_analyzer("simple", &config).unwrap();
        let tokens = analyzer.analyze("a b");
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn unknown_plugin_is_an_error() {
        let registry = Registry::with_defaults();
        let config = Config::new();
        assert!(registry.build_analyzer("does-not-exist", &config).is_err());
    }

    #[test]
    fn tag_highlighter_wraps_matched_spans() {
        let highlighter = TagHighlighter;
        let vectors = vec![TermVector { field_id: 0, pos: 0, start: 0, end: 5, array_positions: Vec::new() }];
        assert_eq!(highlighter.highlight("hello world", &vectors), "<b>hello</b> world");
    }

    #[test]
    fn config_from_json_keeps_scalars_and_drops_nested_values() {
        let value = serde_json::json!({
            "name": "simple",
            "max_tokens": 64,
            "ratio": 0.5,
            "enabled": true,
            "nested": { "a": 1 },
            "list": [1, 2],
        });
        let config = config_from_json(&value);
        assert_eq!(config.get("name"), Some(&ConfigValue::String("simple".to_owned())));
        assert_eq!(config.get("max_tokens"), Some(&ConfigValue::Integer(64)));
        assert_eq!(config.get("ratio"), Some(&ConfigValue::Float(0.5)));
        assert_eq!(config.get("enabled"), Some(&ConfigValue::Bool(true)));
        assert!(!config.contains_key("nested"));
        assert!(!config.contains_key("list"));
    }

    #[test]
    fn require_str_reports_missing_vs_wrong_type() {
        let mut config = Config::new();
        assert!(require_str(&config, "name").is_err());
        config.insert("name".to_owned(), ConfigValue::Integer(1));
        assert!(require_str(&config, "name").is_err());
        config.insert("name".to_owned(), ConfigValue::String("ok".to_owned()));
        assert_eq!(require_str(&config, "name").unwrap(), "ok");
    }
}
