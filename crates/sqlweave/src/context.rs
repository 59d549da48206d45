//! Hierarchical, path-addressed substitution context.
//!
//! Paths are dotted (`filter.where.id`). Intermediate nodes are
//! [`Value::Map`]s and are created on demand by [`Context::set`].

use crate::error::WeaveResult;
use crate::value::Value;
use std::collections::BTreeMap;

/// Path-addressed tree of [`Value`]s.
///
/// `Clone` is a deep copy; statements rely on this to keep their defaults
/// untouched when call-time overrides are merged in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    root: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from any serializable value whose top level is a map.
    ///
    /// Non-map values end up under the empty path and are ignored.
    pub fn from_serialize<T: serde::Serialize>(value: &T) -> WeaveResult<Self> {
        let json = serde_json::to_value(value)?;
        Ok(Self::from(Value::from(json)))
    }

    /// Chainable `set`.
    pub fn with(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.set(path, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Top-level entries.
    pub fn entries(&self) -> &BTreeMap<String, Value> {
        &self.root
    }

    /// Resolve a dotted path. Missing segments yield `None`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = split_path(path);
        let first = segments.next()?;
        let mut node = self.root.get(first)?;
        for seg in segments {
            node = node.as_map()?.get(seg)?;
        }
        Some(node)
    }

    /// Resolve a path, falling back to [`Value::Null`].
    pub fn resolve(&self, path: &str) -> Value {
        self.get(path).cloned().unwrap_or(Value::Null)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Store a value at `path`, replacing whatever was there.
    ///
    /// Non-map values on the way are replaced by maps.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        let segments: Vec<&str> = split_path(path).collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };
        let mut node = &mut self.root;
        for seg in parents {
            let entry = node
                .entry((*seg).to_string())
                .or_insert_with(|| Value::Map(BTreeMap::new()));
            if !matches!(entry, Value::Map(_)) {
                *entry = Value::Map(BTreeMap::new());
            }
            match entry {
                Value::Map(map) => node = map,
                _ => return,
            }
        }
        node.insert((*last).to_string(), value.into());
    }

    /// Remove the subtree at `path`. Returns the removed value.
    pub fn unset(&mut self, path: &str) -> Option<Value> {
        let segments: Vec<&str> = split_path(path).collect();
        let (last, parents) = segments.split_last()?;
        let mut node = &mut self.root;
        for seg in parents {
            match node.get_mut(*seg) {
                Some(Value::Map(map)) => node = map,
                _ => return None,
            }
        }
        node.remove(*last)
    }

    /// Deep-merge `other` into `self`. On collision `other` wins, except that
    /// two maps are merged recursively.
    pub fn merge(&mut self, other: Context) {
        merge_maps(&mut self.root, other.root);
    }

    /// Deep-merge `other` into the subtree at `path`, creating it if needed.
    pub fn merge_at(&mut self, path: &str, other: Context) {
        if other.is_empty() {
            return;
        }
        if !matches!(self.get(path), Some(Value::Map(_))) {
            self.set(path, Value::Map(BTreeMap::new()));
        }
        if let Some(Value::Map(target)) = self.get_mut(path) {
            merge_maps(target, other.root);
        }
    }

    /// Non-destructive merge: a deep copy of `self` with `overrides` on top.
    pub fn merged(&self, overrides: Option<&Context>) -> Context {
        let mut out = self.clone();
        if let Some(o) = overrides {
            out.merge(o.clone());
        }
        out
    }

    fn get_mut(&mut self, path: &str) -> Option<&mut Value> {
        let mut segments = split_path(path);
        let first = segments.next()?;
        let mut node = self.root.get_mut(first)?;
        for seg in segments {
            match node {
                Value::Map(map) => node = map.get_mut(seg)?,
                _ => return None,
            }
        }
        Some(node)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|s| !s.is_empty())
}

fn merge_maps(target: &mut BTreeMap<String, Value>, source: BTreeMap<String, Value>) {
    for (key, value) in source {
        let incoming = match value {
            Value::Map(incoming) => incoming,
            other => {
                target.insert(key, other);
                continue;
            }
        };
        if let Some(Value::Map(existing)) = target.get_mut(&key) {
            merge_maps(existing, incoming);
            continue;
        }
        target.insert(key, Value::Map(incoming));
    }
}

impl From<Value> for Context {
    fn from(value: Value) -> Self {
        match value {
            Value::Map(root) => Self { root },
            _ => Self::default(),
        }
    }
}

impl From<Context> for Value {
    fn from(ctx: Context) -> Self {
        Value::Map(ctx.root)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    /// Keys are treated as dotted paths.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ctx = Context::new();
        for (k, v) in iter {
            ctx.set(&k.into(), v);
        }
        ctx
    }
}
