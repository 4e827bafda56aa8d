/// Expression resolution for node parameters
///
/// Resolves `{{ ... }}` placeholders against run state:
/// - `{{$trigger.path}}` original trigger payload
/// - `{{$node.<nodeId>.path}}` a previously recorded node output (whole output if no path)
/// - `{{$json.path}}` the input handed to the current node
/// - `{{context.path}}` alias for `$trigger`
/// - `{{path}}` bare paths also read the trigger payload
///
/// A string that is exactly one placeholder resolves to the native JSON value. Mixed
/// strings get each placeholder stringified in place; unresolvable placeholders stay
/// as literal text. Resolution never fails: a missing segment is simply "no value".

use crate::runtime::context::ExecutionContext;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.+?)\}\}").expect("placeholder pattern is valid"));

static EMPTY_INPUT: LazyLock<Value> = LazyLock::new(|| Value::Object(Map::new()));

/// Resolver bound to one run and one node input
pub struct ExpressionResolver<'a> {
    context: &'a ExecutionContext,
    input: &'a Value,
}

impl<'a> ExpressionResolver<'a> {
    /// A `null` input behaves like an empty object
    pub fn new(context: &'a ExecutionContext, input: &'a Value) -> Self {
        let input = if input.is_null() { &*EMPTY_INPUT } else { input };
        Self { context, input }
    }

    /// Resolve recursively; an unresolvable whole-string placeholder becomes `null`
    pub fn resolve(&self, value: &Value) -> Value {
        self.try_resolve(value).unwrap_or(Value::Null)
    }

    /// Like `resolve`, but keeps "no value" distinct from an explicit `null`
    pub fn try_resolve(&self, value: &Value) -> Option<Value> {
        match value {
            Value::String(s) => self.resolve_string(s),
            Value::Array(items) => Some(Value::Array(items.iter().map(|item| self.resolve(item)).collect())),
            Value::Object(map) => Some(Value::Object(self.resolve_map(map))),
            other => Some(other.clone()),
        }
    }

    /// Resolve every entry of a parameter map; keys that resolve to nothing are dropped
    pub fn resolve_map(&self, map: &Map<String, Value>) -> Map<String, Value> {
        map.iter()
            .filter_map(|(key, value)| self.try_resolve(value).map(|resolved| (key.clone(), resolved)))
            .collect()
    }

    fn resolve_string(&self, s: &str) -> Option<Value> {
        let mut matches = PLACEHOLDER.captures_iter(s);
        let Some(first) = matches.next() else {
            return Some(Value::String(s.to_string()));
        };

        let whole = first.get(0).map(|m| m.range());
        if matches.next().is_none() && whole == Some(0..s.len()) {
            return self.resolve_expression(first[1].trim());
        }

        let replaced = PLACEHOLDER.replace_all(s, |caps: &Captures| match self.resolve_expression(caps[1].trim()) {
            Some(value) => stringify(&value),
            None => caps[0].to_string(),
        });
        Some(Value::String(replaced.into_owned()))
    }

    fn resolve_expression(&self, expression: &str) -> Option<Value> {
        if let Some(path) = expression.strip_prefix("$trigger.") {
            return lookup_path(&self.context.trigger_data, path);
        }

        if let Some(rest) = expression.strip_prefix("$node.") {
            return match rest.split_once('.') {
                Some((node_id, path)) => lookup_path(&self.context.node_output(node_id)?, path),
                None => self.context.node_output(rest),
            };
        }

        if let Some(path) = expression.strip_prefix("$json.") {
            return lookup_path(self.input, path);
        }

        if let Some(path) = expression.strip_prefix("context.") {
            return lookup_path(&self.context.trigger_data, path);
        }

        match expression {
            "$json" => Some(self.input.clone()),
            "$trigger" => Some(self.context.trigger_data.clone()),
            _ => lookup_path(&self.context.trigger_data, expression),
        }
    }
}

/// Dot-path traversal: object keys by name, array elements by index.
/// An empty path is no value.
pub fn lookup_path(root: &Value, path: &str) -> Option<Value> {
    if path.is_empty() {
        return None;
    }

    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current.clone())
}

/// Text form used when a placeholder is embedded in a larger string
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
