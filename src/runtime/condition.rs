/// Condition evaluation for branch nodes
///
/// A condition node carries an ordered list of rule groups. The first group whose
/// rules hold selects its output slot; when none does, the node's default slot wins.
/// Rule fields and values go through the expression resolver before comparison.

use crate::runtime::context::ExecutionContext;
use crate::runtime::expression::{stringify, ExpressionResolver};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
    #[serde(other)]
    Unknown,
}

/// Anything other than `AND` combines with OR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Combinator {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    #[default]
    Or,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionRule {
    #[serde(default)]
    pub field: Value,
    pub operator: Operator,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionGroup {
    pub output: u64,
    #[serde(default)]
    pub rules: Vec<ConditionRule>,
    #[serde(default)]
    pub combinator: Combinator,
}

impl ConditionGroup {
    /// Lenient decoding: anything that is not a well-formed group yields `None`
    pub fn from_value(raw: &Value) -> Option<Self> {
        match serde_json::from_value(raw.clone()) {
            Ok(group) => Some(group),
            Err(e) => {
                tracing::warn!("⚠️ Ignoring malformed condition group: {}", e);
                None
            }
        }
    }
}

pub struct ConditionEvaluator<'a> {
    resolver: ExpressionResolver<'a>,
}

impl<'a> ConditionEvaluator<'a> {
    pub fn new(context: &'a ExecutionContext, input: &'a Value) -> Self {
        Self {
            resolver: ExpressionResolver::new(context, input),
        }
    }

    /// Slot of the first matching group, if any
    pub fn first_match(&self, groups: &[Value]) -> Option<u64> {
        groups
            .iter()
            .filter_map(ConditionGroup::from_value)
            .find(|group| self.evaluate_group(group))
            .map(|group| group.output)
    }

    pub fn select_output(&self, groups: &[Value], default_output: u64) -> u64 {
        self.first_match(groups).unwrap_or(default_output)
    }

    pub fn evaluate_group(&self, group: &ConditionGroup) -> bool {
        if group.rules.is_empty() {
            return false;
        }

        match group.combinator {
            Combinator::And => group.rules.iter().all(|rule| self.evaluate_rule(rule)),
            Combinator::Or | Combinator::Unrecognized => group.rules.iter().any(|rule| self.evaluate_rule(rule)),
        }
    }

    pub fn evaluate_rule(&self, rule: &ConditionRule) -> bool {
        let field = self.resolver.try_resolve(&rule.field);
        let expected = rule.value.as_ref().and_then(|v| self.resolver.try_resolve(v));
        let (a, b) = (field.as_ref(), expected.as_ref());

        match rule.operator {
            Operator::Equals => equals(a, b),
            Operator::NotEquals => !equals(a, b),
            Operator::GreaterThan => compare_numbers(a, b, |x, y| x > y),
            Operator::LessThan => compare_numbers(a, b, |x, y| x < y),
            Operator::GreaterThanOrEqual => compare_numbers(a, b, |x, y| x >= y),
            Operator::LessThanOrEqual => compare_numbers(a, b, |x, y| x <= y),
            Operator::Contains => contains(a, b),
            Operator::NotContains => !contains(a, b),
            Operator::StartsWith => compare_text(a, b, |s, p| s.starts_with(p)),
            Operator::EndsWith => compare_text(a, b, |s, p| s.ends_with(p)),
            Operator::IsEmpty => is_empty(a),
            Operator::IsNotEmpty => !is_empty(a),
            Operator::Unknown => {
                tracing::warn!("⚠️ Unknown condition operator, rule evaluates to false");
                false
            }
        }
    }
}

/// Absent and `null` are treated alike
fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Numbers, booleans (1/0) and strings that parse to a finite number after trimming
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
        }
        _ => None,
    }
}

fn lowercase_text(value: &Value) -> String {
    stringify(value).to_lowercase()
}

fn equals(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (present(a), present(b)) {
        (None, None) => true,
        (None, _) | (_, None) => false,
        (Some(a), Some(b)) => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => lowercase_text(a) == lowercase_text(b),
        },
    }
}

fn compare_numbers(a: Option<&Value>, b: Option<&Value>, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (present(a).and_then(as_number), present(b).and_then(as_number)) {
        (Some(x), Some(y)) => cmp(x, y),
        _ => false,
    }
}

fn compare_text(a: Option<&Value>, b: Option<&Value>, cmp: impl Fn(&str, &str) -> bool) -> bool {
    match (present(a), present(b)) {
        (Some(a), Some(b)) => cmp(&lowercase_text(a), &lowercase_text(b)),
        _ => false,
    }
}

fn contains(haystack: Option<&Value>, needle: Option<&Value>) -> bool {
    let (Some(haystack), Some(needle)) = (present(haystack), present(needle)) else {
        return false;
    };

    match haystack {
        Value::Array(items) => items.iter().any(|item| equals(Some(item), Some(needle))),
        other => lowercase_text(other).contains(&lowercase_text(needle)),
    }
}

fn is_empty(value: Option<&Value>) -> bool {
    match present(value) {
        None => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}
