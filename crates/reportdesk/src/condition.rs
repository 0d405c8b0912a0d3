//! Conditional field visibility

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConditionError;

/// Rule making a field visible only when another field's current value
/// satisfies an operator.
///
/// Serialized as `{"field": ..., "operator": ..., "value": ...}`. Ordering
/// operators carry a numeric threshold, so a non-numeric threshold cannot be
/// represented once a definition has been validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operator", rename_all = "camelCase")]
pub enum ShowCondition {
    Equals { field: String, value: Value },
    NotEquals { field: String, value: Value },
    Contains { field: String, value: String },
    NotContains { field: String, value: String },
    GreaterThan { field: String, value: f64 },
    LessThan { field: String, value: f64 },
}

impl ShowCondition {
    /// Name of the field this condition reads
    pub fn source_field(&self) -> &str {
        match self {
            ShowCondition::Equals { field, .. }
            | ShowCondition::NotEquals { field, .. }
            | ShowCondition::Contains { field, .. }
            | ShowCondition::NotContains { field, .. }
            | ShowCondition::GreaterThan { field, .. }
            | ShowCondition::LessThan { field, .. } => field,
        }
    }

    /// Wire name of the operator
    pub fn operator(&self) -> &'static str {
        match self {
            ShowCondition::Equals { .. } => "equals",
            ShowCondition::NotEquals { .. } => "notEquals",
            ShowCondition::Contains { .. } => "contains",
            ShowCondition::NotContains { .. } => "notContains",
            ShowCondition::GreaterThan { .. } => "greaterThan",
            ShowCondition::LessThan { .. } => "lessThan",
        }
    }

    /// Evaluate against the current report values.
    ///
    /// An absent or null source value hides the field for the positive
    /// operators and shows it for the negated ones. A present value of the
    /// wrong shape is an error.
    pub fn evaluate(&self, values: &Map<String, Value>) -> Result<bool, ConditionError> {
        let current = values.get(self.source_field()).filter(|v| !v.is_null());

        match self {
            ShowCondition::Equals { value, .. } => {
                Ok(current.is_some_and(|c| loosely_equal(c, value)))
            }
            ShowCondition::NotEquals { value, .. } => {
                Ok(!current.is_some_and(|c| loosely_equal(c, value)))
            }
            ShowCondition::Contains { field, value } => match current {
                Some(c) => contains(field, "contains", c, value),
                None => Ok(false),
            },
            ShowCondition::NotContains { field, value } => match current {
                Some(c) => contains(field, "notContains", c, value).map(|found| !found),
                None => Ok(true),
            },
            ShowCondition::GreaterThan { field, value } => match current {
                Some(c) => Ok(numeric(field, "greaterThan", c)? > *value),
                None => Ok(false),
            },
            ShowCondition::LessThan { field, value } => match current {
                Some(c) => Ok(numeric(field, "lessThan", c)? < *value),
                None => Ok(false),
            },
        }
    }
}

/// Read a value as a number, accepting numeric strings from form inputs
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn numeric(field: &str, operator: &'static str, value: &Value) -> Result<f64, ConditionError> {
    as_number(value).ok_or_else(|| ConditionError::NotNumeric {
        field: field.to_string(),
        operator,
        found: describe(value),
    })
}

// Numbers compare by value so `1` equals `1.0` and `"1"`.
fn loosely_equal(current: &Value, expected: &Value) -> bool {
    if current == expected {
        return true;
    }
    match (current, expected) {
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            matches!((as_number(current), as_number(expected)), (Some(a), Some(b)) if a == b)
        }
        _ => false,
    }
}

fn contains(
    field: &str,
    operator: &'static str,
    current: &Value,
    needle: &str,
) -> Result<bool, ConditionError> {
    match current {
        Value::String(s) => Ok(s.contains(needle)),
        Value::Array(items) => Ok(items.iter().any(|item| match item {
            Value::String(s) => s == needle,
            Value::Number(n) => n.to_string() == needle,
            _ => false,
        })),
        other => Err(ConditionError::NotSearchable {
            field: field.to_string(),
            operator,
            found: describe(other),
        }),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("text \"{}\"", s),
        Value::Array(_) => "a list".to_string(),
        Value::Object(_) => "an object".to_string(),
    }
}
