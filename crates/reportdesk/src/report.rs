//! Validation of submitted report values against a template

use serde_json::{Map, Value};
use time::macros::format_description;
use time::{Date, Time};

use crate::condition::as_number;
use crate::error::{ValidationError, ValidationIssue};
use crate::field::{Field, FieldType};
use crate::template::Template;

/// Values of a report keyed by field name
pub type ReportValues = Map<String, Value>;

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn check_option(field: &Field, value: &str, path: &str, issues: &mut Vec<ValidationIssue>) {
    if !field.input.options.is_empty() && !field.input.options.iter().any(|o| o == value) {
        issues.push(ValidationIssue::new(
            path,
            format!("'{}' is not one of the options for {}", value, field.label),
        ));
    }
}

fn check_length(field: &Field, text: &str, path: &str, issues: &mut Vec<ValidationIssue>) {
    let len = text.chars().count() as u32;
    if let Some(min) = field.input.min_length {
        if len < min {
            issues.push(ValidationIssue::new(
                path,
                format!("must be at least {} characters", min),
            ));
        }
    }
    if let Some(max) = field.input.max_length {
        if len > max {
            issues.push(ValidationIssue::new(
                path,
                format!("must be at most {} characters", max),
            ));
        }
    }
}

fn check_value(field: &Field, value: &Value, issues: &mut Vec<ValidationIssue>) {
    let path = format!("values.{}", field.name);

    match (field.field_type(), value) {
        (FieldType::Text | FieldType::LongText, Value::String(text)) => {
            check_length(field, text, &path, issues);
        }
        (FieldType::Number, v) if as_number(v).is_some() => {}
        (FieldType::Date, Value::String(text)) => {
            if Date::parse(text, format_description!("[year]-[month]-[day]")).is_err() {
                issues.push(ValidationIssue::new(path, "must be a date (YYYY-MM-DD)"));
            }
        }
        (FieldType::Time, Value::String(text)) => {
            let parsed = Time::parse(text, format_description!("[hour]:[minute]"))
                .or_else(|_| Time::parse(text, format_description!("[hour]:[minute]:[second]")));
            if parsed.is_err() {
                issues.push(ValidationIssue::new(path, "must be a time (HH:MM)"));
            }
        }
        (FieldType::Select | FieldType::Radio, Value::String(choice)) => {
            check_option(field, choice, &path, issues);
        }
        (FieldType::Checkbox, Value::Bool(_)) if field.input.options.is_empty() => {}
        (field_type, Value::Array(items)) if field_type.is_multi_valued() => {
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{}[{}]", path, i);
                match item {
                    Value::String(choice) => check_option(field, choice, &item_path, issues),
                    _ => issues.push(ValidationIssue::new(item_path, "must be text")),
                }
            }
        }
        (FieldType::Location, Value::String(_) | Value::Object(_)) => {}
        (field_type, _) => {
            issues.push(ValidationIssue::new(
                path,
                format!("is not a valid {} value", field_type),
            ));
        }
    }
}

impl Template {
    /// Check a report submission against this template.
    ///
    /// Hidden fields are skipped entirely. A show-condition that cannot be
    /// evaluated because its source value has the wrong shape is reported
    /// against the source field.
    pub fn validate_report(&self, values: &ReportValues) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        for field in self.fields_in_order() {
            match self.is_visible(field, values) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    issues.push(ValidationIssue::new(
                        format!("values.{}", err.field()),
                        err.to_string(),
                    ));
                    continue;
                }
            }

            match values.get(&field.name) {
                Some(value) if !is_blank(value) => check_value(field, value, &mut issues),
                _ if field.input.required => {
                    issues.push(ValidationIssue::new(
                        format!("values.{}", field.name),
                        format!("{} is required", field.label),
                    ));
                }
                _ => {}
            }
        }

        // One bad source value can break several conditions.
        issues.dedup();
        ValidationError::check(issues)
    }
}
