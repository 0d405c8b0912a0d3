//! Raw template definitions and their validation
//!
//! Drafts mirror the JSON a client submits, with every enumerated attribute
//! kept as a plain string. [`TemplateDraft::validate`] turns a draft into a
//! typed [`TemplateDefinition`] or reports every problem it found. Unknown
//! enumeration values are rejected rather than coerced to a default.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::condition::ShowCondition;
use crate::error::{ValidationError, ValidationIssue};
use crate::field::{Field, FieldType, InputSpec, Section};
use crate::template::{DepartmentId, ReportCategory, TemplateDefinition};
use crate::tier::SubscriptionTier;

/// Version label given to definitions that do not carry one
pub const DEFAULT_VERSION_LABEL: &str = "1.0";

/// Unvalidated template definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub report_type: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub sections: Vec<SectionDraft>,
    pub fields: Vec<FieldDraft>,
    pub narrative_guidance: Option<String>,
    pub narrative_prompts: Vec<String>,
    pub department_id: Option<String>,
    pub is_public: Option<bool>,
    pub required_subscription_tier: Option<String>,
    pub version_label: Option<String>,
    pub ai_prompts: Value,
    pub statutes: Vec<String>,
    pub regulations: Vec<String>,
}

/// Unvalidated attributes shared by sections and fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InputDraft {
    pub description: Option<String>,
    pub placeholder: Option<String>,
    pub help_text: Option<String>,
    pub required: Option<bool>,
    pub order: Option<i32>,
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    pub options: Vec<String>,
    pub validation: Map<String, Value>,
    pub default_value: Option<Value>,
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SectionDraft {
    pub title: Option<String>,
    #[serde(flatten)]
    pub input: InputDraft,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldDraft {
    pub name: Option<String>,
    pub label: Option<String>,
    #[serde(flatten)]
    pub input: InputDraft,
    pub show_condition: Option<ConditionDraft>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionDraft {
    pub field: Option<String>,
    pub operator: Option<String>,
    pub value: Value,
}

// Treats whitespace-only strings as missing.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn require(value: Option<String>, path: String, issues: &mut Vec<ValidationIssue>) -> String {
    match present(value) {
        Some(v) => v,
        None => {
            issues.push(ValidationIssue::new(path, "is required"));
            String::new()
        }
    }
}

fn parse_enum<T: std::str::FromStr>(
    raw: Option<String>,
    default: Option<T>,
    path: String,
    issues: &mut Vec<ValidationIssue>,
) -> Option<T> {
    match raw {
        Some(s) => match s.parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                issues.push(ValidationIssue::new(path, format!("unrecognized value '{}'", s)));
                None
            }
        },
        None => {
            if default.is_none() {
                issues.push(ValidationIssue::new(path, "is required"));
            }
            default
        }
    }
}

impl InputDraft {
    fn validate(self, path: &str, issues: &mut Vec<ValidationIssue>) -> InputSpec {
        let order = match self.order {
            Some(order) => order,
            None => {
                issues.push(ValidationIssue::new(format!("{}.order", path), "is required"));
                0
            }
        };

        let field_type = parse_enum(
            self.field_type,
            Some(FieldType::Text),
            format!("{}.type", path),
            issues,
        )
        .unwrap_or_default();

        if field_type.requires_options() && self.options.is_empty() {
            issues.push(ValidationIssue::new(
                format!("{}.options", path),
                format!("{} inputs need at least one option", field_type),
            ));
        }

        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                issues.push(ValidationIssue::new(
                    format!("{}.minLength", path),
                    format!("minLength {} exceeds maxLength {}", min, max),
                ));
            }
        }

        InputSpec {
            description: self.description,
            placeholder: self.placeholder,
            help_text: self.help_text,
            required: self.required.unwrap_or(false),
            order,
            field_type,
            options: self.options,
            validation: self.validation,
            default_value: self.default_value,
            min_length: self.min_length,
            max_length: self.max_length,
        }
    }
}

impl ConditionDraft {
    fn validate(self, path: &str, issues: &mut Vec<ValidationIssue>) -> Option<ShowCondition> {
        let field = present(self.field);
        if field.is_none() {
            issues.push(ValidationIssue::new(format!("{}.field", path), "is required"));
        }

        let Some(operator) = self.operator else {
            issues.push(ValidationIssue::new(format!("{}.operator", path), "is required"));
            return None;
        };
        let field = field?;
        let value_path = format!("{}.value", path);

        match operator.as_str() {
            "equals" => Some(ShowCondition::Equals { field, value: self.value }),
            "notEquals" => Some(ShowCondition::NotEquals { field, value: self.value }),
            "contains" | "notContains" => {
                let needle = match self.value {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    other => {
                        issues.push(ValidationIssue::new(
                            value_path,
                            format!("{} needs a text value, got {}", operator, other),
                        ));
                        return None;
                    }
                };
                if operator == "contains" {
                    Some(ShowCondition::Contains { field, value: needle })
                } else {
                    Some(ShowCondition::NotContains { field, value: needle })
                }
            }
            "greaterThan" | "lessThan" => {
                let Some(threshold) = crate::condition::as_number(&self.value) else {
                    issues.push(ValidationIssue::new(
                        value_path,
                        format!("{} needs a numeric value, got {}", operator, self.value),
                    ));
                    return None;
                };
                if operator == "greaterThan" {
                    Some(ShowCondition::GreaterThan { field, value: threshold })
                } else {
                    Some(ShowCondition::LessThan { field, value: threshold })
                }
            }
            other => {
                issues.push(ValidationIssue::new(
                    format!("{}.operator", path),
                    format!("unrecognized value '{}'", other),
                ));
                None
            }
        }
    }
}

fn check_unique_orders<'a>(
    collection: &str,
    orders: impl Iterator<Item = &'a i32>,
    issues: &mut Vec<ValidationIssue>,
) {
    let mut first_at: HashMap<i32, usize> = HashMap::new();
    for (i, order) in orders.enumerate() {
        if let Some(previous) = first_at.insert(*order, i) {
            issues.push(ValidationIssue::new(
                format!("{}[{}].order", collection, i),
                format!("order {} already used by {}[{}]", order, collection, previous),
            ));
            first_at.insert(*order, previous);
        }
    }
}

impl TemplateDraft {
    /// Validate the draft into a typed definition, collecting every issue
    pub fn validate(self) -> Result<TemplateDefinition, ValidationError> {
        let mut issues = Vec::new();

        let name = require(self.name, "name".to_string(), &mut issues);
        let report_type = parse_enum::<ReportCategory>(
            self.report_type,
            None,
            "reportType".to_string(),
            &mut issues,
        );
        let department_id = require(self.department_id, "departmentId".to_string(), &mut issues);
        let required_subscription_tier = parse_enum(
            self.required_subscription_tier,
            Some(SubscriptionTier::Free),
            "requiredSubscriptionTier".to_string(),
            &mut issues,
        )
        .unwrap_or_default();

        let sections: Vec<Section> = self
            .sections
            .into_iter()
            .enumerate()
            .map(|(i, draft)| {
                let path = format!("sections[{}]", i);
                Section {
                    title: require(draft.title, format!("{}.title", path), &mut issues),
                    input: draft.input.validate(&path, &mut issues),
                }
            })
            .collect();

        let mut fields: Vec<Field> = Vec::with_capacity(self.fields.len());
        let mut conditions: Vec<(usize, Option<ConditionDraft>)> = Vec::new();
        for (i, draft) in self.fields.into_iter().enumerate() {
            let path = format!("fields[{}]", i);
            fields.push(Field {
                name: require(draft.name, format!("{}.name", path), &mut issues),
                label: require(draft.label, format!("{}.label", path), &mut issues),
                input: draft.input.validate(&path, &mut issues),
                show_condition: None,
            });
            conditions.push((i, draft.show_condition));
        }

        check_unique_orders("sections", sections.iter().map(|s| &s.input.order), &mut issues);
        check_unique_orders("fields", fields.iter().map(|f| &f.input.order), &mut issues);

        let mut seen = HashSet::new();
        for (i, field) in fields.iter().enumerate() {
            if !field.name.is_empty() && !seen.insert(field.name.clone()) {
                issues.push(ValidationIssue::new(
                    format!("fields[{}].name", i),
                    format!("duplicate field name '{}'", field.name),
                ));
            }
        }

        // Conditions are resolved last so they can refer to any field name.
        for (i, draft) in conditions {
            let Some(draft) = draft else { continue };
            let path = format!("fields[{}].showCondition", i);
            let Some(condition) = draft.validate(&path, &mut issues) else {
                continue;
            };
            let source = condition.source_field();
            if source == fields[i].name {
                issues.push(ValidationIssue::new(
                    format!("{}.field", path),
                    "a field cannot depend on itself",
                ));
            } else if !seen.contains(source) {
                issues.push(ValidationIssue::new(
                    format!("{}.field", path),
                    format!("unknown field '{}'", source),
                ));
            }
            fields[i].show_condition = Some(condition);
        }

        ValidationError::check(issues)?;

        // Every required attribute was present, otherwise check() returned.
        let Some(report_type) = report_type else {
            return Err(ValidationError {
                issues: vec![ValidationIssue::new("reportType", "is required")],
            });
        };

        Ok(TemplateDefinition {
            name,
            description: self.description,
            report_type,
            icon: self.icon,
            color: self.color,
            sections,
            fields,
            narrative_guidance: self.narrative_guidance,
            narrative_prompts: self.narrative_prompts,
            department_id: DepartmentId(department_id),
            is_public: self.is_public.unwrap_or(false),
            required_subscription_tier,
            version_label: present(self.version_label)
                .unwrap_or_else(|| DEFAULT_VERSION_LABEL.to_string()),
            ai_prompts: self.ai_prompts,
            statutes: self.statutes,
            regulations: self.regulations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft(value: Value) -> TemplateDraft {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_minimal_draft_gets_defaults() {
        let def = draft(json!({
            "name": "Field Interview",
            "reportType": "field_interview",
            "departmentId": "metro"
        }))
        .validate()
        .unwrap();

        assert_eq!(def.report_type, ReportCategory::FieldInterview);
        assert_eq!(def.required_subscription_tier, SubscriptionTier::Free);
        assert!(!def.is_public);
        assert_eq!(def.version_label, DEFAULT_VERSION_LABEL);
    }

    #[test]
    fn test_missing_required_attributes_are_all_reported() {
        let err = draft(json!({
            "sections": [{"description": "no title or order"}],
            "fields": [{"type": "text"}]
        }))
        .validate()
        .unwrap_err();

        for path in [
            "name",
            "reportType",
            "departmentId",
            "sections[0].title",
            "sections[0].order",
            "fields[0].name",
            "fields[0].label",
            "fields[0].order",
        ] {
            assert!(err.has_issue_at(path), "expected issue at {}: {}", path, err);
        }
    }

    #[test]
    fn test_unrecognized_type_fails_instead_of_defaulting() {
        let err = draft(json!({
            "name": "Incident",
            "reportType": "incident",
            "departmentId": "metro",
            "fields": [{"name": "mood", "label": "Mood", "order": 1, "type": "slider"}]
        }))
        .validate()
        .unwrap_err();
        assert!(err.has_issue_at("fields[0].type"));
    }

    #[test]
    fn test_less_than_condition_is_parsed() {
        let def = draft(json!({
            "name": "Arrest",
            "reportType": "arrest",
            "departmentId": "metro",
            "fields": [
                {"name": "suspectAge", "label": "Age", "order": 1, "type": "number"},
                {"name": "guardian", "label": "Guardian", "order": 2,
                 "showCondition": {"field": "suspectAge", "operator": "lessThan", "value": "18"}}
            ]
        }))
        .validate()
        .unwrap();

        assert_eq!(
            def.fields[1].show_condition,
            Some(ShowCondition::LessThan {
                field: "suspectAge".to_string(),
                value: 18.0
            })
        );
    }

    #[test]
    fn test_unrecognized_operator_fails() {
        let err = draft(json!({
            "name": "Arrest",
            "reportType": "arrest",
            "departmentId": "metro",
            "fields": [
                {"name": "suspectAge", "label": "Age", "order": 1, "type": "number"},
                {"name": "guardian", "label": "Guardian", "order": 2,
                 "showCondition": {"field": "suspectAge", "operator": "atMost", "value": 18}}
            ]
        }))
        .validate()
        .unwrap_err();
        assert!(err.has_issue_at("fields[1].showCondition.operator"));
    }

    #[test]
    fn test_condition_thresholds_must_be_numeric() {
        let err = draft(json!({
            "name": "Arrest",
            "reportType": "arrest",
            "departmentId": "metro",
            "fields": [
                {"name": "priorConvictions", "label": "Priors", "order": 1, "type": "number"},
                {"name": "details", "label": "Details", "order": 2,
                 "showCondition": {"field": "priorConvictions", "operator": "greaterThan", "value": "some"}}
            ]
        }))
        .validate()
        .unwrap_err();
        assert!(err.has_issue_at("fields[1].showCondition.value"));
    }
}
