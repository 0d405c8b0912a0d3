//! Narrative prompt composition
//!
//! Builds the text handed to the AI completion provider from a template's
//! narrative guidance, its `aiPrompts` configuration and the report values.
//! Officer identity is passed in explicitly; nothing here reads global state
//! or talks to the network.

use std::fmt::Write;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConditionError;
use crate::report::ReportValues;
use crate::template::{ReportCategory, Template};

/// Officer details included in generated narratives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficerProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub codename: Option<String>,
}

impl OfficerProfile {
    /// e.g. `Sgt. Jane Smith (Bravo-7)`, or `None` when nothing is known
    pub fn signature(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(rank) = self.rank.as_deref().filter(|s| !s.is_empty()) {
            parts.push(rank.to_string());
        }
        if let Some(name) = self.name.as_deref().filter(|s| !s.is_empty()) {
            parts.push(name.to_string());
        }
        let mut signature = parts.join(" ");
        if let Some(codename) = self.codename.as_deref().filter(|s| !s.is_empty()) {
            if signature.is_empty() {
                signature = codename.to_string();
            } else {
                signature = format!("{} ({})", signature, codename);
            }
        }
        (!signature.is_empty()).then_some(signature)
    }
}

/// A system/user prompt pair ready for a chat-style completion API
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NarrativePrompt {
    pub system: String,
    pub user: String,
}

fn category_phrase(category: ReportCategory) -> &'static str {
    match category {
        ReportCategory::Incident => "incident report",
        ReportCategory::Arrest => "arrest report",
        ReportCategory::Traffic => "traffic report",
        ReportCategory::Investigation => "investigation report",
        ReportCategory::UseOfForce => "use of force report",
        ReportCategory::FieldInterview => "field interview report",
        ReportCategory::Other => "report",
    }
}

fn ai_prompt<'a>(template: &'a Template, key: &str) -> Option<&'a str> {
    template
        .definition
        .ai_prompts
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) if items.is_empty() => None,
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(render_value)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Bool(true) => Some("yes".to_string()),
        Value::Bool(false) => Some("no".to_string()),
        other => Some(other.to_string()),
    }
}

/// Compose the narrative prompt for a report.
///
/// `aiPrompts.system` overrides the default system prompt and
/// `aiPrompts.instructions` is appended to the user prompt. Only visible
/// fields with a value are listed, in display order.
pub fn compose_prompt(
    template: &Template,
    values: &ReportValues,
    officer: &OfficerProfile,
) -> Result<NarrativePrompt, ConditionError> {
    let def = &template.definition;

    let mut system = match ai_prompt(template, "system") {
        Some(custom) => custom.to_string(),
        None => format!(
            "You are assisting a law enforcement officer in writing a {}. \
             Write in the first person, past tense, using factual and objective language.",
            category_phrase(def.report_type)
        ),
    };
    if let Some(guidance) = def.narrative_guidance.as_deref().filter(|s| !s.trim().is_empty()) {
        system.push_str("\n\n");
        system.push_str(guidance);
    }

    // Writing into a String cannot fail.
    let mut user = String::new();
    if let Some(signature) = officer.signature() {
        let _ = writeln!(user, "Reporting officer: {}", signature);
    }
    let _ = writeln!(user, "Report: {}", def.name);

    let visible = template.visible_fields(values)?;
    let details: Vec<(&str, String)> = visible
        .iter()
        .filter_map(|f| {
            values
                .get(&f.name)
                .and_then(render_value)
                .map(|v| (f.label.as_str(), v))
        })
        .collect();
    if !details.is_empty() {
        let _ = writeln!(user, "\nDetails:");
        for (label, value) in details {
            let _ = writeln!(user, "- {}: {}", label, value);
        }
    }

    let sections = template.sections_in_order();
    if !sections.is_empty() {
        let _ = writeln!(user, "\nOrganize the narrative into these sections:");
        for section in sections {
            let _ = writeln!(user, "- {}", section.title);
        }
    }

    if !def.narrative_prompts.is_empty() {
        let _ = writeln!(user, "\nMake sure the narrative answers:");
        for prompt in &def.narrative_prompts {
            let _ = writeln!(user, "- {}", prompt);
        }
    }

    if !def.statutes.is_empty() {
        let _ = writeln!(user, "\nRelevant statutes: {}", def.statutes.join(", "));
    }

    if let Some(instructions) = ai_prompt(template, "instructions") {
        let _ = writeln!(user, "\n{}", instructions);
    }

    Ok(NarrativePrompt {
        system,
        user: user.trim_end().to_string(),
    })
}
