//! Report templates

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::condition::ShowCondition;
use crate::error::ConditionError;
use crate::field::{Field, Section};
use crate::tier::SubscriptionTier;
use crate::usage::UsageStats;

/// Identifier of a template family; every version of a template shares it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub String);

impl TemplateId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        TemplateId(Uuid::new_v4().to_string())
    }
}

impl From<String> for TemplateId {
    fn from(s: String) -> Self {
        TemplateId(s)
    }
}

impl From<&str> for TemplateId {
    fn from(s: &str) -> Self {
        TemplateId(s.to_string())
    }
}

impl AsRef<str> for TemplateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a department owning templates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DepartmentId(pub String);

impl From<String> for DepartmentId {
    fn from(s: String) -> Self {
        DepartmentId(s)
    }
}

impl From<&str> for DepartmentId {
    fn from(s: &str) -> Self {
        DepartmentId(s.to_string())
    }
}

impl AsRef<str> for DepartmentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of a user as issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UserId(pub String);

impl From<String> for UserId {
    fn from(s: String) -> Self {
        UserId(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

string_enum! {
    /// Kind of report a template produces
    pub enum ReportCategory {
        Incident => "incident",
        Arrest => "arrest",
        Traffic => "traffic",
        Investigation => "investigation",
        UseOfForce => "use_of_force",
        FieldInterview => "field_interview",
        Other => "other",
    }
}

/// Address of one version within a template family
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionRef {
    pub id: TemplateId,
    pub version: u32,
}

/// The editable content of a template, as produced by validating a draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDefinition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub report_type: ReportCategory,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default)]
    pub sections: Vec<Section>,

    #[serde(default)]
    pub fields: Vec<Field>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative_guidance: Option<String>,

    #[serde(default)]
    pub narrative_prompts: Vec<String>,

    pub department_id: DepartmentId,

    #[serde(default)]
    pub is_public: bool,

    #[serde(default)]
    pub required_subscription_tier: SubscriptionTier,

    pub version_label: String,

    /// Free-form configuration consumed by the narrative generator
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub ai_prompts: Value,

    #[serde(default)]
    pub statutes: Vec<String>,

    #[serde(default)]
    pub regulations: Vec<String>,
}

/// A stored version of a report template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Family identifier shared by all versions
    pub id: TemplateId,

    /// Version ordinal within the family, starting at 1
    pub version: u32,

    #[serde(flatten)]
    pub definition: TemplateDefinition,

    pub created_by: UserId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_by: Option<UserId>,

    /// Running statistics, shared by the whole family
    #[serde(flatten)]
    pub usage: UsageStats,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Template {
    /// Create the first version of a new template family
    pub fn new(definition: TemplateDefinition, created_by: impl Into<UserId>) -> Self {
        Self::with_id(TemplateId::generate(), definition, created_by)
    }

    /// Create the first version with a specific family id (useful for testing)
    pub fn with_id(
        id: impl Into<TemplateId>,
        definition: TemplateDefinition,
        created_by: impl Into<UserId>,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Template {
            id: id.into(),
            version: 1,
            definition,
            created_by: created_by.into(),
            last_edited_by: None,
            usage: UsageStats::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Build the next version carrying a new definition.
    ///
    /// Identity, creator, creation time and usage statistics carry over.
    pub fn revise(&self, definition: TemplateDefinition, editor: impl Into<UserId>) -> Template {
        Template {
            id: self.id.clone(),
            version: self.version + 1,
            definition,
            created_by: self.created_by.clone(),
            last_edited_by: Some(editor.into()),
            usage: self.usage,
            created_at: self.created_at,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn version_ref(&self) -> VersionRef {
        VersionRef {
            id: self.id.clone(),
            version: self.version,
        }
    }

    /// The version this one was derived from, if any
    pub fn previous_version(&self) -> Option<VersionRef> {
        (self.version > 1).then(|| VersionRef {
            id: self.id.clone(),
            version: self.version - 1,
        })
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn is_public(&self) -> bool {
        self.definition.is_public
    }

    pub fn department_id(&self) -> &DepartmentId {
        &self.definition.department_id
    }

    pub fn required_tier(&self) -> SubscriptionTier {
        self.definition.required_subscription_tier
    }

    /// Look up a field by machine name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.definition.fields.iter().find(|f| f.name == name)
    }

    /// Sections sorted by display order; ties keep their stored order
    pub fn sections_in_order(&self) -> Vec<&Section> {
        let mut sections: Vec<&Section> = self.definition.sections.iter().collect();
        sections.sort_by_key(|s| s.order());
        sections
    }

    /// Fields sorted by display order; ties keep their stored order
    pub fn fields_in_order(&self) -> Vec<&Field> {
        let mut fields: Vec<&Field> = self.definition.fields.iter().collect();
        fields.sort_by_key(|f| f.order());
        fields
    }

    /// Whether a field is rendered given the current report values.
    ///
    /// A condition whose source field is itself hidden sees that source as
    /// absent, so hiding a field also hides whatever chains off it.
    pub fn is_visible(&self, field: &Field, values: &Map<String, Value>) -> Result<bool, ConditionError> {
        self.resolve_visibility(field, values, self.definition.fields.len())
    }

    // `depth` bounds the walk along condition chains, so a cycle ends by
    // treating its last source as shown.
    fn resolve_visibility(
        &self,
        field: &Field,
        values: &Map<String, Value>,
        depth: usize,
    ) -> Result<bool, ConditionError> {
        let Some(condition) = &field.show_condition else {
            return Ok(true);
        };

        let source_shown = match self.field(condition.source_field()) {
            Some(source) if depth > 0 => self.resolve_visibility(source, values, depth - 1)?,
            _ => true,
        };

        if source_shown {
            condition.evaluate(values)
        } else {
            condition.evaluate(&Map::new())
        }
    }

    /// Fields to render for the current values, in display order
    pub fn visible_fields(&self, values: &Map<String, Value>) -> Result<Vec<&Field>, ConditionError> {
        let mut visible = Vec::new();
        for field in self.fields_in_order() {
            if self.is_visible(field, values)? {
                visible.push(field);
            }
        }
        Ok(visible)
    }

    /// Fields whose visibility depends on the named field
    pub fn dependents_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Field> + 'a {
        self.definition.fields.iter().filter(move |f| {
            f.show_condition
                .as_ref()
                .map(ShowCondition::source_field)
                == Some(name)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;
    use serde_json::json;

    fn definition() -> TemplateDefinition {
        TemplateDefinition {
            name: "Arrest Report".to_string(),
            description: None,
            report_type: ReportCategory::Arrest,
            icon: None,
            color: None,
            sections: vec![Section::new("Narrative", 2), Section::new("Summary", 1)],
            fields: vec![
                Field::new("suspectName", "Suspect name", FieldType::Text, 1).required(),
                Field::new("priorConvictions", "Prior convictions", FieldType::Number, 2),
                Field::new("convictionDetails", "Conviction details", FieldType::LongText, 3)
                    .shown_when(ShowCondition::GreaterThan {
                        field: "priorConvictions".to_string(),
                        value: 0.0,
                    }),
            ],
            narrative_guidance: None,
            narrative_prompts: vec![],
            department_id: DepartmentId::from("dept-1"),
            is_public: false,
            required_subscription_tier: SubscriptionTier::Basic,
            version_label: "1.0".to_string(),
            ai_prompts: Value::Null,
            statutes: vec![],
            regulations: vec![],
        }
    }

    #[test]
    fn test_first_version_has_no_predecessor() {
        let template = Template::with_id("t-1", definition(), "alice");
        assert_eq!(template.version, 1);
        assert_eq!(template.previous_version(), None);
    }

    #[test]
    fn test_revise_appends_next_version() {
        let mut template = Template::with_id("t-1", definition(), "alice");
        template.usage.usage_count = 4;

        let mut changed = definition();
        changed.version_label = "1.1".to_string();
        let next = template.revise(changed, "bob");

        assert_eq!(next.id, template.id);
        assert_eq!(next.version, 2);
        assert_eq!(next.created_by, UserId::from("alice"));
        assert_eq!(next.last_edited_by, Some(UserId::from("bob")));
        assert_eq!(next.usage.usage_count, 4);
        assert_eq!(
            next.previous_version(),
            Some(VersionRef {
                id: TemplateId::from("t-1"),
                version: 1
            })
        );
    }

    #[test]
    fn test_display_order() {
        let template = Template::with_id("t-1", definition(), "alice");
        let titles: Vec<&str> = template
            .sections_in_order()
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Summary", "Narrative"]);
    }

    #[test]
    fn test_visible_fields_follow_conditions() {
        let template = Template::with_id("t-1", definition(), "alice");

        let values = json!({"priorConvictions": 0});
        let visible: Vec<&str> = template
            .visible_fields(values.as_object().unwrap())
            .unwrap()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(visible, vec!["suspectName", "priorConvictions"]);

        let values = json!({"priorConvictions": 2});
        let visible = template.visible_fields(values.as_object().unwrap()).unwrap();
        assert_eq!(visible.len(), 3);

        let dependents: Vec<&str> = template
            .dependents_of("priorConvictions")
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(dependents, vec!["convictionDetails"]);
    }

    #[test]
    fn test_hidden_source_hides_chained_fields() {
        let mut def = definition();
        def.fields.push(
            Field::new("convictionCourt", "Court", FieldType::Text, 4).shown_when(
                ShowCondition::NotEquals {
                    field: "convictionDetails".to_string(),
                    value: Value::String(String::new()),
                },
            ),
        );
        def.fields.push(
            Field::new("sealedRecord", "Sealed record", FieldType::Checkbox, 5).shown_when(
                ShowCondition::Equals {
                    field: "convictionDetails".to_string(),
                    value: json!("sealed"),
                },
            ),
        );
        let template = Template::with_id("t-1", def, "alice");

        // Stale details left over from before priorConvictions was cleared
        let values = json!({"priorConvictions": 0, "convictionDetails": "sealed"});
        let visible: Vec<&str> = template
            .visible_fields(values.as_object().unwrap())
            .unwrap()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(visible, vec!["suspectName", "priorConvictions", "convictionCourt"]);

        let values = json!({"priorConvictions": 1, "convictionDetails": "sealed"});
        let visible = template.visible_fields(values.as_object().unwrap()).unwrap();
        assert_eq!(visible.len(), 5);
    }

    #[test]
    fn test_condition_cycles_terminate() {
        let mut def = definition();
        def.fields = vec![
            Field::new("a", "A", FieldType::Text, 1).shown_when(ShowCondition::Equals {
                field: "b".to_string(),
                value: json!("yes"),
            }),
            Field::new("b", "B", FieldType::Text, 2).shown_when(ShowCondition::Equals {
                field: "a".to_string(),
                value: json!("yes"),
            }),
        ];
        let template = Template::with_id("t-1", def, "alice");

        let values = json!({"a": "yes", "b": "yes"});
        let visible = template.visible_fields(values.as_object().unwrap()).unwrap();
        assert_eq!(visible.len(), 2);
    }

    #[test]
    fn test_json_round_trip_preserves_order() {
        let template = Template::with_id("t-1", definition(), "alice");
        let json = serde_json::to_string(&template).unwrap();
        let restored: Template = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, template);
        let titles: Vec<&str> = restored
            .definition
            .sections
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Narrative", "Summary"]);
    }
}
