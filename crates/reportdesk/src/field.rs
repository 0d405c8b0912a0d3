//! Sections and fields of a report template

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::condition::ShowCondition;

string_enum! {
    /// Input kinds a section or field can be rendered as
    #[derive(Default)]
    pub enum FieldType {
        #[default]
        Text => "text",
        LongText => "longtext",
        Number => "number",
        Date => "date",
        Time => "time",
        Select => "select",
        MultiSelect => "multiselect",
        Checkbox => "checkbox",
        Radio => "radio",
        Location => "location",
    }
}

impl FieldType {
    /// Whether the kind needs a non-empty option list to be usable
    pub fn requires_options(&self) -> bool {
        matches!(
            self,
            FieldType::Select | FieldType::MultiSelect | FieldType::Radio
        )
    }

    /// Whether a submitted value for this kind is a list
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, FieldType::MultiSelect | FieldType::Checkbox)
    }

    /// Whether min/max length constraints apply
    pub fn is_textual(&self) -> bool {
        matches!(self, FieldType::Text | FieldType::LongText)
    }
}

/// Attributes shared by sections and fields
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,

    #[serde(default)]
    pub required: bool,

    /// Rendering position within the containing collection
    pub order: i32,

    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    /// Choices for select, multiselect, checkbox and radio inputs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    /// Opaque validation configuration passed through to clients
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub validation: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
}

/// A narrative section of a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub title: String,

    #[serde(flatten)]
    pub input: InputSpec,
}

/// A named input of a report, optionally shown only when a condition holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Machine name; report values are keyed by it
    pub name: String,

    pub label: String,

    #[serde(flatten)]
    pub input: InputSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_condition: Option<ShowCondition>,
}

impl Field {
    pub fn new(name: impl Into<String>, label: impl Into<String>, field_type: FieldType, order: i32) -> Self {
        Field {
            name: name.into(),
            label: label.into(),
            input: InputSpec {
                order,
                field_type,
                ..InputSpec::default()
            },
            show_condition: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.input.required = true;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_length(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.input.min_length = min;
        self.input.max_length = max;
        self
    }

    pub fn shown_when(mut self, condition: ShowCondition) -> Self {
        self.show_condition = Some(condition);
        self
    }

    pub fn field_type(&self) -> FieldType {
        self.input.field_type
    }

    pub fn order(&self) -> i32 {
        self.input.order
    }
}

impl Section {
    pub fn new(title: impl Into<String>, order: i32) -> Self {
        Section {
            title: title.into(),
            input: InputSpec {
                order,
                field_type: FieldType::LongText,
                ..InputSpec::default()
            },
        }
    }

    pub fn order(&self) -> i32 {
        self.input.order
    }
}
