//! Template-related API models

use reportdesk::{
    DepartmentId, ReportCategory, ReportValues, SubscriptionTier, Template, TemplateId,
    UsageStats,
};
use reportdesk_registry::TemplateFilter;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{ApiError, Result};

/// Query parameters for listing templates
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTemplatesQuery {
    /// Owning department
    pub department: Option<String>,

    /// Report category, e.g. `use_of_force`
    pub report_type: Option<String>,

    #[serde(default)]
    pub public_only: bool,
}

impl ListTemplatesQuery {
    pub fn to_filter(&self) -> Result<TemplateFilter> {
        let mut filter = TemplateFilter::default();
        if let Some(department) = self.department.as_deref().filter(|d| !d.is_empty()) {
            filter = filter.department(department);
        }
        if let Some(report_type) = self.report_type.as_deref().filter(|r| !r.is_empty()) {
            let category: ReportCategory = report_type
                .parse()
                .map_err(|e: reportdesk::UnknownVariant| ApiError::bad_request(&e.to_string()))?;
            filter = filter.report_type(category);
        }
        if self.public_only {
            filter = filter.public_only();
        }
        Ok(filter)
    }
}

/// Template summary for list views
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: TemplateId,
    pub version: u32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub report_type: ReportCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub department_id: DepartmentId,
    pub is_public: bool,
    pub required_subscription_tier: SubscriptionTier,
    #[serde(flatten)]
    pub usage: UsageStats,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Template> for TemplateSummary {
    fn from(template: Template) -> Self {
        let def = template.definition;
        Self {
            id: template.id,
            version: template.version,
            name: def.name,
            description: def.description,
            report_type: def.report_type,
            icon: def.icon,
            color: def.color,
            department_id: def.department_id,
            is_public: def.is_public,
            required_subscription_tier: def.required_subscription_tier,
            usage: template.usage,
            updated_at: template.updated_at,
        }
    }
}

/// Body of a usage report; a completion time marks a finished report
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRequest {
    /// Seconds spent completing the report
    pub completion_time: Option<f64>,
}

/// Report values submitted for validation or narrative composition
#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub values: ReportValues,
}

/// Outcome of a successful report validation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportValidationResponse {
    pub valid: bool,
    pub template_id: TemplateId,
    pub version: u32,
    /// Names of the fields shown for the submitted values, in display order
    pub visible_fields: Vec<String>,
}
