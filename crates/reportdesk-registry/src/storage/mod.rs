//! Storage abstraction for template families, versions and usage statistics

use async_trait::async_trait;
use reportdesk::{DepartmentId, ReportCategory, Template, TemplateId, UsageStats, UsageUpdate};

use crate::error::Result;

pub mod memory_storage;

pub use memory_storage::MemoryStorage;

#[cfg(feature = "sqlite")]
pub mod sqlite_storage;

/// Query over the latest version of each template family
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateFilter {
    /// Only templates owned by this department
    pub department_id: Option<DepartmentId>,

    /// Only templates producing this kind of report
    pub report_type: Option<ReportCategory>,

    /// Only public templates
    pub public_only: bool,
}

impl TemplateFilter {
    pub fn department(mut self, department_id: impl Into<DepartmentId>) -> Self {
        self.department_id = Some(department_id.into());
        self
    }

    pub fn report_type(mut self, report_type: ReportCategory) -> Self {
        self.report_type = Some(report_type);
        self
    }

    pub fn public_only(mut self) -> Self {
        self.public_only = true;
        self
    }

    /// Whether a template's latest version matches this filter
    pub fn matches(&self, template: &Template) -> bool {
        self.department_id
            .as_ref()
            .is_none_or(|d| template.department_id() == d)
            && self
                .report_type
                .is_none_or(|r| template.definition.report_type == r)
            && (!self.public_only || template.is_public())
    }
}

/// Persistence for templates.
///
/// Every write is atomic per template family. Templates returned by any read
/// carry the family's current usage statistics.
#[async_trait]
pub trait TemplateStore: Send + Sync + 'static {
    /// Append a version. Version 1 creates the family; any later version must
    /// be exactly one past the current latest.
    async fn save_version(&self, template: &Template) -> Result<()>;

    /// Get the latest version of a template
    async fn get_template(&self, id: &TemplateId) -> Result<Template>;

    /// Get a specific version of a template
    async fn get_version(&self, id: &TemplateId, version: u32) -> Result<Template>;

    /// List all version ordinals of a template, ascending
    async fn list_versions(&self, id: &TemplateId) -> Result<Vec<u32>>;

    /// Latest versions of all families matching the filter
    async fn find_templates(&self, filter: &TemplateFilter) -> Result<Vec<Template>>;

    /// Apply a usage update as one read-modify-write and return the new stats
    async fn apply_usage(&self, id: &TemplateId, update: UsageUpdate) -> Result<UsageStats>;
}
