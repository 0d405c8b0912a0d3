//! Reportdesk models the report templates officers fill in: typed sections and
//! fields, conditional field visibility, a departmental/tiered access policy
//! and running usage statistics.
//!
//! Raw template definitions arrive as a [`TemplateDraft`] and are turned into a
//! typed [`TemplateDefinition`] by [`TemplateDraft::validate`]. Persistence and
//! versioning live in `reportdesk-registry`.

#[macro_use]
mod macros;

pub mod condition;
pub mod draft;
pub mod error;
pub mod field;
pub mod narrative;
pub mod policy;
pub mod report;
pub mod template;
pub mod tier;
pub mod usage;

// Re-export core types
pub use condition::ShowCondition;
pub use draft::{ConditionDraft, FieldDraft, InputDraft, SectionDraft, TemplateDraft};
pub use error::{
    ConditionError, ReportdeskError, Result, UnknownVariant, ValidationError, ValidationIssue,
};
pub use field::{Field, FieldType, InputSpec, Section};
pub use narrative::{NarrativePrompt, OfficerProfile, compose_prompt};
pub use policy::{UserContext, can_access, can_edit, tier_satisfies};
pub use report::ReportValues;
pub use template::{
    DepartmentId, ReportCategory, Template, TemplateDefinition, TemplateId, UserId, VersionRef,
};
pub use tier::{SubscriptionTier, TierClaim};
pub use usage::{UsageStats, UsageUpdate};
