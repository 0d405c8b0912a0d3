//! High-level registry interface for template management

use reportdesk::{
    NarrativePrompt, OfficerProfile, ReportValues, ReportdeskError, Template, TemplateDraft,
    TemplateId, UsageStats, UsageUpdate, UserContext, UserId, can_access, can_edit,
    compose_prompt,
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::digest::definition_digest;
use crate::error::{RegistryError, Result};
use crate::storage::{TemplateFilter, TemplateStore};

/// One entry of a template's version history
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    pub version: u32,
    pub version_label: String,
    /// Who produced this version: the editor, or the creator for version 1
    pub author: UserId,
    pub digest: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Template registry on top of a storage backend
pub struct Registry<S> {
    store: S,
}

impl<S: TemplateStore> Registry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Validate a draft and store it as version 1 of a new template.
    ///
    /// Authors can only create templates for their own department.
    pub async fn create_template(&self, draft: TemplateDraft, author: &UserContext) -> Result<Template> {
        let definition = draft.validate()?;

        if !author.is_member_of(&definition.department_id) {
            warn!(user = %author.user_id.as_ref(), "Rejected template creation outside own department");
            return Err(RegistryError::AccessDenied(format!(
                "user {} cannot create templates for department {}",
                author.user_id.as_ref(),
                definition.department_id.as_ref()
            )));
        }

        let template = Template::new(definition, author.user_id.clone());
        self.store.save_version(&template).await?;

        info!(template_id = %template.id, name = template.name(), "Created template");
        Ok(template)
    }

    /// Validate a draft and append it as the next version of a template.
    ///
    /// A draft identical to the latest version is not stored again; the latest
    /// version is returned unchanged.
    pub async fn revise_template(
        &self,
        id: &TemplateId,
        draft: TemplateDraft,
        editor: &UserContext,
    ) -> Result<Template> {
        let latest = self.store.get_template(id).await?;
        if !can_edit(&latest, editor) {
            return Err(RegistryError::AccessDenied(format!(
                "user {} cannot edit template {}",
                editor.user_id.as_ref(),
                id
            )));
        }

        let definition = draft.validate()?;
        if !editor.is_member_of(&definition.department_id) {
            return Err(RegistryError::AccessDenied(format!(
                "user {} cannot move template {} to department {}",
                editor.user_id.as_ref(),
                id,
                definition.department_id.as_ref()
            )));
        }

        if definition_digest(&definition)? == definition_digest(&latest.definition)? {
            debug!(template_id = %id, version = latest.version, "Revision unchanged, keeping latest version");
            return Ok(latest);
        }

        let next = latest.revise(definition, editor.user_id.clone());
        self.store.save_version(&next).await?;

        info!(template_id = %id, version = next.version, "Published template version");
        Ok(next)
    }

    async fn load_accessible(&self, id: &TemplateId, user: &UserContext) -> Result<Template> {
        let template = self.store.get_template(id).await?;
        if can_access(&template, user) {
            Ok(template)
        } else {
            Err(RegistryError::AccessDenied(format!(
                "user {} cannot access template {}",
                user.user_id.as_ref(),
                id
            )))
        }
    }

    /// Get the latest version of a template the user may access
    pub async fn get_template(&self, id: &TemplateId, user: &UserContext) -> Result<Template> {
        self.load_accessible(id, user).await
    }

    /// Get a specific version.
    ///
    /// Access follows the latest version, so making a template private or
    /// raising its tier also closes off its older versions.
    pub async fn get_version(&self, id: &TemplateId, version: u32, user: &UserContext) -> Result<Template> {
        self.load_accessible(id, user).await?;
        self.store.get_version(id, version).await
    }

    /// Load the version a template was derived from
    pub async fn previous_version(&self, template: &Template) -> Result<Option<Template>> {
        match template.previous_version() {
            Some(prev) => Ok(Some(self.store.get_version(&prev.id, prev.version).await?)),
            None => Ok(None),
        }
    }

    /// Version history of a template, oldest first
    pub async fn version_history(&self, id: &TemplateId, user: &UserContext) -> Result<Vec<VersionSummary>> {
        self.load_accessible(id, user).await?;

        let mut history = Vec::new();
        for version in self.store.list_versions(id).await? {
            let template = self.store.get_version(id, version).await?;
            history.push(VersionSummary {
                version,
                version_label: template.definition.version_label.clone(),
                author: template
                    .last_edited_by
                    .clone()
                    .unwrap_or_else(|| template.created_by.clone()),
                digest: definition_digest(&template.definition)?,
                updated_at: template.updated_at,
            });
        }
        Ok(history)
    }

    /// Templates matching the filter that the user may access, sorted by name
    pub async fn list_templates(&self, user: &UserContext, filter: &TemplateFilter) -> Result<Vec<Template>> {
        let mut templates: Vec<Template> = self
            .store
            .find_templates(filter)
            .await?
            .into_iter()
            .filter(|t| can_access(t, user))
            .collect();
        templates.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.id.cmp(&b.id)));

        debug!(count = templates.len(), "Listed templates");
        Ok(templates)
    }

    /// Record that a report was started from a template
    pub async fn increment_usage(&self, id: &TemplateId, user: &UserContext) -> Result<UsageStats> {
        self.load_accessible(id, user).await?;
        self.store.apply_usage(id, UsageUpdate::Increment).await
    }

    /// Record a completed report and its completion time in seconds
    pub async fn update_completion_time(
        &self,
        id: &TemplateId,
        user: &UserContext,
        seconds: f64,
    ) -> Result<UsageStats> {
        let update = UsageUpdate::Completion(seconds);
        update.check()?;

        self.load_accessible(id, user).await?;
        let stats = self.store.apply_usage(id, update).await?;

        debug!(
            template_id = %id,
            usage_count = stats.usage_count,
            average = stats.average_completion_time,
            "Recorded report completion"
        );
        Ok(stats)
    }

    /// Check report values against the latest version of a template
    pub async fn validate_report(
        &self,
        id: &TemplateId,
        user: &UserContext,
        values: &ReportValues,
    ) -> Result<Template> {
        let template = self.load_accessible(id, user).await?;
        template.validate_report(values)?;
        Ok(template)
    }

    /// Build the narrative prompt for a report on the latest version
    pub async fn compose_narrative(
        &self,
        id: &TemplateId,
        user: &UserContext,
        values: &ReportValues,
        officer: &OfficerProfile,
    ) -> Result<NarrativePrompt> {
        let template = self.load_accessible(id, user).await?;
        compose_prompt(&template, values, officer).map_err(|e| ReportdeskError::from(e).into())
    }
}
