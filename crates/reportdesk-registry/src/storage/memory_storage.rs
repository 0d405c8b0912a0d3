//! In-memory template storage for testing and development

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use reportdesk::{Template, TemplateId, UsageStats, UsageUpdate};

use super::{TemplateFilter, TemplateStore};
use crate::error::{RegistryError, Result};

#[derive(Debug)]
struct Family {
    versions: Vec<Template>,
    usage: UsageStats,
}

impl Family {
    fn latest(&self) -> u32 {
        self.versions.len() as u32
    }

    fn view(&self, index: usize) -> Option<Template> {
        self.versions.get(index).map(|t| {
            let mut template = t.clone();
            template.usage = self.usage;
            template
        })
    }
}

/// Template storage kept in a mutex-guarded map
#[derive(Debug, Default)]
pub struct MemoryStorage {
    families: Mutex<HashMap<TemplateId, Family>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            families: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<TemplateId, Family>>> {
        self.families
            .lock()
            .map_err(|_| RegistryError::Storage("Lock poisoned".into()))
    }
}

#[async_trait]
impl TemplateStore for MemoryStorage {
    async fn save_version(&self, template: &Template) -> Result<()> {
        let mut families = self.lock()?;

        match families.get_mut(&template.id) {
            None if template.version == 1 => {
                families.insert(
                    template.id.clone(),
                    Family {
                        versions: vec![template.clone()],
                        usage: template.usage,
                    },
                );
                Ok(())
            }
            None => Err(RegistryError::TemplateNotFound(template.id.to_string())),
            Some(family) if template.version == family.latest() + 1 => {
                family.versions.push(template.clone());
                Ok(())
            }
            Some(family) => Err(RegistryError::Conflict {
                template_id: template.id.to_string(),
                expected: family.latest() + 1,
                actual: template.version,
            }),
        }
    }

    async fn get_template(&self, id: &TemplateId) -> Result<Template> {
        let families = self.lock()?;
        families
            .get(id)
            .and_then(|f| f.view(f.versions.len().saturating_sub(1)))
            .ok_or_else(|| RegistryError::TemplateNotFound(id.to_string()))
    }

    async fn get_version(&self, id: &TemplateId, version: u32) -> Result<Template> {
        let families = self.lock()?;
        let family = families
            .get(id)
            .ok_or_else(|| RegistryError::TemplateNotFound(id.to_string()))?;

        version
            .checked_sub(1)
            .and_then(|index| family.view(index as usize))
            .ok_or_else(|| RegistryError::VersionNotFound {
                template_id: id.to_string(),
                version,
            })
    }

    async fn list_versions(&self, id: &TemplateId) -> Result<Vec<u32>> {
        let families = self.lock()?;
        let family = families
            .get(id)
            .ok_or_else(|| RegistryError::TemplateNotFound(id.to_string()))?;
        Ok((1..=family.latest()).collect())
    }

    async fn find_templates(&self, filter: &TemplateFilter) -> Result<Vec<Template>> {
        let families = self.lock()?;
        let mut found: Vec<Template> = families
            .values()
            .filter_map(|f| f.view(f.versions.len().saturating_sub(1)))
            .filter(|t| filter.matches(t))
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    async fn apply_usage(&self, id: &TemplateId, update: UsageUpdate) -> Result<UsageStats> {
        let mut families = self.lock()?;
        let family = families
            .get_mut(id)
            .ok_or_else(|| RegistryError::TemplateNotFound(id.to_string()))?;

        // Computed before assignment so a rejected update leaves nothing behind.
        let next = family.usage.apply(update)?;
        family.usage = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportdesk::TemplateDraft;
    use serde_json::json;

    fn template(id: &str) -> Template {
        let draft: TemplateDraft = serde_json::from_value(json!({
            "name": "Incident",
            "reportType": "incident",
            "departmentId": "metro"
        }))
        .unwrap();
        Template::with_id(id, draft.validate().unwrap(), "admin")
    }

    #[tokio::test]
    async fn test_memory_storage_versions_are_append_only() {
        let storage = MemoryStorage::new();
        let v1 = template("t-1");
        storage.save_version(&v1).await.unwrap();

        // Re-creating the family conflicts
        match storage.save_version(&v1).await {
            Err(RegistryError::Conflict { expected, actual, .. }) => {
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("Expected conflict, got {:?}", other),
        }

        let v2 = v1.revise(v1.definition.clone(), "editor");
        storage.save_version(&v2).await.unwrap();
        assert!(storage.save_version(&v2).await.is_err());

        assert_eq!(storage.list_versions(&v1.id).await.unwrap(), vec![1, 2]);
        assert_eq!(storage.get_template(&v1.id).await.unwrap().version, 2);
        let all = storage.find_templates(&TemplateFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_storage_not_found() {
        let storage = MemoryStorage::new();
        let missing = TemplateId::from("nope");

        assert!(matches!(
            storage.get_template(&missing).await,
            Err(RegistryError::TemplateNotFound(_))
        ));
        assert!(matches!(
            storage.apply_usage(&missing, UsageUpdate::Increment).await,
            Err(RegistryError::TemplateNotFound(_))
        ));

        storage.save_version(&template("t-1")).await.unwrap();
        assert!(matches!(
            storage.get_version(&TemplateId::from("t-1"), 0).await,
            Err(RegistryError::VersionNotFound { version: 0, .. })
        ));
        assert!(matches!(
            storage.get_version(&TemplateId::from("t-1"), 5).await,
            Err(RegistryError::VersionNotFound { version: 5, .. })
        ));
    }

    #[tokio::test]
    async fn test_rejected_usage_update_changes_nothing() {
        let storage = MemoryStorage::new();
        let t = template("t-1");
        storage.save_version(&t).await.unwrap();

        storage
            .apply_usage(&t.id, UsageUpdate::Completion(30.0))
            .await
            .unwrap();
        assert!(storage
            .apply_usage(&t.id, UsageUpdate::Completion(-5.0))
            .await
            .is_err());

        let stats = storage.get_template(&t.id).await.unwrap().usage;
        assert_eq!(stats.usage_count, 1);
        assert_eq!(stats.average_completion_time, 30.0);
    }
}
