//! # Reportdesk Registry
//!
//! Persistence and lifecycle management for report templates:
//! - Append-only versions keyed by template family and ordinal
//! - Access-checked reads, listings and revisions
//! - Usage statistics applied atomically per template family
//! - In-memory and SQLite storage backends
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use reportdesk::{TemplateDraft, UserContext, DepartmentId};
//! use reportdesk_registry::{Registry, storage::MemoryStorage};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Registry::new(MemoryStorage::new());
//! let admin = UserContext::new("admin-1", Some(DepartmentId::from("metro")), "enterprise");
//!
//! let draft: TemplateDraft = serde_json::from_value(serde_json::json!({
//!     "name": "Traffic Stop",
//!     "reportType": "traffic",
//!     "departmentId": "metro",
//!     "fields": [{"name": "plate", "label": "License plate", "order": 1}]
//! }))?;
//!
//! let template = registry.create_template(draft, &admin).await?;
//! let stats = registry.update_completion_time(&template.id, &admin, 312.0).await?;
//! println!("{} used {} times", template.name(), stats.usage_count);
//! # Ok(())
//! # }
//! ```

pub mod digest;
pub mod error;
pub mod registry;
pub mod storage;

pub use error::{RegistryError, Result};
pub use registry::{Registry, VersionSummary};
pub use storage::{MemoryStorage, TemplateFilter, TemplateStore};

#[cfg(feature = "sqlite")]
pub use storage::sqlite_storage::SqliteStorage;
