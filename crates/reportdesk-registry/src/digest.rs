//! Content digests of template definitions

use reportdesk::TemplateDefinition;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// SHA-256 of some content, with a "sha256:" prefix
pub fn hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("sha256:{:x}", hasher.finalize())
}

/// Digest of a definition's canonical JSON.
///
/// Object keys inside free-form values serialize in sorted order, so two
/// definitions with the same content always hash the same.
pub fn definition_digest(definition: &TemplateDefinition) -> Result<String> {
    let canonical = serde_json::to_vec(&serde_json::to_value(definition)?)?;
    Ok(hash(&canonical))
}
