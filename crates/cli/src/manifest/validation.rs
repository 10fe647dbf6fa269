//! Manifest validation.

use tracing::debug;

use super::{Manifest, ManifestError, ProviderKind};

/// Validate the whole manifest.
pub fn validate_manifest(manifest: &Manifest) -> Result<(), ManifestError> {
    if manifest.providers.is_empty() {
        return Err(ManifestError::invalid("at least one provider must be declared"));
    }

    for (name, provider) in &manifest.providers {
        if name.trim().is_empty() {
            return Err(ManifestError::invalid("provider names cannot be empty"));
        }
        if provider.base_url.trim().is_empty() {
            return Err(ManifestError::invalid(format!("provider '{name}' has no base_url")));
        }
        if provider.timeout_secs == Some(0) {
            return Err(ManifestError::invalid(format!("provider '{name}' has a zero timeout")));
        }
    }

    for (name, query) in &manifest.queries {
        if name.trim().is_empty() {
            return Err(ManifestError::invalid("query names cannot be empty"));
        }
        if let Some(provider) = &query.provider
            && !manifest.providers.contains_key(provider)
        {
            return Err(ManifestError::invalid(format!(
                "query '{name}' references unknown provider '{provider}'"
            )));
        }
        if query.kind == ProviderKind::Graphql && query.document.as_deref().is_none_or(|document| document.trim().is_empty()) {
            return Err(ManifestError::invalid(format!("GraphQL query '{name}' has no document")));
        }
        debug!("Validated query configuration: {}", name);
    }

    if let Some(cache) = &manifest.cache
        && cache.tags.iter().any(|tag| tag.trim().is_empty())
    {
        return Err(ManifestError::invalid("cache tags cannot be empty"));
    }
    Ok(())
}
