//! Manifest IO helpers.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use dirs_next::config_dir;
use fathom_util::{expand_tilde, interpolate_env};
use tracing::debug;

use super::{Manifest, ManifestError, validate_manifest};

/// Returns the default path for the query manifest.
pub fn default_manifest_path() -> PathBuf {
    if let Ok(path) = env::var("FATHOM_CONFIG_PATH")
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fathom")
        .join("queries.yaml")
}

/// Loads the manifest from `path`, or from the default path when `None`.
pub fn load_manifest(path: Option<&str>) -> Result<Manifest, ManifestError> {
    let path = match path {
        Some(path) => expand_tilde(path),
        None => default_manifest_path(),
    };
    load_manifest_from_path(&path)
}

/// Loads, interpolates, and validates a manifest file.
///
/// Files ending in `.json` are parsed as JSON; everything else as YAML.
pub fn load_manifest_from_path(path: &Path) -> Result<Manifest, ManifestError> {
    if !path.exists() {
        return Err(ManifestError::NotFound { path: path.to_path_buf() });
    }

    let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_json = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
    let mut manifest: Manifest = if is_json {
        serde_json::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };

    interpolate_manifest(&mut manifest)?;
    validate_manifest(&manifest)?;
    debug!(
        path = %path.display(),
        providers = manifest.providers.len(),
        queries = manifest.queries.len(),
        "manifest loaded"
    );
    Ok(manifest)
}

/// Resolve `${env:NAME}` placeholders in base URLs and header values.
fn interpolate_manifest(manifest: &mut Manifest) -> Result<(), ManifestError> {
    for provider in manifest.providers.values_mut() {
        provider.base_url = interpolate_env(&provider.base_url)?;
        for value in provider.headers.values_mut() {
            *value = interpolate_env(value)?;
        }
    }
    for query in manifest.queries.values_mut() {
        for value in query.headers.values_mut() {
            *value = interpolate_env(value)?;
        }
    }
    Ok(())
}
