//! Subcommand implementations.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use fathom_api::ApiClient;
use fathom_engine::{GraphQlProvider, HttpProvider, MemoryCache, PreparedRequest, QueryManager};
use indexmap::IndexMap;
use serde_json::{Map, Value, json};
use tracing::info;

use crate::manifest::{Manifest, ProviderKind};

/// Register the manifest's providers, cache settings, and the queries named
/// in `selected` (every query when empty) with a fresh manager.
pub fn build_manager(manifest: &Manifest, selected: &[String]) -> Result<QueryManager> {
    for name in selected {
        if !manifest.queries.contains_key(name) {
            bail!("unknown query '{}'", name);
        }
    }

    let mut manager = QueryManager::new();
    for (name, config) in &manifest.providers {
        let timeout = config.timeout_secs.map_or(fathom_api::DEFAULT_TIMEOUT, Duration::from_secs);
        let client = ApiClient::with_options(timeout, &config.headers)
            .with_context(|| format!("configure transport for provider '{name}'"))?;
        match config.kind {
            ProviderKind::Rest => {
                let provider = HttpProvider::new(&config.base_url)
                    .with_context(|| format!("configure provider '{name}'"))?
                    .with_client(client);
                manager.add_data_provider(name.as_str(), provider)?;
            }
            ProviderKind::Graphql => {
                let provider = GraphQlProvider::new(&config.base_url)
                    .with_context(|| format!("configure provider '{name}'"))?
                    .with_client(client);
                manager.add_data_provider(name.as_str(), provider)?;
            }
        }
    }

    if let Some(cache) = &manifest.cache {
        manager.set_cache(Arc::new(MemoryCache::new()), cache.lifetime_secs.map(Duration::from_secs));
        if !cache.tags.is_empty() {
            manager.set_cache_tags(cache.tags.iter().cloned())?;
        }
        if !cache.enabled {
            manager.disable_cache();
        }
    }

    for (name, config) in &manifest.queries {
        if !selected.is_empty() && !selected.contains(name) {
            continue;
        }
        manager
            .add(config.to_query(name), config.provider.as_deref())
            .with_context(|| format!("add query '{name}'"))?;
    }
    Ok(manager)
}

/// Describe declared providers and queries.
pub fn list(manifest: &Manifest) -> Value {
    let providers = manifest
        .providers
        .iter()
        .map(|(name, config)| {
            (
                name.clone(),
                json!({ "kind": config.kind.to_string(), "base_url": fathom_util::redact_sensitive(&config.base_url) }),
            )
        })
        .collect::<Map<_, _>>();
    let default_provider = manifest.providers.keys().last().cloned();
    let queries = manifest
        .queries
        .iter()
        .map(|(name, config)| {
            let provider = config.provider.clone().or_else(|| default_provider.clone());
            (
                name.clone(),
                json!({
                    "provider": provider,
                    "kind": config.kind.to_string(),
                    "method": config.method.clone().unwrap_or_else(|| default_method(config.kind).to_string()),
                    "path": config.path,
                    "collection": config.collection,
                    "sub_request": config.sub_request,
                }),
            )
        })
        .collect::<Map<_, _>>();
    json!({ "providers": providers, "queries": queries })
}

fn default_method(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Rest => "GET",
        ProviderKind::Graphql => "POST",
    }
}

/// Prepared requests for every bound query, with secrets redacted.
pub fn dry_run(manager: &QueryManager) -> Result<Value> {
    let names = manager.query_names().map(str::to_string).collect::<Vec<_>>();
    let mut out = Map::new();
    for name in names {
        out.insert(name.clone(), redacted_request(manager.request(&name)?)?);
    }
    Ok(Value::Object(out))
}

fn redacted_request(request: &PreparedRequest) -> Result<Value> {
    let mut value = serde_json::to_value(request)?;
    if let Some(headers) = value.get_mut("headers").and_then(Value::as_object_mut) {
        for (name, header_value) in headers.iter_mut() {
            if let Some(raw) = header_value.as_str() {
                let line = fathom_util::redact_sensitive(&format!("{name}: {raw}"));
                let redacted = line.split_once(':').map(|(_, rest)| rest.trim()).unwrap_or_default();
                *header_value = Value::String(redacted.to_string());
            }
        }
    }
    if let Some(url) = value.get_mut("url") {
        *url = Value::String(fathom_util::redact_sensitive(&request.url));
    }
    Ok(value)
}

/// Execute every bound query and collect its mapped result and cache status.
///
/// Sub-request failures are reported inline; any other failure aborts.
pub async fn run(manager: &mut QueryManager, manifest: &Manifest, root_path: Option<&str>) -> Result<Value> {
    manager.run_queries().await?;

    let names = manager.query_names().map(str::to_string).collect::<Vec<_>>();
    let mut out = IndexMap::new();
    for name in names {
        let Some(config) = manifest.queries.get(&name) else {
            continue;
        };
        let data = if config.collection {
            manager
                .get_collection(&name, root_path)
                .await
                .map(|collection| json!({ "items": collection.items, "pagination": collection.pagination }))
        } else {
            manager.get_item(&name, root_path).await
        };
        let hit = manager.is_hit(&name)?;
        let entry = match data {
            Ok(data) => json!({ "hit": hit, "data": data }),
            Err(error) if config.sub_request => json!({ "hit": hit, "error": error.to_string() }),
            Err(error) => return Err(error).with_context(|| format!("query '{name}' failed")),
        };
        out.insert(name, entry);
    }
    info!(queries = out.len(), "queries executed");
    Ok(serde_json::to_value(out)?)
}
