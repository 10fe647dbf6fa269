//! The query manager: binds named queries to named data providers, runs
//! whatever has not run yet, and serves decoded, mapped results.

use std::pin::pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fathom_api::ApiClient;
use fathom_types::{Collection, Query};
use futures_util::StreamExt;
use futures_util::stream;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheSettings, CacheStore};
use crate::error::QueryError;
use crate::provider::DataProvider;
use crate::request::PreparedRequest;
use crate::response::CacheableResponse;
use crate::stack::{EntryState, QueryStack, StackEntry};
use crate::strategy::{BuildQueryStrategy, StrategyRegistry};

/// Upper bound on requests in flight during one run.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Orchestrates providers, queries, and their execution.
///
/// Accessors run every pending query in one batch before answering, so adding
/// several queries and then reading any one of them dispatches all of them
/// together. Each entry runs at most once until it is reset with
/// [`QueryManager::clear_response`].
///
/// Manager-level cache settings and the shared transport are applied to each
/// provider on registration and again on every configuration change.
#[derive(Debug)]
pub struct QueryManager {
    providers: IndexMap<String, Box<dyn DataProvider>>,
    last_provider: Option<String>,
    stack: QueryStack,
    strategies: StrategyRegistry,
    cache: CacheSettings,
    transport: Option<ApiClient>,
    concurrency: usize,
}

impl Default for QueryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryManager {
    pub fn new() -> Self {
        Self {
            providers: IndexMap::new(),
            last_provider: None,
            stack: QueryStack::new(),
            strategies: StrategyRegistry::with_defaults(),
            cache: CacheSettings::default(),
            transport: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Bound the number of requests dispatched concurrently. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_strategies(mut self, strategies: StrategyRegistry) -> Self {
        self.strategies = strategies;
        self
    }

    /// Install a build strategy for an additional (or replaced) query kind.
    pub fn register_strategy(&mut self, strategy: Arc<dyn BuildQueryStrategy>) {
        self.strategies.register(strategy);
    }

    /// Register `provider` under a unique name and make it the default
    /// binding target for [`QueryManager::add`].
    pub fn add_data_provider(&mut self, name: impl Into<String>, provider: impl DataProvider + 'static) -> Result<(), QueryError> {
        let name = name.into();
        if self.providers.contains_key(&name) {
            return Err(QueryError::duplicate_provider(name));
        }

        let mut provider: Box<dyn DataProvider> = Box::new(provider);
        apply_cache_config(&self.cache, &name, provider.as_mut());
        if let Some(client) = &self.transport {
            provider.set_transport(client.clone());
        }

        debug!(provider = %name, "data provider registered");
        self.providers.insert(name.clone(), provider);
        self.last_provider = Some(name);
        Ok(())
    }

    /// Attach a cache store and enable caching on every provider.
    pub fn set_cache(&mut self, store: Arc<dyn CacheStore>, lifetime: Option<Duration>) {
        self.cache.set_cache(store, lifetime);
        let cache = &self.cache;
        for (name, provider) in self.providers.iter_mut() {
            apply_cache_config(cache, name, provider.as_mut());
        }
    }

    /// Turn caching back on for future requests. Existing entries are kept.
    pub fn enable_cache(&mut self, lifetime: Option<Duration>) {
        self.cache.enable(lifetime);
        for provider in self.providers.values_mut() {
            provider.enable_cache(lifetime);
        }
    }

    /// Stop reading from and writing to the cache. Existing entries are kept.
    pub fn disable_cache(&mut self) {
        self.cache.disable();
        for provider in self.providers.values_mut() {
            provider.disable_cache();
        }
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.cache.is_enabled()
    }

    pub fn cache_lifetime(&self) -> Option<Duration> {
        self.cache.lifetime()
    }

    pub fn cache_tags(&self) -> &[String] {
        self.cache.tags()
    }

    /// Replace the tags applied to future cache writes on every provider.
    ///
    /// Nothing changes unless every provider can carry the tags. With no
    /// providers registered, the manager's own cache must support tags.
    /// Once accepted, the tags are recorded on the manager even when only the
    /// providers hold a cache.
    pub fn set_cache_tags<I, S>(&mut self, tags: I) -> Result<(), QueryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags = tags.into_iter().map(Into::into).collect::<Vec<String>>();
        if !tags.is_empty() {
            let unable = self
                .providers
                .iter()
                .filter(|(_, provider)| !provider.cache_settings().supports_tags())
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>();
            if !unable.is_empty() {
                return Err(QueryError::tagging_unsupported(format!(
                    "providers without a taggable cache: {}",
                    unable.join(", ")
                )));
            }
            if self.providers.is_empty() && !self.cache.supports_tags() {
                return Err(QueryError::tagging_unsupported("no taggable cache configured"));
            }
        }

        for provider in self.providers.values_mut() {
            provider.set_cache_tags(tags.clone())?;
        }
        self.cache.replace_tags(tags);
        Ok(())
    }

    /// Share `client` with every provider able to use it. Returns how many did.
    pub fn set_transport(&mut self, client: &ApiClient) -> usize {
        self.transport = Some(client.clone());
        let mut adopted = 0;
        for provider in self.providers.values_mut() {
            if provider.set_transport(client.clone()) {
                adopted += 1;
            }
        }
        debug!(adopted, providers = self.providers.len(), "shared transport applied");
        adopted
    }

    /// Bind `query` to a provider and prepare its request without running it.
    ///
    /// Without `provider`, the most recently registered provider is used.
    pub fn add(&mut self, query: Query, provider: Option<&str>) -> Result<(), QueryError> {
        let name = query.name().ok_or(QueryError::MissingName)?.to_string();
        if self.stack.contains(&name) {
            return Err(QueryError::duplicate_query(name));
        }

        let provider_name = match provider {
            Some(provider_name) => provider_name.to_string(),
            None => self
                .last_provider
                .clone()
                .ok_or_else(|| QueryError::NoProvider { query: name.clone() })?,
        };
        let data_provider = self
            .providers
            .get(&provider_name)
            .ok_or_else(|| QueryError::unknown_provider(&provider_name))?;

        if !data_provider.supports(query.required_capability()) {
            return Err(QueryError::IncompatibleProvider {
                query: name,
                provider: provider_name,
                capability: query.required_capability().clone(),
            });
        }

        let strategy = self
            .strategies
            .resolve(query.kind())
            .ok_or_else(|| QueryError::UnsupportedQueryKind {
                query: name.clone(),
                kind: query.kind().clone(),
            })?;
        let mut request = strategy.build(&query, data_provider.as_ref())?;
        request.cache_scope = provider_name.clone();

        debug!(
            query = %name,
            provider = %provider_name,
            kind = %query.kind(),
            method = %request.method,
            url = %fathom_util::redact_sensitive(&request.url),
            "query added"
        );
        self.stack.push(name, StackEntry::new(query, provider_name, request))
    }

    pub fn has_query(&self, name: &str) -> bool {
        self.stack.contains(name)
    }

    pub fn get_query(&self, name: &str) -> Result<&Query, QueryError> {
        Ok(self.entry(name)?.query())
    }

    /// The prepared request for `name`, without running anything.
    pub fn request(&self, name: &str) -> Result<&PreparedRequest, QueryError> {
        Ok(self.entry(name)?.request())
    }

    pub fn query_names(&self) -> impl Iterator<Item = &str> {
        self.stack.names()
    }

    pub fn entry_state(&self, name: &str) -> Result<EntryState, QueryError> {
        Ok(self.entry(name)?.state())
    }

    pub fn data_provider(&self, name: &str) -> Result<&dyn DataProvider, QueryError> {
        self.providers
            .get(name)
            .map(|provider| provider.as_ref())
            .ok_or_else(|| QueryError::unknown_provider(name))
    }

    pub fn data_provider_names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// The provider a query is bound to.
    pub fn data_provider_for_query(&self, name: &str) -> Result<&dyn DataProvider, QueryError> {
        self.data_provider(self.entry(name)?.provider())
    }

    /// Run pending queries, then return the response for `name`.
    pub async fn get_response(&mut self, name: &str) -> Result<&CacheableResponse, QueryError> {
        self.ensure_run(name).await?;
        Ok(self.entry(name)?.response())
    }

    /// Run pending queries, then decode `name` and map it onto a single item.
    ///
    /// `root_path` overrides the query's root property path for this call.
    pub async fn get_item(&mut self, name: &str, root_path: Option<&str>) -> Result<Value, QueryError> {
        self.ensure_run(name).await?;
        let entry = self.entry(name)?;
        let data = self.data_provider(entry.provider())?.decode(entry.response())?;
        Ok(entry.query().map_item(&data, root_path)?)
    }

    /// Run pending queries, then decode `name` and map it onto a collection.
    pub async fn get_collection(&mut self, name: &str, root_path: Option<&str>) -> Result<Collection, QueryError> {
        self.ensure_run(name).await?;
        let entry = self.entry(name)?;
        let data = self.data_provider(entry.provider())?.decode(entry.response())?;
        Ok(entry.query().map_collection(&data, entry.response().headers(), root_path)?)
    }

    /// Whether `name` was served from cache; `None` until it has run.
    ///
    /// Never triggers a run.
    pub fn is_hit(&self, name: &str) -> Result<Option<bool>, QueryError> {
        let entry = self.entry(name)?;
        Ok(entry.has_run().then(|| entry.response().is_hit()))
    }

    /// Discard the response for `name` so the next access runs it again.
    pub fn clear_response(&mut self, name: &str) -> Result<(), QueryError> {
        self.stack
            .get_mut(name)
            .ok_or_else(|| QueryError::unknown_query(name))?
            .reset();
        debug!(query = %name, "response cleared");
        Ok(())
    }

    /// Discard every response.
    pub fn clear_responses(&mut self) {
        self.stack.reset();
    }

    /// Dispatch every pending entry, at most `concurrency` at a time.
    ///
    /// Results are consumed in stack order. Sub-request failures are captured
    /// on their responses. The first other failure stops the run and is
    /// returned; entries after it stay pending.
    pub async fn run_queries(&mut self) -> Result<(), QueryError> {
        if !self.stack.has_pending() {
            return Ok(());
        }

        let started = Instant::now();
        let mut completed = 0usize;
        let mut failed = 0usize;
        let mut fatal = None;
        {
            let providers = &self.providers;
            let dispatches = self.stack.pending_mut().map(|entry| {
                let provider = providers.get(&entry.provider);
                async move {
                    let outcome = match provider {
                        Some(provider) => provider.run_request(&mut entry.response).await.map_err(QueryError::from),
                        None => Err(QueryError::unknown_provider(&entry.provider)),
                    };
                    (entry, outcome)
                }
            });
            let mut results = pin!(stream::iter(dispatches).buffered(self.concurrency));

            while let Some((entry, outcome)) = results.next().await {
                match outcome {
                    Ok(()) if entry.response.failure().is_some() => {
                        entry.state = EntryState::Failed;
                        failed += 1;
                    }
                    Ok(()) => {
                        entry.state = EntryState::Completed;
                        completed += 1;
                    }
                    Err(error) => {
                        warn!(query = %entry.query.name().unwrap_or_default(), error = %error, "query failed; aborting run");
                        entry.state = EntryState::Fatal;
                        fatal = Some(error);
                        break;
                    }
                }
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        match fatal {
            Some(error) => {
                self.stack.reset_pending();
                info!(completed, failed, duration_ms, "query run aborted");
                Err(error)
            }
            None => {
                info!(completed, failed, duration_ms, "query run finished");
                Ok(())
            }
        }
    }

    fn entry(&self, name: &str) -> Result<&StackEntry, QueryError> {
        self.stack.get(name).ok_or_else(|| QueryError::unknown_query(name))
    }

    async fn ensure_run(&mut self, name: &str) -> Result<(), QueryError> {
        if !self.stack.contains(name) {
            return Err(QueryError::unknown_query(name));
        }
        self.run_queries().await?;

        let entry = self.entry(name)?;
        if !entry.has_run() || !entry.response().is_executed() {
            return Err(QueryError::ExecutionIncomplete { name: name.to_string() });
        }
        Ok(())
    }
}

/// Push manager-level cache settings onto one provider.
///
/// Providers keep their own cache when the manager has none.
fn apply_cache_config(cache: &CacheSettings, name: &str, provider: &mut dyn DataProvider) {
    let Some(store) = cache.cache() else {
        return;
    };
    provider.set_cache(store.clone(), cache.lifetime());
    if !cache.is_enabled() {
        provider.disable_cache();
    }
    if !cache.tags().is_empty() {
        if let Err(error) = provider.set_cache_tags(cache.tags().to_vec()) {
            warn!(provider = %name, error = %error, "cache tags not applied");
        }
    }
}
