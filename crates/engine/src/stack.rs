//! Ordered, name-keyed record of the queries a manager has bound.

use fathom_types::Query;
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::QueryError;
use crate::request::PreparedRequest;
use crate::response::CacheableResponse;

/// Lifecycle of one stack entry.
///
/// `Pending` entries run on the next access. Any other state counts as run
/// until the entry is explicitly reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    Pending,
    /// Executed; the response holds a payload.
    Completed,
    /// Executed with a captured, suppressed failure.
    Failed,
    /// Executed with a failure that aborted the run.
    Fatal,
}

/// A query bound to a provider, plus its prepared request and response.
#[derive(Debug, Clone)]
pub struct StackEntry {
    pub(crate) query: Query,
    pub(crate) provider: String,
    pub(crate) request: PreparedRequest,
    pub(crate) response: CacheableResponse,
    pub(crate) state: EntryState,
}

impl StackEntry {
    pub fn new(query: Query, provider: impl Into<String>, request: PreparedRequest) -> Self {
        Self {
            response: CacheableResponse::new(request.clone()),
            query,
            provider: provider.into(),
            request,
            state: EntryState::Pending,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn request(&self) -> &PreparedRequest {
        &self.request
    }

    pub fn response(&self) -> &CacheableResponse {
        &self.response
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    pub fn has_run(&self) -> bool {
        self.state != EntryState::Pending
    }

    /// Discard the response and mark the entry pending again.
    pub fn reset(&mut self) {
        self.response = CacheableResponse::new(self.request.clone());
        self.state = EntryState::Pending;
    }
}

/// Stack entries keyed by query name, iterated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct QueryStack {
    entries: IndexMap<String, StackEntry>,
}

impl QueryStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry under `name`. Names are unique; a duplicate leaves the
    /// existing entry untouched.
    pub fn push(&mut self, name: impl Into<String>, entry: StackEntry) -> Result<(), QueryError> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(QueryError::duplicate_query(name));
        }
        self.entries.insert(name, entry);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&StackEntry> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut StackEntry> {
        self.entries.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StackEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn has_pending(&self) -> bool {
        self.entries.values().any(|entry| !entry.has_run())
    }

    /// Entries that have not run yet, in insertion order.
    pub fn pending_mut(&mut self) -> impl Iterator<Item = &mut StackEntry> {
        self.entries.values_mut().filter(|entry| !entry.has_run())
    }

    /// Reset every entry.
    pub fn reset(&mut self) {
        self.entries.values_mut().for_each(StackEntry::reset);
    }

    /// Reset entries still pending, discarding anything a dispatch left on
    /// their responses before it was abandoned.
    pub fn reset_pending(&mut self) {
        self.pending_mut().for_each(StackEntry::reset);
    }
}
