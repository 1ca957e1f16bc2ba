//! Persistence port and the in-memory reference store.
//!
//! The service depends only on [`IssueStore`]; any backend that can answer
//! the five operations as a unit can sit behind it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::{IssuesError, Result};
use crate::model::Issue;
use crate::query::{IssueChanges, IssueFilter};
use crate::util::{DEFAULT_ID_PREFIX, generate_id};

/// Storage operations required by the issue service.
///
/// Filters are conjunctions of equality constraints. Implementations must
/// apply `update_one` atomically with respect to other writers of the same
/// record, and must not serialize writers of different records longer than
/// a lookup.
#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Short backend name for diagnostics.
    fn backend(&self) -> &'static str;

    /// Persist a new record, assigning its id, and return it as stored.
    async fn insert(&self, issue: Issue) -> Result<Issue>;

    /// All records matching `filter`, in insertion order.
    async fn find_many(&self, filter: &IssueFilter) -> Result<Vec<Issue>>;

    /// The first record matching `filter`.
    async fn find_one(&self, filter: &IssueFilter) -> Result<Option<Issue>>;

    /// Merge `changes` into the first record matching `filter`.
    ///
    /// Returns the merged record, or `None` when nothing matched.
    async fn update_one(&self, filter: &IssueFilter, changes: &IssueChanges)
    -> Result<Option<Issue>>;

    /// Remove the first record matching `filter`; returns how many were removed.
    async fn delete_one(&self, filter: &IssueFilter) -> Result<u64>;

    /// Number of records matching `filter`.
    async fn count(&self, filter: &IssueFilter) -> Result<u64> {
        let found = self.find_many(filter).await?;
        Ok(found.len() as u64)
    }
}

/// A record cell. `None` once the record has been deleted, so a writer that
/// looked the cell up before the delete observes it as gone.
type Slot = Arc<Mutex<Option<Issue>>>;

#[derive(Default)]
struct Index {
    order: Vec<String>,
    slots: HashMap<String, Slot>,
}

impl Index {
    fn slots_in_order(&self) -> Vec<Slot> {
        self.order
            .iter()
            .filter_map(|id| self.slots.get(id).cloned())
            .collect()
    }

    /// Candidate cells for `filter`: the single id cell when the filter names
    /// one, otherwise every cell.
    fn candidates(&self, filter: &IssueFilter) -> Vec<(String, Slot)> {
        match filter.id() {
            Some(id) => self
                .slots
                .get(id)
                .map(|slot| vec![(id.to_string(), Arc::clone(slot))])
                .unwrap_or_default(),
            None => self
                .order
                .iter()
                .filter_map(|id| self.slots.get(id).map(|s| (id.clone(), Arc::clone(s))))
                .collect(),
        }
    }
}

fn poisoned<T>(_: PoisonError<T>) -> IssuesError {
    IssuesError::storage("in-memory store lock poisoned")
}

/// In-memory issue store.
///
/// The index lock is only held to look records up or to add/remove them;
/// each record has its own mutex, which is what serializes merges.
pub struct InMemoryStore {
    index: RwLock<Index>,
    prefix: String,
}

impl InMemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_ID_PREFIX)
    }

    /// Create a new empty store generating ids with `prefix`.
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            index: RwLock::new(Index::default()),
            prefix: prefix.into(),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IssueStore for InMemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, mut issue: Issue) -> Result<Issue> {
        let mut index = self.index.write().map_err(poisoned)?;

        if issue.id.is_empty() {
            issue.id = generate_id(
                &self.prefix,
                &issue.project_name,
                &issue.issue_title,
                &issue.created_by,
                issue.created_on,
                index.order.len(),
                |id| index.slots.contains_key(id),
            );
        } else if index.slots.contains_key(&issue.id) {
            return Err(IssuesError::storage(format!("duplicate id {}", issue.id)));
        }

        index.order.push(issue.id.clone());
        index
            .slots
            .insert(issue.id.clone(), Arc::new(Mutex::new(Some(issue.clone()))));
        drop(index);

        tracing::trace!(id = %issue.id, project = %issue.project_name, "inserted issue");
        Ok(issue)
    }

    async fn find_many(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        let slots = self.index.read().map_err(poisoned)?.slots_in_order();

        let mut found = Vec::new();
        for slot in slots {
            let cell = slot.lock().map_err(poisoned)?;
            if let Some(issue) = cell.as_ref().filter(|issue| filter.matches(issue)) {
                found.push(issue.clone());
            }
        }
        Ok(found)
    }

    async fn find_one(&self, filter: &IssueFilter) -> Result<Option<Issue>> {
        let candidates = self.index.read().map_err(poisoned)?.candidates(filter);

        for (_, slot) in candidates {
            let cell = slot.lock().map_err(poisoned)?;
            if let Some(issue) = cell.as_ref().filter(|issue| filter.matches(issue)) {
                return Ok(Some(issue.clone()));
            }
        }
        Ok(None)
    }

    async fn update_one(
        &self,
        filter: &IssueFilter,
        changes: &IssueChanges,
    ) -> Result<Option<Issue>> {
        // Index lock is released before any record lock is taken.
        let candidates = self.index.read().map_err(poisoned)?.candidates(filter);

        for (_, slot) in candidates {
            let mut cell = slot.lock().map_err(poisoned)?;
            if let Some(issue) = cell.as_mut().filter(|issue| filter.matches(issue)) {
                changes.apply_to(issue);
                return Ok(Some(issue.clone()));
            }
        }
        Ok(None)
    }

    async fn delete_one(&self, filter: &IssueFilter) -> Result<u64> {
        let mut index = self.index.write().map_err(poisoned)?;

        let mut removed = None;
        for (id, slot) in index.candidates(filter) {
            let mut cell = slot.lock().map_err(poisoned)?;
            if cell.as_ref().is_some_and(|issue| filter.matches(issue)) {
                *cell = None;
                removed = Some(id);
                break;
            }
        }

        let Some(id) = removed else {
            return Ok(0);
        };
        index.slots.remove(&id);
        index.order.retain(|existing| *existing != id);
        Ok(1)
    }
}
