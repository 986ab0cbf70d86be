// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Deferred named lists
//!
//! A named, ordered collection fetched from the server on first access.
//!
//! ```text
//! NEW ──first access──▶ POPULATING ──populate ok──▶ POPULATED
//!  ▲                        │
//!  └────populate failed─────┘
//! ```
//!
//! The populate operation runs exactly once per successful population, outside
//! the state lock. Access from the populating thread itself (re-entrancy)
//! fails with `XmlaError::InvariantViolation`; access from other threads
//! blocks until population finishes. A failed population returns the list to
//! `NEW`, so a later access issues the request again.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use xmla_olap_protocol::{XmlaError, XmlaResult};

use crate::element::MetadataElement;

/// Operation that fetches the list's contents
pub type Populator<T> = Box<dyn Fn() -> XmlaResult<Vec<T>> + Send + Sync>;

/// Observable lifecycle state of a deferred list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPhase {
    New,
    Populating,
    Populated,
}

enum ListState<T> {
    New,
    Populating(ThreadId),
    Populated(Arc<NamedList<T>>),
}

/// Immutable, populated contents of a deferred list
#[derive(Debug)]
pub struct NamedList<T> {
    items: Vec<T>,
    by_name: HashMap<String, usize>,
    by_unique_name: HashMap<String, usize>,
}

impl<T: MetadataElement> NamedList<T> {
    fn new(items: Vec<T>) -> Self {
        let mut by_name = HashMap::with_capacity(items.len());
        let mut by_unique_name = HashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            // First occurrence wins, matching a linear scan.
            by_name.entry(item.name().to_string()).or_insert(i);
            by_unique_name.entry(item.unique_name().to_string()).or_insert(i);
        }
        Self {
            items,
            by_name,
            by_unique_name,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn by_name(&self, name: &str) -> Option<&T> {
        self.by_name.get(name).map(|&i| &self.items[i])
    }

    pub fn by_unique_name(&self, unique_name: &str) -> Option<&T> {
        self.by_unique_name.get(unique_name).map(|&i| &self.items[i])
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Lazily populated named list
pub struct DeferredNamedList<T> {
    state: Mutex<ListState<T>>,
    ready: Condvar,
    populator: Populator<T>,
}

/// Resets the list to `NEW` if population unwinds or fails
struct PopulateGuard<'a, T> {
    list: &'a DeferredNamedList<T>,
    armed: bool,
}

impl<T> Drop for PopulateGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            *self.list.state.lock() = ListState::New;
            self.list.ready.notify_all();
        }
    }
}

impl<T: MetadataElement + Clone> DeferredNamedList<T> {
    /// Create a list that runs `populator` on first access
    pub fn new<F>(populator: F) -> Self
    where
        F: Fn() -> XmlaResult<Vec<T>> + Send + Sync + 'static,
    {
        Self {
            state: Mutex::new(ListState::New),
            ready: Condvar::new(),
            populator: Box::new(populator),
        }
    }

    /// Create a list that is already populated
    pub fn from_items(items: Vec<T>) -> Self {
        Self {
            state: Mutex::new(ListState::Populated(Arc::new(NamedList::new(items)))),
            ready: Condvar::new(),
            populator: Box::new(|| Ok(Vec::new())),
        }
    }

    /// Install contents on a list that has not been populated yet
    #[cfg(test)]
    pub(crate) fn preload(&self, items: Vec<T>) {
        let mut state = self.state.lock();
        if matches!(*state, ListState::New) {
            *state = ListState::Populated(Arc::new(NamedList::new(items)));
        }
    }

    pub fn phase(&self) -> ListPhase {
        match &*self.state.lock() {
            ListState::New => ListPhase::New,
            ListState::Populating(_) => ListPhase::Populating,
            ListState::Populated(_) => ListPhase::Populated,
        }
    }

    /// The populated contents, populating first if needed
    pub fn populated(&self) -> XmlaResult<Arc<NamedList<T>>> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        loop {
            let must_wait = match &*state {
                ListState::Populated(list) => return Ok(Arc::clone(list)),
                ListState::Populating(owner) if *owner == me => {
                    return Err(XmlaError::InvariantViolation(
                        "recursive population of a deferred list".to_string(),
                    ));
                }
                ListState::Populating(_) => true,
                ListState::New => false,
            };
            if !must_wait {
                break;
            }
            self.ready.wait(&mut state);
        }
        *state = ListState::Populating(me);
        drop(state);

        let mut guard = PopulateGuard {
            list: self,
            armed: true,
        };
        let items = (self.populator)()?;
        let list = Arc::new(NamedList::new(items));
        *self.state.lock() = ListState::Populated(Arc::clone(&list));
        guard.armed = false;
        self.ready.notify_all();
        Ok(list)
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> XmlaResult<Option<T>> {
        Ok(self.populated()?.get(index).cloned())
    }

    /// Element with the given name
    pub fn get_by_name(&self, name: &str) -> XmlaResult<Option<T>> {
        Ok(self.populated()?.by_name(name).cloned())
    }

    /// Element with the given unique name
    pub fn get_by_unique_name(&self, unique_name: &str) -> XmlaResult<Option<T>> {
        Ok(self.populated()?.by_unique_name(unique_name).cloned())
    }

    pub fn len(&self) -> XmlaResult<usize> {
        Ok(self.populated()?.len())
    }

    pub fn is_empty(&self) -> XmlaResult<bool> {
        Ok(self.populated()?.is_empty())
    }

    /// Copy of all elements, in order
    pub fn to_vec(&self) -> XmlaResult<Vec<T>> {
        Ok(self.populated()?.items().to_vec())
    }
}

impl<T> std::fmt::Debug for DeferredNamedList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match &*self.state.lock() {
            ListState::New => "new",
            ListState::Populating(_) => "populating",
            ListState::Populated(_) => "populated",
        };
        f.debug_struct("DeferredNamedList")
            .field("phase", &phase)
            .finish()
    }
}
