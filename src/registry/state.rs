/*!
 * Language list cache state machine.
 *
 * `Empty -> Warm` on a rebuild, `Warm -> Stale` when a read finds the store
 * disagreeing with the warm list, `Stale -> Empty` before the rebuild, and
 * any state `-> Empty` on a mutation or explicit clear. While a thread
 * rebuilds, reads from that same thread see an empty list instead of
 * recursing; other threads rebuild on their own.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use log::debug;
use parking_lot::Mutex;

use crate::language::Language;
use crate::store::NodeId;

/// Observable state of the language list cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Empty,
    Warm,
    Stale,
    Rebuilding,
}

/// Ordered language list with its reverse index
#[derive(Debug, Default)]
pub struct LanguageIndex {
    languages: Vec<Language>,
    by_key: HashMap<String, usize>,
    ids: Vec<NodeId>,
}

impl LanguageIndex {
    /// Index an already ordered list
    pub fn new(languages: Vec<Language>) -> Self {
        let mut by_key = HashMap::new();
        for (position, language) in languages.iter().enumerate() {
            by_key.entry(language.id.to_string()).or_insert(position);
            by_key.entry(language.slug.clone()).or_insert(position);
            by_key.entry(language.locale.clone()).or_insert(position);
            for (namespace, id) in &language.node_ids {
                by_key.entry(format!("{}:{}", namespace, id)).or_insert(position);
            }
        }

        let mut ids: Vec<NodeId> = languages.iter().map(|l| l.id).collect();
        ids.sort_unstable();

        Self {
            languages,
            by_key,
            ids,
        }
    }

    /// Record the store ids the list was built from, when they differ from
    /// the listed ids (skipped or hook-filtered entries)
    pub fn built_from(mut self, mut ids: Vec<NodeId>) -> Self {
        ids.sort_unstable();
        self.ids = ids;
        self
    }

    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    /// Look a language up by any indexed key
    pub fn get(&self, key: &str) -> Option<&Language> {
        self.by_key.get(key).map(|i| &self.languages[*i])
    }

    /// Sorted primary node ids, compared against the store on each read
    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }
}

enum ListState {
    Empty,
    Warm(Arc<LanguageIndex>),
    Stale,
    Building(ThreadId),
}

/// What a read should do next
pub enum ReadDecision {
    /// Serve this list once it passes the staleness check
    Warm(Arc<LanguageIndex>),
    /// Rebuild from the caches or the store
    Rebuild,
    /// A rebuild on this thread is in progress
    Reentrant,
}

/// Ticket returned when a rebuild starts
pub struct BuildTicket {
    generation: u64,
    owns_state: bool,
}

struct Inner {
    state: ListState,
    generation: u64,
}

/// Process-local tier of the language list
pub struct ListCache {
    inner: Mutex<Inner>,
}

impl Default for ListCache {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: ListState::Empty,
                generation: 0,
            }),
        }
    }
}

impl ListCache {
    pub fn status(&self) -> CacheStatus {
        match self.inner.lock().state {
            ListState::Empty => CacheStatus::Empty,
            ListState::Warm(_) => CacheStatus::Warm,
            ListState::Stale => CacheStatus::Stale,
            ListState::Building(_) => CacheStatus::Rebuilding,
        }
    }

    pub fn begin_read(&self) -> ReadDecision {
        match &self.inner.lock().state {
            ListState::Warm(index) => ReadDecision::Warm(index.clone()),
            ListState::Building(owner) if *owner == thread::current().id() => ReadDecision::Reentrant,
            _ => ReadDecision::Rebuild,
        }
    }

    /// Record that the warm list disagrees with the store
    pub fn mark_stale(&self) {
        let mut inner = self.inner.lock();
        if matches!(inner.state, ListState::Warm(_)) {
            debug!("Language list is stale");
            inner.state = ListState::Stale;
        }
    }

    /// Enter the rebuilding state; another thread's rebuild is not disturbed
    pub fn begin_build(&self) -> BuildTicket {
        let mut inner = self.inner.lock();
        let owns_state = !matches!(inner.state, ListState::Building(_));
        if owns_state {
            inner.state = ListState::Building(thread::current().id());
        }
        BuildTicket {
            generation: inner.generation,
            owns_state,
        }
    }

    /// Publish a rebuilt list unless a mutation happened meanwhile
    pub fn finish_build(&self, ticket: BuildTicket, index: Arc<LanguageIndex>) {
        let mut inner = self.inner.lock();
        if inner.generation != ticket.generation {
            debug!("Discarding language list built before a mutation");
            if ticket.owns_state {
                inner.state = ListState::Empty;
            }
            return;
        }
        if !ticket.owns_state && matches!(inner.state, ListState::Building(_)) {
            // The owning thread publishes; its hooks still expect an empty list
            return;
        }
        inner.state = ListState::Warm(index);
    }

    /// Leave the rebuilding state after a failed rebuild
    pub fn abort_build(&self, ticket: BuildTicket) {
        if ticket.owns_state {
            self.inner.lock().state = ListState::Empty;
        }
    }

    /// Drop the list; any in-flight rebuild will not be published
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        if !matches!(inner.state, ListState::Building(_)) {
            inner.state = ListState::Empty;
        }
    }
}
