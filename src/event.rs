//! Typed alter events fired around query execution.
//!
//! Listeners register for an [`EventKind`], optionally scoped to a tag. On
//! dispatch, unscoped listeners run first, then the listeners of each tag in
//! the order the tags are given. Within one scope, listeners run by ascending
//! weight, then in registration order. Every listener may mutate the payload
//! in place before the next one runs; the first error aborts the dispatch and
//! is returned to the caller.
//!
//! # Examples
//!
//! ```
//! use halberd::event::EventDispatcher;
//!
//! let events = EventDispatcher::new();
//! events.on_results_alter(None, 0, |results| {
//!     results.add_warning("served from the test listener");
//!     Ok(())
//! });
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::trace;
use parking_lot::RwLock;

use crate::error::Result;
use crate::query::{Query, ResultSet};

/// Kind of alter event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Fired after the index pre-processed a query, before the backend runs.
    QueryAlter,
    /// Fired after the index post-processed the results.
    ResultsAlter,
}

/// Listener altering a query.
pub type QueryListener = Arc<dyn Fn(&mut Query) -> Result<()> + Send + Sync>;

/// Listener altering a result set.
pub type ResultsListener = Arc<dyn Fn(&mut ResultSet) -> Result<()> + Send + Sync>;

/// Payload of a dispatched event.
pub enum EventPayload<'a> {
    Query(&'a mut Query),
    Results(&'a mut ResultSet),
}

impl EventPayload<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::Query(_) => EventKind::QueryAlter,
            EventPayload::Results(_) => EventKind::ResultsAlter,
        }
    }
}

#[derive(Clone)]
enum Listener {
    Query(QueryListener),
    Results(ResultsListener),
}

impl Listener {
    fn kind(&self) -> EventKind {
        match self {
            Listener::Query(_) => EventKind::QueryAlter,
            Listener::Results(_) => EventKind::ResultsAlter,
        }
    }
}

struct Registration {
    tag: Option<String>,
    weight: i32,
    sequence: u64,
    listener: Listener,
}

/// Registry and dispatcher of alter listeners.
#[derive(Default)]
pub struct EventDispatcher {
    registrations: RwLock<Vec<Registration>>,
    sequence: AtomicU64,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.registrations.read().len())
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a query listener, for every query (`tag == None`) or only
    /// for queries carrying `tag`.
    pub fn on_query_alter<F>(&self, tag: Option<&str>, weight: i32, listener: F)
    where
        F: Fn(&mut Query) -> Result<()> + Send + Sync + 'static,
    {
        self.register(tag, weight, Listener::Query(Arc::new(listener)));
    }

    /// Register a results listener, for every query or only for tagged ones.
    pub fn on_results_alter<F>(&self, tag: Option<&str>, weight: i32, listener: F)
    where
        F: Fn(&mut ResultSet) -> Result<()> + Send + Sync + 'static,
    {
        self.register(tag, weight, Listener::Results(Arc::new(listener)));
    }

    fn register(&self, tag: Option<&str>, weight: i32, listener: Listener) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.registrations.write().push(Registration {
            tag: tag.map(str::to_string),
            weight,
            sequence,
            listener,
        });
    }

    /// Number of listeners registered for a kind and scope.
    pub fn listener_count(&self, kind: EventKind, tag: Option<&str>) -> usize {
        self.registrations
            .read()
            .iter()
            .filter(|r| r.listener.kind() == kind && r.tag.as_deref() == tag)
            .count()
    }

    /// Run the listeners matching the payload's kind and the given tags.
    pub fn dispatch(&self, tags: &[String], payload: EventPayload<'_>) -> Result<()> {
        let kind = payload.kind();
        let listeners = self.ordered_listeners(kind, tags);
        trace!("dispatching {kind:?} to {} listener(s)", listeners.len());

        match payload {
            EventPayload::Query(query) => {
                for listener in listeners {
                    if let Listener::Query(f) = listener {
                        f(&mut *query)?;
                    }
                }
            }
            EventPayload::Results(results) => {
                for listener in listeners {
                    if let Listener::Results(f) = listener {
                        f(&mut *results)?;
                    }
                }
            }
        }
        Ok(())
    }

    // Snapshot under the read lock so listeners may register further
    // listeners while running.
    fn ordered_listeners(&self, kind: EventKind, tags: &[String]) -> Vec<Listener> {
        let guard = self.registrations.read();
        let scope = |tag: Option<&str>| {
            let mut matching: Vec<&Registration> = guard
                .iter()
                .filter(|r| r.listener.kind() == kind && r.tag.as_deref() == tag)
                .collect();
            matching.sort_by_key(|r| (r.weight, r.sequence));
            matching
                .into_iter()
                .map(|r| r.listener.clone())
                .collect::<Vec<_>>()
        };

        let mut ordered = scope(None);
        for tag in tags {
            ordered.extend(scope(Some(tag.as_str())));
        }
        ordered
    }
}
