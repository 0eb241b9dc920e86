//! In-flight bookkeeping for cycle detection.
//!
//! Every thread resolving against a container gets its own stack of identities
//! under construction, so concurrent `create` calls never see each other's
//! frames. A thread started by a provider inherits the frames of that provider
//! when it resolves through the provider's handle. Entering returns a guard
//! that pops the identity on every exit path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use crate::container::descriptor::DependencyId;
use crate::errors::ResolveError;

/// Ordered path of identities currently being constructed on one call stack
#[derive(Debug, Clone, Default)]
pub struct ResolutionPath {
    ids: Vec<DependencyId>,
}

impl ResolutionPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: DependencyId) {
        self.ids.push(id);
    }

    pub fn pop(&mut self) -> Option<DependencyId> {
        self.ids.pop()
    }

    pub fn contains(&self, id: &DependencyId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The current path followed by `id`, i.e. the closing edge of a cycle
    pub fn closed_by(&self, id: &DependencyId) -> Vec<DependencyId> {
        let mut chain = self.ids.clone();
        chain.push(id.clone());
        chain
    }

    pub fn path_string(&self) -> String {
        self.ids
            .iter()
            .map(DependencyId::to_key)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Frames under construction when a provider was invoked.
///
/// The container handle passed to a provider carries its frame. A thread that
/// starts resolving through that handle while the provider still runs begins
/// from these frames instead of an empty path, so cycles and depth are counted
/// across a spawn and join.
#[derive(Debug)]
pub(crate) struct Frame {
    thread: ThreadId,
    ids: Vec<DependencyId>,
    active: AtomicBool,
}

impl Frame {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Frames a new path on `thread` starts from
    fn inherited_by(&self, thread: ThreadId) -> Vec<DependencyId> {
        if self.thread != thread && self.is_active() {
            self.ids.clone()
        } else {
            Vec::new()
        }
    }
}

/// One thread's path. The first `inherited` ids belong to the thread that
/// spawned it and are never popped here.
#[derive(Debug)]
struct ThreadPath {
    path: ResolutionPath,
    inherited: usize,
}

impl ThreadPath {
    fn starting_from(ids: Vec<DependencyId>) -> Self {
        Self {
            inherited: ids.len(),
            path: ResolutionPath { ids },
        }
    }

    fn owns_nothing(&self) -> bool {
        self.path.len() <= self.inherited
    }
}

/// Per-thread resolution paths of one container
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    paths: Mutex<HashMap<ThreadId, ThreadPath>>,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as under construction on the calling thread.
    ///
    /// `parent` is the frame of the provider whose handle is resolving, if any.
    /// It only matters when the calling thread has no path of its own yet.
    pub(crate) fn enter(
        &self,
        id: &DependencyId,
        max_depth: usize,
        parent: Option<&Frame>,
    ) -> Result<InFlightGuard<'_>, ResolveError> {
        let thread = thread::current().id();
        let mut paths = self
            .paths
            .lock()
            .map_err(|_| ResolveError::lock_poisoned("in_flight"))?;
        let entry = paths.entry(thread).or_insert_with(|| {
            ThreadPath::starting_from(
                parent
                    .map(|frame| frame.inherited_by(thread))
                    .unwrap_or_default(),
            )
        });

        let rejected = if entry.path.contains(id) {
            Some(ResolveError::circular(entry.path.closed_by(id)))
        } else if entry.path.len() >= max_depth {
            Some(ResolveError::ResolutionDepthExceeded {
                id: id.clone(),
                depth: max_depth,
            })
        } else {
            None
        };

        if let Some(error) = rejected {
            if entry.owns_nothing() {
                paths.remove(&thread);
            }
            return Err(error);
        }

        entry.path.push(id.clone());
        let frame = Arc::new(Frame {
            thread,
            ids: entry.path.ids.clone(),
            active: AtomicBool::new(true),
        });

        Ok(InFlightGuard {
            in_flight: self,
            thread,
            frame,
        })
    }

    /// Path of the calling thread
    pub(crate) fn current_path(&self) -> ResolutionPath {
        let thread = thread::current().id();
        self.paths
            .lock()
            .ok()
            .and_then(|paths| paths.get(&thread).map(|entry| entry.path.clone()))
            .unwrap_or_default()
    }

    /// True when no thread has anything under construction
    pub(crate) fn is_idle(&self) -> bool {
        self.paths
            .lock()
            .map(|paths| paths.values().all(ThreadPath::owns_nothing))
            .unwrap_or(false)
    }
}

/// Pops the entered identity when dropped
pub(crate) struct InFlightGuard<'a> {
    in_flight: &'a InFlight,
    thread: ThreadId,
    frame: Arc<Frame>,
}

impl InFlightGuard<'_> {
    /// Frame handed to the provider of the entered identity
    pub(crate) fn frame(&self) -> Arc<Frame> {
        self.frame.clone()
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.frame.active.store(false, Ordering::Release);

        // A poisoned lock means a provider panicked; the container is unusable anyway.
        if let Ok(mut paths) = self.in_flight.paths.lock() {
            if let Some(entry) = paths.get_mut(&self.thread) {
                entry.path.pop();
                if entry.owns_nothing() {
                    paths.remove(&self.thread);
                }
            }
        }
    }
}
