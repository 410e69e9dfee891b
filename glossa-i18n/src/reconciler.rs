//! Keeping inserted content translated
//!
//! The reconciler watches the document body for inserted nodes and re-runs
//! the applier once the insertions settle:
//!
//! ```text
//!   Idle --nodes added--> Scheduled --timer fires--> Applying --done--> Idle
//!                          ^     |
//!                          +-----+ nodes added: timer restarts
//! ```
//!
//! Mutation batches delivered on a thread that holds the session's apply
//! guard are the applier's own writes and are dropped without changing state.
//! Insertions from other threads during a pass schedule another pass.

use crate::{Applier, ApplyReport, I18nError, Result, Session};
use glossa_dom::{Document, MutationObserver, MutationRecord, ObserveOptions, ObserverHandle};
use glossa_log::{debug, trace};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Reconciler lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilerState {
    Idle,
    /// A debounce timer is pending
    Scheduled,
    /// The applier is running
    Applying,
}

/// Counters since the reconciler started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcilerStats {
    /// Times the debounce timer was started or restarted
    pub scheduled: u64,
    /// Applier passes run by the reconciler
    pub applied: u64,
    /// Mutation batches dropped as the applier's own writes
    pub suppressed: u64,
}

struct Shared {
    document: Document,
    session: Arc<Session>,
    applier: Applier,
    debounce: Duration,
    runtime: Handle,
    state: Mutex<ReconcilerState>,
    timer: Mutex<Option<JoinHandle<()>>>,
    stats: Mutex<ReconcilerStats>,
    observer: Mutex<Option<ObserverHandle>>,
}

impl Shared {
    fn on_mutations(self: &Arc<Self>, records: &[MutationRecord]) {
        if self.session.is_applying_on_current_thread() {
            self.stats.lock().suppressed += 1;
            trace!(target: "glossa::reconciler", "Ignoring {} record(s) from the applier", records.len());
            return;
        }
        if records.iter().any(MutationRecord::has_added_nodes) {
            self.schedule();
        }
    }

    fn schedule(self: &Arc<Self>) {
        let mut timer = self.timer.lock();
        if let Some(pending) = timer.take() {
            pending.abort();
        }
        *self.state.lock() = ReconcilerState::Scheduled;
        self.stats.lock().scheduled += 1;
        debug!(target: "glossa::reconciler", "Reconciliation scheduled in {:?}", self.debounce);

        let weak = Arc::downgrade(self);
        let delay = self.debounce;
        *timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = weak.upgrade() {
                shared.fire();
            }
        }));
    }

    fn fire(&self) -> Option<ApplyReport> {
        {
            let mut state = self.state.lock();
            if *state != ReconcilerState::Scheduled {
                return None;
            }
            *state = ReconcilerState::Applying;
        }

        let report = self.applier.apply(&self.document, self.document.root());
        self.stats.lock().applied += 1;
        debug!(target: "glossa::reconciler", "Reconciled {} element(s)", report.matched);

        let mut state = self.state.lock();
        if *state == ReconcilerState::Applying {
            *state = ReconcilerState::Idle;
        }
        Some(report)
    }

    fn cancel_timer(&self) {
        if let Some(pending) = self.timer.lock().take() {
            pending.abort();
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.cancel_timer();
        if let Some(observer) = self.observer.get_mut().take() {
            observer.disconnect();
        }
    }
}

struct Watch(Weak<Shared>);

impl MutationObserver for Watch {
    fn on_mutations(&self, records: &[MutationRecord], _document: &Document) {
        if let Some(shared) = self.0.upgrade() {
            shared.on_mutations(records);
        }
    }
}

/// Debounced re-application of translations to inserted content.
///
/// Cloning yields another handle to the same reconciler. The observer and
/// timer are released by [`Reconciler::shutdown`] or when the last handle drops.
#[derive(Clone)]
pub struct Reconciler {
    shared: Arc<Shared>,
}

impl Reconciler {
    /// Observe insertions beneath the document body.
    ///
    /// Must be called within a Tokio runtime; the debounce timer runs on it.
    pub fn start(
        document: &Document,
        session: Arc<Session>,
        applier: Applier,
        debounce: Duration,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|err| I18nError::NoRuntime(err.to_string()))?;
        let shared = Arc::new(Shared {
            document: document.clone(),
            session,
            applier,
            debounce,
            runtime,
            state: Mutex::new(ReconcilerState::Idle),
            timer: Mutex::new(None),
            stats: Mutex::new(ReconcilerStats::default()),
            observer: Mutex::new(None),
        });

        let handle = document.observe(
            document.body(),
            ObserveOptions::subtree_child_list(),
            Arc::new(Watch(Arc::downgrade(&shared))),
        );
        *shared.observer.lock() = Some(handle);
        debug!(target: "glossa::reconciler", "Observing document body, debounce {:?}", debounce);

        Ok(Self { shared })
    }

    pub fn state(&self) -> ReconcilerState {
        *self.shared.state.lock()
    }

    pub fn stats(&self) -> ReconcilerStats {
        *self.shared.stats.lock()
    }

    pub fn is_observing(&self) -> bool {
        self.shared.observer.lock().is_some()
    }

    /// Run a scheduled pass now instead of waiting for the timer.
    pub fn flush(&self) -> Option<ApplyReport> {
        self.shared.cancel_timer();
        self.shared.fire()
    }

    /// Cancel any pending pass and stop observing.
    pub fn shutdown(&self) {
        self.shared.cancel_timer();
        if let Some(observer) = self.shared.observer.lock().take() {
            observer.disconnect();
        }
        *self.shared.state.lock() = ReconcilerState::Idle;
        debug!(target: "glossa::reconciler", "Reconciler stopped");
    }
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("state", &self.state())
            .field("stats", &self.stats())
            .field("debounce", &self.shared.debounce)
            .finish()
    }
}
