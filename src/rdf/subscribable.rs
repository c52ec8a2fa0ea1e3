//! Subscribable quad store
//!
//! A cheaply clonable handle over a shared `QuadStore` that notifies
//! observers whose pattern matches a mutation. All handles cloned from one
//! store see and mutate the same quads.
//!
//! Notification rules:
//! - callbacks run after the mutation is fully applied, in subscription order
//! - each callback receives only the changes matching its pattern
//! - mutations issued from inside a callback are queued and applied as the
//!   next notification round, once every callback of the current round ran
//! - inside a transaction, notifications are held back until commit

use super::changes::{ChangeManager, DatasetChanges};
use super::store::{Dataset, QuadStore};
use super::types::{Quad, QuadPattern};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

type Callback = Box<dyn FnMut(&DatasetChanges)>;

struct Subscription {
    id: u64,
    pattern: QuadPattern,
    active: Cell<bool>,
    callback: RefCell<Callback>,
}

struct Inner {
    store: RefCell<QuadStore>,
    subscriptions: RefCell<Vec<Rc<Subscription>>>,
    next_id: Cell<u64>,
    /// Mutations raised while callbacks were running
    pending: RefCell<VecDeque<DatasetChanges>>,
    notifying: Cell<bool>,
    /// Changes recorded by the innermost open transaction
    transaction: RefCell<Option<DatasetChanges>>,
}

/// Resets the notifying flag even if a callback panics
struct NotifyGuard<'a>(&'a Cell<bool>);

impl<'a> NotifyGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for NotifyGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Shared, observable quad store
#[derive(Clone)]
pub struct SubscribableStore {
    inner: Rc<Inner>,
}

/// Returned by `subscribe`; consume it to stop receiving notifications
#[derive(Debug)]
pub struct SubscriptionHandle {
    id: u64,
    inner: Weak<Inner>,
}

impl SubscriptionHandle {
    /// Identifier of the subscription
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop notifications for this subscription
    pub fn unsubscribe(self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut subscriptions = inner.subscriptions.borrow_mut();
            if let Some(pos) = subscriptions.iter().position(|s| s.id == self.id) {
                subscriptions.remove(pos).active.set(false);
            }
        }
    }
}

impl SubscribableStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::from_store(QuadStore::new())
    }

    /// Wrap an existing quad store
    pub fn from_store(store: QuadStore) -> Self {
        Self {
            inner: Rc::new(Inner {
                store: RefCell::new(store),
                subscriptions: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                pending: RefCell::new(VecDeque::new()),
                notifying: Cell::new(false),
                transaction: RefCell::new(None),
            }),
        }
    }

    /// Register a callback for changes matching `pattern`
    pub fn subscribe(
        &self,
        pattern: QuadPattern,
        callback: impl FnMut(&DatasetChanges) + 'static,
    ) -> SubscriptionHandle {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.subscriptions.borrow_mut().push(Rc::new(Subscription {
            id,
            pattern,
            active: Cell::new(true),
            callback: RefCell::new(Box::new(callback)),
        }));
        debug!("Registered subscription {}", id);
        SubscriptionHandle {
            id,
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Number of live subscriptions
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.borrow().len()
    }

    /// Add a quad (no-op if present)
    pub fn add(&self, quad: Quad) {
        self.update(DatasetChanges::from_parts([quad], []));
    }

    /// Delete a quad (no-op if absent)
    pub fn delete(&self, quad: &Quad) {
        self.update(DatasetChanges::from_parts([], [quad.clone()]));
    }

    /// Apply a whole change set as one mutation and one notification round
    pub fn bulk(&self, changes: &DatasetChanges) {
        self.update(changes.clone());
    }

    /// Snapshot of the quads matching a pattern
    pub fn match_quads(&self, pattern: &QuadPattern) -> Vec<Quad> {
        self.inner.store.borrow().query(pattern)
    }

    /// Check whether a quad is present
    pub fn has(&self, quad: &Quad) -> bool {
        self.inner.store.borrow().contains(quad)
    }

    /// Number of quads
    pub fn len(&self) -> usize {
        self.inner.store.borrow().len()
    }

    /// True when the store holds no quads
    pub fn is_empty(&self) -> bool {
        self.inner.store.borrow().is_empty()
    }

    /// Run a closure against the underlying store
    pub fn read<R>(&self, f: impl FnOnce(&QuadStore) -> R) -> R {
        f(&self.inner.store.borrow())
    }

    /// Copy of the current quads
    pub fn snapshot(&self) -> QuadStore {
        self.inner.store.borrow().clone()
    }

    /// True when both handles share the same underlying store
    pub fn same_store(&self, other: &SubscribableStore) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Run `f` as a transaction.
    ///
    /// Mutations are applied immediately (so reads inside `f` see them) but
    /// subscribers are notified once, with the net changes, when `f` returns
    /// `Ok`. On `Err` the recorded changes are reverted without notifying.
    /// A transaction opened inside another joins the outer one on success.
    pub fn transaction<T, E>(
        &self,
        f: impl FnOnce(&Self) -> Result<T, E>,
    ) -> Result<(T, DatasetChanges), E> {
        if self.inner.notifying.get() {
            return self.queued_transaction(f);
        }

        let outer = self.inner.transaction.replace(Some(DatasetChanges::new()));
        let result = f(self);
        let recorded = self
            .inner
            .transaction
            .replace(outer)
            .unwrap_or_default();

        match result {
            Ok(value) => {
                let nested = match self.inner.transaction.borrow_mut().as_mut() {
                    Some(outer) => {
                        outer.merge(&recorded);
                        true
                    }
                    None => false,
                };
                if !nested && !recorded.is_empty() {
                    debug!("Committing transaction with {} quad changes", recorded.len());
                    self.notify(recorded.clone());
                }
                Ok((value, recorded))
            }
            Err(e) => {
                warn!("Rolling back transaction with {} quad changes", recorded.len());
                self.inner
                    .store
                    .borrow_mut()
                    .apply(&ChangeManager::invert(&recorded));
                Err(e)
            }
        }
    }

    /// Transactions opened from a callback only queue their mutations, so
    /// rolling back means dropping what they queued.
    fn queued_transaction<T, E>(
        &self,
        f: impl FnOnce(&Self) -> Result<T, E>,
    ) -> Result<(T, DatasetChanges), E> {
        let mark = self.inner.pending.borrow().len();
        match f(self) {
            Ok(value) => {
                let mut requested = DatasetChanges::new();
                for changes in self.inner.pending.borrow().iter().skip(mark) {
                    requested.merge(changes);
                }
                Ok((value, requested))
            }
            Err(e) => {
                self.inner.pending.borrow_mut().truncate(mark);
                Err(e)
            }
        }
    }

    fn update(&self, changes: DatasetChanges) {
        if changes.is_empty() {
            return;
        }
        if self.inner.notifying.get() {
            warn!(
                "Queueing {} quad changes raised during notification",
                changes.len()
            );
            self.inner.pending.borrow_mut().push_back(changes);
            return;
        }

        let effective = self.inner.store.borrow_mut().apply(&changes);
        if effective.is_empty() {
            return;
        }
        if let Some(recorded) = self.inner.transaction.borrow_mut().as_mut() {
            recorded.merge(&effective);
            return;
        }
        self.notify(effective);
    }

    fn notify(&self, changes: DatasetChanges) {
        let _guard = NotifyGuard::enter(&self.inner.notifying);
        let mut round = changes;
        loop {
            self.dispatch(&round);

            let queued: Vec<DatasetChanges> = self.inner.pending.borrow_mut().drain(..).collect();
            if queued.is_empty() {
                break;
            }
            let mut next = DatasetChanges::new();
            for changes in &queued {
                let effective = self.inner.store.borrow_mut().apply(changes);
                next.merge(&effective);
            }
            if next.is_empty() {
                break;
            }
            debug!("Flushing {} queued quad changes", next.len());
            round = next;
        }
    }

    fn dispatch(&self, changes: &DatasetChanges) {
        let subscriptions: Vec<Rc<Subscription>> = self.inner.subscriptions.borrow().clone();
        debug!(
            "Dispatching {} quad changes to {} subscriptions",
            changes.len(),
            subscriptions.len()
        );
        for subscription in subscriptions {
            if !subscription.active.get() {
                continue;
            }
            let relevant = changes.restrict(&subscription.pattern);
            if relevant.is_empty() {
                continue;
            }
            match subscription.callback.try_borrow_mut() {
                Ok(mut callback) => (&mut *callback)(&relevant),
                Err(_) => warn!("Subscription {} is already running", subscription.id),
            }
        }
    }
}

impl Default for SubscribableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SubscribableStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscribableStore")
            .field("quads", &self.len())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

impl Dataset for SubscribableStore {
    fn add(&mut self, quad: Quad) {
        self.update(DatasetChanges::from_parts([quad], []));
    }

    fn delete(&mut self, quad: &Quad) {
        self.update(DatasetChanges::from_parts([], [quad.clone()]));
    }

    fn match_quads(&self, pattern: &QuadPattern) -> Vec<Quad> {
        self.inner.store.borrow().query(pattern)
    }

    fn has(&self, quad: &Quad) -> bool {
        self.inner.store.borrow().contains(quad)
    }

    fn size(&self) -> usize {
        self.inner.store.borrow().len()
    }
}
