//! Deferred values.
//!
//! A [`Deferred`] stands in for a value that is not known yet. It starts out
//! [`State::Pending`] and settles exactly once, either fulfilled with a value
//! or rejected with an [`Error`]. Handlers attached with [`Deferred::then`]
//! and friends run on the current thread's [`Reactor`] once the call stack
//! that attached them has unwound, never synchronously.
//!
//! ```
//! use deferred::{runtime, Deferred};
//!
//! let doubled = Deferred::resolved(5).then(|v| Ok(v * 2));
//! assert!(doubled.is_pending());
//!
//! runtime::run();
//! assert_eq!(doubled.value(), Some(10));
//! ```

mod continuation;
mod future;

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::Rc;
use std::task::Waker;

use crate::runtime::Reactor;
use crate::Error;

use continuation::{Continuation, Deliver, Finalizer, Handler, Subscriber};

/// The settlement state of a [`Deferred`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum State {
    /// Not settled yet.
    Pending,
    /// Settled with a value.
    Fulfilled,
    /// Settled with a reason.
    Rejected,
}

/// Anything that can be subscribed to for an eventual value.
///
/// Resolving a [`Deferred`] with an `Awaitable` adopts its outcome instead of
/// storing the awaitable itself.
pub trait Awaitable<T> {
    /// Register callbacks for the eventual outcome. Exactly one of them must be
    /// called, at most once.
    fn subscribe(self: Box<Self>, on_fulfilled: Box<dyn FnOnce(T)>, on_rejected: Box<dyn FnOnce(Error)>);

    /// Return `self` as a [`Deferred`] when it is one. Used to detect a value
    /// adopting itself.
    fn as_deferred(&self) -> Option<&Deferred<T>> {
        None
    }
}

/// What a resolver or handler hands over: a plain value, or an awaitable whose
/// outcome should be adopted.
pub enum Resolution<T> {
    /// Fulfill with this value.
    Value(T),
    /// Adopt the eventual outcome of this awaitable.
    Awaitable(Box<dyn Awaitable<T>>),
}

impl<T> Resolution<T> {
    /// Wrap an awaitable.
    pub fn awaitable(awaitable: impl Awaitable<T> + 'static) -> Self {
        Self::Awaitable(Box::new(awaitable))
    }
}

impl<T: Clone + 'static> From<Deferred<T>> for Resolution<T> {
    fn from(deferred: Deferred<T>) -> Self {
        Self::Awaitable(Box::new(deferred))
    }
}

impl<T: fmt::Debug> fmt::Debug for Resolution<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Awaitable(_) => f.write_str("Awaitable(..)"),
        }
    }
}

/// A handle to a value that settles at most once.
///
/// Cloning the handle does not copy the value: every clone observes and may
/// settle the same underlying state.
pub struct Deferred<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

struct Inner<T> {
    /// `None` while pending.
    outcome: Option<Result<T, Error>>,
    /// Set once resolved with an awaitable; only the awaitable may settle us.
    adopting: bool,
    continuations: Vec<Box<dyn Deliver<T>>>,
    finalizers: Vec<Finalizer<T>>,
    wakers: Vec<Waker>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        let mut s = f.debug_struct("Deferred");
        match &inner.outcome {
            None => s.field("state", &State::Pending),
            Some(Ok(value)) => s.field("state", &State::Fulfilled).field("value", value),
            Some(Err(reason)) => s.field("state", &State::Rejected).field("reason", reason),
        };
        s.field("continuations", &inner.continuations.len())
            .field("finalizers", &inner.finalizers.len())
            .finish()
    }
}

/// The settlement capabilities handed to the closure passed to
/// [`Deferred::new`].
pub struct Resolver<T> {
    deferred: Deferred<T>,
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            deferred: self.deferred.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("deferred", &self.deferred)
            .finish()
    }
}

impl<T: Clone + 'static> Resolver<T> {
    /// See [`Deferred::resolve`].
    pub fn resolve(&self, value: T) {
        self.deferred.resolve(value)
    }

    /// See [`Deferred::adopt`].
    pub fn adopt(&self, awaitable: impl Awaitable<T> + 'static) {
        self.deferred.adopt(awaitable)
    }

    /// See [`Deferred::settle`].
    pub fn settle(&self, resolution: Resolution<T>) {
        self.deferred.settle(resolution)
    }

    /// See [`Deferred::reject`].
    pub fn reject(&self, reason: Error) {
        self.deferred.reject(reason)
    }
}

impl<T: Clone + 'static> Deferred<T> {
    /// Create a deferred value and hand its settlement capabilities to
    /// `resolver`, which runs synchronously.
    ///
    /// A panic inside `resolver` is not turned into a rejection; it unwinds
    /// into the caller. Use [`Deferred::try_new`] for a fallible resolver.
    pub fn new(resolver: impl FnOnce(Resolver<T>)) -> Self {
        let deferred = Self::pending();
        resolver(Resolver {
            deferred: deferred.clone(),
        });
        deferred
    }

    /// Like [`Deferred::new`], but a resolver error is returned to the caller
    /// as [`Error::Settlement`] instead of a deferred value.
    pub fn try_new<E>(resolver: impl FnOnce(Resolver<T>) -> Result<(), E>) -> crate::Result<Self>
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let deferred = Self::pending();
        resolver(Resolver {
            deferred: deferred.clone(),
        })
        .map_err(Error::settlement)?;
        Ok(deferred)
    }

    /// Create a deferred value that is settled by calling [`Deferred::resolve`]
    /// or [`Deferred::reject`] on it later.
    pub fn pending() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                outcome: None,
                adopting: false,
                continuations: Vec::new(),
                finalizers: Vec::new(),
                wakers: Vec::new(),
            })),
        }
    }

    /// Create an already-fulfilled deferred value.
    pub fn resolved(value: T) -> Self {
        let deferred = Self::pending();
        deferred.resolve(value);
        deferred
    }

    /// Create an already-rejected deferred value.
    pub fn rejected(reason: Error) -> Self {
        let deferred = Self::pending();
        deferred.reject(reason);
        deferred
    }

    /// Normalize a plain value or awaitable into a deferred value.
    ///
    /// A [`Deferred`] is returned as-is (same identity); any other awaitable
    /// is adopted by a fresh deferred value.
    pub fn from_resolution(resolution: Resolution<T>) -> Self {
        match resolution {
            Resolution::Value(value) => Self::resolved(value),
            Resolution::Awaitable(awaitable) => match awaitable.as_deferred() {
                Some(deferred) => deferred.clone(),
                None => {
                    let deferred = Self::pending();
                    deferred.adopt_boxed(awaitable);
                    deferred
                }
            },
        }
    }

    /// The current settlement state.
    pub fn state(&self) -> State {
        match &self.inner.borrow().outcome {
            None => State::Pending,
            Some(Ok(_)) => State::Fulfilled,
            Some(Err(_)) => State::Rejected,
        }
    }

    /// Whether the value has not settled yet.
    pub fn is_pending(&self) -> bool {
        self.inner.borrow().outcome.is_none()
    }

    /// The fulfillment value, if fulfilled.
    pub fn value(&self) -> Option<T> {
        match &self.inner.borrow().outcome {
            Some(Ok(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// The rejection reason, if rejected.
    pub fn reason(&self) -> Option<Error> {
        match &self.inner.borrow().outcome {
            Some(Err(reason)) => Some(reason.clone()),
            _ => None,
        }
    }

    /// The settled outcome, if settled.
    pub fn outcome(&self) -> Option<Result<T, Error>> {
        self.inner.borrow().outcome.clone()
    }

    /// Whether two handles refer to the same deferred value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Fulfill with `value`.
    ///
    /// Does nothing if already settled or already adopting an awaitable.
    pub fn resolve(&self, value: T) {
        if self.accepts_settlement() {
            self.settle_with(Ok(value));
        }
    }

    /// Reject with `reason`. No adoption takes place.
    ///
    /// Does nothing if already settled or already adopting an awaitable.
    pub fn reject(&self, reason: Error) {
        if self.accepts_settlement() {
            self.settle_with(Err(reason));
        }
    }

    /// Mirror the eventual outcome of `awaitable`.
    ///
    /// Adopting `self` rejects with [`Error::Cycle`]. Does nothing if already
    /// settled or already adopting.
    pub fn adopt(&self, awaitable: impl Awaitable<T> + 'static) {
        self.adopt_boxed(Box::new(awaitable))
    }

    /// Resolve with a plain value or adopt an awaitable.
    pub fn settle(&self, resolution: Resolution<T>) {
        continuation::forward(self, resolution)
    }

    pub(crate) fn adopt_boxed(&self, awaitable: Box<dyn Awaitable<T>>) {
        if !self.accepts_settlement() {
            return;
        }
        if awaitable.as_deferred().is_some_and(|source| source.ptr_eq(self)) {
            self.settle_with(Err(Error::Cycle));
            return;
        }
        self.inner.borrow_mut().adopting = true;
        tracing::trace!("adopting awaitable");

        let on_fulfilled = self.clone();
        let on_rejected = self.clone();
        awaitable.subscribe(
            Box::new(move |value| on_fulfilled.settle_with(Ok(value))),
            Box::new(move |reason| on_rejected.settle_with(Err(reason))),
        );
    }

    fn accepts_settlement(&self) -> bool {
        let inner = self.inner.borrow();
        inner.outcome.is_none() && !inner.adopting
    }

    /// The single settlement event: store the outcome, then drain both queues
    /// into delivery jobs.
    fn settle_with(&self, outcome: Result<T, Error>) {
        let (continuations, finalizers, wakers) = {
            let mut inner = self.inner.borrow_mut();
            if inner.outcome.is_some() {
                return;
            }
            inner.outcome = Some(outcome.clone());
            (
                mem::take(&mut inner.continuations),
                mem::take(&mut inner.finalizers),
                mem::take(&mut inner.wakers),
            )
        };
        tracing::trace!(
            fulfilled = outcome.is_ok(),
            continuations = continuations.len(),
            finalizers = finalizers.len(),
            "settled"
        );

        for waker in wakers {
            waker.wake();
        }

        let reactor = Reactor::current();
        if !continuations.is_empty() {
            let outcome = outcome.clone();
            reactor.schedule(move || {
                for continuation in continuations {
                    continuation.deliver(outcome.clone());
                }
            });
        }
        if !finalizers.is_empty() {
            reactor.schedule(move || {
                for finalizer in finalizers {
                    finalizer.run(outcome.clone());
                }
            });
        }
    }

    /// Queue a continuation, or schedule its delivery right away if already
    /// settled.
    fn push_continuation(&self, record: Box<dyn Deliver<T>>) {
        let outcome = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            match &inner.outcome {
                Some(outcome) => outcome.clone(),
                None => {
                    inner.continuations.push(record);
                    return;
                }
            }
        };
        Reactor::current().schedule(move || record.deliver(outcome));
    }

    fn chain<U>(&self, on_fulfilled: Handler<T, U>, on_rejected: Option<Handler<Error, U>>) -> Deferred<U>
    where
        U: Clone + 'static,
    {
        let result = Deferred::pending();
        self.push_continuation(Box::new(Continuation {
            result: result.clone(),
            on_fulfilled,
            on_rejected,
        }));
        result
    }

    /// Run callbacks on settlement without creating a downstream value.
    pub(crate) fn watch(&self, on_fulfilled: impl FnOnce(T) + 'static, on_rejected: impl FnOnce(Error) + 'static) {
        self.push_continuation(Box::new(Subscriber {
            on_fulfilled: Box::new(on_fulfilled),
            on_rejected: Box::new(on_rejected),
        }));
    }

    /// Transform the value once fulfilled. Rejections pass through unchanged.
    ///
    /// An `Err` returned by `on_fulfilled`, or a panic inside it, rejects the
    /// returned value.
    pub fn then<U, F>(&self, on_fulfilled: F) -> Deferred<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<U, Error> + 'static,
    {
        self.chain(
            Box::new(move |value| on_fulfilled(value).map(Resolution::Value)),
            None,
        )
    }

    /// Continue with another awaitable once fulfilled; the returned value
    /// adopts its outcome.
    pub fn and_then<U, A, F>(&self, on_fulfilled: F) -> Deferred<U>
    where
        U: Clone + 'static,
        A: Awaitable<U> + 'static,
        F: FnOnce(T) -> A + 'static,
    {
        self.chain(
            Box::new(move |value| Ok(Resolution::awaitable(on_fulfilled(value)))),
            None,
        )
    }

    /// Handle both outcomes.
    pub fn then_else<U, F, G>(&self, on_fulfilled: F, on_rejected: G) -> Deferred<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<U, Error> + 'static,
        G: FnOnce(Error) -> Result<U, Error> + 'static,
    {
        self.chain(
            Box::new(move |value| on_fulfilled(value).map(Resolution::Value)),
            Some(Box::new(move |reason| {
                on_rejected(reason).map(Resolution::Value)
            })),
        )
    }

    /// Handle every [`Resolution`] shape directly. `on_rejected: None` lets
    /// rejections pass through.
    pub fn then_resolve<U, F, G>(&self, on_fulfilled: F, on_rejected: Option<G>) -> Deferred<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<Resolution<U>, Error> + 'static,
        G: FnOnce(Error) -> Result<Resolution<U>, Error> + 'static,
    {
        self.chain(
            Box::new(on_fulfilled),
            on_rejected.map(|g| Box::new(g) as Handler<Error, U>),
        )
    }

    /// Recover from a rejection. Values pass through unchanged.
    pub fn catch<G>(&self, on_rejected: G) -> Deferred<T>
    where
        G: FnOnce(Error) -> Result<T, Error> + 'static,
    {
        self.chain(
            Box::new(|value| Ok(Resolution::Value(value))),
            Some(Box::new(move |reason| {
                on_rejected(reason).map(Resolution::Value)
            })),
        )
    }

    /// Recover from a rejection with another awaitable.
    pub fn or_else<A, G>(&self, on_rejected: G) -> Deferred<T>
    where
        A: Awaitable<T> + 'static,
        G: FnOnce(Error) -> A + 'static,
    {
        self.chain(
            Box::new(|value| Ok(Resolution::Value(value))),
            Some(Box::new(move |reason| {
                Ok(Resolution::awaitable(on_rejected(reason)))
            })),
        )
    }

    /// Run `on_settled` on either outcome, then pass the original outcome
    /// through. If `on_settled` fails, the returned value rejects with that
    /// failure instead.
    pub fn finally<F>(&self, on_settled: F) -> Deferred<T>
    where
        F: FnOnce() -> Result<(), Error> + 'static,
    {
        let result = Deferred::pending();
        let finalizer = Finalizer {
            result: result.clone(),
            on_settled: Box::new(on_settled),
        };
        let outcome = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            match &inner.outcome {
                Some(outcome) => outcome.clone(),
                None => {
                    inner.finalizers.push(finalizer);
                    return result;
                }
            }
        };
        Reactor::current().schedule(move || finalizer.run(outcome));
        result
    }
}

impl<T: Clone + 'static> Awaitable<T> for Deferred<T> {
    fn subscribe(self: Box<Self>, on_fulfilled: Box<dyn FnOnce(T)>, on_rejected: Box<dyn FnOnce(Error)>) {
        self.push_continuation(Box::new(Subscriber {
            on_fulfilled,
            on_rejected,
        }));
    }

    fn as_deferred(&self) -> Option<&Deferred<T>> {
        Some(self)
    }
}
