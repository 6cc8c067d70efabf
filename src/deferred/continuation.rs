//! Continuation and finalizer records, and how they are delivered.

use std::panic::{catch_unwind, AssertUnwindSafe};

use super::{Deferred, Resolution};
use crate::Error;

/// A handler that runs once a source settles and decides how the downstream
/// value is resolved.
pub(crate) type Handler<A, U> = Box<dyn FnOnce(A) -> Result<Resolution<U>, Error>>;

/// A one-shot subscription queued on a `Deferred<T>`.
pub(crate) trait Deliver<T> {
    fn deliver(self: Box<Self>, outcome: Result<T, Error>);
}

/// The record appended by `then` and friends: the downstream value to settle
/// and the handlers to run first.
pub(crate) struct Continuation<T, U> {
    pub(crate) result: Deferred<U>,
    pub(crate) on_fulfilled: Handler<T, U>,
    pub(crate) on_rejected: Option<Handler<Error, U>>,
}

impl<T, U> Deliver<T> for Continuation<T, U>
where
    T: Clone + 'static,
    U: Clone + 'static,
{
    fn deliver(self: Box<Self>, outcome: Result<T, Error>) {
        let Self {
            result,
            on_fulfilled,
            on_rejected,
        } = *self;
        match outcome {
            Ok(value) => run_handler(&result, on_fulfilled, value),
            Err(reason) => match on_rejected {
                Some(on_rejected) => run_handler(&result, on_rejected, reason),
                None => result.reject(reason),
            },
        }
    }
}

/// Run `handler` and forward whatever it produces into `result`.
fn run_handler<A, U>(result: &Deferred<U>, handler: Handler<A, U>, arg: A)
where
    U: Clone + 'static,
{
    match catch_unwind(AssertUnwindSafe(move || handler(arg))) {
        Ok(Ok(resolution)) => forward(result, resolution),
        Ok(Err(reason)) => result.reject(reason),
        Err(payload) => {
            let err = Error::from_panic(payload);
            tracing::trace!(%err, "handler panicked");
            result.reject(err)
        }
    }
}

/// Resolution forwarding: plain values fulfill `result`, awaitables are
/// adopted. Adopting `result` itself rejects it with [`Error::Cycle`].
pub(crate) fn forward<U>(result: &Deferred<U>, resolution: Resolution<U>)
where
    U: Clone + 'static,
{
    match resolution {
        Resolution::Value(value) => result.resolve(value),
        Resolution::Awaitable(awaitable) => result.adopt_boxed(awaitable),
    }
}

/// A bare callback pair, used for adoption and by combinators and the
/// coroutine driver. There is no downstream value to reject, so a panicking
/// callback is logged and swallowed.
pub(crate) struct Subscriber<T> {
    pub(crate) on_fulfilled: Box<dyn FnOnce(T)>,
    pub(crate) on_rejected: Box<dyn FnOnce(Error)>,
}

impl<T> Deliver<T> for Subscriber<T> {
    fn deliver(self: Box<Self>, outcome: Result<T, Error>) {
        let Self {
            on_fulfilled,
            on_rejected,
        } = *self;
        let ran = catch_unwind(AssertUnwindSafe(move || match outcome {
            Ok(value) => on_fulfilled(value),
            Err(reason) => on_rejected(reason),
        }));
        if let Err(payload) = ran {
            tracing::error!(err = %Error::from_panic(payload), "subscriber panicked");
        }
    }
}

/// The record appended by `finally`.
pub(crate) struct Finalizer<T> {
    pub(crate) result: Deferred<T>,
    pub(crate) on_settled: Box<dyn FnOnce() -> Result<(), Error>>,
}

impl<T> Finalizer<T>
where
    T: Clone + 'static,
{
    /// Run the callback, then pass `outcome` through unless the callback
    /// failed.
    pub(crate) fn run(self, outcome: Result<T, Error>) {
        let Self { result, on_settled } = self;
        match catch_unwind(AssertUnwindSafe(on_settled)) {
            Ok(Ok(())) => match outcome {
                Ok(value) => result.resolve(value),
                Err(reason) => result.reject(reason),
            },
            Ok(Err(reason)) => result.reject(reason),
            Err(payload) => result.reject(Error::from_panic(payload)),
        }
    }
}
