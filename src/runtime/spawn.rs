use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use std::panic::{catch_unwind, AssertUnwindSafe};

use futures_core::ready;
use pin_project_lite::pin_project;

use super::Reactor;
use crate::{Deferred, Error};

/// Drive `future` on the current thread's reactor and expose its outcome as a
/// [`Deferred`].
///
/// The future is first polled on the next reactor turn, so nothing in it runs
/// before `spawn` returns. A panic inside the future rejects the returned
/// value with [`Error::Propagation`].
///
/// ```
/// use deferred::{runtime, Deferred};
///
/// let doubled = runtime::spawn(async {
///     let n = Deferred::resolved(21).await?;
///     Ok::<_, deferred::Error>(n * 2)
/// });
/// runtime::run();
/// assert_eq!(doubled.value(), Some(42));
/// ```
pub fn spawn<T, F>(future: F) -> Deferred<T>
where
    T: Clone + 'static,
    F: Future<Output = Result<T, Error>> + 'static,
{
    let result = Deferred::pending();
    Reactor::current().spawn(Box::pin(Settle {
        future,
        result: result.clone(),
    }));
    result
}

pin_project! {
    /// Polls the inner future and settles `result` with its output.
    #[must_use = "futures do nothing unless polled or .awaited"]
    struct Settle<F, T> {
        #[pin]
        future: F,
        result: Deferred<T>,
    }
}

impl<F, T> Future for Settle<F, T>
where
    T: Clone + 'static,
    F: Future<Output = Result<T, Error>>,
{
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let future = this.future;
        let polled = catch_unwind(AssertUnwindSafe(|| future.poll(cx)));
        let outcome = match polled {
            Ok(poll) => ready!(poll),
            Err(payload) => Err(Error::from_panic(payload)),
        };
        match outcome {
            Ok(value) => this.result.resolve(value),
            Err(reason) => this.result.reject(reason),
        }
        Poll::Ready(())
    }
}
