use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use super::Deferred;
use crate::Error;

/// Awaiting a deferred value yields its outcome: `Ok(value)` once fulfilled,
/// `Err(reason)` once rejected.
impl<T: Clone + 'static> Future for Deferred<T> {
    type Output = Result<T, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        match &inner.outcome {
            Some(outcome) => Poll::Ready(outcome.clone()),
            None => {
                if !inner.wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    inner.wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::block_on;

    #[test]
    fn await_fulfilled() {
        let d = Deferred::pending();
        let source = d.clone();
        let out = block_on(async move {
            crate::runtime::Reactor::current().schedule(move || source.resolve("done"));
            d.await
        });
        assert_eq!(out, Ok("done"));
    }

    #[test]
    fn await_rejected() {
        let d = Deferred::<()>::rejected(Error::reason("nope"));
        assert_eq!(block_on(d), Err(Error::reason("nope")));
    }
}
