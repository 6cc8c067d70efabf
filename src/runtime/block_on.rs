use super::Reactor;

use core::future::Future;
use core::pin::pin;
use core::task::Waker;
use core::task::{Context, Poll};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::Wake;

/// Start the event loop and drive `fut` to completion.
///
/// Between polls of `fut` the current thread's [`Reactor`] runs queued jobs,
/// spawned tasks and timers.
///
/// # Panic
/// Panics when called inside another `block_on`, or when `fut` is pending while
/// the reactor has no work left that could ever wake it.
pub fn block_on<Fut>(fut: Fut) -> Fut::Output
where
    Fut: Future,
{
    let reactor = Reactor::current();
    let _guard = reactor.enter();

    // Pin the future so it can be polled
    let mut fut = pin!(fut);

    // Create a new context to be passed to the future.
    let waker_impl = Arc::new(ReactorWaker::new());
    let waker = Waker::from(Arc::clone(&waker_impl));
    let mut cx = Context::from_waker(&waker);

    // Either the future completes and we return, or we turn the reactor until
    // something wakes it again.
    loop {
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(res) => break res,
            Poll::Pending => {
                while !waker_impl.awake() {
                    if reactor.turn() {
                        continue;
                    }
                    if !reactor.block_until_next_timer() {
                        panic!("block_on future can never complete: the reactor ran out of work");
                    }
                }
                waker_impl.set_awake(false);
            }
        }
    }
}

struct ReactorWaker {
    awake: AtomicBool,
}

impl ReactorWaker {
    fn new() -> Self {
        Self {
            awake: AtomicBool::new(false),
        }
    }

    #[inline]
    fn set_awake(&self, awake: bool) {
        self.awake.store(awake, Ordering::Relaxed);
    }

    #[inline]
    fn awake(&self) -> bool {
        self.awake.load(Ordering::Relaxed)
    }
}

impl Wake for ReactorWaker {
    fn wake(self: Arc<Self>) {
        self.set_awake(true);
    }
}
