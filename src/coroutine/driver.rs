use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use super::{Computation, Step};
use crate::{Deferred, Error};

/// Where a driven computation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// A step is executing.
    Running,
    /// Waiting for one deferred value to settle.
    Suspended,
    /// Done; the computation will never be resumed again.
    Finished,
}

/// A running computation: its eventual result and its current state.
#[derive(Debug, Clone)]
pub struct Handle<R> {
    result: Deferred<R>,
    state: Rc<Cell<DriverState>>,
}

impl<R: Clone + 'static> Handle<R> {
    /// The deferred value that settles with the computation's result.
    pub fn result(&self) -> Deferred<R> {
        self.result.clone()
    }

    /// The driver's current state.
    pub fn state(&self) -> DriverState {
        self.state.get()
    }
}

struct Driver<C: Computation> {
    computation: C,
    state: Rc<Cell<DriverState>>,
    result: Deferred<C::Output>,
}

enum Input<Y> {
    Start,
    Value(Y),
    Failure(Error),
}

/// Drive `computation` to completion.
///
/// The first step runs synchronously, before `start` returns; every later
/// step runs on the reactor once the awaited value has settled.
pub fn start<C: Computation>(computation: C) -> Handle<C::Output> {
    let state = Rc::new(Cell::new(DriverState::Running));
    let result = Deferred::pending();
    let driver = Rc::new(RefCell::new(Driver {
        computation,
        state: state.clone(),
        result: result.clone(),
    }));
    advance(driver, Input::Start);
    Handle { result, state }
}

/// Drive `computation` to completion and return its eventual result.
pub fn run<C: Computation>(computation: C) -> Deferred<C::Output> {
    start(computation).result
}

/// Build a computation from `routine` and `args`, then [`run`] it.
pub fn run_with<C, A, F>(routine: F, args: A) -> Deferred<C::Output>
where
    C: Computation,
    F: FnOnce(A) -> C,
{
    run(routine(args))
}

fn advance<C: Computation>(driver: Rc<RefCell<Driver<C>>>, input: Input<C::Awaited>) {
    let step = {
        let mut guard = driver.borrow_mut();
        if guard.state.get() == DriverState::Finished {
            tracing::trace!("ignoring resumption of a finished computation");
            return;
        }
        guard.state.set(DriverState::Running);
        let computation = &mut guard.computation;
        catch_unwind(AssertUnwindSafe(move || match input {
            Input::Start => computation.start(),
            Input::Value(value) => computation.resume(value),
            Input::Failure(reason) => computation.resume_with_failure(reason),
        }))
        .unwrap_or_else(|payload| Step::Done(Err(Error::from_panic(payload))))
    };

    match step {
        Step::Done(outcome) => {
            let driver = driver.borrow();
            driver.state.set(DriverState::Finished);
            tracing::trace!(fulfilled = outcome.is_ok(), "computation finished");
            match outcome {
                Ok(value) => driver.result.resolve(value),
                Err(reason) => driver.result.reject(reason),
            }
        }
        Step::Suspend(awaited) => {
            driver.borrow().state.set(DriverState::Suspended);
            tracing::trace!("computation suspended");
            let awaited = Deferred::from_resolution(awaited);
            let on_fulfilled = driver.clone();
            awaited.watch(
                move |value| advance(on_fulfilled, Input::Value(value)),
                move |reason| advance(driver, Input::Failure(reason)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{runtime, Resolution};

    /// Awaits each queued value in turn and returns how many it saw.
    struct Counter {
        queue: Vec<Resolution<u8>>,
        seen: usize,
    }

    impl Computation for Counter {
        type Awaited = u8;
        type Output = usize;

        fn start(&mut self) -> Step<u8, usize> {
            self.next()
        }

        fn resume(&mut self, _: u8) -> Step<u8, usize> {
            self.seen += 1;
            self.next()
        }
    }

    impl Counter {
        fn next(&mut self) -> Step<u8, usize> {
            if self.queue.is_empty() {
                return Step::Done(Ok(self.seen));
            }
            Step::Suspend(self.queue.remove(0))
        }
    }

    #[test]
    fn walks_through_states() {
        let gate = Deferred::pending();
        let handle = start(Counter {
            queue: vec![Resolution::Value(1), gate.clone().into()],
            seen: 0,
        });
        assert_eq!(handle.state(), DriverState::Suspended);

        runtime::run_until_stalled();
        assert_eq!(handle.state(), DriverState::Suspended);
        assert!(handle.result().is_pending());

        gate.resolve(2);
        runtime::run_until_stalled();
        assert_eq!(handle.state(), DriverState::Finished);
        assert_eq!(handle.result().value(), Some(2));
    }

    #[test]
    fn finishing_synchronously_still_settles() {
        let handle = start(Counter {
            queue: Vec::new(),
            seen: 0,
        });
        assert_eq!(handle.state(), DriverState::Finished);
        assert_eq!(handle.result().value(), Some(0));
    }

    #[test]
    fn unrecovered_failure_rejects_the_result() {
        let result = run_with(
            |reason: &'static str| Counter {
                queue: vec![Deferred::rejected(Error::reason(reason)).into()],
                seen: 0,
            },
            "broken",
        );
        runtime::run_until_stalled();
        assert_eq!(result.reason(), Some(Error::reason("broken")));
    }

    #[test]
    fn panicking_step_rejects_the_result() {
        struct Explodes;
        impl Computation for Explodes {
            type Awaited = ();
            type Output = ();

            fn start(&mut self) -> Step<(), ()> {
                Step::Suspend(Resolution::Value(()))
            }

            fn resume(&mut self, _: ()) -> Step<(), ()> {
                panic!("step exploded")
            }
        }

        let handle = start(Explodes);
        runtime::run_until_stalled();
        assert_eq!(handle.state(), DriverState::Finished);
        assert_eq!(
            handle.result().reason(),
            Some(Error::Propagation("step exploded".into()))
        );
    }
}
