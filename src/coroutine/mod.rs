//! Drive suspendable computations with deferred values.
//!
//! A [`Computation`] is an explicit state machine: each call to one of its
//! step methods runs until it either finishes ([`Step::Done`]) or needs a
//! value it does not have yet ([`Step::Suspend`]). The driver awaits the
//! requested value and resumes the computation with it, or, if it rejects,
//! hands the reason to [`Computation::resume_with_failure`] so the computation
//! can recover as if a local operation had failed.
//!
//! ```
//! use deferred::coroutine::{self, Computation, Step};
//! use deferred::{runtime, Deferred, Resolution};
//!
//! /// Adds up two awaited numbers.
//! struct Sum {
//!     total: u32,
//!     seen: u8,
//! }
//!
//! impl Computation for Sum {
//!     type Awaited = u32;
//!     type Output = u32;
//!
//!     fn start(&mut self) -> Step<u32, u32> {
//!         Step::Suspend(Deferred::resolved(1).into())
//!     }
//!
//!     fn resume(&mut self, value: u32) -> Step<u32, u32> {
//!         self.total += value;
//!         self.seen += 1;
//!         match self.seen {
//!             1 => Step::Suspend(Resolution::Value(2)),
//!             _ => Step::Done(Ok(self.total)),
//!         }
//!     }
//! }
//!
//! let sum = coroutine::run(Sum { total: 0, seen: 0 });
//! runtime::run();
//! assert_eq!(sum.value(), Some(3));
//! ```

mod driver;

pub use driver::{run, run_with, start, DriverState, Handle};

use crate::{Error, Resolution};

/// What a computation did when it was last stepped.
#[derive(Debug)]
pub enum Step<Y, R> {
    /// Pause until the given value is available.
    Suspend(Resolution<Y>),
    /// Finished, successfully or with an unrecovered failure.
    Done(Result<R, Error>),
}

/// A computation that can pause at arbitrary points and be resumed later.
pub trait Computation: 'static {
    /// The type of value awaited at each suspension point.
    type Awaited: Clone + 'static;
    /// The final result.
    type Output: Clone + 'static;

    /// Run from the beginning to the first suspension point or to completion.
    fn start(&mut self) -> Step<Self::Awaited, Self::Output>;

    /// Continue after the awaited value fulfilled.
    fn resume(&mut self, value: Self::Awaited) -> Step<Self::Awaited, Self::Output>;

    /// Continue after the awaited value rejected, as if the operation at the
    /// suspension point had failed.
    ///
    /// The default does not recover: the computation finishes with `reason`.
    fn resume_with_failure(&mut self, reason: Error) -> Step<Self::Awaited, Self::Output> {
        Step::Done(Err(reason))
    }
}
