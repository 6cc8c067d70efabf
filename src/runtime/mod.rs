//! Event loop support.
//!
//! Every thread owns one [`Reactor`]. Settling a [`Deferred`](crate::Deferred)
//! schedules its handlers as jobs on that reactor, and the jobs only run when
//! something drives it:
//!
//! - [`block_on`] drives a future to completion, turning the reactor whenever
//!   the future is pending;
//! - [`run`] turns the reactor until no jobs, tasks or timers remain;
//! - [`run_until_stalled`] runs what is ready now, without waiting on timers.

#![deny(missing_debug_implementations, nonstandard_style)]
#![warn(missing_docs, unreachable_pub)]

mod block_on;
mod reactor;
mod spawn;

pub use block_on::block_on;
pub use reactor::Reactor;
pub use spawn::spawn;

/// Turn the current thread's reactor until no jobs, woken tasks or timers
/// remain.
pub fn run() {
    Reactor::current().run()
}

/// Run the jobs and woken tasks that are ready on the current thread's
/// reactor. Timers that are not yet due stay pending.
pub fn run_until_stalled() {
    Reactor::current().run_until_stalled()
}
