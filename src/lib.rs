#![warn(future_incompatible, unreachable_pub)]
#![deny(missing_debug_implementations)]
//#![warn(missing_docs)]

//! Deferred values, combinators and a coroutine driver for single-threaded
//! programs.
//!
//! A [`Deferred`] is a value that is not known yet. It settles exactly once,
//! fulfilled with a value or rejected with an [`Error`], and anything chained
//! onto it runs later on the current thread's [`Reactor`](runtime::Reactor),
//! never inside the call that attached or settled it.
//!
//! # Examples
//!
//! **Chaining**
//!
//! ```rust
//! use deferred::{runtime, Deferred, Error};
//!
//! let total = Deferred::resolved(20)
//!     .then(|n| Ok(n + 1))
//!     .then(|n| if n > 20 { Err(Error::reason("too big")) } else { Ok(n) })
//!     .catch(|_| Ok(0))
//!     .finally(|| Ok(()));
//!
//! runtime::run();
//! assert_eq!(total.value(), Some(0));
//! ```
//!
//! **Awaiting**
//!
//! ```rust
//! use deferred::{all, time, Resolution};
//! use std::time::Duration;
//!
//! #[deferred::main]
//! async fn main() -> deferred::Result<()> {
//!     let values = all(vec![
//!         Resolution::Value(1),
//!         time::after(Duration::from_millis(5), 2).into(),
//!     ])
//!     .await?;
//!     assert_eq!(values, vec![1, 2]);
//!     Ok(())
//! }
//! ```
//!
//! # Design Decisions
//!
//! This library is single-threaded by construction. A `Deferred` is an `Rc`
//! handle and every thread has its own reactor, so no handle, job or timer
//! ever crosses a thread boundary and no locking is involved.
//!
//! Settlement callbacks always go through the reactor's job queue. This makes
//! ordering predictable: code that attaches a handler always finishes its
//! current synchronous block before the handler runs. Jobs run in the order
//! they were scheduled, and every ready job runs before any timer fires.
//!
//! External effects are kept behind small traits: [`io::IoService`] for reads,
//! [`time::TimeService`] for delays and [`diagnostics::Diagnostics`] for
//! reporting. The default implementations use the local file system, the
//! reactor's timers and `tracing`.

pub mod combinator;
pub mod coroutine;
mod deferred;
pub mod diagnostics;
mod error;
pub mod io;
pub mod runtime;
pub mod time;

pub use combinator::{all, all_settled, any, race, Settlement};
pub use deferred::{Awaitable, Deferred, Resolution, Resolver, State};
pub use error::{AggregateRejection, Error, Result};

pub use deferred_macro::attr_macro_main as main;
pub use deferred_macro::attr_macro_test as test;

pub mod prelude {
    pub use crate::coroutine::Computation as _;
    pub use crate::diagnostics::Diagnostics as _;
    pub use crate::io::IoService as _;
    pub use crate::time::TimeService as _;
    pub use crate::Awaitable as _;
}
