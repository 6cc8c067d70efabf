//! Combinators over many deferred values.
//!
//! Every combinator takes an ordered sequence of [`Resolution`] entries: plain
//! values are treated as already-fulfilled deferred values, awaitables are
//! normalized with [`Deferred::from_resolution`]. Branches are never cancelled;
//! once the aggregate has settled, later branch outcomes are ignored.
//!
//! | Combinator       | Fulfills with                        | Rejects with              |
//! |------------------|--------------------------------------|---------------------------|
//! | [`all`]          | every value, in input order          | the first rejection       |
//! | [`all_settled`]  | every [`Settlement`], in input order | never                     |
//! | [`race`]         | the first value                      | the first rejection       |
//! | [`any`]          | the first value                      | an aggregate of all reasons |
//!
//! A panic while iterating the input rejects the aggregate with
//! [`Error::Propagation`].

mod all;
mod all_settled;
mod any;
mod race;

pub use all::all;
pub use all_settled::{all_settled, Settlement};
pub use any::any;
pub use race::race;

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::{Deferred, Error, Resolution};

/// Collect and normalize the input entries, turning a panic raised by the
/// iterator into an error.
fn normalize<T, I>(entries: I) -> Result<Vec<Deferred<T>>, Error>
where
    T: Clone + 'static,
    I: IntoIterator<Item = Resolution<T>>,
{
    catch_unwind(AssertUnwindSafe(move || {
        entries
            .into_iter()
            .map(Deferred::from_resolution)
            .collect::<Vec<_>>()
    }))
    .map_err(Error::from_panic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_keeps_identity_and_wraps_values() {
        let d = Deferred::pending();
        let entries = normalize(vec![Resolution::Value(1), d.clone().into()]).unwrap();
        assert_eq!(entries[0].value(), Some(1));
        assert!(entries[1].ptr_eq(&d));
    }

    #[test]
    fn normalize_catches_iterator_panics() {
        let entries = (0..3).map(|i| {
            if i == 2 {
                panic!("iterator broke");
            }
            Resolution::Value(i)
        });
        let err = normalize(entries).unwrap_err();
        assert_eq!(err, Error::Propagation("iterator broke".into()));
    }
}
