use std::cell::RefCell;
use std::rc::Rc;

use super::normalize;
use crate::{Deferred, Resolution};

/// Wait for every entry to fulfill.
///
/// Fulfills with the values in input order, regardless of the order in which
/// the entries settle. Rejects with the first rejection. Empty input fulfills
/// with an empty list.
///
/// ```
/// use deferred::{all, runtime, Deferred, Resolution};
///
/// let later = Deferred::pending();
/// let values = all(vec![Resolution::Value(1), later.clone().into(), Resolution::Value(3)]);
/// later.resolve(2);
///
/// runtime::run();
/// assert_eq!(values.value(), Some(vec![1, 2, 3]));
/// ```
pub fn all<T, I>(entries: I) -> Deferred<Vec<T>>
where
    T: Clone + 'static,
    I: IntoIterator<Item = Resolution<T>>,
{
    let result = Deferred::pending();
    let entries = match normalize(entries) {
        Ok(entries) => entries,
        Err(err) => {
            result.reject(err);
            return result;
        }
    };
    if entries.is_empty() {
        result.resolve(Vec::new());
        return result;
    }

    let slots = Rc::new(RefCell::new(Slots {
        values: vec![None; entries.len()],
        remaining: entries.len(),
    }));
    for (index, entry) in entries.into_iter().enumerate() {
        let slots = slots.clone();
        let on_fulfilled = result.clone();
        let on_rejected = result.clone();
        entry.watch(
            move |value| {
                let values = slots.borrow_mut().fill(index, value);
                if let Some(values) = values {
                    on_fulfilled.resolve(values);
                }
            },
            move |reason| on_rejected.reject(reason),
        );
    }
    result
}

struct Slots<T> {
    values: Vec<Option<T>>,
    remaining: usize,
}

impl<T> Slots<T> {
    /// Store one value; once every slot is filled, hand back the full list.
    fn fill(&mut self, index: usize, value: T) -> Option<Vec<T>> {
        self.values[index] = Some(value);
        self.remaining -= 1;
        if self.remaining > 0 {
            return None;
        }
        self.values.iter_mut().map(Option::take).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{runtime, Error};

    #[test]
    fn keeps_input_order() {
        let (a, b) = (Deferred::pending(), Deferred::pending());
        let out = all(vec![a.clone().into(), b.clone().into()]);
        b.resolve("b");
        runtime::run_until_stalled();
        assert!(out.is_pending());
        a.resolve("a");
        runtime::run_until_stalled();
        assert_eq!(out.value(), Some(vec!["a", "b"]));
    }

    #[test]
    fn first_rejection_wins_and_later_ones_are_ignored() {
        let (a, b) = (Deferred::<u8>::pending(), Deferred::pending());
        let out = all(vec![a.clone().into(), b.clone().into()]);
        b.reject(Error::reason("b"));
        runtime::run_until_stalled();
        a.reject(Error::reason("a"));
        runtime::run_until_stalled();
        assert_eq!(out.reason(), Some(Error::reason("b")));
    }

    #[test]
    fn empty_input_is_fulfilled_immediately() {
        let out = all(Vec::<Resolution<u8>>::new());
        assert_eq!(out.value(), Some(vec![]));
    }
}
