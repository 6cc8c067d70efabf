use std::cell::RefCell;
use std::rc::Rc;

use super::normalize;
use crate::{Deferred, Error, Resolution, State};

/// The outcome of one entry passed to [`all_settled`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(tag = "status", rename_all = "lowercase"))]
pub enum Settlement<T> {
    /// The entry fulfilled with `value`.
    Fulfilled {
        /// The fulfillment value.
        value: T,
    },
    /// The entry rejected with `reason`.
    Rejected {
        /// The rejection reason.
        reason: Error,
    },
}

impl<T> Settlement<T> {
    /// Either [`State::Fulfilled`] or [`State::Rejected`].
    pub fn status(&self) -> State {
        match self {
            Self::Fulfilled { .. } => State::Fulfilled,
            Self::Rejected { .. } => State::Rejected,
        }
    }
}

impl<T> From<Result<T, Error>> for Settlement<T> {
    fn from(outcome: Result<T, Error>) -> Self {
        match outcome {
            Ok(value) => Self::Fulfilled { value },
            Err(reason) => Self::Rejected { reason },
        }
    }
}

/// Wait for every entry to settle, whatever the outcome.
///
/// Always fulfills, with one [`Settlement`] per entry in input order. It only
/// rejects if iterating the input panics.
pub fn all_settled<T, I>(entries: I) -> Deferred<Vec<Settlement<T>>>
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

    let records = Rc::new(RefCell::new(Records {
        settled: vec![None; entries.len()],
        remaining: entries.len(),
    }));
    for (index, entry) in entries.into_iter().enumerate() {
        let (fulfilled, rejected) = (records.clone(), records.clone());
        let (on_fulfilled, on_rejected) = (result.clone(), result.clone());
        entry.watch(
            move |value| {
                let settled = fulfilled.borrow_mut().record(index, Ok(value));
                if let Some(settled) = settled {
                    on_fulfilled.resolve(settled);
                }
            },
            move |reason| {
                let settled = rejected.borrow_mut().record(index, Err(reason));
                if let Some(settled) = settled {
                    on_rejected.resolve(settled);
                }
            },
        );
    }
    result
}

struct Records<T> {
    settled: Vec<Option<Settlement<T>>>,
    remaining: usize,
}

impl<T> Records<T> {
    fn record(&mut self, index: usize, outcome: Result<T, Error>) -> Option<Vec<Settlement<T>>> {
        self.settled[index] = Some(outcome.into());
        self.remaining -= 1;
        if self.remaining > 0 {
            return None;
        }
        self.settled.iter_mut().map(Option::take).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime;

    #[test]
    fn waits_for_every_entry() {
        let slow = Deferred::pending();
        let out = all_settled(vec![
            Deferred::rejected(Error::reason("x")).into(),
            slow.clone().into(),
        ]);
        runtime::run_until_stalled();
        assert!(out.is_pending());

        slow.resolve(2);
        runtime::run_until_stalled();
        let settled = out.value().unwrap();
        assert_eq!(settled[0].status(), State::Rejected);
        assert_eq!(settled[1], Settlement::Fulfilled { value: 2 });
    }

    #[cfg(feature = "json")]
    #[test]
    fn serializes_with_status_tag() {
        let settled = vec![
            Settlement::Fulfilled { value: 1 },
            Settlement::Rejected {
                reason: Error::reason("x"),
            },
        ];
        let json = serde_json::to_string(&settled).unwrap();
        assert_eq!(
            json,
            r#"[{"status":"fulfilled","value":1},{"status":"rejected","reason":"x"}]"#
        );
    }
}
