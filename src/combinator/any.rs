use std::cell::RefCell;
use std::rc::Rc;

use super::normalize;
use crate::error::AggregateRejection;
use crate::{Deferred, Error, Resolution};

/// Fulfill with the first entry to fulfill.
///
/// If every entry rejects, rejects with [`Error::Aggregate`] carrying every
/// reason in input order. Empty input rejects immediately with an empty
/// aggregate.
pub fn any<T, I>(entries: I) -> Deferred<T>
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
        result.reject(Error::Aggregate(AggregateRejection::new(
            Vec::new(),
            AggregateRejection::EMPTY,
        )));
        return result;
    }

    let reasons = Rc::new(RefCell::new(Reasons {
        reasons: vec![None; entries.len()],
        remaining: entries.len(),
    }));
    for (index, entry) in entries.into_iter().enumerate() {
        let reasons = reasons.clone();
        let on_fulfilled = result.clone();
        let on_rejected = result.clone();
        entry.watch(
            move |value| on_fulfilled.resolve(value),
            move |reason| {
                let aggregate = reasons.borrow_mut().record(index, reason);
                if let Some(aggregate) = aggregate {
                    on_rejected.reject(Error::Aggregate(aggregate));
                }
            },
        );
    }
    result
}

struct Reasons {
    reasons: Vec<Option<Error>>,
    remaining: usize,
}

impl Reasons {
    fn record(&mut self, index: usize, reason: Error) -> Option<AggregateRejection> {
        self.reasons[index] = Some(reason);
        self.remaining -= 1;
        if self.remaining > 0 {
            return None;
        }
        let reasons = self.reasons.iter_mut().map(Option::take).collect::<Option<_>>()?;
        Some(AggregateRejection::new(reasons, AggregateRejection::ALL_REJECTED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime;

    #[test]
    fn first_fulfillment_wins_over_rejections() {
        let out = any(vec![
            Deferred::rejected(Error::reason("a")).into(),
            Deferred::pending().into(),
            Resolution::Value(3),
        ]);
        runtime::run_until_stalled();
        assert_eq!(out.value(), Some(3));
    }

    #[test]
    fn reasons_follow_input_order() {
        let (a, b) = (Deferred::<u8>::pending(), Deferred::pending());
        let out = any(vec![a.clone().into(), b.clone().into()]);
        b.reject(Error::reason("b"));
        a.reject(Error::reason("a"));
        runtime::run_until_stalled();

        let reason = out.reason().unwrap();
        let aggregate = reason.as_aggregate().unwrap();
        assert_eq!(aggregate.reasons(), &[Error::reason("a"), Error::reason("b")]);
        assert_eq!(aggregate.message(), "all entries were rejected");
    }

    #[test]
    fn empty_input_rejects_immediately() {
        let out = any(Vec::<Resolution<u8>>::new());
        let reason = out.reason().unwrap();
        let aggregate = reason.as_aggregate().unwrap();
        assert!(aggregate.reasons().is_empty());
        assert_eq!(aggregate.message(), "no entries to await");
    }
}
