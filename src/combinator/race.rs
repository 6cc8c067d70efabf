use super::normalize;
use crate::{Deferred, Resolution};

/// Settle like whichever entry settles first.
///
/// Plain values count as already fulfilled, so the earliest already-settled
/// entry in input order wins over entries that settle later. Empty input never
/// settles.
pub fn race<T, I>(entries: I) -> Deferred<T>
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
    for entry in entries {
        let on_fulfilled = result.clone();
        let on_rejected = result.clone();
        entry.watch(
            move |value| on_fulfilled.resolve(value),
            move |reason| on_rejected.reject(reason),
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{runtime, Error};

    #[test]
    fn first_settlement_wins() {
        let (a, b) = (Deferred::pending(), Deferred::pending());
        let out = race(vec![a.clone().into(), b.clone().into()]);
        b.reject(Error::reason("b first"));
        a.resolve(1);
        runtime::run_until_stalled();
        assert_eq!(out.reason(), Some(Error::reason("b first")));
    }

    #[test]
    fn earlier_settled_entry_beats_later_plain_value() {
        let out = race(vec![Deferred::resolved("settled").into(), Resolution::Value("plain")]);
        runtime::run_until_stalled();
        assert_eq!(out.value(), Some("settled"));
    }

    #[test]
    fn empty_input_never_settles() {
        let out = race(Vec::<Resolution<u8>>::new());
        runtime::run();
        assert!(out.is_pending());
    }
}
