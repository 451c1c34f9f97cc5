pub mod checkpoints;
pub mod entries;
pub mod transactions;
pub mod writers;

use chrono::NaiveDateTime;

pub(crate) fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

/// Overwrites `target` only with a present value.
pub(crate) fn coalesce<T: Clone>(target: &mut Option<T>, incoming: &Option<T>) {
    if incoming.is_some() {
        target.clone_from(incoming);
    }
}

/// Fills `target` only if it is still empty.
pub(crate) fn fill<T: Clone>(target: &mut Option<T>, incoming: &Option<T>) {
    if target.is_none() {
        target.clone_from(incoming);
    }
}
