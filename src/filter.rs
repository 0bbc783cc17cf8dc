//! Filter registry types.
//!
//! Every query-parameter key a resource accepts maps to a [`FilterFn`]: a
//! total function over any raw string value. A filter either narrows the
//! current query with one more predicate, or replaces the query root
//! entirely (the negative-existence case, e.g. "users available for a
//! program", which reissues the query from a different root instead of
//! narrowing it).

use crate::dispatch::RequestContext;
use crate::query::{Predicate, Query};

/// The result of interpreting one raw filter value.
pub enum FilterOutcome {
    /// AND this predicate onto the current query.
    Narrow(Predicate),
    /// Substitute an entirely new query for the current one. Predicates
    /// applied by earlier filters are discarded; later filters still apply
    /// on top of the new root.
    Replace(Query),
}

/// A registered filter. Must accept any string value without panicking; the
/// value's interpretation (substring, exact, subquery) is the filter's own
/// business.
pub type FilterFn = fn(&str, &RequestContext) -> FilterOutcome;

impl FilterOutcome {
    /// Folds this outcome into `query`.
    pub fn apply(self, query: Query) -> Query {
        match self {
            FilterOutcome::Narrow(pred) => query.narrow(pred),
            FilterOutcome::Replace(replacement) => replacement,
        }
    }
}
