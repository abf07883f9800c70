//! Translation of a [`QuerySpec`] into filterable-resource calls.

use restgate_query::{QuerySpec, Relation};

use crate::traits::FilterableQuery;

/// Applies a query specification to a query target.
///
/// Emission order is part of the contract, because it defines how the
/// backend composes the final query: every filter condition in the
/// spec's mapping order, then exactly one `order_by`, then `offset`
/// (omitted when zero), then `limit`.
pub fn apply_spec<Q: FilterableQuery + ?Sized>(spec: &QuerySpec, query: &mut Q) {
    for (field, condition) in &spec.filters {
        match condition.relation {
            Relation::And => query.and_where(field, condition.operator, &condition.value),
            Relation::Or => query.or_where(field, condition.operator, &condition.value),
        }
    }

    query.order_by(&spec.sort.column, spec.sort.direction);

    if spec.pagination.offset > 0 {
        query.offset(spec.pagination.offset);
    }
    query.limit(spec.pagination.limit);
}
