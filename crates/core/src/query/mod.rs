//! Pure evaluation of filters, updates, projections and sort options over
//! JSON documents.
//!
//! The bundled stores share these functions; they hold no state and perform
//! no I/O.

mod compare;
mod filter;
mod path;
mod projection;
mod update;

use std::cmp::Ordering;

pub use compare::{compare_for_sort, compare_same_kind, values_equal};
pub use filter::matches;
pub use path::{get_path, remove_path, set_path};
pub use projection::apply_projection;
pub use update::{apply_update, is_modified};

use crate::storage::{Document, SortOrder};

/// Compares two documents by the given sort keys.
pub fn compare_documents(a: &Document, b: &Document, sort: &[(String, SortOrder)]) -> Ordering {
    for (field, order) in sort {
        let ordering = compare_for_sort(get_path(a, field), get_path(b, field));
        let ordering = match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Sorts documents by the given keys. The sort is stable, so documents with
/// equal keys keep their insertion order.
pub fn sort_documents(documents: &mut [Document], sort: &[(String, SortOrder)]) {
    if sort.is_empty() {
        return;
    }
    documents.sort_by(|a, b| compare_documents(a, b, sort));
}
