//! Internal implementation details.
//!
//! These are pub(crate) and not intended for external use.

pub(crate) mod marked_ptr;
pub(crate) mod skip_node;
