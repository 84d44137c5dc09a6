//! Structural differ
//!
//! Compares an original snapshot with the current one and reports what
//! changed, keyed by field path.
//!
//! ## Paths
//!
//! - top-level fields use their plain name (`name`)
//! - nested mapping fields are dotted (`address.city`)
//! - fields of an item inside an identifiable list are scoped by the item's
//!   identity: `products[id=stores/s1/products/p1].qty`
//!
//! ## Guarantees
//!
//! - Determinism: output maps are ordered, list results follow input order.
//! - `diff(s, s)` is empty for every snapshot `s`.
//! - The reserved type tag never shows up as a change.

pub mod engine;
pub mod model;

pub use engine::diff;
pub use model::{DiffResult, FieldChange, ListChange, ListKind, ModifiedItem};
