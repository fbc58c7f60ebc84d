//! Filter tree conversion for data-preparation filters.
//!
//! The grid UI keeps its filters as a flat list of [`FilterDescriptor`]s,
//! one per predicate. The preparation backend stores them as one nested
//! boolean tree of strictly binary `and`/`or` nodes over leaf operators
//! (`contains`, `eq`, `matches`, `range`, `invalid`, `empty`, `valid`).
//! [`FilterTreeAdapter`] converts between the two.
//!
//! # Supported filters
//!
//! | type | tree |
//! |---|---|
//! | `contains` | `contains` leaf per phrase |
//! | `exact` | `eq` leaf per phrase |
//! | `matches` | `matches` leaf per pattern |
//! | `inside_range` | `range` leaf per interval |
//! | `invalid_records` | `invalid` leaf |
//! | `empty_records` | `empty` leaf |
//! | `valid_records` | `valid` leaf |
//! | `quality` | `or` of field-less `invalid` and `empty` leaves |
//!
//! Several values of one filter become an `or` chain; several filters
//! become an `and` chain. Both chains lean left.
//!
//! # Example
//!
//! ```
//! use prep_filter_rs::{Column, FilterTreeAdapter, FilterTree};
//!
//! let tree: FilterTree = serde_json::from_str(
//!     r#"{"filter": {"or": [{"invalid": {}}, {"empty": {}}]}}"#,
//! )
//! .unwrap();
//!
//! let adapter = FilterTreeAdapter::local();
//! let filters = adapter.from_filter_tree(&tree, &[Column::new("0001", "lastname")]).unwrap();
//!
//! assert_eq!(filters.len(), 1);
//! assert_eq!(filters[0].filter_type().as_str(), "quality");
//! ```

mod adapter;
mod column;
mod descriptor;
mod error;
mod timezone;
mod tree;

pub use adapter::FilterTreeAdapter;
pub use column::{resolve_column_name, Column};
pub use descriptor::{
    create_filter, create_filter_named, DisplayValue, FilterCallback, FilterDescriptor,
    FilterKind, FilterType, FilterValue, RangeInterval, RangeType,
};
pub use error::{FilterError, FilterResult};
pub use timezone::{from_wire_millis, to_wire_millis};
pub use tree::{
    fold_left, Combinator, FieldCondition, FilterTree, RangeCondition, TreeNode, ValueCondition,
};
