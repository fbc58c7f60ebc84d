//! Conversion between filter descriptors and the wire tree.

use chrono::{Local, TimeZone};
use serde_json::{Number, Value};
use tracing::{debug, trace};

use crate::column::{resolve_column_name, Column};
use crate::descriptor::{FilterDescriptor, FilterKind, FilterValue, RangeInterval, RangeType};
use crate::error::{FilterError, FilterResult};
use crate::timezone::{from_wire_millis, to_wire_millis};
use crate::tree::{
    fold_left, Combinator, FieldCondition, FilterTree, RangeCondition, TreeNode, ValueCondition,
};

/// Converts between flat filter lists and the backend filter tree.
///
/// The adapter holds nothing but the timezone used to normalize date
/// ranges. Every conversion is a pure function of its inputs.
///
/// # Fold direction
///
/// Filters combine into a left-leaning chain: `[f0, f1, f2]` becomes
/// `and(and(f0, f1), f2)`, and the values of a multi-valued filter become an
/// `or` chain built the same way. [`FilterTreeAdapter::from_tree`] walks the
/// tree depth-first, left branch first, so it returns filters and values in
/// their original order.
///
/// # Example
///
/// ```
/// use prep_filter_rs::{create_filter_named, Column, FilterTreeAdapter};
/// use serde_json::json;
///
/// let adapter = FilterTreeAdapter::local();
/// let filter = create_filter_named(
///     "exact",
///     Some("0001"),
///     None,
///     true,
///     Some(&json!({"phrase": [{"value": "Dupont"}]})),
/// )
/// .unwrap();
///
/// let tree = adapter.to_tree(&[filter]).unwrap();
/// assert_eq!(
///     serde_json::to_value(&tree).unwrap(),
///     json!({"filter": {"eq": {"field": "0001", "value": "Dupont"}}})
/// );
///
/// let columns = vec![Column::new("0001", "lastname")];
/// let filters = adapter.from_tree(tree.node(), &columns).unwrap().unwrap();
/// assert_eq!(filters[0].column_name(), Some("lastname"));
/// ```
#[derive(Debug, Clone)]
pub struct FilterTreeAdapter<Tz: TimeZone = Local> {
    tz: Tz,
}

impl FilterTreeAdapter<Local> {
    /// Creates an adapter using the system's local timezone.
    pub fn local() -> Self {
        Self { tz: Local }
    }
}

impl Default for FilterTreeAdapter<Local> {
    fn default() -> Self {
        Self::local()
    }
}

impl<Tz: TimeZone> FilterTreeAdapter<Tz> {
    /// Creates an adapter normalizing date ranges with `tz`.
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> &Tz {
        &self.tz
    }

    /// Serializes one filter, without the root wrapper.
    pub fn filter_to_node(&self, filter: &FilterDescriptor) -> FilterResult<TreeNode> {
        filter_to_node(&self.tz, filter)
    }

    /// Combines filters into a single tree.
    ///
    /// An empty list gives the empty tree `{}`.
    pub fn to_tree(&self, filters: &[FilterDescriptor]) -> FilterResult<FilterTree> {
        let nodes = filters
            .iter()
            .map(|filter| self.filter_to_node(filter))
            .collect::<FilterResult<Vec<_>>>()?;

        debug!(filters = nodes.len(), "combining filters into tree");
        Ok(FilterTree::new(fold_left(nodes, Combinator::And)))
    }

    /// Rebuilds the filter list a tree was made from.
    ///
    /// Returns `None` when there is no tree at all. Column names are looked up
    /// in `columns`; rebuilt filters are never editable.
    pub fn from_tree(
        &self,
        tree: Option<&TreeNode>,
        columns: &[Column],
    ) -> FilterResult<Option<Vec<FilterDescriptor>>> {
        let Some(node) = tree else {
            debug!("no filter tree to rebuild");
            return Ok(None);
        };

        let filters = self.flatten(node, columns)?;
        debug!(filters = filters.len(), "rebuilt filters from tree");
        Ok(Some(filters))
    }

    /// Rebuilds filters from a root wrapper. The empty tree gives no filters.
    pub fn from_filter_tree(
        &self,
        tree: &FilterTree,
        columns: &[Column],
    ) -> FilterResult<Vec<FilterDescriptor>> {
        Ok(self.from_tree(tree.node(), columns)?.unwrap_or_default())
    }

    /// Decodes a raw JSON node and rebuilds its filters.
    ///
    /// A missing or `null` value gives `None`.
    pub fn from_json(
        &self,
        tree: Option<&Value>,
        columns: &[Column],
    ) -> FilterResult<Option<Vec<FilterDescriptor>>> {
        match tree {
            Some(value) if !value.is_null() => {
                let node = TreeNode::from_json(value)?;
                self.from_tree(Some(&node), columns)
            }
            _ => self.from_tree(None, columns),
        }
    }

    fn flatten(&self, node: &TreeNode, columns: &[Column]) -> FilterResult<Vec<FilterDescriptor>> {
        match node {
            TreeNode::And(left, right) => {
                let mut filters = self.flatten(left, columns)?;
                filters.extend(self.flatten(right, columns)?);
                Ok(filters)
            }
            TreeNode::Or(left, right) => {
                if is_quality_pair(left, right) {
                    trace!("collapsing invalid/empty pair into a quality filter");
                    let quality = FilterKind::Quality {
                        invalid: true,
                        empty: true,
                    };
                    return Ok(vec![FilterDescriptor::new(quality, None, None, false)?]);
                }

                let mut filters = self.flatten(left, columns)?;
                filters.extend(self.flatten(right, columns)?);
                if has_and(left) || has_and(right) {
                    return Ok(filters);
                }
                merge_alternatives(filters)
            }
            leaf => Ok(vec![self.leaf_to_filter(leaf, columns)?]),
        }
    }

    fn leaf_to_filter(&self, node: &TreeNode, columns: &[Column]) -> FilterResult<FilterDescriptor> {
        trace!(operator = node.operator(), "rebuilding leaf");

        let (kind, field) = match node {
            TreeNode::Contains(condition) => (
                FilterKind::Contains {
                    phrase: vec![FilterValue::new(&condition.value)],
                },
                Some(&condition.field),
            ),
            TreeNode::Eq(condition) => (
                FilterKind::Exact {
                    phrase: vec![FilterValue::new(&condition.value)],
                },
                Some(&condition.field),
            ),
            TreeNode::Matches(condition) => (
                FilterKind::Matches {
                    patterns: vec![FilterValue::new(&condition.value)],
                },
                Some(&condition.field),
            ),
            TreeNode::Range(condition) => (self.range_kind(condition)?, Some(&condition.field)),
            TreeNode::Invalid(FieldCondition { field: Some(field) }) => {
                (FilterKind::InvalidRecords, Some(field))
            }
            TreeNode::Invalid(FieldCondition { field: None }) => (
                FilterKind::Quality {
                    invalid: true,
                    empty: false,
                },
                None,
            ),
            TreeNode::Empty(FieldCondition { field: Some(field) }) => {
                (FilterKind::EmptyRecords, Some(field))
            }
            TreeNode::Empty(FieldCondition { field: None }) => (
                FilterKind::Quality {
                    invalid: false,
                    empty: true,
                },
                None,
            ),
            TreeNode::Valid(condition) => (FilterKind::ValidRecords, condition.field.as_ref()),
            TreeNode::And(..) | TreeNode::Or(..) => {
                return Err(FilterError::malformed(format!(
                    "{} is not a leaf operator",
                    node.operator()
                )))
            }
        };

        let column_name = field.and_then(|id| resolve_column_name(columns, id));
        FilterDescriptor::new(kind, field.cloned(), column_name, false)
    }

    fn range_kind(&self, condition: &RangeCondition) -> FilterResult<FilterKind> {
        let range_type = condition.range_type.unwrap_or(RangeType::Integer);
        let (start, end) = match range_type {
            RangeType::Integer => (condition.start.clone(), condition.end.clone()),
            RangeType::Date => (
                Number::from(from_wire_millis(&self.tz, millis(&condition.start)?)?),
                Number::from(from_wire_millis(&self.tz, millis(&condition.end)?)?),
            ),
        };

        let label = condition
            .label
            .clone()
            .unwrap_or_else(|| format!("[{start} .. {end}["));

        Ok(FilterKind::InsideRange {
            intervals: vec![RangeInterval {
                label,
                value: [start, end],
            }],
            range_type,
        })
    }
}

/// Serializes one filter into its leaf, or its `or` chain of leaves.
pub(crate) fn filter_to_node<Tz: TimeZone>(
    tz: &Tz,
    filter: &FilterDescriptor,
) -> FilterResult<TreeNode> {
    let filter_type = filter.filter_type();
    let field = || {
        filter
            .column_id()
            .ok_or_else(|| FilterError::missing_column(filter_type))
    };

    let leaves: Vec<TreeNode> = match filter.kind() {
        FilterKind::Contains { phrase } => {
            let field = field()?;
            phrase
                .iter()
                .map(|p| TreeNode::Contains(ValueCondition::new(field, &p.value)))
                .collect()
        }
        FilterKind::Exact { phrase } => {
            let field = field()?;
            phrase
                .iter()
                .map(|p| TreeNode::Eq(ValueCondition::new(field, &p.value)))
                .collect()
        }
        FilterKind::Matches { patterns } => {
            let field = field()?;
            patterns
                .iter()
                .map(|p| TreeNode::Matches(ValueCondition::new(field, &p.value)))
                .collect()
        }
        FilterKind::InsideRange {
            intervals,
            range_type,
        } => {
            let field = field()?;
            intervals
                .iter()
                .map(|interval| range_leaf(tz, field, interval, *range_type))
                .collect::<FilterResult<Vec<_>>>()?
        }
        FilterKind::InvalidRecords => vec![TreeNode::Invalid(FieldCondition::on(field()?))],
        FilterKind::EmptyRecords => vec![TreeNode::Empty(FieldCondition::on(field()?))],
        FilterKind::ValidRecords => vec![TreeNode::Valid(FieldCondition {
            field: filter.column_id().map(str::to_owned),
        })],
        FilterKind::Quality { invalid, empty } => {
            let mut leaves = Vec::with_capacity(2);
            if *invalid {
                leaves.push(TreeNode::Invalid(FieldCondition::any()));
            }
            if *empty {
                leaves.push(TreeNode::Empty(FieldCondition::any()));
            }
            leaves
        }
    };

    fold_left(leaves, Combinator::Or)
        .ok_or_else(|| FilterError::invalid_arguments(filter_type, "no values to serialize"))
}

fn range_leaf<Tz: TimeZone>(
    tz: &Tz,
    field: &str,
    interval: &RangeInterval,
    range_type: RangeType,
) -> FilterResult<TreeNode> {
    let [min, max] = &interval.value;
    let (start, end) = match range_type {
        RangeType::Integer => (min.clone(), max.clone()),
        RangeType::Date => (
            Number::from(to_wire_millis(tz, millis(min)?)?),
            Number::from(to_wire_millis(tz, millis(max)?)?),
        ),
    };

    Ok(TreeNode::Range(RangeCondition {
        field: field.to_string(),
        start,
        end,
        range_type: Some(range_type),
        label: Some(interval.label.clone()),
    }))
}

/// Reads a date bound as whole epoch milliseconds.
fn millis(bound: &Number) -> FilterResult<i64> {
    bound
        .as_i64()
        .or_else(|| {
            bound
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        })
        .ok_or_else(|| FilterError::InvalidRangeBound {
            bound: bound.to_string(),
        })
}

/// True for `or(invalid{}, empty{})` in either order, both without a field.
fn is_quality_pair(left: &TreeNode, right: &TreeNode) -> bool {
    matches!(
        (left, right),
        (
            TreeNode::Invalid(FieldCondition { field: None }),
            TreeNode::Empty(FieldCondition { field: None })
        ) | (
            TreeNode::Empty(FieldCondition { field: None }),
            TreeNode::Invalid(FieldCondition { field: None })
        )
    )
}

/// True if an `and` appears anywhere under `node`, `node` included.
fn has_and(node: &TreeNode) -> bool {
    match node {
        TreeNode::And(..) => true,
        TreeNode::Or(left, right) => has_and(left) || has_and(right),
        _ => false,
    }
}

/// Merges the alternatives of an `or` into a single multi-valued filter when
/// they all share a column and a list-valued kind. Otherwise returns them
/// unchanged.
fn merge_alternatives(filters: Vec<FilterDescriptor>) -> FilterResult<Vec<FilterDescriptor>> {
    let Some((first, rest)) = filters.split_first() else {
        return Ok(filters);
    };
    if rest.is_empty() || rest.iter().any(|f| f.column_id() != first.column_id()) {
        return Ok(filters);
    }

    let merged = rest
        .iter()
        .try_fold(first.kind().clone(), |kind, f| kind.merged_with(f.kind()));

    match merged {
        Some(kind) => {
            trace!(
                filter_type = %first.filter_type(),
                alternatives = filters.len(),
                "merged or-alternatives into one filter"
            );
            let merged = FilterDescriptor::new(
                kind,
                first.column_id().map(str::to_owned),
                first.column_name().map(str::to_owned),
                false,
            )?;
            Ok(vec![merged])
        }
        None => Ok(filters),
    }
}
