//! Flat, UI-facing filter descriptors.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Local, TimeZone};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{json, Number, Value};

use crate::adapter::filter_to_node;
use crate::error::{FilterError, FilterResult};
use crate::tree::TreeNode;

const INVALID_LABEL: &str = "rows with invalid values";
const EMPTY_LABEL: &str = "rows with empty values";
const VALID_LABEL: &str = "rows with valid values";
const INVALID_OR_EMPTY_LABEL: &str = "rows with invalid or empty values";

/// The eight supported filter kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    Contains,
    Exact,
    Matches,
    InsideRange,
    InvalidRecords,
    EmptyRecords,
    ValidRecords,
    Quality,
}

impl FilterType {
    /// Every filter type, in declaration order.
    pub const ALL: [FilterType; 8] = [
        FilterType::Contains,
        FilterType::Exact,
        FilterType::Matches,
        FilterType::InsideRange,
        FilterType::InvalidRecords,
        FilterType::EmptyRecords,
        FilterType::ValidRecords,
        FilterType::Quality,
    ];

    /// Returns the type name as used in descriptors.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterType::Contains => "contains",
            FilterType::Exact => "exact",
            FilterType::Matches => "matches",
            FilterType::InsideRange => "inside_range",
            FilterType::InvalidRecords => "invalid_records",
            FilterType::EmptyRecords => "empty_records",
            FilterType::ValidRecords => "valid_records",
            FilterType::Quality => "quality",
        }
    }

    /// Returns true if descriptors of this type carry an arguments payload.
    pub fn takes_arguments(&self) -> bool {
        !matches!(
            self,
            FilterType::InvalidRecords | FilterType::EmptyRecords | FilterType::ValidRecords
        )
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterType {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterType::ALL
            .into_iter()
            .find(|filter_type| filter_type.as_str() == s)
            .ok_or_else(|| FilterError::invalid_filter_type(s))
    }
}

/// A single phrase or pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterValue {
    pub value: String,
}

impl FilterValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// The value domain of a range filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeType {
    Integer,
    Date,
}

/// One `[min, max[` interval of a range filter.
///
/// For date ranges the bounds are epoch milliseconds in the viewer's timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeInterval {
    pub label: String,
    pub value: [Number; 2],
}

impl RangeInterval {
    pub fn new(label: impl Into<String>, min: impl Into<Number>, max: impl Into<Number>) -> Self {
        Self {
            label: label.into(),
            value: [min.into(), max.into()],
        }
    }
}

/// The type-specific arguments of a filter.
///
/// Serialized adjacently tagged, as the `type` and `args` members of a
/// descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "args", rename_all = "snake_case")]
pub enum FilterKind {
    Contains {
        phrase: Vec<FilterValue>,
    },
    Exact {
        phrase: Vec<FilterValue>,
    },
    Matches {
        patterns: Vec<FilterValue>,
    },
    InsideRange {
        intervals: Vec<RangeInterval>,
        #[serde(rename = "type")]
        range_type: RangeType,
    },
    InvalidRecords,
    EmptyRecords,
    ValidRecords,
    Quality {
        #[serde(default)]
        invalid: bool,
        #[serde(default)]
        empty: bool,
    },
}

impl FilterKind {
    /// Parses the arguments payload of the given filter type.
    ///
    /// Arguments are ignored for the three record filters, and required for
    /// every other type.
    pub fn from_args(filter_type: FilterType, args: Option<&Value>) -> FilterResult<Self> {
        let tagged = match args {
            _ if !filter_type.takes_arguments() => json!({ "type": filter_type }),
            Some(args) if !args.is_null() => json!({ "type": filter_type, "args": args }),
            _ => {
                return Err(FilterError::invalid_arguments(
                    filter_type,
                    "arguments are required",
                ))
            }
        };

        serde_json::from_value(tagged)
            .map_err(|e| FilterError::invalid_arguments(filter_type, e.to_string()))
    }

    /// Returns the filter type of these arguments.
    pub fn filter_type(&self) -> FilterType {
        match self {
            FilterKind::Contains { .. } => FilterType::Contains,
            FilterKind::Exact { .. } => FilterType::Exact,
            FilterKind::Matches { .. } => FilterType::Matches,
            FilterKind::InsideRange { .. } => FilterType::InsideRange,
            FilterKind::InvalidRecords => FilterType::InvalidRecords,
            FilterKind::EmptyRecords => FilterType::EmptyRecords,
            FilterKind::ValidRecords => FilterType::ValidRecords,
            FilterKind::Quality { .. } => FilterType::Quality,
        }
    }

    /// Projects the arguments into the list shown to the user.
    pub fn display_values(&self) -> Vec<DisplayValue> {
        match self {
            FilterKind::Contains { phrase } | FilterKind::Exact { phrase } => {
                phrase.iter().map(DisplayValue::text).collect()
            }
            FilterKind::Matches { patterns } => patterns.iter().map(DisplayValue::text).collect(),
            FilterKind::InsideRange { intervals, .. } => intervals
                .iter()
                .map(|interval| DisplayValue::Interval {
                    label: interval.label.clone(),
                    value: interval.value.clone(),
                })
                .collect(),
            FilterKind::InvalidRecords => vec![DisplayValue::label(INVALID_LABEL, false)],
            FilterKind::EmptyRecords => vec![DisplayValue::label(EMPTY_LABEL, true)],
            FilterKind::ValidRecords => vec![DisplayValue::label(VALID_LABEL, false)],
            FilterKind::Quality { invalid, empty } => {
                let label = match (*invalid, *empty) {
                    (true, true) => INVALID_OR_EMPTY_LABEL,
                    (true, false) => INVALID_LABEL,
                    _ => EMPTY_LABEL,
                };
                vec![DisplayValue::label(label, false)]
            }
        }
    }

    /// Combines two alternatives on the same column into one filter.
    ///
    /// Only list-valued kinds of the same type merge; range filters must
    /// also share their range type. Values keep their order, `self` first.
    pub fn merged_with(&self, other: &FilterKind) -> Option<FilterKind> {
        fn concat<T: Clone>(a: &[T], b: &[T]) -> Vec<T> {
            a.iter().chain(b).cloned().collect()
        }

        match (self, other) {
            (FilterKind::Contains { phrase: a }, FilterKind::Contains { phrase: b }) => {
                Some(FilterKind::Contains {
                    phrase: concat(a, b),
                })
            }
            (FilterKind::Exact { phrase: a }, FilterKind::Exact { phrase: b }) => {
                Some(FilterKind::Exact {
                    phrase: concat(a, b),
                })
            }
            (FilterKind::Matches { patterns: a }, FilterKind::Matches { patterns: b }) => {
                Some(FilterKind::Matches {
                    patterns: concat(a, b),
                })
            }
            (
                FilterKind::InsideRange {
                    intervals: a,
                    range_type: type_a,
                },
                FilterKind::InsideRange {
                    intervals: b,
                    range_type: type_b,
                },
            ) if type_a == type_b => Some(FilterKind::InsideRange {
                intervals: concat(a, b),
                range_type: *type_a,
            }),
            _ => None,
        }
    }

    fn validate(&self) -> FilterResult<()> {
        let empty_list = match self {
            FilterKind::Contains { phrase } | FilterKind::Exact { phrase } => phrase.is_empty(),
            FilterKind::Matches { patterns } => patterns.is_empty(),
            FilterKind::InsideRange { intervals, .. } => intervals.is_empty(),
            FilterKind::Quality { invalid, empty } => {
                if !invalid && !empty {
                    return Err(FilterError::invalid_arguments(
                        FilterType::Quality,
                        "at least one of invalid or empty must be set",
                    ));
                }
                false
            }
            FilterKind::InvalidRecords | FilterKind::EmptyRecords | FilterKind::ValidRecords => {
                false
            }
        };

        if empty_list {
            return Err(FilterError::invalid_arguments(
                self.filter_type(),
                "at least one value is required",
            ));
        }
        Ok(())
    }
}

/// One displayable item derived from a filter's arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DisplayValue {
    /// A phrase or pattern.
    Text { value: String },
    /// A range interval.
    Interval { label: String, value: [Number; 2] },
    /// A fixed label for filters without values.
    Label {
        label: String,
        #[serde(rename = "isEmpty", skip_serializing_if = "std::ops::Not::not")]
        is_empty: bool,
    },
}

impl DisplayValue {
    fn text(value: &FilterValue) -> Self {
        DisplayValue::Text {
            value: value.value.clone(),
        }
    }

    fn label(label: &str, is_empty: bool) -> Self {
        DisplayValue::Label {
            label: label.to_string(),
            is_empty,
        }
    }
}

/// A caller-supplied hook kept alongside a filter.
///
/// Hooks are stored verbatim; nothing in this crate invokes them. Two hooks
/// are equal when they share the same allocation.
#[derive(Clone)]
pub struct FilterCallback(Arc<dyn Fn(&FilterDescriptor) + Send + Sync>);

impl FilterCallback {
    pub fn new(callback: impl Fn(&FilterDescriptor) + Send + Sync + 'static) -> Self {
        Self(Arc::new(callback))
    }

    /// Invokes the hook with the given filter.
    pub fn call(&self, filter: &FilterDescriptor) {
        (self.0)(filter)
    }
}

impl fmt::Debug for FilterCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FilterCallback(..)")
    }
}

impl PartialEq for FilterCallback {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A single filter as presented to the user.
///
/// Descriptors are immutable values. The display `value` is computed once at
/// construction and is never serialized; deserialization recomputes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterDescriptor {
    #[serde(rename = "colId", skip_serializing_if = "Option::is_none")]
    column_id: Option<String>,

    #[serde(rename = "colName", skip_serializing_if = "Option::is_none")]
    column_name: Option<String>,

    editable: bool,

    #[serde(flatten)]
    kind: FilterKind,

    #[serde(skip)]
    value: Vec<DisplayValue>,

    #[serde(skip)]
    on_apply: Option<FilterCallback>,

    #[serde(skip)]
    on_remove: Option<FilterCallback>,
}

impl FilterDescriptor {
    /// Creates a descriptor from typed arguments.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::InvalidArguments` if a list-valued filter has no
    /// values or a quality filter has neither flag set.
    pub fn new(
        kind: FilterKind,
        column_id: Option<String>,
        column_name: Option<String>,
        editable: bool,
    ) -> FilterResult<Self> {
        kind.validate()?;
        let value = kind.display_values();

        Ok(Self {
            column_id,
            column_name,
            editable,
            kind,
            value,
            on_apply: None,
            on_remove: None,
        })
    }

    /// Attaches the apply and remove hooks.
    pub fn with_callbacks(
        mut self,
        on_apply: Option<FilterCallback>,
        on_remove: Option<FilterCallback>,
    ) -> Self {
        self.on_apply = on_apply;
        self.on_remove = on_remove;
        self
    }

    pub fn filter_type(&self) -> FilterType {
        self.kind.filter_type()
    }

    pub fn column_id(&self) -> Option<&str> {
        self.column_id.as_deref()
    }

    pub fn column_name(&self) -> Option<&str> {
        self.column_name.as_deref()
    }

    pub fn editable(&self) -> bool {
        self.editable
    }

    /// The type-specific arguments.
    pub fn kind(&self) -> &FilterKind {
        &self.kind
    }

    /// The display projection of the arguments.
    pub fn value(&self) -> &[DisplayValue] {
        &self.value
    }

    pub fn on_apply(&self) -> Option<&FilterCallback> {
        self.on_apply.as_ref()
    }

    pub fn on_remove(&self) -> Option<&FilterCallback> {
        self.on_remove.as_ref()
    }

    /// Returns true if both descriptors select the same rows: same type,
    /// column and arguments. Names, editability and hooks are ignored.
    pub fn same_filter(&self, other: &FilterDescriptor) -> bool {
        self.column_id == other.column_id && self.kind == other.kind
    }

    /// Serializes this filter alone, using the local timezone for dates.
    pub fn to_tree(&self) -> FilterResult<TreeNode> {
        self.to_tree_in(&Local)
    }

    /// Serializes this filter alone, using `tz` for dates.
    pub fn to_tree_in<Tz: TimeZone>(&self, tz: &Tz) -> FilterResult<TreeNode> {
        filter_to_node(tz, self)
    }
}

/// Creates a filter from an untyped arguments payload.
///
/// `args` must match the shape expected by `filter_type`; it may be absent
/// for `invalid_records`, `empty_records` and `valid_records`.
pub fn create_filter(
    filter_type: FilterType,
    column_id: Option<&str>,
    column_name: Option<&str>,
    editable: bool,
    args: Option<&Value>,
    on_apply: Option<FilterCallback>,
    on_remove: Option<FilterCallback>,
) -> FilterResult<FilterDescriptor> {
    let kind = FilterKind::from_args(filter_type, args)?;
    let filter = FilterDescriptor::new(
        kind,
        column_id.map(str::to_owned),
        column_name.map(str::to_owned),
        editable,
    )?;
    Ok(filter.with_callbacks(on_apply, on_remove))
}

/// Like [`create_filter`], with the type given by name.
///
/// # Errors
///
/// Returns `FilterError::InvalidFilterType` for an unknown type name.
pub fn create_filter_named(
    type_name: &str,
    column_id: Option<&str>,
    column_name: Option<&str>,
    editable: bool,
    args: Option<&Value>,
) -> FilterResult<FilterDescriptor> {
    let filter_type = type_name.parse()?;
    create_filter(filter_type, column_id, column_name, editable, args, None, None)
}

/// Serialized form of a descriptor, before validation.
#[derive(Deserialize)]
struct FilterRecord {
    #[serde(rename = "type")]
    filter_type: String,
    #[serde(rename = "colId", default)]
    column_id: Option<String>,
    #[serde(rename = "colName", default)]
    column_name: Option<String>,
    #[serde(default)]
    editable: bool,
    #[serde(default)]
    args: Option<Value>,
}

impl<'de> Deserialize<'de> for FilterDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = FilterRecord::deserialize(deserializer)?;
        create_filter_named(
            &record.filter_type,
            record.column_id.as_deref(),
            record.column_name.as_deref(),
            record.editable,
            record.args.as_ref(),
        )
        .map_err(de::Error::custom)
    }
}
