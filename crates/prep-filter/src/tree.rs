//! Wire-format filter expression tree.
//!
//! A node is either a leaf keyed by its operator, such as
//! `{"eq": {"field": "0001", "value": "Dupont"}}`, or a binary combinator
//! `{"and": [left, right]}` / `{"or": [left, right]}`. Combinators always
//! have exactly two children.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

use crate::descriptor::RangeType;
use crate::error::{FilterError, FilterResult};

/// Condition of the `contains`, `eq` and `matches` leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCondition {
    pub field: String,
    pub value: String,
}

impl ValueCondition {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Condition of the `range` leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeCondition {
    pub field: String,
    pub start: Number,
    pub end: Number,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub range_type: Option<RangeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Condition of the `invalid`, `empty` and `valid` leaves.
///
/// A missing field means the predicate applies to any column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl FieldCondition {
    /// A condition scoped to one column.
    pub fn on(field: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
        }
    }

    /// A condition on any column.
    pub fn any() -> Self {
        Self::default()
    }
}

/// A node of the filter expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeNode {
    Contains(ValueCondition),
    Eq(ValueCondition),
    Matches(ValueCondition),
    Range(RangeCondition),
    Invalid(FieldCondition),
    Empty(FieldCondition),
    Valid(FieldCondition),
    And(Box<TreeNode>, Box<TreeNode>),
    Or(Box<TreeNode>, Box<TreeNode>),
}

impl TreeNode {
    /// Creates an AND node from two nodes.
    pub fn and(left: TreeNode, right: TreeNode) -> Self {
        TreeNode::And(Box::new(left), Box::new(right))
    }

    /// Creates an OR node from two nodes.
    pub fn or(left: TreeNode, right: TreeNode) -> Self {
        TreeNode::Or(Box::new(left), Box::new(right))
    }

    /// Returns the operator key of this node.
    pub fn operator(&self) -> &'static str {
        match self {
            TreeNode::Contains(_) => "contains",
            TreeNode::Eq(_) => "eq",
            TreeNode::Matches(_) => "matches",
            TreeNode::Range(_) => "range",
            TreeNode::Invalid(_) => "invalid",
            TreeNode::Empty(_) => "empty",
            TreeNode::Valid(_) => "valid",
            TreeNode::And(..) => "and",
            TreeNode::Or(..) => "or",
        }
    }

    /// Decodes a node from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::UnrecognizedOperator` for an unknown operator key,
    /// and `FilterError::MalformedNode` when the node is not a single-key
    /// object, a combinator does not have exactly two children, or a leaf
    /// condition has the wrong shape.
    pub fn from_json(value: &Value) -> FilterResult<TreeNode> {
        let object = value
            .as_object()
            .ok_or_else(|| FilterError::malformed(format!("expected an object, found {value}")))?;

        let mut entries = object.iter();
        let (key, payload) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            (None, _) => return Err(FilterError::malformed("node has no operator")),
            (Some(_), Some(_)) => {
                let keys: Vec<&str> = object.keys().map(String::as_str).collect();
                return Err(FilterError::malformed(format!(
                    "expected a single operator, found {}",
                    keys.join(", ")
                )));
            }
        };

        match key.as_str() {
            "contains" => Ok(TreeNode::Contains(condition(key, payload)?)),
            "eq" => Ok(TreeNode::Eq(condition(key, payload)?)),
            "matches" => Ok(TreeNode::Matches(condition(key, payload)?)),
            "range" => Ok(TreeNode::Range(condition(key, payload)?)),
            "invalid" => Ok(TreeNode::Invalid(condition(key, payload)?)),
            "empty" => Ok(TreeNode::Empty(condition(key, payload)?)),
            "valid" => Ok(TreeNode::Valid(condition(key, payload)?)),
            "and" => {
                let (left, right) = children(key, payload)?;
                Ok(TreeNode::and(left, right))
            }
            "or" => {
                let (left, right) = children(key, payload)?;
                Ok(TreeNode::or(left, right))
            }
            other => Err(FilterError::unrecognized_operator(other)),
        }
    }
}

impl<'de> Deserialize<'de> for TreeNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        TreeNode::from_json(&value).map_err(D::Error::custom)
    }
}

fn condition<T: DeserializeOwned>(key: &str, payload: &Value) -> FilterResult<T> {
    T::deserialize(payload).map_err(|e| FilterError::malformed(format!("{key}: {e}")))
}

fn children(key: &str, payload: &Value) -> FilterResult<(TreeNode, TreeNode)> {
    match payload.as_array().map(Vec::as_slice) {
        Some([left, right]) => Ok((TreeNode::from_json(left)?, TreeNode::from_json(right)?)),
        Some(items) => Err(FilterError::malformed(format!(
            "{key} expects exactly 2 children, found {}",
            items.len()
        ))),
        None => Err(FilterError::malformed(format!(
            "{key} expects an array of children"
        ))),
    }
}

/// The binary combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    fn combine(self, left: TreeNode, right: TreeNode) -> TreeNode {
        match self {
            Combinator::And => TreeNode::and(left, right),
            Combinator::Or => TreeNode::or(left, right),
        }
    }
}

/// Folds nodes into a left-leaning chain: `[a, b, c]` becomes
/// `op(op(a, b), c)`.
///
/// A single node is returned as is; no nodes give `None`. Flattening the
/// result depth-first, left branch first, yields the nodes in input order.
pub fn fold_left<I>(nodes: I, combinator: Combinator) -> Option<TreeNode>
where
    I: IntoIterator<Item = TreeNode>,
{
    nodes
        .into_iter()
        .reduce(|left, right| combinator.combine(left, right))
}

/// The root wrapper: `{"filter": node}`, or `{}` when there is no filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterTree {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<TreeNode>,
}

impl FilterTree {
    pub fn new(filter: Option<TreeNode>) -> Self {
        Self { filter }
    }

    /// Returns the root node, if any.
    pub fn node(&self) -> Option<&TreeNode> {
        self.filter.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.filter.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eq(value: &str) -> TreeNode {
        TreeNode::Eq(ValueCondition::new("0001", value))
    }

    #[test]
    fn test_leaf_serialization() {
        assert_eq!(
            serde_json::to_value(eq("Dupont")).unwrap(),
            json!({"eq": {"field": "0001", "value": "Dupont"}})
        );
        assert_eq!(
            serde_json::to_value(TreeNode::Invalid(FieldCondition::any())).unwrap(),
            json!({"invalid": {}})
        );
    }

    #[test]
    fn test_combinator_serialization() {
        let node = TreeNode::and(eq("a"), TreeNode::Valid(FieldCondition::on("0002")));
        assert_eq!(
            serde_json::to_value(node).unwrap(),
            json!({"and": [
                {"eq": {"field": "0001", "value": "a"}},
                {"valid": {"field": "0002"}}
            ]})
        );
    }

    #[test]
    fn test_from_json_leaves() {
        let node = TreeNode::from_json(&json!({
            "range": {"field": "0003", "start": 5, "end": 10, "type": "integer"}
        }))
        .unwrap();
        assert_eq!(
            node,
            TreeNode::Range(RangeCondition {
                field: "0003".to_string(),
                start: Number::from(5),
                end: Number::from(10),
                range_type: Some(RangeType::Integer),
                label: None,
            })
        );

        let node = TreeNode::from_json(&json!({"empty": {"field": "0004"}})).unwrap();
        assert_eq!(node, TreeNode::Empty(FieldCondition::on("0004")));
    }

    #[test]
    fn test_from_json_unknown_operator() {
        let err = TreeNode::from_json(&json!({"between": {"field": "0001"}})).unwrap_err();
        assert_eq!(
            err,
            FilterError::UnrecognizedOperator {
                key: "between".to_string()
            }
        );
    }

    #[test]
    fn test_from_json_unknown_operator_nested() {
        let tree = json!({"and": [
            {"eq": {"field": "0001", "value": "a"}},
            {"not": {"eq": {"field": "0001", "value": "b"}}}
        ]});
        assert_eq!(
            TreeNode::from_json(&tree),
            Err(FilterError::unrecognized_operator("not"))
        );
    }

    #[test]
    fn test_from_json_rejects_n_ary_combinators() {
        let tree = json!({"or": [
            {"valid": {"field": "0001"}},
            {"valid": {"field": "0002"}},
            {"valid": {"field": "0003"}}
        ]});
        assert!(matches!(
            TreeNode::from_json(&tree),
            Err(FilterError::MalformedNode { .. })
        ));
        assert!(matches!(
            TreeNode::from_json(&json!({"and": {}})),
            Err(FilterError::MalformedNode { .. })
        ));
    }

    #[test]
    fn test_from_json_rejects_bad_shapes() {
        for value in [
            json!([]),
            json!("eq"),
            json!({}),
            json!({"eq": {"field": "0001", "value": "a"}, "valid": {}}),
            json!({"eq": {"field": "0001"}}),
        ] {
            assert!(
                matches!(TreeNode::from_json(&value), Err(FilterError::MalformedNode { .. })),
                "accepted {value}"
            );
        }
    }

    #[test]
    fn test_deserialize_reports_unknown_operator() {
        let err = serde_json::from_str::<TreeNode>(r#"{"gt": {"field": "0001"}}"#).unwrap_err();
        assert!(err.to_string().contains("unrecognized filter operator: gt"));
    }

    #[test]
    fn test_fold_left_order() {
        let folded = fold_left(vec![eq("a"), eq("b"), eq("c")], Combinator::Or).unwrap();
        assert_eq!(folded, TreeNode::or(TreeNode::or(eq("a"), eq("b")), eq("c")));
    }

    #[test]
    fn test_fold_left_single_and_empty() {
        assert_eq!(fold_left(vec![eq("a")], Combinator::And), Some(eq("a")));
        assert_eq!(fold_left(Vec::new(), Combinator::And), None);
    }

    #[test]
    fn test_filter_tree_empty_is_empty_object() {
        let tree = FilterTree::default();
        assert!(tree.is_empty());
        assert_eq!(serde_json::to_value(&tree).unwrap(), json!({}));

        let parsed: FilterTree = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, tree);
    }

    #[test]
    fn test_filter_tree_wraps_node() {
        let tree = FilterTree::new(Some(eq("a")));
        assert_eq!(
            serde_json::to_value(&tree).unwrap(),
            json!({"filter": {"eq": {"field": "0001", "value": "a"}}})
        );
        assert_eq!(tree.node(), Some(&eq("a")));
    }
}
