//! Canonical metadata filter AST.
//!
//! Shared code builds one [`Filter`]; each backend translates it into its own
//! query language (a SQL `WHERE`, a Qdrant payload filter, a Chroma `where`
//! document). [`Filter::matches`] is the reference evaluation used by the
//! in-memory store.

use super::Metadata;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison applied to a single metadata field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "value")]
pub enum FilterOp {
    /// Field equals the value
    Eq(Value),
    /// Numeric field `>=`
    Gte(f64),
    /// Numeric field `<=`
    Lte(f64),
    /// Numeric field `>`
    Gt(f64),
    /// Numeric field `<`
    Lt(f64),
    /// Field equals one of the values
    In(Vec<Value>),
    /// Array field contains the value
    Contains(Value),
}

/// One predicate over a named metadata field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    #[serde(flatten)]
    pub op: FilterOp,
}

impl Condition {
    /// Evaluates the predicate. A missing field never matches.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        let Some(value) = metadata.get(&self.field) else {
            return false;
        };
        match &self.op {
            FilterOp::Eq(expected) => value == expected,
            FilterOp::Gte(bound) => value.as_f64().is_some_and(|v| v >= *bound),
            FilterOp::Lte(bound) => value.as_f64().is_some_and(|v| v <= *bound),
            FilterOp::Gt(bound) => value.as_f64().is_some_and(|v| v > *bound),
            FilterOp::Lt(bound) => value.as_f64().is_some_and(|v| v < *bound),
            FilterOp::In(options) => options.contains(value),
            FilterOp::Contains(needle) => value
                .as_array()
                .is_some_and(|items| items.contains(needle)),
        }
    }
}

/// Conjunction of conditions. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(mut self, field: &str, op: FilterOp) -> Self {
        self.conditions.push(Condition {
            field: field.to_string(),
            op,
        });
        self
    }

    pub fn eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.with(field, FilterOp::Eq(value.into()))
    }

    pub fn gte(self, field: &str, bound: f64) -> Self {
        self.with(field, FilterOp::Gte(bound))
    }

    pub fn lte(self, field: &str, bound: f64) -> Self {
        self.with(field, FilterOp::Lte(bound))
    }

    pub fn gt(self, field: &str, bound: f64) -> Self {
        self.with(field, FilterOp::Gt(bound))
    }

    pub fn lt(self, field: &str, bound: f64) -> Self {
        self.with(field, FilterOp::Lt(bound))
    }

    pub fn one_of(self, field: &str, values: Vec<Value>) -> Self {
        self.with(field, FilterOp::In(values))
    }

    pub fn contains(self, field: &str, value: impl Into<Value>) -> Self {
        self.with(field, FilterOp::Contains(value.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// True if every condition matches.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.conditions.iter().all(|c| c.matches(metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata() -> Metadata {
        let value = json!({
            "folder": "inbox",
            "labels": ["work", "finance"],
            "date_ts": 1_706_745_600,
            "is_read": false
        });
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_eq_and_contains() {
        let meta = metadata();
        assert!(Filter::new().eq("folder", "inbox").matches(&meta));
        assert!(!Filter::new().eq("folder", "sent").matches(&meta));
        assert!(Filter::new().contains("labels", "finance").matches(&meta));
        assert!(!Filter::new().contains("labels", "travel").matches(&meta));
        assert!(!Filter::new().contains("folder", "inbox").matches(&meta));
    }

    #[test]
    fn test_numeric_ranges() {
        let meta = metadata();
        assert!(Filter::new().gte("date_ts", 1_706_745_600.0).matches(&meta));
        assert!(!Filter::new().gt("date_ts", 1_706_745_600.0).matches(&meta));
        assert!(Filter::new().lt("date_ts", 1_706_745_601.0).matches(&meta));
        assert!(Filter::new().lte("date_ts", 1_706_745_600.0).matches(&meta));
        assert!(!Filter::new().gte("folder", 0.0).matches(&meta));
    }

    #[test]
    fn test_membership_and_conjunction() {
        let meta = metadata();
        let filter = Filter::new()
            .one_of("folder", vec![json!("archive"), json!("inbox")])
            .eq("is_read", false);
        assert!(filter.matches(&meta));

        let filter = filter.eq("missing", 1);
        assert!(!filter.matches(&meta));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(Filter::new().matches(&Metadata::new()));
    }

    #[test]
    fn test_serialized_form() {
        let filter = Filter::new().gte("date_ts", 10.0);
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(
            json,
            json!({ "conditions": [{ "field": "date_ts", "op": "gte", "value": 10.0 }] })
        );
    }
}
