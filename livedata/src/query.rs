//! The generic live data query.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::{JsonMap, Node};

/// Describes which entries to fetch from a live data source and how to order
/// and slice them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveDataQuery {
    /// The properties to fetch, in display order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<SortEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl LiveDataQuery {
    /// Returns whether the query explicitly names the given property.
    pub fn declares(&self, property: &str) -> bool {
        self.properties
            .as_ref()
            .map(|props| props.iter().any(|p| p == property))
            .unwrap_or(false)
    }

    /// Looks up a source parameter.
    pub fn source_parameter(&self, key: &str) -> Node<'_> {
        match &self.source {
            Some(source) => source.parameter(key),
            None => Node::Missing,
        }
    }
}

/// Identifies the live data source implementation and carries the opaque
/// parameters it needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub parameters: JsonMap,
}

impl Source {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: Some(id.into()),
            parameters: JsonMap::new(),
        }
    }

    pub fn parameter(&self, key: &str) -> Node<'_> {
        Node::get(&self.parameters, key)
    }

    pub fn set_parameter<K, V>(&mut self, key: K, value: V) -> Option<Value>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.parameters.insert(key.into(), value.into())
    }
}

/// Restricts the entries to those whose property matches the constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub property: String,
    /// Applies to the constraints that do not name their own operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// When `false` an entry needs to match only one of the constraints.
    #[serde(default)]
    pub match_all: bool,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl Filter {
    pub fn new<P: Into<String>>(property: P, match_all: bool, constraints: Vec<Constraint>) -> Self {
        Self {
            property: property.into(),
            operator: None,
            match_all,
            constraints,
        }
    }

    /// The operator of the given constraint, falling back to the filter
    /// operator.
    pub fn operator_of<'f>(&'f self, constraint: &'f Constraint) -> Option<&'f str> {
        constraint
            .operator
            .as_deref()
            .or_else(|| self.operator.as_deref())
    }
}

/// A single value to match, together with the way to match it.
///
/// Accepts both `{"operator": "contains", "value": "x"}` and a bare `"x"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConstraintRepr")]
pub struct Constraint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    pub value: Value,
}

impl Constraint {
    pub fn new<O: Into<String>, V: Into<Value>>(operator: O, value: V) -> Self {
        Self {
            operator: Some(operator.into()),
            value: value.into(),
        }
    }

    /// A constraint that leaves the operator up to the source.
    pub fn value<V: Into<Value>>(value: V) -> Self {
        Self {
            operator: None,
            value: value.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConstraintRepr {
    Full {
        operator: Option<String>,
        #[serde(default)]
        value: Value,
    },
    Bare(Value),
}

impl From<ConstraintRepr> for Constraint {
    fn from(repr: ConstraintRepr) -> Self {
        match repr {
            ConstraintRepr::Full { operator, value } => Self { operator, value },
            ConstraintRepr::Bare(value) => Self::value(value),
        }
    }
}

/// Orders the entries by a property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SortEntry {
    /// `None` until the default resolver picks a property.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(default)]
    pub descending: bool,
}

impl SortEntry {
    pub fn new<P: Into<String>>(property: P, descending: bool) -> Self {
        Self {
            property: Some(property.into()),
            descending,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn constraints_accept_bare_values() {
        let filter: Filter = serde_json::from_value(json!({
            "property": "doc.author",
            "constraints": ["mflorea", {"operator": "contains", "value": "tmortagne"}],
        }))
        .unwrap();
        assert!(!filter.match_all);
        assert_eq!(
            filter.constraints,
            vec![
                Constraint::value("mflorea"),
                Constraint::new("contains", "tmortagne"),
            ]
        );
    }

    #[test]
    fn filter_operator_is_the_fallback() {
        let filter: Filter = serde_json::from_value(json!({
            "property": "doc.author",
            "operator": "contains",
            "constraints": ["mflorea", {"operator": "equals", "value": "tmortagne"}],
        }))
        .unwrap();
        assert_eq!(filter.operator.as_deref(), Some("contains"));
        assert_eq!(filter.operator_of(&filter.constraints[0]), Some("contains"));
        assert_eq!(filter.operator_of(&filter.constraints[1]), Some("equals"));
        let bare = Filter::new("doc.author", false, vec![Constraint::value("x")]);
        assert_eq!(bare.operator_of(&bare.constraints[0]), None);
    }

    #[test]
    fn query_from_camel_case_json() {
        let query: LiveDataQuery = serde_json::from_value(json!({
            "properties": ["doc.title", "_actions"],
            "source": {"id": "liveTable", "parameters": {"className": "Blog.BlogPostClass"}},
            "sort": [{"property": "doc.title", "descending": true}],
            "offset": 13,
            "limit": 15,
        }))
        .unwrap();
        assert!(query.declares("_actions"));
        assert!(!query.declares("doc.name"));
        assert_eq!(
            query.source_parameter("className").as_text(),
            Some("Blog.BlogPostClass")
        );
        assert_eq!(query.sort, Some(vec![SortEntry::new("doc.title", true)]));
        assert_eq!(query.offset, Some(13));
    }
}
