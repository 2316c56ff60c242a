//! Table specifications and row predicates
//!
//! A [`TableSpec`] is what the catalog hands to the exporter: a table name
//! and either no restriction ([`TableSelection::Unfiltered`]) or an ordered
//! list of [`Predicate`]s, each selecting rows by exact field values.

use super::ids::TableName;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A literal value compared against a column in a predicate term
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredicateValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl PredicateValue {
    /// Renders a single `` `field`=value `` term
    ///
    /// The field is backtick-quoted so reserved words such as `order` work.
    /// Text is single-quoted with `\` and `'` escaped; NULL becomes `IS NULL`
    /// because `field=NULL` never matches.
    pub fn render_term(&self, field: &str) -> String {
        match self {
            PredicateValue::Integer(v) => format!("`{field}`={v}"),
            PredicateValue::Float(v) => format!("`{field}`={v}"),
            PredicateValue::Bool(v) => format!("`{field}`={}", u8::from(*v)),
            PredicateValue::Text(v) => {
                let escaped = v.replace('\\', "\\\\").replace('\'', "\\'");
                format!("`{field}`='{escaped}'")
            }
            PredicateValue::Null => format!("`{field}` IS NULL"),
        }
    }
}

impl TryFrom<Value> for PredicateValue {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(PredicateValue::Null),
            Value::Bool(b) => Ok(PredicateValue::Bool(b)),
            Value::String(s) => Ok(PredicateValue::Text(s)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(PredicateValue::Integer(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(PredicateValue::Float(f))
                } else {
                    Err(format!("Unsupported numeric predicate value: {n}"))
                }
            }
            other => Err(format!(
                "Predicate values must be scalars, got: {other}"
            )),
        }
    }
}

impl From<i64> for PredicateValue {
    fn from(v: i64) -> Self {
        PredicateValue::Integer(v)
    }
}

impl From<&str> for PredicateValue {
    fn from(v: &str) -> Self {
        PredicateValue::Text(v.to_string())
    }
}

/// A conjunction of `` `field`=value `` terms identifying rows of one table
///
/// Field order is preserved from the source so that rendered clauses are
/// stable across runs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Predicate {
    terms: Vec<(String, PredicateValue)>,
}

impl Predicate {
    /// Creates a predicate from ordered `(field, value)` pairs
    pub fn new<I, K, V>(terms: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PredicateValue>,
    {
        let terms: Vec<(String, PredicateValue)> = terms
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if terms.is_empty() {
            return Err("Predicate must contain at least one field".to_string());
        }
        if let Some((field, _)) = terms.iter().find(|(field, _)| field.trim().is_empty()) {
            return Err(format!("Predicate field name cannot be empty: '{field}'"));
        }
        if let Some((field, _)) = terms
            .iter()
            .find(|(field, _)| field.contains('`') || field.contains('\0'))
        {
            return Err(format!(
                "Predicate field name cannot contain backticks or NUL: '{field}'"
            ));
        }
        Ok(Self { terms })
    }

    /// Returns the ordered terms
    pub fn terms(&self) -> &[(String, PredicateValue)] {
        &self.terms
    }

    /// Renders the predicate as `` `f1`=v1 and `f2`=v2 ... ``
    pub fn conjunction(&self) -> String {
        self.terms
            .iter()
            .map(|(field, value)| value.render_term(field))
            .collect::<Vec<_>>()
            .join(" and ")
    }
}

impl TryFrom<Map<String, Value>> for Predicate {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut terms = Vec::with_capacity(map.len());
        for (field, value) in map {
            let value = PredicateValue::try_from(value)
                .map_err(|e| format!("Field '{field}': {e}"))?;
            terms.push((field, value));
        }
        Predicate::new(terms)
    }
}

impl Serialize for Predicate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.terms.len()))?;
        for (field, value) in &self.terms {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.conjunction())
    }
}

/// Which rows of a table to export
#[derive(Debug, Clone, PartialEq)]
pub enum TableSelection {
    /// Every row
    Unfiltered,
    /// Only rows matching at least one predicate
    Filtered(Vec<Predicate>),
}

/// A table to export, as resolved by the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub name: TableName,
    pub selection: TableSelection,
}

impl TableSpec {
    /// A table exported in full
    pub fn unfiltered(name: TableName) -> Self {
        Self {
            name,
            selection: TableSelection::Unfiltered,
        }
    }

    /// A table restricted to rows matching `predicates`
    pub fn filtered(name: TableName, predicates: Vec<Predicate>) -> Self {
        Self {
            name,
            selection: TableSelection::Filtered(predicates),
        }
    }

    /// Returns the predicates, or `None` for an unfiltered table
    pub fn predicates(&self) -> Option<&[Predicate]> {
        match &self.selection {
            TableSelection::Unfiltered => None,
            TableSelection::Filtered(predicates) => Some(predicates),
        }
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self.selection, TableSelection::Filtered(_))
    }
}
