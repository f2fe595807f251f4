//! Metadata filter predicates for similarity queries.

use super::Metadata;
use serde_json::{json, Value};

/// A metadata predicate: a single equality or a conjunction of equalities.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { field: String, value: Value },
    And(Vec<Filter>),
}

impl Filter {
    /// Equality predicate on one metadata field.
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.to_string(),
            value: value.into(),
        }
    }

    /// Build the content filter for an optional course title and lesson number.
    ///
    /// Yields no filter, a single equality, or an `$and` of both.
    pub fn build(course_title: Option<&str>, lesson_number: Option<i64>) -> Option<Filter> {
        match (course_title, lesson_number) {
            (None, None) => None,
            (Some(title), None) => Some(Filter::eq("course_title", title)),
            (None, Some(lesson)) => Some(Filter::eq("lesson_number", lesson)),
            (Some(title), Some(lesson)) => Some(Filter::And(vec![
                Filter::eq("course_title", title),
                Filter::eq("lesson_number", lesson),
            ])),
        }
    }

    /// Check whether a record's metadata satisfies the predicate.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            Filter::Eq { field, value } => metadata.get(field) == Some(value),
            Filter::And(filters) => filters.iter().all(|f| f.matches(metadata)),
        }
    }

    /// JSON form in the `{field: value}` / `{"$and": [...]}` dialect.
    pub fn to_value(&self) -> Value {
        match self {
            Filter::Eq { field, value } => {
                let mut map = Metadata::new();
                map.insert(field.clone(), value.clone());
                Value::Object(map)
            }
            Filter::And(filters) => {
                json!({ "$and": filters.iter().map(Filter::to_value).collect::<Vec<_>>() })
            }
        }
    }
}
