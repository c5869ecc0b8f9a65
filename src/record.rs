//! Raw issue records as returned by the search endpoint.
//!
//! Records are kept as [`serde_json::Value`] and read through [`lookup`], a
//! small recursive accessor that yields `None` for any missing key, null, or
//! non-object step instead of failing.

use serde_json::Value;

/// Walks `path` through nested objects.
///
/// Returns `None` if any step is missing, null, or not an object.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use jira_harvest::record::lookup;
///
/// let value = json!({"status": {"name": "Open"}, "assignee": null});
/// assert_eq!(lookup(&value, &["status", "name"]), Some(&json!("Open")));
/// assert_eq!(lookup(&value, &["assignee", "displayName"]), None);
/// assert_eq!(lookup(&value, &["missing"]), None);
/// ```
#[must_use]
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let Some((head, rest)) = path.split_first() else {
        return (!value.is_null()).then_some(value);
    };
    let next = value.as_object()?.get(*head)?;
    lookup(next, rest)
}

/// [`lookup`] narrowed to a string leaf.
#[must_use]
pub fn lookup_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    lookup(value, path).and_then(Value::as_str)
}

/// One issue from a search page.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord(Value);

impl RawRecord {
    /// Wraps a JSON value.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The underlying JSON.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// The issue key (e.g. `HADOOP-1234`).
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        lookup_str(&self.0, &["key"])
    }

    /// A string inside the `fields` bag.
    #[must_use]
    pub fn field_str(&self, path: &[&str]) -> Option<&str> {
        lookup(&self.0, &["fields"])
            .and_then(|fields| lookup(fields, path))
            .and_then(Value::as_str)
    }

    /// The `fields.labels` array, keeping only string entries.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        lookup(&self.0, &["fields", "labels"])
            .and_then(Value::as_array)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Non-empty comment bodies from `fields.comment.comments`, in server order.
    #[must_use]
    pub fn comment_bodies(&self) -> Vec<String> {
        lookup(&self.0, &["fields", "comment", "comments"])
            .and_then(Value::as_array)
            .map(|comments| {
                comments
                    .iter()
                    .filter_map(|c| lookup_str(c, &["body"]))
                    .filter(|body| !body.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl From<Value> for RawRecord {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
