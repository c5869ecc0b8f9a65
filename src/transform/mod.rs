//! Transformation of raw issues into training documents.
//!
//! [`transform`] normalizes one [`RawRecord`] into a [`TransformedDocument`]
//! and attaches [`Derived`] fields computed by deterministic rules:
//!
//! - [`summarize`] - first two sentences of the description
//! - [`classify`] - keyword-scored category
//! - [`derive_qna`] - up to two question/answer pairs
//!
//! Every accessor on the raw record defaults on missing or null data, so the
//! only failure is a record that is not a JSON object at all.

mod classify;
mod qna;
mod summary;

pub use classify::{CATEGORIES, Category, OTHER, classify};
pub use qna::{DISCUSSION_QUESTION, ISSUE_QUESTION, QnaPair, derive_qna};
pub use summary::{SUMMARY_SENTENCES, summarize};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::RawRecord;

/// Per-record transformation failure. The record is skipped; siblings continue.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The record was not a JSON object.
    #[error("issue record is not a JSON object (found {found})")]
    NotAnObject {
        /// JSON type that was found instead.
        found: &'static str,
    },
}

/// Rule-derived fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derived {
    /// First sentences of the description.
    pub summary: String,
    /// Category label.
    pub classification: String,
    /// At most two QnA pairs.
    pub qna: Vec<QnaPair>,
}

/// The unit written to the output sink, one JSON line per document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformedDocument {
    /// Source (project) identifier the issue was harvested from.
    pub project: String,
    /// Issue key.
    pub issue_id: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub reporter: Option<String>,
    pub assignee: Option<String>,
    pub labels: Vec<String>,
    /// Creation timestamp, passed through unparsed.
    pub created: Option<String>,
    /// Last-update timestamp, passed through unparsed.
    pub updated: Option<String>,
    pub description: Option<String>,
    /// Comment bodies in server order.
    pub comments: Vec<String>,
    pub derived: Derived,
}

/// Transforms one raw record harvested from `source`.
///
/// # Errors
///
/// Returns [`TransformError::NotAnObject`] if the record is not a JSON object.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use jira_harvest::record::RawRecord;
/// use jira_harvest::transform::transform;
///
/// let raw = RawRecord::new(json!({
///     "key": "KAFKA-7",
///     "fields": {"summary": "Consumer crash on rebalance", "labels": ["consumer"]}
/// }));
/// let doc = transform(&raw, "KAFKA").unwrap();
/// assert_eq!(doc.issue_id.as_deref(), Some("KAFKA-7"));
/// assert_eq!(doc.derived.classification, "bug");
/// ```
pub fn transform(raw: &RawRecord, source: &str) -> Result<TransformedDocument, TransformError> {
    let value = raw.as_value();
    if !value.is_object() {
        return Err(TransformError::NotAnObject {
            found: json_kind(value),
        });
    }

    let owned = |s: Option<&str>| s.map(str::to_string);
    let title = owned(raw.field_str(&["summary"]));
    let description = owned(raw.field_str(&["description"]));
    let labels = raw.labels();
    let comments = raw.comment_bodies();

    let derived = Derived {
        summary: summarize(description.as_deref().unwrap_or_default()),
        classification: classify(title.as_deref(), description.as_deref(), &labels).to_string(),
        qna: derive_qna(title.as_deref(), description.as_deref(), &comments),
    };

    Ok(TransformedDocument {
        project: source.to_string(),
        issue_id: owned(raw.key()),
        title,
        status: owned(raw.field_str(&["status", "name"])),
        priority: owned(raw.field_str(&["priority", "name"])),
        reporter: owned(raw.field_str(&["reporter", "displayName"])),
        assignee: owned(raw.field_str(&["assignee", "displayName"])),
        labels,
        created: owned(raw.field_str(&["created"])),
        updated: owned(raw.field_str(&["updated"])),
        description,
        comments,
        derived,
    })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
