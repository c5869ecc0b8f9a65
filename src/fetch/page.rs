//! Search page queries and responses.

use async_trait::async_trait;
use serde_json::Value;

use super::error::FetchError;
use crate::record::RawRecord;

/// Field projection requested for every issue.
pub const SEARCH_FIELDS: &str =
    "summary,description,comment,labels,priority,status,reporter,assignee,created,updated";

/// One page request: which source, starting where, how many.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// Source (project) identifier.
    pub source: String,
    /// Zero-based offset into the source's ordered result set.
    pub offset: u64,
    /// Page size.
    pub limit: u32,
}

impl PageQuery {
    /// Creates a page query.
    pub fn new(source: impl Into<String>, offset: u64, limit: u32) -> Self {
        Self {
            source: source.into(),
            offset,
            limit,
        }
    }

    /// The JQL filter, ordered by creation so offsets stay stable between runs.
    #[must_use]
    pub fn jql(&self) -> String {
        format!("project={} ORDER BY created ASC", self.source)
    }

    /// Query-string parameters for the search endpoint.
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("jql", self.jql()),
            ("startAt", self.offset.to_string()),
            ("maxResults", self.limit.to_string()),
            ("fields", SEARCH_FIELDS.to_string()),
        ]
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Total matching issues, when the server reports it.
    pub total: Option<u64>,
    /// Issues in server order. Empty means no more data.
    pub records: Vec<RawRecord>,
}

impl Page {
    /// Decodes a search response body.
    ///
    /// A missing or null `issues` is an empty page; a non-object body or a
    /// non-array `issues` is an error describing the problem.
    pub fn from_json(value: Value) -> Result<Self, String> {
        let Value::Object(mut body) = value else {
            return Err("response is not a JSON object".to_string());
        };

        let total = body.get("total").and_then(Value::as_u64);
        let records = match body.remove("issues") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(issues)) => issues.into_iter().map(RawRecord::new).collect(),
            Some(other) => {
                return Err(format!(
                    "`issues` is not an array (found {})",
                    json_type_name(&other)
                ));
            }
        };

        Ok(Self { total, records })
    }

    /// Number of records in the page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the page carries no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Anything that can return a page of search results.
///
/// [`SearchClient`](super::SearchClient) is the production implementation;
/// tests substitute in-memory fakes.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches one page.
    async fn fetch_page(&self, query: &PageQuery) -> Result<Page, FetchError>;
}
