//! Rule-based question/answer pairs.

use serde::{Deserialize, Serialize};

use super::summary::summarize;

/// Question asked of every issue with a title or description.
pub const ISSUE_QUESTION: &str = "What is the issue described?";

/// Question answered by the latest substantive comment.
pub const DISCUSSION_QUESTION: &str = "What updates or decisions were made in the discussion?";

/// Comments must be longer than this (in characters, after trimming) to count.
const MIN_COMMENT_CHARS: usize = 10;

/// One question and its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QnaPair {
    /// The question.
    pub q: String,
    /// The answer.
    pub a: String,
}

impl QnaPair {
    fn new(q: &str, a: impl Into<String>) -> Self {
        Self {
            q: q.to_string(),
            a: a.into(),
        }
    }
}

/// Derives at most two QnA pairs from an issue.
#[must_use]
pub fn derive_qna(
    title: Option<&str>,
    description: Option<&str>,
    comments: &[String],
) -> Vec<QnaPair> {
    let mut pairs = Vec::with_capacity(2);

    let title = title.filter(|t| !t.is_empty());
    let description = description.filter(|d| !d.is_empty());
    if title.is_some() || description.is_some() {
        let mut answer = title.unwrap_or_default().to_string();
        if let Some(description) = description {
            answer.push_str(" - ");
            answer.push_str(&summarize(description));
        }
        pairs.push(QnaPair::new(ISSUE_QUESTION, answer.trim()));
    }

    let latest = comments
        .iter()
        .rev()
        .map(|c| c.trim())
        .find(|c| c.chars().count() > MIN_COMMENT_CHARS);
    if let Some(comment) = latest {
        pairs.push(QnaPair::new(DISCUSSION_QUESTION, comment));
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comments(bodies: &[&str]) -> Vec<String> {
        bodies.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_title_only_and_substantive_comment() {
        let pairs = derive_qna(
            Some("Flaky test in suite"),
            None,
            &comments(&["ok", "Fixed by bumping timeout to 30s in config"]),
        );
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], QnaPair::new(ISSUE_QUESTION, "Flaky test in suite"));
        assert_eq!(
            pairs[1],
            QnaPair::new(DISCUSSION_QUESTION, "Fixed by bumping timeout to 30s in config")
        );
    }

    #[test]
    fn test_description_appends_summary() {
        let pairs = derive_qna(Some("Crash"), Some("Boom. Then more. Ignored."), &[]);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].a, "Crash - Boom. Then more.");
    }

    #[test]
    fn test_description_without_title_is_trimmed() {
        let pairs = derive_qna(None, Some("Only body"), &[]);
        assert_eq!(pairs[0].a, "- Only body.");
    }

    #[test]
    fn test_latest_substantive_comment_wins() {
        let pairs = derive_qna(
            None,
            None,
            &comments(&["An early long comment here", "A later long comment here", "  short  "]),
        );
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].a, "A later long comment here");
    }

    #[test]
    fn test_exactly_ten_chars_does_not_count() {
        let pairs = derive_qna(Some("t"), None, &comments(&["  0123456789  "]));
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn test_nothing_yields_nothing() {
        assert!(derive_qna(None, Some(""), &[]).is_empty());
    }
}
