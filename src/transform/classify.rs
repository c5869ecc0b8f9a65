//! Keyword-scored issue classification.

/// A category and the keywords that vote for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    /// Label written to the document.
    pub name: &'static str,
    /// Substrings searched for in the lower-cased text and labels.
    pub keywords: &'static [&'static str],
}

/// Fallback label when no keyword matches.
pub const OTHER: &str = "other";

/// Categories in tie-break order: on equal scores the earlier one wins.
pub const CATEGORIES: [Category; 6] = [
    Category {
        name: "bug",
        keywords: &["bug", "error", "exception", "stacktrace", "crash", "fail"],
    },
    Category {
        name: "feature_request",
        keywords: &["feature", "enhance", "improve", "support", "add"],
    },
    Category {
        name: "documentation",
        keywords: &["doc", "documentation", "readme", "guide", "docs"],
    },
    Category {
        name: "performance",
        keywords: &["performance", "slow", "optimi", "latency"],
    },
    Category {
        name: "configuration",
        keywords: &["config", "configuration", "setting", "property"],
    },
    Category {
        name: "test",
        keywords: &["test", "unit test", "integration test", "flaky"],
    },
];

impl Category {
    /// Number of this category's keywords present in either text.
    #[must_use]
    pub fn score(&self, text: &str, labels_text: &str) -> usize {
        self.keywords
            .iter()
            .filter(|kw| text.contains(*kw) || labels_text.contains(*kw))
            .count()
    }
}

/// Classifies an issue from its title, description, and labels.
///
/// # Examples
///
/// ```
/// use jira_harvest::transform::classify;
///
/// assert_eq!(classify(Some("NullPointerException on startup"), Some(""), &[]), "bug");
/// assert_eq!(classify(None, None, &[]), "other");
/// ```
#[must_use]
pub fn classify(title: Option<&str>, description: Option<&str>, labels: &[String]) -> &'static str {
    let text = [title, description]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let labels_text = labels.join(" ").to_lowercase();

    let mut best: Option<(&'static str, usize)> = None;
    for category in &CATEGORIES {
        let score = category.score(&text, &labels_text);
        if score > 0 && best.is_none_or(|(_, top)| score > top) {
            best = Some((category.name, score));
        }
    }

    best.map_or(OTHER, |(name, _)| name)
}
