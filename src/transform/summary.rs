//! Rule-based summary: the first sentences of a description.

/// Sentences kept by [`summarize`].
pub const SUMMARY_SENTENCES: usize = 2;

/// Returns the first two period-delimited fragments of `text`.
///
/// Carriage returns become spaces, fragments are trimmed, empty fragments are
/// dropped, survivors are joined with `". "` and a trailing period is restored.
///
/// # Examples
///
/// ```
/// use jira_harvest::transform::summarize;
///
/// assert_eq!(
///     summarize("Build fails. Logs show exit code 1. Retried twice."),
///     "Build fails. Logs show exit code 1."
/// );
/// assert_eq!(summarize(""), "");
/// ```
#[must_use]
pub fn summarize(text: &str) -> String {
    let normalized = text.replace('\r', " ");
    let sentences: Vec<&str> = normalized
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if sentences.is_empty() {
        return String::new();
    }

    let mut summary = sentences
        .iter()
        .take(SUMMARY_SENTENCES)
        .copied()
        .collect::<Vec<_>>()
        .join(". ");
    summary.push('.');
    summary
}
