//! User-Agent string sent with every search request.

/// Purpose tag carried in the User-Agent comment.
const UA_PURPOSE: &str = "training-data-harvester";

/// Default User-Agent for search requests: `jira-harvest/<version> (<purpose>)`.
#[must_use]
pub fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("jira-harvest/{version} ({UA_PURPOSE})")
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_contains_version_and_purpose() {
        let ua = default_user_agent();
        assert!(ua.contains(UA_PURPOSE), "UA must name its purpose: {ua}");
        assert_eq!(
            env!("CARGO_PKG_VERSION"),
            ua.strip_prefix("jira-harvest/")
                .and_then(|s| s.split(' ').next())
                .expect("UA has version"),
            "UA must contain crate version"
        );
    }
}
