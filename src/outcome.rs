//! The single translation point between the delegated agent's free-text
//! results and typed outcomes. The agent contract is an informal string
//! convention; every substring it relies on lives here and nowhere else.

use crate::agent::AgentStep;
use regex::Regex;
use std::sync::OnceLock;

/// Confirmed engagement result reported by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementKind {
    Liked,
    AlreadyLiked,
    Commented,
    Followed,
    LoggedIn,
    PostClosed,
}

/// Typed outcome of one agent task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A known keyword confirmed the action.
    Success(EngagementKind),
    /// The agent ran but none of its results matched a known keyword.
    /// Carries the raw text for the record; not an error.
    Ambiguous(String),
    /// The agent reported failure, or its run errored.
    Failure(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

/// Classify a single result text. Ordering matters where keywords overlap:
/// "already liked" contains "liked", "not logged in" contains "logged in".
pub fn classify(text: &str) -> Option<Outcome> {
    let lower = text.to_lowercase();
    if lower.contains("already liked") {
        return Some(Outcome::Success(EngagementKind::AlreadyLiked));
    }
    if lower.contains("not logged in") || lower.contains("login failed") {
        return Some(Outcome::Failure(text.trim().to_string()));
    }
    if lower.contains("logged in") || lower.contains("login successful") {
        return Some(Outcome::Success(EngagementKind::LoggedIn));
    }
    if lower.contains("commented") {
        return Some(Outcome::Success(EngagementKind::Commented));
    }
    if lower.contains("followed") {
        return Some(Outcome::Success(EngagementKind::Followed));
    }
    if lower.contains("liked") {
        return Some(Outcome::Success(EngagementKind::Liked));
    }
    if lower.contains("closed") {
        return Some(Outcome::Success(EngagementKind::PostClosed));
    }
    if lower.contains("failed") {
        return Some(Outcome::Failure(text.trim().to_string()));
    }
    None
}

/// Scan an agent run for the first classifiable result. No match is
/// [`Outcome::Ambiguous`] carrying whatever text the agent did produce.
pub fn first_outcome(steps: &[AgentStep]) -> Outcome {
    let mut raw = Vec::new();
    for step in steps {
        if let Some(ref err) = step.error {
            return Outcome::Failure(err.clone());
        }
        if let Some(ref text) = step.extracted_text {
            if let Some(outcome) = classify(text) {
                return outcome;
            }
            raw.push(text.trim());
        }
    }
    Outcome::Ambiguous(raw.join(" | "))
}

fn post_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"https?://(?:www\.)?instagram\.com(/(?:p|reel)/[A-Za-z0-9_\-]+/?)").unwrap()
    })
}

/// Extract the first Instagram post URL from a discovery run. The agent
/// answers "none" (or produces no URL) when the feed is exhausted.
pub fn extract_post_url(steps: &[AgentStep]) -> Option<String> {
    for step in steps {
        let Some(ref text) = step.extracted_text else {
            continue;
        };
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("none") || trimmed.to_lowercase().contains("no new post") {
            return None;
        }
        if let Some(m) = post_url_re().captures(trimmed) {
            return Some(format!("https://www.instagram.com{}", &m[1]));
        }
        // Bare paths like "/p/abc123/" count too.
        if trimmed.starts_with("/p/") || trimmed.starts_with("/reel/") {
            return Some(format!("https://www.instagram.com{}", trimmed));
        }
    }
    None
}

/// Extract every post URL mentioned across a collection run, deduplicated
/// in order of first appearance.
pub fn extract_post_urls(steps: &[AgentStep]) -> Vec<String> {
    let mut urls = Vec::new();
    for step in steps {
        let Some(ref text) = step.extracted_text else {
            continue;
        };
        for caps in post_url_re().captures_iter(text) {
            let url = format!("https://www.instagram.com{}", &caps[1]);
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
    }
    urls
}

/// Extract candidate usernames from an audience-discovery run: whitespace
/// tokens with '@' and path decoration stripped.
pub fn extract_usernames(steps: &[AgentStep]) -> Vec<String> {
    let mut users = Vec::new();
    for step in steps {
        let Some(ref text) = step.extracted_text else {
            continue;
        };
        for token in text.split_whitespace() {
            let name = token
                .trim_matches(|c| c == '@' || c == '/' || c == ',')
                .split('/')
                .next()
                .unwrap_or("");
            if !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
                && !users.iter().any(|u| u == name)
            {
                users.push(name.to_string());
            }
        }
    }
    users
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentStep;

    #[test]
    fn test_already_liked_beats_liked() {
        assert_eq!(
            classify("The post was already liked"),
            Some(Outcome::Success(EngagementKind::AlreadyLiked))
        );
    }

    #[test]
    fn test_not_logged_in_beats_logged_in() {
        assert_eq!(
            classify("not logged in"),
            Some(Outcome::Failure("not logged in".into()))
        );
        assert_eq!(
            classify("Logged in successfully"),
            Some(Outcome::Success(EngagementKind::LoggedIn))
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            classify("LIKED the post"),
            Some(Outcome::Success(EngagementKind::Liked))
        );
        assert_eq!(
            classify("Commented: nice!"),
            Some(Outcome::Success(EngagementKind::Commented))
        );
    }

    #[test]
    fn test_failed_maps_to_failure() {
        assert!(matches!(
            classify("failed to find the heart icon"),
            Some(Outcome::Failure(_))
        ));
    }

    #[test]
    fn test_no_keyword_is_none() {
        assert_eq!(classify("the page shows a cat video"), None);
    }

    #[test]
    fn test_first_outcome_scans_in_order() {
        let steps = vec![
            AgentStep::text("scrolling the feed"),
            AgentStep::text("already liked"),
            AgentStep::text("liked"),
        ];
        assert_eq!(
            first_outcome(&steps),
            Outcome::Success(EngagementKind::AlreadyLiked)
        );
    }

    #[test]
    fn test_first_outcome_ambiguous_keeps_raw_text() {
        let steps = vec![AgentStep::text("some unrelated narration")];
        match first_outcome(&steps) {
            Outcome::Ambiguous(raw) => assert!(raw.contains("unrelated")),
            other => panic!("expected ambiguous, got {:?}", other),
        }
    }

    #[test]
    fn test_first_outcome_step_error_is_failure() {
        let steps = vec![AgentStep::error("net::ERR_TIMED_OUT")];
        assert!(matches!(first_outcome(&steps), Outcome::Failure(_)));
    }

    #[test]
    fn test_extract_post_url_variants() {
        let steps = vec![AgentStep::text("https://www.instagram.com/p/Cx1y2z3/")];
        assert_eq!(
            extract_post_url(&steps).as_deref(),
            Some("https://www.instagram.com/p/Cx1y2z3/")
        );

        let steps = vec![AgentStep::text("/reel/Ab_c-9/")];
        assert_eq!(
            extract_post_url(&steps).as_deref(),
            Some("https://www.instagram.com/reel/Ab_c-9/")
        );
    }

    #[test]
    fn test_extract_post_url_none_answer() {
        let steps = vec![AgentStep::text("none")];
        assert_eq!(extract_post_url(&steps), None);
        let steps = vec![AgentStep::text("No new post was found")];
        assert_eq!(extract_post_url(&steps), None);
    }

    #[test]
    fn test_extract_post_url_ignores_non_post_urls() {
        let steps = vec![AgentStep::text("https://www.instagram.com/explore/tags/fitness/")];
        assert_eq!(extract_post_url(&steps), None);
    }

    #[test]
    fn test_extract_post_urls_dedupes() {
        let steps = vec![AgentStep::text(
            "found https://instagram.com/p/AAA/ and https://www.instagram.com/p/BBB/ \
             and again https://www.instagram.com/p/AAA/",
        )];
        let urls = extract_post_urls(&steps);
        assert_eq!(
            urls,
            vec![
                "https://www.instagram.com/p/AAA/",
                "https://www.instagram.com/p/BBB/"
            ]
        );
    }

    #[test]
    fn test_extract_usernames_strips_decoration() {
        let steps = vec![AgentStep::text("@vegan.chef fit_guy99 /runner/ @vegan.chef")];
        assert_eq!(
            extract_usernames(&steps),
            vec!["vegan.chef", "fit_guy99", "runner"]
        );
    }
}
